use crate::io::interrupts::InterruptFlags;
use crate::io::timer::InputClock::C256;
use crate::scheduler::EventType::{TimerOverflow, TimerPostOverflow};
use crate::scheduler::Scheduler;

/// This register is incremented at rate of 16384Hz (~16779Hz on SGB).
/// Writing any value to this register resets it to 00h.
///
/// Note: The divider is affected by CGB double speed mode, and will increment at 32768Hz in double speed.
pub const DIVIDER_REGISTER: u16 = 0xFF04;
/// This timer is incremented by a clock frequency specified by the TAC register ($FF07).
/// When the value overflows (gets bigger than FFh) then it will be reset to the value
/// specified in TMA (FF06), and an interrupt will be requested, as described below.
pub const TIMER_COUNTER: u16 = 0xFF05;
/// When the TIMA overflows, this data will be loaded.
pub const TIMER_MODULO: u16 = 0xFF06;
/// Several flags to indicate incrementing rate of the timer.
pub const TIMER_CONTROL: u16 = 0xFF07;

/// Number of T-cycles between a TIMA overflow and the TMA reload plus interrupt.
const OVERFLOW_DELAY: u64 = 4;

#[derive(Debug, Copy, Clone)]
enum InputClock {
    C16 = 0x1,
    C64 = 0x2,
    C256 = 0x3,
    C1024 = 0x0,
}

#[derive(Debug, Copy, Clone)]
pub struct TimerControl {
    timer_enabled: bool,
    input_select: InputClock,
}

#[derive(Debug, Default)]
pub struct TimerRegisters {
    pub system_clock: u16,
    pub timer_counter: u8,
    pub timer_modulo: u8,
    pub timer_control: TimerControl,
    /// Set for the 4-cycle window between a TIMA overflow and its TMA reload;
    /// a write to TIMA or TMA during this window is handled specially.
    pub just_overflowed: bool,
}

impl TimerRegisters {
    pub fn divider_register(&self) -> u8 {
        (self.system_clock >> 8) as u8
    }

    /// Advances the internal 16-bit system counter by 4 T-cycles and checks
    /// for a falling edge on the TAC-selected bit, which is what actually
    /// drives TIMA on real hardware.
    pub fn tick_timers(&mut self, scheduler: &mut Scheduler) {
        let old_sys_clock = self.system_clock;
        self.system_clock = self.system_clock.wrapping_add(4);

        if self.timer_control.timer_enabled {
            let select_bit = self.timer_control.input_select.to_relevant_bit();
            if self.fallen_sys_clock(old_sys_clock, select_bit) {
                self.tick_timer(scheduler);
            }
        }
    }

    fn fallen_sys_clock(&self, old_clock: u16, select_bit: u16) -> bool {
        (old_clock & select_bit) != 0 && (self.system_clock & select_bit) == 0
    }

    fn tick_timer(&mut self, scheduler: &mut Scheduler) {
        let (new_value, overflowed) = self.timer_counter.overflowing_add(1);
        self.timer_counter = new_value;
        if overflowed {
            scheduler.schedule(TimerOverflow, OVERFLOW_DELAY);
        }
    }

    /// Runs on the scheduled `TimerOverflow` event: reloads TIMA from TMA,
    /// requests the interrupt, and arms the `just_overflowed` write-glitch
    /// window for another 4 cycles.
    pub fn timer_overflow(&mut self, scheduler: &mut Scheduler, interrupts: &mut crate::io::interrupts::Interrupts) {
        self.timer_counter = self.timer_modulo;
        self.just_overflowed = true;
        interrupts.insert_interrupt(InterruptFlags::TIMER);
        scheduler.schedule(TimerPostOverflow, OVERFLOW_DELAY);
    }

    /// Write to the `TIMA` register (`timer_counter` internally).
    ///
    /// If written to in the 4 clock period before an overflow interrupt, then the interrupt
    /// will be cancelled. If written during the reload cycle itself the write is dropped
    /// in favour of the TMA value that just landed.
    pub fn set_timer_counter(&mut self, value: u8, scheduler: &mut Scheduler) {
        if self.just_overflowed {
            return;
        }
        // If the overflow hadn't landed yet this write pre-empts it entirely.
        scheduler.deschedule(TimerOverflow);
        self.timer_counter = value;
    }

    /// Write to the `TMA` register (internally `timer_modulo`) and update
    /// `timer_counter` as appropriate
    pub fn set_tma(&mut self, value: u8) {
        // If TMA is written to during the same period as we overflow this new value is used
        // instead of the 'old' value.
        if self.just_overflowed {
            self.timer_counter = value;
        }
        self.timer_modulo = value;
    }

    /// Write to the divider register, this will always reset it to 0x00.
    pub fn set_divider(&mut self, scheduler: &mut Scheduler) {
        let old_sys_clock = self.system_clock;
        self.system_clock = 0;

        // If we've already halfway passed our cycle count then we'll increase our timer
        // due to the falling edge detector in the DMG.
        if self.timer_control.timer_enabled && self.fallen_sys_clock(old_sys_clock, self.timer_control.input_select.to_relevant_bit()) {
            self.tick_timer(scheduler);
        }
    }

    pub fn set_timer_control(&mut self, value: u8, scheduler: &mut Scheduler) {
        let old_control = self.timer_control;
        self.timer_control = TimerControl::from(value);
        let old_select_bit = old_control.input_select.to_relevant_bit();
        let select_bit = self.timer_control.input_select.to_relevant_bit();

        // When disabling the timer the DMG will increment the timer register if our system clock
        // was already half way through it's cycle due to the falling edge detector.
        if old_control.timer_enabled && !self.timer_control.timer_enabled && (self.system_clock & select_bit) != 0 {
            self.tick_timer(scheduler);
        }

        // if the old selected bit by the multiplexer was 0, the new one is
        // 1, and the new enable bit of TAC is set to 1, it will increase TIMA.
        // Put another way: If our old control had not yet done half of its cycles
        // but our new control will have done so, then we'll increment our timer.
        if old_control.timer_enabled
            && self.timer_control.timer_enabled
            && (self.system_clock & old_select_bit) != 0
            && (self.system_clock & select_bit) == 0
        {
            self.tick_timer(scheduler)
        }
    }
}

impl TimerControl {
    pub fn to_bits(&self) -> u8 {
        let result = if self.timer_enabled { 0x4 } else { 0 };

        result | self.input_select as u8
    }
}

impl Default for TimerControl {
    fn default() -> Self {
        TimerControl {
            input_select: C256,
            timer_enabled: false,
        }
    }
}

impl From<u8> for TimerControl {
    fn from(val: u8) -> Self {
        TimerControl {
            timer_enabled: val & 0b0000_0100 > 0,
            input_select: InputClock::from(val),
        }
    }
}

impl From<u8> for InputClock {
    fn from(val: u8) -> Self {
        match val & 0x3 {
            0x0 => InputClock::C1024,
            0x1 => InputClock::C16,
            0x2 => InputClock::C64,
            0x3 => InputClock::C256,
            _ => panic!("Invalid value passed to the InputClock parser."),
        }
    }
}

impl InputClock {
    pub fn to_relevant_bit(&self) -> u16 {
        match self {
            InputClock::C16 => 0x0008,
            InputClock::C64 => 0x0020,
            InputClock::C256 => 0x0080,
            InputClock::C1024 => 0x0200,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_schedules_reload() {
        let mut scheduler = Scheduler::new();
        let mut timers = TimerRegisters::default();
        timers.timer_counter = 0xFF;
        timers.timer_control = TimerControl { timer_enabled: true, input_select: InputClock::C16 };
        // Drive the system clock up to just below the C16 falling edge.
        for _ in 0..2 {
            timers.tick_timers(&mut scheduler);
        }
        assert!(scheduler.until(TimerOverflow).is_some() || timers.timer_counter != 0);
    }

    #[test]
    fn test_write_during_reload_window_is_dropped() {
        let mut scheduler = Scheduler::new();
        let mut interrupts = crate::io::interrupts::Interrupts::default();
        let mut timers = TimerRegisters::default();
        timers.timer_overflow(&mut scheduler, &mut interrupts);
        timers.set_timer_counter(0x42, &mut scheduler);
        assert_eq!(timers.timer_counter, timers.timer_modulo);
    }
}
