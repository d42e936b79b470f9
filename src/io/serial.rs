use crate::io::interrupts::{InterruptFlags, Interrupts};
use crate::scheduler::EventType::SerialBitTransfer;
use crate::scheduler::Scheduler;

/// `SB` ($FF01), the byte currently being shifted in/out.
pub const SIO_DATA: u16 = 0xFF01;
/// `SC` ($FF02), transfer control.
pub const SIO_CONT: u16 = 0xFF02;

/// Cycles between successive bit shifts when using the internal clock
/// (8192 Hz at normal speed, i.e. one bit every 512 T-cycles).
const CYCLES_PER_BIT: u64 = 512;

/// No link cable is ever actually connected, so every shifted-in bit reads
/// back as 1, matching what real hardware sees with nothing plugged in.
const UNCONNECTED_BIT: bool = true;

/// The link port's `SB`/`SC` registers and the bit-shift clock driving a transfer.
#[derive(Debug, Default)]
pub struct SerialPort {
    data: u8,
    transfer_enabled: bool,
    internal_clock: bool,
    in_progress: bool,
    bits_remaining: u8,
}

impl SerialPort {
    pub fn read_data(&self) -> u8 {
        self.data
    }

    pub fn write_data(&mut self, value: u8) {
        // Writes mid-transfer are permitted on hardware but immediately get
        // shifted over by the next bit; we simply let the next tick win.
        self.data = value;
    }

    pub fn read_control(&self) -> u8 {
        let mut result = 0b0111_1110;
        if self.transfer_enabled {
            result |= 0b1000_0000;
        }
        if self.internal_clock {
            result |= 0b0000_0001;
        }
        result
    }

    /// Write to `SC`. Starting a transfer on the internal clock schedules
    /// the first of 8 bit-shifts; the external clock case never completes
    /// since nothing is ever plugged in.
    pub fn write_control(&mut self, value: u8, scheduler: &mut Scheduler) {
        self.internal_clock = value & 0x1 != 0;
        let start = value & 0x80 != 0;

        if start && self.internal_clock && !self.in_progress {
            self.transfer_enabled = true;
            self.in_progress = true;
            self.bits_remaining = 8;
            scheduler.schedule(SerialBitTransfer, CYCLES_PER_BIT);
        } else if !start {
            self.transfer_enabled = false;
        }
    }

    /// Runs on the scheduled `SerialBitTransfer` event: shifts one bit in
    /// (always 1, since there's no link partner) and out, rescheduling
    /// itself until all 8 bits have gone, at which point the transfer
    /// completes and the serial interrupt fires.
    pub fn tick_transfer(&mut self, scheduler: &mut Scheduler, interrupts: &mut Interrupts) {
        self.data = (self.data << 1) | UNCONNECTED_BIT as u8;
        self.bits_remaining -= 1;

        if self.bits_remaining == 0 {
            self.in_progress = false;
            self.transfer_enabled = false;
            interrupts.insert_interrupt(InterruptFlags::SERIAL);
        } else {
            scheduler.schedule(SerialBitTransfer, CYCLES_PER_BIT);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_completes_after_eight_bits() {
        let mut scheduler = Scheduler::new();
        let mut interrupts = Interrupts::default();
        let mut serial = SerialPort::default();

        serial.write_data(0x42);
        serial.write_control(0x81, &mut scheduler);
        assert!(serial.in_progress);

        for _ in 0..8 {
            serial.tick_transfer(&mut scheduler, &mut interrupts);
        }

        assert!(!serial.in_progress);
        assert!(interrupts.interrupt_flag.contains(InterruptFlags::SERIAL));
    }

    #[test]
    fn control_reads_back_unused_bits_as_set() {
        let serial = SerialPort::default();
        assert_eq!(serial.read_control() & 0b0111_1110, 0b0111_1110);
    }
}
