use bitflags::*;

#[derive(Debug, Copy, Clone, PartialOrd, PartialEq)]
pub enum InterruptKind {
    VBLANK = 0b0000_0001,
    LcdStat = 0b0000_0010,
    TIMER = 0b0000_0100,
    SERIAL = 0b0000_1000,
    JOYPAD = 0b0001_0000,
}

impl InterruptKind {
    pub fn iter() -> impl Iterator<Item = InterruptKind> {
        use crate::io::interrupts::InterruptKind::{LcdStat, JOYPAD, SERIAL, TIMER, VBLANK};
        [VBLANK, LcdStat, TIMER, SERIAL, JOYPAD].iter().copied()
    }
}

#[derive(Default, Debug, Clone)]
pub struct Interrupts {
    pub interrupt_enable: InterruptFlags,
    pub interrupt_flag: InterruptFlags,
}

impl Interrupts {
    pub fn insert_interrupt(&mut self, interrupt: InterruptFlags) {
        self.interrupt_flag.insert(interrupt);
    }

    /// Overwrites the `IE` register, clearing the unused top 3 bits.
    pub fn overwrite_ie(&mut self, value: u8) {
        self.interrupt_enable = InterruptFlags::from_bits_truncate(value);
    }

    /// Overwrites the `IF` register. The unused top bits read back as 1 on
    /// real hardware, which `read_io_byte` is responsible for OR-ing in.
    pub fn overwrite_if(&mut self, value: u8) {
        self.interrupt_flag = InterruptFlags::from_bits_truncate(value);
    }

    pub fn read_ie(&self) -> u8 {
        self.interrupt_enable.bits()
    }

    pub fn read_if(&self) -> u8 {
        self.interrupt_flag.bits()
    }
}

bitflags! {
    #[derive(Default)]
    pub struct InterruptFlags: u8 {
        /// V-Blank
        const VBLANK = 0b0000_0001;
        /// LCD Stat
        const LCD    = 0b0000_0010;
        /// Timer
        const TIMER  = 0b0000_0100;
        /// Serial
        const SERIAL = 0b0000_1000;
        /// Joypad
        const JOYPAD = 0b0001_0000;
        /// Unused, not yet sure if necesarry.
        const UNUSED = 0b1110_0000;
    }
}

impl InterruptFlags {
    pub fn contains_interrupt(&self, interrupt: InterruptKind) -> bool {
        self.contains(InterruptFlags::from_bits_truncate(interrupt as u8))
    }

    pub fn iter() -> impl Iterator<Item = InterruptFlags> {
        [
            InterruptFlags::VBLANK,
            InterruptFlags::LCD,
            InterruptFlags::TIMER,
            InterruptFlags::SERIAL,
            InterruptFlags::JOYPAD,
        ]
        .iter()
        .copied()
    }
}

#[cfg(test)]
mod test {
    use super::InterruptKind;
    use super::InterruptKind::*;

    #[test]
    fn test_interrupt_order() {
        let ordered_array = [VBLANK, LcdStat, TIMER, SERIAL, JOYPAD];
        for (i, interrupt) in InterruptKind::iter().enumerate() {
            assert_eq!(ordered_array[i], interrupt)
        }
    }
}
