//! Shared constants and the read-only ROM mapper (cartridge type 0x00).
use crate::hardware::cartridge::MBC;
use crate::hardware::mmu::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, INVALID_READ};

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const EXTERNAL_RAM_SIZE: usize = 0x2000;

/// No mapper at all: the cartridge is at most 32 KiB ROM plus an optional
/// single 8 KiB RAM bank, neither of which is ever banked.
pub struct RomOnly {
    rom: Vec<u8>,
    ram: Vec<u8>,
}

impl RomOnly {
    pub fn new(rom: Vec<u8>, has_ram: bool, saved_ram: Option<Vec<u8>>) -> Self {
        let ram = saved_ram.unwrap_or_else(|| vec![INVALID_READ; if has_ram { EXTERNAL_RAM_SIZE } else { 0 }]);
        RomOnly { rom, ram }
    }
}

impl MBC for RomOnly {
    fn read_rom_low(&self, address: u16) -> u8 {
        self.rom.get(address as usize).copied().unwrap_or(INVALID_READ)
    }

    fn read_rom_high(&self, address: u16) -> u8 {
        self.rom.get(address as usize).copied().unwrap_or(INVALID_READ)
    }

    fn read_ram(&self, address: u16) -> u8 {
        self.ram
            .get((address - EXTERNAL_RAM_START) as usize)
            .copied()
            .unwrap_or(INVALID_READ)
    }

    fn write(&mut self, address: u16, value: u8) {
        if let EXTERNAL_RAM_START..=EXTERNAL_RAM_END = address {
            if let Some(slot) = self.ram.get_mut((address - EXTERNAL_RAM_START) as usize) {
                *slot = value;
            }
        }
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        None
    }
}
