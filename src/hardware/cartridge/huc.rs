//! HuC1 and HuC3: MBC1-alike banking from Hudson Soft, differing only in
//! what sits behind the RAM-enable gate — an infrared port for HuC1, or a
//! small real-time clock for HuC3.
use crate::hardware::cartridge::mbc::EXTERNAL_RAM_SIZE;
use crate::hardware::cartridge::MBC;
use crate::hardware::mmu::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, INVALID_READ};

pub struct HuC1 {
    ram_and_ir_enabled: bool,
    rom_bank: u8,
    ram_bank: u8,
    has_battery: bool,
    rom_banks: usize,
    rom: Vec<u8>,
    ram: Vec<u8>,
    /// The IR LED is write-only from the cartridge's perspective; reading
    /// back returns whether the receive diode currently sees light.
    ir_receiving: bool,
}

impl HuC1 {
    pub fn new(rom: Vec<u8>, ram_size: usize, has_battery: bool, saved_ram: Option<Vec<u8>>) -> Self {
        let rom_banks = (rom.len() / super::mbc::ROM_BANK_SIZE).max(1);
        let ram = saved_ram.unwrap_or_else(|| vec![INVALID_READ; ram_size.max(EXTERNAL_RAM_SIZE)]);
        HuC1 {
            ram_and_ir_enabled: false,
            rom_bank: 1,
            ram_bank: 0,
            has_battery,
            rom_banks,
            rom,
            ram,
            ir_receiving: false,
        }
    }

    fn selects_ir(&self) -> bool {
        self.ram_bank >= 0xE
    }
}

impl MBC for HuC1 {
    fn read_rom_low(&self, address: u16) -> u8 {
        self.rom.get(address as usize).copied().unwrap_or(INVALID_READ)
    }

    fn read_rom_high(&self, address: u16) -> u8 {
        let bank = self.rom_bank.max(1) as usize % self.rom_banks.max(1);
        let offset = bank * super::mbc::ROM_BANK_SIZE + (address - 0x4000) as usize;
        self.rom.get(offset).copied().unwrap_or(INVALID_READ)
    }

    fn read_ram(&self, address: u16) -> u8 {
        if !self.ram_and_ir_enabled {
            return INVALID_READ;
        }
        if self.selects_ir() {
            if self.ir_receiving { 0xC0 } else { 0xC1 }
        } else {
            let offset = (self.ram_bank & 0x3) as usize * EXTERNAL_RAM_SIZE + (address - EXTERNAL_RAM_START) as usize;
            self.ram.get(offset).copied().unwrap_or(INVALID_READ)
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram_and_ir_enabled = (value & 0xF) == 0xA || (value & 0xF) == 0xE,
            0x2000..=0x3FFF => self.rom_bank = value & 0x3F,
            0x4000..=0x5FFF => self.ram_bank = value & 0xF,
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if !self.ram_and_ir_enabled {
                    return;
                }
                if self.selects_ir() {
                    self.ir_receiving = value & 0x1 != 0;
                } else {
                    let offset = (self.ram_bank & 0x3) as usize * EXTERNAL_RAM_SIZE + (address - EXTERNAL_RAM_START) as usize;
                    if let Some(slot) = self.ram.get_mut(offset) {
                        *slot = value;
                    }
                }
            }
            _ => {}
        }
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        self.has_battery.then(|| self.ram.as_slice())
    }
}

/// HuC3: same banking scheme, but the RAM-bank-select range 0xE/0xB engages
/// a small RTC instead of an IR port. Shares MBC3's second-granularity model.
pub struct HuC3 {
    ram_and_rtc_enabled: bool,
    rom_bank: u8,
    ram_bank: u8,
    rom_banks: usize,
    rom: Vec<u8>,
    ram: Vec<u8>,
    rtc_seconds: u32,
    residual_cycles: u64,
}

const CYCLES_PER_SECOND: u64 = 4_194_304;

impl HuC3 {
    pub fn new(rom: Vec<u8>, ram_size: usize, saved_ram: Option<Vec<u8>>) -> Self {
        let rom_banks = (rom.len() / super::mbc::ROM_BANK_SIZE).max(1);
        let ram = saved_ram.unwrap_or_else(|| vec![INVALID_READ; ram_size.max(EXTERNAL_RAM_SIZE)]);
        HuC3 {
            ram_and_rtc_enabled: false,
            rom_bank: 1,
            ram_bank: 0,
            rom_banks,
            rom,
            ram,
            rtc_seconds: 0,
            residual_cycles: 0,
        }
    }

    fn selects_rtc(&self) -> bool {
        self.ram_bank >= 0xB
    }

    pub fn tick(&mut self, cycles: u64) {
        self.residual_cycles += cycles;
        while self.residual_cycles >= CYCLES_PER_SECOND {
            self.residual_cycles -= CYCLES_PER_SECOND;
            self.rtc_seconds = self.rtc_seconds.wrapping_add(1);
        }
    }
}

impl MBC for HuC3 {
    fn read_rom_low(&self, address: u16) -> u8 {
        self.rom.get(address as usize).copied().unwrap_or(INVALID_READ)
    }

    fn read_rom_high(&self, address: u16) -> u8 {
        let bank = self.rom_bank.max(1) as usize % self.rom_banks.max(1);
        let offset = bank * super::mbc::ROM_BANK_SIZE + (address - 0x4000) as usize;
        self.rom.get(offset).copied().unwrap_or(INVALID_READ)
    }

    fn read_ram(&self, address: u16) -> u8 {
        if !self.ram_and_rtc_enabled {
            return INVALID_READ;
        }
        if self.selects_rtc() {
            (self.rtc_seconds & 0xF) as u8
        } else {
            let offset = (self.ram_bank & 0x3) as usize * EXTERNAL_RAM_SIZE + (address - EXTERNAL_RAM_START) as usize;
            self.ram.get(offset).copied().unwrap_or(INVALID_READ)
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram_and_rtc_enabled = (value & 0xF) == 0xA || (value & 0xF) == 0xB,
            0x2000..=0x3FFF => self.rom_bank = value & 0x7F,
            0x4000..=0x5FFF => self.ram_bank = value & 0xF,
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if self.ram_and_rtc_enabled && !self.selects_rtc() {
                    let offset = (self.ram_bank & 0x3) as usize * EXTERNAL_RAM_SIZE + (address - EXTERNAL_RAM_START) as usize;
                    if let Some(slot) = self.ram.get_mut(offset) {
                        *slot = value;
                    }
                }
            }
            _ => {}
        }
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        Some(self.ram.as_slice())
    }

    fn tick(&mut self, cycles: u64) {
        HuC3::tick(self, cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_huc1_ir_readback() {
        let rom = vec![0u8; 0x8000];
        let mut mbc = HuC1::new(rom, 0, false, None);
        mbc.write(0x0000, 0x0E);
        mbc.write(0x4000, 0xE);
        mbc.write(0xA000, 0x1);
        assert_eq!(mbc.read_ram(0xA000), 0xC0);
    }

    #[test]
    fn test_huc3_rtc_ticks() {
        let mut rtc = HuC3::new(vec![0u8; 0x8000], 0, None);
        rtc.tick(CYCLES_PER_SECOND * 5);
        assert_eq!(rtc.rtc_seconds, 5);
    }
}
