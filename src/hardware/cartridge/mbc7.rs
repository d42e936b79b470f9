//! MBC7: ROM banking plus an accelerometer and a 93LC56 serial EEPROM,
//! both mapped into the 0xA000-0xBFFF window in place of battery RAM.
use crate::hardware::cartridge::MBC;
use crate::hardware::mmu::{EXTERNAL_RAM_END, EXTERNAL_RAM_START, INVALID_READ};

const EEPROM_WORDS: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum EepromState {
    Idle,
    ReceivingCommand,
    ReadingData { word: u8, bit: u8 },
    WritingData { word: u8, bit: u8, buffer: u16 },
}

struct Eeprom {
    data: Vec<u16>,
    /// Mirrors `data` as little-endian bytes so `battery_ram` can hand out a
    /// borrow without reallocating on every save.
    persisted: Vec<u8>,
    state: EepromState,
    command_bits: u16,
    command_len: u8,
    do_line: bool,
    write_enabled: bool,
}

impl Eeprom {
    fn new(saved: Option<Vec<u8>>) -> Self {
        let data: Vec<u16> = match saved {
            Some(ref bytes) if bytes.len() >= EEPROM_WORDS * 2 => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]))
                .collect(),
            _ => vec![0xFFFF; EEPROM_WORDS],
        };
        let persisted = data.iter().flat_map(|w| w.to_le_bytes()).collect();
        Eeprom {
            data,
            persisted,
            state: EepromState::Idle,
            command_bits: 0,
            command_len: 0,
            do_line: true,
            write_enabled: false,
        }
    }

    fn sync_persisted(&mut self) {
        self.persisted = self.data.iter().flat_map(|w| w.to_le_bytes()).collect();
    }

    /// CS/CLK/DI lines are packed into the low 3 bits; DO is read back on bit 0.
    fn read(&self) -> u16 {
        self.do_line as u16
    }

    fn write(&mut self, value: u16) {
        let clk = value & 0x40 != 0;
        let cs = value & 0x80 != 0;
        let di = value & 0x02 != 0;
        if !cs {
            self.state = EepromState::Idle;
            return;
        }
        if !clk {
            return;
        }
        let mut write_back = false;
        match &mut self.state {
            EepromState::Idle => {
                self.command_bits = di as u16;
                self.command_len = 1;
                self.state = EepromState::ReceivingCommand;
            }
            EepromState::ReceivingCommand => {
                self.command_bits = (self.command_bits << 1) | di as u16;
                self.command_len += 1;
                if self.command_len == 10 {
                    self.dispatch_command();
                }
            }
            EepromState::ReadingData { word, bit } => {
                let value = self.data[*word as usize];
                self.do_line = (value >> (15 - *bit)) & 1 != 0;
                *bit += 1;
                if *bit == 16 {
                    self.state = EepromState::Idle;
                }
            }
            EepromState::WritingData { word, bit, buffer } => {
                *buffer = (*buffer << 1) | di as u16;
                *bit += 1;
                if *bit == 16 {
                    if self.write_enabled {
                        self.data[*word as usize] = *buffer;
                        write_back = true;
                    }
                    self.state = EepromState::Idle;
                }
            }
        }
        if write_back {
            self.sync_persisted();
        }
    }

    fn dispatch_command(&mut self) {
        let opcode = (self.command_bits >> 8) & 0x3;
        let address = (self.command_bits & 0xFF) as u8;
        match opcode {
            0b10 => self.state = EepromState::ReadingData { word: address, bit: 0 },
            0b01 => self.state = EepromState::WritingData { word: address, bit: 0, buffer: 0 },
            0b00 => {
                // Extended opcodes: write-enable/disable, erase-all; identified by the top address bits.
                match address >> 6 {
                    0b11 => self.write_enabled = true,
                    0b00 => self.write_enabled = false,
                    _ => self.state = EepromState::Idle,
                }
                self.state = EepromState::Idle;
            }
            _ => self.state = EepromState::Idle,
        }
    }
}

pub struct Mbc7 {
    rom_bank: u16,
    rom_banks: u16,
    ram_enable_1: bool,
    ram_enable_2: bool,
    rom: Vec<u8>,
    eeprom: Eeprom,
    accel_latched_x: u16,
    accel_latched_y: u16,
    accel_latch_armed: bool,
}

const ACCEL_CENTER: u16 = 0x8000;

impl Mbc7 {
    pub fn new(rom: Vec<u8>, saved_ram: Option<Vec<u8>>) -> Self {
        let rom_banks = (rom.len() / super::mbc::ROM_BANK_SIZE).max(1) as u16;
        Mbc7 {
            rom_bank: 1,
            rom_banks,
            ram_enable_1: false,
            ram_enable_2: false,
            rom,
            eeprom: Eeprom::new(saved_ram),
            accel_latched_x: ACCEL_CENTER,
            accel_latched_y: ACCEL_CENTER,
            accel_latch_armed: false,
        }
    }

    fn ram_unlocked(&self) -> bool {
        self.ram_enable_1 && self.ram_enable_2
    }
}

impl MBC for Mbc7 {
    fn read_rom_low(&self, address: u16) -> u8 {
        self.rom.get(address as usize).copied().unwrap_or(INVALID_READ)
    }

    fn read_rom_high(&self, address: u16) -> u8 {
        let offset = self.rom_bank as usize % self.rom_banks.max(1) as usize * super::mbc::ROM_BANK_SIZE + (address - 0x4000) as usize;
        self.rom.get(offset).copied().unwrap_or(INVALID_READ)
    }

    fn read_ram(&self, address: u16) -> u8 {
        if !self.ram_unlocked() {
            return INVALID_READ;
        }
        match (address - EXTERNAL_RAM_START) / 2 {
            0 => self.accel_latched_x as u8,
            _ if address == 0xA020 => (self.accel_latched_x >> 8) as u8,
            _ if address == 0xA022 => self.accel_latched_y as u8,
            _ if address == 0xA023 => (self.accel_latched_y >> 8) as u8,
            _ if address == 0xA024 => 0,
            _ if address == 0xA080 => self.eeprom.read() as u8,
            _ => INVALID_READ,
        }
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram_enable_1 = (value & 0xF) == 0xA,
            0x2000..=0x3FFF => {
                let bank = (value as u16).max(1);
                self.rom_bank = bank;
            }
            0x4000..=0x5FFF => self.ram_enable_2 = value == 0x40,
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => {
                if !self.ram_unlocked() {
                    return;
                }
                match address {
                    0xA000 => {
                        if value == 0x55 {
                            self.accel_latch_armed = true;
                        } else if value == 0xAA && self.accel_latch_armed {
                            self.accel_latched_x = ACCEL_CENTER;
                            self.accel_latched_y = ACCEL_CENTER;
                            self.accel_latch_armed = false;
                        }
                    }
                    0xA080 => self.eeprom.write(value as u16),
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn battery_ram(&self) -> Option<&[u8]> {
        Some(self.eeprom.persisted.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ram_locked_until_both_enables_set() {
        let rom = vec![0u8; 0x8000];
        let mut mbc = Mbc7::new(rom, None);
        assert_eq!(mbc.read_ram(0xA000), INVALID_READ);
        mbc.write(0x0000, 0x0A);
        mbc.write(0x4000, 0x40);
        assert!(mbc.ram_unlocked());
    }

    #[test]
    fn test_accelerometer_defaults_to_center() {
        let rom = vec![0u8; 0x8000];
        let mbc = Mbc7::new(rom, None);
        assert_eq!(mbc.accel_latched_x, ACCEL_CENTER);
    }
}
