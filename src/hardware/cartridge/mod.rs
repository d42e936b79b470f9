//! Cartridge header parsing plus the various memory bank controllers found
//! on real cartridges.
use std::fmt;

use crate::error::CoreError;
use crate::hardware::cartridge::camera::PocketCamera;
use crate::hardware::cartridge::header::{CartridgeHeader, MapperKind};
use crate::hardware::cartridge::huc::{HuC1, HuC3};
use crate::hardware::cartridge::m161::M161;
use crate::hardware::cartridge::mbc::RomOnly;
use crate::hardware::cartridge::mbc1::Mbc1;
use crate::hardware::cartridge::mbc2::Mbc2;
use crate::hardware::cartridge::mbc3::Mbc3;
use crate::hardware::cartridge::mbc5::Mbc5;
use crate::hardware::cartridge::mbc7::Mbc7;

mod camera;
mod header;
mod huc;
mod m161;
mod mbc;
mod mbc1;
mod mbc2;
mod mbc3;
mod mbc5;
mod mbc7;

pub use header::{CartridgeType, HEADER_END, HEADER_START};

/// Shared interface every memory bank controller implements, dispatched
/// through a `Box<dyn MBC>` held by [`Cartridge`].
pub trait MBC {
    /// Read from `0x0000..=0x3FFF`.
    fn read_rom_low(&self, address: u16) -> u8;
    /// Read from `0x4000..=0x7FFF`.
    fn read_rom_high(&self, address: u16) -> u8;
    /// Read from `0xA000..=0xBFFF`.
    fn read_ram(&self, address: u16) -> u8;
    /// Write to any address in `0x0000..=0x7FFF` or `0xA000..=0xBFFF`.
    fn write(&mut self, address: u16, value: u8);
    /// The contents that should be persisted to disk for a battery-backed
    /// cartridge, or `None` if this cartridge has no battery.
    fn battery_ram(&self) -> Option<&[u8]>;
    /// Advance any onboard peripheral (RTC, camera shutter, ...) by the
    /// given number of T-cycles. Most mappers have nothing to do here.
    fn tick(&mut self, cycles: u64) {
        let _ = cycles;
    }
}

pub struct Cartridge {
    header: CartridgeHeader,
    mbc: Box<dyn MBC>,
}

impl Cartridge {
    pub fn new(rom: &[u8], saved_ram: Option<Vec<u8>>) -> Result<Self, CoreError> {
        let header = CartridgeHeader::new(rom)?;
        let ty = header.cartridge_type;
        let rom = rom.to_vec();

        let mbc: Box<dyn MBC> = match ty.mapper {
            MapperKind::Rom => Box::new(RomOnly::new(rom, ty.has_ram, saved_ram)),
            MapperKind::Mbc1 => Box::new(Mbc1::new(rom, header.ram_size, ty.has_battery, header.is_multicart, saved_ram)),
            MapperKind::Mbc2 => Box::new(Mbc2::new(rom, ty.has_battery, saved_ram)),
            MapperKind::Mbc3 => Box::new(Mbc3::new(rom, ty.has_battery, ty.has_timer, header.ram_size, saved_ram)),
            MapperKind::Mbc5 => Box::new(Mbc5::new(rom, header.ram_size, ty.has_battery, ty.has_rumble, saved_ram)),
            MapperKind::Mbc7 => Box::new(Mbc7::new(rom, saved_ram)),
            MapperKind::HuC1 => Box::new(HuC1::new(rom, header.ram_size, ty.has_battery, saved_ram)),
            MapperKind::HuC3 => Box::new(HuC3::new(rom, header.ram_size, saved_ram)),
            MapperKind::PocketCamera => Box::new(PocketCamera::new(rom, ty.has_battery, saved_ram)),
            MapperKind::M161 => Box::new(M161::new(rom)),
        };

        Ok(Cartridge { header, mbc })
    }

    pub fn cartridge_header(&self) -> &CartridgeHeader {
        &self.header
    }

    pub fn read_0000_3fff(&self, address: u16) -> u8 {
        self.mbc.read_rom_low(address)
    }

    pub fn read_4000_7fff(&self, address: u16) -> u8 {
        self.mbc.read_rom_high(address)
    }

    pub fn read_external_ram(&self, address: u16) -> u8 {
        self.mbc.read_ram(address)
    }

    pub fn write_byte(&mut self, address: u16, value: u8) {
        self.mbc.write(address, value);
    }

    /// Contents to persist for a battery-backed save, if this cartridge has one.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.mbc.battery_ram()
    }

    pub fn tick(&mut self, cycles: u64) {
        self.mbc.tick(cycles);
    }
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cartridge {{ header: {:?} }}", self.header)
    }
}
