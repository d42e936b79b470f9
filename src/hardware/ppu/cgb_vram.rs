use bitflags::*;
use crate::hardware::ppu::tiledata::BACKGROUND_TILE_SIZE;
use crate::hardware::ppu::palette::{DisplayColour, RGB};

#[derive(Debug)]
pub struct CgbTileMap {
    pub attributes: [CgbTileAttribute; BACKGROUND_TILE_SIZE],
}

impl CgbTileMap {
    pub fn new() -> Self {
        CgbTileMap { attributes: [CgbTileAttribute::default(); BACKGROUND_TILE_SIZE] }
    }
}

bitflags! {
    #[derive(Default)]
    pub struct CgbTileAttribute: u8 {
        ///BGP 0-7
        const BG_PALETTE_NUMBER = 0b0000_0111;
        ///0=Bank 0, 1=Bank 1
        const TILE_VRAM_BANK_NUMBER = 0b0000_1000;
        /// Purely so that the full byte is transferred.
        const UNUSED = 0b0001_0000;
        /// (0=Normal, 1=Horizontally mirrored)
        const X_FLIP = 0b0010_0000;
        /// (0=Normal, 1=Vertically mirrored)
        const Y_FLIP = 0b0100_0000;
        /// (0=Use OAM priority bit, 1=BG Priority)
        const BG_TO_OAM_PRIORITY = 0b1000_0000;
    }
}

impl CgbTileAttribute {
    /// Returns the BG palette number in the range `0..=7`
    pub fn bg_palette_numb(&self) -> u8 {
        self.bits & 0x7
    }

    pub fn set_bg_palette_numb(&mut self, value: u8) {
        self.bits = (self.bits & 0xF8) | (value & 0x7);
    }
}

/// One colour as it's actually stored in CGB palette RAM: 15-bit RGB555,
/// two bytes little endian, top bit of the high byte unused. The expanded
/// 8-bit-per-channel value is cached in `rgb` and recomputed on every write
/// so rendering never has to redo the 5-to-8 bit expansion per pixel.
#[derive(Copy, Clone, Debug, Default)]
pub struct CgbColour {
    packed: u16,
    pub rgb: RGB,
}

impl CgbColour {
    pub fn get_low_byte(&self) -> u8 {
        (self.packed & 0xFF) as u8
    }

    pub fn get_high_byte(&self) -> u8 {
        (self.packed >> 8) as u8
    }

    pub fn set_low_byte(&mut self, value: u8) {
        self.packed = (self.packed & 0xFF00) | value as u16;
        self.recompute_rgb();
    }

    pub fn set_high_byte(&mut self, value: u8) {
        self.packed = (self.packed & 0x00FF) | ((value as u16) << 8);
        self.recompute_rgb();
    }

    fn recompute_rgb(&mut self) {
        let r = (self.packed & 0x1F) as u8;
        let g = ((self.packed >> 5) & 0x1F) as u8;
        let b = ((self.packed >> 10) & 0x1F) as u8;

        self.rgb = RGB(expand_5_to_8(r), expand_5_to_8(g), expand_5_to_8(b));
    }
}

impl From<RGB> for CgbColour {
    fn from(colour: RGB) -> Self {
        let r = (colour.0 >> 3) as u16;
        let g = (colour.1 >> 3) as u16;
        let b = (colour.2 >> 3) as u16;
        let mut result = CgbColour { packed: r | (g << 5) | (b << 10), rgb: RGB::default() };
        result.recompute_rgb();
        result
    }
}

fn expand_5_to_8(value: u8) -> u8 {
    (value << 3) | (value >> 2)
}

/// One of the 8 CGB background or sprite palettes, 4 colours apiece.
#[derive(Copy, Clone, Debug, Default)]
pub struct CgbPalette {
    pub colours: [CgbColour; 4],
}

impl CgbPalette {
    pub fn colour(&self, colour_value: u8) -> RGB {
        self.colours[(colour_value & 0x3) as usize].rgb
    }

    pub fn rgb(&self) -> [RGB; 4] {
        [self.colours[0].rgb, self.colours[1].rgb, self.colours[2].rgb, self.colours[3].rgb]
    }

    fn from_display_colour(display: DisplayColour) -> Self {
        CgbPalette {
            colours: [
                CgbColour::from(display.white),
                CgbColour::from(display.light_grey),
                CgbColour::from(display.dark_grey),
                CgbColour::from(display.black),
            ],
        }
    }
}

/// `FF68`/`FF6A`: selects which byte of palette RAM the next `FF69`/`FF6B`
/// access targets, with an optional auto-increment after every write.
#[derive(Copy, Clone, Debug, Default)]
pub struct CgbPaletteIndex {
    pub selected_address: usize,
    pub auto_increment: bool,
}

impl CgbPaletteIndex {
    pub fn get_value(&self) -> u8 {
        0x40 | (self.selected_address as u8) | ((self.auto_increment as u8) << 7)
    }

    pub fn set_value(&mut self, value: u8) {
        self.selected_address = (value & 0x3F) as usize;
        self.auto_increment = value & 0x80 != 0;
    }
}

/// Seed the CGB palette RAM from the DMG compatibility palettes, used when
/// running a DMG game on CGB hardware (or CGB boot rom defaults without a
/// cartridge-provided palette).
pub fn initialise_cgb_palette(
    bg_palette: DisplayColour,
    sp0_palette: DisplayColour,
    sp1_palette: DisplayColour,
) -> ([CgbPalette; 8], [CgbPalette; 8]) {
    let mut bg = [CgbPalette::default(); 8];
    let mut sprite = [CgbPalette::default(); 8];

    bg[0] = CgbPalette::from_display_colour(bg_palette);
    sprite[0] = CgbPalette::from_display_colour(sp0_palette);
    sprite[1] = CgbPalette::from_display_colour(sp1_palette);

    (bg, sprite)
}

#[cfg(test)]
mod tests {
    use crate::hardware::ppu::cgb_vram::CgbTileAttribute;

    #[test]
    fn test_palette_numb() {
        let mut attr = CgbTileAttribute::default();

        assert_eq!(attr.bg_palette_numb(), 0);
        attr.set_bg_palette_numb(3);
        assert_eq!(attr.bg_palette_numb(), 3);
        attr.set_bg_palette_numb(7);
        assert_eq!(attr.bg_palette_numb(), 7);
        attr.set_bg_palette_numb(15);
        assert_eq!(attr.bg_palette_numb(), 7);
    }
}

