//! The top level façade tying the CPU, memory bus, and peripherals together
//! into a runnable Game Boy.
use nanoserde::{DeBin, SerBin};

use crate::error::{CoreError, CoreResult};
use crate::hardware::cpu::CPU;
use crate::hardware::mmu::{Memory, MemoryMapper};
use crate::hardware::ppu::palette::DmgColor;
use crate::hardware::ppu::FRAMEBUFFER_SIZE;
use crate::io::joypad::InputKey;
use crate::EmulatorOptions;

/// The amount of T-cycles it takes the PPU to render a complete frame.
pub const CYCLES_PER_FRAME: u32 = 70224;
/// The unshifted (single speed) clock speed of a DMG, in Hz.
pub const DMG_CLOCK_SPEED: u64 = 4_194_304;
/// Version tag stamped into every [`SaveState`], bumped whenever the layout changes.
pub const SAVE_STATE_VERSION: u32 = 1;

/// Whether this instance is running as a monochrome DMG/SGB or a Color GBC.
///
/// Several pieces of hardware (the APU's channel reset behaviour, the PPU's palette
/// handling, CPU double speed) behave differently depending on this.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum EmulatorMode {
    DMG,
    CGB,
}

impl EmulatorMode {
    pub fn is_dmg(&self) -> bool {
        *self == EmulatorMode::DMG
    }

    pub fn is_cgb(&self) -> bool {
        *self == EmulatorMode::CGB
    }
}

impl Default for EmulatorMode {
    fn default() -> Self {
        EmulatorMode::DMG
    }
}

/// A single, runnable Game Boy. Owns the CPU (which in turn owns the full memory bus,
/// PPU, APU, and cartridge) and drives it one frame at a time.
pub struct Emulator {
    pub(crate) cpu: CPU<Memory>,
}

impl Emulator {
    /// Construct a new `Emulator` for the provided ROM.
    ///
    /// `options.emulator_mode` is only a request: if the cartridge header doesn't
    /// advertise CGB support the emulator will fall back to DMG regardless.
    pub fn new(rom: &[u8], options: EmulatorOptions) -> CoreResult<Self> {
        let mmu = Memory::new(rom, options)?;
        Ok(Emulator { cpu: CPU::new(mmu) })
    }

    /// Run the emulator until a full frame (one VBlank) has been produced.
    ///
    /// Returns once `self.frame_buffer()` holds a complete, freshly rendered frame.
    pub fn emulate_frame(&mut self) {
        loop {
            self.cpu.step_cycle();
            if self.cpu.added_vblank() {
                break;
            }
        }
    }

    /// Advance by exactly one CPU instruction (and any interrupt dispatch that
    /// instruction triggers). Useful for debuggers and step-by-step tooling.
    pub fn step(&mut self) {
        self.cpu.step_cycle();
    }

    pub fn frame_buffer(&self) -> &[DmgColor; FRAMEBUFFER_SIZE] {
        self.cpu.mmu.ppu.frame_buffer()
    }

    /// Samples accumulated since the last call to [`Emulator::clear_audio_buffer`],
    /// interleaved stereo `f32` in `[-1.0, 1.0]`.
    pub fn audio_buffer(&self) -> &[f32] {
        self.cpu.mmu.apu.get_audio_buffer()
    }

    pub fn clear_audio_buffer(&mut self) {
        self.cpu.mmu.apu.clear_audio_buffer();
    }

    /// Configure how many samples the APU should produce per second. Defaults to
    /// a value tuned for ~44100 Hz.
    pub fn set_audio_sample_rate(&mut self, sample_rate_in_hz: u64) {
        self.cpu.mmu.apu.set_sample_rate(sample_rate_in_hz);
    }

    pub fn press_key(&mut self, key: InputKey) {
        self.cpu.mmu.joypad_register.press_key(key, &mut self.cpu.mmu.interrupts);
    }

    pub fn release_key(&mut self, key: InputKey) {
        self.cpu.mmu.joypad_register.release_key(key, &mut self.cpu.mmu.interrupts);
    }

    pub fn emulator_mode(&self) -> EmulatorMode {
        self.cpu.mmu.get_mode()
    }

    /// The battery-backed save RAM for the current cartridge, if it has any,
    /// intended to be persisted to disk by the consumer between sessions.
    pub fn battery_ram(&self) -> Option<&[u8]> {
        self.cpu.mmu.cartridge().and_then(|cart| cart.battery_ram())
    }

    /// Serialise the current machine state into a versioned binary blob.
    ///
    /// This does *not* cover cartridge-internal banking/RTC registers - see the
    /// save-state notes in `DESIGN.md`.
    pub fn save_state(&self) -> Vec<u8> {
        SaveState::from_emulator(self).serialize_bin()
    }

    /// Restore a machine state previously produced by [`Emulator::save_state`].
    pub fn load_state(&mut self, data: &[u8]) -> CoreResult<()> {
        let state =
            SaveState::deserialize_bin(data).map_err(|e| CoreError::SaveStateCorrupt(e.to_string()))?;

        if state.version != SAVE_STATE_VERSION {
            return Err(CoreError::SaveStateVersionMismatch {
                found: state.version,
                expected: SAVE_STATE_VERSION,
            });
        }

        state.apply_to_emulator(self);
        Ok(())
    }
}

/// A flat, versioned snapshot of everything needed to resume emulation.
///
/// Deliberately a plain DTO rather than deriving `SerBin`/`DeBin` directly on the
/// live hardware structs: those hold private fields, trait objects (`Box<dyn MBC>`),
/// and scheduler-internal bookkeeping that isn't meaningful to persist verbatim.
#[derive(Clone, SerBin, DeBin)]
struct SaveState {
    version: u32,
    registers: SavedRegisters,
    ime: bool,
    halted: bool,
    had_vblank: bool,
    wram: Vec<u8>,
    hram: Vec<u8>,
    vram: Vec<u8>,
    oam: Vec<u8>,
    interrupt_enable: u8,
    interrupt_flag: u8,
    cartridge_ram: Vec<u8>,
    double_speed: bool,
    prepare_speed_switch: u8,
}

#[derive(Clone, SerBin, DeBin)]
struct SavedRegisters {
    a: u8,
    f: u8,
    b: u8,
    c: u8,
    d: u8,
    e: u8,
    h: u8,
    l: u8,
    sp: u16,
    pc: u16,
}

impl SaveState {
    fn from_emulator(emu: &Emulator) -> Self {
        let regs = emu.cpu.registers();
        let mmu = &emu.cpu.mmu;

        let vram = (0x8000..=0x9FFFu16).map(|a| mmu.read_byte(a)).collect();
        let oam = (0xFE00..=0xFE9Fu16).map(|a| mmu.read_byte(a)).collect();
        let wram = (0xC000..=0xDFFFu16).map(|a| mmu.read_byte(a)).collect();
        let hram = (0xFF80..=0xFFFEu16).map(|a| mmu.read_byte(a)).collect();

        SaveState {
            version: SAVE_STATE_VERSION,
            registers: SavedRegisters {
                a: regs.a,
                f: regs.f.bits(),
                b: regs.b,
                c: regs.c,
                d: regs.d,
                e: regs.e,
                h: regs.h,
                l: regs.l,
                sp: regs.sp,
                pc: regs.pc,
            },
            ime: emu.cpu.ime,
            halted: emu.cpu.halted,
            had_vblank: emu.cpu.had_vblank,
            wram,
            hram,
            vram,
            oam,
            interrupt_enable: mmu.interrupts().read_ie(),
            interrupt_flag: mmu.interrupts().read_if(),
            cartridge_ram: mmu.cartridge().and_then(|c| c.battery_ram()).map(|r| r.to_vec()).unwrap_or_default(),
            double_speed: mmu.cgb_data.double_speed,
            prepare_speed_switch: mmu.cgb_data.prepare_speed_switch,
        }
    }

    fn apply_to_emulator(&self, emu: &mut Emulator) {
        {
            let regs = emu.cpu.registers_mut();
            regs.a = self.registers.a;
            regs.f = crate::hardware::registers::Flags::from_bits_truncate(self.registers.f);
            regs.b = self.registers.b;
            regs.c = self.registers.c;
            regs.d = self.registers.d;
            regs.e = self.registers.e;
            regs.h = self.registers.h;
            regs.l = self.registers.l;
            regs.sp = self.registers.sp;
            regs.pc = self.registers.pc;
        }
        emu.cpu.ime = self.ime;
        emu.cpu.halted = self.halted;
        emu.cpu.had_vblank = self.had_vblank;

        let mmu = &mut emu.cpu.mmu;
        for (i, addr) in (0xC000..=0xDFFFu16).enumerate() {
            mmu.write_byte(addr, self.wram[i]);
        }
        for (i, addr) in (0xFF80..=0xFFFEu16).enumerate() {
            mmu.write_byte(addr, self.hram[i]);
        }
        for (i, addr) in (0x8000..=0x9FFFu16).enumerate() {
            mmu.write_byte(addr, self.vram[i]);
        }
        for (i, addr) in (0xFE00..=0xFE9Fu16).enumerate() {
            mmu.write_byte(addr, self.oam[i]);
        }
        mmu.interrupts_mut().overwrite_ie(self.interrupt_enable);
        mmu.interrupts_mut().overwrite_if(self.interrupt_flag);
        mmu.cgb_data.double_speed = self.double_speed;
        mmu.cgb_data.prepare_speed_switch = self.prepare_speed_switch;
    }
}
