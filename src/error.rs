//! The handful of genuinely fallible, host-facing entry points. Everything
//! else in this crate is hardware behavior (unmapped reads return 0xFF,
//! writes to unmapped addresses are dropped) and is never propagated as a
//! `Result` — see the error-handling design notes in the root documentation.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("ROM image is too short to contain a cartridge header ({len} bytes, need at least 0x150)")]
    RomTooShort { len: usize },
    #[error("unrecognised cartridge type byte 0x{0:02X}")]
    UnknownCartridgeType(u8),
    #[error("unrecognised ROM size byte 0x{0:02X}")]
    UnknownRomSize(u8),
    #[error("unrecognised RAM size byte 0x{0:02X}")]
    UnknownRamSize(u8),
    #[error("save state blob failed to deserialize: {0}")]
    SaveStateCorrupt(String),
    #[error("save state blob version {found} is incompatible with the current format version {expected}")]
    SaveStateVersionMismatch { found: u32, expected: u32 },
}

pub type CoreResult<T> = Result<T, CoreError>;
