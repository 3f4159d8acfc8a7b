//! Container format detection.
//!
//! Selects one of the four import extraction strategies from the magic bytes
//! at offset 0. Signatures are checked in priority order and the first match
//! wins.

use crate::error::{ImphashError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Two-byte MS-DOS stub magic preceding every PE image.
pub const PE_MAGIC: &[u8] = &[0x4d, 0x5a];
/// ELF identification magic.
pub const ELF_MAGIC: &[u8] = &[0x7f, 0x45, 0x4c, 0x46];
/// Single-architecture Mach-O magic (`MH_MAGIC`, big-endian byte order).
pub const MACHO_MAGIC: &[u8] = &[0xfe, 0xed, 0xfa, 0xce];
/// Universal ("fat") Mach-O magic (`FAT_MAGIC`).
pub const FAT_MACHO_MAGIC: &[u8] = &[0xca, 0xfe, 0xba, 0xbe];

/// The executable container families that carry an import hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Format {
    /// Portable Executable (Windows)
    Pe,
    /// Executable and Linkable Format (Linux, Unix)
    Elf,
    /// Mach Object, single architecture
    MachO,
    /// Mach Object universal binary with one slice per architecture
    FatMachO,
}

impl Format {
    /// Signature table in detection priority order.
    const SIGNATURES: [(&'static [u8], Format); 4] = [
        (PE_MAGIC, Format::Pe),
        (ELF_MAGIC, Format::Elf),
        (MACHO_MAGIC, Format::MachO),
        (FAT_MACHO_MAGIC, Format::FatMachO),
    ];

    /// Whether the canonical string uses grouped `library.symbol` entries.
    ///
    /// PE and ELF group symbols under their library; Mach-O families emit a
    /// flat set of names.
    pub fn is_grouped(&self) -> bool {
        matches!(self, Format::Pe | Format::Elf)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Pe => write!(f, "PE"),
            Format::Elf => write!(f, "ELF"),
            Format::MachO => write!(f, "Mach-O"),
            Format::FatMachO => write!(f, "Fat Mach-O"),
        }
    }
}

/// Detect the container format from the leading bytes of `data`.
pub fn detect_format(data: &[u8]) -> Result<Format> {
    for (magic, format) in Format::SIGNATURES {
        if data.starts_with(magic) {
            debug!(%format, "Detected container format");
            return Ok(format);
        }
    }
    debug!(
        prefix = ?&data[..data.len().min(4)],
        "No container signature matched"
    );
    Err(ImphashError::UnsupportedFormat)
}
