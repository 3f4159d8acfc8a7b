//! # Symbols Module
//!
//! Container import readers, one per supported format. Each reader returns the
//! raw import records of a binary exactly as stored in its tables; names are
//! normalized later by [`crate::imphash::normalize`].

use crate::error::Result;
use crate::formats::Format;

pub mod elf;
pub mod macho;
pub mod pe;
pub mod types;

pub use types::{ElfImport, MachOImports, RawImports};

/// Read the raw imports of `data` using the reader for `format`.
pub fn read_raw_imports(data: &[u8], format: Format) -> Result<RawImports> {
    let _span = tracing::debug_span!("read_raw_imports", %format, size = data.len()).entered();
    Ok(match format {
        Format::Pe => RawImports::Pe(pe::read_imports(data)?),
        Format::Elf => RawImports::Elf(elf::read_imports(data)?),
        Format::MachO => RawImports::MachO(macho::read_imports(data)?),
        Format::FatMachO => RawImports::FatMachO(macho::read_fat_imports(data)?),
    })
}
