//! Raw import records produced by the container readers.
//!
//! These are the readers' output before any normalization: names are the raw
//! bytes stored in the file, in table order, duplicates included.

use serde::{Deserialize, Serialize};

/// One ELF imported symbol and the library that provides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElfImport {
    /// Library file name from the version-needs table, empty when unversioned.
    pub library: Vec<u8>,
    /// Symbol name from the dynamic string table.
    pub name: Vec<u8>,
}

impl ElfImport {
    pub fn new(library: impl Into<Vec<u8>>, name: impl Into<Vec<u8>>) -> Self {
        Self {
            library: library.into(),
            name: name.into(),
        }
    }
}

/// Imported dylib paths and undefined symbol names of one Mach-O image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachOImports {
    pub libraries: Vec<Vec<u8>>,
    pub symbols: Vec<Vec<u8>>,
}

/// Raw imports of one binary, tagged by container family.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RawImports {
    /// `symbol:library` records in import-descriptor order.
    Pe(Vec<Vec<u8>>),
    Elf(Vec<ElfImport>),
    MachO(MachOImports),
    /// One entry per architecture slice, in fat header order.
    FatMachO(Vec<MachOImports>),
}

impl RawImports {
    /// Total number of raw records across all slices.
    pub fn len(&self) -> usize {
        match self {
            RawImports::Pe(records) => records.len(),
            RawImports::Elf(records) => records.len(),
            RawImports::MachO(imports) => imports.libraries.len() + imports.symbols.len(),
            RawImports::FatMachO(slices) => slices
                .iter()
                .map(|s| s.libraries.len() + s.symbols.len())
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
