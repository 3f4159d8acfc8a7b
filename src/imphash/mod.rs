//! Import hash pipeline.
//!
//! Raw imports are normalized per format family, serialized into a canonical
//! ImpString, then fingerprinted as ImpHash (MD5) and ImpFuzzy (CTPH).

pub mod canonical;
pub mod normalize;

use crate::config::{FuzzyConfig, ImphashConfig};
use crate::error::Result;
use crate::formats::detect_format;
use crate::hashing::md5_digest;
use crate::io::{read_file, IOLimits};
use crate::similarity::fuzzy_hash;
use crate::symbols::{read_raw_imports, ElfImport, MachOImports, RawImports};
pub use canonical::ImpString;

use canonical::{FlatImports, GroupedImports};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Import fingerprint of one binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImpHashResult {
    /// Lowercase hex MD5 of the `imp_string` bytes.
    pub imp_hash: String,
    /// CTPH digest of the `imp_string` bytes, empty when unavailable.
    pub imp_fuzzy: String,
    /// Canonical import string.
    pub imp_string: ImpString,
}

impl ImpHashResult {
    /// Fingerprint an already canonicalized import string.
    pub fn from_imp_string(imp_string: ImpString, fuzzy: &FuzzyConfig) -> Self {
        let imp_hash = md5_digest(imp_string.as_bytes());
        let imp_fuzzy = if fuzzy.enabled {
            match fuzzy_hash(imp_string.as_bytes(), fuzzy.min_input_size) {
                Ok(digest) => digest,
                Err(e) => {
                    debug!(error = %e, "Fuzzy hash unavailable");
                    String::new()
                }
            }
        } else {
            String::new()
        };
        Self {
            imp_hash,
            imp_fuzzy,
            imp_string,
        }
    }
}

fn group_pe(records: &[Vec<u8>]) -> GroupedImports {
    let mut grouped = GroupedImports::new();
    for record in records {
        match normalize::pe_record(record) {
            Some((library, symbol)) => grouped.push(library, symbol),
            None => debug!(
                record = %String::from_utf8_lossy(record),
                "Skipping PE record without separator"
            ),
        }
    }
    grouped
}

fn group_elf(records: &[ElfImport]) -> GroupedImports {
    let mut grouped = GroupedImports::new();
    for record in records {
        grouped.push(normalize::elf_library(&record.library), record.name.as_slice());
    }
    grouped
}

fn collect_macho(imports: &MachOImports, set: &mut FlatImports) {
    set.extend(
        imports
            .libraries
            .iter()
            .map(|lib| normalize::macho_library(lib)),
    );
    set.extend(imports.symbols.iter().map(Vec::as_slice));
}

/// Normalize raw imports and serialize them as the canonical ImpString.
pub fn canonicalize(raw: &RawImports) -> ImpString {
    match raw {
        RawImports::Pe(records) => group_pe(records).into_imp_string(),
        RawImports::Elf(records) => group_elf(records).into_imp_string(),
        RawImports::MachO(imports) => {
            let mut set = FlatImports::new();
            collect_macho(imports, &mut set);
            set.into_imp_string()
        }
        RawImports::FatMachO(slices) => {
            let mut set = FlatImports::new();
            for slice in slices {
                collect_macho(slice, &mut set);
            }
            set.into_imp_string()
        }
    }
}

/// Detect, extract and canonicalize the imports of `data`.
pub fn imp_string_from_bytes(data: &[u8]) -> Result<ImpString> {
    let format = detect_format(data)?;
    let raw = read_raw_imports(data, format)?;
    let imp_string = canonicalize(&raw);
    debug!(
        %format,
        grouped = format.is_grouped(),
        records = raw.len(),
        length = imp_string.len(),
        "Built ImpString"
    );
    Ok(imp_string)
}

/// Compute the import fingerprint of `data` with the default configuration.
pub fn imphash_from_bytes(data: &[u8]) -> Result<ImpHashResult> {
    imphash_from_bytes_with_config(data, &ImphashConfig::default())
}

/// Compute the import fingerprint of `data` under `config`.
pub fn imphash_from_bytes_with_config(
    data: &[u8],
    config: &ImphashConfig,
) -> Result<ImpHashResult> {
    let _span = crate::span_trace!("imphash", size = data.len()).entered();
    let imp_string = imp_string_from_bytes(data)?;
    Ok(ImpHashResult::from_imp_string(imp_string, &config.fuzzy))
}

/// Read `path` under the configured I/O limits and fingerprint it.
pub fn imphash_from_path<P: AsRef<Path>>(path: P, config: &ImphashConfig) -> Result<ImpHashResult> {
    let path = path.as_ref();
    let data = read_file(path, IOLimits::from(&config.io))?;
    debug!(path = %path.display(), size = data.len(), "Read file");
    imphash_from_bytes_with_config(&data, config)
}

/// Fingerprint a hand-built ImpString.
pub fn imphash_from_imp_string(
    imp_string: impl Into<ImpString>,
    fuzzy: &FuzzyConfig,
) -> ImpHashResult {
    ImpHashResult::from_imp_string(imp_string.into(), fuzzy)
}
