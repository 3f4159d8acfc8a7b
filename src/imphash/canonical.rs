//! Canonical import string construction.
//!
//! PE and ELF imports are a multimap from library to symbols and serialize as
//! grouped `library.symbol` entries; duplicates are kept. Mach-O imports are a
//! set of bare names. Both orderings are byte-wise.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Separator between entries of the canonical string.
pub const ENTRY_SEPARATOR: &[u8] = b",";
/// Separator between library and symbol in a grouped entry.
pub const GROUP_SEPARATOR: u8 = b'.';

/// Canonical import string.
///
/// Holds the exact bytes of the import names, which need not be UTF-8.
/// Fingerprints are computed over these bytes; `Display` and serialization
/// show invalid sequences as U+FFFD.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ImpString(Vec<u8>);

impl ImpString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Display for ImpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl fmt::Debug for ImpString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.to_string_lossy(), f)
    }
}

impl From<Vec<u8>> for ImpString {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ImpString {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<String> for ImpString {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl From<&str> for ImpString {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl PartialEq<str> for ImpString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for ImpString {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl Serialize for ImpString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

impl<'de> Deserialize<'de> for ImpString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::from)
    }
}

/// Library to symbols multimap for the grouped form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedImports {
    groups: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
}

impl GroupedImports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one symbol under `library`. Duplicates are retained.
    pub fn push(&mut self, library: impl Into<Vec<u8>>, symbol: impl Into<Vec<u8>>) {
        self.groups
            .entry(library.into())
            .or_default()
            .push(symbol.into());
    }

    /// Number of distinct libraries.
    pub fn library_count(&self) -> usize {
        self.groups.len()
    }

    /// Number of `library.symbol` entries, duplicates included.
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Serialize as `lib.sym` entries, libraries then symbols sorted.
    pub fn into_imp_string(self) -> ImpString {
        let mut entries = Vec::with_capacity(self.len());
        for (library, mut symbols) in self.groups {
            symbols.sort();
            for symbol in symbols {
                let mut entry = Vec::with_capacity(library.len() + symbol.len() + 1);
                entry.extend_from_slice(&library);
                entry.push(GROUP_SEPARATOR);
                entry.extend_from_slice(&symbol);
                entries.push(entry);
            }
        }
        ImpString(entries.join(ENTRY_SEPARATOR))
    }
}

/// Deduplicating name set for the flat form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatImports {
    names: BTreeSet<Vec<u8>>,
}

impl FlatImports {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the name was already present.
    pub fn insert(&mut self, name: impl Into<Vec<u8>>) -> bool {
        self.names.insert(name.into())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn into_imp_string(self) -> ImpString {
        let names: Vec<Vec<u8>> = self.names.into_iter().collect();
        ImpString(names.join(ENTRY_SEPARATOR))
    }
}

impl<S: Into<Vec<u8>>> Extend<S> for FlatImports {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for name in iter {
            self.insert(name);
        }
    }
}
