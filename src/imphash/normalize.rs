//! Name normalization for import records.
//!
//! Only PE names are case-folded. ELF and Mach-O names keep their case, so the
//! three families produce distinct fingerprint spaces. Names are raw bytes
//! throughout.

/// Separator between the symbol and library halves of a PE record.
pub const PE_RECORD_SEPARATOR: u8 = b':';

const PE_LIBRARY_SUFFIXES: [&[u8]; 2] = [b".dll", b".sys"];
const ELF_LIBRARY_MARKER: &[u8] = b".so";
const DYLIB_MARKER: &[u8] = b".dylib";

/// Split a PE `symbol:library` record into normalized `(library, symbol)`.
///
/// Returns `None` for records without a separator; such entries are skipped.
pub fn pe_record(record: &[u8]) -> Option<(Vec<u8>, Vec<u8>)> {
    if !record.contains(&PE_RECORD_SEPARATOR) {
        return None;
    }
    let mut parts = record.split(|&b| b == PE_RECORD_SEPARATOR);
    let symbol = parts.next().unwrap_or_default();
    let library = parts.next().unwrap_or_default();
    Some((pe_library(library), fold_case(symbol)))
}

/// Lowercase a DLL name and strip one trailing `.dll`, else `.sys`.
pub fn pe_library(name: &[u8]) -> Vec<u8> {
    let lower = fold_case(name);
    for suffix in PE_LIBRARY_SUFFIXES {
        if let Some(stem) = lower.strip_suffix(suffix) {
            return stem.to_vec();
        }
    }
    lower
}

/// Lowercase `name` one character at a time using simple case mappings.
///
/// Each byte that is not part of valid UTF-8 becomes U+FFFD. Context-free
/// mapping means `İ` folds to `i` and `Σ` to `σ` wherever it appears.
pub fn fold_case(name: &[u8]) -> Vec<u8> {
    if name.is_ascii() {
        return name.to_ascii_lowercase();
    }
    let mut out = String::with_capacity(name.len());
    let mut rest = name;
    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                push_lowercase(&mut out, valid);
                break;
            }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                push_lowercase(&mut out, std::str::from_utf8(valid).unwrap_or_default());
                let invalid = e.error_len().unwrap_or(after.len());
                out.extend(std::iter::repeat(char::REPLACEMENT_CHARACTER).take(invalid));
                rest = &after[invalid..];
            }
        }
    }
    out.into_bytes()
}

fn push_lowercase(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            // The only character whose full lowercase mapping is two characters
            '\u{130}' => out.push('i'),
            c => out.extend(c.to_lowercase()),
        }
    }
}

/// Truncate an ELF library name at its first `.so`.
///
/// The marker matches anywhere after the first byte, not only as a suffix:
/// `libc.so.6` and `libfoo.so2bar` both lose everything from `.so` on.
pub fn elf_library(name: &[u8]) -> &[u8] {
    truncate_at(name, ELF_LIBRARY_MARKER)
}

/// Truncate a Mach-O dylib path at its first `.dylib`.
pub fn macho_library(name: &[u8]) -> &[u8] {
    truncate_at(name, DYLIB_MARKER)
}

fn truncate_at<'a>(name: &'a [u8], marker: &[u8]) -> &'a [u8] {
    match name.windows(marker.len()).position(|w| w == marker) {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}
