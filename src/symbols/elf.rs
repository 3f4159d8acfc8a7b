//! ELF (Executable and Linkable Format) imported-symbol extraction
//!
//! Imports are the global, undefined entries of `.dynsym`. The providing
//! library comes from the GNU version-needs table: `.gnu.version` holds one
//! version index per dynamic symbol and `.gnu.version_r` maps each index to
//! the file name of the needed library.

use super::types::ElfImport;
use crate::error::{ImphashError, Result};
use crate::formats::Format;
use tracing::{debug, trace};

const SHT_NOBITS: u32 = 8;
const SHT_DYNSYM: u32 = 11;
const SHT_GNU_VERNEED: u32 = 0x6fff_fffe;
const SHT_GNU_VERSYM: u32 = 0x6fff_ffff;
const STB_GLOBAL: u8 = 1;
const SHN_UNDEF: u16 = 0;
const SHN_LORESERVE: u64 = 0xff00;
const SHT_NULL: u32 = 0;
// Version indices 0 and 1 are local/global, not tied to a library
const VER_NDX_FIRST_NEED: usize = 2;
const VERSYM_VERSION: u16 = 0x7fff;

fn read_u16(data: &[u8], off: usize, le: bool) -> Option<u16> {
    let b = data.get(off..off.checked_add(2)?)?;
    Some(if le {
        u16::from_le_bytes([b[0], b[1]])
    } else {
        u16::from_be_bytes([b[0], b[1]])
    })
}
fn read_u32(data: &[u8], off: usize, le: bool) -> Option<u32> {
    let b = data.get(off..off.checked_add(4)?)?;
    Some(if le {
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    } else {
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    })
}
fn read_u64(data: &[u8], off: usize, le: bool) -> Option<u64> {
    let b = data.get(off..off.checked_add(8)?)?;
    Some(if le {
        u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    } else {
        u64::from_be_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
    })
}

/// NUL-terminated string at `start`; empty when out of range or unterminated.
fn c_string(table: &[u8], start: usize) -> Vec<u8> {
    let Some(tail) = table.get(start..) else {
        return Vec::new();
    };
    match tail.iter().position(|&b| b == 0) {
        Some(end) => tail[..end].to_vec(),
        None => Vec::new(),
    }
}

#[derive(Debug, Clone, Copy)]
struct Ident {
    is_64: bool,
    le: bool,
}

#[derive(Debug, Clone, Copy)]
struct Shdr {
    sh_type: u32,
    sh_offset: u64,
    sh_size: u64,
    sh_link: u32,
}

impl Shdr {
    fn data<'a>(&self, file: &'a [u8]) -> Option<&'a [u8]> {
        if self.sh_type == SHT_NOBITS {
            return Some(&[]);
        }
        let start = usize::try_from(self.sh_offset).ok()?;
        let len = usize::try_from(self.sh_size).ok()?;
        file.get(start..start.checked_add(len)?)
    }
}

fn malformed(message: impl Into<String>) -> ImphashError {
    ImphashError::malformed(Format::Elf, message)
}

fn unavailable(message: impl Into<String>) -> ImphashError {
    ImphashError::unavailable(Format::Elf, message)
}

fn parse_ident(data: &[u8]) -> Result<Ident> {
    if data.len() < 16 {
        return Err(malformed("truncated identification block"));
    }
    let is_64 = match data[4] {
        1 => false,
        2 => true,
        other => return Err(malformed(format!("unknown ELF class {}", other))),
    };
    let le = match data[5] {
        1 => true,
        2 => false,
        other => return Err(malformed(format!("unknown ELF data encoding {}", other))),
    };
    if data[6] != 1 {
        return Err(malformed(format!("unknown ELF version {}", data[6])));
    }
    Ok(Ident { is_64, le })
}

fn parse_sections(data: &[u8], id: Ident) -> Result<Vec<Shdr>> {
    let le = id.le;
    let (header_size, min_shentsize) = if id.is_64 { (64, 64) } else { (52, 40) };
    if data.len() < header_size {
        return Err(malformed("truncated file header"));
    }
    let (e_shoff, e_shentsize, e_shnum) = if id.is_64 {
        (
            read_u64(data, 0x28, le).unwrap_or(0),
            read_u16(data, 0x3a, le).unwrap_or(0),
            read_u16(data, 0x3c, le).unwrap_or(0),
        )
    } else {
        (
            read_u32(data, 0x20, le).unwrap_or(0) as u64,
            read_u16(data, 0x2e, le).unwrap_or(0),
            read_u16(data, 0x30, le).unwrap_or(0),
        )
    };
    if e_shoff == 0 {
        if e_shnum != 0 {
            return Err(malformed("section count without a section header table"));
        }
        return Ok(Vec::new());
    }
    let shentsize = e_shentsize as usize;
    if shentsize < min_shentsize {
        return Err(malformed(format!(
            "section header entry size {} is too small",
            shentsize
        )));
    }
    let shoff =
        usize::try_from(e_shoff).map_err(|_| malformed("section header offset overflow"))?;

    // A zero e_shnum with a section table means the count lives in section 0
    let shnum = if e_shnum == 0 {
        let first = read_shdr(data, shoff, id)
            .ok_or_else(|| malformed("initial section header extends past end of file"))?;
        if first.sh_type != SHT_NULL {
            return Err(malformed("invalid type of the initial section"));
        }
        if first.sh_size < SHN_LORESERVE {
            return Err(malformed("invalid section count in initial section"));
        }
        usize::try_from(first.sh_size).map_err(|_| malformed("section count overflow"))?
    } else {
        e_shnum as usize
    };

    let table_end = shentsize
        .checked_mul(shnum)
        .and_then(|len| shoff.checked_add(len));
    if !matches!(table_end, Some(end) if end <= data.len()) {
        return Err(malformed("section header table extends past end of file"));
    }

    let shdrs = (0..shnum)
        .filter_map(|i| read_shdr(data, shoff + i * shentsize, id))
        .collect();
    Ok(shdrs)
}

fn read_shdr(data: &[u8], off: usize, id: Ident) -> Option<Shdr> {
    let le = id.le;
    if id.is_64 {
        Some(Shdr {
            sh_type: read_u32(data, off.checked_add(4)?, le)?,
            sh_offset: read_u64(data, off.checked_add(24)?, le)?,
            sh_size: read_u64(data, off.checked_add(32)?, le)?,
            sh_link: read_u32(data, off.checked_add(40)?, le)?,
        })
    } else {
        Some(Shdr {
            sh_type: read_u32(data, off.checked_add(4)?, le)?,
            sh_offset: read_u32(data, off.checked_add(16)?, le)? as u64,
            sh_size: read_u32(data, off.checked_add(20)?, le)? as u64,
            sh_link: read_u32(data, off.checked_add(24)?, le)?,
        })
    }
}

/// Library file names indexed by GNU symbol version.
struct VersionNeeds<'a> {
    libraries: Vec<Vec<u8>>,
    versym: &'a [u8],
    le: bool,
}

impl<'a> VersionNeeds<'a> {
    /// Both `.gnu.version_r` and `.gnu.version` must be present.
    fn parse(
        data: &'a [u8],
        shdrs: &[Shdr],
        strtab: &[u8],
        le: bool,
    ) -> Option<VersionNeeds<'a>> {
        let verneed = shdrs.iter().find(|s| s.sh_type == SHT_GNU_VERNEED)?;
        let d = verneed.data(data).unwrap_or(&[]);

        let mut libraries: Vec<Vec<u8>> = Vec::new();
        let mut i = 0usize;
        loop {
            if i.saturating_add(16) > d.len() {
                break;
            }
            if read_u16(d, i, le) != Some(1) {
                break;
            }
            let cnt = read_u16(d, i + 2, le).unwrap_or(0);
            let file_off = read_u32(d, i + 4, le).unwrap_or(0) as usize;
            let aux = read_u32(d, i + 8, le).unwrap_or(0) as usize;
            let next = read_u32(d, i + 12, le).unwrap_or(0) as usize;
            let file = c_string(strtab, file_off);

            let mut j = i.saturating_add(aux);
            for _ in 0..cnt {
                if j.saturating_add(16) > d.len() {
                    break;
                }
                let other = read_u16(d, j + 6, le).unwrap_or(0) as usize;
                let aux_next = read_u32(d, j + 12, le).unwrap_or(0) as usize;
                if other >= libraries.len() {
                    libraries.resize(other + 1, Vec::new());
                }
                libraries[other] = file.clone();
                if aux_next == 0 {
                    break;
                }
                j = j.saturating_add(aux_next);
            }

            if next == 0 {
                break;
            }
            i = i.saturating_add(next);
        }

        let versym_shdr = shdrs.iter().find(|s| s.sh_type == SHT_GNU_VERSYM)?;
        let versym = versym_shdr.data(data).unwrap_or(&[]);
        Some(VersionNeeds {
            libraries,
            versym,
            le,
        })
    }

    /// Library needed by the dynamic symbol at `index`, when versioned.
    fn library(&self, index: usize) -> Option<&[u8]> {
        let raw = read_u16(self.versym, index.checked_mul(2)?, self.le)?;
        let ndx = (raw & VERSYM_VERSION) as usize;
        if ndx < VER_NDX_FIRST_NEED {
            return None;
        }
        self.libraries.get(ndx).map(Vec::as_slice)
    }
}

/// Read every imported dynamic symbol and its providing library.
pub fn read_imports(data: &[u8]) -> Result<Vec<ElfImport>> {
    let id = parse_ident(data)?;
    let shdrs = parse_sections(data, id)?;
    let le = id.le;

    let dynsym = shdrs
        .iter()
        .find(|s| s.sh_type == SHT_DYNSYM)
        .ok_or_else(|| unavailable("no dynamic symbol section"))?;
    let symdata = dynsym
        .data(data)
        .ok_or_else(|| unavailable("dynamic symbol table extends past end of file"))?;
    let entsize = if id.is_64 { 24 } else { 16 };
    if symdata.is_empty() {
        return Err(unavailable("dynamic symbol table is empty"));
    }
    if symdata.len() % entsize != 0 {
        return Err(unavailable(
            "dynamic symbol table size is not a multiple of the entry size",
        ));
    }
    let link = dynsym.sh_link as usize;
    if link == 0 || link >= shdrs.len() {
        return Err(unavailable("dynamic symbol table has an invalid string table link"));
    }
    let strtab = shdrs[link]
        .data(data)
        .ok_or_else(|| unavailable("dynamic string table extends past end of file"))?;

    let versions = VersionNeeds::parse(data, &shdrs, strtab, le);
    if versions.is_none() {
        debug!("No GNU version tables; imports carry no library");
    }

    let mut imports = Vec::new();
    // Entry 0 is the reserved null symbol
    for (index, entry) in symdata.chunks_exact(entsize).enumerate().skip(1) {
        let (st_name, st_info, st_shndx) = if id.is_64 {
            (
                read_u32(entry, 0, le).unwrap_or(0),
                entry[4],
                read_u16(entry, 6, le).unwrap_or(0),
            )
        } else {
            (
                read_u32(entry, 0, le).unwrap_or(0),
                entry[12],
                read_u16(entry, 14, le).unwrap_or(0),
            )
        };
        if st_info >> 4 != STB_GLOBAL || st_shndx != SHN_UNDEF {
            continue;
        }
        let name = c_string(strtab, st_name as usize);
        let library = versions
            .as_ref()
            .and_then(|v| v.library(index))
            .unwrap_or_default();
        trace!(
            library = %String::from_utf8_lossy(library),
            symbol = %String::from_utf8_lossy(&name),
            "ELF import"
        );
        imports.push(ElfImport::new(library, name));
    }
    debug!(count = imports.len(), "Read ELF imported symbols");
    Ok(imports)
}
