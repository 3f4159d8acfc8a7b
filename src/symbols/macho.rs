//! Mach-O and universal (fat) Mach-O import extraction

use super::types::MachOImports;
use crate::error::{ImphashError, Result};
use crate::formats::Format;
use std::collections::HashSet;
use tracing::{debug, trace};

const MH_MAGIC: u32 = 0xfeedface;
const MH_MAGIC_64: u32 = 0xfeedfacf;
const FAT_MAGIC: u32 = 0xcafebabe;

const LC_SYMTAB: u32 = 0x2;
const LC_DYSYMTAB: u32 = 0xb;
const LC_LOAD_DYLIB: u32 = 0xc;

const DYLIB_COMMAND_SIZE: usize = 24;
const SYMTAB_COMMAND_SIZE: usize = 24;
const DYSYMTAB_COMMAND_SIZE: usize = 80;
const FAT_ARCH_SIZE: usize = 20;

fn read_u32(data: &[u8], off: usize, le: bool) -> Option<u32> {
    let b = data.get(off..off.checked_add(4)?)?;
    Some(if le {
        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
    } else {
        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
    })
}

/// Bytes up to the first NUL, or the whole slice when unterminated.
fn c_string(bytes: &[u8]) -> Vec<u8> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    bytes[..end].to_vec()
}

fn range(data: &[u8], off: u32, len: usize) -> Option<&[u8]> {
    let start = off as usize;
    data.get(start..start.checked_add(len)?)
}

/// One parsed single-architecture image.
#[derive(Debug)]
struct MachOImage {
    filetype: u32,
    libraries: Vec<Vec<u8>>,
    symbols: Option<Vec<Vec<u8>>>,
    undefined: Option<(u32, u32)>,
}

impl MachOImage {
    fn parse(data: &[u8]) -> Result<MachOImage> {
        let malformed = |m: &str| ImphashError::malformed(Format::MachO, m);

        if data.len() < 4 {
            return Err(malformed("truncated header"));
        }
        let be = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        let le_magic = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        // MH_MAGIC and MH_MAGIC_64 differ only in the low bit
        let (le, magic) = if be & !1 == MH_MAGIC & !1 {
            (false, be)
        } else if le_magic & !1 == MH_MAGIC & !1 {
            (true, le_magic)
        } else {
            return Err(malformed("invalid magic number"));
        };
        let is_64 = magic == MH_MAGIC_64;
        let header_size = if is_64 { 32 } else { 28 };
        if data.len() < header_size {
            return Err(malformed("truncated header"));
        }

        let filetype = read_u32(data, 12, le).unwrap_or(0);
        let ncmds = read_u32(data, 16, le).unwrap_or(0);
        let sizeofcmds = read_u32(data, 20, le).unwrap_or(0) as usize;
        let cmds = header_size
            .checked_add(sizeofcmds)
            .and_then(|end| data.get(header_size..end))
            .ok_or_else(|| malformed("load commands extend past end of file"))?;

        let mut image = MachOImage {
            filetype,
            libraries: Vec::new(),
            symbols: None,
            undefined: None,
        };

        let mut off = 0usize;
        for _ in 0..ncmds {
            let rest = &cmds[off..];
            if rest.len() < 8 {
                return Err(malformed("command block too small"));
            }
            let cmd = read_u32(rest, 0, le).unwrap_or(0);
            let cmdsize = read_u32(rest, 4, le).unwrap_or(0) as usize;
            if cmdsize < 8 || cmdsize > rest.len() {
                return Err(malformed("invalid command block size"));
            }
            let block = &rest[..cmdsize];
            match cmd {
                LC_LOAD_DYLIB => {
                    if block.len() < DYLIB_COMMAND_SIZE {
                        return Err(malformed("truncated dynamic library command"));
                    }
                    let name_off = read_u32(block, 8, le).unwrap_or(0) as usize;
                    if name_off >= block.len() {
                        return Err(malformed("invalid name in dynamic library command"));
                    }
                    let name = c_string(&block[name_off..]);
                    trace!(library = %String::from_utf8_lossy(&name), "Mach-O dylib");
                    image.libraries.push(name);
                }
                LC_SYMTAB => {
                    if block.len() < SYMTAB_COMMAND_SIZE {
                        return Err(malformed("truncated symbol table command"));
                    }
                    let symtab = SymtabCommand {
                        symoff: read_u32(block, 8, le).unwrap_or(0),
                        nsyms: read_u32(block, 12, le).unwrap_or(0) as usize,
                        stroff: read_u32(block, 16, le).unwrap_or(0),
                        strsize: read_u32(block, 20, le).unwrap_or(0) as usize,
                    };
                    image.symbols = Some(symtab.symbol_names(data, le, is_64)?);
                }
                LC_DYSYMTAB => {
                    if block.len() < DYSYMTAB_COMMAND_SIZE {
                        return Err(malformed("truncated dynamic symbol table command"));
                    }
                    let iundefsym = read_u32(block, 24, le).unwrap_or(0);
                    let nundefsym = read_u32(block, 28, le).unwrap_or(0);
                    let indirectsymoff = read_u32(block, 56, le).unwrap_or(0);
                    let nindirectsyms = read_u32(block, 60, le).unwrap_or(0) as usize;
                    let indirect_len = nindirectsyms
                        .checked_mul(4)
                        .ok_or_else(|| malformed("indirect symbol table out of range"))?;
                    if range(data, indirectsymoff, indirect_len).is_none() {
                        return Err(malformed("indirect symbol table out of range"));
                    }
                    image.undefined = Some((iundefsym, nundefsym));
                }
                _ => {}
            }
            off += cmdsize;
        }
        Ok(image)
    }

    fn into_imports(self) -> Result<MachOImports> {
        let (Some(symbols), Some((first, count))) = (self.symbols, self.undefined) else {
            return Err(ImphashError::unavailable(
                Format::MachO,
                "missing symbol table",
            ));
        };
        let start = first as usize;
        let end = start.checked_add(count as usize);
        let undefined = match end {
            Some(end) if end <= symbols.len() => symbols[start..end].to_vec(),
            _ => {
                return Err(ImphashError::unavailable(
                    Format::MachO,
                    format!(
                        "undefined symbol range {}+{} exceeds {} symbols",
                        first,
                        count,
                        symbols.len()
                    ),
                ))
            }
        };
        Ok(MachOImports {
            libraries: self.libraries,
            symbols: undefined,
        })
    }
}

/// `LC_SYMTAB` fields locating the symbol and string tables.
struct SymtabCommand {
    symoff: u32,
    nsyms: usize,
    stroff: u32,
    strsize: usize,
}

impl SymtabCommand {
    fn symbol_names(&self, data: &[u8], le: bool, is_64: bool) -> Result<Vec<Vec<u8>>> {
        let malformed = |m: &str| ImphashError::malformed(Format::MachO, m);

        let strtab = range(data, self.stroff, self.strsize)
            .ok_or_else(|| malformed("string table extends past end of file"))?;
        let entsize = if is_64 { 16 } else { 12 };
        let symdata = self
            .nsyms
            .checked_mul(entsize)
            .and_then(|len| range(data, self.symoff, len))
            .ok_or_else(|| malformed("symbol table extends past end of file"))?;

        let mut names = Vec::with_capacity(self.nsyms);
        for entry in symdata.chunks_exact(entsize) {
            let strx = read_u32(entry, 0, le).unwrap_or(0) as usize;
            if strx >= strtab.len() {
                return Err(malformed("invalid name in symbol table"));
            }
            let mut name = c_string(&strtab[strx..]);
            // Dotted names lose their leading underscore
            if name.contains(&b'.') && name.starts_with(b"_") {
                name.remove(0);
            }
            names.push(name);
        }
        Ok(names)
    }
}

/// Read the imported dylibs and undefined symbols of a single-architecture image.
pub fn read_imports(data: &[u8]) -> Result<MachOImports> {
    let imports = MachOImage::parse(data)?.into_imports()?;
    debug!(
        libraries = imports.libraries.len(),
        symbols = imports.symbols.len(),
        "Read Mach-O imports"
    );
    Ok(imports)
}

/// Read the imports of every architecture slice of a universal binary.
///
/// The header and every slice are validated before any imports are
/// collected. A slice that fails is reported as
/// [`ImphashError::SliceExtractionFailed`] with its index.
pub fn read_fat_imports(data: &[u8]) -> Result<Vec<MachOImports>> {
    let malformed = |m: String| ImphashError::malformed(Format::FatMachO, m);

    if read_u32(data, 0, false) != Some(FAT_MAGIC) {
        return Err(malformed("invalid fat magic".to_string()));
    }
    let narch = read_u32(data, 4, false)
        .ok_or_else(|| malformed("truncated fat header".to_string()))? as usize;
    if narch < 1 {
        return Err(malformed("file contains no images".to_string()));
    }
    let table_end = narch.checked_mul(FAT_ARCH_SIZE).and_then(|n| n.checked_add(8));
    if !matches!(table_end, Some(end) if end <= data.len()) {
        return Err(malformed(format!(
            "architecture table for {} images extends past end of file",
            narch
        )));
    }

    let mut seen: HashSet<(u32, u32)> = HashSet::new();
    let mut first_filetype: Option<u32> = None;
    let mut images = Vec::with_capacity(narch);
    for index in 0..narch {
        let rec = 8 + index * FAT_ARCH_SIZE;
        let cputype = read_u32(data, rec, false).unwrap_or(0);
        let cpusubtype = read_u32(data, rec + 4, false).unwrap_or(0);
        let offset = read_u32(data, rec + 8, false).unwrap_or(0);
        let size = read_u32(data, rec + 12, false).unwrap_or(0) as usize;

        let slice = range(data, offset, size).ok_or_else(|| {
            malformed(format!(
                "architecture {} ({:#x}+{:#x}) extends past end of file",
                index, offset, size
            ))
        })?;
        let image = MachOImage::parse(slice).map_err(|e| ImphashError::SliceExtractionFailed {
            index,
            source: Box::new(e),
        })?;

        if !seen.insert((cputype, cpusubtype)) {
            return Err(malformed(format!(
                "duplicate architecture cpu={:#x}, subcpu={:#x}",
                cputype, cpusubtype
            )));
        }
        match first_filetype {
            None => first_filetype = Some(image.filetype),
            Some(expected) if expected != image.filetype => {
                return Err(malformed(format!(
                    "architecture {} has Mach-O type {:#x}, first has {:#x}",
                    index, image.filetype, expected
                )));
            }
            Some(_) => {}
        }
        debug!(index, cputype, cpusubtype, "Parsed fat Mach-O slice");
        images.push(image);
    }

    images
        .into_iter()
        .enumerate()
        .map(|(index, image)| {
            image
                .into_imports()
                .map_err(|e| ImphashError::SliceExtractionFailed {
                    index,
                    source: Box::new(e),
                })
        })
        .collect()
}
