use crate::common::builders::{MachO, CPU_TYPE_X86_64};
use imphash::symbols::macho;
use imphash::{detect_format, imp_string_from_bytes, imphash_from_bytes, Format, ImphashError};

fn names(list: &[&str]) -> Vec<Vec<u8>> {
    list.iter().map(|s| s.as_bytes().to_vec()).collect()
}

fn sample() -> MachO<'static> {
    MachO::be32()
        .dylib("/usr/lib/libSystem.B.dylib")
        .dylib("/usr/lib/libobjc.A.dylib")
        .defined("_main")
        .import("_printf")
        .import("_objc_msgSend")
        .import("_printf")
}

#[test]
fn macho_flat_set_of_libraries_and_symbols() {
    let data = sample().build();
    assert_eq!(detect_format(&data).unwrap(), Format::MachO);

    let result = imphash_from_bytes(&data).unwrap();
    assert_eq!(
        result.imp_string,
        "/usr/lib/libSystem.B,/usr/lib/libobjc.A,_objc_msgSend,_printf"
    );
    assert_eq!(result.imp_hash, "ded8ca52f8eb3c678f48d943120813d9");
}

#[test]
fn macho_raw_imports_cover_only_undefined_range() {
    let imports = macho::read_imports(&sample().build()).unwrap();
    assert_eq!(
        imports.libraries,
        names(&["/usr/lib/libSystem.B.dylib", "/usr/lib/libobjc.A.dylib"])
    );
    assert_eq!(imports.symbols, names(&["_printf", "_objc_msgSend", "_printf"]));
}

#[test]
fn macho_little_endian_64_bit_reader() {
    // Not detected as Mach-O by signature, but readable as a fat slice
    let data = MachO::le64(CPU_TYPE_X86_64)
        .dylib("/usr/lib/libc++.1.dylib")
        .import("__ZdlPv")
        .build();
    assert!(matches!(detect_format(&data), Err(ImphashError::UnsupportedFormat)));
    let imports = macho::read_imports(&data).unwrap();
    assert_eq!(imports.libraries, names(&["/usr/lib/libc++.1.dylib"]));
    assert_eq!(imports.symbols, names(&["__ZdlPv"]));
}

#[test]
fn macho_frameworks_keep_full_path() {
    let data = MachO::be32()
        .dylib("/System/Library/Frameworks/Foundation.framework/Versions/C/Foundation")
        .import("_NSLog")
        .build();
    assert_eq!(
        imp_string_from_bytes(&data).unwrap(),
        "/System/Library/Frameworks/Foundation.framework/Versions/C/Foundation,_NSLog"
    );
}

#[test]
fn macho_dotted_symbols_lose_leading_underscore() {
    let data = MachO::be32()
        .dylib("/usr/lib/libSystem.B.dylib")
        .import("_OBJC_CLASS_$_NSObject")
        .import("_objc.dotted")
        .build();
    assert_eq!(
        imp_string_from_bytes(&data).unwrap(),
        "/usr/lib/libSystem.B,_OBJC_CLASS_$_NSObject,objc.dotted"
    );
}

#[test]
fn macho_library_and_symbol_share_namespace() {
    let data = MachO::be32().dylib("shared").import("shared").build();
    assert_eq!(imp_string_from_bytes(&data).unwrap(), "shared");
}

#[test]
fn macho_without_symbol_table_is_unavailable() {
    let data = MachO::be32()
        .dylib("/usr/lib/libSystem.B.dylib")
        .without_symtab()
        .build();
    assert!(matches!(
        imphash_from_bytes(&data),
        Err(ImphashError::ImportTableUnavailable { format: Format::MachO, .. })
    ));
}

#[test]
fn macho_truncated_symbol_table_is_malformed() {
    let data = sample().build();
    let truncated = &data[..data.len() - 8];
    assert!(matches!(
        imphash_from_bytes(truncated),
        Err(ImphashError::MalformedContainer { format: Format::MachO, .. })
    ));
}
