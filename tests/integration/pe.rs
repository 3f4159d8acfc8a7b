use crate::common::builders::{pe32, pe64, PeImport};
use crate::common::EMPTY_MD5;
use imphash::{
    detect_format, imp_string_from_bytes, imphash_from_bytes, read_raw_imports, Format,
    ImphashError, RawImports,
};

#[test]
fn pe_case_duplicates_are_kept() {
    let data = pe32(&[
        PeImport::new("KERNEL32.DLL", &["CreateFileA"]),
        PeImport::new("kernel32.dll", &["createfilea"]),
    ]);
    assert_eq!(detect_format(&data).unwrap(), Format::Pe);

    let result = imphash_from_bytes(&data).unwrap();
    assert_eq!(result.imp_string, "kernel32.createfilea,kernel32.createfilea");
    assert_eq!(result.imp_hash, "71291413a2625011ff17cd162c51d224");
    assert_eq!(result.imp_fuzzy, "");
}

#[test]
fn pe_raw_records_are_symbol_colon_library() {
    let data = pe32(&[
        PeImport::new("USER32.dll", &["MessageBoxW", "GetDC"]),
        PeImport::new("HAL.SYS", &["KeStallExecutionProcessor"]),
    ]);
    let raw = read_raw_imports(&data, Format::Pe).unwrap();
    assert_eq!(
        raw,
        RawImports::Pe(vec![
            b"MessageBoxW:USER32.dll".to_vec(),
            b"GetDC:USER32.dll".to_vec(),
            b"KeStallExecutionProcessor:HAL.SYS".to_vec(),
        ])
    );
    assert_eq!(
        imp_string_from_bytes(&data).unwrap(),
        "hal.kestallexecutionprocessor,user32.getdc,user32.messageboxw"
    );
}

#[test]
fn pe32_plus_matches_pe32() {
    let imports = [
        PeImport::new("KERNEL32.DLL", &["CreateFileA"]),
        PeImport::new("kernel32.dll", &["createfilea"]),
    ];
    let data = pe64(&imports);
    assert_eq!(detect_format(&data).unwrap(), Format::Pe);

    let result = imphash_from_bytes(&data).unwrap();
    assert_eq!(result.imp_string, "kernel32.createfilea,kernel32.createfilea");
    assert_eq!(result.imp_hash, "71291413a2625011ff17cd162c51d224");
    assert_eq!(result, imphash_from_bytes(&pe32(&imports)).unwrap());
}

#[test]
fn pe32_plus_ordinal_imports_are_ignored() {
    let data = pe64(&[
        PeImport::new("WS2_32.dll", &["#23", "WSAStartup"]),
        PeImport::new("OLEAUT32.dll", &["#2"]),
        PeImport::new("ntdll.dll", &["RtlGetVersion"]),
    ]);
    let raw = read_raw_imports(&data, Format::Pe).unwrap();
    assert_eq!(
        raw,
        RawImports::Pe(vec![
            b"WSAStartup:WS2_32.dll".to_vec(),
            b"RtlGetVersion:ntdll.dll".to_vec(),
        ])
    );
    assert_eq!(
        imp_string_from_bytes(&data).unwrap(),
        "ntdll.rtlgetversion,ws2_32.wsastartup"
    );
}

#[test]
fn pe_ordinal_imports_are_ignored() {
    let data = pe32(&[
        PeImport::new("WS2_32.dll", &["#23", "#115", "WSAGetLastError"]),
        PeImport::new("OLEAUT32.dll", &["#2"]),
    ]);
    assert_eq!(imp_string_from_bytes(&data).unwrap(), "ws2_32.wsagetlasterror");
}

#[test]
fn pe_other_extensions_are_kept() {
    let data = pe32(&[PeImport::new("ntoskrnl.exe", &["IoCreateDevice"])]);
    assert_eq!(
        imp_string_from_bytes(&data).unwrap(),
        "ntoskrnl.exe.iocreatedevice"
    );
}

#[test]
fn pe_without_imports_hashes_empty_string() {
    let data = pe32(&[]);
    let result = imphash_from_bytes(&data).unwrap();
    assert_eq!(result.imp_string, "");
    assert_eq!(result.imp_hash, EMPTY_MD5);
}

#[test]
fn pe_large_import_table_gets_fuzzy_digest() {
    let names: Vec<String> = (0..300).map(|i| format!("ExportedFunction{:04}", i)).collect();
    let symbols: Vec<&str> = names.iter().map(String::as_str).collect();
    let data = pe32(&[PeImport::new("BIGLIB.DLL", &symbols)]);

    let result = imphash_from_bytes(&data).unwrap();
    assert!(result.imp_string.len() >= 4096);
    assert!(result
        .imp_string
        .as_bytes()
        .starts_with(b"biglib.exportedfunction0000,"));
    let parts: Vec<&str> = result.imp_fuzzy.split(':').collect();
    assert_eq!(parts.len(), 3);
    assert!(!parts[1].is_empty());
    assert_eq!(imphash::similarity::compare(&result.imp_fuzzy, &result.imp_fuzzy).unwrap(), 100);
}

#[test]
fn pe_truncated_headers_are_malformed() {
    let data = pe32(&[PeImport::new("KERNEL32.dll", &["Sleep"])]);
    let err = imphash_from_bytes(&data[..0x60]).unwrap_err();
    assert!(matches!(
        err,
        ImphashError::MalformedContainer { format: Format::Pe, .. }
    ));
}

#[test]
fn pe_dangling_import_directory_is_an_error() {
    let mut data = pe32(&[PeImport::new("KERNEL32.dll", &["Sleep"])]);
    // Point the import directory outside every section
    data[0xC0..0xC4].copy_from_slice(&0x0009_0000u32.to_le_bytes());
    assert!(imphash_from_bytes(&data).is_err());
}
