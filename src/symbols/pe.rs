//! PE (Portable Executable) import extraction

use crate::error::{ImphashError, Result};
use crate::formats::Format;
use object::read::Object;
use tracing::{debug, trace};

/// Read the import table of a PE image as `symbol:library` records.
///
/// One record is produced per import-by-name thunk, in descriptor order.
/// Imports by ordinal carry no name and produce no record.
pub fn read_imports(data: &[u8]) -> Result<Vec<Vec<u8>>> {
    let obj = object::read::File::parse(data)
        .map_err(|e| ImphashError::malformed(Format::Pe, e.to_string()))?;
    if obj.format() != object::BinaryFormat::Pe {
        return Err(ImphashError::malformed(
            Format::Pe,
            format!("expected a PE image, found {:?}", obj.format()),
        ));
    }

    let imports = obj
        .imports()
        .map_err(|e| ImphashError::unavailable(Format::Pe, e.to_string()))?;

    let mut records = Vec::with_capacity(imports.len());
    for imp in imports {
        trace!(
            library = %String::from_utf8_lossy(imp.library()),
            symbol = %String::from_utf8_lossy(imp.name()),
            "PE import"
        );
        let mut record = Vec::with_capacity(imp.name().len() + imp.library().len() + 1);
        record.extend_from_slice(imp.name());
        record.push(b':');
        record.extend_from_slice(imp.library());
        records.push(record);
    }
    debug!(count = records.len(), "Read PE import records");
    Ok(records)
}
