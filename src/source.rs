use crate::error::*;
use crate::record::*;
use std::io::Read;
use std::path::Path;

/// Reads the dataset CSV at `path`.
pub fn open(path: &Path) -> Result<Vec<RawRecord>> {
    log::info!("reading dataset ({})", path.display());
    let file = std::fs::File::open(path)
        .map_err(|e| Error::Dataset(format!("{}: {}", path.display(), e)))?;
    read(file)
}

/// Reads raw records from any CSV source, preserving row order.
///
/// Extra columns are ignored. A missing required header is an error; a
/// malformed row is an error too, since it means the file itself is corrupt
/// rather than one of its values.
pub fn read<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut csv = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = csv.headers()?.clone();
    if let Some(missing) = HEADERS
        .iter()
        .find(|h| !headers.iter().any(|have| have == **h))
    {
        return Err(Error::Dataset(format!("missing column {}", missing)));
    }
    let records = csv
        .deserialize::<RawRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    log::info!("read {} records", records.len());
    Ok(records)
}
