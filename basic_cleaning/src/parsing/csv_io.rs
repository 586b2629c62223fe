use polars::prelude::*;
use std::fs::File;
use std::path::Path;

use crate::error::{CleaningError, CleaningResult};

/// Parse a CSV file with a header row into a DataFrame.
///
/// Column types are inferred from every row, so a decimal value deep in an
/// otherwise integer column still loads. Any reader failure is reported as
/// [`CleaningError::Parse`] naming the file.
pub fn read_table(csv_path: &Path) -> CleaningResult<DataFrame> {
    let parse_error = |e: PolarsError| CleaningError::Parse {
        path: csv_path.display().to_string(),
        reason: e.to_string(),
    };

    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(csv_path.to_path_buf()))
        .map_err(parse_error)?
        .finish()
        .map_err(parse_error)
}

/// Write a DataFrame as CSV with a header row and no index column.
///
/// Date/time columns are rendered with `datetime_format`; nulls become empty
/// fields.
pub fn write_table(df: &mut DataFrame, csv_path: &Path, datetime_format: &str) -> CleaningResult<()> {
    let mut file = File::create(csv_path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(datetime_format.to_string()))
        .finish(df)?;
    Ok(())
}
