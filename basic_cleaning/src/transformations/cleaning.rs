use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike};
use polars::prelude::*;

use crate::error::{CleaningError, CleaningResult};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Written for date/time columns whose values all fall on midnight
pub const DATE_OUTPUT_FORMAT: &str = "%Y-%m-%d";
/// Written when some value carries a time of day
pub const DATETIME_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Written when some value carries sub-second precision
pub const DATETIME_MS_OUTPUT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Result of converting a text column to date/time values
#[derive(Debug)]
pub struct DateConversion {
    pub dataframe: DataFrame,
    /// Non-empty source values that could not be parsed and became null
    pub unparsed: usize,
    /// Values whose sub-millisecond part was dropped
    pub truncated: usize,
    /// CSV format that represents every converted value without loss
    pub output_format: &'static str,
}

/// Parse a single date/time string.
///
/// Accepts RFC 3339 (normalized to UTC), ISO-like date-times with optional
/// fractional seconds, and plain dates (taken as midnight). Returns `None`
/// for blank or unrecognized input.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Replace a text column with a `Datetime(ms)` column of the same name.
///
/// Values that cannot be parsed become null instead of failing the frame.
/// Columns of other dtypes are cast to text first. Values are stored at
/// millisecond precision; finer fractions are truncated and counted in
/// [`DateConversion::truncated`].
pub fn parse_datetime_column(df: &DataFrame, column: &str) -> CleaningResult<DateConversion> {
    let source = df.column(column)?.cast(&DataType::String)?;
    let values = source.str()?;

    let mut unparsed = 0;
    let mut truncated = 0;
    let mut has_time = false;
    let mut has_millis = false;
    let mut millis: Vec<Option<i64>> = Vec::with_capacity(values.len());

    for value in values.into_iter() {
        let parsed = value.and_then(|text| {
            let parsed = parse_datetime(text);
            if parsed.is_none() && !text.trim().is_empty() {
                unparsed += 1;
            }
            parsed
        });

        if let Some(dt) = parsed {
            if dt.time().num_seconds_from_midnight() != 0 {
                has_time = true;
            }
            let nanos = dt.time().nanosecond();
            if nanos / 1_000_000 != 0 {
                has_millis = true;
            }
            if nanos % 1_000_000 != 0 {
                truncated += 1;
            }
        }
        millis.push(parsed.map(|dt| dt.and_utc().timestamp_millis()));
    }

    let converted = Int64Chunked::from_iter_options(column.into(), millis.into_iter())
        .into_datetime(TimeUnit::Milliseconds, None)
        .into_series();

    let mut dataframe = df.clone();
    dataframe.with_column(converted)?;

    let output_format = if has_millis {
        DATETIME_MS_OUTPUT_FORMAT
    } else if has_time {
        DATETIME_OUTPUT_FORMAT
    } else {
        DATE_OUTPUT_FORMAT
    };

    Ok(DateConversion {
        dataframe,
        unparsed,
        truncated,
        output_format,
    })
}

/// Check that every required column is present.
pub fn validate_schema(df: &DataFrame, required_columns: &[&str]) -> CleaningResult<()> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing: Vec<&str> = required_columns
        .iter()
        .copied()
        .filter(|col| !present.iter().any(|p| p == col))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CleaningError::Schema(format!(
            "Missing required column(s): {} (found: {})",
            missing.join(", "),
            present.join(", ")
        )))
    }
}

/// Check that a column can be compared as a number.
///
/// Columns without a single non-null value are accepted: the CSV reader has
/// nothing to infer a numeric type from.
pub fn ensure_numeric(df: &DataFrame, column: &str) -> CleaningResult<()> {
    let col = df.column(column)?;
    let numeric = matches!(
        col.dtype(),
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    );

    if numeric || col.null_count() == col.len() {
        Ok(())
    } else {
        Err(CleaningError::Schema(format!(
            "Column '{}' must be numeric, found {}",
            column,
            col.dtype()
        )))
    }
}
