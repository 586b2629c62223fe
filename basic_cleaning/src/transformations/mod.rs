//! Data transformation and cleaning utilities.
//!
//! # Modules
//!
//! - [`cleaning`]: Schema checks and date/time normalization
//! - [`filtering`]: Inclusive range filters
//!
//! # Example
//!
//! ```no_run
//! use basic_cleaning::transformations::{filter_by_price, parse_datetime_column, PriceRange};
//! use polars::prelude::*;
//!
//! # fn example(df: DataFrame) -> basic_cleaning::CleaningResult<()> {
//! let range = PriceRange::new(10.0, 350.0)?;
//! let filtered = filter_by_price(&df, "price", range)?;
//! let converted = parse_datetime_column(&filtered, "last_review")?;
//! println!("{} dates could not be parsed", converted.unparsed);
//! # Ok(())
//! # }
//! ```

pub mod cleaning;
pub mod filtering;

pub use cleaning::{
    ensure_numeric, parse_datetime, parse_datetime_column, validate_schema, DateConversion,
};
pub use filtering::{filter_by_price, filter_by_range, PriceRange};
