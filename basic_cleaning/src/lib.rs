//! Basic data cleaning job for tracked tabular datasets.
//!
//! Downloads a CSV artifact from a tracking store, keeps the rows whose price
//! lies inside an inclusive range, converts the review date column to
//! date/time values and uploads the result as a new artifact version.

pub mod artifact;
pub mod cli;
pub mod config;
pub mod error;
pub mod parsing;
pub mod pipeline;
pub mod store;
pub mod tracking;
pub mod transformations;

pub use cli::{CleanArgs, Command};
pub use config::AppConfig;
pub use error::{CleaningError, CleaningResult};
pub use pipeline::{Cleaner, CleaningSummary};
