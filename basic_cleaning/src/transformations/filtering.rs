use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{CleaningError, CleaningResult};

/// Inclusive price bounds, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    min: f64,
    max: f64,
}

impl PriceRange {
    /// Fails on NaN bounds and when `min > max`. Equal bounds are allowed.
    pub fn new(min: f64, max: f64) -> CleaningResult<Self> {
        if min.is_nan() || max.is_nan() {
            return Err(CleaningError::InvalidRange(
                "price bounds must be numbers, got NaN".to_string(),
            ));
        }
        if min > max {
            return Err(CleaningError::InvalidRange(format!(
                "min_price {} is greater than max_price {}",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Keep rows whose `column` lies within `[min_value, max_value]`.
///
/// Null values compare as false and are dropped. The column keeps its dtype;
/// the comparison happens on a Float64 view of it.
pub fn filter_by_range(
    df: &DataFrame,
    column: &str,
    min_value: f64,
    max_value: f64,
) -> PolarsResult<DataFrame> {
    let value = col(column).cast(DataType::Float64);
    df.clone()
        .lazy()
        .filter(
            value
                .clone()
                .gt_eq(lit(min_value))
                .and(value.lt_eq(lit(max_value))),
        )
        .collect()
}

/// [`filter_by_range`] with validated bounds.
pub fn filter_by_price(df: &DataFrame, column: &str, range: PriceRange) -> PolarsResult<DataFrame> {
    filter_by_range(df, column, range.min(), range.max())
}
