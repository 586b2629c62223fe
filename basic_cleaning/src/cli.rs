//! Command-line arguments.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{CleaningError, CleaningResult};

pub const USAGE: &str = "\
A very basic data cleaning

Usage: basic_cleaning --input_artifact <NAME[:ALIAS]> --output_artifact <NAME>
                      --output_type <TYPE> --output_description <TEXT>
                      --min_price <FLOAT> --max_price <FLOAT>

Options:
  --input_artifact      Name of the input artifact
  --output_artifact     Name of the output artifact
  --output_type         Type of the output artifact
  --output_description  Description of the output artifact
  --min_price           Minimum price of the properties to keep; cheaper rows are removed
  --max_price           Maximum price of the properties to keep; pricier rows are removed
  -h, --help            Print this help
";

const FLAGS: [&str; 6] = [
    "input_artifact",
    "output_artifact",
    "output_type",
    "output_description",
    "min_price",
    "max_price",
];

/// Parsed invocation parameters. Recorded verbatim as the run's config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanArgs {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Clean(CleanArgs),
    Help,
}

impl CleanArgs {
    /// Parse arguments, excluding the program name.
    ///
    /// Accepts `--flag value` and `--flag=value`. All six flags are required
    /// and may appear only once.
    pub fn parse_from<I, S>(args: I) -> CleaningResult<Command>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values: HashMap<&'static str, String> = HashMap::new();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            if arg == "-h" || arg == "--help" {
                return Ok(Command::Help);
            }
            let Some(stripped) = arg.strip_prefix("--") else {
                return Err(usage_error(format!("unexpected argument '{}'", arg)));
            };
            let (flag, inline) = match stripped.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (stripped, None),
            };
            let Some(key) = FLAGS.iter().copied().find(|f| *f == flag) else {
                return Err(usage_error(format!("unknown flag '--{}'", flag)));
            };
            let value = match inline {
                Some(value) => value,
                None => args
                    .next()
                    .ok_or_else(|| usage_error(format!("flag '--{}' expects a value", key)))?,
            };
            if values.insert(key, value).is_some() {
                return Err(usage_error(format!("flag '--{}' given more than once", key)));
            }
        }

        let missing: Vec<String> = FLAGS
            .iter()
            .filter(|f| !values.contains_key(*f))
            .map(|f| format!("--{}", f))
            .collect();
        if !missing.is_empty() {
            return Err(usage_error(format!(
                "the following arguments are required: {}",
                missing.join(", ")
            )));
        }

        let mut take = |key: &str| values.remove(key).unwrap_or_default();
        let input_artifact = take("input_artifact");
        let output_artifact = take("output_artifact");
        let output_type = take("output_type");
        let output_description = take("output_description");
        let min_price = parse_float("min_price", &take("min_price"))?;
        let max_price = parse_float("max_price", &take("max_price"))?;

        Ok(Command::Clean(CleanArgs {
            input_artifact,
            output_artifact,
            output_type,
            output_description,
            min_price,
            max_price,
        }))
    }

    /// Config snapshot recorded on the run.
    pub fn to_config(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

fn parse_float(flag: &str, value: &str) -> CleaningResult<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| usage_error(format!("invalid float value for '--{}': '{}'", flag, value)))
}

fn usage_error(message: String) -> CleaningError {
    CleaningError::InvalidArguments(message)
}
