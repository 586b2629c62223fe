//! Configuration file support.
//!
//! Settings are read from a TOML file. Every section is optional; missing
//! values fall back to defaults, and a missing file means "all defaults".

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CleaningError, CleaningResult};
use crate::store::StoreType;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "BASIC_CLEANING_CONFIG";
/// Environment variable overriding `store.type`.
pub const STORE_TYPE_ENV: &str = "TRACKING_STORE";
/// Environment variable overriding `store.root`.
pub const STORE_ROOT_ENV: &str = "TRACKING_STORE_ROOT";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub cleaning: CleaningSettings,
}

/// Tracking store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSettings {
    #[serde(rename = "type", default = "default_store_type")]
    pub store_type: String,
    #[serde(default = "default_store_root")]
    pub root: PathBuf,
    /// Where input artifacts are materialized
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
}

/// Settings of the cleaning job itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningSettings {
    #[serde(default = "default_job_type")]
    pub job_type: String,
    #[serde(default = "default_output_file")]
    pub output_file: PathBuf,
    #[serde(default = "default_price_column")]
    pub price_column: String,
    #[serde(default = "default_date_column")]
    pub date_column: String,
}

fn default_store_type() -> String {
    "local".to_string()
}

fn default_store_root() -> PathBuf {
    PathBuf::from("tracking")
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_job_type() -> String {
    "basic_cleaning".to_string()
}

fn default_output_file() -> PathBuf {
    PathBuf::from("clean_sample.csv")
}

fn default_price_column() -> String {
    "price".to_string()
}

fn default_date_column() -> String {
    "last_review".to_string()
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            store_type: default_store_type(),
            root: default_store_root(),
            download_dir: default_download_dir(),
        }
    }
}

impl Default for CleaningSettings {
    fn default() -> Self {
        Self {
            job_type: default_job_type(),
            output_file: default_output_file(),
            price_column: default_price_column(),
            date_column: default_date_column(),
        }
    }
}

impl StoreSettings {
    pub fn store_type(&self) -> CleaningResult<StoreType> {
        self.store_type
            .parse()
            .map_err(CleaningError::Configuration)
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> CleaningResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            CleaningError::Configuration(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            CleaningError::Configuration(format!(
                "Failed to parse config file {}: {}",
                path.display(),
                e
            ))
        })
    }

    /// Load configuration from the standard locations.
    ///
    /// Searches, in order:
    /// 1. The file named by `BASIC_CLEANING_CONFIG` (must exist)
    /// 2. `basic_cleaning.toml` in the current directory
    /// 3. `basic_cleaning/basic_cleaning.toml`
    ///
    /// Falls back to defaults when no file is found. Environment overrides are
    /// applied last.
    pub fn load() -> CleaningResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => {
                let search_paths = [
                    PathBuf::from("basic_cleaning.toml"),
                    PathBuf::from("basic_cleaning/basic_cleaning.toml"),
                ];
                match search_paths.iter().find(|p| p.is_file()) {
                    Some(path) => Self::from_file(path)?,
                    None => Self::default(),
                }
            }
        };

        config.apply_overrides(
            std::env::var(STORE_TYPE_ENV).ok(),
            std::env::var(STORE_ROOT_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Apply the values of `TRACKING_STORE` / `TRACKING_STORE_ROOT`.
    pub fn apply_overrides(&mut self, store_type: Option<String>, store_root: Option<String>) {
        if let Some(store_type) = store_type.filter(|s| !s.trim().is_empty()) {
            self.store.store_type = store_type;
        }
        if let Some(root) = store_root.filter(|s| !s.trim().is_empty()) {
            self.store.root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> CleaningResult<()> {
        self.store.store_type()?;
        if self.cleaning.job_type.trim().is_empty() {
            return Err(CleaningError::Configuration(
                "cleaning.job_type must not be empty".to_string(),
            ));
        }
        if self.cleaning.output_file.as_os_str().is_empty() {
            return Err(CleaningError::Configuration(
                "cleaning.output_file must not be empty".to_string(),
            ));
        }
        if self.cleaning.price_column.is_empty() || self.cleaning.date_column.is_empty() {
            return Err(CleaningError::Configuration(
                "cleaning.price_column and cleaning.date_column are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.store.store_type().unwrap(), StoreType::Local);
        assert_eq!(config.cleaning.output_file, PathBuf::from("clean_sample.csv"));
        assert_eq!(config.cleaning.job_type, "basic_cleaning");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[store]
type = "memory"
root = "/tmp/tracking"
download_dir = "/tmp/downloads"

[cleaning]
job_type = "cleaning"
output_file = "out.csv"
price_column = "cost"
date_column = "reviewed_at"
"#;

        let config: AppConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.store.store_type().unwrap(), StoreType::Memory);
        assert_eq!(config.store.root, PathBuf::from("/tmp/tracking"));
        assert_eq!(config.cleaning.price_column, "cost");
        assert_eq!(config.cleaning.date_column, "reviewed_at");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_store_type_is_rejected() {
        let config: AppConfig = toml::from_str("[store]\ntype = \"s3\"\n").unwrap();
        assert!(matches!(
            config.validate(),
            Err(CleaningError::Configuration(_))
        ));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let mut config = AppConfig::default();
        config.apply_overrides(Some("memory".to_string()), Some("/srv/store".to_string()));
        assert_eq!(config.store.store_type, "memory");
        assert_eq!(config.store.root, PathBuf::from("/srv/store"));

        // blank values are ignored
        config.apply_overrides(Some(" ".to_string()), None);
        assert_eq!(config.store.store_type, "memory");
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = AppConfig::from_file("/nonexistent/basic_cleaning.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
