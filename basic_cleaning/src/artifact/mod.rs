//! Artifact types shared by the tracking store and the cleaning pipeline.
//!
//! An [`Artifact`] is what a run builds locally before upload: a name, a type
//! tag, a description and the files it wraps. Once the store registers it, it
//! becomes an immutable [`ArtifactVersion`]. An [`ArtifactRef`] is the
//! `name[:alias]` string used to look a version up again.

pub mod checksum;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

use crate::store::{StoreError, StoreResult};

/// Alias that always points at the newest version of an artifact name.
pub const LATEST_ALIAS: &str = "latest";

/// Which version of an artifact a reference points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArtifactAlias {
    Latest,
    Version(u32),
    Custom(String),
}

impl fmt::Display for ArtifactAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactAlias::Latest => f.write_str(LATEST_ALIAS),
            ArtifactAlias::Version(v) => write!(f, "v{}", v),
            ArtifactAlias::Custom(alias) => f.write_str(alias),
        }
    }
}

impl ArtifactAlias {
    fn parse(s: &str) -> Self {
        if s == LATEST_ALIAS {
            return ArtifactAlias::Latest;
        }
        if let Some(num) = s.strip_prefix('v') {
            if let Ok(v) = num.parse::<u32>() {
                return ArtifactAlias::Version(v);
            }
        }
        ArtifactAlias::Custom(s.to_string())
    }
}

/// Reference to a stored artifact version, written as `name[:alias]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ArtifactRef {
    pub name: String,
    pub alias: ArtifactAlias,
}

impl ArtifactRef {
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: ArtifactAlias::Latest,
        }
    }

    pub fn version(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            alias: ArtifactAlias::Version(version),
        }
    }
}

impl FromStr for ArtifactRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (name, alias) = match s.rsplit_once(':') {
            Some((name, alias)) => {
                if alias.is_empty() {
                    return Err(StoreError::ValidationError(format!(
                        "Artifact reference '{}' has an empty alias",
                        s
                    )));
                }
                (name, ArtifactAlias::parse(alias))
            }
            None => (s, ArtifactAlias::Latest),
        };
        validate_name(name)?;
        Ok(Self {
            name: name.to_string(),
            alias,
        })
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.alias)
    }
}

/// Artifact names become directory names in the local store.
pub fn validate_name(name: &str) -> StoreResult<()> {
    if name.is_empty() {
        return Err(StoreError::ValidationError(
            "Artifact name must not be empty".to_string(),
        ));
    }
    if name == "." || name == ".." {
        return Err(StoreError::ValidationError(format!(
            "Invalid artifact name: {}",
            name
        )));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    {
        return Err(StoreError::ValidationError(format!(
            "Invalid character '{}' in artifact name '{}'",
            bad, name
        )));
    }
    Ok(())
}

/// An artifact being assembled by a run, not yet uploaded.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    files: Vec<PathBuf>,
}

impl Artifact {
    pub fn new(
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artifact_type: artifact_type.into(),
            description: description.into(),
            files: Vec::new(),
        }
    }

    /// Attach a local file. The file is read at upload time, not here.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(StoreError::ValidationError(format!(
                "Not a file: {}",
                path.display()
            )));
        }
        let file_name = file_name_of(path)?;
        if self
            .files
            .iter()
            .any(|p| p.file_name().and_then(|n| n.to_str()) == Some(file_name.as_str()))
        {
            return Err(StoreError::ValidationError(format!(
                "Artifact '{}' already contains a file named '{}'",
                self.name, file_name
            )));
        }
        self.files.push(path.to_path_buf());
        Ok(())
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Checks performed by every store before registering a version.
    pub fn validate(&self) -> StoreResult<()> {
        validate_name(&self.name)?;
        if self.artifact_type.trim().is_empty() {
            return Err(StoreError::ValidationError(format!(
                "Artifact '{}' has an empty type",
                self.name
            )));
        }
        if self.files.is_empty() {
            return Err(StoreError::ValidationError(format!(
                "Artifact '{}' has no files",
                self.name
            )));
        }
        Ok(())
    }

    /// Hash every attached file into manifest entries.
    pub fn manifest(&self) -> StoreResult<Vec<ManifestEntry>> {
        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(self.files.len());
        for path in &self.files {
            let name = file_name_of(path)?;
            if !seen.insert(name.clone()) {
                return Err(StoreError::ValidationError(format!(
                    "Duplicate file name '{}' in artifact '{}'",
                    name, self.name
                )));
            }
            let size = std::fs::metadata(path)?.len();
            entries.push(ManifestEntry {
                path: name,
                digest: checksum::file_digest(path)?,
                size,
            });
        }
        Ok(entries)
    }
}

pub(crate) fn file_name_of(path: &Path) -> StoreResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.to_string())
        .ok_or_else(|| {
            StoreError::ValidationError(format!("Path has no file name: {}", path.display()))
        })
}

/// One file inside a stored artifact version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: String,
    pub digest: String,
    pub size: u64,
}

/// A registered, immutable artifact version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub name: String,
    pub version: u32,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub files: Vec<ManifestEntry>,
    pub digest: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub created_by: Option<Uuid>,
}

impl ArtifactVersion {
    pub fn version_label(&self) -> String {
        format!("v{}", self.version)
    }

    /// `name:vN`
    pub fn qualified_name(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }

    pub fn matches(&self, alias: &ArtifactAlias) -> bool {
        match alias {
            ArtifactAlias::Version(v) => self.version == *v,
            other => {
                let label = other.to_string();
                self.aliases.iter().any(|a| *a == label)
            }
        }
    }
}
