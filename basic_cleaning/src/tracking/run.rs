use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, info_span, warn, Span};
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactRef, ArtifactVersion};
use crate::error::{CleaningError, CleaningResult};
use crate::store::{ArtifactStore, RunRecord, RunState, StoreError};

/// A tracking session.
///
/// Created by [`Run::init`], closed by [`Run::finish`] or [`Run::fail`].
/// Log lines emitted inside [`Run::span`] are attributed to the run.
pub struct Run {
    store: Arc<dyn ArtifactStore>,
    record: RunRecord,
    download_dir: PathBuf,
    span: Span,
}

/// An input artifact version the run has declared it consumes.
pub struct UsedArtifact {
    store: Arc<dyn ArtifactStore>,
    version: ArtifactVersion,
    download_dir: PathBuf,
}

impl Run {
    /// Register a new run with the store.
    pub async fn init(
        store: Arc<dyn ArtifactStore>,
        job_type: &str,
        download_dir: impl Into<PathBuf>,
    ) -> CleaningResult<Self> {
        let record = store.create_run(job_type).await?;
        let span = info_span!("run", id = %record.id, job_type = %record.job_type);
        span.in_scope(|| info!("Run started"));
        Ok(Self {
            store,
            record,
            download_dir: download_dir.into(),
            span,
        })
    }

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Merge values into the run's configuration snapshot.
    pub async fn update_config(&mut self, config: Map<String, Value>) -> CleaningResult<()> {
        self.store
            .update_run_config(self.record.id, config.clone())
            .await?;
        self.record.config.extend(config);
        Ok(())
    }

    /// Declare `reference` (`name[:alias]`) as an input of this run.
    pub async fn use_artifact(&mut self, reference: &str) -> CleaningResult<UsedArtifact> {
        let reference: ArtifactRef = reference.parse()?;
        let version = self
            .store
            .use_artifact(self.record.id, &reference)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(msg) => CleaningError::ArtifactNotFound(msg),
                other => CleaningError::Store(other),
            })?;

        self.record.used_artifacts.push(version.qualified_name());
        Ok(UsedArtifact {
            store: Arc::clone(&self.store),
            version,
            download_dir: self.download_dir.clone(),
        })
    }

    /// Upload an artifact as an output of this run.
    pub async fn log_artifact(&mut self, artifact: &Artifact) -> CleaningResult<ArtifactVersion> {
        let version = self.store.log_artifact(self.record.id, artifact).await?;
        self.record.logged_artifacts.push(version.qualified_name());
        Ok(version)
    }

    /// Close the run as successful.
    pub async fn finish(self, summary: Map<String, Value>) -> CleaningResult<RunRecord> {
        let record = self
            .store
            .finish_run(self.record.id, RunState::Finished, summary)
            .await?;
        self.span.in_scope(|| info!("Run finished"));
        Ok(record)
    }

    /// Close the run as failed, recording the reason in its summary.
    pub async fn fail(self, reason: &str) -> CleaningResult<RunRecord> {
        let mut summary = Map::new();
        summary.insert("error".to_string(), Value::from(reason));
        let record = self
            .store
            .finish_run(self.record.id, RunState::Failed, summary)
            .await?;
        self.span.in_scope(|| warn!(reason, "Run failed"));
        Ok(record)
    }
}

impl UsedArtifact {
    pub fn version(&self) -> &ArtifactVersion {
        &self.version
    }

    /// Download the artifact and return the path of its only file.
    ///
    /// Fails if the artifact holds zero or several files.
    pub async fn file(&self) -> CleaningResult<PathBuf> {
        let [entry] = self.version.files.as_slice() else {
            return Err(StoreError::ValidationError(format!(
                "{} holds {} files, expected exactly one",
                self.version.qualified_name(),
                self.version.files.len()
            ))
            .into());
        };

        let dir = self
            .store
            .download_artifact(&self.version, &self.download_dir)
            .await?;
        Ok(dir.join(&entry.path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryArtifactStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_run_lifecycle() {
        let store = Arc::new(MemoryArtifactStore::new());
        store
            .seed_artifact("sample.csv", "raw_data", "sample.csv", b"price\n1\n")
            .unwrap();
        let downloads = TempDir::new().unwrap();

        let mut run = Run::init(store.clone(), "basic_cleaning", downloads.path())
            .await
            .unwrap();
        let mut config = Map::new();
        config.insert("min_price".to_string(), Value::from(1.0));
        run.update_config(config).await.unwrap();

        let used = run.use_artifact("sample.csv:latest").await.unwrap();
        let path = used.file().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "price\n1\n");

        let id = run.id();
        let record = run.finish(Map::new()).await.unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.state, RunState::Finished);
        assert_eq!(record.used_artifacts, vec!["sample.csv:v0".to_string()]);
        assert_eq!(record.config["min_price"], Value::from(1.0));
    }

    #[tokio::test]
    async fn test_unknown_artifact_maps_to_not_found() {
        let store = Arc::new(MemoryArtifactStore::new());
        let downloads = TempDir::new().unwrap();
        let mut run = Run::init(store, "basic_cleaning", downloads.path())
            .await
            .unwrap();

        let err = run.use_artifact("missing.csv:latest").await.err().unwrap();
        assert!(matches!(err, CleaningError::ArtifactNotFound(_)));

        let record = run.fail(&err.to_string()).await.unwrap();
        assert_eq!(record.state, RunState::Failed);
        assert!(record.summary["error"].as_str().unwrap().contains("missing.csv"));
    }
}
