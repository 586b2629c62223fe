//! In-memory tracking store.
//!
//! Stores runs, artifact versions and file contents in HashMaps behind a
//! `RwLock`. Nothing is persisted; it exists for unit tests, integration tests
//! and dry runs. Health and upload failures can be simulated.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use super::models::{RunRecord, RunState};
use super::versioning::{find_version, plan_registration, release_latest, Registration};
use super::{ArtifactStore, StoreError, StoreResult};
use crate::artifact::checksum::content_digest;
use crate::artifact::{file_name_of, Artifact, ArtifactRef, ArtifactVersion, ManifestEntry};

/// In-memory tracking store.
///
/// # Example
/// ```
/// use basic_cleaning::store::{ArtifactStore, MemoryArtifactStore};
///
/// # async fn example() {
/// let store = MemoryArtifactStore::new();
/// store
///     .seed_artifact("sample.csv", "raw_data", "sample.csv", b"price\n10\n")
///     .unwrap();
/// let versions = store.list_versions("sample.csv").await.unwrap();
/// assert_eq!(versions.len(), 1);
/// # }
/// ```
#[derive(Clone, Default)]
pub struct MemoryArtifactStore {
    data: Arc<RwLock<MemoryData>>,
}

struct MemoryData {
    runs: HashMap<Uuid, RunRecord>,
    versions: HashMap<String, Vec<ArtifactVersion>>,
    // keyed by file digest
    blobs: HashMap<String, Vec<u8>>,
    is_healthy: bool,
    fail_uploads: bool,
}

impl Default for MemoryData {
    fn default() -> Self {
        Self {
            runs: HashMap::new(),
            versions: HashMap::new(),
            blobs: HashMap::new(),
            is_healthy: true,
            fail_uploads: false,
        }
    }
}

impl MemoryArtifactStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, MemoryData>> {
        self.data
            .read()
            .map_err(|_| StoreError::InternalError("Store lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, MemoryData>> {
        self.data
            .write()
            .map_err(|_| StoreError::InternalError("Store lock poisoned".to_string()))
    }

    fn ensure_healthy(data: &MemoryData) -> StoreResult<()> {
        if data.is_healthy {
            Ok(())
        } else {
            Err(StoreError::ConnectionError(
                "Tracking store is unavailable".to_string(),
            ))
        }
    }

    /// Simulate the store going down or coming back.
    pub fn set_healthy(&self, healthy: bool) -> StoreResult<()> {
        self.write()?.is_healthy = healthy;
        Ok(())
    }

    /// Make every subsequent `log_artifact` fail after the files were read.
    pub fn set_fail_uploads(&self, fail: bool) -> StoreResult<()> {
        self.write()?.fail_uploads = fail;
        Ok(())
    }

    /// Register a single-file artifact without a producing run.
    ///
    /// Helper for setting up input data.
    pub fn seed_artifact(
        &self,
        name: &str,
        artifact_type: &str,
        file_name: &str,
        content: &[u8],
    ) -> StoreResult<ArtifactVersion> {
        crate::artifact::validate_name(name)?;
        let digest = content_digest(content);
        let entry = ManifestEntry {
            path: file_name.to_string(),
            digest: digest.clone(),
            size: content.len() as u64,
        };
        let artifact = Artifact::new(name, artifact_type, "");

        let mut data = self.write()?;
        data.blobs.insert(digest, content.to_vec());
        let versions = data.versions.entry(name.to_string()).or_default();
        let version = match plan_registration(&versions[..], &artifact, vec![entry], Uuid::nil()) {
            Registration::Existing(v) => v,
            Registration::New(mut v) => {
                v.created_by = None;
                release_latest(versions);
                versions.push(v.clone());
                v
            }
        };
        Ok(version)
    }

    /// Raw contents of a stored file.
    pub fn file_contents(&self, version: &ArtifactVersion, file_name: &str) -> StoreResult<Vec<u8>> {
        let data = self.read()?;
        let entry = version
            .files
            .iter()
            .find(|e| e.path == file_name)
            .ok_or_else(|| {
                StoreError::NotFound(format!(
                    "File '{}' not in {}",
                    file_name,
                    version.qualified_name()
                ))
            })?;
        data.blobs
            .get(&entry.digest)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Blob {} missing", entry.digest)))
    }

    fn run_mut<'a>(data: &'a mut MemoryData, run_id: Uuid) -> StoreResult<&'a mut RunRecord> {
        data.runs
            .get_mut(&run_id)
            .ok_or_else(|| StoreError::NotFound(format!("Run {} does not exist", run_id)))
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn health_check(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_healthy)
    }

    async fn create_run(&self, job_type: &str) -> StoreResult<RunRecord> {
        let mut data = self.write()?;
        Self::ensure_healthy(&data)?;
        let run = RunRecord::new(job_type);
        data.runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn update_run_config(
        &self,
        run_id: Uuid,
        config: Map<String, Value>,
    ) -> StoreResult<()> {
        let mut data = self.write()?;
        Self::ensure_healthy(&data)?;
        Self::run_mut(&mut data, run_id)?.config.extend(config);
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> StoreResult<RunRecord> {
        let data = self.read()?;
        data.runs
            .get(&run_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("Run {} does not exist", run_id)))
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        state: RunState,
        summary: Map<String, Value>,
    ) -> StoreResult<RunRecord> {
        let mut data = self.write()?;
        Self::ensure_healthy(&data)?;
        let run = Self::run_mut(&mut data, run_id)?;
        run.close(state, summary);
        Ok(run.clone())
    }

    async fn resolve_artifact(&self, reference: &ArtifactRef) -> StoreResult<ArtifactVersion> {
        let data = self.read()?;
        Self::ensure_healthy(&data)?;
        let versions = data.versions.get(&reference.name).map(Vec::as_slice).unwrap_or(&[]);
        find_version(versions, reference)
    }

    async fn use_artifact(
        &self,
        run_id: Uuid,
        reference: &ArtifactRef,
    ) -> StoreResult<ArtifactVersion> {
        let version = self.resolve_artifact(reference).await?;
        let mut data = self.write()?;
        let run = Self::run_mut(&mut data, run_id)?;
        let label = version.qualified_name();
        if !run.used_artifacts.contains(&label) {
            run.used_artifacts.push(label);
        }
        Ok(version)
    }

    async fn download_artifact(
        &self,
        version: &ArtifactVersion,
        dest_dir: &Path,
    ) -> StoreResult<PathBuf> {
        Self::ensure_healthy(&*self.read()?)?;
        let target = dest_dir.join(format!("{}-{}", version.name, version.version_label()));
        std::fs::create_dir_all(&target)?;
        for entry in &version.files {
            let content = self.file_contents(version, &entry.path)?;
            std::fs::write(target.join(&entry.path), content)?;
        }
        Ok(target)
    }

    async fn log_artifact(
        &self,
        run_id: Uuid,
        artifact: &Artifact,
    ) -> StoreResult<ArtifactVersion> {
        artifact.validate()?;
        let files = artifact.manifest()?;
        let mut contents = Vec::with_capacity(files.len());
        for path in artifact.files() {
            contents.push((file_name_of(path)?, std::fs::read(path)?));
        }

        let mut data = self.write()?;
        Self::ensure_healthy(&data)?;
        if !data.runs.contains_key(&run_id) {
            return Err(StoreError::NotFound(format!("Run {} does not exist", run_id)));
        }
        if data.fail_uploads {
            return Err(StoreError::UploadError(format!(
                "Upload of artifact '{}' rejected",
                artifact.name
            )));
        }

        let existing = data.versions.get(&artifact.name).cloned().unwrap_or_default();
        let version = match plan_registration(&existing, artifact, files, run_id) {
            Registration::Existing(v) => v,
            Registration::New(v) => {
                for ((_, content), entry) in contents.into_iter().zip(&v.files) {
                    data.blobs.insert(entry.digest.clone(), content);
                }
                let versions = data.versions.entry(artifact.name.clone()).or_default();
                release_latest(versions);
                versions.push(v.clone());
                v
            }
        };

        let label = version.qualified_name();
        let run = Self::run_mut(&mut data, run_id)?;
        if !run.logged_artifacts.contains(&label) {
            run.logged_artifacts.push(label);
        }
        Ok(version)
    }

    async fn list_versions(&self, name: &str) -> StoreResult<Vec<ArtifactVersion>> {
        let data = self.read()?;
        Self::ensure_healthy(&data)?;
        let mut versions = data.versions.get(name).cloned().unwrap_or_default();
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_seed_resolve_and_download() {
        let store = MemoryArtifactStore::new();
        store
            .seed_artifact("sample.csv", "raw_data", "sample.csv", b"price\n10\n")
            .unwrap();

        let version = store
            .resolve_artifact(&"sample.csv:latest".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(version.version, 0);

        let dir = TempDir::new().unwrap();
        let target = store.download_artifact(&version, dir.path()).await.unwrap();
        let content = std::fs::read_to_string(target.join("sample.csv")).unwrap();
        assert_eq!(content, "price\n10\n");
    }

    #[tokio::test]
    async fn test_unhealthy_store_rejects_calls() {
        let store = MemoryArtifactStore::new();
        store.set_healthy(false).unwrap();
        assert!(!store.health_check().await.unwrap());
        let err = store.create_run("basic_cleaning").await.unwrap_err();
        assert!(matches!(err, StoreError::ConnectionError(_)));
    }

    #[tokio::test]
    async fn test_download_fails_while_unhealthy() {
        let store = MemoryArtifactStore::new();
        let version = store
            .seed_artifact("sample.csv", "raw_data", "sample.csv", b"price\n10\n")
            .unwrap();
        store.set_healthy(false).unwrap();

        let dir = TempDir::new().unwrap();
        let err = store.download_artifact(&version, dir.path()).await.unwrap_err();
        assert!(matches!(err, StoreError::ConnectionError(_)));
        assert!(!dir.path().join("sample.csv-v0").exists());
    }

    #[tokio::test]
    async fn test_use_artifact_records_lineage() {
        let store = MemoryArtifactStore::new();
        store
            .seed_artifact("sample.csv", "raw_data", "sample.csv", b"price\n")
            .unwrap();
        let run = store.create_run("basic_cleaning").await.unwrap();

        store
            .use_artifact(run.id, &ArtifactRef::latest("sample.csv"))
            .await
            .unwrap();
        let record = store.get_run(run.id).await.unwrap();
        assert_eq!(record.used_artifacts, vec!["sample.csv:v0".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_upload_registers_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("clean_sample.csv");
        std::fs::write(&path, "price\n").unwrap();
        let mut artifact = Artifact::new("clean_sample.csv", "clean_sample", "desc");
        artifact.add_file(&path).unwrap();

        let store = MemoryArtifactStore::new();
        let run = store.create_run("basic_cleaning").await.unwrap();
        store.set_fail_uploads(true).unwrap();

        let err = store.log_artifact(run.id, &artifact).await.unwrap_err();
        assert!(matches!(err, StoreError::UploadError(_)));
        assert!(store.list_versions("clean_sample.csv").await.unwrap().is_empty());
        assert!(store.get_run(run.id).await.unwrap().logged_artifacts.is_empty());
    }
}
