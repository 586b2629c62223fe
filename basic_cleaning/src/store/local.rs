//! Directory-backed tracking store.
//!
//! Layout under the store root:
//!
//! ```text
//! artifacts/<name>/v<N>/manifest.json
//! artifacts/<name>/v<N>/files/<file>
//! runs/<run_id>.json
//! ```
//!
//! A version is staged in a hidden directory next to its siblings and published
//! with a single rename. `latest` is the highest published version, so the
//! rename is the only step that registers anything.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

use super::models::{RunRecord, RunState};
use super::versioning::{find_version, plan_registration, Registration};
use super::{ArtifactStore, StoreError, StoreResult};
use crate::artifact::checksum::file_digest;
use crate::artifact::{validate_name, Artifact, ArtifactRef, ArtifactVersion, LATEST_ALIAS};

const MANIFEST_FILE: &str = "manifest.json";
const FILES_DIR: &str = "files";

/// Tracking store persisted in a local directory.
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("artifacts"))?;
        fs::create_dir_all(root.join("runs"))?;
        debug!(root = %root.display(), "Opened local tracking store");
        Ok(Self { root })
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join("artifacts").join(name)
    }

    fn version_dir(&self, name: &str, version: u32) -> PathBuf {
        self.artifact_dir(name).join(format!("v{}", version))
    }

    fn run_path(&self, run_id: Uuid) -> PathBuf {
        self.root.join("runs").join(format!("{}.json", run_id))
    }

    fn load_run(&self, run_id: Uuid) -> StoreResult<RunRecord> {
        let path = self.run_path(run_id);
        if !path.exists() {
            return Err(StoreError::NotFound(format!("Run {} does not exist", run_id)));
        }
        read_json(&path)
    }

    fn save_run(&self, run: &RunRecord) -> StoreResult<()> {
        write_json_atomic(&self.run_path(run.id), run)
    }

    /// Every published version of `name`, oldest first. The newest one carries
    /// the `latest` alias.
    fn load_versions(&self, name: &str) -> StoreResult<Vec<ArtifactVersion>> {
        let dir = self.artifact_dir(name);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut versions = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(label) = file_name.to_str() else {
                continue;
            };
            // staging directories are skipped
            if !label.starts_with('v') || !entry.file_type()?.is_dir() {
                continue;
            }
            let manifest = entry.path().join(MANIFEST_FILE);
            if !manifest.is_file() {
                continue;
            }
            versions.push(read_json::<ArtifactVersion>(&manifest)?);
        }
        versions.sort_by_key(|v| v.version);
        if let Some(newest) = versions.last_mut() {
            newest.aliases = vec![LATEST_ALIAS.to_string()];
        }
        Ok(versions)
    }

    fn publish(&self, artifact: &Artifact, version: &ArtifactVersion) -> StoreResult<()> {
        let artifact_dir = self.artifact_dir(&artifact.name);
        fs::create_dir_all(&artifact_dir)?;

        let staging = artifact_dir.join(format!(".staging-{}", Uuid::new_v4()));
        let result = self.stage(artifact, version, &staging).and_then(|()| {
            let target = self.version_dir(&artifact.name, version.version);
            if target.exists() {
                return Err(StoreError::UploadError(format!(
                    "Version {} already exists",
                    version.qualified_name()
                )));
            }
            fs::rename(&staging, &target)?;
            Ok(())
        });
        if result.is_err() && staging.exists() {
            let _ = fs::remove_dir_all(&staging);
        }
        result
    }

    fn stage(&self, artifact: &Artifact, version: &ArtifactVersion, staging: &Path) -> StoreResult<()> {
        let files_dir = staging.join(FILES_DIR);
        fs::create_dir_all(&files_dir)?;

        for (path, entry) in artifact.files().iter().zip(&version.files) {
            let dest = files_dir.join(&entry.path);
            fs::copy(path, &dest)?;
            // the source may have changed since the manifest was computed
            if file_digest(&dest)? != entry.digest {
                return Err(StoreError::UploadError(format!(
                    "File '{}' changed during upload",
                    path.display()
                )));
            }
        }

        let mut stored = version.clone();
        stored.aliases.clear();
        write_json_atomic(&staging.join(MANIFEST_FILE), &stored)
    }
}

#[async_trait]
impl ArtifactStore for LocalArtifactStore {
    async fn health_check(&self) -> StoreResult<bool> {
        Ok(self.root.join("artifacts").is_dir() && self.root.join("runs").is_dir())
    }

    async fn create_run(&self, job_type: &str) -> StoreResult<RunRecord> {
        let run = RunRecord::new(job_type);
        self.save_run(&run)?;
        Ok(run)
    }

    async fn update_run_config(
        &self,
        run_id: Uuid,
        config: Map<String, Value>,
    ) -> StoreResult<()> {
        let mut run = self.load_run(run_id)?;
        run.config.extend(config);
        self.save_run(&run)
    }

    async fn get_run(&self, run_id: Uuid) -> StoreResult<RunRecord> {
        self.load_run(run_id)
    }

    async fn finish_run(
        &self,
        run_id: Uuid,
        state: RunState,
        summary: Map<String, Value>,
    ) -> StoreResult<RunRecord> {
        let mut run = self.load_run(run_id)?;
        run.close(state, summary);
        self.save_run(&run)?;
        Ok(run)
    }

    async fn resolve_artifact(&self, reference: &ArtifactRef) -> StoreResult<ArtifactVersion> {
        validate_name(&reference.name)?;
        let versions = self.load_versions(&reference.name)?;
        find_version(&versions, reference)
    }

    async fn use_artifact(
        &self,
        run_id: Uuid,
        reference: &ArtifactRef,
    ) -> StoreResult<ArtifactVersion> {
        let version = self.resolve_artifact(reference).await?;
        let mut run = self.load_run(run_id)?;
        let label = version.qualified_name();
        if !run.used_artifacts.contains(&label) {
            run.used_artifacts.push(label);
            self.save_run(&run)?;
        }
        Ok(version)
    }

    async fn download_artifact(
        &self,
        version: &ArtifactVersion,
        dest_dir: &Path,
    ) -> StoreResult<PathBuf> {
        let source = self.version_dir(&version.name, version.version).join(FILES_DIR);
        if !source.is_dir() {
            return Err(StoreError::NotFound(format!(
                "Files of {} are missing from the store",
                version.qualified_name()
            )));
        }

        let target = dest_dir.join(format!("{}-{}", version.name, version.version_label()));
        fs::create_dir_all(&target)?;

        for entry in &version.files {
            let dest = target.join(&entry.path);
            if dest.is_file() && file_digest(&dest)? == entry.digest {
                debug!(file = %dest.display(), "Reusing downloaded file");
                continue;
            }
            fs::copy(source.join(&entry.path), &dest)?;
        }
        Ok(target)
    }

    async fn log_artifact(
        &self,
        run_id: Uuid,
        artifact: &Artifact,
    ) -> StoreResult<ArtifactVersion> {
        artifact.validate()?;
        let mut run = self.load_run(run_id)?;
        let files = artifact.manifest()?;

        let existing = self.load_versions(&artifact.name)?;
        let version = match plan_registration(&existing, artifact, files, run_id) {
            Registration::Existing(v) => {
                info!(artifact = %v.qualified_name(), "Content unchanged, reusing version");
                v
            }
            Registration::New(v) => {
                self.publish(artifact, &v)?;
                v
            }
        };

        let label = version.qualified_name();
        if !run.logged_artifacts.contains(&label) {
            run.logged_artifacts.push(label);
            self.save_run(&run)?;
        }
        Ok(version)
    }

    async fn list_versions(&self, name: &str) -> StoreResult<Vec<ArtifactVersion>> {
        validate_name(name)?;
        self.load_versions(name)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> StoreResult<T> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let tmp = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
    fs::write(&tmp, serde_json::to_vec_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact_with(dir: &Path, content: &str) -> Artifact {
        let path = dir.join("clean_sample.csv");
        fs::write(&path, content).unwrap();
        let mut artifact = Artifact::new("clean_sample.csv", "clean_sample", "Data with outliers removed");
        artifact.add_file(&path).unwrap();
        artifact
    }

    #[tokio::test]
    async fn test_log_and_resolve_round_trip() {
        let root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = LocalArtifactStore::open(root.path()).unwrap();
        let run = store.create_run("basic_cleaning").await.unwrap();

        let logged = store
            .log_artifact(run.id, &artifact_with(work.path(), "price\n50\n"))
            .await
            .unwrap();
        assert_eq!(logged.version, 0);
        assert_eq!(logged.created_by, Some(run.id));

        let resolved = store
            .resolve_artifact(&ArtifactRef::latest("clean_sample.csv"))
            .await
            .unwrap();
        assert_eq!(resolved.digest, logged.digest);
        assert_eq!(resolved.aliases, vec!["latest".to_string()]);
        assert_eq!(resolved.description, "Data with outliers removed");

        let record = store.get_run(run.id).await.unwrap();
        assert_eq!(record.logged_artifacts, vec!["clean_sample.csv:v0".to_string()]);
    }

    #[tokio::test]
    async fn test_new_content_creates_new_version() {
        let root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = LocalArtifactStore::open(root.path()).unwrap();
        let run = store.create_run("basic_cleaning").await.unwrap();

        store.log_artifact(run.id, &artifact_with(work.path(), "price\n50\n")).await.unwrap();
        let same = store.log_artifact(run.id, &artifact_with(work.path(), "price\n50\n")).await.unwrap();
        assert_eq!(same.version, 0);

        let next = store.log_artifact(run.id, &artifact_with(work.path(), "price\n60\n")).await.unwrap();
        assert_eq!(next.version, 1);

        let versions = store.list_versions("clean_sample.csv").await.unwrap();
        assert_eq!(versions.len(), 2);
        assert!(versions[0].aliases.is_empty());
        assert_eq!(versions[1].aliases, vec!["latest".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_publish_registers_nothing() {
        let root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let store = LocalArtifactStore::open(root.path()).unwrap();
        let run = store.create_run("basic_cleaning").await.unwrap();

        // a leftover directory without a manifest blocks the v0 rename
        let artifact_dir = root.path().join("artifacts").join("clean_sample.csv");
        fs::create_dir_all(artifact_dir.join("v0")).unwrap();

        let err = store
            .log_artifact(run.id, &artifact_with(work.path(), "price\n50\n"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UploadError(_)));

        assert!(store.list_versions("clean_sample.csv").await.unwrap().is_empty());
        let err = store
            .resolve_artifact(&ArtifactRef::latest("clean_sample.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let staged = fs::read_dir(&artifact_dir)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().starts_with(".staging"))
            .count();
        assert_eq!(staged, 0);

        let record = store.get_run(run.id).await.unwrap();
        assert!(record.logged_artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_download_copies_files() {
        let root = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let store = LocalArtifactStore::open(root.path()).unwrap();
        let run = store.create_run("basic_cleaning").await.unwrap();

        let version = store
            .log_artifact(run.id, &artifact_with(work.path(), "price\n50\n"))
            .await
            .unwrap();
        let dir = store.download_artifact(&version, downloads.path()).await.unwrap();
        assert_eq!(dir, downloads.path().join("clean_sample.csv-v0"));
        assert_eq!(
            fs::read_to_string(dir.join("clean_sample.csv")).unwrap(),
            "price\n50\n"
        );

        // second download reuses the file
        let again = store.download_artifact(&version, downloads.path()).await.unwrap();
        assert_eq!(again, dir);
    }

    #[tokio::test]
    async fn test_missing_artifact_and_run() {
        let root = TempDir::new().unwrap();
        let store = LocalArtifactStore::open(root.path()).unwrap();

        let err = store
            .resolve_artifact(&"sample.csv:latest".parse().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = store.get_run(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_finish_run_persists_state() {
        let root = TempDir::new().unwrap();
        let store = LocalArtifactStore::open(root.path()).unwrap();
        let run = store.create_run("basic_cleaning").await.unwrap();

        let mut config = Map::new();
        config.insert("min_price".to_string(), Value::from(10.0));
        store.update_run_config(run.id, config).await.unwrap();

        let mut summary = Map::new();
        summary.insert("output_rows".to_string(), Value::from(2));
        let closed = store.finish_run(run.id, RunState::Finished, summary).await.unwrap();
        assert_eq!(closed.state, RunState::Finished);
        assert!(closed.finished_at.is_some());

        let reopened = LocalArtifactStore::open(root.path()).unwrap();
        let record = reopened.get_run(run.id).await.unwrap();
        assert_eq!(record.config["min_price"], Value::from(10.0));
        assert_eq!(record.summary["output_rows"], Value::from(2));
    }
}
