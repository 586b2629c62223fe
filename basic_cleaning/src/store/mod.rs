//! Tracking store abstraction.
//!
//! The [`ArtifactStore`] trait is the seam to the external tracking service:
//! run lifecycle, artifact resolution, download and upload. Implementations:
//! - [`MemoryArtifactStore`]: in-memory store for tests and dry runs
//! - [`LocalArtifactStore`]: directory-backed store (`local-store` feature)

pub mod error;
pub mod factory;
#[cfg(feature = "local-store")]
pub mod local;
pub mod memory;
pub mod models;
mod versioning;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::artifact::{Artifact, ArtifactRef, ArtifactVersion};

pub use error::{StoreError, StoreResult};
pub use factory::{StoreFactory, StoreType};
#[cfg(feature = "local-store")]
pub use local::LocalArtifactStore;
pub use memory::MemoryArtifactStore;
pub use models::{RunRecord, RunState};

/// Operations the cleaning job needs from a tracking store.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` so a store can be shared behind an
/// `Arc` between the run handle and the caller.
///
/// # Atomicity
/// `log_artifact` either registers a complete version or nothing at all.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Check that the store is reachable and usable.
    async fn health_check(&self) -> StoreResult<bool>;

    /// Register a new run in state `Running`.
    async fn create_run(&self, job_type: &str) -> StoreResult<RunRecord>;

    /// Merge `config` into the run's configuration snapshot.
    async fn update_run_config(&self, run_id: Uuid, config: Map<String, Value>)
        -> StoreResult<()>;

    /// Read back a run.
    ///
    /// * `Err(StoreError::NotFound)` - If the run doesn't exist
    async fn get_run(&self, run_id: Uuid) -> StoreResult<RunRecord>;

    /// Close a run with its final state and summary values.
    async fn finish_run(
        &self,
        run_id: Uuid,
        state: RunState,
        summary: Map<String, Value>,
    ) -> StoreResult<RunRecord>;

    /// Resolve `name:alias` to a registered version.
    ///
    /// * `Err(StoreError::NotFound)` - If no version matches
    async fn resolve_artifact(&self, reference: &ArtifactRef) -> StoreResult<ArtifactVersion>;

    /// Resolve a reference and record the run as its consumer.
    async fn use_artifact(
        &self,
        run_id: Uuid,
        reference: &ArtifactRef,
    ) -> StoreResult<ArtifactVersion>;

    /// Materialize the files of a version under `dest_dir`.
    ///
    /// # Returns
    /// The directory holding the version's files.
    async fn download_artifact(
        &self,
        version: &ArtifactVersion,
        dest_dir: &Path,
    ) -> StoreResult<PathBuf>;

    /// Upload an artifact and register it as the next version of its name,
    /// produced by `run_id`.
    ///
    /// If the content is identical to the current `latest` version, that
    /// version is returned and no new one is created.
    async fn log_artifact(&self, run_id: Uuid, artifact: &Artifact)
        -> StoreResult<ArtifactVersion>;

    /// All versions of an artifact name, oldest first.
    async fn list_versions(&self, name: &str) -> StoreResult<Vec<ArtifactVersion>>;
}
