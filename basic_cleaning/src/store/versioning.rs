//! Version assignment shared by the store implementations.

use chrono::Utc;
use uuid::Uuid;

use crate::artifact::checksum::manifest_digest;
use crate::artifact::{
    Artifact, ArtifactAlias, ArtifactRef, ArtifactVersion, ManifestEntry, LATEST_ALIAS,
};

use super::{StoreError, StoreResult};

/// Outcome of registering an artifact against the versions already stored.
#[derive(Debug)]
pub(crate) enum Registration {
    /// Content and metadata match the current `latest`; nothing new to store.
    Existing(ArtifactVersion),
    /// A new version that takes over the `latest` alias.
    New(ArtifactVersion),
}

/// Decide whether `artifact` needs a new version.
///
/// The current `latest` is reused only when its digest, type and description
/// all equal the incoming ones. Any difference yields version `max + 1`.
pub(crate) fn plan_registration(
    existing: &[ArtifactVersion],
    artifact: &Artifact,
    files: Vec<ManifestEntry>,
    run_id: Uuid,
) -> Registration {
    let digest = manifest_digest(&files);

    if let Some(latest) = existing
        .iter()
        .find(|v| v.matches(&ArtifactAlias::Latest))
    {
        if latest.digest == digest
            && latest.artifact_type == artifact.artifact_type
            && latest.description == artifact.description
        {
            return Registration::Existing(latest.clone());
        }
    }

    let version = existing
        .iter()
        .map(|v| v.version)
        .max()
        .map_or(0, |v| v + 1);

    Registration::New(ArtifactVersion {
        name: artifact.name.clone(),
        version,
        artifact_type: artifact.artifact_type.clone(),
        description: artifact.description.clone(),
        aliases: vec![LATEST_ALIAS.to_string()],
        files,
        digest,
        created_at: Utc::now(),
        created_by: Some(run_id),
    })
}

/// Strip `latest` from every stored version before a new one is published.
pub(crate) fn release_latest(versions: &mut [ArtifactVersion]) {
    for v in versions.iter_mut() {
        v.aliases.retain(|a| a != LATEST_ALIAS);
    }
}

pub(crate) fn find_version(
    versions: &[ArtifactVersion],
    reference: &ArtifactRef,
) -> StoreResult<ArtifactVersion> {
    versions
        .iter()
        .find(|v| v.matches(&reference.alias))
        .cloned()
        .ok_or_else(|| StoreError::NotFound(format!("Artifact {} does not exist", reference)))
}
