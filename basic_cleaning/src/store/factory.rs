//! Store factory for dependency injection.
//!
//! Creates the configured [`ArtifactStore`] implementation at runtime.

use std::str::FromStr;
use std::sync::Arc;

use super::{ArtifactStore, MemoryArtifactStore, StoreError, StoreResult};
use crate::config::StoreSettings;

/// Store type configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    /// Directory-backed store
    Local,
    /// In-memory store, discarded at exit
    Memory,
}

impl FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "memory" => Ok(Self::Memory),
            _ => Err(format!(
                "Unknown store type: {}. Use 'local' or 'memory'",
                s
            )),
        }
    }
}

/// Store factory for creating store instances.
///
/// # Example
/// ```no_run
/// use basic_cleaning::config::StoreSettings;
/// use basic_cleaning::store::StoreFactory;
///
/// let store = StoreFactory::create(&StoreSettings::default()).unwrap();
/// ```
pub struct StoreFactory;

impl StoreFactory {
    /// Create a store instance from settings.
    ///
    /// # Returns
    /// * `Ok(Arc<dyn ArtifactStore>)` - Store instance
    /// * `Err(StoreError::ConfigurationError)` - Unknown or unavailable type
    pub fn create(settings: &StoreSettings) -> StoreResult<Arc<dyn ArtifactStore>> {
        let store_type = settings
            .store_type
            .parse::<StoreType>()
            .map_err(StoreError::ConfigurationError)?;

        match store_type {
            StoreType::Local => Self::create_local(settings),
            StoreType::Memory => Ok(Self::create_memory()),
        }
    }

    #[cfg(feature = "local-store")]
    fn create_local(settings: &StoreSettings) -> StoreResult<Arc<dyn ArtifactStore>> {
        let store = super::LocalArtifactStore::open(&settings.root)?;
        Ok(Arc::new(store))
    }

    #[cfg(not(feature = "local-store"))]
    fn create_local(_settings: &StoreSettings) -> StoreResult<Arc<dyn ArtifactStore>> {
        Err(StoreError::ConfigurationError(
            "Local store support not compiled in. Enable the 'local-store' feature".to_string(),
        ))
    }

    /// Create an empty in-memory store.
    pub fn create_memory() -> Arc<dyn ArtifactStore> {
        Arc::new(MemoryArtifactStore::new())
    }
}
