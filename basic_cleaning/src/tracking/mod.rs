//! Run handle over a tracking store.

pub mod run;

pub use run::{Run, UsedArtifact};
