//! Run records kept by the tracking store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Finished,
    Failed,
}

/// Everything the store knows about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: Uuid,
    pub job_type: String,
    pub state: RunState,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub summary: Map<String, Value>,
    /// `name:vN` of every artifact version the run consumed
    #[serde(default)]
    pub used_artifacts: Vec<String>,
    /// `name:vN` of every artifact version the run produced
    #[serde(default)]
    pub logged_artifacts: Vec<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    pub fn new(job_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_type: job_type.into(),
            state: RunState::Running,
            config: Map::new(),
            summary: Map::new(),
            used_artifacts: Vec::new(),
            logged_artifacts: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn close(&mut self, state: RunState, summary: Map<String, Value>) {
        self.state = state;
        self.summary.extend(summary);
        self.finished_at = Some(Utc::now());
    }
}
