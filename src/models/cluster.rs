use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::state_machine::ClusterState;

/// A provisioning target able to host installations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    pub id: String,
    pub provider: String,
    pub size: String,
    pub state: ClusterState,
    pub create_at: DateTime<Utc>,
    pub delete_at: Option<DateTime<Utc>>,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: Option<DateTime<Utc>>,
}

impl Cluster {
    pub fn new(provider: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            provider: provider.into(),
            size: size.into(),
            state: ClusterState::CreationRequested,
            create_at: Utc::now(),
            delete_at: None,
            lock_acquired_by: None,
            lock_acquired_at: None,
        }
    }

    pub fn with_state(mut self, state: ClusterState) -> Self {
        self.state = state;
        self
    }

    pub fn is_deleted(&self) -> bool {
        self.delete_at.is_some()
    }

    pub fn is_locked(&self) -> bool {
        self.lock_acquired_at.is_some()
    }
}
