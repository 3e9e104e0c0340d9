use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::state_machine::ClusterInstallationState;

/// An installation materialized on one cluster, in its own namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInstallation {
    pub id: String,
    pub cluster_id: String,
    pub installation_id: String,
    pub namespace: String,
    pub state: ClusterInstallationState,
    pub create_at: DateTime<Utc>,
    pub delete_at: Option<DateTime<Utc>>,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: Option<DateTime<Utc>>,
}

impl ClusterInstallation {
    /// Build a creation request with a freshly generated namespace.
    ///
    /// The id is left empty; the store assigns one on insert.
    pub fn requested(cluster_id: impl Into<String>, installation_id: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            cluster_id: cluster_id.into(),
            installation_id: installation_id.into(),
            namespace: new_id(),
            state: ClusterInstallationState::CreationRequested,
            create_at: Utc::now(),
            delete_at: None,
            lock_acquired_by: None,
            lock_acquired_at: None,
        }
    }

    pub fn with_state(mut self, state: ClusterInstallationState) -> Self {
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
