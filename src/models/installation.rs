use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::new_id;
use crate::state_machine::InstallationState;

/// Placement policy for an installation's cluster installations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationAffinity {
    /// One installation per cluster
    Isolated,
}

impl InstallationAffinity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Isolated => "isolated",
        }
    }
}

impl std::str::FromStr for InstallationAffinity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "isolated" => Ok(Self::Isolated),
            _ => Err(format!("Invalid installation affinity: {s}")),
        }
    }
}

impl Default for InstallationAffinity {
    fn default() -> Self {
        Self::Isolated
    }
}

/// A tenant workload whose provisioning lifecycle the supervisor drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installation {
    pub id: String,
    pub owner_id: String,
    pub version: String,
    pub dns: String,
    pub affinity: InstallationAffinity,
    pub state: InstallationState,
    pub create_at: DateTime<Utc>,
    pub delete_at: Option<DateTime<Utc>>,
    pub lock_acquired_by: Option<String>,
    pub lock_acquired_at: Option<DateTime<Utc>>,
}

impl Installation {
    /// Build a new installation in `CreationRequested`
    pub fn new(
        owner_id: impl Into<String>,
        version: impl Into<String>,
        dns: impl Into<String>,
    ) -> Self {
        Self {
            id: new_id(),
            owner_id: owner_id.into(),
            version: version.into(),
            dns: dns.into(),
            affinity: InstallationAffinity::Isolated,
            state: InstallationState::CreationRequested,
            create_at: Utc::now(),
            delete_at: None,
            lock_acquired_by: None,
            lock_acquired_at: None,
        }
    }

    pub fn with_state(mut self, state: InstallationState) -> Self {
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
