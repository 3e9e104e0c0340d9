use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle states of an installation, persisted in kebab-case form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallationState {
    /// Initial state, waiting to be placed on a cluster
    CreationRequested,
    /// A cluster installation failed to come up
    CreationFailed,
    /// Every cluster installation is stable
    Stable,
    /// An upgrade was requested but not yet dispatched
    UpgradeRequested,
    /// Upgrades were dispatched to every cluster installation
    UpgradeInProgress,
    /// A cluster installation failed during upgrade
    UpgradeFailed,
    /// Deletion was requested
    DeletionRequested,
    /// Cluster installations are being torn down
    DeletionInProgress,
    /// A cluster installation failed to delete
    DeletionFailed,
    /// Terminal state
    Deleted,
}

impl InstallationState {
    pub const ALL: [InstallationState; 10] = [
        Self::CreationRequested,
        Self::CreationFailed,
        Self::Stable,
        Self::UpgradeRequested,
        Self::UpgradeInProgress,
        Self::UpgradeFailed,
        Self::DeletionRequested,
        Self::DeletionInProgress,
        Self::DeletionFailed,
        Self::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreationRequested => "creation-requested",
            Self::CreationFailed => "creation-failed",
            Self::Stable => "stable",
            Self::UpgradeRequested => "upgrade-requested",
            Self::UpgradeInProgress => "upgrade-in-progress",
            Self::UpgradeFailed => "upgrade-failed",
            Self::DeletionRequested => "deletion-requested",
            Self::DeletionInProgress => "deletion-in-progress",
            Self::DeletionFailed => "deletion-failed",
            Self::Deleted => "deleted",
        }
    }

    /// Whether the supervisor has work to do for an installation in this state
    pub fn is_pending_work(&self) -> bool {
        matches!(
            self,
            Self::CreationRequested
                | Self::UpgradeRequested
                | Self::UpgradeInProgress
                | Self::DeletionRequested
                | Self::DeletionInProgress
        )
    }
}

impl fmt::Display for InstallationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InstallationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|state| state.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid installation state: {s}"))
    }
}

impl Default for InstallationState {
    fn default() -> Self {
        Self::CreationRequested
    }
}

/// Cluster states. The supervisor only ever asks whether a cluster is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterState {
    CreationRequested,
    CreationFailed,
    ProvisioningRequested,
    ProvisioningFailed,
    UpgradeRequested,
    UpgradeFailed,
    DeletionRequested,
    DeletionFailed,
    Deleted,
    Stable,
}

impl ClusterState {
    pub const ALL: [ClusterState; 10] = [
        Self::CreationRequested,
        Self::CreationFailed,
        Self::ProvisioningRequested,
        Self::ProvisioningFailed,
        Self::UpgradeRequested,
        Self::UpgradeFailed,
        Self::DeletionRequested,
        Self::DeletionFailed,
        Self::Deleted,
        Self::Stable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreationRequested => "creation-requested",
            Self::CreationFailed => "creation-failed",
            Self::ProvisioningRequested => "provisioning-requested",
            Self::ProvisioningFailed => "provisioning-failed",
            Self::UpgradeRequested => "upgrade-requested",
            Self::UpgradeFailed => "upgrade-failed",
            Self::DeletionRequested => "deletion-requested",
            Self::DeletionFailed => "deletion-failed",
            Self::Deleted => "deleted",
            Self::Stable => "stable",
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Self::Stable)
    }
}

impl fmt::Display for ClusterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClusterState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|state| state.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid cluster state: {s}"))
    }
}

impl Default for ClusterState {
    fn default() -> Self {
        Self::CreationRequested
    }
}

/// States of a single installation materialized on a single cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClusterInstallationState {
    CreationRequested,
    CreationFailed,
    Stable,
    Reconciling,
    DeletionRequested,
    DeletionFailed,
    Deleted,
}

impl ClusterInstallationState {
    pub const ALL: [ClusterInstallationState; 7] = [
        Self::CreationRequested,
        Self::CreationFailed,
        Self::Stable,
        Self::Reconciling,
        Self::DeletionRequested,
        Self::DeletionFailed,
        Self::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreationRequested => "creation-requested",
            Self::CreationFailed => "creation-failed",
            Self::Stable => "stable",
            Self::Reconciling => "reconciling",
            Self::DeletionRequested => "deletion-requested",
            Self::DeletionFailed => "deletion-failed",
            Self::Deleted => "deleted",
        }
    }

    /// The failure state matching the phase this state belongs to.
    ///
    /// States outside a create or delete phase map to themselves.
    pub fn failed_variant(&self) -> Self {
        match self {
            Self::CreationRequested => Self::CreationFailed,
            Self::DeletionRequested => Self::DeletionFailed,
            other => *other,
        }
    }
}

impl fmt::Display for ClusterInstallationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClusterInstallationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|state| state.as_str() == s)
            .copied()
            .ok_or_else(|| format!("Invalid cluster installation state: {s}"))
    }
}

impl Default for ClusterInstallationState {
    fn default() -> Self {
        Self::CreationRequested
    }
}
