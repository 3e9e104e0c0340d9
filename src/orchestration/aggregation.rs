//! # Aggregation
//!
//! Pure rules folding the states of an installation's cluster installations into a
//! single outcome for the installation. Nothing here touches the store, so the same
//! snapshot always aggregates to the same outcome.

use crate::state_machine::{ClusterInstallationState, InstallationState};

/// Per-state counts over a set of cluster installations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClusterInstallationCounts {
    pub total: usize,
    pub creation_requested: usize,
    pub creation_failed: usize,
    pub stable: usize,
    pub reconciling: usize,
    pub deletion_requested: usize,
    pub deletion_failed: usize,
    pub deleted: usize,
}

impl ClusterInstallationCounts {
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = ClusterInstallationState>,
    {
        let mut counts = Self::default();
        for state in states {
            counts.total += 1;
            match state {
                ClusterInstallationState::CreationRequested => counts.creation_requested += 1,
                ClusterInstallationState::CreationFailed => counts.creation_failed += 1,
                ClusterInstallationState::Stable => counts.stable += 1,
                ClusterInstallationState::Reconciling => counts.reconciling += 1,
                ClusterInstallationState::DeletionRequested => counts.deletion_requested += 1,
                ClusterInstallationState::DeletionFailed => counts.deletion_failed += 1,
                ClusterInstallationState::Deleted => counts.deleted += 1,
            }
        }
        counts
    }

    /// True for an empty set
    pub fn all_stable(&self) -> bool {
        self.stable == self.total
    }

    pub fn any_creation_failed(&self) -> bool {
        self.creation_failed > 0
    }

    /// True for an empty set
    pub fn all_deleted(&self) -> bool {
        self.deleted == self.total
    }
}

/// Outcome of waiting on cluster installations to converge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceOutcome {
    Stable,
    Failed,
    InProgress,
}

/// All stable wins, then any creation failure, otherwise keep waiting
pub fn convergence_outcome(counts: &ClusterInstallationCounts) -> ConvergenceOutcome {
    if counts.all_stable() {
        ConvergenceOutcome::Stable
    } else if counts.any_creation_failed() {
        ConvergenceOutcome::Failed
    } else {
        ConvergenceOutcome::InProgress
    }
}

/// What the delete pass does with one cluster installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionDisposition {
    /// Mark it `DeletionRequested`
    RequestDeletion,
    /// Deletion already requested
    Deleting,
    /// Failed deletion while the installation is already mid-deletion
    Failed,
    Deleted,
    /// A state deletion cannot proceed from
    Unrecoverable,
}

/// Classify a cluster installation for the delete pass.
///
/// A `DeletionFailed` child is retried while the installation is still
/// `DeletionRequested`, and counted as a hard failure once it is `DeletionInProgress`.
pub fn deletion_disposition(
    child: ClusterInstallationState,
    parent: InstallationState,
) -> DeletionDisposition {
    match child {
        ClusterInstallationState::CreationRequested
        | ClusterInstallationState::CreationFailed
        | ClusterInstallationState::Stable => DeletionDisposition::RequestDeletion,
        ClusterInstallationState::DeletionRequested => DeletionDisposition::Deleting,
        ClusterInstallationState::DeletionFailed => {
            if parent == InstallationState::DeletionInProgress {
                DeletionDisposition::Failed
            } else {
                DeletionDisposition::RequestDeletion
            }
        }
        ClusterInstallationState::Deleted => DeletionDisposition::Deleted,
        ClusterInstallationState::Reconciling => DeletionDisposition::Unrecoverable,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    Failed,
    InProgress,
    Complete,
}

/// Fold the cluster installation states left after a delete pass.
///
/// Any failure wins over partial completion; completion needs every child deleted.
pub fn deletion_outcome(counts: &ClusterInstallationCounts) -> DeletionOutcome {
    if counts.deletion_failed > 0 {
        DeletionOutcome::Failed
    } else if counts.all_deleted() {
        DeletionOutcome::Complete
    } else {
        DeletionOutcome::InProgress
    }
}
