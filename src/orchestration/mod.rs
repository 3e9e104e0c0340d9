//! # Orchestration
//!
//! Reconciliation of installations against their cluster installations.
//!
//! ## Core Components
//!
//! - **Aggregation**: pure classification of cluster installation states into the
//!   parent installation's next state
//! - **TransitionEngine**: one transition function per installation lifecycle state
//! - **InstallationSupervisor**: the polling loop that locks each pending installation,
//!   runs its transition and persists the result
//!
//! Data flows one way per cycle: the supervisor fetches candidates, locks one, asks the
//! engine for its next state (the engine may lock clusters or cluster installations and
//! call the provisioner), then re-reads the installation and persists the state if it
//! changed.

pub mod aggregation;
pub mod installation_supervisor;
pub mod transition_engine;

pub use aggregation::{
    convergence_outcome, deletion_disposition, deletion_outcome, ClusterInstallationCounts,
    ConvergenceOutcome, DeletionDisposition, DeletionOutcome,
};
pub use installation_supervisor::{CycleSummary, InstallationSupervisor, SuperviseOutcome};
pub use transition_engine::TransitionEngine;
