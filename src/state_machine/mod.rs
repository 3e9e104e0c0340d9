// State definitions for installations, clusters and cluster installations.
//
// The transitions themselves live in `orchestration::transition_engine`; this
// module only fixes the closed set of states and their persisted form.

pub mod states;

pub use states::{ClusterInstallationState, ClusterState, InstallationState};
