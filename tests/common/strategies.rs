use fleet_supervisor::state_machine::{ClusterInstallationState, InstallationState};
use proptest::prelude::*;

/// Any cluster installation state
pub fn cluster_installation_state_strategy() -> impl Strategy<Value = ClusterInstallationState> {
    prop::sample::select(ClusterInstallationState::ALL.to_vec())
}

/// A snapshot of sibling cluster installation states
pub fn cluster_installation_states_strategy() -> impl Strategy<Value = Vec<ClusterInstallationState>> {
    prop::collection::vec(cluster_installation_state_strategy(), 0..12)
}

/// Batch size and the position of the member already held by another owner
pub fn contended_batch_strategy() -> impl Strategy<Value = (usize, usize)> {
    (1usize..10).prop_flat_map(|size| (Just(size), 0..size))
}

/// Installation states that wait on their cluster installations to converge
pub fn converging_installation_state_strategy() -> impl Strategy<Value = InstallationState> {
    prop::sample::select(vec![
        InstallationState::CreationRequested,
        InstallationState::UpgradeInProgress,
    ])
}
