//! # Provisioner
//!
//! Port for the component that performs the side effects of a cluster installation
//! against its cluster. A successful return means the request was accepted, not that
//! the cluster installation converged; convergence shows up later in its stored state.

use crate::error::SupervisorResult;
use crate::models::{Cluster, ClusterInstallation, Installation};
use async_trait::async_trait;

#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn create_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()>;

    async fn update_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()>;

    async fn delete_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()>;
}
