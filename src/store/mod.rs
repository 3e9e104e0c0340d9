//! # Store
//!
//! The persistence port consumed by the supervisor. The store owns durable state and
//! the lock fields of every entity; the supervisor keeps nothing between cycles, so
//! any instance can pick up where another left off.
//!
//! Lock operations are try-locks: they never wait. A lock is held by a lock owner
//! (the supervisor's instance id) until that owner releases it, or until an operator
//! forces the release of a lock abandoned by a crashed instance.

pub mod in_memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use crate::error::SupervisorResult;
use crate::models::{
    Cluster, ClusterFilter, ClusterInstallation, ClusterInstallationFilter, Installation,
};
use async_trait::async_trait;

pub use in_memory::InMemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

#[async_trait]
pub trait SupervisorStore: Send + Sync {
    async fn get_clusters(&self, filter: &ClusterFilter) -> SupervisorResult<Vec<Cluster>>;
    async fn get_cluster(&self, cluster_id: &str) -> SupervisorResult<Option<Cluster>>;

    /// Try to lock a cluster. `Ok(false)` means another owner holds it.
    async fn lock_cluster(&self, cluster_id: &str, locker_id: &str) -> SupervisorResult<bool>;
    async fn unlock_cluster(
        &self,
        cluster_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool>;

    /// Fetch an installation, including soft-deleted ones
    async fn get_installation(&self, installation_id: &str)
        -> SupervisorResult<Option<Installation>>;

    /// Unlocked, non-deleted installations in a pending-work state, oldest first
    async fn get_unlocked_installations_pending_work(&self) -> SupervisorResult<Vec<Installation>>;
    async fn update_installation(&self, installation: &Installation) -> SupervisorResult<()>;
    async fn lock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
    ) -> SupervisorResult<bool>;
    async fn unlock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool>;

    /// Soft-delete an installation
    async fn delete_installation(&self, installation_id: &str) -> SupervisorResult<()>;

    /// Insert a cluster installation, assigning an id when absent and stamping the
    /// creation time at insert
    async fn create_cluster_installation(
        &self,
        cluster_installation: &mut ClusterInstallation,
    ) -> SupervisorResult<()>;
    async fn get_cluster_installation(
        &self,
        cluster_installation_id: &str,
    ) -> SupervisorResult<Option<ClusterInstallation>>;
    async fn get_cluster_installations(
        &self,
        filter: &ClusterInstallationFilter,
    ) -> SupervisorResult<Vec<ClusterInstallation>>;

    /// Lock every listed cluster installation or none of them
    async fn lock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
    ) -> SupervisorResult<bool>;

    /// Release the listed locks; `Ok(true)` only when every member was released
    async fn unlock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool>;
    async fn update_cluster_installation(
        &self,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()>;
}
