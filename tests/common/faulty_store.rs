use async_trait::async_trait;
use fleet_supervisor::error::{SupervisorError, SupervisorResult};
use fleet_supervisor::models::{
    Cluster, ClusterFilter, ClusterInstallation, ClusterInstallationFilter, Installation,
};
use fleet_supervisor::store::{InMemoryStore, SupervisorStore};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Store calls that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    PendingWorkQuery,
    GetClusters,
    GetClusterInstallations,
    UpdateInstallation,
    UpdateClusterInstallation,
    DeleteInstallation,
    /// The next installation unlock never completes
    StallInstallationUnlock,
}

/// In-memory store that fails selected calls on demand
pub struct FaultyStore {
    inner: Arc<InMemoryStore>,
    faults: Mutex<HashSet<Fault>>,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryStore>) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashSet::new()),
        }
    }

    pub fn inject(&self, fault: Fault) {
        self.faults.lock().insert(fault);
    }

    pub fn clear(&self) {
        self.faults.lock().clear();
    }

    fn take(&self, fault: Fault) -> bool {
        self.faults.lock().remove(&fault)
    }

    fn check(&self, fault: Fault) -> SupervisorResult<()> {
        if self.faults.lock().contains(&fault) {
            return Err(SupervisorError::DatabaseError(format!(
                "injected fault: {fault:?}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SupervisorStore for FaultyStore {
    async fn get_clusters(&self, filter: &ClusterFilter) -> SupervisorResult<Vec<Cluster>> {
        self.check(Fault::GetClusters)?;
        self.inner.get_clusters(filter).await
    }

    async fn get_cluster(&self, cluster_id: &str) -> SupervisorResult<Option<Cluster>> {
        self.inner.get_cluster(cluster_id).await
    }

    async fn lock_cluster(&self, cluster_id: &str, locker_id: &str) -> SupervisorResult<bool> {
        self.inner.lock_cluster(cluster_id, locker_id).await
    }

    async fn unlock_cluster(
        &self,
        cluster_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        self.inner.unlock_cluster(cluster_id, locker_id, force).await
    }

    async fn get_installation(
        &self,
        installation_id: &str,
    ) -> SupervisorResult<Option<Installation>> {
        self.inner.get_installation(installation_id).await
    }

    async fn get_unlocked_installations_pending_work(&self) -> SupervisorResult<Vec<Installation>> {
        self.check(Fault::PendingWorkQuery)?;
        self.inner.get_unlocked_installations_pending_work().await
    }

    async fn update_installation(&self, installation: &Installation) -> SupervisorResult<()> {
        self.check(Fault::UpdateInstallation)?;
        self.inner.update_installation(installation).await
    }

    async fn lock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
    ) -> SupervisorResult<bool> {
        self.inner.lock_installation(installation_id, locker_id).await
    }

    async fn unlock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        if self.take(Fault::StallInstallationUnlock) {
            std::future::pending::<()>().await;
        }
        self.inner
            .unlock_installation(installation_id, locker_id, force)
            .await
    }

    async fn delete_installation(&self, installation_id: &str) -> SupervisorResult<()> {
        self.check(Fault::DeleteInstallation)?;
        self.inner.delete_installation(installation_id).await
    }

    async fn create_cluster_installation(
        &self,
        cluster_installation: &mut ClusterInstallation,
    ) -> SupervisorResult<()> {
        self.inner
            .create_cluster_installation(cluster_installation)
            .await
    }

    async fn get_cluster_installation(
        &self,
        cluster_installation_id: &str,
    ) -> SupervisorResult<Option<ClusterInstallation>> {
        self.inner
            .get_cluster_installation(cluster_installation_id)
            .await
    }

    async fn get_cluster_installations(
        &self,
        filter: &ClusterInstallationFilter,
    ) -> SupervisorResult<Vec<ClusterInstallation>> {
        self.check(Fault::GetClusterInstallations)?;
        self.inner.get_cluster_installations(filter).await
    }

    async fn lock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
    ) -> SupervisorResult<bool> {
        self.inner
            .lock_cluster_installations(cluster_installation_ids, locker_id)
            .await
    }

    async fn unlock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        self.inner
            .unlock_cluster_installations(cluster_installation_ids, locker_id, force)
            .await
    }

    async fn update_cluster_installation(
        &self,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()> {
        self.check(Fault::UpdateClusterInstallation)?;
        self.inner
            .update_cluster_installation(cluster_installation)
            .await
    }
}
