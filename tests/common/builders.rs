use super::mock_provisioner::RecordingProvisioner;
use fleet_supervisor::models::{Cluster, ClusterInstallation, ClusterInstallationFilter, Installation};
use fleet_supervisor::orchestration::InstallationSupervisor;
use fleet_supervisor::state_machine::{ClusterInstallationState, ClusterState, InstallationState};
use fleet_supervisor::store::{InMemoryStore, SupervisorStore};
use std::sync::Arc;

pub const INSTANCE_ID: &str = "supervisor-test";

/// An in-memory store, a recording provisioner and a supervisor wired over both
pub struct Fixture {
    pub store: Arc<InMemoryStore>,
    pub provisioner: Arc<RecordingProvisioner>,
    pub supervisor: InstallationSupervisor,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_provisioner(RecordingProvisioner::new())
    }

    pub fn with_provisioner(provisioner: RecordingProvisioner) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let provisioner = Arc::new(provisioner);
        let supervisor = InstallationSupervisor::new(store.clone(), provisioner.clone(), INSTANCE_ID);
        Self {
            store,
            provisioner,
            supervisor,
        }
    }

    pub fn add_installation(&self, state: InstallationState) -> Installation {
        let installation = Installation::new("owner-1", "5.12.0", "tenant.example.com").with_state(state);
        self.store.create_installation(installation.clone());
        installation
    }

    pub fn add_cluster(&self, state: ClusterState) -> Cluster {
        let cluster = Cluster::new("aws", "SizeAlef500").with_state(state);
        self.store.create_cluster(cluster.clone());
        cluster
    }

    pub fn add_stable_cluster(&self) -> Cluster {
        self.add_cluster(ClusterState::Stable)
    }

    pub async fn add_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        state: ClusterInstallationState,
    ) -> ClusterInstallation {
        let mut cluster_installation =
            ClusterInstallation::requested(&cluster.id, &installation.id).with_state(state);
        self.store
            .create_cluster_installation(&mut cluster_installation)
            .await
            .expect("cluster installation is created");
        cluster_installation
    }

    /// Simulate the provisioner's out-of-band reconciliation
    pub async fn set_cluster_installation_state(
        &self,
        cluster_installation_id: &str,
        state: ClusterInstallationState,
    ) {
        let mut cluster_installation = self
            .store
            .get_cluster_installation(cluster_installation_id)
            .await
            .expect("store read succeeds")
            .expect("cluster installation exists");
        cluster_installation.state = state;
        self.store
            .update_cluster_installation(&cluster_installation)
            .await
            .expect("cluster installation is updated");
    }

    /// Soft-delete a cluster installation, as store housekeeping does after teardown
    pub async fn soft_delete_cluster_installation(&self, cluster_installation_id: &str) {
        let mut cluster_installation = self
            .store
            .get_cluster_installation(cluster_installation_id)
            .await
            .expect("store read succeeds")
            .expect("cluster installation exists");
        cluster_installation.delete_at = Some(chrono::Utc::now());
        self.store
            .update_cluster_installation(&cluster_installation)
            .await
            .expect("cluster installation is updated");
    }

    pub async fn installation(&self, installation_id: &str) -> Installation {
        self.store
            .get_installation(installation_id)
            .await
            .expect("store read succeeds")
            .expect("installation exists")
    }

    pub async fn cluster_installations_for(&self, installation_id: &str) -> Vec<ClusterInstallation> {
        self.store
            .get_cluster_installations(
                &ClusterInstallationFilter::for_installation(installation_id).including_deleted(),
            )
            .await
            .expect("store read succeeds")
    }

    pub async fn cluster_installations_on(&self, cluster_id: &str) -> Vec<ClusterInstallation> {
        self.store
            .get_cluster_installations(&ClusterInstallationFilter::for_cluster(cluster_id))
            .await
            .expect("store read succeeds")
    }

    /// Supervise the stored copy of an installation
    pub async fn supervise(&self, installation_id: &str) -> fleet_supervisor::SuperviseOutcome {
        let installation = self.installation(installation_id).await;
        self.supervisor.supervise(&installation).await
    }
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}
