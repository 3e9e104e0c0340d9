use async_trait::async_trait;
use fleet_supervisor::error::{SupervisorError, SupervisorResult};
use fleet_supervisor::models::{Cluster, ClusterInstallation, Installation};
use fleet_supervisor::provisioner::Provisioner;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionerAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionerCall {
    pub action: ProvisionerAction,
    pub cluster_id: String,
    pub installation_id: String,
    pub cluster_installation_id: String,
}

/// Records every provisioner request and optionally rejects them
#[derive(Debug, Default)]
pub struct RecordingProvisioner {
    calls: Mutex<Vec<ProvisionerCall>>,
    fail: bool,
}

impl RecordingProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provisioner that records each request, then fails it
    pub fn failing() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<ProvisionerCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, action: ProvisionerAction) -> usize {
        self.calls.lock().iter().filter(|c| c.action == action).count()
    }

    fn record(
        &self,
        action: ProvisionerAction,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()> {
        self.calls.lock().push(ProvisionerCall {
            action,
            cluster_id: cluster.id.clone(),
            installation_id: installation.id.clone(),
            cluster_installation_id: cluster_installation.id.clone(),
        });

        if self.fail {
            return Err(SupervisorError::ProvisionerError(format!(
                "{action:?} rejected for cluster installation {}",
                cluster_installation.id
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Provisioner for RecordingProvisioner {
    async fn create_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()> {
        self.record(ProvisionerAction::Create, cluster, installation, cluster_installation)
    }

    async fn update_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()> {
        self.record(ProvisionerAction::Update, cluster, installation, cluster_installation)
    }

    async fn delete_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()> {
        self.record(ProvisionerAction::Delete, cluster, installation, cluster_installation)
    }
}
