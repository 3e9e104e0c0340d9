//! # Transition Engine
//!
//! One transition function per installation lifecycle state. Each function reads the
//! installation's cluster installations, issues whatever store and provisioner calls
//! the state calls for, and returns the installation's next state.
//!
//! ## Retry contract
//!
//! Transitions never retry internally. Any store or provisioner error ends the pass
//! with the installation's state unchanged and the next poll tries again. Every
//! function is therefore written to be re-entrant: running it twice against the same
//! snapshot neither duplicates cluster installations nor dispatches work a second
//! time once the first dispatch has been recorded.
//!
//! ## Locking
//!
//! The caller holds the installation lock. Functions that mutate cluster installations
//! take an all-or-nothing batch lock over them, and placement takes a per-cluster
//! lock, re-reading the locked records before acting on them.

use super::aggregation::{
    convergence_outcome, deletion_disposition, deletion_outcome, ClusterInstallationCounts,
    ConvergenceOutcome, DeletionDisposition, DeletionOutcome,
};
use crate::error::SupervisorResult;
use crate::locking::EntityLock;
use crate::models::{Cluster, ClusterFilter, ClusterInstallation, ClusterInstallationFilter, Installation};
use crate::provisioner::Provisioner;
use crate::state_machine::{ClusterInstallationState, InstallationState};
use crate::store::SupervisorStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct TransitionEngine {
    store: Arc<dyn SupervisorStore>,
    provisioner: Arc<dyn Provisioner>,
    instance_id: String,
}

impl TransitionEngine {
    pub fn new(
        store: Arc<dyn SupervisorStore>,
        provisioner: Arc<dyn Provisioner>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            provisioner,
            instance_id: instance_id.into(),
        }
    }

    /// Compute the next state for an installation the caller has locked.
    ///
    /// Never fails: errors are logged and yield the current state.
    pub async fn transition(&self, installation: &Installation) -> InstallationState {
        let result = match installation.state {
            InstallationState::CreationRequested => self.create_installation(installation).await,
            InstallationState::UpgradeRequested => self.update_installation(installation).await,
            InstallationState::UpgradeInProgress => {
                self.wait_for_update_complete(installation).await
            }
            InstallationState::DeletionRequested | InstallationState::DeletionInProgress => {
                self.delete_installation(installation).await
            }
            InstallationState::CreationFailed
            | InstallationState::Stable
            | InstallationState::UpgradeFailed
            | InstallationState::DeletionFailed
            | InstallationState::Deleted => {
                warn!(
                    state = %installation.state,
                    "Found installation pending work in unexpected state"
                );
                return installation.state;
            }
        };

        match result {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    state = %installation.state,
                    error = %e,
                    "Transition aborted, retrying on next poll"
                );
                installation.state
            }
        }
    }

    async fn cluster_installations_for(
        &self,
        installation: &Installation,
        include_deleted: bool,
    ) -> SupervisorResult<Vec<ClusterInstallation>> {
        let mut filter = ClusterInstallationFilter::for_installation(&installation.id);
        filter.include_deleted = include_deleted;
        self.store
            .get_cluster_installations(&filter)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to find cluster installations");
                e
            })
    }

    /// Re-read a batch of cluster installations after locking them
    async fn relock_read(
        &self,
        ids: &[String],
        include_deleted: bool,
    ) -> SupervisorResult<Vec<ClusterInstallation>> {
        let mut filter = ClusterInstallationFilter::for_ids(ids.to_vec());
        filter.include_deleted = include_deleted;
        let cluster_installations = self
            .store
            .get_cluster_installations(&filter)
            .await
            .map_err(|e| {
                warn!(count = ids.len(), error = %e, "Failed to fetch cluster installations by ids");
                e
            })?;

        if cluster_installations.len() != ids.len() {
            warn!(
                found = cluster_installations.len(),
                expected = ids.len(),
                "Found fewer cluster installations after locking than expected"
            );
        }

        Ok(cluster_installations)
    }

    async fn create_installation(
        &self,
        installation: &Installation,
    ) -> SupervisorResult<InstallationState> {
        let cluster_installations = self.cluster_installations_for(installation, false).await?;

        // Once placed, the installation follows its cluster installations
        if !cluster_installations.is_empty() {
            let counts =
                ClusterInstallationCounts::from_states(cluster_installations.iter().map(|ci| ci.state));
            debug!(
                total = counts.total,
                stable = counts.stable,
                reconciling = counts.reconciling,
                failed = counts.creation_failed,
                "Aggregated cluster installations"
            );

            return Ok(match convergence_outcome(&counts) {
                ConvergenceOutcome::Stable => {
                    info!("Finished creating installation");
                    InstallationState::Stable
                }
                ConvergenceOutcome::Failed => {
                    info!(failed = counts.creation_failed, "Found failed cluster installations");
                    InstallationState::CreationFailed
                }
                ConvergenceOutcome::InProgress => InstallationState::CreationRequested,
            });
        }

        let clusters = self
            .store
            .get_clusters(&ClusterFilter::default())
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to query clusters");
                e
            })?;

        for cluster in &clusters {
            if self
                .create_cluster_installation(cluster, installation)
                .await
                .is_some()
            {
                return Ok(InstallationState::CreationRequested);
            }
        }

        // TODO: create a cluster on demand when no existing cluster is eligible
        debug!("No empty clusters available for installation");
        Ok(installation.state)
    }

    /// Place the installation on one cluster, under that cluster's lock
    async fn create_cluster_installation(
        &self,
        cluster: &Cluster,
        installation: &Installation,
    ) -> Option<ClusterInstallation> {
        let guard = EntityLock::cluster(&cluster.id, &self.instance_id, Arc::clone(&self.store))
            .try_lock()
            .await;
        let Some(guard) = guard else {
            debug!(cluster_id = %cluster.id, "Failed to lock cluster");
            return None;
        };

        let placed = self.place_on_locked_cluster(&cluster.id, installation).await;
        guard.release().await;

        match placed {
            Ok(placed) => placed,
            Err(e) => {
                warn!(cluster_id = %cluster.id, error = %e, "Failed to create cluster installation");
                None
            }
        }
    }

    async fn place_on_locked_cluster(
        &self,
        cluster_id: &str,
        installation: &Installation,
    ) -> SupervisorResult<Option<ClusterInstallation>> {
        let Some(cluster) = self.store.get_cluster(cluster_id).await? else {
            debug!(cluster_id = %cluster_id, "Cluster disappeared before placement");
            return Ok(None);
        };

        if cluster.is_deleted() || !cluster.state.is_stable() {
            debug!(
                cluster_id = %cluster.id,
                state = %cluster.state,
                "Cluster is not stable"
            );
            return Ok(None);
        }

        // One live cluster installation per cluster, failed ones included
        let existing = self
            .store
            .get_cluster_installations(
                &ClusterInstallationFilter::for_cluster(&cluster.id),
            )
            .await?;
        if !existing.is_empty() {
            debug!(
                cluster_id = %cluster.id,
                existing = existing.len(),
                "Cluster already hosts cluster installations"
            );
            return Ok(None);
        }

        let mut cluster_installation = ClusterInstallation::requested(&cluster.id, &installation.id);
        self.store
            .create_cluster_installation(&mut cluster_installation)
            .await?;

        info!(
            cluster_id = %cluster.id,
            cluster_installation_id = %cluster_installation.id,
            "Requested creation of cluster installation"
        );

        Ok(Some(cluster_installation))
    }

    async fn update_installation(
        &self,
        installation: &Installation,
    ) -> SupervisorResult<InstallationState> {
        let cluster_installations = self.cluster_installations_for(installation, false).await?;
        if cluster_installations.is_empty() {
            info!("No cluster installations to update");
            return Ok(InstallationState::UpgradeInProgress);
        }

        let ids: Vec<String> = cluster_installations.iter().map(|ci| ci.id.clone()).collect();
        let guard = EntityLock::cluster_installations(
            ids.clone(),
            &self.instance_id,
            Arc::clone(&self.store),
        )
        .try_lock()
        .await;
        let Some(guard) = guard else {
            debug!(count = ids.len(), "Failed to lock cluster installations");
            return Ok(installation.state);
        };

        let result = self.update_locked_cluster_installations(installation, &ids).await;
        guard.release().await;
        result
    }

    async fn update_locked_cluster_installations(
        &self,
        installation: &Installation,
        ids: &[String],
    ) -> SupervisorResult<InstallationState> {
        for mut cluster_installation in self.relock_read(ids, false).await? {
            let Some(cluster) = self.store.get_cluster(&cluster_installation.cluster_id).await? else {
                error!(
                    cluster_id = %cluster_installation.cluster_id,
                    cluster_installation_id = %cluster_installation.id,
                    "Failed to find cluster"
                );
                cluster_installation.state = cluster_installation.state.failed_variant();
                self.store
                    .update_cluster_installation(&cluster_installation)
                    .await?;
                return Ok(InstallationState::UpgradeFailed);
            };

            self.provisioner
                .update_cluster_installation(&cluster, installation, &cluster_installation)
                .await
                .map_err(|e| {
                    warn!(
                        cluster_installation_id = %cluster_installation.id,
                        error = %e,
                        "Failed to update cluster installation"
                    );
                    e
                })?;

            cluster_installation.state = ClusterInstallationState::Reconciling;
            self.store
                .update_cluster_installation(&cluster_installation)
                .await
                .map_err(|e| {
                    warn!(
                        cluster_installation_id = %cluster_installation.id,
                        state = %ClusterInstallationState::Reconciling,
                        error = %e,
                        "Failed to change cluster installation state"
                    );
                    e
                })?;
        }

        info!("Finished updating cluster installations");
        Ok(InstallationState::UpgradeInProgress)
    }

    async fn wait_for_update_complete(
        &self,
        installation: &Installation,
    ) -> SupervisorResult<InstallationState> {
        let cluster_installations = self.cluster_installations_for(installation, false).await?;
        let counts =
            ClusterInstallationCounts::from_states(cluster_installations.iter().map(|ci| ci.state));
        debug!(
            total = counts.total,
            stable = counts.stable,
            reconciling = counts.reconciling,
            failed = counts.creation_failed,
            "Aggregated cluster installations"
        );

        Ok(match convergence_outcome(&counts) {
            ConvergenceOutcome::Stable => {
                info!("Finished updating installation");
                InstallationState::Stable
            }
            ConvergenceOutcome::Failed => {
                info!(failed = counts.creation_failed, "Found failed cluster installations");
                InstallationState::UpgradeFailed
            }
            ConvergenceOutcome::InProgress => installation.state,
        })
    }

    async fn delete_installation(
        &self,
        installation: &Installation,
    ) -> SupervisorResult<InstallationState> {
        let cluster_installations = self.cluster_installations_for(installation, true).await?;
        if cluster_installations.is_empty() {
            return self.finish_deletion(installation).await;
        }

        let ids: Vec<String> = cluster_installations.iter().map(|ci| ci.id.clone()).collect();
        let guard = EntityLock::cluster_installations(
            ids.clone(),
            &self.instance_id,
            Arc::clone(&self.store),
        )
        .try_lock()
        .await;
        let Some(guard) = guard else {
            debug!(count = ids.len(), "Failed to lock cluster installations");
            return Ok(installation.state);
        };

        let result = self.delete_locked_cluster_installations(installation, &ids).await;
        guard.release().await;
        result
    }

    async fn delete_locked_cluster_installations(
        &self,
        installation: &Installation,
        ids: &[String],
    ) -> SupervisorResult<InstallationState> {
        let cluster_installations = self.relock_read(ids, true).await?;
        let mut remaining = Vec::with_capacity(cluster_installations.len());

        for mut cluster_installation in cluster_installations {
            match deletion_disposition(cluster_installation.state, installation.state) {
                DeletionDisposition::Deleting
                | DeletionDisposition::Failed
                | DeletionDisposition::Deleted => {}
                DeletionDisposition::Unrecoverable => {
                    error!(
                        cluster_installation_id = %cluster_installation.id,
                        state = %cluster_installation.state,
                        "Cannot delete installation with cluster installation in this state"
                    );
                    return Ok(InstallationState::DeletionFailed);
                }
                DeletionDisposition::RequestDeletion => {
                    cluster_installation.state = ClusterInstallationState::DeletionRequested;
                    self.store
                        .update_cluster_installation(&cluster_installation)
                        .await
                        .map_err(|e| {
                            warn!(
                                cluster_installation_id = %cluster_installation.id,
                                error = %e,
                                "Failed to mark cluster installation for deletion"
                            );
                            e
                        })?;
                }
            }
            remaining.push(cluster_installation.state);
        }

        let counts = ClusterInstallationCounts::from_states(remaining);
        debug!(
            total = counts.total,
            deleting = counts.deletion_requested,
            deleted = counts.deleted,
            failed = counts.deletion_failed,
            "Aggregated cluster installation deletion"
        );

        match deletion_outcome(&counts) {
            DeletionOutcome::Failed => {
                info!(failed = counts.deletion_failed, "Found failed cluster installations");
                Ok(InstallationState::DeletionFailed)
            }
            DeletionOutcome::InProgress => Ok(InstallationState::DeletionInProgress),
            DeletionOutcome::Complete => self.finish_deletion(installation).await,
        }
    }

    async fn finish_deletion(
        &self,
        installation: &Installation,
    ) -> SupervisorResult<InstallationState> {
        self.store
            .delete_installation(&installation.id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to mark installation as deleted");
                e
            })?;

        info!("Finished deleting installation");
        Ok(InstallationState::Deleted)
    }
}
