//! In-memory store adapter.
//!
//! Keeps every record in insertion order behind a single mutex. Lock semantics match
//! the PostgreSQL adapter, so the supervisor behaves the same against either store.

use super::SupervisorStore;
use crate::error::{SupervisorError, SupervisorResult};
use crate::logging::log_lock_operation;
use crate::models::{
    new_id, Cluster, ClusterFilter, ClusterInstallation, ClusterInstallationFilter, Installation,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct Records {
    installations: Vec<Installation>,
    clusters: Vec<Cluster>,
    cluster_installations: Vec<ClusterInstallation>,
}

/// Lock fields shared by every lockable record
trait Lockable {
    fn lock_fields(&mut self) -> (&mut Option<String>, &mut Option<DateTime<Utc>>);
}

macro_rules! impl_lockable {
    ($($ty:ty),*) => {
        $(impl Lockable for $ty {
            fn lock_fields(&mut self) -> (&mut Option<String>, &mut Option<DateTime<Utc>>) {
                (&mut self.lock_acquired_by, &mut self.lock_acquired_at)
            }
        })*
    };
}

impl_lockable!(Installation, Cluster, ClusterInstallation);

fn try_lock<T: Lockable>(record: &mut T, locker_id: &str) -> bool {
    let (by, at) = record.lock_fields();
    match by.as_deref() {
        Some(owner) if owner != locker_id => false,
        _ => {
            *by = Some(locker_id.to_string());
            *at = Some(Utc::now());
            true
        }
    }
}

fn try_unlock<T: Lockable>(record: &mut T, locker_id: &str, force: bool) -> bool {
    let (by, at) = record.lock_fields();
    let owned = by.as_deref() == Some(locker_id);
    if !(owned || force) {
        return false;
    }
    *by = None;
    *at = None;
    true
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: Mutex<Records>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an installation as-is
    pub fn create_installation(&self, installation: Installation) {
        self.records.lock().installations.push(installation);
    }

    /// Insert a cluster as-is
    pub fn create_cluster(&self, cluster: Cluster) {
        self.records.lock().clusters.push(cluster);
    }

    /// Replace a cluster's mutable fields
    pub fn update_cluster(&self, cluster: &Cluster) -> SupervisorResult<()> {
        let mut records = self.records.lock();
        let existing = records
            .clusters
            .iter_mut()
            .find(|c| c.id == cluster.id)
            .ok_or_else(|| SupervisorError::not_found("cluster", &cluster.id))?;
        existing.provider = cluster.provider.clone();
        existing.size = cluster.size.clone();
        existing.state = cluster.state;
        Ok(())
    }

    /// Soft-delete a cluster
    pub fn delete_cluster(&self, cluster_id: &str) -> SupervisorResult<()> {
        let mut records = self.records.lock();
        let cluster = records
            .clusters
            .iter_mut()
            .find(|c| c.id == cluster_id)
            .ok_or_else(|| SupervisorError::not_found("cluster", cluster_id))?;
        cluster.delete_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    /// Drop a cluster record entirely, as store housekeeping would
    pub fn purge_cluster(&self, cluster_id: &str) {
        self.records.lock().clusters.retain(|c| c.id != cluster_id);
    }
}

#[async_trait]
impl SupervisorStore for InMemoryStore {
    async fn get_clusters(&self, filter: &ClusterFilter) -> SupervisorResult<Vec<Cluster>> {
        let records = self.records.lock();
        let clusters = records
            .clusters
            .iter()
            .filter(|c| filter.include_deleted || !c.is_deleted())
            .cloned()
            .collect();
        Ok(filter.paging.apply(clusters))
    }

    async fn get_cluster(&self, cluster_id: &str) -> SupervisorResult<Option<Cluster>> {
        let records = self.records.lock();
        Ok(records.clusters.iter().find(|c| c.id == cluster_id).cloned())
    }

    async fn lock_cluster(&self, cluster_id: &str, locker_id: &str) -> SupervisorResult<bool> {
        let mut records = self.records.lock();
        let locked = records
            .clusters
            .iter_mut()
            .find(|c| c.id == cluster_id)
            .is_some_and(|c| try_lock(c, locker_id));
        log_lock_operation("lock", "cluster", &[cluster_id.to_string()], locker_id, locked);
        Ok(locked)
    }

    async fn unlock_cluster(
        &self,
        cluster_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        let mut records = self.records.lock();
        let unlocked = records
            .clusters
            .iter_mut()
            .find(|c| c.id == cluster_id)
            .is_some_and(|c| try_unlock(c, locker_id, force));
        log_lock_operation("unlock", "cluster", &[cluster_id.to_string()], locker_id, unlocked);
        Ok(unlocked)
    }

    async fn get_installation(
        &self,
        installation_id: &str,
    ) -> SupervisorResult<Option<Installation>> {
        let records = self.records.lock();
        Ok(records
            .installations
            .iter()
            .find(|i| i.id == installation_id)
            .cloned())
    }

    async fn get_unlocked_installations_pending_work(&self) -> SupervisorResult<Vec<Installation>> {
        let records = self.records.lock();
        let mut pending: Vec<Installation> = records
            .installations
            .iter()
            .filter(|i| i.state.is_pending_work() && !i.is_locked() && !i.is_deleted())
            .cloned()
            .collect();
        pending.sort_by_key(|i| i.create_at);
        Ok(pending)
    }

    async fn update_installation(&self, installation: &Installation) -> SupervisorResult<()> {
        let mut records = self.records.lock();
        let existing = records
            .installations
            .iter_mut()
            .find(|i| i.id == installation.id)
            .ok_or_else(|| SupervisorError::not_found("installation", &installation.id))?;
        existing.owner_id = installation.owner_id.clone();
        existing.version = installation.version.clone();
        existing.dns = installation.dns.clone();
        existing.affinity = installation.affinity;
        existing.state = installation.state;
        Ok(())
    }

    async fn lock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
    ) -> SupervisorResult<bool> {
        let mut records = self.records.lock();
        let locked = records
            .installations
            .iter_mut()
            .find(|i| i.id == installation_id)
            .is_some_and(|i| try_lock(i, locker_id));
        log_lock_operation(
            "lock",
            "installation",
            &[installation_id.to_string()],
            locker_id,
            locked,
        );
        Ok(locked)
    }

    async fn unlock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        let mut records = self.records.lock();
        let unlocked = records
            .installations
            .iter_mut()
            .find(|i| i.id == installation_id)
            .is_some_and(|i| try_unlock(i, locker_id, force));
        log_lock_operation(
            "unlock",
            "installation",
            &[installation_id.to_string()],
            locker_id,
            unlocked,
        );
        Ok(unlocked)
    }

    async fn delete_installation(&self, installation_id: &str) -> SupervisorResult<()> {
        let mut records = self.records.lock();
        let installation = records
            .installations
            .iter_mut()
            .find(|i| i.id == installation_id)
            .ok_or_else(|| SupervisorError::not_found("installation", installation_id))?;
        installation.delete_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn create_cluster_installation(
        &self,
        cluster_installation: &mut ClusterInstallation,
    ) -> SupervisorResult<()> {
        if cluster_installation.id.is_empty() {
            cluster_installation.id = new_id();
        }
        cluster_installation.create_at = Utc::now();

        let mut records = self.records.lock();
        if records
            .cluster_installations
            .iter()
            .any(|ci| ci.id == cluster_installation.id)
        {
            return Err(SupervisorError::DatabaseError(format!(
                "cluster installation {} already exists",
                cluster_installation.id
            )));
        }
        records
            .cluster_installations
            .push(cluster_installation.clone());
        Ok(())
    }

    async fn get_cluster_installation(
        &self,
        cluster_installation_id: &str,
    ) -> SupervisorResult<Option<ClusterInstallation>> {
        let records = self.records.lock();
        Ok(records
            .cluster_installations
            .iter()
            .find(|ci| ci.id == cluster_installation_id)
            .cloned())
    }

    async fn get_cluster_installations(
        &self,
        filter: &ClusterInstallationFilter,
    ) -> SupervisorResult<Vec<ClusterInstallation>> {
        let records = self.records.lock();
        let matching = records
            .cluster_installations
            .iter()
            .filter(|ci| filter.include_deleted || !ci.is_deleted())
            .filter(|ci| filter.ids.as_ref().map_or(true, |ids| ids.contains(&ci.id)))
            .filter(|ci| {
                filter
                    .installation_id
                    .as_ref()
                    .map_or(true, |id| &ci.installation_id == id)
            })
            .filter(|ci| {
                filter
                    .cluster_id
                    .as_ref()
                    .map_or(true, |id| &ci.cluster_id == id)
            })
            .cloned()
            .collect();
        Ok(filter.paging.apply(matching))
    }

    async fn lock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
    ) -> SupervisorResult<bool> {
        let mut records = self.records.lock();
        let mut acquired: Vec<usize> = Vec::with_capacity(cluster_installation_ids.len());
        let mut complete = true;

        for id in cluster_installation_ids {
            let Some(index) = records
                .cluster_installations
                .iter()
                .position(|ci| &ci.id == id)
            else {
                complete = false;
                break;
            };

            let record = &mut records.cluster_installations[index];
            let already_held = record.lock_acquired_by.as_deref() == Some(locker_id);
            if !try_lock(record, locker_id) {
                complete = false;
                break;
            }
            if !already_held {
                acquired.push(index);
            }
        }

        if !complete {
            // Roll back the members this call acquired
            for index in acquired {
                try_unlock(&mut records.cluster_installations[index], locker_id, false);
            }
        }

        log_lock_operation(
            "lock",
            "cluster_installation",
            cluster_installation_ids,
            locker_id,
            complete,
        );
        Ok(complete)
    }

    async fn unlock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        let mut records = self.records.lock();
        let mut released = 0;

        for ci in records
            .cluster_installations
            .iter_mut()
            .filter(|ci| cluster_installation_ids.contains(&ci.id))
        {
            if try_unlock(ci, locker_id, force) {
                released += 1;
            }
        }

        let unlocked = released == cluster_installation_ids.len();
        log_lock_operation(
            "unlock",
            "cluster_installation",
            cluster_installation_ids,
            locker_id,
            unlocked,
        );
        Ok(unlocked)
    }

    async fn update_cluster_installation(
        &self,
        cluster_installation: &ClusterInstallation,
    ) -> SupervisorResult<()> {
        let mut records = self.records.lock();
        let existing = records
            .cluster_installations
            .iter_mut()
            .find(|ci| ci.id == cluster_installation.id)
            .ok_or_else(|| {
                SupervisorError::not_found("cluster installation", &cluster_installation.id)
            })?;
        existing.cluster_id = cluster_installation.cluster_id.clone();
        existing.installation_id = cluster_installation.installation_id.clone();
        existing.namespace = cluster_installation.namespace.clone();
        existing.state = cluster_installation.state;
        if cluster_installation.delete_at.is_some() {
            existing.delete_at = cluster_installation.delete_at;
        }
        Ok(())
    }
}
