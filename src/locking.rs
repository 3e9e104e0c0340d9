//! # Locking
//!
//! Scoped try-locks over store-backed entity locks.
//!
//! A lock is requested with [`EntityLock::try_lock`], which never waits: contention
//! yields `None` and the caller abandons the entity until the next poll. A successful
//! acquisition returns a [`LockGuard`]. Callers release it with
//! [`LockGuard::release`]; a guard dropped without an explicit release (early return
//! through a panic, a cancelled future) schedules the release on the current tokio
//! runtime, so a lock never outlives the section that acquired it.
//!
//! Batch locks over cluster installations are all-or-nothing: the store either locks
//! every member or leaves none of them locked.
//!
//! ```rust
//! use fleet_supervisor::locking::EntityLock;
//! use fleet_supervisor::store::{InMemoryStore, SupervisorStore};
//! use std::sync::Arc;
//!
//! # async fn example(installation_id: String) {
//! let store: Arc<dyn SupervisorStore> = Arc::new(InMemoryStore::new());
//! if let Some(guard) = EntityLock::installation(&installation_id, "instance-a", store)
//!     .try_lock()
//!     .await
//! {
//!     // ... work on the installation ...
//!     guard.release().await;
//! }
//! # }
//! ```

use crate::error::SupervisorResult;
use crate::store::SupervisorStore;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// What a lock covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockTarget {
    Installation(String),
    Cluster(String),
    ClusterInstallations(Vec<String>),
}

impl fmt::Display for LockTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Installation(id) => write!(f, "installation {id}"),
            Self::Cluster(id) => write!(f, "cluster {id}"),
            Self::ClusterInstallations(ids) => write!(f, "{} cluster installations", ids.len()),
        }
    }
}

async fn acquire(
    store: &dyn SupervisorStore,
    target: &LockTarget,
    owner: &str,
) -> SupervisorResult<bool> {
    match target {
        LockTarget::Installation(id) => store.lock_installation(id, owner).await,
        LockTarget::Cluster(id) => store.lock_cluster(id, owner).await,
        LockTarget::ClusterInstallations(ids) => store.lock_cluster_installations(ids, owner).await,
    }
}

async fn release(
    store: &dyn SupervisorStore,
    target: &LockTarget,
    owner: &str,
    force: bool,
) -> SupervisorResult<bool> {
    match target {
        LockTarget::Installation(id) => store.unlock_installation(id, owner, force).await,
        LockTarget::Cluster(id) => store.unlock_cluster(id, owner, force).await,
        LockTarget::ClusterInstallations(ids) => {
            store.unlock_cluster_installations(ids, owner, force).await
        }
    }
}

async fn release_logged(store: &dyn SupervisorStore, target: &LockTarget, owner: &str) {
    match release(store, target, owner, false).await {
        Ok(true) => debug!(lock = %target, owner = %owner, "Released lock"),
        Ok(false) => error!(lock = %target, owner = %owner, "Failed to release lock"),
        Err(e) => warn!(lock = %target, owner = %owner, error = %e, "Failed to release lock"),
    }
}

/// A lock request not yet attempted
pub struct EntityLock {
    target: LockTarget,
    owner: String,
    store: Arc<dyn SupervisorStore>,
}

impl EntityLock {
    pub fn new(target: LockTarget, owner: impl Into<String>, store: Arc<dyn SupervisorStore>) -> Self {
        Self {
            target,
            owner: owner.into(),
            store,
        }
    }

    pub fn installation(
        installation_id: &str,
        owner: impl Into<String>,
        store: Arc<dyn SupervisorStore>,
    ) -> Self {
        Self::new(
            LockTarget::Installation(installation_id.to_string()),
            owner,
            store,
        )
    }

    pub fn cluster(cluster_id: &str, owner: impl Into<String>, store: Arc<dyn SupervisorStore>) -> Self {
        Self::new(LockTarget::Cluster(cluster_id.to_string()), owner, store)
    }

    pub fn cluster_installations(
        cluster_installation_ids: Vec<String>,
        owner: impl Into<String>,
        store: Arc<dyn SupervisorStore>,
    ) -> Self {
        Self::new(
            LockTarget::ClusterInstallations(cluster_installation_ids),
            owner,
            store,
        )
    }

    /// Attempt the lock once. Contention and store errors both yield `None`.
    pub async fn try_lock(self) -> Option<LockGuard> {
        let acquired = acquire(self.store.as_ref(), &self.target, &self.owner).await;
        match acquired {
            Ok(true) => Some(LockGuard {
                target: self.target,
                owner: self.owner,
                store: self.store,
                released: false,
            }),
            Ok(false) => {
                debug!(lock = %self.target, owner = %self.owner, "Lock held by another owner");
                None
            }
            Err(e) => {
                warn!(lock = %self.target, owner = %self.owner, error = %e, "Failed to acquire lock");
                None
            }
        }
    }
}

/// A held lock. Released exactly once, explicitly or on drop.
#[must_use = "dropping the guard releases the lock in the background"]
pub struct LockGuard {
    target: LockTarget,
    owner: String,
    store: Arc<dyn SupervisorStore>,
    released: bool,
}

impl LockGuard {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Release the lock and wait for the store to confirm
    pub async fn release(mut self) {
        release_logged(self.store.as_ref(), &self.target, &self.owner).await;
        self.released = true;
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let target = self.target.clone();
        let owner = self.owner.clone();
        let store = Arc::clone(&self.store);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                warn!(lock = %target, owner = %owner, "Lock guard dropped without release, releasing in background");
                handle.spawn(async move {
                    release_logged(store.as_ref(), &target, &owner).await;
                });
            }
            Err(_) => {
                error!(lock = %target, owner = %owner, "Lock guard dropped outside a runtime, lock left held");
            }
        }
    }
}

/// Administrative release of a lock left behind by a crashed owner.
///
/// The supervisor itself never forces a release.
pub async fn force_unlock(
    store: &dyn SupervisorStore,
    target: &LockTarget,
    requested_by: &str,
) -> SupervisorResult<bool> {
    warn!(lock = %target, requested_by = %requested_by, "Forcing lock release");
    release(store, target, requested_by, true).await
}
