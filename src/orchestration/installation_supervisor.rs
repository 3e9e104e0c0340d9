//! # Installation Supervisor
//!
//! The polling entry point. Each call to [`InstallationSupervisor::do_work`] fetches the
//! unlocked installations with pending work and supervises them one at a time. Several
//! supervisors, in one process or many, may run cycles concurrently against the same
//! store: correctness rests on the store-backed locks, never on in-process exclusion.
//!
//! ```rust,no_run
//! use fleet_supervisor::orchestration::InstallationSupervisor;
//! use fleet_supervisor::provisioner::Provisioner;
//! use fleet_supervisor::store::{InMemoryStore, SupervisorStore};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example(provisioner: Arc<dyn Provisioner>) {
//! let store: Arc<dyn SupervisorStore> = Arc::new(InMemoryStore::new());
//! let supervisor = InstallationSupervisor::new(store, provisioner, "instance-a");
//!
//! loop {
//!     let summary = supervisor.do_work().await;
//!     tracing::debug!(?summary, "Supervisor cycle complete");
//!     tokio::time::sleep(Duration::from_secs(30)).await;
//! }
//! # }
//! ```

use super::transition_engine::TransitionEngine;
use crate::config::SupervisorConfig;
use crate::locking::EntityLock;
use crate::logging::log_transition;
use crate::models::Installation;
use crate::provisioner::Provisioner;
use crate::state_machine::InstallationState;
use crate::store::SupervisorStore;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of supervising a single installation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuperviseOutcome {
    /// Another owner holds the installation lock
    LockUnavailable,
    Unchanged(InstallationState),
    Transitioned {
        from: InstallationState,
        to: InstallationState,
    },
    /// The computed state could not be persisted
    PersistFailed(InstallationState),
}

/// Counts for one pass over the pending installations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub candidates: usize,
    pub transitioned: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: SuperviseOutcome) {
        match outcome {
            SuperviseOutcome::LockUnavailable => self.skipped += 1,
            SuperviseOutcome::Unchanged(_) => self.unchanged += 1,
            SuperviseOutcome::Transitioned { .. } => self.transitioned += 1,
            SuperviseOutcome::PersistFailed(_) => self.failed += 1,
        }
    }
}

pub struct InstallationSupervisor {
    store: Arc<dyn SupervisorStore>,
    engine: TransitionEngine,
    instance_id: String,
}

impl InstallationSupervisor {
    pub fn new(
        store: Arc<dyn SupervisorStore>,
        provisioner: Arc<dyn Provisioner>,
        instance_id: impl Into<String>,
    ) -> Self {
        let instance_id = instance_id.into();
        Self {
            engine: TransitionEngine::new(Arc::clone(&store), provisioner, instance_id.clone()),
            store,
            instance_id,
        }
    }

    /// Build a supervisor that locks under the configured instance id
    pub fn from_config(
        config: &SupervisorConfig,
        store: Arc<dyn SupervisorStore>,
        provisioner: Arc<dyn Provisioner>,
    ) -> Self {
        Self::new(store, provisioner, config.instance_id.clone())
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Run one supervision cycle over every unlocked installation with pending work.
    ///
    /// A failed query ends the cycle early with an empty summary; the next poll retries.
    pub async fn do_work(&self) -> CycleSummary {
        let installations = match self.store.get_unlocked_installations_pending_work().await {
            Ok(installations) => installations,
            Err(e) => {
                warn!(
                    instance_id = %self.instance_id,
                    error = %e,
                    "Failed to query for installations pending work"
                );
                return CycleSummary::default();
            }
        };

        let mut summary = CycleSummary {
            candidates: installations.len(),
            ..CycleSummary::default()
        };

        for installation in &installations {
            summary.record(self.supervise(installation).await);
        }

        if summary.candidates > 0 {
            debug!(
                instance_id = %self.instance_id,
                candidates = summary.candidates,
                transitioned = summary.transitioned,
                unchanged = summary.unchanged,
                skipped = summary.skipped,
                failed = summary.failed,
                "Supervisor cycle complete"
            );
        }

        summary
    }

    /// Drive one installation through a single transition under its lock
    #[instrument(skip(self, installation), fields(installation_id = %installation.id))]
    pub async fn supervise(&self, installation: &Installation) -> SuperviseOutcome {
        let guard = EntityLock::installation(
            &installation.id,
            &self.instance_id,
            Arc::clone(&self.store),
        )
        .try_lock()
        .await;
        let Some(guard) = guard else {
            debug!("Installation is locked by another owner, skipping");
            return SuperviseOutcome::LockUnavailable;
        };

        info!(state = %installation.state, "Supervising installation");

        let new_state = self.engine.transition(installation).await;
        let outcome = self.persist_state(installation, new_state).await;

        guard.release().await;
        outcome
    }

    async fn persist_state(
        &self,
        installation: &Installation,
        new_state: InstallationState,
    ) -> SuperviseOutcome {
        // Re-read so fields changed outside this transition are not overwritten
        let mut current = match self.store.get_installation(&installation.id).await {
            Ok(Some(current)) => current,
            Ok(None) => {
                warn!("Installation disappeared during transition");
                return SuperviseOutcome::PersistFailed(installation.state);
            }
            Err(e) => {
                warn!(error = %e, "Failed to get refreshed installation");
                return SuperviseOutcome::PersistFailed(installation.state);
            }
        };

        if current.state == new_state {
            return SuperviseOutcome::Unchanged(new_state);
        }

        let from = current.state;
        current.state = new_state;
        if let Err(e) = self.store.update_installation(&current).await {
            warn!(
                from = %from,
                to = %new_state,
                error = %e,
                "Failed to set installation state"
            );
            return SuperviseOutcome::PersistFailed(from);
        }

        log_transition(&installation.id, from, new_state, &self.instance_id);
        SuperviseOutcome::Transitioned {
            from,
            to: new_state,
        }
    }
}
