#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Fleet Supervisor
//!
//! Reconciliation supervisor that drives installations through their provisioning
//! lifecycle across a fleet of clusters.
//!
//! ## Overview
//!
//! Installations are tenant workloads that must be placed on a cluster, upgraded and
//! eventually torn down. Each placement is recorded as a cluster installation. The
//! supervisor polls a shared store for installations with pending work, locks each one,
//! computes its next lifecycle state from the states of its cluster installations, and
//! persists the result. Physical side effects are delegated to a provisioner.
//!
//! The supervisor keeps no state between cycles: everything needed to resume lives in
//! the store, and every lock is a store-backed try-lock keyed by the supervisor's
//! instance id, so any number of instances may poll the same store.
//!
//! ## Module Organization
//!
//! - [`models`] - Installations, clusters, cluster installations and list filters
//! - [`state_machine`] - Lifecycle state enums
//! - [`store`] - Store port with in-memory and PostgreSQL adapters
//! - [`provisioner`] - Provisioner port
//! - [`locking`] - Scoped entity locks
//! - [`orchestration`] - Aggregation, transition engine and supervisor loop
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fleet_supervisor::config::SupervisorConfig;
//! use fleet_supervisor::orchestration::InstallationSupervisor;
//! use fleet_supervisor::provisioner::Provisioner;
//! use fleet_supervisor::store::{PgStore, SupervisorStore};
//! use std::sync::Arc;
//!
//! # async fn example(provisioner: Arc<dyn Provisioner>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = SupervisorConfig::load()?;
//! fleet_supervisor::logging::init_structured_logging(config.log_format);
//!
//! let store = PgStore::connect(&config.database).await?;
//! store.migrate().await?;
//! let store: Arc<dyn SupervisorStore> = Arc::new(store);
//!
//! let supervisor = InstallationSupervisor::from_config(&config, store, provisioner);
//! let summary = supervisor.do_work().await;
//! println!("Transitioned {} installations", summary.transitioned);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests against the in-memory store
//! DATABASE_URL=postgres://... cargo test -- --ignored   # PostgreSQL store tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod locking;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod provisioner;
pub mod state_machine;
pub mod store;

pub use config::{DatabaseConfig, LogFormat, SupervisorConfig};
pub use constants::{status_groups, system};
pub use error::{SupervisorError, SupervisorResult};
pub use locking::{EntityLock, LockGuard, LockTarget};
pub use models::{
    new_id, Cluster, ClusterFilter, ClusterInstallation, ClusterInstallationFilter, Installation,
    InstallationAffinity, Paging,
};
pub use orchestration::{CycleSummary, InstallationSupervisor, SuperviseOutcome, TransitionEngine};
pub use provisioner::Provisioner;
pub use state_machine::{ClusterInstallationState, ClusterState, InstallationState};
pub use store::{InMemoryStore, SupervisorStore};
