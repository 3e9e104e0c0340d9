//! # Models
//!
//! Records shared between the supervisor, the store and the provisioner.

pub mod cluster;
pub mod cluster_installation;
pub mod filters;
pub mod installation;

pub use cluster::Cluster;
pub use cluster_installation::ClusterInstallation;
pub use filters::{ClusterFilter, ClusterInstallationFilter, Paging};
pub use installation::{Installation, InstallationAffinity};

/// Generate a new unique identifier (UUID v4 without hyphens)
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
