//! # System Constants
//!
//! Status groups and defaults that define the operational boundaries of the
//! supervisor.

/// Groupings of states used by store queries and transition decisions
pub mod status_groups {
    use crate::state_machine::InstallationState;

    /// Installation states the supervisor picks up on every poll
    pub const INSTALLATION_PENDING_WORK: &[InstallationState] = &[
        InstallationState::CreationRequested,
        InstallationState::UpgradeRequested,
        InstallationState::UpgradeInProgress,
        InstallationState::DeletionRequested,
        InstallationState::DeletionInProgress,
    ];
}

/// Defaults shared by configuration and store adapters
pub mod system {
    /// Environment variable prefix for configuration overrides
    pub const CONFIG_ENV_PREFIX: &str = "SUPERVISOR";
    /// Separator between nested keys in environment overrides
    pub const CONFIG_ENV_SEPARATOR: &str = "__";
    /// Environment variable naming an optional configuration file
    pub const CONFIG_FILE_ENV: &str = "SUPERVISOR_CONFIG_FILE";
    pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/fleet_supervisor_development";
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
}
