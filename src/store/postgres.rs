//! # PostgreSQL Store
//!
//! Store adapter over a `PgPool`. Locks are conditional updates on the
//! `lock_acquired_by` / `lock_acquired_at` columns, so contention is resolved by the
//! database row lock and never by waiting in the supervisor.
//!
//! ```rust,no_run
//! use fleet_supervisor::config::SupervisorConfig;
//! use fleet_supervisor::store::PgStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SupervisorConfig::load()?;
//! let store = PgStore::connect(&config.database).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

use super::SupervisorStore;
use crate::config::DatabaseConfig;
use crate::constants::status_groups;
use crate::error::{SupervisorError, SupervisorResult};
use crate::logging::log_lock_operation;
use crate::models::{
    new_id, Cluster, ClusterFilter, ClusterInstallation, ClusterInstallationFilter, Installation,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::BTreeSet;
use tracing::{debug, error};

const INSTALLATION_COLUMNS: &str = "id, owner_id, version, dns, affinity, state, create_at, \
     delete_at, lock_acquired_by, lock_acquired_at";
const CLUSTER_COLUMNS: &str =
    "id, provider, size, state, create_at, delete_at, lock_acquired_by, lock_acquired_at";
const CLUSTER_INSTALLATION_COLUMNS: &str = "id, cluster_id, installation_id, namespace, state, \
     create_at, delete_at, lock_acquired_by, lock_acquired_at";

fn parse_column<T>(value: &str) -> SupervisorResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value.parse().map_err(SupervisorError::DatabaseError)
}

#[derive(FromRow)]
struct InstallationRow {
    id: String,
    owner_id: String,
    version: String,
    dns: String,
    affinity: String,
    state: String,
    create_at: DateTime<Utc>,
    delete_at: Option<DateTime<Utc>>,
    lock_acquired_by: Option<String>,
    lock_acquired_at: Option<DateTime<Utc>>,
}

impl TryFrom<InstallationRow> for Installation {
    type Error = SupervisorError;

    fn try_from(row: InstallationRow) -> SupervisorResult<Self> {
        Ok(Installation {
            id: row.id,
            owner_id: row.owner_id,
            version: row.version,
            dns: row.dns,
            affinity: parse_column(&row.affinity)?,
            state: parse_column(&row.state)?,
            create_at: row.create_at,
            delete_at: row.delete_at,
            lock_acquired_by: row.lock_acquired_by,
            lock_acquired_at: row.lock_acquired_at,
        })
    }
}

#[derive(FromRow)]
struct ClusterRow {
    id: String,
    provider: String,
    size: String,
    state: String,
    create_at: DateTime<Utc>,
    delete_at: Option<DateTime<Utc>>,
    lock_acquired_by: Option<String>,
    lock_acquired_at: Option<DateTime<Utc>>,
}

impl TryFrom<ClusterRow> for Cluster {
    type Error = SupervisorError;

    fn try_from(row: ClusterRow) -> SupervisorResult<Self> {
        Ok(Cluster {
            id: row.id,
            provider: row.provider,
            size: row.size,
            state: parse_column(&row.state)?,
            create_at: row.create_at,
            delete_at: row.delete_at,
            lock_acquired_by: row.lock_acquired_by,
            lock_acquired_at: row.lock_acquired_at,
        })
    }
}

#[derive(FromRow)]
struct ClusterInstallationRow {
    id: String,
    cluster_id: String,
    installation_id: String,
    namespace: String,
    state: String,
    create_at: DateTime<Utc>,
    delete_at: Option<DateTime<Utc>>,
    lock_acquired_by: Option<String>,
    lock_acquired_at: Option<DateTime<Utc>>,
}

impl TryFrom<ClusterInstallationRow> for ClusterInstallation {
    type Error = SupervisorError;

    fn try_from(row: ClusterInstallationRow) -> SupervisorResult<Self> {
        Ok(ClusterInstallation {
            id: row.id,
            cluster_id: row.cluster_id,
            installation_id: row.installation_id,
            namespace: row.namespace,
            state: parse_column(&row.state)?,
            create_at: row.create_at,
            delete_at: row.delete_at,
            lock_acquired_by: row.lock_acquired_by,
            lock_acquired_at: row.lock_acquired_at,
        })
    }
}

fn push_paging(builder: &mut QueryBuilder<'_, Postgres>, paging: &crate::models::Paging) {
    if let Some((limit, offset)) = paging.limit_offset() {
        builder.push(" LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against the configured database
    pub async fn connect(config: &DatabaseConfig) -> SupervisorResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await
            .map_err(|e| {
                error!("Failed to connect to supervisor database: {}", e);
                SupervisorError::DatabaseError(format!("Connection failed: {e}"))
            })?;
        Ok(Self { pool })
    }

    /// Apply the embedded schema migrations
    pub async fn migrate(&self) -> SupervisorResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn create_installation(&self, installation: &Installation) -> SupervisorResult<()> {
        sqlx::query(
            "INSERT INTO installation (id, owner_id, version, dns, affinity, state, create_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(&installation.id)
        .bind(&installation.owner_id)
        .bind(&installation.version)
        .bind(&installation.dns)
        .bind(installation.affinity.as_str())
        .bind(installation.state.as_str())
        .bind(installation.create_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn create_cluster(&self, cluster: &Cluster) -> SupervisorResult<()> {
        sqlx::query(
            "INSERT INTO cluster (id, provider, size, state, create_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&cluster.id)
        .bind(&cluster.provider)
        .bind(&cluster.size)
        .bind(cluster.state.as_str())
        .bind(cluster.create_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn update_cluster(&self, cluster: &Cluster) -> SupervisorResult<()> {
        let result =
            sqlx::query("UPDATE cluster SET provider = $2, size = $3, state = $4 WHERE id = $1")
                .bind(&cluster.id)
                .bind(&cluster.provider)
                .bind(&cluster.size)
                .bind(cluster.state.as_str())
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(SupervisorError::not_found("cluster", &cluster.id));
        }
        Ok(())
    }

    async fn lock_row(&self, table: &'static str, id: &str, locker_id: &str) -> SupervisorResult<bool> {
        let query = format!(
            "UPDATE {table} SET lock_acquired_by = $2, lock_acquired_at = NOW() \
             WHERE id = $1 AND (lock_acquired_at IS NULL OR lock_acquired_by = $2)"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(locker_id)
            .execute(&self.pool)
            .await?;
        let locked = result.rows_affected() == 1;
        log_lock_operation("lock", table, &[id.to_string()], locker_id, locked);
        Ok(locked)
    }

    async fn unlock_row(
        &self,
        table: &'static str,
        id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        let query = format!(
            "UPDATE {table} SET lock_acquired_by = NULL, lock_acquired_at = NULL \
             WHERE id = $1 AND (lock_acquired_by = $2 OR $3)"
        );
        let result = sqlx::query(&query)
            .bind(id)
            .bind(locker_id)
            .bind(force)
            .execute(&self.pool)
            .await?;
        let unlocked = result.rows_affected() == 1;
        log_lock_operation("unlock", table, &[id.to_string()], locker_id, unlocked);
        Ok(unlocked)
    }
}

#[async_trait]
impl SupervisorStore for PgStore {
    async fn get_clusters(&self, filter: &ClusterFilter) -> SupervisorResult<Vec<Cluster>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CLUSTER_COLUMNS} FROM cluster WHERE TRUE"
        ));
        if !filter.include_deleted {
            builder.push(" AND delete_at IS NULL");
        }
        builder.push(" ORDER BY create_at, id");
        push_paging(&mut builder, &filter.paging);

        let rows = builder.build_query_as::<ClusterRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(Cluster::try_from).collect()
    }

    async fn get_cluster(&self, cluster_id: &str) -> SupervisorResult<Option<Cluster>> {
        let row: Option<ClusterRow> =
            sqlx::query_as(&format!("SELECT {CLUSTER_COLUMNS} FROM cluster WHERE id = $1"))
                .bind(cluster_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(Cluster::try_from).transpose()
    }

    async fn lock_cluster(&self, cluster_id: &str, locker_id: &str) -> SupervisorResult<bool> {
        self.lock_row("cluster", cluster_id, locker_id).await
    }

    async fn unlock_cluster(
        &self,
        cluster_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        self.unlock_row("cluster", cluster_id, locker_id, force)
            .await
    }

    async fn get_installation(
        &self,
        installation_id: &str,
    ) -> SupervisorResult<Option<Installation>> {
        let row: Option<InstallationRow> = sqlx::query_as(&format!(
            "SELECT {INSTALLATION_COLUMNS} FROM installation WHERE id = $1"
        ))
        .bind(installation_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Installation::try_from).transpose()
    }

    async fn get_unlocked_installations_pending_work(&self) -> SupervisorResult<Vec<Installation>> {
        let states: Vec<&str> = status_groups::INSTALLATION_PENDING_WORK
            .iter()
            .map(|state| state.as_str())
            .collect();

        let rows: Vec<InstallationRow> = sqlx::query_as(&format!(
            "SELECT {INSTALLATION_COLUMNS} FROM installation \
             WHERE state = ANY($1) AND lock_acquired_at IS NULL AND delete_at IS NULL \
             ORDER BY create_at, id"
        ))
        .bind(&states)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Fetched installations pending work");
        rows.into_iter().map(Installation::try_from).collect()
    }

    async fn update_installation(&self, installation: &Installation) -> SupervisorResult<()> {
        let result = sqlx::query(
            "UPDATE installation SET owner_id = $2, version = $3, dns = $4, affinity = $5, state = $6 \
             WHERE id = $1",
        )
        .bind(&installation.id)
        .bind(&installation.owner_id)
        .bind(&installation.version)
        .bind(&installation.dns)
        .bind(installation.affinity.as_str())
        .bind(installation.state.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SupervisorError::not_found("installation", &installation.id));
        }
        Ok(())
    }

    async fn lock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
    ) -> SupervisorResult<bool> {
        self.lock_row("installation", installation_id, locker_id)
            .await
    }

    async fn unlock_installation(
        &self,
        installation_id: &str,
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        self.unlock_row("installation", installation_id, locker_id, force)
            .await
    }

    async fn delete_installation(&self, installation_id: &str) -> SupervisorResult<()> {
        let result = sqlx::query(
            "UPDATE installation SET delete_at = COALESCE(delete_at, NOW()) WHERE id = $1",
        )
        .bind(installation_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SupervisorError::not_found("installation", installation_id));
        }
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

        sqlx::query(
            "INSERT INTO cluster_installation \
             (id, cluster_id, installation_id, namespace, state, create_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&cluster_installation.id)
        .bind(&cluster_installation.cluster_id)
        .bind(&cluster_installation.installation_id)
        .bind(&cluster_installation.namespace)
        .bind(cluster_installation.state.as_str())
        .bind(cluster_installation.create_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_cluster_installation(
        &self,
        cluster_installation_id: &str,
    ) -> SupervisorResult<Option<ClusterInstallation>> {
        let row: Option<ClusterInstallationRow> = sqlx::query_as(&format!(
            "SELECT {CLUSTER_INSTALLATION_COLUMNS} FROM cluster_installation WHERE id = $1"
        ))
        .bind(cluster_installation_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(ClusterInstallation::try_from).transpose()
    }

    async fn get_cluster_installations(
        &self,
        filter: &ClusterInstallationFilter,
    ) -> SupervisorResult<Vec<ClusterInstallation>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {CLUSTER_INSTALLATION_COLUMNS} FROM cluster_installation WHERE TRUE"
        ));
        if let Some(ids) = &filter.ids {
            builder.push(" AND id = ANY(");
            builder.push_bind(ids.clone());
            builder.push(")");
        }
        if let Some(installation_id) = &filter.installation_id {
            builder.push(" AND installation_id = ");
            builder.push_bind(installation_id.clone());
        }
        if let Some(cluster_id) = &filter.cluster_id {
            builder.push(" AND cluster_id = ");
            builder.push_bind(cluster_id.clone());
        }
        if !filter.include_deleted {
            builder.push(" AND delete_at IS NULL");
        }
        builder.push(" ORDER BY create_at, id");
        push_paging(&mut builder, &filter.paging);

        let rows: Vec<ClusterInstallationRow> =
            builder.build_query_as::<ClusterInstallationRow>().fetch_all(&self.pool).await?;
        rows.into_iter().map(ClusterInstallation::try_from).collect()
    }

    async fn lock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
    ) -> SupervisorResult<bool> {
        let unique: BTreeSet<&String> = cluster_installation_ids.iter().collect();
        let ids: Vec<String> = unique.into_iter().cloned().collect();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "UPDATE cluster_installation SET lock_acquired_by = $2, lock_acquired_at = NOW() \
             WHERE id = ANY($1) AND (lock_acquired_at IS NULL OR lock_acquired_by = $2)",
        )
        .bind(&ids)
        .bind(locker_id)
        .execute(&mut *tx)
        .await?;

        let locked = result.rows_affected() == ids.len() as u64;
        if locked {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }

        log_lock_operation(
            "lock",
            "cluster_installation",
            cluster_installation_ids,
            locker_id,
            locked,
        );
        Ok(locked)
    }

    async fn unlock_cluster_installations(
        &self,
        cluster_installation_ids: &[String],
        locker_id: &str,
        force: bool,
    ) -> SupervisorResult<bool> {
        let unique: BTreeSet<&String> = cluster_installation_ids.iter().collect();
        let ids: Vec<String> = unique.into_iter().cloned().collect();

        let result = sqlx::query(
            "UPDATE cluster_installation SET lock_acquired_by = NULL, lock_acquired_at = NULL \
             WHERE id = ANY($1) AND (lock_acquired_by = $2 OR $3)",
        )
        .bind(&ids)
        .bind(locker_id)
        .bind(force)
        .execute(&self.pool)
        .await?;

        let unlocked = result.rows_affected() == ids.len() as u64;
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
        let result = sqlx::query(
            "UPDATE cluster_installation \
             SET cluster_id = $2, installation_id = $3, namespace = $4, state = $5, \
                 delete_at = COALESCE($6, delete_at) \
             WHERE id = $1",
        )
        .bind(&cluster_installation.id)
        .bind(&cluster_installation.cluster_id)
        .bind(&cluster_installation.installation_id)
        .bind(&cluster_installation.namespace)
        .bind(cluster_installation.state.as_str())
        .bind(cluster_installation.delete_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SupervisorError::not_found(
                "cluster installation",
                &cluster_installation.id,
            ));
        }
        Ok(())
    }
}
