//! # prospect-db
//!
//! PostgreSQL database layer for prospect.
//!
//! This crate provides repository implementations for:
//! - Search jobs with compare-and-swap state writes
//! - Leads ingested from the automation tool or entered by hand
//! - Contacts and opportunities created from leads
//! - The append-only search audit log

pub mod audit;
pub mod contacts;
pub mod leads;
pub mod pool;
pub mod searches;
pub mod test_fixtures;

// Re-export core types
pub use prospect_core::*;

pub use audit::PgAuditLog;
pub use contacts::{PgContactRepository, PgOpportunityRepository};
pub use leads::PgLeadRepository;
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use searches::PgSearchRepository;

/// Database wrapper providing access to all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Search job repository.
    pub searches: PgSearchRepository,
    /// Lead repository.
    pub leads: PgLeadRepository,
    /// Contacts created from leads.
    pub contacts: PgContactRepository,
    /// Opportunities created from leads.
    pub opportunities: PgOpportunityRepository,
    /// Search transition history.
    pub audit: PgAuditLog,
}

impl Database {
    /// Create a new database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            searches: PgSearchRepository::new(pool.clone()),
            leads: PgLeadRepository::new(pool.clone()),
            contacts: PgContactRepository::new(pool.clone()),
            opportunities: PgOpportunityRepository::new(pool.clone()),
            audit: PgAuditLog::new(pool.clone()),
            pool,
        }
    }

    /// Connect to database with default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }

    /// Round-trip a trivial query; used by the health endpoint.
    pub async fn ping(&self) -> Result<()> {
        ping(&self.pool).await
    }
}

/// Round-trip a trivial query against a pool.
pub async fn ping(pool: &sqlx::Pool<sqlx::Postgres>) -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(Error::Database)?;
    Ok(())
}
