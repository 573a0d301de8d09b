//! Database access layer with table-specific DAOs
//!
//! Each table (rates, category aggregates, combined aggregates, comments,
//! reactions) has its own DAO. Operations that take part in a rating
//! transaction are generic over [`sea_orm::ConnectionTrait`] so the caller
//! decides whether they run on the pool or inside a transaction.

use crate::config::Config;
use crate::health::HealthChecker;
use async_trait::async_trait;
use sea_orm::sqlx::{Connection, SqliteConnection};
use sea_orm::{ConnectOptions, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;

pub mod config;
pub mod dao;
pub mod entities;
pub mod migration;

pub use dao::{
    CategoryAggregatesDao, CombinedAggregatesDao, RateCommentsDao, RateReactionsDao, RatesDao,
};

/// Database error types
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Record not found")]
    NotFound,
    #[error("Write conflict: {0}")]
    Conflict(String),
    #[error("Migration error: {0}")]
    Migration(String),
    /// Schema or stored data does not match the model; replaying cannot help
    #[error("Schema mismatch: {0}")]
    Schema(String),
}

impl DatabaseError {
    /// Conflicts and connection-level failures may succeed when the whole
    /// operation is replayed against fresh state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DatabaseError::Conflict(_) | DatabaseError::Database(_))
    }
}

impl From<DbErr> for DatabaseError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(msg)) = err.sql_err() {
            return DatabaseError::Conflict(msg);
        }

        let message = err.to_string();
        match err {
            DbErr::Json(_) | DbErr::Type(_) | DbErr::TryIntoErr { .. } => {
                DatabaseError::Schema(message)
            }
            _ if is_lock_contention(&message) => DatabaseError::Conflict(message),
            _ if is_schema_mismatch(&message) => DatabaseError::Schema(message),
            _ => DatabaseError::Database(message),
        }
    }
}

/// Missing tables or columns reported by SQLite and PostgreSQL.
fn is_schema_mismatch(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("no such table")
        || lower.contains("no such column")
        || lower.contains("has no column named")
        || (lower.contains("relation") && lower.contains("does not exist"))
        || (lower.contains("column") && lower.contains("does not exist"))
}

/// Recognizes lock contention reported by SQLite and PostgreSQL.
fn is_lock_contention(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("database is locked")
        || lower.contains("database table is locked")
        || lower.contains("sqlite_busy")
        || lower.contains("could not serialize access")
        || lower.contains("deadlock detected")
        || lower.contains("could not obtain lock")
        || lower.contains("40001")
        || lower.contains("40p01")
        || lower.contains("55p03")
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Database manager trait for dependency injection and testing
#[async_trait]
pub trait DatabaseManager: Send + Sync {
    /// Run database migrations
    async fn migrate(&self) -> DatabaseResult<()>;

    /// Health check for database connection
    async fn health_check(&self) -> DatabaseResult<()>;

    /// Get rates DAO
    fn rates(&self) -> RatesDao;

    /// Get per-category aggregates DAO
    fn category_aggregates(&self) -> CategoryAggregatesDao;

    /// Get combined aggregates DAO
    fn combined_aggregates(&self) -> CombinedAggregatesDao;

    /// Get rate comments DAO
    fn rate_comments(&self) -> RateCommentsDao;

    /// Get rate reactions DAO
    fn rate_reactions(&self) -> RateReactionsDao;

    /// Get direct database connection (for transactions and migrations)
    fn connection(&self) -> &DatabaseConnection;
}

/// Database connection manager implementation
pub struct DatabaseManagerImpl {
    pub connection: DatabaseConnection,
    /// Holds a named in-memory SQLite database open while the pool recycles
    /// its connections
    memory_keeper: Option<Mutex<SqliteConnection>>,
}

impl DatabaseManagerImpl {
    /// Create database manager from configuration
    pub async fn new_from_config(config: &Config) -> Result<Self, DatabaseError> {
        let in_memory = is_in_memory_sqlite(&config.database.url);

        // A shared-cache memory database lives as long as one connection to it
        let (url, memory_keeper) = if in_memory {
            let url = shared_memory_url();
            let keeper = SqliteConnection::connect(&url)
                .await
                .map_err(|e| DatabaseError::Database(e.to_string()))?;
            (url, Some(Mutex::new(keeper)))
        } else {
            (config.database.url.clone(), None)
        };

        // Shared-cache connections take table locks, so one writer connection
        let max_connections = if in_memory {
            1
        } else {
            config.database.max_connections
        };

        let mut options = ConnectOptions::new(url);
        options
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
            .sqlx_logging(false);

        let connection = sea_orm::Database::connect(options)
            .await
            .map_err(|e| DatabaseError::Database(e.to_string()))?;

        Ok(Self {
            connection,
            memory_keeper,
        })
    }

    /// Wrap an existing connection (used by tests and tools)
    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self {
            connection,
            memory_keeper: None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.memory_keeper.is_some()
    }
}

fn shared_memory_url() -> String {
    format!(
        "sqlite:file:rating-{}?mode=memory&cache=shared",
        uuid::Uuid::new_v4().simple()
    )
}

fn is_in_memory_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}

#[async_trait]
impl DatabaseManager for DatabaseManagerImpl {
    async fn migrate(&self) -> DatabaseResult<()> {
        use crate::database::migration::Migrator;
        use sea_orm_migration::MigratorTrait;

        tracing::info!("Running database migrations");

        Migrator::up(&self.connection, None)
            .await
            .map_err(|e| DatabaseError::Migration(format!("Failed to run migrations: {}", e)))?;

        tracing::info!("Successfully completed all migrations");
        Ok(())
    }

    async fn health_check(&self) -> DatabaseResult<()> {
        self.connection
            .ping()
            .await
            .map_err(|e| DatabaseError::Database(format!("db error: {}", e)))
    }

    fn rates(&self) -> RatesDao {
        RatesDao::new(self.connection.clone())
    }

    fn category_aggregates(&self) -> CategoryAggregatesDao {
        CategoryAggregatesDao::new(self.connection.clone())
    }

    fn combined_aggregates(&self) -> CombinedAggregatesDao {
        CombinedAggregatesDao::new(self.connection.clone())
    }

    fn rate_comments(&self) -> RateCommentsDao {
        RateCommentsDao::new(self.connection.clone())
    }

    fn rate_reactions(&self) -> RateReactionsDao {
        RateReactionsDao::new(self.connection.clone())
    }

    fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }
}

#[async_trait]
impl HealthChecker for DatabaseManagerImpl {
    fn name(&self) -> &str {
        "database"
    }

    async fn check(&self) -> crate::health::HealthCheckResult {
        match self.health_check().await {
            Ok(_) => crate::health::HealthCheckResult::healthy_with_details(serde_json::json!({
                "status": "healthy",
                "connection": "ok"
            })),
            Err(err) => crate::health::HealthCheckResult::unhealthy_with_details(
                "DB health check failed".to_string(),
                serde_json::json!({
                    "status": "unhealthy",
                    "error": err.to_string()
                }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::database::migration::Migrator;
    use sea_orm::ConnectionTrait;
    use sea_orm_migration::MigratorTrait;

    fn memory_config() -> Config {
        let mut config = Config::default();
        config.database.url = "sqlite::memory:".to_string();
        config
    }

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory_sqlite("sqlite::memory:"));
        assert!(is_in_memory_sqlite("sqlite:file:x?mode=memory&cache=shared"));
        assert!(!is_in_memory_sqlite("sqlite://ratings.db?mode=rwc"));
        assert!(!is_in_memory_sqlite("postgres://localhost/ratings"));
    }

    #[tokio::test]
    async fn test_memory_database_outlives_pool_connections() {
        let url = shared_memory_url();
        let _keeper = SqliteConnection::connect(&url).await.unwrap();

        let pool = sea_orm::Database::connect(url.as_str()).await.unwrap();
        Migrator::up(&pool, None).await.unwrap();
        pool.close().await.unwrap();

        // Every pooled connection is gone; the keeper still holds the schema
        let reopened = sea_orm::Database::connect(url.as_str()).await.unwrap();
        assert!(Migrator::get_pending_migrations(&reopened).await.unwrap().is_empty());
        reopened
            .execute_unprepared("SELECT COUNT(*) FROM rates")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_separate_memory_databases_are_isolated() {
        let first = DatabaseManagerImpl::new_from_config(&memory_config())
            .await
            .unwrap();
        let second = DatabaseManagerImpl::new_from_config(&memory_config())
            .await
            .unwrap();
        first.migrate().await.unwrap();

        assert!(Migrator::get_pending_migrations(&first.connection).await.unwrap().is_empty());
        assert!(!Migrator::get_pending_migrations(&second.connection).await.unwrap().is_empty());
    }

    #[test]
    fn test_lock_contention_is_conflict() {
        let err = DatabaseError::from(DbErr::Custom("error returned from database: (code: 5) database is locked".to_string()));
        assert!(matches!(err, DatabaseError::Conflict(_)));

        let err = DatabaseError::from(DbErr::Custom(
            "could not serialize access due to concurrent update".to_string(),
        ));
        assert!(matches!(err, DatabaseError::Conflict(_)));
    }

    #[test]
    fn test_other_errors_are_database_errors() {
        let err = DatabaseError::from(DbErr::Custom("connection reset by peer".to_string()));
        assert!(matches!(err, DatabaseError::Database(_)));
        assert!(err.is_retryable());
        assert!(!DatabaseError::NotFound.is_retryable());
    }

    #[test]
    fn test_schema_errors_are_not_retryable() {
        let err = DatabaseError::from(DbErr::Custom(
            "error returned from database: (code: 1) no such table: rate_combined_aggregates"
                .to_string(),
        ));
        assert!(matches!(err, DatabaseError::Schema(_)));
        assert!(!err.is_retryable());

        let err = DatabaseError::from(DbErr::Custom(
            "relation \"rates\" does not exist".to_string(),
        ));
        assert!(matches!(err, DatabaseError::Schema(_)));

        let err = DatabaseError::from(DbErr::Json("expected value at line 1".to_string()));
        assert!(matches!(err, DatabaseError::Schema(_)));
        assert!(!err.is_retryable());
    }
}
