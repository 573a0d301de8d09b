use crate::{
    config::Config,
    database::{DatabaseManager, DatabaseManagerImpl},
    rating::RatingConfig,
    server::Server,
};
use std::sync::Arc;

/// Test server builder backed by in-memory SQLite by default
pub struct TestServerBuilder {
    config: Config,
    use_memory_db: bool,
}

impl TestServerBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            use_memory_db: true,
        }
    }

    /// Keep the configured database URL instead of in-memory SQLite
    pub fn with_real_database(mut self) -> Self {
        self.use_memory_db = false;
        self
    }

    /// Point the server at a specific database
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database.url = url.into();
        self.use_memory_db = false;
        self
    }

    pub fn with_rating_config(mut self, rating: RatingConfig) -> Self {
        self.config.rating = rating;
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Build the server and run migrations
    pub async fn build(self) -> Server {
        let mut config = self.config;

        if self.use_memory_db {
            config.database.url = "sqlite::memory:".to_string();
        }

        // Disable metrics and request logging for tests
        config.metrics.enabled = false;
        config.logging.log_request = false;

        let server = Server::new(config).await.unwrap();
        server.database.migrate().await.unwrap();
        server
    }
}

impl Default for TestServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Migrated in-memory SQLite database for unit tests
pub async fn memory_database() -> Arc<dyn DatabaseManager> {
    let mut config = Config::default();
    config.database.url = "sqlite::memory:".to_string();

    let database = DatabaseManagerImpl::new_from_config(&config).await.unwrap();
    database.migrate().await.unwrap();
    Arc::new(database)
}
