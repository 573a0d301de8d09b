#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use rating_aggregator::{
    Server,
    rating::RatingConfig,
    test_utils::TestServerBuilder,
};
use sea_orm::{ConnectionTrait, Database};
use serde_json::Value;
use tower::ServiceExt;

pub const POSTGRES_URL_ENV: &str = "RATING_TEST_POSTGRES_URL";

/// Server plus its router, driven through `oneshot`
pub struct TestHarness {
    pub server: Server,
    pub app: Router,
}

impl TestHarness {
    pub fn from_server(server: Server) -> Self {
        let app = server.create_app();
        Self { server, app }
    }

    /// In-memory SQLite harness with `category_count` categories on a 1-5 scale
    pub async fn new(category_count: usize) -> Self {
        let server = TestServerBuilder::new()
            .with_rating_config(RatingConfig::new(category_count, 1, 5))
            .build()
            .await;
        Self::from_server(server)
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }
}

/// Throwaway PostgreSQL database created next to the one named by
/// `RATING_TEST_POSTGRES_URL`; unavailable when the variable is unset.
pub struct PostgresTestDb {
    pub database_url: String,
    admin_url: String,
    name: String,
}

impl PostgresTestDb {
    pub async fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let admin_url = std::env::var(POSTGRES_URL_ENV)?;
        let name = format!("rating_test_{}", uuid::Uuid::new_v4().simple());

        let admin = Database::connect(admin_url.as_str()).await?;
        admin
            .execute_unprepared(&format!("CREATE DATABASE \"{}\"", name))
            .await?;
        admin.close().await?;

        Ok(Self {
            database_url: replace_database_name(&admin_url, &name),
            admin_url,
            name,
        })
    }

    pub async fn cleanup(&self) -> Result<(), Box<dyn std::error::Error>> {
        let admin = Database::connect(self.admin_url.as_str()).await?;
        admin
            .execute_unprepared(&format!("DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)", self.name))
            .await?;
        admin.close().await?;
        Ok(())
    }
}

fn replace_database_name(url: &str, name: &str) -> String {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (url, None),
    };
    let prefix = match base.rsplit_once('/') {
        Some((prefix, _)) if prefix.contains("://") && !prefix.ends_with(':') && !prefix.ends_with('/') => {
            prefix.to_string()
        }
        _ => base.trim_end_matches('/').to_string(),
    };
    match query {
        Some(query) => format!("{}/{}?{}", prefix, name, query),
        None => format!("{}/{}", prefix, name),
    }
}

pub async fn create_postgres_harness(db: &PostgresTestDb, category_count: usize) -> TestHarness {
    let server = TestServerBuilder::new()
        .with_database_url(db.database_url.clone())
        .with_rating_config(RatingConfig::new(category_count, 1, 5))
        .build()
        .await;
    TestHarness::from_server(server)
}

/// Runs a scenario against in-memory SQLite and, when configured, PostgreSQL
macro_rules! database_test {
    ($test_name:ident, $categories:expr, $test_impl:ident) => {
        pastey::paste! {
            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn [<sqlite_ $test_name>]() {
                let harness = common::TestHarness::new($categories).await;
                $test_impl(&harness).await;
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn [<postgres_ $test_name>]() {
                let postgres_db = match common::PostgresTestDb::new().await {
                    Ok(db) => db,
                    Err(_) => {
                        println!("Skipping PostgreSQL test - database not available");
                        return;
                    }
                };

                let harness = common::create_postgres_harness(&postgres_db, $categories).await;
                $test_impl(&harness).await;

                let _ = postgres_db.cleanup().await;
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::replace_database_name;

    #[test]
    fn test_replace_database_name() {
        assert_eq!(
            replace_database_name("postgres://u:p@localhost:5432/postgres", "t1"),
            "postgres://u:p@localhost:5432/t1"
        );
        assert_eq!(
            replace_database_name("postgres://u@localhost/db?sslmode=disable", "t1"),
            "postgres://u@localhost/t1?sslmode=disable"
        );
    }
}
