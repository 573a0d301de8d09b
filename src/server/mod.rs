pub mod config;
pub mod middleware;

use crate::{
    comments::RateCommentService,
    config::Config,
    database::{DatabaseManager, DatabaseManagerImpl},
    error::AppError,
    health::HealthService,
    metrics,
    rating::RatingEngine,
    routes::{create_api_routes, create_health_routes},
    shutdown::ShutdownCoordinator,
    utils::request_id_middleware,
};
use axum::{Router, extract::DefaultBodyLimit, middleware as axum_middleware};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Largest accepted request body; reviews and comments are short text
const MAX_BODY_SIZE: usize = 64 * 1024;

#[derive(Clone)]
pub struct Server {
    pub config: Arc<Config>,
    pub database: Arc<dyn DatabaseManager>,
    pub engine: Arc<RatingEngine>,
    pub comments: Arc<RateCommentService>,
    pub health_service: Arc<HealthService>,
    pub shutdown_coordinator: Arc<ShutdownCoordinator>,
}

impl Server {
    pub async fn new(config: Config) -> Result<Self, AppError> {
        if config.metrics.enabled {
            metrics::init_metrics_with_port(config.metrics.port).map_err(|e| {
                error!(
                    "Failed to start metrics server on port {}: {}",
                    config.metrics.port, e
                );
                AppError::Internal(format!("Failed to start metrics server: {}", e))
            })?;
        }

        let database_impl = Arc::new(
            DatabaseManagerImpl::new_from_config(&config)
                .await
                .map_err(AppError::Database)?,
        );
        let database: Arc<dyn DatabaseManager> = database_impl.clone();

        let engine = Arc::new(RatingEngine::new(database.clone(), config.rating.clone()));
        let comments = Arc::new(RateCommentService::new(
            database.clone(),
            config.rating.max_review_length,
        ));

        let health_service = Arc::new(HealthService::new());
        health_service.register(database_impl).await;
        health_service.register(engine.clone()).await;

        info!(
            "Rating engine ready: {} categor{} on a {}-{} scale",
            config.rating.category_count,
            if config.rating.category_count == 1 { "y" } else { "ies" },
            config.rating.min_rating,
            config.rating.max_rating
        );

        Ok(Self {
            config: Arc::new(config),
            database,
            engine,
            comments,
            health_service,
            shutdown_coordinator: Arc::new(ShutdownCoordinator::new()),
        })
    }

    pub async fn run(&self) -> Result<(), AppError> {
        if self.config.database.migration_on_startup {
            self.database.migrate().await.map_err(AppError::Database)?;
        }

        let app = self.create_app();

        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid listen address: {}", e)))?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to bind to address: {}", e)))?;

        info!("Server listening on http://{}", addr);

        let coordinator = self.shutdown_coordinator.clone();
        tokio::spawn(async move {
            coordinator.wait_for_shutdown_signal().await;
        });

        let mut shutdown_rx = self.shutdown_coordinator.subscribe();
        let serve_future = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
            info!("Graceful shutdown initiated");
        });

        let drain_timeout = Duration::from_secs(self.config.server.shutdown_timeout_secs);
        let mut timeout_rx = self.shutdown_coordinator.subscribe();
        tokio::select! {
            result = serve_future => {
                if let Err(e) = result {
                    error!("Server error: {}", e);
                }
            }
            _ = async {
                let _ = timeout_rx.changed().await;
                tokio::time::sleep(drain_timeout).await;
            } => {
                warn!("In-flight requests did not finish within {:?}", drain_timeout);
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }

    // Creates an application router
    pub fn create_app(&self) -> Router {
        let mut app = Router::new()
            .nest("/health", create_health_routes())
            .nest("/api", create_api_routes())
            .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
            .with_state(self.clone());

        if self.config.metrics.enabled {
            app = app.layer(axum_middleware::from_fn(metrics::metrics_middleware));
        }
        if self.config.logging.log_request {
            app = app.layer(axum_middleware::from_fn(middleware::request_response_logger));
        }
        // Outermost, so the logger and handlers see the id
        app.layer(axum_middleware::from_fn(request_id_middleware))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_health_check_through_app() {
        let server = crate::test_utils::TestServerBuilder::new().build().await;
        let app = server.create_app();

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_server_registers_health_checkers() {
        let server = crate::test_utils::TestServerBuilder::new().build().await;
        let mut checkers = server.health_service.get_registered_checkers().await;
        checkers.sort();
        assert_eq!(checkers, vec!["database".to_string(), "rating".to_string()]);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let server = crate::test_utils::TestServerBuilder::new().build().await;
        let app = server.create_app();

        let review = "x".repeat(MAX_BODY_SIZE + 1);
        let body = serde_json::json!({ "rate": 5, "review": review }).to_string();
        let request = Request::builder()
            .method("POST")
            .uri("/api/rates/e1/a1")
            .header("Content-Type", "application/json")
            .body(Body::from(body))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
