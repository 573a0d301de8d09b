pub mod comments;
pub mod health;
pub mod rates;

pub use comments::create_comment_routes;
pub use health::create_health_routes;
pub use rates::create_rate_routes;

use crate::server::Server;
use axum::Router;

/// Everything mounted under `/api`
pub fn create_api_routes() -> Router<Server> {
    Router::new()
        .merge(create_rate_routes())
        .merge(create_comment_routes())
}
