use crate::{
    database::entities::RatingRecord,
    error::AppError,
    rating::{EntitySummary, RatingSubmission, SubmitOutcome},
    server::Server,
};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use tracing::info;

/// Rating submission and aggregate read routes
pub fn create_rate_routes() -> Router<Server> {
    Router::new()
        .route("/rates/{entity_id}", get(get_entity_summary))
        .route(
            "/rates/{entity_id}/{author_id}",
            get(get_rating).post(submit_rating),
        )
        .route("/entities/{entity_id}/rates", get(list_ratings))
}

/// Submit or revise the author's rating of an entity
async fn submit_rating(
    State(server): State<Server>,
    Path((entity_id, author_id)): Path<(String, String)>,
    Json(submission): Json<RatingSubmission>,
) -> Result<Json<SubmitOutcome>, AppError> {
    let outcome = server
        .engine
        .submit_with_retry(&entity_id, &author_id, &submission)
        .await?;

    info!(
        "Rating of {} by {} stored (revision: {}, history: {})",
        entity_id, author_id, outcome.revision, outcome.history_len
    );
    Ok(Json(outcome))
}

async fn get_rating(
    State(server): State<Server>,
    Path((entity_id, author_id)): Path<(String, String)>,
) -> Result<Json<RatingRecord>, AppError> {
    server
        .engine
        .get_rating(&entity_id, &author_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("rating of {} by {}", entity_id, author_id)))
}

async fn get_entity_summary(
    State(server): State<Server>,
    Path(entity_id): Path<String>,
) -> Result<Json<EntitySummary>, AppError> {
    Ok(Json(server.engine.entity_summary(&entity_id).await?))
}

async fn list_ratings(
    State(server): State<Server>,
    Path(entity_id): Path<String>,
) -> Result<Json<Vec<RatingRecord>>, AppError> {
    Ok(Json(server.engine.list_ratings(&entity_id).await?))
}

#[cfg(test)]
mod tests {
    use crate::rating::RatingConfig;
    use crate::test_utils::TestServerBuilder;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;

    async fn app(category_count: usize) -> Router {
        TestServerBuilder::new()
            .with_rating_config(RatingConfig::new(category_count, 1, 5))
            .build()
            .await
            .create_app()
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
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

    #[tokio::test]
    async fn test_submit_and_read_back() {
        let app = app(2).await;

        let (status, outcome) =
            send(&app, "POST", "/api/rates/e1/a1", Some(json!({"rates": [5, 4], "review": "nice"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(outcome["revision"], false);
        assert_eq!(outcome["overall"], 4.5);

        let (status, record) = send(&app, "GET", "/api/rates/e1/a1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["category_values"], json!([5, 4]));
        assert_eq!(record["review"], "nice");
        assert_eq!(record["history"], json!([]));

        let (status, summary) = send(&app, "GET", "/api/rates/e1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["combined"]["rated_count"], 1);
        assert_eq!(summary["combined"]["overall_mean"], 4.5);
        assert_eq!(summary["categories"][1]["histogram"], json!({"4": 1}));

        let (status, list) = send(&app, "GET", "/api/entities/e1/rates", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_submission_is_unprocessable() {
        let app = app(2).await;

        let (status, body) = send(&app, "POST", "/api/rates/e1/a1", Some(json!({"rates": [7, 4]}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["issues"][0]["field"], "rates[0]");
        assert_eq!(body["issues"][0]["code"], "max");

        let (status, _) = send(&app, "GET", "/api/rates/e1/a1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unrated_entity_summary_is_zeroed() {
        let app = app(2).await;

        let (status, summary) = send(&app, "GET", "/api/rates/nothing", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["combined"]["rated_count"], 0);
        assert_eq!(summary["combined"]["category_means"], json!([0.0, 0.0]));
        assert_eq!(summary["categories"].as_array().unwrap().len(), 2);
    }
}
