use crate::{database::entities::RateComment, error::AppError, server::Server};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub user_id: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct CommenterQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UsefulResponse {
    pub useful: bool,
    /// Whether this call changed anything
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed: Option<bool>,
}

/// Comment thread and "useful" reaction routes on a single rating
pub fn create_comment_routes() -> Router<Server> {
    Router::new()
        .route(
            "/rates/{entity_id}/{author_id}/comments",
            get(list_comments).post(add_comment),
        )
        .route(
            "/comments/{comment_id}",
            put(update_comment).delete(remove_comment),
        )
        .route(
            "/rates/{entity_id}/{author_id}/useful/{user_id}",
            get(get_useful).put(mark_useful).delete(unmark_useful),
        )
}

async fn list_comments(
    State(server): State<Server>,
    Path((entity_id, author_id)): Path<(String, String)>,
) -> Result<Json<Vec<RateComment>>, AppError> {
    Ok(Json(server.comments.list_comments(&entity_id, &author_id).await?))
}

async fn add_comment(
    State(server): State<Server>,
    Path((entity_id, author_id)): Path<(String, String)>,
    Json(request): Json<CommentRequest>,
) -> Result<(StatusCode, Json<RateComment>), AppError> {
    let comment = server
        .comments
        .add_comment(&entity_id, &author_id, &request.user_id, &request.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(server): State<Server>,
    Path(comment_id): Path<String>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<RateComment>, AppError> {
    Ok(Json(
        server
            .comments
            .update_comment(&comment_id, &request.user_id, &request.comment)
            .await?,
    ))
}

async fn remove_comment(
    State(server): State<Server>,
    Path(comment_id): Path<String>,
    Query(query): Query<CommenterQuery>,
) -> Result<StatusCode, AppError> {
    server
        .comments
        .remove_comment(&comment_id, &query.user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_useful(
    State(server): State<Server>,
    Path((entity_id, author_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<UsefulResponse>, AppError> {
    let useful = server
        .comments
        .has_reacted(&entity_id, &author_id, &user_id)
        .await?;
    Ok(Json(UsefulResponse {
        useful,
        changed: None,
    }))
}

async fn mark_useful(
    State(server): State<Server>,
    Path((entity_id, author_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<UsefulResponse>, AppError> {
    let changed = server
        .comments
        .react(&entity_id, &author_id, &user_id)
        .await?;
    Ok(Json(UsefulResponse {
        useful: true,
        changed: Some(changed),
    }))
}

async fn unmark_useful(
    State(server): State<Server>,
    Path((entity_id, author_id, user_id)): Path<(String, String, String)>,
) -> Result<Json<UsefulResponse>, AppError> {
    let changed = server
        .comments
        .unreact(&entity_id, &author_id, &user_id)
        .await?;
    Ok(Json(UsefulResponse {
        useful: false,
        changed: Some(changed),
    }))
}
