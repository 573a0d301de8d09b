//! Replies and "useful" reactions on individual ratings
//!
//! Both keep a denormalized counter on the rated record (`reply_count`,
//! `useful_count`) that moves in the same transaction as the child row.

use crate::database::entities::{CommentHistoryEntry, RateComment, RateReaction};
use crate::database::{DatabaseError, DatabaseManager};
use chrono::Utc;
use sea_orm::{ConnectionTrait, TransactionTrait};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum CommentError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<DatabaseError> for CommentError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound => CommentError::NotFound("record not found".to_string()),
            other => CommentError::Storage(other.to_string()),
        }
    }
}

impl From<sea_orm::DbErr> for CommentError {
    fn from(err: sea_orm::DbErr) -> Self {
        DatabaseError::from(err).into()
    }
}

pub type CommentResult<T> = Result<T, CommentError>;

#[derive(Clone)]
pub struct RateCommentService {
    database: Arc<dyn DatabaseManager>,
    max_comment_length: usize,
}

impl RateCommentService {
    pub fn new(database: Arc<dyn DatabaseManager>, max_comment_length: usize) -> Self {
        Self {
            database,
            max_comment_length,
        }
    }

    /// Reply to an author's rating, bumping the rating's reply count
    pub async fn add_comment(
        &self,
        entity_id: &str,
        author_id: &str,
        user_id: &str,
        text: &str,
    ) -> CommentResult<RateComment> {
        require("user_id", user_id)?;
        self.check_text(text)?;

        let txn = self.database.connection().begin().await?;
        self.require_rating(&txn, entity_id, author_id).await?;

        let comment = RateComment::new(entity_id, author_id, user_id, text);
        self.database.rate_comments().insert(&txn, &comment).await?;
        self.database
            .rates()
            .adjust_reply_count(&txn, entity_id, author_id, 1)
            .await?;

        txn.commit().await?;

        info!(
            "User {} commented on rating of {} by {}",
            user_id, entity_id, author_id
        );
        Ok(comment)
    }

    /// Replace the text of a comment, keeping the previous text in its history
    pub async fn update_comment(
        &self,
        comment_id: &str,
        user_id: &str,
        text: &str,
    ) -> CommentResult<RateComment> {
        self.check_text(text)?;

        let comments = self.database.rate_comments();
        let txn = self.database.connection().begin().await?;
        let mut comment = comments
            .load_for_update(&txn, comment_id)
            .await?
            .ok_or_else(|| CommentError::NotFound(format!("comment {}", comment_id)))?;
        check_owner(&comment, user_id)?;

        comment.history.0.push(CommentHistoryEntry {
            comment: comment.comment.clone(),
            time: comment.last_written_at(),
        });
        comment.comment = text.to_string();
        comment.updated_at = Some(Utc::now());

        let updated = comments.update(&txn, &comment).await?;
        txn.commit().await?;
        debug!("Comment {} edited ({} revisions)", comment_id, updated.history.0.len());
        Ok(updated)
    }

    /// Delete a comment, lowering the rating's reply count
    pub async fn remove_comment(&self, comment_id: &str, user_id: &str) -> CommentResult<()> {
        let comment = self.owned_comment(comment_id, user_id).await?;

        let txn = self.database.connection().begin().await?;
        let deleted = self.database.rate_comments().delete(&txn, comment_id).await?;
        if deleted == 0 {
            return Err(CommentError::NotFound(format!("comment {}", comment_id)));
        }
        self.database
            .rates()
            .adjust_reply_count(&txn, &comment.entity_id, &comment.author_id, -1)
            .await?;
        txn.commit().await?;

        info!("Comment {} removed by {}", comment_id, user_id);
        Ok(())
    }

    /// Comments on one rating, oldest first
    pub async fn list_comments(
        &self,
        entity_id: &str,
        author_id: &str,
    ) -> CommentResult<Vec<RateComment>> {
        Ok(self
            .database
            .rate_comments()
            .find_by_rate(entity_id, author_id)
            .await?)
    }

    /// Mark a rating as useful; returns false when the user already had
    pub async fn react(&self, entity_id: &str, author_id: &str, user_id: &str) -> CommentResult<bool> {
        require("user_id", user_id)?;

        let txn = self.database.connection().begin().await?;
        self.require_rating(&txn, entity_id, author_id).await?;

        let reaction = RateReaction {
            entity_id: entity_id.to_string(),
            author_id: author_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        };
        let inserted = self
            .database
            .rate_reactions()
            .insert_if_absent(&txn, &reaction)
            .await?;
        if inserted > 0 {
            self.database
                .rates()
                .adjust_useful_count(&txn, entity_id, author_id, 1)
                .await?;
        }
        txn.commit().await?;

        Ok(inserted > 0)
    }

    /// Withdraw a "useful" mark; returns false when there was none
    pub async fn unreact(
        &self,
        entity_id: &str,
        author_id: &str,
        user_id: &str,
    ) -> CommentResult<bool> {
        let txn = self.database.connection().begin().await?;
        let deleted = self
            .database
            .rate_reactions()
            .delete(&txn, entity_id, author_id, user_id)
            .await?;
        if deleted > 0 {
            self.database
                .rates()
                .adjust_useful_count(&txn, entity_id, author_id, -1)
                .await?;
        }
        txn.commit().await?;

        Ok(deleted > 0)
    }

    pub async fn has_reacted(
        &self,
        entity_id: &str,
        author_id: &str,
        user_id: &str,
    ) -> CommentResult<bool> {
        Ok(self
            .database
            .rate_reactions()
            .exists(entity_id, author_id, user_id)
            .await?)
    }

    async fn require_rating<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
        author_id: &str,
    ) -> CommentResult<()> {
        match self.database.rates().load(conn, entity_id, author_id).await? {
            Some(_) => Ok(()),
            None => Err(CommentError::NotFound(format!(
                "rating of {} by {}",
                entity_id, author_id
            ))),
        }
    }

    async fn owned_comment(&self, comment_id: &str, user_id: &str) -> CommentResult<RateComment> {
        let comment = self
            .database
            .rate_comments()
            .find(comment_id)
            .await?
            .ok_or_else(|| CommentError::NotFound(format!("comment {}", comment_id)))?;
        check_owner(&comment, user_id)?;
        Ok(comment)
    }

    fn check_text(&self, text: &str) -> CommentResult<()> {
        require("comment", text)?;
        if text.chars().count() > self.max_comment_length {
            return Err(CommentError::Validation(format!(
                "comment must be at most {} characters",
                self.max_comment_length
            )));
        }
        Ok(())
    }
}

fn check_owner(comment: &RateComment, user_id: &str) -> CommentResult<()> {
    if comment.user_id != user_id {
        return Err(CommentError::Forbidden(
            "only the commenter may change a comment".to_string(),
        ));
    }
    Ok(())
}

fn require(field: &str, value: &str) -> CommentResult<()> {
    if value.trim().is_empty() {
        return Err(CommentError::Validation(format!("{} is required", field)));
    }
    Ok(())
}
