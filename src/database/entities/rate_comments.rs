use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentHistoryEntry {
    pub comment: String,
    pub time: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CommentHistory(pub Vec<CommentHistoryEntry>);

/// A reply posted on someone's rating of an entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_comments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub comment_id: String,
    pub entity_id: String,
    pub author_id: String,
    pub user_id: String,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    #[sea_orm(column_type = "Json")]
    pub history: CommentHistory,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn new(
        entity_id: impl Into<String>,
        author_id: impl Into<String>,
        user_id: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            comment_id: uuid::Uuid::new_v4().to_string(),
            entity_id: entity_id.into(),
            author_id: author_id.into(),
            user_id: user_id.into(),
            comment: comment.into(),
            created_at: Utc::now(),
            updated_at: None,
            history: CommentHistory::default(),
        }
    }

    /// Time the current text was written
    pub fn last_written_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}
