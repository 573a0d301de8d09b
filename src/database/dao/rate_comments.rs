use crate::database::entities::{RateComment, rate_comments};
use crate::database::{DatabaseError, DatabaseResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

/// Rate comments DAO for database operations
#[derive(Clone)]
pub struct RateCommentsDao {
    db: DatabaseConnection,
}

impl RateCommentsDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find comment by ID
    pub async fn find(&self, comment_id: &str) -> DatabaseResult<Option<RateComment>> {
        self.load(&self.db, comment_id).await
    }

    pub async fn load<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_id: &str,
    ) -> DatabaseResult<Option<RateComment>> {
        rate_comments::Entity::find_by_id(comment_id.to_string())
            .one(conn)
            .await
            .map_err(DatabaseError::from)
    }

    /// Load a comment for editing, row-locked where the backend supports it
    pub async fn load_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_id: &str,
    ) -> DatabaseResult<Option<RateComment>> {
        rate_comments::Entity::find_by_id(comment_id.to_string())
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(DatabaseError::from)
    }

    /// Comments on one rating, oldest first
    pub async fn find_by_rate(
        &self,
        entity_id: &str,
        author_id: &str,
    ) -> DatabaseResult<Vec<RateComment>> {
        rate_comments::Entity::find()
            .filter(rate_comments::Column::EntityId.eq(entity_id))
            .filter(rate_comments::Column::AuthorId.eq(author_id))
            .order_by_asc(rate_comments::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(DatabaseError::from)
    }

    pub async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment: &RateComment,
    ) -> DatabaseResult<()> {
        let active_model = rate_comments::ActiveModel {
            comment_id: Set(comment.comment_id.clone()),
            entity_id: Set(comment.entity_id.clone()),
            author_id: Set(comment.author_id.clone()),
            user_id: Set(comment.user_id.clone()),
            comment: Set(comment.comment.clone()),
            created_at: Set(comment.created_at),
            updated_at: Set(comment.updated_at),
            history: Set(comment.history.clone()),
        };

        rate_comments::Entity::insert(active_model)
            .exec_without_returning(conn)
            .await
            .map_err(DatabaseError::from)?;

        Ok(())
    }

    /// Persist edited text, edit time and history of an existing comment
    pub async fn update<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment: &RateComment,
    ) -> DatabaseResult<RateComment> {
        let active_model = rate_comments::ActiveModel {
            comment_id: Set(comment.comment_id.clone()),
            comment: Set(comment.comment.clone()),
            updated_at: Set(comment.updated_at),
            history: Set(comment.history.clone()),
            ..Default::default()
        };

        active_model.update(conn).await.map_err(|e| match e {
            sea_orm::DbErr::RecordNotUpdated => DatabaseError::NotFound,
            other => DatabaseError::from(other),
        })
    }

    pub async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        comment_id: &str,
    ) -> DatabaseResult<u64> {
        let result = rate_comments::Entity::delete_by_id(comment_id.to_string())
            .exec(conn)
            .await
            .map_err(DatabaseError::from)?;

        Ok(result.rows_affected)
    }
}
