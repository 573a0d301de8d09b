use crate::database::entities::{RateReaction, rate_reactions};
use crate::database::{DatabaseError, DatabaseResult};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait, Set, sea_query::OnConflict};

/// Rate reactions DAO ("useful" marks on a rating)
#[derive(Clone)]
pub struct RateReactionsDao {
    db: DatabaseConnection,
}

impl RateReactionsDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Check whether a user already marked a rating as useful
    pub async fn exists(
        &self,
        entity_id: &str,
        author_id: &str,
        user_id: &str,
    ) -> DatabaseResult<bool> {
        let reaction = rate_reactions::Entity::find_by_id((
            entity_id.to_string(),
            author_id.to_string(),
            user_id.to_string(),
        ))
        .one(&self.db)
        .await
        .map_err(DatabaseError::from)?;

        Ok(reaction.is_some())
    }

    /// Insert unless the same reaction exists; returns the number of rows created
    pub async fn insert_if_absent<C: ConnectionTrait>(
        &self,
        conn: &C,
        reaction: &RateReaction,
    ) -> DatabaseResult<u64> {
        let active_model = rate_reactions::ActiveModel {
            entity_id: Set(reaction.entity_id.clone()),
            author_id: Set(reaction.author_id.clone()),
            user_id: Set(reaction.user_id.clone()),
            created_at: Set(reaction.created_at),
        };

        let on_conflict = OnConflict::columns([
            rate_reactions::Column::EntityId,
            rate_reactions::Column::AuthorId,
            rate_reactions::Column::UserId,
        ])
        .do_nothing()
        .to_owned();

        rate_reactions::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec_without_returning(conn)
            .await
            .map_err(DatabaseError::from)
    }

    pub async fn delete<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
        author_id: &str,
        user_id: &str,
    ) -> DatabaseResult<u64> {
        let result = rate_reactions::Entity::delete_by_id((
            entity_id.to_string(),
            author_id.to_string(),
            user_id.to_string(),
        ))
        .exec(conn)
        .await
        .map_err(DatabaseError::from)?;

        Ok(result.rows_affected)
    }
}
