use crate::database::entities::{RatingRecord, rates};
use crate::database::{DatabaseError, DatabaseResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, OnConflict},
};

/// Rates DAO: one row per (entity, author) with the author's current rating
#[derive(Clone)]
pub struct RatesDao {
    db: DatabaseConnection,
}

impl RatesDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find an author's rating of an entity
    pub async fn find(&self, entity_id: &str, author_id: &str) -> DatabaseResult<Option<RatingRecord>> {
        self.load(&self.db, entity_id, author_id).await
    }

    /// Load an author's rating through the given connection or transaction
    pub async fn load<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
        author_id: &str,
    ) -> DatabaseResult<Option<RatingRecord>> {
        rates::Entity::find_by_id((entity_id.to_string(), author_id.to_string()))
            .one(conn)
            .await
            .map_err(DatabaseError::from)
    }

    /// All ratings of an entity, most recent first
    pub async fn find_by_entity(&self, entity_id: &str) -> DatabaseResult<Vec<RatingRecord>> {
        rates::Entity::find()
            .filter(rates::Column::EntityId.eq(entity_id))
            .order_by_desc(rates::Column::SubmittedAt)
            .all(&self.db)
            .await
            .map_err(DatabaseError::from)
    }

    /// Insert or replace the author's rating using native upsert.
    ///
    /// `useful_count` and `reply_count` belong to the comment and reaction
    /// flows and are left untouched when the row already exists.
    pub async fn upsert<C: ConnectionTrait>(
        &self,
        conn: &C,
        record: &RatingRecord,
    ) -> DatabaseResult<u64> {
        let active_model = rates::ActiveModel {
            entity_id: Set(record.entity_id.clone()),
            author_id: Set(record.author_id.clone()),
            overall: Set(record.overall),
            category_values: Set(record.category_values.clone()),
            review: Set(record.review.clone()),
            anonymous: Set(record.anonymous),
            submitted_at: Set(record.submitted_at),
            useful_count: Set(record.useful_count),
            reply_count: Set(record.reply_count),
            history: Set(record.history.clone()),
        };

        let on_conflict = OnConflict::columns([rates::Column::EntityId, rates::Column::AuthorId])
            .update_columns([
                rates::Column::Overall,
                rates::Column::CategoryValues,
                rates::Column::Review,
                rates::Column::Anonymous,
                rates::Column::SubmittedAt,
                rates::Column::History,
            ])
            .to_owned();

        rates::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec_without_returning(conn)
            .await
            .map_err(DatabaseError::from)
    }

    /// Nudge the reply counter in SQL so concurrent repliers never lose an update
    pub async fn adjust_reply_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
        author_id: &str,
        delta: i32,
    ) -> DatabaseResult<u64> {
        self.adjust_counter(conn, rates::Column::ReplyCount, entity_id, author_id, delta)
            .await
    }

    /// Nudge the "useful" counter in SQL
    pub async fn adjust_useful_count<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
        author_id: &str,
        delta: i32,
    ) -> DatabaseResult<u64> {
        self.adjust_counter(conn, rates::Column::UsefulCount, entity_id, author_id, delta)
            .await
    }

    async fn adjust_counter<C: ConnectionTrait>(
        &self,
        conn: &C,
        column: rates::Column,
        entity_id: &str,
        author_id: &str,
        delta: i32,
    ) -> DatabaseResult<u64> {
        let result = rates::Entity::update_many()
            .col_expr(column, Expr::col(column).add(delta))
            .filter(rates::Column::EntityId.eq(entity_id))
            .filter(rates::Column::AuthorId.eq(author_id))
            .exec(conn)
            .await
            .map_err(DatabaseError::from)?;

        Ok(result.rows_affected)
    }
}
