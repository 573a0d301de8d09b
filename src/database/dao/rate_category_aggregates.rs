use crate::database::entities::{CategoryAggregate, rate_category_aggregates};
use crate::database::{DatabaseError, DatabaseResult};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, sea_query::OnConflict,
};

/// Per-category aggregates DAO: histogram, count and mean per (entity, category)
#[derive(Clone)]
pub struct CategoryAggregatesDao {
    db: DatabaseConnection,
}

impl CategoryAggregatesDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// All category aggregates of an entity ordered by category index
    pub async fn find_by_entity(&self, entity_id: &str) -> DatabaseResult<Vec<CategoryAggregate>> {
        rate_category_aggregates::Entity::find()
            .filter(rate_category_aggregates::Column::EntityId.eq(entity_id))
            .order_by_asc(rate_category_aggregates::Column::CategoryIndex)
            .all(&self.db)
            .await
            .map_err(DatabaseError::from)
    }

    /// Load an entity's category rows, row-locked where the backend supports it
    pub async fn load_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
    ) -> DatabaseResult<Vec<CategoryAggregate>> {
        rate_category_aggregates::Entity::find()
            .filter(rate_category_aggregates::Column::EntityId.eq(entity_id))
            .order_by_asc(rate_category_aggregates::Column::CategoryIndex)
            .lock_exclusive()
            .all(conn)
            .await
            .map_err(DatabaseError::from)
    }

    /// Store/update one category aggregate using native upsert
    pub async fn upsert<C: ConnectionTrait>(
        &self,
        conn: &C,
        aggregate: &CategoryAggregate,
    ) -> DatabaseResult<u64> {
        let active_model = rate_category_aggregates::ActiveModel {
            entity_id: Set(aggregate.entity_id.clone()),
            category_index: Set(aggregate.category_index),
            histogram: Set(aggregate.histogram.clone()),
            rated_count: Set(aggregate.rated_count),
            mean: Set(aggregate.mean),
            updated_at: Set(aggregate.updated_at),
        };

        let on_conflict = OnConflict::columns([
            rate_category_aggregates::Column::EntityId,
            rate_category_aggregates::Column::CategoryIndex,
        ])
        .update_columns([
            rate_category_aggregates::Column::Histogram,
            rate_category_aggregates::Column::RatedCount,
            rate_category_aggregates::Column::Mean,
            rate_category_aggregates::Column::UpdatedAt,
        ])
        .to_owned();

        rate_category_aggregates::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec_without_returning(conn)
            .await
            .map_err(DatabaseError::from)
    }
}
