use crate::database::entities::{CombinedAggregate, rate_combined_aggregates};
use crate::database::{DatabaseError, DatabaseResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ConnectionTrait, DatabaseConnection, EntityTrait, QuerySelect, Set, sea_query::OnConflict,
};

/// Combined aggregates DAO: one summary row per rated entity.
///
/// The combined row doubles as the entity's write lock: the rating engine
/// creates it if missing and then selects it `FOR UPDATE` before touching
/// anything else that belongs to the entity.
#[derive(Clone)]
pub struct CombinedAggregatesDao {
    db: DatabaseConnection,
}

impl CombinedAggregatesDao {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Find the combined aggregate of an entity
    pub async fn find(&self, entity_id: &str) -> DatabaseResult<Option<CombinedAggregate>> {
        rate_combined_aggregates::Entity::find_by_id(entity_id.to_string())
            .one(&self.db)
            .await
            .map_err(DatabaseError::from)
    }

    /// Insert a zeroed row unless one exists; returns true when a row was created
    pub async fn ensure_row<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
        category_count: usize,
        now: DateTime<Utc>,
    ) -> DatabaseResult<bool> {
        let empty = CombinedAggregate::empty(entity_id, category_count, now);
        let active_model = Self::active_model(&empty);

        let on_conflict = OnConflict::column(rate_combined_aggregates::Column::EntityId)
            .do_nothing()
            .to_owned();

        let inserted = rate_combined_aggregates::Entity::insert(active_model)
            .on_conflict(on_conflict)
            .exec_without_returning(conn)
            .await
            .map_err(DatabaseError::from)?;

        Ok(inserted > 0)
    }

    /// Load the combined row, row-locked where the backend supports it
    pub async fn load_for_update<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
    ) -> DatabaseResult<Option<CombinedAggregate>> {
        rate_combined_aggregates::Entity::find_by_id(entity_id.to_string())
            .lock_exclusive()
            .one(conn)
            .await
            .map_err(DatabaseError::from)
    }

    /// Store/update the combined aggregate using native upsert
    pub async fn upsert<C: ConnectionTrait>(
        &self,
        conn: &C,
        aggregate: &CombinedAggregate,
    ) -> DatabaseResult<u64> {
        let on_conflict = OnConflict::column(rate_combined_aggregates::Column::EntityId)
            .update_columns([
                rate_combined_aggregates::Column::RatedCount,
                rate_combined_aggregates::Column::OverallMean,
                rate_combined_aggregates::Column::CategoryMeans,
                rate_combined_aggregates::Column::UpdatedAt,
            ])
            .to_owned();

        rate_combined_aggregates::Entity::insert(Self::active_model(aggregate))
            .on_conflict(on_conflict)
            .exec_without_returning(conn)
            .await
            .map_err(DatabaseError::from)
    }

    fn active_model(aggregate: &CombinedAggregate) -> rate_combined_aggregates::ActiveModel {
        rate_combined_aggregates::ActiveModel {
            entity_id: Set(aggregate.entity_id.clone()),
            rated_count: Set(aggregate.rated_count),
            overall_mean: Set(aggregate.overall_mean),
            category_means: Set(aggregate.category_means.clone()),
            updated_at: Set(aggregate.updated_at),
        }
    }
}
