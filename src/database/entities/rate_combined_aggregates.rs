use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Snapshot of each category aggregate's mean, index-aligned
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CategoryMeans(pub Vec<f64>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_combined_aggregates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entity_id: String,
    pub rated_count: i64,
    pub overall_mean: f64,
    #[sea_orm(column_type = "Json")]
    pub category_means: CategoryMeans,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Zeroed aggregate for an entity nobody has rated yet
    pub fn empty(entity_id: impl Into<String>, category_count: usize, now: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.into(),
            rated_count: 0,
            overall_mean: 0.0,
            category_means: CategoryMeans(vec![0.0; category_count]),
            updated_at: now,
        }
    }

    /// Fold a first-time submission into the running mean
    pub fn add_contribution(&mut self, overall: f64) {
        let previous = self.rated_count as f64;
        self.rated_count += 1;
        self.overall_mean = (self.overall_mean * previous + overall) / self.rated_count as f64;
    }

    /// Replace an author's previous contribution with a new one
    pub fn revise_contribution(&mut self, old_overall: f64, new_overall: f64) {
        if self.rated_count > 0 {
            self.overall_mean += (new_overall - old_overall) / self.rated_count as f64;
        }
    }
}
