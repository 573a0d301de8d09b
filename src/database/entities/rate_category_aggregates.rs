use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Occurrence count per discrete rating value.
///
/// Counts are exact integers, so the mean derived from them never drifts no
/// matter how many revisions were applied.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct Histogram(pub BTreeMap<i32, i64>);

impl Histogram {
    /// Count one more occurrence of `value`
    pub fn record(&mut self, value: i32) {
        *self.0.entry(value).or_insert(0) += 1;
    }

    /// Remove one occurrence of `value`, returning false if none was counted
    pub fn retract(&mut self, value: i32) -> bool {
        match self.0.get_mut(&value) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                self.0.remove(&value);
                true
            }
            None => false,
        }
    }

    pub fn count(&self, value: i32) -> i64 {
        self.0.get(&value).copied().unwrap_or(0)
    }

    pub fn total(&self) -> i64 {
        self.0.values().sum()
    }

    /// Count-weighted average of the recorded values, 0.0 when empty
    pub fn mean(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: i64 = self.0.iter().map(|(value, count)| *value as i64 * count).sum();
        weighted as f64 / total as f64
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rate_category_aggregates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entity_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_index: i32,
    #[sea_orm(column_type = "Json")]
    pub histogram: Histogram,
    pub rated_count: i64,
    pub mean: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Empty aggregate for a category that has never been rated
    pub fn empty(entity_id: impl Into<String>, category_index: i32, now: DateTime<Utc>) -> Self {
        Self {
            entity_id: entity_id.into(),
            category_index,
            histogram: Histogram::default(),
            rated_count: 0,
            mean: 0.0,
            updated_at: now,
        }
    }

    /// Re-derive count and mean from the histogram
    pub fn refresh(&mut self, now: DateTime<Utc>) {
        self.rated_count = self.histogram.total();
        self.mean = self.histogram.mean();
        self.updated_at = now;
    }
}
