use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Category scores of one submission, index-aligned to the configured categories
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct CategoryValues(pub Vec<i32>);

impl CategoryValues {
    pub fn get(&self, index: usize) -> Option<i32> {
        self.0.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Snapshot of a superseded submission
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateHistoryEntry {
    pub overall: f64,
    pub review: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Append-only list of superseded submissions, oldest first
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct RateHistory(pub Vec<RateHistoryEntry>);

impl RateHistory {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns a copy with the superseded record appended
    pub fn appended(&self, prior: &Model) -> Self {
        let mut entries = self.0.clone();
        entries.push(RateHistoryEntry {
            overall: prior.overall,
            review: prior.review.clone(),
            submitted_at: prior.submitted_at,
        });
        Self(entries)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "rates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub entity_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub author_id: String,
    pub overall: f64,
    #[sea_orm(column_type = "Json")]
    pub category_values: CategoryValues,
    pub review: Option<String>,
    pub anonymous: bool,
    pub submitted_at: DateTime<Utc>,
    pub useful_count: i32,
    pub reply_count: i32,
    #[sea_orm(column_type = "Json")]
    pub history: RateHistory,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(overall: f64, review: Option<&str>) -> Model {
        Model {
            entity_id: "e1".to_string(),
            author_id: "a1".to_string(),
            overall,
            category_values: CategoryValues(vec![4, 5]),
            review: review.map(str::to_string),
            anonymous: false,
            submitted_at: Utc::now(),
            useful_count: 0,
            reply_count: 0,
            history: RateHistory::default(),
        }
    }

    #[test]
    fn test_history_appended_keeps_order() {
        let first = record(4.5, Some("good"));
        let second = record(3.0, None);

        let history = RateHistory::default().appended(&first).appended(&second);

        assert_eq!(history.len(), 2);
        assert_eq!(history.0[0].overall, 4.5);
        assert_eq!(history.0[0].review.as_deref(), Some("good"));
        assert_eq!(history.0[1].overall, 3.0);
        assert_eq!(history.0[1].review, None);
    }

    #[test]
    fn test_history_serializes_as_plain_array() {
        let history = RateHistory::default().appended(&record(2.0, Some("meh")));
        let json = serde_json::to_value(&history).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["overall"], 2.0);
        assert_eq!(json[0]["review"], "meh");
    }
}
