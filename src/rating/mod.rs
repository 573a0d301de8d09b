//! Rating Aggregation Engine
//!
//! A submission is validated, then applied inside one database transaction
//! that holds the entity's write lock: the author's prior rating decides
//! between first-time and revision, each changed category histogram is
//! updated and its mean re-derived, the combined aggregate's running mean is
//! adjusted, and the author's record is rewritten with the superseded values
//! appended to its history. Nothing is visible until the commit succeeds.

pub mod config;
pub mod locks;
pub mod types;
pub mod validation;

pub use config::RatingConfig;
pub use locks::EntityLocks;
pub use types::{EntitySummary, RatingError, RatingSubmission, SubmitOutcome, ValidationIssue};
pub use validation::{ValidatedRating, validate_submission};

use crate::database::DatabaseManager;
use crate::health::{HealthCheckResult, HealthChecker};
use crate::database::entities::{
    CategoryAggregate, CategoryMeans, CategoryValues, CombinedAggregate, RateHistory, RatingRecord,
};
use crate::metrics;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ConnectionTrait, TransactionTrait};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Clone)]
pub struct RatingEngine {
    database: Arc<dyn DatabaseManager>,
    config: RatingConfig,
    locks: Arc<EntityLocks>,
}

impl RatingEngine {
    pub fn new(database: Arc<dyn DatabaseManager>, config: RatingConfig) -> Self {
        Self {
            database,
            config,
            locks: Arc::new(EntityLocks::new()),
        }
    }

    pub fn config(&self) -> &RatingConfig {
        &self.config
    }

    /// Apply one author's rating of an entity as a single atomic unit
    #[instrument(skip(self, submission))]
    pub async fn submit_rating(
        &self,
        entity_id: &str,
        author_id: &str,
        submission: &RatingSubmission,
    ) -> Result<SubmitOutcome, RatingError> {
        let rating = validate_submission(&self.config, entity_id, author_id, submission)
            .map_err(RatingError::Validation)?;

        let _guard = self.locks.acquire(entity_id).await;

        // Dropping an uncommitted transaction rolls it back
        let txn = self
            .database
            .connection()
            .begin()
            .await
            .map_err(crate::database::DatabaseError::from)?;

        let outcome = self.apply(&txn, entity_id, author_id, &rating).await?;

        txn.commit()
            .await
            .map_err(crate::database::DatabaseError::from)?;

        debug!(
            revision = outcome.revision,
            rows_affected = outcome.rows_affected,
            "Rating committed"
        );
        Ok(outcome)
    }

    /// Like [`submit_rating`](Self::submit_rating), replaying the whole
    /// submission after conflicts and storage failures.
    pub async fn submit_with_retry(
        &self,
        entity_id: &str,
        author_id: &str,
        submission: &RatingSubmission,
    ) -> Result<SubmitOutcome, RatingError> {
        let mut attempt = 0;
        loop {
            match self.submit_rating(entity_id, author_id, submission).await {
                Ok(mut outcome) => {
                    outcome.attempts = attempt + 1;
                    metrics::track_rating_submission("ok");
                    return Ok(outcome);
                }
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "Retrying rating of {} by {} (attempt {}): {}",
                        entity_id, author_id, attempt, err
                    );
                    metrics::track_rating_retry();
                    tokio::time::sleep(self.config.retry_delay(attempt)).await;
                }
                Err(err) => {
                    metrics::track_rating_submission(err.kind());
                    return Err(err);
                }
            }
        }
    }

    /// The read-modify-write cycle, run on whatever connection the caller
    /// opened. Callers own commit and rollback.
    pub(crate) async fn apply<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: &str,
        author_id: &str,
        rating: &ValidatedRating,
    ) -> Result<SubmitOutcome, RatingError> {
        let now = Utc::now();
        let category_count = self.config.category_count;
        let combined_dao = self.database.combined_aggregates();
        let category_dao = self.database.category_aggregates();
        let rates_dao = self.database.rates();

        // Entity lock: the combined row is created if needed and locked first
        if combined_dao
            .ensure_row(conn, entity_id, category_count, now)
            .await?
        {
            info!("First rating for entity {}", entity_id);
        }
        let mut combined = combined_dao
            .load_for_update(conn, entity_id)
            .await?
            .unwrap_or_else(|| CombinedAggregate::empty(entity_id, category_count, now));

        let prior = rates_dao.load(conn, entity_id, author_id).await?;

        let mut stored: HashMap<i32, CategoryAggregate> = category_dao
            .load_for_update(conn, entity_id)
            .await?
            .into_iter()
            .map(|aggregate| (aggregate.category_index, aggregate))
            .collect();

        let mut rows_affected = 0;
        let mut aggregates = Vec::with_capacity(category_count);

        for (index, &value) in rating.categories.iter().enumerate() {
            let category_index = index as i32;
            let mut aggregate = stored
                .remove(&category_index)
                .unwrap_or_else(|| CategoryAggregate::empty(entity_id, category_index, now));

            let previous = prior
                .as_ref()
                .and_then(|record| record.category_values.get(index));

            let changed = match previous {
                Some(old) if old == value => false,
                Some(old) => {
                    if !aggregate.histogram.retract(old) {
                        warn!(
                            "Category {} of entity {} had no count for prior value {}",
                            index, entity_id, old
                        );
                    }
                    aggregate.histogram.record(value);
                    true
                }
                None => {
                    aggregate.histogram.record(value);
                    true
                }
            };

            if changed {
                aggregate.refresh(now);
                rows_affected += category_dao.upsert(conn, &aggregate).await?;
            }
            aggregates.push(aggregate);
        }

        match &prior {
            Some(record) => combined.revise_contribution(record.overall, rating.overall),
            None => combined.add_contribution(rating.overall),
        }
        combined.category_means = CategoryMeans(aggregates.iter().map(|a| a.mean).collect());
        combined.updated_at = now;
        rows_affected += combined_dao.upsert(conn, &combined).await?;

        let (history, useful_count, reply_count) = match &prior {
            Some(record) => (
                record.history.appended(record),
                record.useful_count,
                record.reply_count,
            ),
            None => (RateHistory::default(), 0, 0),
        };

        let record = RatingRecord {
            entity_id: entity_id.to_string(),
            author_id: author_id.to_string(),
            overall: rating.overall,
            category_values: CategoryValues(rating.categories.clone()),
            review: rating.review.clone(),
            anonymous: rating.anonymous,
            submitted_at: now,
            useful_count,
            reply_count,
            history,
        };
        rows_affected += rates_dao.upsert(conn, &record).await?;

        Ok(SubmitOutcome {
            rows_affected,
            revision: prior.is_some(),
            overall: rating.overall,
            history_len: record.history.len(),
            attempts: 1,
        })
    }

    pub async fn get_rating(
        &self,
        entity_id: &str,
        author_id: &str,
    ) -> Result<Option<RatingRecord>, RatingError> {
        Ok(self.database.rates().find(entity_id, author_id).await?)
    }

    /// Every author's current rating of an entity, most recent first
    pub async fn list_ratings(&self, entity_id: &str) -> Result<Vec<RatingRecord>, RatingError> {
        Ok(self.database.rates().find_by_entity(entity_id).await?)
    }

    /// Combined and per-category aggregates of an entity
    pub async fn entity_summary(&self, entity_id: &str) -> Result<EntitySummary, RatingError> {
        let now = Utc::now();
        let combined = self
            .database
            .combined_aggregates()
            .find(entity_id)
            .await?
            .unwrap_or_else(|| CombinedAggregate::empty(entity_id, self.config.category_count, now));

        let mut stored: HashMap<i32, CategoryAggregate> = self
            .database
            .category_aggregates()
            .find_by_entity(entity_id)
            .await?
            .into_iter()
            .map(|aggregate| (aggregate.category_index, aggregate))
            .collect();

        let categories = (0..self.config.category_count as i32)
            .map(|index| {
                stored
                    .remove(&index)
                    .unwrap_or_else(|| CategoryAggregate::empty(entity_id, index, now))
            })
            .collect();

        Ok(EntitySummary {
            combined,
            categories,
        })
    }
}

#[async_trait]
impl HealthChecker for RatingEngine {
    fn name(&self) -> &str {
        "rating"
    }

    async fn check(&self) -> HealthCheckResult {
        HealthCheckResult::healthy_with_details(serde_json::json!({
            "category_count": self.config.category_count,
            "scale": [self.config.min_rating, self.config.max_rating],
            "entities_in_flight": self.locks.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::memory_database;
    use std::time::{Duration, Instant};

    async fn engine(category_count: usize) -> RatingEngine {
        RatingEngine::new(memory_database().await, RatingConfig::new(category_count, 1, 5))
    }

    #[tokio::test]
    async fn test_first_submission_creates_aggregates() {
        let engine = engine(2).await;

        let outcome = engine
            .submit_rating("e1", "a1", &RatingSubmission::with_rates([5, 4]))
            .await
            .unwrap();

        assert!(!outcome.revision);
        assert_eq!(outcome.overall, 4.5);
        assert_eq!(outcome.history_len, 0);
        // two category rows, the combined row and the record
        assert_eq!(outcome.rows_affected, 4);

        let summary = engine.entity_summary("e1").await.unwrap();
        assert_eq!(summary.combined.rated_count, 1);
        assert_eq!(summary.combined.overall_mean, 4.5);
        assert_eq!(summary.combined.category_means, CategoryMeans(vec![5.0, 4.0]));
        assert_eq!(summary.categories[0].rated_count, 1);
        assert_eq!(summary.categories[0].mean, 5.0);
        assert_eq!(summary.categories[1].mean, 4.0);
    }

    #[tokio::test]
    async fn test_revision_only_writes_changed_categories() {
        let engine = engine(2).await;
        engine
            .submit_rating("e1", "a1", &RatingSubmission::with_rates([5, 4]))
            .await
            .unwrap();

        let outcome = engine
            .submit_rating("e1", "a1", &RatingSubmission::with_rates([3, 4]))
            .await
            .unwrap();

        assert!(outcome.revision);
        assert_eq!(outcome.history_len, 1);
        // one category row, the combined row and the record
        assert_eq!(outcome.rows_affected, 3);

        let summary = engine.entity_summary("e1").await.unwrap();
        assert_eq!(summary.combined.rated_count, 1);
        assert_eq!(summary.combined.overall_mean, 3.5);
        assert_eq!(summary.categories[0].histogram.count(5), 0);
        assert_eq!(summary.categories[0].histogram.count(3), 1);
        assert_eq!(summary.categories[0].mean, 3.0);
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let engine = engine(2).await;

        let err = engine
            .submit_rating("e1", "a1", &RatingSubmission::with_rates([7, 4]))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::Validation(_)));
        assert!(!err.is_retryable());

        assert!(engine.database.combined_aggregates().find("e1").await.unwrap().is_none());
        assert!(engine.get_rating("e1", "a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rolled_back_attempt_then_retry_counts_once() {
        let engine = engine(2).await;
        let submission = RatingSubmission::with_rates([5, 4]);
        let rating = validate_submission(engine.config(), "e1", "a1", &submission).unwrap();

        let txn = engine.database.connection().begin().await.unwrap();
        engine.apply(&txn, "e1", "a1", &rating).await.unwrap();
        txn.rollback().await.unwrap();

        assert!(engine.get_rating("e1", "a1").await.unwrap().is_none());

        engine
            .submit_with_retry("e1", "a1", &submission)
            .await
            .unwrap();

        let summary = engine.entity_summary("e1").await.unwrap();
        assert_eq!(summary.combined.rated_count, 1);
        assert_eq!(summary.categories[0].rated_count, 1);
        assert_eq!(summary.categories[1].histogram.count(4), 1);
    }

    /// Makes every rating insert fail as lock contention while the switch row exists
    async fn install_contention(engine: &RatingEngine) {
        let conn = engine.database.connection();
        conn.execute_unprepared("CREATE TABLE contention_switch (id INTEGER)")
            .await
            .unwrap();
        conn.execute_unprepared("INSERT INTO contention_switch VALUES (1)")
            .await
            .unwrap();
        conn.execute_unprepared(
            "CREATE TRIGGER contended_rates BEFORE INSERT ON rates \
             WHEN EXISTS (SELECT 1 FROM contention_switch) \
             BEGIN SELECT RAISE(ABORT, 'database is locked'); END",
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_retry_replays_after_conflict_and_counts_once() {
        let database = memory_database().await;
        let mut config = RatingConfig::new(2, 1, 5);
        config.retry_backoff_ms = 20;
        config.max_retries = 10;
        let engine = Arc::new(RatingEngine::new(database, config));
        install_contention(&engine).await;

        let err = engine
            .submit_rating("e1", "a1", &RatingSubmission::with_rates([5, 4]))
            .await
            .unwrap_err();
        assert!(matches!(err, RatingError::Conflict(_)));
        assert!(engine.get_rating("e1", "a1").await.unwrap().is_none());

        let releaser = engine.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            releaser
                .database
                .connection()
                .execute_unprepared("DELETE FROM contention_switch")
                .await
                .unwrap();
        });

        let outcome = engine
            .submit_with_retry("e1", "a1", &RatingSubmission::with_rates([5, 4]))
            .await
            .unwrap();
        assert!(outcome.attempts >= 2);
        assert!(!outcome.revision);

        let summary = engine.entity_summary("e1").await.unwrap();
        assert_eq!(summary.combined.rated_count, 1);
        assert_eq!(summary.combined.overall_mean, 4.5);
        assert_eq!(summary.categories[0].histogram.total(), 1);
        assert_eq!(summary.categories[1].histogram.count(4), 1);
        assert_eq!(engine.list_ratings("e1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let database = memory_database().await;
        let mut config = RatingConfig::new(1, 1, 5);
        config.retry_backoff_ms = 10;
        config.max_retries = 3;
        let engine = RatingEngine::new(database, config);
        install_contention(&engine).await;

        let started = Instant::now();
        let err = engine
            .submit_with_retry("e1", "a1", &RatingSubmission::with_rate(3))
            .await
            .unwrap_err();

        assert!(matches!(err, RatingError::Conflict(_)));
        // three backoffs of 10, 20 and 30 ms before the fourth and last attempt
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert!(engine.database.combined_aggregates().find("e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_retryable_storage_error_is_not_replayed() {
        let database = memory_database().await;
        let mut config = RatingConfig::new(1, 1, 5);
        config.retry_backoff_ms = 1_000;
        let engine = RatingEngine::new(database, config);
        engine
            .database
            .connection()
            .execute_unprepared("DROP TABLE rate_combined_aggregates")
            .await
            .unwrap();

        let started = Instant::now();
        let err = engine
            .submit_with_retry("e1", "a1", &RatingSubmission::with_rate(3))
            .await
            .unwrap_err();

        assert!(matches!(err, RatingError::Internal(_)));
        assert!(started.elapsed() < Duration::from_millis(1_000));
    }

    #[tokio::test]
    async fn test_cancelled_submissions_leave_consistent_state() {
        let engine = Arc::new(engine(2).await);

        for round in 0..200u64 {
            let author = format!("a{}", round % 17);
            let value = (round % 5) as i32 + 1;
            let submission = RatingSubmission::with_rates([value, 6 - value]);
            let _ = tokio::time::timeout(
                Duration::from_micros((round % 40) * 25),
                engine.submit_rating("e1", &author, &submission),
            )
            .await;
        }

        // The database is still there and accepts writes
        engine
            .submit_rating("e1", "last", &RatingSubmission::with_rates([5, 5]))
            .await
            .unwrap();

        let records = engine.list_ratings("e1").await.unwrap();
        let summary = engine.entity_summary("e1").await.unwrap();
        assert_eq!(summary.combined.rated_count, records.len() as i64);

        for (index, category) in summary.categories.iter().enumerate() {
            assert_eq!(category.histogram.total(), records.len() as i64);
            for value in 1..=5 {
                let stored = records
                    .iter()
                    .filter(|record| record.category_values.get(index) == Some(value))
                    .count() as i64;
                assert_eq!(category.histogram.count(value), stored);
            }
        }

        let mean = records.iter().map(|record| record.overall).sum::<f64>() / records.len() as f64;
        assert!((summary.combined.overall_mean - mean).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_health_reports_configuration() {
        let engine = engine(2).await;
        let result = engine.check().await;
        let details = result.details.unwrap();
        assert_eq!(details["category_count"], 2);
        assert_eq!(details["scale"], serde_json::json!([1, 5]));
        assert_eq!(details["entities_in_flight"], 0);
    }

    #[tokio::test]
    async fn test_summary_of_unrated_entity_is_zeroed() {
        let engine = engine(3).await;
        let summary = engine.entity_summary("nobody").await.unwrap();
        assert_eq!(summary.combined.rated_count, 0);
        assert_eq!(summary.combined.category_means, CategoryMeans(vec![0.0; 3]));
        assert_eq!(summary.categories.len(), 3);
        assert!(summary.categories.iter().all(|c| c.rated_count == 0));
    }

    #[tokio::test]
    async fn test_grown_category_count_treats_new_index_as_first_time() {
        let database = memory_database().await;

        let narrow = RatingEngine::new(database.clone(), RatingConfig::new(1, 1, 5));
        narrow
            .submit_rating("e1", "a1", &RatingSubmission::with_rate(4))
            .await
            .unwrap();

        let wide = RatingEngine::new(database, RatingConfig::new(2, 1, 5));
        let outcome = wide
            .submit_rating("e1", "a1", &RatingSubmission::with_rates([4, 2]))
            .await
            .unwrap();
        assert!(outcome.revision);

        let summary = wide.entity_summary("e1").await.unwrap();
        assert_eq!(summary.combined.rated_count, 1);
        assert_eq!(summary.combined.overall_mean, 3.0);
        assert_eq!(summary.categories[0].rated_count, 1);
        assert_eq!(summary.categories[1].rated_count, 1);
        assert_eq!(summary.categories[1].mean, 2.0);
    }
}
