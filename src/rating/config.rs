use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Rating scale and category layout of a deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingConfig {
    /// Number of independently tracked categories per entity
    #[serde(default = "default_category_count")]
    pub category_count: usize,
    #[serde(default = "default_min_rating")]
    pub min_rating: i32,
    #[serde(default = "default_max_rating")]
    pub max_rating: i32,
    #[serde(default = "default_max_review_length")]
    pub max_review_length: usize,
    /// Extra attempts after a retryable failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_category_count() -> usize {
    1
}

fn default_min_rating() -> i32 {
    1
}

fn default_max_rating() -> i32 {
    5
}

fn default_max_review_length() -> usize {
    1000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    25
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            category_count: default_category_count(),
            min_rating: default_min_rating(),
            max_rating: default_max_rating(),
            max_review_length: default_max_review_length(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl RatingConfig {
    /// Convenience constructor for a scale and category count
    pub fn new(category_count: usize, min_rating: i32, max_rating: i32) -> Self {
        Self {
            category_count,
            min_rating,
            max_rating,
            ..Default::default()
        }
    }

    pub fn accepts(&self, value: i32) -> bool {
        (self.min_rating..=self.max_rating).contains(&value)
    }

    /// Delay before the given retry attempt (1-based)
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(attempt as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RatingConfig::default();
        assert_eq!(config.category_count, 1);
        assert!(config.accepts(1));
        assert!(config.accepts(5));
        assert!(!config.accepts(0));
        assert!(!config.accepts(6));
    }

    #[test]
    fn test_retry_delay_is_linear() {
        let config = RatingConfig {
            retry_backoff_ms: 10,
            ..Default::default()
        };
        assert_eq!(config.retry_delay(1), Duration::from_millis(10));
        assert_eq!(config.retry_delay(3), Duration::from_millis(30));
    }
}
