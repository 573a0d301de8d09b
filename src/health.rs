use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

pub const SERVICE_NAME: &str = "rating-aggregator";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub duration_ms: Option<u64>,
}

impl HealthCheckResult {
    fn with_status(status: HealthStatus, message: Option<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            status,
            message,
            details,
            duration_ms: None,
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(HealthStatus::Healthy, None, None)
    }

    pub fn healthy_with_details(details: serde_json::Value) -> Self {
        Self::with_status(HealthStatus::Healthy, None, Some(details))
    }

    pub fn degraded(message: String) -> Self {
        Self::with_status(HealthStatus::Degraded, Some(message), None)
    }

    pub fn unhealthy(message: String) -> Self {
        Self::with_status(HealthStatus::Unhealthy, Some(message), None)
    }

    pub fn unhealthy_with_details(message: String, details: serde_json::Value) -> Self {
        Self::with_status(HealthStatus::Unhealthy, Some(message), Some(details))
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }
}

#[async_trait]
pub trait HealthChecker: Send + Sync {
    /// The name of this health check component
    fn name(&self) -> &str;

    /// Perform the health check
    async fn check(&self) -> HealthCheckResult;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverallHealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    pub timestamp: String,
    pub checks: HashMap<String, HealthCheckResult>,
    pub summary: HealthSummary,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthSummary {
    pub total_checks: usize,
    pub healthy_count: usize,
    pub degraded_count: usize,
    pub unhealthy_count: usize,
    pub total_duration_ms: u64,
}

impl HealthSummary {
    fn add(&mut self, result: &HealthCheckResult) {
        self.total_checks += 1;
        self.total_duration_ms += result.duration_ms.unwrap_or(0);
        match result.status {
            HealthStatus::Healthy => self.healthy_count += 1,
            HealthStatus::Degraded => self.degraded_count += 1,
            HealthStatus::Unhealthy => self.unhealthy_count += 1,
        }
    }

    /// Worst status wins
    fn status(&self) -> HealthStatus {
        if self.unhealthy_count > 0 {
            HealthStatus::Unhealthy
        } else if self.degraded_count > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

pub struct HealthService {
    checkers: Arc<RwLock<HashMap<String, Arc<dyn HealthChecker>>>>,
}

impl HealthService {
    pub fn new() -> Self {
        Self {
            checkers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a health checker for a specific component
    pub async fn register(&self, checker: Arc<dyn HealthChecker>) {
        let name = checker.name().to_string();
        self.checkers.write().await.insert(name, checker);
    }

    /// Run all checks (`all`), a single named one, or none for a liveness probe
    pub async fn check_health(&self, filter: Option<&str>) -> OverallHealthResponse {
        let checkers = self.checkers.read().await;

        let selected: Vec<_> = match filter {
            Some("all") => checkers.iter().collect(),
            Some(specific) => checkers
                .iter()
                .filter(|(name, _)| name.as_str() == specific)
                .collect(),
            None => vec![],
        };

        let mut results = HashMap::new();
        let mut summary = HealthSummary::default();
        for (name, checker) in selected {
            let start = Instant::now();
            let result = checker
                .check()
                .await
                .with_duration(start.elapsed().as_millis() as u64);
            summary.add(&result);
            results.insert(name.clone(), result);
        }

        OverallHealthResponse {
            status: summary.status(),
            service: SERVICE_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            checks: results,
            summary,
        }
    }

    pub async fn get_registered_checkers(&self) -> Vec<String> {
        self.checkers.read().await.keys().cloned().collect()
    }
}

impl Default for HealthService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedChecker {
        name: &'static str,
        result: HealthCheckResult,
    }

    #[async_trait]
    impl HealthChecker for FixedChecker {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> HealthCheckResult {
            self.result.clone()
        }
    }

    fn checker(name: &'static str, result: HealthCheckResult) -> Arc<dyn HealthChecker> {
        Arc::new(FixedChecker { name, result })
    }

    #[tokio::test]
    async fn test_register_and_check_healthy() {
        let service = HealthService::new();
        service
            .register(checker("database", HealthCheckResult::healthy_with_details(json!({"connection": "ok"}))))
            .await;

        let checkers = service.get_registered_checkers().await;
        assert_eq!(checkers, vec!["database".to_string()]);

        let response = service.check_health(Some("all")).await;
        assert_eq!(response.status, HealthStatus::Healthy);
        assert_eq!(response.service, SERVICE_NAME);
        assert_eq!(response.summary.total_checks, 1);
        assert_eq!(response.summary.healthy_count, 1);
    }

    #[tokio::test]
    async fn test_worst_status_wins() {
        let service = HealthService::new();
        service.register(checker("a", HealthCheckResult::healthy())).await;
        service
            .register(checker("b", HealthCheckResult::degraded("slow".to_string())))
            .await;
        service
            .register(checker("c", HealthCheckResult::unhealthy("down".to_string())))
            .await;

        let response = service.check_health(Some("all")).await;
        assert_eq!(response.status, HealthStatus::Unhealthy);
        assert_eq!(response.summary.total_checks, 3);
        assert_eq!(response.summary.degraded_count, 1);
        assert_eq!(response.summary.unhealthy_count, 1);
    }

    #[tokio::test]
    async fn test_specific_and_empty_filters() {
        let service = HealthService::new();
        service.register(checker("database", HealthCheckResult::healthy())).await;
        service
            .register(checker("rating", HealthCheckResult::degraded("busy".to_string())))
            .await;

        let response = service.check_health(Some("database")).await;
        assert_eq!(response.status, HealthStatus::Healthy);
        assert!(response.checks.contains_key("database"));
        assert!(!response.checks.contains_key("rating"));

        let response = service.check_health(None).await;
        assert_eq!(response.summary.total_checks, 0);
        assert!(response.checks.is_empty());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_value(HealthCheckResult::healthy().with_duration(3)).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["duration_ms"], 3);
        assert!(json.get("message").is_none());
    }
}
