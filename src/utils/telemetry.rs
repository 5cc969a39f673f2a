// file: src/utils/telemetry.rs
// description: component health checks and operation timing
// reference: internal observability conventions

use crate::database::VectorStore;
use crate::embedding::Embedder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn icon(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "✓",
            HealthStatus::Degraded => "⚠",
            HealthStatus::Unhealthy => "✗",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheck {
    pub component: String,
    pub status: HealthStatus,
    pub message: Option<String>,
    pub response_time_ms: u64,
}

impl HealthCheck {
    fn with_status(
        component: &str,
        status: HealthStatus,
        message: Option<String>,
        response_time: Duration,
    ) -> Self {
        Self {
            component: component.to_string(),
            status,
            message,
            response_time_ms: response_time.as_millis() as u64,
        }
    }

    pub fn healthy(component: &str, message: Option<String>, response_time: Duration) -> Self {
        Self::with_status(component, HealthStatus::Healthy, message, response_time)
    }

    pub fn degraded(component: &str, message: String, response_time: Duration) -> Self {
        Self::with_status(component, HealthStatus::Degraded, Some(message), response_time)
    }

    pub fn unhealthy(component: &str, message: String, response_time: Duration) -> Self {
        Self::with_status(component, HealthStatus::Unhealthy, Some(message), response_time)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub overall_status: HealthStatus,
    pub checks: Vec<HealthCheck>,
    pub timestamp: i64,
    pub version: String,
}

impl HealthReport {
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let overall_status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            overall_status,
            checks,
            timestamp: chrono::Utc::now().timestamp(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn format(&self) -> String {
        let mut output = format!(
            "{} System Health: {:?}\nVersion: {}\nTimestamp: {}\n\n",
            self.overall_status.icon(),
            self.overall_status,
            self.version,
            chrono::DateTime::from_timestamp(self.timestamp, 0)
                .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "unknown".to_string())
        );

        for check in &self.checks {
            output.push_str(&format!(
                "{} {} ({:?}) - {}ms",
                check.status.icon(),
                check.component,
                check.status,
                check.response_time_ms
            ));

            if let Some(ref msg) = check.message {
                output.push_str(&format!("\n  {}", msg));
            }

            output.push('\n');
        }

        output
    }
}

/// Checks the store, the embedder and the generator. `probe_embedder`
/// sends a real embedding request, which costs a remote call for API
/// providers.
pub async fn system_health(
    store: Option<&Arc<dyn VectorStore>>,
    embedder: &Arc<dyn Embedder>,
    generator_model: Option<&str>,
    probe_embedder: bool,
) -> HealthReport {
    let mut checks = Vec::with_capacity(3);

    let start = Instant::now();
    checks.push(match store {
        Some(store) => match store.count().await {
            Ok(count) => HealthCheck::healthy(
                "vector_store",
                Some(format!("{} backend, {} records", store.backend().as_str(), count)),
                start.elapsed(),
            ),
            Err(e) => HealthCheck::unhealthy("vector_store", e.to_string(), start.elapsed()),
        },
        None => HealthCheck::degraded(
            "vector_store",
            "persistence disabled".to_string(),
            start.elapsed(),
        ),
    });

    let start = Instant::now();
    let description = match embedder.dimension() {
        Some(dim) => format!("{} ({} dimensions)", embedder.name(), dim),
        None => format!("{} (variable dimension, retrieval unsupported)", embedder.name()),
    };
    checks.push(if probe_embedder {
        match embedder.embed("health check").await {
            Ok(_) => HealthCheck::healthy("embedder", Some(description), start.elapsed()),
            Err(e) => HealthCheck::unhealthy(
                "embedder",
                format!("{}: {}", description, e),
                start.elapsed(),
            ),
        }
    } else {
        HealthCheck::healthy("embedder", Some(description), start.elapsed())
    });

    checks.push(match generator_model {
        Some(model) => HealthCheck::healthy("generator", Some(model.to_string()), Duration::ZERO),
        None => HealthCheck::degraded(
            "generator",
            "no API key configured, answers disabled".to_string(),
            Duration::ZERO,
        ),
    });

    HealthReport::new(checks)
}

/// Operation timer for performance tracking
pub struct OperationTimer {
    operation: String,
    start: Instant,
}

impl OperationTimer {
    pub fn new(operation: &str) -> Self {
        info!("Starting operation: {}", operation);
        Self {
            operation: operation.to_string(),
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(self) -> Duration {
        let elapsed = self.elapsed();
        info!(
            "Completed operation: {} in {:.2}s",
            self.operation,
            elapsed.as_secs_f64()
        );
        elapsed
    }

    pub fn finish_with_count(self, count: usize) -> PerformanceMetrics {
        let metrics = PerformanceMetrics::new(&self.operation, count, self.elapsed());
        info!("Completed operation: {}", metrics.format());
        metrics
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub operation: String,
    pub count: usize,
    pub duration_ms: u64,
    /// items per second
    pub throughput: f64,
    pub avg_item_time_ms: f64,
}

impl PerformanceMetrics {
    pub fn new(operation: &str, count: usize, duration: Duration) -> Self {
        let duration_ms = duration.as_millis() as u64;
        let duration_secs = duration.as_secs_f64();

        let throughput = if duration_secs > 0.0 {
            count as f64 / duration_secs
        } else {
            0.0
        };

        let avg_item_time_ms = if count > 0 {
            duration_ms as f64 / count as f64
        } else {
            0.0
        };

        Self {
            operation: operation.to_string(),
            count,
            duration_ms,
            throughput,
            avg_item_time_ms,
        }
    }

    pub fn format(&self) -> String {
        format!(
            "{}: {} items in {}ms ({:.2} items/sec, {:.2}ms per item)",
            self.operation, self.count, self.duration_ms, self.throughput, self.avg_item_time_ms
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::embedding::HashingEmbedder;

    #[test]
    fn test_health_report_overall_status() {
        let checks = vec![
            HealthCheck::healthy("db", None, Duration::from_millis(10)),
            HealthCheck::degraded("cache", "slow".to_string(), Duration::from_millis(100)),
        ];

        let report = HealthReport::new(checks);
        assert_eq!(report.overall_status, HealthStatus::Degraded);
        assert!(report.format().contains("cache"));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&HealthStatus::Unhealthy).unwrap();
        assert_eq!(json, "\"unhealthy\"");
    }

    #[test]
    fn test_performance_metrics() {
        let metrics = PerformanceMetrics::new("test_op", 100, Duration::from_secs(10));
        assert_eq!(metrics.count, 100);
        assert_eq!(metrics.throughput, 10.0);
        assert_eq!(metrics.avg_item_time_ms, 100.0);
    }

    #[test]
    fn test_timer_finish_reports_elapsed() {
        let timer = OperationTimer::new("index");
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.finish() >= Duration::from_millis(5));
    }

    #[tokio::test]
    async fn test_system_health_with_memory_store() {
        let store: Arc<dyn VectorStore> = Arc::new(MemoryStore::new());
        let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(8));

        let report = system_health(Some(&store), &embedder, Some("chat-model"), true).await;
        assert_eq!(report.overall_status, HealthStatus::Healthy);
        assert_eq!(report.checks.len(), 3);

        let report = system_health(None, &embedder, None, false).await;
        assert_eq!(report.overall_status, HealthStatus::Degraded);
    }
}
