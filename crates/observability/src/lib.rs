// crates/observability/src/lib.rs

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

pub mod metrics;

use metrics::{MetricType, Metrics};

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: true,
            service_name: "livecap".to_string(),
        }
    }
}

/// Metrics collector shared across the service components.
pub struct MetricsCollector {
    config: ObservabilityConfig,
    metrics: Arc<Metrics>,
    start_time: Instant,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::with_config(ObservabilityConfig::default())
    }

    pub fn with_config(config: ObservabilityConfig) -> Self {
        Self {
            config,
            metrics: Arc::new(Metrics::new()),
            start_time: Instant::now(),
        }
    }

    pub fn record(&self, metric: MetricType, value: f64) {
        self.metrics.record(metric, value);
    }

    pub fn add(&self, metric: MetricType, value: f64) {
        self.metrics.add(metric, value);
    }

    pub fn increment(&self, metric: MetricType) {
        self.metrics.increment(metric);
    }

    pub fn get(&self, metric: MetricType) -> Option<f64> {
        self.metrics.get(metric)
    }

    pub fn get_prometheus_metrics(&self) -> String {
        if !self.config.metrics_enabled {
            return String::new();
        }
        self.metrics.encode_prometheus()
    }

    pub fn get_health_status(&self) -> HealthStatus {
        HealthStatus {
            healthy: true,
            uptime_seconds: self.start_time.elapsed().as_secs(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            metrics: self.metrics.get_summary(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub healthy: bool,
    pub uptime_seconds: u64,
    pub version: String,
    pub metrics: MetricsSummary,
}

#[derive(Debug, Serialize)]
pub struct MetricsSummary {
    pub sessions_started: u64,
    pub segments_created: u64,
    pub transcriptions_completed: u64,
    pub sentiment_points_ingested: u64,
    pub alerts_raised: u64,
    pub errors: u64,
}
