// crates/api/src/handlers.rs

use std::sync::Arc;

use livecap_captions::CaptionService;
use livecap_fanout::FanoutHub;
use livecap_observability::MetricsCollector;
use livecap_sentiment::SentimentEngine;

/// Shared handler state behind the router. Owns nothing itself; every
/// field is a handle into the service graph wired up at startup.
pub struct ApiHandlers {
    pub(crate) captions: Arc<CaptionService>,
    pub(crate) sentiment: Arc<SentimentEngine>,
    pub(crate) hub: Arc<FanoutHub>,
    pub(crate) metrics: Arc<MetricsCollector>,
}

impl ApiHandlers {
    pub fn new(
        captions: Arc<CaptionService>,
        sentiment: Arc<SentimentEngine>,
        hub: Arc<FanoutHub>,
        metrics: Arc<MetricsCollector>,
    ) -> Self {
        Self {
            captions,
            sentiment,
            hub,
            metrics,
        }
    }

    pub async fn get_metrics(&self) -> String {
        self.metrics.get_prometheus_metrics()
    }
}
