// src/app.rs

use std::sync::Arc;

use livecap_api::{ApiHandlers, ApiServer};
use livecap_captions::CaptionService;
use livecap_config::LivecapConfig;
use livecap_core::{LivecapError, LivecapResult};
use livecap_fanout::FanoutHub;
use livecap_observability::MetricsCollector;
use livecap_push::LogPushSender;
use livecap_sentiment::SentimentEngine;
use livecap_storage::{MemorySegmentStore, SegmentStore};
use livecap_transcribe::Transcriber;
use tokio::signal;
use tracing::{error, info};

/// Owns the assembled service graph for one process.
pub struct LivecapApp {
    captions: Arc<CaptionService>,
    sentiment: Arc<SentimentEngine>,
    api_server: ApiServer,
}

impl LivecapApp {
    pub fn new(config: LivecapConfig) -> LivecapResult<Self> {
        info!("Initializing livecap components...");

        let metrics = Arc::new(MetricsCollector::with_config(config.observability.clone()));
        let hub = Arc::new(FanoutHub::with_config(config.fanout.clone()));
        let store = Arc::new(MemorySegmentStore::new()) as Arc<dyn SegmentStore>;
        let push = Arc::new(LogPushSender::new());
        let transcriber = Arc::new(Transcriber::new(config.transcriber.clone())?);

        let captions = Arc::new(CaptionService::new(
            config.captions.clone(),
            transcriber,
            store,
            hub.clone(),
            metrics.clone(),
        ));
        let sentiment = Arc::new(SentimentEngine::new(
            config.sentiment.clone(),
            hub.clone(),
            push,
            metrics.clone(),
        ));

        let handlers = Arc::new(ApiHandlers::new(
            captions.clone(),
            sentiment.clone(),
            hub,
            metrics,
        ));
        let api_server = ApiServer::new(config.api.clone(), handlers);

        Ok(Self {
            captions,
            sentiment,
            api_server,
        })
    }

    pub async fn run(self) -> LivecapResult<()> {
        let Self {
            captions,
            sentiment,
            api_server,
        } = self;

        let server = tokio::spawn(async move {
            if let Err(e) = api_server.serve().await {
                error!("API server error: {}", e);
            }
        });

        Self::wait_for_shutdown().await?;

        server.abort();
        info!(
            "Shutting down with {} live sessions and {} tracked sentiment sessions",
            captions.live_session_count(),
            sentiment.tracked_session_count()
        );

        Ok(())
    }

    async fn wait_for_shutdown() -> LivecapResult<()> {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                Ok(())
            }
            Err(e) => {
                error!("Failed to listen for shutdown signal: {}", e);
                Err(LivecapError::Unknown(e.to_string()))
            }
        }
    }
}
