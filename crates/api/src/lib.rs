// crates/api/src/lib.rs

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use bytes::Bytes;
use livecap_captions::SessionOptions;
use livecap_config::ApiConfig;
use livecap_core::{CaptionSegment, CaptionStyle, LivecapError, LivecapResult, SentimentAlert};
use livecap_export::ExportFormat;
use livecap_sentiment::{AnalysisEvent, SentimentSummary, TimeWindow};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

pub mod handlers;
pub mod websocket;

pub use handlers::ApiHandlers;

const DEFAULT_HISTORY_LIMIT: usize = 50;

/// HTTP and WebSocket front door for the caption pipeline.
pub struct ApiServer {
    config: ApiConfig,
    handlers: Arc<ApiHandlers>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, handlers: Arc<ApiHandlers>) -> Self {
        Self { config, handlers }
    }

    pub async fn serve(self) -> LivecapResult<()> {
        let addr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| LivecapError::Network(format!("Invalid address: {}", e)))?;
        let app = self.router();

        info!("API server listening on {}", addr);

        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .map_err(|e| LivecapError::Network(e.to_string()))?;

        Ok(())
    }

    pub fn router(&self) -> Router {
        let mut app = Router::new()
            .route("/health", get(health_check))
            .route("/ready", get(readiness_check))
            .route("/metrics", get(metrics_handler))
            .route("/sessions/:id/start", post(start_session))
            .route("/sessions/:id/end", post(end_session))
            .route("/sessions/:id/audio", post(ingest_audio))
            .route("/sessions/:id/history", get(caption_history))
            .route("/sessions/:id/export", get(export_session))
            .route("/sessions/:id/style", post(update_style))
            .route("/sessions/:id/speaker-color", post(set_speaker_color))
            .route("/sessions/:id/languages", post(add_language))
            .route("/sessions/:id/languages/:language", delete(remove_language))
            .route("/sessions/:id/sentiment", post(ingest_sentiment))
            .route("/sessions/:id/sentiment/summary", get(sentiment_summary))
            .route("/sessions/:id/alerts", get(list_alerts))
            .route("/sessions/:id/alerts/:alert_id/ack", post(acknowledge_alert))
            .route("/live/:id", get(live_stream))
            .with_state(self.handlers.clone());

        if self.config.cors_enabled {
            app = app.layer(CorsLayer::permissive());
        }

        app
    }
}

/// Maps the domain error contract onto HTTP statuses; everything the
/// handlers return flows through here.
struct ApiError(LivecapError);

impl From<LivecapError> for ApiError {
    fn from(e: LivecapError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            LivecapError::NotFound(_) => StatusCode::NOT_FOUND,
            LivecapError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(serde_json::json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

async fn health_check(State(handlers): State<Arc<ApiHandlers>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "detail": handlers.metrics.get_health_status(),
        "timestamp": chrono::Utc::now(),
    }))
}

async fn readiness_check(State(handlers): State<Arc<ApiHandlers>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "ready": true,
        "live_sessions": handlers.captions.live_session_count(),
        "timestamp": chrono::Utc::now(),
    }))
}

async fn metrics_handler(State(handlers): State<Arc<ApiHandlers>>) -> impl IntoResponse {
    handlers.get_metrics().await
}

async fn start_session(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    options: Option<Json<SessionOptions>>,
) -> impl IntoResponse {
    let Json(options) = options.unwrap_or_default();
    handlers.captions.start_session(&session_id, options);

    Json(serde_json::json!({
        "session_id": session_id,
        "language": handlers.captions.session_language(&session_id),
    }))
}

async fn end_session(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let total_segments = handlers.captions.end_session(&session_id)?;
    handlers.sentiment.remove_session(&session_id);

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "total_segments": total_segments,
    })))
}

async fn ingest_audio(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ApiError> {
    let segment = handlers.captions.process_audio_chunk(&session_id, body).await?;
    Ok(Json(serde_json::json!({ "segment": segment })))
}

#[derive(Deserialize)]
struct HistoryQuery {
    limit: Option<usize>,
}

async fn caption_history(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<CaptionSegment>>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let segments = handlers.captions.caption_history(&session_id, limit).await?;
    Ok(Json(segments))
}

#[derive(Deserialize)]
struct ExportQuery {
    format: Option<String>,
}

async fn export_session(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let format = ExportFormat::parse(query.format.as_deref().unwrap_or("srt"))?;
    let segments = handlers
        .captions
        .caption_history(&session_id, usize::MAX)
        .await?;
    let document = livecap_export::render(&segments, format)?;

    let content_type = match format {
        ExportFormat::Srt => "application/x-subrip",
        ExportFormat::Vtt => "text/vtt",
        ExportFormat::Txt => "text/plain; charset=utf-8",
        ExportFormat::Json => "application/json",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], document).into_response())
}

async fn update_style(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    Json(style): Json<CaptionStyle>,
) -> Result<StatusCode, ApiError> {
    handlers.captions.update_style(&session_id, style)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct SpeakerColorRequest {
    speaker: String,
    color: String,
}

async fn set_speaker_color(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    Json(request): Json<SpeakerColorRequest>,
) -> Result<StatusCode, ApiError> {
    handlers
        .captions
        .set_speaker_color(&session_id, &request.speaker, &request.color)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct LanguageRequest {
    language: String,
}

async fn add_language(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    Json(request): Json<LanguageRequest>,
) -> Result<StatusCode, ApiError> {
    handlers
        .captions
        .add_target_language(&session_id, &request.language)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_language(
    State(handlers): State<Arc<ApiHandlers>>,
    Path((session_id, language)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    handlers
        .captions
        .remove_target_language(&session_id, &language)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ingest_sentiment(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    Json(event): Json<AnalysisEvent>,
) -> Json<Vec<SentimentAlert>> {
    let alerts = handlers.sentiment.ingest(&session_id, event).await;
    Json(alerts)
}

#[derive(Deserialize)]
struct SummaryQuery {
    window: Option<String>,
}

async fn sentiment_summary(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SentimentSummary>, ApiError> {
    let window = TimeWindow::parse(query.window.as_deref().unwrap_or("all"))?;
    Ok(Json(handlers.sentiment.summary(&session_id, window)))
}

async fn list_alerts(
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
) -> Json<Vec<SentimentAlert>> {
    Json(handlers.sentiment.alerts(&session_id))
}

async fn acknowledge_alert(
    State(handlers): State<Arc<ApiHandlers>>,
    Path((session_id, alert_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError> {
    handlers.sentiment.acknowledge_alert(&session_id, alert_id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn live_stream(
    ws: WebSocketUpgrade,
    State(handlers): State<Arc<ApiHandlers>>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket::handle_live_stream(socket, session_id, handlers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use livecap_fanout::FanoutHub;
    use livecap_observability::MetricsCollector;
    use livecap_push::LogPushSender;
    use livecap_sentiment::{SentimentConfig, SentimentEngine};
    use livecap_storage::{MemorySegmentStore, SegmentStore};
    use livecap_transcribe::{Transcriber, TranscriberConfig, TranscriptionBackend};
    use tower::ServiceExt;

    struct FixedBackend(String);

    #[async_trait]
    impl TranscriptionBackend for FixedBackend {
        async fn transcribe(&self, _audio: &[u8], _language: &str) -> LivecapResult<String> {
            Ok(self.0.clone())
        }
    }

    fn test_router(transcript: &str) -> Router {
        let metrics = Arc::new(MetricsCollector::new());
        let hub = Arc::new(FanoutHub::new());
        let transcriber = Arc::new(Transcriber::with_backend(
            TranscriberConfig::default(),
            Box::new(FixedBackend(transcript.to_string())),
        ));
        let captions = Arc::new(livecap_captions::CaptionService::new(
            livecap_captions::CaptionConfig {
                buffer_threshold_bytes: 100,
                ..Default::default()
            },
            transcriber,
            Arc::new(MemorySegmentStore::new()) as Arc<dyn SegmentStore>,
            hub.clone(),
            metrics.clone(),
        ));
        let sentiment = Arc::new(SentimentEngine::new(
            SentimentConfig::default(),
            hub.clone(),
            Arc::new(LogPushSender::new()),
            metrics.clone(),
        ));
        let handlers = Arc::new(ApiHandlers::new(captions, sentiment, hub, metrics));

        ApiServer::new(ApiConfig::default(), handlers).router()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let app = test_router("hello");
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn session_lifecycle_over_http() {
        let app = test_router("welcome everyone");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions/m1/start")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Enough audio to cross the 100 byte test threshold in one call.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions/m1/audio")
                    .body(Body::from(vec![0u8; 150]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["segment"]["text"], "welcome everyone");

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sessions/m1/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let history = body_json(response).await;
        assert_eq!(history.as_array().expect("array").len(), 1);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions/m1/end")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = body_json(response).await;
        assert_eq!(body["total_segments"], 1);
    }

    #[tokio::test]
    async fn mutations_on_unknown_sessions_return_404() {
        let app = test_router("hello");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions/ghost/end")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn export_rejects_unknown_formats() {
        let app = test_router("hello");
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sessions/m1/export?format=badformat")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // An ended or never-started session still exports its durable
        // history, which is empty here.
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/m1/export?format=vtt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&bytes[..], b"WEBVTT\n\n");
    }

    #[tokio::test]
    async fn sentiment_ingest_and_summary_over_http() {
        let app = test_router("hello");

        let event = serde_json::json!({
            "sentiment": {"positive": 0.7, "negative": 0.1, "neutral": 0.2, "overall": 0.6},
            "engagement": 0.8,
            "speaker": "Ana",
            "text": "this is great",
        });
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/sessions/m1/sentiment")
                    .header("content-type", "application/json")
                    .body(Body::from(event.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/sessions/m1/sentiment/summary?window=5min")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let summary = body_json(response).await;
        assert_eq!(summary["point_count"], 1);
        assert_eq!(summary["speakers"][0], "Ana");

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/sessions/m1/sentiment/summary?window=lately")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
