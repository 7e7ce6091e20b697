// tests/api_integration.rs

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use livecap_api::{ApiHandlers, ApiServer};
use livecap_captions::{CaptionConfig, CaptionService};
use livecap_config::ApiConfig;
use livecap_core::LivecapResult;
use livecap_fanout::FanoutHub;
use livecap_observability::MetricsCollector;
use livecap_push::LogPushSender;
use livecap_sentiment::{SentimentConfig, SentimentEngine};
use livecap_storage::{MemorySegmentStore, SegmentStore};
use livecap_transcribe::{Transcriber, TranscriberConfig, TranscriptionBackend};
use tower::ServiceExt;

struct FixedBackend(&'static str);

#[async_trait]
impl TranscriptionBackend for FixedBackend {
    async fn transcribe(&self, _audio: &[u8], _language: &str) -> LivecapResult<String> {
        Ok(self.0.to_string())
    }
}

fn router(transcript: &'static str) -> Router {
    let metrics = Arc::new(MetricsCollector::new());
    let hub = Arc::new(FanoutHub::new());
    let captions = Arc::new(CaptionService::new(
        CaptionConfig::default(),
        Arc::new(Transcriber::with_backend(
            TranscriberConfig::default(),
            Box::new(FixedBackend(transcript)),
        )),
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

    ApiServer::new(
        ApiConfig::default(),
        Arc::new(ApiHandlers::new(captions, sentiment, hub, metrics)),
    )
    .router()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = hyper::body::to_bytes(response.into_body())
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn post(uri: &str, body: Body) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body)
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn meeting_flow_start_audio_history_export() {
    let app = router("good afternoon and welcome");

    let response = app
        .clone()
        .oneshot(post("/sessions/standup/start", Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["language"], "en");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sessions/standup/audio")
                .body(Body::from(vec![0u8; 150_000]))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["segment"]["text"], "good afternoon and welcome");

    let response = app
        .clone()
        .oneshot(get("/sessions/standup/history?limit=10"))
        .await
        .unwrap();
    let history = json_body(response).await;
    assert_eq!(history.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(get("/sessions/standup/export?format=txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert!(std::str::from_utf8(&text)
        .unwrap()
        .contains("Speaker: good afternoon and welcome"));

    let response = app
        .oneshot(post("/sessions/standup/end", Body::empty()))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["total_segments"], 1);
}

#[tokio::test]
async fn style_and_language_routes_enforce_the_session_contract() {
    let app = router("hello");

    let style = serde_json::json!({ "font_size": 24 });
    let response = app
        .clone()
        .oneshot(post("/sessions/ghost/style", Body::from(style.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.clone()
        .oneshot(post("/sessions/m1/start", Body::empty()))
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(post("/sessions/m1/style", Body::from(style.to_string())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let language = serde_json::json!({ "language": "de" });
    let response = app
        .clone()
        .oneshot(post(
            "/sessions/m1/languages",
            Body::from(language.to_string()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/sessions/m1/languages/de")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn alert_acknowledgment_round_trips_over_http() {
    let app = router("hello");

    let event = |overall: f32| {
        serde_json::json!({
            "sentiment": {
                "positive": if overall > 0.0 { overall } else { 0.0 },
                "negative": if overall < 0.0 { -overall } else { 0.0 },
                "neutral": 0.2,
                "overall": overall,
            },
            "engagement": 0.8,
            "text": "utterance",
        })
    };

    for overall in [0.5f32, 0.4, -0.3] {
        let response = app
            .clone()
            .oneshot(post(
                "/sessions/m1/sentiment",
                Body::from(event(overall).to_string()),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get("/sessions/m1/alerts")).await.unwrap();
    let alerts = json_body(response).await;
    assert_eq!(alerts.as_array().unwrap().len(), 1);
    assert_eq!(alerts[0]["kind"], "sudden_drop");
    assert_eq!(alerts[0]["acknowledged"], false);
    let alert_id = alerts[0]["id"].as_str().unwrap().to_string();

    let response = app
        .clone()
        .oneshot(post(
            &format!("/sessions/m1/alerts/{}/ack", alert_id),
            Body::empty(),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.oneshot(get("/sessions/m1/alerts")).await.unwrap();
    let alerts = json_body(response).await;
    assert_eq!(alerts[0]["acknowledged"], true);
}
