//! End-to-end tests: mock backend ↔ data access facade.

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tokio::net::TcpListener;

use estufa_core::{DataSource, EstufaClient, FixedClock, SyntheticGenerator};
use estufa_server::{build_router_with_clock, serve};

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at("2024-05-20T08:00:00Z").unwrap())
}

/// Spawn `router` on an ephemeral port and return its base URL.
async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve(listener, router));
    format!("http://{addr}")
}

async fn spawn_mock(seed: u64) -> String {
    spawn(build_router_with_clock(SyntheticGenerator::seeded(seed), clock())).await
}

fn client(base: &str) -> EstufaClient {
    EstufaClient::new(base, Duration::from_secs(2))
        .with_generator(SyntheticGenerator::seeded(999))
        .with_clock(clock())
}

// ---------------------------------------------------------------------------
// Facade against the mock backend
// ---------------------------------------------------------------------------

#[tokio::test]
async fn live_data_from_mock_backend() {
    let base = spawn_mock(1).await;
    let out = client(&base).fetch_entities().await;
    assert_eq!(out.source, DataSource::Live);
    assert_eq!(out.entities, SyntheticGenerator::seeded(1).generate(clock().as_ref()));
}

#[tokio::test]
async fn every_shape_decodes() {
    let base = spawn_mock(2).await;
    for (shape, expected) in [("array", 2), ("wrapped", 2), ("single", 1)] {
        let body: serde_json::Value = reqwest::get(format!("{base}/api/estufas?shape={shape}"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let entities = estufa_core::EntitiesPayload::decode(body).into_entities();
        assert_eq!(entities.len(), expected, "shape {shape}");
    }
}

#[tokio::test]
async fn unknown_shape_is_bad_request() {
    let base = spawn_mock(3).await;
    let resp = reqwest::get(format!("{base}/api/estufas?shape=xml"))
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_and_index() {
    let base = spawn_mock(4).await;
    let health: serde_json::Value = reqwest::get(format!("{base}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["version"], estufa_core::VERSION);
    assert!(health["uptime"].as_f64().unwrap() >= 0.0);

    let index: serde_json::Value = reqwest::get(&base).await.unwrap().json().await.unwrap();
    assert_eq!(index["seed"], 4);
    assert!(index["endpoints"]["/api/estufas"].is_object());
}

// ---------------------------------------------------------------------------
// Fallback paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn closed_port_falls_back_to_synthetic() {
    let port = {
        let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        l.local_addr().unwrap().port()
    };
    let out = client(&format!("http://127.0.0.1:{port}"))
        .fetch_entities()
        .await;
    assert_eq!(out.source, DataSource::Synthetic);
    assert_eq!(out.entities, SyntheticGenerator::seeded(999).generate(clock().as_ref()));
}

#[tokio::test]
async fn not_found_falls_back_to_synthetic() {
    let base = spawn_mock(5).await;
    let out = client(&format!("{base}/missing")).fetch_entities().await;
    assert_eq!(out.source, DataSource::Synthetic);
}

#[tokio::test]
async fn non_json_body_falls_back_to_synthetic() {
    let router = Router::new().route("/api/estufas", get(|| async { "<html>oops</html>" }));
    let base = spawn(router).await;
    let out = client(&base).fetch_entities().await;
    assert_eq!(out.source, DataSource::Synthetic);
}

#[tokio::test]
async fn unrecognized_json_is_live_and_empty() {
    let router = Router::new().route("/api/estufas", get(|| async { "\"garbage\"" }));
    let base = spawn(router).await;
    let out = client(&base).fetch_entities().await;
    assert_eq!(out.source, DataSource::Live);
    assert!(out.entities.is_empty());
}
