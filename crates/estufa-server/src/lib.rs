//! Mock estufa backend.
//!
//! Serves synthetic installations on `/api/estufas` in any of the response
//! shapes the dashboard accepts, so the live path can be exercised without
//! real hardware.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use estufa_core::{Clock, PayloadShape, SyntheticGenerator, SystemClock};

/// Shared server state.
struct AppState {
    generator: SyntheticGenerator,
    clock: Arc<dyn Clock>,
    started: Instant,
}

#[derive(Deserialize)]
struct EstufasParams {
    /// Response shape: array (default), wrapped, single.
    shape: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime: f64,
}

async fn handle_estufas(
    State(state): State<Arc<AppState>>,
    Query(params): Query<EstufasParams>,
) -> (StatusCode, Json<serde_json::Value>) {
    let shape = match params.shape.as_deref() {
        None => PayloadShape::default(),
        Some(s) => match PayloadShape::parse(s) {
            Some(shape) => shape,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "error": format!("Unknown shape: {s}. Use array, wrapped or single."),
                    })),
                );
            }
        },
    };
    let entities = state.generator.generate(state.clock.as_ref());
    log::debug!("serving {} estufas ({shape:?})", entities.len());
    (StatusCode::OK, Json(shape.encode(&entities)))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: estufa_core::VERSION,
        uptime: state.started.elapsed().as_secs_f64(),
    })
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Estufa Mock Backend",
        "version": estufa_core::VERSION,
        "seed": state.generator.seed(),
        "endpoints": {
            "/": "This API index",
            "/api/estufas": {
                "method": "GET",
                "description": "Synthetic installations with sensors and drying processes",
                "params": {
                    "shape": "Response shape: array (default), wrapped, single",
                }
            },
            "/health": "Health check",
        },
        "examples": {
            "array": "/api/estufas",
            "wrapped": "/api/estufas?shape=wrapped",
            "single": "/api/estufas?shape=single",
        }
    }))
}

/// Build the axum router.
pub fn build_router(generator: SyntheticGenerator) -> Router {
    build_router_with_clock(generator, Arc::new(SystemClock))
}

pub fn build_router_with_clock(generator: SyntheticGenerator, clock: Arc<dyn Clock>) -> Router {
    let state = Arc::new(AppState {
        generator,
        clock,
        started: Instant::now(),
    });

    Router::new()
        .route("/", get(handle_index))
        .route("/api/estufas", get(handle_estufas))
        .route("/health", get(handle_health))
        .with_state(state)
}

/// Serve on an already-bound listener.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("mock backend listening on http://{addr}");
    }
    axum::serve(listener, router).await
}

/// Run the mock backend.
pub async fn run_server(host: &str, port: u16, generator: SyntheticGenerator) -> std::io::Result<()> {
    let listener = TcpListener::bind(format!("{host}:{port}")).await?;
    serve(listener, build_router(generator)).await
}
