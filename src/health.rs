//! Liveness endpoint for the hosting platform. No business data is exposed.

use std::time::Instant;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
struct HealthState {
    started_at: Instant,
}

async fn health(State(state): State<HealthState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

fn router(started_at: Instant) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .with_state(HealthState { started_at })
        .layer(TraceLayer::new_for_http())
}

pub async fn start_health_server(port: u16, started_at: Instant) -> Result<(), std::io::Error> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Health endpoint listening on {}", listener.local_addr()?);
    axum::serve(listener, router(started_at)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_body() {
        let Json(body) = health(State(HealthState { started_at: Instant::now() })).await;
        assert_eq!(body["status"], "ok");
        assert!(body["uptime_secs"].as_u64().is_some());
    }

    #[tokio::test]
    async fn test_server_answers() {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router(Instant::now())).await });

        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("\"status\":\"ok\""));
    }
}
