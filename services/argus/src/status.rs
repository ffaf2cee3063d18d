//! JSON status API over the device registry.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio_util::sync::CancellationToken;

use crate::state::StateRegistry;

/// Build the status axum router
pub fn build_router(registry: StateRegistry) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/health", get(health_handler))
        .with_state(registry)
}

async fn status_handler(State(registry): State<StateRegistry>) -> impl IntoResponse {
    axum::Json(registry.statuses())
}

async fn health_handler() -> impl IntoResponse {
    axum::Json(serde_json::json!({"status": "ok"}))
}

/// Serve the status API until the token is cancelled
pub async fn serve(
    registry: StateRegistry,
    port: u16,
    cancel: CancellationToken,
) -> crate::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Status API listening on http://{}", addr);

    axum::serve(listener, build_router(registry))
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    tracing::debug!("Status API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::state::{epoch_ms, DeviceSnapshot, DeviceStatus, FocuserSnapshot};
    use argus_alpaca::{ConnectionState, DeviceType};
    use tokio::sync::watch;

    fn focuser_status(position: i32) -> DeviceStatus {
        DeviceStatus {
            name: "Main focuser".to_string(),
            device_type: DeviceType::Focuser,
            connection: ConnectionState::Connected,
            consecutive_failures: 0,
            updated_at_ms: epoch_ms(),
            snapshot: DeviceSnapshot::Focuser(FocuserSnapshot {
                position: Some(position),
                ..FocuserSnapshot::default()
            }),
        }
    }

    async fn get_json(registry: StateRegistry, uri: &str) -> serde_json::Value {
        let app = build_router(registry);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let json = get_json(StateRegistry::new(), "/health").await;
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn status_returns_one_entry_per_device() {
        let mut registry = StateRegistry::new();
        let (_tx, rx) = watch::channel(focuser_status(1200));
        registry.register(rx);

        let json = get_json(registry, "/api/status").await;
        let devices = json.as_array().unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0]["name"], "Main focuser");
        assert_eq!(devices[0]["device_type"], "focuser");
        assert_eq!(devices[0]["connection"], "Connected");
        assert_eq!(devices[0]["snapshot"]["kind"], "focuser");
        assert_eq!(devices[0]["snapshot"]["position"], 1200);
    }

    #[tokio::test]
    async fn status_with_no_devices_is_an_empty_array() {
        let json = get_json(StateRegistry::new(), "/api/status").await;
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn status_reflects_the_latest_published_value() {
        let mut registry = StateRegistry::new();
        let (tx, rx) = watch::channel(focuser_status(1200));
        registry.register(rx);

        let json = get_json(registry.clone(), "/api/status").await;
        assert_eq!(json[0]["snapshot"]["position"], 1200);

        tx.send_replace(focuser_status(4800));
        let json = get_json(registry, "/api/status").await;
        assert_eq!(json[0]["snapshot"]["position"], 4800);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let app = build_router(StateRegistry::new());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/missing")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
