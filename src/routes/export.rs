//! Export trigger route
//!
//! `POST /api/v1/admin/export` runs the export pipeline once. The caller
//! must present the configured admin token. The response is the success
//! summary, the degraded-mode summary, or an error body; the HTTP status is
//! the binary success/failure signal.

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::export::{CancelHandle, ExportReport};
use crate::state::AppState;

pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(trigger_export))
}

async fn trigger_export(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ExportReport>> {
    let presented = headers
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let expected = &state.config().export.admin_token;
    if expected.is_empty() || presented != expected {
        return Err(AppError::Unauthorized);
    }

    let (handle, token) = CancelHandle::new();
    handle.arm_deadline(Duration::from_secs(state.config().export.deadline_secs));

    let report = state.export_pipeline().run(token).await?;

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::{create_pool, UserRepository};
    use crate::export::test_support::ScriptedRelay;
    use axum::http::{HeaderName, HeaderValue, StatusCode};
    use axum_test::TestServer;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn server_with_users(relay: Arc<ScriptedRelay>, fallback_dir: &TempDir) -> TestServer {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let repo = UserRepository::new(&pool);
        for id in 1..=4 {
            repo.mark_seen(id, None).await.unwrap();
        }

        let mut config = Config::default();
        config.export.admin_token = "secret".to_string();
        config.export.fallback_dir = fallback_dir.path().to_path_buf();

        let state = AppState::new(config, relay, pool);
        TestServer::new(crate::routes::app(state)).unwrap()
    }

    fn token_header() -> (HeaderName, HeaderValue) {
        (
            HeaderName::from_static(ADMIN_TOKEN_HEADER),
            HeaderValue::from_static("secret"),
        )
    }

    #[tokio::test]
    async fn test_export_requires_admin_token() {
        let fallback_dir = TempDir::new().unwrap();
        let server = server_with_users(Arc::new(ScriptedRelay::new()), &fallback_dir).await;

        let response = server.post("/api/v1/admin/export").await;
        response.assert_status(StatusCode::UNAUTHORIZED);

        let (name, _) = token_header();
        let response = server
            .post("/api/v1/admin/export")
            .add_header(name, HeaderValue::from_static("wrong"))
            .await;
        response.assert_status(StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_export_delivers_registry() {
        let fallback_dir = TempDir::new().unwrap();
        let relay = Arc::new(ScriptedRelay::new());
        let server = server_with_users(relay.clone(), &fallback_dir).await;

        let (name, value) = token_header();
        let response = server
            .post("/api/v1/admin/export")
            .add_header(name, value)
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "delivered");
        assert_eq!(body["record_count"], 4);

        assert!(relay.committed());
    }

    #[tokio::test]
    async fn test_export_reports_degraded_mode() {
        let fallback_dir = TempDir::new().unwrap();
        let relay = Arc::new(ScriptedRelay::new().failing_part(0, u32::MAX));
        let server = server_with_users(relay.clone(), &fallback_dir).await;

        let (name, value) = token_header();
        let response = server
            .post("/api/v1/admin/export")
            .add_header(name, value)
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "fallback_saved");
        assert!(body["path"]
            .as_str()
            .unwrap()
            .starts_with(fallback_dir.path().to_str().unwrap()));

        assert!(!relay.committed());
    }
}
