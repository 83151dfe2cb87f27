//! User registry routes
//!
//! `POST /api/v1/users/seen` records that a user interacted with the
//! service. The first sighting of a user id pushes a notification line to
//! the operator channel over the relay.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::UserRepository;
use crate::error::Result;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/seen", post(mark_seen))
}

#[derive(Debug, Deserialize)]
pub struct SeenRequest {
    pub user_id: i64,
    pub username: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeenResponse {
    pub user_id: i64,
    pub new_user: bool,
    pub total_users: i64,
}

async fn mark_seen(
    State(state): State<AppState>,
    Json(request): Json<SeenRequest>,
) -> Result<Json<SeenResponse>> {
    let repo = UserRepository::new(state.db());

    let new_user = repo
        .mark_seen(request.user_id, request.username.as_deref())
        .await?;
    let total_users = repo.total_count().await?;

    if new_user {
        let line = format!(
            "New user notification\n\
             User: {}\n\
             User id: {}\n\
             Total users: {}",
            request.username.as_deref().unwrap_or("n/a"),
            request.user_id,
            total_users,
        );

        // The registration itself already stuck; the notification is
        // best-effort.
        if let Err(e) = state.relay().send_text(&line).await {
            tracing::warn!(
                user_id = request.user_id,
                error = %e,
                "Could not deliver new-user notification"
            );
        }
    }

    Ok(Json(SeenResponse {
        user_id: request.user_id,
        new_user,
        total_users,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::create_pool;
    use crate::export::test_support::ScriptedRelay;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    async fn server(relay: Arc<ScriptedRelay>) -> TestServer {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        let state = AppState::new(Config::default(), relay, pool);
        TestServer::new(crate::routes::app(state)).unwrap()
    }

    #[tokio::test]
    async fn test_first_sighting_notifies_operator() {
        let relay = Arc::new(ScriptedRelay::new());
        let server = server(relay.clone()).await;

        let response = server
            .post("/api/v1/users/seen")
            .json(&json!({"user_id": 11, "username": "ada"}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["new_user"], true);
        assert_eq!(body["total_users"], 1);

        let texts = relay.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("ada"));
    }

    #[tokio::test]
    async fn test_repeat_sighting_is_quiet() {
        let relay = Arc::new(ScriptedRelay::new());
        let server = server(relay.clone()).await;

        server
            .post("/api/v1/users/seen")
            .json(&json!({"user_id": 11}))
            .await
            .assert_status_ok();

        let response = server
            .post("/api/v1/users/seen")
            .json(&json!({"user_id": 11}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["new_user"], false);

        assert_eq!(relay.texts().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_failure_does_not_fail_registration() {
        let relay = Arc::new(ScriptedRelay::new().failing_send_text());
        let server = server(relay.clone()).await;

        let response = server
            .post("/api/v1/users/seen")
            .json(&json!({"user_id": 12}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["new_user"], true);
    }
}
