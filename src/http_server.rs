//! HTTP endpoints: health check and the current record set as JSON.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{Duration, Utc};
use log::{error, info};
use serde::Deserialize;

use crate::imap_client::MailSource;
use crate::notice::EmailInfoPipeline;

pub struct HttpState<S: MailSource> {
    pub pipeline: Arc<EmailInfoPipeline<S>>,
    pub window: Duration,
}

#[derive(Debug, Deserialize)]
pub struct EmailQuery {
    pub profile: Option<String>,
}

/// GET /
async fn health() -> &'static str {
    "codewatch is running."
}

/// GET /emails?profile=<name>
///
/// Returns every record inside the recency window, optionally filtered by
/// profile name, or 502 when the mailbox cannot be read.
async fn list_emails<S: MailSource + 'static>(
    State(state): State<Arc<HttpState<S>>>,
    Query(query): Query<EmailQuery>,
) -> impl IntoResponse {
    let profile = query.profile.as_deref().map(str::trim);

    match state.pipeline.run(Utc::now(), state.window, profile).await {
        Ok(infos) => (StatusCode::OK, Json(serde_json::json!(infos))),
        Err(e) => {
            error!("❌ /emails scan failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": "An error occurred while checking emails."})),
            )
        }
    }
}

pub fn routes<S: MailSource + 'static>(state: Arc<HttpState<S>>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/emails", get(list_emails::<S>))
        .with_state(state)
}

pub async fn serve<S: MailSource + 'static>(bind: &str, state: Arc<HttpState<S>>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("🌐 HTTP server listening on {}", bind);
    axum::serve(listener, routes(state)).await?;
    Ok(())
}
