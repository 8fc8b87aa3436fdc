//! Webhook-mode HTTP front-end.
//!
//! Telegram pushes updates to `/webhook`; the remaining routes are health and
//! webhook management endpoints for operators.

use crate::bot::gateway::BotGateway;
use crate::bot::handlers::CommandRouter;
use crate::config::webhook_endpoint;
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::types::{Update, UpdateKind};
use tracing::{debug, error, info, warn};

/// Header Telegram uses to echo the webhook secret
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

/// Shared state of the HTTP handlers
pub struct WebhookState {
    /// Bot-wide Telegram operations
    pub gateway: Arc<dyn BotGateway>,
    /// Message router
    pub router: Arc<CommandRouter>,
    /// Expected value of [`SECRET_TOKEN_HEADER`]
    pub secret: String,
    /// Deployment environment name reported by `/` and `/health`
    pub environment: String,
}

#[derive(Deserialize)]
struct SetWebhookBody {
    url: Option<String>,
}

fn failure(status: StatusCode, message: &str, details: impl std::fmt::Display) -> Response {
    (
        status,
        Json(json!({ "error": message, "details": details.to_string() })),
    )
        .into_response()
}

/// Builds the axum router over `state`.
pub fn build_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/webhookInfo", get(webhook_info_handler))
        .route("/setWebhook", post(set_webhook_handler))
        .route("/deleteWebhook", post(delete_webhook_handler))
        .route("/webhook", any(webhook_handler))
        .with_state(state)
}

/// Registers the webhook with Telegram and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the webhook cannot be registered, the address is
/// invalid or the listener cannot be bound.
pub async fn serve(
    state: Arc<WebhookState>,
    bind_address: &str,
    port: u16,
    webhook_url: &str,
) -> anyhow::Result<()> {
    let endpoint = webhook_endpoint(webhook_url);
    state
        .gateway
        .set_webhook(&endpoint, Some(state.secret.clone()))
        .await
        .context("❌ Failed to set webhook on startup")?;
    info!("✅ Webhook set successfully at {}", endpoint);

    let addr: SocketAddr = format!("{bind_address}:{port}")
        .parse()
        .with_context(|| format!("Invalid listen address {bind_address}:{port}"))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "Webhook server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
            }
            info!("Shutting down webhook server");
        })
        .await
        .context("Webhook server error")
}

async fn root_handler(State(state): State<Arc<WebhookState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "Bot is running",
        "mode": "webhook",
        "environment": state.environment,
    }))
}

async fn health_handler(State(state): State<Arc<WebhookState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "mode": "webhook",
        "environment": state.environment,
    }))
}

async fn webhook_info_handler(State(state): State<Arc<WebhookState>>) -> Response {
    match state.gateway.webhook_info().await {
        Ok(info) => Json(info).into_response(),
        Err(e) => {
            error!("Failed to get webhook info: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to get webhook info", e)
        }
    }
}

async fn set_webhook_handler(State(state): State<Arc<WebhookState>>, body: Bytes) -> Response {
    let url = serde_json::from_slice::<SetWebhookBody>(&body)
        .ok()
        .and_then(|b| b.url)
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    let Some(url) = url else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "URL is required" })),
        )
            .into_response();
    };

    match state
        .gateway
        .set_webhook(&url, Some(state.secret.clone()))
        .await
    {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Webhook set successfully",
            "url": url,
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to set webhook: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to set webhook", e)
        }
    }
}

async fn delete_webhook_handler(State(state): State<Arc<WebhookState>>) -> Response {
    match state.gateway.delete_webhook().await {
        Ok(()) => Json(json!({
            "success": true,
            "message": "Webhook deleted successfully",
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to delete webhook: {}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete webhook", e)
        }
    }
}

async fn webhook_handler(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let presented = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok());
    if !presented.is_some_and(|token| secrets_match(token, &state.secret)) {
        warn!("Rejected webhook call with missing or wrong secret token");
        return StatusCode::UNAUTHORIZED;
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Malformed webhook payload: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let UpdateKind::Message(msg) = update.kind else {
        debug!(update_id = update.id.0, "Ignoring non-message update");
        return StatusCode::OK;
    };

    let chat_id = msg.chat.id.0;
    let text = msg.text().map(ToString::to_string);
    tokio::spawn(async move {
        let channel = state.gateway.channel(chat_id);
        if let Err(e) = state.router.handle(channel.as_ref(), text.as_deref()).await {
            error!("Message handler error in chat {}: {}", chat_id, e);
        }
    });

    StatusCode::OK
}

/// Compares in time independent of where the inputs first differ.
fn secrets_match(presented: &str, expected: &str) -> bool {
    let (presented, expected) = (presented.as_bytes(), expected.as_bytes());
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .iter()
        .zip(expected)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
