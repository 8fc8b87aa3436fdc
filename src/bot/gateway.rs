//! Bot-wide Telegram operations: webhook management and per-chat channels.

use super::channel::{ConversationChannel, TelegramChannel};
use async_trait::async_trait;
use reqwest::Url;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use thiserror::Error;
use tracing::info;

/// Errors from webhook management calls
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The webhook URL is not an absolute URL
    #[error("invalid webhook URL: {0}")]
    InvalidUrl(String),
    /// Telegram refused the call or could not be reached
    #[error("Telegram API error: {0}")]
    Api(String),
}

impl From<teloxide::RequestError> for GatewayError {
    fn from(err: teloxide::RequestError) -> Self {
        Self::Api(err.to_string())
    }
}

/// Telegram operations that are not bound to a conversation
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BotGateway: Send + Sync {
    /// Registers `url` as the webhook, optionally with a secret token.
    async fn set_webhook(&self, url: &str, secret: Option<String>) -> Result<(), GatewayError>;

    /// Removes the current webhook.
    async fn delete_webhook(&self) -> Result<(), GatewayError>;

    /// Current webhook status as reported by Telegram.
    async fn webhook_info(&self) -> Result<serde_json::Value, GatewayError>;

    /// Conversation channel for `chat_id`.
    fn channel(&self, chat_id: i64) -> Arc<dyn ConversationChannel>;
}

/// [`BotGateway`] backed by a teloxide [`Bot`]
#[derive(Clone)]
pub struct TelegramGateway {
    bot: Bot,
}

impl TelegramGateway {
    /// Wraps `bot`.
    #[must_use]
    pub const fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl BotGateway for TelegramGateway {
    async fn set_webhook(&self, url: &str, secret: Option<String>) -> Result<(), GatewayError> {
        let parsed = Url::parse(url).map_err(|e| GatewayError::InvalidUrl(format!("{url}: {e}")))?;
        let mut request = self.bot.set_webhook(parsed);
        if let Some(secret) = secret {
            request = request.secret_token(secret);
        }
        request.await?;
        info!(url = %url, "Webhook registered");
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<(), GatewayError> {
        self.bot.delete_webhook().await?;
        info!("Webhook deleted");
        Ok(())
    }

    async fn webhook_info(&self) -> Result<serde_json::Value, GatewayError> {
        let info = self.bot.get_webhook_info().await?;
        serde_json::to_value(info).map_err(|e| GatewayError::Api(e.to_string()))
    }

    fn channel(&self, chat_id: i64) -> Arc<dyn ConversationChannel> {
        Arc::new(TelegramChannel::new(self.bot.clone(), ChatId(chat_id)))
    }
}
