//! Configuration and settings management
//!
//! Loads settings from environment variables and defines relay constants.

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum size of a relayed file (50 MiB)
pub const MAX_FILE_SIZE_BYTES: u64 = 50 * 1024 * 1024;
/// Minimum interval between two progress edits
pub const PROGRESS_UPDATE_INTERVAL_MS: u64 = 3000;
/// Number of cells in the rendered progress bar
pub const PROGRESS_BAR_WIDTH: usize = 20;
/// Source URLs longer than this are truncated in the info message
pub const URL_PREVIEW_CHARS: usize = 50;
/// File names longer than this are shortened in chat texts and captions
///
/// Keeps captions under Telegram's 1024-character limit; the uploaded
/// document still carries the full name.
pub const FILE_NAME_PREVIEW_CHARS: usize = 200;
/// Name used when neither headers nor URL yield a file name
pub const DEFAULT_FILE_NAME: &str = "downloaded_file";
/// Content type assumed when the source does not report one
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
/// Connect timeout for requests to the source host
pub const SOURCE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Environment value that switches the bot to long polling
pub const DEVELOPMENT_ENVIRONMENT: &str = "development";

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Configuration sources could not be read or deserialized
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
    /// `BOT_TOKEN` is absent
    #[error("BOT_TOKEN is not set in environment variables")]
    MissingToken,
    /// Webhook mode was selected without its credentials
    #[error("WEBHOOK_SECRET/WEBHOOK_URL is required but not found in environment variables")]
    MissingWebhook,
}

/// How the bot receives updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Long polling, used in development
    Polling,
    /// Telegram pushes updates to `{url}/webhook`
    Webhook {
        /// Public base URL of this service
        url: String,
        /// Value expected in the secret-token header
        secret: String,
    },
}

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    pub bot_token: Option<String>,

    /// Deployment environment, `development` selects polling
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Secret token Telegram echoes back on every webhook call
    pub webhook_secret: Option<String>,
    /// Public base URL the webhook is registered under
    pub webhook_url: Option<String>,

    /// Listener port in webhook mode
    #[serde(default = "default_port")]
    pub port: u16,
    /// Listener address in webhook mode
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

fn default_environment() -> String {
    "production".to_string()
}

const fn default_port() -> u16 {
    8000
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError::Load` if loading fails.
    pub fn new() -> Result<Self, SettingsError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys;
            // empty values are treated as unset
            .add_source(
                Environment::default()
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?;

        Ok(s.try_deserialize()?)
    }

    /// Returns the bot token, failing fast when it is absent
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingToken` if `BOT_TOKEN` is unset or blank.
    pub fn bot_token(&self) -> Result<&str, SettingsError> {
        self.bot_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(SettingsError::MissingToken)
    }

    /// Whether the bot runs in development (polling) mode
    #[must_use]
    pub fn is_development(&self) -> bool {
        self.environment == DEVELOPMENT_ENVIRONMENT
    }

    /// Resolves the update transport from the environment
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::MissingWebhook` outside development when either
    /// `WEBHOOK_SECRET` or `WEBHOOK_URL` is missing.
    pub fn run_mode(&self) -> Result<RunMode, SettingsError> {
        if self.is_development() {
            return Ok(RunMode::Polling);
        }

        match (&self.webhook_url, &self.webhook_secret) {
            (Some(url), Some(secret)) if !url.is_empty() && !secret.is_empty() => {
                Ok(RunMode::Webhook {
                    url: url.clone(),
                    secret: secret.clone(),
                })
            }
            _ => Err(SettingsError::MissingWebhook),
        }
    }
}

/// Builds the public webhook endpoint from the configured base URL
#[must_use]
pub fn webhook_endpoint(base_url: &str) -> String {
    format!("{}/webhook", base_url.trim_end_matches('/'))
}
