#![deny(missing_docs)]
//! Telegram bot that relays remote files into the chat.
//!
//! `/send <url>` probes the URL, streams it with throttled progress edits and
//! uploads the result as a document. Updates arrive by long polling in
//! development and through an axum webhook server otherwise.

/// Telegram-facing handlers, channels and runtime.
pub mod bot;
/// Configuration management.
pub mod config;
/// Tracing setup with secret redaction.
pub mod logging;
/// Remote file relay pipeline.
pub mod relay;
/// Utility functions.
pub mod utils;
/// Webhook HTTP server.
pub mod web;
