//! Inbound text routing.
//!
//! [`CommandRouter`] is transport-agnostic: polling and webhook front-ends
//! both hand it a [`ConversationChannel`] and the message text.

use super::channel::ConversationChannel;
use crate::relay::{RelayOutcome, RelayPipeline, RelayRequest};
use anyhow::Result;
use lazy_regex::lazy_regex;
use tracing::{debug, info};

/// `/command`, optional `@botname`, optional arguments
static RE_COMMAND: lazy_regex::Lazy<regex::Regex> =
    lazy_regex!(r"^/([A-Za-z0-9_]+)(?:@[A-Za-z0-9_]+)?(?:\s+([\s\S]*))?$");

/// `/echo <text>` anywhere in the message
static RE_ECHO: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"/echo (.+)");

const WELCOME_MESSAGE: &str = "Welcome! Up and running.";
const HELP_MESSAGE: &str = "<b>Available commands</b>\n\n\
    /start - check that the bot is alive\n\
    /help - show this message\n\
    /send &lt;url&gt; - download a file (up to 50 MB) and send it here\n\
    /echo &lt;text&gt; - repeat the text back";
const SEND_USAGE_MESSAGE: &str =
    "❌ Please provide a URL.\n\nUsage: <code>/send https://example.com/file.pdf</code>";
const PONG_MESSAGE: &str = "Pong!!!";
const FALLBACK_MESSAGE: &str = "Got another message!";

/// Parsed intent of an inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/start`
    Start,
    /// `/help`
    Help,
    /// `/send <url>`; the argument is trimmed and may be empty
    Send(String),
    /// `/echo <text>` matched anywhere in the message
    Echo(String),
    /// Exactly `ping`
    Ping,
    /// Anything else, including non-text messages
    Other,
}

impl Command {
    /// Classifies message text. `None` stands for a non-text message.
    #[must_use]
    pub fn parse(text: Option<&str>) -> Self {
        let Some(text) = text else {
            return Self::Other;
        };

        if let Some(caps) = RE_COMMAND.captures(text.trim()) {
            let args = caps.get(2).map_or("", |m| m.as_str()).trim();
            match caps.get(1).map(|m| m.as_str().to_ascii_lowercase()).as_deref() {
                Some("start") => return Self::Start,
                Some("help") => return Self::Help,
                Some("send") => return Self::Send(args.to_string()),
                _ => {}
            }
        }

        if let Some(caps) = RE_ECHO.captures(text) {
            if let Some(m) = caps.get(1) {
                return Self::Echo(m.as_str().to_string());
            }
        }

        if text == "ping" {
            return Self::Ping;
        }
        Self::Other
    }
}

/// What a handled message led to
#[derive(Debug)]
pub enum RouteOutcome {
    /// A plain reply was sent
    Replied,
    /// A relay ran to completion
    Relayed(RelayOutcome),
}

/// Maps inbound messages to replies and relay runs
#[derive(Clone)]
pub struct CommandRouter {
    pipeline: RelayPipeline,
}

impl CommandRouter {
    /// Creates a router that relays files through `pipeline`.
    #[must_use]
    pub const fn new(pipeline: RelayPipeline) -> Self {
        Self { pipeline }
    }

    /// Handles one inbound message.
    ///
    /// # Errors
    ///
    /// Returns an error if a reply cannot be delivered. Relay failures are
    /// reported in the chat and surface as [`RouteOutcome::Relayed`].
    pub async fn handle(
        &self,
        channel: &dyn ConversationChannel,
        text: Option<&str>,
    ) -> Result<RouteOutcome> {
        let command = Command::parse(text);
        debug!(?command, "Routing message");

        let reply = match command {
            Command::Start => WELCOME_MESSAGE.to_string(),
            Command::Help => HELP_MESSAGE.to_string(),
            Command::Send(url) if url.is_empty() => SEND_USAGE_MESSAGE.to_string(),
            Command::Send(url) => {
                info!(url = %url, "Relay requested");
                let outcome = self.pipeline.run(channel, RelayRequest::new(url)).await;
                return Ok(RouteOutcome::Relayed(outcome));
            }
            Command::Echo(captured) => html_escape::encode_text(&captured).into_owned(),
            Command::Ping => PONG_MESSAGE.to_string(),
            Command::Other => FALLBACK_MESSAGE.to_string(),
        };

        channel.send_text(&reply).await?;
        Ok(RouteOutcome::Replied)
    }
}
