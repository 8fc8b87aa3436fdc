//! Tracing setup with secret redaction.
//!
//! teloxide and reqwest errors embed the full Bot API URL, which contains the
//! bot token. Every formatted log line passes through [`RedactionPatterns`]
//! before it reaches stderr.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    api_url: Regex,
    bare_token: Regex,
    secret_token: Regex,
    secret_header: Regex,
}

impl RedactionPatterns {
    /// Compiles all patterns.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            api_url: Regex::new(r"(https?://[^/\s]+/(?:file/)?bot)[0-9]+:[A-Za-z0-9_-]+")?,
            bare_token: Regex::new(r"\b[0-9]{8,10}:[A-Za-z0-9_-]{35}\b")?,
            secret_token: Regex::new(r#"("?secret_token"?\s*[:=]\s*"?)[^"&\s,}]+"#)?,
            secret_header: Regex::new(r"(?i)(x-telegram-bot-api-secret-token:\s*)\S+")?,
        })
    }

    /// Masks bot tokens and webhook secrets in `input`.
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let output = self.api_url.replace_all(input, "$1[TELEGRAM_TOKEN]");
        let output = self.bare_token.replace_all(&output, "[TELEGRAM_TOKEN]");
        let output = self.secret_token.replace_all(&output, "$1[MASKED]");
        self.secret_header
            .replace_all(&output, "$1[MASKED]")
            .into_owned()
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length; the redacted text may be shorter or longer
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

/// Installs the global subscriber: `RUST_LOG` filter (default `info`),
/// redacting stderr writer.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}
