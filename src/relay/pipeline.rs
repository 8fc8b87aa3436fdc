//! The relay state machine.
//!
//! One [`RelayPipeline::run`] call walks `Probing -> SizeCheck -> Downloading
//! -> Uploading -> Done`, stopping in `Failed` at the first error. Every side
//! effect is awaited in order; the run owns its progress state and message
//! handle, so concurrent runs never share anything mutable.

use super::fetch::SourceFetcher;
use super::filename::{essence, resolve_file_name};
use super::progress::{percent_of, render_download_complete, render_downloading, ProgressState};
use super::{RelayError, RelayOutcome, RelayProbe, RelayReceipt, RelayRequest, RelayStage};
use crate::bot::channel::{Attachment, ConversationChannel, MessageHandle, NotificationError};
use crate::config::{
    DEFAULT_CONTENT_TYPE, FILE_NAME_PREVIEW_CHARS, MAX_FILE_SIZE_BYTES,
    PROGRESS_UPDATE_INTERVAL_MS, URL_PREVIEW_CHARS,
};
use crate::utils::{ellipsize, format_size};
use futures_util::StreamExt;
use html_escape::encode_text;
use percent_encoding::percent_decode_str;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, CONTENT_TYPE};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Limits applied to each run
#[derive(Debug, Clone, Copy)]
pub struct RelaySettings {
    /// Largest accepted file, declared or received
    pub max_file_size: u64,
    /// Minimum delay between two progress edits
    pub progress_interval: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE_BYTES,
            progress_interval: Duration::from_millis(PROGRESS_UPDATE_INTERVAL_MS),
        }
    }
}

/// Drives relay runs against a shared [`SourceFetcher`]
#[derive(Clone)]
pub struct RelayPipeline {
    fetcher: Arc<dyn SourceFetcher>,
    settings: RelaySettings,
}

/// Per-run bookkeeping
struct RelayRun<'a> {
    channel: &'a dyn ConversationChannel,
    stage: RelayStage,
    progress_message: Option<MessageHandle>,
    progress: ProgressState,
}

impl RelayRun<'_> {
    /// Edits the progress message unless the text is unchanged or there is
    /// no message to edit. Failures are logged and swallowed.
    ///
    /// Returns `true` when the chat shows `text` afterwards.
    async fn refresh(&mut self, text: &str) -> bool {
        let Some(handle) = self.progress_message else {
            return false;
        };
        if !self.progress.replace_text(text) {
            debug!("Progress text unchanged, skipping edit");
            return true;
        }
        match self.channel.edit_text(handle, text).await {
            Ok(()) | Err(NotificationError::NotModified) => true,
            Err(e) => {
                log_notification_failure("edit progress message", &e);
                false
            }
        }
    }

    /// Upload rejections replace the progress message; everything else, and
    /// an upload rejection whose edit did not land, is sent as a new message.
    async fn report_failure(&mut self, error: &RelayError) {
        let text = format!("❌ {}", encode_text(&error.to_string()));
        if matches!(error, RelayError::Upload(_)) && self.refresh(&text).await {
            return;
        }
        if let Err(e) = self.channel.send_text(&text).await {
            log_notification_failure("send failure message", &e);
        }
    }
}

fn log_notification_failure(action: &str, err: &NotificationError) {
    match err {
        NotificationError::NotModified => debug!("Failed to {action}: {err}"),
        NotificationError::Rejected(_) => warn!("Failed to {action}: {err}"),
    }
}

fn header_str<'h>(headers: &'h HeaderMap, name: &reqwest::header::HeaderName) -> Option<&'h str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// File name as shown in chat texts; the uploaded document keeps the full name.
fn shown_name(file_name: &str) -> String {
    ellipsize(file_name, FILE_NAME_PREVIEW_CHARS)
}

fn render_file_info(probe: &RelayProbe, url: &str) -> String {
    format!(
        "📄 <b>File information</b>\n\n📝 Name: <code>{}</code>\n📦 Size: {}\n🏷 Type: <code>{}</code>\n🔗 URL: {}",
        encode_text(&shown_name(&probe.file_name)),
        format_size(probe.declared_size),
        encode_text(&ellipsize(&probe.content_type, URL_PREVIEW_CHARS)),
        encode_text(&ellipsize(url, URL_PREVIEW_CHARS))
    )
}

fn render_delivered(receipt: &RelayReceipt) -> String {
    format!(
        "✅ <b>File sent</b> <code>{}</code>\n📦 {}",
        encode_text(&shown_name(&receipt.file_name)),
        format_size(receipt.size)
    )
}

fn render_caption(file_name: &str, size: u64) -> String {
    format!(
        "📄 <b>{}</b>\n📦 {}",
        encode_text(&shown_name(file_name)),
        format_size(size)
    )
}

impl RelayPipeline {
    /// Creates a pipeline with the default limits.
    #[must_use]
    pub fn new(fetcher: Arc<dyn SourceFetcher>) -> Self {
        Self::with_settings(fetcher, RelaySettings::default())
    }

    /// Creates a pipeline with explicit limits.
    #[must_use]
    pub fn with_settings(fetcher: Arc<dyn SourceFetcher>, settings: RelaySettings) -> Self {
        Self { fetcher, settings }
    }

    /// Runs one relay to its terminal state.
    ///
    /// Never returns early on a chat-side failure: notifications are
    /// best-effort. Exactly one failure message is produced when the run
    /// ends in [`RelayStage::Failed`].
    pub async fn run(
        &self,
        channel: &dyn ConversationChannel,
        request: RelayRequest,
    ) -> RelayOutcome {
        info!(url = %request.url, "Relay started");
        let mut run = RelayRun {
            channel,
            stage: RelayStage::Probing,
            progress_message: None,
            progress: ProgressState::new(Instant::now(), String::new()),
        };

        match self.execute(&mut run, &request.url).await {
            Ok(receipt) => {
                info!(
                    file_name = %receipt.file_name,
                    size = receipt.size,
                    "Relay delivered"
                );
                RelayOutcome::Delivered(receipt)
            }
            Err(error) => {
                let stage = run.stage;
                warn!(url = %request.url, ?stage, error = %error, "Relay failed");
                run.report_failure(&error).await;
                RelayOutcome::Failed { stage, error }
            }
        }
    }

    async fn execute(&self, run: &mut RelayRun<'_>, url: &str) -> Result<RelayReceipt, RelayError> {
        let probe = self.probe(run, url).await?;
        if let Err(e) = run.channel.send_text(&render_file_info(&probe, url)).await {
            log_notification_failure("send file information", &e);
        }

        run.stage = RelayStage::Downloading;
        let bytes = self.download(run, url, &probe).await?;

        run.stage = RelayStage::Uploading;
        let receipt = Self::upload(run, &probe, bytes).await?;

        run.refresh(&render_delivered(&receipt)).await;
        run.stage = RelayStage::Done;
        Ok(receipt)
    }

    /// HEAD the source and validate the declared size.
    async fn probe(&self, run: &mut RelayRun<'_>, url: &str) -> Result<RelayProbe, RelayError> {
        let head = self
            .fetcher
            .head(url)
            .await
            .map_err(|e| RelayError::Probe(e.to_string()))?;
        if !head.status.is_success() {
            return Err(RelayError::Probe(format!("HTTP {}", head.status)));
        }

        let declared_size = header_str(&head.headers, &CONTENT_LENGTH)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or(RelayError::SizeUndetermined)?;

        run.stage = RelayStage::SizeCheck;
        if declared_size > self.settings.max_file_size {
            return Err(RelayError::SizeLimitExceeded {
                size: declared_size,
                limit: self.settings.max_file_size,
            });
        }
        if declared_size == 0 {
            return Err(RelayError::EmptySource);
        }

        let raw_name = resolve_file_name(url, &head.headers);
        let file_name = percent_decode_str(&raw_name).decode_utf8_lossy().into_owned();
        let content_type = header_str(&head.headers, &CONTENT_TYPE)
            .map(essence)
            .filter(|mime| !mime.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        debug!(%file_name, %content_type, declared_size, "Probe succeeded");
        Ok(RelayProbe {
            declared_size,
            file_name,
            content_type,
        })
    }

    /// Streams the body into memory, editing the progress message on the way.
    async fn download(
        &self,
        run: &mut RelayRun<'_>,
        url: &str,
        probe: &RelayProbe,
    ) -> Result<Vec<u8>, RelayError> {
        let response = self
            .fetcher
            .get(url)
            .await
            .map_err(|e| RelayError::Download(e.to_string()))?;
        if !response.status.is_success() {
            return Err(RelayError::Download(format!("HTTP {}", response.status)));
        }
        let Some(mut body) = response.body else {
            return Err(RelayError::Download("response has no body".to_string()));
        };

        let declared = probe.declared_size;
        let name = shown_name(&probe.file_name);
        let initial = render_downloading(&name, 0, declared);
        run.progress_message = match run.channel.send_text(&initial).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                log_notification_failure("send progress message", &e);
                None
            }
        };
        run.progress = ProgressState::new(Instant::now(), initial);

        let interval = self.settings.progress_interval;
        let mut buffer = Vec::with_capacity(usize::try_from(declared).unwrap_or_default());
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| RelayError::Download(e.to_string()))?;
            run.progress.record_chunk(chunk.len());
            let received = run.progress.bytes_received;
            if received > self.settings.max_file_size {
                return Err(RelayError::Download(format!(
                    "received more than the {} limit",
                    format_size(self.settings.max_file_size)
                )));
            }
            buffer.extend_from_slice(&chunk);

            let percent = percent_of(received, declared);
            let now = Instant::now();
            if run.progress.is_due(percent, now, interval) {
                run.progress.mark_reported(percent, now);
                run.refresh(&render_downloading(&name, percent, declared))
                    .await;
            }
        }

        let received = run.progress.bytes_received;
        debug!(received, declared, "Download finished");
        run.refresh(&render_download_complete(&name, received))
            .await;
        Ok(buffer)
    }

    async fn upload(
        run: &mut RelayRun<'_>,
        probe: &RelayProbe,
        bytes: Vec<u8>,
    ) -> Result<RelayReceipt, RelayError> {
        let size = bytes.len() as u64;
        if let Err(e) = run.channel.send_upload_action().await {
            log_notification_failure("send upload action", &e);
        }

        let attachment = Attachment {
            file_name: probe.file_name.clone(),
            content_type: probe.content_type.clone(),
            bytes,
        };
        run.channel
            .send_attachment(attachment, &render_caption(&probe.file_name, size))
            .await
            .map_err(|e| RelayError::Upload(e.to_string()))?;

        Ok(RelayReceipt {
            file_name: probe.file_name.clone(),
            content_type: probe.content_type.clone(),
            size,
        })
    }
}
