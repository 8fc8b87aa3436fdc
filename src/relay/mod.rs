//! Remote file relay: probe a URL, stream it with throttled progress edits and
//! re-upload the content into the conversation.

/// HTTP source access
pub mod fetch;
/// Display file name resolution
pub mod filename;
/// The relay state machine
pub mod pipeline;
/// Progress bar rendering and throttling
pub mod progress;

use crate::utils::format_size;
use thiserror::Error;

pub use pipeline::{RelayPipeline, RelaySettings};

/// Failure classes of a relay run.
///
/// The `Display` text is what the user sees in the chat.
#[derive(Debug, Error)]
pub enum RelayError {
    /// HEAD failed or answered with a non-success status
    #[error("Could not reach the file: {0}")]
    Probe(String),
    /// The source did not declare a usable `Content-Length`
    #[error("Could not determine file size")]
    SizeUndetermined,
    /// The source declared zero bytes
    #[error("The file is empty")]
    EmptySource,
    /// Declared size is above the upload limit
    #[error("File is too large: {} (limit is {})", human_size(.size), human_size(.limit))]
    SizeLimitExceeded {
        /// Declared size in bytes
        size: u64,
        /// Configured limit in bytes
        limit: u64,
    },
    /// GET failed, had no body or broke mid-stream
    #[error("Failed to download the file: {0}")]
    Download(String),
    /// Telegram rejected the document
    #[error("Failed to upload the file to Telegram: {0}")]
    Upload(String),
}

fn human_size(bytes: &u64) -> String {
    format_size(*bytes)
}

/// Input of one relay run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    /// Absolute http(s) URL of the source
    pub url: String,
}

impl RelayRequest {
    /// Creates a request for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// What the HEAD probe learned about the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayProbe {
    /// Declared `Content-Length`
    pub declared_size: u64,
    /// Percent-decoded display name
    pub file_name: String,
    /// Bare MIME type, `application/octet-stream` when absent
    pub content_type: String,
}

/// Summary of a delivered file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReceipt {
    /// Name the document was uploaded under
    pub file_name: String,
    /// MIME type reported by the source
    pub content_type: String,
    /// Bytes actually received and uploaded
    pub size: u64,
}

/// States of the relay state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStage {
    /// HEAD request in flight
    Probing,
    /// Declared size being validated
    SizeCheck,
    /// Body streaming
    Downloading,
    /// Document upload in flight
    Uploading,
    /// Delivered
    Done,
    /// Terminated with a reported error
    Failed,
}

/// Terminal result of a relay run
#[derive(Debug)]
pub enum RelayOutcome {
    /// The document reached the conversation
    Delivered(RelayReceipt),
    /// The run stopped in `stage` with `error`
    Failed {
        /// Stage active when the failure happened
        stage: RelayStage,
        /// Failure class
        error: RelayError,
    },
}

impl RelayOutcome {
    /// Terminal state: [`RelayStage::Done`] or [`RelayStage::Failed`].
    #[must_use]
    pub const fn final_stage(&self) -> RelayStage {
        match self {
            Self::Delivered(_) => RelayStage::Done,
            Self::Failed { .. } => RelayStage::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limit_message_uses_human_sizes() {
        let err = RelayError::SizeLimitExceeded {
            size: 60 * 1024 * 1024,
            limit: 50 * 1024 * 1024,
        };
        assert_eq!(err.to_string(), "File is too large: 60 MB (limit is 50 MB)");
    }

    #[test]
    fn upload_message_mentions_upload() {
        let err = RelayError::Upload("Request Entity Too Large".into());
        assert!(err.to_string().to_lowercase().contains("upload"));
    }

    #[test]
    fn final_stage_of_failure() {
        let outcome = RelayOutcome::Failed {
            stage: RelayStage::SizeCheck,
            error: RelayError::EmptySource,
        };
        assert_eq!(outcome.final_stage(), RelayStage::Failed);
    }
}
