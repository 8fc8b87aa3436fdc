//! Conversation channel: the chat-side capabilities used by handlers.
//!
//! [`TelegramChannel`] binds a teloxide [`Bot`] to one chat. Handlers and the
//! relay pipeline only depend on the [`ConversationChannel`] trait.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, ChatId, InputFile, MessageId, ParseMode};
use teloxide::{ApiError, RequestError};
use thiserror::Error;
use tracing::debug;

/// Failure of a send/edit call towards the conversation.
///
/// Progress notifications are best-effort: callers log this and carry on.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The platform refused an edit because the content is unchanged
    #[error("message is not modified")]
    NotModified,
    /// Any other refusal (message gone, rate limit, network)
    #[error("notification rejected: {0}")]
    Rejected(String),
}

impl From<RequestError> for NotificationError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::Api(ApiError::MessageNotModified) => Self::NotModified,
            other => Self::Rejected(other.to_string()),
        }
    }
}

/// The platform refused an attachment
#[derive(Debug, Error)]
pub enum UploadError {
    /// Oversized, unsupported or otherwise rejected upload
    #[error("upload rejected: {0}")]
    Rejected(String),
}

impl From<RequestError> for UploadError {
    fn from(err: RequestError) -> Self {
        Self::Rejected(err.to_string())
    }
}

/// Identifies a message previously sent to a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageHandle {
    /// Chat the message lives in
    pub chat_id: i64,
    /// Message identifier within the chat
    pub message_id: i32,
}

/// File payload to upload into the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Display file name
    pub file_name: String,
    /// Bare MIME type reported by the source
    pub content_type: String,
    /// File content
    pub bytes: Vec<u8>,
}

/// Chat-side operations available to handlers
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConversationChannel: Send + Sync {
    /// Sends an HTML message and returns its handle.
    async fn send_text(&self, text: &str) -> Result<MessageHandle, NotificationError>;

    /// Replaces the text of a previously sent message.
    async fn edit_text(&self, handle: MessageHandle, text: &str) -> Result<(), NotificationError>;

    /// Shows the "sending document" activity indicator.
    async fn send_upload_action(&self) -> Result<(), NotificationError>;

    /// Uploads `attachment` as a document with an HTML caption.
    async fn send_attachment(
        &self,
        attachment: Attachment,
        caption: &str,
    ) -> Result<(), UploadError>;
}

/// Telegram conversation bound to a single chat
#[derive(Clone)]
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramChannel {
    /// Create a channel for `chat_id`.
    #[must_use]
    pub const fn new(bot: Bot, chat_id: ChatId) -> Self {
        Self { bot, chat_id }
    }
}

#[async_trait]
impl ConversationChannel for TelegramChannel {
    async fn send_text(&self, text: &str) -> Result<MessageHandle, NotificationError> {
        let msg = self
            .bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(MessageHandle {
            chat_id: msg.chat.id.0,
            message_id: msg.id.0,
        })
    }

    async fn edit_text(&self, handle: MessageHandle, text: &str) -> Result<(), NotificationError> {
        self.bot
            .edit_message_text(ChatId(handle.chat_id), MessageId(handle.message_id), text)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }

    async fn send_upload_action(&self) -> Result<(), NotificationError> {
        self.bot
            .send_chat_action(self.chat_id, ChatAction::UploadDocument)
            .await?;
        Ok(())
    }

    async fn send_attachment(
        &self,
        attachment: Attachment,
        caption: &str,
    ) -> Result<(), UploadError> {
        debug!(
            chat_id = %self.chat_id,
            file_name = %attachment.file_name,
            content_type = %attachment.content_type,
            size = attachment.bytes.len(),
            "Uploading document"
        );
        let file = InputFile::memory(attachment.bytes).file_name(attachment.file_name);
        self.bot
            .send_document(self.chat_id, file)
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_modified_is_classified() {
        let err = NotificationError::from(RequestError::Api(ApiError::MessageNotModified));
        assert!(matches!(err, NotificationError::NotModified));

        let err = NotificationError::from(RequestError::Api(ApiError::MessageToEditNotFound));
        assert!(matches!(err, NotificationError::Rejected(_)));
    }
}
