#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use file_relay_bot::bot::channel::{
    Attachment, ConversationChannel, MessageHandle, NotificationError, UploadError,
};
use file_relay_bot::bot::gateway::{BotGateway, GatewayError};
use file_relay_bot::relay::fetch::{FetchError, SourceFetcher, SourceHead, SourceResponse};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory source serving a fixed HEAD response and a chunked body
pub struct FakeFetcher {
    head_headers: HeaderMap,
    chunks: Vec<Bytes>,
    chunk_delay: Option<Duration>,
    pub head_calls: AtomicUsize,
    pub get_calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn new(headers: &[(HeaderName, &str)], chunks: Vec<Bytes>) -> Self {
        let mut head_headers = HeaderMap::new();
        for (name, value) in headers {
            head_headers.insert(
                name.clone(),
                HeaderValue::from_str(value).expect("valid header value"),
            );
        }
        Self {
            head_headers,
            chunks,
            chunk_delay: None,
            head_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
        }
    }

    /// Sleeps `delay` before yielding each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }
}

#[async_trait]
impl SourceFetcher for FakeFetcher {
    async fn head(&self, _url: &str) -> Result<SourceHead, FetchError> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        Ok(SourceHead {
            status: StatusCode::OK,
            headers: self.head_headers.clone(),
        })
    }

    async fn get(&self, _url: &str) -> Result<SourceResponse, FetchError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.chunk_delay;
        let body = futures_util::stream::iter(self.chunks.clone())
            .then(move |chunk| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(chunk)
            })
            .boxed();
        Ok(SourceResponse {
            status: StatusCode::OK,
            headers: self.head_headers.clone(),
            body: Some(body),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Sent(String),
    Edited(MessageHandle, String),
    UploadAction,
    Uploaded {
        file_name: String,
        content_type: String,
        size: usize,
        caption: String,
    },
}

/// Records every call; optionally rejects uploads
#[derive(Default)]
pub struct RecordingChannel {
    pub chat_id: i64,
    events: Mutex<Vec<ChannelEvent>>,
    next_message_id: AtomicI32,
    reject_uploads: bool,
}

impl RecordingChannel {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            ..Self::default()
        }
    }

    pub fn rejecting_uploads(chat_id: i64) -> Self {
        Self {
            chat_id,
            reject_uploads: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().expect("lock").clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChannelEvent::Sent(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn edits(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ChannelEvent::Edited(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ChannelEvent) {
        self.events.lock().expect("lock").push(event);
    }
}

#[async_trait]
impl ConversationChannel for RecordingChannel {
    async fn send_text(&self, text: &str) -> Result<MessageHandle, NotificationError> {
        self.push(ChannelEvent::Sent(text.to_string()));
        let message_id = self.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MessageHandle {
            chat_id: self.chat_id,
            message_id,
        })
    }

    async fn edit_text(&self, handle: MessageHandle, text: &str) -> Result<(), NotificationError> {
        self.push(ChannelEvent::Edited(handle, text.to_string()));
        Ok(())
    }

    async fn send_upload_action(&self) -> Result<(), NotificationError> {
        self.push(ChannelEvent::UploadAction);
        Ok(())
    }

    async fn send_attachment(
        &self,
        attachment: Attachment,
        caption: &str,
    ) -> Result<(), UploadError> {
        if self.reject_uploads {
            return Err(UploadError::Rejected("Request Entity Too Large".into()));
        }
        self.push(ChannelEvent::Uploaded {
            file_name: attachment.file_name,
            content_type: attachment.content_type,
            size: attachment.bytes.len(),
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// Gateway that records webhook calls and hands out one shared channel
pub struct FakeGateway {
    pub channel: Arc<RecordingChannel>,
    pub webhook_calls: Mutex<Vec<(String, Option<String>)>>,
    pub fail: bool,
}

impl FakeGateway {
    pub fn new(fail: bool) -> Self {
        Self {
            channel: Arc::new(RecordingChannel::new(42)),
            webhook_calls: Mutex::new(Vec::new()),
            fail,
        }
    }

    fn check(&self) -> Result<(), GatewayError> {
        if self.fail {
            Err(GatewayError::Api("Unauthorized".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl BotGateway for FakeGateway {
    async fn set_webhook(&self, url: &str, secret: Option<String>) -> Result<(), GatewayError> {
        self.check()?;
        self.webhook_calls
            .lock()
            .expect("lock")
            .push((url.to_string(), secret));
        Ok(())
    }

    async fn delete_webhook(&self) -> Result<(), GatewayError> {
        self.check()
    }

    async fn webhook_info(&self) -> Result<serde_json::Value, GatewayError> {
        self.check()?;
        Ok(serde_json::json!({ "url": "https://relay.example.com/webhook", "pending_update_count": 0 }))
    }

    fn channel(&self, _chat_id: i64) -> Arc<dyn ConversationChannel> {
        self.channel.clone()
    }
}
