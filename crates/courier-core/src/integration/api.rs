//! The abstract bot-client collaborator.
//!
//! The outbound pipeline never performs network I/O itself. Every sendable
//! message renders into exactly one [`PlatformCall`] — a description of one
//! platform API operation (method name + parameters) — which is handed to a
//! [`BotApi`] implementation for execution.
//!
//! # Error shape
//!
//! A failed call surfaces as an [`ApiError`]. The
//! [`Server`](ApiError::Server) variant carries the platform's `error_code`
//! and `description` verbatim; that pair is the sole input to the retry
//! policy's rate-limit and reply-missing detection, so implementations must
//! not rewrite it.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// File references
// ============================================================================

/// A file reference attached to an upload call.
///
/// Mirrors the platform's accepted forms: an already-uploaded file id, a URL
/// the platform fetches itself, a local path the client uploads, or an
/// in-memory buffer uploaded under an explicit file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFile {
    /// Re-send a file already known to the platform.
    FileId(String),
    /// Let the platform fetch the file from a URL.
    Url(String),
    /// Upload a file from the local filesystem.
    Path(PathBuf),
    /// Upload an in-memory buffer.
    Memory {
        /// File name (with extension) presented to the platform.
        file_name: String,
        /// Raw file content.
        data: Vec<u8>,
    },
}

impl InputFile {
    /// The upload file name, for variants that carry one.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Memory { file_name, .. } => Some(file_name),
            _ => None,
        }
    }
}

/// One item of a media group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMedia {
    /// A photo item.
    Photo {
        /// The photo file.
        media: InputFile,
        /// Optional caption.
        caption: Option<String>,
    },
    /// A video item.
    Video {
        /// The video file.
        media: InputFile,
        /// Optional caption.
        caption: Option<String>,
    },
}

// ============================================================================
// Platform calls
// ============================================================================

/// A description of exactly one outbound platform API operation.
///
/// Produced by [`SendableMessage::render`](crate::outbound::SendableMessage);
/// executed by [`BotApi::call`]. Pure data, no I/O.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    /// `sendMessage`
    SendMessage {
        /// Target chat.
        chat_id: i64,
        /// Message text.
        text: String,
        /// Formatting mode, when not plain text.
        parse_mode: Option<&'static str>,
        /// Suppress link previews.
        disable_web_page_preview: bool,
        /// Deliver silently.
        disable_notification: bool,
        /// Message to reply to.
        reply_to_message_id: Option<i64>,
    },
    /// `sendDocument`
    SendDocument {
        /// Target chat.
        chat_id: i64,
        /// The file to send.
        file: InputFile,
        /// Optional caption.
        caption: Option<String>,
        /// Deliver silently.
        disable_notification: bool,
        /// Message to reply to.
        reply_to_message_id: Option<i64>,
    },
    /// `sendPhoto`
    SendPhoto {
        /// Target chat.
        chat_id: i64,
        /// The photo to send.
        file: InputFile,
        /// Optional caption.
        caption: Option<String>,
        /// Deliver silently.
        disable_notification: bool,
        /// Message to reply to.
        reply_to_message_id: Option<i64>,
    },
    /// `sendSticker`
    SendSticker {
        /// Target chat.
        chat_id: i64,
        /// The sticker to send.
        file: InputFile,
        /// Deliver silently.
        disable_notification: bool,
        /// Message to reply to.
        reply_to_message_id: Option<i64>,
    },
    /// `forwardMessage`
    ForwardMessage {
        /// Target chat.
        chat_id: i64,
        /// Chat the original message lives in.
        from_chat_id: i64,
        /// The message to forward.
        message_id: i64,
        /// Deliver silently.
        disable_notification: bool,
    },
    /// `sendMediaGroup`
    SendMediaGroup {
        /// Target chat.
        chat_id: i64,
        /// The 2..=10 items of the album.
        media: Vec<InputMedia>,
        /// Deliver silently.
        disable_notification: bool,
        /// Message to reply to.
        reply_to_message_id: Option<i64>,
    },
    /// `sendChatAction`
    SendChatAction {
        /// Target chat.
        chat_id: i64,
        /// Action string, e.g. `"typing"`.
        action: &'static str,
    },
}

impl PlatformCall {
    /// The platform wire method name for this call.
    pub fn method(&self) -> &'static str {
        match self {
            Self::SendMessage { .. } => "sendMessage",
            Self::SendDocument { .. } => "sendDocument",
            Self::SendPhoto { .. } => "sendPhoto",
            Self::SendSticker { .. } => "sendSticker",
            Self::ForwardMessage { .. } => "forwardMessage",
            Self::SendMediaGroup { .. } => "sendMediaGroup",
            Self::SendChatAction { .. } => "sendChatAction",
        }
    }

    /// The target chat of this call.
    pub fn chat_id(&self) -> i64 {
        match self {
            Self::SendMessage { chat_id, .. }
            | Self::SendDocument { chat_id, .. }
            | Self::SendPhoto { chat_id, .. }
            | Self::SendSticker { chat_id, .. }
            | Self::ForwardMessage { chat_id, .. }
            | Self::SendMediaGroup { chat_id, .. }
            | Self::SendChatAction { chat_id, .. } => *chat_id,
        }
    }

    /// The reply target of this call, if it carries one.
    pub fn reply_to(&self) -> Option<i64> {
        match self {
            Self::SendMessage {
                reply_to_message_id,
                ..
            }
            | Self::SendDocument {
                reply_to_message_id,
                ..
            }
            | Self::SendPhoto {
                reply_to_message_id,
                ..
            }
            | Self::SendSticker {
                reply_to_message_id,
                ..
            }
            | Self::SendMediaGroup {
                reply_to_message_id,
                ..
            } => *reply_to_message_id,
            Self::ForwardMessage { .. } | Self::SendChatAction { .. } => None,
        }
    }

    /// Returns a copy of this call with the reply reference removed.
    ///
    /// Used by the retry policy when the platform reports the reply target
    /// gone.
    pub fn without_reply(&self) -> Self {
        let mut call = self.clone();
        match &mut call {
            Self::SendMessage {
                reply_to_message_id,
                ..
            }
            | Self::SendDocument {
                reply_to_message_id,
                ..
            }
            | Self::SendPhoto {
                reply_to_message_id,
                ..
            }
            | Self::SendSticker {
                reply_to_message_id,
                ..
            }
            | Self::SendMediaGroup {
                reply_to_message_id,
                ..
            } => *reply_to_message_id = None,
            Self::ForwardMessage { .. } | Self::SendChatAction { .. } => {}
        }
        call
    }
}

// ============================================================================
// Results and errors
// ============================================================================

/// Successful outcome of one platform call.
///
/// Acknowledgement-only calls (chat actions) carry no ids.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentMessage {
    /// Platform-assigned id of the resulting message, when one was created.
    pub message_id: Option<i64>,
    /// Chat the message landed in.
    pub chat_id: Option<i64>,
}

impl SentMessage {
    /// An acknowledgement without a resulting message.
    pub fn ack() -> Self {
        Self::default()
    }

    /// A receipt for a created message.
    pub fn new(chat_id: i64, message_id: i64) -> Self {
        Self {
            message_id: Some(message_id),
            chat_id: Some(chat_id),
        }
    }
}

/// Error type for platform calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The platform rejected the call.
    ///
    /// `error_code` and `description` are preserved verbatim from the wire;
    /// the retry policy classifies on them.
    #[error("server error {error_code}: {description}")]
    Server {
        /// Numeric platform error code (e.g. 400, 429).
        error_code: i64,
        /// Human-readable platform error description.
        description: String,
    },

    /// The call never reached the platform.
    #[error("transport error: {0}")]
    Transport(String),

    /// The client does not support this operation.
    #[error("operation not supported by this client")]
    NotSupported,
}

impl ApiError {
    /// Convenience constructor for a server error.
    pub fn server(error_code: i64, description: impl Into<String>) -> Self {
        Self::Server {
            error_code,
            description: description.into(),
        }
    }
}

/// Result type for platform calls.
pub type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// BotApi trait
// ============================================================================

/// Webhook or polling configuration as reported by the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Currently registered webhook URL; empty when polling.
    pub url: String,
    /// Number of updates the platform has queued for delivery.
    pub pending_update_count: u32,
}

/// The abstract bot client the outbound pipeline talks to.
///
/// One implementation per transport. Implementations execute the described
/// call synchronously (from the pipeline's point of view) and either return a
/// receipt carrying the platform-assigned message id or raise a typed
/// [`ApiError`].
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Executes one platform call.
    async fn call(&self, call: PlatformCall) -> ApiResult<SentMessage>;

    /// Queries the current webhook configuration.
    ///
    /// Defaulted to [`ApiError::NotSupported`]; transports that manage a
    /// webhook override this.
    async fn webhook_config(&self) -> ApiResult<WebhookConfig> {
        Err(ApiError::NotSupported)
    }

    /// Registers a webhook URL with the platform.
    ///
    /// Defaulted to [`ApiError::NotSupported`].
    async fn set_webhook(&self, _url: &str) -> ApiResult<()> {
        Err(ApiError::NotSupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names() {
        let call = PlatformCall::SendChatAction {
            chat_id: 1,
            action: "typing",
        };
        assert_eq!(call.method(), "sendChatAction");

        let call = PlatformCall::ForwardMessage {
            chat_id: 1,
            from_chat_id: 2,
            message_id: 3,
            disable_notification: false,
        };
        assert_eq!(call.method(), "forwardMessage");
    }

    #[test]
    fn without_reply_strips_reference() {
        let call = PlatformCall::SendMessage {
            chat_id: 1,
            text: "hi".into(),
            parse_mode: None,
            disable_web_page_preview: true,
            disable_notification: false,
            reply_to_message_id: Some(42),
        };
        assert_eq!(call.reply_to(), Some(42));
        let stripped = call.without_reply();
        assert_eq!(stripped.reply_to(), None);
        // everything else untouched
        assert_eq!(stripped.chat_id(), 1);
    }
}
