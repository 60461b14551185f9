//! Unified error types for the Courier core.
//!
//! Filter- and API-level errors live next to their layers
//! ([`NoMatch`](crate::framework::NoMatch) in the framework,
//! [`ApiError`](crate::integration::ApiError) in the integration layer); this
//! module holds the construction-time validation errors of the outbound
//! message types.

use thiserror::Error;

/// Validation errors raised while constructing or rendering a sendable
/// message.
///
/// These are raised synchronously to the code building the message (typically
/// inside a handler) and are never swallowed by the dispatcher.
#[derive(Debug, Error)]
pub enum MessageError {
    /// A text message was constructed from an empty string.
    #[error("text content is empty")]
    EmptyInput,

    /// No MIME type could be determined from content sniffing, the file
    /// extension, or an explicit override.
    #[error("could not determine a MIME type for the file")]
    UnknownMime,

    /// A forwarded-message reference did not identify a real message.
    #[error("invalid message reference: {what}")]
    InvalidReference {
        /// Which reference was rejected.
        what: &'static str,
    },

    /// A chat-action string outside the fixed action set.
    #[error("chat action {0:?} unknown")]
    InvalidAction(String),

    /// A media group outside the 2..=10 item bounds.
    #[error("media group must hold 2 to 10 items, got {count}")]
    InvalidMediaGroup {
        /// The offending item count.
        count: usize,
    },

    /// A message had no receiver chat and none could be derived from the
    /// dispatch context.
    #[error("no receiver chat id available")]
    NoReceiver,

    /// Reading a local file source failed.
    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Fetching a URL source failed.
    #[error("failed to fetch url: {0}")]
    Fetch(String),
}

/// Result type for message construction and rendering.
pub type MessageResult<T> = Result<T, MessageError>;
