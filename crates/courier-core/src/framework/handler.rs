//! Handler return values and the coercion vocabulary.
//!
//! A handler answers an update with a [`HandlerOutcome`], which the
//! dispatcher converts into zero or more outbound sends:
//!
//! | Outcome | Effect |
//! |---------|--------|
//! | [`None`](HandlerOutcome::None) | nothing is sent |
//! | [`Text`](HandlerOutcome::Text) | one unformatted text message |
//! | [`Message`](HandlerOutcome::Message) | the sendable, as-is |
//! | [`Many`](HandlerOutcome::Many) | each element, coerced in order |
//! | [`Abort`](HandlerOutcome::Abort) | stop offering this update to later filters; the optional replacement is still sent |
//!
//! A handler that fails returns an `Err`; the dispatcher logs it and moves on
//! to the next filter — one misbehaving handler never blocks the others.

use std::pin::Pin;

use crate::outbound::message::SendableMessage;

/// Boxed future type used throughout the framework layer.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a filter's predicate extracted for the handler.
///
/// `None` for plain update/message matches and for a command without
/// trailing text; `Some(args)` for a command with trailing argument text.
pub type MatchValue = Option<String>;

/// Result type returned by handlers.
pub type HandlerResult = anyhow::Result<HandlerOutcome>;

/// A handler's answer to an update.
#[derive(Debug, Clone, Default)]
pub enum HandlerOutcome {
    /// Nothing to send.
    #[default]
    None,
    /// A bare string, sent as an unformatted text message.
    Text(String),
    /// A sendable message, sent as-is.
    Message(SendableMessage),
    /// Several outcomes, coerced and sent in order.
    Many(Vec<HandlerOutcome>),
    /// Stop offering this update to the remaining filters.
    ///
    /// The replacement, when present, is still coerced and sent — it stands
    /// in for the aborting handler's return value.
    Abort {
        /// Optional substitute outcome.
        replacement: Option<Box<HandlerOutcome>>,
    },
}

impl HandlerOutcome {
    /// A text outcome.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// An abort without a substitute value.
    pub fn abort() -> Self {
        Self::Abort { replacement: None }
    }

    /// An abort that still sends `replacement`.
    pub fn abort_with(replacement: impl Into<HandlerOutcome>) -> Self {
        Self::Abort {
            replacement: Some(Box::new(replacement.into())),
        }
    }
}

impl From<&str> for HandlerOutcome {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for HandlerOutcome {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<SendableMessage> for HandlerOutcome {
    fn from(message: SendableMessage) -> Self {
        Self::Message(message)
    }
}

macro_rules! outcome_from_message {
    ($($variant:ty),+ $(,)?) => {
        $(impl From<$variant> for HandlerOutcome {
            fn from(message: $variant) -> Self {
                Self::Message(message.into())
            }
        })+
    };
}

outcome_from_message!(
    crate::outbound::message::TextMessage,
    crate::outbound::message::DocumentMessage,
    crate::outbound::message::PhotoMessage,
    crate::outbound::message::StickerMessage,
    crate::outbound::message::ForwardMessage,
    crate::outbound::message::MediaGroupMessage,
    crate::outbound::message::ChatActionMessage,
    crate::outbound::message::MessageWithReplies,
);

impl<T: Into<HandlerOutcome>> From<Option<T>> for HandlerOutcome {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::None)
    }
}

impl<T: Into<HandlerOutcome>> From<Vec<T>> for HandlerOutcome {
    fn from(values: Vec<T>) -> Self {
        Self::Many(values.into_iter().map(Into::into).collect())
    }
}
