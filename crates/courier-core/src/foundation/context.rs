//! Per-update dispatch context.
//!
//! [`ReplyParams`] is the derived `(chat id, message id)` addressing pair used
//! as the default reply target for everything a handler sends in response to
//! an update. One instance is derived per incoming update and discarded after
//! dispatch completes.

use crate::foundation::update::Update;

/// The default reply address derived from an incoming update.
///
/// A sendable message whose receiver is unset is delivered to `chat_id`, and
/// one whose reply target is [`ReplyTo::Inherit`](crate::outbound::ReplyTo)
/// replies to `message_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplyParams {
    /// Chat to address outbound messages to, when known.
    pub chat_id: Option<i64>,
    /// Message to reply to, when known.
    pub message_id: Option<i64>,
}

impl ReplyParams {
    /// Derives the reply address from an update.
    ///
    /// Candidates are checked in fixed priority order: `message`,
    /// `channel_post`, `edited_message`, `edited_channel_post`,
    /// `callback_query` (the chat of its message, falling back to the
    /// querying user), `inline_query` (the querying user, no message id).
    /// The first populated candidate wins.
    pub fn from_update(update: &Update) -> Self {
        for msg in [
            update.message.as_ref(),
            update.channel_post.as_ref(),
            update.edited_message.as_ref(),
            update.edited_channel_post.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            if msg.chat.id != 0 && msg.message_id != 0 {
                return Self {
                    chat_id: Some(msg.chat.id),
                    message_id: Some(msg.message_id),
                };
            }
        }

        if let Some(query) = update.callback_query.as_ref() {
            if let Some(msg) = query.message.as_ref() {
                let message_id = (msg.message_id != 0).then_some(msg.message_id);
                if msg.chat.id != 0 {
                    return Self {
                        chat_id: Some(msg.chat.id),
                        message_id,
                    };
                }
                if let Some(from) = msg.from.as_ref() {
                    if from.id != 0 {
                        return Self {
                            chat_id: Some(from.id),
                            message_id,
                        };
                    }
                }
            }
        }

        if let Some(query) = update.inline_query.as_ref() {
            if query.from.id != 0 {
                return Self {
                    chat_id: Some(query.from.id),
                    message_id: None,
                };
            }
        }

        Self::default()
    }
}
