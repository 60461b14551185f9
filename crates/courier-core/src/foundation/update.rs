//! The incoming update model.
//!
//! An [`Update`] is one externally-delivered chat-platform event. Exactly one
//! of its optional sub-objects is normally populated (a message, an edit, a
//! channel post, a callback query, …), and which one it is determines which
//! filters match.
//!
//! # Field presence
//!
//! Filtering never reflects over the value at runtime. "Has field" is defined
//! as "the optional field is `Some`", queried through the closed
//! [`UpdateField`] and [`MessageField`] enums:
//!
//! ```rust,ignore
//! use courier_core::{Update, UpdateField, MessageField};
//!
//! if update.has(UpdateField::Message) {
//!     let msg = update.message.as_ref().unwrap();
//!     if msg.has(MessageField::Text) { /* ... */ }
//! }
//! ```
//!
//! The structs are serde-derived so tests and embedding applications can
//! construct updates from JSON; parsing the platform's wire format is the
//! transport's job, not this crate's.

use serde::{Deserialize, Serialize};

// ============================================================================
// Update
// ============================================================================

/// One incoming chat-platform event.
///
/// Immutable for the duration of dispatch; the dispatcher only ever reads it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Update {
    /// Monotonically increasing update identifier.
    #[serde(default)]
    pub update_id: i64,
    /// New incoming message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// New version of a message that was edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_message: Option<Message>,
    /// New incoming channel post.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_post: Option<Message>,
    /// New version of a channel post that was edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_channel_post: Option<Message>,
    /// New incoming callback query (inline keyboard button press).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_query: Option<CallbackQuery>,
    /// New incoming inline query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<InlineQuery>,
}

/// Top-level optional fields of an [`Update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateField {
    /// The `message` field.
    Message,
    /// The `edited_message` field.
    EditedMessage,
    /// The `channel_post` field.
    ChannelPost,
    /// The `edited_channel_post` field.
    EditedChannelPost,
    /// The `callback_query` field.
    CallbackQuery,
    /// The `inline_query` field.
    InlineQuery,
}

impl Update {
    /// Returns `true` if the given optional field is populated.
    pub fn has(&self, field: UpdateField) -> bool {
        match field {
            UpdateField::Message => self.message.is_some(),
            UpdateField::EditedMessage => self.edited_message.is_some(),
            UpdateField::ChannelPost => self.channel_post.is_some(),
            UpdateField::EditedChannelPost => self.edited_channel_post.is_some(),
            UpdateField::CallbackQuery => self.callback_query.is_some(),
            UpdateField::InlineQuery => self.inline_query.is_some(),
        }
    }
}

// ============================================================================
// Message
// ============================================================================

/// A chat message (or channel post).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier, unique within the chat.
    #[serde(default)]
    pub message_id: i64,
    /// The chat the message belongs to.
    #[serde(default)]
    pub chat: Chat,
    /// Sender. Absent for channel posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<User>,
    /// Unix timestamp of the message.
    #[serde(default)]
    pub date: i64,
    /// Plain text content.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Caption of an attached photo or document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    /// Available photo sizes, smallest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<Vec<PhotoSize>>,
    /// Attached generic file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    /// Attached sticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker: Option<Sticker>,
    /// Attached audio file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<Audio>,
    /// Attached video.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    /// Attached voice note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
    /// Attached location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Attached contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    /// The message this one replies to, one level deep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to_message: Option<Box<Message>>,
    /// Members added to the chat by this service message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_chat_members: Option<Vec<User>>,
    /// Member removed from the chat by this service message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_chat_member: Option<User>,
}

/// Optional fields of a [`Message`] that filters can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageField {
    /// The `text` field.
    Text,
    /// The `caption` field.
    Caption,
    /// The `photo` field.
    Photo,
    /// The `document` field.
    Document,
    /// The `sticker` field.
    Sticker,
    /// The `audio` field.
    Audio,
    /// The `video` field.
    Video,
    /// The `voice` field.
    Voice,
    /// The `location` field.
    Location,
    /// The `contact` field.
    Contact,
    /// The `reply_to_message` field.
    ReplyToMessage,
    /// The `new_chat_members` field.
    NewChatMembers,
    /// The `left_chat_member` field.
    LeftChatMember,
}

impl Message {
    /// Returns `true` if the given optional field is populated.
    pub fn has(&self, field: MessageField) -> bool {
        match field {
            MessageField::Text => self.text.is_some(),
            MessageField::Caption => self.caption.is_some(),
            MessageField::Photo => self.photo.is_some(),
            MessageField::Document => self.document.is_some(),
            MessageField::Sticker => self.sticker.is_some(),
            MessageField::Audio => self.audio.is_some(),
            MessageField::Video => self.video.is_some(),
            MessageField::Voice => self.voice.is_some(),
            MessageField::Location => self.location.is_some(),
            MessageField::Contact => self.contact.is_some(),
            MessageField::ReplyToMessage => self.reply_to_message.is_some(),
            MessageField::NewChatMembers => self.new_chat_members.is_some(),
            MessageField::LeftChatMember => self.left_chat_member.is_some(),
        }
    }
}

// ============================================================================
// Supporting types
// ============================================================================

/// A chat (private conversation, group, supergroup or channel).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat identifier. Negative for groups and channels.
    #[serde(default)]
    pub id: i64,
    /// Chat type ("private", "group", "supergroup", "channel").
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Title, for groups and channels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Username, for private chats and channels when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A platform user or bot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    #[serde(default)]
    pub id: i64,
    /// `true` if this user is a bot.
    #[serde(default)]
    pub is_bot: bool,
    /// First name.
    #[serde(default)]
    pub first_name: String,
    /// Last name, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Username, if set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// One size of a photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhotoSize {
    /// File identifier usable for re-sending.
    pub file_id: String,
    /// Width in pixels.
    #[serde(default)]
    pub width: i32,
    /// Height in pixels.
    #[serde(default)]
    pub height: i32,
}

/// A generic attached file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// File identifier usable for re-sending.
    pub file_id: String,
    /// Original file name, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// MIME type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// An attached sticker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sticker {
    /// File identifier usable for re-sending.
    pub file_id: String,
    /// Associated emoji, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
}

/// An attached audio file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audio {
    /// File identifier usable for re-sending.
    pub file_id: String,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: i32,
}

/// An attached video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Video {
    /// File identifier usable for re-sending.
    pub file_id: String,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: i32,
}

/// An attached voice note.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Voice {
    /// File identifier usable for re-sending.
    pub file_id: String,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: i32,
}

/// An attached location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Location {
    /// Longitude.
    #[serde(default)]
    pub longitude: f64,
    /// Latitude.
    #[serde(default)]
    pub latitude: f64,
}

/// An attached contact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    /// Phone number.
    #[serde(default)]
    pub phone_number: String,
    /// First name.
    #[serde(default)]
    pub first_name: String,
}

/// An inline keyboard button press.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Unique query identifier.
    #[serde(default)]
    pub id: String,
    /// The user who pressed the button.
    #[serde(default)]
    pub from: User,
    /// The message the button was attached to, if still available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    /// Callback payload defined by the button.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// An incoming inline query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InlineQuery {
    /// Unique query identifier.
    #[serde(default)]
    pub id: String,
    /// The querying user.
    #[serde(default)]
    pub from: User,
    /// Query text.
    #[serde(default)]
    pub query: String,
}
