//! Sendable message variants.
//!
//! A [`SendableMessage`] is a value describing outbound platform traffic that
//! has not been executed yet. Handlers return them (directly, or coerced from
//! strings); the dispatcher resolves the receiver and reply target from the
//! dispatch context and pushes them through [`SendableMessage::send`], which
//! renders each variant into exactly one [`PlatformCall`] and executes it via
//! the [`BotApi`] collaborator under the variant's retry policy.
//!
//! Long text is chunked at construction time: a [`TextMessage`] stores only
//! its first chunk and chains the remainder as a sibling message sent
//! immediately after it, one platform call per chunk, in order.

use std::str::FromStr;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::warn;

use crate::foundation::context::ReplyParams;
use crate::foundation::error::{MessageError, MessageResult};
use crate::integration::api::{ApiError, BotApi, InputFile, InputMedia, PlatformCall, SentMessage};
use crate::outbound::content::{self, Classification, FileSource};
use crate::outbound::retry::RetryPolicy;
use crate::outbound::split::{MAX_TEXT_LENGTH, split_once};

/// Errors surfacing from the outbound pipeline.
#[derive(Debug, Error)]
pub enum OutboundError {
    /// The message itself was invalid or unroutable.
    #[error(transparent)]
    Message(#[from] MessageError),
    /// The platform rejected the send after retries.
    #[error(transparent)]
    Api(#[from] ApiError),
}

// ============================================================================
// Common envelope
// ============================================================================

/// Reply-target selection for a sendable message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplyTo {
    /// Reply to the dispatch context's triggering message (the default).
    #[default]
    Inherit,
    /// Send without a reply reference.
    None,
    /// Reply to a specific message.
    Message(i64),
}

impl ReplyTo {
    /// Resolves against the dispatch context's message id.
    pub fn resolve(self, inherited: Option<i64>) -> Option<i64> {
        match self {
            Self::Inherit => inherited,
            Self::None => None,
            Self::Message(id) => Some(id),
        }
    }
}

/// Attributes shared by every sendable message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Target chat; filled from the dispatch context when unset.
    pub receiver: Option<i64>,
    /// Reply-target selection.
    pub reply: ReplyTo,
    /// Deliver without a notification sound.
    pub disable_notification: bool,
}

impl Envelope {
    fn resolve_receiver(&self, reply: ReplyParams) -> MessageResult<i64> {
        self.receiver
            .or(reply.chat_id)
            .ok_or(MessageError::NoReceiver)
    }
}

// ============================================================================
// Text
// ============================================================================

/// Text formatting mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseMode {
    /// Raw text, no formatting.
    #[default]
    Plain,
    /// HTML formatting.
    Html,
    /// Markdown formatting.
    Markdown,
}

impl ParseMode {
    fn wire_value(self) -> Option<&'static str> {
        match self {
            Self::Plain => None,
            Self::Html => Some("HTML"),
            Self::Markdown => Some("Markdown"),
        }
    }
}

/// A text message, chunked at construction.
///
/// Holds the first chunk of at most [`MAX_TEXT_LENGTH`] characters; any
/// remainder lives in `next`, a chained sibling sent right after this one as
/// an independent message (not as a reply to it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMessage {
    /// Common attributes.
    pub envelope: Envelope,
    /// This chunk's text.
    pub text: String,
    /// Formatting mode.
    pub parse_mode: ParseMode,
    /// Suppress link previews. Defaults to `true`.
    pub disable_web_page_preview: bool,
    /// The chained remainder, when the original text exceeded one chunk.
    pub next: Option<Box<TextMessage>>,
}

impl TextMessage {
    /// Creates a text message, splitting `text` into a chunk chain.
    ///
    /// # Errors
    ///
    /// [`MessageError::EmptyInput`] when `text` is empty.
    pub fn new(text: impl Into<String>) -> MessageResult<Self> {
        let text = text.into();
        if text.is_empty() {
            return Err(MessageError::EmptyInput);
        }
        let (chunk, rest) = split_once(&text, MAX_TEXT_LENGTH);
        let next = if rest.is_empty() {
            None
        } else {
            Some(Box::new(Self::new(rest.to_owned())?))
        };
        Ok(Self {
            envelope: Envelope::default(),
            text: chunk.to_owned(),
            parse_mode: ParseMode::Plain,
            disable_web_page_preview: true,
            next,
        })
    }

    /// Sets the formatting mode on every chunk of the chain.
    pub fn parse_mode(mut self, mode: ParseMode) -> Self {
        self.parse_mode = mode;
        self.next = self.next.take().map(|n| Box::new((*n).parse_mode(mode)));
        self
    }

    /// Number of chunks in the chain.
    pub fn chunk_count(&self) -> usize {
        1 + self.next.as_ref().map_or(0, |n| n.chunk_count())
    }

    /// Renders this chunk (not the chain) into a platform call.
    pub fn render(&self, chat_id: i64, reply_to: Option<i64>) -> PlatformCall {
        PlatformCall::SendMessage {
            chat_id,
            text: self.text.clone(),
            parse_mode: self.parse_mode.wire_value(),
            disable_web_page_preview: self.disable_web_page_preview,
            disable_notification: self.envelope.disable_notification,
            reply_to_message_id: reply_to,
        }
    }
}

// ============================================================================
// Document / Photo
// ============================================================================

/// Default upload name when nothing better can be derived from the source.
const FALLBACK_FILE_NAME: &str = "file.blob";

/// File extensions the photo pipeline accepts as-is.
const PHOTO_EXTENSIONS: [&str; 6] = [".jpg", ".jpeg", ".gif", ".png", ".tif", ".bmp"];

/// Maximum photo caption length.
const MAX_CAPTION_LENGTH: usize = 140;

/// A generic file send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentMessage {
    /// Common attributes.
    pub envelope: Envelope,
    /// Where the file comes from.
    pub source: FileSource,
    /// Optional caption.
    pub caption: Option<String>,
    /// Explicit MIME override, used for upload-name derivation.
    pub mime: Option<String>,
}

impl DocumentMessage {
    /// Creates a document message from a file source.
    pub fn new(source: FileSource) -> Self {
        Self {
            envelope: Envelope::default(),
            source,
            caption: None,
            mime: None,
        }
    }

    /// Sets the caption.
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = Some(caption.into());
        self
    }

    /// Sets an explicit MIME type.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Renders into a platform call.
    pub fn render(&self, chat_id: i64, reply_to: Option<i64>) -> PlatformCall {
        PlatformCall::SendDocument {
            chat_id,
            file: input_file(&self.source, self.mime.as_deref()),
            caption: self.caption.clone(),
            disable_notification: self.envelope.disable_notification,
            reply_to_message_id: reply_to,
        }
    }
}

/// A photo send (platform-compressed).
///
/// Use [`image_message`] to pick between photo and document automatically
/// based on the content's MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoMessage {
    /// Common attributes.
    pub envelope: Envelope,
    /// Where the image comes from.
    pub source: FileSource,
    /// Optional caption, clipped to [`MAX_CAPTION_LENGTH`].
    pub caption: Option<String>,
    /// Explicit MIME override, used for extension normalization.
    pub mime: Option<String>,
}

impl PhotoMessage {
    /// Creates a photo message from a file source.
    pub fn new(source: FileSource) -> Self {
        Self {
            envelope: Envelope::default(),
            source,
            caption: None,
            mime: None,
        }
    }

    /// Sets the caption, clipping it to [`MAX_CAPTION_LENGTH`] characters.
    pub fn caption(mut self, caption: impl Into<String>) -> Self {
        let caption = caption.into();
        let clipped = if caption.chars().count() > MAX_CAPTION_LENGTH {
            warn!(
                len = caption.chars().count(),
                "photo caption too long, clipping"
            );
            split_once(&caption, MAX_CAPTION_LENGTH).0.to_owned()
        } else {
            caption
        };
        self.caption = Some(clipped);
        self
    }

    /// Sets an explicit MIME type.
    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Renders into a platform call, normalizing the upload extension.
    pub fn render(&self, chat_id: i64, reply_to: Option<i64>) -> PlatformCall {
        let mut file = input_file(&self.source, self.mime.as_deref());
        if let InputFile::Memory { file_name, .. } = &mut file {
            normalize_photo_extension(file_name, self.mime.as_deref());
        }
        PlatformCall::SendPhoto {
            chat_id,
            file,
            caption: self.caption.clone(),
            disable_notification: self.envelope.disable_notification,
            reply_to_message_id: reply_to,
        }
    }
}

/// Resolves a [`FileSource`] into the wire file reference.
///
/// Bytes sources derive an upload name from their hint, falling back to a
/// generic `.blob` name (or a MIME-derived extension when one was given).
fn input_file(source: &FileSource, mime: Option<&str>) -> InputFile {
    match source {
        FileSource::Id(id) => InputFile::FileId(id.clone()),
        FileSource::Url(url) => InputFile::Url(url.clone()),
        FileSource::Path(path) => InputFile::Path(path.clone()),
        FileSource::Bytes { data, name_hint } => {
            let file_name = match name_hint {
                Some(hint) => upload_name_from_hint(hint),
                None => match mime.and_then(content::extension_for_mime) {
                    Some(ext) => format!("file{ext}"),
                    None => FALLBACK_FILE_NAME.to_owned(),
                },
            };
            InputFile::Memory {
                file_name,
                data: data.clone(),
            }
        }
    }
}

/// Derives an upload file name from a path- or URL-like hint.
fn upload_name_from_hint(hint: &str) -> String {
    let hint = hint.split(['?', '#']).next().unwrap_or(hint);
    let base = hint.rsplit(['/', '\\']).next().unwrap_or(hint).trim();
    if base.is_empty() {
        return FALLBACK_FILE_NAME.to_owned();
    }
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.trim().is_empty() => base.to_owned(),
        _ => format!("{}.blob", base.trim_end_matches('.')),
    }
}

/// Forces the upload name onto the photo-extension allowlist.
fn normalize_photo_extension(file_name: &mut String, mime: Option<&str>) {
    let lower = file_name.to_ascii_lowercase();
    if PHOTO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return;
    }
    // Jpeg family is mapped by hand to avoid a ".jpe" ending.
    let ext = match mime {
        Some("image/jpg" | "image/jpeg" | "image/jpe") => ".jpg",
        Some(mime) => match content::extension_for_mime(mime) {
            Some(ext) if PHOTO_EXTENSIONS.contains(&ext) => ext,
            _ => ".png",
        },
        None => ".png",
    };
    file_name.push_str(ext);
}

/// Builds a photo or document message depending on the content's MIME type.
///
/// The source is classified first (URL sources are fetched); `image/jpeg`,
/// `image/jpg` and `image/png` become a [`PhotoMessage`], everything else a
/// [`DocumentMessage`] so the platform does not re-encode it.
///
/// # Errors
///
/// [`MessageError::UnknownMime`] when classification fails.
pub async fn image_message(
    source: FileSource,
    caption: Option<String>,
) -> MessageResult<SendableMessage> {
    let Classification { mime, is_image } = content::classify(&source, None).await?;
    let message = if is_image {
        let mut photo = PhotoMessage::new(source).mime(mime);
        if let Some(caption) = caption {
            photo = photo.caption(caption);
        }
        SendableMessage::Photo(photo)
    } else {
        let mut doc = DocumentMessage::new(source).mime(mime);
        if let Some(caption) = caption {
            doc = doc.caption(caption);
        }
        SendableMessage::Document(doc)
    };
    Ok(message)
}

// ============================================================================
// Sticker / Forward / MediaGroup / ChatAction
// ============================================================================

/// A sticker send. Always caption-less.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StickerMessage {
    /// Common attributes.
    pub envelope: Envelope,
    /// Platform file id of the sticker.
    pub file_id: String,
}

impl StickerMessage {
    /// Creates a sticker message from a platform file id.
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            envelope: Envelope::default(),
            file_id: file_id.into(),
        }
    }

    /// Renders into a platform call.
    pub fn render(&self, chat_id: i64, reply_to: Option<i64>) -> PlatformCall {
        PlatformCall::SendSticker {
            chat_id,
            file: InputFile::FileId(self.file_id.clone()),
            disable_notification: self.envelope.disable_notification,
            reply_to_message_id: reply_to,
        }
    }
}

/// A message forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardMessage {
    /// Common attributes.
    pub envelope: Envelope,
    /// Chat the original message lives in.
    pub from_chat_id: i64,
    /// Id of the message to forward.
    pub message_id: i64,
}

impl ForwardMessage {
    /// Creates a forward of `message_id` out of `from_chat_id`.
    ///
    /// # Errors
    ///
    /// [`MessageError::InvalidReference`] when either id cannot identify a
    /// real message (`from_chat_id == 0`, `message_id <= 0`).
    pub fn new(from_chat_id: i64, message_id: i64) -> MessageResult<Self> {
        if from_chat_id == 0 {
            return Err(MessageError::InvalidReference {
                what: "source chat id",
            });
        }
        if message_id <= 0 {
            return Err(MessageError::InvalidReference {
                what: "source message id",
            });
        }
        Ok(Self {
            envelope: Envelope::default(),
            from_chat_id,
            message_id,
        })
    }

    /// Renders into a platform call.
    pub fn render(&self, chat_id: i64, _reply_to: Option<i64>) -> PlatformCall {
        PlatformCall::ForwardMessage {
            chat_id,
            from_chat_id: self.from_chat_id,
            message_id: self.message_id,
            disable_notification: self.envelope.disable_notification,
        }
    }
}

/// An album of 2 to 10 photo/video items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaGroupMessage {
    /// Common attributes.
    pub envelope: Envelope,
    /// The album items.
    pub media: Vec<InputMedia>,
}

impl MediaGroupMessage {
    /// Creates a media group.
    ///
    /// # Errors
    ///
    /// [`MessageError::InvalidMediaGroup`] outside the platform's 2..=10
    /// item bounds.
    pub fn new(media: Vec<InputMedia>) -> MessageResult<Self> {
        if media.len() < 2 || media.len() > 10 {
            return Err(MessageError::InvalidMediaGroup { count: media.len() });
        }
        Ok(Self {
            envelope: Envelope::default(),
            media,
        })
    }

    /// Renders into a platform call.
    pub fn render(&self, chat_id: i64, reply_to: Option<i64>) -> PlatformCall {
        PlatformCall::SendMediaGroup {
            chat_id,
            media: self.media.clone(),
            disable_notification: self.envelope.disable_notification,
            reply_to_message_id: reply_to,
        }
    }
}

/// The fixed set of chat-action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatAction {
    /// Typing a text message.
    Typing,
    /// Recording a voice note.
    RecordAudio,
    /// Uploading a voice note.
    UploadAudio,
    /// Recording a video.
    RecordVideo,
    /// Uploading a video.
    UploadVideo,
    /// Recording a video note.
    RecordVideoNote,
    /// Uploading a video note.
    UploadVideoNote,
    /// Uploading a document.
    UploadDocument,
    /// Uploading a photo.
    UploadPhoto,
    /// Picking a location.
    FindLocation,
    /// Clears a previously sent action.
    Cancel,
}

impl ChatAction {
    /// The wire string of this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Typing => "typing",
            Self::RecordAudio => "record_audio",
            Self::UploadAudio => "upload_audio",
            Self::RecordVideo => "record_video",
            Self::UploadVideo => "upload_video",
            Self::RecordVideoNote => "record_video_note",
            Self::UploadVideoNote => "upload_video_note",
            Self::UploadDocument => "upload_document",
            Self::UploadPhoto => "upload_photo",
            Self::FindLocation => "find_location",
            Self::Cancel => "",
        }
    }
}

impl FromStr for ChatAction {
    type Err = MessageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "typing" => Self::Typing,
            "record_audio" => Self::RecordAudio,
            "upload_audio" => Self::UploadAudio,
            "record_video" => Self::RecordVideo,
            "upload_video" => Self::UploadVideo,
            "record_video_note" => Self::RecordVideoNote,
            "upload_video_note" => Self::UploadVideoNote,
            "upload_document" => Self::UploadDocument,
            "upload_photo" => Self::UploadPhoto,
            "find_location" => Self::FindLocation,
            "" => Self::Cancel,
            other => return Err(MessageError::InvalidAction(other.to_owned())),
        })
    }
}

/// A typing-indicator (chat action) send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatActionMessage {
    /// Common attributes. Chat actions never carry a reply reference.
    pub envelope: Envelope,
    /// The action to display.
    pub action: ChatAction,
}

impl ChatActionMessage {
    /// Creates a chat-action message.
    pub fn new(action: ChatAction) -> Self {
        Self {
            envelope: Envelope::default(),
            action,
        }
    }

    /// Convenience constructor for the common typing indicator.
    pub fn typing() -> Self {
        Self::new(ChatAction::Typing)
    }

    /// Renders into a platform call.
    pub fn render(&self, chat_id: i64, _reply_to: Option<i64>) -> PlatformCall {
        PlatformCall::SendChatAction {
            chat_id,
            action: self.action.as_str(),
        }
    }
}

// ============================================================================
// MessageWithReplies
// ============================================================================

/// A top message with replies addressed to it before it exists.
///
/// Sending delivers the top message first, captures its resulting message id,
/// then sends every reply with that id as the reply target. Replies may
/// themselves be [`MessageWithReplies`]; nesting is flattened depth-first at
/// send time. Receipts are returned in send order, top first.
#[derive(Debug, Clone)]
pub struct MessageWithReplies {
    /// The parent message.
    pub top: Box<SendableMessage>,
    /// Replies to the parent, in send order.
    pub replies: Vec<SendableMessage>,
}

impl MessageWithReplies {
    /// Creates a reply chain.
    pub fn new(top: impl Into<SendableMessage>, replies: Vec<SendableMessage>) -> Self {
        Self {
            top: Box::new(top.into()),
            replies,
        }
    }
}

// ============================================================================
// SendableMessage
// ============================================================================

/// The closed set of outbound message descriptors.
#[derive(Debug, Clone)]
pub enum SendableMessage {
    /// A text message (chunk chain).
    Text(TextMessage),
    /// A generic file.
    Document(DocumentMessage),
    /// A compressed photo.
    Photo(PhotoMessage),
    /// A sticker.
    Sticker(StickerMessage),
    /// A forwarded message.
    Forward(ForwardMessage),
    /// A photo/video album.
    MediaGroup(MediaGroupMessage),
    /// A typing indicator.
    ChatAction(ChatActionMessage),
    /// A top message with dependent replies.
    WithReplies(MessageWithReplies),
}

impl SendableMessage {
    /// Creates a plain text message.
    pub fn text(text: impl Into<String>) -> MessageResult<Self> {
        TextMessage::new(text).map(Self::Text)
    }

    /// `true` when none of the content-bearing fields are set.
    ///
    /// Empty messages are skipped by the pipeline, never sent.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(m) => m.text.is_empty(),
            Self::Document(_) | Self::Photo(_) | Self::Sticker(_) | Self::Forward(_) => false,
            Self::MediaGroup(m) => m.media.is_empty(),
            Self::ChatAction(_) => false,
            Self::WithReplies(m) => m.top.is_empty(),
        }
    }

    /// The retry policy for this variant.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Text(_) | Self::Photo(_) | Self::Forward(_) => RetryPolicy::PRIORITY,
            Self::Document(_) | Self::Sticker(_) | Self::MediaGroup(_) | Self::ChatAction(_) => {
                RetryPolicy::GENERIC
            }
            // Composite: each child picks its own policy.
            Self::WithReplies(m) => m.top.retry_policy(),
        }
    }

    fn envelope_mut(&mut self) -> &mut Envelope {
        match self {
            Self::Text(m) => &mut m.envelope,
            Self::Document(m) => &mut m.envelope,
            Self::Photo(m) => &mut m.envelope,
            Self::Sticker(m) => &mut m.envelope,
            Self::Forward(m) => &mut m.envelope,
            Self::MediaGroup(m) => &mut m.envelope,
            Self::ChatAction(m) => &mut m.envelope,
            Self::WithReplies(m) => m.top.envelope_mut(),
        }
    }

    fn envelope(&self) -> &Envelope {
        match self {
            Self::Text(m) => &m.envelope,
            Self::Document(m) => &m.envelope,
            Self::Photo(m) => &m.envelope,
            Self::Sticker(m) => &m.envelope,
            Self::Forward(m) => &m.envelope,
            Self::MediaGroup(m) => &m.envelope,
            Self::ChatAction(m) => &m.envelope,
            Self::WithReplies(m) => m.top.envelope(),
        }
    }

    /// Sets an explicit receiver chat.
    pub fn receiver(mut self, chat_id: i64) -> Self {
        self.envelope_mut().receiver = Some(chat_id);
        self
    }

    /// Replies to a specific message instead of the dispatch context's.
    pub fn reply_to(mut self, message_id: i64) -> Self {
        self.envelope_mut().reply = ReplyTo::Message(message_id);
        self
    }

    /// Sends without any reply reference.
    pub fn no_reply(mut self) -> Self {
        self.envelope_mut().reply = ReplyTo::None;
        self
    }

    /// Delivers silently.
    pub fn silent(mut self) -> Self {
        self.envelope_mut().disable_notification = true;
        self
    }

    /// Sends this message through the bot client.
    ///
    /// The receiver falls back to `reply.chat_id` and the reply target to
    /// `reply.message_id` (per the envelope's [`ReplyTo`] selection). Text
    /// chains issue one call per chunk; reply chains send the top message
    /// first and address the replies to its resulting id. Returns the
    /// receipts of all issued calls, in order.
    pub fn send<'a>(
        &'a self,
        api: &'a dyn BotApi,
        reply: ReplyParams,
    ) -> BoxFuture<'a, Result<Vec<SentMessage>, OutboundError>> {
        Box::pin(async move {
            let chat_id = self.envelope().resolve_receiver(reply)?;
            let reply_to = self.envelope().reply.resolve(reply.message_id);
            let policy = self.retry_policy();

            match self {
                Self::Text(message) => {
                    let mut receipts = Vec::new();
                    let mut chunk = Some(message);
                    while let Some(current) = chunk {
                        let call = current.render(chat_id, reply_to);
                        receipts.push(execute(api, policy, call).await?);
                        chunk = current.next.as_deref();
                    }
                    Ok(receipts)
                }
                Self::Document(m) => {
                    Ok(vec![execute(api, policy, m.render(chat_id, reply_to)).await?])
                }
                Self::Photo(m) => {
                    Ok(vec![execute(api, policy, m.render(chat_id, reply_to)).await?])
                }
                Self::Sticker(m) => {
                    Ok(vec![execute(api, policy, m.render(chat_id, reply_to)).await?])
                }
                Self::Forward(m) => {
                    Ok(vec![execute(api, policy, m.render(chat_id, reply_to)).await?])
                }
                Self::MediaGroup(m) => {
                    Ok(vec![execute(api, policy, m.render(chat_id, reply_to)).await?])
                }
                Self::ChatAction(m) => {
                    Ok(vec![execute(api, policy, m.render(chat_id, reply_to)).await?])
                }
                Self::WithReplies(chain) => {
                    let mut receipts = chain.top.send(api, reply).await?;
                    let top_id = receipts.first().and_then(|r| r.message_id);
                    let child_reply = ReplyParams {
                        chat_id: Some(chat_id),
                        message_id: top_id,
                    };
                    for child in &chain.replies {
                        receipts.extend(child.send(api, child_reply).await?);
                    }
                    Ok(receipts)
                }
            }
        })
    }
}

/// Executes one rendered call under the given retry policy.
async fn execute(
    api: &dyn BotApi,
    policy: RetryPolicy,
    call: PlatformCall,
) -> Result<SentMessage, OutboundError> {
    let receipt = policy
        .run(|omit_reply| {
            let call = if omit_reply {
                call.without_reply()
            } else {
                call.clone()
            };
            async move { api.call(call).await }
        })
        .await?;
    Ok(receipt)
}

impl From<TextMessage> for SendableMessage {
    fn from(m: TextMessage) -> Self {
        Self::Text(m)
    }
}

impl From<DocumentMessage> for SendableMessage {
    fn from(m: DocumentMessage) -> Self {
        Self::Document(m)
    }
}

impl From<PhotoMessage> for SendableMessage {
    fn from(m: PhotoMessage) -> Self {
        Self::Photo(m)
    }
}

impl From<StickerMessage> for SendableMessage {
    fn from(m: StickerMessage) -> Self {
        Self::Sticker(m)
    }
}

impl From<ForwardMessage> for SendableMessage {
    fn from(m: ForwardMessage) -> Self {
        Self::Forward(m)
    }
}

impl From<MediaGroupMessage> for SendableMessage {
    fn from(m: MediaGroupMessage) -> Self {
        Self::MediaGroup(m)
    }
}

impl From<ChatActionMessage> for SendableMessage {
    fn from(m: ChatActionMessage) -> Self {
        Self::ChatAction(m)
    }
}

impl From<MessageWithReplies> for SendableMessage {
    fn from(m: MessageWithReplies) -> Self {
        Self::WithReplies(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;
    use crate::integration::api::ApiResult;

    /// Records every call and returns increasing message ids.
    struct RecordingApi {
        calls: Mutex<Vec<PlatformCall>>,
        next_id: AtomicI64,
        fail_first_reply: bool,
    }

    impl RecordingApi {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(100),
                fail_first_reply: false,
            }
        }

        fn calls(&self) -> Vec<PlatformCall> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl BotApi for RecordingApi {
        async fn call(&self, call: PlatformCall) -> ApiResult<SentMessage> {
            if self.fail_first_reply && call.reply_to().is_some() {
                return Err(ApiError::server(400, "Bad Request: reply message not found"));
            }
            let chat_id = call.chat_id();
            self.calls.lock().push(call);
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(SentMessage::new(chat_id, id))
        }
    }

    fn ctx() -> ReplyParams {
        ReplyParams {
            chat_id: Some(10),
            message_id: Some(7),
        }
    }

    #[test]
    fn empty_text_is_rejected() {
        assert!(matches!(
            TextMessage::new(""),
            Err(MessageError::EmptyInput)
        ));
    }

    #[test]
    fn long_text_chains_a_sibling() {
        let msg = TextMessage::new("x".repeat(5000)).unwrap();
        assert_eq!(msg.chunk_count(), 2);
        assert_eq!(msg.text.chars().count(), MAX_TEXT_LENGTH);
        assert_eq!(
            msg.next.as_ref().unwrap().text.chars().count(),
            5000 - MAX_TEXT_LENGTH
        );
    }

    #[tokio::test]
    async fn five_thousand_chars_issue_two_ordered_sends() {
        let api = RecordingApi::new();
        let msg = SendableMessage::text("x".repeat(5000)).unwrap();
        let receipts = msg.send(&api, ctx()).await.unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(receipts.len(), 2);
        let (first_text, second_text) = match (&calls[0], &calls[1]) {
            (
                PlatformCall::SendMessage { text: a, reply_to_message_id: ra, .. },
                PlatformCall::SendMessage { text: b, reply_to_message_id: rb, .. },
            ) => {
                // Neither chunk replies to the other.
                assert_eq!(*ra, Some(7));
                assert_eq!(*rb, Some(7));
                (a.clone(), b.clone())
            }
            other => panic!("unexpected calls: {other:?}"),
        };
        assert_eq!(format!("{first_text}{second_text}"), "x".repeat(5000));
    }

    #[tokio::test]
    async fn with_replies_addresses_children_to_top_id() {
        let api = RecordingApi::new();
        let chain = MessageWithReplies::new(
            TextMessage::new("top").unwrap(),
            vec![
                SendableMessage::text("first reply").unwrap(),
                SendableMessage::text("second reply").unwrap(),
            ],
        );
        let receipts = SendableMessage::from(chain).send(&api, ctx()).await.unwrap();

        assert_eq!(receipts.len(), 3);
        let calls = api.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].reply_to(), Some(7)); // top replies to the trigger
        assert_eq!(calls[1].reply_to(), Some(100)); // replies go to the top's id
        assert_eq!(calls[2].reply_to(), Some(100));
        assert_eq!(receipts[0].message_id, Some(100));
    }

    #[tokio::test]
    async fn nested_reply_chains_flatten_depth_first() {
        let api = RecordingApi::new();
        let inner = MessageWithReplies::new(
            TextMessage::new("inner top").unwrap(),
            vec![SendableMessage::text("inner reply").unwrap()],
        );
        let outer = MessageWithReplies::new(
            TextMessage::new("outer top").unwrap(),
            vec![inner.into(), SendableMessage::text("outer reply").unwrap()],
        );
        SendableMessage::from(outer).send(&api, ctx()).await.unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 4);
        // outer top (100) <- inner top (101) <- inner reply; outer reply -> 100.
        assert_eq!(calls[1].reply_to(), Some(100));
        assert_eq!(calls[2].reply_to(), Some(101));
        assert_eq!(calls[3].reply_to(), Some(100));
    }

    #[tokio::test]
    async fn reply_target_missing_falls_back_to_no_reply() {
        let mut api = RecordingApi::new();
        api.fail_first_reply = true;
        let msg = SendableMessage::text("hello").unwrap();
        let receipts = msg.send(&api, ctx()).await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(api.calls()[0].reply_to(), None);
    }

    #[tokio::test]
    async fn explicit_receiver_overrides_context() {
        let api = RecordingApi::new();
        let msg = SendableMessage::text("hi").unwrap().receiver(999).no_reply();
        msg.send(&api, ctx()).await.unwrap();
        let calls = api.calls();
        assert_eq!(calls[0].chat_id(), 999);
        assert_eq!(calls[0].reply_to(), None);
    }

    #[tokio::test]
    async fn missing_receiver_is_an_error() {
        let api = RecordingApi::new();
        let msg = SendableMessage::text("hi").unwrap();
        let result = msg.send(&api, ReplyParams::default()).await;
        assert!(matches!(
            result,
            Err(OutboundError::Message(MessageError::NoReceiver))
        ));
    }

    #[test]
    fn forward_validates_references() {
        assert!(ForwardMessage::new(0, 5).is_err());
        assert!(ForwardMessage::new(-100123, 0).is_err());
        let fwd = ForwardMessage::new(-100123, 5).unwrap();
        match fwd.render(10, None) {
            PlatformCall::ForwardMessage {
                from_chat_id,
                message_id,
                ..
            } => {
                assert_eq!(from_chat_id, -100123);
                assert_eq!(message_id, 5);
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[test]
    fn media_group_bounds() {
        let item = |name: &str| InputMedia::Photo {
            media: InputFile::Url(format!("https://example.com/{name}")),
            caption: None,
        };
        assert!(matches!(
            MediaGroupMessage::new(vec![item("a")]),
            Err(MessageError::InvalidMediaGroup { count: 1 })
        ));
        assert!(MediaGroupMessage::new(vec![item("a"), item("b")]).is_ok());
        assert!(MediaGroupMessage::new((0..11).map(|i| item(&i.to_string())).collect()).is_err());
    }

    #[test]
    fn two_item_media_group_is_not_empty() {
        let item = InputMedia::Photo {
            media: InputFile::FileId("a".into()),
            caption: None,
        };
        let group = MediaGroupMessage::new(vec![item.clone(), item]).unwrap();
        assert!(!SendableMessage::MediaGroup(group).is_empty());
    }

    #[test]
    fn chat_action_parsing() {
        assert_eq!("typing".parse::<ChatAction>().unwrap(), ChatAction::Typing);
        assert_eq!("".parse::<ChatAction>().unwrap(), ChatAction::Cancel);
        assert!(matches!(
            "dancing".parse::<ChatAction>(),
            Err(MessageError::InvalidAction(_))
        ));
    }

    #[test]
    fn photo_extension_normalization() {
        let photo = PhotoMessage::new(FileSource::Bytes {
            data: vec![0xFF, 0xD8, 0xFF],
            name_hint: Some("shot.dat".into()),
        })
        .mime("image/jpeg");
        match photo.render(1, None) {
            PlatformCall::SendPhoto { file, .. } => {
                assert_eq!(file.file_name(), Some("shot.dat.jpg"));
            }
            other => panic!("unexpected call: {other:?}"),
        }

        // Inconclusive mime defaults to .png.
        let photo = PhotoMessage::new(FileSource::bytes(vec![1, 2, 3]));
        match photo.render(1, None) {
            PlatformCall::SendPhoto { file, .. } => {
                assert_eq!(file.file_name(), Some("file.blob.png"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[test]
    fn document_upload_names() {
        let doc = DocumentMessage::new(FileSource::Bytes {
            data: vec![1],
            name_hint: Some("/tmp/reports/q3.pdf".into()),
        });
        match doc.render(1, None) {
            PlatformCall::SendDocument { file, .. } => {
                assert_eq!(file.file_name(), Some("q3.pdf"));
            }
            other => panic!("unexpected call: {other:?}"),
        }

        let doc = DocumentMessage::new(FileSource::bytes(vec![1])).mime("application/pdf");
        match doc.render(1, None) {
            PlatformCall::SendDocument { file, .. } => {
                assert_eq!(file.file_name(), Some("file.pdf"));
            }
            other => panic!("unexpected call: {other:?}"),
        }

        let doc = DocumentMessage::new(FileSource::bytes(vec![1]));
        match doc.render(1, None) {
            PlatformCall::SendDocument { file, .. } => {
                assert_eq!(file.file_name(), Some("file.blob"));
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[test]
    fn photo_caption_is_clipped() {
        let photo = PhotoMessage::new(FileSource::Id("abc".into())).caption("c".repeat(200));
        assert!(photo.caption.as_ref().unwrap().chars().count() <= 140);

        let photo = PhotoMessage::new(FileSource::Id("abc".into())).caption("short");
        assert_eq!(photo.caption.as_deref(), Some("short"));
    }

    #[tokio::test]
    async fn image_message_routes_png_to_photo_and_gif_to_document() {
        let png = FileSource::bytes(vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]);
        assert!(matches!(
            image_message(png, None).await.unwrap(),
            SendableMessage::Photo(_)
        ));

        let gif = FileSource::bytes(b"GIF89a......".to_vec());
        assert!(matches!(
            image_message(gif, None).await.unwrap(),
            SendableMessage::Document(_)
        ));
    }

    #[test]
    fn retry_policies_per_variant() {
        assert_eq!(
            SendableMessage::text("a").unwrap().retry_policy(),
            RetryPolicy::PRIORITY
        );
        assert_eq!(
            SendableMessage::Sticker(StickerMessage::new("s")).retry_policy(),
            RetryPolicy::GENERIC
        );
        assert_eq!(
            SendableMessage::Forward(ForwardMessage::new(1, 1).unwrap()).retry_policy(),
            RetryPolicy::PRIORITY
        );
    }
}
