//! Outbound message pipeline: sendable message variants, text segmentation,
//! content classification and the retry policy.

pub mod content;
pub mod message;
pub mod retry;
pub mod split;

pub use content::{Classification, FileSource, classify};
pub use message::{
    ChatAction, ChatActionMessage, DocumentMessage, Envelope, ForwardMessage, MediaGroupMessage,
    MessageWithReplies, OutboundError, ParseMode, PhotoMessage, ReplyTo, SendableMessage,
    StickerMessage, TextMessage, image_message,
};
pub use retry::RetryPolicy;
pub use split::{MAX_TEXT_LENGTH, split_text};
