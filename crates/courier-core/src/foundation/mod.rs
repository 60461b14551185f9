//! Foundation layer: the update data model, the per-update dispatch context
//! and the core validation errors.

pub mod context;
pub mod error;
pub mod update;

pub use context::ReplyParams;
pub use error::{MessageError, MessageResult};
pub use update::{
    Audio, CallbackQuery, Chat, Contact, Document, InlineQuery, Location, Message, MessageField,
    PhotoSize, Sticker, Update, UpdateField, User, Video, Voice,
};
