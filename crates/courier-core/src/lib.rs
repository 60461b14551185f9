//! # Courier Core
//!
//! The core engine of the Courier bot framework: an update-dispatch layer
//! that routes incoming chat-platform events to registered filters, and an
//! outbound pipeline that turns handler return values into platform API
//! calls with retry, text chunking and content-aware formatting.
//!
//! ## Architecture Layers
//!
//! ### Foundation Layer
//!
//! Core data model:
//! - **Update model**: explicit optional-field structs ([`Update`],
//!   [`Message`]) with closed field enums for presence checks
//! - **Dispatch context**: the per-update reply address ([`ReplyParams`])
//! - **Validation errors**: [`MessageError`]
//!
//! ### Framework Layer
//!
//! Update routing:
//! - **Filter hierarchy**: predicate + handler pairs ([`UpdateFilter`],
//!   [`MessageFilter`], [`CommandFilter`])
//! - **Dispatcher**: ordered evaluation, per-filter failure isolation,
//!   abort short-circuiting ([`Dispatcher`])
//! - **Blueprints**: deferred registration groups ([`Blueprint`])
//!
//! ### Outbound Layer
//!
//! The send pipeline:
//! - **Sendable messages**: a closed set of message descriptors
//!   ([`SendableMessage`]) rendering into single platform calls
//! - **Text segmentation**: chunking at [`MAX_TEXT_LENGTH`]
//! - **Content classification**: photo-vs-document routing by MIME type
//! - **Retry policy**: bounded rate-limit recovery ([`RetryPolicy`])
//!
//! ### Integration Layer
//!
//! Boundary contracts:
//! - **Bot client**: the abstract send collaborator ([`BotApi`])
//! - **Platform calls**: one-operation descriptors ([`PlatformCall`])
//!
//! ## Dispatch flow
//!
//! ```text
//! ┌──────────┐     ┌────────────┐     ┌─────────┐     ┌─────────┐
//! │  Update  │────▶│ Dispatcher │────▶│ Filter  │────▶│ Handler │
//! └──────────┘     └────────────┘     │ Filter  │     └────┬────┘
//!                                     │ Filter  │          │ outcome
//!                                     └─────────┘          ▼
//!                  ┌────────────┐     ┌──────────────────────────┐
//!                  │   BotApi   │◀────│ Outbound pipeline        │
//!                  │ (platform) │     │ (chunk, classify, retry) │
//!                  └────────────┘     └──────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use courier_core::{CommandFilter, Dispatcher, HandlerOutcome};
//!
//! let mut dispatcher = Dispatcher::new(Arc::new(my_bot_client));
//!
//! dispatcher.register(CommandFilter::new("start", None, |_update, _args| async {
//!     Ok(HandlerOutcome::text("Welcome!"))
//! }));
//!
//! dispatcher.process_update(&update).await;
//! ```

// Architectural layers
pub mod foundation;
pub mod framework;
pub mod integration;
pub mod outbound;

// Re-export foundation types
pub use foundation::{
    CallbackQuery, Chat, InlineQuery, Message, MessageError, MessageField, MessageResult,
    ReplyParams, Update, UpdateField, User,
};

// Re-export framework types
pub use framework::{
    Blueprint, BlueprintError, BoxFuture, CommandFilter, Dispatcher, Filter, FilterKind,
    HandlerOutcome, HandlerResult, MatchValue, MessageFilter, NoMatch, StartupHook, UpdateFilter,
    command_strings,
};

// Re-export outbound types
pub use outbound::{
    ChatAction, ChatActionMessage, Classification, DocumentMessage, Envelope, FileSource,
    ForwardMessage, MAX_TEXT_LENGTH, MediaGroupMessage, MessageWithReplies, OutboundError,
    ParseMode, PhotoMessage, ReplyTo, RetryPolicy, SendableMessage, StickerMessage, TextMessage,
    classify, image_message, split_text,
};

// Re-export integration types
pub use integration::{
    ApiError, ApiResult, BotApi, InputFile, InputMedia, PlatformCall, SentMessage, WebhookConfig,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::foundation::*;
    pub use super::framework::{
        Blueprint, BoxFuture, CommandFilter, Dispatcher, Filter, HandlerOutcome, HandlerResult,
        MessageFilter, NoMatch, UpdateFilter,
    };
    pub use super::integration::{ApiError, ApiResult, BotApi, PlatformCall, SentMessage};
    pub use super::outbound::{
        ChatAction, ChatActionMessage, DocumentMessage, FileSource, ForwardMessage,
        MediaGroupMessage, MessageWithReplies, PhotoMessage, SendableMessage, StickerMessage,
        TextMessage,
    };
}
