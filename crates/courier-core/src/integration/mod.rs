//! Integration layer: the boundary contracts toward the platform client.

pub mod api;

pub use api::{
    ApiError, ApiResult, BotApi, InputFile, InputMedia, PlatformCall, SentMessage, WebhookConfig,
};
