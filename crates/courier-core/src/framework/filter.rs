//! The filter hierarchy.
//!
//! A [`Filter`] is a predicate + handler pair. The predicate decides whether
//! an update is for this filter — declining with [`NoMatch`] rather than a
//! boolean, so that "filtered out" stays distinct from "matched with an empty
//! result" (a command with no trailing text matches with a `None`
//! [`MatchValue`], which is not the same as not matching at all).
//!
//! Three filter shapes cover the registration surface:
//!
//! - [`UpdateFilter`] — matches when a set of top-level update fields is
//!   present (an empty set matches everything).
//! - [`MessageFilter`] — narrows to updates carrying a message, further
//!   filtered by required message fields; the handler receives the message.
//! - [`CommandFilter`] — narrows to text messages whose leading token is one
//!   of the filter's command strings, extracting the trailing argument text.
//!
//! ```rust,ignore
//! use courier_core::{CommandFilter, HandlerOutcome};
//!
//! let start = CommandFilter::new("start", None, |_update, _args| async {
//!     Ok(HandlerOutcome::text("Welcome!"))
//! });
//! dispatcher.register(start);
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;

use crate::foundation::update::{Message, MessageField, Update, UpdateField};
use crate::framework::handler::{BoxFuture, HandlerResult, MatchValue};

/// Returned by a filter predicate when an update does **not** match.
///
/// The dispatcher recognises this error, logs at debug level only, and moves
/// on to the next filter. All other handler errors are genuine failures.
#[derive(Debug, Clone, Error)]
#[error("filter declined the update")]
pub struct NoMatch;

/// The kind of a filter, for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Matches on top-level update fields.
    Update,
    /// Matches on message fields.
    Message,
    /// Matches a slash command.
    Command,
}

/// A predicate + handler pair deciding whether and how to react to an update.
///
/// Predicates are pure: no side effects, no mutation of the update. Filters
/// are stateless across evaluations apart from the command-string cache of
/// [`CommandFilter`].
pub trait Filter: Send + Sync {
    /// The kind of this filter.
    fn kind(&self) -> FilterKind;

    /// Human-readable description used in log lines.
    fn describe(&self) -> String;

    /// Evaluates the predicate against an update.
    ///
    /// Returns the extracted [`MatchValue`] on a match; [`NoMatch`] when this
    /// filter does not apply.
    fn check(&self, update: &Update) -> Result<MatchValue, NoMatch>;

    /// Invokes the registered handler with the update and the match result.
    fn call(&self, update: &Update, matched: MatchValue) -> BoxFuture<'static, HandlerResult>;
}

/// Checks that every required field is present on the update.
fn has_update_fields(update: &Update, required: &[UpdateField]) -> bool {
    required.iter().all(|field| update.has(*field))
}

/// Checks that every required field is present on the message.
fn has_message_fields(message: &Message, required: &[MessageField]) -> bool {
    required.iter().all(|field| message.has(*field))
}

// ============================================================================
// UpdateFilter
// ============================================================================

type UpdateHandlerFn = dyn Fn(Update) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Filter matching on the presence of top-level update fields.
///
/// An empty requirement list matches every update.
pub struct UpdateFilter {
    required: Vec<UpdateField>,
    handler: Arc<UpdateHandlerFn>,
}

impl UpdateFilter {
    /// Creates an update filter.
    pub fn new<F, Fut>(required: impl Into<Vec<UpdateField>>, handler: F) -> Self
    where
        F: Fn(Update) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            required: required.into(),
            handler: Arc::new(move |update| Box::pin(handler(update))),
        }
    }

    /// Creates a filter matching every update.
    pub fn any<F, Fut>(handler: F) -> Self
    where
        F: Fn(Update) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(Vec::new(), handler)
    }
}

impl Filter for UpdateFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Update
    }

    fn describe(&self) -> String {
        if self.required.is_empty() {
            "update filter matching every update".to_owned()
        } else {
            format!("update filter requiring {:?}", self.required)
        }
    }

    fn check(&self, update: &Update) -> Result<MatchValue, NoMatch> {
        if has_update_fields(update, &self.required) {
            Ok(None)
        } else {
            Err(NoMatch)
        }
    }

    fn call(&self, update: &Update, _matched: MatchValue) -> BoxFuture<'static, HandlerResult> {
        (self.handler)(update.clone())
    }
}

// ============================================================================
// MessageFilter
// ============================================================================

type MessageHandlerFn = dyn Fn(Update, Message) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Filter matching updates that carry a message with the required fields.
///
/// The handler is invoked with the update and its message.
pub struct MessageFilter {
    required: Vec<MessageField>,
    handler: Arc<MessageHandlerFn>,
}

impl MessageFilter {
    /// Creates a message filter.
    pub fn new<F, Fut>(required: impl Into<Vec<MessageField>>, handler: F) -> Self
    where
        F: Fn(Update, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self {
            required: required.into(),
            handler: Arc::new(move |update, message| Box::pin(handler(update, message))),
        }
    }

    /// Creates a filter matching every message, unfiltered.
    pub fn any<F, Fut>(handler: F) -> Self
    where
        F: Fn(Update, Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(Vec::new(), handler)
    }
}

impl Filter for MessageFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Message
    }

    fn describe(&self) -> String {
        if self.required.is_empty() {
            "message filter matching every message".to_owned()
        } else {
            format!("message filter requiring {:?}", self.required)
        }
    }

    fn check(&self, update: &Update) -> Result<MatchValue, NoMatch> {
        let message = update.message.as_ref().ok_or(NoMatch)?;
        if has_message_fields(message, &self.required) {
            Ok(None)
        } else {
            Err(NoMatch)
        }
    }

    fn call(&self, update: &Update, _matched: MatchValue) -> BoxFuture<'static, HandlerResult> {
        let Some(message) = update.message.clone() else {
            return Box::pin(async { Err(anyhow::anyhow!("message filter invoked without a message")) });
        };
        (self.handler)(update.clone(), message)
    }
}

// ============================================================================
// CommandFilter
// ============================================================================

type CommandHandlerFn =
    dyn Fn(Update, Option<String>) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// Cached command/username state behind the read-mostly lock.
struct CommandState {
    command: String,
    username: Option<String>,
    /// Derived from `command` and `username`; regenerated on write, never
    /// during matching.
    command_strings: Vec<String>,
}

impl CommandState {
    fn regenerate(&mut self) {
        self.command_strings = command_strings(&self.command, self.username.as_deref());
    }
}

/// All textual forms a command can take in an incoming message.
///
/// For command `"foo"` and username `"bot"`: `/foo`, `command:///foo` (the
/// alternate client representation), and — only when a username is set —
/// `/foo@bot` and `command:///foo@bot`. Matching is case-sensitive and exact
/// on the leading token.
pub fn command_strings(command: &str, username: Option<&str>) -> Vec<String> {
    let mut strings = vec![format!("/{command}"), format!("command:///{command}")];
    if let Some(username) = username {
        strings.push(format!("/{command}@{username}"));
        strings.push(format!("command:///{command}@{username}"));
    }
    strings
}

/// Filter matching text messages whose leading token is one of the filter's
/// command strings.
///
/// The match result carries the trailing argument text, trimmed; a command
/// with no trailing text matches with `None`.
pub struct CommandFilter {
    state: RwLock<CommandState>,
    handler: Arc<CommandHandlerFn>,
}

impl CommandFilter {
    /// Creates a command filter for `command`, optionally recognising the
    /// `@username`-suffixed forms.
    pub fn new<F, Fut>(
        command: impl Into<String>,
        username: Option<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(Update, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let mut state = CommandState {
            command: command.into(),
            username,
            command_strings: Vec::new(),
        };
        state.regenerate();
        Self {
            state: RwLock::new(state),
            handler: Arc::new(move |update, text| Box::pin(handler(update, text))),
        }
    }

    /// The command this filter matches.
    pub fn command(&self) -> String {
        self.state.read().command.clone()
    }

    /// The username whose suffixed forms this filter recognises.
    pub fn username(&self) -> Option<String> {
        self.state.read().username.clone()
    }

    /// A snapshot of the cached command strings.
    pub fn command_strings(&self) -> Vec<String> {
        self.state.read().command_strings.clone()
    }

    /// Changes the command, regenerating the cached strings.
    pub fn set_command(&self, command: impl Into<String>) {
        let command = command.into();
        let mut state = self.state.write();
        if state.command == command {
            return;
        }
        state.command = command;
        state.regenerate();
    }

    /// Changes the username, regenerating the cached strings.
    pub fn set_username(&self, username: Option<String>) {
        let mut state = self.state.write();
        if state.username == username {
            return;
        }
        state.username = username;
        state.regenerate();
    }
}

impl Filter for CommandFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::Command
    }

    fn describe(&self) -> String {
        let state = self.state.read();
        match &state.username {
            Some(username) => format!(
                "command filter for /{} including the @{username} forms",
                state.command
            ),
            None => format!("command filter for /{}", state.command),
        }
    }

    fn check(&self, update: &Update) -> Result<MatchValue, NoMatch> {
        let text = update
            .message
            .as_ref()
            .and_then(|m| m.text.as_deref())
            .ok_or(NoMatch)?;
        let text = text.trim();

        let state = self.state.read();
        if state.command_strings.iter().any(|c| c == text) {
            return Ok(None);
        }
        if let Some((token, rest)) = text.split_once(' ') {
            if state.command_strings.iter().any(|c| c == token) {
                return Ok(Some(rest.trim().to_owned()));
            }
        }
        Err(NoMatch)
    }

    fn call(&self, update: &Update, matched: MatchValue) -> BoxFuture<'static, HandlerResult> {
        (self.handler)(update.clone(), matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framework::handler::HandlerOutcome;
    use serde_json::json;

    fn text_update(text: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 2,
                "chat": {"id": 3, "type": "private"},
                "text": text
            }
        }))
        .unwrap()
    }

    fn noop_command() -> CommandFilter {
        CommandFilter::new("start", None, |_, _| async { Ok(HandlerOutcome::None) })
    }

    #[test]
    fn update_filter_empty_requirements_match_all() {
        let filter = UpdateFilter::any(|_| async { Ok(HandlerOutcome::None) });
        assert!(filter.check(&Update::default()).is_ok());
    }

    #[test]
    fn update_filter_requires_fields() {
        let filter = UpdateFilter::new([UpdateField::InlineQuery], |_| async {
            Ok(HandlerOutcome::None)
        });
        assert!(filter.check(&text_update("hi")).is_err());

        let update: Update = serde_json::from_value(json!({
            "update_id": 1,
            "inline_query": {"id": "q", "from": {"id": 5}, "query": ""}
        }))
        .unwrap();
        assert!(filter.check(&update).is_ok());
    }

    #[test]
    fn message_filter_requires_message_then_fields() {
        let filter = MessageFilter::new([MessageField::Photo], |_, _| async {
            Ok(HandlerOutcome::None)
        });
        assert!(filter.check(&Update::default()).is_err());
        assert!(filter.check(&text_update("hi")).is_err());

        let update: Update = serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 2,
                "chat": {"id": 3, "type": "private"},
                "photo": [{"file_id": "p"}]
            }
        }))
        .unwrap();
        assert!(filter.check(&update).is_ok());
    }

    #[test]
    fn command_strings_cover_all_forms() {
        let strings = command_strings("foo", Some("bot"));
        assert!(strings.contains(&"/foo".to_owned()));
        assert!(strings.contains(&"command:///foo".to_owned()));
        assert!(strings.contains(&"/foo@bot".to_owned()));
        assert!(strings.contains(&"command:///foo@bot".to_owned()));

        let strings = command_strings("foo", None);
        assert_eq!(strings.len(), 2);
        assert!(!strings.iter().any(|s| s.contains('@')));
    }

    #[test]
    fn command_matches_bare_and_with_args() {
        let filter = noop_command();
        assert_eq!(filter.check(&text_update("/start")).unwrap(), None);
        assert_eq!(
            filter.check(&text_update("/start extra args")).unwrap(),
            Some("extra args".to_owned())
        );
        // Surrounding whitespace is tolerated.
        assert_eq!(filter.check(&text_update("  /start  ")).unwrap(), None);
    }

    #[test]
    fn command_has_no_word_boundary_confusion() {
        let filter = noop_command();
        assert!(filter.check(&text_update("/startbar")).is_err());
        assert!(filter.check(&text_update("start")).is_err());
        assert!(filter.check(&text_update("say /start")).is_err());
    }

    #[test]
    fn command_matching_is_case_sensitive() {
        let filter = noop_command();
        assert!(filter.check(&text_update("/START")).is_err());
    }

    #[test]
    fn command_username_forms() {
        let filter = CommandFilter::new("start", Some("mybot".into()), |_, _| async {
            Ok(HandlerOutcome::None)
        });
        assert_eq!(filter.check(&text_update("/start@mybot")).unwrap(), None);
        assert_eq!(
            filter.check(&text_update("/start@mybot go")).unwrap(),
            Some("go".to_owned())
        );
        assert!(filter.check(&text_update("/start@otherbot")).is_err());
    }

    #[test]
    fn command_cache_regenerates_on_write() {
        let filter = noop_command();
        assert!(filter.check(&text_update("/start")).is_ok());

        filter.set_command("begin");
        assert!(filter.check(&text_update("/start")).is_err());
        assert!(filter.check(&text_update("/begin")).is_ok());

        filter.set_username(Some("mybot".into()));
        assert!(filter.check(&text_update("/begin@mybot")).is_ok());
        assert_eq!(filter.command_strings().len(), 4);

        // No-op writes leave the cache alone.
        filter.set_command("begin");
        assert_eq!(filter.command(), "begin");
    }

    #[test]
    fn command_without_text_declines() {
        let filter = noop_command();
        let update: Update = serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 2,
                "chat": {"id": 3, "type": "private"},
                "sticker": {"file_id": "s"}
            }
        }))
        .unwrap();
        assert!(filter.check(&update).is_err());
        assert!(filter.check(&Update::default()).is_err());
    }

    #[tokio::test]
    async fn handlers_receive_match_values() {
        let filter = CommandFilter::new("echo", None, |_, text| async move {
            Ok(HandlerOutcome::from(text))
        });
        let update = text_update("/echo hello");
        let matched = filter.check(&update).unwrap();
        let outcome = filter.call(&update, matched).await.unwrap();
        match outcome {
            HandlerOutcome::Text(text) => assert_eq!(text, "hello"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
