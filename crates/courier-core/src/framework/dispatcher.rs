//! The update dispatcher.
//!
//! The [`Dispatcher`] owns an ordered collection of filters and a list of
//! startup hooks, and routes each incoming update through them:
//!
//! 1. Filters are evaluated strictly in registration order — first
//!    registered, first evaluated, no reordering by specificity.
//! 2. A declined filter ([`NoMatch`]) just advances to the next one.
//! 3. A matching filter's handler runs; its failure is logged and isolated —
//!    the update is still offered to the remaining filters.
//! 4. A handler's [`HandlerOutcome`] is coerced into sendable messages and
//!    pushed through the outbound pipeline, addressed by the update's
//!    [`ReplyParams`]. Send failures surviving retry are logged and that
//!    message dropped; later messages in the batch still go out.
//! 5. [`HandlerOutcome::Abort`] stops iteration over the remaining filters
//!    for this update only; its replacement value, if any, is still sent.
//!
//! Dispatch of one update is fully sequential: all matching filters run and
//! all resulting sends (including retries) complete before `process_update`
//! returns. Hosts wanting concurrency run one dispatch task per update — see
//! `courier-runtime`'s worker.

use std::sync::Arc;

use tracing::{Instrument, Level, debug, error, span, warn};

use crate::foundation::context::ReplyParams;
use crate::foundation::update::Update;
use crate::framework::filter::{Filter, NoMatch};
use crate::framework::handler::{BoxFuture, HandlerOutcome};
use crate::integration::api::BotApi;
use crate::outbound::message::SendableMessage;

/// An async hook run at startup.
pub type StartupHook = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// The central update dispatcher.
///
/// Filter and hook lists are per-instance state, mutated only at
/// registration time — never during dispatch.
pub struct Dispatcher {
    api: Arc<dyn BotApi>,
    filters: Vec<Arc<dyn Filter>>,
    startup_hooks: Vec<StartupHook>,
    startup_already_run: bool,
    attached_blueprints: Vec<(String, u64)>,
}

impl Dispatcher {
    /// Creates a dispatcher sending through the given bot client.
    pub fn new(api: Arc<dyn BotApi>) -> Self {
        Self {
            api,
            filters: Vec::new(),
            startup_hooks: Vec::new(),
            startup_already_run: false,
            attached_blueprints: Vec::new(),
        }
    }

    /// The bot client this dispatcher sends through.
    pub fn api(&self) -> &Arc<dyn BotApi> {
        &self.api
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Registers a filter at the end of the evaluation order.
    ///
    /// Returns the shared handle, which can later be passed to
    /// [`remove`](Self::remove).
    pub fn register<F: Filter + 'static>(&mut self, filter: F) -> Arc<dyn Filter> {
        let filter: Arc<dyn Filter> = Arc::new(filter);
        self.register_arc(Arc::clone(&filter));
        filter
    }

    /// Registers an already-shared filter.
    pub fn register_arc(&mut self, filter: Arc<dyn Filter>) {
        debug!(filter = %filter.describe(), "registering filter");
        self.filters.push(filter);
    }

    /// Removes a previously registered filter (identity comparison).
    ///
    /// Removing a filter that is not registered logs a warning and does
    /// nothing else.
    pub fn remove(&mut self, filter: &Arc<dyn Filter>) {
        let before = self.filters.len();
        self.filters.retain(|f| !Arc::ptr_eq(f, filter));
        if self.filters.len() == before {
            warn!(filter = %filter.describe(), "filter already removed");
        }
    }

    /// Number of registered filters.
    pub fn filter_count(&self) -> usize {
        self.filters.len()
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    /// Adds a startup hook.
    ///
    /// Hooks run in registration order from [`do_startup`](Self::do_startup).
    /// A hook added after startup already ran is run immediately.
    pub async fn on_startup<F, Fut>(&mut self, hook: F) -> anyhow::Result<()>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let hook: StartupHook = Arc::new(move || Box::pin(hook()));
        self.add_startup_hook(hook).await
    }

    /// Adds an already-shared startup hook.
    pub async fn add_startup_hook(&mut self, hook: StartupHook) -> anyhow::Result<()> {
        self.startup_hooks.push(Arc::clone(&hook));
        if self.startup_already_run {
            hook().await?;
        }
        Ok(())
    }

    /// Runs all startup hooks in registration order.
    ///
    /// A failing hook is logged and its error propagated; later hooks do not
    /// run.
    pub async fn do_startup(&mut self) -> anyhow::Result<()> {
        for hook in &self.startup_hooks {
            if let Err(err) = hook().await {
                error!(error = %err, "startup hook failed");
                return Err(err);
            }
        }
        self.startup_already_run = true;
        Ok(())
    }

    /// Whether [`do_startup`](Self::do_startup) has completed.
    pub fn startup_already_run(&self) -> bool {
        self.startup_already_run
    }

    // ------------------------------------------------------------------
    // Blueprints
    // ------------------------------------------------------------------

    /// Records a blueprint attachment, rejecting a name collision between
    /// distinct blueprints. Re-attaching the same blueprint is allowed.
    pub(crate) fn note_blueprint(&mut self, name: &str, id: u64) -> bool {
        match self.attached_blueprints.iter().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing == id,
            None => {
                self.attached_blueprints.push((name.to_owned(), id));
                true
            }
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Routes one update through the registered filters.
    pub async fn process_update(&self, update: &Update) {
        let span = span!(Level::DEBUG, "dispatch", update_id = update.update_id);
        self.dispatch(update).instrument(span).await;
    }

    async fn dispatch(&self, update: &Update) {
        let reply = ReplyParams::from_update(update);

        for filter in &self.filters {
            let matched = match filter.check(update) {
                Ok(matched) => matched,
                Err(NoMatch) => {
                    debug!(filter = %filter.describe(), "filter did not match");
                    continue;
                }
            };

            match filter.call(update, matched).await {
                Ok(outcome) => {
                    if self.process_result(outcome, reply).await {
                        debug!(filter = %filter.describe(), "handler aborted further processing");
                        return;
                    }
                }
                Err(err) => {
                    // Isolated per filter: the update is still offered to
                    // the remaining filters.
                    error!(filter = %filter.describe(), error = ?err, "handler failed");
                }
            }
        }
    }

    /// Coerces a handler outcome and sends the resulting messages.
    ///
    /// Returns `true` when the outcome asked to abort processing.
    async fn process_result(&self, outcome: HandlerOutcome, reply: ReplyParams) -> bool {
        let mut messages = Vec::new();
        let abort = flatten_outcome(outcome, &mut messages);
        self.send_messages(messages, reply).await;
        abort
    }

    /// Sends a batch of messages; partial failure is expected and non-fatal.
    async fn send_messages(&self, messages: Vec<SendableMessage>, reply: ReplyParams) {
        for message in messages {
            if message.is_empty() {
                debug!("skipping empty message");
                continue;
            }
            if let Err(err) = message.send(self.api.as_ref(), reply).await {
                error!(error = %err, "failed to send message");
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("filter_count", &self.filters.len())
            .field("startup_hooks", &self.startup_hooks.len())
            .field("startup_already_run", &self.startup_already_run)
            .finish()
    }
}

/// Flattens a handler outcome into sendables, in order.
///
/// Returns `true` when an abort was requested; elements after a nested abort
/// are dropped.
fn flatten_outcome(outcome: HandlerOutcome, out: &mut Vec<SendableMessage>) -> bool {
    match outcome {
        HandlerOutcome::None => false,
        HandlerOutcome::Text(text) => {
            match SendableMessage::text(text) {
                Ok(message) => out.push(message),
                Err(err) => warn!(error = %err, "dropping invalid text result"),
            }
            false
        }
        HandlerOutcome::Message(message) => {
            out.push(message);
            false
        }
        HandlerOutcome::Many(outcomes) => {
            for outcome in outcomes {
                if flatten_outcome(outcome, out) {
                    return true;
                }
            }
            false
        }
        HandlerOutcome::Abort { replacement } => {
            if let Some(replacement) = replacement {
                flatten_outcome(*replacement, out);
            }
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use crate::framework::filter::{CommandFilter, MessageFilter, UpdateFilter};
    use crate::integration::api::{ApiResult, PlatformCall, SentMessage};

    struct RecordingApi {
        calls: Mutex<Vec<PlatformCall>>,
        next_id: AtomicI64,
    }

    impl RecordingApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                next_id: AtomicI64::new(500),
            })
        }

        fn calls(&self) -> Vec<PlatformCall> {
            self.calls.lock().clone()
        }

        fn texts(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    PlatformCall::SendMessage { text, .. } => Some(text),
                    _ => None,
                })
                .collect()
        }
    }

    #[async_trait]
    impl BotApi for RecordingApi {
        async fn call(&self, call: PlatformCall) -> ApiResult<SentMessage> {
            let chat_id = call.chat_id();
            self.calls.lock().push(call);
            Ok(SentMessage::new(
                chat_id,
                self.next_id.fetch_add(1, Ordering::SeqCst),
            ))
        }
    }

    fn text_update(text: &str) -> Update {
        serde_json::from_value(json!({
            "update_id": 1,
            "message": {
                "message_id": 7,
                "chat": {"id": 42, "type": "private"},
                "text": text
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn start_command_scenario() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());

        let seen_args: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&seen_args);
        dispatcher.register(CommandFilter::new("start", None, move |_, text| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().push(text);
                Ok(HandlerOutcome::text("Welcome!"))
            }
        }));

        dispatcher.process_update(&text_update("/start")).await;
        assert_eq!(seen_args.lock().as_slice(), &[None]);
        assert_eq!(api.texts(), vec!["Welcome!".to_owned()]);
        match &api.calls()[0] {
            PlatformCall::SendMessage {
                chat_id,
                reply_to_message_id,
                ..
            } => {
                assert_eq!(*chat_id, 42);
                assert_eq!(*reply_to_message_id, Some(7));
            }
            other => panic!("unexpected call: {other:?}"),
        }

        dispatcher.process_update(&text_update("/start extra args")).await;
        assert_eq!(seen_args.lock()[1].as_deref(), Some("extra args"));
    }

    #[tokio::test]
    async fn failing_handler_does_not_block_others() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());

        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::text("first"))
        }));
        dispatcher.register(UpdateFilter::any(|_| async {
            anyhow::bail!("boom")
        }));
        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::text("third"))
        }));

        dispatcher.process_update(&text_update("hi")).await;
        assert_eq!(api.texts(), vec!["first".to_owned(), "third".to_owned()]);
    }

    #[tokio::test]
    async fn filters_run_in_registration_order() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());

        // A catch-all registered before the more specific command still runs
        // first.
        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::text("generic"))
        }));
        dispatcher.register(CommandFilter::new("ping", None, |_, _| async {
            Ok(HandlerOutcome::text("pong"))
        }));

        dispatcher.process_update(&text_update("/ping")).await;
        assert_eq!(api.texts(), vec!["generic".to_owned(), "pong".to_owned()]);
    }

    #[tokio::test]
    async fn abort_stops_remaining_filters_and_sends_replacement() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());

        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::abort_with("stopping here"))
        }));
        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::text("never sent"))
        }));

        dispatcher.process_update(&text_update("hi")).await;
        assert_eq!(api.texts(), vec!["stopping here".to_owned()]);
    }

    #[tokio::test]
    async fn abort_without_replacement_sends_nothing() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());

        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::abort())
        }));
        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::text("never sent"))
        }));

        dispatcher.process_update(&text_update("hi")).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn list_results_are_sent_in_order() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());

        dispatcher.register(MessageFilter::any(|_, _| async {
            Ok(HandlerOutcome::from(vec!["one", "two", "three"]))
        }));

        dispatcher.process_update(&text_update("hi")).await;
        assert_eq!(
            api.texts(),
            vec!["one".to_owned(), "two".to_owned(), "three".to_owned()]
        );
    }

    #[tokio::test]
    async fn none_outcome_sends_nothing() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());
        dispatcher.register(UpdateFilter::any(|_| async { Ok(HandlerOutcome::None) }));
        dispatcher.process_update(&text_update("hi")).await;
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn send_failure_does_not_stop_the_batch() {
        struct FlakyApi {
            calls: AtomicUsize,
            sent: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl BotApi for FlakyApi {
            async fn call(&self, call: PlatformCall) -> ApiResult<SentMessage> {
                let n = self.calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    return Err(crate::integration::api::ApiError::server(
                        403,
                        "Forbidden: bot was blocked by the user",
                    ));
                }
                if let PlatformCall::SendMessage { text, .. } = call {
                    self.sent.lock().push(text);
                }
                Ok(SentMessage::new(1, n as i64))
            }
        }

        let api = Arc::new(FlakyApi {
            calls: AtomicUsize::new(0),
            sent: Mutex::new(Vec::new()),
        });
        let mut dispatcher = Dispatcher::new(api.clone());
        dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::from(vec!["dropped", "delivered"]))
        }));

        dispatcher.process_update(&text_update("hi")).await;
        assert_eq!(api.sent.lock().as_slice(), &["delivered".to_owned()]);
    }

    #[tokio::test]
    async fn removing_a_filter_stops_its_dispatch() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api.clone());

        let handle = dispatcher.register(UpdateFilter::any(|_| async {
            Ok(HandlerOutcome::text("present"))
        }));
        dispatcher.process_update(&text_update("hi")).await;
        assert_eq!(api.texts().len(), 1);

        dispatcher.remove(&handle);
        assert_eq!(dispatcher.filter_count(), 0);
        dispatcher.process_update(&text_update("hi")).await;
        assert_eq!(api.texts().len(), 1);

        // Removing twice only warns.
        dispatcher.remove(&handle);
    }

    #[tokio::test]
    async fn startup_hooks_run_in_order_and_late_hooks_run_immediately() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api);

        let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        for i in 0..2 {
            let order = Arc::clone(&order);
            dispatcher
                .on_startup(move || {
                    let order = Arc::clone(&order);
                    async move {
                        order.lock().push(i);
                        Ok(())
                    }
                })
                .await
                .unwrap();
        }
        assert!(order.lock().is_empty());

        dispatcher.do_startup().await.unwrap();
        assert_eq!(order.lock().as_slice(), &[0, 1]);
        assert!(dispatcher.startup_already_run());

        let order2 = Arc::clone(&order);
        dispatcher
            .on_startup(move || {
                let order = Arc::clone(&order2);
                async move {
                    order.lock().push(9);
                    Ok(())
                }
            })
            .await
            .unwrap();
        assert_eq!(order.lock().as_slice(), &[0, 1, 9]);
    }

    #[tokio::test]
    async fn failing_startup_hook_propagates() {
        let api = RecordingApi::new();
        let mut dispatcher = Dispatcher::new(api);
        dispatcher
            .on_startup(|| async { anyhow::bail!("bad boot") })
            .await
            .unwrap();
        assert!(dispatcher.do_startup().await.is_err());
        assert!(!dispatcher.startup_already_run());
    }
}
