//! Framework layer: filters, handler outcomes, the dispatcher and
//! deferred-registration blueprints.

pub mod blueprint;
pub mod dispatcher;
pub mod filter;
pub mod handler;

pub use blueprint::{Blueprint, BlueprintError};
pub use dispatcher::{Dispatcher, StartupHook};
pub use filter::{
    CommandFilter, Filter, FilterKind, MessageFilter, NoMatch, UpdateFilter, command_strings,
};
pub use handler::{BoxFuture, HandlerOutcome, HandlerResult, MatchValue};
