//! Handler model of the runtime the agent is embedded in.
//!
//! The embedding runtime owns [`Matcher`]s and dispatches events to them from
//! a [`MatcherManager`]. The agent only ever observes matchers through this
//! contract: it reads their state, rewrites rules and priorities in place, and
//! learns about new registrations through [`RegistrationListener`].

mod checker;
mod event;
mod manager;
mod matcher;
mod priority;
mod rule;

pub use checker::{
    COMMAND_SEPARATOR, COMMAND_START, Checker, CheckerError, CheckerKind, CommandMatch,
    CustomCheck, RegexMatch, TextMatch,
};
pub use event::{Event, MESSAGE_EVENT};
pub use manager::{MatcherManager, RegistrationListener};
pub use matcher::{Matcher, MatcherState};
pub use priority::{MoveOutcome, PriorityIndex};
pub use rule::Rule;

/// Tracing target for host-side bookkeeping.
pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");
