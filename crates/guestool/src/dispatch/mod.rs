//! Request dispatch for the management protocol.
//!
//! Frames exchanged with the management host are JSON envelopes:
//!
//! ```json
//! {"opid":"5d0c...","opnm":"/action/matcher/list","opct":{}}
//! ```
//!
//! The agent answers each request with an envelope carrying the same `opid`:
//!
//! ```json
//! {"opid":"5d0c...","opnm":"/event/report/action","opct":["0f1e..."]}
//! ```
//!
//! ## Routing
//!
//! `/info/<name>` requests are served by info providers: the built-in
//! `system_platform` and `time` providers plus whatever the embedding host
//! supplies. `/action/<name>` requests are served by the matcher actions
//! (`matcher/list`, `matcher/info`, `matcher/hack`, `matcher/remove`).
//! Unknown names produce error payloads; the connection stays open.

mod actions;
mod errors;
mod info;
mod message;
mod operation;
mod router;

pub use self::actions::{MATCHER_HACK, MATCHER_INFO, MATCHER_LIST, MATCHER_REMOVE, matcher_actions};
pub use self::errors::{DispatchError, UNKNOWN_ACTION, UNKNOWN_INFO};
pub use self::info::{PlatformInfo, SYSTEM_PLATFORM, TIME, TimeInfo, builtin_info};
pub use self::message::{
    ACTION_PREFIX, BYE, HELLO, INFO_PREFIX, Message, REPORT_ACTION, REPORT_INFO, Verb,
};
pub use self::operation::{Operation, OperationTable, from_async_fn, from_fn};
pub use self::router::MessageRouter;
