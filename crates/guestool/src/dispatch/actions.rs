//! Matcher management actions exposed under `/action/matcher/...`.

use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::errors::DispatchError;
use super::operation::{OperationTable, from_fn};
use crate::registry::{MatcherChange, MatcherRegistry};

/// Action name listing matcher ids.
pub const MATCHER_LIST: &str = "matcher/list";
/// Action name describing one matcher.
pub const MATCHER_INFO: &str = "matcher/info";
/// Action name rewriting one matcher.
pub const MATCHER_HACK: &str = "matcher/hack";
/// Action name removing one matcher.
pub const MATCHER_REMOVE: &str = "matcher/remove";

#[derive(Debug, Deserialize)]
struct Target {
    id: String,
}

#[derive(Debug, Deserialize)]
struct HackRequest {
    id: String,
    change: MatcherChange,
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, DispatchError> {
    serde_json::from_value(arguments)
        .map_err(|error| DispatchError::invalid_arguments(error.to_string()))
}

/// Builds the action table backed by `registry`.
///
/// | action | `opct` | result |
/// |---|---|---|
/// | `matcher/list` | ignored | `["<id>", ...]` |
/// | `matcher/info` | `{"id"}` | matcher description |
/// | `matcher/hack` | `{"id", "change"}` | `{"id", "status": "hacked"}` |
/// | `matcher/remove` | `{"id"}` | `{"id", "status": "removed"}` |
#[must_use]
pub fn matcher_actions(registry: &Arc<MatcherRegistry>) -> OperationTable {
    let list = Arc::clone(registry);
    let info = Arc::clone(registry);
    let hack = Arc::clone(registry);
    let remove = Arc::clone(registry);

    OperationTable::new()
        .with(
            MATCHER_LIST,
            from_fn(move |_| Ok::<_, DispatchError>(list.list())),
        )
        .with(
            MATCHER_INFO,
            from_fn(move |arguments| {
                let Target { id } = parse_args(arguments)?;
                Ok::<_, DispatchError>(info.get(&id)?)
            }),
        )
        .with(
            MATCHER_HACK,
            from_fn(move |arguments| {
                let HackRequest { id, change } = parse_args(arguments)?;
                hack.hack(&id, change)?;
                Ok::<_, DispatchError>(json!({ "id": id, "status": "hacked" }))
            }),
        )
        .with(
            MATCHER_REMOVE,
            from_fn(move |arguments| {
                let Target { id } = parse_args(arguments)?;
                remove.remove(&id)?;
                Ok::<_, DispatchError>(json!({ "id": id, "status": "removed" }))
            }),
        )
}
