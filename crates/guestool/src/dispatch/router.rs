//! Verb routing for inbound requests.
//!
//! `/info/<name>` requests go to the info provider table and are answered on
//! `/event/report/info`; `/action/<name>` requests go to the action table and
//! are answered on `/event/report/action`. Any other namespace reaching the
//! router is answered as an unknown action. The response always echoes the
//! request's `opid`.

use serde_json::Value;
use tracing::{debug, warn};

use super::errors::DispatchError;
use super::message::{Message, REPORT_ACTION, REPORT_INFO, Verb};
use super::operation::OperationTable;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Resolves request verbs against the info and action tables.
#[derive(Debug, Clone, Default)]
pub struct MessageRouter {
    info: OperationTable,
    actions: OperationTable,
}

impl MessageRouter {
    /// Creates a router over the given provider and action tables.
    #[must_use]
    pub fn new(info: OperationTable, actions: OperationTable) -> Self {
        Self { info, actions }
    }

    /// Registered info provider names.
    pub fn info_names(&self) -> impl Iterator<Item = &str> {
        self.info.names()
    }

    /// Registered action names.
    pub fn action_names(&self) -> impl Iterator<Item = &str> {
        self.actions.names()
    }

    /// Runs one request and builds its response.
    ///
    /// Failures never escape: they become an `{"error": ...}` payload on the
    /// response verb matching the request's namespace.
    pub async fn route(&self, request: Message) -> Message {
        let Message { opid, opnm, opct } = request;
        let (report, outcome) = match Verb::parse(&opnm) {
            Verb::Info(name) => (REPORT_INFO, self.invoke_info(name, opct).await),
            Verb::Action(name) => (REPORT_ACTION, self.invoke_action(name, opct).await),
            Verb::Hello | Verb::Bye | Verb::Other(_) => (
                REPORT_ACTION,
                Err(DispatchError::unknown_action(opnm.as_str())),
            ),
        };

        let opct = match outcome {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    target: DISPATCH_TARGET,
                    opid = %opid,
                    opnm = %opnm,
                    kind = error.kind(),
                    error = %error,
                    "request failed"
                );
                error.payload()
            }
        };
        Message::new(opid, report, opct)
    }

    async fn invoke_info(&self, name: &str, arguments: Value) -> Result<Value, DispatchError> {
        let provider = self
            .info
            .get(name)
            .ok_or_else(|| DispatchError::unknown_info(name))?;
        debug!(target: DISPATCH_TARGET, provider = name, "running info provider");
        provider.invoke(arguments).await
    }

    async fn invoke_action(&self, name: &str, arguments: Value) -> Result<Value, DispatchError> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| DispatchError::unknown_action(name))?;
        debug!(target: DISPATCH_TARGET, action = name, "running action");
        action.invoke(arguments).await
    }
}
