//! Wire envelope shared by both peers.
//!
//! Every frame is a JSON object `{"opid": ..., "opnm": ..., "opct": ...}`.
//! `opid` is chosen by the sender and echoed in the response; `opnm` is a
//! slash-delimited verb; `opct` is an arbitrary payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Greeting sent by the agent and echoed by the management host.
pub const HELLO: &str = "/greet/hello";
/// Termination request; the receiver echoes it and closes.
pub const BYE: &str = "/greet/bye";
/// Namespace of info provider verbs.
pub const INFO_PREFIX: &str = "/info/";
/// Namespace of action verbs.
pub const ACTION_PREFIX: &str = "/action/";
/// Verb of responses to info requests.
pub const REPORT_INFO: &str = "/event/report/info";
/// Verb of responses to action requests.
pub const REPORT_ACTION: &str = "/event/report/action";

/// One protocol frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub opid: String,
    pub opnm: String,
    #[serde(default)]
    pub opct: Value,
}

impl Message {
    /// Builds a message.
    pub fn new(opid: impl Into<String>, opnm: impl Into<String>, opct: Value) -> Self {
        Self {
            opid: opid.into(),
            opnm: opnm.into(),
            opct,
        }
    }

    /// Greeting with a fresh id and an empty object payload.
    #[must_use]
    pub fn hello() -> Self {
        Self::new(Uuid::new_v4().to_string(), HELLO, Value::Object(Map::new()))
    }

    /// Termination request with a fresh id.
    #[must_use]
    pub fn bye() -> Self {
        Self::new(Uuid::new_v4().to_string(), BYE, Value::Object(Map::new()))
    }

    /// Decodes a text frame.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the frame is not a message object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes the message as a text frame.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the payload cannot be rendered.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Classifies `opnm`.
    #[must_use]
    pub fn verb(&self) -> Verb<'_> {
        Verb::parse(&self.opnm)
    }
}

/// Routing class of a verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb<'a> {
    Hello,
    Bye,
    /// `/info/<name>`.
    Info(&'a str),
    /// `/action/<name>`; the name may itself contain slashes.
    Action(&'a str),
    /// Anything else, including responses sent back at the agent.
    Other(&'a str),
}

impl<'a> Verb<'a> {
    /// Classifies a verb string.
    #[must_use]
    pub fn parse(opnm: &'a str) -> Self {
        if opnm == HELLO {
            Self::Hello
        } else if opnm == BYE {
            Self::Bye
        } else if let Some(name) = opnm.strip_prefix(INFO_PREFIX) {
            Self::Info(name)
        } else if let Some(name) = opnm.strip_prefix(ACTION_PREFIX) {
            Self::Action(name)
        } else {
            Self::Other(opnm)
        }
    }
}
