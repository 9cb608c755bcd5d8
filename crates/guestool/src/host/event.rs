//! The event view that checkers inspect.

/// Event type carried by chat messages. Text checkers only inspect these.
pub const MESSAGE_EVENT: &str = "message";

/// The slice of an incoming host event that rule checkers inspect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Event type, for example `message` or `notice`.
    pub kind: String,
    /// Plain-text rendering of the message body.
    pub plaintext: String,
    /// Whether the event addressed the bot directly.
    pub to_me: bool,
}

impl Event {
    /// Builds a message event with the given text.
    #[must_use]
    pub fn message(plaintext: impl Into<String>) -> Self {
        Self {
            kind: MESSAGE_EVENT.to_owned(),
            plaintext: plaintext.into(),
            to_me: false,
        }
    }

    /// Builds a non-message event of the given type.
    #[must_use]
    pub fn of_kind(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Marks the event as addressed to the bot.
    #[must_use]
    pub fn addressed_to_me(mut self) -> Self {
        self.to_me = true;
        self
    }

    /// Whether this is a message event.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.kind == MESSAGE_EVENT
    }
}
