//! Rules: conjunctions of checkers evaluated against host events.

use super::checker::Checker;
use super::event::Event;

/// Conjunction of checkers. A rule without checkers accepts every event.
#[derive(Debug, Clone, Default)]
pub struct Rule {
    checkers: Vec<Checker>,
}

impl Rule {
    /// Builds a rule from its checkers.
    #[must_use]
    pub fn new(checkers: Vec<Checker>) -> Self {
        Self { checkers }
    }

    /// Adds another checker to the conjunction.
    #[must_use]
    pub fn and(mut self, checker: Checker) -> Self {
        self.checkers.push(checker);
        self
    }

    /// Checkers in evaluation order.
    #[must_use]
    pub fn checkers(&self) -> &[Checker] {
        &self.checkers
    }

    /// Whether every checker accepts the event.
    #[must_use]
    pub fn check(&self, event: &Event) -> bool {
        self.checkers.iter().all(|checker| checker.check(event))
    }
}

impl From<Checker> for Rule {
    fn from(checker: Checker) -> Self {
        Self::new(vec![checker])
    }
}
