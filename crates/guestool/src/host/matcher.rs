//! Host-owned handler records and their live-editable state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::event::Event;
use super::rule::Rule;

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

/// Mutable part of a matcher, replaced wholesale or field by field by hacks.
#[derive(Debug, Clone)]
pub struct MatcherState {
    /// Event type the matcher responds to. Empty accepts every type.
    pub kind: String,
    /// Matching rule.
    pub rule: Rule,
    /// Dispatch priority; lower values run first.
    pub priority: i32,
    /// Stop propagation to later priorities once this matcher fires.
    pub block: bool,
}

impl MatcherState {
    /// State for a message matcher with the given rule.
    #[must_use]
    pub fn message(rule: Rule, priority: i32, block: bool) -> Self {
        Self {
            kind: super::event::MESSAGE_EVENT.to_owned(),
            rule,
            priority,
            block,
        }
    }
}

/// Handler record owned by the host runtime.
///
/// The host holds matchers as `Arc<Matcher>`; everything else (the priority
/// index, the registry) keeps either a clone for dispatch or a `Weak`.
#[derive(Debug)]
pub struct Matcher {
    key: u64,
    plugin_name: String,
    module_name: String,
    state: RwLock<MatcherState>,
}

impl Matcher {
    /// Creates a matcher with a process-unique key.
    #[must_use]
    pub fn new(
        plugin_name: impl Into<String>,
        module_name: impl Into<String>,
        state: MatcherState,
    ) -> Arc<Self> {
        Arc::new(Self {
            key: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            plugin_name: plugin_name.into(),
            module_name: module_name.into(),
            state: RwLock::new(state),
        })
    }

    /// Process-unique key; never reused.
    #[must_use]
    pub const fn key(&self) -> u64 {
        self.key
    }

    /// Plugin that registered the matcher.
    #[must_use]
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Module that defined the matcher.
    #[must_use]
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Copy of the current state.
    #[must_use]
    pub fn state(&self) -> MatcherState {
        self.read().clone()
    }

    /// Current priority.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.read().priority
    }

    /// Whether the matcher blocks lower priorities.
    #[must_use]
    pub fn block(&self) -> bool {
        self.read().block
    }

    /// Replaces the event type, rule and block flag under one write guard,
    /// so a concurrent [`Matcher::check`] or [`Matcher::state`] never sees a
    /// mix of old and new fields.
    pub fn apply(&self, kind: impl Into<String>, rule: Rule, block: bool) {
        let mut state = self.write();
        state.kind = kind.into();
        state.rule = rule;
        state.block = block;
    }

    /// Replaces the block flag.
    pub fn set_block(&self, block: bool) {
        self.write().block = block;
    }

    // Only the priority index may change this, so the recorded priority and
    // bucket membership move together.
    pub(crate) fn set_priority(&self, priority: i32) {
        self.write().priority = priority;
    }

    /// Whether the matcher should run for `event`.
    #[must_use]
    pub fn check(&self, event: &Event) -> bool {
        let state = self.read();
        (state.kind.is_empty() || state.kind == event.kind) && state.rule.check(event)
    }

    fn read(&self) -> RwLockReadGuard<'_, MatcherState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, MatcherState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
