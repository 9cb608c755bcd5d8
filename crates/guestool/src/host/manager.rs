//! The host's matcher table and its registration extension point.

use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use tracing::debug;

use super::HOST_TARGET;
use super::event::Event;
use super::matcher::Matcher;
use super::priority::{MoveOutcome, PriorityIndex};

/// Notified after the host registers a matcher.
pub trait RegistrationListener: Send + Sync {
    /// Called once per registration, after the matcher is indexed.
    fn matcher_registered(&self, matcher: &Arc<Matcher>);
}

/// Owns every registered matcher and serves the dispatch read path.
///
/// Mutations hold the write lock for their whole update; dispatch passes work
/// from a [`snapshot`](Self::snapshot) so they never observe a half-moved
/// matcher.
#[derive(Default)]
pub struct MatcherManager {
    index: RwLock<PriorityIndex>,
    listeners: Mutex<Vec<Weak<dyn RegistrationListener>>>,
}

impl MatcherManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a matcher and notifies listeners.
    pub fn register(&self, matcher: Arc<Matcher>) {
        let inserted = self.write().insert(Arc::clone(&matcher));
        if !inserted {
            debug!(target: HOST_TARGET, key = matcher.key(), "matcher already registered");
            return;
        }
        for listener in self.live_listeners() {
            listener.matcher_registered(&matcher);
        }
    }

    /// Removes a matcher from dispatch.
    pub fn unregister(&self, matcher: &Matcher) -> bool {
        self.write().remove(matcher)
    }

    /// Moves a matcher to another priority bucket.
    pub fn move_priority(&self, matcher: &Arc<Matcher>, priority: i32) -> MoveOutcome {
        self.write().move_to(matcher, priority)
    }

    /// Subscribes to future registrations.
    ///
    /// Listeners are held weakly and dropped once they are gone.
    pub fn subscribe(&self, listener: Weak<dyn RegistrationListener>) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Copy of the index for one dispatch pass.
    #[must_use]
    pub fn snapshot(&self) -> PriorityIndex {
        self.read().clone()
    }

    /// Every registered matcher in dispatch order.
    #[must_use]
    pub fn matchers(&self) -> Vec<Arc<Matcher>> {
        self.read()
            .iter()
            .flat_map(|(_, bucket)| bucket.iter().cloned())
            .collect()
    }

    /// Matchers that would run for `event`, honouring priority order and
    /// `block`.
    #[must_use]
    pub fn candidates(&self, event: &Event) -> Vec<Arc<Matcher>> {
        let snapshot = self.snapshot();
        let mut selected = Vec::new();
        for (_, bucket) in snapshot.iter() {
            let mut blocked = false;
            for matcher in bucket.iter().filter(|matcher| matcher.check(event)) {
                blocked |= matcher.block();
                selected.push(Arc::clone(matcher));
            }
            if blocked {
                break;
            }
        }
        selected
    }

    fn live_listeners(&self) -> Vec<Arc<dyn RegistrationListener>> {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|listener| listener.strong_count() > 0);
        listeners.iter().filter_map(Weak::upgrade).collect()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, PriorityIndex> {
        self.index.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, PriorityIndex> {
        self.index.write().unwrap_or_else(PoisonError::into_inner)
    }
}
