//! Stable external identities for host matchers.
//!
//! The registry gives every matcher the host registers a UUID the management
//! host can address it by. It never owns matchers: entries hold `Weak`
//! references and are evicted the first time a lookup finds the matcher gone.
//! Matchers registered before the registry was installed are enumerated once
//! at install time; later ones arrive through the host's
//! [`RegistrationListener`] extension point.

pub mod codec;
mod errors;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::host::{Matcher, MatcherManager, MoveOutcome, RegistrationListener};

pub use codec::{CommandRule, CommonMatchRule, RegexRule, RuleDescriptor};
pub use errors::RegistryError;

/// Tracing target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Read-only view of a tracked matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherInfo {
    pub id: String,
    pub plugin_name: String,
    pub module_name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rule: RuleDescriptor,
    pub priority: i32,
    pub block: bool,
}

/// Replacement state applied by [`MatcherRegistry::hack`].
///
/// Extra fields, such as the read-only names echoed back from
/// [`MatcherInfo`], are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatcherChange {
    #[serde(rename = "type")]
    pub kind: String,
    pub rule: RuleDescriptor,
    pub priority: i32,
    pub block: bool,
}

#[derive(Debug)]
struct Tracked {
    sequence: u64,
    matcher: Weak<Matcher>,
}

#[derive(Debug, Default)]
struct Entries {
    by_id: HashMap<String, Tracked>,
    by_key: HashMap<u64, String>,
    next_sequence: u64,
}

impl Entries {
    fn forget(&mut self, id: &str) -> Option<Tracked> {
        let tracked = self.by_id.remove(id)?;
        self.by_key.retain(|_, tracked_id| tracked_id != id);
        Some(tracked)
    }

    fn prune(&mut self) {
        self.by_id
            .retain(|_, tracked| tracked.matcher.strong_count() > 0);
        let by_id = &self.by_id;
        self.by_key.retain(|_, id| by_id.contains_key(id));
    }
}

/// Id-addressed access to the host's matchers.
pub struct MatcherRegistry {
    host: Arc<MatcherManager>,
    entries: Mutex<Entries>,
}

impl MatcherRegistry {
    /// Creates a registry, enumerates the host's existing matchers, and
    /// subscribes to future registrations.
    ///
    /// The subscription is made before enumerating so no matcher registered
    /// in between is missed; duplicates are folded by matcher key.
    #[must_use]
    pub fn install(host: Arc<MatcherManager>) -> Arc<Self> {
        let registry = Arc::new(Self {
            host: Arc::clone(&host),
            entries: Mutex::new(Entries::default()),
        });
        let listener: Arc<dyn RegistrationListener> = registry.clone();
        host.subscribe(Arc::downgrade(&listener));

        let existing = host.matchers();
        for matcher in &existing {
            registry.track(matcher);
        }
        info!(
            target: REGISTRY_TARGET,
            matchers = existing.len(),
            "matcher registry installed"
        );
        registry
    }

    /// Assigns an id to `matcher`, or returns the one it already has.
    pub fn track(&self, matcher: &Arc<Matcher>) -> String {
        let mut entries = self.lock();
        if let Some(id) = entries.by_key.get(&matcher.key()) {
            return id.clone();
        }

        let id = Uuid::new_v4().to_string();
        let sequence = entries.next_sequence;
        entries.next_sequence += 1;
        entries.by_id.insert(
            id.clone(),
            Tracked {
                sequence,
                matcher: Arc::downgrade(matcher),
            },
        );
        entries.by_key.insert(matcher.key(), id.clone());
        debug!(
            target: REGISTRY_TARGET,
            id = %id,
            plugin = matcher.plugin_name(),
            module = matcher.module_name(),
            "assigned matcher id"
        );
        id
    }

    /// Ids of every live matcher, in assignment order.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut entries = self.lock();
        entries.prune();
        let mut ids: Vec<(u64, String)> = entries
            .by_id
            .iter()
            .map(|(id, tracked)| (tracked.sequence, id.clone()))
            .collect();
        ids.sort_unstable_by_key(|(sequence, _)| *sequence);
        ids.into_iter().map(|(_, id)| id).collect()
    }

    /// Describes one matcher.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown or expired ids, and the
    /// codec's errors when the matcher's rule has no structured form.
    pub fn get(&self, id: &str) -> Result<MatcherInfo, RegistryError> {
        let matcher = self.lookup(id)?;
        let state = matcher.state();
        Ok(MatcherInfo {
            id: id.to_owned(),
            plugin_name: matcher.plugin_name().to_owned(),
            module_name: matcher.module_name().to_owned(),
            kind: state.kind,
            rule: codec::decode(&state.rule)?,
            priority: state.priority,
            block: state.block,
        })
    }

    /// Applies a change to a live matcher.
    ///
    /// The rule is validated before anything is touched, so a rejected change
    /// leaves the matcher as it was.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown or expired ids and
    /// [`RegistryError::Validation`] when the new rule cannot be built.
    pub fn hack(&self, id: &str, change: MatcherChange) -> Result<(), RegistryError> {
        let matcher = self.lookup(id)?;
        let rule = codec::encode(&change.rule)?;

        matcher.apply(change.kind, rule, change.block);
        let moved = self.host.move_priority(&matcher, change.priority);

        info!(
            target: REGISTRY_TARGET,
            id,
            match_type = %change.rule.match_type(),
            priority = change.priority,
            block = change.block,
            priority_moved = matches!(moved, MoveOutcome::Moved { .. }),
            "hacked matcher"
        );
        Ok(())
    }

    /// Unregisters a matcher from the host and forgets its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for unknown or expired ids.
    pub fn remove(&self, id: &str) -> Result<(), RegistryError> {
        let matcher = self.lookup(id)?;
        let unregistered = self.host.unregister(&matcher);
        self.lock().forget(id);
        info!(target: REGISTRY_TARGET, id, unregistered, "removed matcher");
        Ok(())
    }

    fn lookup(&self, id: &str) -> Result<Arc<Matcher>, RegistryError> {
        let mut entries = self.lock();
        let upgraded = entries
            .by_id
            .get(id)
            .map(|tracked| tracked.matcher.upgrade());
        match upgraded {
            Some(Some(matcher)) => Ok(matcher),
            Some(None) => {
                entries.forget(id);
                debug!(target: REGISTRY_TARGET, id, "evicted expired matcher");
                Err(RegistryError::not_found(id))
            }
            None => Err(RegistryError::not_found(id)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RegistrationListener for MatcherRegistry {
    fn matcher_registered(&self, matcher: &Arc<Matcher>) {
        self.track(matcher);
    }
}
