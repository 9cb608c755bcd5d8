//! Priority buckets the host dispatches matchers from.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, trace, warn};

use super::HOST_TARGET;
use super::matcher::Matcher;

/// Result of [`PriorityIndex::move_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The matcher changed buckets.
    Moved {
        /// Previous priority.
        from: i32,
        /// New priority.
        to: i32,
    },
    /// Requested priority equals the current one.
    Unchanged,
    /// The matcher is not in the bucket its priority points at.
    Missing,
}

/// Ordered map from priority to the matchers dispatched at it.
///
/// Each live matcher sits in exactly one bucket, at exactly one position, and
/// empty buckets are removed.
#[derive(Debug, Default, Clone)]
pub struct PriorityIndex {
    buckets: BTreeMap<i32, Vec<Arc<Matcher>>>,
}

impl PriorityIndex {
    /// Appends a matcher to the bucket for its current priority.
    ///
    /// Returns `false` when the matcher was already indexed.
    pub fn insert(&mut self, matcher: Arc<Matcher>) -> bool {
        if self.contains(&matcher) {
            return false;
        }
        self.buckets
            .entry(matcher.priority())
            .or_default()
            .push(matcher);
        true
    }

    /// Removes a matcher from its bucket, dropping the bucket if it empties.
    pub fn remove(&mut self, matcher: &Matcher) -> bool {
        let priority = matcher.priority();
        let Some(bucket) = self.buckets.get_mut(&priority) else {
            return false;
        };
        let Some(position) = position_of(bucket, matcher) else {
            return false;
        };
        bucket.remove(position);
        if bucket.is_empty() {
            self.buckets.remove(&priority);
        }
        true
    }

    /// Moves a matcher to the back of the bucket for `priority`.
    pub fn move_to(&mut self, matcher: &Arc<Matcher>, priority: i32) -> MoveOutcome {
        let current = matcher.priority();
        let Some(bucket) = self.buckets.get_mut(&current) else {
            warn!(
                target: HOST_TARGET,
                key = matcher.key(),
                from = current,
                to = priority,
                "matcher not included in its priority bucket; cannot move"
            );
            return MoveOutcome::Missing;
        };
        let Some(position) = position_of(bucket, matcher) else {
            warn!(
                target: HOST_TARGET,
                key = matcher.key(),
                from = current,
                to = priority,
                "matcher not included in its priority bucket; cannot move"
            );
            return MoveOutcome::Missing;
        };
        if current == priority {
            info!(
                target: HOST_TARGET,
                key = matcher.key(),
                priority,
                "priority not changed; skipped"
            );
            return MoveOutcome::Unchanged;
        }

        let entry = bucket.remove(position);
        if bucket.is_empty() {
            self.buckets.remove(&current);
            trace!(target: HOST_TARGET, priority = current, "removed empty priority bucket");
        }
        self.buckets.entry(priority).or_default().push(entry);
        matcher.set_priority(priority);
        info!(
            target: HOST_TARGET,
            key = matcher.key(),
            from = current,
            to = priority,
            "updated matcher priority"
        );
        MoveOutcome::Moved {
            from: current,
            to: priority,
        }
    }

    /// Whether the matcher is indexed under its current priority.
    #[must_use]
    pub fn contains(&self, matcher: &Matcher) -> bool {
        self.buckets
            .get(&matcher.priority())
            .is_some_and(|bucket| position_of(bucket, matcher).is_some())
    }

    /// Matchers at one priority, in dispatch order.
    #[must_use]
    pub fn bucket(&self, priority: i32) -> Option<&[Arc<Matcher>]> {
        self.buckets.get(&priority).map(Vec::as_slice)
    }

    /// Priorities that currently have matchers, ascending.
    pub fn priorities(&self) -> impl Iterator<Item = i32> + '_ {
        self.buckets.keys().copied()
    }

    /// Buckets in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &[Arc<Matcher>])> {
        self.buckets
            .iter()
            .map(|(priority, bucket)| (*priority, bucket.as_slice()))
    }

    /// Number of indexed matchers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

fn position_of(bucket: &[Arc<Matcher>], matcher: &Matcher) -> Option<usize> {
    bucket
        .iter()
        .position(|entry| std::ptr::eq(Arc::as_ptr(entry), matcher))
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::host::{MatcherState, Rule};

    fn matcher(priority: i32) -> Arc<Matcher> {
        Matcher::new(
            "plugin",
            "plugin.module",
            MatcherState::message(Rule::default(), priority, false),
        )
    }

    #[fixture]
    fn populated() -> (PriorityIndex, Arc<Matcher>, Arc<Matcher>) {
        let mut index = PriorityIndex::default();
        let first = matcher(1);
        let second = matcher(5);
        index.insert(Arc::clone(&first));
        index.insert(Arc::clone(&second));
        (index, first, second)
    }

    #[rstest]
    fn move_relocates_exactly_once(populated: (PriorityIndex, Arc<Matcher>, Arc<Matcher>)) {
        let (mut index, first, second) = populated;

        let outcome = index.move_to(&first, 5);

        assert_eq!(outcome, MoveOutcome::Moved { from: 1, to: 5 });
        assert_eq!(first.priority(), 5);
        assert!(index.bucket(1).is_none(), "empty bucket must be removed");
        let bucket = index.bucket(5).expect("target bucket");
        assert_eq!(bucket.len(), 2);
        assert!(Arc::ptr_eq(&bucket[0], &second));
        assert!(Arc::ptr_eq(&bucket[1], &first), "moved matcher goes last");
        assert_eq!(index.len(), 2);
    }

    #[rstest]
    fn move_to_same_priority_is_a_no_op(populated: (PriorityIndex, Arc<Matcher>, Arc<Matcher>)) {
        let (mut index, first, _) = populated;

        assert_eq!(index.move_to(&first, 1), MoveOutcome::Unchanged);
        assert_eq!(index.bucket(1).map(<[_]>::len), Some(1));
        assert_eq!(index.len(), 2);
    }

    #[rstest]
    fn moving_an_unindexed_matcher_is_reported(
        populated: (PriorityIndex, Arc<Matcher>, Arc<Matcher>),
    ) {
        let (mut index, _, _) = populated;
        let stranger = matcher(1);

        assert_eq!(index.move_to(&stranger, 9), MoveOutcome::Missing);
        assert_eq!(stranger.priority(), 1);
        assert!(index.bucket(9).is_none());
    }

    #[rstest]
    fn insert_ignores_duplicates(populated: (PriorityIndex, Arc<Matcher>, Arc<Matcher>)) {
        let (mut index, first, _) = populated;
        assert!(!index.insert(Arc::clone(&first)));
        assert_eq!(index.len(), 2);
    }

    #[rstest]
    fn remove_cleans_up_empty_buckets(populated: (PriorityIndex, Arc<Matcher>, Arc<Matcher>)) {
        let (mut index, first, second) = populated;
        assert!(index.remove(&first));
        assert!(!index.remove(&first));
        assert_eq!(index.priorities().collect::<Vec<_>>(), vec![5]);
        assert!(index.remove(&second));
        assert!(index.is_empty());
    }
}
