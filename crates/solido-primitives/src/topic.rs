//! Fluent builder for log topic filters.
//!
//! The accumulated sequence is a list of entries where every entry is either a
//! single value or a nested group. `and` collapses everything accumulated so far
//! into one group together with the new value, so
//! `topic(c).and(b).or(a)` produces `[[c, b], a]`.
//!
//! Resolved against log topics, the top-level entries are alternatives. All
//! top-level values share the first indexed position as one OR-set. A group
//! matches any of its prior entries and, at the next position, the value that
//! closed it. The example above therefore matches
//! `(topic1 = c AND topic2 = b) OR topic1 = a`.

use crate::alloy::primitives::B256;

/// One entry of a topic filter sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicEntry<T> {
    Value(T),
    Group(Vec<TopicEntry<T>>),
}

impl<T: Clone> TopicEntry<T> {
    /// Number of direct members: 1 for a value, the member count for a group.
    pub fn len(&self) -> usize {
        match self {
            TopicEntry::Value(_) => 1,
            TopicEntry::Group(members) => members.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_group(&self) -> bool {
        matches!(self, TopicEntry::Group(_))
    }

    /// All leaf values of this entry in insertion order.
    pub fn values(&self) -> Vec<T> {
        match self {
            TopicEntry::Value(value) => vec![value.clone()],
            TopicEntry::Group(members) => members.iter().flat_map(TopicEntry::values).collect(),
        }
    }
}

/// Topic filter builder. Single use per query: `get` does not reset the
/// accumulated sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicFilter<T = B256> {
    next: Vec<TopicEntry<T>>,
}

impl<T> Default for TopicFilter<T> {
    fn default() -> Self {
        Self { next: Vec::new() }
    }
}

impl<T: Clone> TopicFilter<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` as a new top-level entry.
    pub fn topic(mut self, value: T) -> Self {
        self.next.push(TopicEntry::Value(value));
        self
    }

    /// Append `value` as an alternative at the top level.
    pub fn or(mut self, value: T) -> Self {
        self.next.push(TopicEntry::Value(value));
        self
    }

    /// Collapse every accumulated entry plus `value` into a single group.
    pub fn and(mut self, value: T) -> Self {
        let mut group = std::mem::take(&mut self.next);
        group.push(TopicEntry::Value(value));
        self.next = vec![TopicEntry::Group(group)];
        self
    }

    pub fn get(&self) -> Vec<TopicEntry<T>> {
        self.next.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_empty()
    }

    pub fn alternatives(&self) -> Vec<TopicAlternative<T>> {
        alternatives(&self.next)
    }
}

/// One conjunctive match: an OR-set per consecutive indexed position.
pub type TopicAlternative<T> = Vec<Vec<T>>;

/// Split a resolved topic sequence into the alternatives it matches. The
/// top-level values come first as a single one-position alternative, then the
/// expansion of every group in sequence order.
pub fn alternatives<T: Clone>(entries: &[TopicEntry<T>]) -> Vec<TopicAlternative<T>> {
    let values: Vec<T> = entries
        .iter()
        .filter_map(|entry| match entry {
            TopicEntry::Value(value) => Some(value.clone()),
            TopicEntry::Group(_) => None,
        })
        .collect();

    let mut alternatives = Vec::new();
    if !values.is_empty() {
        alternatives.push(vec![values]);
    }
    for entry in entries {
        if let TopicEntry::Group(members) = entry {
            alternatives.extend(group_alternatives(members));
        }
    }
    alternatives
}

/// A group is the sequence accumulated before `and` followed by the `and`
/// value, which narrows the position after each prior alternative.
fn group_alternatives<T: Clone>(members: &[TopicEntry<T>]) -> Vec<TopicAlternative<T>> {
    let Some((last, prior)) = members.split_last() else {
        return Vec::new();
    };
    let prior = alternatives(prior);
    if prior.is_empty() {
        return vec![vec![last.values()]];
    }
    prior
        .into_iter()
        .map(|mut alternative| {
            alternative.push(last.values());
            alternative
        })
        .collect()
}
