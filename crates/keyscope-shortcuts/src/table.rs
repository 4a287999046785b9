//! Sequence table: key sequence to the ids registered for it

use std::collections::BTreeMap;

use crate::models::{KeySequence, ShortcutId};

/// How a typed sequence relates to the registered ones
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceMatch {
    /// Nothing registered starts with the typed chords
    NoMatch,
    /// The typed chords are a strict prefix of a registered sequence
    PartialMatch,
    /// A registered sequence equals the typed chords
    ExactMatch,
}

/// Ordered map from sequence to registered ids.
///
/// Sequences sort lexicographically by chord, so every sequence that extends
/// a given prefix sits in one contiguous range right after the prefix.
#[derive(Debug, Clone, Default)]
pub struct SequenceTable {
    entries: BTreeMap<KeySequence, Vec<ShortcutId>>,
}

impl SequenceTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` under `sequence`. Empty sequences are ignored.
    pub fn insert(&mut self, sequence: &KeySequence, id: ShortcutId) {
        if sequence.is_empty() {
            return;
        }
        let ids = self.entries.entry(sequence.clone()).or_default();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    /// Drop `id` from `sequence`, removing the entry once it is empty
    pub fn remove(&mut self, sequence: &KeySequence, id: ShortcutId) -> bool {
        let Some(ids) = self.entries.get_mut(sequence) else {
            return false;
        };
        let before = ids.len();
        ids.retain(|existing| *existing != id);
        let removed = ids.len() != before;
        if ids.is_empty() {
            self.entries.remove(sequence);
        }
        removed
    }

    /// Ids registered for exactly `sequence`, in registration order
    pub fn exact(&self, sequence: &KeySequence) -> &[ShortcutId] {
        self.entries
            .get(sequence)
            .map(|ids| ids.as_slice())
            .unwrap_or(&[])
    }

    /// Ids registered for sequences strictly longer than `prefix` that start with it
    pub fn extending<'a>(
        &'a self,
        prefix: &'a KeySequence,
    ) -> impl Iterator<Item = ShortcutId> + 'a {
        self.entries
            .range(prefix.clone()..)
            .skip_while(move |(seq, _)| *seq == prefix)
            .take_while(move |(seq, _)| seq.starts_with(prefix))
            .flat_map(|(_, ids)| ids.iter().copied())
    }

    /// Classify `sequence` against everything in the table
    pub fn lookup(&self, sequence: &KeySequence) -> SequenceMatch {
        if sequence.is_empty() {
            return SequenceMatch::NoMatch;
        }
        if !self.exact(sequence).is_empty() {
            SequenceMatch::ExactMatch
        } else if self.extending(sequence).next().is_some() {
            SequenceMatch::PartialMatch
        } else {
            SequenceMatch::NoMatch
        }
    }

    /// Whether `id` appears anywhere in the table
    pub fn contains_id(&self, id: ShortcutId) -> bool {
        self.entries.values().any(|ids| ids.contains(&id))
    }

    /// Number of distinct sequences
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// All sequences with their ids
    pub fn iter(&self) -> impl Iterator<Item = (&KeySequence, &[ShortcutId])> {
        self.entries.iter().map(|(seq, ids)| (seq, ids.as_slice()))
    }
}
