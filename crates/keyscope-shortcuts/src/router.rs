//! Key event routing
//!
//! [`KeyRouter`] turns raw key events into chords, buffers multi-chord
//! prefixes until they complete or time out, and hands complete sequences to
//! the [`ShortcutMap`] for dispatch.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::config::RouterConfig;
use crate::models::{Key, KeyChord, KeySequence, Modifiers};
use crate::registry::{DispatchResult, ShortcutMap};
use crate::table::SequenceMatch;
use crate::tree::NodeTree;

/// What happened to the physical key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEventKind {
    Press,
    /// Auto-repeat generated while the key is held
    Repeat,
    Release,
}

/// A keyboard event delivered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
    pub kind: KeyEventKind,
    pub timestamp: Instant,
}

impl KeyEvent {
    pub fn new(key: Key, modifiers: Modifiers, kind: KeyEventKind, timestamp: Instant) -> Self {
        KeyEvent {
            key,
            modifiers,
            kind,
            timestamp,
        }
    }

    /// Press of `chord`, stamped now
    pub fn press(chord: KeyChord) -> Self {
        Self::new(chord.key, chord.modifiers, KeyEventKind::Press, Instant::now())
    }

    /// Auto-repeat of `chord`, stamped now
    pub fn repeat(chord: KeyChord) -> Self {
        Self::new(chord.key, chord.modifiers, KeyEventKind::Repeat, Instant::now())
    }

    /// Release of `chord`, stamped now
    pub fn release(chord: KeyChord) -> Self {
        Self::new(chord.key, chord.modifiers, KeyEventKind::Release, Instant::now())
    }

    /// Same event with a different timestamp
    pub fn at(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Normalized chord for this event
    pub fn chord(&self) -> KeyChord {
        KeyChord::new(self.key, self.modifiers)
    }
}

/// Result of routing one key event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// No shortcut wants this event; the host may process it normally
    NoMatch,
    /// The event extended a multi-chord prefix; more chords are expected
    Pending,
    /// Repeat of a key whose press activated a non-repeating shortcut
    Suppressed,
    /// Release events never dispatch
    Ignored,
    /// A complete sequence matched and notifications were delivered
    Dispatched(DispatchResult),
}

impl RouteOutcome {
    /// Whether the host should consider the event handled
    pub fn is_consumed(&self) -> bool {
        !matches!(self, RouteOutcome::NoMatch | RouteOutcome::Ignored)
    }
}

#[derive(Debug, Clone)]
struct PendingChords {
    sequence: KeySequence,
    deadline: Instant,
}

/// Routes key events to shortcuts registered in a [`ShortcutMap`]
#[derive(Debug)]
pub struct KeyRouter {
    map: ShortcutMap,
    chord_timeout: Duration,
    pending: Option<PendingChords>,
    suppressed: HashSet<Key>,
}

impl KeyRouter {
    pub fn new(map: ShortcutMap, config: &RouterConfig) -> Self {
        KeyRouter {
            map,
            chord_timeout: config.chord_timeout(),
            pending: None,
            suppressed: HashSet::new(),
        }
    }

    pub fn map(&self) -> &ShortcutMap {
        &self.map
    }

    pub fn chord_timeout(&self) -> Duration {
        self.chord_timeout
    }

    /// Chords typed so far towards a multi-chord shortcut
    pub fn pending(&self) -> Option<&KeySequence> {
        self.pending.as_ref().map(|pending| &pending.sequence)
    }

    /// When the pending prefix expires, for host timer scheduling
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Drop the pending prefix if its deadline has passed at `now`
    pub fn expire(&mut self, now: Instant) -> bool {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {
                tracing::trace!(sequence = %pending.sequence, "pending chords timed out");
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Forget pending chords and repeat suppression, e.g. on focus loss
    pub fn reset(&mut self) {
        self.pending = None;
        self.suppressed.clear();
    }

    /// Route one key event
    pub fn handle_key(&mut self, event: &KeyEvent, tree: &dyn NodeTree) -> RouteOutcome {
        let chord = event.chord();

        match event.kind {
            KeyEventKind::Release => {
                self.suppressed.remove(&chord.key);
                return RouteOutcome::Ignored;
            }
            KeyEventKind::Repeat if self.suppressed.contains(&chord.key) => {
                tracing::trace!(%chord, "suppressed auto-repeat");
                return RouteOutcome::Suppressed;
            }
            _ => {}
        }

        self.expire(event.timestamp);

        if let Some(pending) = self.pending.take() {
            if let Some(extended) = pending.sequence.with_chord(chord) {
                match self.map.lookup(&extended, tree) {
                    SequenceMatch::ExactMatch => return self.dispatch(extended, event, tree),
                    SequenceMatch::PartialMatch => return self.arm(extended, event.timestamp),
                    SequenceMatch::NoMatch => {}
                }
            }
            tracing::trace!(
                prefix = %pending.sequence,
                %chord,
                "pending chords abandoned, retrying chord alone"
            );
        }

        let single = KeySequence::single(chord);
        match self.map.lookup(&single, tree) {
            SequenceMatch::ExactMatch => self.dispatch(single, event, tree),
            SequenceMatch::PartialMatch => self.arm(single, event.timestamp),
            SequenceMatch::NoMatch => RouteOutcome::NoMatch,
        }
    }

    fn arm(&mut self, sequence: KeySequence, now: Instant) -> RouteOutcome {
        tracing::trace!(%sequence, "waiting for more chords");
        self.pending = Some(PendingChords {
            sequence,
            deadline: now + self.chord_timeout,
        });
        RouteOutcome::Pending
    }

    fn dispatch(
        &mut self,
        sequence: KeySequence,
        event: &KeyEvent,
        tree: &dyn NodeTree,
    ) -> RouteOutcome {
        let is_repeat = event.kind == KeyEventKind::Repeat;
        let result = self.map.resolve(&sequence, tree, is_repeat);

        if let DispatchResult::Activated { id, .. } = &result {
            let repeats = self
                .map
                .record(*id)
                .is_some_and(|record| record.auto_repeat);
            if event.kind == KeyEventKind::Press && !repeats {
                self.suppressed.insert(event.chord().key);
            }
        }

        tracing::debug!(%sequence, ?result, "dispatched key sequence");
        if result.is_none() {
            return RouteOutcome::NoMatch;
        }

        self.map.deliver(&result);
        RouteOutcome::Dispatched(result)
    }
}
