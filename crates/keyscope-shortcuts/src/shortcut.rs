//! Shortcut handles attached to UI nodes
//!
//! A [`Shortcut`] owns at most one registration in a [`ShortcutMap`] at a
//! time. Changing its sequence or scope retires the old registration and
//! creates a new one; toggling enabled or auto-repeat updates the existing
//! record in place.
//!
//! Shortcuts built step by step (e.g. by a declarative UI loader) start with
//! [`Shortcut::declare`]. Nothing is registered until [`Shortcut::finalize`]
//! is called, so intermediate attribute values never reach the map.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::ParseError;
use crate::models::{KeySequence, ListenerId, ShortcutId, ShortcutScope, StandardKey};
use crate::registry::{ActivationSink, ShortcutMap};
use crate::tree::NodeId;

/// Construction phase of a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Attributes are being set; the map is not touched
    Declaring,
    /// Live; every attribute change is reflected in the map
    Complete,
}

/// Attribute change notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortcutChange {
    Sequence(KeySequence),
    Scope(ShortcutScope),
    Enabled(bool),
    AutoRepeat(bool),
    /// The registration id changed (`None` once unregistered)
    Id(Option<ShortcutId>),
}

type Callback = Rc<dyn Fn()>;
type ChangeCallback = Rc<dyn Fn(&ShortcutChange)>;

#[derive(Default)]
struct Listeners {
    activated: Vec<(ListenerId, Callback)>,
    ambiguous: Vec<(ListenerId, Callback)>,
    changed: Vec<(ListenerId, ChangeCallback)>,
    next: u64,
}

impl Listeners {
    fn next_id(&mut self) -> ListenerId {
        self.next += 1;
        ListenerId(self.next)
    }
}

struct ShortcutState {
    sequence: KeySequence,
    scope: ShortcutScope,
    enabled: bool,
    auto_repeat: bool,
    id: Option<ShortcutId>,
    phase: Phase,
    /// Set once the owner was torn down; the shortcut never registers again
    revoked: bool,
}

struct ShortcutShared {
    owner: NodeId,
    state: RefCell<ShortcutState>,
    listeners: RefCell<Listeners>,
}

impl ShortcutShared {
    fn is_current(&self, id: ShortcutId) -> bool {
        self.state.borrow().id == Some(id)
    }

    fn fire(&self, ambiguous: bool) {
        let snapshot: Vec<Callback> = {
            let listeners = self.listeners.borrow();
            let callbacks = if ambiguous {
                &listeners.ambiguous
            } else {
                &listeners.activated
            };
            callbacks
                .iter()
                .map(|(_, callback)| Rc::clone(callback))
                .collect()
        };
        for callback in snapshot {
            callback();
        }
    }

    fn notify(&self, change: &ShortcutChange) {
        let snapshot: Vec<ChangeCallback> = self
            .listeners
            .borrow()
            .changed
            .iter()
            .map(|(_, callback)| Rc::clone(callback))
            .collect();
        for callback in snapshot {
            callback(change);
        }
    }
}

impl ActivationSink for ShortcutShared {
    fn activated(&self, id: ShortcutId) {
        // Events for a retired id are stale
        if self.is_current(id) {
            self.fire(false);
        }
    }

    fn activated_ambiguously(&self, id: ShortcutId) {
        if self.is_current(id) {
            self.fire(true);
        }
    }

    fn revoked(&self, id: ShortcutId) {
        let cleared = {
            let mut state = self.state.borrow_mut();
            if state.id == Some(id) {
                state.id = None;
                state.revoked = true;
                true
            } else {
                false
            }
        };
        if cleared {
            tracing::debug!(%id, owner = %self.owner, "shortcut registration revoked");
            self.notify(&ShortcutChange::Id(None));
        }
    }
}

/// A keyboard shortcut attached to one UI node
pub struct Shortcut {
    map: ShortcutMap,
    shared: Rc<ShortcutShared>,
}

impl Shortcut {
    fn with_phase(map: &ShortcutMap, owner: NodeId, phase: Phase) -> Self {
        Shortcut {
            map: map.clone(),
            shared: Rc::new(ShortcutShared {
                owner,
                state: RefCell::new(ShortcutState {
                    sequence: KeySequence::empty(),
                    scope: ShortcutScope::default(),
                    enabled: true,
                    auto_repeat: true,
                    id: None,
                    phase,
                    revoked: false,
                }),
                listeners: RefCell::new(Listeners::default()),
            }),
        }
    }

    /// Create a complete shortcut and register it right away
    pub fn new(
        map: &ShortcutMap,
        owner: NodeId,
        sequence: impl Into<KeySequence>,
        scope: ShortcutScope,
    ) -> Self {
        let shortcut = Self::with_phase(map, owner, Phase::Complete);
        {
            let mut state = shortcut.shared.state.borrow_mut();
            state.sequence = sequence.into();
            state.scope = scope;
        }
        shortcut.reset();
        shortcut
    }

    /// Start declaring a shortcut; call [`Shortcut::finalize`] once all
    /// attributes are set
    pub fn declare(map: &ShortcutMap, owner: NodeId) -> Self {
        Self::with_phase(map, owner, Phase::Declaring)
    }

    /// Finish declaration and register with the current attributes.
    ///
    /// Calling it again, or on a shortcut created with [`Shortcut::new`],
    /// does nothing.
    pub fn finalize(&self) {
        {
            let mut state = self.shared.state.borrow_mut();
            if state.phase == Phase::Complete {
                return;
            }
            state.phase = Phase::Complete;
        }
        self.reset();
    }

    /// Retire the current registration and register again if there is
    /// something to register
    fn reset(&self) {
        let (old_id, sequence, scope, enabled, auto_repeat) = {
            let state = self.shared.state.borrow();
            if state.phase != Phase::Complete || state.revoked {
                return;
            }
            (
                state.id,
                state.sequence.clone(),
                state.scope,
                state.enabled,
                state.auto_repeat,
            )
        };

        if let Some(old) = old_id {
            self.map.unregister(old);
        }

        let new_id = if sequence.is_empty() {
            None
        } else {
            let weak: Weak<ShortcutShared> = Rc::downgrade(&self.shared);
            let sink: Weak<dyn ActivationSink> = weak;
            self.map
                .register_with_sink(self.shared.owner, sequence, scope, enabled, auto_repeat, sink)
        };
        self.shared.state.borrow_mut().id = new_id;

        if old_id != new_id {
            self.shared.notify(&ShortcutChange::Id(new_id));
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared.state.borrow().phase
    }

    pub fn is_complete(&self) -> bool {
        self.phase() == Phase::Complete
    }

    /// Current registration id, `None` while unregistered
    pub fn id(&self) -> Option<ShortcutId> {
        self.shared.state.borrow().id
    }

    pub fn owner(&self) -> NodeId {
        self.shared.owner
    }

    pub fn sequence(&self) -> KeySequence {
        self.shared.state.borrow().sequence.clone()
    }

    pub fn scope(&self) -> ShortcutScope {
        self.shared.state.borrow().scope
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.state.borrow().enabled
    }

    pub fn auto_repeat(&self) -> bool {
        self.shared.state.borrow().auto_repeat
    }

    /// Change the key sequence. An empty sequence unregisters.
    pub fn set_sequence(&self, sequence: impl Into<KeySequence>) {
        let sequence = sequence.into();
        {
            let mut state = self.shared.state.borrow_mut();
            if state.sequence == sequence {
                return;
            }
            state.sequence = sequence.clone();
        }
        self.reset();
        self.shared.notify(&ShortcutChange::Sequence(sequence));
    }

    /// Set the sequence from text: a standard key name such as `"copy"` or
    /// chord text such as `"Ctrl+K, Ctrl+C"`. Blank text clears it.
    pub fn set_sequence_text(&self, text: &str) -> Result<(), ParseError> {
        let sequence = match text.parse::<StandardKey>() {
            Ok(standard) => standard.sequence(),
            Err(_) => KeySequence::parse(text)?,
        };
        self.set_sequence(sequence);
        Ok(())
    }

    pub fn set_scope(&self, scope: ShortcutScope) {
        {
            let mut state = self.shared.state.borrow_mut();
            if state.scope == scope {
                return;
            }
            state.scope = scope;
        }
        self.reset();
        self.shared.notify(&ShortcutChange::Scope(scope));
    }

    pub fn set_enabled(&self, enabled: bool) {
        let id = {
            let mut state = self.shared.state.borrow_mut();
            if state.enabled == enabled {
                return;
            }
            state.enabled = enabled;
            state.id
        };
        if let Some(id) = id {
            self.map.set_enabled(id, enabled);
        }
        self.shared.notify(&ShortcutChange::Enabled(enabled));
    }

    pub fn set_auto_repeat(&self, auto_repeat: bool) {
        let id = {
            let mut state = self.shared.state.borrow_mut();
            if state.auto_repeat == auto_repeat {
                return;
            }
            state.auto_repeat = auto_repeat;
            state.id
        };
        if let Some(id) = id {
            self.map.set_auto_repeat(id, auto_repeat);
        }
        self.shared.notify(&ShortcutChange::AutoRepeat(auto_repeat));
    }

    /// Unregister now instead of waiting for the handle to drop
    pub fn detach(self) {
        drop(self);
    }

    /// Called when this shortcut is the single match for a key sequence
    pub fn on_activated(&self, listener: impl Fn() + 'static) -> ListenerId {
        let mut listeners = self.shared.listeners.borrow_mut();
        let id = listeners.next_id();
        let callback: Callback = Rc::new(listener);
        listeners.activated.push((id, callback));
        id
    }

    /// Called when this shortcut matched together with others
    pub fn on_activated_ambiguously(&self, listener: impl Fn() + 'static) -> ListenerId {
        let mut listeners = self.shared.listeners.borrow_mut();
        let id = listeners.next_id();
        let callback: Callback = Rc::new(listener);
        listeners.ambiguous.push((id, callback));
        id
    }

    /// Called after any attribute or the registration id changes
    pub fn on_changed(&self, listener: impl Fn(&ShortcutChange) + 'static) -> ListenerId {
        let mut listeners = self.shared.listeners.borrow_mut();
        let id = listeners.next_id();
        let callback: ChangeCallback = Rc::new(listener);
        listeners.changed.push((id, callback));
        id
    }

    /// Remove a listener registered with any of the `on_*` methods
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.shared.listeners.borrow_mut();
        let before =
            listeners.activated.len() + listeners.ambiguous.len() + listeners.changed.len();
        listeners.activated.retain(|(existing, _)| *existing != id);
        listeners.ambiguous.retain(|(existing, _)| *existing != id);
        listeners.changed.retain(|(existing, _)| *existing != id);
        let after = listeners.activated.len() + listeners.ambiguous.len() + listeners.changed.len();
        after != before
    }
}

impl Drop for Shortcut {
    fn drop(&mut self) {
        let id = self.shared.state.borrow_mut().id.take();
        if let Some(id) = id {
            self.map.unregister(id);
        }
    }
}

impl fmt::Debug for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("Shortcut")
            .field("owner", &self.shared.owner)
            .field("id", &state.id)
            .field("sequence", &state.sequence.to_string())
            .field("scope", &state.scope)
            .field("enabled", &state.enabled)
            .field("auto_repeat", &state.auto_repeat)
            .field("phase", &state.phase)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn seq(s: &str) -> KeySequence {
        s.parse().unwrap()
    }

    #[test]
    fn test_new_registers_immediately() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(1), seq("Ctrl+S"), ShortcutScope::Application);
        let id = shortcut.id().unwrap();
        assert!(map.contains(id));
        assert!(shortcut.is_complete());
    }

    #[test]
    fn test_declaring_does_not_touch_map() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::declare(&map, NodeId(1));
        shortcut.set_sequence(seq("Ctrl+S"));
        shortcut.set_scope(ShortcutScope::Application);
        assert!(map.is_empty());
        assert_eq!(shortcut.id(), None);

        shortcut.finalize();
        assert_eq!(map.len(), 1);
        shortcut.finalize();
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_same_value_is_a_noop() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(1), seq("Ctrl+S"), ShortcutScope::Window);
        let changes = Rc::new(Cell::new(0));
        let counter = Rc::clone(&changes);
        shortcut.on_changed(move |_| counter.set(counter.get() + 1));

        let id = shortcut.id();
        shortcut.set_sequence(seq("Ctrl+S"));
        shortcut.set_scope(ShortcutScope::Window);
        shortcut.set_enabled(true);
        shortcut.set_auto_repeat(true);

        assert_eq!(shortcut.id(), id);
        assert_eq!(changes.get(), 0);
    }

    #[test]
    fn test_scope_change_reregisters() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(1), seq("Ctrl+S"), ShortcutScope::Window);
        let old = shortcut.id().unwrap();
        shortcut.set_scope(ShortcutScope::Application);
        let new = shortcut.id().unwrap();
        assert_ne!(old, new);
        assert!(!map.contains(old));
        assert_eq!(map.record(new).unwrap().scope, ShortcutScope::Application);
    }

    #[test]
    fn test_enabled_change_keeps_id() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(1), seq("Ctrl+S"), ShortcutScope::Window);
        let id = shortcut.id().unwrap();
        shortcut.set_enabled(false);
        shortcut.set_auto_repeat(false);
        assert_eq!(shortcut.id(), Some(id));
        let record = map.record(id).unwrap();
        assert!(!record.enabled);
        assert!(!record.auto_repeat);
    }

    #[test]
    fn test_reregistration_keeps_flags() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(1), seq("Ctrl+S"), ShortcutScope::Window);
        shortcut.set_enabled(false);
        shortcut.set_auto_repeat(false);
        shortcut.set_sequence(seq("Ctrl+D"));
        let record = map.record(shortcut.id().unwrap()).unwrap();
        assert!(!record.enabled);
        assert!(!record.auto_repeat);
    }

    #[test]
    fn test_empty_sequence_unregisters() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(1), seq("Ctrl+S"), ShortcutScope::Window);
        let old = shortcut.id().unwrap();
        shortcut.set_sequence(KeySequence::empty());
        assert_eq!(shortcut.id(), None);
        assert!(!map.contains(old));
        assert!(!map.table_contains(old));
    }

    #[test]
    fn test_sequence_text_accepts_standard_keys() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::declare(&map, NodeId(1));
        shortcut.set_sequence_text("copy").unwrap();
        assert_eq!(shortcut.sequence(), StandardKey::Copy.sequence());
        shortcut.set_sequence_text("Ctrl+K, Ctrl+C").unwrap();
        assert_eq!(shortcut.sequence().len(), 2);
        assert!(shortcut.set_sequence_text("Ctrl+Bogus").is_err());
        shortcut.set_sequence_text("").unwrap();
        assert!(shortcut.sequence().is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(1), seq("Ctrl+S"), ShortcutScope::Window);
        let id = shortcut.id().unwrap();
        drop(shortcut);
        assert!(!map.contains(id));
        assert!(!map.table_contains(id));
    }

    #[test]
    fn test_revoked_by_owner_removal() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(7), seq("Ctrl+S"), ShortcutScope::Window);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        shortcut.on_changed(move |change| sink.borrow_mut().push(change.clone()));

        map.remove_owner(NodeId(7));
        assert_eq!(shortcut.id(), None);
        assert_eq!(seen.borrow().as_slice(), &[ShortcutChange::Id(None)]);
    }

    #[test]
    fn test_revoked_shortcut_stays_unregistered() {
        let tree = crate::tree::SceneTree::new();
        let map = ShortcutMap::new();
        let shortcut = Shortcut::new(&map, NodeId(7), seq("Ctrl+S"), ShortcutScope::Application);
        map.remove_owner(NodeId(7));

        shortcut.set_sequence(seq("Ctrl+D"));
        shortcut.set_scope(ShortcutScope::Window);
        shortcut.set_scope(ShortcutScope::Application);

        assert_eq!(shortcut.id(), None);
        assert!(map.is_empty());
        assert!(map.dispatch(&seq("Ctrl+D"), &tree, false).is_none());
    }

    #[test]
    fn test_remove_listener() {
        let map = ShortcutMap::new();
        let shortcut = Shortcut::declare(&map, NodeId(1));
        let id = shortcut.on_activated(|| {});
        assert!(shortcut.remove_listener(id));
        assert!(!shortcut.remove_listener(id));
    }
}
