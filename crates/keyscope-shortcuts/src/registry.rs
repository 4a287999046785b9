//! Shortcut registry and the shared map handle used for dispatch
//!
//! [`ShortcutRegistry`] is the plain record store: id to record, plus the
//! [`SequenceTable`] kept in lock-step with it. [`ShortcutMap`] wraps one
//! registry in a cloneable single-threaded handle that is created at startup
//! and handed to the router and every [`crate::Shortcut`].
//!
//! Dispatch never holds a borrow of the registry while user callbacks run.
//! Candidate ids are snapshotted first and every id is re-checked right before
//! its notification is delivered, so listeners are free to register,
//! unregister or drop shortcuts mid-dispatch.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU32;
use std::rc::{Rc, Weak};

use crate::config::RouterConfig;
use crate::matcher::{ScopeMatch, ScopeMatcher};
use crate::models::{KeySequence, ListenerId, ShortcutId, ShortcutScope};
use crate::table::{SequenceMatch, SequenceTable};
use crate::tree::{NodeId, NodeTree};

/// Receiver of activation notifications for one registration
pub trait ActivationSink {
    /// The registration `id` was the single match for a key sequence
    fn activated(&self, id: ShortcutId);

    /// The registration `id` matched together with at least one other
    fn activated_ambiguously(&self, id: ShortcutId);

    /// The registration `id` was removed behind the owner's back
    /// (owner teardown or map clear)
    fn revoked(&self, id: ShortcutId);
}

/// One live registration
#[derive(Clone)]
pub struct ShortcutRecord {
    pub id: ShortcutId,
    pub owner: NodeId,
    pub sequence: KeySequence,
    pub scope: ShortcutScope,
    pub enabled: bool,
    pub auto_repeat: bool,
    scope_reported: bool,
    sink: Option<Weak<dyn ActivationSink>>,
}

impl fmt::Debug for ShortcutRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutRecord")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("sequence", &self.sequence.to_string())
            .field("scope", &self.scope)
            .field("enabled", &self.enabled)
            .field("auto_repeat", &self.auto_repeat)
            .finish_non_exhaustive()
    }
}

/// Result of resolving a complete key sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// No enabled, in-scope shortcut matched
    None,
    /// Exactly one shortcut matched
    Activated { id: ShortcutId, owner: NodeId },
    /// Several shortcuts matched; none of them is "the" handler
    ActivatedAmbiguously { ids: Vec<ShortcutId> },
}

impl DispatchResult {
    pub fn is_none(&self) -> bool {
        matches!(self, DispatchResult::None)
    }
}

/// Signals surfaced to the embedding framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// A window-scoped shortcut whose owner is not inside any window
    UnresolvableScope { id: ShortcutId, owner: NodeId },
    /// More than one enabled, in-scope shortcut matched the same sequence
    AmbiguousActivation {
        sequence: KeySequence,
        ids: Vec<ShortcutId>,
    },
}

/// Record store for live shortcut registrations
pub struct ShortcutRegistry {
    records: HashMap<ShortcutId, ShortcutRecord>,
    table: SequenceTable,
    next_id: u32,
    report_unresolvable_scope: bool,
}

impl ShortcutRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ShortcutRegistry {
            records: HashMap::new(),
            table: SequenceTable::new(),
            next_id: 0,
            report_unresolvable_scope: true,
        }
    }

    /// Create an empty registry using `config`
    pub fn with_config(config: &RouterConfig) -> Self {
        ShortcutRegistry {
            report_unresolvable_scope: config.report_unresolvable_scope,
            ..Self::new()
        }
    }

    fn allocate_id(&mut self) -> ShortcutId {
        loop {
            self.next_id = self.next_id.wrapping_add(1);
            if let Some(raw) = NonZeroU32::new(self.next_id) {
                let id = ShortcutId::new(raw);
                if !self.records.contains_key(&id) {
                    return id;
                }
            }
        }
    }

    /// Register a shortcut.
    ///
    /// Returns `None` without touching anything when `sequence` is empty.
    pub fn register(
        &mut self,
        owner: NodeId,
        sequence: KeySequence,
        scope: ShortcutScope,
        enabled: bool,
        auto_repeat: bool,
    ) -> Option<ShortcutId> {
        if sequence.is_empty() {
            return None;
        }

        let id = self.allocate_id();
        self.table.insert(&sequence, id);
        tracing::debug!(%id, %owner, sequence = %sequence, %scope, "registered shortcut");
        self.records.insert(
            id,
            ShortcutRecord {
                id,
                owner,
                sequence,
                scope,
                enabled,
                auto_repeat,
                scope_reported: false,
                sink: None,
            },
        );
        Some(id)
    }

    /// Attach the notification target for `id`
    pub fn set_sink(&mut self, id: ShortcutId, sink: Weak<dyn ActivationSink>) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.sink = Some(sink);
                true
            }
            None => false,
        }
    }

    /// Remove a registration. Unknown ids are ignored.
    pub fn unregister(&mut self, id: ShortcutId) -> bool {
        self.take(id).is_some()
    }

    fn take(&mut self, id: ShortcutId) -> Option<ShortcutRecord> {
        let record = self.records.remove(&id)?;
        self.table.remove(&record.sequence, id);
        tracing::debug!(%id, sequence = %record.sequence, "unregistered shortcut");
        Some(record)
    }

    /// Enable or disable `id` in place
    pub fn set_enabled(&mut self, id: ShortcutId, enabled: bool) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Change auto-repeat for `id` in place
    pub fn set_auto_repeat(&mut self, id: ShortcutId, auto_repeat: bool) -> bool {
        match self.records.get_mut(&id) {
            Some(record) => {
                record.auto_repeat = auto_repeat;
                true
            }
            None => false,
        }
    }

    /// Remove every registration owned by `owner`
    pub fn remove_owner(&mut self, owner: NodeId) -> Vec<ShortcutRecord> {
        let ids: Vec<ShortcutId> = self
            .records
            .values()
            .filter(|record| record.owner == owner)
            .map(|record| record.id)
            .collect();
        ids.into_iter().filter_map(|id| self.take(id)).collect()
    }

    /// Remove every registration
    pub fn clear(&mut self) -> Vec<ShortcutRecord> {
        self.table.clear();
        self.records.drain().map(|(_, record)| record).collect()
    }

    pub fn record(&self, id: ShortcutId) -> Option<&ShortcutRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: ShortcutId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The sequence table backing this registry
    pub fn table(&self) -> &SequenceTable {
        &self.table
    }

    /// Ids registered for exactly `sequence`
    pub fn ids_for(&self, sequence: &KeySequence) -> Vec<ShortcutId> {
        self.table.exact(sequence).to_vec()
    }

    /// Whether `id` is enabled and reachable from `focus`.
    ///
    /// An unresolvable scope is reported once; the flag re-arms after the
    /// owner resolves again.
    fn reachable(
        &mut self,
        id: ShortcutId,
        focus: Option<NodeId>,
        tree: &dyn NodeTree,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> bool {
        let report = self.report_unresolvable_scope;
        let Some(record) = self.records.get_mut(&id) else {
            return false;
        };
        if !record.enabled {
            return false;
        }

        match ScopeMatcher::matches(record.scope, record.owner, focus, tree) {
            ScopeMatch::Matched => {
                record.scope_reported = false;
                true
            }
            ScopeMatch::NotMatched => {
                record.scope_reported = false;
                false
            }
            ScopeMatch::Unresolvable => {
                if report && !record.scope_reported {
                    record.scope_reported = true;
                    tracing::warn!(
                        %id,
                        owner = %record.owner,
                        "window-scoped shortcut has no window to scope to"
                    );
                    diagnostics.push(Diagnostic::UnresolvableScope {
                        id,
                        owner: record.owner,
                    });
                }
                false
            }
        }
    }

    /// Classify `sequence`, counting only enabled shortcuts in scope
    pub fn lookup(
        &mut self,
        sequence: &KeySequence,
        tree: &dyn NodeTree,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> SequenceMatch {
        let focus = tree.focused_node();

        let exact = self.table.exact(sequence).to_vec();
        if exact
            .into_iter()
            .any(|id| self.reachable(id, focus, tree, diagnostics))
        {
            return SequenceMatch::ExactMatch;
        }

        let extending: Vec<ShortcutId> = self.table.extending(sequence).collect();
        if extending
            .into_iter()
            .any(|id| self.reachable(id, focus, tree, diagnostics))
        {
            return SequenceMatch::PartialMatch;
        }

        SequenceMatch::NoMatch
    }

    /// Resolve `sequence` to zero, one or several matching shortcuts.
    ///
    /// Repeat events skip shortcuts that do not auto-repeat.
    pub fn resolve(
        &mut self,
        sequence: &KeySequence,
        tree: &dyn NodeTree,
        is_repeat: bool,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> DispatchResult {
        let focus = tree.focused_node();
        let snapshot = self.table.exact(sequence).to_vec();

        let mut candidates = Vec::with_capacity(snapshot.len());
        for id in snapshot {
            if !self.reachable(id, focus, tree, diagnostics) {
                continue;
            }
            if is_repeat && !self.records.get(&id).is_some_and(|r| r.auto_repeat) {
                continue;
            }
            candidates.push(id);
        }

        match candidates.len() {
            0 => DispatchResult::None,
            1 => {
                let id = candidates[0];
                match self.records.get(&id) {
                    Some(record) => DispatchResult::Activated {
                        id,
                        owner: record.owner,
                    },
                    None => DispatchResult::None,
                }
            }
            count => {
                tracing::debug!(sequence = %sequence, count, "ambiguous shortcut");
                diagnostics.push(Diagnostic::AmbiguousActivation {
                    sequence: sequence.clone(),
                    ids: candidates.clone(),
                });
                DispatchResult::ActivatedAmbiguously { ids: candidates }
            }
        }
    }

    fn live_sink(&self, id: ShortcutId) -> Option<Rc<dyn ActivationSink>> {
        self.records.get(&id)?.sink.as_ref()?.upgrade()
    }
}

impl Default for ShortcutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

type DiagnosticListener = Rc<dyn Fn(&Diagnostic)>;

struct MapInner {
    registry: ShortcutRegistry,
    diagnostic_listeners: Vec<(ListenerId, DiagnosticListener)>,
    next_listener: u64,
}

/// Shared handle to the process-wide shortcut registry.
///
/// Cloning is cheap and every clone refers to the same registry. The handle
/// is `!Send`: registration and dispatch belong to the UI thread.
#[derive(Clone)]
pub struct ShortcutMap {
    inner: Rc<RefCell<MapInner>>,
}

impl ShortcutMap {
    /// Create a map with default configuration
    pub fn new() -> Self {
        Self::with_config(&RouterConfig::default())
    }

    /// Create a map using `config`
    pub fn with_config(config: &RouterConfig) -> Self {
        ShortcutMap {
            inner: Rc::new(RefCell::new(MapInner {
                registry: ShortcutRegistry::with_config(config),
                diagnostic_listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    /// See [`ShortcutRegistry::register`]
    pub fn register(
        &self,
        owner: NodeId,
        sequence: KeySequence,
        scope: ShortcutScope,
        enabled: bool,
        auto_repeat: bool,
    ) -> Option<ShortcutId> {
        self.inner
            .borrow_mut()
            .registry
            .register(owner, sequence, scope, enabled, auto_repeat)
    }

    pub(crate) fn register_with_sink(
        &self,
        owner: NodeId,
        sequence: KeySequence,
        scope: ShortcutScope,
        enabled: bool,
        auto_repeat: bool,
        sink: Weak<dyn ActivationSink>,
    ) -> Option<ShortcutId> {
        let mut inner = self.inner.borrow_mut();
        let id = inner
            .registry
            .register(owner, sequence, scope, enabled, auto_repeat)?;
        inner.registry.set_sink(id, sink);
        Some(id)
    }

    pub fn unregister(&self, id: ShortcutId) -> bool {
        self.inner.borrow_mut().registry.unregister(id)
    }

    pub fn set_enabled(&self, id: ShortcutId, enabled: bool) -> bool {
        self.inner.borrow_mut().registry.set_enabled(id, enabled)
    }

    pub fn set_auto_repeat(&self, id: ShortcutId, auto_repeat: bool) -> bool {
        self.inner.borrow_mut().registry.set_auto_repeat(id, auto_repeat)
    }

    /// Drop every registration owned by `owner`, e.g. when the node is
    /// destroyed. Attached shortcuts are told their id was revoked.
    pub fn remove_owner(&self, owner: NodeId) -> usize {
        let removed = self.inner.borrow_mut().registry.remove_owner(owner);
        Self::revoke(&removed);
        removed.len()
    }

    /// Teardown: drop every registration
    pub fn clear(&self) {
        let removed = self.inner.borrow_mut().registry.clear();
        tracing::info!(count = removed.len(), "cleared shortcut map");
        Self::revoke(&removed);
    }

    fn revoke(records: &[ShortcutRecord]) {
        for record in records {
            if let Some(sink) = record.sink.as_ref().and_then(Weak::upgrade) {
                sink.revoked(record.id);
            }
        }
    }

    /// Snapshot of the record for `id`
    pub fn record(&self, id: ShortcutId) -> Option<ShortcutRecord> {
        self.inner.borrow().registry.record(id).cloned()
    }

    pub fn contains(&self, id: ShortcutId) -> bool {
        self.inner.borrow().registry.contains(id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().registry.is_empty()
    }

    /// Ids registered for exactly `sequence`
    pub fn ids_for(&self, sequence: &KeySequence) -> Vec<ShortcutId> {
        self.inner.borrow().registry.ids_for(sequence)
    }

    /// Whether `id` still appears in the sequence table
    pub fn table_contains(&self, id: ShortcutId) -> bool {
        self.inner.borrow().registry.table().contains_id(id)
    }

    /// Classify `sequence` against enabled, in-scope shortcuts
    pub fn lookup(&self, sequence: &KeySequence, tree: &dyn NodeTree) -> SequenceMatch {
        let mut diagnostics = Vec::new();
        let result = self
            .inner
            .borrow_mut()
            .registry
            .lookup(sequence, tree, &mut diagnostics);
        self.emit(&diagnostics);
        result
    }

    /// Resolve `sequence` without notifying anyone
    pub fn resolve(
        &self,
        sequence: &KeySequence,
        tree: &dyn NodeTree,
        is_repeat: bool,
    ) -> DispatchResult {
        let mut diagnostics = Vec::new();
        let result = self
            .inner
            .borrow_mut()
            .registry
            .resolve(sequence, tree, is_repeat, &mut diagnostics);
        self.emit(&diagnostics);
        result
    }

    /// Fire the notifications for an already resolved result.
    ///
    /// Each id is re-validated immediately before its notification, so a
    /// shortcut removed by an earlier listener is skipped.
    pub fn deliver(&self, result: &DispatchResult) {
        match result {
            DispatchResult::None => {}
            DispatchResult::Activated { id, .. } => {
                if let Some(sink) = self.sink_for(*id) {
                    sink.activated(*id);
                }
            }
            DispatchResult::ActivatedAmbiguously { ids } => {
                for id in ids {
                    if let Some(sink) = self.sink_for(*id) {
                        sink.activated_ambiguously(*id);
                    }
                }
            }
        }
    }

    /// Resolve `sequence` and deliver the resulting notifications
    pub fn dispatch(
        &self,
        sequence: &KeySequence,
        tree: &dyn NodeTree,
        is_repeat: bool,
    ) -> DispatchResult {
        let result = self.resolve(sequence, tree, is_repeat);
        self.deliver(&result);
        result
    }

    fn sink_for(&self, id: ShortcutId) -> Option<Rc<dyn ActivationSink>> {
        self.inner.borrow().registry.live_sink(id)
    }

    /// Listen for [`Diagnostic`]s
    pub fn on_diagnostic(&self, listener: impl Fn(&Diagnostic) + 'static) -> ListenerId {
        let mut inner = self.inner.borrow_mut();
        inner.next_listener += 1;
        let id = ListenerId(inner.next_listener);
        let listener: DiagnosticListener = Rc::new(listener);
        inner.diagnostic_listeners.push((id, listener));
        id
    }

    pub fn remove_diagnostic_listener(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.diagnostic_listeners.len();
        inner.diagnostic_listeners.retain(|(existing, _)| *existing != id);
        inner.diagnostic_listeners.len() != before
    }

    fn emit(&self, diagnostics: &[Diagnostic]) {
        if diagnostics.is_empty() {
            return;
        }
        let listeners: Vec<DiagnosticListener> = self
            .inner
            .borrow()
            .diagnostic_listeners
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for diagnostic in diagnostics {
            for listener in &listeners {
                listener(diagnostic);
            }
        }
    }
}

impl Default for ShortcutMap {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShortcutMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShortcutMap")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
