//! Scope matching: is a shortcut reachable from the focused node?

use crate::models::ShortcutScope;
use crate::tree::{NodeId, NodeKind, NodeTree};

/// Outcome of matching one shortcut against the current focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeMatch {
    Matched,
    NotMatched,
    /// The owner could not be traced to a window; never matches
    Unresolvable,
}

impl ScopeMatch {
    pub fn is_match(self) -> bool {
        self == ScopeMatch::Matched
    }
}

/// Stateless matcher for [`ShortcutScope`] rules
pub struct ScopeMatcher;

impl ScopeMatcher {
    /// Node whose subtree must contain the focus for a window-scoped shortcut.
    ///
    /// A window owner scopes to its content root; an item owner scopes to
    /// itself but must still live inside some window.
    pub fn scope_node(owner: NodeId, tree: &dyn NodeTree) -> Option<NodeId> {
        match tree.node_kind(owner)? {
            NodeKind::Window => tree.content_root(owner),
            NodeKind::Item => {
                tree.enclosing_window(owner)?;
                Some(owner)
            }
        }
    }

    /// Match `scope`/`owner` against `focus`
    pub fn matches(
        scope: ShortcutScope,
        owner: NodeId,
        focus: Option<NodeId>,
        tree: &dyn NodeTree,
    ) -> ScopeMatch {
        if scope == ShortcutScope::Application {
            return ScopeMatch::Matched;
        }

        let Some(scope_node) = Self::scope_node(owner, tree) else {
            return ScopeMatch::Unresolvable;
        };

        match focus {
            Some(focused) if tree.is_within(focused, scope_node) => ScopeMatch::Matched,
            _ => ScopeMatch::NotMatched,
        }
    }
}
