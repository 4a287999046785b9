//! The narrow view of the host UI tree that scope matching needs
//!
//! The host framework implements [`NodeTree`]; the shortcut core never walks
//! widgets directly. [`SceneTree`] is a small arena implementation used by
//! tests and the playground.

use std::collections::HashMap;
use std::fmt;

/// Opaque identifier of a host UI node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

/// What a node is, as far as scoping is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A top-level window; its shortcuts cover its content root
    Window,
    /// Anything living inside a window
    Item,
}

/// Queries the shortcut core makes against the host UI tree
pub trait NodeTree {
    /// The node that currently has keyboard focus
    fn focused_node(&self) -> Option<NodeId>;

    /// Kind of `node`, or `None` when the node is unknown or destroyed
    fn node_kind(&self, node: NodeId) -> Option<NodeKind>;

    /// The node directly containing `node`
    fn parent(&self, node: NodeId) -> Option<NodeId>;

    /// Content root of a window node
    fn content_root(&self, window: NodeId) -> Option<NodeId>;

    /// Whether `node` is `ancestor` or lies inside its subtree
    fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// The window enclosing `node`, walking containment edges upward
    fn enclosing_window(&self, node: NodeId) -> Option<NodeId> {
        let mut current = Some(node);
        while let Some(n) = current {
            if self.node_kind(n)? == NodeKind::Window {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }
}

#[derive(Debug, Clone)]
struct SceneNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    content_root: Option<NodeId>,
}

/// In-memory [`NodeTree`]: windows with a content root, items under them
#[derive(Debug, Clone, Default)]
pub struct SceneTree {
    nodes: HashMap<NodeId, SceneNode>,
    focus: Option<NodeId>,
    next_id: u64,
}

impl SceneTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> NodeId {
        self.next_id += 1;
        NodeId(self.next_id)
    }

    /// Add a window together with its content root item.
    ///
    /// Returns `(window, content_root)`.
    pub fn add_window(&mut self) -> (NodeId, NodeId) {
        let window = self.allocate();
        let root = self.allocate();
        self.nodes.insert(
            window,
            SceneNode {
                kind: NodeKind::Window,
                parent: None,
                content_root: Some(root),
            },
        );
        self.nodes.insert(
            root,
            SceneNode {
                kind: NodeKind::Item,
                parent: Some(window),
                content_root: None,
            },
        );
        (window, root)
    }

    /// Add an item under `parent`, or a detached item when `parent` is `None`
    pub fn add_item(&mut self, parent: Option<NodeId>) -> NodeId {
        let id = self.allocate();
        self.nodes.insert(
            id,
            SceneNode {
                kind: NodeKind::Item,
                parent,
                content_root: None,
            },
        );
        id
    }

    /// Move `node` under a new parent (or detach it).
    ///
    /// Returns `false` and leaves the tree untouched when `node` is unknown
    /// or when `parent` is `node` itself or one of its descendants.
    pub fn reparent(&mut self, node: NodeId, parent: Option<NodeId>) -> bool {
        if !self.nodes.contains_key(&node) {
            return false;
        }
        if let Some(parent) = parent {
            if self.is_within(parent, node) {
                tracing::debug!(%node, %parent, "refusing reparent that would form a cycle");
                return false;
            }
        }
        if let Some(entry) = self.nodes.get_mut(&node) {
            entry.parent = parent;
        }
        true
    }

    /// Remove `node` and everything below it. Returns the removed ids.
    pub fn remove(&mut self, node: NodeId) -> Vec<NodeId> {
        let doomed: Vec<NodeId> = self
            .nodes
            .keys()
            .copied()
            .filter(|&n| self.is_within(n, node))
            .collect();
        for n in &doomed {
            self.nodes.remove(n);
        }
        if self.focus.is_some_and(|f| doomed.contains(&f)) {
            self.focus = None;
        }
        doomed
    }

    /// Give keyboard focus to `node` (or clear it)
    pub fn set_focus(&mut self, node: Option<NodeId>) {
        self.focus = node.filter(|n| self.nodes.contains_key(n));
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeTree for SceneTree {
    fn focused_node(&self) -> Option<NodeId> {
        self.focus
    }

    fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.get(&node).map(|n| n.kind)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn content_root(&self, window: NodeId) -> Option<NodeId> {
        self.nodes.get(&window).and_then(|n| n.content_root)
    }
}
