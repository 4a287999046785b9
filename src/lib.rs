//! Shared fixtures for the workspace integration tests
//!
//! [`Desktop`] wires a [`SceneTree`], a [`ShortcutMap`] and a [`KeyRouter`]
//! together the way a host toolkit would, including the node-destruction
//! path that tears down shortcuts owned by removed nodes.

use std::cell::Cell;
use std::rc::Rc;

use keyscope_shortcuts::{
    KeyChord, KeyEvent, KeyRouter, NodeId, RouteOutcome, RouterConfig, SceneTree, Shortcut, ShortcutMap,
};

/// A host toolkit stand-in
pub struct Desktop {
    pub tree: SceneTree,
    pub map: ShortcutMap,
    pub router: KeyRouter,
}

impl Desktop {
    pub fn new() -> Self {
        Self::with_config(&RouterConfig::default())
    }

    pub fn with_config(config: &RouterConfig) -> Self {
        let map = ShortcutMap::with_config(config);
        Desktop {
            tree: SceneTree::new(),
            router: KeyRouter::new(map.clone(), config),
            map,
        }
    }

    /// Destroy `node` and its subtree, dropping the shortcuts they own
    pub fn destroy(&mut self, node: NodeId) -> usize {
        self.tree
            .remove(node)
            .into_iter()
            .map(|removed| self.map.remove_owner(removed))
            .sum()
    }

    pub fn focus(&mut self, node: NodeId) {
        self.tree.set_focus(Some(node));
        self.router.reset();
    }

    pub fn press(&mut self, chord: &str) -> RouteOutcome {
        self.send(KeyEvent::press(parse_chord(chord)))
    }

    pub fn repeat(&mut self, chord: &str) -> RouteOutcome {
        self.send(KeyEvent::repeat(parse_chord(chord)))
    }

    pub fn release(&mut self, chord: &str) -> RouteOutcome {
        self.send(KeyEvent::release(parse_chord(chord)))
    }

    pub fn send(&mut self, event: KeyEvent) -> RouteOutcome {
        self.router.handle_key(&event, &self.tree)
    }
}

impl Default for Desktop {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse chord text, panicking on invalid fixtures
pub fn parse_chord(text: &str) -> KeyChord {
    match text.parse() {
        Ok(chord) => chord,
        Err(err) => panic!("invalid chord fixture {:?}: {}", text, err),
    }
}

/// Activation and ambiguity counters attached to a shortcut
pub struct Hits {
    pub activated: Rc<Cell<u32>>,
    pub ambiguous: Rc<Cell<u32>>,
}

impl Hits {
    pub fn attach(shortcut: &Shortcut) -> Self {
        let activated = Rc::new(Cell::new(0));
        let ambiguous = Rc::new(Cell::new(0));
        let a = Rc::clone(&activated);
        shortcut.on_activated(move || a.set(a.get() + 1));
        let b = Rc::clone(&ambiguous);
        shortcut.on_activated_ambiguously(move || b.set(b.get() + 1));
        Hits {
            activated,
            ambiguous,
        }
    }

    pub fn activated(&self) -> u32 {
        self.activated.get()
    }

    pub fn ambiguous(&self) -> u32 {
        self.ambiguous.get()
    }
}
