//! Scoped keyboard shortcut dispatch
//!
//! This crate provides the shortcut core for a retained-mode UI toolkit:
//! - Key chords and multi-chord sequences with text parsing and standard keys
//! - A shared shortcut map with unique ids and a prefix-searchable sequence table
//! - Shortcut handles with deferred registration and change notifications
//! - Window/application scope matching against the focused node
//! - A key router with chord timeouts and auto-repeat suppression
//! - YAML/JSON configuration for router settings

pub mod config;
pub mod error;
pub mod matcher;
pub mod models;
pub mod registry;
pub mod router;
pub mod shortcut;
pub mod table;
pub mod tree;

// Re-export public types
pub use config::RouterConfig;
pub use error::{ConfigError, ParseError};
pub use matcher::{ScopeMatch, ScopeMatcher};
pub use models::{
    Key, KeyChord, KeySequence, ListenerId, Modifier, Modifiers, ShortcutId, ShortcutScope,
    StandardKey, MAX_CHORDS,
};
pub use registry::{
    ActivationSink, Diagnostic, DispatchResult, ShortcutMap, ShortcutRecord, ShortcutRegistry,
};
pub use router::{KeyEvent, KeyEventKind, KeyRouter, RouteOutcome};
pub use shortcut::{Phase, Shortcut, ShortcutChange};
pub use table::{SequenceMatch, SequenceTable};
pub use tree::{NodeId, NodeKind, NodeTree, SceneTree};
