//! Scenario files: a small UI tree, its shortcuts and a script of key events

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use keyscope_shortcuts::{
    KeyChord, KeyEvent, KeyEventKind, KeyRouter, NodeId, NodeKind, NodeTree, RouteOutcome,
    RouterConfig, SceneTree, Shortcut, ShortcutMap, ShortcutScope,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: Option<RouterConfig>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub shortcuts: Vec<ShortcutSpec>,
    /// Steps are written as single-key maps such as `press: "Ctrl+S"`
    #[serde(with = "serde_yaml::with::singleton_map_recursive")]
    pub steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub kind: NodeKindSpec,
    /// Window or item to nest under; a window parent means its content root
    #[serde(default)]
    pub parent: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKindSpec {
    Window,
    Item,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ShortcutSpec {
    pub name: String,
    pub owner: String,
    /// Chord text such as `Ctrl+K, Ctrl+C` or a standard key name
    pub sequence: String,
    #[serde(default)]
    pub scope: ShortcutScope,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub auto_repeat: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Focus(Option<String>),
    Press(String),
    Repeat(String),
    Release(String),
    WaitMs(u64),
    Remove(String),
    Enable(String),
    Disable(String),
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Focus(Some(name)) => write!(f, "focus {}", name),
            Step::Focus(None) => write!(f, "focus <none>"),
            Step::Press(chord) => write!(f, "press {}", chord),
            Step::Repeat(chord) => write!(f, "repeat {}", chord),
            Step::Release(chord) => write!(f, "release {}", chord),
            Step::WaitMs(ms) => write!(f, "wait {}ms", ms),
            Step::Remove(name) => write!(f, "remove {}", name),
            Step::Enable(name) => write!(f, "enable {}", name),
            Step::Disable(name) => write!(f, "disable {}", name),
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).context("invalid scenario")
    }
}

/// A scenario loaded into a live tree, map and router
pub struct Replay {
    tree: SceneTree,
    router: KeyRouter,
    nodes: HashMap<String, NodeId>,
    shortcuts: HashMap<String, Shortcut>,
    log: Rc<RefCell<Vec<String>>>,
    clock: Instant,
}

impl Replay {
    pub fn new(scenario: &Scenario, fallback: &RouterConfig) -> Result<Self> {
        let config = scenario.config.clone().unwrap_or_else(|| fallback.clone());
        config.validate()?;
        let map = ShortcutMap::with_config(&config);
        let log = Rc::new(RefCell::new(Vec::new()));

        let diagnostics = Rc::clone(&log);
        map.on_diagnostic(move |diagnostic| {
            diagnostics
                .borrow_mut()
                .push(format!("diagnostic: {:?}", diagnostic));
        });

        let mut tree = SceneTree::new();
        let mut nodes = HashMap::new();
        for spec in &scenario.nodes {
            let parent = match &spec.parent {
                Some(name) => Some(Self::attach_point(&tree, &nodes, name)?),
                None => None,
            };
            let id = match spec.kind {
                NodeKindSpec::Window => {
                    if parent.is_some() {
                        bail!("window {} cannot have a parent", spec.name);
                    }
                    tree.add_window().0
                }
                NodeKindSpec::Item => tree.add_item(parent),
            };
            if nodes.insert(spec.name.clone(), id).is_some() {
                bail!("duplicate node name {}", spec.name);
            }
        }

        let mut shortcuts = HashMap::new();
        for spec in &scenario.shortcuts {
            let owner = *nodes
                .get(&spec.owner)
                .ok_or_else(|| anyhow!("shortcut {} has unknown owner {}", spec.name, spec.owner))?;
            let shortcut = Shortcut::declare(&map, owner);
            shortcut
                .set_sequence_text(&spec.sequence)
                .with_context(|| format!("shortcut {}", spec.name))?;
            shortcut.set_scope(spec.scope);
            shortcut.set_enabled(spec.enabled);
            shortcut.set_auto_repeat(spec.auto_repeat);
            shortcut.finalize();

            let name = spec.name.clone();
            let activated = Rc::clone(&log);
            shortcut.on_activated(move || activated.borrow_mut().push(format!("activated {}", name)));
            let name = spec.name.clone();
            let ambiguous = Rc::clone(&log);
            shortcut.on_activated_ambiguously(move || {
                ambiguous
                    .borrow_mut()
                    .push(format!("ambiguous {}", name))
            });

            if shortcuts.insert(spec.name.clone(), shortcut).is_some() {
                bail!("duplicate shortcut name {}", spec.name);
            }
        }

        Ok(Replay {
            tree,
            router: KeyRouter::new(map, &config),
            nodes,
            shortcuts,
            log,
            clock: Instant::now(),
        })
    }

    /// Node that stands for `name` inside the tree: a window's content root
    /// or the item itself
    fn attach_point(tree: &SceneTree, nodes: &HashMap<String, NodeId>, name: &str) -> Result<NodeId> {
        let node = *nodes
            .get(name)
            .ok_or_else(|| anyhow!("unknown parent node {}", name))?;
        match tree.node_kind(node) {
            Some(NodeKind::Window) => tree
                .content_root(node)
                .ok_or_else(|| anyhow!("window {} has no content root", name)),
            Some(NodeKind::Item) => Ok(node),
            None => bail!("parent node {} no longer exists", name),
        }
    }

    fn node(&self, name: &str) -> Result<NodeId> {
        self.nodes
            .get(name)
            .copied()
            .ok_or_else(|| anyhow!("unknown node {}", name))
    }

    fn shortcut(&self, name: &str) -> Result<&Shortcut> {
        self.shortcuts
            .get(name)
            .ok_or_else(|| anyhow!("unknown shortcut {}", name))
    }

    fn key(&mut self, text: &str, kind: KeyEventKind) -> Result<String> {
        let chord: KeyChord = text
            .parse()
            .with_context(|| format!("invalid chord {}", text))?;
        let event = KeyEvent::new(chord.key, chord.modifiers, kind, self.clock);
        let outcome = self.router.handle_key(&event, &self.tree);
        Ok(describe(&outcome))
    }

    /// Run one step and return the lines it produced
    pub fn step(&mut self, step: &Step) -> Result<Vec<String>> {
        let summary = match step {
            Step::Focus(name) => {
                let node = name
                    .as_deref()
                    .map(|name| Self::attach_point(&self.tree, &self.nodes, name))
                    .transpose()?;
                self.tree.set_focus(node);
                self.router.reset();
                "focus changed".to_string()
            }
            Step::Press(text) => self.key(text, KeyEventKind::Press)?,
            Step::Repeat(text) => self.key(text, KeyEventKind::Repeat)?,
            Step::Release(text) => self.key(text, KeyEventKind::Release)?,
            Step::WaitMs(ms) => {
                self.clock += Duration::from_millis(*ms);
                if self.router.expire(self.clock) {
                    "pending chords expired".to_string()
                } else {
                    "idle".to_string()
                }
            }
            Step::Remove(name) => {
                let node = self.node(name)?;
                let removed = self.tree.remove(node);
                let map = self.router.map().clone();
                let count: usize = removed.iter().map(|node| map.remove_owner(*node)).sum();
                format!("removed {} node(s), {} shortcut(s)", removed.len(), count)
            }
            Step::Enable(name) => {
                self.shortcut(name)?.set_enabled(true);
                "enabled".to_string()
            }
            Step::Disable(name) => {
                self.shortcut(name)?.set_enabled(false);
                "disabled".to_string()
            }
        };

        let mut lines = vec![summary];
        lines.extend(self.log.borrow_mut().drain(..));
        Ok(lines)
    }
}

fn describe(outcome: &RouteOutcome) -> String {
    match outcome {
        RouteOutcome::NoMatch => "no match".to_string(),
        RouteOutcome::Pending => "pending".to_string(),
        RouteOutcome::Suppressed => "suppressed".to_string(),
        RouteOutcome::Ignored => "ignored".to_string(),
        RouteOutcome::Dispatched(result) => format!("dispatched {:?}", result),
    }
}
