//! Core data models for shortcuts: keys, chords, sequences, scopes and ids

use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ParseError;

/// Maximum number of chords in a single key sequence
pub const MAX_CHORDS: usize = 4;

/// Represents a single keyboard modifier (Ctrl, Shift, Alt, Meta)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Ctrl,
    Shift,
    Alt,
    Meta,
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modifier::Ctrl => write!(f, "Ctrl"),
            Modifier::Shift => write!(f, "Shift"),
            Modifier::Alt => write!(f, "Alt"),
            Modifier::Meta => write!(f, "Meta"),
        }
    }
}

impl FromStr for Modifier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ctrl" | "control" => Ok(Modifier::Ctrl),
            "shift" => Ok(Modifier::Shift),
            "alt" | "option" => Ok(Modifier::Alt),
            "meta" | "cmd" | "command" | "super" | "win" => Ok(Modifier::Meta),
            _ => Err(ParseError::InvalidModifier(s.to_string())),
        }
    }
}

bitflags! {
    /// Normalized set of modifiers held during a key press.
    ///
    /// Two chords compare equal regardless of the order their modifiers were
    /// written in, so `Shift+Ctrl+N` and `Ctrl+Shift+N` are the same chord.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct Modifiers: u8 {
        const CTRL = 1 << 0;
        const ALT = 1 << 1;
        const SHIFT = 1 << 2;
        const META = 1 << 3;
    }
}

impl From<Modifier> for Modifiers {
    fn from(modifier: Modifier) -> Self {
        match modifier {
            Modifier::Ctrl => Modifiers::CTRL,
            Modifier::Shift => Modifiers::SHIFT,
            Modifier::Alt => Modifiers::ALT,
            Modifier::Meta => Modifiers::META,
        }
    }
}

impl Modifiers {
    /// Modifiers in display order
    fn ordered(self) -> impl Iterator<Item = Modifier> {
        [
            (Modifiers::CTRL, Modifier::Ctrl),
            (Modifiers::ALT, Modifier::Alt),
            (Modifiers::SHIFT, Modifier::Shift),
            (Modifiers::META, Modifier::Meta),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, modifier)| modifier)
    }
}

/// Represents a key on the keyboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// A printable character. ASCII letters are stored uppercase.
    Char(char),
    F(u8),
    Space,
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Insert,
    Home,
    End,
    PageUp,
    PageDown,
    Up,
    Down,
    Left,
    Right,
}

impl Key {
    /// Character key, normalizing ASCII letters to uppercase
    pub fn char(c: char) -> Self {
        Key::Char(c.to_ascii_uppercase())
    }

    fn normalized(self) -> Self {
        match self {
            Key::Char(' ') => Key::Space,
            Key::Char(c) => Key::Char(c.to_ascii_uppercase()),
            other => other,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c),
            Key::F(n) => write!(f, "F{}", n),
            Key::Space => write!(f, "Space"),
            Key::Enter => write!(f, "Enter"),
            Key::Escape => write!(f, "Escape"),
            Key::Tab => write!(f, "Tab"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Insert => write!(f, "Insert"),
            Key::Home => write!(f, "Home"),
            Key::End => write!(f, "End"),
            Key::PageUp => write!(f, "PageUp"),
            Key::PageDown => write!(f, "PageDown"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
        }
    }
}

impl FromStr for Key {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Ok(Key::char(c).normalized());
        }

        match s.to_lowercase().as_str() {
            "" => Err(ParseError::Empty),
            "space" | "spacebar" => Ok(Key::Space),
            "enter" | "return" => Ok(Key::Enter),
            "escape" | "esc" => Ok(Key::Escape),
            "tab" => Ok(Key::Tab),
            "backspace" | "bksp" => Ok(Key::Backspace),
            "delete" | "del" => Ok(Key::Delete),
            "insert" | "ins" => Ok(Key::Insert),
            "home" => Ok(Key::Home),
            "end" => Ok(Key::End),
            "pageup" | "page_up" | "pgup" => Ok(Key::PageUp),
            "pagedown" | "page_down" | "pgdn" => Ok(Key::PageDown),
            "up" => Ok(Key::Up),
            "down" => Ok(Key::Down),
            "left" => Ok(Key::Left),
            "right" => Ok(Key::Right),
            lower if lower.starts_with('f') => {
                let num: u8 = lower[1..].parse().map_err(|_| {
                    ParseError::InvalidKeySyntax(format!("Unknown key: {}", s))
                })?;
                if (1..=24).contains(&num) {
                    Ok(Key::F(num))
                } else {
                    Err(ParseError::InvalidKeySyntax(format!(
                        "Function key must be F1-F24, got: {}",
                        s
                    )))
                }
            }
            _ => Err(ParseError::InvalidKeySyntax(format!("Unknown key: {}", s))),
        }
    }
}

/// One keystroke of a sequence: a key plus the modifiers held with it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeyChord {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyChord {
    /// Create a chord, normalizing the key
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        KeyChord {
            key: key.normalized(),
            modifiers,
        }
    }

    /// Chord without modifiers
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// Ctrl+key chord
    pub fn ctrl(key: Key) -> Self {
        Self::new(key, Modifiers::CTRL)
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in self.modifiers.ordered() {
            write!(f, "{}+", modifier)?;
        }
        write!(f, "{}", self.key)
    }
}

impl FromStr for KeyChord {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::Empty);
        }

        // "Ctrl++" and "+" name the plus key itself
        let (modifier_part, key_part) = if s == "+" {
            ("", "+")
        } else if let Some(prefix) = s.strip_suffix("++") {
            (prefix, "+")
        } else {
            match s.rsplit_once('+') {
                Some((prefix, key)) => (prefix, key),
                None => ("", s),
            }
        };

        let mut modifiers = Modifiers::empty();
        if !modifier_part.is_empty() {
            for part in modifier_part.split('+') {
                modifiers |= Modifiers::from(Modifier::from_str(part)?);
            }
        }

        if key_part.trim().is_empty() {
            return Err(ParseError::InvalidKeySyntax(format!(
                "Missing key in chord: {}",
                s
            )));
        }
        let key = Key::from_str(key_part)?;

        Ok(KeyChord::new(key, modifiers))
    }
}

/// An ordered list of up to [`MAX_CHORDS`] chords.
///
/// The empty sequence is a valid value meaning "no shortcut"; the registry
/// never stores it.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeySequence {
    chords: Vec<KeyChord>,
}

impl KeySequence {
    /// The empty sequence
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a sequence from chords
    pub fn new(chords: Vec<KeyChord>) -> Result<Self, ParseError> {
        if chords.len() > MAX_CHORDS {
            return Err(ParseError::TooManyChords(chords.len()));
        }
        Ok(KeySequence { chords })
    }

    /// Single-chord sequence
    pub fn single(chord: KeyChord) -> Self {
        KeySequence {
            chords: vec![chord],
        }
    }

    pub fn chords(&self) -> &[KeyChord] {
        &self.chords
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }

    /// Whether `self` begins with every chord of `prefix`
    pub fn starts_with(&self, prefix: &KeySequence) -> bool {
        self.chords.starts_with(&prefix.chords)
    }

    /// Copy of this sequence with one more chord, or `None` when full
    pub fn with_chord(&self, chord: KeyChord) -> Option<KeySequence> {
        if self.chords.len() >= MAX_CHORDS {
            return None;
        }
        let mut chords = self.chords.clone();
        chords.push(chord);
        Some(KeySequence { chords })
    }

    /// Parse sequence text, treating blank input as the empty sequence
    pub fn parse(s: &str) -> Result<Self, ParseError> {
        if s.trim().is_empty() {
            return Ok(Self::empty());
        }
        s.parse()
    }
}

impl From<KeyChord> for KeySequence {
    fn from(chord: KeyChord) -> Self {
        KeySequence::single(chord)
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, chord) in self.chords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", chord)?;
        }
        Ok(())
    }
}

impl FromStr for KeySequence {
    type Err = ParseError;

    /// Parses comma separated chords, e.g. `"Ctrl+K, Ctrl+C"`.
    ///
    /// A comma directly after `+` (or at the start of a chord) is the comma
    /// key rather than a separator, so `"Ctrl+,"` is one chord.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = Vec::new();
        let mut current = String::new();
        for c in s.chars() {
            let literal = current.trim().is_empty() || current.ends_with('+');
            if c == ',' && !literal {
                parts.push(std::mem::take(&mut current));
            } else {
                current.push(c);
            }
        }
        parts.push(current);

        if parts.len() > MAX_CHORDS {
            return Err(ParseError::TooManyChords(parts.len()));
        }

        let chords = parts
            .iter()
            .map(|part| KeyChord::from_str(part))
            .collect::<Result<Vec<_>, _>>()?;
        KeySequence::new(chords)
    }
}

impl Serialize for KeySequence {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for KeySequence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        if let Ok(standard) = StandardKey::from_str(&text) {
            return Ok(standard.sequence());
        }
        KeySequence::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Platform-neutral names for common shortcuts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardKey {
    Copy,
    Cut,
    Paste,
    Undo,
    Redo,
    Save,
    Open,
    New,
    Close,
    Quit,
    Find,
    FindNext,
    SelectAll,
    Print,
    Refresh,
    HelpContents,
    ZoomIn,
    ZoomOut,
    Delete,
    Cancel,
}

impl StandardKey {
    /// The conventional sequence for this key
    pub fn sequence(self) -> KeySequence {
        let chord = match self {
            StandardKey::Copy => KeyChord::ctrl(Key::Char('C')),
            StandardKey::Cut => KeyChord::ctrl(Key::Char('X')),
            StandardKey::Paste => KeyChord::ctrl(Key::Char('V')),
            StandardKey::Undo => KeyChord::ctrl(Key::Char('Z')),
            StandardKey::Redo => {
                KeyChord::new(Key::Char('Z'), Modifiers::CTRL | Modifiers::SHIFT)
            }
            StandardKey::Save => KeyChord::ctrl(Key::Char('S')),
            StandardKey::Open => KeyChord::ctrl(Key::Char('O')),
            StandardKey::New => KeyChord::ctrl(Key::Char('N')),
            StandardKey::Close => KeyChord::ctrl(Key::Char('W')),
            StandardKey::Quit => KeyChord::ctrl(Key::Char('Q')),
            StandardKey::Find => KeyChord::ctrl(Key::Char('F')),
            StandardKey::FindNext => KeyChord::plain(Key::F(3)),
            StandardKey::SelectAll => KeyChord::ctrl(Key::Char('A')),
            StandardKey::Print => KeyChord::ctrl(Key::Char('P')),
            StandardKey::Refresh => KeyChord::plain(Key::F(5)),
            StandardKey::HelpContents => KeyChord::plain(Key::F(1)),
            StandardKey::ZoomIn => KeyChord::ctrl(Key::Char('+')),
            StandardKey::ZoomOut => KeyChord::ctrl(Key::Char('-')),
            StandardKey::Delete => KeyChord::plain(Key::Delete),
            StandardKey::Cancel => KeyChord::plain(Key::Escape),
        };
        KeySequence::single(chord)
    }
}

impl From<StandardKey> for KeySequence {
    fn from(key: StandardKey) -> Self {
        key.sequence()
    }
}

impl FromStr for StandardKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "copy" => Ok(StandardKey::Copy),
            "cut" => Ok(StandardKey::Cut),
            "paste" => Ok(StandardKey::Paste),
            "undo" => Ok(StandardKey::Undo),
            "redo" => Ok(StandardKey::Redo),
            "save" => Ok(StandardKey::Save),
            "open" => Ok(StandardKey::Open),
            "new" => Ok(StandardKey::New),
            "close" => Ok(StandardKey::Close),
            "quit" => Ok(StandardKey::Quit),
            "find" => Ok(StandardKey::Find),
            "findnext" => Ok(StandardKey::FindNext),
            "selectall" => Ok(StandardKey::SelectAll),
            "print" => Ok(StandardKey::Print),
            "refresh" => Ok(StandardKey::Refresh),
            "helpcontents" | "help" => Ok(StandardKey::HelpContents),
            "zoomin" => Ok(StandardKey::ZoomIn),
            "zoomout" => Ok(StandardKey::ZoomOut),
            "delete" => Ok(StandardKey::Delete),
            "cancel" => Ok(StandardKey::Cancel),
            _ => Err(ParseError::UnknownStandardKey(s.to_string())),
        }
    }
}

/// Reachability rule for a shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortcutScope {
    /// Matches regardless of focus
    Application,
    /// Matches only while focus is inside the owner's window or item subtree
    #[default]
    Window,
}

impl fmt::Display for ShortcutScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortcutScope::Application => write!(f, "application"),
            ShortcutScope::Window => write!(f, "window"),
        }
    }
}

impl FromStr for ShortcutScope {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "application" | "app" | "global" => Ok(ShortcutScope::Application),
            "window" => Ok(ShortcutScope::Window),
            _ => Err(ParseError::InvalidKeySyntax(format!(
                "Unknown scope: {}",
                s
            ))),
        }
    }
}

/// Identifier of a live registration. Never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShortcutId(NonZeroU32);

impl ShortcutId {
    pub(crate) fn new(raw: NonZeroU32) -> Self {
        ShortcutId(raw)
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for ShortcutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Handle returned when registering a listener, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);
