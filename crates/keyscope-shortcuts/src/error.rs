//! Error types for shortcut parsing and configuration
//!
//! Nothing on the dispatch path returns these. Registration with an empty
//! sequence, unknown ids, double finalization and ambiguous matches are all
//! handled locally; see [`crate::registry::Diagnostic`] for the signals that
//! do reach the embedding framework.

use thiserror::Error;

/// Errors that can occur while parsing key chords and sequences
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Empty key sequence")]
    Empty,

    #[error("Invalid key syntax: {0}")]
    InvalidKeySyntax(String),

    #[error("Invalid modifier: {0}")]
    InvalidModifier(String),

    #[error("Key sequence has {0} chords, at most {max} are allowed", max = crate::models::MAX_CHORDS)]
    TooManyChords(usize),

    #[error("Unknown standard key: {0}")]
    UnknownStandardKey(String),
}

/// Errors that can occur while loading router configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    InvalidYaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
