//! Fatal engine errors.
//!
//! Ordinary "no data" outcomes are empty results, never errors. The variants here are
//! configuration or data faults the engine refuses to guess around.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No known root resolves from '{0}'")]
    UnresolvableRoot(String),
    #[error("Root resolver returned '{resolved}' for '{text}', which is not an indexed root")]
    UnindexedRoot { text: String, resolved: String },
    #[error("Pause mark on unexpected word '{word}' (word {number})")]
    UnknownPauseWord { word: String, number: usize },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}
