//! Error types shared by the evolution engine, simulator and persistence layer.

use std::fmt::Display;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Main error type for the evolution engine.
#[derive(Error, Debug)]
pub enum EvolutionError {
    /// Invalid settings, detected at startup.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Observation length does not match the genome's input width.
    #[error("Shape error: expected {expected} inputs, got {actual}")]
    Shape {
        /// Input width declared by the genome.
        expected: usize,
        /// Length of the vector that was supplied.
        actual: usize,
    },

    /// Two genomes that were expected to share one structure do not.
    #[error("Structure mismatch: {0}")]
    StructureMismatch(String),

    /// A genome record could not be read or written.
    #[error("Persistence error at {}: {message}", path.display())]
    Persistence {
        /// File or folder involved.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// An operation needed at least one candidate.
    #[error("Population is empty")]
    EmptyPopulation,
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EvolutionError>;

impl EvolutionError {
    /// Creates a new configuration error.
    #[must_use]
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a new structure mismatch error.
    #[must_use]
    pub fn structure_mismatch<S: Into<String>>(msg: S) -> Self {
        Self::StructureMismatch(msg.into())
    }

    /// Creates a new persistence error for `path`.
    #[must_use]
    pub fn persistence(path: impl AsRef<Path>, err: impl Display) -> Self {
        Self::Persistence {
            path: path.as_ref().to_path_buf(),
            message: err.to_string(),
        }
    }

    /// Whether the error concerns reading or writing genome records.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
