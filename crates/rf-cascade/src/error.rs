//! Error types for round resolution

use thiserror::Error;

use crate::grid::Position;

/// Failure reported by an external collaborator (outcome oracle or settings)
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{service} unavailable: {message}")]
pub struct ServiceError {
    pub service: String,
    pub message: String,
}

impl ServiceError {
    pub fn new(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            message: message.into(),
        }
    }
}

/// Coarse error class, for mapping onto a transport status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or inconsistent request; caller's fault
    InvalidInput,
    /// External dependency failed; round aborted
    ServiceFailure,
}

/// Round resolution error
///
/// Every variant is raised before the caller's state is replaced, so a
/// failed phase never leaves a half-applied state behind.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CascadeError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid bet amount: {0}")]
    InvalidBet(f64),

    #[error("Invalid grid dimensions: expected {expected}x{expected}, got {actual}")]
    GridDimensions { expected: usize, actual: usize },

    #[error("Grid has an empty cell at ({}, {})", .0.x, .0.y)]
    IncompleteGrid(Position),

    #[error("Invalid stage-clear symbol at ({}, {}): {reason}", .position.x, .position.y)]
    InvalidStageClear { position: Position, reason: String },

    #[error("Position ({}, {}) is outside a {size}x{size} grid", .position.x, .position.y)]
    InvalidPosition { position: Position, size: usize },

    #[error("Settings error: {0}")]
    Settings(ServiceError),

    #[error("Outcome oracle error: {0}")]
    Oracle(ServiceError),
}

impl CascadeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CascadeError::Settings(_) | CascadeError::Oracle(_) => ErrorKind::ServiceFailure,
            _ => ErrorKind::InvalidInput,
        }
    }
}

/// Result type alias
pub type CascadeResult<T> = Result<T, CascadeError>;

/// Configuration loading / validation error
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("Missing level configuration: {0}")]
    MissingLevel(u8),

    #[error("Validation error: {0}")]
    Validation(String),
}
