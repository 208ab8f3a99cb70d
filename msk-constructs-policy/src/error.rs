//! Error types for policy assembly.

use thiserror::Error;

/// Errors raised while preparing policy documents
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A base document was not a JSON object
    #[error("Base policy document must be a JSON object, got: {0}")]
    InvalidBase(String),

    /// A base document could not be parsed
    #[error("Failed to parse base policy document: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type PolicyResult<T> = Result<T, PolicyError>;
