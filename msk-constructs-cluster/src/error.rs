//! Error types for cluster assembly, synthesis and lookups.

use std::path::PathBuf;

use msk_constructs_policy::PolicyError;
use thiserror::Error;

use crate::annotations::Diagnostic;

/// Errors raised by the cluster construct and the stack it is synthesized in
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Connections were requested from a cluster that does not own its security groups
    #[error("An imported cluster cannot manage its security groups: {0}")]
    ImportedConnections(String),

    /// Two resources or outputs claimed the same logical id
    #[error("Duplicate logical id '{0}' in stack")]
    DuplicateLogicalId(String),

    /// A construct id with no alphanumeric characters cannot name a resource or output
    #[error("Construct id '{0}' must contain at least one alphanumeric character")]
    InvalidConstructId(String),

    /// Synthesis finished with error diagnostics
    #[error("Validation failed with {} error(s):\n{}", .0.len(), render_diagnostics(.0))]
    Validation(Vec<Diagnostic>),

    /// A cluster ARN could not be split into its name component
    #[error("Invalid MSK cluster ARN: {0}")]
    InvalidArn(String),

    #[error("Failed to read cluster properties from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse cluster properties: {0}")]
    Props(#[from] serde_json::Error),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    /// Unrecognized lookup field name
    #[error("Unknown lookup field '{0}'")]
    UnknownLookupField(String),

    /// The descriptive API call failed
    #[error("Lookup '{field}' failed: {message}")]
    LookupFailed { field: String, message: String },

    /// The descriptive API call succeeded but did not carry the field
    #[error("Lookup '{field}' returned no value for cluster {cluster_arn}")]
    LookupMissing { field: String, cluster_arn: String },
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub type ClusterResult<T> = Result<T, ClusterError>;
