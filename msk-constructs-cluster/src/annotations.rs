//! Diagnostics accumulated while constructs are assembled.
//!
//! Nothing here aborts: problems are recorded against a construct path and
//! surfaced together once synthesis finishes.

use std::fmt;

use log::{info, warn};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        };
        f.write_str(label)
    }
}

/// One problem (or note) attached to a construct path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub path: String,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Annotations {
    diagnostics: Vec<Diagnostic>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, path: &str, message: impl Into<String>) {
        self.push(DiagnosticLevel::Error, path, message.into());
    }

    pub fn add_warning(&mut self, path: &str, message: impl Into<String>) {
        self.push(DiagnosticLevel::Warning, path, message.into());
    }

    pub fn add_info(&mut self, path: &str, message: impl Into<String>) {
        self.push(DiagnosticLevel::Info, path, message.into());
    }

    fn push(&mut self, level: DiagnosticLevel, path: &str, message: String) {
        match level {
            DiagnosticLevel::Error | DiagnosticLevel::Warning => {
                warn!("{level} at {path}: {message}");
            }
            DiagnosticLevel::Info => info!("{path}: {message}"),
        }
        self.diagnostics.push(Diagnostic {
            level,
            path: path.to_string(),
            message,
        });
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}
