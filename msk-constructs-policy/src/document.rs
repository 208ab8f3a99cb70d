//! Policy documents assembled from statements.

use log::trace;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{PolicyError, PolicyResult};
use crate::statement::PolicyStatement;

/// Policy language version written when the base document does not name one
pub const POLICY_VERSION: &str = "2012-10-17";

const VERSION_KEY: &str = "Version";
const STATEMENT_KEY: &str = "Statement";

/// An ordered list of statements, optionally layered on top of a base document.
///
/// No deduplication happens here: two identical statements are emitted twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyDocument {
    statements: Vec<PolicyStatement>,
    base: Option<Map<String, Value>>,
}

impl PolicyDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing document; its statements come first in the output
    pub fn with_base(base: Value) -> PolicyResult<Self> {
        match base {
            Value::Object(map) => Ok(Self {
                statements: Vec::new(),
                base: Some(map),
            }),
            other => Err(PolicyError::InvalidBase(other.to_string())),
        }
    }

    /// Parse a base document from JSON text
    pub fn from_base_json(json: &str) -> PolicyResult<Self> {
        Self::with_base(serde_json::from_str(json)?)
    }

    pub fn add_statement(&mut self, statement: PolicyStatement) -> &mut Self {
        self.statements.push(statement);
        self
    }

    pub fn add_statements(
        &mut self,
        statements: impl IntoIterator<Item = PolicyStatement>,
    ) -> &mut Self {
        self.statements.extend(statements);
        self
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Statements added plus statements carried by the base document
    pub fn statement_count(&self) -> usize {
        self.statements.len() + self.base_statement_count()
    }

    pub fn is_empty(&self) -> bool {
        self.statement_count() == 0
    }

    fn base_statement_count(&self) -> usize {
        match self.base.as_ref().and_then(|base| base.get(STATEMENT_KEY)) {
            Some(Value::Array(statements)) => statements.len(),
            Some(Value::Null) | None => 0,
            Some(_) => 1,
        }
    }

    /// Emit the document, or `None` when there is neither a statement nor a base document.
    ///
    /// The base document's `Version` is kept when present; its `Statement`
    /// list is extended with the statements added here, in insertion order.
    pub fn resolve(&self) -> Option<Value> {
        if self.statements.is_empty() && self.base.is_none() {
            return None;
        }

        let mut document = self.base.clone().unwrap_or_default();
        let mut statements = match document.remove(STATEMENT_KEY) {
            Some(Value::Array(existing)) => existing,
            Some(Value::Null) | None => Vec::new(),
            Some(single) => vec![single],
        };
        statements.extend(self.statements.iter().map(PolicyStatement::to_json));
        trace!(
            "Resolved policy document with {} statement(s)",
            statements.len()
        );

        document
            .entry(VERSION_KEY)
            .or_insert_with(|| Value::String(POLICY_VERSION.to_string()));
        document.insert(STATEMENT_KEY.to_string(), Value::Array(statements));
        Some(Value::Object(document))
    }

    /// Identity-policy problems of every added statement, prefixed with the statement index
    pub fn validate_for_identity_policy(&self) -> Vec<String> {
        self.statements
            .iter()
            .enumerate()
            .flat_map(|(index, statement)| {
                statement
                    .validate_for_identity_policy()
                    .into_iter()
                    .map(move |error| format!("Statement {index}: {error}"))
            })
            .collect()
    }
}

impl Serialize for PolicyDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.resolve().serialize(serializer)
    }
}
