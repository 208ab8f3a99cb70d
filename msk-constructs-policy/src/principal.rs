//! Principals and the fragments they contribute to a statement.
//!
//! Every principal renders to a [`PrincipalFragment`]: a set of values grouped
//! by [`PrincipalType`] plus the conditions that must accompany them. Statements
//! merge fragments into their own principal map and condition map.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Map, Value};

use crate::condition::ConditionMap;
use crate::value::{normalize_values, unique_values, StringValue};

/// The wildcard that stands for "anyone" when used under the `AWS` tag
pub const ANYONE: &str = "*";

/// Closed set of principal tags accepted in a `Principal` block
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrincipalType {
    Aws,
    Service,
    Federated,
    CanonicalUser,
    Star,
}

impl PrincipalType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Service => "Service",
            Self::Federated => "Federated",
            Self::CanonicalUser => "CanonicalUser",
            Self::Star => "*",
        }
    }
}

impl fmt::Display for PrincipalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal values grouped by tag, in insertion order within each tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalMap {
    entries: BTreeMap<PrincipalType, Vec<StringValue>>,
}

impl PrincipalMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value under `kind`, creating the tag on first use
    pub fn insert(&mut self, kind: PrincipalType, value: impl Into<StringValue>) -> &mut Self {
        self.entries.entry(kind).or_default().push(value.into());
        self
    }

    /// Append every value of `other` under the matching tag
    pub fn merge(&mut self, other: &PrincipalMap) -> &mut Self {
        for (kind, values) in &other.entries {
            self.entries
                .entry(*kind)
                .or_default()
                .extend(values.iter().cloned());
        }
        self
    }

    pub fn get(&self, kind: PrincipalType) -> Option<&[StringValue]> {
        self.entries.get(&kind).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(Vec::is_empty)
    }

    /// Emit the `Principal` value.
    ///
    /// Each tag is normalized independently; a map reduced to `{"AWS": "*"}`
    /// is emitted as the bare `"*"`.
    pub fn to_json(&self) -> Option<Value> {
        let mut rendered = Map::new();
        for (kind, values) in &self.entries {
            if let Some(value) = normalize_values(&unique_values(values)) {
                rendered.insert(kind.as_str().to_string(), value);
            }
        }
        if rendered.is_empty() {
            return None;
        }
        Some(collapse_anyone_wildcard(rendered))
    }
}

/// `{"AWS": "*"}` and nothing else is written as `"*"`.
///
/// Only the `AWS` tag collapses; `Service`/`Federated` wildcards keep their object form.
fn collapse_anyone_wildcard(rendered: Map<String, Value>) -> Value {
    let is_anyone = rendered.len() == 1
        && rendered.get(PrincipalType::Aws.as_str()) == Some(&Value::String(ANYONE.to_string()));
    if is_anyone {
        Value::String(ANYONE.to_string())
    } else {
        Value::Object(rendered)
    }
}

/// What a principal contributes to a statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalFragment {
    pub principals: PrincipalMap,
    pub conditions: ConditionMap,
}

impl PrincipalFragment {
    pub fn new(kind: PrincipalType, value: impl Into<StringValue>) -> Self {
        let mut principals = PrincipalMap::new();
        principals.insert(kind, value);
        Self {
            principals,
            conditions: ConditionMap::new(),
        }
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: &ConditionMap) -> Self {
        self.conditions.merge(conditions);
        self
    }
}

/// Anything that can be placed in a statement's `Principal` block
pub trait PolicyPrincipal {
    fn policy_fragment(&self) -> PrincipalFragment;
}

/// The principal kinds supported by the builders
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// An IAM user, role or account ARN
    Arn(StringValue),
    /// The root of an account, given by its 12-digit id
    Account(StringValue),
    /// A service principal such as `kafka.amazonaws.com`
    Service(String),
    /// A federated identity provider with the conditions it requires
    Federated {
        provider: StringValue,
        conditions: ConditionMap,
    },
    /// An S3 canonical user id
    CanonicalUser(String),
    /// `{"AWS": "*"}`
    Anyone,
    /// `{"*": "*"}`
    Star,
}

impl Principal {
    pub fn arn(arn: impl Into<StringValue>) -> Self {
        Self::Arn(arn.into())
    }

    pub fn account(account_id: impl Into<StringValue>) -> Self {
        Self::Account(account_id.into())
    }

    pub fn service(service: impl Into<String>) -> Self {
        Self::Service(service.into())
    }

    pub fn federated(provider: impl Into<StringValue>, conditions: ConditionMap) -> Self {
        Self::Federated {
            provider: provider.into(),
            conditions,
        }
    }

    /// Attach extra conditions that travel with this principal
    #[must_use]
    pub fn with_conditions(self, conditions: ConditionMap) -> ConditionalPrincipal {
        ConditionalPrincipal {
            principal: self,
            conditions,
        }
    }
}

fn account_root_arn(account_id: &StringValue) -> StringValue {
    match account_id {
        StringValue::Literal(id) => StringValue::literal(format!("arn:aws:iam::{id}:root")),
        StringValue::Deferred(token) => StringValue::intrinsic(
            "Fn::Join",
            json!(["", ["arn:", {"Ref": "AWS::Partition"}, ":iam::", token, ":root"]]),
        ),
    }
}

impl PolicyPrincipal for Principal {
    fn policy_fragment(&self) -> PrincipalFragment {
        match self {
            Self::Arn(arn) => PrincipalFragment::new(PrincipalType::Aws, arn),
            Self::Account(id) => PrincipalFragment::new(PrincipalType::Aws, account_root_arn(id)),
            Self::Service(service) => PrincipalFragment::new(PrincipalType::Service, service),
            Self::Federated {
                provider,
                conditions,
            } => PrincipalFragment::new(PrincipalType::Federated, provider)
                .with_conditions(conditions),
            Self::CanonicalUser(id) => PrincipalFragment::new(PrincipalType::CanonicalUser, id),
            Self::Anyone => PrincipalFragment::new(PrincipalType::Aws, ANYONE),
            Self::Star => PrincipalFragment::new(PrincipalType::Star, ANYONE),
        }
    }
}

/// A principal paired with conditions added on top of its own
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalPrincipal {
    principal: Principal,
    conditions: ConditionMap,
}

impl PolicyPrincipal for ConditionalPrincipal {
    fn policy_fragment(&self) -> PrincipalFragment {
        self.principal
            .policy_fragment()
            .with_conditions(&self.conditions)
    }
}
