//! Condition blocks keyed by operator and condition key.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::value::{normalize_values, StringValue};

/// `StringEquals`
pub const STRING_EQUALS: &str = "StringEquals";
/// `StringLike`
pub const STRING_LIKE: &str = "StringLike";
/// `ArnLike`
pub const ARN_LIKE: &str = "ArnLike";
/// `Bool`
pub const BOOL: &str = "Bool";

/// Conditions attached to a statement: operator -> condition key -> values.
///
/// Adding a value under an existing operator/key pair appends to the list for
/// that pair, so conditions contributed by principals and by explicit calls
/// accumulate rather than replace each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionMap {
    operators: BTreeMap<String, BTreeMap<String, Vec<StringValue>>>,
}

impl ConditionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append values under `operator` / `key`
    pub fn add<V>(
        &mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self
    where
        V: Into<StringValue>,
    {
        self.operators
            .entry(operator.into())
            .or_default()
            .entry(key.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// Fold another condition map into this one using the same append rule as [`ConditionMap::add`]
    pub fn merge(&mut self, other: &ConditionMap) -> &mut Self {
        for (operator, keys) in &other.operators {
            for (key, values) in keys {
                self.add(operator.clone(), key.clone(), values.iter());
            }
        }
        self
    }

    /// True when no operator carries any value
    pub fn is_empty(&self) -> bool {
        self.operators
            .values()
            .all(|keys| keys.values().all(Vec::is_empty))
    }

    pub fn get(&self, operator: &str, key: &str) -> Option<&[StringValue]> {
        self.operators
            .get(operator)
            .and_then(|keys| keys.get(key))
            .map(Vec::as_slice)
    }

    /// Emit the `Condition` block, or `None` if nothing survives normalization
    pub fn to_json(&self) -> Option<Value> {
        let mut rendered = Map::new();
        for (operator, keys) in &self.operators {
            let mut block = Map::new();
            for (key, values) in keys {
                if let Some(value) = normalize_values(values) {
                    block.insert(key.clone(), value);
                }
            }
            if !block.is_empty() {
                rendered.insert(operator.clone(), Value::Object(block));
            }
        }
        (!rendered.is_empty()).then_some(Value::Object(rendered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_appends_per_key() {
        let mut conditions = ConditionMap::new();
        conditions.add(STRING_EQUALS, "aws:SourceAccount", ["111111111111"]);
        conditions.add(STRING_EQUALS, "aws:SourceAccount", ["222222222222"]);
        conditions.add(BOOL, "aws:SecureTransport", ["true"]);

        assert_eq!(
            conditions.to_json(),
            Some(json!({
                "Bool": {"aws:SecureTransport": "true"},
                "StringEquals": {"aws:SourceAccount": ["111111111111", "222222222222"]}
            }))
        );
    }

    #[test]
    fn test_merge_uses_append_rule() {
        let mut left = ConditionMap::new();
        left.add(STRING_LIKE, "kafka:topic", ["orders-*"]);
        let mut right = ConditionMap::new();
        right.add(STRING_LIKE, "kafka:topic", ["payments-*"]);

        left.merge(&right);

        assert_eq!(
            left.get(STRING_LIKE, "kafka:topic"),
            Some(
                &[
                    StringValue::from("orders-*"),
                    StringValue::from("payments-*")
                ][..]
            )
        );
    }

    #[test]
    fn test_empty_values_are_omitted() {
        let mut conditions = ConditionMap::new();
        conditions.add(ARN_LIKE, "aws:SourceArn", Vec::<String>::new());

        assert!(conditions.is_empty());
        assert_eq!(conditions.to_json(), None);
    }
}
