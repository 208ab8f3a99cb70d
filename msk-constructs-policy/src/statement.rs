//! Policy statement builder.
//!
//! Assembly is permissive: mutators never fail, and a statement missing a field
//! simply omits it when emitted. The `validate_*` methods report problems
//! separately so callers decide whether they are fatal.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::condition::ConditionMap;
use crate::principal::{PolicyPrincipal, Principal, PrincipalMap};
use crate::value::{normalize_values, unique_values, StringValue};

/// Whether a statement grants or denies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    #[default]
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Allow => "Allow",
            Self::Deny => "Deny",
        }
    }
}

/// A single allow/deny rule
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyStatement {
    sid: Option<String>,
    effect: Effect,
    actions: Vec<StringValue>,
    resources: Vec<StringValue>,
    principals: PrincipalMap,
    conditions: ConditionMap,
}

impl PolicyStatement {
    /// An empty `Allow` statement
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for an `Allow` statement over the given actions and resources
    pub fn allow<A, R>(
        actions: impl IntoIterator<Item = A>,
        resources: impl IntoIterator<Item = R>,
    ) -> Self
    where
        A: Into<StringValue>,
        R: Into<StringValue>,
    {
        let mut statement = Self::new();
        statement.add_actions(actions).add_resources(resources);
        statement
    }

    pub fn set_sid(&mut self, sid: impl Into<String>) -> &mut Self {
        self.sid = Some(sid.into());
        self
    }

    pub fn set_effect(&mut self, effect: Effect) -> &mut Self {
        self.effect = effect;
        self
    }

    pub fn add_action(&mut self, action: impl Into<StringValue>) -> &mut Self {
        self.actions.push(action.into());
        self
    }

    pub fn add_actions<A: Into<StringValue>>(
        &mut self,
        actions: impl IntoIterator<Item = A>,
    ) -> &mut Self {
        self.actions.extend(actions.into_iter().map(Into::into));
        self
    }

    pub fn add_resource(&mut self, resource: impl Into<StringValue>) -> &mut Self {
        self.resources.push(resource.into());
        self
    }

    pub fn add_resources<R: Into<StringValue>>(
        &mut self,
        resources: impl IntoIterator<Item = R>,
    ) -> &mut Self {
        self.resources.extend(resources.into_iter().map(Into::into));
        self
    }

    /// `Resource: "*"`
    pub fn add_all_resources(&mut self) -> &mut Self {
        self.add_resource("*")
    }

    /// Merge a principal's fragment: its values join the list for their tag and
    /// its conditions are appended to the statement's conditions.
    pub fn add_principal<P: PolicyPrincipal + ?Sized>(&mut self, principal: &P) -> &mut Self {
        let fragment = principal.policy_fragment();
        self.principals.merge(&fragment.principals);
        self.conditions.merge(&fragment.conditions);
        self
    }

    pub fn add_principals<'p>(
        &mut self,
        principals: impl IntoIterator<Item = &'p dyn PolicyPrincipal>,
    ) -> &mut Self {
        for principal in principals {
            self.add_principal(principal);
        }
        self
    }

    pub fn add_arn_principal(&mut self, arn: impl Into<StringValue>) -> &mut Self {
        self.add_principal(&Principal::arn(arn))
    }

    pub fn add_account_principal(&mut self, account_id: impl Into<StringValue>) -> &mut Self {
        self.add_principal(&Principal::account(account_id))
    }

    pub fn add_service_principal(&mut self, service: impl Into<String>) -> &mut Self {
        self.add_principal(&Principal::service(service))
    }

    pub fn add_federated_principal(
        &mut self,
        provider: impl Into<StringValue>,
        conditions: ConditionMap,
    ) -> &mut Self {
        self.add_principal(&Principal::federated(provider, conditions))
    }

    pub fn add_canonical_user_principal(&mut self, canonical_user_id: impl Into<String>) -> &mut Self {
        self.add_principal(&Principal::CanonicalUser(canonical_user_id.into()))
    }

    pub fn add_any_principal(&mut self) -> &mut Self {
        self.add_principal(&Principal::Anyone)
    }

    pub fn add_condition<V: Into<StringValue>>(
        &mut self,
        operator: impl Into<String>,
        key: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        self.conditions.add(operator, key, values);
        self
    }

    pub fn add_conditions(&mut self, conditions: &ConditionMap) -> &mut Self {
        self.conditions.merge(conditions);
        self
    }

    pub fn sid(&self) -> Option<&str> {
        self.sid.as_deref()
    }

    pub fn effect(&self) -> Effect {
        self.effect
    }

    pub fn actions(&self) -> &[StringValue] {
        &self.actions
    }

    pub fn resources(&self) -> &[StringValue] {
        &self.resources
    }

    pub fn has_principal(&self) -> bool {
        !self.principals.is_empty()
    }

    pub fn has_resource(&self) -> bool {
        !self.resources.is_empty()
    }

    /// Render as `{Sid?, Effect, Principal?, Action?, Resource?, Condition?}`
    pub fn to_json(&self) -> Value {
        let mut rendered = Map::new();
        if let Some(sid) = &self.sid {
            rendered.insert("Sid".to_string(), Value::String(sid.clone()));
        }
        rendered.insert(
            "Effect".to_string(),
            Value::String(self.effect.as_str().to_string()),
        );
        if let Some(principal) = self.principals.to_json() {
            rendered.insert("Principal".to_string(), principal);
        }
        if let Some(action) = normalize_values(&unique_values(&self.actions)) {
            rendered.insert("Action".to_string(), action);
        }
        if let Some(resource) = normalize_values(&unique_values(&self.resources)) {
            rendered.insert("Resource".to_string(), resource);
        }
        if let Some(condition) = self.conditions.to_json() {
            rendered.insert("Condition".to_string(), condition);
        }
        Value::Object(rendered)
    }

    /// Problems that make the statement unusable in any policy
    pub fn validate_for_any_policy(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.actions.is_empty() {
            errors.push("A PolicyStatement must specify at least one 'action'.".to_string());
        }
        errors
    }

    /// Problems that make the statement unusable in a policy attached to an identity
    pub fn validate_for_identity_policy(&self) -> Vec<String> {
        let mut errors = self.validate_for_any_policy();
        if self.has_principal() {
            errors.push(
                "A PolicyStatement used in an identity-based policy cannot specify any IAM principals."
                    .to_string(),
            );
        }
        if !self.has_resource() {
            errors.push(
                "A PolicyStatement used in an identity-based policy must specify at least one resource."
                    .to_string(),
            );
        }
        errors
    }

    /// Problems that make the statement unusable in a policy attached to a resource
    pub fn validate_for_resource_policy(&self) -> Vec<String> {
        let mut errors = self.validate_for_any_policy();
        if !self.has_principal() {
            errors.push(
                "A PolicyStatement used in a resource-based policy must specify at least one IAM principal."
                    .to_string(),
            );
        }
        errors
    }
}

impl Serialize for PolicyStatement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::STRING_EQUALS;
    use proptest::prelude::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_minimal_statement_only_has_effect() {
        assert_eq!(PolicyStatement::new().to_json(), json!({"Effect": "Allow"}));
    }

    #[test]
    fn test_full_statement_shape() {
        let mut statement = PolicyStatement::new();
        statement
            .set_sid("ReadBrokers")
            .set_effect(Effect::Deny)
            .add_actions(["kafka:GetBootstrapBrokers", "kafka:DescribeCluster"])
            .add_resource("arn:aws:kafka:us-east-1:123456789012:cluster/demo/abc")
            .add_account_principal("123456789012")
            .add_condition(STRING_EQUALS, "aws:RequestedRegion", ["us-east-1"]);

        assert_eq!(
            statement.to_json(),
            json!({
                "Sid": "ReadBrokers",
                "Effect": "Deny",
                "Principal": {"AWS": "arn:aws:iam::123456789012:root"},
                "Action": ["kafka:GetBootstrapBrokers", "kafka:DescribeCluster"],
                "Resource": "arn:aws:kafka:us-east-1:123456789012:cluster/demo/abc",
                "Condition": {"StringEquals": {"aws:RequestedRegion": "us-east-1"}}
            })
        );
    }

    #[test]
    fn test_any_principal_collapses() {
        let mut statement = PolicyStatement::new();
        statement.add_any_principal().add_action("kafka:*");
        assert_eq!(statement.to_json()["Principal"], json!("*"));
    }

    #[test]
    fn test_principal_conditions_merge_with_explicit_conditions() {
        let mut principal_conditions = ConditionMap::new();
        principal_conditions.add(STRING_EQUALS, "aws:SourceAccount", ["111111111111"]);

        let mut statement = PolicyStatement::new();
        statement
            .add_condition(STRING_EQUALS, "aws:SourceAccount", ["222222222222"])
            .add_principal(&Principal::service("kafka.amazonaws.com").with_conditions(principal_conditions));

        assert_eq!(
            statement.to_json()["Condition"],
            json!({"StringEquals": {"aws:SourceAccount": ["222222222222", "111111111111"]}})
        );
    }

    #[test]
    fn test_duplicate_actions_are_dropped_on_emit() {
        let mut statement = PolicyStatement::new();
        statement.add_actions(["kafka:DescribeCluster", "kafka:DescribeCluster"]);
        assert_eq!(statement.to_json()["Action"], json!("kafka:DescribeCluster"));
        assert_eq!(statement.actions().len(), 2);
    }

    #[test]
    fn test_add_principals_accepts_mixed_kinds() {
        let mut conditions = ConditionMap::new();
        conditions.add(STRING_EQUALS, "aws:PrincipalOrgID", ["o-123"]);
        let conditional = Principal::Anyone.with_conditions(conditions);
        let service = Principal::service("kafka.amazonaws.com");

        let mut statement = PolicyStatement::new();
        statement.add_principals([
            &conditional as &dyn PolicyPrincipal,
            &service as &dyn PolicyPrincipal,
        ]);

        let rendered = statement.to_json();
        assert_eq!(
            rendered["Principal"],
            json!({"AWS": "*", "Service": "kafka.amazonaws.com"})
        );
        assert_eq!(
            rendered["Condition"],
            json!({"StringEquals": {"aws:PrincipalOrgID": "o-123"}})
        );
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let statement = PolicyStatement::allow(["kafka:DescribeCluster"], ["*"]);
        let serialized = serde_json::to_value(&statement).expect("serialize");
        assert_eq!(serialized, statement.to_json());
    }

    #[rstest]
    #[case::no_actions(PolicyStatement::new(), 2)]
    #[case::complete(PolicyStatement::allow(["kafka:DescribeCluster"], ["*"]), 0)]
    fn test_validate_for_identity_policy(#[case] statement: PolicyStatement, #[case] expected: usize) {
        assert_eq!(statement.validate_for_identity_policy().len(), expected);
    }

    #[test]
    fn test_identity_policy_rejects_principals() {
        let mut statement = PolicyStatement::allow(["kafka:DescribeCluster"], ["*"]);
        statement.add_any_principal();
        let errors = statement.validate_for_identity_policy();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cannot specify any IAM principals"));
        assert!(statement.validate_for_resource_policy().is_empty());
    }

    #[test]
    fn test_canonical_and_federated_helpers() {
        let mut statement = PolicyStatement::new();
        statement
            .add_canonical_user_principal("79a59df900b949e55d96a1e698fbaced")
            .add_federated_principal("accounts.google.com", ConditionMap::new());
        assert_eq!(
            statement.to_json()["Principal"],
            json!({
                "CanonicalUser": "79a59df900b949e55d96a1e698fbaced",
                "Federated": "accounts.google.com"
            })
        );
    }

    proptest! {
        #[test]
        fn prop_single_resource_is_scalar(resource in "[a-z0-9:*/-]{1,40}") {
            let statement = PolicyStatement::allow(["kafka:DescribeCluster"], [resource.as_str()]);
            prop_assert_eq!(&statement.to_json()["Resource"], &json!(resource));
        }

        #[test]
        fn prop_distinct_actions_keep_order(
            actions in proptest::collection::btree_set("kafka:[A-Za-z]{1,12}", 2..6)
        ) {
            let ordered: Vec<String> = actions.into_iter().rev().collect();
            let mut statement = PolicyStatement::new();
            statement.add_actions(ordered.iter());
            prop_assert_eq!(&statement.to_json()["Action"], &json!(ordered));
        }

        #[test]
        fn prop_empty_fields_are_absent(sid in "[A-Za-z0-9]{1,10}") {
            let mut statement = PolicyStatement::new();
            statement.set_sid(sid).add_actions(Vec::<String>::new()).add_resources(Vec::<String>::new());
            let rendered = statement.to_json();
            prop_assert!(rendered.get("Action").is_none());
            prop_assert!(rendered.get("Resource").is_none());
            prop_assert!(rendered.get("Principal").is_none());
            prop_assert!(rendered.get("Condition").is_none());
        }
    }
}
