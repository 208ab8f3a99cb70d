//! Deferred lookups of broker and ZooKeeper connection strings.
//!
//! These strings only exist once the cluster is running, so they are fetched
//! by a custom resource that calls the Kafka API at deployment time. Lookups
//! work in two phases: constructs register what they need and get a
//! [`LookupHandle`] back straight away; the stack resolves every registration
//! exactly once during synthesis, emitting one custom resource per field.

mod client;

use std::fmt;
use std::str::FromStr;

use log::debug;
use msk_constructs_policy::{PolicyDocument, PolicyStatement, StringValue};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::annotations::{Diagnostic, DiagnosticLevel};
use crate::error::{ClusterError, ClusterResult};
use crate::stack::{logical_id, CfnResource, RemovalPolicy};

pub use client::{fetch, BootstrapBrokers, KafkaLookupClient, LookupClient, ZookeeperConnection};

/// Logical id of the shared function that serves `Custom::AWS` resources
pub const PROVIDER_FUNCTION_ID: &str = "AWS679f53fac002430cb0da5b7982bd22872D164C4C";
/// Logical id of the role assumed by that function
pub const PROVIDER_ROLE_ID: &str = "AWS679f53fac002430cb0da5b7982bd2287ServiceRoleC1EA0FF2";

const CUSTOM_RESOURCE_TYPE: &str = "Custom::AWS";
const POLICY_RESOURCE_TYPE: &str = "AWS::IAM::Policy";
const CLUSTER_ARN_PLACEHOLDER: &str = "__MSK_CLUSTER_ARN__";

/// The descriptive Kafka API call behind a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookupCall {
    GetBootstrapBrokers,
    DescribeCluster,
}

impl LookupCall {
    /// Action name as understood by the custom resource provider
    pub fn sdk_action(self) -> &'static str {
        match self {
            Self::GetBootstrapBrokers => "getBootstrapBrokers",
            Self::DescribeCluster => "describeCluster",
        }
    }

    /// IAM action the provider needs to make the call
    pub fn iam_action(self) -> &'static str {
        match self {
            Self::GetBootstrapBrokers => "kafka:GetBootstrapBrokers",
            Self::DescribeCluster => "kafka:DescribeCluster",
        }
    }

    fn construct_prefix(self) -> &'static str {
        match self {
            Self::GetBootstrapBrokers => "BootstrapBrokers",
            Self::DescribeCluster => "ZookeeperConnect",
        }
    }

    fn physical_resource_id(self) -> &'static str {
        match self {
            Self::GetBootstrapBrokers => "BootstrapBrokers",
            Self::DescribeCluster => "ZooKeeperConnectionString",
        }
    }
}

/// A connection string that can be looked up for a cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LookupField {
    BootstrapBrokerString,
    BootstrapBrokerStringTls,
    BootstrapBrokerStringSaslScram,
    ZookeeperConnectString,
    ZookeeperConnectStringTls,
}

impl LookupField {
    pub const ALL: [Self; 5] = [
        Self::BootstrapBrokerString,
        Self::BootstrapBrokerStringTls,
        Self::BootstrapBrokerStringSaslScram,
        Self::ZookeeperConnectString,
        Self::ZookeeperConnectStringTls,
    ];

    /// Field name in the API response
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BootstrapBrokerString => "BootstrapBrokerString",
            Self::BootstrapBrokerStringTls => "BootstrapBrokerStringTls",
            Self::BootstrapBrokerStringSaslScram => "BootstrapBrokerStringSaslScram",
            Self::ZookeeperConnectString => "ZookeeperConnectString",
            Self::ZookeeperConnectStringTls => "ZookeeperConnectStringTls",
        }
    }

    /// Short name accepted on the command line
    pub fn alias(self) -> &'static str {
        match self {
            Self::BootstrapBrokerString => "bootstrap-brokers",
            Self::BootstrapBrokerStringTls => "bootstrap-brokers-tls",
            Self::BootstrapBrokerStringSaslScram => "bootstrap-brokers-sasl-scram",
            Self::ZookeeperConnectString => "zookeeper-connection-string",
            Self::ZookeeperConnectStringTls => "zookeeper-connection-string-tls",
        }
    }

    pub fn call(self) -> LookupCall {
        match self {
            Self::BootstrapBrokerString
            | Self::BootstrapBrokerStringTls
            | Self::BootstrapBrokerStringSaslScram => LookupCall::GetBootstrapBrokers,
            Self::ZookeeperConnectString | Self::ZookeeperConnectStringTls => {
                LookupCall::DescribeCluster
            }
        }
    }

    /// Attribute path of the field in the custom resource's response
    pub fn response_path(self) -> String {
        match self.call() {
            LookupCall::GetBootstrapBrokers => self.as_str().to_string(),
            LookupCall::DescribeCluster => format!("ClusterInfo.{}", self.as_str()),
        }
    }
}

impl fmt::Display for LookupField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupField {
    type Err = ClusterError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| {
                field.as_str().eq_ignore_ascii_case(value) || field.alias() == value
            })
            .ok_or_else(|| ClusterError::UnknownLookupField(value.to_string()))
    }
}

/// Handle to a registered lookup, usable wherever a deferred string is accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupHandle {
    logical_id: String,
    field: LookupField,
}

impl LookupHandle {
    /// `Fn::GetAtt` on the custom resource that performs the lookup
    pub fn token(&self) -> StringValue {
        StringValue::get_att(&self.logical_id, &self.field.response_path())
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn field(&self) -> LookupField {
        self.field
    }
}

impl From<&LookupHandle> for StringValue {
    fn from(handle: &LookupHandle) -> Self {
        handle.token()
    }
}

#[derive(Debug, Clone)]
struct LookupRequest {
    owner_path: String,
    construct_path: String,
    cluster_arn: StringValue,
    field: LookupField,
}

impl LookupRequest {
    fn handle(&self) -> LookupHandle {
        LookupHandle {
            logical_id: logical_id(&self.construct_path),
            field: self.field,
        }
    }
}

/// Resources produced by resolving the registry
#[derive(Debug, Default)]
pub struct ResolvedLookups {
    pub resources: Vec<(String, CfnResource)>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Registrations collected during assembly
#[derive(Debug, Default)]
pub struct LookupRegistry {
    requests: Vec<LookupRequest>,
}

impl LookupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `field` for the cluster at `owner_path`.
    ///
    /// Registering the same field for the same owner again returns the
    /// existing handle without adding a second lookup.
    pub fn register(
        &mut self,
        owner_path: &str,
        cluster_arn: &StringValue,
        field: LookupField,
    ) -> LookupHandle {
        if let Some(existing) = self
            .requests
            .iter()
            .find(|request| request.owner_path == owner_path && request.field == field)
        {
            return existing.handle();
        }

        let request = LookupRequest {
            owner_path: owner_path.to_string(),
            construct_path: format!(
                "{owner_path}/{}{}",
                field.call().construct_prefix(),
                field.as_str()
            ),
            cluster_arn: cluster_arn.clone(),
            field,
        };
        debug!("Registered lookup {}", request.construct_path);
        let handle = request.handle();
        self.requests.push(request);
        handle
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Emit the custom resource and its policy for every registration
    pub fn resolve(self) -> ClusterResult<ResolvedLookups> {
        let mut resolved = ResolvedLookups::default();
        for request in self.requests {
            let policy_path = format!("{}/CustomResourcePolicy", request.construct_path);
            let policy_id = logical_id(&policy_path);
            let call = request.field.call();

            let mut statement = PolicyStatement::new();
            statement
                .add_action(call.iam_action())
                .add_resource(&request.cluster_arn);
            resolved
                .diagnostics
                .extend(
                    statement
                        .validate_for_identity_policy()
                        .into_iter()
                        .map(|message| Diagnostic {
                            level: DiagnosticLevel::Error,
                            path: policy_path.clone(),
                            message,
                        }),
                );
            let mut document = PolicyDocument::new();
            document.add_statement(statement);

            let mut policy_properties = Map::new();
            policy_properties.insert(
                "PolicyDocument".to_string(),
                document.resolve().unwrap_or(Value::Null),
            );
            policy_properties.insert("PolicyName".to_string(), Value::String(policy_id.clone()));
            policy_properties.insert("Roles".to_string(), json!([{ "Ref": PROVIDER_ROLE_ID }]));
            let policy = CfnResource::new(POLICY_RESOURCE_TYPE, policy_properties);

            let sdk_call = sdk_call_property(call, &request.cluster_arn)?;
            let mut properties = Map::new();
            properties.insert(
                "ServiceToken".to_string(),
                json!({ "Fn::GetAtt": [PROVIDER_FUNCTION_ID, "Arn"] }),
            );
            properties.insert("Create".to_string(), sdk_call.clone());
            properties.insert("Update".to_string(), sdk_call);
            properties.insert("InstallLatestAwsSdk".to_string(), Value::Bool(false));
            let mut custom_resource = CfnResource::new(CUSTOM_RESOURCE_TYPE, properties);
            custom_resource.add_dependency(policy_id.clone());
            custom_resource.apply_removal_policy(RemovalPolicy::Destroy);

            resolved.resources.push((policy_id, policy));
            resolved
                .resources
                .push((request.handle().logical_id, custom_resource));
        }
        Ok(resolved)
    }
}

/// The provider expects the call as a JSON string; a deferred ARN is spliced in with `Fn::Join`
fn sdk_call_property(call: LookupCall, cluster_arn: &StringValue) -> ClusterResult<Value> {
    let arn_slot = cluster_arn
        .as_literal()
        .unwrap_or(CLUSTER_ARN_PLACEHOLDER);
    let rendered = serde_json::to_string(&json!({
        "service": "Kafka",
        "action": call.sdk_action(),
        "parameters": { "ClusterArn": arn_slot },
        "physicalResourceId": { "id": call.physical_resource_id() },
    }))?;

    match (cluster_arn, rendered.split_once(CLUSTER_ARN_PLACEHOLDER)) {
        (StringValue::Deferred(token), Some((before, after))) => Ok(json!({
            "Fn::Join": ["", [before, token, after]]
        })),
        _ => Ok(Value::String(rendered)),
    }
}
