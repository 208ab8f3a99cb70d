//! Cluster properties.
//!
//! Properties deserialize from camelCase JSON so a cluster can be described in
//! a file and synthesized without writing Rust. Unset optional groups fall back
//! to the managed service's defaults when the cluster resource is emitted.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use log::debug;
use msk_constructs_policy::StringValue;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};
use crate::stack::RemovalPolicy;

/// Broker instance type used when none is given
pub const DEFAULT_INSTANCE_TYPE: &str = "m5.large";
/// EBS volume size in GiB used when none is given
pub const DEFAULT_VOLUME_SIZE: u32 = 1000;
/// Brokers per availability zone used when none is given
pub const DEFAULT_BROKERS_PER_AZ: u32 = 1;

/// Apache Kafka version of the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KafkaVersion(Cow<'static, str>);

impl KafkaVersion {
    pub const V2_8_1: Self = Self(Cow::Borrowed("2.8.1"));
    pub const V2_8_2_TIERED: Self = Self(Cow::Borrowed("2.8.2.tiered"));
    pub const V3_4_0: Self = Self(Cow::Borrowed("3.4.0"));
    pub const V3_5_1: Self = Self(Cow::Borrowed("3.5.1"));
    pub const V3_6_0: Self = Self(Cow::Borrowed("3.6.0"));
    pub const V3_7_X: Self = Self(Cow::Borrowed("3.7.x"));
    pub const V3_7_X_KRAFT: Self = Self(Cow::Borrowed("3.7.x.kraft"));

    /// A version not listed as a constant
    pub fn of(version: impl Into<String>) -> Self {
        Self(Cow::Owned(version.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Tiered storage is offered on `2.8.2.tiered` and on every release from 3.6 onwards
    pub fn is_tiered_storage_compatible(&self) -> bool {
        if self.as_str() == Self::V2_8_2_TIERED.as_str() {
            return true;
        }
        let mut parts = self.as_str().split('.');
        let major = parts.next().and_then(|part| part.parse::<u32>().ok());
        let minor = parts.next().and_then(|part| part.parse::<u32>().ok());
        matches!((major, minor), (Some(major), Some(minor)) if (major, minor) >= (3, 6))
    }
}

impl fmt::Display for KafkaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageMode {
    Local,
    Tiered,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Tiered => "TIERED",
        }
    }
}

/// Level of CloudWatch metrics published for the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterMonitoringLevel {
    Default,
    PerBroker,
    PerTopicPerBroker,
    PerTopicPerPartition,
}

impl ClusterMonitoringLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::PerBroker => "PER_BROKER",
            Self::PerTopicPerBroker => "PER_TOPIC_PER_BROKER",
            Self::PerTopicPerPartition => "PER_TOPIC_PER_PARTITION",
        }
    }
}

/// Which traffic between clients and brokers is allowed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientBrokerEncryption {
    /// TLS-encrypted traffic only
    #[default]
    Tls,
    /// TLS-encrypted and plaintext traffic
    TlsPlaintext,
    /// Plaintext traffic only
    Plaintext,
}

impl ClientBrokerEncryption {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tls => "TLS",
            Self::TlsPlaintext => "TLS_PLAINTEXT",
            Self::Plaintext => "PLAINTEXT",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EbsStorageInfo {
    /// Size in GiB of the volume attached to each broker
    pub volume_size: Option<u32>,
    /// KMS key used to encrypt data at rest; an AWS managed key is used when absent
    pub encryption_key: Option<StringValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MonitoringConfiguration {
    pub cluster_monitoring_level: Option<ClusterMonitoringLevel>,
    pub enable_prometheus_jmx_exporter: Option<bool>,
    pub enable_prometheus_node_exporter: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct S3LoggingConfiguration {
    pub bucket: StringValue,
    pub prefix: Option<String>,
}

/// Destinations for broker logs; each destination is enabled by naming its target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BrokerLogging {
    pub firehose_delivery_stream_name: Option<StringValue>,
    pub cloudwatch_log_group: Option<StringValue>,
    pub s3: Option<S3LoggingConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncryptionInTransitConfig {
    pub client_broker: Option<ClientBrokerEncryption>,
    pub enable_in_cluster: Option<bool>,
}

impl EncryptionInTransitConfig {
    pub fn client_broker(&self) -> ClientBrokerEncryption {
        self.client_broker.unwrap_or_default()
    }

    pub fn in_cluster(&self) -> bool {
        self.enable_in_cluster.unwrap_or(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SaslAuthProps {
    /// Enable SASL/SCRAM authentication
    pub scram: Option<bool>,
    /// KMS key protecting the SCRAM user secrets
    pub key: Option<StringValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TlsAuthProps {
    /// ACM Private CA ARNs trusted for client certificates
    #[serde(default)]
    pub certificate_authorities: Vec<StringValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClientAuthentication {
    pub sasl: Option<SaslAuthProps>,
    pub tls: Option<TlsAuthProps>,
}

impl ClientAuthentication {
    pub fn sasl(props: SaslAuthProps) -> Self {
        Self {
            sasl: Some(props),
            tls: None,
        }
    }

    pub fn tls(props: TlsAuthProps) -> Self {
        Self {
            sasl: None,
            tls: Some(props),
        }
    }

    pub fn sasl_scram_enabled(&self) -> bool {
        self.sasl
            .as_ref()
            .and_then(|sasl| sasl.scram)
            .unwrap_or(false)
    }

    pub fn tls_certificate_authorities(&self) -> Option<&[StringValue]> {
        self.tls
            .as_ref()
            .map(|tls| tls.certificate_authorities.as_slice())
    }
}

/// A custom MSK configuration applied to the brokers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterConfigurationInfo {
    pub arn: StringValue,
    pub revision: u32,
}

/// Everything needed to describe an MSK cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ClusterProps {
    /// Physical cluster name; may be deferred
    pub cluster_name: StringValue,
    pub kafka_version: KafkaVersion,
    /// VPC hosting the brokers, used for the default security group
    pub vpc_id: StringValue,
    /// Subnets the brokers are placed in, one broker group per subnet
    #[serde(default)]
    pub client_subnets: Vec<StringValue>,
    /// Existing security groups; one is created when empty
    #[serde(default)]
    pub security_groups: Vec<StringValue>,
    /// Broker instance type without the `kafka.` prefix
    pub instance_type: Option<String>,
    /// Brokers per availability zone
    pub number_of_broker_nodes: Option<u32>,
    pub ebs_storage_info: Option<EbsStorageInfo>,
    pub storage_mode: Option<StorageMode>,
    pub monitoring: Option<MonitoringConfiguration>,
    pub logging: Option<BrokerLogging>,
    pub encryption_in_transit: Option<EncryptionInTransitConfig>,
    pub client_authentication: Option<ClientAuthentication>,
    pub configuration_info: Option<ClusterConfigurationInfo>,
    pub removal_policy: Option<RemovalPolicy>,
}

impl ClusterProps {
    /// Properties with every optional group left at its default
    pub fn new(
        cluster_name: impl Into<StringValue>,
        kafka_version: KafkaVersion,
        vpc_id: impl Into<StringValue>,
        client_subnets: impl IntoIterator<Item = impl Into<StringValue>>,
    ) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            kafka_version,
            vpc_id: vpc_id.into(),
            client_subnets: client_subnets.into_iter().map(Into::into).collect(),
            security_groups: Vec::new(),
            instance_type: None,
            number_of_broker_nodes: None,
            ebs_storage_info: None,
            storage_mode: None,
            monitoring: None,
            logging: None,
            encryption_in_transit: None,
            client_authentication: None,
            configuration_info: None,
            removal_policy: None,
        }
    }

    pub fn from_json_str(json: &str) -> ClusterResult<Self> {
        let props: Self = serde_json::from_str(json)?;
        debug!(
            "Loaded cluster properties for {} ({} subnet(s))",
            props.cluster_name,
            props.client_subnets.len()
        );
        Ok(props)
    }

    pub fn from_path(path: &Path) -> ClusterResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ClusterError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn instance_type(&self) -> &str {
        self.instance_type
            .as_deref()
            .unwrap_or(DEFAULT_INSTANCE_TYPE)
    }

    pub fn brokers_per_az(&self) -> u32 {
        self.number_of_broker_nodes
            .unwrap_or(DEFAULT_BROKERS_PER_AZ)
    }

    pub fn volume_size(&self) -> u32 {
        self.ebs_storage_info
            .as_ref()
            .and_then(|ebs| ebs.volume_size)
            .unwrap_or(DEFAULT_VOLUME_SIZE)
    }

    pub fn encryption_in_transit(&self) -> EncryptionInTransitConfig {
        self.encryption_in_transit.clone().unwrap_or_default()
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal_policy.unwrap_or_default()
    }
}
