//! The MSK cluster construct and references to clusters defined elsewhere.

use log::{info, warn};
use msk_constructs_policy::StringValue;
use serde_json::{json, Map, Value};

use crate::error::{ClusterError, ClusterResult};
use crate::lookup::{LookupField, LookupHandle};
use crate::props::{BrokerLogging, ClientAuthentication, ClusterProps, MonitoringConfiguration};
use crate::stack::{checked_logical_id, logical_id, CfnResource, Stack};
use crate::validation;

const CLUSTER_RESOURCE_TYPE: &str = "AWS::MSK::Cluster";
const SECURITY_GROUP_RESOURCE_TYPE: &str = "AWS::EC2::SecurityGroup";
const INSTANCE_TYPE_PREFIX: &str = "kafka.";

/// Security groups that control network access to a cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connections {
    security_groups: Vec<StringValue>,
}

impl Connections {
    pub fn new(security_groups: Vec<StringValue>) -> Self {
        Self { security_groups }
    }

    pub fn security_groups(&self) -> &[StringValue] {
        &self.security_groups
    }
}

/// Behavior shared by owned and imported clusters
pub trait ClusterReference {
    /// Construct path the cluster was created or imported under
    fn path(&self) -> &str;

    fn cluster_arn(&self) -> &StringValue;

    fn cluster_name(&self) -> &StringValue;

    /// Network access for the cluster; only available when the construct owns its security groups
    fn connections(&self) -> ClusterResult<&Connections>;

    /// Register a lookup of `field` for this cluster
    fn lookup(&self, stack: &mut Stack, field: LookupField) -> LookupHandle {
        stack.register_lookup(self.path(), self.cluster_arn(), field)
    }

    /// Plaintext bootstrap brokers
    fn bootstrap_brokers(&self, stack: &mut Stack) -> LookupHandle {
        self.lookup(stack, LookupField::BootstrapBrokerString)
    }

    /// TLS bootstrap brokers
    fn bootstrap_brokers_tls(&self, stack: &mut Stack) -> LookupHandle {
        self.lookup(stack, LookupField::BootstrapBrokerStringTls)
    }

    /// SASL/SCRAM bootstrap brokers
    fn bootstrap_brokers_sasl_scram(&self, stack: &mut Stack) -> LookupHandle {
        self.lookup(stack, LookupField::BootstrapBrokerStringSaslScram)
    }

    fn zookeeper_connection_string(&self, stack: &mut Stack) -> LookupHandle {
        self.lookup(stack, LookupField::ZookeeperConnectString)
    }

    fn zookeeper_connection_string_tls(&self, stack: &mut Stack) -> LookupHandle {
        self.lookup(stack, LookupField::ZookeeperConnectStringTls)
    }
}

/// A managed Kafka cluster owned by the stack it was created in
#[derive(Debug, Clone)]
pub struct Cluster {
    path: String,
    logical_id: String,
    cluster_arn: StringValue,
    cluster_name: StringValue,
    connections: Connections,
    sasl_scram_key: Option<StringValue>,
}

impl Cluster {
    /// Validate `props` and add the cluster, plus a security group when none was given, to `stack`.
    ///
    /// Validation problems are recorded as error diagnostics on the stack and
    /// the resource is still emitted, so every problem is reported at synthesis.
    pub fn new(stack: &mut Stack, id: &str, props: ClusterProps) -> ClusterResult<Self> {
        let cluster_id = checked_logical_id(id)?;
        for message in validation::validate(&props) {
            stack.annotations_mut().add_error(id, message);
        }

        let security_groups = if props.security_groups.is_empty() {
            vec![create_security_group(stack, id, &props.vpc_id)?]
        } else {
            props.security_groups.clone()
        };

        let sasl_scram_key = props
            .client_authentication
            .as_ref()
            .filter(|auth| auth.sasl_scram_enabled())
            .and_then(|auth| auth.sasl.as_ref())
            .and_then(|sasl| sasl.key.clone());
        let scram_enabled = props
            .client_authentication
            .as_ref()
            .is_some_and(ClientAuthentication::sasl_scram_enabled);
        if scram_enabled && sasl_scram_key.is_none() {
            stack.annotations_mut().add_warning(
                id,
                "SASL/SCRAM is enabled without a KMS key; user secrets must be encrypted with a customer managed key before they can be associated with the cluster",
            );
        }

        let properties = cluster_properties(&props, &security_groups);
        let mut resource = CfnResource::new(CLUSTER_RESOURCE_TYPE, properties);
        resource.apply_removal_policy(props.removal_policy());

        stack.add_resource(cluster_id.clone(), resource)?;
        info!(
            "Added MSK cluster {} ({} broker(s), Kafka {})",
            props.cluster_name,
            number_of_broker_nodes(&props),
            props.kafka_version
        );

        Ok(Self {
            path: id.to_string(),
            cluster_arn: StringValue::reference(&cluster_id),
            logical_id: cluster_id,
            cluster_name: props.cluster_name,
            connections: Connections::new(security_groups),
            sasl_scram_key,
        })
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// KMS key protecting SASL/SCRAM user secrets, when SCRAM is enabled
    pub fn sasl_scram_key(&self) -> Option<&StringValue> {
        self.sasl_scram_key.as_ref()
    }
}

impl ClusterReference for Cluster {
    fn path(&self) -> &str {
        &self.path
    }

    fn cluster_arn(&self) -> &StringValue {
        &self.cluster_arn
    }

    fn cluster_name(&self) -> &StringValue {
        &self.cluster_name
    }

    fn connections(&self) -> ClusterResult<&Connections> {
        Ok(&self.connections)
    }
}

/// A cluster defined outside this stack, referenced by ARN
#[derive(Debug, Clone)]
pub struct ImportedCluster {
    path: String,
    cluster_arn: StringValue,
    cluster_name: StringValue,
}

impl ImportedCluster {
    /// Reference an existing cluster.
    ///
    /// The name is the second `/`-separated segment of the ARN
    /// (`arn:aws:kafka:<region>:<account>:cluster/<name>/<uuid>`). For a
    /// deferred ARN the split happens at deployment time.
    pub fn from_cluster_arn(id: &str, cluster_arn: impl Into<StringValue>) -> ClusterResult<Self> {
        checked_logical_id(id)?;
        let cluster_arn = cluster_arn.into();
        let cluster_name = match &cluster_arn {
            StringValue::Literal(arn) => arn
                .split('/')
                .nth(1)
                .filter(|name| !name.is_empty())
                .map(StringValue::literal)
                .ok_or_else(|| ClusterError::InvalidArn(arn.clone()))?,
            StringValue::Deferred(token) => StringValue::intrinsic(
                "Fn::Select",
                json!([1, { "Fn::Split": ["/", token] }]),
            ),
        };

        Ok(Self {
            path: id.to_string(),
            cluster_arn,
            cluster_name,
        })
    }
}

impl ClusterReference for ImportedCluster {
    fn path(&self) -> &str {
        &self.path
    }

    fn cluster_arn(&self) -> &StringValue {
        &self.cluster_arn
    }

    fn cluster_name(&self) -> &StringValue {
        &self.cluster_name
    }

    fn connections(&self) -> ClusterResult<&Connections> {
        warn!("Connections requested from imported cluster {}", self.path);
        Err(ClusterError::ImportedConnections(self.path.clone()))
    }
}

fn create_security_group(stack: &mut Stack, id: &str, vpc_id: &StringValue) -> ClusterResult<StringValue> {
    let group_id = logical_id(&format!("{id}/SecurityGroup"));
    let mut properties = Map::new();
    properties.insert(
        "GroupDescription".to_string(),
        Value::String(format!("{}/SecurityGroup", stack.name())),
    );
    properties.insert(
        "SecurityGroupEgress".to_string(),
        json!([{
            "CidrIp": "0.0.0.0/0",
            "Description": "Allow all outbound traffic by default",
            "IpProtocol": "-1"
        }]),
    );
    properties.insert("VpcId".to_string(), vpc_id.to_json());
    stack.add_resource(
        group_id.clone(),
        CfnResource::new(SECURITY_GROUP_RESOURCE_TYPE, properties),
    )?;
    Ok(StringValue::get_att(&group_id, "GroupId"))
}

fn number_of_broker_nodes(props: &ClusterProps) -> u64 {
    props.client_subnets.len() as u64 * u64::from(props.brokers_per_az())
}

fn to_json_list(values: &[StringValue]) -> Value {
    Value::Array(values.iter().map(StringValue::to_json).collect())
}

fn cluster_properties(props: &ClusterProps, security_groups: &[StringValue]) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert("ClusterName".to_string(), props.cluster_name.to_json());
    properties.insert(
        "KafkaVersion".to_string(),
        Value::String(props.kafka_version.to_string()),
    );
    properties.insert(
        "NumberOfBrokerNodes".to_string(),
        json!(number_of_broker_nodes(props)),
    );
    properties.insert(
        "BrokerNodeGroupInfo".to_string(),
        json!({
            "InstanceType": format!("{INSTANCE_TYPE_PREFIX}{}", props.instance_type()),
            "ClientSubnets": to_json_list(&props.client_subnets),
            "SecurityGroups": to_json_list(security_groups),
            "BrokerAZDistribution": "DEFAULT",
            "StorageInfo": { "EBSStorageInfo": { "VolumeSize": props.volume_size() } }
        }),
    );
    properties.insert("EncryptionInfo".to_string(), encryption_info(props));

    if let Some(auth) = props
        .client_authentication
        .as_ref()
        .and_then(client_authentication)
    {
        properties.insert("ClientAuthentication".to_string(), auth);
    }
    if let Some(logging) = &props.logging {
        properties.insert("LoggingInfo".to_string(), logging_info(logging));
    }
    if let Some(monitoring) = &props.monitoring {
        if let Some(level) = monitoring.cluster_monitoring_level {
            properties.insert(
                "EnhancedMonitoring".to_string(),
                Value::String(level.as_str().to_string()),
            );
        }
        if let Some(open_monitoring) = open_monitoring(monitoring) {
            properties.insert("OpenMonitoring".to_string(), open_monitoring);
        }
    }
    if let Some(configuration) = &props.configuration_info {
        properties.insert(
            "ConfigurationInfo".to_string(),
            json!({ "Arn": configuration.arn.to_json(), "Revision": configuration.revision }),
        );
    }
    if let Some(mode) = props.storage_mode {
        properties.insert(
            "StorageMode".to_string(),
            Value::String(mode.as_str().to_string()),
        );
    }
    properties
}

fn encryption_info(props: &ClusterProps) -> Value {
    let in_transit = props.encryption_in_transit();
    let mut info = Map::new();
    if let Some(key) = props
        .ebs_storage_info
        .as_ref()
        .and_then(|ebs| ebs.encryption_key.as_ref())
    {
        info.insert(
            "EncryptionAtRest".to_string(),
            json!({ "DataVolumeKMSKeyId": key.to_json() }),
        );
    }
    info.insert(
        "EncryptionInTransit".to_string(),
        json!({
            "ClientBroker": in_transit.client_broker().as_str(),
            "InCluster": in_transit.in_cluster()
        }),
    );
    Value::Object(info)
}

fn client_authentication(auth: &ClientAuthentication) -> Option<Value> {
    let mut section = Map::new();
    if auth.sasl_scram_enabled() {
        section.insert(
            "Sasl".to_string(),
            json!({ "Scram": { "Enabled": true } }),
        );
    }
    if let Some(authorities) = auth.tls_certificate_authorities() {
        section.insert(
            "Tls".to_string(),
            json!({ "CertificateAuthorityArnList": to_json_list(authorities) }),
        );
    }
    (!section.is_empty()).then_some(Value::Object(section))
}

fn logging_info(logging: &BrokerLogging) -> Value {
    let mut cloudwatch = Map::new();
    cloudwatch.insert(
        "Enabled".to_string(),
        Value::Bool(logging.cloudwatch_log_group.is_some()),
    );
    if let Some(group) = &logging.cloudwatch_log_group {
        cloudwatch.insert("LogGroup".to_string(), group.to_json());
    }

    let mut firehose = Map::new();
    firehose.insert(
        "Enabled".to_string(),
        Value::Bool(logging.firehose_delivery_stream_name.is_some()),
    );
    if let Some(stream) = &logging.firehose_delivery_stream_name {
        firehose.insert("DeliveryStream".to_string(), stream.to_json());
    }

    let mut s3 = Map::new();
    s3.insert("Enabled".to_string(), Value::Bool(logging.s3.is_some()));
    if let Some(config) = &logging.s3 {
        s3.insert("Bucket".to_string(), config.bucket.to_json());
        if let Some(prefix) = &config.prefix {
            s3.insert("Prefix".to_string(), Value::String(prefix.clone()));
        }
    }

    json!({
        "BrokerLogs": {
            "CloudWatchLogs": cloudwatch,
            "Firehose": firehose,
            "S3": s3
        }
    })
}

fn open_monitoring(monitoring: &MonitoringConfiguration) -> Option<Value> {
    let jmx = monitoring.enable_prometheus_jmx_exporter.unwrap_or(false);
    let node = monitoring.enable_prometheus_node_exporter.unwrap_or(false);
    (jmx || node).then(|| {
        json!({
            "Prometheus": {
                "JmxExporter": { "EnabledInBroker": jmx },
                "NodeExporter": { "EnabledInBroker": node }
            }
        })
    })
}
