//! Live resolution of lookups against the Kafka API.
//!
//! Deployed stacks resolve lookups through their custom resources; this client
//! performs the same descriptive calls directly so a connection string can be
//! fetched for an existing cluster from the command line.

use async_trait::async_trait;
use aws_sdk_kafka::Client as KafkaClient;
use log::{debug, info};

use super::{LookupCall, LookupField};
use crate::error::{ClusterError, ClusterResult};

/// Response of `GetBootstrapBrokers`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapBrokers {
    pub plaintext: Option<String>,
    pub tls: Option<String>,
    pub sasl_scram: Option<String>,
}

/// ZooKeeper connection strings from `DescribeCluster`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZookeeperConnection {
    pub plaintext: Option<String>,
    pub tls: Option<String>,
}

/// The two descriptive calls lookups are built on
#[async_trait]
pub trait LookupClient: Send + Sync {
    async fn get_bootstrap_brokers(&self, cluster_arn: &str) -> ClusterResult<BootstrapBrokers>;

    async fn describe_cluster(&self, cluster_arn: &str) -> ClusterResult<ZookeeperConnection>;
}

/// [`LookupClient`] backed by the AWS SDK
pub struct KafkaLookupClient {
    client: KafkaClient,
}

impl KafkaLookupClient {
    /// Build a client from the default credential provider chain and region
    pub async fn new() -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;
        Self {
            client: KafkaClient::new(&config),
        }
    }
}

#[async_trait]
impl LookupClient for KafkaLookupClient {
    async fn get_bootstrap_brokers(&self, cluster_arn: &str) -> ClusterResult<BootstrapBrokers> {
        let response = self
            .client
            .get_bootstrap_brokers()
            .cluster_arn(cluster_arn)
            .send()
            .await
            .map_err(|e| ClusterError::LookupFailed {
                field: LookupCall::GetBootstrapBrokers.sdk_action().to_string(),
                message: format!("{e:?}"),
            })?;

        Ok(BootstrapBrokers {
            plaintext: response.bootstrap_broker_string().map(str::to_string),
            tls: response.bootstrap_broker_string_tls().map(str::to_string),
            sasl_scram: response
                .bootstrap_broker_string_sasl_scram()
                .map(str::to_string),
        })
    }

    async fn describe_cluster(&self, cluster_arn: &str) -> ClusterResult<ZookeeperConnection> {
        let response = self
            .client
            .describe_cluster()
            .cluster_arn(cluster_arn)
            .send()
            .await
            .map_err(|e| ClusterError::LookupFailed {
                field: LookupCall::DescribeCluster.sdk_action().to_string(),
                message: format!("{e:?}"),
            })?;

        let info = response.cluster_info();
        Ok(ZookeeperConnection {
            plaintext: info
                .and_then(|info| info.zookeeper_connect_string())
                .map(str::to_string),
            tls: info
                .and_then(|info| info.zookeeper_connect_string_tls())
                .map(str::to_string),
        })
    }
}

/// Make the single descriptive call behind `field` and pick the field out of the response
pub async fn fetch(
    client: &dyn LookupClient,
    cluster_arn: &str,
    field: LookupField,
) -> ClusterResult<String> {
    debug!("Fetching {field} for {cluster_arn}");
    let value = match field {
        LookupField::BootstrapBrokerString => client.get_bootstrap_brokers(cluster_arn).await?.plaintext,
        LookupField::BootstrapBrokerStringTls => client.get_bootstrap_brokers(cluster_arn).await?.tls,
        LookupField::BootstrapBrokerStringSaslScram => {
            client.get_bootstrap_brokers(cluster_arn).await?.sasl_scram
        }
        LookupField::ZookeeperConnectString => client.describe_cluster(cluster_arn).await?.plaintext,
        LookupField::ZookeeperConnectStringTls => client.describe_cluster(cluster_arn).await?.tls,
    };

    let value = value.ok_or_else(|| ClusterError::LookupMissing {
        field: field.to_string(),
        cluster_arn: cluster_arn.to_string(),
    })?;
    info!("Resolved {field} for {cluster_arn}");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct MockLookupClient {
        bootstrap_calls: AtomicUsize,
        describe_calls: AtomicUsize,
    }

    #[async_trait]
    impl LookupClient for MockLookupClient {
        async fn get_bootstrap_brokers(&self, _cluster_arn: &str) -> ClusterResult<BootstrapBrokers> {
            self.bootstrap_calls.fetch_add(1, Ordering::SeqCst);
            Ok(BootstrapBrokers {
                plaintext: None,
                tls: Some("b-1.demo.kafka.us-east-1.amazonaws.com:9094".to_string()),
                sasl_scram: None,
            })
        }

        async fn describe_cluster(&self, _cluster_arn: &str) -> ClusterResult<ZookeeperConnection> {
            self.describe_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ZookeeperConnection {
                plaintext: Some("z-1.demo.kafka.us-east-1.amazonaws.com:2181".to_string()),
                tls: None,
            })
        }
    }

    const ARN: &str = "arn:aws:kafka:us-east-1:123456789012:cluster/demo/abc";

    #[tokio::test]
    async fn test_fetch_bootstrap_brokers_tls() {
        let client = MockLookupClient::default();
        let value = fetch(&client, ARN, LookupField::BootstrapBrokerStringTls)
            .await
            .expect("tls brokers");
        assert_eq!(value, "b-1.demo.kafka.us-east-1.amazonaws.com:9094");
        assert_eq!(client.bootstrap_calls.load(Ordering::SeqCst), 1);
        assert_eq!(client.describe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_zookeeper_uses_describe_cluster() {
        let client = MockLookupClient::default();
        let value = fetch(&client, ARN, LookupField::ZookeeperConnectString)
            .await
            .expect("zookeeper");
        assert_eq!(value, "z-1.demo.kafka.us-east-1.amazonaws.com:2181");
        assert_eq!(client.describe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_field_is_an_error() {
        let client = MockLookupClient::default();
        let err = fetch(&client, ARN, LookupField::BootstrapBrokerStringSaslScram)
            .await
            .expect_err("no scram brokers");
        match err {
            ClusterError::LookupMissing { field, cluster_arn } => {
                assert_eq!(field, "BootstrapBrokerStringSaslScram");
                assert_eq!(cluster_arn, ARN);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
