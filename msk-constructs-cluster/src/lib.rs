//! Amazon MSK cluster constructs.
//!
//! A [`Cluster`] validates its [`ClusterProps`], records problems as
//! diagnostics on the [`Stack`] and emits the `AWS::MSK::Cluster` resource.
//! Connection strings that only exist after deployment are obtained through
//! two-phase lookups that the stack resolves once during synthesis.

mod annotations;
mod cluster;
mod error;
pub mod lookup;
mod props;
mod stack;
pub mod validation;

pub use annotations::{Annotations, Diagnostic, DiagnosticLevel};
pub use cluster::{Cluster, ClusterReference, Connections, ImportedCluster};
pub use error::{ClusterError, ClusterResult};
pub use lookup::{
    fetch, KafkaLookupClient, LookupClient, LookupField, LookupHandle, LookupRegistry,
};
pub use props::{
    BrokerLogging, ClientAuthentication, ClientBrokerEncryption, ClusterConfigurationInfo,
    ClusterMonitoringLevel, ClusterProps, EbsStorageInfo, EncryptionInTransitConfig, KafkaVersion,
    MonitoringConfiguration, S3LoggingConfiguration, SaslAuthProps, StorageMode, TlsAuthProps,
    DEFAULT_BROKERS_PER_AZ, DEFAULT_INSTANCE_TYPE, DEFAULT_VOLUME_SIZE,
};
pub use stack::{
    checked_logical_id, logical_id, CfnResource, Output, RemovalPolicy, Stack, Synthesis, Template,
};

pub use msk_constructs_policy as policy;
