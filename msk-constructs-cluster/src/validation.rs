//! Cross-field checks on cluster properties.
//!
//! Each check is independent and returns at most one message. The cluster
//! records every message as an error diagnostic so that all problems surface
//! in a single synthesis pass.

use std::sync::LazyLock;

use msk_constructs_policy::StringValue;
use regex::Regex;

use crate::props::{ClientBrokerEncryption, ClusterProps, StorageMode};

pub const MIN_SUBNETS: usize = 2;
pub const MIN_VOLUME_SIZE: u32 = 1;
pub const MAX_VOLUME_SIZE: u32 = 16384;
pub const MAX_CLUSTER_NAME_LENGTH: usize = 64;

const TIERED_STORAGE_UNSUPPORTED_INSTANCE: &str = "t3.small";

static CLUSTER_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]+$").expect("Invalid cluster name regex"));

/// Run every check, in a fixed order, and collect the messages
pub fn validate(props: &ClusterProps) -> Vec<String> {
    [
        check_subnet_count(props),
        check_cluster_name_charset(&props.cluster_name),
        check_cluster_name_length(&props.cluster_name),
        check_plaintext_authentication(props),
        check_mixed_traffic_scram(props),
        check_volume_size(props),
        check_single_authentication_method(props),
        check_tls_certificate_authorities(props),
        check_tiered_storage_version(props),
        check_tiered_storage_instance(props),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn check_subnet_count(props: &ClusterProps) -> Option<String> {
    let count = props.client_subnets.len();
    (count < MIN_SUBNETS).then(|| {
        format!("Cluster requires at least {MIN_SUBNETS} subnets, got {count} subnet")
    })
}

/// Skipped while the name is deferred
pub fn check_cluster_name_charset(name: &StringValue) -> Option<String> {
    let name = name.as_literal()?;
    (!CLUSTER_NAME_REGEX.is_match(name)).then(|| {
        format!("The cluster name must only contain alphanumeric characters, got: '{name}'")
    })
}

/// Skipped while the name is deferred
pub fn check_cluster_name_length(name: &StringValue) -> Option<String> {
    let name = name.as_literal()?;
    (name.chars().count() > MAX_CLUSTER_NAME_LENGTH).then(|| {
        format!(
            "The cluster name must have a maximum length of {MAX_CLUSTER_NAME_LENGTH} characters, got: {} characters",
            name.chars().count()
        )
    })
}

/// Client authentication needs TLS between clients and brokers
pub fn check_plaintext_authentication(props: &ClusterProps) -> Option<String> {
    let plaintext = props.encryption_in_transit().client_broker() == ClientBrokerEncryption::Plaintext;
    (plaintext && props.client_authentication.is_some()).then(|| {
        "To enable client authentication, you must enable TLS-encrypted traffic between clients and brokers."
            .to_string()
    })
}

/// SASL/SCRAM cannot be combined with plaintext traffic
pub fn check_mixed_traffic_scram(props: &ClusterProps) -> Option<String> {
    let mixed =
        props.encryption_in_transit().client_broker() == ClientBrokerEncryption::TlsPlaintext;
    let scram = props
        .client_authentication
        .as_ref()
        .is_some_and(|auth| auth.sasl_scram_enabled());
    (mixed && scram).then(|| {
        "To enable SASL/SCRAM authentication, you must only allow TLS-encrypted traffic between clients and brokers."
            .to_string()
    })
}

pub fn check_volume_size(props: &ClusterProps) -> Option<String> {
    let size = props.ebs_storage_info.as_ref()?.volume_size?;
    (!(MIN_VOLUME_SIZE..=MAX_VOLUME_SIZE).contains(&size)).then(|| {
        format!("EBS volume size should be in the range {MIN_VOLUME_SIZE}-{MAX_VOLUME_SIZE}, got: {size}")
    })
}

/// SASL/SCRAM and mutual TLS are mutually exclusive
pub fn check_single_authentication_method(props: &ClusterProps) -> Option<String> {
    let auth = props.client_authentication.as_ref()?;
    (auth.sasl_scram_enabled() && auth.tls.is_some())
        .then(|| "Only one client authentication method can be enabled.".to_string())
}

pub fn check_tls_certificate_authorities(props: &ClusterProps) -> Option<String> {
    let authorities = props
        .client_authentication
        .as_ref()?
        .tls_certificate_authorities()?;
    authorities.is_empty().then(|| {
        "TLS client authentication requires at least one certificate authority.".to_string()
    })
}

pub fn check_tiered_storage_version(props: &ClusterProps) -> Option<String> {
    let tiered = props.storage_mode == Some(StorageMode::Tiered);
    (tiered && !props.kafka_version.is_tiered_storage_compatible()).then(|| {
        format!(
            "To deploy a tiered cluster you must select a compatible Kafka version, got: {}",
            props.kafka_version
        )
    })
}

pub fn check_tiered_storage_instance(props: &ClusterProps) -> Option<String> {
    let tiered = props.storage_mode == Some(StorageMode::Tiered);
    (tiered && props.instance_type() == TIERED_STORAGE_UNSUPPORTED_INSTANCE).then(|| {
        format!("The {TIERED_STORAGE_UNSUPPORTED_INSTANCE} instance type is not supported for tiered storage")
    })
}
