//! End-to-end synthesis of cluster stacks.

use msk_constructs_cluster::policy::{PolicyDocument, PolicyStatement, Principal, StringValue};
use msk_constructs_cluster::{
    logical_id, Cluster, ClusterError, ClusterProps, ClusterReference, ImportedCluster,
    KafkaVersion, LookupField, Stack, StorageMode,
};
use serde_json::{json, Value};

fn orders_props() -> ClusterProps {
    ClusterProps::from_json_str(
        r#"{
            "clusterName": "orders",
            "kafkaVersion": "3.6.0",
            "vpcId": "vpc-0123",
            "clientSubnets": ["subnet-a", "subnet-b", "subnet-c"],
            "storageMode": "TIERED",
            "encryptionInTransit": {"clientBroker": "TLS"},
            "clientAuthentication": {"tls": {"certificateAuthorities": ["arn:aws:acm-pca:us-east-1:123456789012:certificate-authority/ca"]}}
        }"#,
    )
    .expect("props should parse")
}

#[test]
fn test_cluster_with_lookups_synthesizes_once() {
    let mut stack = Stack::new("Streaming");
    let cluster = Cluster::new(&mut stack, "Orders", orders_props()).expect("cluster");

    let tls = cluster.bootstrap_brokers_tls(&mut stack);
    let again = cluster.bootstrap_brokers_tls(&mut stack);
    assert_eq!(tls, again);
    stack
        .add_output("BootstrapBrokers", &tls.token(), None)
        .expect("output");

    let template = stack.synth().expect("template");
    let custom = template.resource(tls.logical_id()).expect("custom resource");
    assert_eq!(custom.resource_type, "Custom::AWS");
    assert_eq!(
        custom.property("ServiceToken"),
        Some(&json!({"Fn::GetAtt": ["AWS679f53fac002430cb0da5b7982bd22872D164C4C", "Arn"]}))
    );

    let create = custom.property("Create").expect("create call");
    let parts = create["Fn::Join"][1].as_array().expect("join parts");
    assert_eq!(parts[1], json!({"Ref": "Orders"}));

    let policy_id = &custom.depends_on[0];
    let policy = template.resource(policy_id).expect("policy");
    assert_eq!(
        policy.property("Roles"),
        Some(&json!([{"Ref": "AWS679f53fac002430cb0da5b7982bd2287ServiceRoleC1EA0FF2"}]))
    );

    let cluster_resource = template.resource("Orders").expect("cluster");
    assert_eq!(cluster_resource.property("StorageMode"), Some(&json!("TIERED")));
    assert_eq!(
        template.outputs["BootstrapBrokers"].value,
        json!({"Fn::GetAtt": [tls.logical_id(), "BootstrapBrokerStringTls"]})
    );
}

#[test]
fn test_every_problem_is_reported_in_one_pass() {
    let mut props = ClusterProps::new("bad name!", KafkaVersion::V3_5_1, "vpc-0123", ["subnet-a"]);
    props.storage_mode = Some(StorageMode::Tiered);
    let mut stack = Stack::new("Streaming");
    Cluster::new(&mut stack, "Orders", props).expect("construction does not abort");

    let synthesis = stack.synthesize().expect("synthesis");
    assert!(synthesis.has_errors());
    assert_eq!(synthesis.diagnostics.len(), 3);
    assert!(synthesis.template.resource("Orders").is_some());
}

#[test]
fn test_synth_rejects_error_diagnostics() {
    let props = ClusterProps::new("orders", KafkaVersion::V3_5_1, "vpc-0123", Vec::<String>::new());
    let mut stack = Stack::new("Streaming");
    Cluster::new(&mut stack, "Orders", props).expect("cluster");

    match stack.synth() {
        Err(ClusterError::Validation(errors)) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].path, "Orders");
            assert_eq!(
                errors[0].message,
                "Cluster requires at least 2 subnets, got 0 subnet"
            );
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn test_two_clusters_do_not_share_resources() {
    let mut stack = Stack::new("Streaming");
    let first = Cluster::new(&mut stack, "Orders", orders_props()).expect("first");
    let second = Cluster::new(&mut stack, "Payments", orders_props()).expect("second");
    let a = first.zookeeper_connection_string_tls(&mut stack);
    let b = second.zookeeper_connection_string_tls(&mut stack);
    assert_ne!(a.logical_id(), b.logical_id());

    let duplicate = Cluster::new(&mut stack, "Orders", orders_props());
    assert!(matches!(duplicate, Err(ClusterError::DuplicateLogicalId(_))));

    let template = stack.synth().expect("template");
    assert_eq!(template.resources_of_type("AWS::MSK::Cluster").count(), 2);
    assert_eq!(template.resources_of_type("AWS::EC2::SecurityGroup").count(), 2);
    assert!(template.resource(&logical_id("Payments/SecurityGroup")).is_some());
}

#[test]
fn test_imported_cluster_lookups_and_client_policy() {
    let mut stack = Stack::new("Clients");
    let imported = ImportedCluster::from_cluster_arn(
        "Existing",
        "arn:aws:kafka:us-east-1:123456789012:cluster/orders/7d7dac2e-0000",
    )
    .expect("imported");
    assert!(imported.connections().is_err());

    let brokers = imported.lookup(&mut stack, LookupField::BootstrapBrokerStringSaslScram);
    let template = stack.synth().expect("template");
    let custom = template.resource(brokers.logical_id()).expect("custom resource");
    let call: Value = serde_json::from_str(
        custom
            .property("Create")
            .and_then(Value::as_str)
            .expect("literal arn keeps the call a plain string"),
    )
    .expect("call is json");
    assert_eq!(call["action"], "getBootstrapBrokers");

    let mut statement = PolicyStatement::new();
    statement
        .add_actions(["kafka-cluster:Connect", "kafka-cluster:DescribeCluster"])
        .add_resource(imported.cluster_arn())
        .add_principal(&Principal::Account(StringValue::literal("123456789012")));
    let mut document = PolicyDocument::new();
    document.add_statement(statement);
    assert_eq!(
        document.resolve(),
        Some(json!({
            "Version": "2012-10-17",
            "Statement": [{
                "Effect": "Allow",
                "Principal": {"AWS": "arn:aws:iam::123456789012:root"},
                "Action": ["kafka-cluster:Connect", "kafka-cluster:DescribeCluster"],
                "Resource": "arn:aws:kafka:us-east-1:123456789012:cluster/orders/7d7dac2e-0000"
            }]
        }))
    );
}
