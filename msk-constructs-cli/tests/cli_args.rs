use std::io::Write;
use std::process::Command;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::NamedTempFile;

const VALID_PROPS: &str = r#"{
    "clusterName": "orders",
    "kafkaVersion": "3.5.1",
    "vpcId": "vpc-0123",
    "clientSubnets": ["subnet-a", "subnet-b"],
    "numberOfBrokerNodes": 2
}"#;

const INVALID_PROPS: &str = r#"{
    "clusterName": "bad name!",
    "kafkaVersion": "3.5.1",
    "vpcId": "vpc-0123",
    "clientSubnets": ["subnet-a"],
    "ebsStorageInfo": {"volumeSize": 20000}
}"#;

const SCRAM_WITHOUT_KEY_PROPS: &str = r#"{
    "clusterName": "orders",
    "kafkaVersion": "3.5.1",
    "vpcId": "vpc-0123",
    "clientSubnets": ["subnet-a", "subnet-b"],
    "clientAuthentication": {"sasl": {"scram": true}}
}"#;

fn props_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create props file");
    file.write_all(content.as_bytes())
        .expect("failed to write props file");
    file
}

fn msk_synth() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_msk-synth"));
    command.env_remove("MSK_SYNTH_STACK_NAME");
    command
}

#[test]
fn help_lists_subcommands() {
    let out = msk_synth()
        .arg("--help")
        .output()
        .expect("failed to run --help");
    let s = String::from_utf8_lossy(&out.stdout);
    for subcommand in ["synth", "validate", "lookup"] {
        assert!(s.contains(subcommand), "help should list {subcommand}: {s}");
    }
}

#[test]
fn test_synth_prints_template() {
    let props = props_file(VALID_PROPS);
    let output = msk_synth()
        .args(["synth", "--props"])
        .arg(props.path())
        .output()
        .expect("failed to run synth");

    assert_eq!(output.status.code(), Some(0));
    let template: Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be a JSON template");
    let cluster = &template["Resources"]["Cluster"];
    assert_eq!(cluster["Type"], "AWS::MSK::Cluster");
    assert_eq!(cluster["Properties"]["NumberOfBrokerNodes"], 4);
    assert_eq!(cluster["DeletionPolicy"], "Retain");
    assert_eq!(template["Outputs"]["ClusterArn"]["Value"]["Ref"], "Cluster");
}

#[test]
fn test_synth_with_invalid_props_reports_every_problem() {
    let props = props_file(INVALID_PROPS);
    let output = msk_synth()
        .args(["synth", "--props"])
        .arg(props.path())
        .output()
        .expect("failed to run synth with invalid props");

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty(), "no template should be written");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Cluster requires at least 2 subnets, got 1 subnet"),
        "stderr was: {}",
        stderr
    );
    assert!(stderr.contains("alphanumeric"), "stderr was: {}", stderr);
    assert!(
        stderr.contains("EBS volume size should be in the range 1-16384"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn test_synth_lookups_become_outputs() {
    let props = props_file(VALID_PROPS);
    let output = msk_synth()
        .args(["synth", "--compact", "--props"])
        .arg(props.path())
        .args([
            "--lookup",
            "bootstrap-brokers-tls",
            "--lookup",
            "BootstrapBrokerStringTls",
            "--lookup",
            "zookeeper-connection-string",
        ])
        .output()
        .expect("failed to run synth with lookups");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim().lines().count(), 1, "compact output is one line");

    let template: Value = serde_json::from_str(stdout.trim()).expect("valid template");
    let resources = template["Resources"].as_object().expect("resources");
    let custom_resources = resources
        .values()
        .filter(|resource| resource["Type"] == "Custom::AWS")
        .count();
    assert_eq!(custom_resources, 2);

    let outputs = template["Outputs"].as_object().expect("outputs");
    assert!(outputs.contains_key("ClusterBootstrapBrokerStringTls"));
    assert!(outputs.contains_key("ClusterZookeeperConnectString"));
    assert_eq!(
        outputs["ClusterZookeeperConnectString"]["Value"]["Fn::GetAtt"][1],
        "ClusterInfo.ZookeeperConnectString"
    );
}

#[test]
fn test_synth_stack_name_from_env() {
    let props = props_file(VALID_PROPS);
    let output = msk_synth()
        .env("MSK_SYNTH_STACK_NAME", "Streaming")
        .args(["synth", "--props"])
        .arg(props.path())
        .output()
        .expect("failed to run synth");

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Streaming/SecurityGroup"),
        "stdout was: {}",
        stdout
    );
}

#[test]
fn test_synth_writes_output_file() {
    let props = props_file(VALID_PROPS);
    let dir = tempfile::tempdir().expect("temp dir");
    let target = dir.path().join("template.json");

    AssertCommand::cargo_bin("msk-synth")
        .expect("binary should exist")
        .env_remove("MSK_SYNTH_STACK_NAME")
        .args(["synth", "--id", "Orders", "--props"])
        .arg(props.path())
        .arg("--output")
        .arg(&target)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = std::fs::read_to_string(&target).expect("template file");
    let template: Value = serde_json::from_str(&written).expect("valid template");
    assert_eq!(template["Resources"]["Orders"]["Type"], "AWS::MSK::Cluster");
}

#[test]
fn test_validate_clean_props() {
    let props = props_file(VALID_PROPS);
    AssertCommand::cargo_bin("msk-synth")
        .expect("binary should exist")
        .args(["validate", "--props"])
        .arg(props.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No problems found"));
}

#[test]
fn test_validate_warning_only_succeeds() {
    let props = props_file(SCRAM_WITHOUT_KEY_PROPS);
    AssertCommand::cargo_bin("msk-synth")
        .expect("binary should exist")
        .args(["validate", "--props"])
        .arg(props.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("[warning] Cluster:"));
}

#[test]
fn test_validate_invalid_props() {
    let props = props_file(INVALID_PROPS);
    AssertCommand::cargo_bin("msk-synth")
        .expect("binary should exist")
        .args(["validate", "--props"])
        .arg(props.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[error] Cluster:"));
}

#[test]
fn test_missing_props_file() {
    let output = msk_synth()
        .args(["synth", "--props", "/nonexistent/cluster.json"])
        .output()
        .expect("failed to run synth");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Failed to load cluster properties"),
        "stderr was: {}",
        stderr
    );
}

#[test]
fn test_unknown_lookup_field_is_rejected() {
    let props = props_file(VALID_PROPS);
    let output = msk_synth()
        .args(["synth", "--lookup", "brokers", "--props"])
        .arg(props.path())
        .output()
        .expect("failed to run synth");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Unknown lookup field"), "stderr was: {}", stderr);
}
