//! Node provisioning driven through the scripted executor.

#![allow(clippy::expect_used)]

use kubestrap_cli::application::services::RunOptions;
use kubestrap_cli::application::services::provision::provision_nodes;
use kubestrap_cli::domain::{ClusterConfig, FailurePolicy, UnreachablePolicy};
use kubestrap_common::{HostStatus, StepOutcome};

use crate::mocks::{RecordingReporter, ScriptedExecutor, exit, ok_stdout, registry, unreachable};

fn three_nodes() -> kubestrap_common::HostRegistry {
    registry(&[
        ("10.0.0.3", "worker-2"),
        ("10.0.0.1", "control-plane"),
        ("10.0.0.2", "worker-1"),
    ])
}

#[tokio::test]
async fn test_hosts_run_sequentially_in_address_order() {
    let exec = ScriptedExecutor::new().node_probes_absent();
    let reporter = RecordingReporter::default();

    let report = provision_nodes(
        &exec,
        &reporter,
        &three_nodes(),
        &ClusterConfig::default(),
        RunOptions::default(),
    )
    .await;

    assert_eq!(exec.host_order(), ["control-plane", "worker-1", "worker-2"]);
    assert!(!report.has_failures());
    assert!(
        report
            .hosts
            .iter()
            .all(|h| h.status() == HostStatus::Succeeded)
    );
}

#[tokio::test]
async fn test_satisfied_probes_skip_mutations() {
    let exec = ScriptedExecutor::new().when("sysctl -n", ok_stdout("1\n"));
    let reporter = RecordingReporter::default();
    let nodes = registry(&[("10.0.0.1", "control-plane")]);

    let report = provision_nodes(
        &exec,
        &reporter,
        &nodes,
        &ClusterConfig::default(),
        RunOptions::default(),
    )
    .await;

    let commands = exec.commands_on("control-plane");
    assert!(!commands.iter().any(|c| c.starts_with("sudo sysctl --system")));
    assert!(!commands.iter().any(|c| c.starts_with("sudo apt-mark hold")));
    assert!(!commands.iter().any(|c| c.contains("containerd config default")));

    let host = &report.hosts[0];
    // firewall and swap are unconditional.
    assert_eq!(host.count(|o| *o == StepOutcome::Applied), 2);
    assert_eq!(host.count(|o| *o == StepOutcome::Skipped), 4);
    assert!(reporter.contains("already configured"));
}

#[tokio::test]
async fn test_abort_halts_before_later_hosts() {
    let exec = ScriptedExecutor::new()
        .node_probes_absent()
        .when_on("worker-1", "sudo swapoff", exit(1));
    let reporter = RecordingReporter::default();

    let report = provision_nodes(
        &exec,
        &reporter,
        &three_nodes(),
        &ClusterConfig::default(),
        RunOptions::default(),
    )
    .await;

    assert!(exec.commands_on("worker-2").is_empty());
    assert!(
        !exec
            .commands_on("worker-1")
            .iter()
            .any(|c| c.starts_with("dpkg -s")),
        "no step after the failure may run on the failing host"
    );

    let statuses: Vec<HostStatus> = report.hosts.iter().map(|h| h.status()).collect();
    assert_eq!(
        statuses,
        [
            HostStatus::Succeeded,
            HostStatus::Failed,
            HostStatus::NotAttempted
        ]
    );
    assert_eq!(report.failed_hosts().len(), 1);
}

#[tokio::test]
async fn test_keep_going_continues_with_next_host() {
    let exec = ScriptedExecutor::new()
        .node_probes_absent()
        .when_on("worker-1", "sudo swapoff", exit(1));
    let reporter = RecordingReporter::default();
    let opts = RunOptions {
        on_failure: FailurePolicy::KeepGoing,
        ..RunOptions::default()
    };

    let report = provision_nodes(
        &exec,
        &reporter,
        &three_nodes(),
        &ClusterConfig::default(),
        opts,
    )
    .await;

    assert!(!exec.commands_on("worker-2").is_empty());
    assert_eq!(report.hosts[1].status(), HostStatus::Failed);
    assert_eq!(report.hosts[2].status(), HostStatus::Succeeded);
    assert!(report.has_failures());
}

#[tokio::test]
async fn test_failure_message_carries_command_output() {
    let exec = ScriptedExecutor::new().node_probes_absent().when(
        "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y kubelet",
        kubestrap_cli::domain::CommandOutput::new(Some(100), "", "E: Unable to locate package kubelet"),
    );
    let reporter = RecordingReporter::default();
    let nodes = registry(&[("10.0.0.1", "control-plane")]);

    let report = provision_nodes(
        &exec,
        &reporter,
        &nodes,
        &ClusterConfig::default(),
        RunOptions::default(),
    )
    .await;

    let failed = report.hosts[0]
        .steps
        .iter()
        .find_map(|s| match &s.outcome {
            StepOutcome::Failed { error } => Some((s.step.clone(), error.clone())),
            _ => None,
        })
        .expect("a failed step");
    assert_eq!(failed.0, "kubernetes packages");
    assert!(failed.1.contains("exit 100"));
    assert!(failed.1.contains("Unable to locate package kubelet"));
}

#[tokio::test]
async fn test_unreachable_probe_with_fail_policy_stops_host() {
    let exec = ScriptedExecutor::new().when("sysctl -n", unreachable());
    let reporter = RecordingReporter::default();
    let nodes = registry(&[("10.0.0.1", "control-plane")]);
    let opts = RunOptions {
        on_unreachable: UnreachablePolicy::Fail,
        ..RunOptions::default()
    };

    let report = provision_nodes(&exec, &reporter, &nodes, &ClusterConfig::default(), opts).await;

    assert!(report.has_failures());
    assert!(
        !exec
            .commands_on("control-plane")
            .iter()
            .any(|c| c.contains("99-kubernetes-cri.conf"))
    );
    assert!(reporter.contains("could not check"));
}

#[tokio::test]
async fn test_certificates_are_uploaded_then_installed() {
    let exec = ScriptedExecutor::new().node_probes_absent();
    let reporter = RecordingReporter::default();
    let nodes = registry(&[("10.0.0.1", "control-plane")]);
    let cfg = ClusterConfig {
        certificates: vec!["/srv/pki/ROOT-CA.crt".into()],
        ..ClusterConfig::default()
    };

    provision_nodes(&exec, &reporter, &nodes, &cfg, RunOptions::default()).await;

    let commands = exec.commands_on("control-plane");
    let upload = commands
        .iter()
        .position(|c| c == "/tmp/ROOT-CA.crt")
        .expect("upload");
    assert!(commands[upload + 1].starts_with("sudo mv /tmp/ROOT-CA.crt"));
}
