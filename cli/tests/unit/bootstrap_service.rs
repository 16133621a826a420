//! Cluster bootstrap driven through the scripted executor.

#![allow(clippy::expect_used)]

use std::path::PathBuf;

use kubestrap_cli::application::services::RunOptions;
use kubestrap_cli::application::services::bootstrap::{
    BootstrapOptions, bootstrap_cluster, init_control_plane,
};
use kubestrap_cli::domain::config::TopologyConfig;
use kubestrap_cli::domain::plan::PRINT_JOIN_COMMAND;
use kubestrap_cli::domain::{CommandOutput, FailurePolicy, Topology, UnreachablePolicy};
use kubestrap_common::{Host, HostStatus, StepOutcome};

use crate::mocks::{CallKind, RecordingReporter, ScriptedExecutor, exit, ok_stdout, registry};

const JOIN: &str = "kubeadm join 172.16.197.110:6443 --token abcdef.0123456789abcdef --discovery-token-ca-cert-hash sha256:00ff";
const MANIFESTS: [&str; 1] = ["https://example.test/calico.yaml"];

fn topology() -> Topology {
    let hosts = registry(&[
        ("172.16.197.100", "ubuntu"),
        ("172.16.197.110", "control-plane"),
        ("172.16.197.120", "worker-node1"),
        ("172.16.197.130", "worker-node2"),
    ]);
    let cfg = TopologyConfig {
        exclude: vec!["ubuntu".into()],
        ..TopologyConfig::default()
    };
    Topology::resolve(&hosts, &cfg).expect("topology")
}

fn manifests() -> Vec<String> {
    MANIFESTS.iter().map(ToString::to_string).collect()
}

fn opts(manifests: &[String], kubeconfig: Option<PathBuf>) -> BootstrapOptions<'_> {
    BootstrapOptions {
        pod_network_cidr: "192.168.0.0/16",
        manifests,
        kubeconfig_dest: kubeconfig,
        run: RunOptions::default(),
    }
}

/// A control plane that is not initialized and workers that have not joined.
fn fresh_cluster() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .when("test -f", exit(1))
        .when(
            PRINT_JOIN_COMMAND,
            ok_stdout(&format!("W0101 warning line\n{JOIN}  \n")),
        )
}

#[tokio::test]
async fn test_fresh_cluster_inits_joins_and_applies_plugin() {
    let exec = fresh_cluster();
    let reporter = RecordingReporter::default();
    let manifests = manifests();

    let report = bootstrap_cluster(&exec, &reporter, &topology(), opts(&manifests, None)).await;

    let cp = exec.commands_on("control-plane");
    assert!(cp.iter().any(|c| c.starts_with("sudo kubeadm init --pod-network-cidr=192.168.0.0/16")));
    assert!(cp.iter().any(|c| c == "kubectl apply -f https://example.test/calico.yaml"));

    for worker in ["worker-node1", "worker-node2"] {
        let commands = exec.commands_on(worker);
        assert!(
            commands.iter().any(|c| c == &format!("sudo {JOIN}")),
            "{worker} did not join: {commands:?}"
        );
    }
    assert!(exec.commands_on("ubuntu").is_empty());
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_initialized_control_plane_skips_init_and_join() {
    let exec = ScriptedExecutor::new();
    let reporter = RecordingReporter::default();
    let manifests = manifests();

    let report = bootstrap_cluster(&exec, &reporter, &topology(), opts(&manifests, None)).await;

    assert!(!exec.calls().iter().any(|c| c.command.contains("kubeadm init")));
    assert!(!exec.calls().iter().any(|c| c.command == PRINT_JOIN_COMMAND));
    assert!(exec.commands_on("worker-node1").is_empty());
    assert!(exec.commands_on("worker-node2").is_empty());
    assert!(reporter.contains("worker nodes already joined"));

    let cp = &report.hosts[0];
    assert_eq!(cp.steps[0].outcome, StepOutcome::Skipped);
    assert_eq!(cp.status(), HostStatus::Succeeded);

    let workers: Vec<&str> = report.hosts[1..].iter().map(|h| h.host.label.as_str()).collect();
    assert_eq!(workers, ["worker-node1", "worker-node2"]);
    for worker in &report.hosts[1..] {
        assert_eq!(worker.steps.len(), 1);
        assert_eq!(worker.steps[0].step, "join cluster");
        assert_eq!(worker.steps[0].outcome, StepOutcome::Skipped);
    }
}

#[tokio::test]
async fn test_joined_worker_is_not_joined_again() {
    let exec = ScriptedExecutor::new()
        .when_on("control-plane", "test -f", exit(1))
        .when_on("worker-node2", "test -f", exit(1))
        .when(PRINT_JOIN_COMMAND, ok_stdout(JOIN));
    let reporter = RecordingReporter::default();
    let manifests = manifests();

    bootstrap_cluster(&exec, &reporter, &topology(), opts(&manifests, None)).await;

    assert!(!exec.commands_on("worker-node1").iter().any(|c| c.contains("kubeadm join")));
    assert!(exec.commands_on("worker-node2").iter().any(|c| c.contains("kubeadm join")));
}

#[tokio::test]
async fn test_failed_init_leaves_workers_not_attempted() {
    let exec = ScriptedExecutor::new()
        .when("test -f", exit(1))
        .when(
            "sudo kubeadm init",
            CommandOutput::new(Some(1), "", "[ERROR Swap]: running with swap on is not supported"),
        );
    let reporter = RecordingReporter::default();
    let manifests = manifests();

    let report = bootstrap_cluster(&exec, &reporter, &topology(), opts(&manifests, None)).await;

    assert!(exec.commands_on("worker-node1").is_empty());
    assert!(!exec.calls().iter().any(|c| c.command.starts_with("kubectl apply")));
    let statuses: Vec<HostStatus> = report.hosts.iter().map(|h| h.status()).collect();
    assert_eq!(
        statuses,
        [
            HostStatus::Failed,
            HostStatus::NotAttempted,
            HostStatus::NotAttempted
        ]
    );
}

#[tokio::test]
async fn test_kubeconfig_is_fetched_from_control_plane() {
    let exec = ScriptedExecutor::new();
    let reporter = RecordingReporter::default();
    let manifests = manifests();
    let dest = PathBuf::from("/tmp/kubestrap-test/config");

    bootstrap_cluster(&exec, &reporter, &topology(), opts(&manifests, Some(dest))).await;

    let downloads: Vec<_> = exec
        .calls()
        .into_iter()
        .filter(|c| c.kind == CallKind::Download)
        .collect();
    assert_eq!(downloads.len(), 1);
    assert_eq!(downloads[0].host, "control-plane");
    assert_eq!(downloads[0].command, ".kube/config");
}

#[tokio::test]
async fn test_init_without_join_line_is_an_error() {
    let exec = ScriptedExecutor::new()
        .when("test -f", exit(1))
        .when(PRINT_JOIN_COMMAND, ok_stdout("token created\n"));
    let reporter = RecordingReporter::default();
    let cp = Host::new("172.16.197.110", "control-plane");

    let err = init_control_plane(
        &exec,
        &reporter,
        &cp,
        "192.168.0.0/16",
        UnreachablePolicy::default(),
    )
    .await
    .expect_err("missing join line");

    assert!(format!("{err:#}").contains("join"));
}

#[tokio::test]
async fn test_init_returns_trimmed_join_command() {
    let exec = fresh_cluster();
    let reporter = RecordingReporter::default();
    let cp = Host::new("172.16.197.110", "control-plane");

    let join = init_control_plane(
        &exec,
        &reporter,
        &cp,
        "192.168.0.0/16",
        UnreachablePolicy::default(),
    )
    .await
    .expect("join command");

    assert_eq!(join.as_str(), JOIN);
}

#[tokio::test]
async fn test_keep_going_joins_remaining_workers_after_a_failed_join() {
    let exec = fresh_cluster().when_on("worker-node1", "sudo kubeadm join", exit(1));
    let reporter = RecordingReporter::default();
    let manifests = manifests();
    let mut opts = opts(&manifests, None);
    opts.run.on_failure = FailurePolicy::KeepGoing;

    let report = bootstrap_cluster(&exec, &reporter, &topology(), opts).await;

    assert!(exec.commands_on("worker-node2").iter().any(|c| c.contains("kubeadm join")));
    let statuses: Vec<HostStatus> = report.hosts.iter().map(|h| h.status()).collect();
    assert_eq!(
        statuses,
        [HostStatus::Succeeded, HostStatus::Failed, HostStatus::Succeeded]
    );
}

#[tokio::test]
async fn test_abort_stops_joins_after_a_failed_join() {
    let exec = fresh_cluster().when_on("worker-node1", "sudo kubeadm join", exit(1));
    let reporter = RecordingReporter::default();
    let manifests = manifests();

    bootstrap_cluster(&exec, &reporter, &topology(), opts(&manifests, None)).await;

    assert!(!exec.commands_on("worker-node2").iter().any(|c| c.contains("kubeadm join")));
}
