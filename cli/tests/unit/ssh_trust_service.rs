//! SSH trust setup driven through the scripted executor.

#![allow(clippy::expect_used)]

use kubestrap_cli::application::services::RunOptions;
use kubestrap_cli::application::services::ssh_trust::{TrustOptions, setup_trust};
use kubestrap_cli::domain::{HostKeyPolicy, Transport};
use kubestrap_common::{HostRegistry, HostStatus, StepOutcome};

use crate::mocks::{
    CallKind, FakeIdentity, RecordingReporter, ScriptedExecutor, exit, registry,
};

const PEER_COPY: &str = "IFS= read -r SSHPASS";

fn hosts() -> HostRegistry {
    registry(&[
        ("172.16.197.110", "control-plane"),
        ("172.16.197.120", "worker-node1"),
        ("172.16.197.130", "worker-node2"),
    ])
}

fn opts() -> TrustOptions<'static> {
    TrustOptions {
        user: "ops",
        host_key: HostKeyPolicy::No,
        run: RunOptions::default(),
    }
}

#[tokio::test]
async fn test_no_probe_satisfied_copies_every_ordered_pair_once() {
    let exec = ScriptedExecutor::new().trust_probes_absent();
    let reporter = RecordingReporter::default();
    let registry = hosts();

    let report = setup_trust(&exec, &FakeIdentity::Present, &reporter, &registry, &opts())
        .await
        .expect("trust");

    let copies: Vec<_> = exec
        .calls()
        .into_iter()
        .filter(|c| c.kind == CallKind::ExecWithPassword && c.command.starts_with(PEER_COPY))
        .collect();
    let n = registry.len();
    assert_eq!(copies.len(), n * (n - 1));

    for copy in &copies {
        let source = registry
            .find_by_label(&copy.host)
            .expect("known source host");
        assert!(
            !copy.command.contains(&format!("ops@{}", source.address)),
            "self pair issued on {}",
            copy.host
        );
        assert_eq!(copy.transport, Transport::Key);
    }
    assert_eq!(exec.count(|c| c.kind == CallKind::CopyLocalKey), n);
    assert!(!report.has_failures());
}

#[tokio::test]
async fn test_all_probes_satisfied_changes_nothing() {
    let exec = ScriptedExecutor::new();
    let reporter = RecordingReporter::default();

    let report = setup_trust(&exec, &FakeIdentity::Present, &reporter, &hosts(), &opts())
        .await
        .expect("trust");

    assert_eq!(exec.count(|c| c.kind != CallKind::Exec), 0);
    for host in &report.hosts {
        assert_eq!(host.count(|o| *o == StepOutcome::Skipped), host.steps.len());
    }
}

#[tokio::test]
async fn test_phases_run_over_all_hosts_before_the_next() {
    let exec = ScriptedExecutor::new().trust_probes_absent();
    let reporter = RecordingReporter::default();

    setup_trust(&exec, &FakeIdentity::Present, &reporter, &hosts(), &opts())
        .await
        .expect("trust");

    let calls = exec.calls();
    let last_keygen = calls
        .iter()
        .rposition(|c| c.command.contains("ssh-keygen"))
        .expect("keygen");
    let first_sudo = calls
        .iter()
        .position(|c| c.command == "sudo -n true")
        .expect("sudo probe");
    assert!(last_keygen < first_sudo);
    assert_eq!(exec.count(|c| c.command.contains("ssh-keygen")), 3);
}

#[tokio::test]
async fn test_sudoers_install_reads_password_from_stdin() {
    let exec = ScriptedExecutor::new().trust_probes_absent();
    let reporter = RecordingReporter::default();

    setup_trust(&exec, &FakeIdentity::Present, &reporter, &hosts(), &opts())
        .await
        .expect("trust");

    let sudo: Vec<_> = exec
        .calls()
        .into_iter()
        .filter(|c| c.command.starts_with("sudo -S"))
        .collect();
    assert_eq!(sudo.len(), 3);
    for call in sudo {
        assert_eq!(call.kind, CallKind::ExecWithPassword);
        assert_eq!(call.transport, Transport::Password);
        assert!(call.command.contains("visudo -cf"));
    }
}

#[tokio::test]
async fn test_missing_local_key_is_generated_first() {
    let exec = ScriptedExecutor::new();
    let reporter = RecordingReporter::default();

    setup_trust(&exec, &FakeIdentity::Missing, &reporter, &hosts(), &opts())
        .await
        .expect("trust");

    assert!(reporter.messages()[1].contains("generated local SSH key"));
}

#[tokio::test]
async fn test_local_key_failure_is_fatal() {
    let exec = ScriptedExecutor::new();
    let reporter = RecordingReporter::default();

    let err = setup_trust(&exec, &FakeIdentity::Broken, &reporter, &hosts(), &opts())
        .await
        .expect_err("keygen failure");

    assert!(format!("{err:#}").contains("ssh-keygen failed"));
    assert!(exec.calls().is_empty());
}

#[tokio::test]
async fn test_failed_sudo_aborts_remaining_hosts() {
    let exec = ScriptedExecutor::new()
        .trust_probes_absent()
        .when_on("worker-node1", "sudo -S", exit(1));
    let reporter = RecordingReporter::default();

    let report = setup_trust(&exec, &FakeIdentity::Present, &reporter, &hosts(), &opts())
        .await
        .expect("trust");

    assert!(
        !exec
            .commands_on("worker-node2")
            .iter()
            .any(|c| c == "sudo -n true"),
        "no host may start a step after the failure"
    );
    assert_eq!(exec.count(|c| c.command.starts_with(PEER_COPY)), 0);
    let statuses: Vec<HostStatus> = report.hosts.iter().map(|h| h.status()).collect();
    assert_eq!(
        statuses,
        [
            HostStatus::Incomplete,
            HostStatus::Failed,
            HostStatus::Incomplete
        ]
    );
}
