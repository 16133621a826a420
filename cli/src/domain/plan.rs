//! Provisioning step plans.
//!
//! Every builder here returns data only: the command strings, the probe that
//! gates them, and the transport they need. Application services execute the
//! plans through the `RemoteExecutor` port.

use std::path::PathBuf;

use kubestrap_common::{Host, HostRegistry};

use crate::domain::config::{ClusterConfig, HostKeyPolicy};
use crate::domain::join::JoinCommand;
use crate::domain::probe::Probe;
use crate::domain::remote::Transport;
use crate::domain::shell::quote;

pub const CA_CERT_DIR: &str = "/usr/local/share/ca-certificates";
pub const APISERVER_MANIFEST: &str = "/etc/kubernetes/manifests/kube-apiserver.yaml";
pub const KUBELET_CONF: &str = "/etc/kubernetes/kubelet.conf";
pub const PRINT_JOIN_COMMAND: &str = "sudo kubeadm token create --print-join-command";
const KEYRING: &str = "/etc/apt/keyrings/kubernetes-apt-keyring.gpg";
const K8S_SOURCES: &str = "/etc/apt/sources.list.d/kubernetes.list";
const CONTAINERD_CONFIG: &str = "/etc/containerd/config.toml";
const APT_INSTALL: &str = "sudo DEBIAN_FRONTEND=noninteractive apt-get install -y";

/// One unit of remote work within a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Run(String),
    /// Run with the login password written to the command's stdin.
    RunWithPassword(String),
    /// Copy a local file to the host.
    Upload { local: String, remote: String },
    /// Copy a file from the host to the local machine.
    Download { remote: String, local: PathBuf },
    /// Install the local public key on the host with password login.
    CopyLocalKey,
}

/// A named, optionally probe-gated sequence of operations on one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub name: String,
    pub transport: Transport,
    pub probe: Option<Probe>,
    pub ops: Vec<Op>,
}

impl Step {
    fn new(name: impl Into<String>, transport: Transport) -> Self {
        Self {
            name: name.into(),
            transport,
            probe: None,
            ops: Vec::new(),
        }
    }

    fn gated(mut self, probe: Probe) -> Self {
        self.probe = Some(probe);
        self
    }

    fn run(mut self, command: impl Into<String>) -> Self {
        self.ops.push(Op::Run(command.into()));
        self
    }

    fn op(mut self, op: Op) -> Self {
        self.ops.push(op);
        self
    }
}

// ── Node provisioning ─────────────────────────────────────────────────────────

/// The per-node sequence, in execution order.
#[must_use]
pub fn node_steps(cfg: &ClusterConfig) -> Vec<Step> {
    let mut steps = vec![firewall(&cfg.firewall.ports)];
    steps.extend(cfg.certificates.iter().map(|c| certificate(c)));
    steps.extend([
        ipv4_forwarding(),
        disable_swap(),
        kubernetes_repository(&cfg.kubernetes.version),
        packages(&cfg.kubernetes.packages),
        containerd_config(),
    ]);
    steps
}

#[must_use]
pub fn firewall(ports: &[String]) -> Step {
    let step = ports.iter().fold(Step::new("firewall rules", Transport::Key), |s, p| {
        s.run(format!("sudo ufw allow {}", quote(p)))
    });
    step.run("sudo ufw --force enable")
}

#[must_use]
pub fn certificate(local_path: &str) -> Step {
    let name = local_path
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .unwrap_or(local_path);
    let dest = format!("{CA_CERT_DIR}/{name}");
    let staged = format!("/tmp/{name}");
    Step::new(format!("certificate {name}"), Transport::Key)
        .gated(Probe::exit_code(format!("test -f {}", quote(&dest))))
        .op(Op::Upload {
            local: local_path.to_string(),
            remote: staged.clone(),
        })
        .run(format!(
            "sudo mv {} {} && sudo update-ca-certificates",
            quote(&staged),
            quote(&dest)
        ))
}

#[must_use]
pub fn ipv4_forwarding() -> Step {
    Step::new("ipv4 forwarding", Transport::Key)
        .gated(Probe::output_equals("sysctl -n net.ipv4.ip_forward", "1"))
        .run("echo 'net.ipv4.ip_forward=1' | sudo tee /etc/sysctl.d/99-kubernetes-cri.conf >/dev/null")
        .run("sudo sysctl --system")
}

#[must_use]
pub fn disable_swap() -> Step {
    Step::new("disable swap", Transport::Key)
        .run(r"sudo swapoff -a && sudo sed -i -E '/^[^#].*\sswap\s/ s/^/#/' /etc/fstab")
}

/// The apt source line for a `MAJOR.MINOR` track.
#[must_use]
pub fn kubernetes_source_line(version: &str) -> String {
    format!("deb [signed-by={KEYRING}] https://pkgs.k8s.io/core:/stable:/v{version}/deb/ /")
}

#[must_use]
pub fn kubernetes_repository(version: &str) -> Step {
    let line = kubernetes_source_line(version);
    Step::new("kubernetes repository", Transport::Key)
        .gated(Probe::exit_code(format!(
            "grep -Fqs {} {K8S_SOURCES}",
            quote(&line)
        )))
        .run(format!(
            "sudo apt-get update && {APT_INSTALL} apt-transport-https ca-certificates curl gpg"
        ))
        .run("sudo mkdir -p -m 755 /etc/apt/keyrings")
        .run(format!(
            "curl -fsSL https://pkgs.k8s.io/core:/stable:/v{version}/deb/Release.key | sudo gpg --batch --yes --dearmor -o {KEYRING}"
        ))
        .run(format!(
            "echo {} | sudo tee {K8S_SOURCES} >/dev/null",
            quote(&line)
        ))
        .run("sudo apt-get update")
}

/// Install `packages` plus containerd; hold the Kubernetes packages.
#[must_use]
pub fn packages(packages: &[String]) -> Step {
    let held = packages.iter().map(|p| quote(p)).collect::<Vec<_>>().join(" ");
    let all = format!("{held} containerd");
    Step::new("kubernetes packages", Transport::Key)
        .gated(Probe::exit_code(format!("dpkg -s {all} >/dev/null 2>&1")))
        .run(format!("{APT_INSTALL} {all}"))
        .run(format!("sudo apt-mark hold {held}"))
}

#[must_use]
pub fn containerd_config() -> Step {
    Step::new("containerd config", Transport::Key)
        .gated(Probe::exit_code(format!(
            "grep -q 'SystemdCgroup = true' {CONTAINERD_CONFIG}"
        )))
        .run("sudo mkdir -p /etc/containerd")
        .run(format!(
            "containerd config default | sudo tee {CONTAINERD_CONFIG} >/dev/null"
        ))
        .run(format!(
            "sudo sed -i 's/SystemdCgroup = false/SystemdCgroup = true/' {CONTAINERD_CONFIG}"
        ))
        .run("sudo systemctl restart containerd")
}

// ── SSH trust ─────────────────────────────────────────────────────────────────

#[must_use]
pub fn remote_key() -> Step {
    Step::new("ssh key", Transport::Password)
        .gated(Probe::exit_code(r#"test -f "$HOME/.ssh/id_rsa""#))
        .run(r#"mkdir -p -m 700 "$HOME/.ssh" && ssh-keygen -t rsa -b 4096 -N '' -f "$HOME/.ssh/id_rsa" -q"#)
}

/// Drop-in sudoers file granting `user` passwordless sudo.
///
/// The entry is validated with `visudo` before it is installed; `sudo -S`
/// reads the login password from stdin.
#[must_use]
pub fn passwordless_sudo(user: &str) -> Step {
    // sudo ignores drop-in files whose names contain a dot.
    let file = user.replace('.', "_");
    let tmp = "/tmp/kubestrap-sudoers";
    let entry = quote(&format!("{user} ALL=(ALL) NOPASSWD: ALL"));
    let script = format!(
        "printf '%s\\n' {entry} > {tmp} && visudo -cf {tmp} >/dev/null && install -m 0440 {tmp} {dest}; rc=$?; rm -f {tmp}; exit $rc",
        dest = quote(&format!("/etc/sudoers.d/{file}")),
    );
    Step::new("passwordless sudo", Transport::Password)
        .gated(Probe::exit_code("sudo -n true"))
        .op(Op::RunWithPassword(format!(
            "sudo -S -p '' sh -c {}",
            quote(&script)
        )))
}

#[must_use]
pub fn sshpass_installed() -> Step {
    Step::new("sshpass", Transport::Password)
        .gated(Probe::exit_code("command -v sshpass >/dev/null"))
        .run(format!("{APT_INSTALL} sshpass"))
}

/// Append whichever registry lines `/etc/hosts` is missing.
#[must_use]
pub fn hosts_file(registry: &HostRegistry) -> Step {
    let lines: Vec<String> = registry.hosts_lines().iter().map(|l| quote(l)).collect();
    let probe = lines
        .iter()
        .map(|l| format!("grep -Fxq {l} /etc/hosts"))
        .collect::<Vec<_>>()
        .join(" && ");
    let append = lines
        .iter()
        .map(|l| format!("{{ grep -Fxq {l} /etc/hosts || echo {l} | sudo tee -a /etc/hosts >/dev/null; }}"))
        .collect::<Vec<_>>()
        .join(" && ");
    Step::new("/etc/hosts", Transport::Password)
        .gated(Probe::exit_code(probe))
        .run(append)
}

/// Key login from this machine to the host.
#[must_use]
pub fn local_trust() -> Step {
    Step::new("ssh trust from local", Transport::Key)
        .gated(Probe::login("true"))
        .op(Op::CopyLocalKey)
}

/// Key login from the executing host to `peer`, set up through a hop.
///
/// Runs on the source host over key login; the password reaches `sshpass`
/// on the source host via stdin, never its command line.
#[must_use]
pub fn peer_trust(user: &str, peer: &Host, host_key: HostKeyPolicy) -> Step {
    let target = quote(&format!("{user}@{}", peer.address));
    let strict = host_key.as_ssh_value();
    Step::new(format!("ssh trust to {}", peer.label), Transport::Key)
        .gated(Probe::exit_code(format!(
            "ssh -o BatchMode=yes -o StrictHostKeyChecking={strict} -o ConnectTimeout=10 {target} true >/dev/null 2>&1 || exit 1"
        )))
        .op(Op::RunWithPassword(format!(
            "IFS= read -r SSHPASS && export SSHPASS && sshpass -e ssh-copy-id -o StrictHostKeyChecking={strict} {target}"
        )))
}

// ── Cluster bootstrap ─────────────────────────────────────────────────────────

#[must_use]
pub fn control_plane_init(pod_network_cidr: &str) -> Step {
    Step::new("control-plane init", Transport::Key)
        .gated(Probe::exit_code(format!("test -f {APISERVER_MANIFEST}")))
        .run(format!(
            "sudo kubeadm init --pod-network-cidr={}",
            quote(pod_network_cidr)
        ))
        .run(r#"mkdir -p "$HOME/.kube" && sudo cp -f /etc/kubernetes/admin.conf "$HOME/.kube/config" && sudo chown "$(id -u):$(id -g)" "$HOME/.kube/config""#)
}

#[must_use]
pub fn worker_join(join: &JoinCommand) -> Step {
    Step::new("join cluster", Transport::Key)
        .gated(Probe::exit_code(format!("test -f {KUBELET_CONF}")))
        .run(format!("sudo {}", join.as_str()))
}

#[must_use]
pub fn fetch_kubeconfig(local: PathBuf) -> Step {
    Step::new("fetch kubeconfig", Transport::Key).op(Op::Download {
        remote: ".kube/config".to_string(),
        local,
    })
}

#[must_use]
pub fn network_plugin(manifests: &[String]) -> Step {
    manifests
        .iter()
        .fold(Step::new("network plugin", Transport::Key), |s, m| {
            s.run(format!("kubectl apply -f {}", quote(m)))
        })
}
