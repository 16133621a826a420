//! Domain types and validators for kubestrap configuration.
//!
//! Pure functions only, no I/O.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_HOSTS_FILE: &str = "servers.txt";
pub const DEFAULT_CONTROL_PLANE: &str = "control-plane";

// ── Policies ─────────────────────────────────────────────────────────────────

/// What to do when an idempotency probe cannot reach its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum UnreachablePolicy {
    /// Run the mutating step anyway, as if the probe reported "absent".
    #[default]
    TreatAsAbsent,
    /// Fail the step without running it.
    Fail,
}

/// What to do after a step fails on one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the whole run; later hosts are not attempted.
    #[default]
    Abort,
    /// Stop only the failing host and carry on with the next one.
    KeepGoing,
}

/// Value passed to `ssh -o StrictHostKeyChecking=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    #[default]
    No,
    AcceptNew,
    Yes,
}

impl HostKeyPolicy {
    #[must_use]
    pub fn as_ssh_value(self) -> &'static str {
        match self {
            Self::No => "no",
            Self::AcceptNew => "accept-new",
            Self::Yes => "yes",
        }
    }
}

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `kubestrap.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Line-oriented host list, used when `hosts` is empty.
    pub hosts_file: String,
    /// Inline address → name mapping; takes precedence over `hosts_file`.
    pub hosts: BTreeMap<String, String>,
    pub ssh: SshConfig,
    pub cluster: TopologyConfig,
    pub kubernetes: KubernetesConfig,
    pub firewall: FirewallConfig,
    /// Local CA certificate files installed on every node.
    pub certificates: Vec<String>,
    pub network_plugin: NetworkPluginConfig,
    pub probes: ProbeConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            hosts_file: DEFAULT_HOSTS_FILE.to_string(),
            hosts: BTreeMap::new(),
            ssh: SshConfig::default(),
            cluster: TopologyConfig::default(),
            kubernetes: KubernetesConfig::default(),
            firewall: FirewallConfig::default(),
            certificates: Vec::new(),
            network_plugin: NetworkPluginConfig::default(),
            probes: ProbeConfig::default(),
        }
    }
}

/// SSH connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub strict_host_key_checking: HostKeyPolicy,
    pub connect_timeout_secs: u64,
    /// Upper bound for a single remote command (package installs are slow).
    pub command_timeout_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            strict_host_key_checking: HostKeyPolicy::default(),
            connect_timeout_secs: 10,
            command_timeout_secs: 900,
        }
    }
}

/// Which hosts play which role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Label of the control-plane host.
    pub control_plane: String,
    /// Labels that are in the host list but are not cluster nodes.
    pub exclude: Vec<String>,
    /// Copy the admin kubeconfig to the local `~/.kube/config`.
    pub fetch_kubeconfig: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            control_plane: DEFAULT_CONTROL_PLANE.to_string(),
            exclude: Vec::new(),
            fetch_kubeconfig: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubernetesConfig {
    /// Minor release track, e.g. `1.30`; selects the pkgs.k8s.io repository.
    pub version: String,
    pub pod_network_cidr: String,
    /// Packages installed and held on every node.
    pub packages: Vec<String>,
}

impl Default for KubernetesConfig {
    fn default() -> Self {
        Self {
            version: "1.30".to_string(),
            pod_network_cidr: "192.168.0.0/16".to_string(),
            packages: ["kubelet", "kubeadm", "kubectl"]
                .map(String::from)
                .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// `ufw allow` arguments, e.g. `6443/tcp` or `2379:2380/tcp`.
    pub ports: Vec<String>,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            ports: [
                "6443/tcp",
                "2379:2380/tcp",
                "10250/tcp",
                "10251/tcp",
                "10252/tcp",
                "30000:32767/tcp",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkPluginConfig {
    /// Manifests applied once from the control plane after init.
    pub manifests: Vec<String>,
}

impl Default for NetworkPluginConfig {
    fn default() -> Self {
        Self {
            manifests: [
                "https://raw.githubusercontent.com/projectcalico/calico/v3.25.0/manifests/tigera-operator.yaml",
                "https://docs.projectcalico.org/manifests/calico.yaml",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub on_unreachable: UnreachablePolicy,
}

// ── Validators ───────────────────────────────────────────────────────────────

impl ClusterConfig {
    /// Check value formats that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for the first invalid value.
    pub fn validate(&self) -> Result<()> {
        validate_kubernetes_version(&self.kubernetes.version)?;
        validate_pod_cidr(&self.kubernetes.pod_network_cidr)?;
        if self.ssh.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("ssh.connect_timeout_secs").into());
        }
        if self.ssh.command_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout("ssh.command_timeout_secs").into());
        }
        Ok(())
    }
}

/// Validates a `MAJOR.MINOR` Kubernetes release track.
///
/// # Errors
///
/// Returns an error if `version` is not two dot-separated integers.
pub fn validate_kubernetes_version(version: &str) -> Result<()> {
    let re = regex::Regex::new(r"^[0-9]+\.[0-9]+$")?;
    if !re.is_match(version) {
        return Err(ConfigError::InvalidKubernetesVersion(version.to_string()).into());
    }
    Ok(())
}

/// Validates an `ADDRESS/PREFIX` network range.
///
/// # Errors
///
/// Returns an error if the CIDR is malformed or the prefix exceeds 128.
pub fn validate_pod_cidr(cidr: &str) -> Result<()> {
    let invalid = || ConfigError::InvalidPodCidr(cidr.to_string());
    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    let re = regex::Regex::new(r"^[0-9A-Fa-f:.]+$")?;
    let prefix_ok = prefix.parse::<u8>().is_ok_and(|p| p <= 128);
    if !re.is_match(addr) || !prefix_ok {
        return Err(invalid().into());
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
