use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A cluster node, addressed by IP (or resolvable name) and known by a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub address: String,
    pub label: String,
}

impl Host {
    pub fn new(address: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: label.into(),
        }
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.label, self.address)
    }
}

/// Errors produced while building a host registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostFileError {
    #[error("host list is empty: add lines of the form '<address> <name>[,<alias>...]'")]
    Empty,
}

/// Immutable mapping from address to label.
///
/// Addresses are unique; a later entry for the same address replaces the
/// earlier one. Iteration is in lexicographic address order so that every
/// run touches hosts in the same sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostRegistry {
    hosts: BTreeMap<String, String>,
}

impl HostRegistry {
    /// Build a registry from `(address, label)` pairs.
    pub fn from_pairs<I, A, L>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, L)>,
        A: Into<String>,
        L: Into<String>,
    {
        Self {
            hosts: pairs
                .into_iter()
                .map(|(a, l)| (a.into(), l.into()))
                .collect(),
        }
    }

    /// Parse the line-oriented host list format.
    ///
    /// Each line is `<address> <name>[,<alias>...]`, columns separated by
    /// whitespace. The first comma-separated name becomes the label; aliases
    /// and any further columns are ignored. Lines with fewer than two
    /// columns, lines whose first name is empty (`10.0.0.5 ,w1`) and `#`
    /// comment lines are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut hosts = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let mut columns = line.split_whitespace();
            let (Some(address), Some(names)) = (columns.next(), columns.next()) else {
                continue;
            };
            let label = names.split(',').next().unwrap_or(names);
            if label.is_empty() {
                continue;
            }
            hosts.insert(address.to_string(), label.to_string());
        }
        Self { hosts }
    }

    /// Reject an empty registry.
    pub fn non_empty(self) -> Result<Self, HostFileError> {
        if self.hosts.is_empty() {
            return Err(HostFileError::Empty);
        }
        Ok(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Hosts in execution order.
    pub fn iter(&self) -> impl Iterator<Item = Host> + '_ {
        self.hosts.iter().map(|(a, l)| Host::new(a, l))
    }

    #[must_use]
    pub fn hosts(&self) -> Vec<Host> {
        self.iter().collect()
    }

    #[must_use]
    pub fn label_of(&self, address: &str) -> Option<&str> {
        self.hosts.get(address).map(String::as_str)
    }

    /// First host (in execution order) carrying `label`.
    #[must_use]
    pub fn find_by_label(&self, label: &str) -> Option<Host> {
        self.iter().find(|h| h.label == label)
    }

    /// `/etc/hosts` lines for every registry entry, in execution order.
    #[must_use]
    pub fn hosts_lines(&self) -> Vec<String> {
        self.hosts.iter().map(|(a, l)| format!("{a} {l}")).collect()
    }

    /// The `/etc/hosts` block, one newline-terminated line per host.
    #[must_use]
    pub fn hosts_block(&self) -> String {
        self.hosts_lines()
            .into_iter()
            .fold(String::new(), |mut acc, line| {
                acc.push_str(&line);
                acc.push('\n');
                acc
            })
    }
}
