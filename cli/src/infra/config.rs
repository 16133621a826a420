//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::application::ports::ConfigStore;
use crate::domain::ClusterConfig;

pub const CONFIG_ENV: &str = "KUBESTRAP_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "kubestrap.yaml";

/// Production implementation of `ConfigStore` that reads a YAML file on disk.
///
/// The path comes from `--config`, then `KUBESTRAP_CONFIG`, then
/// `./kubestrap.yaml`. Only the last may be absent.
#[derive(Debug, Default)]
pub struct YamlConfigStore {
    explicit: Option<PathBuf>,
}

impl YamlConfigStore {
    #[must_use]
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let explicit = explicit.or_else(|| {
            std::env::var(CONFIG_ENV)
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        });
        Self { explicit }
    }
}

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<ClusterConfig> {
        let path = self.path();
        if self.explicit.is_none() && !path.exists() {
            return Ok(ClusterConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let config: ClusterConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    fn path(&self) -> PathBuf {
        self.explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}
