//! Reads SSH credentials from the process environment and a `.env` file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::Credentials;
use crate::domain::credentials::parse_env_file;

pub const DEFAULT_ENV_FILE: &str = ".env";

/// Source of [`Credentials`] for the current invocation.
#[derive(Debug)]
pub struct EnvCredentialSource {
    env_file: PathBuf,
}

/// Credentials plus whether the env file was present.
#[derive(Debug)]
pub struct LoadedCredentials {
    pub credentials: Credentials,
    pub env_file_found: bool,
}

impl EnvCredentialSource {
    #[must_use]
    pub fn new(env_file: Option<PathBuf>) -> Self {
        Self {
            env_file: env_file.unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE)),
        }
    }

    #[must_use]
    pub fn env_file(&self) -> &Path {
        &self.env_file
    }

    /// Resolve credentials; the process environment wins over the file.
    ///
    /// # Errors
    ///
    /// Returns an error if the env file exists but cannot be read, or a
    /// required variable is unset in both places.
    pub fn load(&self, need_password: bool) -> Result<LoadedCredentials> {
        let (file, env_file_found) = match std::fs::read_to_string(&self.env_file) {
            Ok(text) => (parse_env_file(&text), true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (BTreeMap::new(), false),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("cannot read {}", self.env_file.display()));
            }
        };
        let credentials =
            Credentials::resolve(|key| std::env::var(key).ok(), &file, need_password)?;
        Ok(LoadedCredentials {
            credentials,
            env_file_found,
        })
    }
}
