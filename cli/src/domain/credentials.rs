//! SSH credentials and the `KEY=VALUE` file format they may come from.

use std::collections::BTreeMap;

use crate::domain::error::CredentialError;

pub const SSH_USER_VAR: &str = "SSH_USER";
pub const SSH_PASSWORD_VAR: &str = "SSH_PASSWORD";

/// Remote login used for every SSH connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    #[must_use]
    pub fn new(user: impl Into<String>, password: Option<String>) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Resolve credentials, process environment first, then the env file.
    ///
    /// Empty values count as unset. `SSH_USER` is always required;
    /// `SSH_PASSWORD` only when `need_password` is set.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Missing`] naming every absent variable.
    pub fn resolve(
        env: impl Fn(&str) -> Option<String>,
        file: &BTreeMap<String, String>,
        need_password: bool,
    ) -> Result<Self, CredentialError> {
        let lookup = |key: &str| {
            env(key)
                .filter(|v| !v.is_empty())
                .or_else(|| file.get(key).filter(|v| !v.is_empty()).cloned())
        };
        let user = lookup(SSH_USER_VAR);
        let password = lookup(SSH_PASSWORD_VAR);

        let mut missing = Vec::new();
        if user.is_none() {
            missing.push(SSH_USER_VAR);
        }
        if need_password && password.is_none() {
            missing.push(SSH_PASSWORD_VAR);
        }
        match user {
            Some(user) if missing.is_empty() => Ok(Self::new(user, password)),
            _ => Err(CredentialError::Missing(missing)),
        }
    }
}

/// Parse a dotenv-style file.
///
/// Supports `KEY=VALUE`, an optional `export ` prefix, `#` comment lines,
/// and values wrapped in matching single or double quotes. Malformed lines
/// are ignored.
#[must_use]
pub fn parse_env_file(text: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            continue;
        }
        vars.insert(key.to_string(), unquote(value.trim()).to_string());
    }
    vars
}

fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
