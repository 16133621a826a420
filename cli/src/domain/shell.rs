//! POSIX shell quoting for command strings sent over ssh.

/// Quote `s` as a single shell word.
///
/// Words made only of safe characters are returned as-is; everything else
/// is wrapped in single quotes with embedded quotes written as `'\''`.
#[must_use]
pub fn quote(s: &str) -> String {
    let safe = !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if safe {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', r"'\''"))
}
