use crate::utils::error::{GatewayError, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::Path;
use std::sync::OnceLock;

/// Credentials file pointed to by `GPM_CONFIG_PATH`.
///
/// ```toml
/// [gpm]
/// user = "svc-powerbi"
/// password = "${GPM_VAULT_PASSWORD}"
/// server_name = "siliconranch"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialsFile {
    pub gpm: GpmSection,
}

#[derive(Clone, Deserialize)]
pub struct GpmSection {
    pub user: Option<String>,
    pub password: Option<String>,
    pub server_name: Option<String>,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for GpmSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpmSection")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("server_name", &self.server_name)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CredentialsFile {
    /// Reads the file, resolving `${VAR}` references through `lookup`.
    pub fn from_file<P, F>(path: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let content = std::fs::read_to_string(&path).map_err(GatewayError::IoError)?;
        Self::from_toml_str(&content, lookup)
    }

    pub fn from_toml_str<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let processed = substitute_env_vars(content, lookup);

        toml::from_str(&processed).map_err(|e| GatewayError::InvalidConfigValueError {
            field: "GPM_CONFIG_PATH".to_string(),
            value: "<file>".to_string(),
            reason: format!("TOML parsing error: {}", e),
        })
    }

    /// User and password, when both are present and non-empty.
    pub fn credentials(&self) -> Option<(String, String)> {
        let user = self.gpm.user.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let password = self.gpm.password.as_deref().filter(|p| !p.trim().is_empty())?;
        Some((user.to_string(), password.to_string()))
    }
}

fn env_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"))
}

/// Replaces `${VAR}` references. Unknown variables are left as written.
pub fn substitute_env_vars<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    env_pattern()
        .replace_all(content, |caps: &regex::Captures| {
            let name = &caps[1];
            lookup(name).unwrap_or_else(|| format!("${{{}}}", name))
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn no_vars(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_credentials_file() {
        let content = r#"
[gpm]
user = "svc"
password = "secret"
server_name = "demo"
"#;
        let file = CredentialsFile::from_toml_str(content, no_vars).unwrap();
        assert_eq!(
            file.credentials(),
            Some(("svc".to_string(), "secret".to_string()))
        );
        assert_eq!(file.gpm.server_name.as_deref(), Some("demo"));
        assert!(file.gpm.base_url.is_none());
    }

    #[test]
    fn test_substitute_env_vars() {
        let out = substitute_env_vars("password = \"${PW}\" user = \"${NOPE}\"", |name| {
            (name == "PW").then(|| "hunter2".to_string())
        });
        assert_eq!(out, "password = \"hunter2\" user = \"${NOPE}\"");
    }

    #[test]
    fn test_password_resolved_through_lookup() {
        let content = "[gpm]\nuser = \"svc\"\npassword = \"${VAULT_PW}\"\n";
        let file = CredentialsFile::from_toml_str(content, |name| {
            (name == "VAULT_PW").then(|| "from-vault".to_string())
        })
        .unwrap();
        assert_eq!(file.gpm.password.as_deref(), Some("from-vault"));

        let file = CredentialsFile::from_toml_str(content, no_vars).unwrap();
        assert_eq!(file.gpm.password.as_deref(), Some("${VAULT_PW}"));
    }

    #[test]
    fn test_incomplete_credentials() {
        let content = r#"
[gpm]
user = "svc"
password = "  "
"#;
        let file = CredentialsFile::from_toml_str(content, no_vars).unwrap();
        assert!(file.credentials().is_none());
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = CredentialsFile::from_toml_str("[gpm\nuser=", no_vars).unwrap_err();
        assert!(matches!(err, GatewayError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_debug_redacts_password() {
        let file = CredentialsFile::from_toml_str("[gpm]\nuser = \"a\"\npassword = \"b\"\n", no_vars).unwrap();
        let printed = format!("{:?}", file);
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("\"b\""));
    }

    #[test]
    fn test_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[gpm]\nuser = \"file-user\"\npassword = \"file-pass\"\n")
            .unwrap();

        let file = CredentialsFile::from_file(temp_file.path(), no_vars).unwrap();
        assert_eq!(file.gpm.user.as_deref(), Some("file-user"));
    }
}
