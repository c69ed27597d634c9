#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::config::toml_config::CredentialsFile;
use crate::utils::error::{GatewayError, Result};
use crate::utils::validation::{
    validate_non_empty_secret, validate_non_empty_string, validate_positive_number,
    validate_range, validate_required_field, validate_url, Validate,
};
use std::fmt;

pub const DEFAULT_SERVER_NAME: &str = "siliconranch";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_BATCH_SIZE: usize = 1;
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the credentials were resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    File,
    Environment,
}

/// Settings for the GPM+ client, read once at startup.
#[derive(Debug, Clone)]
pub struct GpmSettings {
    pub credentials: Credentials,
    pub credential_source: CredentialSource,
    pub server_name: String,
    pub base_url: Option<String>,
    pub request_timeout_secs: u64,
    pub batch_size: usize,
    pub max_concurrent_requests: usize,
}

impl GpmSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from a variable lookup.
    ///
    /// The credentials file named by `GPM_CONFIG_PATH` is tried first; when it
    /// is missing or incomplete, `GPM_USER`/`GPM_PASS` are used.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let file = match var("GPM_CONFIG_PATH") {
            Some(path) => match CredentialsFile::from_file(&path, &lookup) {
                Ok(file) => Some(file),
                Err(e) => {
                    tracing::warn!(
                        "Credentials file {} unusable ({}), falling back to environment",
                        path,
                        e
                    );
                    None
                }
            },
            None => None,
        };

        let (credentials, credential_source) =
            match file.as_ref().and_then(CredentialsFile::credentials) {
                Some((user, password)) => (Credentials { user, password }, CredentialSource::File),
                None => {
                    let user = var("GPM_USER");
                    let password = var("GPM_PASS");
                    let credentials = Credentials {
                        user: validate_required_field("GPM_USER", &user)?.clone(),
                        password: validate_required_field("GPM_PASS", &password)?.clone(),
                    };
                    (credentials, CredentialSource::Environment)
                }
            };

        let file_section = file.as_ref().map(|f| &f.gpm);
        let server_name = var("GPM_PLUS_SERVER_NAME")
            .or_else(|| file_section.and_then(|s| s.server_name.clone()))
            .unwrap_or_else(|| DEFAULT_SERVER_NAME.to_string());
        let base_url = var("GPM_BASE_URL").or_else(|| file_section.and_then(|s| s.base_url.clone()));

        Ok(Self {
            credentials,
            credential_source,
            server_name,
            base_url,
            request_timeout_secs: parse_number(&var, "GPM_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?,
            batch_size: parse_number(&var, "GPM_DATA_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            max_concurrent_requests: parse_number(
                &var,
                "GPM_MAX_CONCURRENT_REQUESTS",
                DEFAULT_MAX_CONCURRENT_REQUESTS,
            )?,
        })
    }

    /// API root, e.g. `https://webapisiliconranch.horizon.greenpowermonitor.com/api`.
    pub fn api_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!(
                "https://webapi{}.horizon.greenpowermonitor.com/api",
                self.server_name
            ),
        }
    }
}

fn parse_number<T, F>(var: &F, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GatewayError::InvalidConfigValueError {
                field: key.to_string(),
                value: raw.clone(),
                reason: "Expected an unsigned integer".to_string(),
            }),
    }
}

impl Validate for GpmSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("GPM_USER", &self.credentials.user)?;
        validate_non_empty_secret("GPM_PASS", &self.credentials.password)?;
        validate_non_empty_string("GPM_PLUS_SERVER_NAME", &self.server_name)?;
        validate_url("GPM_BASE_URL", &self.api_base_url())?;
        validate_range("GPM_REQUEST_TIMEOUT_SECS", self.request_timeout_secs, 1, 600)?;
        validate_positive_number("GPM_DATA_BATCH_SIZE", self.batch_size, 1)?;
        validate_range("GPM_MAX_CONCURRENT_REQUESTS", self.max_concurrent_requests, 1, 64)?;

        tracing::info!("✅ GPM+ configuration validation passed");
        Ok(())
    }
}
