use thiserror::Error;

const MAX_UPSTREAM_BODY: usize = 512;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{message}")]
    ValidationError { message: String },

    #[error("Upstream returned {status} for {endpoint}: {body}")]
    UpstreamStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Unexpected upstream payload from {endpoint}: {message}")]
    UpstreamFormat { endpoint: String, message: String },

    #[error("Authentication with GPM+ failed: {message}")]
    AuthError { message: String },
}

/// Coarse grouping used for logging and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Upstream,
    Configuration,
    Internal,
}

impl GatewayError {
    pub fn validation(message: impl Into<String>) -> Self {
        GatewayError::ValidationError {
            message: message.into(),
        }
    }

    /// Builds an upstream status error, truncating the body text.
    pub fn upstream_status(endpoint: &str, status: u16, body: &str) -> Self {
        let body = if body.chars().count() > MAX_UPSTREAM_BODY {
            let cut: String = body.chars().take(MAX_UPSTREAM_BODY).collect();
            format!("{}...", cut)
        } else {
            body.to_string()
        };
        GatewayError::UpstreamStatus {
            endpoint: endpoint.to_string(),
            status,
            body,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            GatewayError::ValidationError { .. } => ErrorCategory::Validation,
            GatewayError::ApiError(_)
            | GatewayError::UpstreamStatus { .. }
            | GatewayError::UpstreamFormat { .. }
            | GatewayError::AuthError { .. } => ErrorCategory::Upstream,
            GatewayError::MissingConfigError { .. }
            | GatewayError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            GatewayError::IoError(_) => ErrorCategory::Internal,
        }
    }

    /// HTTP status this error maps to when it reaches a handler.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::ValidationError { .. } => 422,
            GatewayError::UpstreamStatus { status, .. } => match *status {
                404 => 404,
                400 | 422 => 422,
                _ => 502,
            },
            GatewayError::ApiError(e) if e.is_timeout() => 504,
            GatewayError::ApiError(_)
            | GatewayError::UpstreamFormat { .. }
            | GatewayError::AuthError { .. } => 502,
            _ => 500,
        }
    }

    /// Short machine-readable kind, returned as `error` in JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::ValidationError { .. } => "validation_error",
            GatewayError::UpstreamStatus { status: 404, .. } => "not_found",
            GatewayError::UpstreamStatus { .. } => "upstream_error",
            GatewayError::ApiError(e) if e.is_timeout() => "upstream_timeout",
            GatewayError::ApiError(_) => "upstream_unreachable",
            GatewayError::UpstreamFormat { .. } => "upstream_format",
            GatewayError::AuthError { .. } => "upstream_auth",
            GatewayError::MissingConfigError { .. }
            | GatewayError::InvalidConfigValueError { .. } => "config_error",
            GatewayError::IoError(_) => "internal_error",
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Validation => "Check the query parameters of the request",
            ErrorCategory::Upstream => "Check GPM+ availability and the configured credentials",
            ErrorCategory::Configuration => {
                "Set GPM_USER and GPM_PASS (or GPM_CONFIG_PATH) and check the other GPM_* variables"
            }
            ErrorCategory::Internal => "Inspect the logs for details",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
