use std::net::SocketAddr;

use url::Url;

use crate::config::models::ProxyConfig;

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Invalid listen address '{address}': {reason}")]
    InvalidListenAddress { address: String, reason: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Proxy configuration validator
pub struct ProxyConfigValidator;

impl ProxyConfigValidator {
    /// Validate the entire proxy configuration, reporting every problem at once
    pub fn validate(config: &ProxyConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_listen_address(&config.listen_addr) {
            errors.push(e);
        }

        if let Err(e) = Self::validate_upstream(&config.upstream) {
            errors.push(e);
        }

        if config.proto_files.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "proto_files".to_string(),
            });
        }

        if config.max_body_bytes == 0 {
            errors.push(ValidationError::InvalidField {
                field: "max_body_bytes".to_string(),
                message: "Must be greater than zero".to_string(),
            });
        }

        if let Err(e) = config.upstream_timeout() {
            errors.push(ValidationError::InvalidField {
                field: "upstream_timeout".to_string(),
                message: e.to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Validate listen address format
    fn validate_listen_address(address: &str) -> ValidationResult<()> {
        if address.parse::<SocketAddr>().is_err() {
            return Err(ValidationError::InvalidListenAddress {
                address: address.to_string(),
                reason: "Must be in format 'IP:PORT' (e.g., '127.0.0.1:7777' or '0.0.0.0:7777')"
                    .to_string(),
            });
        }
        Ok(())
    }

    fn validate_upstream(upstream: &str) -> ValidationResult<()> {
        if upstream.is_empty() {
            return Err(ValidationError::MissingField {
                field: "upstream".to_string(),
            });
        }

        let parsed = Url::parse(upstream).map_err(|e| ValidationError::InvalidField {
            field: "upstream".to_string(),
            message: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidField {
                field: "upstream".to_string(),
                message: "URL must start with http:// or https://".to_string(),
            });
        }
        if parsed.host_str().is_none() {
            return Err(ValidationError::InvalidField {
                field: "upstream".to_string(),
                message: "URL must include a host".to_string(),
            });
        }
        if parsed.query().is_some() {
            return Err(ValidationError::InvalidField {
                field: "upstream".to_string(),
                message: "URL must not carry a query string".to_string(),
            });
        }
        Ok(())
    }

    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .map(|e| format!("  - {e}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
