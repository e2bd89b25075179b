//! Configuration data structures for protobridge.
//!
//! These types map directly to TOML (also JSON / YAML) configuration files. Every
//! field has a default so that a minimal config only names the upstream and the
//! schema files.
use std::{path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

/// Default request and response body limit (4 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// What to do with a request whose `Content-Type` names no message types at all
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyDirectivePolicy {
    /// Fail the request like any other negotiation error
    #[default]
    Reject,
    /// Forward request and response untouched
    PassThrough,
}

/// Logging output configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

/// Top level proxy configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct ProxyConfig {
    /// Address the proxy listens on
    pub listen_addr: String,
    /// Base URL of the single upstream every request is forwarded to
    pub upstream: String,
    /// `.proto` files to load, in lookup priority order
    pub proto_files: Vec<PathBuf>,
    /// Directories searched for imports declared in the proto files
    pub import_paths: Vec<PathBuf>,
    /// Maximum size of a buffered request or response body
    pub max_body_bytes: usize,
    /// Timeout for the upstream exchange, humantime format (e.g. "30s")
    pub upstream_timeout: String,
    pub empty_directive: EmptyDirectivePolicy,
    pub logging: LoggingConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:7777".to_string(),
            upstream: String::new(),
            proto_files: Vec::new(),
            import_paths: Vec::new(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            upstream_timeout: "30s".to_string(),
            empty_directive: EmptyDirectivePolicy::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// Parsed `upstream_timeout`
    pub fn upstream_timeout(&self) -> eyre::Result<Duration> {
        humantime::parse_duration(&self.upstream_timeout).map_err(|e| {
            eyre::eyre!(
                "Invalid upstream_timeout '{}': {}",
                self.upstream_timeout,
                e
            )
        })
    }

    /// Replace the port of `listen_addr`, keeping its host part
    pub fn set_port(&mut self, port: u16) {
        let host = self
            .listen_addr
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        self.listen_addr = format!("{host}:{port}");
    }
}
