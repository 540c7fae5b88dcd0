//! Configuration for the mock server.
//!
//! Defines the stub list and the CORS / listener settings loaded from the
//! JSON configuration artifact.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Port used when the configuration leaves `port` empty.
pub const DEFAULT_PORT: u16 = 5000;

/// Failures while loading or interpreting the configuration artifact.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("cannot read configuration: {0}")]
    Unreadable(#[source] std::io::Error),

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid listen port {0:?}")]
    InvalidPort(String),

    #[error("stub {index}: {reason}")]
    InvalidStub { index: usize, reason: String },
}

/// Main configuration, reloaded from disk on every dispatch.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub version: String,

    /// Listen port as a string; empty means [`DEFAULT_PORT`].
    #[serde(default)]
    pub port: String,

    /// Value advertised in `Access-Control-Allow-Headers` on preflight.
    #[serde(default)]
    pub allowed_headers: String,

    /// Value set as `Access-Control-Allow-Origin` on every response.
    #[serde(default)]
    pub allowed_origins: String,

    /// Value advertised in `Access-Control-Allow-Methods` on preflight.
    #[serde(default)]
    pub allowed_methods: String,

    /// Stub list; declaration order is matching order.
    #[serde(default)]
    pub stubs: Vec<Stub>,
}

impl Config {
    /// Load the configuration artifact from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Unreadable(err)
            }
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// The port to listen on: empty means [`DEFAULT_PORT`], anything else
    /// must parse as a port number.
    pub fn effective_port(&self) -> Result<u16, ConfigError> {
        let raw = self.port.trim();
        if raw.is_empty() {
            return Ok(DEFAULT_PORT);
        }
        raw.parse()
            .map_err(|_| ConfigError::InvalidPort(self.port.clone()))
    }

    /// Validate the stub definitions. Loading stays lenient so legacy
    /// artifacts keep working; this runs only on explicit request.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (index, stub) in self.stubs.iter().enumerate() {
            stub.validate()
                .map_err(|reason| ConfigError::InvalidStub { index, reason })?;
        }
        Ok(())
    }
}

/// A single stub: a request matcher paired with a response directive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stub {
    pub request: StubRequest,
    #[serde(default)]
    pub response: StubResponse,
}

impl Stub {
    fn validate(&self) -> Result<(), String> {
        if self.request.path.is_empty() {
            return Err("request url cannot be empty".to_string());
        }
        if !self.request.path.starts_with('/') {
            return Err(format!(
                "request url {:?} must begin with '/'",
                self.request.path
            ));
        }
        if self.request.method.is_empty() {
            return Err("request method cannot be empty".to_string());
        }
        Ok(())
    }
}

/// What an incoming request must look like to match a stub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StubRequest {
    /// Exact request path to match. The legacy artifact calls this `url`.
    #[serde(rename = "url")]
    pub path: String,

    /// Exact HTTP method to match.
    #[serde(default)]
    pub method: String,

    /// File (relative to the static root) holding the JSON object the
    /// request body must deep-equal. Empty means any body matches.
    #[serde(rename = "body", default)]
    pub expected_body: Option<String>,
}

impl StubRequest {
    /// The expected-body file reference, if one is configured. An empty
    /// string behaves like no constraint, as in the legacy artifact.
    pub fn expected_body_ref(&self) -> Option<&str> {
        self.expected_body.as_deref().filter(|name| !name.is_empty())
    }
}

/// Response directives applied around static file serving.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StubResponse {
    /// Status code override. Zero means unset; the response goes out as 200.
    #[serde(default)]
    pub status: u16,

    /// Content type appended to the response alongside the detected one.
    #[serde(rename = "content-type", default)]
    pub content_type: Option<String>,

    /// Static asset served instead of the raw request path.
    #[serde(rename = "content", default)]
    pub asset_path: Option<String>,
}

impl StubResponse {
    /// The status the response is served with.
    pub fn effective_status(&self) -> u16 {
        if self.status != 0 {
            self.status
        } else {
            200
        }
    }

    pub fn content_type_override(&self) -> Option<&str> {
        self.content_type.as_deref().filter(|value| !value.is_empty())
    }

    pub fn asset_path_override(&self) -> Option<&str> {
        self.asset_path.as_deref().filter(|path| !path.is_empty())
    }
}
