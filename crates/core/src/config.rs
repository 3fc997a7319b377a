//! Process-level proxy configuration, fixed for the lifetime of a dispatcher.

use std::path::{Path, PathBuf};

use crate::error::UpstreamError;

/// Which side of the contract the proxy sits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProxyMode {
    /// Consumer side: upstream JSON responses are encoded to binary.
    #[default]
    Recording,
    /// Provider side: binary request bodies are decoded to JSON.
    Verification,
}

impl std::fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyMode::Recording => write!(f, "recording"),
            ProxyMode::Verification => write!(f, "verification"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    pub mode: ProxyMode,
    /// Directory assembled contracts are written to.
    pub pact_dir: PathBuf,
    pub cache_schemas: bool,
    upstream_url: String,
}

impl ProxyConfig {
    /// Recording mode against `upstream_url`, writing contracts to the
    /// current directory.
    ///
    /// The URL must be absolute `http` or `https`. A trailing slash is
    /// dropped so request paths can be appended directly.
    pub fn new(upstream_url: &str) -> Result<Self, UpstreamError> {
        let invalid = |message: &str| UpstreamError::InvalidUrl {
            url: upstream_url.to_string(),
            message: message.to_string(),
        };

        let uri: http::Uri = upstream_url
            .parse()
            .map_err(|e: http::uri::InvalidUri| invalid(&e.to_string()))?;
        match uri.scheme_str() {
            Some("http") | Some("https") => {}
            _ => return Err(invalid("scheme must be http or https")),
        }
        if uri.authority().is_none() {
            return Err(invalid("missing host"));
        }
        if uri.query().is_some() {
            return Err(invalid("must not carry a query string"));
        }

        Ok(ProxyConfig {
            mode: ProxyMode::Recording,
            pact_dir: PathBuf::from("."),
            cache_schemas: false,
            upstream_url: upstream_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn with_mode(mut self, mode: ProxyMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_pact_dir(mut self, pact_dir: impl AsRef<Path>) -> Self {
        self.pact_dir = pact_dir.as_ref().to_path_buf();
        self
    }

    pub fn with_schema_cache(mut self, enabled: bool) -> Self {
        self.cache_schemas = enabled;
        self
    }

    /// Absolute upstream URL for a normalized `path` and raw `query`.
    pub fn upstream_uri(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}{}", self.upstream_url, path)
        } else {
            format!("{}{}?{}", self.upstream_url, path, query)
        }
    }
}
