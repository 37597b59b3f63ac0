// src/error.rs
//! Typed failures at the library seams. Glue code wraps these in `anyhow`.

use thiserror::Error;

/// Failures reported by a [`crate::upstream::StoryClient`].
#[derive(Debug, Clone, Error)]
pub enum UpstreamError {
    /// Login, session restore or a later request was rejected. Fatal.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// Rate limit or server-side failure. The current tick stops ingesting.
    #[error("upstream overloaded (status {status})")]
    Overloaded { status: u16 },

    /// Anything else that only affects one request.
    #[error("upstream request failed: {0}")]
    Transient(String),

    /// The response arrived but could not be decoded.
    #[error("upstream response could not be decoded: {0}")]
    Decode(String),
}

impl UpstreamError {
    pub fn is_overload(&self) -> bool {
        matches!(self, UpstreamError::Overloaded { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, UpstreamError::Auth(_))
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return classify_status(status.as_u16(), &e.to_string());
        }
        if e.is_decode() {
            UpstreamError::Decode(e.to_string())
        } else {
            UpstreamError::Transient(e.to_string())
        }
    }
}

/// Map a non-success HTTP status onto the error taxonomy.
pub fn classify_status(status: u16, detail: &str) -> UpstreamError {
    match status {
        401 | 403 => UpstreamError::Auth(format!("status {status}: {detail}")),
        429 | 500..=599 => UpstreamError::Overloaded { status },
        _ => UpstreamError::Transient(format!("status {status}: {detail}")),
    }
}

/// Failures touching the Media Store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("refusing unsafe media name {0:?}")]
    InvalidName(String),

    #[error("container could not be unpacked: {0}")]
    Container(String),
}

impl StoreError {
    pub(crate) fn io(op: &'static str, path: &std::path::Path, source: std::io::Error) -> Self {
        StoreError::Io {
            op,
            path: path.display().to_string(),
            source,
        }
    }
}

/// Invalid startup configuration. The binary exits with code 1.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("no such directory: {0}")]
    StorePath(String),
}
