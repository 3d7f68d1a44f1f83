use thiserror::Error;

/// Top-level error type for the `drillscope-api` crate.
///
/// Covers authentication, transport, backend RPC errors, and payloads
/// that do not fit the row contract. The fetcher flattens these into a
/// `FetchError` message recorded on the node being expanded.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The backend rejected the API key (HTTP 401/403).
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── RPC ─────────────────────────────────────────────────────────
    /// Structured error returned by a stored procedure
    /// (`{message, code, details, hint}`).
    #[error("RPC error (HTTP {status}): {message}")]
    Rpc {
        message: String,
        code: Option<String>,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body is not a JSON array of objects, with the raw body
    /// for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A hierarchy definition is unusable.
    #[error("Invalid hierarchy '{name}': {message}")]
    Hierarchy { name: String, message: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Rpc { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the RPC function does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            Self::Rpc { status: 404, .. } => true,
            _ => false,
        }
    }

    /// Extract the backend error code (e.g. a SQLSTATE), if available.
    pub fn api_error_code(&self) -> Option<&str> {
        match self {
            Self::Rpc { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}
