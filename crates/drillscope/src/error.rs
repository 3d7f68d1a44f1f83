//! CLI error types with miette diagnostics.
//!
//! Maps core, backend and config failures into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use drillscope_config::ConfigError;
use drillscope_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const FETCH: i32 = 9;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Backend ──────────────────────────────────────────────────────
    #[error("Could not reach the backend at {url}: {reason}")]
    #[diagnostic(
        code(drillscope::connection_failed),
        help(
            "Check the profile URL and your network connection.\n\
             Try: drillscope config show"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(drillscope::auth_failed),
        help(
            "Verify the API key of the active profile.\n\
             Run: drillscope config set-key"
        )
    )]
    AuthFailed { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(drillscope::no_credentials),
        help(
            "Configure credentials with: drillscope config init\n\
             Or set the DRILLSCOPE_API_KEY environment variable."
        )
    )]
    NoCredentials { profile: String },

    #[error("Loading children of '{path}' failed: {message}")]
    #[diagnostic(
        code(drillscope::fetch_failed),
        help("The rest of the tree is unaffected. Re-run the command to retry this level.")
    )]
    FetchFailed { path: String, message: String },

    // ── Navigation ───────────────────────────────────────────────────
    #[error("Node '{path}' not found in hierarchy '{hierarchy}'")]
    #[diagnostic(
        code(drillscope::node_not_found),
        help("Run: drillscope children {hierarchy} {parent} to see available keys")
    )]
    NodeNotFound {
        hierarchy: String,
        path: String,
        parent: String,
    },

    #[error("Hierarchy '{name}' not found")]
    #[diagnostic(
        code(drillscope::unknown_hierarchy),
        help("Available hierarchies: {available}\nRun: drillscope hierarchies")
    )]
    UnknownHierarchy { name: String, available: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(drillscope::validation))]
    Validation { field: String, reason: String },

    #[error("'{command}' needs an interactive terminal")]
    #[diagnostic(
        code(drillscope::not_interactive),
        help("Use `drillscope tree` or `drillscope children` in scripts.")
    )]
    NotInteractive { command: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No backend configured")]
    #[diagnostic(
        code(drillscope::no_config),
        help(
            "Create a profile with: drillscope config init\n\
             Expected at: {path}\n\
             Or pass --url and --api-key, or --fixture for offline data."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(drillscope::config))]
    Config(ConfigError),

    #[error("Internal error: {0}")]
    #[diagnostic(code(drillscope::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    #[diagnostic(code(drillscope::json), help("Check the fixture file contents and try again."))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NodeNotFound { .. } | Self::UnknownHierarchy { .. } => exit_code::NOT_FOUND,
            Self::FetchFailed { .. } => exit_code::FETCH,
            Self::Validation { .. } | Self::NotInteractive { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── Conversions ──────────────────────────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => Self::NoCredentials { profile },
            ConfigError::UnknownHierarchy { name, available } => Self::UnknownHierarchy {
                name,
                available: available_list(&available),
            },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

impl From<drillscope_api::Error> for CliError {
    fn from(err: drillscope_api::Error) -> Self {
        match err {
            drillscope_api::Error::Authentication { message } => Self::AuthFailed { message },
            drillscope_api::Error::InvalidUrl(e) => Self::Validation {
                field: "url".into(),
                reason: e.to_string(),
            },
            drillscope_api::Error::Hierarchy { name, message } => Self::Validation {
                field: format!("hierarchies.{name}"),
                reason: message,
            },
            drillscope_api::Error::Transport(e) => Self::ConnectionFailed {
                url: e.url().map_or_else(|| "(unknown)".into(), ToString::to_string),
                reason: e.to_string(),
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Core errors reaching the CLI are either misconfiguration or an
/// internal bug; unknown paths are mapped at the call site where the
/// hierarchy name is known.
impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config { message } => Self::Validation {
                field: "hierarchy".into(),
                reason: message,
            },
            CoreError::FetchFailed { path, cause } => Self::FetchFailed {
                path: display_path(&path.to_string()),
                message: cause.message,
            },
            CoreError::InvalidLevel { level, depth } => Self::Validation {
                field: "level".into(),
                reason: format!("{level} is deeper than the active path ({depth})"),
            },
            CoreError::PathNotFound { path } => Self::Internal(format!("path not found: {path}")),
        }
    }
}

/// `/` for the root, the slash path otherwise.
pub fn display_path(path: &str) -> String {
    if path.is_empty() { "/".into() } else { path.into() }
}

fn available_list(names: &[String]) -> String {
    if names.is_empty() {
        "(none)".into()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_hierarchy_lists_names() {
        let err = CliError::from(ConfigError::UnknownHierarchy {
            name: "x".into(),
            available: vec!["a".into(), "b".into()],
        });
        assert_eq!(err.exit_code(), exit_code::NOT_FOUND);
        assert!(matches!(err, CliError::UnknownHierarchy { ref available, .. } if available == "a, b"));
    }

    #[test]
    fn fetch_failures_have_their_own_code() {
        let err = CliError::FetchFailed {
            path: "/".into(),
            message: "boom".into(),
        };
        assert_eq!(err.exit_code(), exit_code::FETCH);
        assert_eq!(display_path(""), "/");
    }
}
