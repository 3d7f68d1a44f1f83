//! Shared configuration for drillscope.
//!
//! TOML profiles and hierarchy definitions, credential resolution
//! (env + keyring + plaintext), and translation to `drillscope_api`
//! transport/hierarchy types and `drillscope_core::DrillConfig`. The CLI
//! adds flag-aware wrappers on top.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use drillscope_api::{HierarchySpec, LevelSpec, TlsMode, TransportConfig};
use drillscope_core::DrillConfig;

/// Keyring service name; entries are keyed `{profile}/api-key`.
pub const KEYRING_SERVICE: &str = "drillscope";

/// Prefix for environment overrides (`DRILLSCOPE_DEFAULTS__TIMEOUT=60`).
pub const ENV_PREFIX: &str = "DRILLSCOPE_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("unknown hierarchy '{name}'")]
    UnknownHierarchy { name: String, available: Vec<String> },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Named drill-down hierarchies.
    #[serde(default)]
    pub hierarchies: HashMap<String, Hierarchy>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
            hierarchies: HashMap::new(),
        }
    }
}

impl Config {
    /// Hierarchy names in sorted order.
    pub fn hierarchy_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.hierarchies.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn hierarchy(&self, name: &str) -> Result<&Hierarchy, ConfigError> {
        self.hierarchies
            .get(name)
            .ok_or_else(|| ConfigError::UnknownHierarchy {
                name: name.into(),
                available: self.hierarchy_names(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend project URL (e.g., "https://abc.example.co").
    pub url: String,

    /// API key (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// A drill-down hierarchy: one RPC level per depth.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Hierarchy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Upper bound on a single level fetch, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout: Option<u64>,

    #[serde(default)]
    pub levels: Vec<LevelSpec>,
}

impl Hierarchy {
    /// Engine config for this hierarchy: the last level is terminal.
    pub fn drill_config(&self) -> DrillConfig {
        DrillConfig {
            max_depth: self.levels.len().checked_sub(1),
            fetch_timeout: self.fetch_timeout.map(Duration::from_secs),
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "drillscope", "drillscope").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("drillscope");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from `path` + environment. A missing file
/// yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve an API key from the credential chain (no CLI flag step).
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(ref env_name) = profile.api_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if let Ok(entry) = keyring_entry(profile_name) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store an API key in the system keyring for `profile_name`.
pub fn store_api_key(profile_name: &str, key: &SecretString) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(key.expose_secret())
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

// ── Translation ─────────────────────────────────────────────────────

/// Parse and validate the profile's backend URL.
pub fn profile_url(profile: &Profile) -> Result<url::Url, ConfigError> {
    let url: url::Url = profile.url.parse().map_err(|_| ConfigError::Validation {
        field: "url".into(),
        reason: format!("invalid URL: {}", profile.url),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "url".into(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

/// Build a `TransportConfig` from a profile plus global defaults.
///
/// Hosted backends carry publicly trusted certificates, so the system
/// store is the default; `insecure` and `ca_cert` override it.
pub fn profile_to_transport(profile: &Profile, defaults: &Defaults) -> TransportConfig {
    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsMode::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsMode::CustomCa(ca_path.clone())
    } else {
        TlsMode::System
    };

    TransportConfig {
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    }
}

/// Look up a hierarchy by name and turn it into a validated spec.
pub fn hierarchy_spec(config: &Config, name: &str) -> Result<HierarchySpec, ConfigError> {
    let hierarchy = config.hierarchy(name)?;
    let spec = HierarchySpec {
        name: name.into(),
        description: hierarchy.description.clone(),
        levels: hierarchy.levels.clone(),
    };
    spec.validate().map_err(|e| ConfigError::Validation {
        field: format!("hierarchies.{name}"),
        reason: e.to_string(),
    })?;
    Ok(spec)
}
