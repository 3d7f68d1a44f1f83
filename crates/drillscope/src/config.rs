//! CLI configuration: flag-aware wrappers over `drillscope_config`.
//!
//! Resolves the config file (`--config`), the active profile, and the
//! credential chain with CLI flags on top, then builds the node source
//! for a hierarchy.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use drillscope_api::{RpcClient, RpcFetcher, TlsMode, TransportConfig};
use drillscope_config::{
    Config, hierarchy_spec, load_config_from, profile_to_transport, profile_url, resolve_api_key,
};
use drillscope_core::DrillConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::source::{Fixture, HierarchySummary, Source};

/// Config file in effect: `--config` / `DRILLSCOPE_CONFIG`, else the
/// platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(drillscope_config::config_path)
}

/// Load the config file plus environment overrides. A missing file
/// yields the defaults; a malformed one is an error.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(load_config_from(&config_file(global))?)
}

/// `--profile`, then `default_profile`, then `"default"`.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build an `RpcClient` from the active profile with CLI overrides.
pub fn build_client(global: &GlobalOpts, cfg: &Config) -> Result<RpcClient, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let (url, key, transport) = if let Some(profile) = cfg.profiles.get(&profile_name) {
        let url = match global.url {
            Some(ref url) => url.clone(),
            None => profile_url(profile)?.to_string(),
        };
        let key = match global.api_key {
            Some(ref key) => SecretString::from(key.clone()),
            None => resolve_api_key(profile, &profile_name)?,
        };
        (url, key, apply_overrides(global, profile_to_transport(profile, &cfg.defaults)))
    } else {
        // No profile: the URL and key must come from flags / env.
        if let (Some(name), false) = (&global.profile, cfg.profiles.is_empty()) {
            let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
            available.sort();
            return Err(CliError::Validation {
                field: "profile".into(),
                reason: format!("'{name}' not found (available: {})", available.join(", ")),
            });
        }
        let url = global.url.clone().ok_or_else(|| CliError::NoConfig {
            path: config_file(global).display().to_string(),
        })?;
        let key = global
            .api_key
            .clone()
            .map(SecretString::from)
            .ok_or(CliError::NoCredentials {
                profile: profile_name,
            })?;
        let transport = TransportConfig {
            tls: TlsMode::System,
            timeout: Duration::from_secs(cfg.defaults.timeout),
        };
        (url, key, apply_overrides(global, transport))
    };

    tracing::debug!(%url, "building rpc client");
    Ok(RpcClient::from_api_key(&url, &key, &transport)?)
}

fn apply_overrides(global: &GlobalOpts, mut transport: TransportConfig) -> TransportConfig {
    if global.insecure {
        transport.tls = TlsMode::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        transport.timeout = Duration::from_secs(secs);
    }
    transport
}

/// Resolve the node source for `hierarchy`: the fixture when `--fixture`
/// is given, the configured RPC levels otherwise.
pub fn open_source(global: &GlobalOpts, hierarchy: &str) -> Result<(Source, DrillConfig), CliError> {
    if let Some(ref path) = global.fixture {
        return Fixture::load(path)?.open(hierarchy);
    }

    let cfg = load(global)?;
    let spec = hierarchy_spec(&cfg, hierarchy)?;
    let drill_config = cfg.hierarchy(hierarchy)?.drill_config();
    let client = build_client(global, &cfg)?;
    Ok((Source::Rpc(RpcFetcher::new(client, spec)?), drill_config))
}

/// Hierarchies available to the current invocation.
pub fn hierarchy_summaries(global: &GlobalOpts) -> Result<Vec<HierarchySummary>, CliError> {
    if let Some(ref path) = global.fixture {
        return Ok(Fixture::load(path)?.summaries());
    }

    let cfg = load(global)?;
    Ok(cfg
        .hierarchy_names()
        .into_iter()
        .filter_map(|name| {
            let h = cfg.hierarchies.get(&name)?;
            Some(HierarchySummary {
                levels: Some(h.levels.len()),
                description: h.description.clone(),
                functions: h.levels.iter().map(|l| l.function.clone()).collect(),
                name,
            })
        })
        .collect())
}
