//! Config subcommand handlers.

use std::fmt::Write as _;

use dialoguer::{Input, Select};
use secrecy::{ExposeSecret, SecretString};

use drillscope_config::{Config, Profile, save_config_to, store_api_key};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

const MASK: &str = "****";

// ── Helpers ─────────────────────────────────────────────────────────

/// Copy of `cfg` safe to print: plaintext keys are masked.
fn redacted(cfg: &Config) -> Config {
    let mut cfg = cfg.clone();
    for profile in cfg.profiles.values_mut() {
        if profile.api_key.is_some() {
            profile.api_key = Some(MASK.into());
        }
    }
    cfg
}

/// TOML-like rendering for `config show`. Expects a redacted config.
fn format_config(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "color = \"{}\"", cfg.defaults.color);
    let _ = writeln!(out, "insecure = {}", cfg.defaults.insecure);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "url = \"{}\"", p.url);
        if let Some(ref key) = p.api_key {
            let _ = writeln!(out, "api_key = \"{key}\"");
        }
        if let Some(ref env) = p.api_key_env {
            let _ = writeln!(out, "api_key_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
    }

    for name in cfg.hierarchy_names() {
        let h = &cfg.hierarchies[&name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[hierarchies.{name}]");
        if let Some(ref description) = h.description {
            let _ = writeln!(out, "description = \"{description}\"");
        }
        if let Some(timeout) = h.fetch_timeout {
            let _ = writeln!(out, "fetch_timeout = {timeout}");
        }
        for (depth, level) in h.levels.iter().enumerate() {
            let _ = writeln!(out, "# level {depth}: {}({})", level.function, level.key_field);
        }
    }

    out
}

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_api_key() -> Result<SecretString, CliError> {
    let key = rpassword::prompt_password("API key: ").map_err(prompt_err)?;
    if key.trim().is_empty() {
        return Err(CliError::Validation {
            field: "api_key".into(),
            reason: "API key cannot be empty".into(),
        });
    }
    Ok(SecretString::from(key))
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            if !output::is_interactive() {
                return Err(CliError::NotInteractive {
                    command: "config init".into(),
                });
            }

            let path = config::config_file(global);
            eprintln!("drillscope configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let mut cfg = config::load(global)?;

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let url: String = Input::new()
                .with_prompt("Backend URL")
                .interact_text()
                .map_err(prompt_err)?;
            let mut profile = Profile {
                url,
                ..Profile::default()
            };
            drillscope_config::profile_url(&profile)?;

            let key = prompt_api_key()?;

            let choices = &[
                "Store in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let storage = Select::new()
                .with_prompt("Where to store the API key?")
                .items(choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            if storage == 0 {
                store_api_key(&profile_name, &key)?;
                eprintln!("   ✓ API key stored in system keyring");
            } else {
                profile.api_key = Some(key.expose_secret().to_owned());
            }

            cfg.profiles.insert(profile_name.clone(), profile);
            cfg.default_profile = Some(profile_name.clone());
            save_config_to(&cfg, &path)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Active profile: {profile_name}");
            if cfg.hierarchies.is_empty() {
                eprintln!("\n  Next: add a [hierarchies.<name>] table, then run drillscope hierarchies");
            }
            Ok(())
        }

        // ── Show ────────────────────────────────────────────────────
        ConfigCommand::Show => {
            let cfg = redacted(&config::load(global)?);
            let out = output::render_single(global.output, &cfg, format_config, |_| {
                config::config_file(global).display().to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        // ── Path ────────────────────────────────────────────────────
        ConfigCommand::Path => {
            println!("{}", config::config_file(global).display());
            Ok(())
        }

        // ── SetKey ──────────────────────────────────────────────────
        ConfigCommand::SetKey { profile } => {
            let cfg = config::load(global)?;
            let profile_name = profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            if !cfg.profiles.contains_key(&profile_name) {
                let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
                available.sort();
                return Err(CliError::Validation {
                    field: "profile".into(),
                    reason: format!(
                        "'{profile_name}' not found (available: {})",
                        if available.is_empty() {
                            "(none)".into()
                        } else {
                            available.join(", ")
                        }
                    ),
                });
            }

            let key = prompt_api_key()?;
            store_api_key(&profile_name, &key)?;
            eprintln!("✓ API key stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use drillscope_api::LevelSpec;
    use drillscope_config::Hierarchy;

    use super::*;

    fn sample() -> Config {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                url: "https://abc.example.co".into(),
                api_key: Some("secret-key".into()),
                ..Profile::default()
            },
        );
        cfg.hierarchies.insert(
            "regional".into(),
            Hierarchy {
                description: Some("Region to team".into()),
                fetch_timeout: Some(10),
                levels: vec![LevelSpec::new("sales_by_region", "region_id")],
            },
        );
        cfg
    }

    #[test]
    fn show_masks_plaintext_keys() {
        let shown = format_config(&redacted(&sample()));
        assert!(shown.contains("[profiles.prod]"));
        assert!(shown.contains("api_key = \"****\""));
        assert!(!shown.contains("secret-key"));
        assert!(shown.contains("# level 0: sales_by_region(region_id)"));
    }
}
