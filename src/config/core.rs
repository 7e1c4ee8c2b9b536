use anyhow::{Context, Result};
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
};

use super::DnacompConfig;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Repository-level config file names, lowest priority first
const REPO_CONFIG_FILES: [&str; 4] = ["dnacomp.toml", "dnacomp.json", "dnacomp.yaml", "dnacomp.yml"];

impl DnacompConfig {
    /// Load configuration, optionally from a specific file and with overrides.
    ///
    /// `overrides` is merged last; `null` entries are dropped so that unset
    /// CLI flags leave the lower layers alone.
    pub fn load(custom_config: Option<&str>, overrides: Option<serde_json::Value>) -> Result<Self> {
        let mut figment = Self::figment(custom_config);

        if let Some(mut overrides) = overrides {
            prune_nulls(&mut overrides);
            figment = figment.merge(Serialized::defaults(overrides));
        }

        figment.extract().context("Failed to load configuration")
    }

    /// The layered providers without CLI overrides
    pub fn figment(custom_config: Option<&str>) -> Figment {
        let mut figment = Figment::new().merge(Toml::string(DEFAULT_CONFIG)); // Embedded defaults

        // If custom config is specified, use only that + defaults + env vars
        if let Some(custom_path) = custom_config {
            figment = if custom_path.ends_with(".json") {
                figment.merge(Json::file(custom_path))
            } else if custom_path.ends_with(".yaml") || custom_path.ends_with(".yml") {
                figment.merge(Yaml::file(custom_path))
            } else {
                figment.merge(Toml::file(custom_path))
            };
        } else {
            let user_config = Self::user_config_path();
            figment = figment
                .merge(Toml::file(&user_config))
                .merge(Json::file(user_config.replace(".toml", ".json")))
                .merge(Yaml::file(user_config.replace(".toml", ".yaml")))
                .merge(Yaml::file(user_config.replace(".toml", ".yml")));

            for file in REPO_CONFIG_FILES {
                figment = match file.rsplit('.').next() {
                    Some("json") => figment.merge(Json::file(file)),
                    Some("yaml" | "yml") => figment.merge(Yaml::file(file)),
                    _ => figment.merge(Toml::file(file)),
                };
            }
        }

        // Environment variables always beat config files
        figment.merge(Env::prefixed("DNACOMP_").split("__"))
    }

    fn user_config_path() -> String {
        match std::env::var("HOME") {
            Ok(home) => format!("{}/.config/dnacomp/config.toml", home),
            Err(_) => "~/.config/dnacomp/config.toml".to_string(),
        }
    }
}

/// Remove `null` members recursively
fn prune_nulls(value: &mut serde_json::Value) {
    if let serde_json::Value::Object(map) = value {
        map.retain(|_, v| !v.is_null());
        for v in map.values_mut() {
            prune_nulls(v);
        }
        map.retain(|_, v| !matches!(v, serde_json::Value::Object(m) if m.is_empty()));
    }
}
