//! Shared configuration for ctrlmap.
//!
//! TOML config (default inventory file, output defaults, consistency
//! policy) layered with `CTRLMAP_` environment variables, and the
//! translation into `ctrlmap_core::Policy`.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ctrlmap_core::{DeletePolicy, GroupNameScope, GroupReassignment, Policy};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

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
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Declaration file loaded when `--inventory` is not given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,

    /// Output defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Consistency rules handed to the engine.
    #[serde(default)]
    pub policy: PolicyConfig,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}

/// The `[policy]` table. Values are kebab-case names.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyConfig {
    /// `global` or `per-controller`.
    #[serde(default = "default_group_name_scope")]
    pub group_name_scope: String,

    /// Groups left under a deleted controller: `restrict` or `cascade`.
    #[serde(default = "default_restrict")]
    pub controller_delete: String,

    /// `never` or `when-empty`.
    #[serde(default = "default_group_reassignment")]
    pub group_reassignment: String,

    /// Controllers deployed on a deleted device: `set-null` or `restrict`.
    #[serde(default = "default_set_null")]
    pub device_delete: String,

    /// Members and deployments of a deleted redundancy group:
    /// `set-null` or `restrict`.
    #[serde(default = "default_set_null")]
    pub redundancy_group_delete: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            group_name_scope: default_group_name_scope(),
            controller_delete: default_restrict(),
            group_reassignment: default_group_reassignment(),
            device_delete: default_set_null(),
            redundancy_group_delete: default_set_null(),
        }
    }
}

fn default_group_name_scope() -> String {
    GroupNameScope::Global.to_string()
}
fn default_restrict() -> String {
    DeletePolicy::Restrict.to_string()
}
fn default_set_null() -> String {
    DeletePolicy::SetNull.to_string()
}
fn default_group_reassignment() -> String {
    GroupReassignment::WhenEmpty.to_string()
}

impl Config {
    /// Engine policy described by the `[policy]` table.
    pub fn policy(&self) -> Result<Policy, ConfigError> {
        to_policy(&self.policy)
    }
}

// ── Policy translation ──────────────────────────────────────────────

/// Translate the `[policy]` table into an engine `Policy`.
pub fn to_policy(cfg: &PolicyConfig) -> Result<Policy, ConfigError> {
    let mut policy = Policy {
        group_name_scope: parse("group_name_scope", &cfg.group_name_scope, &["global", "per-controller"])?,
        group_reassignment: parse("group_reassignment", &cfg.group_reassignment, &["never", "when-empty"])?,
        ..Policy::default()
    };

    let refs = &mut policy.references;
    refs.controller_groups = parse("controller_delete", &cfg.controller_delete, &["restrict", "cascade"])?;
    refs.device_deployments = parse("device_delete", &cfg.device_delete, &["set-null", "restrict"])?;
    let redundancy = parse(
        "redundancy_group_delete",
        &cfg.redundancy_group_delete,
        &["set-null", "restrict"],
    )?;
    refs.redundancy_members = redundancy;
    refs.redundancy_deployments = redundancy;

    policy.validate().map_err(|err| ConfigError::Validation {
        field: "policy".into(),
        reason: err.to_string(),
    })?;
    Ok(policy)
}

fn parse<T: FromStr>(field: &str, value: &str, allowed: &[&str]) -> Result<T, ConfigError> {
    let invalid = || ConfigError::Validation {
        field: field.into(),
        reason: format!("expected one of {}, got '{value}'", quoted(allowed)),
    };
    if !allowed.contains(&value) {
        return Err(invalid());
    }
    value.parse().map_err(|_| invalid())
}

fn quoted(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("'{v}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("io", "ctrlmap", "ctrlmap").map_or_else(
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
    p.push("ctrlmap");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file + environment.
///
/// Nested keys use a double underscore in the environment, e.g.
/// `CTRLMAP_POLICY__GROUP_NAME_SCOPE=per-controller`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CTRLMAP_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or broken.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_policy_table_matches_engine_default() {
        let policy = to_policy(&PolicyConfig::default()).unwrap();
        assert_eq!(policy, Policy::default());
    }

    #[test]
    fn policy_table_maps_onto_references() {
        let cfg = PolicyConfig {
            group_name_scope: "per-controller".into(),
            controller_delete: "cascade".into(),
            group_reassignment: "never".into(),
            device_delete: "restrict".into(),
            redundancy_group_delete: "restrict".into(),
        };
        let policy = to_policy(&cfg).unwrap();
        assert_eq!(policy.group_name_scope, GroupNameScope::PerController);
        assert_eq!(policy.group_reassignment, GroupReassignment::Never);
        assert_eq!(policy.references.controller_groups, DeletePolicy::Cascade);
        assert_eq!(policy.references.device_deployments, DeletePolicy::Restrict);
        assert_eq!(policy.references.redundancy_members, DeletePolicy::Restrict);
        assert_eq!(policy.references.redundancy_deployments, DeletePolicy::Restrict);
    }

    #[test]
    fn unknown_values_are_validation_errors() {
        let cfg = PolicyConfig {
            controller_delete: "set-null".into(),
            ..PolicyConfig::default()
        };
        let err = to_policy(&cfg).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid controller_delete: expected one of 'restrict', 'cascade', got 'set-null'"
        );
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
inventory = "/srv/inventory.yaml"

[defaults]
output = "json"

[policy]
group_name_scope = "per-controller"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.inventory, Some(PathBuf::from("/srv/inventory.yaml")));
        assert_eq!(cfg.defaults.output, "json");
        assert_eq!(cfg.defaults.color, "auto");
        assert_eq!(cfg.policy().unwrap().group_name_scope, GroupNameScope::PerController);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg.defaults.output, "table");
        assert_eq!(cfg.policy().unwrap(), Policy::default());
    }

    #[test]
    fn save_then_load_keeps_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.policy.device_delete = "restrict".into();
        save_config_to(&cfg, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.policy.device_delete, "restrict");
    }
}
