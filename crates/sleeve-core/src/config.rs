use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub graph: GraphConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Label names used to resolve an event's causal id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "default_change_id")]
    pub change_id: String,
    /// Root tracing labels, tried in order when `change_id` is absent.
    #[serde(default = "default_root_ids")]
    pub root_ids: Vec<String>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            change_id: default_change_id(),
            root_ids: default_root_ids(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_kind_marker")]
    pub kind_marker: String,
    #[serde(default = "default_status_prefix")]
    pub status_prefix: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            kind_marker: default_kind_marker(),
            status_prefix: default_status_prefix(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_saturation")]
    pub saturation: f64,
    #[serde(default = "default_value")]
    pub value: f64,
    /// Node labels keep the part of an id before this character.
    #[serde(default = "default_short_separator")]
    pub short_separator: char,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            saturation: default_saturation(),
            value: default_value(),
            short_separator: default_short_separator(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractConfig {
    #[serde(default = "default_keyword")]
    pub keyword: String,
    #[serde(default = "default_event_log_type")]
    pub event_log_type: String,
    #[serde(default = "default_version_log_type")]
    pub version_log_type: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            keyword: default_keyword(),
            event_log_type: default_event_log_type(),
            version_log_type: default_version_log_type(),
        }
    }
}

fn default_change_id() -> String {
    "change-id".to_string()
}

fn default_root_ids() -> Vec<String> {
    vec!["root-event-id".to_string(), "tracey-uid".to_string()]
}

fn default_kind_marker() -> String {
    "Kind=".to_string()
}

fn default_status_prefix() -> String {
    "status.".to_string()
}

const fn default_saturation() -> f64 {
    0.4
}

const fn default_value() -> f64 {
    1.0
}

const fn default_short_separator() -> char {
    '-'
}

fn default_keyword() -> String {
    "sleeveless".to_string()
}

fn default_event_log_type() -> String {
    "sleeve:controller-operation".to_string()
}

fn default_version_log_type() -> String {
    "sleeve:object-version".to_string()
}

/// Path of the project-local config file under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".sleeve/config.toml")
}

/// Path of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sleeve/config.toml"))
}

/// Parse a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for
/// [`Config`].
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Resolve the effective config.
///
/// Precedence (first hit wins, files are not merged):
/// 1. `explicit` path (must exist)
/// 2. `<project_root>/.sleeve/config.toml`
/// 3. `<config_dir>/sleeve/config.toml`
/// 4. built-in defaults
///
/// # Errors
///
/// Returns an error if the chosen file is missing (explicit path only),
/// unreadable or invalid.
pub fn resolve_config(project_root: &Path, explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }

    let project = project_config_path(project_root);
    if project.exists() {
        return load_config_file(&project);
    }

    match user_config_path() {
        Some(path) if path.exists() => load_config_file(&path),
        _ => Ok(Config::default()),
    }
}
