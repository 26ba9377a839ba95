use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

pub const DEFAULT_COMMAND: &str = "midori";

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;

/// Runtime options recognised by the language service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub command: String,
    pub args: Vec<String>,
    pub run_on_type: bool,
    pub debounce_ms: u64,
    pub diagnostics_timeout_ms: u64,
    pub diagnostics_max_output_bytes: u64,
    pub diagnostics_max_count: usize,
    pub max_document_bytes: u64,
    pub max_workspace_files: usize,
    pub max_external_index_entries: usize,
    pub allow_external_imports: bool,
    pub fuzzy_keyword_suggestions: bool,
    pub fuzzy_max_edit_distance: usize,
    pub workspace_root: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command: DEFAULT_COMMAND.to_string(),
            args: Vec::new(),
            run_on_type: true,
            debounce_ms: 400,
            diagnostics_timeout_ms: 15_000,
            diagnostics_max_output_bytes: 512 * KIB,
            diagnostics_max_count: 200,
            max_document_bytes: MIB,
            max_workspace_files: 2_000,
            max_external_index_entries: 500,
            allow_external_imports: false,
            fuzzy_keyword_suggestions: true,
            fuzzy_max_edit_distance: 2,
            workspace_root: None,
        }
    }
}

pub type SharedSettings = Arc<RwLock<Settings>>;

pub fn shared(settings: Settings) -> SharedSettings {
    Arc::new(RwLock::new(settings))
}

/// Settings as they arrive from the editor or a settings file. Every field is
/// optional and numbers are accepted in any JSON form, then clamped.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawSettings {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub run_on_type: Option<bool>,
    pub debounce_ms: Option<f64>,
    pub diagnostics_timeout_ms: Option<f64>,
    pub diagnostics_max_output_bytes: Option<f64>,
    pub diagnostics_max_count: Option<f64>,
    pub max_document_bytes: Option<f64>,
    pub max_workspace_files: Option<f64>,
    pub max_external_index_entries: Option<f64>,
    pub allow_external_imports: Option<bool>,
    pub fuzzy_keyword_suggestions: Option<bool>,
    pub fuzzy_max_edit_distance: Option<f64>,
    pub workspace_root: Option<String>,
}

fn clamp(value: Option<f64>, default: u64, min: u64, max: u64) -> u64 {
    match value {
        Some(v) if v.is_nan() => default,
        Some(v) => v.round().clamp(min as f64, max as f64) as u64,
        None => default,
    }
}

impl RawSettings {
    /// Apply every present option on top of `base`
    pub fn apply_to(&self, base: &Settings) -> Settings {
        let command = self
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| base.command.clone());

        let workspace_root = match self.workspace_root.as_deref().map(str::trim) {
            Some("") => None,
            Some(root) if Path::new(root).is_absolute() => Some(PathBuf::from(root)),
            Some(root) => {
                warn!("[Config] ignoring relative workspaceRoot {:?}", root);
                base.workspace_root.clone()
            }
            None => base.workspace_root.clone(),
        };

        Settings {
            command,
            args: self.args.clone().unwrap_or_else(|| base.args.clone()),
            run_on_type: self.run_on_type.unwrap_or(base.run_on_type),
            debounce_ms: clamp(self.debounce_ms, base.debounce_ms, 50, 10_000),
            diagnostics_timeout_ms: clamp(
                self.diagnostics_timeout_ms,
                base.diagnostics_timeout_ms,
                2_000,
                120_000,
            ),
            diagnostics_max_output_bytes: clamp(
                self.diagnostics_max_output_bytes,
                base.diagnostics_max_output_bytes,
                64 * KIB,
                2 * MIB,
            ),
            diagnostics_max_count: clamp(
                self.diagnostics_max_count,
                base.diagnostics_max_count as u64,
                1,
                1_000,
            ) as usize,
            max_document_bytes: clamp(
                self.max_document_bytes,
                base.max_document_bytes,
                64 * KIB,
                5 * MIB,
            ),
            max_workspace_files: clamp(
                self.max_workspace_files,
                base.max_workspace_files as u64,
                100,
                15_000,
            ) as usize,
            max_external_index_entries: clamp(
                self.max_external_index_entries,
                base.max_external_index_entries as u64,
                100,
                5_000,
            ) as usize,
            allow_external_imports: self
                .allow_external_imports
                .unwrap_or(base.allow_external_imports),
            fuzzy_keyword_suggestions: self
                .fuzzy_keyword_suggestions
                .unwrap_or(base.fuzzy_keyword_suggestions),
            fuzzy_max_edit_distance: clamp(
                self.fuzzy_max_edit_distance,
                base.fuzzy_max_edit_distance as u64,
                1,
                2,
            ) as usize,
            workspace_root,
        }
    }
}

impl Settings {
    /// Parse editor-supplied JSON leniently; unknown keys are ignored
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let raw: RawSettings = serde_json::from_value(value.clone())?;
        Ok(raw.apply_to(&Settings::default()))
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Per-user settings file, e.g. `~/.config/midori-ide/settings.json`
pub fn default_settings_path() -> PathBuf {
    let Some(dirs) = ProjectDirs::from("dev", "midori", "midori-ide") else {
        return Path::new("midori-settings.json").to_path_buf();
    };
    dirs.config_dir().join("settings.json")
}

pub fn try_load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let bytes = fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: RawSettings = serde_json::from_slice(&bytes)?;
    Ok(raw.apply_to(&Settings::default()))
}

/// Load settings, falling back to defaults on any error
pub fn load_settings(path: &Path) -> Settings {
    match try_load_settings(path) {
        Ok(settings) => settings,
        Err(ConfigError::Read { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Settings::default()
        }
        Err(e) => {
            warn!("[Config] {}; using defaults", e);
            Settings::default()
        }
    }
}
