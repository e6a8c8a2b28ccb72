//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/bbstree/bbstree.toml`
//! 3. Local config: `<dir>/.bbstree.toml` (working directory by default)
//! 4. Environment variables: `BBSTREE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::services::BrowseOptions;
use crate::application::ApplicationError;

/// Tree browsing settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowseConfig {
    /// Depth requested from the remote source per population
    pub fetch_depth: u32,
    /// Levels expanded when rendering a tree
    pub max_expand_depth: usize,
    /// Append `[index]` to repeated remote nodes
    pub index_suffix: bool,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            fetch_depth: 1,
            max_expand_depth: 3,
            index_suffix: true,
        }
    }
}

/// Cascading edit settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CascadeConfig {
    /// Log a warning when a cascade leaves branches untouched
    pub warn_on_skip: bool,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self { warn_on_skip: true }
    }
}

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub data_dir: Option<PathBuf>,
    pub browse: RawBrowseConfig,
    pub cascade: RawCascadeConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawBrowseConfig {
    pub fetch_depth: Option<u32>,
    pub max_expand_depth: Option<usize>,
    pub index_suffix: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawCascadeConfig {
    pub warn_on_skip: Option<bool>,
}

/// Unified configuration for bbstree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Directory holding tree dumps (default: ~/.bbstree)
    pub data_dir: PathBuf,
    pub browse: BrowseConfig,
    pub cascade: CascadeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            browse: BrowseConfig::default(),
            cascade: CascadeConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".bbstree"))
        .unwrap_or_else(|| PathBuf::from("~/.bbstree"))
}

/// Get the XDG config directory for bbstree.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "bbstree").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("bbstree.toml"))
}

/// Get the path to the local config file in `dir`.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".bbstree.toml")
}

fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Default location of the remote tree dump.
    pub fn default_dump_path(&self) -> PathBuf {
        self.data_dir.join("otdb.toml")
    }

    pub fn browse_options(&self) -> BrowseOptions {
        BrowseOptions {
            max_depth: self.browse.max_expand_depth,
            fetch_depth: self.browse.fetch_depth,
            index_suffix: self.browse.index_suffix,
        }
    }

    /// Expand `~`, `$VAR` and `${VAR}` in path-like fields.
    fn expand_paths(&mut self) {
        let raw = self.data_dir.to_string_lossy().into_owned();
        if let Ok(expanded) = shellexpand::full(&raw) {
            self.data_dir = PathBuf::from(expanded.into_owned());
        }
    }

    /// Overlay wins for every field it specifies.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            data_dir: overlay
                .data_dir
                .clone()
                .unwrap_or_else(|| self.data_dir.clone()),
            browse: BrowseConfig {
                fetch_depth: overlay.browse.fetch_depth.unwrap_or(self.browse.fetch_depth),
                max_expand_depth: overlay
                    .browse
                    .max_expand_depth
                    .unwrap_or(self.browse.max_expand_depth),
                index_suffix: overlay
                    .browse
                    .index_suffix
                    .unwrap_or(self.browse.index_suffix),
            },
            cascade: CascadeConfig {
                warn_on_skip: overlay
                    .cascade
                    .warn_on_skip
                    .unwrap_or(self.cascade.warn_on_skip),
            },
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Directory searched for `.bbstree.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                current = current.merge_with(&load_raw_settings(&local_path)?);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();
        Ok(current)
    }

    /// Apply BBSTREE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("BBSTREE")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("data_dir") {
            settings.data_dir = PathBuf::from(val);
        }
        if let Ok(val) = config.get::<u32>("browse.fetch_depth") {
            settings.browse.fetch_depth = val;
        }
        if let Ok(val) = config.get::<usize>("browse.max_expand_depth") {
            settings.browse.max_expand_depth = val;
        }
        if let Ok(val) = config.get_bool("browse.index_suffix") {
            settings.browse.index_suffix = val;
        }
        if let Ok(val) = config.get_bool("cascade.warn_on_skip") {
            settings.cascade.warn_on_skip = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# bbstree configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/bbstree/bbstree.toml
#   Local:  ./.bbstree.toml
#   Env:    BBSTREE_* environment variables, e.g. BBSTREE_BROWSE__FETCH_DEPTH=2

# Directory holding tree dumps (otdb.toml is the default dump)
# data_dir = "~/.bbstree"

[browse]
# Depth requested from the tree database per expansion
# fetch_depth = 1

# Levels expanded when printing a tree
# max_expand_depth = 3

# Show instance indices of repeated nodes, e.g. Station[3]
# index_suffix = true

[cascade]
# Warn when an edit leaves parallel branches untouched
# warn_on_skip = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_no_config_when_loading_then_uses_defaults() {
        let settings = Settings::load(None).expect("load defaults");
        assert!(settings.data_dir.to_string_lossy().contains(".bbstree"));
        assert_eq!(settings.browse, BrowseConfig::default());
    }

    #[test]
    fn given_tilde_in_data_dir_when_expand_paths_then_expands_to_home() {
        let mut settings = Settings {
            data_dir: PathBuf::from("~/.bbstree"),
            ..Settings::default()
        };

        settings.expand_paths();

        let home = std::env::var("HOME").expect("HOME should be set");
        let dir = settings.data_dir.to_string_lossy();
        assert!(dir.starts_with(&home), "data_dir should start with home: {}", dir);
        assert!(!dir.contains('~'));
    }

    #[test]
    fn given_partial_overlay_when_merging_then_only_given_fields_change() {
        let base = Settings::default();
        let overlay = RawSettings {
            data_dir: None,
            browse: RawBrowseConfig {
                fetch_depth: Some(4),
                ..RawBrowseConfig::default()
            },
            cascade: RawCascadeConfig {
                warn_on_skip: Some(false),
            },
        };

        let merged = base.merge_with(&overlay);

        assert_eq!(merged.data_dir, base.data_dir);
        assert_eq!(merged.browse.fetch_depth, 4);
        assert_eq!(merged.browse.max_expand_depth, 3);
        assert!(!merged.cascade.warn_on_skip);
    }

    #[test]
    fn given_template_when_parsed_then_yields_empty_overlay() {
        let raw: RawSettings = toml::from_str(&Settings::template()).unwrap();
        assert!(raw.data_dir.is_none());
        assert!(raw.browse.fetch_depth.is_none());
    }
}
