use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout_engine::winprop::Winprop;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid winprop for class {wm_class:?}: {reason}")]
    InvalidWinprop { wm_class: String, reason: String },
    #[error("invalid scenario: {0}")]
    Scenario(#[from] ron::error::SpannedError),
}

pub fn config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strip-wm")
        .join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub settings: Settings,
    pub winprops: Vec<WinpropRule>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub window_gap: f64,
    pub horizontal_margin: f64,
    pub vertical_margin: f64,
    /// Columns overlapping the viewport by less than this are stacked at
    /// the edge rather than revealed.
    pub stack_margin: f64,
    /// Sliver left visible when a column would land exactly on an edge.
    pub minimum_margin: f64,
    /// Columns wider than this share of the viewport are centered.
    pub wide_column_ratio: f64,
    pub animation_ms: u64,
    pub workspaces_only_on_primary: bool,
    pub workspace_colors: Vec<String>,
    pub cycle_width_ratios: Vec<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_gap: 20.0,
            horizontal_margin: 20.0,
            vertical_margin: 3.0,
            stack_margin: 75.0,
            minimum_margin: 15.0,
            wide_column_ratio: 0.9,
            animation_ms: 250,
            workspaces_only_on_primary: false,
            workspace_colors: [
                "#314E6C", "#565248", "#445632", "#663822", "#494066", "#826647", "#4B6983",
                "#807D74", "#5D7555", "#884631", "#625B81", "#B39169", "#7590AE", "#BAB5AB",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            cycle_width_ratios: vec![0.38195, 0.5, 0.61804],
        }
    }
}

impl Settings {
    pub fn animation_duration(&self) -> Duration { Duration::from_millis(self.animation_ms) }

    pub fn workspace_color(&self, index: usize) -> Option<&str> {
        if self.workspace_colors.is_empty() {
            return None;
        }
        Some(&self.workspace_colors[index % self.workspace_colors.len()])
    }
}

/// A window-matching rule as written in the config file.
///
/// `title` matches exactly, unless wrapped in slashes (`/^Scratch/`), in
/// which case it is a regular expression.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WinpropRule {
    pub wm_class: String,
    pub title: Option<String>,
    pub scratch_layer: bool,
    pub oneshot: bool,
}

impl Config {
    pub fn read(path: &Path) -> Result<Config, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Io { path: path.to_owned(), source });
            }
        };
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.compiled_winprops()?;
        Ok(config)
    }

    pub fn compiled_winprops(&self) -> Result<Vec<Winprop>, ConfigError> {
        self.winprops.iter().map(Winprop::compile).collect()
    }
}
