use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_CONFIG_NAME: &str = "notesync.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Editor configuration file format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Debounce ticks between the last edit and its flush
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,

    /// Period of one debounce tick
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,

    /// Prefix the surface uses when rendering an image reference
    #[serde(default = "default_image_base_path")]
    pub image_base_path: String,

    /// Content of a freshly created note
    #[serde(default = "default_new_note_text")]
    pub new_note_text: String,
}

fn default_max_ticks() -> u32 {
    2
}

fn default_tick_period_ms() -> u64 {
    1000
}

fn default_image_base_path() -> String {
    "images/".to_string()
}

fn default_new_note_text() -> String {
    "New note...".to_string()
}

impl EditorConfig {
    /// Load config from a directory, falling back to defaults when absent
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let config_path = dir.join(DEFAULT_CONFIG_NAME);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }

    /// Rendered reference for a stored image
    pub fn image_src(&self, image_ref: &str) -> String {
        format!("{}{}", self.image_base_path, image_ref)
    }

    /// Stored image name recovered from a rendered reference
    pub fn image_ref<'a>(&self, src: &'a str) -> &'a str {
        src.strip_prefix(self.image_base_path.as_str()).unwrap_or(src)
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_ticks: default_max_ticks(),
            tick_period_ms: default_tick_period_ms(),
            image_base_path: default_image_base_path(),
            new_note_text: default_new_note_text(),
        }
    }
}
