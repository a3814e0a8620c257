//! Editor configuration.
//!
//! Tuning knobs for the annotation engine, serializable so the host can
//! persist and restore them as JSON.

use serde::{Deserialize, Serialize};

/// Current configuration file format version.
/// Increment this when making breaking changes to the config format.
pub const CONFIG_VERSION: u32 = 1;

/// Log level setting the host can persist alongside the editor config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Show only errors
    Error,
    /// Show errors and warnings
    Warn,
    /// Show errors, warnings, and info messages
    #[default]
    Info,
    /// Show debug-level logging
    Debug,
    /// Show all log messages including trace
    Trace,
}

impl LogLevel {
    /// Convert to log crate's LevelFilter.
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for the annotation editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    /// Version of the configuration format
    #[serde(default = "default_version")]
    pub version: u32,

    /// Minimum box width/height in display units for a box to be kept
    #[serde(default = "default_min_box_size")]
    pub min_box_size: f32,

    /// Side length of resize-handle hit zones, in display pixels.
    /// Independent of zoom level.
    #[serde(default = "default_handle_size")]
    pub handle_size: f32,

    /// Maximum number of entries kept in undo history
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Whether edits made to a review candidate are thrown away when the
    /// candidate is skipped. When false, a skipped candidate keeps its edited
    /// geometry for when it is revisited.
    #[serde(default = "default_discard_preview_edits")]
    pub discard_preview_edits_on_skip: bool,

    /// Log verbosity level
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_min_box_size() -> f32 {
    10.0
}

fn default_handle_size() -> f32 {
    8.0
}

fn default_max_history() -> usize {
    100
}

fn default_discard_preview_edits() -> bool {
    true
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            min_box_size: default_min_box_size(),
            handle_size: default_handle_size(),
            max_history: default_max_history(),
            discard_preview_edits_on_skip: default_discard_preview_edits(),
            log_level: LogLevel::default(),
        }
    }
}

impl EditorConfig {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize from JSON. Missing fields fall back to defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
