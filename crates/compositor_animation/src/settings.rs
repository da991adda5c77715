// SPDX-License-Identifier: MIT OR Apache-2.0
//! Animation module settings.
//!
//! Settings are persisted as RON next to the user's preferences.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// How pasted keyframes are placed in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PasteMode {
    /// Offset so the earliest pasted key lands on the playhead
    #[default]
    RelativeToPlayhead,
    /// Keep the copied times
    Absolute,
}

impl PasteMode {
    /// Whether pasted times are offset to the playhead
    pub fn is_relative(&self) -> bool {
        matches!(self, Self::RelativeToPlayhead)
    }
}

/// Settings error
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// File could not be read or written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid RON document
    #[error("Parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// Settings could not be serialized
    #[error("Serialization error: {0}")]
    Serialize(#[from] ron::Error),

    /// Written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version found in the document
        found: u32,
        /// Latest supported version
        supported: u32,
    },
}

/// User-facing configuration of the animation module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationModuleSettings {
    /// Format version
    pub version: u32,
    /// Maximum number of undo entries kept
    pub max_undo_depth: usize,
    /// Show nodes even when their settings panel is closed
    pub keep_nodes_visible: bool,
    /// Hide knobs that carry no animation
    pub hide_knobs_without_animation: bool,
    /// Only show knobs whose name contains this text
    pub knob_name_filter: Option<String>,
    /// Default placement of pasted keyframes
    pub paste_mode: PasteMode,
}

impl Default for AnimationModuleSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            max_undo_depth: 100,
            keep_nodes_visible: false,
            hide_knobs_without_animation: true,
            knob_name_filter: None,
            paste_mode: PasteMode::default(),
        }
    }
}

impl AnimationModuleSettings {
    /// Whether a knob name passes the name filter
    pub fn knob_name_matches(&self, name: &str) -> bool {
        match &self.knob_name_filter {
            Some(filter) if !filter.is_empty() => name.to_lowercase().contains(&filter.to_lowercase()),
            _ => true,
        }
    }

    /// Serialize to RON format
    pub fn to_ron(&self) -> Result<String, SettingsError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, config)?)
    }

    /// Deserialize from RON format
    pub fn from_ron(s: &str) -> Result<Self, SettingsError> {
        let settings: Self = ron::from_str(s)?;
        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(SettingsError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_ron(&content)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }
}
