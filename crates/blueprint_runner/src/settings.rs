// SPDX-License-Identifier: MIT OR Apache-2.0
//! Runner settings, stored as RON.

use crate::error::RunnerError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Default settings file name
pub const SETTINGS_FILE_NAME: &str = "blueprint_runner.ron";

/// Value forced onto a node input before running
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PinOverride {
    /// Display name of the node
    pub node: String,
    /// Input pin name
    pub pin: String,
    /// Value to set
    pub value: f32,
}

/// Everything the runner reads from its settings file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerSettings {
    /// Settings format version
    pub version: u32,
    /// Graph document to run
    pub graph_path: Option<PathBuf>,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Also run a preview over the same graph on a second thread
    pub background_preview: bool,
    /// Where to write the graph after running
    pub save_path: Option<PathBuf>,
    /// Inputs to set before the final run; each one triggers a rerun
    pub overrides: Vec<PinOverride>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            graph_path: None,
            log_filter: "info,blueprint_graph=debug".to_string(),
            background_preview: false,
            save_path: None,
            overrides: Vec::new(),
        }
    }
}

impl RunnerSettings {
    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, RunnerError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, RunnerError> {
        let content = std::fs::read_to_string(path)?;
        let settings: RunnerSettings = ron::from_str(&content)?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(RunnerError::SettingsVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }
        Ok(settings)
    }

    /// Save settings to a file
    #[allow(dead_code)] // Intentionally kept for API completeness
    pub fn save(&self, path: &Path) -> Result<(), RunnerError> {
        let config = ron::ser::PrettyConfig::default()
            .struct_names(true)
            .enumerate_arrays(false);
        let content = ron::ser::to_string_pretty(self, config)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = RunnerSettings::load_or_default(&dir.path().join("none.ron")).unwrap();
        assert_eq!(settings, RunnerSettings::default());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        let settings = RunnerSettings {
            graph_path: Some(PathBuf::from("graphs/transition.json")),
            background_preview: true,
            overrides: vec![PinOverride {
                node: "Move Transform".to_string(),
                pin: "Pos".to_string(),
                value: 0.25,
            }],
            ..Default::default()
        };
        settings.save(&path).unwrap();

        let loaded = RunnerSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_absent_fields_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "(background_preview: true)").unwrap();

        let loaded = RunnerSettings::load(&path).unwrap();
        assert!(loaded.background_preview);
        assert_eq!(loaded.version, SETTINGS_FORMAT_VERSION);
        assert_eq!(loaded.log_filter, RunnerSettings::default().log_filter);
    }

    #[test]
    fn test_newer_version_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "(version: 99)").unwrap();

        assert!(matches!(
            RunnerSettings::load(&path),
            Err(RunnerError::SettingsVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_invalid_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        std::fs::write(&path, "(version: ").unwrap();
        assert!(matches!(RunnerSettings::load(&path), Err(RunnerError::Parse(_))));
    }
}
