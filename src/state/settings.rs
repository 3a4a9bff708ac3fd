use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::custom_names::DEFAULT_CUSTOM_NAMES_FILE;
use crate::data::loader::{LoadOptions, DEFAULT_LARGE_FILE_THRESHOLD};
use crate::error::Result;
use crate::state::preferences::DisplayPreferences;

pub const APP_NAME: &str = "CmrHisto";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_SETTINGS_FILE: &str = "cmrhisto.json";

/// Persisted user configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub auto_load_rpm_scale: bool,
    pub rpm_scale_file: Option<PathBuf>,
    pub auto_load_y_axis_scale: bool,
    pub y_axis_scale_file: Option<PathBuf>,
    /// Build scales from the log's own value range instead.
    pub auto_scale_rpm: bool,
    pub auto_scale_y_axis: bool,
    /// Auto-scale the Y-axis from rows with a ratio above 1 only.
    pub auto_scale_boost_only: bool,
    pub custom_names_file: PathBuf,
    pub large_file_threshold: u64,
    pub preferences: DisplayPreferences,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_load_rpm_scale: false,
            rpm_scale_file: None,
            auto_load_y_axis_scale: false,
            y_axis_scale_file: None,
            auto_scale_rpm: false,
            auto_scale_y_axis: false,
            auto_scale_boost_only: false,
            custom_names_file: PathBuf::from(DEFAULT_CUSTOM_NAMES_FILE),
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            preferences: DisplayPreferences::default(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let settings = serde_json::from_str(&text)?;
        tracing::info!("Settings loaded from {:?}", path);
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        tracing::info!("Settings saved to {:?}", path);
        Ok(())
    }

    pub fn load_options(&self, accept_large_file: bool) -> LoadOptions {
        LoadOptions {
            accept_large_file,
            large_file_threshold: self.large_file_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::preferences::SortOrder;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.large_file_threshold, 10_485_760);
        assert_eq!(settings.custom_names_file, PathBuf::from("CustomPidNames.xml"));
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmrhisto.json");
        let mut settings = Settings::default();
        settings.auto_load_rpm_scale = true;
        settings.rpm_scale_file = Some(PathBuf::from("rpm.csv"));
        settings.preferences.y_axis_sort = SortOrder::Descending;
        settings.save(&path).unwrap();
        assert_eq!(Settings::load(&path).unwrap(), settings);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(Settings::load(&path), Err(crate::error::HistoError::Json(_))));
    }
}
