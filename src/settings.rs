//! Application preferences (stored in the config directory).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::extractor::{AudioFormat, Bitrate};
use crate::ui::Theme;

/// Preferences remembered between sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    /// Last selected output format
    pub format: AudioFormat,

    /// Last selected bitrate
    pub bitrate: Bitrate,

    /// Explicit theme choice; follows the system when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,

    /// Folder the last input video was picked from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_input_dir: Option<PathBuf>,

    /// FFmpeg binary to use instead of searching for one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
}

impl Preferences {
    /// Get the preferences file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("AudioSift");
            p.push("preferences.json");
            p
        })
    }

    /// Load preferences from the config directory, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(prefs) => prefs,
            Err(e) => {
                log::warn!("Ignoring unreadable preferences: {:#}", e);
                Self::default()
            }
        }
    }

    /// Save preferences to the config directory.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path().context("Could not find config directory")?;
        self.save_to(&path)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let prefs = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        log::debug!("Loaded preferences from {:?}", path);
        Ok(prefs)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        log::debug!("Saved preferences to {:?}", path);
        Ok(())
    }

    /// Get the last input folder if it still exists
    pub fn get_last_input_dir(&self) -> Option<&Path> {
        self.last_input_dir.as_deref().filter(|p| p.is_dir())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg/preferences.json");

        let prefs = Preferences {
            format: AudioFormat::Flac,
            bitrate: Bitrate::Kbps320,
            theme: Some(Theme::Dark),
            last_input_dir: Some(dir.path().to_path_buf()),
            ffmpeg_path: None,
        };
        prefs.save_to(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("\"format\": \"flac\""));
        assert!(json.contains("\"bitrate\": \"320k\""));
        assert!(json.contains("\"lastInputDir\""));
        assert!(!json.contains("ffmpegPath"));

        assert_eq!(Preferences::load_from(&path).unwrap(), prefs);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, r#"{ "format": "ogg" }"#).unwrap();

        let prefs = Preferences::load_from(&path).unwrap();
        assert_eq!(prefs.format, AudioFormat::Ogg);
        assert_eq!(prefs.bitrate, Bitrate::Kbps192);
        assert_eq!(prefs.theme, None);
    }

    #[test]
    fn test_unknown_format_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preferences.json");
        std::fs::write(&path, r#"{ "format": "opus" }"#).unwrap();
        assert!(Preferences::load_from(&path).is_err());
    }

    #[test]
    fn test_last_input_dir_must_exist() {
        let prefs = Preferences {
            last_input_dir: Some(PathBuf::from("/no/such/folder/anywhere")),
            ..Default::default()
        };
        assert_eq!(prefs.get_last_input_dir(), None);
    }
}
