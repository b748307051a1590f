use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{PoisonError, RwLock},
};

use crate::vision::{HeuristicConfig, HysteresisConfig};

const FORCE_HEURISTIC_ENV: &str = "GAZEGUARD_FORCE_HEURISTIC";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrackingSettings {
    /// How often the loop polls the frame source.
    pub frame_interval_ms: u64,
    /// Upper bound on one frame's detection. A frame that takes longer counts
    /// as a per-frame error.
    pub frame_timeout_ms: u64,
    /// Bounded wait for the landmark provider to report ready.
    pub landmark_ready_timeout_ms: u64,
    pub landmark_ready_poll_ms: u64,
    /// Minimum gap between two emitted warnings of one session.
    pub warning_interval_ms: u64,
    /// Consecutive per-frame errors tolerated before the strategy is
    /// re-initialized.
    pub max_consecutive_frame_errors: u32,
    /// Skip the landmark and cascade strategies.
    pub force_heuristic: bool,
    pub landmark: HysteresisConfig,
    pub cascade: HysteresisConfig,
    pub heuristic: HeuristicConfig,
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 33,
            frame_timeout_ms: 250,
            landmark_ready_timeout_ms: 2_000,
            landmark_ready_poll_ms: 100,
            warning_interval_ms: 3_000,
            max_consecutive_frame_errors: 30,
            force_heuristic: false,
            landmark: HysteresisConfig::landmark(),
            cascade: HysteresisConfig::cascade(),
            heuristic: HeuristicConfig::default(),
        }
    }
}

impl TrackingSettings {
    fn apply_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var(FORCE_HEURISTIC_ENV) {
            self.force_heuristic = value == "1" || value.eq_ignore_ascii_case("true");
        }
        self
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<TrackingSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(err) => {
                    log::warn!(
                        "Ignoring unreadable settings at {}: {err}",
                        path.display()
                    );
                    TrackingSettings::default()
                }
            }
        } else {
            TrackingSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    /// Current settings with environment overrides applied.
    pub fn tracking(&self) -> TrackingSettings {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .apply_env_overrides()
    }

    pub fn update_tracking(&self, settings: TrackingSettings) -> Result<()> {
        let mut guard = self.data.write().unwrap_or_else(PoisonError::into_inner);
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: TrackingSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings at {}", self.path.display()))?;
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
        Ok(())
    }

    fn persist(&self, data: &TrackingSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.data.read().unwrap().clone();
        assert_eq!(settings, TrackingSettings::default());
        assert_eq!(settings.warning_interval_ms, 3_000);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "warning_interval_ms": 5000 }"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.data.read().unwrap().clone();
        assert_eq!(settings.warning_interval_ms, 5_000);
        assert_eq!(settings.landmark, HysteresisConfig::landmark());
    }

    #[test]
    fn update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut changed = TrackingSettings::default();
        changed.frame_interval_ms = 50;
        store.update_tracking(changed.clone()).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        reopened.reload().unwrap();
        assert_eq!(reopened.data.read().unwrap().frame_interval_ms, 50);
    }
}
