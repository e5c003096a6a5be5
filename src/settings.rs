use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::models::{PerformanceType, SkillLevel};

/// Defaults applied to new sessions when the caller does not pick values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDefaults {
    pub performance_type: PerformanceType,
    pub skill_level: SkillLevel,
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            performance_type: PerformanceType::Ballet,
            skill_level: SkillLevel::Intermediate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct UserSettings {
    session_defaults: SessionDefaults,
}

/// JSON-file-backed settings. A missing or unreadable file falls back to
/// defaults rather than failing startup.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn session_defaults(&self) -> SessionDefaults {
        self.data.read().unwrap().session_defaults.clone()
    }

    pub fn update_session_defaults(&self, defaults: SessionDefaults) -> Result<()> {
        {
            let mut guard = self.data.write().unwrap();
            guard.session_defaults = defaults;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join("artemis-tests")
            .join(format!("{}.json", uuid::Uuid::new_v4()))
    }

    #[test]
    fn missing_file_yields_defaults() {
        let store = SettingsStore::new(temp_path()).unwrap();
        let defaults = store.session_defaults();
        assert_eq!(defaults.performance_type, PerformanceType::Ballet);
        assert_eq!(defaults.skill_level, SkillLevel::Intermediate);
    }

    #[test]
    fn updates_round_trip_through_the_file() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let store = SettingsStore::new(path.clone()).unwrap();
        store
            .update_session_defaults(SessionDefaults {
                performance_type: PerformanceType::Violin,
                skill_level: SkillLevel::Professional,
            })
            .unwrap();

        let reloaded = SettingsStore::new(path).unwrap();
        let defaults = reloaded.session_defaults();
        assert_eq!(defaults.performance_type, PerformanceType::Violin);
        assert_eq!(defaults.skill_level, SkillLevel::Professional);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        let store = SettingsStore::new(path).unwrap();
        assert_eq!(
            store.session_defaults().performance_type,
            PerformanceType::Ballet
        );
    }
}
