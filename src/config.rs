use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::safety::regimen::ScheduleTimes;

/// Application-level constants
pub const APP_NAME: &str = "MedBurden";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable pointing at a reference data directory.
pub const DATA_DIR_ENV: &str = "MEDBURDEN_DATA_DIR";

/// Upper bound on a plausible patient age.
pub const MAX_PATIENT_AGE: u32 = 130;
/// Upper bound on doses per day for a single medication.
pub const MAX_DOSES_PER_DAY: u32 = 24;

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    "medburden_lib=info,medburden=info"
}

/// Get the application data directory (platform data dir + MedBurden).
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join(APP_NAME))
}

/// Reference data directory: the environment override if set, otherwise
/// `<app data>/reference` when it exists. `None` means use the bundled tables.
pub fn reference_data_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    app_data_dir()
        .map(|d| d.join("reference"))
        .filter(|d| d.is_dir())
}

/// Tunables injected into the engine at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Cap on the priority-action list.
    pub max_priority_actions: usize,
    /// Longest accepted medication name, in characters.
    pub max_name_len: usize,
    pub schedule: ScheduleTimes,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_priority_actions: 5,
            max_name_len: 200,
            schedule: ScheduleTimes::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_named_after_app() {
        if let Some(dir) = app_data_dir() {
            assert!(dir.ends_with("MedBurden"));
        }
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn engine_config_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_priority_actions, 5);
        assert_eq!(config.max_name_len, 200);
    }

    #[test]
    fn engine_config_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_priority_actions": 3}"#).unwrap();
        assert_eq!(config.max_priority_actions, 3);
        assert_eq!(config.max_name_len, 200);
        assert_eq!(config.schedule, ScheduleTimes::default());
    }

    #[test]
    fn default_filter_names_both_targets() {
        assert!(default_log_filter().contains("medburden_lib"));
    }
}
