use crate::types::Config;
use anyhow::{Context, Result};
use std::fs;
use tracing::warn;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path))?;
        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path))?;

        // Threshold sanity is the configuration layer's job; the engine
        // applies whatever it is given. Flag the obvious inversions.
        if config.thresholds.congestion_critical_percent
            < config.thresholds.congestion_warning_percent
        {
            warn!("congestion_critical_percent is below congestion_warning_percent");
        }
        if config.thresholds.critical_fps > config.thresholds.min_fps {
            warn!("critical_fps is above min_fps");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = "thresholds:\n  max_vehicles_per_minute: 45.0\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.thresholds.max_vehicles_per_minute, 45.0);
        // Untouched sections keep their defaults
        assert_eq!(config.thresholds.congestion_warning_percent, 75.0);
        assert_eq!(config.alerts.history_capacity, 100);
        assert_eq!(config.session.tick_interval_secs, 1);
    }

    #[test]
    fn test_empty_yaml_is_all_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.input.event_dir, "events");
        assert!(config.alerts.sound_enabled);
    }
}
