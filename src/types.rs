use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub input: InputConfig,
    pub session: SessionConfig,
    pub thresholds: ThresholdConfig,
    pub alerts: AlertConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub event_dir: String,
    pub output_dir: String,
    pub save_report: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            event_dir: "events".to_string(),
            output_dir: "output".to_string(),
            save_report: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of event time between threshold evaluation ticks
    pub tick_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 1,
        }
    }
}

/// Threshold configuration for the evaluation tick. These map metric
/// values to alert conditions; the alert manager itself never sees them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Congestion level that raises a warning alert
    pub congestion_warning_percent: f32,
    /// Congestion level that escalates the alert to critical
    pub congestion_critical_percent: f32,
    /// Detector FPS below which a warning alert is raised
    pub min_fps: f32,
    /// Detector FPS below which the alert escalates to critical
    pub critical_fps: f32,
    /// Vehicles-per-minute ceiling; above it a traffic alert is raised
    pub max_vehicles_per_minute: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            congestion_warning_percent: 75.0,
            congestion_critical_percent: 90.0,
            min_fps: 15.0,
            critical_fps: 5.0,
            max_vehicles_per_minute: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Maximum retained alert history entries (oldest evicted beyond this)
    pub history_capacity: usize,
    pub sound_enabled: bool,
    /// Minimum seconds between audible notifications
    pub sound_cooldown_secs: u64,
    /// Maximum pending alert signals before the oldest is dropped
    pub max_pending_signals: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            sound_enabled: true,
            sound_cooldown_secs: 5,
            max_pending_signals: 256,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "traffic_analytics=info".to_string(),
        }
    }
}

fn default_frame_increment() -> u64 {
    1
}

/// One record of the upstream tracking pipeline's event stream.
///
/// Serialized as JSON Lines with an `event` tag, one record per line:
/// `{"event":"entry","tracker_id":3,"vehicle_type":"car","frame":120,...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TrackingEvent {
    Entry {
        tracker_id: u32,
        vehicle_type: String,
        frame: u64,
        timestamp: DateTime<Utc>,
    },
    Exit {
        tracker_id: u32,
        frame: u64,
        timestamp: DateTime<Utc>,
    },
    Observation {
        tracker_id: u32,
        vehicle_type: String,
        timestamp: DateTime<Utc>,
        #[serde(default = "default_frame_increment")]
        frame_increment: u64,
    },
    MetricSample {
        congestion_percent: f32,
        current_fps: f32,
        vehicles_per_minute: f32,
        timestamp: DateTime<Utc>,
    },
}

impl TrackingEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Entry { timestamp, .. }
            | Self::Exit { timestamp, .. }
            | Self::Observation { timestamp, .. }
            | Self::MetricSample { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_event_parses() {
        let line = r#"{"event":"entry","tracker_id":3,"vehicle_type":"car","frame":120,"timestamp":"2026-08-07T08:15:00Z"}"#;
        let event: TrackingEvent = serde_json::from_str(line).unwrap();
        match event {
            TrackingEvent::Entry {
                tracker_id,
                vehicle_type,
                frame,
                ..
            } => {
                assert_eq!(tracker_id, 3);
                assert_eq!(vehicle_type, "car");
                assert_eq!(frame, 120);
            }
            other => panic!("parsed wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_observation_frame_increment_defaults_to_one() {
        let line = r#"{"event":"observation","tracker_id":7,"vehicle_type":"bus","timestamp":"2026-08-07T08:15:00Z"}"#;
        let event: TrackingEvent = serde_json::from_str(line).unwrap();
        match event {
            TrackingEvent::Observation {
                frame_increment, ..
            } => assert_eq!(frame_increment, 1),
            other => panic!("parsed wrong variant: {:?}", other),
        }
    }

    #[test]
    fn test_event_round_trips_through_json() {
        let line = r#"{"event":"metric_sample","congestion_percent":50.0,"current_fps":24.0,"vehicles_per_minute":12.5,"timestamp":"2026-08-07T17:00:00Z"}"#;
        let event: TrackingEvent = serde_json::from_str(line).unwrap();
        let encoded = serde_json::to_string(&event).unwrap();
        let decoded: TrackingEvent = serde_json::from_str(&encoded).unwrap();
        assert_eq!(event.timestamp(), decoded.timestamp());
    }

    #[test]
    fn test_default_config_is_sensible() {
        let config = Config::default();
        assert_eq!(config.alerts.history_capacity, 100);
        assert_eq!(config.alerts.sound_cooldown_secs, 5);
        assert!(
            config.thresholds.congestion_warning_percent
                < config.thresholds.congestion_critical_percent
        );
        assert!(config.thresholds.critical_fps < config.thresholds.min_fps);
    }
}
