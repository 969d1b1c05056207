// src/pipeline/orchestrator.rs
//
// Wires the three analytics components together: routes tracking events
// in and runs the periodic threshold evaluation. Thresholds live here,
// as configuration; the alert manager only ever sees trigger/clear.

use crate::alert_manager::{Alert, AlertKey, AlertLevel, AlertManager, TriggerOutcome};
use crate::parking_tracker::{ParkingReport, ParkingTracker};
use crate::pipeline::event_bus::AlertSignal;
use crate::pipeline::metrics::{EngineMetrics, EngineMetricsSummary};
use crate::traffic_stats::{PeakHourInfo, TrafficStats, VehicleDistribution};
use crate::types::{Config, ThresholdConfig, TrackingEvent};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use tracing::debug;

/// Full session snapshot for the export layer. Everything in here is
/// owned data copied at call time.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub parking: ParkingReport,
    pub peak_hours: Vec<PeakHourInfo>,
    pub vehicle_distribution: Vec<VehicleDistribution>,
    pub average_dwell_secs: f64,
    pub vehicles_per_minute: f64,
    pub congestion_level: u8,
    pub busiest_period: &'static str,
    pub alert_summary: String,
    pub active_alerts: Vec<Alert>,
    pub alert_history: Vec<Alert>,
    pub engine: EngineMetricsSummary,
}

pub struct AnalyticsEngine {
    thresholds: ThresholdConfig,
    parking: ParkingTracker,
    stats: TrafficStats,
    alerts: AlertManager,
    metrics: EngineMetrics,
    /// FPS as last reported by the detector; None until a sample arrives
    last_fps_sample: Option<f32>,
}

impl AnalyticsEngine {
    pub fn new(config: &Config, now: DateTime<Utc>) -> Self {
        Self {
            thresholds: config.thresholds.clone(),
            parking: ParkingTracker::new(),
            stats: TrafficStats::new(now),
            alerts: AlertManager::new(&config.alerts),
            metrics: EngineMetrics::new(),
            last_fps_sample: None,
        }
    }

    pub fn start_session(&mut self, now: DateTime<Utc>) {
        self.parking.start_session(now);
        self.stats.reset(now);
    }

    pub fn stop_session(&mut self, now: DateTime<Utc>) {
        self.parking.stop_session(now);
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.parking.reset();
        self.stats.reset(now);
        self.alerts.clear_all_alerts();
        self.last_fps_sample = None;
    }

    /// Routes one tracking event. Entry and exit drive the parking
    /// tracker; entries double as first observations for the aggregator
    /// so both components see every vehicle independently.
    pub fn handle_event(&mut self, event: &TrackingEvent) {
        self.metrics.inc(&self.metrics.events_processed);
        match event {
            TrackingEvent::Entry {
                tracker_id,
                vehicle_type,
                frame,
                timestamp,
            } => {
                if self
                    .parking
                    .record_entry(*tracker_id, vehicle_type, *frame, *timestamp)
                {
                    self.metrics.inc(&self.metrics.entries_recorded);
                } else {
                    self.metrics.inc(&self.metrics.entries_ignored);
                }
                self.stats.record(*tracker_id, vehicle_type, *timestamp, 1);
            }
            TrackingEvent::Exit {
                tracker_id,
                frame,
                timestamp,
            } => {
                if self.parking.record_exit(*tracker_id, *frame, *timestamp) {
                    self.metrics.inc(&self.metrics.exits_recorded);
                } else {
                    self.metrics.inc(&self.metrics.exits_ignored);
                }
            }
            TrackingEvent::Observation {
                tracker_id,
                vehicle_type,
                timestamp,
                frame_increment,
            } => {
                self.stats
                    .record(*tracker_id, vehicle_type, *timestamp, *frame_increment);
                self.metrics.inc(&self.metrics.observations_recorded);
            }
            TrackingEvent::MetricSample { current_fps, .. } => {
                self.last_fps_sample = Some(*current_fps);
                self.metrics.inc(&self.metrics.metric_samples);
            }
        }
    }

    /// One evaluation tick: reads current aggregate metrics and runs
    /// the threshold checks against them.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        self.metrics.inc(&self.metrics.ticks_run);
        let congestion = self.stats.congestion_level(now) as f32;
        let vpm = self.stats.vehicles_per_minute(now) as f32;
        let fps = self.last_fps_sample;
        debug!(
            "Tick: congestion={:.0}% vpm={:.1} fps={:?}",
            congestion, vpm, fps
        );
        self.evaluate(congestion, fps, vpm, now);
    }

    /// Threshold checks. Each is invoked once per tick with the current
    /// metric value and decides between trigger and clear. The FPS check
    /// only runs once the detector has reported at least one sample.
    pub fn evaluate(
        &mut self,
        congestion_percent: f32,
        current_fps: Option<f32>,
        vehicles_per_minute: f32,
        now: DateTime<Utc>,
    ) {
        let warning_congestion = self.thresholds.congestion_warning_percent;
        let critical_congestion = self.thresholds.congestion_critical_percent;
        if congestion_percent >= warning_congestion {
            let level = if congestion_percent >= critical_congestion {
                AlertLevel::Critical
            } else {
                AlertLevel::Warning
            };
            let message = format!("Congestion at {:.0}%", congestion_percent);
            let data = HashMap::from([(
                "congestion_percent".to_string(),
                json!(congestion_percent),
            )]);
            self.apply_trigger(AlertKey::Congestion, level, &message, data, now);
        } else {
            self.apply_clear(AlertKey::Congestion);
        }

        if let Some(fps) = current_fps {
            let min_fps = self.thresholds.min_fps;
            let critical_fps = self.thresholds.critical_fps;
            if fps < min_fps {
                let level = if fps < critical_fps {
                    AlertLevel::Critical
                } else {
                    AlertLevel::Warning
                };
                let message = format!("Detector FPS dropped to {:.1}", fps);
                let data = HashMap::from([("current_fps".to_string(), json!(fps))]);
                self.apply_trigger(AlertKey::LowFps, level, &message, data, now);
            } else {
                self.apply_clear(AlertKey::LowFps);
            }
        }

        let ceiling = self.thresholds.max_vehicles_per_minute;
        if vehicles_per_minute > ceiling {
            let level = if vehicles_per_minute > ceiling * 1.5 {
                AlertLevel::Critical
            } else {
                AlertLevel::Warning
            };
            let message = format!(
                "Traffic at {:.1} vehicles/min (ceiling {:.0})",
                vehicles_per_minute, ceiling
            );
            let data = HashMap::from([(
                "vehicles_per_minute".to_string(),
                json!(vehicles_per_minute),
            )]);
            self.apply_trigger(AlertKey::HighTraffic, level, &message, data, now);
        } else {
            self.apply_clear(AlertKey::HighTraffic);
        }
    }

    fn apply_trigger(
        &mut self,
        key: AlertKey,
        level: AlertLevel,
        message: &str,
        data: HashMap<String, serde_json::Value>,
        now: DateTime<Utc>,
    ) {
        match self.alerts.trigger_alert(key, level, message, data, now) {
            TriggerOutcome::Created => self.metrics.inc(&self.metrics.alerts_triggered),
            TriggerOutcome::Updated => self.metrics.inc(&self.metrics.alerts_updated),
        }
    }

    fn apply_clear(&mut self, key: AlertKey) {
        if self.alerts.clear_alert(key) {
            self.metrics.inc(&self.metrics.alerts_cleared);
        }
    }

    pub fn drain_signals(&mut self) -> Vec<AlertSignal> {
        self.alerts.drain_signals()
    }

    pub fn parking(&self) -> &ParkingTracker {
        &self.parking
    }

    pub fn stats(&self) -> &TrafficStats {
        &self.stats
    }

    pub fn alerts(&self) -> &AlertManager {
        &self.alerts
    }

    pub fn metrics_summary(&self) -> EngineMetricsSummary {
        self.metrics.summary()
    }

    pub fn session_report(&self, now: DateTime<Utc>) -> SessionReport {
        SessionReport {
            parking: self.parking.generate_report(now),
            peak_hours: self.stats.peak_hours(5),
            vehicle_distribution: self.stats.vehicle_distribution(),
            average_dwell_secs: self.stats.average_dwell_secs(),
            vehicles_per_minute: self.stats.vehicles_per_minute(now),
            congestion_level: self.stats.congestion_level(now),
            busiest_period: self.stats.busiest_period(),
            alert_summary: self.alerts.summary(),
            active_alerts: self.alerts.active_alerts().to_vec(),
            alert_history: self.alerts.history().iter().cloned().collect(),
            engine: self.metrics.summary(),
        }
    }
}
