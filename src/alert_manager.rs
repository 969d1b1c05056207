// src/alert_manager.rs
//
// Alert lifecycle: Absent → Active → Absent per logical key, with a
// capped history and audible-notification throttling. The manager holds
// no thresholds; callers decide when a condition holds and invoke
// trigger/clear once per evaluation tick.

use crate::pipeline::event_bus::{AlertBus, AlertSignal};
use crate::types::AlertConfig;
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use tracing::{info, warn};

/// Logical alert identity. One key maps to at most one active alert;
/// the closed enumeration makes that invariant structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertKey {
    #[serde(rename = "congestion_alert")]
    Congestion,
    #[serde(rename = "low_fps_alert")]
    LowFps,
    #[serde(rename = "high_traffic_alert")]
    HighTraffic,
}

impl AlertKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Congestion => "congestion_alert",
            Self::LowFps => "low_fps_alert",
            Self::HighTraffic => "high_traffic_alert",
        }
    }

    pub fn kind(&self) -> AlertKind {
        match self {
            Self::Congestion => AlertKind::Congestion,
            Self::LowFps => AlertKind::Performance,
            Self::HighTraffic => AlertKind::Traffic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    Congestion,
    Performance,
    Traffic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Info,
    Warning,
    Critical,
}

impl AlertLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    #[serde(rename = "id")]
    pub key: AlertKey,
    pub kind: AlertKind,
    pub level: AlertLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub is_active: bool,
    pub data: HashMap<String, Value>,
}

/// Whether a trigger opened a new alert or refreshed an active one.
/// Callers that must distinguish "applied" from "ignored" inspect this
/// instead of relying on errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Created,
    Updated,
}

/// Audible notification side effect. Playback failure is logged and
/// swallowed; it never reaches the caller or blocks a state transition.
pub trait SoundNotifier {
    fn play(&mut self, level: AlertLevel) -> Result<()>;
}

/// Default notifier: log only. The GUI layer swaps in a real player.
pub struct LogSoundNotifier;

impl SoundNotifier for LogSoundNotifier {
    fn play(&mut self, level: AlertLevel) -> Result<()> {
        info!("🔊 Sound notification ({})", level.as_str());
        Ok(())
    }
}

pub struct AlertManager {
    /// Active alerts in activation order, at most one per key
    active: Vec<Alert>,
    history: VecDeque<Alert>,
    history_capacity: usize,
    bus: AlertBus,
    sound_enabled: bool,
    sound_cooldown: Duration,
    last_sound: Option<DateTime<Utc>>,
    sounds_played: u64,
    notifier: Box<dyn SoundNotifier>,
}

impl AlertManager {
    pub fn new(config: &AlertConfig) -> Self {
        Self::with_notifier(config, Box::new(LogSoundNotifier))
    }

    pub fn with_notifier(config: &AlertConfig, notifier: Box<dyn SoundNotifier>) -> Self {
        Self {
            active: Vec::new(),
            history: VecDeque::with_capacity(config.history_capacity),
            history_capacity: config.history_capacity,
            bus: AlertBus::new(config.max_pending_signals),
            sound_enabled: config.sound_enabled,
            sound_cooldown: Duration::seconds(config.sound_cooldown_secs as i64),
            last_sound: None,
            sounds_played: 0,
            notifier,
        }
    }

    /// Opens an alert for `key`, or refreshes the active one in place.
    /// Only a newly created alert lands in history or fires a sound.
    pub fn trigger_alert(
        &mut self,
        key: AlertKey,
        level: AlertLevel,
        message: &str,
        data: HashMap<String, Value>,
        now: DateTime<Utc>,
    ) -> TriggerOutcome {
        if let Some(alert) = self.active.iter_mut().find(|a| a.key == key) {
            alert.message = message.to_string();
            alert.timestamp = now;
            alert.data = data;
            let snapshot = alert.clone();
            self.bus.publish(AlertSignal::Updated(snapshot));
            return TriggerOutcome::Updated;
        }

        let alert = Alert {
            key,
            kind: key.kind(),
            level,
            message: message.to_string(),
            timestamp: now,
            is_active: true,
            data,
        };
        info!(
            "🚨 Alert {} triggered ({}): {}",
            key.as_str(),
            level.as_str(),
            message
        );

        self.active.push(alert.clone());
        self.history.push_back(alert.clone());
        if self.history.len() > self.history_capacity {
            self.history.pop_front();
        }
        self.bus.publish(AlertSignal::Triggered(alert));

        if level == AlertLevel::Critical {
            self.maybe_play_sound(now);
        }
        TriggerOutcome::Created
    }

    fn maybe_play_sound(&mut self, now: DateTime<Utc>) {
        if !self.sound_enabled {
            return;
        }
        if let Some(last) = self.last_sound {
            if now - last < self.sound_cooldown {
                return;
            }
        }
        match self.notifier.play(AlertLevel::Critical) {
            Ok(()) => {
                self.last_sound = Some(now);
                self.sounds_played += 1;
            }
            Err(e) => warn!("Sound notification failed: {}", e),
        }
    }

    /// Deactivates the alert for `key`. Returns false if none is active.
    pub fn clear_alert(&mut self, key: AlertKey) -> bool {
        let Some(pos) = self.active.iter().position(|a| a.key == key) else {
            return false;
        };
        let mut alert = self.active.remove(pos);
        alert.is_active = false;
        if let Some(entry) = self.history.iter_mut().rev().find(|a| a.key == key) {
            entry.is_active = false;
        }
        info!("Alert {} cleared", key.as_str());
        self.bus.publish(AlertSignal::Cleared(alert));
        true
    }

    /// Clears every active alert in activation order, one signal each.
    pub fn clear_all_alerts(&mut self) {
        while let Some(alert) = self.active.first() {
            let key = alert.key;
            self.clear_alert(key);
        }
    }

    /// Human-readable active-alert count broken down by level.
    pub fn summary(&self) -> String {
        if self.active.is_empty() {
            return "No active alerts".to_string();
        }
        let critical = self.count_level(AlertLevel::Critical);
        let warning = self.count_level(AlertLevel::Warning);
        let informational = self.count_level(AlertLevel::Info);
        format!(
            "{} active alert(s): {} critical, {} warning, {} info",
            self.active.len(),
            critical,
            warning,
            informational
        )
    }

    fn count_level(&self, level: AlertLevel) -> usize {
        self.active.iter().filter(|a| a.level == level).count()
    }

    /// Message of the most recently (re)triggered active alert.
    pub fn latest_message(&self) -> String {
        self.active
            .iter()
            .max_by_key(|a| a.timestamp)
            .map(|a| a.message.clone())
            .unwrap_or_default()
    }

    pub fn is_active(&self, key: AlertKey) -> bool {
        self.active.iter().any(|a| a.key == key)
    }

    pub fn active_alerts(&self) -> &[Alert] {
        &self.active
    }

    pub fn history(&self) -> &VecDeque<Alert> {
        &self.history
    }

    pub fn sounds_played(&self) -> u64 {
        self.sounds_played
    }

    pub fn drain_signals(&mut self) -> Vec<AlertSignal> {
        self.bus.drain()
    }
}
