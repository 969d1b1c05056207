// src/pipeline/event_bus.rs
//
// Decoupled alert signalling. The alert manager publishes transition
// snapshots here instead of calling into subscribers; the export/UI
// layer drains them at its own pace.

use crate::alert_manager::Alert;
use std::collections::VecDeque;
use tracing::warn;

/// One alert state transition. Each signal carries a snapshot of the
/// alert at transition time, never a live reference.
#[derive(Debug, Clone)]
pub enum AlertSignal {
    Triggered(Alert),
    Updated(Alert),
    Cleared(Alert),
}

impl AlertSignal {
    pub fn alert(&self) -> &Alert {
        match self {
            Self::Triggered(alert) | Self::Updated(alert) | Self::Cleared(alert) => alert,
        }
    }
}

pub struct AlertBus {
    signals: VecDeque<AlertSignal>,
    max_pending: usize,
}

impl AlertBus {
    pub fn new(max_pending: usize) -> Self {
        Self {
            signals: VecDeque::with_capacity(max_pending),
            max_pending,
        }
    }

    pub fn publish(&mut self, signal: AlertSignal) {
        if self.signals.len() >= self.max_pending {
            warn!(
                "Alert bus full ({} signals), dropping oldest",
                self.max_pending
            );
            self.signals.pop_front();
        }
        self.signals.push_back(signal);
    }

    pub fn drain(&mut self) -> Vec<AlertSignal> {
        self.signals.drain(..).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.signals.len()
    }
}
