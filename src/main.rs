// src/main.rs

mod alert_manager;
mod config;
mod event_log;
mod parking_tracker;
mod pipeline;
mod traffic_stats;
mod types;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use event_log::{find_event_files, EventLogReader};
use pipeline::orchestrator::SessionReport;
use pipeline::{AlertSignal, AnalyticsEngine};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = types::Config::load("config.yaml")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("🚦 Traffic Analytics Engine starting");
    info!(
        "Thresholds: congestion {:.0}%/{:.0}%, fps {:.0}/{:.0}, ceiling {:.0}/min",
        config.thresholds.congestion_warning_percent,
        config.thresholds.congestion_critical_percent,
        config.thresholds.min_fps,
        config.thresholds.critical_fps,
        config.thresholds.max_vehicles_per_minute
    );

    let event_files = find_event_files(&config.input.event_dir)?;
    if event_files.is_empty() {
        error!("No event log files found in {}", config.input.event_dir);
        return Ok(());
    }

    info!("Found {} event log file(s) to process", event_files.len());

    for (idx, path) in event_files.iter().enumerate() {
        info!(
            "Processing log {}/{}: {}",
            idx + 1,
            event_files.len(),
            path.display()
        );
        if let Err(e) = process_log(path, &config) {
            error!("Failed to process {}: {}", path.display(), e);
        }
    }

    Ok(())
}

/// Replays one event log through a fresh engine. Event timestamps drive
/// the clock: the session starts at the first event and threshold
/// evaluation ticks once per elapsed interval of event time.
fn process_log(path: &Path, config: &types::Config) -> Result<()> {
    let mut reader = EventLogReader::open(path)?;
    let mut engine = AnalyticsEngine::new(config, Utc::now());
    let tick_interval = Duration::seconds(config.session.tick_interval_secs.max(1) as i64);

    let mut session_started = false;
    let mut next_tick: Option<DateTime<Utc>> = None;
    let mut last_seen: Option<DateTime<Utc>> = None;

    while let Some(event) = reader.next_event()? {
        let at = event.timestamp();
        if !session_started {
            engine.start_session(at);
            next_tick = Some(at + tick_interval);
            session_started = true;
        }

        engine.handle_event(&event);
        last_seen = Some(at);

        while let Some(due) = next_tick {
            if at < due {
                break;
            }
            engine.tick(due);
            consume_signals(engine.drain_signals());
            next_tick = Some(due + tick_interval);
        }
    }

    let Some(end) = last_seen else {
        warn!("{}: no events, skipping report", path.display());
        return Ok(());
    };

    engine.tick(end);
    consume_signals(engine.drain_signals());
    engine.stop_session(end);

    let report = engine.session_report(end);
    info!(
        "✓ Replay complete: {} events in {} lines",
        report.engine.events_processed,
        reader.lines_read()
    );
    info!(
        "  Vehicles: {} entered, {} exited, {} still in area",
        report.parking.total_vehicles_entered,
        report.parking.total_vehicles_exited,
        report.parking.vehicles_in_area
    );
    info!(
        "  Average dwell {:.1}s | busiest period: {} | {}",
        report.average_dwell_secs, report.busiest_period, report.alert_summary
    );
    for peak in &report.peak_hours {
        info!(
            "  Peak hour {:02}:00 ({}): {} vehicles",
            peak.hour, peak.period, peak.count
        );
    }
    for entry in &report.vehicle_distribution {
        info!(
            "  {}: {} ({:.1}%)",
            entry.vehicle_type, entry.count, entry.percent
        );
    }

    if config.input.save_report {
        let out_path = write_report(path, &config.input.output_dir, &report)?;
        info!("Report written to {}", out_path.display());
    }

    Ok(())
}

/// The in-process stand-in for the export/UI consumer of the alert
/// feed. Transition logging itself happens in the alert manager.
fn consume_signals(signals: Vec<AlertSignal>) {
    for signal in signals {
        match &signal {
            AlertSignal::Triggered(alert) => debug!(
                "signal: triggered {} ({})",
                alert.key.as_str(),
                alert.level.as_str()
            ),
            AlertSignal::Updated(alert) => {
                debug!("signal: updated {}: {}", alert.key.as_str(), alert.message)
            }
            AlertSignal::Cleared(alert) => debug!("signal: cleared {}", alert.key.as_str()),
        }
    }
}

fn write_report(input_path: &Path, output_dir: &str, report: &SessionReport) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let stem = input_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("session");
    let out_path = PathBuf::from(output_dir).join(format!("{}_report.json", stem));

    std::fs::write(&out_path, serde_json::to_string_pretty(report)?)?;
    Ok(out_path)
}
