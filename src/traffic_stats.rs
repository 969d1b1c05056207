// src/traffic_stats.rs
//
// Windowed traffic statistics. First sightings land in one of 24
// hour-of-day buckets; every observation updates the per-id record.
// Splitting the two prevents the same physical vehicle from being
// counted once per detection frame.

use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Per-identity observation record. Created on first sighting, updated
/// on every subsequent one, removed only by reset.
#[derive(Debug, Clone, Serialize)]
pub struct VehicleObservation {
    pub id: u32,
    pub vehicle_type: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub frame_count: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PeakHourInfo {
    pub hour: u32,
    pub count: usize,
    pub period: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleDistribution {
    pub vehicle_type: String,
    pub count: usize,
    pub percent: f64,
}

/// Period name for an hour of day.
pub fn period_label(hour: u32) -> &'static str {
    match hour {
        6..=11 => "Morning",
        12..=17 => "Afternoon",
        18..=21 => "Evening",
        _ => "Night",
    }
}

pub struct TrafficStats {
    session_start: DateTime<Utc>,
    observations: HashMap<u32, VehicleObservation>,
    hour_buckets: [HashSet<u32>; 24],
}

impl TrafficStats {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            session_start: now,
            observations: HashMap::new(),
            hour_buckets: std::array::from_fn(|_| HashSet::new()),
        }
    }

    /// Records one observation of a tracked identity. The first sighting
    /// of an id buckets it into the hour of `timestamp`; the bucket is
    /// never touched again for that id.
    pub fn record(
        &mut self,
        id: u32,
        vehicle_type: &str,
        timestamp: DateTime<Utc>,
        frame_increment: u64,
    ) {
        match self.observations.get_mut(&id) {
            Some(observation) => {
                observation.last_seen = timestamp;
                observation.frame_count += frame_increment;
            }
            None => {
                self.observations.insert(
                    id,
                    VehicleObservation {
                        id,
                        vehicle_type: vehicle_type.to_string(),
                        first_seen: timestamp,
                        last_seen: timestamp,
                        frame_count: frame_increment,
                    },
                );
                let hour = timestamp.hour() as usize;
                self.hour_buckets[hour].insert(id);
                debug!(
                    "First sighting of vehicle {} ({}) in hour {}",
                    id, vehicle_type, hour
                );
            }
        }
    }

    /// The `top_n` busiest hours by distinct first sightings, descending.
    /// Hours with no sightings are omitted; ties resolve to the earlier
    /// hour.
    pub fn peak_hours(&self, top_n: usize) -> Vec<PeakHourInfo> {
        let mut hours: Vec<PeakHourInfo> = self
            .hour_buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| !bucket.is_empty())
            .map(|(hour, bucket)| PeakHourInfo {
                hour: hour as u32,
                count: bucket.len(),
                period: period_label(hour as u32),
            })
            .collect();
        hours.sort_by(|a, b| b.count.cmp(&a.count).then(a.hour.cmp(&b.hour)));
        hours.truncate(top_n);
        hours
    }

    /// Count and share of total per vehicle type, descending by count.
    pub fn vehicle_distribution(&self) -> Vec<VehicleDistribution> {
        let total = self.observations.len();
        if total == 0 {
            return Vec::new();
        }

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for observation in self.observations.values() {
            *counts.entry(observation.vehicle_type.as_str()).or_insert(0) += 1;
        }

        let mut distribution: Vec<VehicleDistribution> = counts
            .into_iter()
            .map(|(vehicle_type, count)| VehicleDistribution {
                vehicle_type: vehicle_type.to_string(),
                count,
                percent: count as f64 / total as f64 * 100.0,
            })
            .collect();
        distribution.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.vehicle_type.cmp(&b.vehicle_type))
        });
        distribution
    }

    /// Mean dwell time in seconds over identities observed more than
    /// once. Single-frame sightings would skew the mean toward zero, so
    /// they are excluded.
    pub fn average_dwell_secs(&self) -> f64 {
        let dwells: Vec<f64> = self
            .observations
            .values()
            .filter(|o| o.last_seen > o.first_seen)
            .map(|o| (o.last_seen - o.first_seen).num_milliseconds() as f64 / 1000.0)
            .collect();
        if dwells.is_empty() {
            return 0.0;
        }
        dwells.iter().sum::<f64>() / dwells.len() as f64
    }

    /// Distinct identities per minute since the session clock started.
    pub fn vehicles_per_minute(&self, now: DateTime<Utc>) -> f64 {
        let elapsed_min = (now - self.session_start).num_milliseconds() as f64 / 60_000.0;
        if elapsed_min <= 0.0 {
            return 0.0;
        }
        self.observations.len() as f64 / elapsed_min
    }

    /// Coarse ordinal congestion level derived from throughput. Values
    /// are always one of {0, 25, 50, 75, 100} and are not proportional
    /// to any physical density.
    pub fn congestion_level(&self, now: DateTime<Utc>) -> u8 {
        let vpm = self.vehicles_per_minute(now);
        if vpm < 5.0 {
            0
        } else if vpm < 10.0 {
            25
        } else if vpm < 20.0 {
            50
        } else if vpm < 30.0 {
            75
        } else {
            100
        }
    }

    /// Period label of the single busiest hour, "N/A" when no data.
    pub fn busiest_period(&self) -> &'static str {
        let mut best: Option<(usize, usize)> = None;
        for (hour, bucket) in self.hour_buckets.iter().enumerate() {
            if bucket.is_empty() {
                continue;
            }
            match best {
                Some((_, count)) if bucket.len() <= count => {}
                _ => best = Some((hour, bucket.len())),
            }
        }
        match best {
            Some((hour, _)) => period_label(hour as u32),
            None => "N/A",
        }
    }

    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    pub fn observations(&self) -> impl Iterator<Item = &VehicleObservation> {
        self.observations.values()
    }

    /// Clears records and buckets and restarts the session clock.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.observations.clear();
        for bucket in &mut self.hour_buckets {
            bucket.clear();
        }
        self.session_start = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_hour(hour: u32, min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 7, hour, min, sec).unwrap()
    }

    fn stats() -> TrafficStats {
        TrafficStats::new(at_hour(8, 0, 0))
    }

    #[test]
    fn test_peak_hours_scenario() {
        let mut stats = stats();
        for id in 1..=5 {
            stats.record(id, "car", at_hour(8, id, 0), 1);
        }
        for id in 6..=8 {
            stats.record(id, "car", at_hour(17, id, 0), 1);
        }

        let peaks = stats.peak_hours(1);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].hour, 8);
        assert_eq!(peaks[0].count, 5);
        assert_eq!(peaks[0].period, "Morning");

        let peaks = stats.peak_hours(5);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[1].hour, 17);
        assert_eq!(peaks[1].period, "Afternoon");
    }

    #[test]
    fn test_rebucketing_never_happens() {
        let mut stats = stats();
        stats.record(1, "car", at_hour(8, 0, 0), 1);
        // Same id seen again hours later: record updates, bucket does not
        stats.record(1, "car", at_hour(17, 0, 0), 1);

        let peaks = stats.peak_hours(24);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0].hour, 8);
        assert_eq!(peaks[0].count, 1);
    }

    #[test]
    fn test_observation_accumulates_frames() {
        let mut stats = stats();
        stats.record(1, "car", at_hour(8, 0, 0), 1);
        stats.record(1, "car", at_hour(8, 0, 5), 3);

        let observation = stats.observations().next().unwrap();
        assert_eq!(observation.frame_count, 4);
        assert_eq!(observation.first_seen, at_hour(8, 0, 0));
        assert_eq!(observation.last_seen, at_hour(8, 0, 5));
    }

    #[test]
    fn test_period_labels() {
        assert_eq!(period_label(6), "Morning");
        assert_eq!(period_label(11), "Morning");
        assert_eq!(period_label(12), "Afternoon");
        assert_eq!(period_label(17), "Afternoon");
        assert_eq!(period_label(18), "Evening");
        assert_eq!(period_label(21), "Evening");
        assert_eq!(period_label(22), "Night");
        assert_eq!(period_label(3), "Night");
    }

    #[test]
    fn test_distribution_percentages() {
        let mut stats = stats();
        stats.record(1, "car", at_hour(8, 0, 0), 1);
        stats.record(2, "car", at_hour(8, 1, 0), 1);
        stats.record(3, "car", at_hour(8, 2, 0), 1);
        stats.record(4, "bus", at_hour(8, 3, 0), 1);

        let distribution = stats.vehicle_distribution();
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].vehicle_type, "car");
        assert_eq!(distribution[0].count, 3);
        assert!((distribution[0].percent - 75.0).abs() < 1e-9);
        assert_eq!(distribution[1].vehicle_type, "bus");
        assert!((distribution[1].percent - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_empty_without_records() {
        assert!(stats().vehicle_distribution().is_empty());
    }

    #[test]
    fn test_average_dwell_skips_single_frame_sightings() {
        let mut stats = stats();
        // Dwell of 10s
        stats.record(1, "car", at_hour(8, 0, 0), 1);
        stats.record(1, "car", at_hour(8, 0, 10), 1);
        // Dwell of 20s
        stats.record(2, "bus", at_hour(8, 1, 0), 1);
        stats.record(2, "bus", at_hour(8, 1, 20), 1);
        // Single sighting, excluded
        stats.record(3, "car", at_hour(8, 2, 0), 1);

        assert!((stats.average_dwell_secs() - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_average_dwell_zero_without_qualifying_records() {
        let mut stats = stats();
        stats.record(1, "car", at_hour(8, 0, 0), 1);
        assert_eq!(stats.average_dwell_secs(), 0.0);
    }

    #[test]
    fn test_vehicles_per_minute() {
        let mut stats = stats();
        for id in 1..=10 {
            stats.record(id, "car", at_hour(8, 0, id), 1);
        }
        // 10 vehicles in 2 minutes
        assert!((stats.vehicles_per_minute(at_hour(8, 2, 0)) - 5.0).abs() < 1e-9);
        // Clock not advanced: no rate
        assert_eq!(stats.vehicles_per_minute(at_hour(8, 0, 0)), 0.0);
    }

    #[test]
    fn test_congestion_level_steps() {
        let mut stats = stats();
        let now = at_hour(8, 1, 0); // one minute in, so vpm == record count

        let mut expected = Vec::new();
        let mut observed = Vec::new();
        for (count, level) in [(4, 0u8), (9, 25), (19, 50), (29, 75), (40, 100)] {
            for id in 1..=count {
                stats.record(id, "car", at_hour(8, 0, 1), 1);
            }
            expected.push(level);
            observed.push(stats.congestion_level(now));
        }
        assert_eq!(observed, expected);

        // Monotonic and confined to the step values
        let mut previous = 0u8;
        for level in observed {
            assert!(level >= previous);
            assert!([0, 25, 50, 75, 100].contains(&level));
            previous = level;
        }
    }

    #[test]
    fn test_busiest_period() {
        let mut stats = stats();
        assert_eq!(stats.busiest_period(), "N/A");

        stats.record(1, "car", at_hour(19, 0, 0), 1);
        stats.record(2, "car", at_hour(19, 5, 0), 1);
        stats.record(3, "car", at_hour(8, 0, 0), 1);
        assert_eq!(stats.busiest_period(), "Evening");
    }

    #[test]
    fn test_reset_restarts_clock() {
        let mut stats = stats();
        stats.record(1, "car", at_hour(8, 0, 0), 1);
        stats.reset(at_hour(9, 0, 0));

        assert_eq!(stats.observation_count(), 0);
        assert!(stats.peak_hours(24).is_empty());
        assert_eq!(stats.vehicles_per_minute(at_hour(9, 1, 0)), 0.0);
    }
}
