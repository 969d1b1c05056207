// src/parking_tracker.rs
//
// Entry/exit lifecycle for the monitored parking area. One record per
// tracker id per session; two states per vehicle (InArea, Exited) and a
// single irreversible transition between them. Duplicate and
// out-of-session events degrade to no-ops, never errors.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VehicleStatus {
    InArea,
    Exited,
}

/// A vehicle registered in the area during the current session.
/// Mutated only by its exit event; retained for reporting until reset.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedVehicle {
    pub id: u32,
    pub vehicle_type: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub status: VehicleStatus,
    pub entry_frame: u64,
    pub exit_frame: Option<u64>,
}

/// Append-only lifecycle record. Duration is filled in only when the
/// exit is recorded and equals exit − entry.
#[derive(Debug, Clone, Serialize)]
pub struct ParkingRecord {
    pub id: u32,
    pub vehicle_type: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub duration_secs: Option<f64>,
    pub status: VehicleStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ParkingReport {
    pub session_start: Option<DateTime<Utc>>,
    pub session_end: Option<DateTime<Utc>>,
    pub elapsed_secs: f64,
    pub total_vehicles_entered: usize,
    pub total_vehicles_exited: usize,
    pub vehicles_in_area: usize,
    pub records: Vec<ParkingRecord>,
    pub type_counts: HashMap<String, usize>,
    pub in_area_type_counts: HashMap<String, usize>,
}

pub struct ParkingTracker {
    session_active: bool,
    session_start: Option<DateTime<Utc>>,
    session_end: Option<DateTime<Utc>>,
    vehicles: HashMap<u32, TrackedVehicle>,
    records: Vec<ParkingRecord>,
}

impl ParkingTracker {
    pub fn new() -> Self {
        Self {
            session_active: false,
            session_start: None,
            session_end: None,
            vehicles: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Clears all state and starts a fresh session. Calling it again
    /// mid-session resets.
    pub fn start_session(&mut self, now: DateTime<Utc>) {
        self.vehicles.clear();
        self.records.clear();
        self.session_active = true;
        self.session_start = Some(now);
        self.session_end = None;
        info!("🅿️  Parking session started");
    }

    /// Marks the session inactive. History remains queryable.
    pub fn stop_session(&mut self, now: DateTime<Utc>) {
        if self.session_active {
            self.session_active = false;
            self.session_end = Some(now);
            info!(
                "Parking session stopped: {} entered, {} still in area",
                self.records.len(),
                self.vehicles_in_area()
            );
        }
    }

    /// Registers a vehicle entering the area. An id is registered at most
    /// once per session regardless of how many entry events arrive.
    /// Returns whether the entry was applied.
    pub fn record_entry(
        &mut self,
        id: u32,
        vehicle_type: &str,
        frame: u64,
        now: DateTime<Utc>,
    ) -> bool {
        if !self.session_active {
            debug!("Entry for vehicle {} dropped: no active session", id);
            return false;
        }
        if self.vehicles.contains_key(&id) {
            debug!("Entry for vehicle {} dropped: already tracked", id);
            return false;
        }

        self.vehicles.insert(
            id,
            TrackedVehicle {
                id,
                vehicle_type: vehicle_type.to_string(),
                entry_time: now,
                exit_time: None,
                status: VehicleStatus::InArea,
                entry_frame: frame,
                exit_frame: None,
            },
        );
        self.records.push(ParkingRecord {
            id,
            vehicle_type: vehicle_type.to_string(),
            entry_time: now,
            exit_time: None,
            duration_secs: None,
            status: VehicleStatus::InArea,
        });

        info!(
            "🆕 Vehicle {} ({}) entered at frame {}",
            id, vehicle_type, frame
        );
        true
    }

    /// Records a vehicle leaving the area. A second exit for the same id
    /// is dropped, not an error. Returns whether the exit was applied.
    pub fn record_exit(&mut self, id: u32, frame: u64, now: DateTime<Utc>) -> bool {
        if !self.session_active {
            debug!("Exit for vehicle {} dropped: no active session", id);
            return false;
        }
        let Some(vehicle) = self.vehicles.get_mut(&id) else {
            debug!("Exit for vehicle {} dropped: unknown id", id);
            return false;
        };
        if vehicle.status == VehicleStatus::Exited {
            debug!("Exit for vehicle {} dropped: already exited", id);
            return false;
        }

        vehicle.exit_time = Some(now);
        vehicle.exit_frame = Some(frame);
        vehicle.status = VehicleStatus::Exited;

        let duration_secs = (now - vehicle.entry_time).num_milliseconds() as f64 / 1000.0;
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.id == id && r.exit_time.is_none())
        {
            record.exit_time = Some(now);
            record.duration_secs = Some(duration_secs);
            record.status = VehicleStatus::Exited;
        }

        info!(
            "Vehicle {} exited at frame {} after {:.1}s",
            id, frame, duration_secs
        );
        true
    }

    /// Snapshot of the session so far. Safe to hold across further
    /// mutation; nothing in it aliases live state.
    pub fn generate_report(&self, now: DateTime<Utc>) -> ParkingReport {
        let elapsed_secs = match self.session_start {
            Some(start) => {
                let end = self.session_end.unwrap_or(now);
                (end - start).num_milliseconds() as f64 / 1000.0
            }
            None => 0.0,
        };

        let mut type_counts: HashMap<String, usize> = HashMap::new();
        for record in &self.records {
            *type_counts.entry(record.vehicle_type.clone()).or_insert(0) += 1;
        }

        let mut in_area_type_counts: HashMap<String, usize> = HashMap::new();
        for vehicle in self.vehicles.values() {
            if vehicle.status == VehicleStatus::InArea {
                *in_area_type_counts
                    .entry(vehicle.vehicle_type.clone())
                    .or_insert(0) += 1;
            }
        }

        ParkingReport {
            session_start: self.session_start,
            session_end: self.session_end,
            elapsed_secs,
            total_vehicles_entered: self.records.len(),
            total_vehicles_exited: self
                .records
                .iter()
                .filter(|r| r.exit_time.is_some())
                .count(),
            vehicles_in_area: self.vehicles_in_area(),
            records: self.records.clone(),
            type_counts,
            in_area_type_counts,
        }
    }

    /// Vehicles currently in the area, ordered by entry time ascending.
    pub fn current_occupants(&self) -> Vec<&TrackedVehicle> {
        let mut occupants: Vec<&TrackedVehicle> = self
            .vehicles
            .values()
            .filter(|v| v.status == VehicleStatus::InArea)
            .collect();
        occupants.sort_by_key(|v| (v.entry_time, v.id));
        occupants
    }

    pub fn is_occupant(&self, id: u32) -> bool {
        self.vehicles
            .get(&id)
            .map(|v| v.status == VehicleStatus::InArea)
            .unwrap_or(false)
    }

    pub fn vehicles_in_area(&self) -> usize {
        self.vehicles
            .values()
            .filter(|v| v.status == VehicleStatus::InArea)
            .count()
    }

    pub fn is_session_active(&self) -> bool {
        self.session_active
    }

    /// Clears all state and deactivates the session.
    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.records.clear();
        self.session_active = false;
        self.session_start = None;
        self.session_end = None;
    }
}

impl Default for ParkingTracker {
    fn default() -> Self {
        Self::new()
    }
}
