//! Joins vehicle positions, trip updates and alerts into one view per trip.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::feed::{self, FeedEntity, TripUpdate, VehiclePosition};
use crate::resolve::{UNKNOWN_LINE, derive_line, resolve_trip_id};

/// Status reported when the vehicle gives none.
pub const UNKNOWN_STATUS: &str = "UNKNOWN";

/// One train currently reporting a position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainRecord {
    #[serde(rename = "tripId")]
    pub trip_id: String,
    #[serde(rename = "linea")]
    pub line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(rename = "estado")]
    pub status: String,
    #[serde(rename = "retraso")]
    pub delay_minutes: u32,
}

/// A service alert reduced to its line and display text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Alert {
    #[serde(rename = "linea")]
    pub line: String,
    #[serde(rename = "descripcion")]
    pub description: String,
}

/// Output of [`merge`]. `raw_alerts` still holds duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Merged {
    pub trains: Vec<TrainRecord>,
    pub raw_alerts: Vec<Alert>,
}

/// Merges one snapshot of each feed.
///
/// Trains come out in the order their trip id was first seen in the vehicle
/// feed; a later vehicle with the same id overwrites the record in place.
/// Trip updates only ever amend trains seen in this snapshot.
pub fn merge(vehicles: &[FeedEntity], trip_updates: &[FeedEntity], alerts: &[FeedEntity]) -> Merged {
    let mut trains = TrainTable::default();

    let mut unresolved = 0usize;
    for vehicle in vehicles.iter().filter_map(|e| e.vehicle.as_ref()) {
        match train_from_vehicle(vehicle) {
            Some(record) => trains.upsert(record),
            None => unresolved += 1,
        }
    }

    let mut orphan_updates = 0usize;
    for update in trip_updates.iter().filter_map(|e| e.trip_update.as_ref()) {
        if !trains.apply_update(update) {
            orphan_updates += 1;
        }
    }

    let raw_alerts: Vec<Alert> = alerts
        .iter()
        .filter_map(|e| e.alert.as_ref())
        .filter_map(alert_from_feed)
        .collect();

    debug!(
        trains = trains.records.len(),
        unresolved,
        orphan_updates,
        raw_alerts = raw_alerts.len(),
        "Merged feeds"
    );

    Merged {
        trains: trains.records,
        raw_alerts,
    }
}

/// Seconds of delay as whole minutes, rounded down and never negative.
pub fn delay_minutes(delay_secs: i64) -> u32 {
    u32::try_from(delay_secs.div_euclid(60).max(0)).unwrap_or(u32::MAX)
}

#[derive(Default)]
struct TrainTable {
    records: Vec<TrainRecord>,
    index: HashMap<String, usize>,
}

impl TrainTable {
    fn upsert(&mut self, record: TrainRecord) {
        match self.index.get(&record.trip_id) {
            Some(&slot) => self.records[slot] = record,
            None => {
                self.index.insert(record.trip_id.clone(), self.records.len());
                self.records.push(record);
            }
        }
    }

    /// Returns `false` when the update has no matching train.
    fn apply_update(&mut self, update: &TripUpdate) -> bool {
        let trip_id = update
            .trip
            .as_ref()
            .and_then(|t| t.trip_id.as_deref());
        let Some(&slot) = trip_id.and_then(|id| self.index.get(id)) else {
            return false;
        };

        let record = &mut self.records[slot];
        for stu in &update.stop_time_update {
            if let Some(delay) = stu.arrival.as_ref().and_then(|a| a.delay) {
                if delay != 0 {
                    record.delay_minutes = delay_minutes(delay);
                }
            }
        }
        true
    }
}

fn train_from_vehicle(vehicle: &VehiclePosition) -> Option<TrainRecord> {
    let trip_id = resolve_trip_id(vehicle)?;
    let position = vehicle.position.as_ref();

    let status = vehicle
        .current_status
        .as_ref()
        .map(|s| s.label())
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_STATUS.to_string());

    Some(TrainRecord {
        line: derive_line(&trip_id),
        trip_id,
        lat: position.and_then(|p| p.latitude),
        lon: position.and_then(|p| p.longitude),
        status,
        delay_minutes: 0,
    })
}

fn alert_from_feed(alert: &feed::Alert) -> Option<Alert> {
    let line = alert
        .informed_entity
        .first()
        .and_then(|e| e.route_id.as_deref())
        .map(str::trim)
        .filter(|route| !route.is_empty())
        .unwrap_or(UNKNOWN_LINE);

    let text = alert
        .description_text
        .as_ref()
        .and_then(|t| t.first_text())
        .or_else(|| alert.header_text.as_ref().and_then(|t| t.first_text()))?;

    Some(Alert {
        line: line.to_string(),
        description: text.to_string(),
    })
}
