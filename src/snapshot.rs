//! One full fetch, merge and dedup cycle.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::cache::Clock;
use crate::dedup::dedup_alerts;
use crate::fetch::{FeedKind, FeedSource};
use crate::merge::{Alert, TrainRecord, merge};

/// Merged view of the three feeds at `fetched_at`. Never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub trains: Vec<TrainRecord>,
    pub alerts: Vec<Alert>,
    pub fetched_at: DateTime<Utc>,
}

impl Snapshot {
    /// Distinct line labels of the current trains, sorted.
    pub fn lines(&self) -> Vec<String> {
        self.trains
            .iter()
            .map(|t| t.line.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    pub fn timestamp_millis(&self) -> i64 {
        self.fetched_at.timestamp_millis()
    }
}

/// Fetches the three feeds concurrently and merges them. The snapshot is
/// stamped from `clock` once every fetch has finished.
#[tracing::instrument(skip_all)]
pub async fn build_snapshot<S: FeedSource + ?Sized>(source: &S, clock: &dyn Clock) -> Snapshot {
    let (vehicles, trip_updates, alerts) = tokio::join!(
        source.fetch(FeedKind::VehiclePositions),
        source.fetch(FeedKind::TripUpdates),
        source.fetch(FeedKind::Alerts),
    );
    let fetched_at = clock.now();

    let merged = merge(vehicles.entities(), trip_updates.entities(), alerts.entities());
    let alerts_out = dedup_alerts(merged.raw_alerts);

    info!(
        trains = merged.trains.len(),
        alerts = alerts_out.len(),
        vehicles_ok = vehicles.is_available(),
        trip_updates_ok = trip_updates.is_available(),
        alerts_ok = alerts.is_available(),
        fetched_at = %fetched_at,
        "Snapshot built"
    );

    Snapshot {
        trains: merged.trains,
        alerts: alerts_out,
        fetched_at,
    }
}
