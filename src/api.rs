//! Read-only JSON API over the snapshot cache.
//!
//! Every handler answers 200 with the best snapshot available; upstream
//! trouble shows up as empty lists, never as an error status.

use actix_web::{HttpResponse, web};
use serde::Serialize;
use tracing::debug;

use crate::cache::SnapshotCache;
use crate::merge::{Alert, TrainRecord};
use crate::snapshot::Snapshot;

pub const BANNER: &str = "\
gtfs_rt_merger: merged real-time train positions, delays and incidents

GET /api/trenes      trains with line, position, status and delay, plus incidents
GET /api/incidencias deduplicated service incidents
GET /api/lineas      lines with at least one train reporting
";

#[derive(Debug, Serialize)]
pub struct TrainsResponse<'a> {
    pub timestamp: i64,
    pub trenes: &'a [TrainRecord],
    pub incidencias: &'a [Alert],
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse<'a> {
    pub timestamp: i64,
    pub incidencias: &'a [Alert],
}

#[derive(Debug, Serialize)]
pub struct LinesResponse {
    pub timestamp: i64,
    pub lineas: Vec<String>,
}

impl<'a> From<&'a Snapshot> for TrainsResponse<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp_millis(),
            trenes: &snapshot.trains,
            incidencias: &snapshot.alerts,
        }
    }
}

impl<'a> From<&'a Snapshot> for AlertsResponse<'a> {
    fn from(snapshot: &'a Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp_millis(),
            incidencias: &snapshot.alerts,
        }
    }
}

impl From<&Snapshot> for LinesResponse {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp_millis(),
            lineas: snapshot.lines(),
        }
    }
}

/// Registers the routes. Expects a `web::Data<SnapshotCache>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(banner))
        .service(
            web::scope("/api")
                .route("/trenes", web::get().to(get_trains))
                .route("/incidencias", web::get().to(get_alerts))
                .route("/lineas", web::get().to(get_lines)),
        );
}

async fn banner() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(BANNER)
}

async fn get_trains(cache: web::Data<SnapshotCache>) -> HttpResponse {
    let snapshot = cache.get().await;
    debug!(
        trains = snapshot.trains.len(),
        alerts = snapshot.alerts.len(),
        "Trains requested"
    );
    HttpResponse::Ok().json(TrainsResponse::from(snapshot.as_ref()))
}

async fn get_alerts(cache: web::Data<SnapshotCache>) -> HttpResponse {
    let snapshot = cache.get().await;
    debug!(alerts = snapshot.alerts.len(), "Incidents requested");
    HttpResponse::Ok().json(AlertsResponse::from(snapshot.as_ref()))
}

async fn get_lines(cache: web::Data<SnapshotCache>) -> HttpResponse {
    let snapshot = cache.get().await;
    let body = LinesResponse::from(snapshot.as_ref());
    debug!(lines = body.lineas.len(), "Lines requested");
    HttpResponse::Ok().json(body)
}
