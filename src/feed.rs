//! JSON rendering of the GTFS Realtime messages consumed by the merger.
//!
//! Only the fields the merge pipeline reads are modelled; anything else in the
//! upstream payload is ignored. Names follow the protobuf JSON mapping
//! (`tripId`, `stopTimeUpdate`, ...) and also accept the snake_case spelling
//! some producers emit. A field of the wrong JSON type decodes as absent
//! instead of failing the entity around it.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A decoded feed. Built by [`crate::parser::parse_feed`], which decodes each
/// entity on its own so one malformed entity never poisons the rest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedMessage {
    pub entity: Vec<FeedEntity>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedEntity {
    #[serde(default, deserialize_with = "lenient")]
    pub vehicle: Option<VehiclePosition>,
    #[serde(
        default,
        alias = "trip_update",
        rename = "tripUpdate",
        deserialize_with = "lenient"
    )]
    pub trip_update: Option<TripUpdate>,
    #[serde(default, deserialize_with = "lenient")]
    pub alert: Option<Alert>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TripDescriptor {
    #[serde(
        default,
        alias = "trip_id",
        rename = "tripId",
        deserialize_with = "lenient"
    )]
    pub trip_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VehiclePosition {
    #[serde(default, deserialize_with = "lenient")]
    pub trip: Option<TripDescriptor>,
    #[serde(default, deserialize_with = "lenient")]
    pub position: Option<Position>,
    #[serde(
        default,
        alias = "current_status",
        rename = "currentStatus",
        deserialize_with = "lenient"
    )]
    pub current_status: Option<VehicleStopStatus>,
}

impl VehiclePosition {
    /// The upstream trip id, if one is given and not blank.
    pub fn trip_id(&self) -> Option<&str> {
        self.trip
            .as_ref()
            .and_then(|t| t.trip_id.as_deref())
            .filter(|id| !id.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "lenient")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub longitude: Option<f64>,
}

impl Position {
    /// `(lat, lon)` when both coordinates are present.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}

/// Vehicle status as either the enum name or its protobuf number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum VehicleStopStatus {
    Name(String),
    Code(i64),
}

impl VehicleStopStatus {
    pub fn label(&self) -> String {
        match self {
            VehicleStopStatus::Name(name) => name.clone(),
            VehicleStopStatus::Code(0) => "INCOMING_AT".to_string(),
            VehicleStopStatus::Code(1) => "STOPPED_AT".to_string(),
            VehicleStopStatus::Code(2) => "IN_TRANSIT_TO".to_string(),
            VehicleStopStatus::Code(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TripUpdate {
    #[serde(default, deserialize_with = "lenient")]
    pub trip: Option<TripDescriptor>,
    #[serde(
        default,
        alias = "stop_time_update",
        rename = "stopTimeUpdate",
        deserialize_with = "lenient_vec"
    )]
    pub stop_time_update: Vec<StopTimeUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StopTimeUpdate {
    #[serde(default, deserialize_with = "lenient")]
    pub arrival: Option<StopTimeEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct StopTimeEvent {
    /// Seconds; positive means late.
    #[serde(default, deserialize_with = "lenient_i64")]
    pub delay: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Alert {
    #[serde(
        default,
        alias = "informed_entity",
        rename = "informedEntity",
        deserialize_with = "lenient_vec"
    )]
    pub informed_entity: Vec<EntitySelector>,
    #[serde(
        default,
        alias = "header_text",
        rename = "headerText",
        deserialize_with = "lenient"
    )]
    pub header_text: Option<TranslatedString>,
    #[serde(
        default,
        alias = "description_text",
        rename = "descriptionText",
        deserialize_with = "lenient"
    )]
    pub description_text: Option<TranslatedString>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EntitySelector {
    #[serde(
        default,
        alias = "route_id",
        rename = "routeId",
        deserialize_with = "lenient"
    )]
    pub route_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TranslatedString {
    #[serde(default, deserialize_with = "lenient_vec")]
    pub translation: Vec<Translation>,
}

impl TranslatedString {
    /// Trimmed text of the first translation whose text is not blank.
    pub fn first_text(&self) -> Option<&str> {
        self.translation
            .iter()
            .filter_map(|t| t.text.as_deref())
            .map(str::trim)
            .find(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Translation {
    #[serde(default, deserialize_with = "lenient")]
    pub text: Option<String>,
}

/// Decodes the field as `T`, or `None` when it has some other shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| T::deserialize(v).ok()))
}

/// A list field: `null` or a non-array is empty, and items that do not decode
/// are dropped.
fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| T::deserialize(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// int64 fields arrive as strings under the protobuf JSON mapping; accept both.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}
