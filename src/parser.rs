//! JSON parser for GTFS Realtime feeds.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::debug;

use crate::feed::{FeedEntity, FeedMessage};

/// Decodes a JSON-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// The envelope has to be a JSON object. Past that, decoding is best-effort: a
/// missing `entity` list is treated as empty, an entity that is not an object
/// is skipped, and a field of the wrong type inside an entity reads as absent.
///
/// # Errors
///
/// Returns an error if the bytes are not JSON or the top level is not an object.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    let root: Value = serde_json::from_slice(bytes).context("feed body is not valid JSON")?;
    let Value::Object(mut root) = root else {
        bail!("feed body is not a JSON object");
    };

    let raw_entities = match root.remove("entity") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let mut entity = Vec::with_capacity(raw_entities.len());
    for (index, raw) in raw_entities.into_iter().enumerate() {
        match serde_json::from_value::<FeedEntity>(raw) {
            Ok(e) => entity.push(e),
            Err(e) => debug!(index, error = %e, "Skipping malformed feed entity"),
        }
    }

    Ok(FeedMessage { entity })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::merge;

    #[test]
    fn test_parse_empty_object_returns_default_feed() {
        let feed = parse_feed(b"{}").unwrap();
        assert_eq!(feed, FeedMessage::default());
    }

    #[test]
    fn test_parse_invalid_bytes() {
        assert!(parse_feed(b"<html>502 Bad Gateway</html>").is_err());
        assert!(parse_feed(&[0xFF, 0xFE, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_parse_non_object_is_rejected() {
        assert!(parse_feed(b"[1, 2, 3]").is_err());
        assert!(parse_feed(b"null").is_err());
    }

    #[test]
    fn test_parse_valid_minimal_feed() {
        let feed = parse_feed(
            br#"{
                "header": { "gtfsRealtimeVersion": "2.0", "timestamp": "1234567890" },
                "entity": []
            }"#,
        )
        .unwrap();

        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_non_array_entity_is_empty() {
        let feed = parse_feed(br#"{ "entity": { "id": "x" } }"#).unwrap();
        assert!(feed.entity.is_empty());
    }

    #[test]
    fn test_non_object_entity_is_skipped() {
        let feed = parse_feed(
            br#"{
                "entity": [
                    42,
                    "VP_C1_001",
                    { "id": "good", "vehicle": { "trip": { "tripId": "C5_100" } } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(feed.entity.len(), 1);
        assert_eq!(feed.entity[0].vehicle.as_ref().unwrap().trip_id(), Some("C5_100"));
    }

    #[test]
    fn test_numeric_entity_id_keeps_train() {
        let feed = parse_feed(
            br#"{ "entity": [ { "id": 42, "vehicle": { "trip": { "tripId": "C1_001" } } } ] }"#,
        )
        .unwrap();

        let merged = merge(&feed.entity, &[], &[]);
        assert_eq!(merged.trains.len(), 1);
        assert_eq!(merged.trains[0].trip_id, "C1_001");
    }

    #[test]
    fn test_numeric_stop_id_keeps_delay() {
        let vehicles = parse_feed(
            br#"{ "entity": [ { "vehicle": { "trip": { "tripId": "C1_001" } } } ] }"#,
        )
        .unwrap();
        let updates = parse_feed(
            br#"{ "entity": [ { "tripUpdate": {
                "trip": { "tripId": "C1_001" },
                "stopTimeUpdate": [ { "stopId": 18000, "arrival": { "delay": 185 } } ]
            } } ] }"#,
        )
        .unwrap();

        let merged = merge(&vehicles.entity, &updates.entity, &[]);
        assert_eq!(merged.trains[0].delay_minutes, 3);
    }

    #[test]
    fn test_bad_coordinate_keeps_entity() {
        let feed = parse_feed(
            br#"{ "entity": [ { "vehicle": {
                "trip": { "tripId": "C5_100" },
                "position": { "latitude": "north", "longitude": -3.7 }
            } } ] }"#,
        )
        .unwrap();

        let position = feed.entity[0].vehicle.as_ref().unwrap().position.as_ref().unwrap();
        assert_eq!(position.latitude, None);
        assert_eq!(position.longitude, Some(-3.7));
    }
}
