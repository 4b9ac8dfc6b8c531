//! Trip identity and line labels for vehicle positions.

use lazy_static::lazy_static;
use regex::Regex;

use crate::feed::VehiclePosition;

/// Line label used when none can be derived.
pub const UNKNOWN_LINE: &str = "??";

/// Recognised line prefixes: `C` for commuter (Cercanías) and `R` for
/// regional (Rodalies) service. Extend here to recognise more classes.
pub const LINE_PREFIXES: &[&str] = &["C", "R"];

lazy_static! {
    /// A prefix plus its code (`C1`, `C4a`, `R2N`, `RT1`) closing the id,
    /// optionally followed by a `_<digits>` run number. The prefix must not be
    /// glued to a preceding letter.
    static ref LINE_CODE_REGEX: Regex = Regex::new(&format!(
        r"(?:^|[^A-Za-z])({})([A-Z]?\d+[A-Za-z]?)(?:_\d+)?$",
        LINE_PREFIXES.join("|")
    ))
    .unwrap();
}

/// Stable identifier for the trip a vehicle is serving.
///
/// The upstream trip id wins. Without one, an id is synthesised from the
/// position rounded to three decimals, so two vehicles reporting the same
/// rounded position in one cycle collapse into one. Returns `None` when the
/// vehicle has neither, and the vehicle must then be dropped.
pub fn resolve_trip_id(vehicle: &VehiclePosition) -> Option<String> {
    if let Some(trip_id) = vehicle.trip_id() {
        return Some(trip_id.to_string());
    }

    let (lat, lon) = vehicle.position.as_ref()?.coordinates()?;
    Some(format!("SINID_{lat:.3}_{lon:.3}"))
}

/// Line label encoded in a trip id, or [`UNKNOWN_LINE`].
pub fn derive_line(trip_id: &str) -> String {
    match LINE_CODE_REGEX.captures(trip_id) {
        Some(caps) => format!("{}{}", &caps[1], &caps[2]),
        None => UNKNOWN_LINE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Position, TripDescriptor};

    fn vehicle(trip_id: Option<&str>, position: Option<(f64, f64)>) -> VehiclePosition {
        VehiclePosition {
            trip: trip_id.map(|id| TripDescriptor {
                trip_id: Some(id.to_string()),
            }),
            position: position.map(|(lat, lon)| Position {
                latitude: Some(lat),
                longitude: Some(lon),
            }),
            current_status: None,
        }
    }

    #[test]
    fn test_upstream_trip_id_is_kept_exactly() {
        let v = vehicle(Some("1002S23043C1"), Some((40.1, -3.2)));
        assert_eq!(resolve_trip_id(&v).as_deref(), Some("1002S23043C1"));
    }

    #[test]
    fn test_trip_id_synthesised_from_position() {
        let v = vehicle(None, Some((40.41678, -3.70379)));
        assert_eq!(resolve_trip_id(&v).as_deref(), Some("SINID_40.417_-3.704"));
    }

    #[test]
    fn test_nearby_positions_collapse() {
        let a = vehicle(None, Some((40.41621, -3.70311)));
        let b = vehicle(None, Some((40.41639, -3.70329)));
        assert_eq!(resolve_trip_id(&a).as_deref(), Some("SINID_40.416_-3.703"));
        assert_eq!(resolve_trip_id(&a), resolve_trip_id(&b));
    }

    #[test]
    fn test_half_position_is_unresolvable() {
        let v = VehiclePosition {
            position: Some(Position {
                latitude: Some(40.1),
                longitude: None,
            }),
            ..Default::default()
        };
        assert_eq!(resolve_trip_id(&v), None);
    }

    #[test]
    fn test_no_id_no_position_is_unresolvable() {
        assert_eq!(resolve_trip_id(&vehicle(None, None)), None);
        assert_eq!(resolve_trip_id(&VehiclePosition::default()), None);
    }

    #[test]
    fn test_derive_line_recognised_codes() {
        assert_eq!(derive_line("1002S23043C1"), "C1");
        assert_eq!(derive_line("3062Y71018C10"), "C10");
        assert_eq!(derive_line("77001C4a"), "C4a");
        assert_eq!(derive_line("4102R2N"), "R2N");
        assert_eq!(derive_line("9011RT1"), "RT1");
        assert_eq!(derive_line("C1_001"), "C1");
        assert_eq!(derive_line("R3"), "R3");
    }

    #[test]
    fn test_derive_line_unrecognised() {
        assert_eq!(derive_line(""), UNKNOWN_LINE);
        assert_eq!(derive_line("SINID_40.417_-3.704"), UNKNOWN_LINE);
        assert_eq!(derive_line("12345"), UNKNOWN_LINE);
        assert_eq!(derive_line("C1X_bus"), UNKNOWN_LINE);
        assert_eq!(derive_line("ABC1"), UNKNOWN_LINE);
    }

    #[test]
    fn test_derive_line_prefers_trailing_code() {
        assert_eq!(derive_line("R12C1"), "C1");
    }

    #[test]
    fn test_derive_line_is_pure() {
        let first = derive_line("1002S23043C5");
        for _ in 0..3 {
            assert_eq!(derive_line("1002S23043C5"), first);
        }
    }
}
