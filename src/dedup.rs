use std::collections::HashSet;

use crate::merge::Alert;

/// Drops repeated `(line, description)` pairs, keeping the first occurrence
/// and the original order.
pub fn dedup_alerts(raw: Vec<Alert>) -> Vec<Alert> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .filter(|alert| seen.insert((alert.line.clone(), alert.description.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(line: &str, description: &str) -> Alert {
        Alert {
            line: line.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_identical_alerts_collapse_to_first() {
        let out = dedup_alerts(vec![
            alert("C1", "Retraso"),
            alert("C2", "Obras"),
            alert("C1", "Retraso"),
        ]);
        assert_eq!(out, vec![alert("C1", "Retraso"), alert("C2", "Obras")]);
    }

    #[test]
    fn test_same_text_on_different_lines_is_kept() {
        let out = dedup_alerts(vec![alert("C1", "Huelga"), alert("C2", "Huelga")]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_same_line_different_text_is_kept() {
        let out = dedup_alerts(vec![alert("R2N", "Retraso"), alert("R2N", "Cancelado")]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_key_does_not_merge_across_field_boundary() {
        let out = dedup_alerts(vec![alert("C1", "0 Retraso"), alert("C1 0", "Retraso")]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(dedup_alerts(Vec::new()).is_empty());
    }
}
