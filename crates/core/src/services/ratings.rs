//! Label rating input.
//!
//! Clients submit ratings as a `label -> value` map. Entries whose label is
//! not in the catalog for the marker type, or whose value is not a whole
//! number between 1 and 5, are dropped without failing the request.

use std::collections::BTreeMap;

use mappoint_db::entities::rating_label;
use serde_json::Value;

/// Lowest accepted score.
pub const MIN_RATING: i32 = 1;
/// Highest accepted score.
pub const MAX_RATING: i32 = 5;

/// Submitted ratings before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingInput {
    entries: Vec<(String, String)>,
}

impl RatingInput {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Add one raw `label, value` pair.
    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.entries.push((label.into(), value.into()));
    }

    /// Append every pair of `other`.
    pub fn extend(&mut self, other: Self) {
        self.entries.extend(other.entries);
    }

    /// Read a JSON object. Non-object input yields no entries.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let mut input = Self::new();
        if let Value::Object(map) = value {
            for (label, raw) in map {
                match raw {
                    Value::String(s) => input.push(label.clone(), s.clone()),
                    Value::Number(n) => input.push(label.clone(), n.to_string()),
                    _ => {}
                }
            }
        }
        input
    }

    /// Read a raw `ratings` form value. Text that is not JSON yields no entries.
    #[must_use]
    pub fn from_json_str(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_json(&value),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unparsable ratings");
                Self::new()
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Percent-decoded labels mapped to their valid scores.
    ///
    /// A label submitted twice keeps its last valid value.
    #[must_use]
    pub fn normalized(&self) -> BTreeMap<String, i32> {
        self.entries
            .iter()
            .filter_map(|(label, raw)| Some((decode_label(label), parse_rating(raw)?)))
            .collect()
    }

    /// Match against the label catalog. Returns `(label_id, rating)` pairs.
    #[must_use]
    pub fn resolve(&self, catalog: &[rating_label::Model]) -> Vec<(String, i32)> {
        let by_label: BTreeMap<&str, &str> = catalog
            .iter()
            .map(|l| (l.label.as_str(), l.id.as_str()))
            .collect();

        self.normalized()
            .into_iter()
            .filter_map(|(label, rating)| {
                let Some(id) = by_label.get(label.as_str()) else {
                    tracing::debug!(label = %label, "Dropping rating for unknown label");
                    return None;
                };
                Some(((*id).to_string(), rating))
            })
            .collect()
    }
}

/// Undo percent-encoding in a label. Malformed escapes keep the raw text.
#[must_use]
pub fn decode_label(raw: &str) -> String {
    urlencoding::decode(raw).map_or_else(|_| raw.to_string(), std::borrow::Cow::into_owned)
}

/// Parse a score. `"4"`, `" 4 "` and `"4.0"` are accepted; `"x"`, `"4.5"` and `"9"` are not.
#[must_use]
pub fn parse_rating(raw: &str) -> Option<i32> {
    let value: f64 = raw.trim().parse().ok()?;
    if !value.is_finite() || value.fract() != 0.0 {
        return None;
    }
    let value = value as i32;
    (MIN_RATING..=MAX_RATING).contains(&value).then_some(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use mappoint_db::entities::marker::MarkerType;
    use serde_json::json;

    fn label(id: &str, text: &str) -> rating_label::Model {
        rating_label::Model {
            id: id.to_string(),
            marker_type: MarkerType::Park,
            label: text.to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("4"), Some(4));
        assert_eq!(parse_rating(" 5 "), Some(5));
        assert_eq!(parse_rating("3.0"), Some(3));
        assert_eq!(parse_rating("x"), None);
        assert_eq!(parse_rating("2.5"), None);
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("6"), None);
        assert_eq!(parse_rating("NaN"), None);
        assert_eq!(parse_rating(""), None);
    }

    #[test]
    fn test_decode_label() {
        assert_eq!(decode_label("propret%C3%A9"), "propreté");
        assert_eq!(decode_label("calm"), "calm");
        assert_eq!(decode_label("100%"), "100%");
    }

    #[test]
    fn test_unknown_and_malformed_entries_are_dropped() {
        let input = RatingInput::from_json(&json!({ "comfort": 4, "noise": "x", "view": 5 }));
        let catalog = [label("l1", "comfort"), label("l2", "noise")];

        let resolved = input.resolve(&catalog);

        assert_eq!(resolved, vec![("l1".to_string(), 4)]);
    }

    #[test]
    fn test_from_json_ignores_non_objects() {
        assert!(RatingInput::from_json(&json!([1, 2])).is_empty());
        assert!(RatingInput::from_json(&json!("4")).is_empty());
        assert!(RatingInput::from_json(&json!({ "comfort": null })).is_empty());
    }

    #[test]
    fn test_encoded_labels_match_catalog() {
        let mut input = RatingInput::new();
        input.push("propret%C3%A9", "5");
        let catalog = [label("l1", "propreté")];

        assert_eq!(input.resolve(&catalog), vec![("l1".to_string(), 5)]);
    }

    #[test]
    fn test_last_valid_value_wins() {
        let mut input = RatingInput::new();
        input.push("comfort", "2");
        input.push("comfort", "4");
        input.push("comfort", "oops");

        assert_eq!(input.normalized().get("comfort"), Some(&4));
    }

    #[test]
    fn test_from_json_str_ignores_malformed_text() {
        assert!(RatingInput::from_json_str("{not json").is_empty());
        assert!(RatingInput::from_json_str("[5, 4]").is_empty());

        let input = RatingInput::from_json_str(r#"{"cleanliness": 5, "noise": "x"}"#);
        let catalog = [label("l1", "cleanliness"), label("l2", "noise")];
        assert_eq!(input.resolve(&catalog), vec![("l1".to_string(), 5)]);
    }
}
