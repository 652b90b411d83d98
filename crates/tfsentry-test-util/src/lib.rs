//! Shared test utilities for the tfsentry workspace.
//!
//! This crate exists because `xtask` needs `normalize_nondeterministic` at
//! runtime (not behind `#[cfg(test)]`), so a `#[cfg(test)]` module inside
//! `tfsentry-types` would not suffice.

use serde_json::Value;

pub const TIMESTAMP_PLACEHOLDER: &str = "__TIMESTAMP__";

/// Normalize non-deterministic JSON fields for golden-file comparison.
///
/// `CreatedAt` is replaced with [`TIMESTAMP_PLACEHOLDER`] at any depth, so both a single
/// report object and the report array written by `scan --report-out` are covered. Only string
/// values are replaced; a `CreatedAt` key carrying any other type is left alone.
pub fn normalize_nondeterministic(mut value: Value) -> Value {
    normalize_timestamps_recursive(&mut value);
    value
}

fn normalize_timestamps_recursive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if let Some(created) = map.get_mut("CreatedAt")
                && created.is_string()
            {
                *created = Value::String(TIMESTAMP_PLACEHOLDER.to_string());
            }
            for val in map.values_mut() {
                normalize_timestamps_recursive(val);
            }
        }
        Value::Array(arr) => {
            for val in arr.iter_mut() {
                normalize_timestamps_recursive(val);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_created_at_in_report_array() {
        let input = json!([
            {
                "SchemaVersion": 2,
                "CreatedAt": "2025-01-01T00:00:00Z",
                "ArtifactName": "main.tf",
                "Results": []
            },
            {
                "SchemaVersion": 2,
                "CreatedAt": "2025-01-01T00:00:07.123Z",
                "ArtifactName": "other.tf",
                "Results": []
            }
        ]);

        let result = normalize_nondeterministic(input);

        assert_eq!(result[0]["CreatedAt"], TIMESTAMP_PLACEHOLDER);
        assert_eq!(result[1]["CreatedAt"], TIMESTAMP_PLACEHOLDER);
        assert_eq!(result[0]["ArtifactName"], "main.tf");
    }

    #[test]
    fn leaves_other_fields_untouched() {
        let input = json!({
            "CreatedAt": "2025-06-01T12:00:00Z",
            "Results": [{ "Misconfigurations": [{ "Message": "CreatedAt is old" }] }]
        });

        let result = normalize_nondeterministic(input);

        assert_eq!(result["CreatedAt"], TIMESTAMP_PLACEHOLDER);
        assert_eq!(
            result["Results"][0]["Misconfigurations"][0]["Message"],
            "CreatedAt is old"
        );
    }

    #[test]
    fn non_string_created_at_is_kept() {
        let input = json!({ "CreatedAt": 17 });
        assert_eq!(normalize_nondeterministic(input)["CreatedAt"], 17);
    }
}
