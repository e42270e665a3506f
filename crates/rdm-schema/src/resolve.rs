//! # Subschema Search
//!
//! Narrows a node's schema to the fragment governing one of its properties.
//!
//! Data-model schemas compose heavily: the `meta` block of an image is an
//! `allOf` over a common block and several instrument-specific blocks, some
//! of which are `anyOf` alternatives. The search order is:
//!
//! 1. `properties[name]`, returned as-is when present.
//! 2. Each `allOf` branch in order, recursively.
//! 3. Each `anyOf` branch in order, recursively.
//!
//! The first non-empty result wins, so an `allOf` declaration always takes
//! precedence over a conflicting `anyOf` one.

use serde_json::Value;

/// Whether `schema` places no constraint at all (`{}`).
pub fn is_unconstrained(schema: &Value) -> bool {
    schema.as_object().is_some_and(|map| map.is_empty())
}

/// The fragment of `schema` governing property `name`, if any.
///
/// `None` means "no constraint": the caller accepts any value.
pub fn subschema_for_property<'a>(schema: &'a Value, name: &str) -> Option<&'a Value> {
    if let Some(direct) = schema.get("properties").and_then(|p| p.get(name)) {
        return Some(direct);
    }
    ["allOf", "anyOf"]
        .into_iter()
        .filter_map(|combiner| schema.get(combiner).and_then(Value::as_array))
        .flatten()
        .find_map(|branch| {
            subschema_for_property(branch, name).filter(|found| !is_unconstrained(found))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_property() {
        let schema = json!({"properties": {"filename": {"type": "string"}}});
        assert_eq!(
            subschema_for_property(&schema, "filename"),
            Some(&json!({"type": "string"}))
        );
        assert_eq!(subschema_for_property(&schema, "other"), None);
    }

    #[test]
    fn test_direct_empty_property_is_returned() {
        let schema = json!({
            "properties": {"x": {}},
            "allOf": [{"properties": {"x": {"type": "integer"}}}]
        });
        assert_eq!(subschema_for_property(&schema, "x"), Some(&json!({})));
    }

    #[test]
    fn test_three_levels_of_all_of() {
        let schema = json!({
            "allOf": [
                {"properties": {"a": {"type": "string"}}},
                {"allOf": [
                    {"allOf": [
                        {"properties": {"deep": {"type": "number", "minimum": 0}}}
                    ]}
                ]}
            ]
        });
        assert_eq!(
            subschema_for_property(&schema, "deep"),
            Some(&json!({"type": "number", "minimum": 0}))
        );
    }

    #[test]
    fn test_all_of_beats_later_any_of() {
        let schema = json!({
            "anyOf": [{"properties": {"x": {"type": "string"}}}],
            "allOf": [{"properties": {"x": {"type": "integer"}}}]
        });
        assert_eq!(
            subschema_for_property(&schema, "x"),
            Some(&json!({"type": "integer"}))
        );
    }

    #[test]
    fn test_any_of_used_when_all_of_silent() {
        let schema = json!({
            "allOf": [{"properties": {"y": {"type": "string"}}}],
            "anyOf": [
                {"properties": {"z": {}}},
                {"properties": {"z": {"type": "boolean"}}}
            ]
        });
        assert_eq!(
            subschema_for_property(&schema, "z"),
            Some(&json!({"type": "boolean"}))
        );
    }

    #[test]
    fn test_unconstrained() {
        assert!(is_unconstrained(&json!({})));
        assert!(!is_unconstrained(&json!({"type": "string"})));
        assert!(!is_unconstrained(&json!(true)));
    }
}
