//! # Validation Engine
//!
//! Checks one value against one schema fragment and applies the
//! pass-through / warn / fail policy.
//!
//! ## The check
//!
//! The fragment is compiled as a JSON Schema draft 4 document (the dialect
//! the data-model schemas are written in) and run over the value's JSON
//! instance form ([`Value::to_json`]). Before compilation every `type`
//! keyword is widened to admit `null`: unset attributes are stored as null
//! throughout a data product, and a null is never a type error.
//!
//! Tags are not part of the JSON instance, so the `tag` keyword is checked
//! separately against the value's explicit tag (or the implicit tag of an
//! array or time). Patterns may contain `*` wildcards.
//!
//! ## Policy
//!
//! | [`OnInvalid`]  | Result for an invalid value                          |
//! |----------------|------------------------------------------------------|
//! | `PassThrough`  | [`Verdict::Accept`]                                  |
//! | `Warn`         | `tracing::warn!` + [`Verdict::Reject`]               |
//! | `Fail`         | `Err(ValidationError)`                               |
//!
//! A fragment that does not compile is always an error.

use jsonschema::{Retrieve, Uri};
use rdm_core::tag::tag_matches;
use rdm_core::{OnInvalid, Value};
use serde_json::{json, Value as JsonValue};

use crate::error::{CheckError, ValidationError, ValidationWarning};

/// Errors longer than this many characters are truncated in messages.
const MAX_ERROR_CHARS: usize = 2000;

/// Characters kept from a truncated error, before the `" ..."` marker.
const TRUNCATED_ERROR_CHARS: usize = 1996;

/// Keys stripped from the top of a fragment before compilation.
const DOCUMENT_KEYS: &[&str] = &["id", "$id", "$schema"];

/// Outcome of [`evaluate`] when no error was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The value may be committed.
    Accept,
    /// The value was rejected; the warning has already been logged.
    Reject(ValidationWarning),
}

impl Verdict {
    /// Whether the value may be committed.
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// References are inlined by the registry before a fragment reaches the
/// engine. Anything left over is treated as unconstrained rather than
/// fetched.
struct NoRemoteRetriever;

impl Retrieve for NoRemoteRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<JsonValue, Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(uri = %uri.as_str(), "unresolved reference in fragment; treating as unconstrained");
        Ok(json!({}))
    }
}

/// Check `value` against `fragment`.
///
/// # Errors
///
/// [`CheckError::Invalid`] with the first violation found, or
/// [`CheckError::Schema`] if the fragment cannot be compiled.
pub fn check_value(value: &Value, fragment: &JsonValue) -> Result<(), CheckError> {
    if value.is_null() {
        return Ok(());
    }

    check_tags(value, fragment)?;

    let mut schema = fragment.clone();
    if let JsonValue::Object(map) = &mut schema {
        for key in DOCUMENT_KEYS {
            map.remove(*key);
        }
    }
    admit_null(&mut schema);

    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft4);
    opts.with_retriever(NoRemoteRetriever);
    let validator = opts
        .build(&schema)
        .map_err(|e| CheckError::Schema(e.to_string()))?;

    let instance = value.to_json();
    let first = validator.iter_errors(&instance).next().map(|e| {
        let location = e.instance_path.to_string();
        if location.is_empty() {
            e.to_string()
        } else {
            format!("{e} (at {location})")
        }
    });
    match first {
        Some(message) => Err(CheckError::Invalid(message)),
        None => Ok(()),
    }
}

/// Check `value`, written at dotted `path`, against `fragment` and apply
/// the `on_invalid` policy.
///
/// # Errors
///
/// A [`ValidationError`] when the value is invalid under
/// [`OnInvalid::Fail`], or when the fragment itself is invalid.
pub fn evaluate(
    path: &str,
    value: &Value,
    fragment: &JsonValue,
    on_invalid: OnInvalid,
) -> Result<Verdict, ValidationError> {
    match check_value(value, fragment) {
        Ok(()) => Ok(Verdict::Accept),
        Err(err @ CheckError::Schema(_)) => Err(ValidationError::new(
            path,
            error_message(path, &err.to_string()),
        )),
        Err(CheckError::Invalid(error)) => {
            let message = error_message(path, &error);
            match on_invalid {
                OnInvalid::PassThrough => Ok(Verdict::Accept),
                OnInvalid::Fail => Err(ValidationError::new(path, message)),
                OnInvalid::Warn => {
                    tracing::warn!(path = %path, "{message}");
                    Ok(Verdict::Reject(ValidationWarning {
                        path: path.to_string(),
                        message,
                    }))
                }
            }
        }
    }
}

/// Format the message reported for a failed check at `path`.
///
/// Errors longer than 2000 characters keep their first 1996 characters
/// followed by `" ..."`.
pub fn error_message(path: &str, error: &str) -> String {
    let error = if error.chars().count() > MAX_ERROR_CHARS {
        let head: String = error.chars().take(TRUNCATED_ERROR_CHARS).collect();
        format!("{head} ...")
    } else {
        error.to_string()
    };
    format!("While validating {path} the following error occurred:\n{error}")
}

/// Widen every `type` keyword below `schema` to also admit `null`.
fn admit_null(schema: &mut JsonValue) {
    match schema {
        JsonValue::Object(map) => {
            let widened = match map.get("type") {
                Some(JsonValue::String(t)) if t != "null" => Some(json!([t, "null"])),
                Some(JsonValue::Array(types)) if !types.iter().any(|t| t == "null") => {
                    let mut types = types.clone();
                    types.push(json!("null"));
                    Some(JsonValue::Array(types))
                }
                _ => None,
            };
            if let Some(widened) = widened {
                map.insert("type".to_string(), widened);
            }
            for child in map.values_mut() {
                admit_null(child);
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(admit_null),
        _ => {}
    }
}

/// Check the `tag` keyword of `fragment` and of the subschemas reached
/// through `properties`, `items`, `allOf` and `anyOf`.
fn check_tags(value: &Value, fragment: &JsonValue) -> Result<(), CheckError> {
    if value.is_null() {
        return Ok(());
    }

    if let Some(pattern) = fragment.get("tag").and_then(JsonValue::as_str) {
        let matched = value.tag_str().is_some_and(|tag| tag_matches(pattern, tag));
        if !matched {
            return Err(CheckError::Invalid(format!(
                "mismatched tags, wanted '{pattern}', got '{}'",
                value.tag_str().unwrap_or("untagged")
            )));
        }
    }

    let inner = value.untagged();

    if let (Some(properties), Value::Mapping(map)) =
        (fragment.get("properties").and_then(JsonValue::as_object), inner)
    {
        for (name, subschema) in properties {
            if let Some(child) = map.get(name) {
                check_tags(child, subschema)?;
            }
        }
    }

    if let Value::Sequence(items) = inner {
        match fragment.get("items") {
            Some(JsonValue::Array(positional)) => {
                for (item, subschema) in items.iter().zip(positional) {
                    check_tags(item, subschema)?;
                }
            }
            Some(subschema @ JsonValue::Object(_)) => {
                for item in items {
                    check_tags(item, subschema)?;
                }
            }
            _ => {}
        }
    }

    if let Some(branches) = fragment.get("allOf").and_then(JsonValue::as_array) {
        for branch in branches {
            check_tags(value, branch)?;
        }
    }

    if let Some(branches) = fragment.get("anyOf").and_then(JsonValue::as_array) {
        let mut first_error = None;
        for branch in branches {
            match check_tags(value, branch) {
                Ok(()) => {
                    first_error = None;
                    break;
                }
                Err(err) => {
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdm_core::{Mapping, NdArray, TagUri, Tagged, Time};

    fn tagged(uri: &str, value: impl Into<Value>) -> Value {
        Value::Tagged(Tagged::new(TagUri::parse(uri).unwrap(), value))
    }

    #[test]
    fn test_valid_value_accepted() {
        let fragment = json!({"type": "string"});
        assert_eq!(check_value(&Value::from("abc"), &fragment), Ok(()));
        assert_eq!(
            evaluate("meta.filename", &Value::from("abc"), &fragment, OnInvalid::Fail),
            Ok(Verdict::Accept)
        );
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let fragment = json!({"type": "string"});
        assert!(matches!(
            check_value(&Value::Int(3), &fragment),
            Err(CheckError::Invalid(_))
        ));
    }

    #[test]
    fn test_null_always_accepted() {
        let fragment = json!({"type": "integer", "minimum": 10});
        assert_eq!(check_value(&Value::Null, &fragment), Ok(()));
    }

    #[test]
    fn test_nested_null_not_a_type_error() {
        let fragment = json!({
            "type": "object",
            "properties": {
                "start": {"type": "number"},
                "kinds": {"type": ["string", "integer"]}
            }
        });
        let value = Value::from(json!({"start": null, "kinds": null}));
        assert_eq!(check_value(&value, &fragment), Ok(()));
    }

    #[test]
    fn test_admit_null_leaves_property_named_type() {
        let mut schema = json!({
            "type": "object",
            "properties": {"type": {"type": "string"}}
        });
        admit_null(&mut schema);
        assert_eq!(schema["type"], json!(["object", "null"]));
        assert_eq!(schema["properties"]["type"]["type"], json!(["string", "null"]));
    }

    #[test]
    fn test_fail_policy_raises_with_path() {
        let fragment = json!({"type": "string"});
        let err = evaluate("meta.filename", &Value::Int(3), &fragment, OnInvalid::Fail)
            .unwrap_err();
        assert_eq!(err.path, "meta.filename");
        assert!(err
            .message
            .starts_with("While validating meta.filename the following error occurred:\n"));
    }

    #[test]
    fn test_warn_policy_rejects_without_error() {
        let fragment = json!({"type": "string"});
        let verdict =
            evaluate("meta.filename", &Value::Int(3), &fragment, OnInvalid::Warn).unwrap();
        match verdict {
            Verdict::Reject(warning) => {
                assert_eq!(warning.path, "meta.filename");
                assert!(warning.message.contains("meta.filename"));
            }
            Verdict::Accept => panic!("expected rejection"),
        }
    }

    #[test]
    fn test_pass_through_accepts_invalid() {
        let fragment = json!({"type": "string"});
        assert_eq!(
            evaluate("x", &Value::Int(3), &fragment, OnInvalid::PassThrough),
            Ok(Verdict::Accept)
        );
    }

    #[test]
    fn test_invalid_fragment_always_errors() {
        let fragment = json!({"type": 12});
        assert!(matches!(
            check_value(&Value::Int(3), &fragment),
            Err(CheckError::Schema(_))
        ));
        assert!(evaluate("x", &Value::Int(3), &fragment, OnInvalid::PassThrough).is_err());
    }

    #[test]
    fn test_error_message_truncation() {
        let short = error_message("a.b", "bad");
        assert_eq!(short, "While validating a.b the following error occurred:\nbad");

        let exact = "e".repeat(2000);
        assert!(error_message("a", &exact).ends_with(&exact));

        let long = "e".repeat(2001);
        let message = error_message("a", &long);
        let error = message
            .strip_prefix("While validating a the following error occurred:\n")
            .unwrap();
        assert_eq!(error.chars().count(), 2000);
        assert!(error.ends_with("e ..."));
    }

    #[test]
    fn test_tag_keyword() {
        let fragment = json!({"tag": "asdf://stsci.edu/datamodels/roman/tags/file_date-1.*"});
        let good = tagged(
            "asdf://stsci.edu/datamodels/roman/tags/file_date-1.0.0",
            Time::parse("2020-01-01T00:00:00").unwrap(),
        );
        assert_eq!(check_value(&good, &fragment), Ok(()));

        let err = check_value(&Value::from("2020-01-01"), &fragment).unwrap_err();
        assert_eq!(
            err,
            CheckError::Invalid(
                "mismatched tags, wanted 'asdf://stsci.edu/datamodels/roman/tags/file_date-1.*', got 'untagged'"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_implicit_tags() {
        let fragment = json!({"tag": "tag:stsci.edu:asdf/core/ndarray-1.*"});
        let array = Value::Array(NdArray::new("float32", vec![2, 2], vec![0; 16]));
        assert_eq!(check_value(&array, &fragment), Ok(()));
        let time = Value::Time(Time::parse("2020-01-01").unwrap());
        assert!(check_value(&time, &fragment).is_err());
    }

    #[test]
    fn test_nested_tag_through_properties_and_all_of() {
        let fragment = json!({
            "allOf": [{
                "properties": {
                    "origin": {"tag": "asdf://stsci.edu/datamodels/roman/tags/origin-1.0.0"}
                }
            }]
        });
        let mut map = Mapping::new();
        map.insert("origin".into(), Value::from("STSCI"));
        assert!(check_value(&Value::Mapping(map.clone()), &fragment).is_err());

        map.insert(
            "origin".into(),
            tagged("asdf://stsci.edu/datamodels/roman/tags/origin-1.0.0", "STSCI"),
        );
        assert_eq!(check_value(&Value::Mapping(map), &fragment), Ok(()));
    }

    #[test]
    fn test_tag_through_items() {
        let fragment = json!({
            "type": "array",
            "items": {"tag": "tag:stsci.edu:asdf/time/time-1.*"}
        });
        let good = Value::Sequence(vec![Value::Time(Time::parse("2020-01-01").unwrap())]);
        assert_eq!(check_value(&good, &fragment), Ok(()));
        let bad = Value::Sequence(vec![Value::from("2020-01-01")]);
        assert!(check_value(&bad, &fragment).is_err());
    }

    #[test]
    fn test_tag_any_of_one_branch_suffices() {
        let fragment = json!({
            "anyOf": [
                {"tag": "tag:stsci.edu:asdf/core/ndarray-1.*"},
                {"tag": "tag:stsci.edu:asdf/time/time-1.*"}
            ]
        });
        let time = Value::Time(Time::parse("2020-01-01").unwrap());
        assert_eq!(check_value(&time, &fragment), Ok(()));
        assert!(check_value(&Value::Int(1), &fragment).is_err());
    }

    #[test]
    fn test_schema_keys_stripped() {
        let fragment = json!({
            "$schema": "asdf://stsci.edu/datamodels/roman/schemas/rad_schema-1.0.0",
            "id": "asdf://stsci.edu/datamodels/roman/schemas/exposure-1.0.0",
            "type": "object",
            "properties": {"start_time": {"type": "string"}}
        });
        let value = Value::from(json!({"start_time": "2020-01-01"}));
        assert_eq!(check_value(&value, &fragment), Ok(()));
    }
}
