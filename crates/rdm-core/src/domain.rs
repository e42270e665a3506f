//! # Domain Enumerations
//!
//! Two fields are part of the wire contract and are enforced on every
//! write regardless of the validation policy: the producing institution
//! (`origin`) and the telescope.

use crate::value::Value;

/// Accepted values of the `origin` field.
pub const VALID_ORIGIN: &[&str] = &["STSCI", "IPAC/SSC"];

/// Accepted values of the `telescope` field.
pub const VALID_TELESCOPE: &[&str] = &["ROMAN"];

/// Check a write to `key` against the fixed enumerations.
///
/// Returns the violation message when `key` is `origin` or `telescope` and
/// the value (looking through tags) is not one of the accepted strings.
/// Other keys always pass.
pub fn enumerated_field_violation(key: &str, value: &Value) -> Option<String> {
    let allowed = match key {
        "origin" => VALID_ORIGIN,
        "telescope" => VALID_TELESCOPE,
        _ => return None,
    };
    match value.as_str() {
        Some(s) if allowed.contains(&s) => None,
        _ => Some(format!("{key} must be one of {allowed:?}")),
    }
}
