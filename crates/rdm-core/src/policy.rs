//! # Validation Policy
//!
//! Two flags decide what happens when a mutation fails its schema check:
//! `enabled` turns validation on or off, and `strict` selects between
//! raising an error and emitting a warning while rejecting the write.
//!
//! The policy is a plain `Copy` value handed to the node context. It can be
//! read from configuration (`serde`) or from the environment:
//!
//! | Variable                | Effect when `false`/`0`          |
//! |-------------------------|----------------------------------|
//! | `RDM_VALIDATE`          | mutations are not validated      |
//! | `RDM_STRICT_VALIDATION` | invalid values warn, not raise   |

use serde::{Deserialize, Serialize};

/// Environment variable controlling [`ValidationPolicy::enabled`].
pub const VALIDATE_ENV: &str = "RDM_VALIDATE";

/// Environment variable controlling [`ValidationPolicy::strict`].
pub const STRICT_VALIDATION_ENV: &str = "RDM_STRICT_VALIDATION";

/// What the validation engine does with a value that fails its check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnInvalid {
    /// Accept the value anyway.
    PassThrough,
    /// Emit a warning and reject the value.
    Warn,
    /// Raise a validation error.
    Fail,
}

/// Validation flags consumed at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationPolicy {
    /// Whether attribute writes are validated against their schema fragment.
    pub enabled: bool,
    /// Whether an invalid write raises (`true`) or warns (`false`).
    pub strict: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            strict: true,
        }
    }
}

impl ValidationPolicy {
    /// Validation on, invalid writes raise.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Validation on, invalid writes warn and are rejected.
    pub fn warn_only() -> Self {
        Self {
            enabled: true,
            strict: false,
        }
    }

    /// Validation off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            strict: true,
        }
    }

    /// Read the policy from `RDM_VALIDATE` and `RDM_STRICT_VALIDATION`.
    ///
    /// A flag is switched off by `"false"` or `"0"` (case-insensitive);
    /// any other value, or an absent variable, keeps the default (`true`).
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let flag = |name: &str| {
            lookup(name)
                .map(|v| {
                    let v = v.trim().to_lowercase();
                    v != "false" && v != "0"
                })
                .unwrap_or(true)
        };
        Self {
            enabled: flag(VALIDATE_ENV),
            strict: flag(STRICT_VALIDATION_ENV),
        }
    }

    /// The engine behaviour this policy selects for an invalid value.
    pub fn on_invalid(&self) -> OnInvalid {
        if self.strict {
            OnInvalid::Fail
        } else {
            OnInvalid::Warn
        }
    }
}
