//! # Error Types
//!
//! Errors raised while building core values. Higher crates wrap these in
//! their own error enums with `#[from]`.

use thiserror::Error;

/// Error constructing a core value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RdmError {
    /// A tag identifier did not have the `<namespace>/tags/<name>-<version>` shape.
    #[error("invalid tag identifier {uri:?}: {reason}")]
    InvalidTag {
        /// The rejected identifier.
        uri: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A time string could not be parsed.
    #[error("invalid time {input:?}: {reason}")]
    InvalidTime {
        /// The rejected input.
        input: String,
        /// Parser message.
        reason: String,
    },
}
