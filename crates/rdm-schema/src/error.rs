//! # Error Types
//!
//! - [`SchemaError`]: the schema store could not produce a document.
//! - [`CheckError`]: the raw outcome of checking one value.
//! - [`ValidationError`]: a failed check raised under the strict policy,
//!   or a violation of a fixed enumeration.
//! - [`ValidationWarning`]: the same information, returned (and logged)
//!   when the policy only warns.

use rdm_core::RdmError;
use thiserror::Error;

/// Error producing a schema document or manifest.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// A schema document could not be read or parsed.
    #[error("schema load error for '{name}': {reason}")]
    Load {
        /// File name or schema identifier.
        name: String,
        /// Reason the document could not be loaded.
        reason: String,
    },

    /// The manifest could not be read or parsed.
    #[error("manifest load error for '{path}': {reason}")]
    ManifestLoad {
        /// Path or identifier of the manifest.
        path: String,
        /// Reason the manifest could not be loaded.
        reason: String,
    },

    /// No loaded document carries this schema identifier.
    #[error("no schema with id '{uri}' is registered")]
    UnknownSchema {
        /// The schema identifier that was requested.
        uri: String,
    },

    /// The tag has no definition in the manifest.
    #[error("tag '{tag}' is not defined in the manifest")]
    UnknownTag {
        /// The tag identifier that was requested.
        tag: String,
    },

    /// A core value could not be built from schema data.
    #[error(transparent)]
    Core(#[from] RdmError),

    /// IO error reading schema files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Outcome of a failed structural check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckError {
    /// The value does not satisfy the fragment.
    #[error("{0}")]
    Invalid(String),

    /// The fragment itself could not be compiled.
    #[error("invalid schema fragment: {0}")]
    Schema(String),
}

/// A value was rejected and the policy asked for an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// Dotted path of the attribute being validated.
    pub path: String,
    /// Full message, including the path.
    pub message: String,
}

impl ValidationError {
    /// Build an error for `path` with a preformatted message.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A value was rejected and the policy asked for a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// Dotted path of the attribute being validated.
    pub path: String,
    /// Full message, including the path.
    pub message: String,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}
