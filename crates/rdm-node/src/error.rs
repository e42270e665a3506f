//! # Error Types
//!
//! - [`NodeError`]: a read, write or conversion on a node failed.
//! - [`RegistryError`]: node classes could not be synthesized. Fatal at
//!   startup; `Clone` so the process-wide registry can hand the same error
//!   to every caller.

use rdm_core::RdmError;
use rdm_schema::{SchemaError, ValidationError};
use thiserror::Error;

/// Error operating on a node.
#[derive(Error, Debug)]
pub enum NodeError {
    /// A raw value had the wrong shape for the node being built.
    #[error("cannot build a {expected} node from a {found} value")]
    Construction {
        /// The accepted shape.
        expected: &'static str,
        /// The shape that was supplied.
        found: &'static str,
    },

    /// The key is not present in the node.
    #[error("No such attribute ({key}) found in node")]
    AttributeNotFound {
        /// The requested key.
        key: String,
    },

    /// A sequence index was past the end.
    #[error("index {index} out of range for a sequence of length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// Length of the sequence.
        len: usize,
    },

    /// A value failed validation under the strict policy, or violated a
    /// fixed enumeration.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The schema governing the node could not be obtained.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// No node class is registered for the tag.
    #[error("no node class is registered for tag '{tag}'")]
    UnknownTag {
        /// The tag identifier.
        tag: String,
    },

    /// A core value could not be built, e.g. an unparseable time.
    #[error(transparent)]
    Core(#[from] RdmError),
}

/// Error building the node class registries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two classes were registered under the same tag.
    #[error("node class for tag '{tag}' has been defined twice (already registered as {existing})")]
    DuplicateTag {
        /// The contested tag.
        tag: String,
        /// Name of the class registered first.
        existing: String,
    },

    /// A built-in tag identifier did not parse.
    #[error(transparent)]
    InvalidTag(#[from] RdmError),

    /// The manifest could not be loaded.
    #[error("cannot load tag manifest: {0}")]
    Manifest(String),
}

impl From<SchemaError> for RegistryError {
    fn from(err: SchemaError) -> Self {
        RegistryError::Manifest(err.to_string())
    }
}
