//! # rdm-schema — Schema Registry, Resolution & Validation
//!
//! Everything the node layer needs to know about schemas, and nothing about
//! nodes.
//!
//! ## Registry (`registry`, `manifest`)
//!
//! [`SchemaRegistry`] is the seam to the schema document store: it hands
//! out the [`Manifest`] of tag definitions and schema documents by URI, and
//! resolves `$ref`s before returning the schema for a tag. Two
//! implementations are provided: [`InMemorySchemaRegistry`] and
//! [`DirSchemaRegistry`], which loads a schema package from disk (YAML or
//! JSON documents indexed by their `id`).
//!
//! ## Subschema search (`resolve`)
//!
//! [`subschema_for_property`] narrows a schema to the fragment governing
//! one property, looking through `allOf` before `anyOf`.
//!
//! ## Validation engine (`validate`)
//!
//! [`evaluate`] checks one value against one fragment and applies the
//! pass-through / warn / fail policy.
//!
//! ## Crate Policy
//!
//! - Depends only on `rdm-core` internally.
//! - No network access: unresolved references validate as "no constraint".

pub mod error;
pub mod manifest;
pub mod registry;
pub mod resolve;
pub mod validate;

pub use error::{CheckError, SchemaError, ValidationError, ValidationWarning};
pub use manifest::{Manifest, TagDefinition};
pub use registry::{resolve_references, DirSchemaRegistry, InMemorySchemaRegistry, SchemaRegistry};
pub use resolve::{is_unconstrained, subschema_for_property};
pub use validate::{check_value, error_message, evaluate, Verdict};
