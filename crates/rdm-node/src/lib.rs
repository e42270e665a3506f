//! # rdm-node — Tagged-Node Object Model
//!
//! Attribute-style views over a raw data-product tree, validated against
//! the schema package as they are written.
//!
//! ## Node views (`dnode`, `lnode`)
//!
//! [`DNode`] wraps one mapping of the tree and [`LNode`] one sequence.
//! Reading a nested mapping or sequence yields another view over the same
//! storage, so writes through any view land in the original tree. Every
//! [`DNode::set`] is checked against the schema fragment governing the
//! attribute, found through the node's [`SchemaScope`], and then committed,
//! rejected with a warning, or refused with an error according to the
//! [`ValidationPolicy`](rdm_core::ValidationPolicy) in the [`NodeContext`].
//!
//! ## Classes (`class`, `registry`, `handwritten`)
//!
//! [`NodeRegistry::synthesize`] turns the datamodels manifest into one
//! [`NodeClass`] per tag: objects, lists and scalars. `WfiMode`, `CalLogs`
//! and `FileDate` are defined by hand and registered first.
//!
//! ## Tagged nodes (`tagged`, `convert`)
//!
//! [`TaggedObjectNode`], [`TaggedListNode`] and [`TaggedScalarNode`] own
//! their data and carry a fixed class. [`NodeConverter`] is the plain-form
//! contract the serialization layer relies on.
//!
//! ## Crate Policy
//!
//! - Depends on `rdm-core` and `rdm-schema` internally.
//! - Views never copy the tree they wrap.
//! - No `unsafe` code.

pub mod class;
pub mod context;
pub mod convert;
pub mod dnode;
pub mod error;
pub mod handwritten;
pub mod lnode;
pub mod registry;
pub mod scope;
pub mod tagged;

pub use class::{NodeClass, NodeKind, ScalarBase};
pub use context::NodeContext;
pub use convert::NodeConverter;
pub use dnode::{flatten_mapping, Attr, DNode, WriteOutcome};
pub use error::{NodeError, RegistryError};
pub use handwritten::WfiMode;
pub use lnode::LNode;
pub use registry::NodeRegistry;
pub use scope::SchemaScope;
pub use tagged::{TaggedListNode, TaggedNode, TaggedObjectNode, TaggedScalarNode};
