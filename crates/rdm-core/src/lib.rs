//! # rdm-core — Foundational Types for the Roman Data Model Nodes
//!
//! This crate is the leaf of the workspace. It defines the raw value tree
//! that node views wrap, the tag identifier newtype, the astronomical time
//! type, and the validation policy that every mutation consumes.
//!
//! ## Key Design Principles
//!
//! 1. **One raw tree type.** [`Value`] is the in-memory form of a data
//!    product: mappings, sequences, scalars, times, opaque arrays and tagged
//!    values. Node views in `rdm-node` borrow it; they never copy it.
//!
//! 2. **Tags are parsed once.** [`TagUri`] validates the
//!    `<namespace>/tags/<name>-<version>` shape at construction, so class
//!    naming and scalar-key derivation never fail later.
//!
//! 3. **Policy is a value, not a global.** [`ValidationPolicy`] is passed
//!    to whoever validates; the core never reads ambient state at
//!    evaluation time.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `rdm-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod domain;
pub mod error;
pub mod policy;
pub mod tag;
pub mod time;
pub mod value;

pub use domain::{enumerated_field_violation, VALID_ORIGIN, VALID_TELESCOPE};
pub use error::RdmError;
pub use policy::{OnInvalid, ValidationPolicy};
pub use tag::TagUri;
pub use time::Time;
pub use value::{Mapping, NdArray, Tagged, Value};
