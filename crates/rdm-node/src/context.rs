//! # Node Context
//!
//! The [`NodeContext`] is what every node view carries: the node class
//! registry, the schema registry, the validation policy in force, and a
//! per-tag cache of resolved schemas shared by all views created from it.
//!
//! ## Thread Safety
//!
//! `NodeContext` is `!Sync` (the policy and the schema cache are cells).
//! Build one context per thread; the class and schema registries behind it
//! are shared through `Arc`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use rdm_core::{TagUri, ValidationPolicy};
use rdm_schema::{SchemaError, SchemaRegistry};
use serde_json::Value as JsonValue;

use crate::error::RegistryError;
use crate::registry::NodeRegistry;

/// Registries, policy and schema cache consulted by node views.
pub struct NodeContext {
    classes: Arc<NodeRegistry>,
    schemas: Arc<dyn SchemaRegistry>,
    policy: Cell<ValidationPolicy>,
    schema_cache: RefCell<HashMap<TagUri, Rc<JsonValue>>>,
}

impl NodeContext {
    /// Create a context over existing registries.
    ///
    /// The initial policy is read from the environment
    /// ([`ValidationPolicy::from_env`]).
    pub fn new(classes: Arc<NodeRegistry>, schemas: Arc<dyn SchemaRegistry>) -> Self {
        Self {
            classes,
            schemas,
            policy: Cell::new(ValidationPolicy::from_env()),
            schema_cache: RefCell::new(HashMap::new()),
        }
    }

    /// Synthesize a private class registry from the schema registry's
    /// manifest and build a context over both.
    pub fn from_schemas(schemas: Arc<dyn SchemaRegistry>) -> Result<Self, RegistryError> {
        let classes = NodeRegistry::synthesize(schemas.manifest())?;
        Ok(Self::new(Arc::new(classes), schemas))
    }

    /// Build a context over the process-wide class registry, initializing
    /// it from `schemas` on first use.
    pub fn global(schemas: Arc<dyn SchemaRegistry>) -> Result<Self, RegistryError> {
        let classes = NodeRegistry::init_global(schemas.as_ref())?;
        Ok(Self::new(classes, schemas))
    }

    /// Replace the policy, builder style.
    pub fn with_policy(self, policy: ValidationPolicy) -> Self {
        self.policy.set(policy);
        self
    }

    /// The policy in force.
    pub fn policy(&self) -> ValidationPolicy {
        self.policy.get()
    }

    /// Change the policy of a live context. Applies to every later write
    /// through any view built on this context.
    pub fn set_policy(&self, policy: ValidationPolicy) {
        self.policy.set(policy);
    }

    pub fn classes(&self) -> &NodeRegistry {
        &self.classes
    }

    pub fn schemas(&self) -> &dyn SchemaRegistry {
        self.schemas.as_ref()
    }

    /// The resolved schema for `tag`, fetched once per context.
    pub fn schema_for_tag(&self, tag: &TagUri) -> Result<Rc<JsonValue>, SchemaError> {
        if let Some(schema) = self.schema_cache.borrow().get(tag) {
            return Ok(Rc::clone(schema));
        }
        let schema = Rc::new(self.schemas.schema_for_tag(tag)?);
        tracing::debug!(tag = %tag, "resolved schema for tag");
        self.schema_cache
            .borrow_mut()
            .insert(tag.clone(), Rc::clone(&schema));
        Ok(schema)
    }

    /// Number of tag schemas cached so far.
    pub fn cached_schemas(&self) -> usize {
        self.schema_cache.borrow().len()
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("classes", &self.classes.len())
            .field("policy", &self.policy.get())
            .field("cached_schemas", &self.cached_schemas())
            .finish()
    }
}
