//! # Mapping Nodes
//!
//! A [`DNode`] is a view over one mapping of the raw tree. Reads wrap
//! nested mappings and sequences into further views; writes to existing
//! keys are checked against the node's schema fragment before they are
//! committed.
//!
//! ## Writes
//!
//! [`DNode::set`] runs, in order:
//!
//! 1. The `origin` / `telescope` enumeration check, whatever the policy.
//! 2. Auto-promotion through the scalar-key table.
//! 3. The key must already exist: assignment never introduces keys.
//! 4. When validation is enabled, the fragment for the key is located in
//!    this node's (memoized) schema and the value is evaluated against it.
//!    The raw entry is replaced only if the value is accepted.
//!
//! [`DNode::insert`] is the unchecked path that may add keys.
//!
//! ## Private keys
//!
//! Keys starting with `_` never reach the raw mapping or the schema check.
//! They live in storage local to the node: a view of a
//! [`TaggedObjectNode`](crate::TaggedObjectNode) shares the owner's
//! storage, a view created on read has its own and loses it when dropped.

use std::collections::BTreeMap;
use std::rc::Rc;

use rdm_core::value::datetime_isoformat;
use rdm_core::{enumerated_field_violation, Mapping, TagUri, Tagged, Value};
use rdm_schema::{
    evaluate, is_unconstrained, subschema_for_property, ValidationError, ValidationWarning,
    Verdict,
};
use serde_json::Value as JsonValue;

use crate::context::NodeContext;
use crate::error::NodeError;
use crate::lnode::LNode;
use crate::scope::{join_path, SchemaScope};

/// Result of a [`DNode::set`] that raised no error.
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The value was stored.
    Committed,
    /// The value failed validation under the warn policy and was not
    /// stored. The warning has already been logged.
    Rejected(ValidationWarning),
}

impl WriteOutcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, WriteOutcome::Committed)
    }
}

/// What an attribute read produced.
#[derive(Debug)]
pub enum Attr<'n> {
    /// A nested mapping, wrapped.
    Node(DNode<'n>),
    /// A nested sequence, wrapped.
    List(LNode<'n>),
    /// Any other value, auto-promoted.
    Value(Value),
}

impl Attr<'_> {
    /// Short name of the shape, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Attr::Node(_) => "mapping",
            Attr::List(_) => "sequence",
            Attr::Value(value) => value.type_name(),
        }
    }

    /// The plain value, if this is neither a node nor a list.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Attr::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Convert to an owned value, cloning wrapped data.
    pub fn into_value(self) -> Value {
        match self {
            Attr::Node(node) => node.to_value(),
            Attr::List(list) => list.to_value(),
            Attr::Value(value) => value,
        }
    }
}

/// Node-local storage for private keys.
#[derive(Debug)]
pub(crate) enum Private<'a> {
    Owned(Mapping),
    Shared(&'a mut Mapping),
}

impl Default for Private<'_> {
    fn default() -> Self {
        Private::Owned(Mapping::new())
    }
}

impl Private<'_> {
    fn map(&self) -> &Mapping {
        match self {
            Private::Owned(map) => map,
            Private::Shared(map) => map,
        }
    }

    fn map_mut(&mut self) -> &mut Mapping {
        match self {
            Private::Owned(map) => map,
            Private::Shared(map) => map,
        }
    }
}

/// Shape of a raw entry, decided before taking a mutable borrow of it.
pub(crate) enum Shape {
    Mapping(Option<TagUri>),
    Sequence(Option<TagUri>),
    Leaf,
}

impl Shape {
    pub(crate) fn of(value: &Value) -> Self {
        let tag = match value {
            Value::Tagged(tagged) => Some(tagged.tag().clone()),
            _ => None,
        };
        match value.untagged() {
            Value::Mapping(_) => Shape::Mapping(tag),
            Value::Sequence(_) => Shape::Sequence(tag),
            _ => Shape::Leaf,
        }
    }
}

pub(crate) fn is_private(key: &str) -> bool {
    key.starts_with('_')
}

fn not_found(key: &str) -> NodeError {
    NodeError::AttributeNotFound {
        key: key.to_string(),
    }
}

/// A view over one mapping of the raw tree.
#[derive(Debug)]
pub struct DNode<'a> {
    data: &'a mut Mapping,
    scope: Rc<SchemaScope>,
    ctx: &'a NodeContext,
    private: Private<'a>,
}

impl<'a> DNode<'a> {
    /// Wrap `raw` as a node with no parent and no tag.
    ///
    /// A null `raw` is replaced by an empty mapping.
    ///
    /// # Errors
    ///
    /// [`NodeError::Construction`] if `raw` is neither a mapping nor null.
    pub fn new(raw: &'a mut Value, ctx: &'a NodeContext) -> Result<Self, NodeError> {
        Self::with_scope(raw, SchemaScope::detached(), ctx)
    }

    /// Wrap `raw` as the child `name` of the node whose scope is `parent`.
    pub fn with_parent(
        raw: &'a mut Value,
        parent: &Rc<SchemaScope>,
        name: &str,
        ctx: &'a NodeContext,
    ) -> Result<Self, NodeError> {
        Self::with_scope(raw, SchemaScope::child(parent, name), ctx)
    }

    /// Wrap `raw` with an explicit schema scope.
    pub fn with_scope(
        raw: &'a mut Value,
        scope: Rc<SchemaScope>,
        ctx: &'a NodeContext,
    ) -> Result<Self, NodeError> {
        if raw.is_null() {
            *raw = Value::Mapping(Mapping::new());
        }
        match raw {
            Value::Mapping(data) => Ok(Self::wrap(data, scope, ctx, Private::default())),
            other => Err(NodeError::Construction {
                expected: "mapping",
                found: other.type_name(),
            }),
        }
    }

    /// Wrap a mapping directly, with no parent and no tag.
    pub fn from_mapping(data: &'a mut Mapping, ctx: &'a NodeContext) -> Self {
        Self::wrap(data, SchemaScope::detached(), ctx, Private::default())
    }

    pub(crate) fn wrap(
        data: &'a mut Mapping,
        scope: Rc<SchemaScope>,
        ctx: &'a NodeContext,
        private: Private<'a>,
    ) -> Self {
        Self {
            data,
            scope,
            ctx,
            private,
        }
    }

    /// Read attribute `key`.
    ///
    /// Nested mappings come back as [`Attr::Node`] (a tagged mapping starts
    /// a new schema root for its tag), nested sequences as [`Attr::List`],
    /// anything else as an auto-promoted [`Attr::Value`]. The raw mapping is
    /// never modified by a read.
    ///
    /// # Errors
    ///
    /// [`NodeError::AttributeNotFound`] if the key is absent, or
    /// [`NodeError::Core`] if promotion to a time scalar fails.
    pub fn get(&mut self, key: &str) -> Result<Attr<'_>, NodeError> {
        if is_private(key) {
            return self
                .private
                .map()
                .get(key)
                .cloned()
                .map(Attr::Value)
                .ok_or_else(|| not_found(key));
        }

        let ctx = self.ctx;
        let shape = Shape::of(self.data.get(key).ok_or_else(|| not_found(key))?);
        match shape {
            Shape::Mapping(tag) => {
                let scope = match tag {
                    Some(tag) => SchemaScope::tagged_child(&self.scope, key, tag),
                    None => SchemaScope::child(&self.scope, key),
                };
                let data = self
                    .data
                    .get_mut(key)
                    .and_then(|value| value.untagged_mut().as_mapping_mut())
                    .ok_or_else(|| not_found(key))?;
                Ok(Attr::Node(DNode::wrap(data, scope, ctx, Private::default())))
            }
            Shape::Sequence(tag) => {
                let path = self.scope.attribute_path(key);
                let data = self
                    .data
                    .get_mut(key)
                    .and_then(|value| value.untagged_mut().as_sequence_mut())
                    .ok_or_else(|| not_found(key))?;
                Ok(Attr::List(LNode::wrap(data, tag, path, ctx)))
            }
            Shape::Leaf => self.value(key).map(Attr::Value),
        }
    }

    /// Write attribute `key`, validating against the schema when the
    /// context's policy enables it.
    ///
    /// # Errors
    ///
    /// - [`NodeError::Validation`] for an `origin` / `telescope` value
    ///   outside its enumeration, or an invalid value under the strict
    ///   policy.
    /// - [`NodeError::AttributeNotFound`] if the key is absent.
    /// - [`NodeError::Schema`] if this node's schema cannot be obtained.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<WriteOutcome, NodeError> {
        let value = value.into();
        if is_private(key) {
            self.private.map_mut().insert(key.to_string(), value);
            return Ok(WriteOutcome::Committed);
        }

        let path = self.scope.attribute_path(key);
        if let Some(message) = enumerated_field_violation(key, &value) {
            return Err(ValidationError::new(path, message).into());
        }
        let value = self.ctx.classes().promote(key, value)?;
        if !self.data.contains_key(key) {
            return Err(not_found(key));
        }

        let policy = self.ctx.policy();
        if policy.enabled {
            let fragment = self.scope.resolve(self.ctx)?;
            if let Some(subschema) =
                subschema_for_property(&fragment, key).filter(|s| !is_unconstrained(s))
            {
                if let Verdict::Reject(warning) =
                    evaluate(&path, &value, subschema, policy.on_invalid())?
                {
                    return Ok(WriteOutcome::Rejected(warning));
                }
            }
        }

        self.data.insert(key.to_string(), value);
        Ok(WriteOutcome::Committed)
    }

    /// Add or replace `key` without validation.
    ///
    /// The value is auto-promoted, and so are the values of a mapping
    /// inserted directly. This is the only way to introduce a new key.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Result<(), NodeError> {
        let ctx = self.ctx;
        let classes = ctx.classes();
        let mut value = classes.promote(key, value.into())?;
        if let Value::Mapping(map) = &mut value {
            for (sub_key, sub_value) in map.iter_mut() {
                let current = std::mem::replace(sub_value, Value::Null);
                *sub_value = classes.promote(sub_key, current)?;
            }
        }
        if is_private(key) {
            self.private.map_mut().insert(key.to_string(), value);
        } else {
            self.data.insert(key.to_string(), value);
        }
        Ok(())
    }

    /// Remove `key` without validation, returning its raw value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        if is_private(key) {
            self.private.map_mut().remove(key)
        } else {
            self.data.remove(key)
        }
    }

    /// The auto-promoted value of `key`, cloned.
    pub fn value(&self, key: &str) -> Result<Value, NodeError> {
        let value = if is_private(key) {
            self.private.map().get(key)
        } else {
            self.data.get(key)
        };
        let value = value.cloned().ok_or_else(|| not_found(key))?;
        self.ctx.classes().promote(key, value)
    }

    /// The nested mapping `key`, wrapped.
    pub fn node(&mut self, key: &str) -> Result<DNode<'_>, NodeError> {
        match self.get(key)? {
            Attr::Node(node) => Ok(node),
            other => Err(NodeError::Construction {
                expected: "mapping",
                found: other.type_name(),
            }),
        }
    }

    /// The nested sequence `key`, wrapped.
    pub fn list(&mut self, key: &str) -> Result<LNode<'_>, NodeError> {
        match self.get(key)? {
            Attr::List(list) => Ok(list),
            other => Err(NodeError::Construction {
                expected: "sequence",
                found: other.type_name(),
            }),
        }
    }

    /// The schema fragment governing this node, resolved once and then
    /// memoized on the node's scope.
    pub fn schema(&self) -> Result<Rc<JsonValue>, NodeError> {
        self.scope.resolve(self.ctx)
    }

    /// The tag, when this node is a typed root.
    pub fn tag(&self) -> Option<&TagUri> {
        self.scope.tag()
    }

    /// Key under which this node is reachable from its parent.
    pub fn name(&self) -> Option<&str> {
        self.scope.name()
    }

    /// Dotted path from the outermost node.
    pub fn path(&self) -> &str {
        self.scope.path()
    }

    pub fn scope(&self) -> &Rc<SchemaScope> {
        &self.scope
    }

    pub fn context(&self) -> &NodeContext {
        self.ctx
    }

    /// Public keys, in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.data.keys().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        if is_private(key) {
            self.private.map().contains_key(key)
        } else {
            self.data.contains_key(key)
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The raw mapping.
    pub fn raw(&self) -> &Mapping {
        &*self.data
    }

    /// The node as an owned value, tagged when the node is typed.
    pub fn to_value(&self) -> Value {
        let map = Value::Mapping(self.data.clone());
        match self.scope.tag() {
            Some(tag) => Value::Tagged(Tagged::new(tag.clone(), map)),
            None => map,
        }
    }

    /// Flatten to dot-joined paths of leaf values.
    ///
    /// Nulls are skipped, date-times and times become their ISO strings,
    /// and arrays are left out unless `include_arrays` is set.
    pub fn flatten(&self, include_arrays: bool) -> BTreeMap<String, Value> {
        flatten_mapping(&*self.data, include_arrays)
    }
}

/// Flatten `map` to dot-joined paths of leaf values. See
/// [`DNode::flatten`].
pub fn flatten_mapping(map: &Mapping, include_arrays: bool) -> BTreeMap<String, Value> {
    let mut flat = BTreeMap::new();
    for (key, value) in map {
        flatten_into(key, value, include_arrays, &mut flat);
    }
    flat
}

fn flatten_into(
    path: &str,
    value: &Value,
    include_arrays: bool,
    flat: &mut BTreeMap<String, Value>,
) {
    match value {
        Value::Null => {}
        Value::Tagged(tagged) => flatten_into(path, tagged.value(), include_arrays, flat),
        Value::Mapping(map) => {
            for (key, child) in map {
                flatten_into(&join_path(path, key), child, include_arrays, flat);
            }
        }
        Value::Sequence(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten_into(&join_path(path, &index.to_string()), child, include_arrays, flat);
            }
        }
        Value::DateTime(dt) => {
            flat.insert(path.to_string(), Value::String(datetime_isoformat(dt)));
        }
        Value::Time(time) => {
            flat.insert(path.to_string(), Value::String(time.to_isot()));
        }
        Value::Array(_) if !include_arrays => {}
        leaf => {
            flat.insert(path.to_string(), leaf.clone());
        }
    }
}
