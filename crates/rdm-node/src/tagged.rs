//! # Tagged Nodes
//!
//! Owned nodes whose class, and therefore tag, is fixed at construction:
//!
//! | Type                 | Plain form | Class kind                   |
//! |----------------------|------------|------------------------------|
//! | [`TaggedObjectNode`] | mapping    | [`NodeKind::Object`]         |
//! | [`TaggedListNode`]   | sequence   | [`NodeKind::List`]           |
//! | [`TaggedScalarNode`] | primitive  | [`NodeKind::Scalar`]         |
//!
//! [`TaggedNode`] is their union. Inside a raw tree the same nodes appear as
//! [`Value::Tagged`]; [`TaggedNode::into_value`] and
//! [`TaggedNode::from_value`] move between the two forms.

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use rdm_core::{Mapping, TagUri, Tagged, Time, Value};
use serde_json::Value as JsonValue;

use crate::class::{NodeClass, NodeKind, ScalarBase};
use crate::context::NodeContext;
use crate::dnode::{flatten_mapping, DNode, Private};
use crate::error::NodeError;
use crate::lnode::LNode;
use crate::registry::NodeRegistry;
use crate::scope::SchemaScope;

fn require_kind(class: &NodeClass, expected: &'static str, ok: bool) -> Result<(), NodeError> {
    if ok {
        Ok(())
    } else {
        Err(NodeError::Construction {
            expected,
            found: class.kind().as_str(),
        })
    }
}

/// An owned mapping node of an object class.
///
/// The schema for the class's tag is resolved on first use and memoized
/// for every view later taken with [`node`](Self::node).
#[derive(Debug)]
pub struct TaggedObjectNode {
    class: Arc<NodeClass>,
    data: Mapping,
    private: Mapping,
    scope: Rc<SchemaScope>,
}

impl TaggedObjectNode {
    /// Build a node of `class` from a mapping (or null, for an empty node).
    pub fn new(class: Arc<NodeClass>, raw: impl Into<Value>) -> Result<Self, NodeError> {
        require_kind(&class, "object", class.kind() == NodeKind::Object)?;
        let data = match raw.into() {
            Value::Null => Mapping::new(),
            Value::Mapping(map) => map,
            other => {
                return Err(NodeError::Construction {
                    expected: "mapping",
                    found: other.type_name(),
                })
            }
        };
        let scope = SchemaScope::root(class.tag().clone());
        Ok(Self {
            class,
            data,
            private: Mapping::new(),
            scope,
        })
    }

    pub fn tag(&self) -> &TagUri {
        self.class.tag()
    }

    pub fn class(&self) -> &Arc<NodeClass> {
        &self.class
    }

    /// A validating view of this node.
    pub fn node<'a>(&'a mut self, ctx: &'a NodeContext) -> DNode<'a> {
        DNode::wrap(
            &mut self.data,
            Rc::clone(&self.scope),
            ctx,
            Private::Shared(&mut self.private),
        )
    }

    /// The schema for this node's tag.
    pub fn schema(&self, ctx: &NodeContext) -> Result<Rc<JsonValue>, NodeError> {
        self.scope.resolve(ctx)
    }

    pub fn raw(&self) -> &Mapping {
        &self.data
    }

    /// See [`DNode::flatten`].
    pub fn flatten(&self, include_arrays: bool) -> BTreeMap<String, Value> {
        flatten_mapping(&self.data, include_arrays)
    }

    pub fn into_mapping(self) -> Mapping {
        self.data
    }
}

/// An owned sequence node of a list class.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedListNode {
    class: Arc<NodeClass>,
    data: Vec<Value>,
}

impl TaggedListNode {
    /// Build a node of `class` from a sequence (or null, for an empty node).
    pub fn new(class: Arc<NodeClass>, raw: impl Into<Value>) -> Result<Self, NodeError> {
        require_kind(&class, "list", class.kind() == NodeKind::List)?;
        let data = match raw.into() {
            Value::Null => Vec::new(),
            Value::Sequence(seq) => seq,
            other => {
                return Err(NodeError::Construction {
                    expected: "sequence",
                    found: other.type_name(),
                })
            }
        };
        Ok(Self { class, data })
    }

    pub fn tag(&self) -> &TagUri {
        self.class.tag()
    }

    pub fn class(&self) -> &Arc<NodeClass> {
        &self.class
    }

    /// A view of this node.
    pub fn list<'a>(&'a mut self, ctx: &'a NodeContext) -> LNode<'a> {
        LNode::wrap(&mut self.data, Some(self.class.tag().clone()), String::new(), ctx)
    }

    pub fn raw(&self) -> &[Value] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.data
    }
}

/// A single primitive value carrying a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedScalarNode {
    class: Arc<NodeClass>,
    value: Value,
}

impl TaggedScalarNode {
    /// Build a node of `class` from a primitive.
    ///
    /// String classes take a string. Time classes take a time, a naive
    /// date-time (read as UTC), or a string parsed as a time.
    pub fn new(class: Arc<NodeClass>, raw: impl Into<Value>) -> Result<Self, NodeError> {
        let NodeKind::Scalar(base) = class.kind() else {
            return Err(NodeError::Construction {
                expected: "scalar",
                found: class.kind().as_str(),
            });
        };
        let value = match (base, raw.into()) {
            (ScalarBase::Str, Value::String(s)) => Value::String(s),
            (ScalarBase::Time, Value::Time(t)) => Value::Time(t),
            (ScalarBase::Time, Value::DateTime(dt)) => Value::Time(Time::from_naive(dt)),
            (ScalarBase::Time, Value::String(s)) => Value::Time(Time::parse(&s)?),
            (ScalarBase::Str, other) => {
                return Err(NodeError::Construction {
                    expected: "string",
                    found: other.type_name(),
                })
            }
            (ScalarBase::Time, other) => {
                return Err(NodeError::Construction {
                    expected: "time",
                    found: other.type_name(),
                })
            }
        };
        Ok(Self { class, value })
    }

    pub fn tag(&self) -> &TagUri {
        self.class.tag()
    }

    pub fn class(&self) -> &Arc<NodeClass> {
        &self.class
    }

    /// The primitive: a [`Value::String`] or a [`Value::Time`].
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_time(&self) -> Option<&Time> {
        match &self.value {
            Value::Time(t) => Some(t),
            _ => None,
        }
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

/// Any tagged node.
#[derive(Debug)]
pub enum TaggedNode {
    Object(TaggedObjectNode),
    List(TaggedListNode),
    Scalar(TaggedScalarNode),
}

impl TaggedNode {
    /// Build the node matching `class`'s kind from its plain form.
    pub fn build(class: Arc<NodeClass>, raw: Value) -> Result<Self, NodeError> {
        match class.kind() {
            NodeKind::Object => TaggedObjectNode::new(class, raw).map(TaggedNode::Object),
            NodeKind::List => TaggedListNode::new(class, raw).map(TaggedNode::List),
            NodeKind::Scalar(_) => TaggedScalarNode::new(class, raw).map(TaggedNode::Scalar),
        }
    }

    /// Build a node from its in-tree form, looking the class up by tag.
    ///
    /// # Errors
    ///
    /// [`NodeError::Construction`] for an untagged value,
    /// [`NodeError::UnknownTag`] when no class is registered for the tag.
    pub fn from_value(value: Value, classes: &NodeRegistry) -> Result<Self, NodeError> {
        let Value::Tagged(tagged) = value else {
            return Err(NodeError::Construction {
                expected: "tagged",
                found: value.type_name(),
            });
        };
        let (tag, raw) = tagged.into_parts();
        let class = classes
            .class_for_tag(&tag)
            .ok_or_else(|| NodeError::UnknownTag {
                tag: tag.to_string(),
            })?;
        Self::build(Arc::clone(class), raw)
    }

    pub fn tag(&self) -> &TagUri {
        self.class().tag()
    }

    pub fn class(&self) -> &Arc<NodeClass> {
        match self {
            TaggedNode::Object(node) => node.class(),
            TaggedNode::List(node) => node.class(),
            TaggedNode::Scalar(node) => node.class(),
        }
    }

    /// The plain form, without the tag.
    pub fn plain_form(&self) -> Value {
        match self {
            TaggedNode::Object(node) => Value::Mapping(node.raw().clone()),
            TaggedNode::List(node) => Value::Sequence(node.raw().to_vec()),
            TaggedNode::Scalar(node) => node.value().clone(),
        }
    }

    /// The in-tree form: the plain form wrapped in the node's tag.
    pub fn into_value(self) -> Value {
        let tag = self.tag().clone();
        let plain = match self {
            TaggedNode::Object(node) => Value::Mapping(node.into_mapping()),
            TaggedNode::List(node) => Value::Sequence(node.into_vec()),
            TaggedNode::Scalar(node) => node.into_value(),
        };
        Value::Tagged(Tagged::new(tag, plain))
    }
}

impl From<TaggedObjectNode> for TaggedNode {
    fn from(node: TaggedObjectNode) -> Self {
        TaggedNode::Object(node)
    }
}

impl From<TaggedListNode> for TaggedNode {
    fn from(node: TaggedListNode) -> Self {
        TaggedNode::List(node)
    }
}

impl From<TaggedScalarNode> for TaggedNode {
    fn from(node: TaggedScalarNode) -> Self {
        TaggedNode::Scalar(node)
    }
}
