//! # Sequence Nodes
//!
//! An [`LNode`] is a view over one sequence of the raw tree. Element reads
//! wrap mappings and sequences like [`DNode::get`]; element writes are not
//! validated. Untyped mapping elements are unconstrained schema-wise.

use rdm_core::{TagUri, Tagged, Value};

use crate::context::NodeContext;
use crate::dnode::{Attr, DNode, Private, Shape};
use crate::error::NodeError;
use crate::scope::{join_path, SchemaScope};

/// A view over one sequence of the raw tree.
#[derive(Debug)]
pub struct LNode<'a> {
    data: &'a mut Vec<Value>,
    tag: Option<TagUri>,
    path: String,
    ctx: &'a NodeContext,
}

impl<'a> LNode<'a> {
    /// Wrap `raw`; a null `raw` is replaced by an empty sequence.
    ///
    /// # Errors
    ///
    /// [`NodeError::Construction`] if `raw` is neither a sequence nor null.
    pub fn new(raw: &'a mut Value, ctx: &'a NodeContext) -> Result<Self, NodeError> {
        if raw.is_null() {
            *raw = Value::Sequence(Vec::new());
        }
        match raw {
            Value::Sequence(data) => Ok(Self::wrap(data, None, String::new(), ctx)),
            other => Err(NodeError::Construction {
                expected: "sequence",
                found: other.type_name(),
            }),
        }
    }

    /// Wrap a sequence directly.
    pub fn from_vec(data: &'a mut Vec<Value>, ctx: &'a NodeContext) -> Self {
        Self::wrap(data, None, String::new(), ctx)
    }

    pub(crate) fn wrap(
        data: &'a mut Vec<Value>,
        tag: Option<TagUri>,
        path: String,
        ctx: &'a NodeContext,
    ) -> Self {
        Self {
            data,
            tag,
            path,
            ctx,
        }
    }

    /// Read element `index`.
    ///
    /// # Errors
    ///
    /// [`NodeError::IndexOutOfRange`] past the end.
    pub fn get(&mut self, index: usize) -> Result<Attr<'_>, NodeError> {
        let ctx = self.ctx;
        let shape = Shape::of(self.element(index)?);
        match shape {
            Shape::Mapping(tag) => {
                let scope = SchemaScope::element(&self.path, index, tag);
                match self.data[index].untagged_mut() {
                    Value::Mapping(map) => Ok(Attr::Node(DNode::wrap(map, scope, ctx, Private::default()))),
                    other => Err(NodeError::Construction {
                        expected: "mapping",
                        found: other.type_name(),
                    }),
                }
            }
            Shape::Sequence(tag) => {
                let path = join_path(&self.path, &index.to_string());
                match self.data[index].untagged_mut() {
                    Value::Sequence(seq) => Ok(Attr::List(LNode::wrap(seq, tag, path, ctx))),
                    other => Err(NodeError::Construction {
                        expected: "sequence",
                        found: other.type_name(),
                    }),
                }
            }
            Shape::Leaf => Ok(Attr::Value(self.data[index].clone())),
        }
    }

    /// Replace element `index`.
    pub fn set(&mut self, index: usize, value: impl Into<Value>) -> Result<(), NodeError> {
        let len = self.data.len();
        let slot = self
            .data
            .get_mut(index)
            .ok_or(NodeError::IndexOutOfRange { index, len })?;
        *slot = value.into();
        Ok(())
    }

    /// Append an element.
    pub fn push(&mut self, value: impl Into<Value>) {
        self.data.push(value.into());
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw elements, in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.data.iter()
    }

    /// The tag, when this is the plain form of a tagged list.
    pub fn tag(&self) -> Option<&TagUri> {
        self.tag.as_ref()
    }

    /// Dotted path from the outermost node.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn raw(&self) -> &[Value] {
        self.data.as_slice()
    }

    /// The list as an owned value, tagged when the list is typed.
    pub fn to_value(&self) -> Value {
        let seq = Value::Sequence(self.data.clone());
        match &self.tag {
            Some(tag) => Value::Tagged(Tagged::new(tag.clone(), seq)),
            None => seq,
        }
    }

    fn element(&self, index: usize) -> Result<&Value, NodeError> {
        self.data.get(index).ok_or(NodeError::IndexOutOfRange {
            index,
            len: self.data.len(),
        })
    }
}
