//! # Schema Scopes
//!
//! Every node view owns an `Rc<SchemaScope>` that knows where the node's
//! schema fragment comes from and memoizes it once resolved:
//!
//! - **Tag root**: a typed node fetches the full schema for its tag from
//!   the schema registry.
//! - **Child**: an untyped mapping asks its parent scope for the parent's
//!   fragment and narrows it to its own name.
//! - **Detached**: a mapping with neither parent nor tag (including the
//!   elements of a sequence) is unconstrained.
//!
//! Scopes point from child to parent only. The parent link is used for
//! schema lookup and path building, never to reach the parent's data.

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use rdm_core::TagUri;
use rdm_schema::subschema_for_property;
use serde_json::{json, Value as JsonValue};

use crate::context::NodeContext;
use crate::error::NodeError;

#[derive(Debug)]
enum Source {
    Tag(TagUri),
    Parent(Rc<SchemaScope>),
    Detached,
}

/// Where a node's schema fragment comes from, plus the memoized fragment.
#[derive(Debug)]
pub struct SchemaScope {
    source: Source,
    name: Option<String>,
    path: String,
    fragment: OnceCell<Rc<JsonValue>>,
    /// Fragments handed to child scopes, by attribute name.
    children: RefCell<HashMap<String, Rc<JsonValue>>>,
}

impl SchemaScope {
    fn build(source: Source, name: Option<String>, path: String) -> Rc<Self> {
        Rc::new(Self {
            source,
            name,
            path,
            fragment: OnceCell::new(),
            children: RefCell::new(HashMap::new()),
        })
    }

    /// Scope of a typed node that is not reachable from another node.
    pub fn root(tag: TagUri) -> Rc<Self> {
        Self::build(Source::Tag(tag), None, String::new())
    }

    /// Scope of the untyped child `name` of `parent`.
    pub fn child(parent: &Rc<SchemaScope>, name: &str) -> Rc<Self> {
        Self::build(
            Source::Parent(Rc::clone(parent)),
            Some(name.to_string()),
            parent.attribute_path(name),
        )
    }

    /// Scope of the typed child `name` of `parent`: its schema comes from
    /// its own tag, its path continues the parent's.
    pub fn tagged_child(parent: &SchemaScope, name: &str, tag: TagUri) -> Rc<Self> {
        Self::build(
            Source::Tag(tag),
            Some(name.to_string()),
            parent.attribute_path(name),
        )
    }

    /// Scope with no schema constraint.
    pub fn detached() -> Rc<Self> {
        Self::build(Source::Detached, None, String::new())
    }

    /// Scope of the element at `index` of a sequence reached at `path`.
    /// Untyped elements are unconstrained.
    pub(crate) fn element(path: &str, index: usize, tag: Option<TagUri>) -> Rc<Self> {
        let name = index.to_string();
        let path = join_path(path, &name);
        let source = match tag {
            Some(tag) => Source::Tag(tag),
            None => Source::Detached,
        };
        Self::build(source, Some(name), path)
    }

    /// The tag, when the schema comes from one.
    pub fn tag(&self) -> Option<&TagUri> {
        match &self.source {
            Source::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    /// Key under which the node is reachable from its parent.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Dotted path from the outermost node; empty at a root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Dotted path of attribute `key` of this node.
    pub fn attribute_path(&self, key: &str) -> String {
        join_path(&self.path, key)
    }

    /// Whether the fragment has already been resolved.
    pub fn is_resolved(&self) -> bool {
        self.fragment.get().is_some()
    }

    /// The schema fragment governing this node, resolved on first use.
    pub fn resolve(&self, ctx: &NodeContext) -> Result<Rc<JsonValue>, NodeError> {
        if let Some(fragment) = self.fragment.get() {
            return Ok(Rc::clone(fragment));
        }
        let fragment = match &self.source {
            Source::Tag(tag) => ctx.schema_for_tag(tag)?,
            Source::Parent(parent) => {
                parent.child_fragment(self.name.as_deref().unwrap_or_default(), ctx)?
            }
            Source::Detached => Rc::new(json!({})),
        };
        Ok(Rc::clone(self.fragment.get_or_init(|| fragment)))
    }

    /// Fragment for the untyped child `name`, narrowed once per name.
    fn child_fragment(&self, name: &str, ctx: &NodeContext) -> Result<Rc<JsonValue>, NodeError> {
        if let Some(fragment) = self.children.borrow().get(name) {
            return Ok(Rc::clone(fragment));
        }
        let parent = self.resolve(ctx)?;
        let fragment = Rc::new(
            subschema_for_property(&parent, name)
                .cloned()
                .unwrap_or_else(|| json!({})),
        );
        self.children
            .borrow_mut()
            .insert(name.to_string(), Rc::clone(&fragment));
        Ok(fragment)
    }
}

pub(crate) fn join_path(base: &str, segment: &str) -> String {
    if base.is_empty() {
        segment.to_string()
    } else {
        format!("{base}.{segment}")
    }
}
