//! # Node Classes
//!
//! A [`NodeClass`] is the runtime description of a tagged node type: its
//! name, its tag, which of the three node shapes it has, and its
//! documentation. Classes are data; node instances carry an
//! `Arc<NodeClass>` fixed at construction.

use rdm_core::TagUri;
use rdm_schema::TagDefinition;

/// Primitive carried by a scalar node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarBase {
    /// A string.
    Str,
    /// An astronomical time.
    Time,
}

/// Shape of the nodes a class produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Mapping with schema-validated attributes.
    Object,
    /// Sequence.
    List,
    /// Single primitive value.
    Scalar(ScalarBase),
}

impl NodeKind {
    /// Short name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Object => "object",
            NodeKind::List => "list",
            NodeKind::Scalar(ScalarBase::Str) => "scalar",
            NodeKind::Scalar(ScalarBase::Time) => "time scalar",
        }
    }
}

/// A tagged node type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeClass {
    name: String,
    tag: TagUri,
    kind: NodeKind,
    schema_uri: Option<String>,
    doc: String,
    handwritten: bool,
}

impl NodeClass {
    /// A class defined in code rather than synthesized from the manifest.
    pub fn handwritten(name: impl Into<String>, tag: TagUri, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            tag,
            kind,
            schema_uri: None,
            doc: String::new(),
            handwritten: true,
        }
    }

    /// Synthesize the class for a manifest entry.
    ///
    /// Entries whose schema identifier contains `tagged_scalar` become
    /// string scalars; everything else becomes an object.
    pub fn from_definition(definition: &TagDefinition) -> Self {
        let kind = if definition.is_tagged_scalar() {
            NodeKind::Scalar(ScalarBase::Str)
        } else {
            NodeKind::Object
        };
        Self {
            name: definition.tag_uri.class_name(),
            tag: definition.tag_uri.clone(),
            kind,
            schema_uri: Some(definition.schema_uri.clone()),
            doc: definition.docstring(),
            handwritten: false,
        }
    }

    /// Take schema identifier and documentation from a manifest entry.
    pub fn document(&mut self, definition: &TagDefinition) {
        self.schema_uri = Some(definition.schema_uri.clone());
        self.doc = definition.docstring();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &TagUri {
        &self.tag
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Identifier of the schema nodes of this class satisfy, once known
    /// from the manifest.
    pub fn schema_uri(&self) -> Option<&str> {
        self.schema_uri.as_deref()
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn is_handwritten(&self) -> bool {
        self.handwritten
    }

    /// Key under which scalar values are auto-promoted to this class.
    pub fn scalar_key(&self) -> &str {
        self.tag.scalar_key()
    }
}
