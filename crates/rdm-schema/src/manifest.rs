//! # Tag Manifest
//!
//! The manifest is the ordered catalogue of tag definitions shipped with a
//! schema package:
//!
//! ```yaml
//! id: asdf://stsci.edu/datamodels/roman/manifests/datamodels-1.0
//! tags:
//! - tag_uri: asdf://stsci.edu/datamodels/roman/tags/wfi_mode-1.0.0
//!   schema_uri: asdf://stsci.edu/datamodels/roman/schemas/wfi_mode-1.0.0
//!   title: Wide Field Instrument Mode
//!   description: ...
//! ```
//!
//! Node classes are synthesized from it in order at startup.

use std::path::Path;

use rdm_core::TagUri;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Marker in a schema identifier selecting the scalar node shape.
pub const TAGGED_SCALAR_MARKER: &str = "tagged_scalar";

/// An ordered catalogue of tag definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Manifest identifier.
    #[serde(default)]
    pub id: Option<String>,
    /// Extension this manifest defines.
    #[serde(default)]
    pub extension_uri: Option<String>,
    /// Human-readable title.
    #[serde(default)]
    pub title: Option<String>,
    /// Tag definitions, in declaration order.
    #[serde(default)]
    pub tags: Vec<TagDefinition>,
}

/// One tag of the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDefinition {
    /// The tag identifier.
    pub tag_uri: TagUri,
    /// Identifier of the schema documents tagged with it must satisfy.
    pub schema_uri: String,
    /// Short title.
    #[serde(default)]
    pub title: Option<String>,
    /// Longer description, copied into class documentation.
    #[serde(default)]
    pub description: Option<String>,
}

impl TagDefinition {
    /// Whether nodes of this tag are tagged scalars.
    pub fn is_tagged_scalar(&self) -> bool {
        self.schema_uri.contains(TAGGED_SCALAR_MARKER)
    }

    /// Documentation for the node class backing this tag.
    pub fn docstring(&self) -> String {
        let mut doc = match &self.description {
            Some(description) => format!("{description}\n\n"),
            None => String::new(),
        };
        doc.push_str(&format!("Class generated from tag '{}'", self.tag_uri));
        doc
    }
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(text).map_err(|e| SchemaError::ManifestLoad {
            path: "<string>".to_string(),
            reason: format!("invalid YAML: {e}"),
        })
    }

    /// Read and parse a manifest file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| SchemaError::ManifestLoad {
            path: path.display().to_string(),
            reason: format!("cannot read file: {e}"),
        })?;
        serde_yaml::from_str(&text).map_err(|e| SchemaError::ManifestLoad {
            path: path.display().to_string(),
            reason: format!("invalid YAML: {e}"),
        })
    }

    /// The definition of `tag`, if listed.
    pub fn definition(&self, tag: &TagUri) -> Option<&TagDefinition> {
        self.tags.iter().find(|def| &def.tag_uri == tag)
    }
}
