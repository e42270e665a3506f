//! # Schema Registry
//!
//! The node layer treats the schema document store as an opaque registry:
//! given a tag it wants a schema document, given a URI it wants the
//! document with that identifier. [`SchemaRegistry`] is that seam.
//!
//! ## Reference resolution
//!
//! Schemas returned by [`SchemaRegistry::schema_for_tag`] have their
//! `$ref`s inlined, so fragment lookup never needs to chase a reference:
//!
//! - `#/json/pointer` resolves within the document containing the reference.
//! - `<schema id>` and `<schema id>#/json/pointer` resolve against the
//!   loaded documents.
//!
//! A reference that cannot be resolved, a reference back to a target that
//! is still being inlined (a cycle), or a chain deeper than
//! [`MAX_REF_DEPTH`] is replaced by the empty schema, which accepts
//! anything. Inlined documents lose their `id`, `$id` and
//! `$schema` keys so the validator never sees nested base URIs.
//!
//! ## On-disk layout
//!
//! [`DirSchemaRegistry`] reads a schema package laid out as:
//!
//! ```text
//! <root>/
//!   manifests/datamodels-1.0.yaml
//!   schemas/**/*.yaml     (each document carries an `id`)
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rdm_core::TagUri;
use serde_json::{json, Value};

use crate::error::SchemaError;
use crate::manifest::Manifest;

/// Maximum number of nested `$ref` hops followed before giving up.
pub const MAX_REF_DEPTH: usize = 32;

/// Default manifest file name inside a schema package.
pub const DEFAULT_MANIFEST: &str = "datamodels-1.0.yaml";

/// Keys removed from the top level of every inlined document.
const DOCUMENT_KEYS: &[&str] = &["id", "$id", "$schema"];

/// Source of tag manifests and schema documents.
pub trait SchemaRegistry: Send + Sync {
    /// The manifest of tag definitions.
    fn manifest(&self) -> &Manifest;

    /// The raw schema document with identifier `uri`.
    fn schema_by_uri(&self, uri: &str) -> Option<&Value>;

    /// The schema governing nodes tagged `tag`, with references resolved.
    ///
    /// # Errors
    ///
    /// [`SchemaError::UnknownTag`] when the manifest does not define `tag`,
    /// [`SchemaError::UnknownSchema`] when its schema is not loaded.
    fn schema_for_tag(&self, tag: &TagUri) -> Result<Value, SchemaError> {
        let definition =
            self.manifest()
                .definition(tag)
                .ok_or_else(|| SchemaError::UnknownTag {
                    tag: tag.to_string(),
                })?;
        let schema = self.schema_by_uri(&definition.schema_uri).ok_or_else(|| {
            SchemaError::UnknownSchema {
                uri: definition.schema_uri.clone(),
            }
        })?;
        Ok(resolve_document(
            schema,
            Some(definition.schema_uri.as_str()),
            &|uri: &str| self.schema_by_uri(uri),
        ))
    }
}

/// Inline every `$ref` of `schema`, looking documents up with `lookup`.
pub fn resolve_references<'a, F>(schema: &Value, lookup: F) -> Value
where
    F: Fn(&str) -> Option<&'a Value>,
{
    resolve_document(schema, None, &lookup)
}

/// A reference target: document identifier (`None` for the document being
/// resolved when it has none) and JSON pointer.
type RefTarget = (Option<String>, String);

fn resolve_document<'a, F>(schema: &Value, uri: Option<&str>, lookup: &F) -> Value
where
    F: Fn(&str) -> Option<&'a Value>,
{
    let mut active = vec![(uri.map(str::to_string), String::new())];
    resolve_node(schema, schema, uri, lookup, &mut active)
}

/// `active` holds the targets currently being inlined, outermost first.
fn resolve_node<'a, F>(
    node: &Value,
    root: &Value,
    root_uri: Option<&str>,
    lookup: &F,
    active: &mut Vec<RefTarget>,
) -> Value
where
    F: Fn(&str) -> Option<&'a Value>,
{
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                return resolve_ref(reference, root, root_uri, lookup, active);
            }
            Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), resolve_node(v, root, root_uri, lookup, active)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|v| resolve_node(v, root, root_uri, lookup, active))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn resolve_ref<'a, F>(
    reference: &str,
    root: &Value,
    root_uri: Option<&str>,
    lookup: &F,
    active: &mut Vec<RefTarget>,
) -> Value
where
    F: Fn(&str) -> Option<&'a Value>,
{
    if active.len() > MAX_REF_DEPTH {
        tracing::debug!(reference, "reference chain too deep; treating as unconstrained");
        return json!({});
    }

    let (document_uri, pointer) = reference.split_once('#').unwrap_or((reference, ""));
    let (document, document_uri) = if document_uri.is_empty() {
        (root, root_uri)
    } else {
        match lookup(document_uri) {
            Some(document) => (document, Some(document_uri)),
            None => {
                tracing::debug!(reference, "unresolved schema reference; treating as unconstrained");
                return json!({});
            }
        }
    };

    let target_key = (document_uri.map(str::to_string), pointer.to_string());
    if active.contains(&target_key) {
        tracing::debug!(reference, "recursive schema reference; treating as unconstrained");
        return json!({});
    }

    let target = if pointer.is_empty() {
        Some(document)
    } else {
        document.pointer(pointer)
    };
    match target {
        Some(target) => {
            active.push(target_key);
            let mut resolved = resolve_node(target, document, document_uri, lookup, active);
            active.pop();
            if let Value::Object(map) = &mut resolved {
                for key in DOCUMENT_KEYS {
                    map.remove(*key);
                }
            }
            resolved
        }
        None => {
            tracing::debug!(reference, "reference pointer not found; treating as unconstrained");
            json!({})
        }
    }
}

/// A registry holding a manifest and documents built in memory.
#[derive(Debug, Clone)]
pub struct InMemorySchemaRegistry {
    manifest: Manifest,
    schemas: HashMap<String, Value>,
}

impl InMemorySchemaRegistry {
    /// Create a registry with `manifest` and no documents.
    pub fn new(manifest: Manifest) -> Self {
        Self {
            manifest,
            schemas: HashMap::new(),
        }
    }

    /// Add a document under `uri`, builder style.
    pub fn with_schema(mut self, uri: impl Into<String>, schema: Value) -> Self {
        self.insert(uri, schema);
        self
    }

    /// Add or replace a document under `uri`.
    pub fn insert(&mut self, uri: impl Into<String>, schema: Value) {
        self.schemas.insert(uri.into(), schema);
    }
}

impl SchemaRegistry for InMemorySchemaRegistry {
    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn schema_by_uri(&self, uri: &str) -> Option<&Value> {
        self.schemas.get(uri)
    }
}

/// A registry loaded from a schema package on disk.
///
/// Every `*.yaml`, `*.yml` and `*.json` file below the schema directory is
/// parsed and indexed by its `id` (or `$id`) field. Files without an
/// identifier are skipped.
///
/// ## Thread Safety
///
/// `DirSchemaRegistry` is `Send + Sync`. Loading happens once at
/// construction; lookups are read-only.
#[derive(Debug)]
pub struct DirSchemaRegistry {
    schema_dir: PathBuf,
    manifest: Manifest,
    schemas: HashMap<String, Value>,
}

impl DirSchemaRegistry {
    /// Load `<root>/schemas/**` and `<root>/manifests/datamodels-1.0.yaml`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let root = root.as_ref();
        Self::new(
            root.join("schemas"),
            root.join("manifests").join(DEFAULT_MANIFEST),
        )
    }

    /// Load every schema document below `schema_dir` and the manifest at
    /// `manifest_path`.
    ///
    /// # Errors
    ///
    /// [`SchemaError::Load`] if a document cannot be read or parsed, or two
    /// documents share an identifier; [`SchemaError::ManifestLoad`] if the
    /// manifest cannot be read.
    pub fn new(
        schema_dir: impl AsRef<Path>,
        manifest_path: impl AsRef<Path>,
    ) -> Result<Self, SchemaError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let manifest = Manifest::from_path(manifest_path)?;

        let mut files = Vec::new();
        collect_schema_files(&schema_dir, &mut files)?;
        files.sort();

        let mut schemas = HashMap::new();
        for path in files {
            let value = load_document(&path)?;
            let id = value
                .get("id")
                .or_else(|| value.get("$id"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let Some(id) = id else {
                tracing::debug!(path = %path.display(), "schema document has no id; skipping");
                continue;
            };
            if schemas.contains_key(&id) {
                return Err(SchemaError::Load {
                    name: path.display().to_string(),
                    reason: format!("duplicate schema id '{id}'"),
                });
            }
            schemas.insert(id, value);
        }

        tracing::debug!(
            dir = %schema_dir.display(),
            schemas = schemas.len(),
            tags = manifest.tags.len(),
            "loaded schema package"
        );
        Ok(Self {
            schema_dir,
            manifest,
            schemas,
        })
    }

    /// Returns the schema directory path.
    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Returns the number of loaded schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Returns the identifiers of all loaded schemas, sorted.
    pub fn schema_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.schemas.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl SchemaRegistry for DirSchemaRegistry {
    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn schema_by_uri(&self, uri: &str) -> Option<&Value> {
        self.schemas.get(uri)
    }
}

fn collect_schema_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), SchemaError> {
    let entries = std::fs::read_dir(dir).map_err(|e| SchemaError::Load {
        name: dir.display().to_string(),
        reason: format!("cannot read schema directory: {e}"),
    })?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            collect_schema_files(&path, files)?;
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml" | "yml" | "json")
        ) {
            files.push(path);
        }
    }
    Ok(())
}

fn load_document(path: &Path) -> Result<Value, SchemaError> {
    let content = std::fs::read_to_string(path)?;
    let load_error = |reason: String| SchemaError::Load {
        name: path.display().to_string(),
        reason,
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            serde_json::from_str(&content).map_err(|e| load_error(format!("invalid JSON: {e}")))
        }
        _ => {
            let yaml: serde_yaml::Value = serde_yaml::from_str(&content)
                .map_err(|e| load_error(format!("invalid YAML: {e}")))?;
            yaml_to_json_value(&yaml)
                .map_err(|e| load_error(format!("YAML-to-JSON conversion failed: {e}")))
        }
    }
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Schema documents only use the JSON-compatible subset of YAML. Local YAML
/// tags are dropped and their inner value kept.
fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
