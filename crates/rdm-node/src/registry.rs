//! # Node Class Registry
//!
//! Three maps from tag identifier to node class (objects, lists, scalars)
//! and one from scalar key to scalar class, used for auto-promotion.
//!
//! ## Synthesis
//!
//! [`NodeRegistry::synthesize`] builds the registry from a manifest:
//!
//! 1. The hand-written classes (`WfiMode`, `CalLogs`, `FileDate`) come first.
//! 2. Each manifest entry whose tag already has a class only documents it.
//! 3. Every other entry yields a synthesized class, in manifest order.
//!
//! Registering a second class under a tag that any of the three maps
//! already holds is a [`RegistryError::DuplicateTag`].
//!
//! ## Process-wide registry
//!
//! [`NodeRegistry::init_global`] synthesizes once behind a `OnceLock`.
//! Concurrent first callers block until that single synthesis finishes and
//! all of them receive the same result, error included.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use rdm_core::{TagUri, Tagged, Time, Value};
use rdm_schema::{Manifest, SchemaRegistry};

use crate::class::{NodeClass, NodeKind, ScalarBase};
use crate::error::{NodeError, RegistryError};
use crate::handwritten;

static GLOBAL: OnceLock<Result<Arc<NodeRegistry>, RegistryError>> = OnceLock::new();

/// The node class registries.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    objects: BTreeMap<TagUri, Arc<NodeClass>>,
    lists: BTreeMap<TagUri, Arc<NodeClass>>,
    scalars: BTreeMap<TagUri, Arc<NodeClass>>,
    scalars_by_key: BTreeMap<String, Arc<NodeClass>>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the hand-written classes, then synthesize one class per
    /// remaining manifest tag.
    pub fn synthesize(manifest: &Manifest) -> Result<Self, RegistryError> {
        Self::synthesize_with(handwritten::classes()?, manifest)
    }

    /// Like [`synthesize`](Self::synthesize), with `classes` standing in
    /// for the hand-written set.
    pub fn synthesize_with(
        classes: impl IntoIterator<Item = NodeClass>,
        manifest: &Manifest,
    ) -> Result<Self, RegistryError> {
        let mut pending: Vec<NodeClass> = classes.into_iter().collect();
        for definition in &manifest.tags {
            if let Some(existing) = pending
                .iter_mut()
                .find(|class| class.tag() == &definition.tag_uri)
            {
                tracing::debug!(
                    tag = %definition.tag_uri,
                    class = existing.name(),
                    "manifest entry documents an existing class"
                );
                existing.document(definition);
                continue;
            }
            pending.push(NodeClass::from_definition(definition));
        }

        let mut registry = Self::new();
        for class in pending {
            registry.register(class)?;
        }
        tracing::debug!(
            objects = registry.objects.len(),
            lists = registry.lists.len(),
            scalars = registry.scalars.len(),
            "synthesized node classes"
        );
        Ok(registry)
    }

    /// Read a manifest file and synthesize from it.
    pub fn from_manifest_path(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let manifest = Manifest::from_path(path)?;
        Self::synthesize(&manifest)
    }

    /// The process-wide registry, synthesizing it from `schemas` on first
    /// call. Later calls ignore `schemas` and return the shared result.
    pub fn init_global(schemas: &dyn SchemaRegistry) -> Result<Arc<NodeRegistry>, RegistryError> {
        GLOBAL
            .get_or_init(|| Self::synthesize(schemas.manifest()).map(Arc::new))
            .clone()
    }

    /// The process-wide registry, if it has been initialized successfully.
    pub fn global() -> Option<Arc<NodeRegistry>> {
        GLOBAL.get().and_then(|result| result.as_ref().ok()).cloned()
    }

    /// Add `class` to the registry matching its shape.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateTag`] if any registry already holds the tag.
    pub fn register(&mut self, class: NodeClass) -> Result<Arc<NodeClass>, RegistryError> {
        if let Some(existing) = self.class_for_tag(class.tag()) {
            return Err(RegistryError::DuplicateTag {
                tag: class.tag().to_string(),
                existing: existing.name().to_string(),
            });
        }

        let class = Arc::new(class);
        let tag = class.tag().clone();
        tracing::debug!(tag = %tag, class = class.name(), kind = class.kind().as_str(), "registered node class");
        match class.kind() {
            NodeKind::Object => {
                self.objects.insert(tag, Arc::clone(&class));
            }
            NodeKind::List => {
                self.lists.insert(tag, Arc::clone(&class));
            }
            NodeKind::Scalar(_) => {
                let key = class.scalar_key().to_string();
                if let Some(previous) = self.scalars_by_key.get(&key) {
                    tracing::debug!(
                        key = %key,
                        previous = %previous.tag(),
                        tag = %tag,
                        "scalar key now promotes to a newer class"
                    );
                }
                self.scalars_by_key.insert(key, Arc::clone(&class));
                self.scalars.insert(tag, Arc::clone(&class));
            }
        }
        Ok(class)
    }

    pub fn object_class(&self, tag: &TagUri) -> Option<&Arc<NodeClass>> {
        self.objects.get(tag)
    }

    pub fn list_class(&self, tag: &TagUri) -> Option<&Arc<NodeClass>> {
        self.lists.get(tag)
    }

    pub fn scalar_class(&self, tag: &TagUri) -> Option<&Arc<NodeClass>> {
        self.scalars.get(tag)
    }

    /// The class registered for `tag` in any of the three registries.
    pub fn class_for_tag(&self, tag: &TagUri) -> Option<&Arc<NodeClass>> {
        self.objects
            .get(tag)
            .or_else(|| self.lists.get(tag))
            .or_else(|| self.scalars.get(tag))
    }

    /// The scalar class values stored under `key` are promoted to.
    pub fn scalar_class_for_key(&self, key: &str) -> Option<&Arc<NodeClass>> {
        self.scalars_by_key.get(key)
    }

    /// Every registered class: objects, then lists, then scalars.
    pub fn node_classes(&self) -> impl Iterator<Item = &Arc<NodeClass>> {
        self.objects
            .values()
            .chain(self.lists.values())
            .chain(self.scalars.values())
    }

    /// Total number of registered classes.
    pub fn len(&self) -> usize {
        self.objects.len() + self.lists.len() + self.scalars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Auto-promote a value stored under `key` to its scalar class.
    ///
    /// Only untagged strings are promoted, plus date-times and times when
    /// the class is time-based. Every other value is returned unchanged.
    ///
    /// # Errors
    ///
    /// [`NodeError::Core`] when a string cannot be parsed as a time for a
    /// time-based class.
    pub fn promote(&self, key: &str, value: Value) -> Result<Value, NodeError> {
        let Some(class) = self.scalars_by_key.get(key) else {
            return Ok(value);
        };
        let NodeKind::Scalar(base) = class.kind() else {
            return Ok(value);
        };
        let inner = match (base, value) {
            (ScalarBase::Str, Value::String(s)) => Value::String(s),
            (ScalarBase::Time, Value::String(s)) => Value::Time(Time::parse(&s)?),
            (ScalarBase::Time, Value::DateTime(dt)) => Value::Time(Time::from_naive(dt)),
            (ScalarBase::Time, Value::Time(t)) => Value::Time(t),
            (_, other) => return Ok(other),
        };
        Ok(Value::Tagged(Tagged::new(class.tag().clone(), inner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handwritten::{CAL_LOGS_TAG, FILE_DATE_TAG, WFI_MODE_TAG};

    const MANIFEST: &str = r#"
tags:
- tag_uri: asdf://stsci.edu/datamodels/roman/tags/wfi_mode-1.0.0
  schema_uri: asdf://stsci.edu/datamodels/roman/schemas/wfi_mode-1.0.0
  description: The instrument mode.
- tag_uri: asdf://stsci.edu/datamodels/roman/tags/exposure-1.0.0
  schema_uri: asdf://stsci.edu/datamodels/roman/schemas/exposure-1.0.0
- tag_uri: asdf://stsci.edu/datamodels/roman/tags/origin-1.0.0
  schema_uri: asdf://stsci.edu/datamodels/roman/schemas/tagged_scalars/origin-1.0.0
- tag_uri: asdf://stsci.edu/datamodels/roman/tags/file_date-1.0.0
  schema_uri: asdf://stsci.edu/datamodels/roman/schemas/tagged_scalars/file_date-1.0.0
- tag_uri: asdf://stsci.edu/datamodels/roman/tags/exposure-1.0.0
  schema_uri: asdf://stsci.edu/datamodels/roman/schemas/exposure-1.0.0
  description: Repeated entry.
"#;

    fn tag(uri: &str) -> TagUri {
        TagUri::parse(uri).unwrap()
    }

    fn registry() -> NodeRegistry {
        NodeRegistry::synthesize(&Manifest::from_yaml_str(MANIFEST).unwrap()).unwrap()
    }

    #[test]
    fn test_handwritten_classes_registered_first() {
        let registry = registry();
        let wfi_mode = registry.object_class(&tag(WFI_MODE_TAG)).unwrap();
        assert_eq!(wfi_mode.name(), "WfiMode");
        assert!(wfi_mode.is_handwritten());
        assert!(wfi_mode.doc().starts_with("The instrument mode."));

        let cal_logs = registry.list_class(&tag(CAL_LOGS_TAG)).unwrap();
        assert_eq!(cal_logs.kind(), NodeKind::List);

        let file_date = registry.scalar_class(&tag(FILE_DATE_TAG)).unwrap();
        assert_eq!(file_date.kind(), NodeKind::Scalar(ScalarBase::Time));
        assert!(file_date.is_handwritten());
    }

    #[test]
    fn test_one_class_per_tag() {
        let registry = registry();
        // wfi_mode, cal_logs, file_date, exposure, origin
        assert_eq!(registry.len(), 5);
        let mut tags: Vec<&TagUri> = registry.node_classes().map(|c| c.tag()).collect();
        tags.sort();
        tags.dedup();
        assert_eq!(tags.len(), registry.len());
    }

    #[test]
    fn test_repeated_entry_only_documents() {
        let registry = registry();
        let exposure = registry
            .object_class(&tag("asdf://stsci.edu/datamodels/roman/tags/exposure-1.0.0"))
            .unwrap();
        assert_eq!(exposure.name(), "Exposure");
        assert!(exposure.doc().starts_with("Repeated entry."));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = NodeRegistry::new();
        let t = tag("asdf://stsci.edu/datamodels/roman/tags/thing-1.0.0");
        registry
            .register(NodeClass::handwritten("Thing", t.clone(), NodeKind::Object))
            .unwrap();
        let err = registry
            .register(NodeClass::handwritten("OtherThing", t, NodeKind::List))
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTag {
                tag: "asdf://stsci.edu/datamodels/roman/tags/thing-1.0.0".to_string(),
                existing: "Thing".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_handwritten_fails_synthesis() {
        let t = tag("asdf://stsci.edu/datamodels/roman/tags/thing-1.0.0");
        let classes = vec![
            NodeClass::handwritten("Thing", t.clone(), NodeKind::Object),
            NodeClass::handwritten("Thing2", t, NodeKind::Scalar(ScalarBase::Str)),
        ];
        let result = NodeRegistry::synthesize_with(classes, &Manifest::from_yaml_str("tags: []").unwrap());
        assert!(matches!(result, Err(RegistryError::DuplicateTag { .. })));
    }

    #[test]
    fn test_promote_string_scalar() {
        let registry = registry();
        let promoted = registry.promote("origin", Value::from("STSCI")).unwrap();
        match &promoted {
            Value::Tagged(t) => {
                assert_eq!(t.tag().name(), "origin");
                assert_eq!(t.value(), &Value::from("STSCI"));
            }
            other => panic!("expected tagged value, got {other:?}"),
        }
        // Already tagged values are left alone.
        assert_eq!(registry.promote("origin", promoted.clone()).unwrap(), promoted);
    }

    #[test]
    fn test_promote_time_scalar() {
        let registry = registry();
        let promoted = registry
            .promote("file_date", Value::from("2020-01-01T00:00:00"))
            .unwrap();
        let Value::Tagged(t) = promoted else {
            panic!("expected tagged value");
        };
        assert_eq!(t.tag().as_str(), FILE_DATE_TAG);
        assert!(matches!(t.value(), Value::Time(_)));

        assert!(matches!(
            registry.promote("file_date", Value::from("not a date")),
            Err(NodeError::Core(_))
        ));
    }

    #[test]
    fn test_promote_leaves_other_values() {
        let registry = registry();
        assert_eq!(registry.promote("filename", Value::from("x")).unwrap(), Value::from("x"));
        assert_eq!(registry.promote("origin", Value::Int(3)).unwrap(), Value::Int(3));
        assert_eq!(registry.promote("origin", Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_global_is_shared() {
        let schemas = rdm_schema::InMemorySchemaRegistry::new(Manifest::from_yaml_str(MANIFEST).unwrap());
        let first = NodeRegistry::init_global(&schemas).unwrap();
        let second = NodeRegistry::init_global(&schemas).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(NodeRegistry::global().is_some());
    }
}
