//! # Node Model Against the Fixture Package
//!
//! Builds node classes from the fixture manifest under `resources/`, wraps
//! a complete level 2 image tree, and exercises reads, promotion, private
//! keys, flattening, the hand-written classes, and the plain-form
//! converter.

use std::path::PathBuf;
use std::sync::Arc;

use rdm_core::{Mapping, NdArray, TagUri, Tagged, Time, ValidationPolicy, Value};
use rdm_node::{
    Attr, NodeContext, NodeConverter, NodeError, NodeKind, NodeRegistry, ScalarBase,
    TaggedNode, TaggedObjectNode, WfiMode,
};
use rdm_schema::{DirSchemaRegistry, SchemaRegistry};
use serde_json::json;

fn repo_root() -> PathBuf {
    let mut dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    dir.pop(); // crates/
    dir.pop(); // repo root
    dir
}

fn schemas() -> Arc<DirSchemaRegistry> {
    Arc::new(DirSchemaRegistry::open(repo_root().join("resources")).expect("fixture package loads"))
}

fn context(policy: ValidationPolicy) -> NodeContext {
    NodeContext::from_schemas(schemas())
        .expect("classes synthesize")
        .with_policy(policy)
}

fn tag(name: &str) -> TagUri {
    TagUri::parse(format!("asdf://stsci.edu/datamodels/roman/tags/{name}-1.0.0")).unwrap()
}

fn tagged(name: &str, value: impl Into<Value>) -> Value {
    Value::Tagged(Tagged::new(tag(name), value))
}

fn time(text: &str) -> Time {
    Time::parse(text).unwrap()
}

/// Plain form of a small but complete `wfi_image`.
fn wfi_image_tree() -> Mapping {
    let mut exposure = Mapping::new();
    exposure.insert("type".into(), Value::from("WFI_IMAGE"));
    exposure.insert("start_time".into(), Value::Time(time("2020-02-01T00:00:00")));
    exposure.insert("nresultants".into(), Value::Int(6));
    exposure.insert("ma_table_name".into(), Value::from("High Latitude Imaging Survey"));
    exposure.insert("data_problem".into(), Value::Bool(false));
    exposure.insert("frame_time".into(), Value::Float(3.04));
    exposure.insert("exposure_time".into(), Value::Float(152.04));

    let mut meta = Mapping::new();
    meta.insert(
        "calibration_software_version".into(),
        tagged("calibration_software_version", "0.5.0"),
    );
    meta.insert("filename".into(), Value::from("r0000101001001001001_01101_0001_WFI01_cal.asdf"));
    meta.insert("file_date".into(), tagged("file_date", time("2020-06-01T12:00:00")));
    meta.insert("model_type".into(), Value::from("ImageModel"));
    meta.insert("origin".into(), tagged("origin", "STSCI"));
    meta.insert("telescope".into(), tagged("telescope", "ROMAN"));
    meta.insert("exposure".into(), tagged("exposure", exposure));
    meta.insert(
        "instrument".into(),
        tagged(
            "wfi_mode",
            Value::from(json!({"name": "WFI", "detector": "WFI01", "optical_element": "F158"})),
        ),
    );
    meta.insert(
        "photometry".into(),
        Value::from(json!({"conversion_megajanskys": 0.3, "pixelarea_steradians": null})),
    );

    let mut root = Mapping::new();
    root.insert("meta".into(), Value::Mapping(meta));
    root.insert("data".into(), Value::Array(NdArray::new("float32", vec![4, 4], vec![0; 64])));
    root.insert("dq".into(), Value::Array(NdArray::new("uint32", vec![4, 4], vec![0; 64])));
    root.insert(
        "cal_logs".into(),
        tagged("cal_logs", Value::from(json!(["Flat field applied"]))),
    );
    root
}

fn wfi_image(ctx: &NodeContext) -> TaggedObjectNode {
    let class = ctx.classes().object_class(&tag("wfi_image")).expect("WfiImage class");
    TaggedObjectNode::new(Arc::clone(class), wfi_image_tree()).unwrap()
}

/// Follow a dotted path through mappings, looking through tags.
fn lookup<'a>(map: &'a Mapping, path: &str) -> &'a Value {
    let mut parts = path.split('.');
    let first = parts.next().unwrap();
    let mut value = map.get(first).unwrap_or_else(|| panic!("missing {first}"));
    for part in parts {
        value = value
            .untagged()
            .as_mapping()
            .and_then(|m| m.get(part))
            .unwrap_or_else(|| panic!("missing {part} in {path}"));
    }
    value
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn registry_has_one_class_per_manifest_tag() {
    let schemas = schemas();
    let registry = NodeRegistry::synthesize(schemas.manifest()).unwrap();
    assert_eq!(registry.len(), schemas.manifest().tags.len());

    let flat = registry
        .object_class(
            &TagUri::parse("asdf://stsci.edu/datamodels/roman/tags/reference_files/flat-1.0.0")
                .unwrap(),
        )
        .unwrap();
    assert_eq!(flat.name(), "FlatRef");
    assert!(!flat.is_handwritten());
    assert_eq!(
        flat.schema_uri(),
        Some("asdf://stsci.edu/datamodels/roman/schemas/reference_files/flat-1.0.0")
    );
    assert!(flat
        .doc()
        .ends_with("Class generated from tag 'asdf://stsci.edu/datamodels/roman/tags/reference_files/flat-1.0.0'"));

    let origin = registry.scalar_class_for_key("origin").unwrap();
    assert_eq!(origin.name(), "Origin");
    assert_eq!(origin.kind(), NodeKind::Scalar(ScalarBase::Str));

    let file_date = registry.scalar_class_for_key("file_date").unwrap();
    assert_eq!(file_date.kind(), NodeKind::Scalar(ScalarBase::Time));
    assert!(file_date.is_handwritten());

    let wfi_mode = registry.object_class(&tag("wfi_mode")).unwrap();
    assert!(wfi_mode.is_handwritten());
    assert!(wfi_mode.doc().starts_with("The configuration of the instrument"));

    assert_eq!(registry.list_class(&tag("cal_logs")).unwrap().name(), "CalLogs");
}

#[test]
fn global_registry_initializes_once_across_threads() {
    let schemas = schemas();
    let registries: Vec<Arc<NodeRegistry>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| NodeRegistry::init_global(schemas.as_ref()).unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for registry in &registries[1..] {
        assert!(Arc::ptr_eq(&registries[0], registry));
    }
    let ctx = NodeContext::global(schemas).unwrap();
    assert!(ctx.classes().object_class(&tag("wfi_image")).is_some());
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

#[test]
fn reads_wrap_nested_mappings_and_sequences() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    let mut root = image.node(&ctx);
    assert_eq!(root.tag(), Some(&tag("wfi_image")));
    assert_eq!(root.path(), "");

    {
        let mut meta = root.node("meta").unwrap();
        assert_eq!(meta.path(), "meta");
        assert_eq!(meta.tag(), None);
        match meta.get("origin").unwrap() {
            Attr::Value(value) => assert_eq!(value, tagged("origin", "STSCI")),
            other => panic!("expected a value, got {}", other.type_name()),
        }
        let exposure = meta.node("exposure").unwrap();
        assert_eq!(exposure.tag(), Some(&tag("exposure")));
        assert_eq!(exposure.path(), "meta.exposure");
        assert_eq!(exposure.value("nresultants").unwrap(), Value::Int(6));
    }

    let logs = root.list("cal_logs").unwrap();
    assert_eq!(logs.tag(), Some(&tag("cal_logs")));
    assert_eq!(logs.path(), "cal_logs");
    assert_eq!(logs.len(), 1);
}

#[test]
fn missing_attribute_is_not_found() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    let mut root = image.node(&ctx);

    let err = root.get("nonexistent").unwrap_err();
    assert_eq!(err.to_string(), "No such attribute (nonexistent) found in node");
    assert!(matches!(
        root.node("data"),
        Err(NodeError::Construction { expected: "mapping", found: "ndarray" })
    ));
}

#[test]
fn child_schema_is_narrowed_from_parent() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    let mut root = image.node(&ctx);
    let meta = root.node("meta").unwrap();
    let schema = meta.schema().unwrap();
    assert!(schema.get("allOf").is_some());
    // Only the root tag's schema has been fetched.
    assert_eq!(ctx.cached_schemas(), 1);
}

// ---------------------------------------------------------------------------
// Writes outside the schema check
// ---------------------------------------------------------------------------

#[test]
fn private_keys_stay_out_of_the_tree() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    {
        let mut root = image.node(&ctx);
        assert!(root.set("_cache", 3).unwrap().is_committed());
        assert!(root.contains_key("_cache"));
    }
    assert!(!image.raw().contains_key("_cache"));

    let root = image.node(&ctx);
    assert_eq!(root.value("_cache").unwrap(), Value::Int(3));
}

#[test]
fn insert_adds_keys_and_promotes_nested_values() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    {
        let mut root = image.node(&ctx);
        let mut meta = root.node("meta").unwrap();
        meta.insert(
            "ref_meta",
            Value::from(json!({"origin": "IPAC/SSC", "note": "reprocessed"})),
        )
        .unwrap();
    }
    assert_eq!(
        lookup(image.raw(), "meta.ref_meta.origin"),
        &tagged("origin", "IPAC/SSC")
    );
    assert_eq!(lookup(image.raw(), "meta.ref_meta.note"), &Value::from("reprocessed"));
}

#[test]
fn lists_accept_unchecked_writes() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    {
        let mut root = image.node(&ctx);
        let mut logs = root.list("cal_logs").unwrap();
        logs.push("Photometry updated");
        logs.set(0, 42).unwrap();
    }
    assert_eq!(
        lookup(image.raw(), "cal_logs").untagged().as_sequence().unwrap(),
        &[Value::Int(42), Value::from("Photometry updated")]
    );
}

// ---------------------------------------------------------------------------
// Flattening
// ---------------------------------------------------------------------------

#[test]
fn flatten_produces_dotted_leaf_paths() {
    let ctx = context(ValidationPolicy::strict());
    let image = wfi_image(&ctx);
    let flat = image.flatten(false);

    assert_eq!(flat["meta.exposure.nresultants"], Value::Int(6));
    assert_eq!(flat["meta.origin"], Value::from("STSCI"));
    assert_eq!(
        flat["meta.exposure.start_time"],
        Value::from("2020-02-01T00:00:00.000")
    );
    assert_eq!(flat["meta.file_date"], Value::from("2020-06-01T12:00:00.000"));
    assert_eq!(flat["cal_logs.0"], Value::from("Flat field applied"));
    assert!(!flat.contains_key("meta.photometry.pixelarea_steradians"));
    assert!(!flat.contains_key("data"));

    let with_arrays = image.flatten(true);
    assert!(matches!(with_arrays["data"], Value::Array(_)));
    assert!(matches!(with_arrays["dq"], Value::Array(_)));
}

// ---------------------------------------------------------------------------
// Hand-written classes
// ---------------------------------------------------------------------------

#[test]
fn wfi_mode_splits_filter_and_grating() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    let mut root = image.node(&ctx);
    let mut meta = root.node("meta").unwrap();
    let instrument = meta.node("instrument").unwrap();

    let mut mode = WfiMode::new(instrument).expect("instrument is a wfi_mode");
    assert_eq!(mode.filter(), Some("F158"));
    assert_eq!(mode.grating(), None);

    assert!(mode.node().set("optical_element", "GRISM").unwrap().is_committed());
    assert_eq!(mode.filter(), None);
    assert_eq!(mode.grating(), Some("GRISM"));
}

#[test]
fn file_date_strings_become_times() {
    let ctx = context(ValidationPolicy::strict());
    let mut image = wfi_image(&ctx);
    {
        let mut root = image.node(&ctx);
        let mut meta = root.node("meta").unwrap();
        assert!(meta.set("file_date", "2021-03-04T05:06:07").unwrap().is_committed());
        assert!(matches!(
            meta.set("file_date", "not a date"),
            Err(NodeError::Core(_))
        ));
    }
    assert_eq!(
        lookup(image.raw(), "meta.file_date"),
        &tagged("file_date", time("2021-03-04T05:06:07"))
    );
}

// ---------------------------------------------------------------------------
// Converter
// ---------------------------------------------------------------------------

#[test]
fn converter_round_trip_keeps_tags_and_data() {
    let ctx = context(ValidationPolicy::strict());
    let converter = NodeConverter::new(ctx.classes(), ctx.policy());

    let node = converter
        .from_plain_form(Value::Mapping(wfi_image_tree()), &tag("wfi_image"))
        .unwrap();
    assert_eq!(converter.tag(&node), &tag("wfi_image"));
    assert_eq!(node.class().name(), "WfiImage");
    let plain = converter.to_plain_form(&node).unwrap();
    assert_eq!(plain, Value::Mapping(wfi_image_tree()));

    let in_tree = node.into_value();
    let again = TaggedNode::from_value(in_tree.clone(), ctx.classes()).unwrap();
    assert_eq!(again.into_value(), in_tree);
}

#[test]
fn converter_checks_telescope_enumeration() {
    let ctx = context(ValidationPolicy::strict());
    let converter = NodeConverter::new(ctx.classes(), ctx.policy());
    assert!(converter
        .from_plain_form(Value::from("ROMAN"), &tag("telescope"))
        .is_ok());
    assert!(matches!(
        converter.from_plain_form(Value::from("HST"), &tag("telescope")),
        Err(NodeError::Validation(_))
    ));
}
