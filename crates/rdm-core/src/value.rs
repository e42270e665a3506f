//! # Raw Value Tree
//!
//! [`Value`] is the generic hierarchical form a data product takes in
//! memory once its container file has been read: nested mappings and
//! sequences of scalars, times, opaque binary arrays, and tagged values.
//!
//! A [`Tagged`] value is how typed nodes live inside a tree. Its inner value
//! is the node's plain form (a mapping for object nodes, a sequence for list
//! nodes, a primitive for scalar nodes).
//!
//! ## Validation form
//!
//! [`Value::to_json`] produces the `serde_json::Value` instance the schema
//! validator checks. Tags are dropped there (they are checked separately),
//! times become their "isot" string, and arrays become a
//! `{datatype, shape}` object.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};
use serde_json::json;

use crate::tag::TagUri;
use crate::time::Time;

/// Implicit tag carried by every [`NdArray`].
pub const NDARRAY_TAG: &str = "tag:stsci.edu:asdf/core/ndarray-1.0.0";

/// Implicit tag carried by every [`Time`].
pub const TIME_TAG: &str = "tag:stsci.edu:asdf/time/time-1.1.0";

/// A string-keyed mapping in the raw tree.
pub type Mapping = BTreeMap<String, Value>;

/// A node of the raw tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Absent value.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    String(String),
    /// Date-time without a time scale.
    DateTime(NaiveDateTime),
    /// Astronomical time.
    Time(Time),
    /// Opaque binary array.
    Array(NdArray),
    /// Nested mapping.
    Mapping(Mapping),
    /// Nested sequence.
    Sequence(Vec<Value>),
    /// A value carrying a tag identifier.
    Tagged(Tagged),
}

/// An opaque n-dimensional binary array.
///
/// The node layer never looks inside the buffer; it only needs to know
/// that a leaf is an array so flattening can omit it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NdArray {
    datatype: String,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl NdArray {
    /// Create an array from its element type name, shape, and raw bytes.
    pub fn new(datatype: impl Into<String>, shape: Vec<usize>, data: Vec<u8>) -> Self {
        Self {
            datatype: datatype.into(),
            shape,
            data,
        }
    }

    /// Element type name, e.g. `float32`.
    pub fn datatype(&self) -> &str {
        &self.datatype
    }

    /// Array shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A tag identifier attached to a plain-form value.
#[derive(Debug, Clone, PartialEq)]
pub struct Tagged {
    tag: TagUri,
    value: Box<Value>,
}

impl Tagged {
    /// Attach `tag` to `value`.
    pub fn new(tag: TagUri, value: impl Into<Value>) -> Self {
        Self {
            tag,
            value: Box::new(value.into()),
        }
    }

    /// The tag identifier.
    pub fn tag(&self) -> &TagUri {
        &self.tag
    }

    /// The plain-form value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Mutable access to the plain-form value.
    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Split into tag and plain-form value.
    pub fn into_parts(self) -> (TagUri, Value) {
        (self.tag, *self.value)
    }
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
            Value::Time(_) => "time",
            Value::Array(_) => "ndarray",
            Value::Mapping(_) => "mapping",
            Value::Sequence(_) => "sequence",
            Value::Tagged(_) => "tagged",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The value with any tag peeled off.
    pub fn untagged(&self) -> &Value {
        match self {
            Value::Tagged(tagged) => tagged.value().untagged(),
            other => other,
        }
    }

    /// The string content, looking through tags.
    pub fn as_str(&self) -> Option<&str> {
        match self.untagged() {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, looking through tags.
    pub fn as_i64(&self) -> Option<i64> {
        match self.untagged() {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The numeric content as a float, looking through tags.
    pub fn as_f64(&self) -> Option<f64> {
        match self.untagged() {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The boolean content, looking through tags.
    pub fn as_bool(&self) -> Option<bool> {
        match self.untagged() {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Mutable form of [`untagged`](Self::untagged).
    pub fn untagged_mut(&mut self) -> &mut Value {
        match self {
            Value::Tagged(tagged) => tagged.value_mut().untagged_mut(),
            other => other,
        }
    }

    /// The mapping, if this is an untagged mapping.
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// The sequence, if this is an untagged sequence.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// Mutable access to an untagged mapping.
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }

    /// Mutable access to an untagged sequence.
    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::Sequence(seq) => Some(seq),
            _ => None,
        }
    }

    /// The explicit tag of a tagged value, or the implicit tag of an
    /// array or time.
    pub fn tag_str(&self) -> Option<&str> {
        match self {
            Value::Tagged(tagged) => Some(tagged.tag().as_str()),
            Value::Array(_) => Some(NDARRAY_TAG),
            Value::Time(_) => Some(TIME_TAG),
            _ => None,
        }
    }

    /// Convert to the JSON instance form checked by the schema validator.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::DateTime(dt) => serde_json::Value::String(datetime_isoformat(dt)),
            Value::Time(t) => serde_json::Value::String(t.to_isot()),
            Value::Array(array) => json!({
                "datatype": array.datatype(),
                "shape": array.shape(),
            }),
            Value::Mapping(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Sequence(seq) => {
                serde_json::Value::Array(seq.iter().map(Value::to_json).collect())
            }
            Value::Tagged(tagged) => tagged.value().to_json(),
        }
    }
}

/// ISO-8601 form of a naive date-time: microsecond precision when there
/// is a fractional part, whole seconds otherwise.
pub fn datetime_isoformat(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Sequence(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Mapping(
                map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Time> for Value {
    fn from(t: Time) -> Self {
        Value::Time(t)
    }
}

impl From<NdArray> for Value {
    fn from(array: NdArray) -> Self {
        Value::Array(array)
    }
}

impl From<Mapping> for Value {
    fn from(map: Mapping) -> Self {
        Value::Mapping(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(seq: Vec<Value>) -> Self {
        Value::Sequence(seq)
    }
}

impl From<Tagged> for Value {
    fn from(tagged: Tagged) -> Self {
        Value::Tagged(tagged)
    }
}
