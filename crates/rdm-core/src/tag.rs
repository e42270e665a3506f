//! # Tag Identifiers
//!
//! Tags are opaque versioned URIs of the form
//! `<namespace>/tags/<name>-<version>`, for example
//! `asdf://stsci.edu/datamodels/roman/tags/wfi_mode-1.0.0`. The name segment
//! drives both class naming (`WfiMode`) and the scalar auto-promotion key
//! (`wfi_mode`).
//!
//! Reference-file tags live one level deeper
//! (`.../tags/reference_files/flat-1.0.0`) and their classes carry a `Ref`
//! suffix (`FlatRef`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RdmError;

const TAGS_SEGMENT: &str = "/tags/";
const REFERENCE_FILES_DIR: &str = "reference_files/";

/// A validated tag identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TagUri(String);

impl TagUri {
    /// Parse a tag identifier, rejecting anything without a `/tags/`
    /// segment or without a `<name>-<version>` final segment.
    pub fn parse(uri: impl Into<String>) -> Result<Self, RdmError> {
        let uri = uri.into();
        let invalid = |reason: &str| RdmError::InvalidTag {
            uri: uri.clone(),
            reason: reason.to_string(),
        };

        let Some(idx) = uri.find(TAGS_SEGMENT) else {
            return Err(invalid("missing '/tags/' segment"));
        };
        if idx == 0 {
            return Err(invalid("empty namespace"));
        }
        let local = &uri[idx + TAGS_SEGMENT.len()..];
        let last = local.rsplit('/').next().unwrap_or(local);
        match last.split_once('-') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {}
            _ => return Err(invalid("final segment must be '<name>-<version>'")),
        }
        Ok(Self(uri))
    }

    /// The full identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before `/tags/`.
    pub fn namespace(&self) -> &str {
        self.0
            .find(TAGS_SEGMENT)
            .map(|idx| &self.0[..idx])
            .unwrap_or(&self.0)
    }

    /// The part after `/tags/`, e.g. `reference_files/flat-1.0.0`.
    fn local(&self) -> &str {
        self.0
            .find(TAGS_SEGMENT)
            .map(|idx| &self.0[idx + TAGS_SEGMENT.len()..])
            .unwrap_or(&self.0)
    }

    fn last_segment(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The name segment before the version, e.g. `wfi_mode`.
    pub fn name(&self) -> &str {
        let last = self.last_segment();
        last.split('-').next().unwrap_or(last)
    }

    /// The version after the first `-` of the final segment.
    pub fn version(&self) -> &str {
        let last = self.last_segment();
        last.split_once('-').map(|(_, v)| v).unwrap_or("")
    }

    /// Key under which a scalar node class is found for auto-promotion.
    pub fn scalar_key(&self) -> &str {
        self.name()
    }

    /// Whether the tag lives under the reference-file namespace.
    pub fn is_reference_file(&self) -> bool {
        self.local().starts_with(REFERENCE_FILES_DIR)
    }

    /// Derive the node class name: the camel-cased name segment, with a
    /// `Ref` suffix for reference-file tags.
    pub fn class_name(&self) -> String {
        let mut class_name: String = self.name().split('_').map(capitalize).collect();
        if self.is_reference_file() {
            class_name.push_str("Ref");
        }
        class_name
    }

    /// Whether this tag matches a pattern that may contain `*` wildcards.
    pub fn matches(&self, pattern: &str) -> bool {
        tag_matches(pattern, &self.0)
    }
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Match a tag against a pattern in which `*` stands for any run of
/// characters. Patterns without wildcards must match exactly.
pub fn tag_matches(pattern: &str, tag: &str) -> bool {
    let mut parts = pattern.split('*');
    let first = parts.next().unwrap_or("");
    let Some(mut rest) = tag.strip_prefix(first) else {
        return false;
    };
    let parts: Vec<&str> = parts.collect();
    let Some((last, middle)) = parts.split_last() else {
        return rest.is_empty();
    };
    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}

impl fmt::Display for TagUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TagUri {
    type Err = RdmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TagUri {
    type Error = RdmError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for TagUri {
    type Error = RdmError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TagUri> for String {
    fn from(tag: TagUri) -> Self {
        tag.0
    }
}

impl AsRef<str> for TagUri {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TagUri {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for TagUri {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
