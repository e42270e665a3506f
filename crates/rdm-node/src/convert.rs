//! # Plain-form Converter
//!
//! The contract the serialization layer uses to write tagged nodes out and
//! read them back: pick the tag for a node, strip the node to its plain
//! form, and rebuild the registered class from a plain form plus tag.
//!
//! Scalar `origin` and `telescope` values are checked against their fixed
//! enumerations in both directions while validation is enabled.

use std::sync::Arc;

use rdm_core::{enumerated_field_violation, TagUri, ValidationPolicy, Value};
use rdm_schema::ValidationError;

use crate::class::NodeKind;
use crate::error::NodeError;
use crate::registry::NodeRegistry;
use crate::tagged::TaggedNode;

/// Converts tagged nodes to and from their plain forms.
#[derive(Debug, Clone, Copy)]
pub struct NodeConverter<'r> {
    classes: &'r NodeRegistry,
    policy: ValidationPolicy,
}

impl<'r> NodeConverter<'r> {
    pub fn new(classes: &'r NodeRegistry, policy: ValidationPolicy) -> Self {
        Self { classes, policy }
    }

    /// Every tag this converter handles.
    pub fn tags(&self) -> impl Iterator<Item = &'r TagUri> {
        self.classes.node_classes().map(|class| class.tag())
    }

    /// The tag `node` is written under.
    pub fn tag<'n>(&self, node: &'n TaggedNode) -> &'n TagUri {
        node.tag()
    }

    /// Strip `node` to its plain form.
    ///
    /// # Errors
    ///
    /// [`NodeError::Validation`] when an enumerated scalar holds a value
    /// outside its enumeration.
    pub fn to_plain_form(&self, node: &TaggedNode) -> Result<Value, NodeError> {
        let plain = node.plain_form();
        if let TaggedNode::Scalar(_) = node {
            self.check_enumeration(node.tag(), &plain)?;
        }
        Ok(plain)
    }

    /// Rebuild the class registered for `tag` from its plain form.
    ///
    /// # Errors
    ///
    /// [`NodeError::UnknownTag`] for an unregistered tag,
    /// [`NodeError::Construction`] for a plain form of the wrong shape, and
    /// [`NodeError::Validation`] for an enumeration violation.
    pub fn from_plain_form(&self, raw: Value, tag: &TagUri) -> Result<TaggedNode, NodeError> {
        let class = self
            .classes
            .class_for_tag(tag)
            .ok_or_else(|| NodeError::UnknownTag {
                tag: tag.to_string(),
            })?;
        if let NodeKind::Scalar(_) = class.kind() {
            self.check_enumeration(tag, &raw)?;
        }
        TaggedNode::build(Arc::clone(class), raw)
    }

    fn check_enumeration(&self, tag: &TagUri, value: &Value) -> Result<(), NodeError> {
        if !self.policy.enabled {
            return Ok(());
        }
        let key = tag.scalar_key();
        match enumerated_field_violation(key, value) {
            Some(message) => {
                tracing::debug!(tag = %tag, "enumerated scalar rejected");
                Err(ValidationError::new(key, message).into())
            }
            None => Ok(()),
        }
    }
}
