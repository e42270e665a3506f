//! # Hand-written Node Classes
//!
//! Three tags get classes defined in code instead of synthesized ones:
//! `wfi_mode` (an object with derived `filter`/`grating` accessors),
//! `cal_logs` (a list) and `file_date` (a time scalar). They are registered
//! before the manifest is read; the matching manifest entries only add
//! documentation.

use rdm_core::TagUri;

use crate::class::{NodeClass, NodeKind, ScalarBase};
use crate::dnode::DNode;
use crate::error::RegistryError;

pub const WFI_MODE_TAG: &str = "asdf://stsci.edu/datamodels/roman/tags/wfi_mode-1.0.0";
pub const CAL_LOGS_TAG: &str = "asdf://stsci.edu/datamodels/roman/tags/cal_logs-1.0.0";
pub const FILE_DATE_TAG: &str = "asdf://stsci.edu/datamodels/roman/tags/file_date-1.0.0";

/// Optical elements that disperse light; everything else is a filter.
pub const GRATING_OPTICAL_ELEMENTS: &[&str] = &["GRISM", "PRISM"];

/// The hand-written classes, in registration order.
pub fn classes() -> Result<Vec<NodeClass>, RegistryError> {
    Ok(vec![
        NodeClass::handwritten("WfiMode", TagUri::parse(WFI_MODE_TAG)?, NodeKind::Object),
        NodeClass::handwritten("CalLogs", TagUri::parse(CAL_LOGS_TAG)?, NodeKind::List),
        NodeClass::handwritten(
            "FileDate",
            TagUri::parse(FILE_DATE_TAG)?,
            NodeKind::Scalar(ScalarBase::Time),
        ),
    ])
}

/// A `wfi_mode` node with the optical element split into filter and grating.
#[derive(Debug)]
pub struct WfiMode<'n> {
    node: DNode<'n>,
}

impl<'n> WfiMode<'n> {
    /// Wrap `node`, or `None` when it is not tagged `wfi_mode`.
    pub fn new(node: DNode<'n>) -> Option<Self> {
        match node.tag() {
            Some(tag) if tag.as_str() == WFI_MODE_TAG => Some(Self { node }),
            _ => None,
        }
    }

    pub fn optical_element(&self) -> Option<&str> {
        self.node.raw().get("optical_element").and_then(|v| v.as_str())
    }

    /// The optical element, unless it is a grating.
    pub fn filter(&self) -> Option<&str> {
        self.optical_element().filter(|e| !is_grating(e))
    }

    /// The optical element, if it is a grating.
    pub fn grating(&self) -> Option<&str> {
        self.optical_element().filter(|e| is_grating(e))
    }

    pub fn node(&mut self) -> &mut DNode<'n> {
        &mut self.node
    }

    pub fn into_node(self) -> DNode<'n> {
        self.node
    }
}

fn is_grating(element: &str) -> bool {
    GRATING_OPTICAL_ELEMENTS.contains(&element)
}
