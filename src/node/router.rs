//! Classification of property writes.

use crate::geometry::COLOR;

use super::attributes::{property, AttributeValue};
use super::MeshShape;

/// What a property write requires of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeClass {
    /// Regenerate the geometry and rebuild the body.
    Structural,
    /// Recompute one derived attribute in place.
    Derived { attribute: &'static str },
    /// Update the draw mode on the existing body.
    RenderMode,
    /// Nothing to do.
    Ignored,
}

/// Properties feeding a derived attribute, and the attribute they feed.
const DERIVED_PROPERTIES: &[(&str, &str)] = &[
    (property::COLORS, COLOR),
    (property::COLOR_DIVISOR, COLOR),
];

const BOX_STRUCTURAL: &[&str] = &[
    property::WIDTH,
    property::HEIGHT,
    property::DEPTH,
    property::WIDTH_SEGMENTS,
    property::HEIGHT_SEGMENTS,
    property::DEPTH_SEGMENTS,
];

/// Decides, per property write, which regeneration a node needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeChangeRouter {
    structural: &'static [&'static str],
}

impl AttributeChangeRouter {
    /// Router with a custom structural property list.
    pub const fn new(structural: &'static [&'static str]) -> Self {
        Self { structural }
    }

    /// Router for a node shape. Generic meshes have no structural properties.
    pub const fn for_shape(shape: MeshShape) -> Self {
        match shape {
            MeshShape::Mesh => Self::new(&[]),
            MeshShape::Box => Self::new(BOX_STRUCTURAL),
        }
    }

    pub fn structural_properties(&self) -> &'static [&'static str] {
        self.structural
    }

    /// Category of a property, regardless of its value.
    pub fn classify(&self, key: &str) -> ChangeClass {
        if self.structural.iter().any(|prop| *prop == key) {
            return ChangeClass::Structural;
        }
        if let Some((_, attribute)) = DERIVED_PROPERTIES.iter().find(|(prop, _)| *prop == key) {
            return ChangeClass::Derived {
                attribute: *attribute,
            };
        }
        if key == property::MODE {
            return ChangeClass::RenderMode;
        }
        ChangeClass::Ignored
    }

    /// Category of a write from `old` to `new`. Writes that do not change
    /// the value are always ignored.
    pub fn route(
        &self,
        key: &str,
        old: Option<&AttributeValue>,
        new: Option<&AttributeValue>,
    ) -> ChangeClass {
        if old == new {
            return ChangeClass::Ignored;
        }
        self.classify(key)
    }
}
