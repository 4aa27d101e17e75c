//! Node property storage.
//!
//! [`NodeAttributes`] is an open key/value store: known properties have typed
//! accessors and defaults, unknown ones are stored as given and never
//! trigger any regeneration.

use std::collections::BTreeMap;

use crate::body::DrawMode;
use crate::config::NodeDefaults;
use crate::error::{MeshError, MeshResult};

use super::MeshShape;

/// Well-known property names.
pub mod property {
    pub const WIDTH: &str = "width";
    pub const HEIGHT: &str = "height";
    pub const DEPTH: &str = "depth";
    pub const WIDTH_SEGMENTS: &str = "widthSegments";
    pub const HEIGHT_SEGMENTS: &str = "heightSegments";
    pub const DEPTH_SEGMENTS: &str = "depthSegments";
    pub const COLORS: &str = "colors";
    pub const COLOR_DIVISOR: &str = "colorDivisor";
    pub const MODE: &str = "mode";
}

/// Properties stored as [`AttributeValue::Number`].
const REAL_PROPERTIES: &[&str] = &[property::WIDTH, property::HEIGHT, property::DEPTH];

/// Properties stored as [`AttributeValue::Integer`] when the written value is integral.
const INTEGER_PROPERTIES: &[&str] = &[
    property::WIDTH_SEGMENTS,
    property::HEIGHT_SEGMENTS,
    property::DEPTH_SEGMENTS,
    property::COLOR_DIVISOR,
];

/// A property value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Number(f32),
    Integer(i64),
    Bool(bool),
    Text(String),
    Colors(Vec<f32>),
    Mode(DrawMode),
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(value: Vec<f32>) -> Self {
        Self::Colors(value)
    }
}

impl From<&[f32]> for AttributeValue {
    fn from(value: &[f32]) -> Self {
        Self::Colors(value.to_vec())
    }
}

impl From<DrawMode> for AttributeValue {
    fn from(value: DrawMode) -> Self {
        Self::Mode(value)
    }
}

impl AttributeValue {
    /// Numeric value, for `Number` and `Integer`.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Integer(v) => Some(*v as f32),
            _ => None,
        }
    }

    /// Integral value, for `Integer` and whole `Number`s.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Number(v) if v.is_finite() && v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }
}

/// Property set of one mesh node.
#[derive(Debug, Clone)]
pub struct NodeAttributes {
    values: BTreeMap<String, AttributeValue>,
    defaults: BTreeMap<String, AttributeValue>,
}

impl NodeAttributes {
    /// Create the default property set for a node shape.
    pub fn new(shape: MeshShape, defaults: &NodeDefaults) -> Self {
        let mut initial = BTreeMap::new();
        initial.insert(property::MODE.to_string(), AttributeValue::Mode(defaults.mode));
        initial.insert(
            property::COLORS.to_string(),
            AttributeValue::Colors(defaults.colors.clone()),
        );
        initial.insert(
            property::COLOR_DIVISOR.to_string(),
            AttributeValue::Integer(defaults.color_divisor),
        );

        if shape == MeshShape::Box {
            let sizes = [property::WIDTH, property::HEIGHT, property::DEPTH];
            for (key, value) in sizes.into_iter().zip(defaults.box_size) {
                initial.insert(key.to_string(), AttributeValue::Number(value));
            }
            let segments = [
                property::WIDTH_SEGMENTS,
                property::HEIGHT_SEGMENTS,
                property::DEPTH_SEGMENTS,
            ];
            for (key, value) in segments.into_iter().zip(defaults.box_segments) {
                initial.insert(key.to_string(), AttributeValue::Integer(value.into()));
            }
        }

        Self {
            values: initial.clone(),
            defaults: initial,
        }
    }

    /// Current value of a property.
    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    /// Store a property value, returning the previous one.
    ///
    /// `mode` accepts a [`DrawMode`] or its GL name and is normalized to
    /// [`AttributeValue::Mode`]; anything else is rejected. Box sizes are
    /// stored as numbers and segment counts and the color divisor as
    /// integers, so equal values compare equal whatever form they were
    /// written in.
    pub fn set(
        &mut self,
        key: &str,
        value: AttributeValue,
    ) -> MeshResult<Option<AttributeValue>> {
        let value = match key {
            property::MODE => match value {
                AttributeValue::Mode(mode) => AttributeValue::Mode(mode),
                AttributeValue::Text(name) => AttributeValue::Mode(name.parse()?),
                other => {
                    return Err(MeshError::invalid(
                        property::MODE,
                        format!("expected a draw mode, got {other:?}"),
                    ))
                }
            },
            _ if REAL_PROPERTIES.contains(&key) => match value.as_f32() {
                Some(number) => AttributeValue::Number(number),
                None => value,
            },
            _ if INTEGER_PROPERTIES.contains(&key) => match value.as_i64() {
                Some(integer) => AttributeValue::Integer(integer),
                None => value,
            },
            _ => value,
        };
        Ok(self.values.insert(key.to_string(), value))
    }

    /// Put back a value returned by [`set`](Self::set).
    pub(crate) fn restore(&mut self, key: &str, previous: Option<AttributeValue>) {
        match previous {
            Some(value) => {
                self.values.insert(key.to_string(), value);
            }
            None => {
                self.values.remove(key);
            }
        }
    }

    /// Properties whose value differs from the shape's defaults.
    pub fn changed(&self) -> Vec<(String, AttributeValue)> {
        self.values
            .iter()
            .filter(|(key, value)| self.defaults.get(*key) != Some(*value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Iterate over all properties.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn number(&self, key: &str) -> Option<f32> {
        self.get(key).and_then(AttributeValue::as_f32)
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(AttributeValue::as_i64)
    }

    /// Flat RGBA palette; empty if unset or not a palette.
    pub fn colors(&self) -> &[f32] {
        match self.get(property::COLORS) {
            Some(AttributeValue::Colors(colors)) => colors,
            _ => &[],
        }
    }

    /// Color divisor; zero if unset or not integral.
    pub fn color_divisor(&self) -> i64 {
        self.integer(property::COLOR_DIVISOR).unwrap_or(0)
    }

    pub fn mode(&self) -> DrawMode {
        match self.get(property::MODE) {
            Some(AttributeValue::Mode(mode)) => *mode,
            _ => DrawMode::default(),
        }
    }
}
