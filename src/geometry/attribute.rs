use std::collections::BTreeMap;

use crate::error::{MeshError, MeshResult};

use super::POSITION;

/// A named per-vertex array.
///
/// `data` holds `count() * size` floats. `needs_update` marks the array
/// for re-upload on the next draw.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryAttribute {
    /// Number of components per vertex (1..=4).
    pub size: usize,
    /// Flat component data.
    pub data: Vec<f32>,
    /// Whether the array changed since it was last uploaded.
    pub needs_update: bool,
}

impl GeometryAttribute {
    /// Create a new attribute, marked for upload.
    pub fn new(size: usize, data: Vec<f32>) -> Self {
        Self {
            size,
            data,
            needs_update: true,
        }
    }

    /// Number of vertices described by this attribute.
    pub fn count(&self) -> usize {
        if self.size == 0 {
            0
        } else {
            self.data.len() / self.size
        }
    }

    /// Raw bytes of the component data.
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }

    fn validate(&self, name: &str) -> MeshResult<()> {
        if !(1..=4).contains(&self.size) {
            return Err(MeshError::invalid(
                name,
                format!("component size {} is outside 1..=4", self.size),
            ));
        }
        if self.data.len() % self.size != 0 {
            return Err(MeshError::invalid(
                name,
                format!(
                    "length {} is not a multiple of component size {}",
                    self.data.len(),
                    self.size
                ),
            ));
        }
        Ok(())
    }
}

/// Raw attribute arrays that have not been wrapped in a [`Geometry`] yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeDescription {
    pub attributes: BTreeMap<String, GeometryAttribute>,
    pub index: Option<Vec<u32>>,
}

impl AttributeDescription {
    /// Create an empty description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute array.
    pub fn with_attribute(mut self, name: impl Into<String>, size: usize, data: Vec<f32>) -> Self {
        self.attributes
            .insert(name.into(), GeometryAttribute::new(size, data));
        self
    }

    /// Set the index buffer.
    pub fn with_index(mut self, index: Vec<u32>) -> Self {
        self.index = Some(index);
        self
    }
}

/// A set of named vertex attributes sharing one vertex count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    attributes: BTreeMap<String, GeometryAttribute>,
    index: Option<Vec<u32>>,
}

impl Geometry {
    /// Create an empty geometry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a raw description, validating component sizes, vertex counts
    /// and index bounds.
    pub fn from_description(description: AttributeDescription) -> MeshResult<Self> {
        let mut geometry = Self::new();
        let mut attributes = description.attributes;
        // Position first, so count mismatches are reported on the other attribute.
        if let Some(position) = attributes.remove(POSITION) {
            geometry.add_attribute(POSITION, position)?;
        }
        for (name, attribute) in attributes {
            geometry.add_attribute(name, attribute)?;
        }
        if let Some(index) = description.index {
            geometry.set_index(index)?;
        }
        Ok(geometry)
    }

    /// Add or replace a named attribute.
    ///
    /// The attribute must describe the same number of vertices as the
    /// attributes already present.
    pub fn add_attribute(
        &mut self,
        name: impl Into<String>,
        attribute: GeometryAttribute,
    ) -> MeshResult<()> {
        let name = name.into();
        attribute.validate(&name)?;

        let existing = self
            .attributes
            .iter()
            .find(|(other, _)| **other != name)
            .map(|(_, other)| other.count());
        if let Some(count) = existing {
            if count != attribute.count() {
                return Err(MeshError::invalid(
                    name,
                    format!(
                        "vertex count {} does not match geometry vertex count {}",
                        attribute.count(),
                        count
                    ),
                ));
            }
        }

        self.attributes.insert(name, attribute);
        Ok(())
    }

    /// Set the index buffer. Every index must address an existing vertex.
    pub fn set_index(&mut self, index: Vec<u32>) -> MeshResult<()> {
        let count = self.vertex_count().unwrap_or(0);
        if let Some(bad) = index.iter().find(|&&i| i as usize >= count) {
            return Err(MeshError::invalid(
                "index",
                format!("index {bad} out of range for {count} vertices"),
            ));
        }
        self.index = Some(index);
        Ok(())
    }

    /// Look up an attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&GeometryAttribute> {
        self.attributes.get(name)
    }

    /// Look up an attribute by name for in-place modification.
    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut GeometryAttribute> {
        self.attributes.get_mut(name)
    }

    /// Whether an attribute with this name exists.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Names of all attributes, in sorted order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// Number of vertices, taken from the position attribute when present.
    pub fn vertex_count(&self) -> Option<usize> {
        self.attributes
            .get(POSITION)
            .or_else(|| self.attributes.values().next())
            .map(GeometryAttribute::count)
    }

    /// Index buffer, for indexed geometry.
    pub fn index(&self) -> Option<&[u32]> {
        self.index.as_deref()
    }

    /// Visit every attribute marked for upload and clear its flag.
    pub fn flush_dirty(&mut self, mut visit: impl FnMut(&str, &GeometryAttribute)) -> usize {
        let mut flushed = 0;
        for (name, attribute) in self.attributes.iter_mut() {
            if attribute.needs_update {
                visit(name, attribute);
                attribute.needs_update = false;
                flushed += 1;
            }
        }
        flushed
    }

    /// Copy the attribute arrays back out into a raw description.
    pub fn to_description(&self) -> AttributeDescription {
        AttributeDescription {
            attributes: self.attributes.clone(),
            index: self.index.clone(),
        }
    }
}
