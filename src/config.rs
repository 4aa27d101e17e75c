//! Default attribute values for mesh nodes.

use crate::body::DrawMode;

/// Default property values applied to a freshly constructed node.
///
/// Properties written through [`MeshNode::set_attribute`](crate::MeshNode::set_attribute)
/// are tracked against these defaults; only values that differ are carried
/// over when a node is cloned.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDefaults {
    /// Draw mode of the renderable body.
    pub mode: DrawMode,
    /// Flat RGBA palette used for the derived `color` attribute.
    pub colors: Vec<f32>,
    /// Number of consecutive vertices sharing one palette entry.
    pub color_divisor: i64,
    /// Box extents along X, Y, Z.
    pub box_size: [f32; 3],
    /// Box segment counts along X, Y, Z.
    pub box_segments: [u32; 3],
}

impl Default for NodeDefaults {
    fn default() -> Self {
        Self {
            mode: DrawMode::Triangles,
            colors: vec![0.5, 0.5, 0.5, 1.0],
            color_divisor: 3,
            box_size: [1.0, 1.0, 1.0],
            box_segments: [1, 1, 1],
        }
    }
}

impl NodeDefaults {
    /// Set the default draw mode.
    pub fn with_mode(mut self, mode: DrawMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the default palette.
    pub fn with_colors(mut self, colors: Vec<f32>) -> Self {
        self.colors = colors;
        self
    }

    /// Set the default color divisor.
    pub fn with_color_divisor(mut self, divisor: i64) -> Self {
        self.color_divisor = divisor;
        self
    }
}
