//! Geometry generators for primitive shapes.
//!
//! Generators produce an [`AttributeDescription`] that a mesh node wraps
//! into a [`Geometry`](super::Geometry) during remesh.

use super::{AttributeDescription, NORMAL, POSITION, UV};

/// Parameters of an axis-aligned box centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxParams {
    /// Extents along X, Y, Z.
    pub size: [f32; 3],
    /// Segment counts along X, Y, Z. Zero is treated as one.
    pub segments: [u32; 3],
}

impl Default for BoxParams {
    fn default() -> Self {
        Self {
            size: [1.0, 1.0, 1.0],
            segments: [1, 1, 1],
        }
    }
}

/// One box face: the axis and sign of its normal and of its two in-plane
/// directions. `u x v == normal` so grid cells wind counter-clockwise when
/// seen from outside.
struct Face {
    normal: (usize, f32),
    u: (usize, f32),
    v: (usize, f32),
}

const FACES: [Face; 6] = [
    // +X
    Face { normal: (0, 1.0), u: (2, -1.0), v: (1, 1.0) },
    // -X
    Face { normal: (0, -1.0), u: (2, 1.0), v: (1, 1.0) },
    // +Y
    Face { normal: (1, 1.0), u: (0, 1.0), v: (2, -1.0) },
    // -Y
    Face { normal: (1, -1.0), u: (0, 1.0), v: (2, 1.0) },
    // +Z
    Face { normal: (2, 1.0), u: (0, 1.0), v: (1, 1.0) },
    // -Z
    Face { normal: (2, -1.0), u: (0, -1.0), v: (1, 1.0) },
];

/// Generate an indexed box with `position`, `normal` and `uv` attributes.
///
/// Each face is a grid of `segments[u] x segments[v]` quads split into two
/// triangles. Faces do not share vertices, so normals are flat per face.
pub fn generate_box(params: BoxParams) -> AttributeDescription {
    let mut positions = Vec::new();
    let mut normals = Vec::new();
    let mut uvs = Vec::new();
    let mut indices = Vec::new();

    for face in &FACES {
        let segs_u = params.segments[face.u.0].max(1);
        let segs_v = params.segments[face.v.0].max(1);
        let base = (positions.len() / 3) as u32;

        for row in 0..=segs_v {
            let t = row as f32 / segs_v as f32;
            for col in 0..=segs_u {
                let s = col as f32 / segs_u as f32;

                let mut position = [0.0f32; 3];
                position[face.normal.0] = face.normal.1 * params.size[face.normal.0] * 0.5;
                position[face.u.0] = face.u.1 * (s - 0.5) * params.size[face.u.0];
                position[face.v.0] = face.v.1 * (t - 0.5) * params.size[face.v.0];

                let mut normal = [0.0f32; 3];
                normal[face.normal.0] = face.normal.1;

                positions.extend_from_slice(&position);
                normals.extend_from_slice(&normal);
                uvs.extend_from_slice(&[s, t]);
            }
        }

        let stride = segs_u + 1;
        for row in 0..segs_v {
            for col in 0..segs_u {
                let a = base + row * stride + col;
                let b = a + 1;
                let c = a + stride + 1;
                let d = a + stride;
                indices.extend_from_slice(&[a, b, c, a, c, d]);
            }
        }
    }

    AttributeDescription::new()
        .with_attribute(POSITION, 3, positions)
        .with_attribute(NORMAL, 3, normals)
        .with_attribute(UV, 2, uvs)
        .with_index(indices)
}
