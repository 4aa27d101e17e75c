use glam::Vec3;

use crate::error::{MeshError, MeshResult};
use crate::geometry::{Geometry, GeometryAttribute, NORMAL, POSITION};

/// Normal assigned to vertices whose triangulation is unknown, and to
/// degenerate triangles.
pub const SENTINEL_NORMAL: [f32; 3] = [-1.0, 0.0, 0.0];

const FLOATS_PER_TRIANGLE: usize = 9;

/// Unit normal of the triangle `(a, b, c)`.
///
/// Computed as `(a - b) x (b - c)`, which points along the
/// counter-clockwise face normal. Fails for collinear or coincident vertices.
pub fn face_normal(a: Vec3, b: Vec3, c: Vec3, triangle: usize) -> MeshResult<Vec3> {
    (a - b)
        .cross(b - c)
        .try_normalize()
        .ok_or(MeshError::DegenerateGeometry { triangle })
}

/// Flat normals for a position buffer.
///
/// When the buffer length is a multiple of 9 it is read as independent
/// triangles and every vertex of a triangle gets that triangle's normal.
/// Otherwise every vertex gets [`SENTINEL_NORMAL`]. The output has the same
/// vertex count as the input.
pub fn compute_normals(positions: &[f32]) -> Vec<f32> {
    let vertex_count = positions.len() / 3;
    let mut normals = Vec::with_capacity(vertex_count * 3);

    if positions.len() % FLOATS_PER_TRIANGLE != 0 {
        // TODO: fall back to averaged normals once indexed models carry their index here
        for _ in 0..vertex_count {
            normals.extend_from_slice(&SENTINEL_NORMAL);
        }
        return normals;
    }

    let mut degenerate = 0usize;
    for (triangle, tri) in positions.chunks_exact(FLOATS_PER_TRIANGLE).enumerate() {
        let a = Vec3::from_slice(&tri[0..3]);
        let b = Vec3::from_slice(&tri[3..6]);
        let c = Vec3::from_slice(&tri[6..9]);

        let normal = match face_normal(a, b, c, triangle) {
            Ok(n) => n.to_array(),
            Err(_) => {
                degenerate += 1;
                SENTINEL_NORMAL
            }
        };
        for _ in 0..3 {
            normals.extend_from_slice(&normal);
        }
    }

    if degenerate > 0 {
        log::warn!(
            "{} of {} triangles are degenerate; using sentinel normal",
            degenerate,
            positions.len() / FLOATS_PER_TRIANGLE
        );
    }

    normals
}

/// Add a `normal` attribute derived from `position`.
///
/// Returns `false` without touching the geometry if a normal attribute is
/// already present.
pub fn derive_normals(geometry: &mut Geometry) -> MeshResult<bool> {
    if geometry.has_attribute(NORMAL) {
        return Ok(false);
    }
    let positions = geometry
        .attribute(POSITION)
        .ok_or_else(|| MeshError::invalid(NORMAL, "geometry has no position attribute"))?;
    if positions.size != 3 {
        return Err(MeshError::invalid(
            POSITION,
            format!("expected 3 components, found {}", positions.size),
        ));
    }

    let normals = compute_normals(&positions.data);
    log::trace!("derived {} normals", normals.len() / 3);
    geometry.add_attribute(NORMAL, GeometryAttribute::new(3, normals))?;
    Ok(true)
}
