//! Derived per-vertex attributes.
//!
//! Derived attributes are computed from node state and existing geometry
//! rather than supplied by the model:
//!
//! - [`compute_normals`] - flat per-face normals from a triangle position buffer
//! - [`compute_colors`] - banded per-vertex colors from a palette and divisor
//!
//! Programs keep a table of [`AttributeComputer`]s keyed by attribute name;
//! the mesh binder runs them for any consumed attribute the geometry lacks.

mod color;
mod normal;

pub use color::{color_attribute, compute_colors, validate_palette};
pub use normal::{compute_normals, derive_normals, face_normal, SENTINEL_NORMAL};

use crate::error::MeshResult;
use crate::geometry::Geometry;
use crate::node::NodeAttributes;

/// Derives one named attribute on `geometry` from the node's attributes.
///
/// If the attribute already exists the computer updates it in place and
/// marks it for re-upload; otherwise it adds a new attribute.
pub type AttributeComputer = fn(&NodeAttributes, &mut Geometry) -> MeshResult<()>;
