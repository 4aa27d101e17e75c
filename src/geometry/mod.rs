//! CPU-side vertex geometry.
//!
//! This module provides:
//! - [`GeometryAttribute`] - One named per-vertex array with its component size
//! - [`AttributeDescription`] - A raw, unvalidated set of attributes
//! - [`Geometry`] - A validated attribute set sharing one vertex count
//! - Generators for primitive shapes (box)

mod attribute;
pub mod generators;

use std::sync::Arc;

use parking_lot::RwLock;

pub use attribute::{AttributeDescription, Geometry, GeometryAttribute};

/// Geometry shared between a node and its renderable body.
pub type SharedGeometry = Arc<RwLock<Geometry>>;

/// Name of the position attribute.
pub const POSITION: &str = "position";
/// Name of the normal attribute.
pub const NORMAL: &str = "normal";
/// Name of the color attribute.
pub const COLOR: &str = "color";
/// Name of the texture coordinate attribute.
pub const UV: &str = "uv";
