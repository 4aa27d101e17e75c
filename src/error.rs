//! Error types for mesh nodes.

use thiserror::Error;

/// Errors produced while building or updating a mesh node.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// Construction could not resolve a shading program.
    #[error("no program specified")]
    MissingProgram,
    /// A node property or geometry attribute failed validation.
    #[error("invalid attribute `{name}`: {reason}")]
    InvalidAttribute { name: String, reason: String },
    /// A triangle has collinear or coincident vertices.
    #[error("degenerate triangle at index {triangle}")]
    DegenerateGeometry { triangle: usize },
    /// A pending model failed to resolve.
    #[error("model resolution failed: {0}")]
    ModelResolution(String),
    /// The node has been disposed.
    #[error("mesh node has been disposed")]
    Disposed,
}

impl MeshError {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAttribute {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type MeshResult<T> = Result<T, MeshError>;
