//! Mesh Node - reactive attribute-to-geometry derivation for scene-graph mesh nodes
//!
//! A [`MeshNode`] binds a shading [`Program`] to a [`Geometry`] through a
//! [`RenderableBody`] and keeps that binding current as node properties change:
//! - Structural properties (box dimensions, segment counts) regenerate the geometry
//! - Derived properties (palette, color divisor) update one attribute in place
//! - The draw mode is changed on the existing body
//!
//! # Features
//! - Flat per-face normal derivation for programs that consume `normal`
//! - Palette banding for programs that consume `color`
//! - A per-program table of extra-attribute computers
//! - Lazy render hook forwarding keyed on listener count
//! - One-shot pending models resolved from another thread
//! - A headless render context for tests and tooling

pub mod backend;
pub mod body;
pub mod config;
pub mod derived;
pub mod error;
pub mod geometry;
pub mod node;
pub mod program;

pub use backend::{HeadlessContext, RenderContext};
pub use body::{DrawMode, RenderHook, RenderInfo, RenderableBody};
pub use config::NodeDefaults;
pub use error::{MeshError, MeshResult};
pub use geometry::{AttributeDescription, Geometry, GeometryAttribute, SharedGeometry};
pub use node::{
    property, AttributeValue, BinderState, ChangeClass, ListenerId, MeshEvent, MeshEventKind,
    MeshNode, MeshShape, Model, ModelResolver, NodeDescriptor, PendingModel,
};
pub use program::Program;
