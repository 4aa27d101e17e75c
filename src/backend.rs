//! Rendering backend abstraction.
//!
//! A [`RenderContext`] is the opaque handle a [`Program`](crate::Program) is
//! created against. Mesh nodes never talk to the GPU directly; they resolve
//! draw-mode constants and submit draws through this trait.

use std::fmt;

use parking_lot::Mutex;

use crate::body::DrawMode;

/// Backend capability consumed by programs and renderable bodies.
pub trait RenderContext: Send + Sync + fmt::Debug {
    /// Backend name, used in log output.
    fn name(&self) -> &str;

    /// Resolve a draw mode to the backend's primitive constant.
    fn mode_constant(&self, mode: DrawMode) -> u32;

    /// Upload the raw bytes of one vertex attribute.
    fn upload_attribute(&self, name: &str, bytes: &[u8]);

    /// Submit a draw call.
    fn draw(&self, call: DrawCall);
}

/// A draw call as seen by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Backend primitive constant.
    pub mode: u32,
    /// Number of vertices in the bound geometry.
    pub vertex_count: usize,
    /// Number of indices, for indexed geometry.
    pub index_count: Option<usize>,
}

/// A recorded attribute upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUpload {
    pub name: String,
    pub byte_len: usize,
}

/// Backend that performs no GPU work and records everything it is asked to do.
///
/// Uses GL primitive constants so mode values match what a WebGL-style
/// backend would see.
#[derive(Debug, Default)]
pub struct HeadlessContext {
    uploads: Mutex<Vec<AttributeUpload>>,
    draws: Mutex<Vec<DrawCall>>,
}

impl HeadlessContext {
    /// Create a new headless context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute uploads recorded so far.
    pub fn uploads(&self) -> Vec<AttributeUpload> {
        self.uploads.lock().clone()
    }

    /// Draw calls recorded so far.
    pub fn draws(&self) -> Vec<DrawCall> {
        self.draws.lock().clone()
    }

    /// Forget all recorded uploads and draws.
    pub fn clear(&self) {
        self.uploads.lock().clear();
        self.draws.lock().clear();
    }
}

impl RenderContext for HeadlessContext {
    fn name(&self) -> &str {
        "Headless"
    }

    fn mode_constant(&self, mode: DrawMode) -> u32 {
        mode.gl_constant()
    }

    fn upload_attribute(&self, name: &str, bytes: &[u8]) {
        log::trace!("HeadlessContext: uploading `{}` ({} bytes)", name, bytes.len());
        self.uploads.lock().push(AttributeUpload {
            name: name.to_string(),
            byte_len: bytes.len(),
        });
    }

    fn draw(&self, call: DrawCall) {
        log::trace!("HeadlessContext: draw {:?}", call);
        self.draws.lock().push(call);
    }
}
