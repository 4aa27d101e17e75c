//! Renderable bodies.
//!
//! A [`RenderableBody`] binds a draw mode, a geometry and a program into the
//! unit that is submitted to the backend. Bodies are replaced wholesale when
//! either the geometry or the program changes; only the draw mode and the
//! render hook lists are mutable in place.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::backend::DrawCall;
use crate::error::MeshError;
use crate::geometry::SharedGeometry;
use crate::node::property;
use crate::program::Program;

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DrawMode {
    Points,
    Lines,
    LineLoop,
    LineStrip,
    #[default]
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl DrawMode {
    pub const ALL: [DrawMode; 7] = [
        Self::Points,
        Self::Lines,
        Self::LineLoop,
        Self::LineStrip,
        Self::Triangles,
        Self::TriangleStrip,
        Self::TriangleFan,
    ];

    /// GL enum name, e.g. `"TRIANGLES"`.
    pub fn gl_name(&self) -> &'static str {
        match self {
            Self::Points => "POINTS",
            Self::Lines => "LINES",
            Self::LineLoop => "LINE_LOOP",
            Self::LineStrip => "LINE_STRIP",
            Self::Triangles => "TRIANGLES",
            Self::TriangleStrip => "TRIANGLE_STRIP",
            Self::TriangleFan => "TRIANGLE_FAN",
        }
    }

    /// GL enum value.
    pub fn gl_constant(&self) -> u32 {
        match self {
            Self::Points => 0x0000,
            Self::Lines => 0x0001,
            Self::LineLoop => 0x0002,
            Self::LineStrip => 0x0003,
            Self::Triangles => 0x0004,
            Self::TriangleStrip => 0x0005,
            Self::TriangleFan => 0x0006,
        }
    }
}

impl fmt::Display for DrawMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.gl_name())
    }
}

impl FromStr for DrawMode {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.gl_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| MeshError::invalid(property::MODE, format!("unknown draw mode `{s}`")))
    }
}

/// Payload passed to render hooks.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RenderInfo {
    /// Frame counter of the submitting renderer.
    pub frame: u64,
    /// Seconds since the previous frame.
    pub delta_time: f32,
}

/// Callback run before or after a body is drawn.
pub type RenderHook = Arc<dyn Fn(&RenderInfo) + Send + Sync>;

/// Which hook list of a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    BeforeRender,
    AfterRender,
}

static NEXT_BODY_ID: AtomicU64 = AtomicU64::new(1);

fn same_hook(a: &RenderHook, b: &RenderHook) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

/// The (draw mode, geometry, program) triple submitted to the backend.
pub struct RenderableBody {
    id: u64,
    mode: RwLock<DrawMode>,
    geometry: SharedGeometry,
    program: Arc<Program>,
    before_render: Mutex<Vec<RenderHook>>,
    after_render: Mutex<Vec<RenderHook>>,
}

impl RenderableBody {
    /// Create a body with empty hook lists.
    pub fn new(mode: DrawMode, geometry: SharedGeometry, program: Arc<Program>) -> Self {
        Self {
            id: NEXT_BODY_ID.fetch_add(1, Ordering::Relaxed),
            mode: RwLock::new(mode),
            geometry,
            program,
            before_render: Mutex::new(Vec::new()),
            after_render: Mutex::new(Vec::new()),
        }
    }

    /// Process-unique id, for logging.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current draw mode.
    pub fn mode(&self) -> DrawMode {
        *self.mode.read()
    }

    /// Change the draw mode without rebuilding the body.
    pub fn set_mode(&self, mode: DrawMode) {
        *self.mode.write() = mode;
    }

    /// Backend constant for the current draw mode.
    pub fn mode_constant(&self) -> u32 {
        self.program.context().mode_constant(self.mode())
    }

    /// Bound geometry.
    pub fn geometry(&self) -> &SharedGeometry {
        &self.geometry
    }

    /// Bound program.
    pub fn program(&self) -> &Arc<Program> {
        &self.program
    }

    fn hooks(&self, kind: HookKind) -> &Mutex<Vec<RenderHook>> {
        match kind {
            HookKind::BeforeRender => &self.before_render,
            HookKind::AfterRender => &self.after_render,
        }
    }

    /// Append a hook to one of the hook lists.
    pub fn add_hook(&self, kind: HookKind, hook: RenderHook) {
        self.hooks(kind).lock().push(hook);
    }

    /// Remove a hook by identity. Returns `true` if it was present.
    pub fn remove_hook(&self, kind: HookKind, hook: &RenderHook) -> bool {
        let mut hooks = self.hooks(kind).lock();
        match hooks.iter().position(|h| same_hook(h, hook)) {
            Some(idx) => {
                hooks.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Whether this exact hook is attached.
    pub fn has_hook(&self, kind: HookKind, hook: &RenderHook) -> bool {
        self.hooks(kind).lock().iter().any(|h| same_hook(h, hook))
    }

    /// Number of hooks in one list.
    pub fn hook_count(&self, kind: HookKind) -> usize {
        self.hooks(kind).lock().len()
    }

    pub fn on_before_render(&self, hook: RenderHook) {
        self.add_hook(HookKind::BeforeRender, hook);
    }

    pub fn on_after_render(&self, hook: RenderHook) {
        self.add_hook(HookKind::AfterRender, hook);
    }

    fn run_hooks(&self, kind: HookKind, info: &RenderInfo) {
        // Snapshot so hooks may add or remove hooks while running.
        let hooks = self.hooks(kind).lock().clone();
        for hook in hooks {
            hook(info);
        }
    }

    /// Submit the body: run before-render hooks, upload dirty attributes,
    /// draw, then run after-render hooks.
    pub fn draw(&self, info: &RenderInfo) {
        self.run_hooks(HookKind::BeforeRender, info);

        let context = self.program.context();
        let call = {
            let mut geometry = self.geometry.write();
            geometry.flush_dirty(|name, attribute| {
                context.upload_attribute(name, attribute.as_bytes());
            });
            DrawCall {
                mode: self.mode_constant(),
                vertex_count: geometry.vertex_count().unwrap_or(0),
                index_count: geometry.index().map(<[u32]>::len),
            }
        };
        context.draw(call);

        self.run_hooks(HookKind::AfterRender, info);
    }
}

impl fmt::Debug for RenderableBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderableBody")
            .field("id", &self.id)
            .field("mode", &self.mode())
            .field("before_render", &self.hook_count(HookKind::BeforeRender))
            .field("after_render", &self.hook_count(HookKind::AfterRender))
            .finish()
    }
}
