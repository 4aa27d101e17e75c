//! Mesh nodes.
//!
//! A [`MeshNode`] composes a property set, a change router, a model slot and
//! a [`MeshBinder`]. Property writes go through [`MeshNode::set_attribute`],
//! which classifies the write and performs exactly the regeneration it
//! needs: a full remesh, an in-place derived attribute update, a draw mode
//! change, or nothing.

mod attributes;
mod binder;
mod events;
mod model;
mod router;

pub use attributes::{property, AttributeValue, NodeAttributes};
pub use binder::{BinderState, MeshBinder};
pub use events::{Listener, ListenerId, MeshEvent, MeshEventKind};
pub use model::{Model, ModelPoll, ModelResolver, ModelSource, PendingModel};
pub use router::{AttributeChangeRouter, ChangeClass};

use std::sync::Arc;

use crate::body::{DrawMode, RenderableBody};
use crate::config::NodeDefaults;
use crate::error::{MeshError, MeshResult};
use crate::geometry::generators::{generate_box, BoxParams};
use crate::geometry::SharedGeometry;
use crate::program::Program;

use events::EventHub;

/// Kind of geometry a node produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeshShape {
    /// Geometry comes from the node's model.
    #[default]
    Mesh,
    /// Geometry is generated from the box properties.
    Box,
}

impl MeshShape {
    /// Element name in the scene graph.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mesh => "mesh3d",
            Self::Box => "cube",
        }
    }
}

/// Everything needed to construct a [`MeshNode`].
#[derive(Debug, Default)]
pub struct NodeDescriptor {
    program: Option<Arc<Program>>,
    shape: MeshShape,
    model: Option<ModelSource>,
    attributes: Vec<(String, AttributeValue)>,
    defaults: NodeDefaults,
}

impl NodeDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_program(mut self, program: Arc<Program>) -> Self {
        self.program = Some(program);
        self
    }

    pub fn with_shape(mut self, shape: MeshShape) -> Self {
        self.shape = shape;
        self
    }

    /// Initial model: a geometry, an attribute description or a
    /// [`PendingModel`].
    pub fn with_model(mut self, model: impl Into<ModelSource>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Initial property value, applied on top of the defaults.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_defaults(mut self, defaults: NodeDefaults) -> Self {
        self.defaults = defaults;
        self
    }
}

/// A scene node that renders one geometry with one program.
#[derive(Debug)]
pub struct MeshNode {
    shape: MeshShape,
    defaults: NodeDefaults,
    attributes: NodeAttributes,
    router: AttributeChangeRouter,
    model: Option<Model>,
    pending: Option<PendingModel>,
    binder: MeshBinder,
    hub: Arc<EventHub>,
    children: Vec<MeshNode>,
    disposed: bool,
}

impl MeshNode {
    /// Construct a node.
    ///
    /// Fails with [`MeshError::MissingProgram`] if the descriptor has no
    /// program. Without a pending model the node is remeshed immediately;
    /// construction never dispatches `updatemesh`.
    pub fn new(descriptor: NodeDescriptor) -> MeshResult<Self> {
        let NodeDescriptor {
            program,
            shape,
            model,
            attributes: initial,
            defaults,
        } = descriptor;
        let program = program.ok_or(MeshError::MissingProgram)?;

        let mut attributes = NodeAttributes::new(shape, &defaults);
        for (key, value) in initial {
            attributes.set(&key, value)?;
        }

        let hub = Arc::new(EventHub::default());
        let mut binder = MeshBinder::new(hub.clone());
        binder.set_program(program, &attributes)?;

        let (model, pending) = match model {
            Some(ModelSource::Ready(model)) => (Some(model), None),
            Some(ModelSource::Pending(pending)) => (None, Some(pending)),
            None => (None, None),
        };

        let mut node = Self {
            shape,
            defaults,
            attributes,
            router: AttributeChangeRouter::for_shape(shape),
            model,
            pending,
            binder,
            hub,
            children: Vec::new(),
            disposed: false,
        };
        node.remesh()?;
        log::debug!("created {} node in state {:?}", shape.name(), node.state());
        Ok(node)
    }

    /// Construct a node bound to `program`, overriding any program in the
    /// descriptor.
    pub fn with_program(program: Arc<Program>, descriptor: NodeDescriptor) -> MeshResult<Self> {
        Self::new(descriptor.with_program(program))
    }

    /// Rebuild the geometry from the current model (or, for generated
    /// shapes, from the current properties) and rebind it.
    ///
    /// Returns `false` if there is nothing to build from yet.
    pub fn remesh(&mut self) -> MeshResult<bool> {
        self.ensure_live()?;
        let model = match self.shape {
            MeshShape::Box => Some(Model::Description(generate_box(self.box_params()?))),
            MeshShape::Mesh => self.model.clone(),
        };
        let Some(model) = model else {
            log::debug!("remesh skipped: {} node has no model", self.shape.name());
            return Ok(false);
        };

        self.binder.set_geometry(model, &self.attributes)?;
        self.store_bound_geometry();
        Ok(true)
    }

    /// Remesh, then dispatch `updatemesh` with the old and new body.
    pub fn update_mesh(&mut self) -> MeshResult<()> {
        self.ensure_live()?;
        let old_body = self.binder.body().cloned();
        self.remesh()?;
        self.dispatch_update(old_body);
        Ok(())
    }

    /// Rebind the node to another program.
    pub fn set_program(&mut self, program: Arc<Program>) -> MeshResult<()> {
        self.ensure_live()?;
        self.binder.set_program(program, &self.attributes)?;
        Ok(())
    }

    /// Replace the model with a ready one and rebind it, dispatching
    /// `updatemesh`. A pending model is discarded.
    pub fn set_geometry(&mut self, model: impl Into<Model>) -> MeshResult<()> {
        self.ensure_live()?;
        let old_body = self.binder.set_geometry(model.into(), &self.attributes)?;
        self.pending = None;
        self.store_bound_geometry();
        self.dispatch_update(old_body);
        Ok(())
    }

    /// Write a property and perform the regeneration it calls for.
    ///
    /// If the regeneration fails, the previous value is restored and the
    /// error returned.
    pub fn set_attribute(
        &mut self,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> MeshResult<ChangeClass> {
        self.ensure_live()?;
        let previous = self.attributes.set(key, value.into())?;
        let class = self
            .router
            .route(key, previous.as_ref(), self.attributes.get(key));
        log::trace!("`{}` changed: {:?}", key, class);

        if let Err(err) = self.apply_change(class) {
            log::debug!("rolling back `{}`: {}", key, err);
            self.attributes.restore(key, previous);
            return Err(err);
        }
        Ok(class)
    }

    fn apply_change(&mut self, class: ChangeClass) -> MeshResult<()> {
        match class {
            ChangeClass::Structural => self.update_mesh(),
            ChangeClass::Derived { attribute } => {
                self.binder.refresh_derived(attribute, &self.attributes)?;
                Ok(())
            }
            ChangeClass::RenderMode => {
                self.binder.set_mode(self.attributes.mode());
                Ok(())
            }
            ChangeClass::Ignored => Ok(()),
        }
    }

    /// Check the pending model without blocking.
    ///
    /// Returns `None` while the model is still pending or if there is none.
    /// On resolution the model is stored and [`update_mesh`](Self::update_mesh)
    /// runs once; on failure the slot is cleared and
    /// [`MeshError::ModelResolution`] returned.
    pub fn poll_model(&mut self) -> Option<MeshResult<()>> {
        let poll = self.pending.as_ref()?.poll();
        match poll {
            ModelPoll::Pending => None,
            ModelPoll::Ready(model) => {
                self.pending = None;
                self.model = Some(model);
                Some(self.update_mesh())
            }
            ModelPoll::Failed(reason) => {
                self.pending = None;
                log::warn!("model resolution failed: {}", reason);
                Some(Err(MeshError::ModelResolution(reason)))
            }
        }
    }

    /// Register a listener. The first before/after-render listener attaches
    /// the forwarding hook to the body.
    pub fn add_event_listener(
        &self,
        kind: MeshEventKind,
        listener: impl Fn(&MeshEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let (id, count) = self.hub.add(kind, Arc::new(listener));
        if count == 1 {
            if let Some(hook) = kind.hook_kind() {
                self.binder.attach_hook(hook);
            }
        }
        id
    }

    /// Remove a listener. The last before/after-render listener detaches
    /// the forwarding hook. Returns `false` if the id was unknown.
    pub fn remove_event_listener(&self, kind: MeshEventKind, id: ListenerId) -> bool {
        match self.hub.remove(kind, id) {
            Some(remaining) => {
                if remaining == 0 {
                    if let Some(hook) = kind.hook_kind() {
                        self.binder.detach_hook(hook);
                    }
                }
                true
            }
            None => false,
        }
    }

    /// Remove every listener of one kind. Returns how many were removed.
    pub fn remove_all_listeners(&self, kind: MeshEventKind) -> usize {
        let removed = self.hub.remove_all(kind);
        if let Some(hook) = kind.hook_kind() {
            self.binder.detach_hook(hook);
        }
        removed
    }

    pub fn listener_count(&self, kind: MeshEventKind) -> usize {
        self.hub.count(kind)
    }

    pub fn append_child(&mut self, child: MeshNode) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[MeshNode] {
        &self.children
    }

    pub fn children_mut(&mut self) -> &mut [MeshNode] {
        &mut self.children
    }

    /// Clone this node.
    ///
    /// The clone carries the properties that differ from the defaults and a
    /// detached copy of the resolved model, so it shares no mutable geometry
    /// with the original. A pending model is not carried over. With `deep`,
    /// children are cloned recursively.
    pub fn clone_node(&self, deep: bool) -> MeshResult<MeshNode> {
        self.ensure_live()?;
        let program = self.binder.program().cloned().ok_or(MeshError::MissingProgram)?;

        let mut descriptor = NodeDescriptor::new()
            .with_program(program)
            .with_shape(self.shape)
            .with_defaults(self.defaults.clone());
        for (key, value) in self.attributes.changed() {
            descriptor = descriptor.with_attribute(key, value);
        }
        if let Some(model) = &self.model {
            descriptor = descriptor.with_model(model.detached());
        }

        let mut clone = MeshNode::new(descriptor)?;
        if deep {
            for child in &self.children {
                clone.append_child(child.clone_node(true)?);
            }
        }
        Ok(clone)
    }

    /// Tear the node down: detach hooks, drop listeners, the pending model
    /// and the children, and unbind the program. Idempotent.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.binder.reset();
        self.hub.clear();
        self.pending = None;
        self.model = None;
        for child in &mut self.children {
            child.dispose();
        }
        self.children.clear();
        self.disposed = true;
        log::debug!("disposed {} node", self.shape.name());
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn shape(&self) -> MeshShape {
        self.shape
    }

    pub fn program(&self) -> Option<&Arc<Program>> {
        self.binder.program()
    }

    pub fn geometry(&self) -> Option<&SharedGeometry> {
        self.binder.geometry()
    }

    pub fn body(&self) -> Option<&Arc<RenderableBody>> {
        self.binder.body()
    }

    /// Resolved model, if any.
    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn is_model_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn state(&self) -> BinderState {
        self.binder.state()
    }

    pub fn mode(&self) -> DrawMode {
        self.attributes.mode()
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &NodeAttributes {
        &self.attributes
    }

    /// Bodies of this node and its descendants, depth first. Nodes without
    /// geometry contribute nothing.
    pub fn meshes(&self) -> Vec<Arc<RenderableBody>> {
        let mut meshes = Vec::new();
        self.collect_meshes(&mut meshes);
        meshes
    }

    fn collect_meshes(&self, out: &mut Vec<Arc<RenderableBody>>) {
        if let Some(body) = self.binder.body() {
            out.push(body.clone());
        }
        for child in &self.children {
            child.collect_meshes(out);
        }
    }

    fn ensure_live(&self) -> MeshResult<()> {
        if self.disposed {
            Err(MeshError::Disposed)
        } else {
            Ok(())
        }
    }

    fn dispatch_update(&self, old_body: Option<Arc<RenderableBody>>) {
        let new_body = self.binder.body().cloned();
        log::debug!(
            "updatemesh: {:?} -> {:?}",
            old_body.as_ref().map(|b| b.id()),
            new_body.as_ref().map(|b| b.id())
        );
        self.hub.dispatch(&MeshEvent::UpdateMesh { old_body, new_body });
    }

    /// Point the model slot at the bound geometry, unless a model is still
    /// pending.
    fn store_bound_geometry(&mut self) {
        if self.pending.is_some() {
            return;
        }
        if let Some(geometry) = self.binder.geometry() {
            self.model = Some(Model::Geometry(geometry.clone()));
        }
    }

    fn box_params(&self) -> MeshResult<BoxParams> {
        let mut params = BoxParams::default();

        let sizes = [property::WIDTH, property::HEIGHT, property::DEPTH];
        for (slot, key) in params.size.iter_mut().zip(sizes) {
            let value = self
                .attributes
                .number(key)
                .ok_or_else(|| MeshError::invalid(key, "expected a number"))?;
            if !value.is_finite() {
                return Err(MeshError::invalid(key, "must be finite"));
            }
            *slot = value;
        }

        let segments = [
            property::WIDTH_SEGMENTS,
            property::HEIGHT_SEGMENTS,
            property::DEPTH_SEGMENTS,
        ];
        for (slot, key) in params.segments.iter_mut().zip(segments) {
            let value = self
                .attributes
                .integer(key)
                .ok_or_else(|| MeshError::invalid(key, "expected an integer"))?;
            *slot = u32::try_from(value)
                .ok()
                .filter(|segments| *segments >= 1)
                .ok_or_else(|| MeshError::invalid(key, format!("must be at least 1, got {value}")))?;
        }

        Ok(params)
    }
}
