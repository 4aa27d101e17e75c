//! Program / geometry / body wiring.

use std::sync::Arc;

use crate::body::{DrawMode, HookKind, RenderableBody};
use crate::derived::{color_attribute, derive_normals};
use crate::error::{MeshError, MeshResult};
use crate::geometry::{SharedGeometry, COLOR, NORMAL};
use crate::program::Program;

use super::attributes::NodeAttributes;
use super::events::{EventHub, MeshEventKind, RenderForwarders};
use super::model::Model;

/// Binding state of a [`MeshBinder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinderState {
    /// No program.
    Unbound,
    /// Program set, no geometry yet.
    BoundNoGeometry,
    /// Program, geometry and body present.
    Bound,
}

/// Owns the (program, geometry, body) triple of one node.
///
/// The body is rebuilt whenever the program or geometry changes. Render
/// hooks forwarding to the node's listeners are attached to a new body only
/// for event kinds that currently have listeners.
#[derive(Debug)]
pub struct MeshBinder {
    program: Option<Arc<Program>>,
    geometry: Option<SharedGeometry>,
    body: Option<Arc<RenderableBody>>,
    hub: Arc<EventHub>,
    forwarders: RenderForwarders,
}

impl MeshBinder {
    pub(crate) fn new(hub: Arc<EventHub>) -> Self {
        let forwarders = RenderForwarders::new(&hub);
        Self {
            program: None,
            geometry: None,
            body: None,
            hub,
            forwarders,
        }
    }

    pub fn state(&self) -> BinderState {
        match (&self.program, &self.body) {
            (None, _) => BinderState::Unbound,
            (Some(_), None) => BinderState::BoundNoGeometry,
            (Some(_), Some(_)) => BinderState::Bound,
        }
    }

    pub fn program(&self) -> Option<&Arc<Program>> {
        self.program.as_ref()
    }

    pub fn geometry(&self) -> Option<&SharedGeometry> {
        self.geometry.as_ref()
    }

    pub fn body(&self) -> Option<&Arc<RenderableBody>> {
        self.body.as_ref()
    }

    /// Bind a program, registering the color computer on it if it consumes
    /// `color`.
    ///
    /// If geometry is present, attributes the new program consumes are
    /// derived and the body is rebuilt; the replaced body is returned.
    pub fn set_program(
        &mut self,
        program: Arc<Program>,
        attributes: &NodeAttributes,
    ) -> MeshResult<Option<Arc<RenderableBody>>> {
        if program.consumes(COLOR) {
            program.register_extra_attribute(COLOR, color_attribute);
        }
        log::debug!("binding program {:?}", program.label().unwrap_or("unnamed"));

        if let Some(geometry) = &self.geometry {
            derive_attributes(&program, geometry, attributes)?;
        }
        self.program = Some(program);
        Ok(self.rebuild_body(attributes.mode()))
    }

    /// Bind a new geometry and rebuild the body. Returns the replaced body.
    ///
    /// Derives normals when the program consumes `normal` and the geometry
    /// lacks one, then runs every registered extra-attribute computer for
    /// consumed attributes the geometry lacks.
    pub fn set_geometry(
        &mut self,
        model: Model,
        attributes: &NodeAttributes,
    ) -> MeshResult<Option<Arc<RenderableBody>>> {
        let program = self.program.clone().ok_or(MeshError::MissingProgram)?;
        let geometry = model.into_geometry()?;
        derive_attributes(&program, &geometry, attributes)?;

        self.geometry = Some(geometry);
        Ok(self.rebuild_body(attributes.mode()))
    }

    /// Recompute one derived attribute in place.
    ///
    /// Returns `false` if there is no geometry or the program does not
    /// actively derive that attribute.
    pub fn refresh_derived(&self, attribute: &str, attributes: &NodeAttributes) -> MeshResult<bool> {
        let (Some(program), Some(geometry)) = (&self.program, &self.geometry) else {
            return Ok(false);
        };
        let Some(computer) = program.active_computer(attribute) else {
            return Ok(false);
        };
        computer(attributes, &mut geometry.write())?;
        log::trace!("refreshed derived attribute `{}`", attribute);
        Ok(true)
    }

    /// Change the draw mode of the current body. Returns `false` if there
    /// is no body.
    pub fn set_mode(&self, mode: DrawMode) -> bool {
        match &self.body {
            Some(body) => {
                body.set_mode(mode);
                true
            }
            None => false,
        }
    }

    /// Attach the forwarding hook of `kind` to the current body.
    pub(crate) fn attach_hook(&self, kind: HookKind) {
        if let Some(body) = &self.body {
            let hook = self.forwarders.hook(kind);
            if !body.has_hook(kind, hook) {
                body.add_hook(kind, hook.clone());
            }
        }
    }

    /// Detach the forwarding hook of `kind` from the current body.
    pub(crate) fn detach_hook(&self, kind: HookKind) {
        if let Some(body) = &self.body {
            body.remove_hook(kind, self.forwarders.hook(kind));
        }
    }

    /// Drop program, geometry and body, detaching hooks first.
    pub(crate) fn reset(&mut self) {
        self.detach_hook(HookKind::BeforeRender);
        self.detach_hook(HookKind::AfterRender);
        self.body = None;
        self.geometry = None;
        self.program = None;
    }

    fn rebuild_body(&mut self, mode: DrawMode) -> Option<Arc<RenderableBody>> {
        let (Some(program), Some(geometry)) = (&self.program, &self.geometry) else {
            return None;
        };
        let body = Arc::new(RenderableBody::new(mode, geometry.clone(), program.clone()));

        for kind in [MeshEventKind::BeforeRender, MeshEventKind::AfterRender] {
            if let Some(hook_kind) = kind.hook_kind() {
                if self.hub.count(kind) > 0 {
                    body.add_hook(hook_kind, self.forwarders.hook(hook_kind).clone());
                }
            }
        }

        let old = self.body.replace(body);
        if let Some(old) = &old {
            // The replaced body may still be referenced elsewhere; stop forwarding from it.
            old.remove_hook(HookKind::BeforeRender, self.forwarders.hook(HookKind::BeforeRender));
            old.remove_hook(HookKind::AfterRender, self.forwarders.hook(HookKind::AfterRender));
        }
        log::debug!(
            "rebuilt body: {:?} -> {:?}",
            old.as_ref().map(|b| b.id()),
            self.body.as_ref().map(|b| b.id())
        );
        old
    }
}

/// Derive missing consumed attributes on a copy of `geometry` and add them
/// to the shared geometry only once every derivation has succeeded.
fn derive_attributes(
    program: &Program,
    geometry: &SharedGeometry,
    attributes: &NodeAttributes,
) -> MeshResult<()> {
    let mut staged = geometry.read().clone();
    if program.consumes(NORMAL) {
        derive_normals(&mut staged)?;
    }
    for (name, computer) in program.extra_attributes() {
        if program.consumes(&name) && !staged.has_attribute(&name) {
            log::trace!("deriving extra attribute `{}`", name);
            computer(attributes, &mut staged)?;
        }
    }

    let mut target = geometry.write();
    let added: Vec<String> = staged
        .attribute_names()
        .filter(|name| !target.has_attribute(name))
        .map(str::to_string)
        .collect();
    for name in added {
        if let Some(attribute) = staged.attribute(&name) {
            target.add_attribute(name.clone(), attribute.clone())?;
        }
    }
    Ok(())
}
