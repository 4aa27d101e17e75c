//! Node events and listener bookkeeping.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::body::{HookKind, RenderHook, RenderInfo, RenderableBody};

/// Event types a mesh node dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MeshEventKind {
    BeforeRender,
    AfterRender,
    UpdateMesh,
}

impl MeshEventKind {
    /// Event name as seen by the scene-graph event layer.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeRender => "beforerender",
            Self::AfterRender => "afterrender",
            Self::UpdateMesh => "updatemesh",
        }
    }

    /// Body hook list this event is forwarded from, if any.
    pub fn hook_kind(&self) -> Option<HookKind> {
        match self {
            Self::BeforeRender => Some(HookKind::BeforeRender),
            Self::AfterRender => Some(HookKind::AfterRender),
            Self::UpdateMesh => None,
        }
    }
}

/// An event dispatched to node listeners.
#[derive(Debug, Clone)]
pub enum MeshEvent {
    /// Forwarded from the body's before-render hook.
    BeforeRender(RenderInfo),
    /// Forwarded from the body's after-render hook.
    AfterRender(RenderInfo),
    /// Fired after every remesh.
    UpdateMesh {
        old_body: Option<Arc<RenderableBody>>,
        new_body: Option<Arc<RenderableBody>>,
    },
}

impl MeshEvent {
    pub fn kind(&self) -> MeshEventKind {
        match self {
            Self::BeforeRender(_) => MeshEventKind::BeforeRender,
            Self::AfterRender(_) => MeshEventKind::AfterRender,
            Self::UpdateMesh { .. } => MeshEventKind::UpdateMesh,
        }
    }
}

/// Event callback.
pub type Listener = Arc<dyn Fn(&MeshEvent) + Send + Sync>;

/// Handle returned when registering a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener table of one node.
///
/// Shared with the render-hook forwarders, which dispatch into it from
/// whatever thread draws the body.
#[derive(Default)]
pub(crate) struct EventHub {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<MeshEventKind, Vec<(ListenerId, Listener)>>>,
}

impl EventHub {
    /// Register a listener. Returns its id and the new listener count.
    pub fn add(&self, kind: MeshEventKind, listener: Listener) -> (ListenerId, usize) {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut listeners = self.listeners.lock();
        let list = listeners.entry(kind).or_default();
        list.push((id, listener));
        (id, list.len())
    }

    /// Remove a listener. Returns the remaining count, or `None` if the id
    /// was not registered for this kind.
    pub fn remove(&self, kind: MeshEventKind, id: ListenerId) -> Option<usize> {
        let mut listeners = self.listeners.lock();
        let list = listeners.get_mut(&kind)?;
        let idx = list.iter().position(|(other, _)| *other == id)?;
        list.remove(idx);
        Some(list.len())
    }

    /// Remove every listener of one kind. Returns how many were removed.
    pub fn remove_all(&self, kind: MeshEventKind) -> usize {
        self.listeners
            .lock()
            .remove(&kind)
            .map_or(0, |list| list.len())
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn count(&self, kind: MeshEventKind) -> usize {
        self.listeners.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Call every listener registered for the event's kind, in
    /// registration order.
    pub fn dispatch(&self, event: &MeshEvent) {
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .get(&event.kind())
            .map(|list| list.iter().map(|(_, l)| l.clone()).collect())
            .unwrap_or_default();
        for listener in listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.lock();
        let counts: BTreeMap<&str, usize> = listeners
            .iter()
            .map(|(kind, list)| (kind.name(), list.len()))
            .collect();
        f.debug_struct("EventHub").field("listeners", &counts).finish()
    }
}

/// The two hooks a node installs on its body to forward render events.
#[derive(Clone)]
pub(crate) struct RenderForwarders {
    before: RenderHook,
    after: RenderHook,
}

impl RenderForwarders {
    pub fn new(hub: &Arc<EventHub>) -> Self {
        let before_hub = hub.clone();
        let after_hub = hub.clone();
        Self {
            before: Arc::new(move |info: &RenderInfo| {
                before_hub.dispatch(&MeshEvent::BeforeRender(*info));
            }),
            after: Arc::new(move |info: &RenderInfo| {
                after_hub.dispatch(&MeshEvent::AfterRender(*info));
            }),
        }
    }

    pub fn hook(&self, kind: HookKind) -> &RenderHook {
        match kind {
            HookKind::BeforeRender => &self.before,
            HookKind::AfterRender => &self.after,
        }
    }
}

impl fmt::Debug for RenderForwarders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderForwarders").finish_non_exhaustive()
    }
}
