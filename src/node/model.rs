//! Geometry sources for mesh nodes.
//!
//! A [`Model`] is either a ready geometry or a raw attribute description.
//! A [`PendingModel`] is a one-shot channel that a loader fulfils later via
//! its [`ModelResolver`]; the node polls it without blocking.

use std::sync::mpsc;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::MeshResult;
use crate::geometry::{AttributeDescription, Geometry, SharedGeometry};

/// A resolved geometry source.
#[derive(Debug, Clone)]
pub enum Model {
    /// A ready geometry, possibly shared with other nodes.
    Geometry(SharedGeometry),
    /// Raw attribute arrays that still need to be wrapped.
    Description(AttributeDescription),
}

impl Model {
    /// Turn the model into a shared geometry, wrapping a description if needed.
    pub fn into_geometry(self) -> MeshResult<SharedGeometry> {
        match self {
            Self::Geometry(geometry) => Ok(geometry),
            Self::Description(description) => Ok(Arc::new(RwLock::new(
                Geometry::from_description(description)?,
            ))),
        }
    }

    /// Copy of this model that shares no mutable state with it.
    pub fn detached(&self) -> Self {
        match self {
            Self::Geometry(geometry) => Self::Geometry(Arc::new(RwLock::new(geometry.read().clone()))),
            Self::Description(description) => Self::Description(description.clone()),
        }
    }
}

impl From<Geometry> for Model {
    fn from(geometry: Geometry) -> Self {
        Self::Geometry(Arc::new(RwLock::new(geometry)))
    }
}

impl From<SharedGeometry> for Model {
    fn from(geometry: SharedGeometry) -> Self {
        Self::Geometry(geometry)
    }
}

impl From<AttributeDescription> for Model {
    fn from(description: AttributeDescription) -> Self {
        Self::Description(description)
    }
}

/// Model supplied at construction.
#[derive(Debug)]
pub enum ModelSource {
    Ready(Model),
    Pending(PendingModel),
}

impl From<Model> for ModelSource {
    fn from(model: Model) -> Self {
        Self::Ready(model)
    }
}

impl From<Geometry> for ModelSource {
    fn from(geometry: Geometry) -> Self {
        Self::Ready(geometry.into())
    }
}

impl From<AttributeDescription> for ModelSource {
    fn from(description: AttributeDescription) -> Self {
        Self::Ready(description.into())
    }
}

impl From<PendingModel> for ModelSource {
    fn from(pending: PendingModel) -> Self {
        Self::Pending(pending)
    }
}

type Resolution = Result<Model, String>;

/// Sending half of a pending model. Can be moved to a loader thread.
#[derive(Debug)]
pub struct ModelResolver {
    sender: mpsc::Sender<Resolution>,
}

impl ModelResolver {
    /// Fulfil the pending model.
    ///
    /// Returns `false` if the receiving node is gone or disposed.
    pub fn resolve(self, model: impl Into<Model>) -> bool {
        self.sender.send(Ok(model.into())).is_ok()
    }

    /// Report that the model could not be produced.
    pub fn fail(self, reason: impl Into<String>) -> bool {
        self.sender.send(Err(reason.into())).is_ok()
    }
}

/// Outcome of polling a [`PendingModel`].
#[derive(Debug)]
pub enum ModelPoll {
    Pending,
    Ready(Model),
    Failed(String),
}

/// A model that will be resolved later.
#[derive(Debug)]
pub struct PendingModel {
    receiver: mpsc::Receiver<Resolution>,
}

impl PendingModel {
    /// Create a linked resolver / pending model pair.
    pub fn channel() -> (ModelResolver, PendingModel) {
        let (sender, receiver) = mpsc::channel();
        (ModelResolver { sender }, PendingModel { receiver })
    }

    /// Check for a resolution without blocking.
    ///
    /// A resolver dropped without resolving counts as a failure.
    pub fn poll(&self) -> ModelPoll {
        match self.receiver.try_recv() {
            Ok(Ok(model)) => ModelPoll::Ready(model),
            Ok(Err(reason)) => ModelPoll::Failed(reason),
            Err(mpsc::TryRecvError::Empty) => ModelPoll::Pending,
            Err(mpsc::TryRecvError::Disconnected) => {
                ModelPoll::Failed("resolver dropped before resolving".to_string())
            }
        }
    }
}
