//! Shading program handle.
//!
//! A [`Program`] is created against a [`RenderContext`] and declares the
//! vertex attributes it consumes. It also carries a table of extra-attribute
//! computers: derivation functions keyed by attribute name, registered by
//! mesh binders and shared by every node bound to the program.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::backend::RenderContext;
use crate::derived::AttributeComputer;

/// A shading program shared by any number of mesh nodes.
pub struct Program {
    label: Option<String>,
    context: Arc<dyn RenderContext>,
    attribute_locations: BTreeMap<String, u32>,
    extra_attributes: RwLock<BTreeMap<String, AttributeComputer>>,
}

impl Program {
    /// Create a program consuming the given attributes.
    ///
    /// Locations are assigned in the order the names are given.
    pub fn new<I, S>(context: Arc<dyn RenderContext>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut attribute_locations = BTreeMap::new();
        for name in attributes {
            let location = attribute_locations.len() as u32;
            attribute_locations.entry(name.into()).or_insert(location);
        }
        Self {
            label: None,
            context,
            attribute_locations,
            extra_attributes: RwLock::new(BTreeMap::new()),
        }
    }

    /// Set a debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Debug label, if any.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Backend context the program was created against.
    pub fn context(&self) -> &Arc<dyn RenderContext> {
        &self.context
    }

    /// Whether the program consumes the named attribute.
    pub fn consumes(&self, name: &str) -> bool {
        self.attribute_locations.contains_key(name)
    }

    /// Location of a consumed attribute.
    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attribute_locations.get(name).copied()
    }

    /// Names of all consumed attributes.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attribute_locations.keys().map(String::as_str)
    }

    /// Register a computer for `name` unless one is already registered.
    ///
    /// Returns `true` if the computer was inserted. Registration never
    /// replaces an existing entry, so concurrent binders agree on the
    /// first computer regardless of order.
    pub fn register_extra_attribute(&self, name: &str, computer: AttributeComputer) -> bool {
        let mut table = self.extra_attributes.write();
        if table.contains_key(name) {
            return false;
        }
        table.insert(name.to_string(), computer);
        log::debug!(
            "program {:?}: registered extra attribute `{}`",
            self.label.as_deref().unwrap_or("unnamed"),
            name
        );
        true
    }

    /// Registered computer for `name`, if any.
    pub fn extra_attribute(&self, name: &str) -> Option<AttributeComputer> {
        self.extra_attributes.read().get(name).copied()
    }

    /// Computer for `name` if the program both consumes the attribute and
    /// has a computer registered for it.
    pub fn active_computer(&self, name: &str) -> Option<AttributeComputer> {
        if self.consumes(name) {
            self.extra_attribute(name)
        } else {
            None
        }
    }

    /// Snapshot of the extra-attribute table.
    pub fn extra_attributes(&self) -> Vec<(String, AttributeComputer)> {
        self.extra_attributes
            .read()
            .iter()
            .map(|(name, computer)| (name.clone(), *computer))
            .collect()
    }
}

impl fmt::Debug for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let extra: Vec<String> = self.extra_attributes.read().keys().cloned().collect();
        f.debug_struct("Program")
            .field("label", &self.label)
            .field("context", &self.context.name())
            .field("attributes", &self.attribute_locations)
            .field("extra_attributes", &extra)
            .finish()
    }
}
