//! Session-wide list of registered printer collections.

use std::sync::{Arc, PoisonError, RwLock};

use gala_core::error::{GalaError, GalaResult};
use gala_core::value::Value;
use tracing::{debug, warn};

use crate::collection::PrinterCollection;
use crate::printer::Printer;

/// Registered printer collections, in registration order
///
/// Created when the host attaches and shared with the
/// [`crate::bridge::FormatterBridge`]. Lookups never modify it.
#[derive(Debug, Default)]
pub struct Registry
{
    collections: RwLock<Vec<Arc<PrinterCollection>>>,
}

impl Registry
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add `collection`, or swap out the one with the same name when
    /// `replace` is set.
    ///
    /// ## Errors
    ///
    /// - `Registration`: a collection with that name exists and `replace` is not set
    pub fn insert(&self, collection: PrinterCollection, replace: bool) -> GalaResult<Arc<PrinterCollection>>
    {
        let collection = Arc::new(collection);
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        match collections.iter().position(|existing| existing.name() == collection.name()) {
            Some(_) if !replace => {
                return Err(GalaError::Registration(format!(
                    "pretty-printer already registered: {}",
                    collection.name()
                )));
            }
            Some(index) => collections[index] = collection.clone(),
            None => collections.push(collection.clone()),
        }
        debug!(name = collection.name(), replace, "registered printer collection");
        Ok(collection)
    }

    /// Remove the collection called `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<PrinterCollection>>
    {
        let mut collections = self.collections.write().unwrap_or_else(PoisonError::into_inner);
        let index = collections.iter().position(|existing| existing.name() == name)?;
        Some(collections.remove(index))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<PrinterCollection>>
    {
        self.collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|collection| collection.name() == name)
            .cloned()
    }

    /// Snapshot of the registered collections.
    #[must_use]
    pub fn collections(&self) -> Vec<Arc<PrinterCollection>>
    {
        self.collections.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    #[must_use]
    pub fn len(&self) -> usize
    {
        self.collections.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool
    {
        self.len() == 0
    }

    /// Drop every collection.
    pub fn clear(&self)
    {
        self.collections.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Printer from the first enabled collection that has one for `value`.
    ///
    /// A collection whose factory fails is logged and skipped.
    #[must_use]
    pub fn default_visualizer(&self, value: &Value) -> Option<Box<dyn Printer>>
    {
        // Factories may evaluate expressions that print other values.
        for collection in self.collections() {
            match collection.lookup(value) {
                Ok(Some(printer)) => return Some(printer),
                Ok(None) => {}
                Err(err) => warn!(collection = collection.name(), error = %err, "printer lookup failed"),
            }
        }
        None
    }
}
