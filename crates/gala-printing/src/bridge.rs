//! # Formatter Bridge
//!
//! Installs printer collections into the engine's formatter registry.
//!
//! Each collection becomes one formatter category. Each enabled subprinter
//! contributes a summary callback and, unless it is summary-only, a
//! synthetic children provider, both keyed to the subprinter's matcher.
//!
//! Printer failures never reach the engine: they are logged and the value
//! is shown as if no printer applied.

use std::sync::Arc;

use gala_core::context::TargetContext;
use gala_core::error::{GalaError, GalaResult};
use gala_core::host::{FormatterHost, HostError, NativeValueRef, SummaryProvider, SyntheticChildren, SyntheticProviderFactory, TypeOptions};
use gala_core::value::Value;
use tracing::{debug, info, warn};

use crate::collection::{PrinterCollection, Subprinter};
use crate::printer::DisplayHint;
use crate::registry::Registry;
use crate::synthetic::PrinterSyntheticProvider;

/// Connects a [`Registry`] to the engine's formatter registry
pub struct FormatterBridge
{
    host: Arc<dyn FormatterHost>,
    registry: Arc<Registry>,
}

impl FormatterBridge
{
    #[must_use]
    pub fn new(host: Arc<dyn FormatterHost>, registry: Arc<Registry>) -> Self
    {
        Self { host, registry }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<Registry>
    {
        &self.registry
    }

    /// Register `collection` and install its formatters.
    ///
    /// With `replace`, an existing category of the same name is deleted and
    /// recreated; without it, an existing category is an error.
    ///
    /// ## Errors
    ///
    /// - `Registration`: the category exists and `replace` is not set, or
    ///   the engine refused a category or formatter
    ///
    /// ## Example
    ///
    /// ```rust
    /// use std::sync::Arc;
    ///
    /// use gala_core::testing::MockFormatterHost;
    /// use gala_printing::bridge::FormatterBridge;
    /// use gala_printing::collection::PrinterCollection;
    /// use gala_printing::registry::Registry;
    ///
    /// let host = Arc::new(MockFormatterHost::new());
    /// let bridge = FormatterBridge::new(host.clone(), Arc::new(Registry::new()));
    ///
    /// bridge.register_printer_collection(PrinterCollection::new("empty"), false)?;
    /// assert!(host.is_category_enabled("empty"));
    /// assert!(bridge.register_printer_collection(PrinterCollection::new("empty"), false).is_err());
    /// # Ok::<(), gala_core::error::GalaError>(())
    /// ```
    pub fn register_printer_collection(&self, collection: PrinterCollection, replace: bool) -> GalaResult<Arc<PrinterCollection>>
    {
        let name = collection.name().to_string();
        if self.host.has_category(&name) {
            if !replace {
                return Err(GalaError::Registration(format!("formatter category {name} already exists")));
            }
            self.host.delete_category(&name);
        }
        self.host.create_category(&name).map_err(registration)?;

        for subprinter in collection.subprinters().iter().filter(|subprinter| subprinter.is_enabled()) {
            if let Err(err) = self.install(&name, subprinter) {
                self.host.delete_category(&name);
                return Err(err);
            }
        }

        let collection = self.registry.insert(collection, true)?;
        self.host.set_category_enabled(&name, collection.is_enabled());
        info!(name = %name, subprinters = collection.subprinters().len(), "printer collection registered");
        Ok(collection)
    }

    fn install(&self, category: &str, subprinter: &Arc<Subprinter>) -> GalaResult<()>
    {
        let specifier = subprinter.strategy().type_specifier();
        let options = TypeOptions {
            cascade: true,
            hide_children: !subprinter.has_children(),
        };

        let summary_subprinter = subprinter.clone();
        let summary: SummaryProvider = Arc::new(move |native: &NativeValueRef| render_summary(&summary_subprinter, native));
        self.host
            .add_type_summary(category, specifier.clone(), summary, options)
            .map_err(registration)?;

        if subprinter.has_children() {
            let synthetic_subprinter = subprinter.clone();
            let factory: SyntheticProviderFactory = Arc::new(move |native: NativeValueRef| -> Box<dyn SyntheticChildren> {
                Box::new(PrinterSyntheticProvider::new(
                    Value::from_native(native),
                    synthetic_subprinter.clone(),
                ))
            });
            self.host
                .add_type_synthetic(
                    category,
                    specifier,
                    factory,
                    TypeOptions {
                        cascade: true,
                        hide_children: false,
                    },
                )
                .map_err(registration)?;
        }
        debug!(category, subprinter = subprinter.name(), "installed formatters");
        Ok(())
    }

    /// Remove the collection called `name` and its category.
    pub fn unregister(&self, name: &str) -> bool
    {
        let removed = self.registry.remove(name).is_some();
        self.host.delete_category(name) || removed
    }

    /// Remove every registered collection and its category.
    pub fn clear(&self)
    {
        for collection in self.registry.collections() {
            self.host.delete_category(collection.name());
        }
        self.registry.clear();
    }
}

fn registration(err: HostError) -> GalaError
{
    GalaError::Registration(err.0)
}

/// The summary the engine shows for `native`, as produced by `subprinter`.
///
/// Runs in the value's own target. Summaries of `string`-hinted printers are
/// quoted. Any printer failure yields `None`.
#[must_use]
pub fn render_summary(subprinter: &Subprinter, native: &NativeValueRef) -> Option<String>
{
    let value = Value::from_native(native.clone());
    let _context = TargetContext::enter(value.target());

    let printer = match subprinter.make_printer(&value) {
        Ok(Some(printer)) => printer,
        Ok(None) => return None,
        Err(err) => {
            warn!(subprinter = subprinter.name(), error = %err, "printer construction failed");
            return None;
        }
    };
    let summary = match printer.to_string() {
        Ok(summary) => summary?,
        Err(err) => {
            warn!(subprinter = subprinter.name(), error = %err, "printer to_string failed");
            return None;
        }
    };
    match printer.display_hint() {
        Ok(Some(DisplayHint::String)) => Some(format!("\"{summary}\"")),
        Ok(_) => Some(summary),
        Err(err) => {
            warn!(subprinter = subprinter.name(), error = %err, "printer display_hint failed");
            None
        }
    }
}
