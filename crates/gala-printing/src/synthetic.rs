//! # Synthetic Child Provider
//!
//! Adapts a printer's lazy, single-pass child sequence to the engine's
//! paginated children protocol ([`SyntheticChildren`]).
//!
//! ## States
//!
//! ```text
//! Unbound --bind--> Bound --drain--> Draining --exhausted--> Stable
//!                     ^                                        |
//!                     +----------------update------------------+
//! ```
//!
//! The printer is built on the first request. Children are pulled from the
//! sequence only as far as the engine asks and cached by index, so asking
//! again never restarts the sequence. [`SyntheticChildren::update`] rebuilds
//! the sequence from the printer and drops the cache.
//!
//! Map printers yield keys and values alternately; child `i` is the pair
//! `(2i, 2i + 1)`, shown as the value labelled `[key]`.

use std::sync::Arc;

use gala_core::context::TargetContext;
use gala_core::error::{GalaError, GalaResult};
use gala_core::host::{NativeValueRef, SyntheticChildren, TargetRef};
use gala_core::session::lookup_type_in;
use gala_core::value::{Number, Value};
use tracing::{debug, warn};

use crate::collection::Subprinter;
use crate::printer::{Capabilities, Child, ChildValue, Children, DisplayHint, Printer};

/// Where a provider is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase
{
    /// No printer built yet
    Unbound,
    /// Printer built, nothing drained
    Bound,
    /// Some children drained, the sequence may have more
    Draining,
    /// The sequence is exhausted
    Stable,
    /// The subprinter declined or failed; there are no children
    Unavailable,
}

/// Drained prefix of a child sequence.
#[derive(Default)]
struct ChildCursor
{
    source: Option<Children>,
    cache: Vec<Child>,
}

impl ChildCursor
{
    fn new(source: Option<Children>) -> Self
    {
        Self {
            source,
            cache: Vec::new(),
        }
    }

    /// Pull from the sequence until `count` children are cached or it ends.
    /// Returns the number cached.
    fn fill(&mut self, count: usize) -> usize
    {
        while self.cache.len() < count {
            let Some(source) = self.source.as_mut() else {
                break;
            };
            match source.next() {
                Some(Ok(child)) => self.cache.push(child),
                Some(Err(err)) => {
                    warn!(error = %err, drained = self.cache.len(), "printer children failed");
                    self.source = None;
                }
                None => self.source = None,
            }
        }
        self.cache.len()
    }

    fn get(&mut self, index: usize) -> Option<&Child>
    {
        self.fill(index.saturating_add(1));
        self.cache.get(index)
    }

    fn is_exhausted(&self) -> bool
    {
        self.source.is_none()
    }
}

struct BoundPrinter
{
    printer: Box<dyn Printer>,
    capabilities: Capabilities,
    hint: Option<DisplayHint>,
    cursor: ChildCursor,
}

impl BoundPrinter
{
    fn new(printer: Box<dyn Printer>) -> Self
    {
        let mut bound = Self {
            printer,
            capabilities: Capabilities::default(),
            hint: None,
            cursor: ChildCursor::default(),
        };
        bound.refresh();
        bound
    }

    /// Re-read the hint and restart the child sequence.
    fn refresh(&mut self)
    {
        self.hint = self.printer.display_hint().unwrap_or_else(|err| {
            warn!(error = %err, "printer display_hint failed");
            None
        });
        let source = self.printer.children().unwrap_or_else(|err| {
            warn!(error = %err, "printer children failed");
            None
        });
        self.capabilities = Capabilities {
            has_children: source.is_some(),
            has_display_hint: self.hint.is_some(),
        };
        self.cursor = ChildCursor::new(source);
    }

    fn is_map(&self) -> bool
    {
        self.hint == Some(DisplayHint::Map)
    }
}

enum State
{
    Unbound,
    Bound(BoundPrinter),
    Unavailable,
}

/// Children provider for one value, driven by one subprinter
pub struct PrinterSyntheticProvider
{
    value: Value,
    target: TargetRef,
    subprinter: Arc<Subprinter>,
    state: State,
}

impl PrinterSyntheticProvider
{
    #[must_use]
    pub fn new(value: Value, subprinter: Arc<Subprinter>) -> Self
    {
        let target = value.target();
        Self {
            value,
            target,
            subprinter,
            state: State::Unbound,
        }
    }

    #[must_use]
    pub fn value(&self) -> &Value
    {
        &self.value
    }

    #[must_use]
    pub fn phase(&self) -> Phase
    {
        match &self.state {
            State::Unbound => Phase::Unbound,
            State::Unavailable => Phase::Unavailable,
            State::Bound(bound) if bound.cursor.is_exhausted() => Phase::Stable,
            State::Bound(bound) if bound.cursor.cache.is_empty() => Phase::Bound,
            State::Bound(_) => Phase::Draining,
        }
    }

    /// Capabilities of the bound printer, binding it if needed.
    pub fn capabilities(&mut self) -> Capabilities
    {
        let _context = TargetContext::enter(self.target.clone());
        self.bound().map(|bound| bound.capabilities).unwrap_or_default()
    }

    fn bound(&mut self) -> Option<&mut BoundPrinter>
    {
        if matches!(self.state, State::Unbound) {
            self.state = match self.subprinter.make_printer(&self.value) {
                Ok(Some(printer)) => {
                    debug!(subprinter = self.subprinter.name(), "bound printer");
                    State::Bound(BoundPrinter::new(printer))
                }
                Ok(None) => State::Unavailable,
                Err(err) => {
                    warn!(subprinter = self.subprinter.name(), error = %err, "printer construction failed");
                    State::Unavailable
                }
            };
        }
        match &mut self.state {
            State::Bound(bound) => Some(bound),
            _ => None,
        }
    }

    fn materialize(&self, label: &str, value: &ChildValue) -> GalaResult<NativeValueRef>
    {
        let value = match value {
            ChildValue::Value(value) => value.clone(),
            ChildValue::Int(number) => Value::from_number_in(&self.target, Number::Signed(*number))?,
            ChildValue::Float(number) => Value::from_number_in(&self.target, Number::Float(*number))?,
            ChildValue::Bool(flag) => Value::from_bool(*flag)?,
            ChildValue::Text(text) => {
                let char_type = lookup_type_in(&self.target, "char")?;
                let array = char_type.array(i64::try_from(text.len()).unwrap_or(i64::MAX))?;
                let mut bytes = text.as_bytes().to_vec();
                bytes.push(0);
                Value::from_bytes(&bytes, &array)?
            }
        };
        let native = value.native();
        native
            .create_child_at_offset(label, 0, &native.native_type())
            .map_err(|err| GalaError::Memory(err.0))
    }
}

impl SyntheticChildren for PrinterSyntheticProvider
{
    fn num_children(&mut self, max: u32) -> u32
    {
        let _context = TargetContext::enter(self.target.clone());
        let Some(bound) = self.bound() else {
            return 0;
        };
        let max = max as usize;
        let count = if bound.is_map() {
            bound.cursor.fill(max.saturating_mul(2)) / 2
        } else {
            bound.cursor.fill(max)
        };
        u32::try_from(count.min(max)).unwrap_or(u32::MAX)
    }

    fn child_at_index(&mut self, index: u32) -> Option<NativeValueRef>
    {
        let _context = TargetContext::enter(self.target.clone());
        let index = index as usize;
        let bound = self.bound()?;
        let (label, value) = if bound.is_map() {
            let key = bound.cursor.get(index.checked_mul(2)?)?.value.display();
            let value = bound.cursor.get(index * 2 + 1)?.value.clone();
            (format!("[{key}]"), value)
        } else {
            let child = bound.cursor.get(index)?;
            (child.label.clone(), child.value.clone())
        };
        self.materialize(&label, &value)
            .map_err(|err| warn!(label = %label, error = %err, "cannot materialize child"))
            .ok()
    }

    fn child_index(&mut self, name: &str) -> Option<u32>
    {
        let _context = TargetContext::enter(self.target.clone());
        if self.bound()?.hint != Some(DisplayHint::Array) {
            return None;
        }
        name.strip_prefix('[')?.strip_suffix(']')?.parse().ok()
    }

    fn update(&mut self)
    {
        let _context = TargetContext::enter(self.target.clone());
        match &mut self.state {
            State::Bound(bound) => bound.refresh(),
            state => *state = State::Unbound,
        }
    }

    fn has_children(&mut self) -> bool
    {
        self.capabilities().has_children
    }
}
