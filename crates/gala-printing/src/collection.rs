//! # Printer Collections
//!
//! A [`PrinterCollection`] groups [`Subprinter`]s under one formatter
//! category. Each subprinter pairs a [`MatchStrategy`] with a factory that
//! builds a [`Printer`] for a matching value.
//!
//! Three kinds of collection are common:
//!
//! - regexp collections: [`PrinterCollection::regexp`] + [`PrinterCollection::add_printer`]
//! - type-callback collections: [`PrinterCollection::type_callback`]
//! - plain collections of name-matched subprinters: [`Subprinter::new`]

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gala_core::error::{GalaError, GalaResult};
use gala_core::host::{NativeTypeRef, TypeNameSpecifier};
use gala_core::types::Type;
use gala_core::types::helpers::get_basic_type;
use gala_core::value::Value;
use regex::Regex;

use crate::printer::Printer;

/// Builds a printer for a value, `None` when it declines.
pub type PrinterFactory = Arc<dyn Fn(&Value) -> GalaResult<Option<Box<dyn Printer>>> + Send + Sync>;

/// Decides whether a subprinter applies to a type.
pub type TypePredicate = Arc<dyn Fn(&Type) -> bool + Send + Sync>;

/// How a subprinter selects types
///
/// Resolved once, when the subprinter is built. A predicate wins over an
/// explicit regex, which wins over the name-derived pattern.
#[derive(Clone)]
pub enum MatchStrategy
{
    /// Ask a predicate about every candidate type
    Predicate(TypePredicate),
    /// Match the basic type's tag (or name) against a regex
    Regex(Regex),
    /// Match the bare, templated or reference spelling of `name`
    NameDerived
    {
        name: String,
        pattern: Regex,
    },
}

impl fmt::Debug for MatchStrategy
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            MatchStrategy::Predicate(_) => f.write_str("Predicate(..)"),
            MatchStrategy::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            MatchStrategy::NameDerived { pattern, .. } => f.debug_tuple("NameDerived").field(&pattern.as_str()).finish(),
        }
    }
}

/// Pattern matching `name`, `name<...>` and `name &` / `name&`.
///
/// ```rust
/// use gala_printing::collection::name_regex;
///
/// let regex = name_regex("Ptr")?;
/// assert!(regex.is_match("Ptr<int>"));
/// assert!(regex.is_match("Ptr<int> &"));
/// assert!(!regex.is_match("OtherPtr<int>"));
/// # Ok::<(), gala_core::error::GalaError>(())
/// ```
///
/// ## Errors
///
/// - `InvalidArgument`: the name produces a pattern the regex engine rejects
pub fn name_regex(name: &str) -> GalaResult<Regex>
{
    compile(&format!("^{}(<.+>)?( ?&)?$", regex::escape(name)))
}

/// Formatters cascade through typedefs, so a predicate that rejects an alias
/// is asked again about each type the alias names.
fn accepts(predicate: &TypePredicate, ty: &Type) -> bool
{
    ty.typedef_chain().iter().any(|layer| predicate(layer))
}

fn compile(pattern: &str) -> GalaResult<Regex>
{
    Regex::new(pattern).map_err(|err| GalaError::InvalidArgument(format!("invalid type pattern {pattern:?}: {err}")))
}

impl MatchStrategy
{
    /// Whether the strategy selects `ty`.
    #[must_use]
    pub fn matches(&self, ty: &Type) -> bool
    {
        match self {
            MatchStrategy::Predicate(predicate) => accepts(predicate, ty),
            MatchStrategy::Regex(regex) => {
                let basic = get_basic_type(ty);
                let name = basic.tag().unwrap_or_else(|| ty.name());
                regex.is_match(&name)
            }
            MatchStrategy::NameDerived { pattern, .. } => pattern.is_match(&ty.name()),
        }
    }

    /// The equivalent matcher for the engine's formatter registry.
    #[must_use]
    pub fn type_specifier(&self) -> TypeNameSpecifier
    {
        match self {
            MatchStrategy::Predicate(predicate) => {
                let predicate = predicate.clone();
                TypeNameSpecifier::Callback(Arc::new(move |native: &NativeTypeRef| {
                    predicate(&Type::from_native(native.clone()))
                }))
            }
            MatchStrategy::Regex(regex) => TypeNameSpecifier::Regex(regex.clone()),
            MatchStrategy::NameDerived { pattern, .. } => TypeNameSpecifier::Regex(pattern.clone()),
        }
    }
}

/// One matching rule plus printer factory
pub struct Subprinter
{
    name: String,
    strategy: MatchStrategy,
    factory: PrinterFactory,
    has_children: bool,
    enabled: AtomicBool,
}

impl fmt::Debug for Subprinter
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Subprinter")
            .field("name", &self.name)
            .field("strategy", &self.strategy)
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Subprinter
{
    /// Subprinter for the type called `name`, in any of its spellings.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: see [`name_regex`]
    ///
    /// ## Example
    ///
    /// ```rust
    /// use gala_core::error::GalaResult;
    /// use gala_printing::collection::Subprinter;
    /// use gala_printing::printer::Printer;
    ///
    /// struct Unit;
    ///
    /// impl Printer for Unit
    /// {
    ///     fn to_string(&self) -> GalaResult<Option<String>>
    ///     {
    ///         Ok(Some("unit".to_string()))
    ///     }
    /// }
    ///
    /// let subprinter = Subprinter::new("Unit", |_| Ok(Some(Unit)))?;
    /// assert_eq!(subprinter.name(), "Unit");
    /// # Ok::<(), gala_core::error::GalaError>(())
    /// ```
    pub fn new<P, F>(name: &str, factory: F) -> GalaResult<Self>
    where
        P: Printer + 'static,
        F: Fn(&Value) -> GalaResult<Option<P>> + Send + Sync + 'static,
    {
        let factory: PrinterFactory = Arc::new(move |value: &Value| -> GalaResult<Option<Box<dyn Printer>>> {
            Ok(factory(value)?.map(|printer| Box::new(printer) as Box<dyn Printer>))
        });
        Ok(Self {
            name: name.to_string(),
            strategy: MatchStrategy::NameDerived {
                name: name.to_string(),
                pattern: name_regex(name)?,
            },
            factory,
            has_children: true,
            enabled: AtomicBool::new(true),
        })
    }

    /// Match with `regex` instead of the name, unless a predicate is set.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: `regex` does not compile
    pub fn with_regex(mut self, regex: &str) -> GalaResult<Self>
    {
        let regex = compile(regex)?;
        if !matches!(self.strategy, MatchStrategy::Predicate(_)) {
            self.strategy = MatchStrategy::Regex(regex);
        }
        Ok(self)
    }

    #[must_use]
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Type) -> bool + Send + Sync + 'static,
    {
        self.strategy = MatchStrategy::Predicate(Arc::new(predicate));
        self
    }

    /// Declare that the printers never have children, so the engine hides
    /// the value's own children and installs no children provider.
    #[must_use]
    pub fn summary_only(mut self) -> Self
    {
        self.has_children = false;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str
    {
        &self.name
    }

    #[must_use]
    pub fn strategy(&self) -> &MatchStrategy
    {
        &self.strategy
    }

    #[must_use]
    pub fn has_children(&self) -> bool
    {
        self.has_children
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool
    {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool)
    {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// Build the printer for `value`.
    ///
    /// Predicate subprinters check the predicate first, since the factory
    /// may assume it holds. A typedef passes when any type it aliases does.
    ///
    /// ## Errors
    ///
    /// Whatever the factory reports.
    pub fn make_printer(&self, value: &Value) -> GalaResult<Option<Box<dyn Printer>>>
    {
        if let MatchStrategy::Predicate(predicate) = &self.strategy {
            if !accepts(predicate, &value.ty()) {
                return Ok(None);
            }
        }
        (self.factory)(value)
    }
}

/// A named group of subprinters
#[derive(Debug)]
pub struct PrinterCollection
{
    name: String,
    subprinters: Vec<Arc<Subprinter>>,
    enabled: AtomicBool,
}

impl PrinterCollection
{
    #[must_use]
    pub fn new(name: &str) -> Self
    {
        Self {
            name: name.to_string(),
            subprinters: Vec::new(),
            enabled: AtomicBool::new(true),
        }
    }

    /// Empty collection to fill with [`PrinterCollection::add_printer`].
    #[must_use]
    pub fn regexp(name: &str) -> Self
    {
        Self::new(name)
    }

    /// Single-subprinter collection selecting types with `predicate`.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: see [`name_regex`]
    pub fn type_callback<P, M, F>(name: &str, predicate: M, factory: F) -> GalaResult<Self>
    where
        P: Printer + 'static,
        M: Fn(&Type) -> bool + Send + Sync + 'static,
        F: Fn(&Value) -> GalaResult<Option<P>> + Send + Sync + 'static,
    {
        let mut collection = Self::new(name);
        collection.add_subprinter(Subprinter::new(name, factory)?.with_predicate(predicate));
        Ok(collection)
    }

    /// Add a subprinter selecting types whose basic tag matches `regex`.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: `regex` does not compile
    pub fn add_printer<P, F>(&mut self, name: &str, regex: &str, factory: F) -> GalaResult<&mut Self>
    where
        P: Printer + 'static,
        F: Fn(&Value) -> GalaResult<Option<P>> + Send + Sync + 'static,
    {
        let subprinter = Subprinter::new(name, factory)?.with_regex(regex)?;
        self.add_subprinter(subprinter);
        Ok(self)
    }

    pub fn add_subprinter(&mut self, subprinter: Subprinter) -> &mut Self
    {
        self.subprinters.push(Arc::new(subprinter));
        self
    }

    #[must_use]
    pub fn name(&self) -> &str
    {
        &self.name
    }

    #[must_use]
    pub fn subprinters(&self) -> &[Arc<Subprinter>]
    {
        &self.subprinters
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool
    {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn set_enabled(&self, enabled: bool)
    {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    /// First enabled subprinter that selects the value's type.
    #[must_use]
    pub fn matching_subprinter(&self, value: &Value) -> Option<&Arc<Subprinter>>
    {
        let ty = value.ty();
        self.subprinters
            .iter()
            .find(|subprinter| subprinter.is_enabled() && subprinter.strategy().matches(&ty))
    }

    /// Printer from the first enabled subprinter that selects the value's
    /// type.
    ///
    /// ## Errors
    ///
    /// Whatever that subprinter's factory reports.
    pub fn lookup(&self, value: &Value) -> GalaResult<Option<Box<dyn Printer>>>
    {
        if !self.is_enabled() {
            return Ok(None);
        }
        match self.matching_subprinter(value) {
            Some(subprinter) => subprinter.make_printer(value),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    struct Silent;

    impl Printer for Silent
    {
        fn to_string(&self) -> GalaResult<Option<String>>
        {
            Ok(None)
        }
    }

    #[test]
    fn test_name_regex_spellings()
    {
        let regex = name_regex("ns::Box").unwrap();
        assert!(regex.is_match("ns::Box"));
        assert!(regex.is_match("ns::Box<int, 3>"));
        assert!(regex.is_match("ns::Box<int>&"));
        assert!(!regex.is_match("ns::Boxed<int>"));
        assert!(!regex.is_match("other::ns::Box<int>"));
    }

    #[test]
    fn test_strategy_precedence()
    {
        let named = Subprinter::new("A", |_| Ok(Some(Silent))).unwrap();
        assert!(matches!(named.strategy(), MatchStrategy::NameDerived { .. }));

        let regex = Subprinter::new("A", |_| Ok(Some(Silent))).unwrap().with_regex("^A$").unwrap();
        assert!(matches!(regex.strategy(), MatchStrategy::Regex(_)));

        let predicate = Subprinter::new("A", |_| Ok(Some(Silent)))
            .unwrap()
            .with_predicate(|_| true)
            .with_regex("^A$")
            .unwrap();
        assert!(matches!(predicate.strategy(), MatchStrategy::Predicate(_)));
    }

    #[test]
    fn test_bad_regex_is_rejected()
    {
        let mut collection = PrinterCollection::regexp("c");
        assert!(collection.add_printer("broken", "(", |_| Ok(Some(Silent))).is_err());
        assert!(collection.subprinters().is_empty());
    }

    #[test]
    fn test_enabled_flags()
    {
        let collection = PrinterCollection::new("c");
        collection.set_enabled(false);
        assert!(!collection.is_enabled());
        let subprinter = Subprinter::new("A", |_| Ok(Some(Silent))).unwrap().summary_only();
        assert!(!subprinter.has_children());
        subprinter.set_enabled(false);
        assert!(!subprinter.is_enabled());
    }
}
