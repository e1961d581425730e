//! # Session Functions
//!
//! Module-level entry points that resolve against the current target (see
//! [`crate::context`]): type lookup, expression evaluation, global lookup
//! and inferior memory reads.
//!
//! Every function has an `_in` variant taking the target explicitly, for
//! callers that already hold one.

use tracing::debug;

use crate::address::Address;
use crate::context::current_target;
use crate::error::{GalaError, GalaResult};
use crate::host::{BasicType, TargetId, TargetRef};
use crate::types::{Type, split_scope};
use crate::value::Value;

/// Find a type by its (possibly scope-qualified) name in the current target.
///
/// Lookups are always absolute: `"ns::T"` and `"::ns::T"` name the same
/// type, and nothing is resolved relative to the current frame's scope.
///
/// ## Errors
///
/// - `Lookup`: no such type
/// - `NoTarget`: no target context is active
///
/// ## Example
///
/// ```rust
/// use gala_core::context::TargetContext;
/// use gala_core::session::lookup_type;
/// use gala_core::testing::MockTarget;
///
/// let target = MockTarget::new();
/// let _guard = TargetContext::enter(target.as_target());
///
/// assert_eq!(lookup_type("char")?, lookup_type("::char")?);
/// assert!(lookup_type("NoSuchType").is_err());
/// # Ok::<(), gala_core::error::GalaError>(())
/// ```
pub fn lookup_type(name: &str) -> GalaResult<Type>
{
    lookup_type_in(&current_target()?, name)
}

/// [`lookup_type`] against an explicit target.
///
/// ## Errors
///
/// - `Lookup`: no such type
pub fn lookup_type_in(target: &TargetRef, name: &str) -> GalaResult<Type>
{
    let absolute = name.trim();
    let absolute = absolute.strip_prefix("::").unwrap_or(absolute);

    if let Some(basic) = BasicType::from_name(absolute) {
        if let Some(native) = target.basic_type(basic) {
            return Ok(Type::from_native(native));
        }
    }

    let (scope, unscoped) = split_scope(absolute);
    let candidates = target.find_types(unscoped);
    debug!(name = absolute, candidates = candidates.len(), "type lookup");

    if let Some(exact) = candidates.iter().find(|candidate| candidate.name() == absolute) {
        return Ok(Type::from_native(exact.clone()));
    }
    if scope.is_none() && candidates.len() == 1 {
        if let Some(only) = candidates.into_iter().next() {
            return Ok(Type::from_native(only));
        }
    }
    Err(GalaError::Lookup(format!("No type named {name}.")))
}

/// Evaluate `expression` in the current target.
///
/// ## Errors
///
/// - `Evaluation`: the engine could not evaluate it
/// - `NoTarget`: no target context is active
pub fn parse_and_eval(expression: &str) -> GalaResult<Value>
{
    parse_and_eval_in(&current_target()?, expression)
}

/// [`parse_and_eval`] against an explicit target.
///
/// ## Errors
///
/// - `Evaluation`: the engine could not evaluate it
pub fn parse_and_eval_in(target: &TargetRef, expression: &str) -> GalaResult<Value>
{
    target
        .evaluate_expression(expression)
        .map(Value::from_native)
        .map_err(|err| GalaError::Evaluation {
            expression: expression.to_string(),
            reason: err.0,
        })
}

/// The global variable called `name`.
///
/// ## Errors
///
/// - `Lookup`: no such global
/// - `NoTarget`: no target context is active
pub fn lookup_global(name: &str) -> GalaResult<Value>
{
    current_target()?
        .find_global_variable(name)
        .map(Value::from_native)
        .ok_or_else(|| GalaError::Lookup(format!("No global symbol \"{name}\".")))
}

/// The process being debugged in the current target.
///
/// ## Errors
///
/// - `NoTarget`: no target context is active
pub fn selected_inferior() -> GalaResult<Inferior>
{
    Ok(Inferior::new(current_target()?))
}

/// Handle to the debugged process
#[derive(Debug, Clone)]
pub struct Inferior
{
    target: TargetRef,
}

impl Inferior
{
    #[must_use]
    pub fn new(target: TargetRef) -> Self
    {
        Self { target }
    }

    /// Identifier of the owning target.
    #[must_use]
    pub fn num(&self) -> TargetId
    {
        self.target.id()
    }

    /// Read `len` bytes at `address`.
    ///
    /// A zero-length read returns an empty buffer without touching the
    /// process.
    ///
    /// ## Errors
    ///
    /// - `Memory`: the range is not readable
    ///
    /// ## Example
    ///
    /// ```rust
    /// use gala_core::session::Inferior;
    /// use gala_core::testing::MockTarget;
    ///
    /// let target = MockTarget::new();
    /// target.write_memory(0x2000, b"hello");
    /// let inferior = Inferior::new(target.as_target());
    ///
    /// assert_eq!(inferior.read_memory(0x2000u64, 5)?, b"hello");
    /// assert!(inferior.read_memory(0xdead_0000u64, 0)?.is_empty());
    /// # Ok::<(), gala_core::error::GalaError>(())
    /// ```
    pub fn read_memory(&self, address: impl Into<Address>, len: usize) -> GalaResult<Vec<u8>>
    {
        if len == 0 {
            return Ok(Vec::new());
        }
        let address = address.into();
        let bytes = self
            .target
            .read_memory(address.value(), len)
            .map_err(|err| GalaError::memory(err.0))?;
        if bytes.len() < len {
            return Err(GalaError::memory(format!(
                "Cannot access memory at address {address}: read {} of {len} bytes",
                bytes.len()
            )));
        }
        Ok(bytes)
    }
}
