//! # Error Types
//!
//! General error handling for the type and value adapters.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.

use thiserror::Error;

/// Main error type for adapter operations
///
/// This enum represents all the ways an emulated `Type`/`Value` operation can
/// fail. Scripts see these errors; the host process never does.
///
/// ## Error Categories
///
/// Each variant maps onto one [`ErrorKind`] (see [`GalaError::kind`]):
///
/// 1. **Lookup errors**: Lookup, MemberNotFound, NoTarget
/// 2. **Type errors**: Type
/// 3. **Conversion errors**: Conversion, ZeroDivision
/// 4. **Memory errors**: Memory
/// 5. **Registration errors**: Registration
/// 6. **Evaluation errors**: Evaluation
/// 7. **Input errors**: InvalidArgument, Io, Object
#[derive(Error, Debug)]
pub enum GalaError
{
    /// A type, global or nested entity could not be found by name
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// A struct/union/class member could not be found by name
    ///
    /// Raised by string indexing after both the direct lookup and the
    /// anonymous-union search failed.
    #[error("No member with name \"{member}\" in value of type \"{container}\"")]
    MemberNotFound
    {
        /// Name that was looked up
        member: String,
        /// Name of the type that was searched
        container: String,
    },

    /// The operation is not valid for the type classification involved
    ///
    /// Examples:
    /// - Indexing a scalar
    /// - Asking for the fields of an `int`
    /// - Subtracting pointers with different pointee types
    #[error("Type error: {0}")]
    Type(String),

    /// The value cannot be represented as a number
    #[error("Cannot convert value to a number: {0}")]
    Conversion(String),

    /// Integer division (or modulo) by zero
    #[error("Division by zero")]
    ZeroDivision,

    /// Memory could not be read, or the requested read length is invalid
    #[error("Memory error: {0}")]
    Memory(String),

    /// A formatter category already exists and replacement was not requested
    #[error("Registration error: {0}")]
    Registration(String),

    /// The host could not evaluate an expression
    #[error("Unable to evaluate \"{expression}\": {reason}")]
    Evaluation
    {
        /// Expression text handed to the host
        expression: String,
        /// Host-provided failure description
        reason: String,
    },

    /// No debug target is associated with the current call
    ///
    /// Session-level functions (`lookup_type`, `parse_and_eval`, ...) need a
    /// target context to have been entered with
    /// [`TargetContext::enter`](crate::context::TargetContext::enter).
    #[error("No debug target is selected")]
    NoTarget,

    /// Invalid argument passed to an adapter function
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Failed to parse an object file
    #[error("Object file error: {0}")]
    Object(#[from] object::Error),

    /// I/O error (for reading binaries, script files, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The error taxonomy visible to scripts
///
/// Scripts written against the foreign API only ever distinguish these
/// classes, so every [`GalaError`] variant collapses onto one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind
{
    /// Type, member or global not found
    Lookup,
    /// Operation invalid for the value's or type's classification
    Type,
    /// Value not representable as a number
    Conversion,
    /// Unreadable address or invalid read length
    Memory,
    /// Duplicate formatter category without replace
    Registration,
    /// Expression evaluation failed
    Evaluation,
    /// Bad input from the caller
    InvalidArgument,
}

impl GalaError
{
    /// Classify this error onto the script-visible taxonomy.
    #[must_use]
    pub fn kind(&self) -> ErrorKind
    {
        match self {
            GalaError::Lookup(_) | GalaError::MemberNotFound { .. } | GalaError::NoTarget => ErrorKind::Lookup,
            GalaError::Type(_) => ErrorKind::Type,
            GalaError::Conversion(_) | GalaError::ZeroDivision => ErrorKind::Conversion,
            GalaError::Memory(_) => ErrorKind::Memory,
            GalaError::Registration(_) => ErrorKind::Registration,
            GalaError::Evaluation { .. } => ErrorKind::Evaluation,
            GalaError::InvalidArgument(_) | GalaError::Object(_) | GalaError::Io(_) => ErrorKind::InvalidArgument,
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self
    {
        GalaError::Type(message.into())
    }

    pub(crate) fn memory(message: impl Into<String>) -> Self
    {
        GalaError::Memory(message.into())
    }
}

/// Convenience type alias for `Result<T, GalaError>`
///
/// ```rust
/// use gala_core::error::GalaResult;
/// fn foo() -> GalaResult<()>
/// {
///     Ok(())
/// }
/// ```
pub type GalaResult<T> = std::result::Result<T, GalaError>;
