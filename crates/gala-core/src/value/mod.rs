//! # Value Adapter
//!
//! Foreign-style value semantics over a native value handle.
//!
//! [`Value`] wraps a [`NativeValueRef`]. Values are immutable snapshots: every
//! operation builds a fresh `Value`, and nothing mutates the inferior.
//!
//! The numeric, casting and indexing rules reproduce the foreign API even
//! where the native engine behaves differently:
//!
//! - integer `/` integer truncates ([`arith`])
//! - pointer arithmetic scales by the pointee size ([`arith`])
//! - string indexing searches anonymous unions ([`index`])
//! - widening integer casts never read adjacent memory ([`cast`])
//!
//! ## Example
//!
//! ```rust
//! use gala_core::context::TargetContext;
//! use gala_core::testing::MockTarget;
//! use gala_core::value::Value;
//!
//! let target = MockTarget::new();
//! let _guard = TargetContext::enter(target.as_target());
//!
//! let seven = Value::from_i64(7)?;
//! assert_eq!(seven.truediv(2)?, 3);
//! assert_eq!(Value::from_f64(7.0)?.truediv(2)?, 3.5);
//! # Ok::<(), gala_core::error::GalaError>(())
//! ```

pub mod arith;
pub mod cast;
pub mod index;
mod number;
pub mod string;

use std::cmp::Ordering;
use std::fmt;

pub use arith::{BinaryOp, Operand};
pub use index::Index;
pub use number::Number;
pub(crate) use number::{decode_float, decode_uint, encode_float, encode_uint};
pub use string::{Encoding, ErrorPolicy};

use crate::address::Address;
use crate::context::current_target;
use crate::error::{GalaError, GalaResult};
use crate::host::{BasicType, NativeValueRef, TargetRef, TypeClass};
use crate::types::Type;

/// A foreign-style value
#[derive(Clone)]
pub struct Value
{
    native: NativeValueRef,
}

impl Value
{
    /// Wrap a native value handle.
    #[must_use]
    pub fn from_native(native: NativeValueRef) -> Self
    {
        Self { native }
    }

    /// A `long` holding `value`, made in the current target.
    ///
    /// ## Errors
    ///
    /// - `NoTarget`: no target context is active
    /// - `Lookup`: the target has no `long` type
    pub fn from_i64(value: i64) -> GalaResult<Self>
    {
        Self::from_number_in(&current_target()?, Number::Signed(value))
    }

    /// A `double` holding `value`, made in the current target.
    ///
    /// ## Errors
    ///
    /// - `NoTarget`: no target context is active
    /// - `Lookup`: the target has no `double` type
    pub fn from_f64(value: f64) -> GalaResult<Self>
    {
        Self::from_number_in(&current_target()?, Number::Float(value))
    }

    /// A `bool` holding `value`, made in the current target.
    ///
    /// ## Errors
    ///
    /// - `NoTarget`: no target context is active
    /// - `Lookup`: the target has no `bool` type
    pub fn from_bool(value: bool) -> GalaResult<Self>
    {
        let target = current_target()?;
        let ty = builtin_type(&target, BasicType::Bool)?;
        let bytes = encode_uint(u64::from(value), usize_of(ty.sizeof()), target.byte_order());
        Ok(Self::from_native(target.create_value_from_data("", bytes, ty.native())))
    }

    /// Fabricate a `long` (integers) or `double` (floats) in `target`.
    ///
    /// ## Errors
    ///
    /// - `Lookup`: the target lacks the builtin type
    pub fn from_number_in(target: &TargetRef, number: Number) -> GalaResult<Self>
    {
        let order = target.byte_order();
        let basic = match number {
            Number::Float(_) => BasicType::Double,
            Number::Signed(_) => BasicType::Long,
            Number::Unsigned(_) => BasicType::UnsignedLong,
        };
        let ty = builtin_type(target, basic)?;
        let size = usize_of(ty.sizeof());
        #[allow(clippy::cast_sign_loss)]
        let bytes = match number {
            Number::Float(value) => encode_float(value, size, order),
            Number::Signed(value) => encode_uint(value as u64, size, order),
            Number::Unsigned(value) => encode_uint(value, size, order),
        };
        Ok(Self::from_native(target.create_value_from_data("", bytes, ty.native())))
    }

    /// A value of type `ty` whose contents are the first `sizeof(ty)` bytes
    /// of `bytes`.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: `bytes` is shorter than the type
    /// - `NoTarget`: no target context is active
    pub fn from_bytes(bytes: &[u8], ty: &Type) -> GalaResult<Self>
    {
        let size = usize_of(ty.sizeof());
        if bytes.len() < size {
            return Err(GalaError::InvalidArgument(format!(
                "Size of type \"{}\" ({size} bytes) is larger than that of the buffer ({} bytes).",
                ty.name(),
                bytes.len()
            )));
        }
        let target = current_target()?;
        Ok(Self::from_native(target.create_value_from_data("", bytes[..size].to_vec(), ty.native())))
    }

    /// The wrapped native handle.
    #[must_use]
    pub fn native(&self) -> &NativeValueRef
    {
        &self.native
    }

    /// The target that produced this value.
    #[must_use]
    pub fn target(&self) -> TargetRef
    {
        self.native.target()
    }

    /// The value's static type.
    #[must_use]
    pub fn ty(&self) -> Type
    {
        Type::from_native(self.native.native_type())
    }

    /// Name the engine gave this value (variable or child name).
    #[must_use]
    pub fn name(&self) -> Option<String>
    {
        self.native.name()
    }

    /// Address of the value in the inferior.
    #[must_use]
    pub fn load_address(&self) -> Option<Address>
    {
        self.native.load_address().map(Address::from)
    }

    /// The numeric contents.
    ///
    /// - enumerations read through their underlying integer type
    /// - pointers and integers read per the type's signedness
    /// - floats are reinterpreted from their raw bytes
    /// - arrays decay to their load address
    /// - references read their referent
    ///
    /// ## Errors
    ///
    /// - `Conversion`: any other kind of value, or unreadable contents
    pub fn as_number(&self) -> GalaResult<Number>
    {
        let ty = self.ty().strip_typedefs();
        match ty.type_class() {
            TypeClass::Enumeration => {
                let signed = ty
                    .native()
                    .enumeration_integer_type()
                    .map_or_else(|| ty.is_signed(), |int| int.is_signed());
                self.read_integer(signed)
            }
            TypeClass::Pointer | TypeClass::MemberPointer => self.read_integer(false),
            TypeClass::Reference => self.referenced_value()?.as_number(),
            TypeClass::Array => self
                .native
                .load_address()
                .map(Number::Unsigned)
                .ok_or_else(|| GalaError::Conversion(format!("array of type \"{ty}\" has no address"))),
            TypeClass::Builtin => {
                let basic = ty.native().basic_type();
                if basic.is_float() {
                    let bytes = self.native.data().map_err(|err| GalaError::Conversion(err.0))?;
                    decode_float(&bytes, self.target().byte_order())
                        .map(Number::Float)
                        .ok_or_else(|| GalaError::Conversion(format!("unsupported float width {}", bytes.len())))
                } else if basic.is_signed_integer() || basic.is_unsigned_integer() {
                    self.read_integer(ty.is_signed())
                } else {
                    Err(GalaError::Conversion(format!("values of type \"{ty}\" are not numbers")))
                }
            }
            _ => Err(GalaError::Conversion(format!("values of type \"{ty}\" are not numbers"))),
        }
    }

    fn read_integer(&self, signed: bool) -> GalaResult<Number>
    {
        if signed {
            self.native
                .value_as_signed()
                .map(Number::Signed)
                .map_err(|err| GalaError::Conversion(err.0))
        } else {
            self.native
                .value_as_unsigned()
                .map(Number::Unsigned)
                .map_err(|err| GalaError::Conversion(err.0))
        }
    }

    /// `true` when the numeric contents are nonzero.
    ///
    /// ## Errors
    ///
    /// - `Conversion`: the value is not a number
    pub fn is_truthy(&self) -> GalaResult<bool>
    {
        Ok(match self.as_number()? {
            Number::Float(value) => value != 0.0,
            number => number.as_i128() != Some(0),
        })
    }

    /// Three-way comparison of the numeric contents.
    ///
    /// Pointers compare by address.
    ///
    /// ## Errors
    ///
    /// - `Conversion`: either side is not a number, or the comparison involves NaN
    pub fn compare(&self, other: impl Into<Operand>) -> GalaResult<Ordering>
    {
        let lhs = self.as_number()?;
        let rhs = other.into().number()?;
        match (lhs.as_i128(), rhs.as_i128()) {
            (Some(a), Some(b)) => Ok(a.cmp(&b)),
            _ => lhs
                .as_f64()
                .partial_cmp(&rhs.as_f64())
                .ok_or_else(|| GalaError::Conversion("comparison with NaN".to_string())),
        }
    }

    /// A pointer to this value; for references, a pointer to the referent.
    ///
    /// Returns `Ok(None)` when the value does not live in memory.
    ///
    /// ## Errors
    ///
    /// - `Memory`: a reference could not be followed
    pub fn address(&self) -> GalaResult<Option<Value>>
    {
        let subject = if self.ty().strip_typedefs().type_class() == TypeClass::Reference {
            self.native.dereference().map_err(|err| GalaError::memory(err.0))?
        } else {
            self.native.clone()
        };
        if let Some(pointer) = subject.address_of() {
            return Ok(Some(Value::from_native(pointer)));
        }
        let Some(address) = subject.load_address() else {
            return Ok(None);
        };
        let relocated = self
            .target()
            .create_value_from_address("", address, &subject.native_type());
        Ok(relocated.address_of().map(Value::from_native))
    }
}

/// Builtin type lookup that fails with a script-visible error.
pub(crate) fn builtin_type(target: &TargetRef, basic: BasicType) -> GalaResult<Type>
{
    target
        .basic_type(basic)
        .map(Type::from_native)
        .ok_or_else(|| GalaError::Lookup(format!("builtin type {basic:?} is not available")))
}

#[allow(clippy::cast_possible_truncation)]
pub(crate) fn usize_of(size: u64) -> usize
{
    size as usize
}

impl fmt::Display for Value
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.native.display_string())
    }
}

impl fmt::Debug for Value
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Value")
            .field("type", &self.ty().name())
            .field("display", &self.native.display_string())
            .finish()
    }
}

impl From<NativeValueRef> for Value
{
    fn from(native: NativeValueRef) -> Self
    {
        Value::from_native(native)
    }
}

impl TryFrom<&Value> for i64
{
    type Error = GalaError;

    fn try_from(value: &Value) -> GalaResult<Self>
    {
        match value.as_number()? {
            Number::Float(_) => Err(GalaError::Conversion(format!(
                "value of type \"{}\" is not an integer",
                value.ty()
            ))),
            number => Ok(number.as_i64()),
        }
    }
}

impl TryFrom<&Value> for f64
{
    type Error = GalaError;

    fn try_from(value: &Value) -> GalaResult<Self>
    {
        Ok(value.as_number()?.as_f64())
    }
}

impl PartialEq for Value
{
    fn eq(&self, other: &Self) -> bool
    {
        self.compare(other).is_ok_and(Ordering::is_eq)
    }
}

impl PartialOrd for Value
{
    fn partial_cmp(&self, other: &Self) -> Option<Ordering>
    {
        self.compare(other).ok()
    }
}

impl PartialEq<i64> for Value
{
    fn eq(&self, other: &i64) -> bool
    {
        self.compare(*other).is_ok_and(Ordering::is_eq)
    }
}

impl PartialOrd<i64> for Value
{
    fn partial_cmp(&self, other: &i64) -> Option<Ordering>
    {
        self.compare(*other).ok()
    }
}

impl PartialEq<i32> for Value
{
    fn eq(&self, other: &i32) -> bool
    {
        self.compare(*other).is_ok_and(Ordering::is_eq)
    }
}

impl PartialEq<f64> for Value
{
    fn eq(&self, other: &f64) -> bool
    {
        self.compare(*other).is_ok_and(Ordering::is_eq)
    }
}
