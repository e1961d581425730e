//! Casts and dereferencing.
//!
//! [`Value::cast`] differs from the engine's raw cast in three ways:
//!
//! - upcasts to a base class become a child at the base offset, so the
//!   result keeps a real address
//! - downcasts step back by the same offset
//! - widening integer casts rebuild the value from its number instead of
//!   letting the engine read adjacent memory
//!
//! [`Value::reinterpret_cast`] is the raw cast, with the shape check the
//! engine does not perform.

use tracing::trace;

use super::Value;
use crate::error::{GalaError, GalaResult};
use crate::host::TypeClass;
use crate::types::{Type, TypeCode};

impl Value
{
    /// Convert to `ty`.
    ///
    /// ## Errors
    ///
    /// - `Type`: the engine refused the conversion
    /// - `Evaluation`: a widening integer cast could not be rebuilt
    /// - `Memory`: a base-class subobject could not be produced
    pub fn cast(&self, ty: &Type) -> GalaResult<Value>
    {
        let source = self.ty().strip_typedefs();
        let destination = ty.strip_typedefs();

        if let Some(offset) = destination.is_base_class_of(&source) {
            trace!(from = %source, to = %destination, offset, "upcast");
            return self
                .native
                .create_child_at_offset("", offset, ty.native())
                .map(Value::from_native)
                .map_err(|err| GalaError::memory(err.0));
        }

        if let Some(offset) = source.is_base_class_of(&destination) {
            if let Some(address) = self.native.load_address() {
                trace!(from = %source, to = %destination, offset, "downcast");
                let native = self
                    .target()
                    .create_value_from_address("", address.wrapping_sub(offset), ty.native());
                return Ok(Value::from_native(native));
            }
        }

        if source.code() == TypeCode::Int && destination.code() == TypeCode::Int && destination.sizeof() > source.sizeof() {
            return self.widen(ty);
        }

        self.native
            .cast(ty.native())
            .map(Value::from_native)
            .map_err(|err| GalaError::type_error(err.0))
    }

    /// Rebuild an integer at a wider type from its number, through the
    /// value's own target.
    fn widen(&self, ty: &Type) -> GalaResult<Value>
    {
        let expression = format!("({}){}", ty.name(), self.as_number()?);
        trace!(%expression, "widening cast");
        self.target()
            .evaluate_expression(&expression)
            .map(Value::from_native)
            .map_err(|err| GalaError::Evaluation {
                expression,
                reason: err.0,
            })
    }

    /// Raw reinterpretation as `ty`.
    ///
    /// Only pointer-like or integer destinations are accepted, and only from
    /// pointer-like, integer, enumeration or array sources.
    ///
    /// ## Errors
    ///
    /// - `Type`: either type has the wrong shape, or the engine refused
    pub fn reinterpret_cast(&self, ty: &Type) -> GalaResult<Value>
    {
        let source = self.ty().strip_typedefs().code();
        let destination = ty.strip_typedefs().code();
        let pointer_like = |code: TypeCode| {
            matches!(code, TypeCode::Ptr | TypeCode::Ref | TypeCode::MemberPtr | TypeCode::MethodPtr)
        };
        let destination_ok = pointer_like(destination) || destination == TypeCode::Int;
        let source_ok =
            pointer_like(source) || matches!(source, TypeCode::Int | TypeCode::Enum | TypeCode::Array);
        if !destination_ok || !source_ok {
            return Err(GalaError::type_error(format!(
                "Invalid reinterpret_cast from \"{}\" to \"{}\".",
                self.ty(),
                ty
            )));
        }
        self.native
            .cast(ty.native())
            .map(Value::from_native)
            .map_err(|err| GalaError::type_error(err.0))
    }

    /// `*value`. For arrays this is the first element.
    ///
    /// ## Errors
    ///
    /// - `Type`: the value is not a pointer, reference or array
    /// - `Memory`: the pointee could not be read
    pub fn dereference(&self) -> GalaResult<Value>
    {
        match self.ty().strip_typedefs().type_class() {
            TypeClass::Array => self.get(0),
            TypeClass::Pointer | TypeClass::Reference => self
                .native
                .dereference()
                .map(Value::from_native)
                .map_err(|err| GalaError::memory(err.0)),
            _ => Err(GalaError::type_error(format!(
                "Attempt to take contents of a non-pointer value of type \"{}\".",
                self.ty()
            ))),
        }
    }

    /// The pointee of a pointer or the referent of a reference.
    ///
    /// ## Errors
    ///
    /// - `Type`: the value is neither
    /// - `Memory`: the target could not be read
    pub fn referenced_value(&self) -> GalaResult<Value>
    {
        match self.ty().strip_typedefs().type_class() {
            TypeClass::Pointer | TypeClass::Reference => self
                .native
                .dereference()
                .map(Value::from_native)
                .map_err(|err| GalaError::memory(err.0)),
            _ => Err(GalaError::type_error(format!(
                "Trying to get the referenced value from a value which is neither a pointer nor a reference (type \"{}\").",
                self.ty()
            ))),
        }
    }
}
