//! Subscripting: `value[name]`, `value[n]`, `value[field]`.

use super::{Number, Value};
use crate::error::{GalaError, GalaResult};
use crate::host::{NativeValueRef, TypeClass};
use crate::types::{Field, Type};

/// Anything a value can be subscripted with.
#[derive(Debug, Clone)]
pub enum Index
{
    /// Member name
    Name(String),
    /// Element position
    Position(i64),
    /// A value convertible to an integer position
    Value(Value),
    /// A field from [`Type::fields`], equivalent to indexing by its name
    Field(Field),
}

impl From<&str> for Index
{
    fn from(name: &str) -> Self
    {
        Index::Name(name.to_string())
    }
}

impl From<String> for Index
{
    fn from(name: String) -> Self
    {
        Index::Name(name)
    }
}

impl From<i64> for Index
{
    fn from(position: i64) -> Self
    {
        Index::Position(position)
    }
}

impl From<i32> for Index
{
    fn from(position: i32) -> Self
    {
        Index::Position(i64::from(position))
    }
}

impl From<Value> for Index
{
    fn from(value: Value) -> Self
    {
        Index::Value(value)
    }
}

impl From<&Value> for Index
{
    fn from(value: &Value) -> Self
    {
        Index::Value(value.clone())
    }
}

impl From<Field> for Index
{
    fn from(field: Field) -> Self
    {
        Index::Field(field)
    }
}

impl From<&Field> for Index
{
    fn from(field: &Field) -> Self
    {
        Index::Field(field.clone())
    }
}

impl Value
{
    /// Subscript this value.
    ///
    /// - names select struct, class and union members, including members of
    ///   anonymous unions; pointers are dereferenced and arrays decay to their
    ///   first element first
    /// - positions select pointer or array elements
    /// - base-class fields select the base subobject
    ///
    /// ## Errors
    ///
    /// - `MemberNotFound`: no member with that name
    /// - `Type`: the value cannot be subscripted that way
    /// - `Memory`: the element could not be produced
    pub fn get(&self, index: impl Into<Index>) -> GalaResult<Value>
    {
        match index.into() {
            Index::Name(name) => self.member(&name),
            Index::Position(position) => self.element(position),
            Index::Value(value) => match value.as_number()? {
                Number::Float(_) => Err(GalaError::type_error("Array index must be an integer.")),
                number => self.element(number.as_i64()),
            },
            Index::Field(field) => self.field(&field),
        }
    }

    fn field(&self, field: &Field) -> GalaResult<Value>
    {
        match field {
            Field::BaseClass { ty, .. } => self.cast(ty),
            Field::Member { name, ty, bit_offset, .. } if name.is_empty() => self
                .native
                .create_child_at_offset("", bit_offset / 8, ty.native())
                .map(Value::from_native)
                .map_err(|err| GalaError::memory(err.0)),
            Field::Member { name, .. } => self.member(name),
            Field::EnumMember { .. } => Err(GalaError::type_error("Enumerators cannot be used as an index.")),
        }
    }

    fn member(&self, name: &str) -> GalaResult<Value>
    {
        let ty = self.ty().strip_typedefs();
        match ty.type_class() {
            class if class.is_aggregate() => find_member(&self.native, &ty, name)
                .map(Value::from_native)
                .ok_or_else(|| GalaError::MemberNotFound {
                    member: name.to_string(),
                    container: self.ty().name(),
                }),
            TypeClass::Pointer | TypeClass::Reference => self.referenced_value()?.member(name),
            TypeClass::Array => self.element(0)?.member(name),
            _ => Err(GalaError::type_error(format!(
                "Attempt to extract a component of a value that is not a structure (type \"{}\").",
                self.ty()
            ))),
        }
    }

    fn element(&self, position: i64) -> GalaResult<Value>
    {
        let ty = self.ty().strip_typedefs();
        match ty.type_class() {
            TypeClass::Pointer => {
                let base = self.as_number()?.as_i64();
                self.element_at(base, &ty.target()?, position)
            }
            TypeClass::Array => {
                let element_type = ty.target()?;
                match self.native.load_address() {
                    #[allow(clippy::cast_possible_wrap)]
                    Some(base) => self.element_at(base as i64, &element_type, position),
                    None => {
                        let child = usize::try_from(position).ok().and_then(|index| self.native.child_at_index(index));
                        child
                            .map(Value::from_native)
                            .ok_or_else(|| GalaError::memory(format!("Cannot access element {position} of \"{}\".", self.ty())))
                    }
                }
            }
            TypeClass::Reference => self.referenced_value()?.element(position),
            _ => Err(GalaError::type_error(format!("Cannot subscript requested type \"{}\".", self.ty()))),
        }
    }

    #[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn element_at(&self, base: i64, element_type: &Type, position: i64) -> GalaResult<Value>
    {
        let address = base.wrapping_add(position.wrapping_mul(element_type.sizeof() as i64));
        Ok(Value::from_native(self.target().create_value_from_address(
            "",
            address as u64,
            element_type.native(),
        )))
    }
}

/// Member lookup that also descends into anonymous unions and structs,
/// including those of base classes.
fn find_member(value: &NativeValueRef, ty: &Type, name: &str) -> Option<NativeValueRef>
{
    if let Some(found) = value.child_member_with_name(name) {
        return Some(found);
    }
    for field in ty.fields().ok()? {
        let (offset, field_type) = match &field {
            Field::Member { name, ty, bit_offset, .. } if name.is_empty() => (bit_offset / 8, ty),
            Field::BaseClass { ty, byte_offset, .. } => (*byte_offset, ty),
            _ => continue,
        };
        let field_type_stripped = field_type.strip_typedefs();
        if !field_type_stripped.type_class().is_aggregate() {
            continue;
        }
        let Ok(child) = value.create_child_at_offset("", offset, field_type.native()) else {
            continue;
        };
        if let Some(found) = find_member(&child, &field_type_stripped, name) {
            return Some(found);
        }
    }
    None
}
