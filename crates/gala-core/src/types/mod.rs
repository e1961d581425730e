//! # Type Adapter
//!
//! Foreign-style type introspection over a native type handle.
//!
//! [`Type`] wraps a [`NativeTypeRef`] and answers the questions scripts ask
//! about types: classification ([`TypeCode`]), fields, typedef stripping and
//! derived types. It owns nothing except the handle.
//!
//! ## Example
//!
//! ```rust
//! use gala_core::context::TargetContext;
//! use gala_core::session::lookup_type;
//! use gala_core::testing::MockTarget;
//! use gala_core::types::TypeCode;
//!
//! let target = MockTarget::new();
//! let _guard = TargetContext::enter(target.as_target());
//!
//! let int = lookup_type("int")?;
//! assert_eq!(int.code(), TypeCode::Int);
//! assert_eq!(int.pointer().code(), TypeCode::Ptr);
//! assert_eq!(int.array(3)?.sizeof(), 16);
//! # Ok::<(), gala_core::error::GalaError>(())
//! ```

mod code;
mod field;
pub mod helpers;

use std::fmt;

pub use code::TypeCode;
pub use field::Field;

use crate::context::current_target;
use crate::error::{GalaError, GalaResult};
use crate::host::{NativeStaticField, NativeType, NativeTypeRef, TypeClass};
use crate::value::Value;

/// Upper bound on typedef layers, so that a cycle of typedefs terminates.
pub(crate) const MAX_TYPEDEF_DEPTH: usize = 64;

/// A foreign-style type
#[derive(Clone)]
pub struct Type
{
    native: NativeTypeRef,
}

impl Type
{
    /// Wrap a native type handle.
    #[must_use]
    pub fn from_native(native: NativeTypeRef) -> Self
    {
        Self { native }
    }

    /// The wrapped native handle.
    #[must_use]
    pub fn native(&self) -> &NativeTypeRef
    {
        &self.native
    }

    pub(crate) fn type_class(&self) -> TypeClass
    {
        self.native.type_class()
    }

    /// Shape classification.
    #[must_use]
    pub fn code(&self) -> TypeCode
    {
        TypeCode::of(self.native.as_ref())
    }

    #[must_use]
    pub fn name(&self) -> String
    {
        self.native.name()
    }

    /// Size in bytes.
    #[must_use]
    pub fn sizeof(&self) -> u64
    {
        self.native.byte_size()
    }

    /// The tag name of a struct, class, union or enum.
    #[must_use]
    pub fn tag(&self) -> Option<String>
    {
        match self.type_class() {
            TypeClass::Struct | TypeClass::Class | TypeClass::Union | TypeClass::Enumeration => Some(self.name()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_signed(&self) -> bool
    {
        self.native.is_signed()
    }

    /// Engine-level identity.
    #[must_use]
    pub fn same_as(&self, other: &Type) -> bool
    {
        self.native.same_type(other.native.as_ref())
    }

    /// The pointee, referent, element or return type.
    ///
    /// ## Errors
    ///
    /// - `Type`: the type is not a pointer, reference, array or function
    pub fn target(&self) -> GalaResult<Type>
    {
        let target = match self.type_class() {
            TypeClass::Pointer | TypeClass::MemberPointer => self.native.pointee_type(),
            TypeClass::Reference => self.native.dereferenced_type(),
            TypeClass::Array => self.native.array_element_type(),
            TypeClass::Function => self.native.function_return_type(),
            _ => None,
        };
        target
            .map(Type::from_native)
            .ok_or_else(|| GalaError::type_error(format!("Type \"{}\" cannot have target type.", self.name())))
    }

    /// Unwrap typedef layers until a non-typedef (or a self-referential
    /// typedef) is reached.
    #[must_use]
    pub fn strip_typedefs(&self) -> Type
    {
        self.typedef_chain().pop().unwrap_or_else(|| self.clone())
    }

    /// This type followed by each type it aliases, outermost first.
    ///
    /// The last entry is what [`Type::strip_typedefs`] returns.
    #[must_use]
    pub fn typedef_chain(&self) -> Vec<Type>
    {
        let mut chain = vec![self.clone()];
        let mut current = self.native.clone();
        for _ in 0..MAX_TYPEDEF_DEPTH {
            let Some(next) = current.typedefed_type() else {
                break;
            };
            if next.same_type(current.as_ref()) {
                break;
            }
            chain.push(Type::from_native(next.clone()));
            current = next;
        }
        chain
    }

    /// This type without `const`/`volatile`.
    #[must_use]
    pub fn unqualified(&self) -> Type
    {
        self.native.unqualified_type().map_or_else(|| self.clone(), Type::from_native)
    }

    #[must_use]
    pub fn pointer(&self) -> Type
    {
        Type::from_native(self.native.pointer_type())
    }

    #[must_use]
    pub fn reference(&self) -> Type
    {
        Type::from_native(self.native.reference_type())
    }

    /// Array type with indices `0..=upper_bound`.
    ///
    /// ## Errors
    ///
    /// - `Type`: `upper_bound` is less than -1
    pub fn array(&self, upper_bound: i64) -> GalaResult<Type>
    {
        self.array_bounds(0, upper_bound)
    }

    /// Array type with indices `low..=high`.
    ///
    /// Only zero-based arrays exist in the native type system.
    ///
    /// ## Errors
    ///
    /// - `Type`: nonzero `low`, or a negative element count
    pub fn array_bounds(&self, low: i64, high: i64) -> GalaResult<Type>
    {
        if low != 0 {
            return Err(GalaError::type_error(format!(
                "Arrays with a lower bound of {low} are not supported."
            )));
        }
        let len = high
            .checked_add(1)
            .and_then(|len| u64::try_from(len).ok())
            .ok_or_else(|| GalaError::type_error("Array length must not be negative"))?;
        Ok(Type::from_native(self.native.array_type(len)))
    }

    /// The `n`th template argument.
    ///
    /// ## Errors
    ///
    /// - `Lookup`: the type has fewer than `n + 1` template arguments
    pub fn template_argument(&self, n: usize) -> GalaResult<Type>
    {
        self.strip_typedefs()
            .native
            .template_argument(n)
            .map(Type::from_native)
            .ok_or_else(|| GalaError::Lookup(format!("Template argument number {n} of \"{}\" not found.", self.name())))
    }

    /// A type declared directly inside this one.
    ///
    /// ## Errors
    ///
    /// - `Lookup`: no nested type with that name
    pub fn nested_type(&self, name: &str) -> GalaResult<Type>
    {
        self.strip_typedefs()
            .native
            .nested_type(name)
            .map(Type::from_native)
            .ok_or_else(|| GalaError::Lookup(format!("There is no type named {name}")))
    }

    /// Value of the `static constexpr` member `name`, read without an
    /// instance of the type.
    ///
    /// The value is materialised in the current target.
    ///
    /// ## Errors
    ///
    /// - `NoTarget`: no current target
    /// - `Lookup`: no static member called `name`, or it is not a constant
    pub fn static_constexpr_value(&self, name: &str) -> GalaResult<Value>
    {
        let target = current_target()?;
        match self.strip_typedefs().native.static_field_value(name, &target) {
            NativeStaticField::Constant(value) => Ok(Value::from_native(value)),
            NativeStaticField::NotConstant => Err(GalaError::Lookup(format!("{name} is not a constexpr field"))),
            NativeStaticField::Missing => Err(GalaError::Lookup(format!("There is no static field named {name}"))),
        }
    }

    /// Enumerators, or base classes followed by direct members.
    ///
    /// Typedefs are looked through.
    ///
    /// ## Errors
    ///
    /// - `Type`: the type is neither an aggregate nor an enumeration
    pub fn fields(&self) -> GalaResult<Vec<Field>>
    {
        let stripped = self.strip_typedefs();
        let native = stripped.native.as_ref();
        match native.type_class() {
            TypeClass::Enumeration => Ok(native
                .enum_members()
                .into_iter()
                .map(|member| Field::EnumMember {
                    name: enumerator_name(native, &member.name),
                    value: member.value,
                    ty: stripped.clone(),
                })
                .collect()),
            class if class.is_aggregate() => {
                let bases = native.direct_base_classes().into_iter().map(|base| Field::BaseClass {
                    name: base.name,
                    ty: Type::from_native(base.ty),
                    byte_offset: base.byte_offset,
                    parent: stripped.clone(),
                });
                let members = native.fields().into_iter().map(|field| Field::Member {
                    name: field.name,
                    ty: Type::from_native(field.ty),
                    bit_offset: field.bit_offset,
                    bit_size: field.bit_size,
                    parent: stripped.clone(),
                });
                Ok(bases.chain(members).collect())
            }
            _ => Err(GalaError::type_error(format!("Type \"{}\" cannot have fields.", self.name()))),
        }
    }

    /// Byte offset of this type inside `derived`, if this type is a (direct
    /// or indirect) base class of it.
    ///
    /// Searches depth first, summing base offsets along the path. A type is
    /// not a base class of itself.
    #[must_use]
    pub fn is_base_class_of(&self, derived: &Type) -> Option<u64>
    {
        let base = self.strip_typedefs();
        let derived = derived.strip_typedefs();
        if !derived.type_class().is_aggregate() {
            return None;
        }
        for direct in derived.native.direct_base_classes() {
            let direct_ty = Type::from_native(direct.ty).strip_typedefs();
            if direct_ty.same_as(&base) {
                return Some(direct.byte_offset);
            }
            if let Some(inner) = base.is_base_class_of(&direct_ty) {
                return Some(direct.byte_offset + inner);
            }
        }
        None
    }
}

/// Enumerator names are qualified the way they are spelled in source: scoped
/// enums by the enum name, unscoped ones by the enclosing scope only.
fn enumerator_name(enum_type: &dyn NativeType, member: &str) -> String
{
    let enum_name = enum_type.name();
    if enum_type.is_scoped_enum() {
        return format!("{enum_name}::{member}");
    }
    match split_scope(&enum_name) {
        (Some(scope), _) => format!("{scope}::{member}"),
        (None, _) => member.to_string(),
    }
}

/// Split `a::b<c::d>::e` into `(Some("a::b<c::d>"), "e")`.
///
/// Separators inside template argument lists and parentheses are ignored.
pub(crate) fn split_scope(name: &str) -> (Option<&str>, &str)
{
    let bytes = name.as_bytes();
    let mut depth = 0usize;
    let mut split = None;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'<' | b'(' => depth += 1,
            b'>' | b')' => depth = depth.saturating_sub(1),
            b':' if depth == 0 && bytes.get(i + 1) == Some(&b':') => {
                split = Some(i);
                i += 1;
            }
            _ => {}
        }
        i += 1;
    }
    match split {
        Some(0) => (None, &name[2..]),
        Some(at) => (Some(&name[..at]), &name[at + 2..]),
        None => (None, name),
    }
}

impl fmt::Display for Type
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(&self.name())
    }
}

impl fmt::Debug for Type
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Type")
            .field("name", &self.name())
            .field("code", &self.code())
            .finish()
    }
}

impl PartialEq for Type
{
    fn eq(&self, other: &Self) -> bool
    {
        self.same_as(other)
    }
}

impl From<NativeTypeRef> for Type
{
    fn from(native: NativeTypeRef) -> Self
    {
        Type::from_native(native)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_split_scope_plain()
    {
        assert_eq!(split_scope("VALUE"), (None, "VALUE"));
        assert_eq!(split_scope("Class::Enum"), (Some("Class"), "Enum"));
        assert_eq!(split_scope("a::b::c"), (Some("a::b"), "c"));
    }

    #[test]
    fn test_split_scope_ignores_template_arguments()
    {
        assert_eq!(split_scope("std::map<ns::K, ns::V>"), (Some("std"), "map<ns::K, ns::V>"));
        assert_eq!(split_scope("Outer<x::y>::Inner"), (Some("Outer<x::y>"), "Inner"));
    }

    #[test]
    fn test_split_scope_leading_separator()
    {
        assert_eq!(split_scope("::char"), (None, "char"));
    }
}
