//! Type classification codes.

use std::fmt;

use crate::host::{BasicType, NativeType, TypeClass};

/// Shape classification of a type, independent of its name
///
/// The numeric values are the ones scripts compare against
/// (`TYPE_CODE_PTR == 1`, `TYPE_CODE_INT == 8`, ...), so they are part of the
/// public contract and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TypeCode
{
    Bitstring = -1,
    Undef = 0,
    Ptr = 1,
    Array = 2,
    Struct = 3,
    Union = 4,
    Enum = 5,
    Flags = 6,
    Func = 7,
    Int = 8,
    Flt = 9,
    Void = 10,
    Set = 11,
    Range = 12,
    String = 13,
    Error = 14,
    Method = 15,
    MethodPtr = 16,
    MemberPtr = 17,
    Ref = 18,
    Char = 19,
    Bool = 20,
    Complex = 21,
    Typedef = 22,
    Namespace = 23,
    DecFloat = 24,
    Module = 25,
    InternalFunction = 26,
    XMethod = 27,
}

impl TypeCode
{
    /// Numeric code as seen by scripts.
    #[must_use]
    pub fn as_i32(self) -> i32
    {
        self as i32
    }

    /// Classify a native type.
    ///
    /// Never fails: native classes without a counterpart map to
    /// [`TypeCode::Undef`].
    #[must_use]
    pub fn of(ty: &dyn NativeType) -> Self
    {
        match ty.type_class() {
            TypeClass::Array => TypeCode::Array,
            TypeClass::Class | TypeClass::Struct => TypeCode::Struct,
            TypeClass::Union => TypeCode::Union,
            TypeClass::ComplexFloat | TypeClass::ComplexInteger => TypeCode::Complex,
            TypeClass::Enumeration => TypeCode::Enum,
            TypeClass::Function => TypeCode::Func,
            TypeClass::Pointer => TypeCode::Ptr,
            TypeClass::Reference => TypeCode::Ref,
            TypeClass::Typedef => TypeCode::Typedef,
            TypeClass::MemberPointer => {
                let points_to_function = ty
                    .pointee_type()
                    .is_some_and(|pointee| pointee.type_class() == TypeClass::Function);
                if points_to_function {
                    TypeCode::MethodPtr
                } else {
                    TypeCode::MemberPtr
                }
            }
            TypeClass::Builtin => Self::of_basic(ty.basic_type()),
            TypeClass::Invalid
            | TypeClass::BlockPointer
            | TypeClass::ObjCObject
            | TypeClass::ObjCInterface
            | TypeClass::ObjCObjectPointer
            | TypeClass::Vector
            | TypeClass::Other => TypeCode::Undef,
        }
    }

    /// Classify a builtin type.
    ///
    /// Character types deliberately report [`TypeCode::Int`], not
    /// [`TypeCode::Char`]: existing printers test `code == TYPE_CODE_INT` for
    /// `char` and `wchar_t` values.
    #[must_use]
    pub fn of_basic(basic: BasicType) -> Self
    {
        match basic {
            BasicType::Void => TypeCode::Void,
            BasicType::Char
            | BasicType::SignedChar
            | BasicType::UnsignedChar
            | BasicType::WChar
            | BasicType::SignedWChar
            | BasicType::UnsignedWChar
            | BasicType::Char16
            | BasicType::Char32
            | BasicType::Short
            | BasicType::UnsignedShort
            | BasicType::Int
            | BasicType::UnsignedInt
            | BasicType::Long
            | BasicType::UnsignedLong
            | BasicType::LongLong
            | BasicType::UnsignedLongLong
            | BasicType::Int128
            | BasicType::UnsignedInt128 => TypeCode::Int,
            BasicType::Bool => TypeCode::Bool,
            BasicType::Float | BasicType::Double | BasicType::LongDouble => TypeCode::Flt,
            BasicType::FloatComplex | BasicType::DoubleComplex | BasicType::LongDoubleComplex => TypeCode::Complex,
            BasicType::Invalid
            | BasicType::Half
            | BasicType::ObjCID
            | BasicType::ObjCClass
            | BasicType::ObjCSel
            | BasicType::NullPtr
            | BasicType::Other => TypeCode::Undef,
        }
    }
}

impl fmt::Display for TypeCode
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.as_i32())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_character_types_are_integers()
    {
        for basic in [BasicType::Char, BasicType::WChar, BasicType::Char16, BasicType::UnsignedChar] {
            assert_eq!(TypeCode::of_basic(basic), TypeCode::Int);
        }
    }

    #[test]
    fn test_numeric_codes_are_stable()
    {
        assert_eq!(TypeCode::Ptr.as_i32(), 1);
        assert_eq!(TypeCode::Int.as_i32(), 8);
        assert_eq!(TypeCode::MemberPtr.as_i32(), 17);
        assert_eq!(TypeCode::XMethod.as_i32(), 27);
        assert_eq!(TypeCode::Bitstring.as_i32(), -1);
    }

    #[test]
    fn test_unmapped_basic_types_fail_closed()
    {
        assert_eq!(TypeCode::of_basic(BasicType::Half), TypeCode::Undef);
        assert_eq!(TypeCode::of_basic(BasicType::NullPtr), TypeCode::Undef);
    }
}
