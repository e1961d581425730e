//! Fields of aggregate and enumeration types.

use super::Type;

/// One entry of [`Type::fields`]
///
/// For aggregates, every [`Field::BaseClass`] precedes every
/// [`Field::Member`], each group in declaration order.
#[derive(Debug, Clone)]
pub enum Field
{
    /// An enumerator of an enumeration type
    EnumMember
    {
        /// Scope-qualified enumerator name (`Class::Scoped::VALUE`, `Class::VALUE` or `VALUE`)
        name: String,
        value: i64,
        /// The enumeration type itself
        ty: Type,
    },

    /// A direct, non-inherited data member
    Member
    {
        /// Empty for anonymous unions and structs
        name: String,
        ty: Type,
        bit_offset: u64,
        /// Zero unless the member is a bitfield
        bit_size: u32,
        parent: Type,
    },

    /// A direct base class
    BaseClass
    {
        name: String,
        ty: Type,
        byte_offset: u64,
        parent: Type,
    },
}

impl Field
{
    /// The field name, `None` for anonymous members.
    #[must_use]
    pub fn name(&self) -> Option<&str>
    {
        let name = match self {
            Field::EnumMember { name, .. } | Field::Member { name, .. } | Field::BaseClass { name, .. } => name,
        };
        (!name.is_empty()).then_some(name.as_str())
    }

    #[must_use]
    pub fn ty(&self) -> &Type
    {
        match self {
            Field::EnumMember { ty, .. } | Field::Member { ty, .. } | Field::BaseClass { ty, .. } => ty,
        }
    }

    #[must_use]
    pub fn is_base_class(&self) -> bool
    {
        matches!(self, Field::BaseClass { .. })
    }

    /// Member without a name whose type is a union (or struct) whose members
    /// are reachable directly through the parent.
    #[must_use]
    pub fn is_anonymous(&self) -> bool
    {
        matches!(self, Field::Member { name, .. } if name.is_empty())
    }

    /// Position in bits from the start of the parent; `None` for enumerators.
    #[must_use]
    pub fn bitpos(&self) -> Option<u64>
    {
        match self {
            Field::EnumMember { .. } => None,
            Field::Member { bit_offset, .. } => Some(*bit_offset),
            Field::BaseClass { byte_offset, .. } => Some(byte_offset * 8),
        }
    }

    #[must_use]
    pub fn bitsize(&self) -> u32
    {
        match self {
            Field::Member { bit_size, .. } => *bit_size,
            Field::EnumMember { .. } | Field::BaseClass { .. } => 0,
        }
    }

    #[must_use]
    pub fn enumval(&self) -> Option<i64>
    {
        match self {
            Field::EnumMember { value, .. } => Some(*value),
            Field::Member { .. } | Field::BaseClass { .. } => None,
        }
    }

    /// The type this field belongs to; `None` for enumerators.
    #[must_use]
    pub fn parent_type(&self) -> Option<&Type>
    {
        match self {
            Field::Member { parent, .. } | Field::BaseClass { parent, .. } => Some(parent),
            Field::EnumMember { .. } => None,
        }
    }

    /// Compiler-generated fields are never reported.
    #[must_use]
    pub fn artificial(&self) -> bool
    {
        false
    }
}
