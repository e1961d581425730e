//! # Host Debugger Interface
//!
//! The native debugger engine that the adapters are built on.
//!
//! Everything the emulated `Type`/`Value` protocol needs from the engine
//! underneath is expressed as an object-safe trait here. A real deployment
//! implements these traits over the engine's scripting handles; the test
//! suite implements them in memory (the `testing` module, behind the
//! `testing` feature).
//!
//! ## Handles
//!
//! - [`NativeType`]: a type descriptor (classification, size, layout)
//! - [`NativeValue`]: a value snapshot (scalar reads, children, casts)
//! - [`NativeTarget`]: a debug session (type search, evaluation, memory)
//! - [`FormatterHost`]: the engine's statically typed formatter registry
//!
//! Handles are shared as `Arc<dyn Trait>`. The adapters never hold anything
//! except these handles, so they never outlive the session that made them.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

/// Shared handle to a native type descriptor.
pub type NativeTypeRef = Arc<dyn NativeType>;

/// Shared handle to a native value.
pub type NativeValueRef = Arc<dyn NativeValue>;

/// Shared handle to a native debug target.
pub type TargetRef = Arc<dyn NativeTarget>;

/// Error reported by the native engine
///
/// The engine's own error objects only carry a message; the adapters decide
/// which script-visible error class a failure belongs to.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct HostError(pub String);

impl HostError
{
    /// Build a host error from any message.
    pub fn new(message: impl Into<String>) -> Self
    {
        HostError(message.into())
    }
}

/// Identifier of a debug target (one per simultaneous session).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "target#{}", self.0)
    }
}

/// Byte order of the debugged process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder
{
    /// Least significant byte first
    #[default]
    Little,
    /// Most significant byte first
    Big,
}

/// The engine's coarse type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass
{
    Invalid,
    Array,
    BlockPointer,
    Builtin,
    Class,
    ComplexFloat,
    ComplexInteger,
    Enumeration,
    Function,
    MemberPointer,
    ObjCObject,
    ObjCInterface,
    ObjCObjectPointer,
    Pointer,
    Reference,
    Struct,
    Typedef,
    Union,
    Vector,
    Other,
}

impl TypeClass
{
    /// `true` for struct, class and union types.
    #[must_use]
    pub fn is_aggregate(self) -> bool
    {
        matches!(self, TypeClass::Struct | TypeClass::Class | TypeClass::Union)
    }
}

/// Refinement of [`TypeClass::Builtin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType
{
    Invalid,
    Void,
    Char,
    SignedChar,
    UnsignedChar,
    WChar,
    SignedWChar,
    UnsignedWChar,
    Char16,
    Char32,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Int128,
    UnsignedInt128,
    Bool,
    Half,
    Float,
    Double,
    LongDouble,
    FloatComplex,
    DoubleComplex,
    LongDoubleComplex,
    ObjCID,
    ObjCClass,
    ObjCSel,
    NullPtr,
    Other,
}

/// Spellings accepted by [`BasicType::from_name`], canonical spelling first.
const BASIC_TYPE_NAMES: &[(BasicType, &[&str])] = &[
    (BasicType::Void, &["void"]),
    (BasicType::Char, &["char"]),
    (BasicType::SignedChar, &["signed char"]),
    (BasicType::UnsignedChar, &["unsigned char"]),
    (BasicType::WChar, &["wchar_t"]),
    (BasicType::Char16, &["char16_t"]),
    (BasicType::Char32, &["char32_t"]),
    (BasicType::Short, &["short", "short int", "signed short", "signed short int"]),
    (BasicType::UnsignedShort, &["unsigned short", "unsigned short int", "short unsigned int"]),
    (BasicType::Int, &["int", "signed", "signed int"]),
    (BasicType::UnsignedInt, &["unsigned int", "unsigned"]),
    (BasicType::Long, &["long", "long int", "signed long", "signed long int"]),
    (BasicType::UnsignedLong, &["unsigned long", "unsigned long int", "long unsigned int"]),
    (BasicType::LongLong, &["long long", "long long int", "signed long long"]),
    (
        BasicType::UnsignedLongLong,
        &["unsigned long long", "unsigned long long int", "long long unsigned int"],
    ),
    (BasicType::Int128, &["__int128"]),
    (BasicType::UnsignedInt128, &["unsigned __int128"]),
    (BasicType::Bool, &["bool", "_Bool"]),
    (BasicType::Half, &["_Float16", "__fp16"]),
    (BasicType::Float, &["float"]),
    (BasicType::Double, &["double"]),
    (BasicType::LongDouble, &["long double"]),
    (BasicType::FloatComplex, &["_Complex float", "float _Complex"]),
    (BasicType::DoubleComplex, &["_Complex double", "double _Complex"]),
    (BasicType::LongDoubleComplex, &["_Complex long double", "long double _Complex"]),
    (BasicType::NullPtr, &["std::nullptr_t", "nullptr_t"]),
];

impl BasicType
{
    /// Resolve a C/C++ builtin type spelling.
    ///
    /// ```rust
    /// use gala_core::host::BasicType;
    ///
    /// assert_eq!(BasicType::from_name("unsigned"), Some(BasicType::UnsignedInt));
    /// assert_eq!(BasicType::from_name("MyStruct"), None);
    /// ```
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self>
    {
        let name = name.trim();
        BASIC_TYPE_NAMES
            .iter()
            .find(|(_, spellings)| spellings.contains(&name))
            .map(|(basic, _)| *basic)
    }

    /// Canonical spelling, if this basic type has one.
    #[must_use]
    pub fn name(self) -> Option<&'static str>
    {
        BASIC_TYPE_NAMES
            .iter()
            .find(|(basic, _)| *basic == self)
            .map(|(_, spellings)| spellings[0])
    }

    /// Integer types whose values read as unsigned.
    #[must_use]
    pub fn is_unsigned_integer(self) -> bool
    {
        matches!(
            self,
            BasicType::UnsignedChar
                | BasicType::UnsignedWChar
                | BasicType::UnsignedShort
                | BasicType::UnsignedInt
                | BasicType::UnsignedLong
                | BasicType::UnsignedLongLong
                | BasicType::UnsignedInt128
                | BasicType::Bool
        )
    }

    /// Integer types whose values read as signed.
    #[must_use]
    pub fn is_signed_integer(self) -> bool
    {
        matches!(
            self,
            BasicType::Char
                | BasicType::SignedChar
                | BasicType::WChar
                | BasicType::SignedWChar
                | BasicType::Char16
                | BasicType::Char32
                | BasicType::Short
                | BasicType::Int
                | BasicType::Long
                | BasicType::LongLong
                | BasicType::Int128
        )
    }

    /// Real floating point types.
    #[must_use]
    pub fn is_float(self) -> bool
    {
        matches!(self, BasicType::Half | BasicType::Float | BasicType::Double | BasicType::LongDouble)
    }
}

/// A direct base class as reported by the engine.
#[derive(Debug, Clone)]
pub struct NativeBaseClass
{
    pub name: String,
    pub ty: NativeTypeRef,
    pub byte_offset: u64,
}

/// A direct data member as reported by the engine.
///
/// `name` is empty for anonymous members (anonymous unions and structs).
/// `bit_size` is zero for members that are not bitfields.
#[derive(Debug, Clone)]
pub struct NativeField
{
    pub name: String,
    pub ty: NativeTypeRef,
    pub bit_offset: u64,
    pub bit_size: u32,
}

/// One enumerator of an enumeration type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeEnumMember
{
    pub name: String,
    pub value: i64,
}

/// A static data member as looked up on a type.
#[derive(Debug, Clone)]
pub enum NativeStaticField
{
    /// No static member with that name
    Missing,
    /// The member exists but has no compile-time value
    NotConstant,
    Constant(NativeValueRef),
}

/// Native type descriptor
///
/// Accessors that do not apply to the receiver's type class return `None`
/// (or an empty list) rather than failing.
pub trait NativeType: fmt::Debug + Send + Sync
{
    /// Display name, e.g. `"unsigned int"`, `"Ptr<int>"`, `"int *"`.
    fn name(&self) -> String;

    fn type_class(&self) -> TypeClass;

    /// Builtin refinement; [`BasicType::Invalid`] for non-builtin types.
    fn basic_type(&self) -> BasicType;

    fn byte_size(&self) -> u64;

    /// Signedness flag (integers, enums and characters).
    fn is_signed(&self) -> bool;

    /// The aliased type when this is a typedef.
    fn typedefed_type(&self) -> Option<NativeTypeRef>;

    /// Pointee for pointers and member pointers.
    fn pointee_type(&self) -> Option<NativeTypeRef>;

    /// Referent for references.
    fn dereferenced_type(&self) -> Option<NativeTypeRef>;

    fn array_element_type(&self) -> Option<NativeTypeRef>;

    fn function_return_type(&self) -> Option<NativeTypeRef>;

    /// Underlying integer type of an enumeration.
    fn enumeration_integer_type(&self) -> Option<NativeTypeRef>;

    /// The type with `const`/`volatile` removed, `None` when already unqualified.
    fn unqualified_type(&self) -> Option<NativeTypeRef>
    {
        None
    }

    fn pointer_type(&self) -> NativeTypeRef;

    fn reference_type(&self) -> NativeTypeRef;

    /// Array of `len` elements of this type.
    fn array_type(&self, len: u64) -> NativeTypeRef;

    fn direct_base_classes(&self) -> Vec<NativeBaseClass>;

    fn fields(&self) -> Vec<NativeField>;

    fn enum_members(&self) -> Vec<NativeEnumMember>;

    /// `true` for `enum class` / `enum struct`.
    fn is_scoped_enum(&self) -> bool;

    fn template_argument(&self, index: usize) -> Option<NativeTypeRef>;

    /// Type declared directly inside this one.
    fn nested_type(&self, _name: &str) -> Option<NativeTypeRef>
    {
        None
    }

    /// Compile-time value of the static member `name`, materialised in
    /// `target`.
    fn static_field_value(&self, _name: &str, _target: &TargetRef) -> NativeStaticField
    {
        NativeStaticField::Missing
    }

    /// Engine-level type identity.
    fn same_type(&self, other: &dyn NativeType) -> bool
    {
        self.type_class() == other.type_class() && self.name() == other.name()
    }
}

/// Native value snapshot
pub trait NativeValue: fmt::Debug + Send + Sync
{
    fn name(&self) -> Option<String>;

    fn native_type(&self) -> NativeTypeRef;

    /// The session this value was produced by.
    fn target(&self) -> TargetRef;

    /// Raw bytes of the value (`byte_size` of its type).
    fn data(&self) -> Result<Vec<u8>, HostError>;

    /// Zero-extended scalar contents.
    fn value_as_unsigned(&self) -> Result<u64, HostError>;

    /// Sign-extended scalar contents.
    fn value_as_signed(&self) -> Result<i64, HostError>;

    /// Address of the value in the inferior, `None` when it has none.
    fn load_address(&self) -> Option<u64>;

    /// Pointer to this value, `None` when it has no address.
    fn address_of(&self) -> Option<NativeValueRef>;

    /// Pointee of a pointer or referent of a reference.
    fn dereference(&self) -> Result<NativeValueRef, HostError>;

    /// Raw reinterpretation as `ty`.
    fn cast(&self, ty: &NativeTypeRef) -> Result<NativeValueRef, HostError>;

    /// Direct (or inherited) member lookup. Anonymous unions are not searched.
    fn child_member_with_name(&self, name: &str) -> Option<NativeValueRef>;

    fn child_at_index(&self, index: usize) -> Option<NativeValueRef>;

    /// A value of type `ty` located `offset` bytes into this one.
    fn create_child_at_offset(&self, name: &str, offset: u64, ty: &NativeTypeRef) -> Result<NativeValueRef, HostError>;

    /// The engine's own rendering of the value.
    fn display_string(&self) -> String;
}

/// Native debug target (one debugging session)
pub trait NativeTarget: fmt::Debug + Send + Sync
{
    fn id(&self) -> TargetId;

    /// All types whose unscoped name equals `unscoped_name`.
    fn find_types(&self, unscoped_name: &str) -> Vec<NativeTypeRef>;

    fn basic_type(&self, basic: BasicType) -> Option<NativeTypeRef>;

    fn evaluate_expression(&self, expression: &str) -> Result<NativeValueRef, HostError>;

    fn read_memory(&self, address: u64, len: usize) -> Result<Vec<u8>, HostError>;

    fn create_value_from_address(&self, name: &str, address: u64, ty: &NativeTypeRef) -> NativeValueRef;

    fn create_value_from_data(&self, name: &str, data: Vec<u8>, ty: &NativeTypeRef) -> NativeValueRef;

    fn find_global_variable(&self, name: &str) -> Option<NativeValueRef>;

    fn byte_order(&self) -> ByteOrder
    {
        ByteOrder::Little
    }
}

/// Type matcher accepted by the formatter registry.
#[derive(Clone)]
pub enum TypeNameSpecifier
{
    /// Match type names against a regular expression
    Regex(Regex),
    /// Ask a callback for every candidate type
    Callback(TypeCallback),
}

impl fmt::Debug for TypeNameSpecifier
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            TypeNameSpecifier::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            TypeNameSpecifier::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl TypeNameSpecifier
{
    /// Whether `ty` is selected by this specifier.
    #[must_use]
    pub fn matches(&self, ty: &NativeTypeRef) -> bool
    {
        match self {
            TypeNameSpecifier::Regex(regex) => regex.is_match(&ty.name()),
            TypeNameSpecifier::Callback(callback) => callback(ty),
        }
    }
}

/// Type predicate installed with [`TypeNameSpecifier::Callback`].
pub type TypeCallback = Arc<dyn Fn(&NativeTypeRef) -> bool + Send + Sync>;

/// Summary callback. `None` means "no summary available".
pub type SummaryProvider = Arc<dyn Fn(&NativeValueRef) -> Option<String> + Send + Sync>;

/// Builds a synthetic-children provider for one value.
pub type SyntheticProviderFactory = Arc<dyn Fn(NativeValueRef) -> Box<dyn SyntheticChildren> + Send + Sync>;

/// Options attached to a registered formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TypeOptions
{
    /// Also apply through typedefs of the matched type
    pub cascade: bool,
    /// Do not display the value's children
    pub hide_children: bool,
}

/// The engine's incremental children protocol
///
/// The engine asks for a bounded count first and then for individual
/// children, so providers can produce children lazily.
pub trait SyntheticChildren
{
    /// Number of children, looking at no more than `max` of them.
    fn num_children(&mut self, max: u32) -> u32;

    fn child_at_index(&mut self, index: u32) -> Option<NativeValueRef>;

    /// Index of the child displayed with `name`.
    fn child_index(&mut self, name: &str) -> Option<u32>;

    /// The underlying value changed; drop anything cached.
    fn update(&mut self);

    fn has_children(&mut self) -> bool;
}

/// The engine's formatter registry
pub trait FormatterHost: Send + Sync
{
    fn has_category(&self, name: &str) -> bool;

    fn create_category(&self, name: &str) -> Result<(), HostError>;

    /// Returns `false` if no such category existed.
    fn delete_category(&self, name: &str) -> bool;

    fn set_category_enabled(&self, name: &str, enabled: bool);

    fn add_type_summary(
        &self,
        category: &str,
        specifier: TypeNameSpecifier,
        summary: SummaryProvider,
        options: TypeOptions,
    ) -> Result<(), HostError>;

    fn add_type_synthetic(
        &self,
        category: &str,
        specifier: TypeNameSpecifier,
        synthetic: SyntheticProviderFactory,
        options: TypeOptions,
    ) -> Result<(), HostError>;
}
