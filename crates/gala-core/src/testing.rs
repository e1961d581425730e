//! # In-Memory Host
//!
//! A reference implementation of the [`crate::host`] traits for tests and
//! documentation examples. It models:
//!
//! - builtin types with x86-64 sizes, plus structs, unions, enums, typedefs
//!   and qualified types declared through [`MockTarget`]
//! - sparse little-endian memory and global variables
//! - a tiny expression evaluator: integer/float/bool literals, globals,
//!   `&global`, `*global` and `(type)operand` casts
//! - a raw cast that reinterprets memory in place, so widening an integer
//!   reads whatever bytes follow it, as some engines do
//! - a formatter registry ([`MockFormatterHost`]) that can render summaries
//!   and synthetic children
//!
//! Enabled by the `testing` feature.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::host::{
    BasicType, ByteOrder, FormatterHost, HostError, NativeBaseClass, NativeEnumMember, NativeField, NativeStaticField,
    NativeTarget, NativeType, NativeTypeRef, NativeValue, NativeValueRef, SummaryProvider, SyntheticChildren,
    SyntheticProviderFactory, TargetId, TargetRef, TypeClass, TypeNameSpecifier, TypeOptions,
};
use crate::session::lookup_type_in;
use crate::types::split_scope;
use crate::value::{Number, Value, decode_float, decode_uint, encode_float, encode_uint};

static NEXT_TARGET_ID: AtomicU64 = AtomicU64::new(1);

const POINTER_SIZE: u64 = 8;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T>
{
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[allow(clippy::cast_possible_truncation)]
fn to_usize(value: u64) -> usize
{
    value as usize
}

/// Follow typedef layers.
fn resolved(ty: &NativeTypeRef) -> NativeTypeRef
{
    let mut current = ty.clone();
    for _ in 0..64 {
        match current.typedefed_type() {
            Some(next) => current = next,
            None => break,
        }
    }
    current
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// In-memory type descriptor
#[derive(Clone)]
pub struct MockType
{
    this: Weak<MockType>,
    name: String,
    class: TypeClass,
    basic: BasicType,
    size: u64,
    signed: bool,
    /// Typedef target, pointee, referent, element, return or enum integer type
    inner: Option<NativeTypeRef>,
    unqualified: Option<NativeTypeRef>,
    bases: Vec<NativeBaseClass>,
    fields: Vec<NativeField>,
    enumerators: Vec<NativeEnumMember>,
    scoped: bool,
    template_args: Vec<NativeTypeRef>,
    nested: Vec<NativeTypeRef>,
    statics: Vec<MockStatic>,
}

/// Static data member; `value` holds the bytes of a compile-time constant.
#[derive(Debug, Clone)]
struct MockStatic
{
    name: String,
    ty: NativeTypeRef,
    value: Option<Vec<u8>>,
}

impl MockType
{
    fn blank(name: impl Into<String>, class: TypeClass, size: u64) -> Self
    {
        Self {
            this: Weak::new(),
            name: name.into(),
            class,
            basic: BasicType::Invalid,
            size,
            signed: false,
            inner: None,
            unqualified: None,
            bases: Vec::new(),
            fields: Vec::new(),
            enumerators: Vec::new(),
            scoped: false,
            template_args: Vec::new(),
            nested: Vec::new(),
            statics: Vec::new(),
        }
    }

    fn build(spec: MockType) -> NativeTypeRef
    {
        Arc::new_cyclic(|this| MockType { this: this.clone(), ..spec })
    }

    fn handle(&self) -> NativeTypeRef
    {
        match self.this.upgrade() {
            Some(this) => this,
            None => Arc::new(self.clone()),
        }
    }

    fn derived(&self, name: String, class: TypeClass, size: u64) -> NativeTypeRef
    {
        MockType::build(MockType {
            inner: Some(self.handle()),
            ..MockType::blank(name, class, size)
        })
    }
}

impl fmt::Debug for MockType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("MockType")
            .field("name", &self.name)
            .field("class", &self.class)
            .field("size", &self.size)
            .finish()
    }
}

impl NativeType for MockType
{
    fn name(&self) -> String
    {
        self.name.clone()
    }

    fn type_class(&self) -> TypeClass
    {
        self.class
    }

    fn basic_type(&self) -> BasicType
    {
        self.basic
    }

    fn byte_size(&self) -> u64
    {
        self.size
    }

    fn is_signed(&self) -> bool
    {
        self.signed
    }

    fn typedefed_type(&self) -> Option<NativeTypeRef>
    {
        (self.class == TypeClass::Typedef).then(|| self.inner.clone()).flatten()
    }

    fn pointee_type(&self) -> Option<NativeTypeRef>
    {
        matches!(self.class, TypeClass::Pointer | TypeClass::MemberPointer)
            .then(|| self.inner.clone())
            .flatten()
    }

    fn dereferenced_type(&self) -> Option<NativeTypeRef>
    {
        (self.class == TypeClass::Reference).then(|| self.inner.clone()).flatten()
    }

    fn array_element_type(&self) -> Option<NativeTypeRef>
    {
        (self.class == TypeClass::Array).then(|| self.inner.clone()).flatten()
    }

    fn function_return_type(&self) -> Option<NativeTypeRef>
    {
        (self.class == TypeClass::Function).then(|| self.inner.clone()).flatten()
    }

    fn enumeration_integer_type(&self) -> Option<NativeTypeRef>
    {
        (self.class == TypeClass::Enumeration).then(|| self.inner.clone()).flatten()
    }

    fn unqualified_type(&self) -> Option<NativeTypeRef>
    {
        self.unqualified.clone()
    }

    fn pointer_type(&self) -> NativeTypeRef
    {
        let name = if self.name.ends_with('*') {
            format!("{}*", self.name)
        } else {
            format!("{} *", self.name)
        };
        self.derived(name, TypeClass::Pointer, POINTER_SIZE)
    }

    fn reference_type(&self) -> NativeTypeRef
    {
        self.derived(format!("{} &", self.name), TypeClass::Reference, POINTER_SIZE)
    }

    fn array_type(&self, len: u64) -> NativeTypeRef
    {
        self.derived(format!("{}[{len}]", self.name), TypeClass::Array, self.size * len)
    }

    fn direct_base_classes(&self) -> Vec<NativeBaseClass>
    {
        self.bases.clone()
    }

    fn fields(&self) -> Vec<NativeField>
    {
        self.fields.clone()
    }

    fn enum_members(&self) -> Vec<NativeEnumMember>
    {
        self.enumerators.clone()
    }

    fn is_scoped_enum(&self) -> bool
    {
        self.scoped
    }

    fn template_argument(&self, index: usize) -> Option<NativeTypeRef>
    {
        self.template_args.get(index).cloned()
    }

    fn nested_type(&self, name: &str) -> Option<NativeTypeRef>
    {
        self.nested.iter().find(|nested| split_scope(&nested.name()).1 == name).cloned()
    }

    fn static_field_value(&self, name: &str, target: &TargetRef) -> NativeStaticField
    {
        match self.statics.iter().find(|member| member.name == name) {
            Some(MockStatic { ty, value: Some(bytes), .. }) => {
                NativeStaticField::Constant(target.create_value_from_data(name, bytes.clone(), ty))
            }
            Some(_) => NativeStaticField::NotConstant,
            None => NativeStaticField::Missing,
        }
    }
}

/// Declares a struct, class or union on a [`MockTarget`].
///
/// ```rust
/// use gala_core::host::BasicType;
/// use gala_core::testing::MockTarget;
///
/// let target = MockTarget::new();
/// let int = target.builtin(BasicType::Int);
/// let point = target.structure("Point", 8).field("x", &int, 0).field("y", &int, 4).register();
/// assert_eq!(point.fields().len(), 2);
/// ```
#[must_use = "the type is only declared once `register` is called"]
pub struct TypeBuilder
{
    target: MockTarget,
    spec: MockType,
}

impl TypeBuilder
{
    /// Direct base class at `byte_offset`.
    pub fn base(mut self, base: &NativeTypeRef, byte_offset: u64) -> Self
    {
        self.spec.bases.push(NativeBaseClass {
            name: base.name(),
            ty: base.clone(),
            byte_offset,
        });
        self
    }

    /// Data member at `byte_offset`. An empty name declares an anonymous member.
    pub fn field(mut self, name: &str, ty: &NativeTypeRef, byte_offset: u64) -> Self
    {
        self.spec.fields.push(NativeField {
            name: name.to_string(),
            ty: ty.clone(),
            bit_offset: byte_offset * 8,
            bit_size: 0,
        });
        self
    }

    pub fn bitfield(mut self, name: &str, ty: &NativeTypeRef, bit_offset: u64, bit_size: u32) -> Self
    {
        self.spec.fields.push(NativeField {
            name: name.to_string(),
            ty: ty.clone(),
            bit_offset,
            bit_size,
        });
        self
    }

    pub fn template_arg(mut self, ty: &NativeTypeRef) -> Self
    {
        self.spec.template_args.push(ty.clone());
        self
    }

    pub fn nested(mut self, ty: &NativeTypeRef) -> Self
    {
        self.spec.nested.push(ty.clone());
        self
    }

    /// `static constexpr` member holding `bytes`.
    pub fn static_constexpr(mut self, name: &str, ty: &NativeTypeRef, bytes: &[u8]) -> Self
    {
        self.spec.statics.push(MockStatic {
            name: name.to_string(),
            ty: ty.clone(),
            value: Some(bytes.to_vec()),
        });
        self
    }

    /// Static member without a compile-time value.
    pub fn static_member(mut self, name: &str, ty: &NativeTypeRef) -> Self
    {
        self.spec.statics.push(MockStatic {
            name: name.to_string(),
            ty: ty.clone(),
            value: None,
        });
        self
    }

    /// Make the type findable by name and return it.
    pub fn register(self) -> NativeTypeRef
    {
        self.target.register(MockType::build(self.spec))
    }
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Location
{
    Memory(u64),
    Data(Vec<u8>),
}

/// In-memory value snapshot
#[derive(Clone)]
pub struct MockValue
{
    target: MockTarget,
    name: Option<String>,
    ty: NativeTypeRef,
    location: Location,
}

impl fmt::Debug for MockValue
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("MockValue")
            .field("name", &self.name)
            .field("type", &self.ty.name())
            .field("location", &self.location)
            .finish()
    }
}

impl MockValue
{
    fn new(target: &MockTarget, name: &str, ty: &NativeTypeRef, location: Location) -> Arc<MockValue>
    {
        Arc::new(MockValue {
            target: target.clone(),
            name: (!name.is_empty()).then(|| name.to_string()),
            ty: ty.clone(),
            location,
        })
    }

    fn bytes(&self) -> Result<Vec<u8>, HostError>
    {
        let size = to_usize(self.ty.byte_size());
        match &self.location {
            Location::Memory(address) => {
                let bytes = self.target.read(*address, size);
                if bytes.len() < size {
                    return Err(HostError::new(format!("memory read failed for {address:#x}")));
                }
                Ok(bytes)
            }
            Location::Data(data) => Ok(data.clone()),
        }
    }

    fn child_at(&self, name: &str, offset: u64, ty: &NativeTypeRef) -> Result<Arc<MockValue>, HostError>
    {
        let location = match &self.location {
            Location::Memory(address) => Location::Memory(address + offset),
            Location::Data(data) => {
                let start = to_usize(offset);
                let end = start + to_usize(ty.byte_size());
                let slice = data
                    .get(start..end)
                    .ok_or_else(|| HostError::new(format!("offset {offset} is outside the value")))?;
                Location::Data(slice.to_vec())
            }
        };
        Ok(MockValue::new(&self.target, name, ty, location))
    }

    fn field_child(&self, field: &NativeField) -> Result<Arc<MockValue>, HostError>
    {
        if field.bit_size == 0 {
            return self.child_at(&field.name, field.bit_offset / 8, &field.ty);
        }
        let bytes = self.bytes()?;
        let mut raw = 0u64;
        for bit in 0..u64::from(field.bit_size) {
            let position = field.bit_offset + bit;
            let byte = bytes.get(to_usize(position / 8)).copied().unwrap_or_default();
            raw |= u64::from((byte >> (position % 8)) & 1) << bit;
        }
        if field.ty.is_signed() && field.bit_size < 64 && (raw >> (field.bit_size - 1)) & 1 == 1 {
            raw |= u64::MAX << field.bit_size;
        }
        let data = encode_uint(raw, to_usize(field.ty.byte_size()), ByteOrder::Little);
        Ok(MockValue::new(&self.target, &field.name, &field.ty, Location::Data(data)))
    }

    fn member(&self, name: &str) -> Option<Arc<MockValue>>
    {
        let ty = resolved(&self.ty);
        if !ty.type_class().is_aggregate() {
            return None;
        }
        if let Some(field) = ty.fields().iter().find(|field| !field.name.is_empty() && field.name == name) {
            return self.field_child(field).ok();
        }
        ty.direct_base_classes().iter().find_map(|base| {
            self.child_at(&base.name, base.byte_offset, &base.ty)
                .ok()
                .and_then(|child| child.member(name))
        })
    }

    fn render(&self) -> Result<String, HostError>
    {
        let ty = resolved(&self.ty);
        match ty.type_class() {
            TypeClass::Builtin => {
                let basic = ty.basic_type();
                if basic == BasicType::Bool {
                    Ok(if self.value_as_unsigned()? == 0 { "false" } else { "true" }.to_string())
                } else if basic.is_float() {
                    let bytes = self.bytes()?;
                    decode_float(&bytes, ByteOrder::Little)
                        .map(|value| value.to_string())
                        .ok_or_else(|| HostError::new("unsupported float width"))
                } else if ty.is_signed() {
                    Ok(self.value_as_signed()?.to_string())
                } else {
                    Ok(self.value_as_unsigned()?.to_string())
                }
            }
            TypeClass::Pointer | TypeClass::MemberPointer => Ok(format!("{:#018x}", self.value_as_unsigned()?)),
            TypeClass::Enumeration => {
                let value = self.value_as_signed()?;
                Ok(ty
                    .enum_members()
                    .into_iter()
                    .find(|member| member.value == value)
                    .map_or_else(|| value.to_string(), |member| member.name))
            }
            TypeClass::Reference => Ok(self.dereference()?.display_string()),
            TypeClass::Array => Ok(format!("[{} bytes]", ty.byte_size())),
            class if class.is_aggregate() => Ok("{...}".to_string()),
            _ => Ok(String::new()),
        }
    }
}

impl NativeValue for MockValue
{
    fn name(&self) -> Option<String>
    {
        self.name.clone()
    }

    fn native_type(&self) -> NativeTypeRef
    {
        self.ty.clone()
    }

    fn target(&self) -> TargetRef
    {
        self.target.as_target()
    }

    fn data(&self) -> Result<Vec<u8>, HostError>
    {
        self.bytes()
    }

    fn value_as_unsigned(&self) -> Result<u64, HostError>
    {
        Ok(decode_uint(&self.bytes()?, ByteOrder::Little))
    }

    #[allow(clippy::cast_possible_wrap)]
    fn value_as_signed(&self) -> Result<i64, HostError>
    {
        let bytes = self.bytes()?;
        let raw = decode_uint(&bytes, ByteOrder::Little);
        let width = bytes.len().min(8);
        if width == 0 || width == 8 {
            return Ok(raw as i64);
        }
        let shift = 64 - width * 8;
        Ok(((raw << shift) as i64) >> shift)
    }

    fn load_address(&self) -> Option<u64>
    {
        match self.location {
            Location::Memory(address) => Some(address),
            Location::Data(_) => None,
        }
    }

    fn address_of(&self) -> Option<NativeValueRef>
    {
        let address = self.load_address()?;
        let data = encode_uint(address, to_usize(POINTER_SIZE), ByteOrder::Little);
        Some(MockValue::new(&self.target, "", &self.ty.pointer_type(), Location::Data(data)))
    }

    fn dereference(&self) -> Result<NativeValueRef, HostError>
    {
        let ty = resolved(&self.ty);
        let pointee = match ty.type_class() {
            TypeClass::Pointer => ty.pointee_type(),
            TypeClass::Reference => ty.dereferenced_type(),
            _ => None,
        }
        .ok_or_else(|| HostError::new(format!("cannot dereference a value of type {}", self.ty.name())))?;
        let address = self.value_as_unsigned()?;
        if address == 0 {
            return Err(HostError::new("dereference of a null pointer"));
        }
        let name = self.name.as_ref().map(|name| format!("*{name}")).unwrap_or_default();
        Ok(MockValue::new(&self.target, &name, &pointee, Location::Memory(address)))
    }

    fn cast(&self, ty: &NativeTypeRef) -> Result<NativeValueRef, HostError>
    {
        let location = match &self.location {
            Location::Memory(address) => Location::Memory(*address),
            Location::Data(data) => {
                let mut data = data.clone();
                data.resize(to_usize(ty.byte_size()), 0);
                Location::Data(data)
            }
        };
        Ok(MockValue::new(&self.target, self.name.as_deref().unwrap_or_default(), ty, location))
    }

    fn child_member_with_name(&self, name: &str) -> Option<NativeValueRef>
    {
        self.member(name).map(|child| child as NativeValueRef)
    }

    fn child_at_index(&self, index: usize) -> Option<NativeValueRef>
    {
        let ty = resolved(&self.ty);
        match ty.type_class() {
            TypeClass::Array => {
                let element = ty.array_element_type()?;
                let element_size = element.byte_size();
                if element_size == 0 || index as u64 >= ty.byte_size() / element_size {
                    return None;
                }
                let child = self.child_at(&format!("[{index}]"), index as u64 * element_size, &element).ok()?;
                Some(child)
            }
            class if class.is_aggregate() => {
                let bases = ty.direct_base_classes();
                if let Some(base) = bases.get(index) {
                    return self.child_at(&base.name, base.byte_offset, &base.ty).ok().map(|child| child as NativeValueRef);
                }
                let field = ty.fields().into_iter().nth(index - bases.len())?;
                self.field_child(&field).ok().map(|child| child as NativeValueRef)
            }
            _ => None,
        }
    }

    fn create_child_at_offset(&self, name: &str, offset: u64, ty: &NativeTypeRef) -> Result<NativeValueRef, HostError>
    {
        Ok(self.child_at(name, offset, ty)?)
    }

    fn display_string(&self) -> String
    {
        self.render().unwrap_or_else(|err| format!("<error: {err}>"))
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

struct TargetState
{
    id: TargetId,
    builtins: HashMap<BasicType, NativeTypeRef>,
    types: Mutex<Vec<NativeTypeRef>>,
    memory: Mutex<BTreeMap<u64, u8>>,
    globals: Mutex<HashMap<String, (u64, NativeTypeRef)>>,
    evaluations: Mutex<Vec<String>>,
    memory_reads: AtomicUsize,
}

/// In-memory debug target
///
/// Cloning yields another handle to the same target.
#[derive(Clone)]
pub struct MockTarget
{
    state: Arc<TargetState>,
}

impl fmt::Debug for MockTarget
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("MockTarget").field("id", &self.state.id).finish()
    }
}

/// `(basic type, size, signed)` for every builtin the target provides.
const BUILTINS: &[(BasicType, u64, bool)] = &[
    (BasicType::Void, 0, false),
    (BasicType::Bool, 1, false),
    (BasicType::Char, 1, true),
    (BasicType::SignedChar, 1, true),
    (BasicType::UnsignedChar, 1, false),
    (BasicType::WChar, 4, true),
    (BasicType::Char16, 2, false),
    (BasicType::Char32, 4, false),
    (BasicType::Short, 2, true),
    (BasicType::UnsignedShort, 2, false),
    (BasicType::Int, 4, true),
    (BasicType::UnsignedInt, 4, false),
    (BasicType::Long, 8, true),
    (BasicType::UnsignedLong, 8, false),
    (BasicType::LongLong, 8, true),
    (BasicType::UnsignedLongLong, 8, false),
    (BasicType::Int128, 16, true),
    (BasicType::UnsignedInt128, 16, false),
    (BasicType::Half, 2, true),
    (BasicType::Float, 4, true),
    (BasicType::Double, 8, true),
    (BasicType::LongDouble, 16, true),
    (BasicType::NullPtr, 8, false),
];

impl Default for MockTarget
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl MockTarget
{
    /// A fresh target with the builtin types and empty memory.
    #[must_use]
    pub fn new() -> Self
    {
        let builtins = BUILTINS
            .iter()
            .filter_map(|(basic, size, signed)| {
                let name = basic.name()?;
                let ty = MockType::build(MockType {
                    basic: *basic,
                    signed: *signed,
                    ..MockType::blank(name, TypeClass::Builtin, *size)
                });
                Some((*basic, ty))
            })
            .collect();
        Self {
            state: Arc::new(TargetState {
                id: TargetId(NEXT_TARGET_ID.fetch_add(1, Ordering::Relaxed)),
                builtins,
                types: Mutex::new(Vec::new()),
                memory: Mutex::new(BTreeMap::new()),
                globals: Mutex::new(HashMap::new()),
                evaluations: Mutex::new(Vec::new()),
                memory_reads: AtomicUsize::new(0),
            }),
        }
    }

    /// This target as a shared host handle.
    #[must_use]
    pub fn as_target(&self) -> TargetRef
    {
        Arc::new(self.clone())
    }

    #[must_use]
    pub fn id(&self) -> TargetId
    {
        self.state.id
    }

    /// A builtin type; unknown basic types yield an invalid type.
    #[must_use]
    pub fn builtin(&self, basic: BasicType) -> NativeTypeRef
    {
        self.state
            .builtins
            .get(&basic)
            .cloned()
            .unwrap_or_else(|| MockType::build(MockType::blank("<invalid>", TypeClass::Invalid, 0)))
    }

    pub fn structure(&self, name: &str, size: u64) -> TypeBuilder
    {
        self.aggregate(name, TypeClass::Struct, size)
    }

    pub fn class(&self, name: &str, size: u64) -> TypeBuilder
    {
        self.aggregate(name, TypeClass::Class, size)
    }

    pub fn union(&self, name: &str, size: u64) -> TypeBuilder
    {
        self.aggregate(name, TypeClass::Union, size)
    }

    fn aggregate(&self, name: &str, class: TypeClass, size: u64) -> TypeBuilder
    {
        TypeBuilder {
            target: self.clone(),
            spec: MockType::blank(name, class, size),
        }
    }

    /// Declare an enumeration over `underlying`.
    pub fn enumeration(&self, name: &str, underlying: &NativeTypeRef, scoped: bool, members: &[(&str, i64)]) -> NativeTypeRef
    {
        let spec = MockType {
            signed: underlying.is_signed(),
            inner: Some(underlying.clone()),
            scoped,
            enumerators: members
                .iter()
                .map(|(name, value)| NativeEnumMember {
                    name: (*name).to_string(),
                    value: *value,
                })
                .collect(),
            ..MockType::blank(name, TypeClass::Enumeration, underlying.byte_size())
        };
        self.register(MockType::build(spec))
    }

    pub fn typedef(&self, name: &str, aliased: &NativeTypeRef) -> NativeTypeRef
    {
        let spec = MockType {
            signed: aliased.is_signed(),
            inner: Some(aliased.clone()),
            ..MockType::blank(name, TypeClass::Typedef, aliased.byte_size())
        };
        self.register(MockType::build(spec))
    }

    /// `qualifier base`, e.g. `const int`, whose unqualified type is `base`.
    #[must_use]
    pub fn qualified(&self, qualifier: &str, base: &NativeTypeRef) -> NativeTypeRef
    {
        let inner = base
            .typedefed_type()
            .or_else(|| base.pointee_type())
            .or_else(|| base.dereferenced_type())
            .or_else(|| base.array_element_type())
            .or_else(|| base.enumeration_integer_type());
        MockType::build(MockType {
            basic: base.basic_type(),
            signed: base.is_signed(),
            inner,
            unqualified: Some(base.clone()),
            fields: base.fields(),
            bases: base.direct_base_classes(),
            ..MockType::blank(format!("{qualifier} {}", base.name()), base.type_class(), base.byte_size())
        })
    }

    #[must_use]
    pub fn function(&self, name: &str, returns: &NativeTypeRef) -> NativeTypeRef
    {
        MockType::build(MockType {
            inner: Some(returns.clone()),
            ..MockType::blank(name, TypeClass::Function, 1)
        })
    }

    #[must_use]
    pub fn member_pointer(&self, name: &str, pointee: &NativeTypeRef) -> NativeTypeRef
    {
        MockType::build(MockType {
            inner: Some(pointee.clone()),
            ..MockType::blank(name, TypeClass::MemberPointer, POINTER_SIZE)
        })
    }

    fn register(&self, ty: NativeTypeRef) -> NativeTypeRef
    {
        lock(&self.state.types).push(ty.clone());
        ty
    }

    pub fn write_memory(&self, address: u64, bytes: &[u8])
    {
        let mut memory = lock(&self.state.memory);
        for (offset, byte) in (0u64..).zip(bytes) {
            memory.insert(address + offset, *byte);
        }
    }

    /// Declare a global at `address` initialised with `bytes`.
    pub fn add_global(&self, name: &str, ty: &NativeTypeRef, address: u64, bytes: &[u8]) -> NativeValueRef
    {
        self.write_memory(address, bytes);
        lock(&self.state.globals).insert(name.to_string(), (address, ty.clone()));
        MockValue::new(self, name, ty, Location::Memory(address))
    }

    /// Value of type `ty` living at `address`.
    #[must_use]
    pub fn value_at(&self, address: u64, ty: &NativeTypeRef) -> NativeValueRef
    {
        MockValue::new(self, "", ty, Location::Memory(address))
    }

    /// Value of type `ty` holding `bytes`, with no address.
    #[must_use]
    pub fn value_from_data(&self, bytes: &[u8], ty: &NativeTypeRef) -> NativeValueRef
    {
        MockValue::new(self, "", ty, Location::Data(bytes.to_vec()))
    }

    /// Every expression handed to the evaluator so far.
    #[must_use]
    pub fn evaluations(&self) -> Vec<String>
    {
        lock(&self.state.evaluations).clone()
    }

    /// Number of [`NativeTarget::read_memory`] calls so far.
    #[must_use]
    pub fn memory_reads(&self) -> usize
    {
        self.state.memory_reads.load(Ordering::Relaxed)
    }

    /// Contiguous readable bytes at `address`, at most `len`.
    fn read(&self, address: u64, len: usize) -> Vec<u8>
    {
        let memory = lock(&self.state.memory);
        (0..len as u64)
            .map_while(|offset| memory.get(&(address + offset)).copied())
            .collect()
    }

    fn global(&self, name: &str) -> Option<Arc<MockValue>>
    {
        let (address, ty) = lock(&self.state.globals).get(name).cloned()?;
        Some(MockValue::new(self, name, &ty, Location::Memory(address)))
    }

    fn evaluate(&self, expression: &str) -> Result<NativeValueRef, HostError>
    {
        let expression = expression.trim();

        if let Some(rest) = expression.strip_prefix('(') {
            if let Some(close) = matching_paren(rest) {
                let inside = &rest[..close];
                let operand = rest[close + 1..].trim();
                if operand.is_empty() {
                    return self.evaluate(inside);
                }
                let ty = lookup_type_in(&self.as_target(), inside).map_err(|err| HostError::new(err.to_string()))?;
                return self.convert(&self.evaluate(operand)?, ty.native());
            }
        }
        if let Some(rest) = expression.strip_prefix('&') {
            return self
                .evaluate(rest)?
                .address_of()
                .ok_or_else(|| HostError::new(format!("cannot take the address of {rest}")));
        }
        if let Some(rest) = expression.strip_prefix('*') {
            return self.evaluate(rest)?.dereference();
        }
        if expression == "true" || expression == "false" {
            let bool_type = self.builtin(BasicType::Bool);
            let data = vec![u8::from(expression == "true")];
            return Ok(MockValue::new(self, "", &bool_type, Location::Data(data)));
        }
        if let Some((number, basic)) = parse_literal(expression) {
            let ty = self.builtin(basic);
            let data = encode_number(number, &ty);
            return Ok(MockValue::new(self, "", &ty, Location::Data(data)));
        }
        if let Some(global) = self.global(expression) {
            return Ok(global);
        }
        Err(HostError::new(format!("use of undeclared identifier '{expression}'")))
    }

    /// Numeric conversion of `value` to `ty`, as a C cast would do.
    fn convert(&self, value: &NativeValueRef, ty: &NativeTypeRef) -> Result<NativeValueRef, HostError>
    {
        let number = Value::from_native(value.clone())
            .as_number()
            .map_err(|err| HostError::new(err.to_string()))?;
        let data = encode_number(number, &resolved(ty));
        Ok(MockValue::new(self, "", ty, Location::Data(data)))
    }
}

#[allow(clippy::cast_sign_loss)]
fn encode_number(number: Number, ty: &NativeTypeRef) -> Vec<u8>
{
    let size = to_usize(ty.byte_size());
    if ty.basic_type().is_float() {
        return encode_float(number.as_f64(), size, ByteOrder::Little);
    }
    let mut data = encode_uint(number.as_i64() as u64, size, ByteOrder::Little);
    // Sign-extend into 128-bit integers.
    if size > 8 {
        let fill = if number.as_i64() < 0 { 0xff } else { 0 };
        data.resize(size, fill);
    }
    data
}

/// Index of the `)` closing an already-consumed `(`.
fn matching_paren(text: &str) -> Option<usize>
{
    let mut depth = 1usize;
    for (index, c) in text.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
    }
    None
}

/// Integer and float literals with C suffixes, typed the way C types them.
fn parse_literal(text: &str) -> Option<(Number, BasicType)>
{
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest.trim_start()),
        None => (false, text),
    };
    if !body.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let digits = body.trim_end_matches(['u', 'U', 'l', 'L']);
    let unsigned = body[digits.len()..].contains(['u', 'U']);

    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        digits.parse::<u64>().ok()
    };
    let Some(magnitude) = magnitude else {
        let value: f64 = body.trim_end_matches(['f', 'F']).parse().ok()?;
        return Some((Number::Float(if negative { -value } else { value }), BasicType::Double));
    };

    if negative {
        let value = i64::try_from(-i128::from(magnitude)).ok()?;
        let basic = if i32::try_from(value).is_ok() { BasicType::Int } else { BasicType::Long };
        return Some((Number::Signed(value), basic));
    }
    let basic = match (unsigned, u32::try_from(magnitude).is_ok(), i32::try_from(magnitude).is_ok()) {
        (false, _, true) => BasicType::Int,
        (false, _, false) if i64::try_from(magnitude).is_ok() => BasicType::Long,
        (true, true, _) => BasicType::UnsignedInt,
        _ => BasicType::UnsignedLong,
    };
    Some((Number::Unsigned(magnitude), basic))
}

impl NativeTarget for MockTarget
{
    fn id(&self) -> TargetId
    {
        self.state.id
    }

    fn find_types(&self, unscoped_name: &str) -> Vec<NativeTypeRef>
    {
        lock(&self.state.types)
            .iter()
            .filter(|ty| split_scope(&ty.name()).1 == unscoped_name)
            .cloned()
            .collect()
    }

    fn basic_type(&self, basic: BasicType) -> Option<NativeTypeRef>
    {
        self.state.builtins.get(&basic).cloned()
    }

    fn evaluate_expression(&self, expression: &str) -> Result<NativeValueRef, HostError>
    {
        lock(&self.state.evaluations).push(expression.to_string());
        self.evaluate(expression)
    }

    fn read_memory(&self, address: u64, len: usize) -> Result<Vec<u8>, HostError>
    {
        self.state.memory_reads.fetch_add(1, Ordering::Relaxed);
        let bytes = self.read(address, len);
        if bytes.is_empty() && len > 0 {
            return Err(HostError::new(format!("memory read failed for {address:#x}")));
        }
        Ok(bytes)
    }

    fn create_value_from_address(&self, name: &str, address: u64, ty: &NativeTypeRef) -> NativeValueRef
    {
        MockValue::new(self, name, ty, Location::Memory(address))
    }

    fn create_value_from_data(&self, name: &str, data: Vec<u8>, ty: &NativeTypeRef) -> NativeValueRef
    {
        MockValue::new(self, name, ty, Location::Data(data))
    }

    fn find_global_variable(&self, name: &str) -> Option<NativeValueRef>
    {
        self.global(name).map(|global| global as NativeValueRef)
    }
}

// ---------------------------------------------------------------------------
// Formatters
// ---------------------------------------------------------------------------

struct MockCategory
{
    name: String,
    enabled: bool,
    summaries: Vec<(TypeNameSpecifier, SummaryProvider, TypeOptions)>,
    synthetics: Vec<(TypeNameSpecifier, SyntheticProviderFactory, TypeOptions)>,
}

/// In-memory formatter registry
///
/// Categories are created disabled. Lookups consult enabled categories in
/// creation order and, inside a category, formatters in installation order.
#[derive(Default)]
pub struct MockFormatterHost
{
    categories: Mutex<Vec<MockCategory>>,
    refuse_formatters: AtomicBool,
}

impl fmt::Debug for MockFormatterHost
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("MockFormatterHost")
            .field("categories", &self.category_names())
            .finish()
    }
}

/// Whether a formatter registered with `specifier` applies to `ty`.
fn applies(specifier: &TypeNameSpecifier, options: TypeOptions, ty: &NativeTypeRef) -> bool
{
    if specifier.matches(ty) {
        return true;
    }
    if !options.cascade {
        return false;
    }
    let mut current = ty.clone();
    for _ in 0..64 {
        let Some(next) = current.typedefed_type() else {
            return false;
        };
        if specifier.matches(&next) {
            return true;
        }
        current = next;
    }
    false
}

impl MockFormatterHost
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    #[must_use]
    pub fn category_names(&self) -> Vec<String>
    {
        lock(&self.categories).iter().map(|category| category.name.clone()).collect()
    }

    #[must_use]
    pub fn is_category_enabled(&self, name: &str) -> bool
    {
        lock(&self.categories)
            .iter()
            .any(|category| category.name == name && category.enabled)
    }

    /// Make every later `add_type_summary`/`add_type_synthetic` fail.
    pub fn refuse_formatters(&self, refuse: bool)
    {
        self.refuse_formatters.store(refuse, Ordering::Relaxed);
    }

    fn check_accepting(&self) -> Result<(), HostError>
    {
        if self.refuse_formatters.load(Ordering::Relaxed) {
            return Err(HostError::new("formatter rejected"));
        }
        Ok(())
    }

    /// Number of summaries and synthetic providers installed in `name`.
    #[must_use]
    pub fn formatter_counts(&self, name: &str) -> (usize, usize)
    {
        lock(&self.categories)
            .iter()
            .find(|category| category.name == name)
            .map_or((0, 0), |category| (category.summaries.len(), category.synthetics.len()))
    }

    fn summary_entry(&self, value: &NativeValueRef) -> Option<(SummaryProvider, TypeOptions)>
    {
        let ty = value.native_type();
        lock(&self.categories)
            .iter()
            .filter(|category| category.enabled)
            .flat_map(|category| category.summaries.iter())
            .find(|(specifier, _, options)| applies(specifier, *options, &ty))
            .map(|(_, provider, options)| (provider.clone(), *options))
    }

    /// Render the summary of `value` with the first applicable formatter.
    #[must_use]
    pub fn summary_for(&self, value: &NativeValueRef) -> Option<String>
    {
        // The provider may render nested values through this registry.
        let (provider, _) = self.summary_entry(value)?;
        provider(value)
    }

    /// Options of the summary that applies to `value`.
    #[must_use]
    pub fn summary_options_for(&self, value: &NativeValueRef) -> Option<TypeOptions>
    {
        self.summary_entry(value).map(|(_, options)| options)
    }

    /// Instantiate the first applicable synthetic provider for `value`.
    #[must_use]
    pub fn synthetic_for(&self, value: &NativeValueRef) -> Option<Box<dyn SyntheticChildren>>
    {
        let ty = value.native_type();
        let factory = lock(&self.categories)
            .iter()
            .filter(|category| category.enabled)
            .flat_map(|category| category.synthetics.iter())
            .find(|(specifier, _, options)| applies(specifier, *options, &ty))
            .map(|(_, factory, _)| factory.clone())?;
        Some(factory(value.clone()))
    }
}

impl FormatterHost for MockFormatterHost
{
    fn has_category(&self, name: &str) -> bool
    {
        lock(&self.categories).iter().any(|category| category.name == name)
    }

    fn create_category(&self, name: &str) -> Result<(), HostError>
    {
        let mut categories = lock(&self.categories);
        if categories.iter().any(|category| category.name == name) {
            return Err(HostError::new(format!("category {name} already exists")));
        }
        categories.push(MockCategory {
            name: name.to_string(),
            enabled: false,
            summaries: Vec::new(),
            synthetics: Vec::new(),
        });
        Ok(())
    }

    fn delete_category(&self, name: &str) -> bool
    {
        let mut categories = lock(&self.categories);
        let before = categories.len();
        categories.retain(|category| category.name != name);
        categories.len() != before
    }

    fn set_category_enabled(&self, name: &str, enabled: bool)
    {
        for category in lock(&self.categories).iter_mut().filter(|category| category.name == name) {
            category.enabled = enabled;
        }
    }

    fn add_type_summary(
        &self,
        category: &str,
        specifier: TypeNameSpecifier,
        summary: SummaryProvider,
        options: TypeOptions,
    ) -> Result<(), HostError>
    {
        self.check_accepting()?;
        let mut categories = lock(&self.categories);
        let entry = categories
            .iter_mut()
            .find(|candidate| candidate.name == category)
            .ok_or_else(|| HostError::new(format!("no category {category}")))?;
        entry.summaries.push((specifier, summary, options));
        Ok(())
    }

    fn add_type_synthetic(
        &self,
        category: &str,
        specifier: TypeNameSpecifier,
        synthetic: SyntheticProviderFactory,
        options: TypeOptions,
    ) -> Result<(), HostError>
    {
        self.check_accepting()?;
        let mut categories = lock(&self.categories);
        let entry = categories
            .iter_mut()
            .find(|candidate| candidate.name == category)
            .ok_or_else(|| HostError::new(format!("no category {category}")))?;
        entry.synthetics.push((specifier, synthetic, options));
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_literals_are_typed_like_c()
    {
        assert!(matches!(parse_literal("42"), Some((Number::Unsigned(42), BasicType::Int))));
        assert!(matches!(parse_literal("-1"), Some((Number::Signed(-1), BasicType::Int))));
        assert!(matches!(parse_literal("4294967295"), Some((_, BasicType::Long))));
        assert!(matches!(parse_literal("7u"), Some((_, BasicType::UnsignedInt))));
        assert!(matches!(parse_literal("3.5"), Some((Number::Float(_), BasicType::Double))));
        assert!(parse_literal("x").is_none());
    }

    #[test]
    fn test_raw_cast_reads_adjacent_memory()
    {
        let target = MockTarget::new();
        let uchar = target.builtin(BasicType::UnsignedChar);
        let int = target.builtin(BasicType::Int);
        target.write_memory(0x100, &[0xff, 0x12, 0x34, 0x56]);
        let byte = target.value_at(0x100, &uchar);
        let widened = byte.cast(&int).unwrap();
        assert_eq!(widened.value_as_unsigned().unwrap(), 0x5634_12ff);
    }

    #[test]
    fn test_bitfield_extraction()
    {
        let target = MockTarget::new();
        let int = target.builtin(BasicType::Int);
        let uint = target.builtin(BasicType::UnsignedInt);
        let flags = target.structure("Flags", 4).bitfield("low", &int, 0, 3).bitfield("high", &uint, 3, 5).register();
        let value = target.value_from_data(&[0b1010_1101, 0, 0, 0], &flags);
        assert_eq!(value.child_member_with_name("low").unwrap().value_as_signed().unwrap(), -3);
        assert_eq!(value.child_member_with_name("high").unwrap().value_as_unsigned().unwrap(), 0b10101);
    }

    #[test]
    fn test_categories_start_disabled()
    {
        let host = MockFormatterHost::new();
        host.create_category("c").unwrap();
        assert!(!host.is_category_enabled("c"));
        assert!(host.create_category("c").is_err());
        host.set_category_enabled("c", true);
        assert!(host.is_category_enabled("c"));
        assert!(host.delete_category("c"));
        assert!(!host.delete_category("c"));
    }
}
