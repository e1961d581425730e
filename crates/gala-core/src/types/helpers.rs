//! Type utilities that printers commonly need.

use std::collections::BTreeMap;

use super::{Field, Type, MAX_TYPEDEF_DEPTH};
use crate::error::GalaResult;
use crate::host::TypeClass;

/// Strip typedefs and references layer by layer.
///
/// This is not canonicalisation: given `typedef int *pint; typedef pint *ppint;`
/// the result for `ppint` is `pint *`, because the outer layer is a pointer
/// and stripping stops there.
#[must_use]
pub fn get_basic_type(ty: &Type) -> Type
{
    let mut current = ty.clone();
    for _ in 0..MAX_TYPEDEF_DEPTH {
        let next = match current.type_class() {
            TypeClass::Typedef => current.native().typedefed_type(),
            TypeClass::Reference => current.native().dereferenced_type(),
            _ => None,
        };
        match next {
            Some(next) if !next.same_type(current.native().as_ref()) => current = Type::from_native(next),
            _ => return current,
        }
    }
    current
}

/// Whether `ty` or any of its base classes has a member called `field_name`.
///
/// ## Errors
///
/// - `Type`: `ty` is not an aggregate
pub fn has_field(ty: &Type, field_name: &str) -> GalaResult<bool>
{
    for field in ty.fields()? {
        match &field {
            Field::BaseClass { ty: base, .. } => {
                if has_field(base, field_name)? {
                    return Ok(true);
                }
            }
            _ if field.name() == Some(field_name) => return Ok(true),
            _ => {}
        }
    }
    Ok(false)
}

/// Map of enumerator name to value.
///
/// ## Errors
///
/// - `Type`: `ty` is not an enumeration or aggregate
pub fn make_enum_dict(ty: &Type) -> GalaResult<BTreeMap<String, i64>>
{
    Ok(ty
        .fields()?
        .into_iter()
        .filter_map(|field| {
            let value = field.enumval()?;
            Some((field.name()?.to_string(), value))
        })
        .collect())
}

#[cfg(test)]
mod tests
{
    use std::sync::Arc;

    use super::*;
    use crate::host::{BasicType, NativeBaseClass, NativeEnumMember, NativeField, NativeType, NativeTypeRef};

    /// Typedef whose target aliases it back: `A -> B -> A`.
    #[derive(Debug, Clone)]
    struct AliasLoop
    {
        name: &'static str,
        other: &'static str,
    }

    impl NativeType for AliasLoop
    {
        fn name(&self) -> String
        {
            self.name.to_string()
        }

        fn type_class(&self) -> TypeClass
        {
            TypeClass::Typedef
        }

        fn basic_type(&self) -> BasicType
        {
            BasicType::Invalid
        }

        fn byte_size(&self) -> u64
        {
            0
        }

        fn is_signed(&self) -> bool
        {
            false
        }

        fn typedefed_type(&self) -> Option<NativeTypeRef>
        {
            Some(Arc::new(AliasLoop {
                name: self.other,
                other: self.name,
            }))
        }

        fn pointee_type(&self) -> Option<NativeTypeRef>
        {
            None
        }

        fn dereferenced_type(&self) -> Option<NativeTypeRef>
        {
            None
        }

        fn array_element_type(&self) -> Option<NativeTypeRef>
        {
            None
        }

        fn function_return_type(&self) -> Option<NativeTypeRef>
        {
            None
        }

        fn enumeration_integer_type(&self) -> Option<NativeTypeRef>
        {
            None
        }

        fn pointer_type(&self) -> NativeTypeRef
        {
            Arc::new(self.clone())
        }

        fn reference_type(&self) -> NativeTypeRef
        {
            Arc::new(self.clone())
        }

        fn array_type(&self, _len: u64) -> NativeTypeRef
        {
            Arc::new(self.clone())
        }

        fn direct_base_classes(&self) -> Vec<NativeBaseClass>
        {
            Vec::new()
        }

        fn fields(&self) -> Vec<NativeField>
        {
            Vec::new()
        }

        fn enum_members(&self) -> Vec<NativeEnumMember>
        {
            Vec::new()
        }

        fn is_scoped_enum(&self) -> bool
        {
            false
        }

        fn template_argument(&self, _index: usize) -> Option<NativeTypeRef>
        {
            None
        }
    }

    #[test]
    fn test_typedef_cycles_terminate()
    {
        let alias = Type::from_native(Arc::new(AliasLoop { name: "A", other: "B" }));

        let basic = get_basic_type(&alias);
        assert_eq!(basic.type_class(), TypeClass::Typedef);

        assert_eq!(alias.typedef_chain().len(), MAX_TYPEDEF_DEPTH + 1);
        assert_eq!(alias.strip_typedefs().name(), "A");
    }
}
