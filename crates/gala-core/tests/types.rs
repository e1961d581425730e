//! Tests for the Type Adapter

use gala_core::context::TargetContext;
use gala_core::error::{ErrorKind, GalaError};
use gala_core::host::{BasicType, NativeType};
use gala_core::session::lookup_type;
use gala_core::testing::MockTarget;
use gala_core::types::helpers::{get_basic_type, has_field, make_enum_dict};
use gala_core::types::{Type, TypeCode};
use gala_core::value::Number;

#[test]
fn test_fields_list_bases_before_members()
{
    let target = MockTarget::new();
    let int = target.builtin(BasicType::Int);
    let base = target.class("Base", 4).field("id", &int, 0).register();
    let derived = target
        .class("Derived", 12)
        .field("a", &int, 4)
        .field("b", &int, 8)
        .base(&base, 0)
        .register();

    let fields = Type::from_native(derived).fields().unwrap();
    let names: Vec<_> = fields.iter().map(|field| field.name().unwrap_or_default()).collect();
    assert_eq!(names, ["Base", "a", "b"]);
    assert!(fields[0].is_base_class());
    assert_eq!(fields[0].bitpos(), Some(0));
    assert_eq!(fields[2].bitpos(), Some(64));
    assert_eq!(fields[1].parent_type().map(Type::name).as_deref(), Some("Derived"));
    assert!(!fields[1].artificial());
}

#[test]
fn test_enumerator_names_are_qualified_like_source()
{
    let target = MockTarget::new();
    let int = target.builtin(BasicType::Int);
    let scoped = Type::from_native(target.enumeration("ns::Color", &int, true, &[("Red", 0), ("Green", 1)]));
    let plain = Type::from_native(target.enumeration("ns::Mode", &int, false, &[("Fast", 3)]));

    let names: Vec<_> = scoped
        .fields()
        .unwrap()
        .iter()
        .map(|field| field.name().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names, ["ns::Color::Red", "ns::Color::Green"]);
    assert_eq!(scoped.fields().unwrap()[1].enumval(), Some(1));
    assert_eq!(scoped.fields().unwrap()[1].bitpos(), None);

    let dict = make_enum_dict(&plain).unwrap();
    assert_eq!(dict.get("ns::Fast"), Some(&3));
    assert_eq!(plain.code(), TypeCode::Enum);
}

#[test]
fn test_typedef_layers()
{
    let target = MockTarget::new();
    let int = target.builtin(BasicType::Int);
    let pint = target.typedef("pint", &int.pointer_type());
    let ppint = Type::from_native(target.typedef("ppint", &pint.pointer_type()));

    assert_eq!(ppint.code(), TypeCode::Typedef);
    assert_eq!(ppint.strip_typedefs().name(), "pint *");
    assert_eq!(get_basic_type(&ppint).name(), "pint *");

    let int_ref = Type::from_native(target.typedef("int_ref", &int.reference_type()));
    assert_eq!(get_basic_type(&int_ref).name(), "int");
}

#[test]
fn test_base_class_offsets_accumulate()
{
    let target = MockTarget::new();
    let int = target.builtin(BasicType::Int);
    let a = target.class("A", 4).field("a", &int, 0).register();
    let b = target.class("B", 8).field("b", &int, 0).register();
    let c = target.class("C", 12).base(&a, 0).base(&b, 4).register();
    let d = target.class("D", 20).base(&c, 8).field("d", &int, 0).register();
    let (a, b, d) = (Type::from_native(a), Type::from_native(b), Type::from_native(d));

    assert_eq!(b.is_base_class_of(&d), Some(12));
    assert_eq!(a.is_base_class_of(&d), Some(8));
    assert_eq!(d.is_base_class_of(&d), None);
    assert!(has_field(&d, "b").unwrap());
    assert!(!has_field(&d, "z").unwrap());
}

#[test]
fn test_derived_types()
{
    let target = MockTarget::new();
    let _guard = TargetContext::enter(target.as_target());
    let int = lookup_type("int").unwrap();

    assert_eq!(int.pointer().target().unwrap(), int);
    assert_eq!(int.reference().target().unwrap(), int);
    assert_eq!(int.array(4).unwrap().sizeof(), 20);
    assert_eq!(int.array(-1).unwrap().sizeof(), 0);
    assert_eq!(int.array(-2).unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(int.array_bounds(1, 4).unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(int.target().unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(int.tag(), None);
    assert!(int.is_signed());
}

#[test]
fn test_template_arguments_and_nested_types()
{
    let target = MockTarget::new();
    let int = target.builtin(BasicType::Int);
    let node = target.structure("list<int>::node", 16).register();
    let list = target.class("list<int>", 24).template_arg(&int).nested(&node).register();
    let alias = Type::from_native(target.typedef("int_list", &list));

    assert_eq!(alias.template_argument(0).unwrap().name(), "int");
    assert_eq!(alias.template_argument(1).unwrap_err().kind(), ErrorKind::Lookup);
    assert_eq!(alias.nested_type("node").unwrap().name(), "list<int>::node");
    assert_eq!(alias.nested_type("missing").unwrap_err().kind(), ErrorKind::Lookup);
    assert_eq!(alias.strip_typedefs().tag().as_deref(), Some("list<int>"));
    assert_eq!(alias.tag(), None);
}

#[test]
fn test_static_constexpr_values()
{
    let target = MockTarget::new();
    let int = target.builtin(BasicType::Int);
    let limits = target
        .structure("Limits", 1)
        .static_constexpr("max", &int, &47_i32.to_le_bytes())
        .static_member("counter", &int)
        .register();
    let alias = Type::from_native(target.typedef("LimitsAlias", &limits));

    assert!(matches!(alias.static_constexpr_value("max"), Err(GalaError::NoTarget)));

    let _guard = TargetContext::enter(target.as_target());
    let max = alias.static_constexpr_value("max").unwrap();
    assert_eq!(max.as_number().unwrap(), Number::Signed(47));
    assert_eq!(max.ty().name(), "int");
    assert_eq!(alias.static_constexpr_value("counter").unwrap_err().kind(), ErrorKind::Lookup);
    assert_eq!(alias.static_constexpr_value("missing").unwrap_err().kind(), ErrorKind::Lookup);
}

#[test]
fn test_qualified_types()
{
    let target = MockTarget::new();
    let int = target.builtin(BasicType::Int);
    let const_int = Type::from_native(target.qualified("const", &int));

    assert_eq!(const_int.name(), "const int");
    assert_eq!(const_int.unqualified().name(), "int");
    assert_eq!(const_int.code(), TypeCode::Int);
}

#[test]
fn test_non_aggregates_have_no_fields()
{
    let target = MockTarget::new();
    let int = Type::from_native(target.builtin(BasicType::Int));
    assert_eq!(int.fields().unwrap_err().kind(), ErrorKind::Type);
    assert_eq!(has_field(&int, "x").unwrap_err().kind(), ErrorKind::Type);
}
