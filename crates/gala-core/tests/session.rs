//! Tests for session-level lookups and the target context

use gala_core::context::{current_target, TargetContext};
use gala_core::error::{ErrorKind, GalaError};
use gala_core::host::BasicType;
use gala_core::session::{lookup_global, lookup_type, lookup_type_in, parse_and_eval, selected_inferior, Inferior};
use gala_core::testing::MockTarget;

#[test]
fn test_lookups_are_absolute()
{
    let target = MockTarget::new();
    let _guard = TargetContext::enter(target.as_target());
    target.structure("ns::Widget", 4).register();

    assert_eq!(lookup_type("char").unwrap(), lookup_type("::char").unwrap());
    assert_eq!(lookup_type("ns::Widget").unwrap().name(), "ns::Widget");
    assert_eq!(lookup_type("::ns::Widget").unwrap().name(), "ns::Widget");
    assert_eq!(lookup_type("Widget").unwrap().name(), "ns::Widget");
    assert_eq!(lookup_type("other::Widget").unwrap_err().kind(), ErrorKind::Lookup);
    assert!(matches!(lookup_type("NoSuchType"), Err(GalaError::Lookup(_))));
}

#[test]
fn test_ambiguous_unqualified_lookup_fails()
{
    let target = MockTarget::new();
    target.structure("a::Node", 4).register();
    target.structure("b::Node", 8).register();
    let handle = target.as_target();

    assert!(lookup_type_in(&handle, "Node").is_err());
    assert_eq!(lookup_type_in(&handle, "b::Node").unwrap().sizeof(), 8);
}

#[test]
fn test_no_target_outside_a_context()
{
    assert!(matches!(current_target(), Err(GalaError::NoTarget)));
    assert_eq!(lookup_type("int").unwrap_err().kind(), ErrorKind::Lookup);
    assert!(matches!(parse_and_eval("1"), Err(GalaError::NoTarget)));
}

#[test]
fn test_each_target_resolves_its_own_types()
{
    let first = MockTarget::new();
    let second = MockTarget::new();
    first.structure("Only", 4).register();

    let _outer = TargetContext::enter(first.as_target());
    assert!(lookup_type("Only").is_ok());
    {
        let _inner = TargetContext::enter(second.as_target());
        assert!(lookup_type("Only").is_err());
        assert_eq!(selected_inferior().unwrap().num(), second.id());
    }
    assert_eq!(selected_inferior().unwrap().num(), first.id());
}

#[test]
fn test_evaluation_and_globals()
{
    let target = MockTarget::new();
    let _guard = TargetContext::enter(target.as_target());
    let int = target.builtin(BasicType::Int);
    target.add_global("counter", &int, 0x6000, &12i32.to_le_bytes());

    assert_eq!(parse_and_eval("counter").unwrap(), 12);
    assert_eq!(parse_and_eval("*&counter").unwrap(), 12);
    assert_eq!(parse_and_eval("(long)counter").unwrap().ty().name(), "long");
    assert_eq!(lookup_global("counter").unwrap().name().as_deref(), Some("counter"));
    assert_eq!(lookup_global("missing").unwrap_err().kind(), ErrorKind::Lookup);

    match parse_and_eval("missing + 1") {
        Err(GalaError::Evaluation { expression, .. }) => assert_eq!(expression, "missing + 1"),
        other => panic!("expected an evaluation error, got {other:?}"),
    }
}

#[test]
fn test_inferior_memory_reads()
{
    let target = MockTarget::new();
    target.write_memory(0x7000, b"abcd");
    let inferior = Inferior::new(target.as_target());

    assert_eq!(inferior.read_memory(0x7000u64, 4).unwrap(), b"abcd");
    assert_eq!(inferior.read_memory(0x7000u64, 8).unwrap_err().kind(), ErrorKind::Memory);
    assert_eq!(inferior.read_memory(0x9000u64, 1).unwrap_err().kind(), ErrorKind::Memory);

    let reads = target.memory_reads();
    assert!(inferior.read_memory(0x9000u64, 0).unwrap().is_empty());
    assert_eq!(target.memory_reads(), reads);
}
