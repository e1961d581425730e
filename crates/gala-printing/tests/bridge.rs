use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use gala_core::error::{ErrorKind, GalaError, GalaResult};
use gala_core::host::{BasicType, FormatterHost, NativeTypeRef, NativeValueRef, SyntheticChildren};
use gala_core::session::parse_and_eval;
use gala_core::testing::{MockFormatterHost, MockTarget};
use gala_core::types::helpers::has_field;
use gala_core::value::Value;
use gala_printing::collection::{PrinterCollection, Subprinter};
use gala_printing::printer::{Child, Children, DisplayHint, Printer};
use gala_printing::registry::Registry;
use gala_printing::synthetic::{Phase, PrinterSyntheticProvider};
use gala_printing::FormatterBridge;

struct Fixture
{
    target: MockTarget,
    host: Arc<MockFormatterHost>,
    bridge: FormatterBridge,
}

fn fixture() -> Fixture
{
    let target = MockTarget::new();
    let host = Arc::new(MockFormatterHost::new());
    let bridge = FormatterBridge::new(host.clone(), Arc::new(Registry::new()));
    Fixture { target, host, bridge }
}

impl Fixture
{
    fn int(&self) -> NativeTypeRef
    {
        self.target.builtin(BasicType::Int)
    }

    /// `struct name { int x; }` at `address`, with `x` set to `x`.
    fn object(&self, name: &str, address: u64, x: i32) -> NativeValueRef
    {
        let ty = self.target.structure(name, 4).field("x", &self.int(), 0).register();
        self.target.write_memory(address, &x.to_le_bytes());
        self.target.value_at(address, &ty)
    }
}

struct Labelled(&'static str);

impl Printer for Labelled
{
    fn to_string(&self) -> GalaResult<Option<String>>
    {
        Ok(Some(self.0.to_string()))
    }
}

struct MapPrinter;

impl Printer for MapPrinter
{
    fn to_string(&self) -> GalaResult<Option<String>>
    {
        Ok(Some("A pretty MyStruct".to_string()))
    }

    fn children(&self) -> GalaResult<Option<Children>>
    {
        let items = vec![
            Child::new("key[0]", "key0"),
            Child::new("val[0]", "val0"),
            Child::new("key[1]", "key1"),
            Child::new("val[1]", "val1"),
        ];
        let children: Children = Box::new(items.into_iter().map(Ok));
        Ok(Some(children))
    }

    fn display_hint(&self) -> GalaResult<Option<DisplayHint>>
    {
        Ok(Some(DisplayHint::Map))
    }
}

/// Yields `0, 1, 2, ...` forever, counting how many items were pulled.
struct Endless
{
    hint: Option<DisplayHint>,
    pulled: Arc<AtomicUsize>,
    restarts: Arc<AtomicUsize>,
}

impl Printer for Endless
{
    fn to_string(&self) -> GalaResult<Option<String>>
    {
        Ok(None)
    }

    fn children(&self) -> GalaResult<Option<Children>>
    {
        self.restarts.fetch_add(1, Ordering::SeqCst);
        let pulled = self.pulled.clone();
        let children: Children = Box::new((0i64..).map(move |i| {
            pulled.fetch_add(1, Ordering::SeqCst);
            Ok(Child::new(format!("[{i}]"), i))
        }));
        Ok(Some(children))
    }

    fn display_hint(&self) -> GalaResult<Option<DisplayHint>>
    {
        Ok(self.hint)
    }
}

fn endless(fixture: &Fixture, hint: Option<DisplayHint>) -> (PrinterSyntheticProvider, Arc<AtomicUsize>, Arc<AtomicUsize>)
{
    let pulled = Arc::new(AtomicUsize::new(0));
    let restarts = Arc::new(AtomicUsize::new(0));
    let (pulled_in, restarts_in) = (pulled.clone(), restarts.clone());
    let subprinter = Subprinter::new("Stream", move |_| {
        Ok(Some(Endless {
            hint,
            pulled: pulled_in.clone(),
            restarts: restarts_in.clone(),
        }))
    })
    .unwrap();
    let value = Value::from_native(fixture.object("Stream", 0x3000, 0));
    (PrinterSyntheticProvider::new(value, Arc::new(subprinter)), pulled, restarts)
}

#[test]
fn test_name_derived_matcher_selects_templates_only_of_that_name()
{
    let fixture = fixture();
    let mut collection = PrinterCollection::new("Ptr");
    collection.add_subprinter(Subprinter::new("Ptr", |_| Ok(Some(Labelled("smart pointer")))).unwrap());
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    let ptr = fixture.object("Ptr<int>", 0x1000, 1);
    let other = fixture.object("OtherPtr<int>", 0x1010, 1);
    assert_eq!(fixture.host.summary_for(&ptr).as_deref(), Some("smart pointer"));
    assert_eq!(fixture.host.summary_for(&other), None);
}

#[test]
fn test_map_children_pair_up()
{
    let fixture = fixture();
    let mut collection = PrinterCollection::regexp("test_regexp_printer");
    collection.add_printer("MyStruct", "MyStruct", |_| Ok(Some(MapPrinter))).unwrap();
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    let value = fixture.object("MyStruct", 0x1000, 0);
    assert_eq!(fixture.host.summary_for(&value).as_deref(), Some("A pretty MyStruct"));

    let mut children = fixture.host.synthetic_for(&value).unwrap();
    assert!(children.has_children());
    assert_eq!(children.num_children(10), 2);

    let first = children.child_at_index(0).unwrap();
    assert_eq!(first.name().as_deref(), Some("[key0]"));
    assert_eq!(Value::from_native(first).string(Default::default(), Default::default(), None).unwrap(), "val0");

    let second = children.child_at_index(1).unwrap();
    assert_eq!(second.name().as_deref(), Some("[key1]"));
    assert!(children.child_at_index(2).is_none());
}

#[test]
fn test_drains_lazily_from_unbounded_sequence()
{
    let fixture = fixture();

    let (mut plain, pulled, _) = endless(&fixture, None);
    assert_eq!(plain.num_children(1), 1);
    assert_eq!(pulled.load(Ordering::SeqCst), 1);
    assert_eq!(plain.phase(), Phase::Draining);

    let (mut map, pulled, _) = endless(&fixture, Some(DisplayHint::Map));
    assert_eq!(map.num_children(1), 1);
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
}

#[test]
fn test_repeated_requests_never_restart_the_sequence()
{
    let fixture = fixture();
    let (mut provider, pulled, restarts) = endless(&fixture, None);
    assert_eq!(provider.phase(), Phase::Unbound);

    assert_eq!(provider.num_children(3), 3);
    let child = provider.child_at_index(1).unwrap();
    assert_eq!(child.name().as_deref(), Some("[1]"));
    assert_eq!(child.value_as_signed().unwrap(), 1);
    assert_eq!(provider.num_children(2), 2);
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
    assert_eq!(restarts.load(Ordering::SeqCst), 1);

    provider.update();
    assert_eq!(provider.phase(), Phase::Bound);
    assert_eq!(restarts.load(Ordering::SeqCst), 2);
    assert!(provider.child_at_index(0).is_some());
}

#[test]
fn test_child_index_only_for_array_hint()
{
    let fixture = fixture();
    let (mut array, _, _) = endless(&fixture, Some(DisplayHint::Array));
    assert_eq!(array.child_index("[12]"), Some(12));
    assert_eq!(array.child_index("x"), None);

    let (mut plain, _, _) = endless(&fixture, None);
    assert_eq!(plain.child_index("[12]"), None);
}

struct Quoted;

impl Printer for Quoted
{
    fn to_string(&self) -> GalaResult<Option<String>>
    {
        Ok(Some("hello".to_string()))
    }

    fn display_hint(&self) -> GalaResult<Option<DisplayHint>>
    {
        Ok(Some(DisplayHint::String))
    }
}

#[test]
fn test_string_hint_quotes_summary()
{
    let fixture = fixture();
    let mut collection = PrinterCollection::new("strings");
    collection.add_subprinter(Subprinter::new("Str", |_| Ok(Some(Quoted))).unwrap().summary_only());
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    let value = fixture.object("Str", 0x1000, 0);
    assert_eq!(fixture.host.summary_for(&value).as_deref(), Some("\"hello\""));
    let options = fixture.host.summary_options_for(&value).unwrap();
    assert!(options.cascade);
    assert!(options.hide_children);
    assert!(fixture.host.synthetic_for(&value).is_none());
}

struct Broken;

impl Printer for Broken
{
    fn to_string(&self) -> GalaResult<Option<String>>
    {
        Err(GalaError::Type("printer bug".to_string()))
    }

    fn children(&self) -> GalaResult<Option<Children>>
    {
        let items = vec![Ok(Child::new("a", 1)), Err(GalaError::Type("printer bug".to_string()))];
        let children: Children = Box::new(items.into_iter());
        Ok(Some(children))
    }
}

#[test]
fn test_printer_failures_are_contained()
{
    let fixture = fixture();
    let mut collection = PrinterCollection::new("broken");
    collection.add_subprinter(Subprinter::new("Broken", |_| Ok(Some(Broken))).unwrap());
    collection.add_subprinter(
        Subprinter::new("Refused", |_| -> GalaResult<Option<Broken>> { Err(GalaError::Lookup("nope".to_string())) })
            .unwrap(),
    );
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    let broken = fixture.object("Broken", 0x1000, 0);
    assert_eq!(fixture.host.summary_for(&broken), None);
    let mut children = fixture.host.synthetic_for(&broken).unwrap();
    assert_eq!(children.num_children(10), 1);

    let refused = fixture.object("Refused", 0x1010, 0);
    assert_eq!(fixture.host.summary_for(&refused), None);
    let mut children = fixture.host.synthetic_for(&refused).unwrap();
    assert_eq!(children.num_children(10), 0);
    assert!(!children.has_children());
}

#[test]
fn test_duplicate_category_needs_replace()
{
    let fixture = fixture();
    fixture.bridge.register_printer_collection(PrinterCollection::new("dup"), false).unwrap();
    let err = fixture
        .bridge
        .register_printer_collection(PrinterCollection::new("dup"), false)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Registration);

    fixture.bridge.register_printer_collection(PrinterCollection::new("dup"), true).unwrap();
    assert_eq!(fixture.bridge.registry().len(), 1);
    assert_eq!(fixture.host.category_names(), vec!["dup".to_string()]);

    fixture.host.create_category("foreign").unwrap();
    assert!(fixture.bridge.register_printer_collection(PrinterCollection::new("foreign"), false).is_err());
}

struct HasX
{
    value: Value,
}

impl Printer for HasX
{
    fn to_string(&self) -> GalaResult<Option<String>>
    {
        let x = i64::try_from(&self.value.get("x")?)?;
        Ok(Some(format!("A class with an X member. X = {x}")))
    }
}

#[test]
fn test_type_callback_collection()
{
    let fixture = fixture();
    let collection = PrinterCollection::type_callback(
        "class-with-member-named-x",
        |ty| has_field(ty, "x").unwrap_or(false),
        |value| Ok(Some(HasX { value: value.clone() })),
    )
    .unwrap();
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    let with_x = fixture.object("Anything", 0x1000, 47);
    assert_eq!(
        fixture.host.summary_for(&with_x).as_deref(),
        Some("A class with an X member. X = 47")
    );

    let without = fixture.target.structure("NoX", 4).field("y", &fixture.int(), 0).register();
    let without = fixture.target.value_at(0x1010, &without);
    assert_eq!(fixture.host.summary_for(&without), None);
    assert_eq!(fixture.host.summary_for(&fixture.target.value_at(0x1010, &fixture.int())), None);
}

#[test]
fn test_type_callback_follows_typedefs()
{
    let fixture = fixture();
    let collection =
        PrinterCollection::type_callback("map", |ty| ty.name() == "MyMap", |_| Ok(Some(MapPrinter))).unwrap();
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    let map = fixture.object("MyMap", 0x1000, 0);
    assert_eq!(fixture.host.summary_for(&map).as_deref(), Some("A pretty MyStruct"));

    let alias = fixture.target.typedef("MapAlias", &map.native_type());
    let alias = fixture.target.typedef("MapAliasAlias", &alias);
    let aliased = fixture.target.value_at(0x1000, &alias);
    assert_eq!(fixture.host.summary_for(&aliased).as_deref(), Some("A pretty MyStruct"));
    let mut children = fixture.host.synthetic_for(&aliased).unwrap();
    assert_eq!(children.num_children(10), 2);

    let other = fixture.target.typedef("OtherAlias", &fixture.int());
    assert_eq!(fixture.host.summary_for(&fixture.target.value_at(0x1000, &other)), None);
}

#[test]
fn test_refused_install_leaves_no_category()
{
    let fixture = fixture();
    let collection = || {
        let mut collection = PrinterCollection::new("refused");
        collection.add_subprinter(Subprinter::new("Thing", |_| Ok(Some(Labelled("thing")))).unwrap());
        collection
    };

    fixture.host.refuse_formatters(true);
    let err = fixture.bridge.register_printer_collection(collection(), false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Registration);
    assert!(!fixture.host.has_category("refused"));
    assert!(fixture.bridge.registry().is_empty());

    fixture.host.refuse_formatters(false);
    fixture.bridge.register_printer_collection(collection(), false).unwrap();
    assert_eq!(fixture.host.formatter_counts("refused"), (1, 1));
}

struct Evaluating;

impl Printer for Evaluating
{
    fn to_string(&self) -> GalaResult<Option<String>>
    {
        Ok(Some(parse_and_eval("42")?.to_string()))
    }
}

#[test]
fn test_callbacks_run_in_the_value_target()
{
    let fixture = fixture();
    let mut collection = PrinterCollection::new("eval");
    collection.add_subprinter(Subprinter::new("Eval", |_| Ok(Some(Evaluating))).unwrap());
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    // No context is entered here; the bridge enters the value's target.
    let value = fixture.object("Eval", 0x1000, 0);
    assert_eq!(fixture.host.summary_for(&value).as_deref(), Some("42"));
    assert!(fixture.target.evaluations().contains(&"42".to_string()));
}

#[test]
fn test_disabled_subprinters_are_not_installed()
{
    let fixture = fixture();
    let mut collection = PrinterCollection::new("partial");
    let off = Subprinter::new("Off", |_| Ok(Some(Labelled("off")))).unwrap();
    off.set_enabled(false);
    collection.add_subprinter(off);
    collection.add_subprinter(Subprinter::new("On", |_| Ok(Some(Labelled("on")))).unwrap());
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    assert_eq!(fixture.host.formatter_counts("partial"), (1, 1));
    assert_eq!(fixture.host.summary_for(&fixture.object("Off", 0x1000, 0)), None);
    assert_eq!(fixture.host.summary_for(&fixture.object("On", 0x1010, 0)).as_deref(), Some("on"));
}

#[test]
fn test_registry_default_visualizer_and_teardown()
{
    let fixture = fixture();
    let mut collection = PrinterCollection::new("viz");
    collection.add_subprinter(Subprinter::new("Viz", |_| Ok(Some(Labelled("viz")))).unwrap());
    fixture.bridge.register_printer_collection(collection, false).unwrap();

    let value = Value::from_native(fixture.object("Viz", 0x1000, 0));
    let printer = fixture.bridge.registry().default_visualizer(&value).unwrap();
    assert_eq!(printer.to_string().unwrap().as_deref(), Some("viz"));

    let other = Value::from_native(fixture.object("Other", 0x1010, 0));
    assert!(fixture.bridge.registry().default_visualizer(&other).is_none());

    fixture.bridge.clear();
    assert!(fixture.bridge.registry().is_empty());
    assert!(!fixture.host.has_category("viz"));
    assert!(!fixture.bridge.unregister("viz"));
}
