//! Tests for reading script sections from object files

use std::fs;

use gala_core::error::GalaError;
use gala_core::scripts::{parse_section, read_script_sections, AutoloadPlan, ScriptAction, ScriptFlavor, ScriptSection};

#[test]
fn test_missing_file_is_an_io_error()
{
    let path = std::env::temp_dir().join("gala-scripts-does-not-exist.o");
    assert!(matches!(read_script_sections(&path), Err(GalaError::Io(_))));
}

#[test]
fn test_non_object_file_is_rejected()
{
    let path = std::env::temp_dir().join(format!("gala-scripts-{}.txt", std::process::id()));
    fs::write(&path, b"definitely not an object file").unwrap();
    let result = read_script_sections(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(GalaError::Object(_))));
}

#[test]
fn test_plan_across_modules()
{
    let shared = ScriptSection {
        flavor: ScriptFlavor::Gdb,
        entries: parse_section(b"\x01printers/std.py\0\x04inline.py\nregister()\0"),
    };
    let mut plan = AutoloadPlan::new("/opt/scripts").with_exclusions(&["printers/"]).unwrap();

    assert!(plan.begin_module("libfoo.so"));
    let actions = plan.plan_section(&shared);
    assert_eq!(
        actions,
        [ScriptAction::RunInline {
            file_name: "inline.py".into(),
            body: "register()".into(),
        }]
    );

    assert!(plan.begin_module("libbar.so"));
    assert!(plan.plan_section(&shared).is_empty());
}
