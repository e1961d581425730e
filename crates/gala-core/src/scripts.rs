//! # Script Sections
//!
//! Decoding of the script-autoload sections embedded in binaries, and the
//! bookkeeping that decides which scripts an autoloader should run.
//!
//! ## Section format
//!
//! A section is a sequence of entries, each a one-byte kind followed by a
//! NUL-terminated UTF-8 string:
//!
//! | kind | meaning |
//! |------|---------|
//! | 1 | path of a Python script file |
//! | 3 | path of a Scheme script file |
//! | 4 | inline Python script: first line is the logical file name, the rest is the body |
//! | 6 | inline Scheme script, same layout |
//!
//! Two sections are recognised: `.debug_gdb_scripts` (scripts written for
//! the foreign API) and `.debug_gala_lldb_scripts` (native scripts; only
//! file entries are honoured there).
//!
//! Running the scripts is up to the caller; [`AutoloadPlan`] only produces
//! the list of [`ScriptAction`]s.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use object::{Object, ObjectSection};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::{GalaError, GalaResult};

/// Section holding scripts for the foreign scripting API.
pub const GDB_SCRIPTS_SECTION: &str = ".debug_gdb_scripts";

/// Section holding native scripts.
pub const LLDB_SCRIPTS_SECTION: &str = ".debug_gala_lldb_scripts";

const KIND_PYTHON_FILE: u8 = 1;
const KIND_SCHEME_FILE: u8 = 3;
const KIND_PYTHON_TEXT: u8 = 4;
const KIND_SCHEME_TEXT: u8 = 6;

/// Which scripting API a section's scripts are written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptFlavor
{
    /// `.debug_gdb_scripts`
    Gdb,
    /// `.debug_gala_lldb_scripts`
    Lldb,
}

impl ScriptFlavor
{
    #[must_use]
    pub fn section_name(self) -> &'static str
    {
        match self {
            ScriptFlavor::Gdb => GDB_SCRIPTS_SECTION,
            ScriptFlavor::Lldb => LLDB_SCRIPTS_SECTION,
        }
    }
}

impl fmt::Display for ScriptFlavor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            ScriptFlavor::Gdb => f.write_str("gdb"),
            ScriptFlavor::Lldb => f.write_str("lldb"),
        }
    }
}

/// Script language of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptLanguage
{
    Python,
    Scheme,
}

/// One decoded section entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptEntry
{
    /// Kinds 1 and 3
    File
    {
        language: ScriptLanguage,
        path: String,
    },
    /// Kinds 4 and 6
    Inline
    {
        language: ScriptLanguage,
        /// Logical file name, used for de-duplication and exclusion
        file_name: String,
        body: String,
    },
    /// Any other kind, preserved as-is
    Unknown
    {
        kind: u8,
        text: String,
    },
}

impl ScriptEntry
{
    /// Name used to de-duplicate and exclude the entry.
    #[must_use]
    pub fn name(&self) -> &str
    {
        match self {
            ScriptEntry::File { path, .. } => path,
            ScriptEntry::Inline { file_name, .. } => file_name,
            ScriptEntry::Unknown { text, .. } => text,
        }
    }
}

/// A malformed entry; other entries of the same section are unaffected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EntryError
{
    #[error("entry at offset {offset} has no NUL terminator")]
    Unterminated
    {
        offset: usize,
    },

    #[error("entry at offset {offset} is not valid UTF-8")]
    InvalidUtf8
    {
        offset: usize,
    },

    #[error("inline script at offset {offset} has no file name line")]
    MissingFileName
    {
        offset: usize,
    },
}

/// Decode every entry of a section.
///
/// A missing terminator ends the section (there is no way to find the next
/// entry); any other malformed entry is reported and skipped.
///
/// ```rust
/// use gala_core::scripts::{parse_section, ScriptEntry, ScriptLanguage};
///
/// let entries = parse_section(b"\x01printers.py\0\x04inline.py\nprint(1)\0");
/// assert_eq!(
///     entries[0],
///     Ok(ScriptEntry::File { language: ScriptLanguage::Python, path: "printers.py".into() })
/// );
/// assert_eq!(entries[1].as_ref().map(ScriptEntry::name), Ok("inline.py"));
/// ```
#[must_use]
pub fn parse_section(data: &[u8]) -> Vec<Result<ScriptEntry, EntryError>>
{
    let mut entries = Vec::new();
    let mut offset = 0;
    while offset < data.len() {
        let kind = data[offset];
        let text_start = offset + 1;
        let Some(len) = data[text_start..].iter().position(|byte| *byte == 0) else {
            entries.push(Err(EntryError::Unterminated { offset }));
            break;
        };
        let raw = &data[text_start..text_start + len];
        entries.push(decode_entry(kind, raw, offset));
        offset = text_start + len + 1;
    }
    entries
}

fn decode_entry(kind: u8, raw: &[u8], offset: usize) -> Result<ScriptEntry, EntryError>
{
    let text = std::str::from_utf8(raw).map_err(|_| EntryError::InvalidUtf8 { offset })?;
    let language = match kind {
        KIND_PYTHON_FILE | KIND_PYTHON_TEXT => ScriptLanguage::Python,
        KIND_SCHEME_FILE | KIND_SCHEME_TEXT => ScriptLanguage::Scheme,
        _ => {
            return Ok(ScriptEntry::Unknown {
                kind,
                text: text.to_string(),
            });
        }
    };
    match kind {
        KIND_PYTHON_FILE | KIND_SCHEME_FILE => Ok(ScriptEntry::File {
            language,
            path: text.to_string(),
        }),
        _ => {
            let (file_name, body) = text.split_once('\n').ok_or(EntryError::MissingFileName { offset })?;
            Ok(ScriptEntry::Inline {
                language,
                file_name: file_name.to_string(),
                body: body.to_string(),
            })
        }
    }
}

/// The decoded script section of one binary
#[derive(Debug, Clone)]
pub struct ScriptSection
{
    pub flavor: ScriptFlavor,
    pub entries: Vec<Result<ScriptEntry, EntryError>>,
}

/// Extract and decode both script sections of an object file.
///
/// Sections the binary does not have are left out.
///
/// ## Errors
///
/// - `Io`: the file cannot be read
/// - `Object`: the file is not a recognised object format
pub fn read_script_sections(path: impl AsRef<Path>) -> GalaResult<Vec<ScriptSection>>
{
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    let file = object::File::parse(&*data)?;
    let mut sections = Vec::new();
    for flavor in [ScriptFlavor::Gdb, ScriptFlavor::Lldb] {
        let Some(section) = file.section_by_name(flavor.section_name()) else {
            continue;
        };
        let bytes = section.data()?;
        debug!(path = %path.display(), section = flavor.section_name(), size = bytes.len(), "reading script section");
        sections.push(ScriptSection {
            flavor,
            entries: parse_section(bytes),
        });
    }
    Ok(sections)
}

/// Something an autoloader should run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptAction
{
    /// Run the script file at `path` (relative entries resolved against the
    /// base directory)
    RunFile
    {
        flavor: ScriptFlavor,
        /// Name as found in the section
        name: String,
        path: PathBuf,
    },
    /// Run embedded script text
    RunInline
    {
        file_name: String,
        body: String,
    },
}

/// De-duplicating, exclusion-aware autoload bookkeeping
///
/// Scripts are identified by their section name (path or logical file
/// name); each runs at most once per plan, however many modules embed it.
/// Modules are identified by the caller's key and are processed once.
#[derive(Debug)]
pub struct AutoloadPlan
{
    base_dir: PathBuf,
    excluded: Vec<Regex>,
    loaded_scripts: HashSet<String>,
    processed_modules: HashSet<String>,
}

impl AutoloadPlan
{
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self
    {
        Self {
            base_dir: base_dir.into(),
            excluded: Vec::new(),
            loaded_scripts: HashSet::new(),
            processed_modules: HashSet::new(),
        }
    }

    /// Exclude scripts whose name matches any of `patterns` at its start.
    ///
    /// ## Errors
    ///
    /// - `InvalidArgument`: a pattern is not a valid regular expression
    pub fn with_exclusions<S: AsRef<str>>(mut self, patterns: &[S]) -> GalaResult<Self>
    {
        for pattern in patterns {
            let regex = Regex::new(pattern.as_ref())
                .map_err(|err| GalaError::InvalidArgument(format!("bad exclusion pattern: {err}")))?;
            self.excluded.push(regex);
        }
        Ok(self)
    }

    #[must_use]
    pub fn base_dir(&self) -> &Path
    {
        &self.base_dir
    }

    /// Whether `name` is matched, from its first character, by an exclusion.
    #[must_use]
    pub fn is_excluded(&self, name: &str) -> bool
    {
        self.excluded.iter().any(|pattern| {
            let excluded = pattern.find(name).is_some_and(|found| found.start() == 0);
            if excluded {
                debug!(name, pattern = pattern.as_str(), "script excluded");
            }
            excluded
        })
    }

    /// Mark a module as processed. Returns `false` if it already was.
    pub fn begin_module(&mut self, module: &str) -> bool
    {
        let first = self.processed_modules.insert(module.to_string());
        if !first {
            debug!(module, "duplicate module");
        }
        first
    }

    /// Actions for the entries of one section, in section order.
    pub fn plan_section(&mut self, section: &ScriptSection) -> Vec<ScriptAction>
    {
        let mut actions = Vec::new();
        for entry in &section.entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(section = section.flavor.section_name(), %err, "skipping malformed script entry");
                    continue;
                }
            };
            let runnable = match (section.flavor, entry) {
                (_, ScriptEntry::File { language: ScriptLanguage::Python, .. }) => true,
                (ScriptFlavor::Gdb, ScriptEntry::Inline { language: ScriptLanguage::Python, .. }) => true,
                _ => false,
            };
            if !runnable || self.loaded_scripts.contains(entry.name()) || self.is_excluded(entry.name()) {
                continue;
            }
            self.loaded_scripts.insert(entry.name().to_string());
            actions.push(match entry {
                ScriptEntry::Inline { file_name, body, .. } => ScriptAction::RunInline {
                    file_name: file_name.clone(),
                    body: body.clone(),
                },
                _ => ScriptAction::RunFile {
                    flavor: section.flavor,
                    name: entry.name().to_string(),
                    path: self.base_dir.join(entry.name()),
                },
            });
        }
        actions
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn section(flavor: ScriptFlavor, data: &[u8]) -> ScriptSection
    {
        ScriptSection {
            flavor,
            entries: parse_section(data),
        }
    }

    #[test]
    fn test_parse_all_kinds()
    {
        let entries = parse_section(b"\x01a.py\0\x03b.scm\0\x04c.py\nbody\nmore\0\x06d.scm\n(x)\0\x09?\0");
        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[2],
            Ok(ScriptEntry::Inline {
                language: ScriptLanguage::Python,
                file_name: "c.py".into(),
                body: "body\nmore".into(),
            })
        );
        assert_eq!(entries[4], Ok(ScriptEntry::Unknown { kind: 9, text: "?".into() }));
    }

    #[test]
    fn test_bad_entry_does_not_block_others()
    {
        let entries = parse_section(b"\x01\xff\xfe\0\x01good.py\0\x04noname\0\x01tail");
        assert_eq!(entries[0], Err(EntryError::InvalidUtf8 { offset: 0 }));
        assert!(entries[1].is_ok());
        assert!(matches!(entries[2], Err(EntryError::MissingFileName { .. })));
        assert!(matches!(entries[3], Err(EntryError::Unterminated { .. })));
    }

    #[test]
    fn test_plan_dedupes_and_excludes()
    {
        let mut plan = AutoloadPlan::new("/scripts").with_exclusions(&["excluded"]).unwrap();
        let gdb = section(ScriptFlavor::Gdb, b"\x01p.py\0\x01excluded_script.py\0\x01p.py\0\x04e.py\nx=1\0");
        let actions = plan.plan_section(&gdb);
        assert_eq!(
            actions,
            vec![
                ScriptAction::RunFile {
                    flavor: ScriptFlavor::Gdb,
                    name: "p.py".into(),
                    path: PathBuf::from("/scripts/p.py"),
                },
                ScriptAction::RunInline {
                    file_name: "e.py".into(),
                    body: "x=1".into(),
                },
            ]
        );

        // Already loaded through the first module.
        assert!(plan.plan_section(&gdb).is_empty());
    }

    #[test]
    fn test_exclusion_is_anchored_at_start()
    {
        let plan = AutoloadPlan::new(".").with_exclusions(&["lib/"]).unwrap();
        assert!(plan.is_excluded("lib/x.py"));
        assert!(!plan.is_excluded("other/lib/x.py"));
    }

    #[test]
    fn test_lldb_section_only_runs_files()
    {
        let mut plan = AutoloadPlan::new("/base");
        let lldb = section(ScriptFlavor::Lldb, b"\x01native.py\0\x04inline.py\nbody\0");
        let actions = plan.plan_section(&lldb);
        assert_eq!(actions.len(), 1);
        assert!(matches!(&actions[0], ScriptAction::RunFile { flavor: ScriptFlavor::Lldb, .. }));
    }

    #[test]
    fn test_modules_processed_once()
    {
        let mut plan = AutoloadPlan::new(".");
        assert!(plan.begin_module("libfoo.so"));
        assert!(!plan.begin_module("libfoo.so"));
    }

    #[test]
    fn test_bad_exclusion_pattern()
    {
        let err = AutoloadPlan::new(".").with_exclusions(&["("]).unwrap_err();
        assert!(matches!(err, GalaError::InvalidArgument(_)));
    }
}
