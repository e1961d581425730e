//! # Printer Protocol
//!
//! What a pretty printer provides: a summary string, optionally a lazy
//! sequence of children, optionally a display hint.
//!
//! The optional parts are probed once when a printer is bound (see
//! [`Capabilities`]) rather than on every callback.

use std::fmt;
use std::str::FromStr;

use gala_core::error::{GalaError, GalaResult};
use gala_core::value::Value;

/// How the renderer should present a printer's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayHint
{
    /// The summary is a string and is shown quoted
    String,
    /// Children are elements labelled `[N]`
    Array,
    /// Children alternate key, value
    Map,
}

impl DisplayHint
{
    #[must_use]
    pub fn as_str(self) -> &'static str
    {
        match self {
            DisplayHint::String => "string",
            DisplayHint::Array => "array",
            DisplayHint::Map => "map",
        }
    }
}

impl fmt::Display for DisplayHint
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayHint
{
    type Err = GalaError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s {
            "string" => Ok(DisplayHint::String),
            "array" => Ok(DisplayHint::Array),
            "map" => Ok(DisplayHint::Map),
            other => Err(GalaError::InvalidArgument(format!("unknown display hint: {other}"))),
        }
    }
}

/// Payload of one child
///
/// Scalars are turned into primitive-typed values when the child is shown.
#[derive(Debug, Clone)]
pub enum ChildValue
{
    Value(Value),
    Int(i64),
    Float(f64),
    Bool(bool),
    /// Shown as a NUL-terminated `char` array
    Text(String),
}

impl ChildValue
{
    /// Text used when this child is a map key.
    #[must_use]
    pub fn display(&self) -> String
    {
        match self {
            ChildValue::Value(value) => value.to_string(),
            ChildValue::Int(value) => value.to_string(),
            ChildValue::Float(value) => value.to_string(),
            ChildValue::Bool(value) => value.to_string(),
            ChildValue::Text(text) => text.clone(),
        }
    }
}

impl From<Value> for ChildValue
{
    fn from(value: Value) -> Self
    {
        ChildValue::Value(value)
    }
}

impl From<&Value> for ChildValue
{
    fn from(value: &Value) -> Self
    {
        ChildValue::Value(value.clone())
    }
}

impl From<i64> for ChildValue
{
    fn from(value: i64) -> Self
    {
        ChildValue::Int(value)
    }
}

impl From<i32> for ChildValue
{
    fn from(value: i32) -> Self
    {
        ChildValue::Int(i64::from(value))
    }
}

impl From<f64> for ChildValue
{
    fn from(value: f64) -> Self
    {
        ChildValue::Float(value)
    }
}

impl From<bool> for ChildValue
{
    fn from(value: bool) -> Self
    {
        ChildValue::Bool(value)
    }
}

impl From<&str> for ChildValue
{
    fn from(text: &str) -> Self
    {
        ChildValue::Text(text.to_string())
    }
}

impl From<String> for ChildValue
{
    fn from(text: String) -> Self
    {
        ChildValue::Text(text)
    }
}

/// One labelled child yielded by [`Printer::children`].
#[derive(Debug, Clone)]
pub struct Child
{
    pub label: String,
    pub value: ChildValue,
}

impl Child
{
    pub fn new(label: impl Into<String>, value: impl Into<ChildValue>) -> Self
    {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// A lazy, single-pass child sequence.
///
/// An `Err` item ends the sequence.
pub type Children = Box<dyn Iterator<Item = GalaResult<Child>>>;

/// A pretty printer bound to one value
///
/// ## Example
///
/// ```rust
/// use gala_core::error::GalaResult;
/// use gala_core::value::Value;
/// use gala_printing::printer::{Child, Children, DisplayHint, Printer};
///
/// struct PairPrinter
/// {
///     value: Value,
/// }
///
/// impl Printer for PairPrinter
/// {
///     fn to_string(&self) -> GalaResult<Option<String>>
///     {
///         Ok(Some("pair".to_string()))
///     }
///
///     fn children(&self) -> GalaResult<Option<Children>>
///     {
///         let first = self.value.get("first")?;
///         let second = self.value.get("second")?;
///         let items = [Child::new("first", first), Child::new("second", second)];
///         let children: Children = Box::new(items.into_iter().map(Ok));
///         Ok(Some(children))
///     }
/// }
/// ```
pub trait Printer
{
    /// The summary line, `None` when there is nothing to show.
    fn to_string(&self) -> GalaResult<Option<String>>;

    /// A fresh child sequence, `None` if this printer has no children.
    fn children(&self) -> GalaResult<Option<Children>>
    {
        Ok(None)
    }

    fn display_hint(&self) -> GalaResult<Option<DisplayHint>>
    {
        Ok(None)
    }
}

/// Optional parts of the protocol a bound printer provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities
{
    pub has_children: bool,
    pub has_display_hint: bool,
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_display_hint_parse()
    {
        assert_eq!("map".parse::<DisplayHint>().unwrap(), DisplayHint::Map);
        assert_eq!(DisplayHint::Array.to_string(), "array");
        assert!("table".parse::<DisplayHint>().is_err());
    }

    #[test]
    fn test_child_value_display()
    {
        assert_eq!(ChildValue::from("key0").display(), "key0");
        assert_eq!(ChildValue::from(7).display(), "7");
        assert_eq!(Child::new("x", true).label, "x");
    }
}
