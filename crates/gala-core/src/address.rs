//! Inferior memory address type.

use std::fmt;
use std::ops::{Add, Sub};

/// Address in the debugged process
///
/// Keeps inferior addresses apart from sizes, counts and scalar contents,
/// which are all `u64` at the engine boundary.
///
/// ## Example
///
/// ```rust
/// use gala_core::address::Address;
///
/// let base = Address::from(0x1000);
/// assert_eq!((base + 0x10).value(), 0x1010);
/// assert_eq!(base.to_string(), "0x1000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Address(u64);

impl Address
{
    /// The null address
    pub const NULL: Self = Address(0);

    pub const fn new(value: u64) -> Self
    {
        Address(value)
    }

    /// Raw value for the engine interfaces.
    pub const fn value(self) -> u64
    {
        self.0
    }

    #[must_use]
    pub fn is_null(self) -> bool
    {
        self.0 == 0
    }

    /// Offset by a signed number of bytes, `None` on overflow.
    ///
    /// ```rust
    /// use gala_core::address::Address;
    ///
    /// assert_eq!(Address::new(0x20).checked_offset(-0x10), Some(Address::new(0x10)));
    /// assert_eq!(Address::new(0x10).checked_offset(-0x20), None);
    /// ```
    #[must_use]
    pub fn checked_offset(self, delta: i64) -> Option<Self>
    {
        self.0.checked_add_signed(delta).map(Address)
    }
}

impl From<u64> for Address
{
    fn from(value: u64) -> Self
    {
        Address(value)
    }
}

impl From<Address> for u64
{
    fn from(address: Address) -> Self
    {
        address.0
    }
}

impl fmt::Display for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::LowerHex for Address
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl Add<u64> for Address
{
    type Output = Address;

    fn add(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_add(rhs))
    }
}

impl Sub<u64> for Address
{
    type Output = Address;

    fn sub(self, rhs: u64) -> Self::Output
    {
        Address(self.0.wrapping_sub(rhs))
    }
}
