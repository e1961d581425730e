//! Numeric view of values and raw scalar encoding.

use std::fmt;

use crate::host::ByteOrder;

/// The numeric contents of a value
///
/// Integers keep the signedness of the type they were read from so that
/// `unsigned long` values above `i64::MAX` survive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number
{
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl Number
{
    #[must_use]
    pub fn is_integral(self) -> bool
    {
        !matches!(self, Number::Float(_))
    }

    /// Exact integer contents, `None` for floats.
    #[must_use]
    pub fn as_i128(self) -> Option<i128>
    {
        match self {
            Number::Signed(value) => Some(i128::from(value)),
            Number::Unsigned(value) => Some(i128::from(value)),
            Number::Float(_) => None,
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(self) -> f64
    {
        match self {
            Number::Signed(value) => value as f64,
            Number::Unsigned(value) => value as f64,
            Number::Float(value) => value,
        }
    }

    /// Integer view; floats truncate toward zero and unsigned values wrap.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
    pub fn as_i64(self) -> i64
    {
        match self {
            Number::Signed(value) => value,
            Number::Unsigned(value) => value as i64,
            Number::Float(value) => value as i64,
        }
    }
}

impl fmt::Display for Number
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Number::Signed(value) => write!(f, "{value}"),
            Number::Unsigned(value) => write!(f, "{value}"),
            Number::Float(value) => write!(f, "{value}"),
        }
    }
}

/// Encode the low `size` bytes of `value` in `order`.
#[must_use]
pub(crate) fn encode_uint(value: u64, size: usize, order: ByteOrder) -> Vec<u8>
{
    let size = size.min(8);
    match order {
        ByteOrder::Little => value.to_le_bytes()[..size].to_vec(),
        ByteOrder::Big => value.to_be_bytes()[8 - size..].to_vec(),
    }
}

/// Zero-extend up to eight bytes stored in `order`.
#[must_use]
pub(crate) fn decode_uint(bytes: &[u8], order: ByteOrder) -> u64
{
    let bytes = &bytes[..bytes.len().min(8)];
    let mut buf = [0u8; 8];
    match order {
        ByteOrder::Little => {
            buf[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
        ByteOrder::Big => {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        }
    }
}

/// Reinterpret raw float bytes of a 2-, 4-, 8-, 10-, 12- or 16-byte float.
///
/// 10- and 12-byte values, and 16-byte values whose top six bytes are clear,
/// are x87 extended precision; other 16-byte values are IEEE quad precision.
#[must_use]
pub(crate) fn decode_float(bytes: &[u8], order: ByteOrder) -> Option<f64>
{
    let mut le = bytes.to_vec();
    if order == ByteOrder::Big {
        le.reverse();
    }
    match le.len() {
        2 => Some(half_to_f64(u16::from_le_bytes([le[0], le[1]]))),
        4 => Some(f64::from(f32::from_le_bytes(le[..4].try_into().ok()?))),
        8 => Some(f64::from_le_bytes(le[..8].try_into().ok()?)),
        10 | 12 => Some(x87_to_f64(&le[..10])),
        16 if le[10..].iter().all(|byte| *byte == 0) => Some(x87_to_f64(&le[..10])),
        16 => Some(quad_to_f64(&le)),
        _ => None,
    }
}

/// Encode an `f64` for a 4- or 8-byte float type.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn encode_float(value: f64, size: usize, order: ByteOrder) -> Vec<u8>
{
    let mut bytes = if size == 4 {
        (value as f32).to_le_bytes().to_vec()
    } else {
        value.to_le_bytes().to_vec()
    };
    if order == ByteOrder::Big {
        bytes.reverse();
    }
    bytes
}

fn half_to_f64(bits: u16) -> f64
{
    let sign = if bits & 0x8000 == 0 { 1.0 } else { -1.0 };
    let exponent = i32::from((bits >> 10) & 0x1f);
    let mantissa = f64::from(bits & 0x3ff);
    match exponent {
        0 => sign * mantissa * 2f64.powi(-24),
        0x1f if mantissa == 0.0 => sign * f64::INFINITY,
        0x1f => f64::NAN,
        _ => sign * (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    }
}

#[allow(clippy::cast_precision_loss)]
fn x87_to_f64(le: &[u8]) -> f64
{
    let mantissa = u64::from_le_bytes([le[0], le[1], le[2], le[3], le[4], le[5], le[6], le[7]]);
    let sign_exponent = u16::from_le_bytes([le[8], le[9]]);
    let sign = if sign_exponent & 0x8000 == 0 { 1.0 } else { -1.0 };
    let exponent = i32::from(sign_exponent & 0x7fff);
    if exponent == 0x7fff {
        return if mantissa << 1 == 0 { sign * f64::INFINITY } else { f64::NAN };
    }
    if exponent == 0 && mantissa == 0 {
        return sign * 0.0;
    }
    // The integer bit is explicit: value = mantissa * 2^(exponent - 16383 - 63).
    let unbiased = if exponent == 0 { -16382 } else { exponent - 16383 };
    sign * (mantissa as f64) * 2f64.powi(unbiased - 63)
}

#[allow(clippy::cast_precision_loss)]
fn quad_to_f64(le: &[u8]) -> f64
{
    let high = u64::from_le_bytes([le[8], le[9], le[10], le[11], le[12], le[13], le[14], le[15]]);
    let low = u64::from_le_bytes([le[0], le[1], le[2], le[3], le[4], le[5], le[6], le[7]]);
    let sign = if high >> 63 == 0 { 1.0 } else { -1.0 };
    let exponent = i32::try_from((high >> 48) & 0x7fff).unwrap_or(0);
    // Top 52 of the 112 fraction bits are all an f64 can hold.
    let fraction = ((high & 0xffff_ffff_ffff) << 4) | (low >> 60);
    if exponent == 0x7fff {
        return if fraction == 0 { sign * f64::INFINITY } else { f64::NAN };
    }
    if exponent == 0 && fraction == 0 {
        return sign * 0.0;
    }
    let fraction = fraction as f64 / (1u64 << 52) as f64;
    if exponent == 0 {
        sign * fraction * 2f64.powi(-16382)
    } else {
        sign * (1.0 + fraction) * 2f64.powi(exponent - 16383)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_uint_round_trip_both_orders()
    {
        let le = encode_uint(0x0102_0304, 4, ByteOrder::Little);
        assert_eq!(le, vec![4, 3, 2, 1]);
        assert_eq!(decode_uint(&le, ByteOrder::Little), 0x0102_0304);

        let be = encode_uint(0x0102_0304, 4, ByteOrder::Big);
        assert_eq!(be, vec![1, 2, 3, 4]);
        assert_eq!(decode_uint(&be, ByteOrder::Big), 0x0102_0304);
    }

    #[test]
    fn test_decode_single_and_double()
    {
        assert_eq!(decode_float(&1.5f32.to_le_bytes(), ByteOrder::Little), Some(1.5));
        assert_eq!(decode_float(&(-2.25f64).to_le_bytes(), ByteOrder::Little), Some(-2.25));
    }

    #[test]
    fn test_decode_x87_extended()
    {
        // 3.5 = 1.75 * 2^1: exponent 16384, mantissa 0xE000_0000_0000_0000.
        let mut bytes = 0xE000_0000_0000_0000u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&16384u16.to_le_bytes());
        assert_eq!(decode_float(&bytes, ByteOrder::Little), Some(3.5));

        bytes.extend_from_slice(&[0; 6]);
        assert_eq!(decode_float(&bytes, ByteOrder::Little), Some(3.5));
    }

    #[test]
    fn test_decode_quad()
    {
        // 3.5 in binary128: exponent 16384, fraction 0.75.
        let high: u64 = (16384u64 << 48) | 0xC000_0000_0000;
        let mut bytes = 0u64.to_le_bytes().to_vec();
        bytes.extend_from_slice(&high.to_le_bytes());
        assert_eq!(decode_float(&bytes, ByteOrder::Little), Some(3.5));
    }

    #[test]
    fn test_decode_half()
    {
        assert_eq!(decode_float(&0x3c00u16.to_le_bytes(), ByteOrder::Little), Some(1.0));
        assert_eq!(decode_float(&0xc000u16.to_le_bytes(), ByteOrder::Little), Some(-2.0));
    }
}
