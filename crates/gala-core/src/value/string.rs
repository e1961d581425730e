//! String reads from character arrays and pointers.

use std::str::FromStr;

use smallvec::SmallVec;

use super::Value;
use crate::error::{GalaError, GalaResult};
use crate::host::{ByteOrder, TypeClass};

/// Upper bound on an unterminated string read, in bytes.
const MAX_STRING_BYTES: usize = 1 << 20;

/// Character encodings accepted by [`Value::string`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Encoding
{
    #[default]
    Utf8,
    Ascii,
    Latin1,
    /// In the target's byte order
    Utf16,
    /// In the target's byte order
    Utf32,
}

impl Encoding
{
    /// Bytes per code unit; the terminator is one all-zero code unit.
    #[must_use]
    pub fn code_unit(self) -> usize
    {
        match self {
            Encoding::Utf8 | Encoding::Ascii | Encoding::Latin1 => 1,
            Encoding::Utf16 => 2,
            Encoding::Utf32 => 4,
        }
    }
}

impl FromStr for Encoding
{
    type Err = GalaError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            "ascii" | "us-ascii" => Ok(Encoding::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Encoding::Latin1),
            "utf-16" | "utf16" => Ok(Encoding::Utf16),
            "utf-32" | "utf32" => Ok(Encoding::Utf32),
            other => Err(GalaError::InvalidArgument(format!("unknown encoding: {other}"))),
        }
    }
}

/// What to do with bytes that are invalid in the chosen encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorPolicy
{
    /// Fail with a conversion error
    #[default]
    Strict,
    /// Substitute U+FFFD
    Replace,
    /// Drop the offending bytes
    Ignore,
}

impl FromStr for ErrorPolicy
{
    type Err = GalaError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s {
            "strict" => Ok(ErrorPolicy::Strict),
            "replace" => Ok(ErrorPolicy::Replace),
            "ignore" => Ok(ErrorPolicy::Ignore),
            other => Err(GalaError::InvalidArgument(format!("unknown error policy: {other}"))),
        }
    }
}

type Buffer = SmallVec<[u8; 64]>;

/// Where the characters come from.
enum Source
{
    Memory(u64),
    /// Arrays fabricated from data have no address
    Data(Vec<u8>),
}

impl Value
{
    /// Read the string this value points to (or holds, for arrays).
    ///
    /// With `length`, exactly that many code units are read. Without it,
    /// code units are read until a zero unit.
    ///
    /// ## Errors
    ///
    /// - `Memory`: negative length, unreadable memory, or no terminator
    ///   within the read limit
    /// - `Type`: the value is not a pointer or array
    /// - `Conversion`: invalid characters under [`ErrorPolicy::Strict`]
    pub fn string(&self, encoding: Encoding, errors: ErrorPolicy, length: Option<i64>) -> GalaResult<String>
    {
        let length = match length {
            Some(length) => Some(
                usize::try_from(length).map_err(|_| GalaError::memory(format!("Invalid length {length}")))?,
            ),
            None => None,
        };
        let unit = encoding.code_unit();
        let bytes = match self.string_source()? {
            Source::Memory(address) => self.read_units(address, unit, length)?,
            Source::Data(data) => take_units(&data, unit, length)?,
        };
        decode(&bytes, encoding, errors, self.target().byte_order())
    }

    fn string_source(&self) -> GalaResult<Source>
    {
        let ty = self.ty().strip_typedefs();
        match ty.type_class() {
            TypeClass::Array => match self.native.load_address() {
                Some(address) => Ok(Source::Memory(address)),
                None => self
                    .native
                    .data()
                    .map(Source::Data)
                    .map_err(|err| GalaError::memory(err.0)),
            },
            TypeClass::Pointer => match self.as_number()?.as_i128().and_then(|address| u64::try_from(address).ok()) {
                Some(address) => Ok(Source::Memory(address)),
                None => Err(GalaError::memory("Pointer has no valid address")),
            },
            TypeClass::Reference => self.referenced_value()?.string_source(),
            _ => Err(GalaError::type_error(format!(
                "Trying to read string with inappropriate type \"{}\".",
                self.ty()
            ))),
        }
    }

    fn read_units(&self, address: u64, unit: usize, length: Option<usize>) -> GalaResult<Buffer>
    {
        let target = self.target();
        if let Some(length) = length {
            if length == 0 {
                return Ok(Buffer::new());
            }
            let bytes = target
                .read_memory(address, length.saturating_mul(unit))
                .map_err(|err| GalaError::memory(err.0))?;
            return Ok(Buffer::from_vec(bytes));
        }

        let mut buffer = Buffer::new();
        let mut cursor = address;
        loop {
            if buffer.len() >= MAX_STRING_BYTES {
                return Err(GalaError::memory(format!(
                    "No string terminator within {MAX_STRING_BYTES} bytes of {address:#x}"
                )));
            }
            let code_unit = target
                .read_memory(cursor, unit)
                .map_err(|err| GalaError::memory(err.0))?;
            if code_unit.len() < unit {
                return Err(GalaError::memory(format!("Cannot access memory at address {cursor:#x}")));
            }
            if code_unit.iter().all(|byte| *byte == 0) {
                return Ok(buffer);
            }
            buffer.extend_from_slice(&code_unit);
            cursor = cursor.wrapping_add(unit as u64);
        }
    }
}

fn take_units(data: &[u8], unit: usize, length: Option<usize>) -> GalaResult<Buffer>
{
    match length {
        Some(length) => {
            let wanted = length.saturating_mul(unit);
            data.get(..wanted)
                .map(Buffer::from_slice)
                .ok_or_else(|| GalaError::memory(format!("Requested {wanted} bytes from a {} byte array", data.len())))
        }
        None => {
            let end = data
                .chunks(unit)
                .position(|chunk| chunk.iter().all(|byte| *byte == 0))
                .map_or(data.len(), |units| units * unit);
            Ok(Buffer::from_slice(&data[..end]))
        }
    }
}

fn decode(bytes: &[u8], encoding: Encoding, errors: ErrorPolicy, order: ByteOrder) -> GalaResult<String>
{
    let mut out = String::with_capacity(bytes.len());
    match encoding {
        Encoding::Utf8 => {
            let mut rest = bytes;
            loop {
                match std::str::from_utf8(rest) {
                    Ok(valid) => {
                        out.push_str(valid);
                        break;
                    }
                    Err(err) => {
                        let (valid, after) = rest.split_at(err.valid_up_to());
                        // Everything before `valid_up_to` is valid UTF-8.
                        out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                        invalid(&mut out, errors, "utf-8", after.first().copied().map(u32::from))?;
                        let skip = err.error_len().unwrap_or(after.len());
                        rest = &after[skip..];
                    }
                }
            }
        }
        Encoding::Ascii => {
            for byte in bytes {
                if byte.is_ascii() {
                    out.push(char::from(*byte));
                } else {
                    invalid(&mut out, errors, "ascii", Some(u32::from(*byte)))?;
                }
            }
        }
        Encoding::Latin1 => out.extend(bytes.iter().map(|byte| char::from(*byte))),
        Encoding::Utf16 => {
            let units = bytes.chunks_exact(2).map(|pair| match order {
                ByteOrder::Little => u16::from_le_bytes([pair[0], pair[1]]),
                ByteOrder::Big => u16::from_be_bytes([pair[0], pair[1]]),
            });
            for decoded in char::decode_utf16(units) {
                match decoded {
                    Ok(c) => out.push(c),
                    Err(err) => invalid(&mut out, errors, "utf-16", Some(u32::from(err.unpaired_surrogate())))?,
                }
            }
        }
        Encoding::Utf32 => {
            for quad in bytes.chunks_exact(4) {
                let code = match order {
                    ByteOrder::Little => u32::from_le_bytes([quad[0], quad[1], quad[2], quad[3]]),
                    ByteOrder::Big => u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]]),
                };
                match char::from_u32(code) {
                    Some(c) => out.push(c),
                    None => invalid(&mut out, errors, "utf-32", Some(code))?,
                }
            }
        }
    }
    Ok(out)
}

fn invalid(out: &mut String, errors: ErrorPolicy, encoding: &str, unit: Option<u32>) -> GalaResult<()>
{
    match errors {
        ErrorPolicy::Strict => Err(GalaError::Conversion(format!(
            "'{encoding}' codec can't decode {:#x}",
            unit.unwrap_or_default()
        ))),
        ErrorPolicy::Replace => {
            out.push(char::REPLACEMENT_CHARACTER);
            Ok(())
        }
        ErrorPolicy::Ignore => Ok(()),
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_encoding_names()
    {
        assert_eq!("UTF-8".parse::<Encoding>().unwrap(), Encoding::Utf8);
        assert_eq!("iso_8859_1".parse::<Encoding>().unwrap(), Encoding::Latin1);
        assert!("ebcdic".parse::<Encoding>().is_err());
        assert_eq!("replace".parse::<ErrorPolicy>().unwrap(), ErrorPolicy::Replace);
    }

    #[test]
    fn test_decode_utf8_policies()
    {
        let bytes = b"ab\xffcd";
        assert!(decode(bytes, Encoding::Utf8, ErrorPolicy::Strict, ByteOrder::Little).is_err());
        assert_eq!(decode(bytes, Encoding::Utf8, ErrorPolicy::Replace, ByteOrder::Little).unwrap(), "ab\u{fffd}cd");
        assert_eq!(decode(bytes, Encoding::Utf8, ErrorPolicy::Ignore, ByteOrder::Little).unwrap(), "abcd");
    }

    #[test]
    fn test_decode_utf16_and_utf32()
    {
        let utf16: Vec<u8> = "hé".encode_utf16().flat_map(u16::to_le_bytes).collect();
        assert_eq!(decode(&utf16, Encoding::Utf16, ErrorPolicy::Strict, ByteOrder::Little).unwrap(), "hé");

        let utf32: Vec<u8> = [0x68u32, 0x1F600].iter().flat_map(|c| c.to_be_bytes()).collect();
        assert_eq!(decode(&utf32, Encoding::Utf32, ErrorPolicy::Strict, ByteOrder::Big).unwrap(), "h\u{1F600}");
    }

    #[test]
    fn test_take_units_stops_at_terminator()
    {
        assert_eq!(take_units(b"hi\0junk", 1, None).unwrap().as_slice(), b"hi");
        assert_eq!(take_units(b"h\0i\0\0\0", 2, None).unwrap().as_slice(), b"h\0i\0");
        assert_eq!(take_units(b"abc", 1, Some(2)).unwrap().as_slice(), b"ab");
        assert!(take_units(b"abc", 1, Some(4)).is_err());
    }
}
