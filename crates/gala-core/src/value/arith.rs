//! Binary operators.
//!
//! All operators go through one dispatcher, [`Value::binary_op`]. The
//! `reverse` flag swaps the operands, which is how `2 - v` is expressed when
//! only `v` is a [`Value`].
//!
//! Integer results are `long` (or `unsigned long` when they only fit there),
//! float results are `double`. `TrueDiv` of two integral operands truncates.

use std::fmt;

use super::{Number, Value, encode_uint, usize_of};
use crate::error::{GalaError, GalaResult};
use crate::host::{BasicType, TypeClass};
use crate::types::Type;

/// Operators understood by [`Value::binary_op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp
{
    Add,
    Sub,
    Mul,
    TrueDiv,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl fmt::Display for BinaryOp
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::TrueDiv => "/",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        };
        f.write_str(symbol)
    }
}

/// Right-hand side of an operator: another value or a plain scalar.
#[derive(Debug, Clone)]
pub enum Operand
{
    Value(Value),
    Int(i64),
    Float(f64),
}

impl Operand
{
    pub(crate) fn number(&self) -> GalaResult<Number>
    {
        match self {
            Operand::Value(value) => value.as_number(),
            Operand::Int(value) => Ok(Number::Signed(*value)),
            Operand::Float(value) => Ok(Number::Float(*value)),
        }
    }

    /// The pointer type of a pointer operand.
    fn pointer_type(&self) -> Option<Type>
    {
        match self {
            Operand::Value(value) => {
                let ty = value.ty();
                (ty.strip_typedefs().type_class() == TypeClass::Pointer).then_some(ty)
            }
            Operand::Int(_) | Operand::Float(_) => None,
        }
    }
}

impl From<Value> for Operand
{
    fn from(value: Value) -> Self
    {
        Operand::Value(value)
    }
}

impl From<&Value> for Operand
{
    fn from(value: &Value) -> Self
    {
        Operand::Value(value.clone())
    }
}

impl From<i64> for Operand
{
    fn from(value: i64) -> Self
    {
        Operand::Int(value)
    }
}

impl From<i32> for Operand
{
    fn from(value: i32) -> Self
    {
        Operand::Int(i64::from(value))
    }
}

impl From<f64> for Operand
{
    fn from(value: f64) -> Self
    {
        Operand::Float(value)
    }
}

impl Value
{
    /// Apply `op` to `self` and `other`, or to `other` and `self` when
    /// `reverse` is set.
    ///
    /// ## Errors
    ///
    /// - `Type`: pointer operands in anything but `ptr ± int` or `ptr - ptr`,
    ///   pointers to different types, bitwise operators on floats, negative
    ///   shift counts
    /// - `ZeroDivision`: division by zero
    /// - `Conversion`: an operand is not a number
    pub fn binary_op(&self, op: BinaryOp, other: impl Into<Operand>, reverse: bool) -> GalaResult<Value>
    {
        let this = Operand::Value(self.clone());
        let other = other.into();
        let (lhs, rhs) = if reverse { (&other, &this) } else { (&this, &other) };

        match (lhs.pointer_type(), rhs.pointer_type()) {
            (None, None) => {}
            (Some(left), Some(right)) if op == BinaryOp::Sub => return self.pointer_difference(lhs, &left, rhs, &right),
            (Some(ptr), None) if matches!(op, BinaryOp::Add | BinaryOp::Sub) => {
                return self.pointer_offset(lhs, &ptr, rhs, op == BinaryOp::Sub);
            }
            (None, Some(ptr)) if op == BinaryOp::Add => return self.pointer_offset(rhs, &ptr, lhs, false),
            _ => {
                return Err(GalaError::type_error(format!(
                    "Argument to arithmetic operation not a number or boolean (operator {op})."
                )));
            }
        }

        let result = apply(op, lhs.number()?, rhs.number()?)?;
        Value::from_number_in(&self.target(), result)
    }

    pub fn add(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::Add, other, false)
    }

    pub fn sub(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::Sub, other, false)
    }

    pub fn mul(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::Mul, other, false)
    }

    /// `/` with truncating integer semantics when both sides are integral.
    pub fn truediv(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::TrueDiv, other, false)
    }

    pub fn bitand(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::And, other, false)
    }

    pub fn bitor(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::Or, other, false)
    }

    pub fn bitxor(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::Xor, other, false)
    }

    pub fn shl(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::Shl, other, false)
    }

    pub fn shr(&self, other: impl Into<Operand>) -> GalaResult<Value>
    {
        self.binary_op(BinaryOp::Shr, other, false)
    }

    /// `pointer ± count`, scaled by the pointee size. The result keeps the
    /// pointer's type.
    fn pointer_offset(&self, pointer: &Operand, ptr_type: &Type, count: &Operand, subtract: bool) -> GalaResult<Value>
    {
        let count = match count.number()? {
            Number::Float(_) => {
                return Err(GalaError::type_error("Argument to arithmetic operation not a number or boolean."));
            }
            number => number.as_i64(),
        };
        let base = pointer.number()?.as_i64();
        let step = count.wrapping_mul(element_size(ptr_type));
        let address = if subtract { base.wrapping_sub(step) } else { base.wrapping_add(step) };

        let target = self.target();
        #[allow(clippy::cast_sign_loss)]
        let bytes = encode_uint(address as u64, usize_of(ptr_type.sizeof()), target.byte_order());
        Ok(Value::from_native(target.create_value_from_data("", bytes, ptr_type.native())))
    }

    /// `pointer - pointer` in elements.
    fn pointer_difference(&self, lhs: &Operand, lhs_type: &Type, rhs: &Operand, rhs_type: &Type) -> GalaResult<Value>
    {
        let left_pointee = lhs_type.strip_typedefs().target()?.strip_typedefs();
        let right_pointee = rhs_type.strip_typedefs().target()?.strip_typedefs();
        if !left_pointee.same_as(&right_pointee) {
            return Err(GalaError::type_error(format!(
                "First argument of `-' is a pointer and second argument is neither\nan integer nor a pointer of the same type ({lhs_type} vs {rhs_type})."
            )));
        }
        let distance = lhs.number()?.as_i64().wrapping_sub(rhs.number()?.as_i64());
        Value::from_number_in(&self.target(), Number::Signed(distance / element_size(lhs_type)))
    }
}

/// Pointee size for scaling; `void` and other sizeless pointees count as 1.
#[allow(clippy::cast_possible_wrap)]
fn element_size(ptr_type: &Type) -> i64
{
    let Ok(pointee) = ptr_type.strip_typedefs().target() else {
        return 1;
    };
    let pointee = pointee.strip_typedefs();
    if pointee.native().basic_type() == BasicType::Void {
        return 1;
    }
    match pointee.sizeof() {
        0 => 1,
        size => size as i64,
    }
}

fn apply(op: BinaryOp, lhs: Number, rhs: Number) -> GalaResult<Number>
{
    match (lhs.as_i128(), rhs.as_i128()) {
        (Some(a), Some(b)) => apply_integer(op, a, b),
        _ => apply_float(op, lhs.as_f64(), rhs.as_f64()),
    }
}

fn apply_integer(op: BinaryOp, a: i128, b: i128) -> GalaResult<Number>
{
    let result = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        BinaryOp::TrueDiv => {
            if b == 0 {
                return Err(GalaError::ZeroDivision);
            }
            a / b
        }
        BinaryOp::And => a & b,
        BinaryOp::Or => a | b,
        BinaryOp::Xor => a ^ b,
        BinaryOp::Shl | BinaryOp::Shr => {
            let count = u32::try_from(b).map_err(|_| GalaError::type_error("negative shift count"))?;
            if op == BinaryOp::Shl {
                if count >= 64 { 0 } else { a.wrapping_shl(count) }
            } else {
                a >> count.min(127)
            }
        }
    };
    Ok(wrap_integer(result))
}

fn apply_float(op: BinaryOp, a: f64, b: f64) -> GalaResult<Number>
{
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::TrueDiv => {
            if b == 0.0 {
                return Err(GalaError::ZeroDivision);
            }
            a / b
        }
        _ => {
            return Err(GalaError::type_error(format!(
                "Integral type expected for operator {op}, got a floating point value."
            )));
        }
    };
    Ok(Number::Float(result))
}

/// Fit a 128-bit intermediate into `long`, then `unsigned long`, then wrap
/// to 64 bits.
#[allow(clippy::cast_possible_truncation)]
fn wrap_integer(value: i128) -> Number
{
    if let Ok(signed) = i64::try_from(value) {
        Number::Signed(signed)
    } else if let Ok(unsigned) = u64::try_from(value) {
        Number::Unsigned(unsigned)
    } else {
        Number::Signed(value as i64)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_integer_division_truncates()
    {
        assert_eq!(apply(BinaryOp::TrueDiv, Number::Signed(7), Number::Signed(2)).unwrap(), Number::Signed(3));
        assert_eq!(apply(BinaryOp::TrueDiv, Number::Signed(-7), Number::Signed(2)).unwrap(), Number::Signed(-3));
    }

    #[test]
    fn test_float_division_stays_float()
    {
        assert_eq!(apply(BinaryOp::TrueDiv, Number::Float(7.0), Number::Signed(2)).unwrap(), Number::Float(3.5));
    }

    #[test]
    fn test_division_by_zero()
    {
        assert!(matches!(apply(BinaryOp::TrueDiv, Number::Signed(1), Number::Signed(0)), Err(GalaError::ZeroDivision)));
        assert!(matches!(apply(BinaryOp::TrueDiv, Number::Float(1.0), Number::Float(0.0)), Err(GalaError::ZeroDivision)));
    }

    #[test]
    fn test_shifts()
    {
        assert_eq!(apply(BinaryOp::Shl, Number::Signed(1), Number::Signed(4)).unwrap(), Number::Signed(16));
        assert_eq!(apply(BinaryOp::Shr, Number::Signed(-16), Number::Signed(2)).unwrap(), Number::Signed(-4));
        assert!(apply(BinaryOp::Shl, Number::Signed(1), Number::Signed(-1)).is_err());
    }

    #[test]
    fn test_bitwise_on_float_is_rejected()
    {
        let err = apply(BinaryOp::And, Number::Float(1.0), Number::Signed(1)).unwrap_err();
        assert!(matches!(err, GalaError::Type(_)));
    }

    #[test]
    fn test_large_unsigned_results_stay_unsigned()
    {
        let max = Number::Unsigned(u64::MAX);
        assert_eq!(apply(BinaryOp::Or, max, Number::Signed(0)).unwrap(), Number::Unsigned(u64::MAX));
    }
}
