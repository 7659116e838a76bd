//! Constant values and the arithmetic shared by compile-time folding and
//! run-time evaluation.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use ordered_float::OrderedFloat;

use crate::ArithmeticError;

/// The static type of a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum ValueKind {
    Int = 0,
    Float = 1,
    Bool = 2,
    Str = 3,
}

impl ValueKind {
    /// The source-level name of this kind.
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
            ValueKind::Str => "string",
        }
    }

    /// Whether arithmetic operators apply to this kind.
    pub fn is_numeric(self) -> bool {
        matches!(self, ValueKind::Int | ValueKind::Float)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary operators allowed in constant expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum BinaryOp {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    Rem = 4,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
        }
    }

    /// Static result kind of `lhs op rhs`, or `None` if the operator does not apply.
    ///
    /// Mixed int/float arithmetic promotes to float. Strings only support `+`.
    pub fn result_kind(self, lhs: ValueKind, rhs: ValueKind) -> Option<ValueKind> {
        match (lhs, rhs) {
            (ValueKind::Int, ValueKind::Int) => Some(ValueKind::Int),
            (l, r) if l.is_numeric() && r.is_numeric() => Some(ValueKind::Float),
            (ValueKind::Str, ValueKind::Str) if self == BinaryOp::Add => Some(ValueKind::Str),
            _ => None,
        }
    }
}

/// A fully evaluated constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Str(String),
}

impl ConstValue {
    pub fn float(value: f64) -> Self {
        ConstValue::Float(OrderedFloat(value))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ConstValue::Int(_) => ValueKind::Int,
            ConstValue::Float(_) => ValueKind::Float,
            ConstValue::Bool(_) => ValueKind::Bool,
            ConstValue::Str(_) => ValueKind::Str,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConstValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConstValue::Float(v) => Some(v.0),
            ConstValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConstValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Unary negation.
    pub fn neg(&self) -> Result<ConstValue, ArithmeticError> {
        match self {
            ConstValue::Int(v) => v
                .checked_neg()
                .map(ConstValue::Int)
                .ok_or(ArithmeticError::Overflow { op: "-" }),
            ConstValue::Float(v) => Ok(ConstValue::Float(-*v)),
            other => Err(ArithmeticError::InvalidNegation(other.kind())),
        }
    }

    /// Apply a binary operator.
    pub fn binary(&self, op: BinaryOp, rhs: &ConstValue) -> Result<ConstValue, ArithmeticError> {
        let mismatch = || ArithmeticError::TypeMismatch {
            op: op.symbol(),
            lhs: self.kind(),
            rhs: rhs.kind(),
        };

        match (self, rhs) {
            (ConstValue::Int(a), ConstValue::Int(b)) => int_op(op, *a, *b).map(ConstValue::Int),
            (ConstValue::Str(a), ConstValue::Str(b)) if op == BinaryOp::Add => {
                Ok(ConstValue::Str(format!("{a}{b}")))
            }
            _ => {
                let (Some(a), Some(b)) = (self.as_float(), rhs.as_float()) else {
                    return Err(mismatch());
                };
                float_op(op, a, b).map(ConstValue::float)
            }
        }
    }
}

fn int_op(op: BinaryOp, a: i64, b: i64) -> Result<i64, ArithmeticError> {
    let overflow = ArithmeticError::Overflow { op: op.symbol() };
    match op {
        BinaryOp::Add => a.checked_add(b).ok_or(overflow),
        BinaryOp::Sub => a.checked_sub(b).ok_or(overflow),
        BinaryOp::Mul => a.checked_mul(b).ok_or(overflow),
        BinaryOp::Div | BinaryOp::Rem if b == 0 => Err(ArithmeticError::DivisionByZero),
        BinaryOp::Div => a.checked_div(b).ok_or(overflow),
        BinaryOp::Rem => a.checked_rem(b).ok_or(overflow),
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Result<f64, ArithmeticError> {
    match op {
        BinaryOp::Add => Ok(a + b),
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => Err(ArithmeticError::DivisionByZero),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Rem => Ok(a % b),
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{:?}", v.0),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Str(s) => write!(f, "{s:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_arithmetic() {
        let a = ConstValue::Int(7);
        let b = ConstValue::Int(2);
        assert_eq!(a.binary(BinaryOp::Div, &b), Ok(ConstValue::Int(3)));
        assert_eq!(a.binary(BinaryOp::Rem, &b), Ok(ConstValue::Int(1)));
    }

    #[test]
    fn mixed_arithmetic_promotes_to_float() {
        let a = ConstValue::Int(1);
        let b = ConstValue::float(0.5);
        assert_eq!(a.binary(BinaryOp::Add, &b), Ok(ConstValue::float(1.5)));
        assert_eq!(
            BinaryOp::Mul.result_kind(ValueKind::Int, ValueKind::Float),
            Some(ValueKind::Float)
        );
    }

    #[test]
    fn string_concatenation() {
        let a = ConstValue::Str("mod".into());
        let b = ConstValue::Str("link".into());
        assert_eq!(a.binary(BinaryOp::Add, &b), Ok(ConstValue::Str("modlink".into())));
        assert!(matches!(
            a.binary(BinaryOp::Sub, &b),
            Err(ArithmeticError::TypeMismatch { op: "-", .. })
        ));
    }

    #[test]
    fn division_by_zero() {
        let a = ConstValue::Int(1);
        assert_eq!(
            a.binary(BinaryOp::Div, &ConstValue::Int(0)),
            Err(ArithmeticError::DivisionByZero)
        );
        assert_eq!(
            ConstValue::float(1.0).binary(BinaryOp::Rem, &ConstValue::float(0.0)),
            Err(ArithmeticError::DivisionByZero)
        );
    }

    #[test]
    fn overflow_is_reported() {
        let max = ConstValue::Int(i64::MAX);
        assert_eq!(
            max.binary(BinaryOp::Add, &ConstValue::Int(1)),
            Err(ArithmeticError::Overflow { op: "+" })
        );
        assert_eq!(
            ConstValue::Int(i64::MIN).neg(),
            Err(ArithmeticError::Overflow { op: "-" })
        );
    }

    #[test]
    fn negating_bool_fails() {
        assert_eq!(
            ConstValue::Bool(true).neg(),
            Err(ArithmeticError::InvalidNegation(ValueKind::Bool))
        );
    }
}
