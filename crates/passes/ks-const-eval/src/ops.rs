//! Operators on constant values

use crate::EvaluationError;
use ks_span::FileSpan;
use ks_syntax::{BinaryOp, UnaryOp};
use ks_value::Value;
use std::cmp::Ordering;

fn int_result(result: Option<i64>, span: FileSpan) -> Result<Value, EvaluationError> {
    result.map_or_else(
        || Err(EvaluationError::Overflow { span }),
        |value| Ok(Value::Integer(value)),
    )
}

fn shift_amount(amount: i64, span: FileSpan) -> Result<u32, EvaluationError> {
    if !(0..64).contains(&amount) {
        return Err(EvaluationError::Overflow { span });
    }
    u32::try_from(amount).map_err(|_| EvaluationError::Overflow { span })
}

/// Evaluates a binary operation
///
/// `&&` and `||` only reach this point with both operands evaluated; the
/// evaluator short-circuits them itself.
#[allow(clippy::too_many_lines, reason = "Comprehensive operator handling required")]
#[allow(clippy::cast_precision_loss, reason = "Mixed arithmetic promotes to float")]
pub(crate) fn binary(
    op: BinaryOp,
    left: Value,
    right: Value,
    span: FileSpan,
) -> Result<Value, EvaluationError> {
    match (op, &left, &right) {
        // Integer arithmetic
        (BinaryOp::Add, Value::Integer(lhs), Value::Integer(rhs)) => {
            int_result(lhs.checked_add(*rhs), span)
        }
        (BinaryOp::Sub, Value::Integer(lhs), Value::Integer(rhs)) => {
            int_result(lhs.checked_sub(*rhs), span)
        }
        (BinaryOp::Mul, Value::Integer(lhs), Value::Integer(rhs)) => {
            int_result(lhs.checked_mul(*rhs), span)
        }
        (BinaryOp::Div | BinaryOp::Rem, Value::Integer(_), Value::Integer(0)) => {
            Err(EvaluationError::DivisionByZero { span })
        }
        (BinaryOp::Div, Value::Integer(lhs), Value::Integer(rhs)) => {
            int_result(lhs.checked_div(*rhs), span)
        }
        (BinaryOp::Rem, Value::Integer(lhs), Value::Integer(rhs)) => {
            int_result(lhs.checked_rem(*rhs), span)
        }

        // Float arithmetic, integers promote
        (
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem,
            Value::Integer(_) | Value::Float(_),
            Value::Integer(_) | Value::Float(_),
        ) => {
            let (Some(lhs), Some(rhs)) = (as_float(&left), as_float(&right)) else {
                return Err(invalid(op, &left, &right, span));
            };
            match op {
                BinaryOp::Add => Ok(Value::Float(lhs + rhs)),
                BinaryOp::Sub => Ok(Value::Float(lhs - rhs)),
                BinaryOp::Mul => Ok(Value::Float(lhs * rhs)),
                _ if rhs == 0.0 => Err(EvaluationError::DivisionByZero { span }),
                BinaryOp::Div => Ok(Value::Float(lhs / rhs)),
                _ => Ok(Value::Float(lhs % rhs)),
            }
        }

        // Concatenation
        (BinaryOp::Add, Value::String(lhs), Value::String(rhs)) => {
            let mut out = String::with_capacity(lhs.len() + rhs.len());
            out.push_str(lhs);
            out.push_str(rhs);
            Ok(Value::String(out))
        }
        (BinaryOp::Add, Value::Vec(lhs), Value::Vec(rhs)) => {
            let mut out = Vec::with_capacity(lhs.len() + rhs.len());
            out.extend(lhs.iter().cloned());
            out.extend(rhs.iter().cloned());
            Ok(Value::Vec(out))
        }

        // Float equality
        (BinaryOp::Eq | BinaryOp::Ne, Value::Integer(_) | Value::Float(_), Value::Float(_))
        | (BinaryOp::Eq | BinaryOp::Ne, Value::Float(_), Value::Integer(_)) => {
            let (Some(lhs), Some(rhs)) = (as_float(&left), as_float(&right)) else {
                return Err(invalid(op, &left, &right, span));
            };
            #[allow(clippy::float_cmp, reason = "matches `Value`'s `PartialEq` on aggregates")]
            let equal = lhs == rhs;
            Ok(Value::Bool(if op == BinaryOp::Eq { equal } else { !equal }))
        }

        // Structural equality between values of the same type
        (BinaryOp::Eq, _, _) if left.type_name() == right.type_name() => {
            Ok(Value::Bool(left == right))
        }
        (BinaryOp::Ne, _, _) if left.type_name() == right.type_name() => {
            Ok(Value::Bool(left != right))
        }

        // Ordering
        (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, _, _) => {
            let ordering = compare(&left, &right).ok_or_else(|| invalid(op, &left, &right, span))?;
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            }))
        }

        // Logical operations
        (BinaryOp::And, Value::Bool(lhs), Value::Bool(rhs)) => Ok(Value::Bool(*lhs && *rhs)),
        (BinaryOp::Or, Value::Bool(lhs), Value::Bool(rhs)) => Ok(Value::Bool(*lhs || *rhs)),

        // Bitwise operations
        (BinaryOp::BitAnd, Value::Integer(lhs), Value::Integer(rhs)) => {
            Ok(Value::Integer(lhs & rhs))
        }
        (BinaryOp::BitOr, Value::Integer(lhs), Value::Integer(rhs)) => {
            Ok(Value::Integer(lhs | rhs))
        }
        (BinaryOp::BitXor, Value::Integer(lhs), Value::Integer(rhs)) => {
            Ok(Value::Integer(lhs ^ rhs))
        }
        (BinaryOp::BitAnd, Value::Bool(lhs), Value::Bool(rhs)) => Ok(Value::Bool(lhs & rhs)),
        (BinaryOp::BitOr, Value::Bool(lhs), Value::Bool(rhs)) => Ok(Value::Bool(lhs | rhs)),
        (BinaryOp::BitXor, Value::Bool(lhs), Value::Bool(rhs)) => Ok(Value::Bool(lhs ^ rhs)),
        (BinaryOp::Shl, Value::Integer(lhs), Value::Integer(rhs)) => {
            int_result(lhs.checked_shl(shift_amount(*rhs, span)?), span)
        }
        (BinaryOp::Shr, Value::Integer(lhs), Value::Integer(rhs)) => {
            int_result(lhs.checked_shr(shift_amount(*rhs, span)?), span)
        }

        // Invalid operations
        _ => Err(invalid(op, &left, &right, span)),
    }
}

fn invalid(op: BinaryOp, left: &Value, right: &Value, span: FileSpan) -> EvaluationError {
    EvaluationError::InvalidBinaryOp {
        left_type: left.type_name().to_string(),
        op: op.to_string(),
        right_type: right.type_name().to_string(),
        span,
    }
}

#[allow(clippy::cast_precision_loss, reason = "Mixed arithmetic promotes to float")]
fn as_float(value: &Value) -> Option<f64> {
    match value {
        Value::Integer(value) => Some(*value as f64),
        Value::Float(value) => Some(*value),
        _ => None,
    }
}

/// Ordering of numbers, strings and chars
fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(lhs), Value::Integer(rhs)) => Some(lhs.cmp(rhs)),
        (Value::String(lhs), Value::String(rhs)) => Some(lhs.cmp(rhs)),
        (Value::Char(lhs), Value::Char(rhs)) => Some(lhs.cmp(rhs)),
        _ => as_float(left)?.partial_cmp(&as_float(right)?),
    }
}

/// Evaluates a unary operation
pub(crate) fn unary(op: UnaryOp, operand: Value, span: FileSpan) -> Result<Value, EvaluationError> {
    match (op, &operand) {
        (UnaryOp::Neg, Value::Integer(value)) => int_result(value.checked_neg(), span),
        (UnaryOp::Neg, Value::Float(value)) => Ok(Value::Float(-value)),
        (UnaryOp::Not, Value::Bool(value)) => Ok(Value::Bool(!value)),
        (UnaryOp::Not, Value::Integer(value)) => Ok(Value::Integer(!value)),
        _ => Err(EvaluationError::InvalidUnaryOp {
            op: op.to_string(),
            operand_type: operand.type_name().to_string(),
            span,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(
        op: BinaryOp,
        left: impl Into<Value>,
        right: impl Into<Value>,
    ) -> Result<Value, EvaluationError> {
        binary(op, left.into(), right.into(), FileSpan::synthetic())
    }

    #[test]
    fn integer_arithmetic_is_checked() {
        assert_eq!(eval(BinaryOp::Add, 2_i64, 3_i64), Ok(Value::Integer(5)));
        assert_eq!(eval(BinaryOp::Rem, -7_i64, 3_i64), Ok(Value::Integer(-1)));
        assert!(matches!(
            eval(BinaryOp::Add, i64::MAX, 1_i64),
            Err(EvaluationError::Overflow { .. })
        ));
        assert!(matches!(
            eval(BinaryOp::Div, 1_i64, 0_i64),
            Err(EvaluationError::DivisionByZero { .. })
        ));
        assert!(matches!(
            eval(BinaryOp::Shl, 1_i64, 64_i64),
            Err(EvaluationError::Overflow { .. })
        ));
    }

    #[test]
    fn mixed_numbers_promote_to_float() {
        assert_eq!(eval(BinaryOp::Mul, 2_i64, 1.5), Ok(Value::Float(3.0)));
        assert_eq!(eval(BinaryOp::Lt, 1_i64, 1.5), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::Eq, 2.0, 2_i64), Ok(Value::Bool(true)));
    }

    #[test]
    fn float_equality_is_exact() {
        assert_eq!(eval(BinaryOp::Eq, 1e-20, 2e-20), Ok(Value::Bool(false)));
        assert_eq!(eval(BinaryOp::Ne, 1e-20, 0.0), Ok(Value::Bool(true)));
        assert_eq!(eval(BinaryOp::Eq, 0.1 + 0.2, 0.3), Ok(Value::Bool(false)));
        assert_eq!(eval(BinaryOp::Eq, 0.5, 0.5), Ok(Value::Bool(true)));
        assert_eq!(
            binary(
                BinaryOp::Eq,
                Value::Vec(vec![Value::Float(1e-20)]),
                Value::Vec(vec![Value::Float(2e-20)]),
                FileSpan::synthetic()
            ),
            eval(BinaryOp::Eq, 1e-20, 2e-20)
        );
    }

    #[test]
    fn strings_and_vecs_concatenate() {
        assert_eq!(eval(BinaryOp::Add, "Hello ", "Mio"), Ok(Value::from("Hello Mio")));
        assert_eq!(
            binary(
                BinaryOp::Add,
                Value::Vec(vec![Value::Integer(1)]),
                Value::Vec(vec![Value::Integer(2)]),
                FileSpan::synthetic()
            ),
            Ok(Value::Vec(vec![Value::Integer(1), Value::Integer(2)]))
        );
    }

    #[test]
    fn equality_is_structural_within_a_type() {
        let left = Value::Tuple(vec![Value::from("a"), Value::Integer(1)]);
        assert_eq!(
            binary(BinaryOp::Eq, left.clone(), left, FileSpan::synthetic()),
            Ok(Value::Bool(true))
        );
        assert_eq!(eval(BinaryOp::Ne, "a", "b"), Ok(Value::Bool(true)));
        assert!(matches!(
            eval(BinaryOp::Eq, "1", 1_i64),
            Err(EvaluationError::InvalidBinaryOp { .. })
        ));
    }

    #[test]
    fn invalid_operands_name_both_types() {
        let err = eval(BinaryOp::Sub, "a", true).unwrap_err();
        assert_eq!(err.to_string(), "invalid binary operation: string - bool");
    }

    #[test]
    fn unary_operators() {
        let span = FileSpan::synthetic();
        assert_eq!(unary(UnaryOp::Neg, Value::Integer(3), span), Ok(Value::Integer(-3)));
        assert_eq!(unary(UnaryOp::Not, Value::Bool(true), span), Ok(Value::Bool(false)));
        assert_eq!(unary(UnaryOp::Not, Value::Integer(0), span), Ok(Value::Integer(-1)));
        assert!(unary(UnaryOp::Neg, Value::from("x"), span).is_err());
    }
}
