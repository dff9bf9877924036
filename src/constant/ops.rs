//! Free functions over constants.
//!
//! Function evaluation calls these instead of methods on `Constant` so that
//! every operand is treated the same way. Null operands propagate, except in
//! the three-valued logical operators and in `equals`, which treats null as a
//! value.

use crate::constant::Constant;
use crate::expression::{ExpressionError, ExpressionResult};
use log::debug;
use std::cmp::Ordering;

/// Arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arithmetic {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl Arithmetic {
    fn as_str(self) -> &'static str {
        match self {
            Arithmetic::Add => "add",
            Arithmetic::Sub => "sub",
            Arithmetic::Mul => "mul",
            Arithmetic::Div => "div",
            Arithmetic::Mod => "mod",
        }
    }
}

/// Logical negation
pub fn not(value: &Constant) -> ExpressionResult<Constant> {
    match value {
        Constant::Null => Ok(Constant::Null),
        Constant::Boolean(b) => Ok(Constant::Boolean(!b)),
        other => Err(operand_error("not", &[other])),
    }
}

/// Three-valued AND: NULL AND false = false, NULL AND true = NULL
pub fn and(left: &Constant, right: &Constant) -> ExpressionResult<Constant> {
    match (left, right) {
        (Constant::Boolean(false), _) | (_, Constant::Boolean(false)) => {
            Ok(Constant::Boolean(false))
        }
        (Constant::Boolean(true), Constant::Boolean(true)) => Ok(Constant::Boolean(true)),
        (Constant::Null | Constant::Boolean(true), Constant::Null | Constant::Boolean(true)) => {
            Ok(Constant::Null)
        }
        _ => Err(operand_error("and", &[left, right])),
    }
}

/// Three-valued OR: NULL OR true = true, NULL OR false = NULL
pub fn or(left: &Constant, right: &Constant) -> ExpressionResult<Constant> {
    match (left, right) {
        (Constant::Boolean(true), _) | (_, Constant::Boolean(true)) => Ok(Constant::Boolean(true)),
        (Constant::Boolean(false), Constant::Boolean(false)) => Ok(Constant::Boolean(false)),
        (Constant::Null | Constant::Boolean(false), Constant::Null | Constant::Boolean(false)) => {
            Ok(Constant::Null)
        }
        _ => Err(operand_error("or", &[left, right])),
    }
}

/// Apply an arithmetic operator.
///
/// Two integers stay integral; any other numeric pair is computed on widened
/// doubles. Integer overflow and integer division by zero yield null.
pub fn arithmetic(op: Arithmetic, left: &Constant, right: &Constant) -> ExpressionResult<Constant> {
    match (left, right) {
        (Constant::Null, _) | (_, Constant::Null) => Ok(Constant::Null),
        (Constant::Integer(a), Constant::Integer(b)) => {
            let result = match op {
                Arithmetic::Add => a.checked_add(*b),
                Arithmetic::Sub => a.checked_sub(*b),
                Arithmetic::Mul => a.checked_mul(*b),
                Arithmetic::Div => a.checked_div(*b),
                Arithmetic::Mod => a.checked_rem(*b),
            };
            Ok(match result {
                Some(value) => Constant::Integer(value),
                None => {
                    debug!("integer {} of {} and {} has no result, folding to null", op.as_str(), a, b);
                    Constant::Null
                }
            })
        }
        _ => match (left.as_f64(), right.as_f64()) {
            (Some(a), Some(b)) => Ok(Constant::Double(match op {
                Arithmetic::Add => a + b,
                Arithmetic::Sub => a - b,
                Arithmetic::Mul => a * b,
                Arithmetic::Div => a / b,
                Arithmetic::Mod => a % b,
            })),
            _ => Err(operand_error(op.as_str(), &[left, right])),
        },
    }
}

/// String concatenation
pub fn concat(left: &Constant, right: &Constant) -> ExpressionResult<Constant> {
    match (left, right) {
        (Constant::Null, _) | (_, Constant::Null) => Ok(Constant::Null),
        (Constant::String(a), Constant::String(b)) => Ok(Constant::String(format!("{}{}", a, b))),
        _ => Err(operand_error("concat", &[left, right])),
    }
}

/// Ordering between two constants, `None` when either is null or the kinds
/// are not mutually comparable
pub fn compare(left: &Constant, right: &Constant) -> Option<Ordering> {
    left.partial_cmp(right)
}

/// Value equality where null equals null
pub fn equals(left: &Constant, right: &Constant) -> bool {
    left == right
}

fn operand_error(operator: &str, operands: &[&Constant]) -> ExpressionError {
    ExpressionError::Evaluation {
        message: format!(
            "operator {} cannot be applied to ({})",
            operator,
            operands
                .iter()
                .map(|c| c.kind().as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}
