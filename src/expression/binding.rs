//! Function type bindings.
//!
//! Every function declares an ordered list of accepted argument-kind tuples.
//! Resolution picks the first binding the actual kinds fit, so within each
//! table narrower bindings come before wider ones (integer before double).
//! The order of every table below is part of the function's contract.

use crate::constant::ops::{self, Arithmetic};
use crate::constant::{Constant, ConstantKind as K};
use crate::expression::{ExpressionError, ExpressionResult, FunctionKind};
use chrono::{DateTime, Datelike, FixedOffset, Timelike};
use std::cmp::Ordering;
use std::fmt;

/// Typed evaluation entry point of one binding
pub type EvalFn = fn(&[Constant]) -> ExpressionResult<Constant>;

/// One declared overload of a function
#[derive(Clone, Copy)]
pub struct TypeBinding {
    params: &'static [K],
    returns: K,
    eval: EvalFn,
}

impl TypeBinding {
    pub const fn new(params: &'static [K], returns: K, eval: EvalFn) -> Self {
        Self {
            params,
            returns,
            eval,
        }
    }

    pub fn params(&self) -> &'static [K] {
        self.params
    }

    pub fn returns(&self) -> K {
        self.returns
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Test structural compatibility with the actual argument kinds.
    ///
    /// `None` marks a runtime-typed argument (a property path) and a null
    /// argument fits any parameter; both are accepted at every position.
    pub fn accepts(&self, actual: &[Option<K>]) -> bool {
        actual.len() == self.params.len()
            && self
                .params
                .iter()
                .zip(actual)
                .all(|(param, actual)| match actual {
                    None | Some(K::Null) => true,
                    Some(kind) => kind.widens_to(*param),
                })
    }

    /// Widen the arguments to the declared parameter kinds and evaluate
    pub fn invoke(&self, args: Vec<Constant>) -> ExpressionResult<Constant> {
        if args.len() != self.params.len() {
            return Err(ExpressionError::Evaluation {
                message: format!(
                    "binding {} invoked with {} arguments",
                    self,
                    args.len()
                ),
            });
        }
        let args: Vec<Constant> = args
            .into_iter()
            .zip(self.params)
            .map(|(arg, param)| arg.widen_to(*param))
            .collect();
        (self.eval)(&args)
    }
}

impl fmt::Display for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<&str> = self.params.iter().map(|k| k.as_str()).collect();
        write!(f, "({}) -> {}", params.join(", "), self.returns)
    }
}

impl fmt::Debug for TypeBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeBinding{}", self)
    }
}

/// Bindings for the equality operators: every kind compares with itself
macro_rules! equality_bindings {
    ($eval:expr) => {
        [
            TypeBinding::new(&[K::Integer, K::Integer], K::Boolean, $eval),
            TypeBinding::new(&[K::Double, K::Double], K::Boolean, $eval),
            TypeBinding::new(&[K::String, K::String], K::Boolean, $eval),
            TypeBinding::new(&[K::Boolean, K::Boolean], K::Boolean, $eval),
            TypeBinding::new(&[K::DateTime, K::DateTime], K::Boolean, $eval),
            TypeBinding::new(&[K::Interval, K::Interval], K::Boolean, $eval),
            TypeBinding::new(&[K::Geometry, K::Geometry], K::Boolean, $eval),
        ]
    };
}

/// Bindings for the ordering operators: numeric, string and temporal pairs
macro_rules! ordering_bindings {
    ($eval:expr) => {
        [
            TypeBinding::new(&[K::Integer, K::Integer], K::Boolean, $eval),
            TypeBinding::new(&[K::Double, K::Double], K::Boolean, $eval),
            TypeBinding::new(&[K::String, K::String], K::Boolean, $eval),
            TypeBinding::new(&[K::DateTime, K::DateTime], K::Boolean, $eval),
            TypeBinding::new(&[K::Interval, K::Interval], K::Boolean, $eval),
        ]
    };
}

/// Integer arithmetic first so two integers keep an integral result
macro_rules! arithmetic_bindings {
    ($eval:expr) => {
        [
            TypeBinding::new(&[K::Integer, K::Integer], K::Integer, $eval),
            TypeBinding::new(&[K::Double, K::Double], K::Double, $eval),
        ]
    };
}

static EQUAL: [TypeBinding; 7] = equality_bindings!(eval_equal);
static NOT_EQUAL: [TypeBinding; 7] = equality_bindings!(eval_not_equal);
static LESS_THAN: [TypeBinding; 5] = ordering_bindings!(eval_less_than);
static LESS_EQUAL: [TypeBinding; 5] = ordering_bindings!(eval_less_equal);
static GREATER_THAN: [TypeBinding; 5] = ordering_bindings!(eval_greater_than);
static GREATER_EQUAL: [TypeBinding; 5] = ordering_bindings!(eval_greater_equal);

static AND: [TypeBinding; 1] = [TypeBinding::new(
    &[K::Boolean, K::Boolean],
    K::Boolean,
    eval_and,
)];
static OR: [TypeBinding; 1] = [TypeBinding::new(
    &[K::Boolean, K::Boolean],
    K::Boolean,
    eval_or,
)];
static NOT: [TypeBinding; 1] = [TypeBinding::new(&[K::Boolean], K::Boolean, eval_not)];

static ADD: [TypeBinding; 2] = arithmetic_bindings!(eval_add);
static SUB: [TypeBinding; 2] = arithmetic_bindings!(eval_sub);
static MUL: [TypeBinding; 2] = arithmetic_bindings!(eval_mul);
static DIV: [TypeBinding; 2] = arithmetic_bindings!(eval_div);
static MOD: [TypeBinding; 2] = arithmetic_bindings!(eval_mod);

static FLOOR: [TypeBinding; 1] = [TypeBinding::new(&[K::Double], K::Double, eval_floor)];
static CEILING: [TypeBinding; 1] = [TypeBinding::new(&[K::Double], K::Double, eval_ceiling)];
static ROUND: [TypeBinding; 1] = [TypeBinding::new(&[K::Double], K::Double, eval_round)];

static LENGTH: [TypeBinding; 1] = [TypeBinding::new(&[K::String], K::Integer, eval_length)];
static TO_LOWER: [TypeBinding; 1] = [TypeBinding::new(&[K::String], K::String, eval_to_lower)];
static TO_UPPER: [TypeBinding; 1] = [TypeBinding::new(&[K::String], K::String, eval_to_upper)];
static TRIM: [TypeBinding; 1] = [TypeBinding::new(&[K::String], K::String, eval_trim)];
static CONCAT: [TypeBinding; 1] = [TypeBinding::new(
    &[K::String, K::String],
    K::String,
    eval_concat,
)];
static SUBSTRING_OF: [TypeBinding; 1] = [TypeBinding::new(
    &[K::String, K::String],
    K::Boolean,
    eval_substring_of,
)];
static STARTS_WITH: [TypeBinding; 1] = [TypeBinding::new(
    &[K::String, K::String],
    K::Boolean,
    eval_starts_with,
)];
static ENDS_WITH: [TypeBinding; 1] = [TypeBinding::new(
    &[K::String, K::String],
    K::Boolean,
    eval_ends_with,
)];
static INDEX_OF: [TypeBinding; 1] = [TypeBinding::new(
    &[K::String, K::String],
    K::Integer,
    eval_index_of,
)];
static SUBSTRING: [TypeBinding; 2] = [
    TypeBinding::new(&[K::String, K::Integer], K::String, eval_substring),
    TypeBinding::new(
        &[K::String, K::Integer, K::Integer],
        K::String,
        eval_substring,
    ),
];

static YEAR: [TypeBinding; 1] = [TypeBinding::new(&[K::DateTime], K::Integer, eval_year)];
static MONTH: [TypeBinding; 1] = [TypeBinding::new(&[K::DateTime], K::Integer, eval_month)];
static DAY: [TypeBinding; 1] = [TypeBinding::new(&[K::DateTime], K::Integer, eval_day)];
static HOUR: [TypeBinding; 1] = [TypeBinding::new(&[K::DateTime], K::Integer, eval_hour)];
static MINUTE: [TypeBinding; 1] = [TypeBinding::new(&[K::DateTime], K::Integer, eval_minute)];
static SECOND: [TypeBinding; 1] = [TypeBinding::new(&[K::DateTime], K::Integer, eval_second)];
static FRACTIONAL_SECONDS: [TypeBinding; 1] = [TypeBinding::new(
    &[K::DateTime],
    K::Double,
    eval_fractional_seconds,
)];

static ST_EQUALS: [TypeBinding; 1] = [TypeBinding::new(
    &[K::Geometry, K::Geometry],
    K::Boolean,
    eval_st_equals,
)];

/// Look up the binding table of a function
pub fn bindings_for(kind: FunctionKind) -> &'static [TypeBinding] {
    match kind {
        FunctionKind::Equal => &EQUAL,
        FunctionKind::NotEqual => &NOT_EQUAL,
        FunctionKind::LessThan => &LESS_THAN,
        FunctionKind::LessEqual => &LESS_EQUAL,
        FunctionKind::GreaterThan => &GREATER_THAN,
        FunctionKind::GreaterEqual => &GREATER_EQUAL,
        FunctionKind::And => &AND,
        FunctionKind::Or => &OR,
        FunctionKind::Not => &NOT,
        FunctionKind::Add => &ADD,
        FunctionKind::Sub => &SUB,
        FunctionKind::Mul => &MUL,
        FunctionKind::Div => &DIV,
        FunctionKind::Mod => &MOD,
        FunctionKind::Floor => &FLOOR,
        FunctionKind::Ceiling => &CEILING,
        FunctionKind::Round => &ROUND,
        FunctionKind::Length => &LENGTH,
        FunctionKind::ToLower => &TO_LOWER,
        FunctionKind::ToUpper => &TO_UPPER,
        FunctionKind::Trim => &TRIM,
        FunctionKind::Concat => &CONCAT,
        FunctionKind::SubstringOf => &SUBSTRING_OF,
        FunctionKind::StartsWith => &STARTS_WITH,
        FunctionKind::EndsWith => &ENDS_WITH,
        FunctionKind::IndexOf => &INDEX_OF,
        FunctionKind::Substring => &SUBSTRING,
        FunctionKind::Year => &YEAR,
        FunctionKind::Month => &MONTH,
        FunctionKind::Day => &DAY,
        FunctionKind::Hour => &HOUR,
        FunctionKind::Minute => &MINUTE,
        FunctionKind::Second => &SECOND,
        FunctionKind::FractionalSeconds => &FRACTIONAL_SECONDS,
        FunctionKind::StEquals => &ST_EQUALS,
    }
}

fn unary(args: &[Constant]) -> ExpressionResult<&Constant> {
    match args {
        [arg] => Ok(arg),
        _ => Err(argument_count_error(1, args.len())),
    }
}

fn binary(args: &[Constant]) -> ExpressionResult<(&Constant, &Constant)> {
    match args {
        [left, right] => Ok((left, right)),
        _ => Err(argument_count_error(2, args.len())),
    }
}

fn argument_count_error(expected: usize, actual: usize) -> ExpressionError {
    ExpressionError::Evaluation {
        message: format!("expected {} evaluated arguments, got {}", expected, actual),
    }
}

fn kind_error(expected: K, actual: &Constant) -> ExpressionError {
    ExpressionError::Evaluation {
        message: format!("expected {} argument, got {}", expected, actual.kind()),
    }
}

fn double_arg(arg: &Constant) -> ExpressionResult<f64> {
    match arg {
        Constant::Double(v) => Ok(*v),
        other => Err(kind_error(K::Double, other)),
    }
}

fn integer_arg(arg: &Constant) -> ExpressionResult<i64> {
    arg.as_i64().ok_or_else(|| kind_error(K::Integer, arg))
}

fn string_arg(arg: &Constant) -> ExpressionResult<&str> {
    arg.as_str().ok_or_else(|| kind_error(K::String, arg))
}

fn datetime_arg(arg: &Constant) -> ExpressionResult<&DateTime<FixedOffset>> {
    arg.as_datetime().ok_or_else(|| kind_error(K::DateTime, arg))
}

fn eval_equal(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    Ok(Constant::Boolean(ops::equals(left, right)))
}

fn eval_not_equal(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    Ok(Constant::Boolean(!ops::equals(left, right)))
}

fn eval_ordering(args: &[Constant], accept: fn(Ordering) -> bool) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    Ok(Constant::Boolean(
        ops::compare(left, right).is_some_and(accept),
    ))
}

fn eval_less_than(args: &[Constant]) -> ExpressionResult<Constant> {
    eval_ordering(args, Ordering::is_lt)
}

fn eval_less_equal(args: &[Constant]) -> ExpressionResult<Constant> {
    eval_ordering(args, Ordering::is_le)
}

fn eval_greater_than(args: &[Constant]) -> ExpressionResult<Constant> {
    eval_ordering(args, Ordering::is_gt)
}

fn eval_greater_equal(args: &[Constant]) -> ExpressionResult<Constant> {
    eval_ordering(args, Ordering::is_ge)
}

fn eval_and(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::and(left, right)
}

fn eval_or(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::or(left, right)
}

fn eval_not(args: &[Constant]) -> ExpressionResult<Constant> {
    ops::not(unary(args)?)
}

fn eval_add(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::arithmetic(Arithmetic::Add, left, right)
}

fn eval_sub(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::arithmetic(Arithmetic::Sub, left, right)
}

fn eval_mul(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::arithmetic(Arithmetic::Mul, left, right)
}

fn eval_div(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::arithmetic(Arithmetic::Div, left, right)
}

fn eval_mod(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::arithmetic(Arithmetic::Mod, left, right)
}

fn eval_floor(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Double(double_arg(unary(args)?)?.floor()))
}

fn eval_ceiling(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Double(double_arg(unary(args)?)?.ceil()))
}

fn eval_round(args: &[Constant]) -> ExpressionResult<Constant> {
    // Half away from zero
    Ok(Constant::Double(double_arg(unary(args)?)?.round()))
}

fn eval_length(args: &[Constant]) -> ExpressionResult<Constant> {
    let s = string_arg(unary(args)?)?;
    Ok(Constant::Integer(s.chars().count() as i64))
}

fn eval_to_lower(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::String(string_arg(unary(args)?)?.to_lowercase()))
}

fn eval_to_upper(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::String(string_arg(unary(args)?)?.to_uppercase()))
}

fn eval_trim(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::String(string_arg(unary(args)?)?.trim().to_string()))
}

fn eval_concat(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    ops::concat(left, right)
}

/// `substringof(needle, haystack)`
fn eval_substring_of(args: &[Constant]) -> ExpressionResult<Constant> {
    let (needle, haystack) = binary(args)?;
    Ok(Constant::Boolean(
        string_arg(haystack)?.contains(string_arg(needle)?),
    ))
}

fn eval_starts_with(args: &[Constant]) -> ExpressionResult<Constant> {
    let (s, prefix) = binary(args)?;
    Ok(Constant::Boolean(
        string_arg(s)?.starts_with(string_arg(prefix)?),
    ))
}

fn eval_ends_with(args: &[Constant]) -> ExpressionResult<Constant> {
    let (s, suffix) = binary(args)?;
    Ok(Constant::Boolean(string_arg(s)?.ends_with(string_arg(suffix)?)))
}

/// Zero-based character index of the first occurrence, or -1
fn eval_index_of(args: &[Constant]) -> ExpressionResult<Constant> {
    let (s, needle) = binary(args)?;
    let s = string_arg(s)?;
    let index = match s.find(string_arg(needle)?) {
        Some(byte_idx) => s[..byte_idx].chars().count() as i64,
        None => -1,
    };
    Ok(Constant::Integer(index))
}

/// `substring(s, start)` and `substring(s, start, length)`, by character
fn eval_substring(args: &[Constant]) -> ExpressionResult<Constant> {
    let (s, start, length) = match args {
        [s, start] => (string_arg(s)?, integer_arg(start)?, None),
        [s, start, length] => (
            string_arg(s)?,
            integer_arg(start)?,
            Some(integer_arg(length)?),
        ),
        _ => return Err(argument_count_error(3, args.len())),
    };
    let start = usize::try_from(start.max(0)).unwrap_or(usize::MAX);
    let chars = s.chars().skip(start);
    let result: String = match length {
        Some(length) => chars
            .take(usize::try_from(length.max(0)).unwrap_or(usize::MAX))
            .collect(),
        None => chars.collect(),
    };
    Ok(Constant::String(result))
}

fn eval_year(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Integer(datetime_arg(unary(args)?)?.year() as i64))
}

fn eval_month(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Integer(datetime_arg(unary(args)?)?.month() as i64))
}

fn eval_day(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Integer(datetime_arg(unary(args)?)?.day() as i64))
}

fn eval_hour(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Integer(datetime_arg(unary(args)?)?.hour() as i64))
}

fn eval_minute(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Integer(datetime_arg(unary(args)?)?.minute() as i64))
}

fn eval_second(args: &[Constant]) -> ExpressionResult<Constant> {
    Ok(Constant::Integer(datetime_arg(unary(args)?)?.second() as i64))
}

fn eval_fractional_seconds(args: &[Constant]) -> ExpressionResult<Constant> {
    let nanos = datetime_arg(unary(args)?)?.nanosecond();
    Ok(Constant::Double(nanos as f64 / 1_000_000_000.0))
}

fn eval_st_equals(args: &[Constant]) -> ExpressionResult<Constant> {
    let (left, right) = binary(args)?;
    let a = left
        .as_geometry()
        .ok_or_else(|| kind_error(K::Geometry, left))?;
    let b = right
        .as_geometry()
        .ok_or_else(|| kind_error(K::Geometry, right))?;
    Ok(Constant::Boolean(a == b))
}
