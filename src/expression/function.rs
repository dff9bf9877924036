//! Function kinds: operators and named functions.
//!
//! Operators and named functions are the same node type; they differ only in
//! how their canonical text is rendered.

use crate::expression::binding;
use crate::expression::TypeBinding;

/// Every function the engine understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {
    // Comparison
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Logical
    And,
    Or,
    Not,

    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Math
    Floor,
    Ceiling,
    Round,

    // String
    Length,
    ToLower,
    ToUpper,
    Trim,
    Concat,
    SubstringOf,
    StartsWith,
    EndsWith,
    IndexOf,
    Substring,

    // Date
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    FractionalSeconds,

    // Geo
    StEquals,
}

/// How a function renders in canonical text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    /// `(left op right)`
    Infix,
    /// `(op operand)`
    Prefix,
    /// `name(arg,...)`
    Call,
}

/// What a function does when one of its arguments is null
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullHandling {
    /// Result is null
    Propagate,
    /// Result is `false`
    False,
    /// The evaluation itself handles null operands
    Evaluate,
}

impl FunctionKind {
    pub const ALL: &'static [FunctionKind] = &[
        FunctionKind::Equal,
        FunctionKind::NotEqual,
        FunctionKind::LessThan,
        FunctionKind::LessEqual,
        FunctionKind::GreaterThan,
        FunctionKind::GreaterEqual,
        FunctionKind::And,
        FunctionKind::Or,
        FunctionKind::Not,
        FunctionKind::Add,
        FunctionKind::Sub,
        FunctionKind::Mul,
        FunctionKind::Div,
        FunctionKind::Mod,
        FunctionKind::Floor,
        FunctionKind::Ceiling,
        FunctionKind::Round,
        FunctionKind::Length,
        FunctionKind::ToLower,
        FunctionKind::ToUpper,
        FunctionKind::Trim,
        FunctionKind::Concat,
        FunctionKind::SubstringOf,
        FunctionKind::StartsWith,
        FunctionKind::EndsWith,
        FunctionKind::IndexOf,
        FunctionKind::Substring,
        FunctionKind::Year,
        FunctionKind::Month,
        FunctionKind::Day,
        FunctionKind::Hour,
        FunctionKind::Minute,
        FunctionKind::Second,
        FunctionKind::FractionalSeconds,
        FunctionKind::StEquals,
    ];

    /// Canonical name, used both as the infix keyword and the call name
    pub fn name(self) -> &'static str {
        match self {
            FunctionKind::Equal => "eq",
            FunctionKind::NotEqual => "ne",
            FunctionKind::LessThan => "lt",
            FunctionKind::LessEqual => "le",
            FunctionKind::GreaterThan => "gt",
            FunctionKind::GreaterEqual => "ge",
            FunctionKind::And => "and",
            FunctionKind::Or => "or",
            FunctionKind::Not => "not",
            FunctionKind::Add => "add",
            FunctionKind::Sub => "sub",
            FunctionKind::Mul => "mul",
            FunctionKind::Div => "div",
            FunctionKind::Mod => "mod",
            FunctionKind::Floor => "floor",
            FunctionKind::Ceiling => "ceiling",
            FunctionKind::Round => "round",
            FunctionKind::Length => "length",
            FunctionKind::ToLower => "tolower",
            FunctionKind::ToUpper => "toupper",
            FunctionKind::Trim => "trim",
            FunctionKind::Concat => "concat",
            FunctionKind::SubstringOf => "substringof",
            FunctionKind::StartsWith => "startswith",
            FunctionKind::EndsWith => "endswith",
            FunctionKind::IndexOf => "indexof",
            FunctionKind::Substring => "substring",
            FunctionKind::Year => "year",
            FunctionKind::Month => "month",
            FunctionKind::Day => "day",
            FunctionKind::Hour => "hour",
            FunctionKind::Minute => "minute",
            FunctionKind::Second => "second",
            FunctionKind::FractionalSeconds => "fractionalseconds",
            FunctionKind::StEquals => "st_equals",
        }
    }

    pub fn notation(self) -> Notation {
        if self.is_comparison()
            || self.is_arithmetic()
            || matches!(self, FunctionKind::And | FunctionKind::Or)
        {
            Notation::Infix
        } else if self == FunctionKind::Not {
            Notation::Prefix
        } else {
            Notation::Call
        }
    }

    pub fn null_handling(self) -> NullHandling {
        match self {
            FunctionKind::Equal | FunctionKind::And | FunctionKind::Or | FunctionKind::Not => {
                NullHandling::Evaluate
            }
            FunctionKind::NotEqual
            | FunctionKind::LessThan
            | FunctionKind::LessEqual
            | FunctionKind::GreaterThan
            | FunctionKind::GreaterEqual => NullHandling::False,
            _ => NullHandling::Propagate,
        }
    }

    pub fn is_equality(self) -> bool {
        matches!(self, FunctionKind::Equal | FunctionKind::NotEqual)
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            FunctionKind::Equal
                | FunctionKind::NotEqual
                | FunctionKind::LessThan
                | FunctionKind::LessEqual
                | FunctionKind::GreaterThan
                | FunctionKind::GreaterEqual
        )
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            FunctionKind::Add
                | FunctionKind::Sub
                | FunctionKind::Mul
                | FunctionKind::Div
                | FunctionKind::Mod
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, FunctionKind::And | FunctionKind::Or | FunctionKind::Not)
    }

    /// Declared type bindings in resolution order
    pub fn bindings(self) -> &'static [TypeBinding] {
        binding::bindings_for(self)
    }

    /// Distinct argument counts across all declared bindings, ascending
    pub fn arities(self) -> Vec<usize> {
        let mut arities: Vec<usize> = self.bindings().iter().map(|b| b.arity()).collect();
        arities.sort_unstable();
        arities.dedup();
        arities
    }

    pub fn accepts_arity(self, arity: usize) -> bool {
        self.bindings().iter().any(|b| b.arity() == arity)
    }
}
