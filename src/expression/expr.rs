//! Expression AST definitions.

use crate::constant::{Constant, ConstantKind};
use crate::expression::{ExpressionError, ExpressionResult, FunctionKind, Notation, TypeBinding};
use crate::query::Token;
use std::fmt;

/// Reference to an entity property, resolved later by a backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    segments: Vec<String>,
}

impl Path {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a `/` separated path such as `Datastream/name`
    pub fn parse(text: &str) -> Self {
        Self::new(text.split('/').filter(|s| !s.is_empty()))
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn first(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }

    pub fn is_simple(&self) -> bool {
        self.segments.len() == 1
    }
}

/// Segments that would not lex back as an identifier, such as `desc` or
/// `1`, are written as `"..."`
impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            if is_bare_segment(segment) {
                f.write_str(segment)?;
            } else {
                write!(f, "\"{}\"", segment.replace('"', "\"\""))?;
            }
        }
        Ok(())
    }
}

fn is_bare_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || matches!(first, '_' | '$' | '@'))
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '$' | '@' | '.'))
        && segment != "INF"
        && segment != "NaN"
        && Token::keyword_from_str(segment).is_none()
}

/// Operator or named function applied to argument expressions
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    kind: FunctionKind,
    args: Vec<Expression>,
}

impl Function {
    /// Create a function node, rejecting argument counts no binding declares
    pub fn new(kind: FunctionKind, args: Vec<Expression>) -> ExpressionResult<Self> {
        if !kind.accepts_arity(args.len()) {
            return Err(ExpressionError::Arity {
                function: kind.name().to_string(),
                expected: kind.arities(),
                actual: args.len(),
            });
        }
        Ok(Self { kind, args })
    }

    pub fn kind(&self) -> FunctionKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn args(&self) -> &[Expression] {
        &self.args
    }

    pub fn into_args(self) -> Vec<Expression> {
        self.args
    }

    /// For `x eq null` or `x ne null` with a literal null operand, the index
    /// of the operand under test and whether the check is negated
    pub fn null_check(&self) -> Option<(usize, bool)> {
        let negated = match self.kind {
            FunctionKind::Equal => false,
            FunctionKind::NotEqual => true,
            _ => return None,
        };
        match self.args.as_slice() {
            [_, right] if right.is_null_literal() => Some((0, negated)),
            [left, _] if left.is_null_literal() => Some((1, negated)),
            _ => None,
        }
    }

    /// Select the binding for the given argument kinds.
    ///
    /// Errors carry this node's canonical text.
    pub fn resolve(
        &self,
        actual: &[Option<ConstantKind>],
    ) -> ExpressionResult<&'static TypeBinding> {
        crate::expression::resolve_binding(self.kind, actual).map_err(|err| match err {
            ExpressionError::IncompatibleTypes {
                function,
                actual,
                declared,
                ..
            } => ExpressionError::IncompatibleTypes {
                function,
                expression: self.to_string(),
                actual,
                declared,
            },
            other => other,
        })
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind.notation(), self.args.as_slice()) {
            (Notation::Infix, [left, right]) => {
                write!(f, "({} {} {})", left, self.kind.name(), right)
            }
            (Notation::Prefix, [operand]) => write!(f, "({} {})", self.kind.name(), operand),
            (_, args) => {
                write!(f, "{}(", self.kind.name())?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Expression tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal constant value
    Constant(Constant),

    /// Property reference
    Path(Path),

    /// Operator or named function
    Function(Function),
}

impl Expression {
    /// Create a constant expression
    pub fn constant(value: impl Into<Constant>) -> Self {
        Expression::Constant(value.into())
    }

    pub fn null() -> Self {
        Expression::Constant(Constant::Null)
    }

    pub fn is_null_literal(&self) -> bool {
        matches!(self, Expression::Constant(Constant::Null))
    }

    /// Create a path expression from `/` separated text
    pub fn path(text: &str) -> Self {
        Expression::Path(Path::parse(text))
    }

    /// Create a function call, checking the argument count
    pub fn call(kind: FunctionKind, args: Vec<Expression>) -> ExpressionResult<Self> {
        Function::new(kind, args).map(Expression::Function)
    }

    /// Build a node for a function whose arity is known to be valid
    fn fixed(kind: FunctionKind, args: Vec<Expression>) -> Self {
        debug_assert!(kind.accepts_arity(args.len()));
        Expression::Function(Function { kind, args })
    }

    pub fn eq(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::Equal, vec![left, right])
    }

    pub fn ne(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::NotEqual, vec![left, right])
    }

    pub fn lt(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::LessThan, vec![left, right])
    }

    pub fn le(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::LessEqual, vec![left, right])
    }

    pub fn gt(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::GreaterThan, vec![left, right])
    }

    pub fn ge(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::GreaterEqual, vec![left, right])
    }

    pub fn and(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::And, vec![left, right])
    }

    pub fn or(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::Or, vec![left, right])
    }

    pub fn not_expr(operand: Expression) -> Self {
        Self::fixed(FunctionKind::Not, vec![operand])
    }

    pub fn add_expr(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::Add, vec![left, right])
    }

    pub fn sub_expr(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::Sub, vec![left, right])
    }

    pub fn mul_expr(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::Mul, vec![left, right])
    }

    pub fn div_expr(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::Div, vec![left, right])
    }

    pub fn mod_expr(left: Expression, right: Expression) -> Self {
        Self::fixed(FunctionKind::Mod, vec![left, right])
    }

    pub fn floor(operand: Expression) -> Self {
        Self::fixed(FunctionKind::Floor, vec![operand])
    }

    /// Check if this expression is a constant (contains no path references)
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Constant(_) => true,
            Expression::Path(_) => false,
            Expression::Function(function) => function.args.iter().all(Expression::is_constant),
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            Expression::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Normalized, reparsable text of this tree.
    ///
    /// Binary operators are always parenthesized, so the text does not depend
    /// on how the original query was formatted.
    pub fn to_canonical_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(c) => write!(f, "{}", c),
            Expression::Path(p) => write!(f, "{}", p),
            Expression::Function(func) => write!(f, "{}", func),
        }
    }
}

impl From<Constant> for Expression {
    fn from(value: Constant) -> Self {
        Expression::Constant(value)
    }
}

impl From<Path> for Expression {
    fn from(value: Path) -> Self {
        Expression::Path(value)
    }
}

impl From<Function> for Expression {
    fn from(value: Function) -> Self {
        Expression::Function(value)
    }
}
