//! Function evaluation and constant folding.

use crate::constant::{Constant, ConstantKind};
use crate::expression::{
    Expression, ExpressionResult, ExpressionVisitor, Function, NullHandling, Path,
};
use log::trace;

/// Evaluate a function node over its already evaluated arguments.
///
/// The binding is resolved from the actual argument kinds. An `eq`/`ne`
/// against a literal null tests the other operand for null. Otherwise null
/// arguments follow the function's null rule, and the selected binding's
/// typed evaluation runs on the widened arguments.
pub fn evaluate_function(function: &Function, args: Vec<Constant>) -> ExpressionResult<Constant> {
    let kinds: Vec<Option<ConstantKind>> = args.iter().map(|arg| Some(arg.kind())).collect();
    let binding = function.resolve(&kinds)?;

    if let Some((operand, negated)) = function.null_check() {
        let is_null = args.get(operand).is_some_and(Constant::is_null);
        return Ok(Constant::Boolean(is_null != negated));
    }

    if args.iter().any(Constant::is_null) {
        match function.kind().null_handling() {
            NullHandling::Propagate => return Ok(Constant::Null),
            NullHandling::False => return Ok(Constant::Boolean(false)),
            NullHandling::Evaluate => {}
        }
    }

    binding.invoke(args)
}

/// Replaces every function whose arguments are all constants by its value
#[derive(Debug, Default)]
pub struct ConstantFolder;

impl ExpressionVisitor for ConstantFolder {
    type Output = Expression;

    fn visit_constant(&mut self, constant: &Constant) -> ExpressionResult<Expression> {
        Ok(Expression::Constant(constant.clone()))
    }

    fn visit_path(&mut self, path: &Path) -> ExpressionResult<Expression> {
        Ok(Expression::Path(path.clone()))
    }

    fn visit_function(&mut self, function: &Function) -> ExpressionResult<Expression> {
        let args = function
            .args()
            .iter()
            .map(|arg| {
                let folded = arg.accept(self)?;
                // A computed null under eq/ne must not become a literal null check
                if function.kind().is_equality() && folded.is_null_literal() {
                    return Ok(arg.clone());
                }
                Ok(folded)
            })
            .collect::<ExpressionResult<Vec<_>>>()?;

        if args.iter().all(|arg| matches!(arg, Expression::Constant(_))) {
            let values = args
                .into_iter()
                .filter_map(|arg| match arg {
                    Expression::Constant(c) => Some(c),
                    _ => None,
                })
                .collect();
            let value = evaluate_function(function, values)?;
            trace!("folded {} to {}", function, value);
            return Ok(Expression::Constant(value));
        }

        Expression::call(function.kind(), args)
    }
}

/// Fold all constant sub-expressions of `expr`
pub fn fold(expr: &Expression) -> ExpressionResult<Expression> {
    expr.accept(&mut ConstantFolder)
}
