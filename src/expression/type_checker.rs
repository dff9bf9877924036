//! Static type checking for expression trees.

use crate::constant::ConstantKind;
use crate::expression::{Expression, ExpressionError, ExpressionResult, Path};
use crate::model::EntityModel;
use crate::query::OrderBy;

/// Type checker for expressions
pub struct TypeChecker<'a> {
    /// Model declaring property kinds; without one every path is runtime-typed
    model: Option<&'a EntityModel>,
    /// Reject paths the model does not declare
    strict_paths: bool,
}

impl<'a> TypeChecker<'a> {
    /// Checker without a model
    pub fn new() -> Self {
        Self {
            model: None,
            strict_paths: false,
        }
    }

    /// Checker validating paths against `model`
    pub fn with_model(model: &'a EntityModel) -> Self {
        Self {
            model: Some(model),
            strict_paths: true,
        }
    }

    pub fn strict_paths(mut self, strict: bool) -> Self {
        self.strict_paths = strict;
        self
    }

    /// Type check an expression and return its static kind.
    ///
    /// `None` means the kind is only known at runtime.
    pub fn check(&self, expr: &Expression) -> ExpressionResult<Option<ConstantKind>> {
        match expr {
            Expression::Constant(constant) => Ok(Some(constant.kind())),

            Expression::Path(path) => self.check_path(path),

            Expression::Function(function) => {
                let kinds = function
                    .args()
                    .iter()
                    .map(|arg| self.check(arg))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                let binding = function.resolve(&kinds)?;
                Ok(Some(binding.returns()))
            }
        }
    }

    fn check_path(&self, path: &Path) -> ExpressionResult<Option<ConstantKind>> {
        let Some(model) = self.model else {
            return Ok(None);
        };
        match model.property(path) {
            Some(def) => Ok(def.kind),
            None if self.strict_paths => Err(ExpressionError::UnknownPath {
                path: path.to_string(),
            }),
            None => Ok(None),
        }
    }

    /// Check that `expr` is usable as a `$filter`: it must yield a boolean
    pub fn check_filter_predicate(&self, expr: &Expression) -> ExpressionResult<()> {
        match self.check(expr)? {
            None | Some(ConstantKind::Boolean) | Some(ConstantKind::Null) => Ok(()),
            Some(kind) => Err(ExpressionError::IncompatibleTypes {
                function: "$filter".to_string(),
                expression: expr.to_canonical_text(),
                actual: vec![kind.to_string()],
                declared: vec![ConstantKind::Boolean.to_string()],
            }),
        }
    }

    /// Check `$orderby` items: each must type check and yield an ordered kind
    pub fn check_order_by(&self, items: &[OrderBy]) -> ExpressionResult<()> {
        for item in items {
            match self.check(&item.expression)? {
                Some(kind @ ConstantKind::Geometry) => {
                    return Err(ExpressionError::IncompatibleTypes {
                        function: "$orderby".to_string(),
                        expression: item.expression.to_canonical_text(),
                        actual: vec![kind.to_string()],
                        declared: vec!["any ordered kind".to_string()],
                    });
                }
                _ => continue,
            }
        }
        Ok(())
    }

    /// Check `$select` paths against the model
    pub fn check_select(&self, paths: &[Path]) -> ExpressionResult<()> {
        for path in paths {
            self.check_path(path)?;
        }
        Ok(())
    }
}

impl Default for TypeChecker<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type check an expression against an optional model
pub fn type_check_expression(
    expr: &Expression,
    model: Option<&EntityModel>,
) -> ExpressionResult<Option<ConstantKind>> {
    match model {
        Some(model) => TypeChecker::with_model(model).check(expr),
        None => TypeChecker::new().check(expr),
    }
}

/// Validate that an expression is a well-typed filter predicate
pub fn validate_filter_predicate(
    expr: &Expression,
    model: Option<&EntityModel>,
) -> ExpressionResult<()> {
    match model {
        Some(model) => TypeChecker::with_model(model).check_filter_predicate(expr),
        None => TypeChecker::new().check_filter_predicate(expr),
    }
}
