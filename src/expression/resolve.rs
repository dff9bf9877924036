//! Overload resolution.
//!
//! Matches actual argument kinds against a function's declared bindings. The
//! first structurally compatible binding in declaration order wins; there is
//! no further specificity ranking.

use crate::constant::ConstantKind;
use crate::expression::{ExpressionError, ExpressionResult, FunctionKind, TypeBinding};
use log::trace;

/// Select the binding of `kind` for the given argument kinds.
///
/// `None` marks a runtime-typed argument. Fails with `Arity` when no binding
/// declares this many arguments and with `IncompatibleTypes` when none of the
/// bindings of that arity fits.
pub fn resolve_binding(
    kind: FunctionKind,
    actual: &[Option<ConstantKind>],
) -> ExpressionResult<&'static TypeBinding> {
    if !kind.accepts_arity(actual.len()) {
        return Err(ExpressionError::Arity {
            function: kind.name().to_string(),
            expected: kind.arities(),
            actual: actual.len(),
        });
    }

    match kind.bindings().iter().find(|b| b.accepts(actual)) {
        Some(binding) => {
            trace!("{} resolved to {}", kind.name(), binding);
            Ok(binding)
        }
        None => {
            let actual = describe_kinds(actual);
            Err(ExpressionError::IncompatibleTypes {
                function: kind.name().to_string(),
                expression: format!("{}({})", kind.name(), actual.join(",")),
                actual,
                declared: kind.bindings().iter().map(|b| b.to_string()).collect(),
            })
        }
    }
}

fn describe_kinds(actual: &[Option<ConstantKind>]) -> Vec<String> {
    actual
        .iter()
        .map(|kind| match kind {
            Some(kind) => kind.as_str().to_string(),
            None => "runtime".to_string(),
        })
        .collect()
}
