//! Query expression engine.
//!
//! This module provides:
//! - The expression AST (constants, property paths, functions)
//! - Per-function type bindings and overload resolution
//! - Function evaluation and constant folding
//! - Type checking of whole trees against an optional entity model
//! - The visitor protocol consumed by the evaluation backends

pub mod binding;
pub mod error;
pub mod eval;
pub mod expr;
pub mod function;
pub mod function_registry;
pub mod resolve;
pub mod type_checker;
pub mod visitor;

pub use binding::TypeBinding;
pub use error::{ExpressionError, ExpressionResult};
pub use eval::{evaluate_function, fold, ConstantFolder};
pub use expr::{Expression, Function, Path};
pub use function::{FunctionKind, Notation, NullHandling};
pub use function_registry::FunctionRegistry;
pub use resolve::resolve_binding;
pub use type_checker::{type_check_expression, validate_filter_predicate, TypeChecker};
pub use visitor::{ExpressionVisitor, PathCollector};
