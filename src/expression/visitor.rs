//! Visitor protocol over expression trees.
//!
//! The node set is closed, so `accept` dispatches with an exhaustive match and
//! every backend implements one method per node kind. The AST itself knows
//! nothing about the backends that consume it.

use crate::constant::Constant;
use crate::expression::{Expression, ExpressionResult, Function, Path};
use std::collections::BTreeSet;

/// Backend that reduces an expression tree to some output
pub trait ExpressionVisitor {
    type Output;

    fn visit_constant(&mut self, constant: &Constant) -> ExpressionResult<Self::Output>;

    fn visit_path(&mut self, path: &Path) -> ExpressionResult<Self::Output>;

    /// Called with the function node itself; implementations decide whether
    /// and in which order to visit the arguments.
    fn visit_function(&mut self, function: &Function) -> ExpressionResult<Self::Output>;
}

impl Expression {
    /// Dispatch to the visitor method matching this node
    pub fn accept<V: ExpressionVisitor + ?Sized>(
        &self,
        visitor: &mut V,
    ) -> ExpressionResult<V::Output> {
        match self {
            Expression::Constant(constant) => visitor.visit_constant(constant),
            Expression::Path(path) => visitor.visit_path(path),
            Expression::Function(function) => visitor.visit_function(function),
        }
    }
}

/// Collects the distinct property paths an expression depends on
#[derive(Debug, Default)]
pub struct PathCollector {
    paths: BTreeSet<Path>,
}

impl PathCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths referenced by `expr`, sorted
    pub fn collect(expr: &Expression) -> Vec<Path> {
        let mut collector = Self::new();
        // The collector never fails
        let _ = expr.accept(&mut collector);
        collector.into_paths()
    }

    pub fn into_paths(self) -> Vec<Path> {
        self.paths.into_iter().collect()
    }
}

impl ExpressionVisitor for PathCollector {
    type Output = ();

    fn visit_constant(&mut self, _constant: &Constant) -> ExpressionResult<()> {
        Ok(())
    }

    fn visit_path(&mut self, path: &Path) -> ExpressionResult<()> {
        self.paths.insert(path.clone());
        Ok(())
    }

    fn visit_function(&mut self, function: &Function) -> ExpressionResult<()> {
        for arg in function.args() {
            arg.accept(self)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts nodes by kind
    #[derive(Default)]
    struct NodeCounter {
        constants: usize,
        paths: usize,
        functions: usize,
    }

    impl ExpressionVisitor for NodeCounter {
        type Output = ();

        fn visit_constant(&mut self, _constant: &Constant) -> ExpressionResult<()> {
            self.constants += 1;
            Ok(())
        }

        fn visit_path(&mut self, _path: &Path) -> ExpressionResult<()> {
            self.paths += 1;
            Ok(())
        }

        fn visit_function(&mut self, function: &Function) -> ExpressionResult<()> {
            self.functions += 1;
            for arg in function.args() {
                arg.accept(self)?;
            }
            Ok(())
        }
    }

    #[test]
    fn test_double_dispatch() {
        let expr = Expression::and(
            Expression::le(Expression::floor(Expression::path("a")), Expression::constant(21)),
            Expression::ne(Expression::path("b"), Expression::path("a")),
        );
        let mut counter = NodeCounter::default();
        expr.accept(&mut counter).unwrap();
        assert_eq!(counter.functions, 4);
        assert_eq!(counter.paths, 3);
        assert_eq!(counter.constants, 1);
    }

    #[test]
    fn test_path_collector() {
        let expr = Expression::or(
            Expression::eq(Expression::path("b"), Expression::constant(1)),
            Expression::eq(Expression::path("a/x"), Expression::path("b")),
        );
        let paths: Vec<String> = PathCollector::collect(&expr)
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(paths, vec!["a/x", "b"]);
    }
}
