//! Event-filter backend.
//!
//! Evaluates expression trees directly against in-memory entities, for
//! matching change events against subscription filters and for sorting and
//! projecting query results without a database.

pub mod entity;

pub use entity::{json_to_constant, Entity, JsonEntity};

use crate::constant::{ops, Constant};
use crate::expression::{
    evaluate_function, Expression, ExpressionError, ExpressionResult, ExpressionVisitor, Function,
    FunctionKind, Path,
};
use crate::query::{OrderBy, SortOrder};
use log::{debug, trace};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Visitor evaluating an expression against one entity.
///
/// Missing properties evaluate to null. `and` and `or` skip their right
/// operand once the left one decides the result.
pub struct EntityFilter<'e, E: Entity + ?Sized> {
    entity: &'e E,
}

impl<'e, E: Entity + ?Sized> EntityFilter<'e, E> {
    pub fn new(entity: &'e E) -> Self {
        Self { entity }
    }

    pub fn evaluate(&mut self, expr: &Expression) -> ExpressionResult<Constant> {
        expr.accept(self)
    }
}

impl<E: Entity + ?Sized> ExpressionVisitor for EntityFilter<'_, E> {
    type Output = Constant;

    fn visit_constant(&mut self, constant: &Constant) -> ExpressionResult<Constant> {
        Ok(constant.clone())
    }

    fn visit_path(&mut self, path: &Path) -> ExpressionResult<Constant> {
        Ok(self.entity.property(path).unwrap_or(Constant::Null))
    }

    fn visit_function(&mut self, function: &Function) -> ExpressionResult<Constant> {
        if let (FunctionKind::And | FunctionKind::Or, [left, right]) =
            (function.kind(), function.args())
        {
            let left = left.accept(self)?;
            match (function.kind(), &left) {
                (FunctionKind::And, Constant::Boolean(false)) => return Ok(left),
                (FunctionKind::Or, Constant::Boolean(true)) => return Ok(left),
                _ => {}
            }
            let right = right.accept(self)?;
            return evaluate_function(function, vec![left, right]);
        }

        let args = function
            .args()
            .iter()
            .map(|arg| arg.accept(self))
            .collect::<ExpressionResult<Vec<_>>>()?;
        evaluate_function(function, args)
    }
}

/// Evaluate `expr` against `entity`
pub fn evaluate<E: Entity + ?Sized>(expr: &Expression, entity: &E) -> ExpressionResult<Constant> {
    EntityFilter::new(entity).evaluate(expr)
}

/// Decide whether `entity` passes the filter `expr`.
///
/// A null result does not match. Argument kinds that only clash at runtime
/// are a non-match as well; every other error is returned.
pub fn matches<E: Entity + ?Sized>(expr: &Expression, entity: &E) -> ExpressionResult<bool> {
    match evaluate(expr, entity) {
        Ok(Constant::Boolean(result)) => Ok(result),
        Ok(Constant::Null) => Ok(false),
        Ok(other) => Err(ExpressionError::Evaluation {
            message: format!(
                "filter {} yielded {} instead of a boolean",
                expr,
                other.kind()
            ),
        }),
        Err(err @ ExpressionError::IncompatibleTypes { .. }) => {
            debug!("filter {} does not apply to entity: {}", expr, err);
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Order two entities by `$orderby` items.
///
/// Nulls sort first in ascending order and last in descending order. Values
/// without a defined order compare equal.
pub fn compare_entities<A, B>(left: &A, right: &B, items: &[OrderBy]) -> Ordering
where
    A: Entity + ?Sized,
    B: Entity + ?Sized,
{
    for item in items {
        let l = sort_key(&item.expression, left);
        let r = sort_key(&item.expression, right);
        let ordering = match (l.is_null(), r.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => ops::compare(&l, &r).unwrap_or(Ordering::Equal),
        };
        let ordering = match item.order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn sort_key<E: Entity + ?Sized>(expr: &Expression, entity: &E) -> Constant {
    evaluate(expr, entity).unwrap_or_else(|err| {
        trace!("sort key {} failed: {}", expr, err);
        Constant::Null
    })
}

/// Stable sort of `entities` by `$orderby` items
pub fn sort_entities<E: Entity>(entities: &mut [E], items: &[OrderBy]) {
    entities.sort_by(|a, b| compare_entities(a, b, items));
}

/// Apply `$select` to a JSON entity.
///
/// Only the selected paths are kept, nested objects are rebuilt along the
/// way. An empty selection keeps everything.
pub fn project(value: &Value, paths: &[Path]) -> Value {
    if paths.is_empty() {
        return value.clone();
    }

    let mut out = Map::new();
    for path in paths {
        let Some(selected) = entity::lookup_json(value, path) else {
            continue;
        };
        insert_path(&mut out, path.segments(), selected.clone());
    }
    Value::Object(out)
}

fn insert_path(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    match segments {
        [] => {}
        [last] => {
            target.insert(last.clone(), value);
        }
        [first, rest @ ..] => {
            let child = target
                .entry(first.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse_filter, parse_orderby, parse_select};
    use serde_json::json;

    fn check(filter: &str, entity: &Value) -> bool {
        matches(&parse_filter(filter).unwrap(), entity).unwrap()
    }

    #[test]
    fn test_matches_scenarios() {
        let entity = json!({"temperature": 21.4});
        assert!(check("floor(temperature) le 21", &entity));
        assert!(!check("temperature ne 21.4", &entity));
        assert!(!check("missingProp le 5", &entity));
        assert!(check("temperature gt 21", &entity));
    }

    #[test]
    fn test_three_valued_logic() {
        let entity = json!({"a": 1});
        assert!(check("missing le 5 or a eq 1", &entity));
        assert!(!check("missing le 5 and a eq 1", &entity));
        assert!(check("not (missing le 5)", &entity));
        // null and true is null, which does not match
        assert!(!check("missing and true", &entity));
    }

    #[test]
    fn test_not_equal_against_null() {
        let entity = json!({"temperature": 21.4, "unit": null});
        assert!(!check("missingProp ne 5", &entity));
        assert!(!check("unit ne 'degC'", &entity));
        assert!(!check("missingProp ne unit", &entity));
        assert!(check("temperature ne null", &entity));
        assert!(!check("missingProp ne null", &entity));
        assert!(check("missingProp eq null", &entity));
        assert!(check("null eq unit", &entity));
    }

    #[test]
    fn test_runtime_type_clash_is_non_match() {
        let entity = json!({"name": "probe"});
        assert!(!check("name le 1.0", &entity));
    }

    #[test]
    fn test_short_circuit() {
        let entity = json!({"name": "probe"});
        assert!(!check("false and (name le 1.0)", &entity));
        assert!(check("true or (name le 1.0)", &entity));
    }

    #[test]
    fn test_non_boolean_filter_is_error() {
        let entity = json!({"a": 1});
        assert!(matches(&parse_filter("a add 1").unwrap(), &entity).is_err());
    }

    #[test]
    fn test_nested_paths() {
        let entity = json!({"parameters": {"unit": "degC", "depth": 3}});
        assert!(check("parameters/unit eq 'degC'", &entity));
        assert!(check("parameters/depth mul 2 eq 6", &entity));
        assert!(check("toupper(parameters/unit) eq 'DEGC'", &entity));
    }

    #[test]
    fn test_sort_entities() {
        let mut rows = vec![
            json!({"id": 1, "result": 3.5}),
            json!({"id": 2}),
            json!({"id": 3, "result": 1.0}),
            json!({"id": 4, "result": 3.5}),
        ];
        let asc = parse_orderby("result asc, id desc").unwrap();
        sort_entities(&mut rows, &asc);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 4, 1]);

        let desc = parse_orderby("result desc").unwrap();
        sort_entities(&mut rows, &desc);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![4, 1, 3, 2]);
    }

    #[test]
    fn test_project() {
        let entity = json!({
            "name": "probe",
            "result": 3,
            "parameters": {"unit": "degC", "depth": 3}
        });
        let paths = parse_select("name, parameters/unit, missing").unwrap();
        assert_eq!(
            project(&entity, &paths),
            json!({"name": "probe", "parameters": {"unit": "degC"}})
        );
        assert_eq!(project(&entity, &[]), entity);
    }
}
