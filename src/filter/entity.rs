//! Property access for the event-filter backend.

use crate::constant::{Constant, ConstantKind};
use crate::expression::Path;
use crate::model::EntityModel;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Anything whose properties can be read by path
pub trait Entity {
    /// Value at `path`, or `None` when the entity has no such property
    fn property(&self, path: &Path) -> Option<Constant>;
}

/// Convert a scalar JSON value. Arrays and objects have no constant form.
pub fn json_to_constant(value: &Value) -> Option<Constant> {
    match value {
        Value::Null => Some(Constant::Null),
        Value::Bool(b) => Some(Constant::Boolean(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(Constant::Integer)
            .or_else(|| n.as_f64().map(Constant::Double)),
        Value::String(s) => Some(Constant::String(s.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Walk `path` through nested objects; numeric segments index arrays
pub(crate) fn lookup_json<'v>(value: &'v Value, path: &Path) -> Option<&'v Value> {
    path.segments()
        .iter()
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
}

impl Entity for Value {
    fn property(&self, path: &Path) -> Option<Constant> {
        lookup_json(self, path).and_then(json_to_constant)
    }
}

impl Entity for BTreeMap<String, Constant> {
    fn property(&self, path: &Path) -> Option<Constant> {
        self.get(&path.to_string()).cloned()
    }
}

impl Entity for HashMap<String, Constant> {
    fn property(&self, path: &Path) -> Option<Constant> {
        self.get(&path.to_string()).cloned()
    }
}

/// JSON entity read through a model.
///
/// JSON has no date-time, interval or geometry values, so strings at paths
/// the model declares with those kinds are parsed into them.
pub struct JsonEntity<'a> {
    value: &'a Value,
    model: &'a EntityModel,
}

impl<'a> JsonEntity<'a> {
    pub fn new(value: &'a Value, model: &'a EntityModel) -> Self {
        Self { value, model }
    }
}

impl Entity for JsonEntity<'_> {
    fn property(&self, path: &Path) -> Option<Constant> {
        let raw = lookup_json(self.value, path)?;
        let declared = self.model.declared_kind(path);
        match (declared, raw) {
            (
                Some(kind @ (ConstantKind::DateTime | ConstantKind::Interval | ConstantKind::Geometry)),
                Value::String(text),
            ) => Constant::parse_literal(kind, text).ok(),
            (Some(ConstantKind::Double), _) => {
                json_to_constant(raw).map(|c| c.widen_to(ConstantKind::Double))
            }
            _ => json_to_constant(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_entity_lookup() {
        let value = json!({"a": {"b": [10, 20]}, "n": null, "o": {}});
        assert_eq!(value.property(&Path::parse("a/b/1")), Some(Constant::Integer(20)));
        assert_eq!(value.property(&Path::parse("n")), Some(Constant::Null));
        assert_eq!(value.property(&Path::parse("o")), None);
        assert_eq!(value.property(&Path::parse("x/y")), None);
    }

    #[test]
    fn test_model_coercion() {
        let model = EntityModel::new("Observation")
            .with_property("phenomenonTime", ConstantKind::DateTime)
            .with_property("result", ConstantKind::Double)
            .with_property("location", ConstantKind::Geometry);
        let value = json!({
            "phenomenonTime": "2024-05-01T12:00:00Z",
            "result": 3,
            "location": "POINT (8 50)",
        });
        let entity = JsonEntity::new(&value, &model);

        assert_eq!(
            entity.property(&Path::parse("phenomenonTime")).map(|c| c.kind()),
            Some(ConstantKind::DateTime)
        );
        assert_eq!(
            entity.property(&Path::parse("result")).map(|c| c.kind()),
            Some(ConstantKind::Double)
        );
        assert_eq!(
            entity.property(&Path::parse("location")).map(|c| c.kind()),
            Some(ConstantKind::Geometry)
        );
    }

    #[test]
    fn test_map_entity() {
        let mut map = BTreeMap::new();
        map.insert("parameters/unit".to_string(), Constant::from("degC"));
        assert_eq!(
            map.property(&Path::parse("parameters/unit")),
            Some(Constant::from("degC"))
        );
    }
}
