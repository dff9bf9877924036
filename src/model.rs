//! Entity models: declared property kinds and their storage columns.
//!
//! A model is optional everywhere. Without one every path is runtime-typed
//! and maps to a column named after its segments.

use crate::constant::ConstantKind;
use crate::expression::Path;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declaration of a single property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDef {
    /// Declared kind; `None` when the property is typed only at runtime
    #[serde(default)]
    pub kind: Option<ConstantKind>,
    /// Column override for the SQL backend
    #[serde(default)]
    pub column: Option<String>,
}

/// Properties of one entity type, keyed by `/` separated path text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityModel {
    pub name: String,
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDef>,
}

impl EntityModel {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self
    }

    /// Declare a property with a known kind
    pub fn with_property(mut self, path: &str, kind: ConstantKind) -> Self {
        self.properties.insert(
            path.to_string(),
            PropertyDef {
                kind: Some(kind),
                column: None,
            },
        );
        self
    }

    /// Declare a property stored in a specific column
    pub fn with_column(mut self, path: &str, kind: Option<ConstantKind>, column: &str) -> Self {
        self.properties.insert(
            path.to_string(),
            PropertyDef {
                kind,
                column: Some(column.to_string()),
            },
        );
        self
    }

    pub fn property(&self, path: &Path) -> Option<&PropertyDef> {
        self.properties.get(&path.to_string())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.property(path).is_some()
    }

    pub fn declared_kind(&self, path: &Path) -> Option<ConstantKind> {
        self.property(path).and_then(|def| def.kind)
    }

    /// Storage column for `path`; segments joined by `_` unless overridden
    pub fn column_for(&self, path: &Path) -> String {
        self.property(path)
            .and_then(|def| def.column.clone())
            .unwrap_or_else(|| path.segments().join("_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns() {
        let model = EntityModel::new("Observation")
            .with_property("result", ConstantKind::Double)
            .with_column("parameters/unit", Some(ConstantKind::String), "unit_name");

        assert_eq!(model.column_for(&Path::parse("result")), "result");
        assert_eq!(model.column_for(&Path::parse("parameters/unit")), "unit_name");
        assert_eq!(model.column_for(&Path::parse("a/b")), "a_b");
        assert_eq!(
            model.declared_kind(&Path::parse("result")),
            Some(ConstantKind::Double)
        );
        assert!(!model.contains(&Path::parse("a/b")));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let text = r#"
            name = "Observation"
            table = "observations"

            [properties.result]
            kind = "double"

            [properties."parameters/unit"]
            column = "unit_name"
        "#;
        let model: EntityModel = toml::from_str(text).unwrap();
        assert_eq!(model.table.as_deref(), Some("observations"));
        assert_eq!(
            model.declared_kind(&Path::parse("result")),
            Some(ConstantKind::Double)
        );
        assert_eq!(model.declared_kind(&Path::parse("parameters/unit")), None);
        assert_eq!(model.column_for(&Path::parse("parameters/unit")), "unit_name");
    }
}
