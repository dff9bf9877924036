//! Constant kind tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of literal values an expression can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantKind {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    DateTime,
    Interval,
    Geometry,
}

impl ConstantKind {
    /// Check if this kind belongs to the numeric family
    pub fn is_numeric(self) -> bool {
        matches!(self, ConstantKind::Integer | ConstantKind::Double)
    }

    /// Check if this kind belongs to the temporal family
    pub fn is_temporal(self) -> bool {
        matches!(self, ConstantKind::DateTime | ConstantKind::Interval)
    }

    /// Check if a value of this kind can be passed where `target` is declared.
    ///
    /// The only promotion is Integer -> Double.
    pub fn widens_to(self, target: ConstantKind) -> bool {
        self == target || (self == ConstantKind::Integer && target == ConstantKind::Double)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConstantKind::Null => "null",
            ConstantKind::Boolean => "boolean",
            ConstantKind::Integer => "integer",
            ConstantKind::Double => "double",
            ConstantKind::String => "string",
            ConstantKind::DateTime => "datetime",
            ConstantKind::Interval => "interval",
            ConstantKind::Geometry => "geometry",
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening() {
        assert!(ConstantKind::Integer.widens_to(ConstantKind::Double));
        assert!(ConstantKind::Integer.widens_to(ConstantKind::Integer));
        assert!(!ConstantKind::Double.widens_to(ConstantKind::Integer));
        assert!(!ConstantKind::String.widens_to(ConstantKind::Double));
        assert!(!ConstantKind::DateTime.widens_to(ConstantKind::Interval));
    }

    #[test]
    fn test_families() {
        assert!(ConstantKind::Integer.is_numeric());
        assert!(ConstantKind::Double.is_numeric());
        assert!(!ConstantKind::Boolean.is_numeric());
        assert!(ConstantKind::Interval.is_temporal());
        assert!(!ConstantKind::Geometry.is_temporal());
    }

    #[test]
    fn test_serde_names() {
        let kind: ConstantKind = serde_json::from_str("\"datetime\"").unwrap();
        assert_eq!(kind, ConstantKind::DateTime);
        assert_eq!(ConstantKind::Double.to_string(), "double");
    }
}
