//! The `Constant` value type.

use crate::constant::{ConstantKind, Geometry};
use crate::expression::{ExpressionError, ExpressionResult};
use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;
use std::fmt;

/// Immutable typed literal
#[derive(Debug, Clone)]
pub enum Constant {
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    DateTime(DateTime<FixedOffset>),
    Interval {
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    },
    Geometry(Geometry),
}

impl Constant {
    /// Get the kind tag of this constant
    pub fn kind(&self) -> ConstantKind {
        match self {
            Constant::Null => ConstantKind::Null,
            Constant::Boolean(_) => ConstantKind::Boolean,
            Constant::Integer(_) => ConstantKind::Integer,
            Constant::Double(_) => ConstantKind::Double,
            Constant::String(_) => ConstantKind::String,
            Constant::DateTime(_) => ConstantKind::DateTime,
            Constant::Interval { .. } => ConstantKind::Interval,
            Constant::Geometry(_) => ConstantKind::Geometry,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Constant::Null)
    }

    /// Widened double view of a numeric constant
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Constant::Integer(v) => Some(*v as f64),
            Constant::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Constant::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Constant::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Constant::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        match self {
            Constant::DateTime(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&Geometry> {
        match self {
            Constant::Geometry(v) => Some(v),
            _ => None,
        }
    }

    /// Promote this constant to `target` when a widening exists.
    ///
    /// Constants that do not widen are returned unchanged.
    pub fn widen_to(self, target: ConstantKind) -> Constant {
        match (self, target) {
            (Constant::Integer(v), ConstantKind::Double) => Constant::Double(v as f64),
            (other, _) => other,
        }
    }

    /// Build an interval constant, rejecting intervals that end before they start
    pub fn interval(
        start: DateTime<FixedOffset>,
        end: DateTime<FixedOffset>,
    ) -> ExpressionResult<Constant> {
        if end < start {
            return Err(ExpressionError::LiteralFormat {
                kind: ConstantKind::Interval,
                token: format!("{}/{}", start.to_rfc3339(), end.to_rfc3339()),
            });
        }
        Ok(Constant::Interval { start, end })
    }

    /// Convert a literal token into a constant of the declared kind.
    ///
    /// String tokens are taken verbatim (quotes already removed).
    pub fn parse_literal(kind: ConstantKind, token: &str) -> ExpressionResult<Constant> {
        let invalid = || ExpressionError::LiteralFormat {
            kind,
            token: token.to_string(),
        };

        match kind {
            ConstantKind::Null => match token {
                "null" => Ok(Constant::Null),
                _ => Err(invalid()),
            },
            ConstantKind::Boolean => match token {
                "true" => Ok(Constant::Boolean(true)),
                "false" => Ok(Constant::Boolean(false)),
                _ => Err(invalid()),
            },
            ConstantKind::Integer => token
                .parse::<i64>()
                .map(Constant::Integer)
                .map_err(|_| invalid()),
            ConstantKind::Double => match token {
                "INF" => Ok(Constant::Double(f64::INFINITY)),
                "-INF" => Ok(Constant::Double(f64::NEG_INFINITY)),
                "NaN" => Ok(Constant::Double(f64::NAN)),
                _ if token.chars().all(|c| c.is_ascii_digit() || "+-.eE".contains(c)) => token
                    .parse::<f64>()
                    .map(Constant::Double)
                    .map_err(|_| invalid()),
                _ => Err(invalid()),
            },
            ConstantKind::String => Ok(Constant::String(token.to_string())),
            ConstantKind::DateTime => DateTime::parse_from_rfc3339(token)
                .map(Constant::DateTime)
                .map_err(|_| invalid()),
            ConstantKind::Interval => {
                let (start, end) = token.split_once('/').ok_or_else(invalid)?;
                let start = DateTime::parse_from_rfc3339(start).map_err(|_| invalid())?;
                let end = DateTime::parse_from_rfc3339(end).map_err(|_| invalid())?;
                Constant::interval(start, end).map_err(|_| invalid())
            }
            ConstantKind::Geometry => Geometry::from_wkt(token)
                .map(Constant::Geometry)
                .ok_or_else(invalid),
        }
    }
}

impl PartialEq for Constant {
    /// Same kind and same value, except that numeric kinds compare by their
    /// widened double value.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Constant::Null, Constant::Null) => true,
            (Constant::Boolean(a), Constant::Boolean(b)) => a == b,
            (Constant::String(a), Constant::String(b)) => a == b,
            (Constant::DateTime(a), Constant::DateTime(b)) => a == b,
            (
                Constant::Interval { start: s1, end: e1 },
                Constant::Interval { start: s2, end: e2 },
            ) => s1 == s2 && e1 == e2,
            (Constant::Geometry(a), Constant::Geometry(b)) => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl PartialOrd for Constant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Constant::Boolean(a), Constant::Boolean(b)) => Some(a.cmp(b)),
            // UTF-8 byte order is code-point order
            (Constant::String(a), Constant::String(b)) => Some(a.cmp(b)),
            (Constant::DateTime(a), Constant::DateTime(b)) => Some(a.cmp(b)),
            (
                Constant::Interval { start: s1, end: e1 },
                Constant::Interval { start: s2, end: e2 },
            ) => Some(s1.cmp(s2).then_with(|| e1.cmp(e2))),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

/// Canonical literal text, reparsable by the query parser
impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => f.write_str("null"),
            Constant::Boolean(v) => write!(f, "{}", v),
            Constant::Integer(v) => write!(f, "{}", v),
            Constant::Double(v) => f.write_str(&format_double(*v)),
            Constant::String(v) => write!(f, "'{}'", v.replace('\'', "''")),
            Constant::DateTime(v) => f.write_str(&v.to_rfc3339()),
            Constant::Interval { start, end } => {
                write!(f, "{}/{}", start.to_rfc3339(), end.to_rfc3339())
            }
            Constant::Geometry(v) => write!(f, "geography'{}'", v.wkt()),
        }
    }
}

/// Doubles always render with a decimal point or exponent so they never
/// reparse as integers.
fn format_double(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{:?}", value)
    }
}

impl From<bool> for Constant {
    fn from(value: bool) -> Self {
        Constant::Boolean(value)
    }
}

impl From<i32> for Constant {
    fn from(value: i32) -> Self {
        Constant::Integer(value as i64)
    }
}

impl From<i64> for Constant {
    fn from(value: i64) -> Self {
        Constant::Integer(value)
    }
}

impl From<f64> for Constant {
    fn from(value: f64) -> Self {
        Constant::Double(value)
    }
}

impl From<&str> for Constant {
    fn from(value: &str) -> Self {
        Constant::String(value.to_string())
    }
}

impl From<String> for Constant {
    fn from(value: String) -> Self {
        Constant::String(value)
    }
}

impl From<DateTime<FixedOffset>> for Constant {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Constant::DateTime(value)
    }
}

impl From<Geometry> for Constant {
    fn from(value: Geometry) -> Self {
        Constant::Geometry(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(text: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(text).unwrap()
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(Constant::Null.kind(), ConstantKind::Null);
        assert_eq!(Constant::from(true).kind(), ConstantKind::Boolean);
        assert_eq!(Constant::from(2).kind(), ConstantKind::Integer);
        assert_eq!(Constant::from(2.5).kind(), ConstantKind::Double);
        assert_eq!(Constant::from("a").kind(), ConstantKind::String);
    }

    #[test]
    fn test_numeric_cross_kind_equality() {
        assert_eq!(Constant::Integer(2), Constant::Double(2.0));
        assert_ne!(Constant::Integer(2), Constant::Double(2.5));
        assert_ne!(Constant::Integer(2), Constant::String("2".to_string()));
        assert_ne!(Constant::Double(f64::NAN), Constant::Double(f64::NAN));
        assert_eq!(Constant::Null, Constant::Null);
    }

    #[test]
    fn test_ordering() {
        assert!(Constant::Integer(1) < Constant::Double(1.5));
        assert!(Constant::from("abc") < Constant::from("abd"));
        assert!(Constant::from(false) < Constant::from(true));
        assert!(
            Constant::DateTime(datetime("2020-01-01T00:00:00Z"))
                < Constant::DateTime(datetime("2020-01-01T01:00:00+00:00"))
        );
        // Same instant, different offsets
        assert_eq!(
            Constant::DateTime(datetime("2020-01-01T02:00:00+02:00")),
            Constant::DateTime(datetime("2020-01-01T00:00:00Z"))
        );
        assert_eq!(
            Constant::from("a").partial_cmp(&Constant::Integer(1)),
            None
        );
        assert_eq!(Constant::Null.partial_cmp(&Constant::Null), None);
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            Constant::parse_literal(ConstantKind::Integer, "42").unwrap(),
            Constant::Integer(42)
        );
        assert_eq!(
            Constant::parse_literal(ConstantKind::Double, "-1.5e2").unwrap(),
            Constant::Double(-150.0)
        );
        assert!(Constant::parse_literal(ConstantKind::Double, "INF")
            .unwrap()
            .as_f64()
            .unwrap()
            .is_infinite());
        assert_eq!(
            Constant::parse_literal(ConstantKind::Boolean, "true").unwrap(),
            Constant::Boolean(true)
        );
        assert!(matches!(
            Constant::parse_literal(ConstantKind::Integer, "4x2"),
            Err(ExpressionError::LiteralFormat { .. })
        ));
        assert!(matches!(
            Constant::parse_literal(ConstantKind::Double, "infinity"),
            Err(ExpressionError::LiteralFormat { .. })
        ));
        assert!(matches!(
            Constant::parse_literal(ConstantKind::DateTime, "2020-13-01"),
            Err(ExpressionError::LiteralFormat { .. })
        ));
    }

    #[test]
    fn test_parse_interval() {
        let interval = Constant::parse_literal(
            ConstantKind::Interval,
            "2020-01-01T00:00:00Z/2020-01-02T00:00:00Z",
        )
        .unwrap();
        assert_eq!(interval.kind(), ConstantKind::Interval);

        // End before start
        assert!(Constant::parse_literal(
            ConstantKind::Interval,
            "2020-01-02T00:00:00Z/2020-01-01T00:00:00Z",
        )
        .is_err());
    }

    #[test]
    fn test_canonical_text() {
        assert_eq!(Constant::Integer(-5).to_string(), "-5");
        assert_eq!(Constant::Double(21.0).to_string(), "21.0");
        assert_eq!(Constant::Double(21.4).to_string(), "21.4");
        assert_eq!(Constant::Double(f64::NEG_INFINITY).to_string(), "-INF");
        assert_eq!(Constant::from("it's").to_string(), "'it''s'");
        assert_eq!(
            Constant::DateTime(datetime("2020-01-01T00:00:00Z")).to_string(),
            "2020-01-01T00:00:00+00:00"
        );
        let point = Geometry::from_wkt("POINT(8 50)").unwrap();
        assert_eq!(
            Constant::Geometry(point).to_string(),
            "geography'POINT (8 50)'"
        );
    }

    #[test]
    fn test_widen() {
        assert_eq!(
            Constant::Integer(3).widen_to(ConstantKind::Double).kind(),
            ConstantKind::Double
        );
        assert_eq!(
            Constant::from("x").widen_to(ConstantKind::Double).kind(),
            ConstantKind::String
        );
    }
}
