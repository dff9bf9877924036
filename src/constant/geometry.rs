//! Opaque geometry values.
//!
//! Geometries are carried as normalized WKT text. The engine never decodes
//! coordinates; two geometries are equal when their normalized text is equal
//! and they have no ordering.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Geometry {
    wkt: String,
}

impl Geometry {
    /// Normalize a WKT string.
    ///
    /// The geometry type is upper-cased, whitespace runs collapse to a single
    /// space and spaces next to parentheses and commas are dropped, so
    /// `point( 8  50 )` and `POINT (8 50)` normalize to the same value.
    /// Returns `None` when the text is not shaped like WKT.
    pub fn from_wkt(text: &str) -> Option<Self> {
        let text = text.trim();
        let (type_name, body) = match text.find('(') {
            Some(idx) => (text[..idx].trim(), &text[idx..]),
            None => {
                let upper = text.to_ascii_uppercase();
                let type_name = upper.strip_suffix("EMPTY")?.trim().to_string();
                if type_name.is_empty() || !is_type_name(&type_name) {
                    return None;
                }
                return Some(Self {
                    wkt: format!("{} EMPTY", type_name),
                });
            }
        };

        if type_name.is_empty() || !is_type_name(type_name) || !balanced(body) {
            return None;
        }

        let mut normalized = String::with_capacity(body.len());
        let mut pending_space = false;
        for ch in body.chars() {
            if ch.is_whitespace() {
                pending_space = true;
                continue;
            }
            if matches!(ch, '(' | ')' | ',') {
                pending_space = false;
                normalized.push(ch);
                continue;
            }
            if pending_space && !normalized.ends_with(['(', ',']) {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.push(ch);
        }

        Some(Self {
            wkt: format!("{} {}", type_name.to_ascii_uppercase(), normalized),
        })
    }

    /// Normalized WKT text
    pub fn wkt(&self) -> &str {
        &self.wkt
    }

    /// Geometry type name, e.g. `POINT`
    pub fn geometry_type(&self) -> &str {
        self.wkt
            .split(|c: char| c == '(' || c == ' ')
            .next()
            .unwrap_or_default()
    }
}

fn is_type_name(name: &str) -> bool {
    name.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}

fn balanced(body: &str) -> bool {
    let mut depth: usize = 0;
    for ch in body.chars() {
        match ch {
            '(' => depth += 1,
            ')' => {
                if depth == 0 {
                    return false;
                }
                depth -= 1;
            }
            _ => {}
        }
    }
    depth == 0 && body.ends_with(')')
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wkt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalization() {
        let a = Geometry::from_wkt("point( 8  50 )").unwrap();
        let b = Geometry::from_wkt("POINT (8 50)").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.wkt(), "POINT (8 50)");
        assert_eq!(a.geometry_type(), "POINT");
    }

    #[test]
    fn test_polygon() {
        let g = Geometry::from_wkt("POLYGON ((30 10, 40 40, 20 40, 30 10))").unwrap();
        assert_eq!(g.wkt(), "POLYGON ((30 10,40 40,20 40,30 10))");
    }

    #[test]
    fn test_empty_and_invalid() {
        assert_eq!(
            Geometry::from_wkt("point empty").unwrap().wkt(),
            "POINT EMPTY"
        );
        assert!(Geometry::from_wkt("POINT (8 50").is_none());
        assert!(Geometry::from_wkt("(8 50)").is_none());
        assert!(Geometry::from_wkt("12 (8 50)").is_none());
        assert!(Geometry::from_wkt("").is_none());
    }
}
