//! Predicate backend: lowers expression trees to SQL.
//!
//! Constants become bound parameters, paths become quoted columns and every
//! function is rendered through a per-function template. Null semantics match
//! the event filter: `eq` treats null as a value, `ne` and ordering
//! comparisons with a null operand are false rather than unknown, and a
//! literal null operand of `eq`/`ne` renders as `IS [NOT] NULL`.
//!
//! `div` and `mod` by zero give `NULL`, as integer division does in the event
//! filter. Double division by zero is the one difference: the event filter
//! yields an IEEE 754 infinity or NaN there.

use crate::constant::{Constant, ConstantKind};
use crate::expression::{
    Expression, ExpressionResult, ExpressionVisitor, Function, FunctionKind, FunctionRegistry,
    Path,
};
use crate::model::EntityModel;
use crate::query::{OrderBy, SortOrder};
use crate::registry::HandlerRegistry;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// How bound parameters are written into the SQL text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderStyle {
    /// `?`
    #[default]
    Question,
    /// `$1`, `$2`, ...
    Numbered,
}

/// Written in place of each bound parameter until the text is complete.
/// PostgreSQL text never contains NUL.
const PARAM_MARKER: char = '\0';

/// SQL text plus the parameters bound to its placeholders, in order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<Constant>,
}

impl fmt::Display for SqlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Rendering rule for one function
#[derive(Debug, Clone, PartialEq)]
pub enum SqlTemplate {
    /// Text where `{N}` is replaced by argument N and `{N..}` by the
    /// arguments from N on, each preceded by `, `
    Pattern(String),
    /// `NAME(arg, ...)`
    Call(String),
    /// The upper-cased function name called with all arguments
    Default,
}

impl SqlTemplate {
    /// Template from configuration text: a pattern if it references an
    /// argument, a plain function name otherwise
    pub fn parse(text: &str) -> Self {
        if text.contains('{') {
            SqlTemplate::Pattern(text.to_string())
        } else {
            SqlTemplate::Call(text.to_string())
        }
    }

    /// Render a call; parameters follow the order arguments appear in the text
    pub fn render(&self, function: FunctionKind, args: &[SqlFragment]) -> SqlFragment {
        match self {
            SqlTemplate::Pattern(pattern) => render_pattern(pattern, args),
            SqlTemplate::Call(name) => render_call(name, args),
            SqlTemplate::Default => render_call(&function.name().to_uppercase(), args),
        }
    }
}

impl SqlFragment {
    fn append(&mut self, arg: &SqlFragment) {
        self.sql.push_str(&arg.sql);
        self.params.extend(arg.params.iter().cloned());
    }
}

fn render_call(name: &str, args: &[SqlFragment]) -> SqlFragment {
    let mut out = SqlFragment {
        sql: format!("{}(", name),
        params: Vec::new(),
    };
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.sql.push_str(", ");
        }
        out.append(arg);
    }
    out.sql.push(')');
    out
}

/// Single pass substitution, so argument text containing braces is never
/// expanded again
fn render_pattern(pattern: &str, args: &[SqlFragment]) -> SqlFragment {
    let mut out = SqlFragment {
        sql: String::with_capacity(pattern.len()),
        params: Vec::new(),
    };
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        out.sql.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.sql.push_str(&rest[open..]);
            return out;
        };
        let spec = &after[..close];
        if let Some(index) = spec.strip_suffix("..").and_then(|n| n.parse::<usize>().ok()) {
            for arg in args.iter().skip(index) {
                out.sql.push_str(", ");
                out.append(arg);
            }
        } else if let Some(arg) = spec.parse::<usize>().ok().and_then(|i| args.get(i)) {
            out.append(arg);
        } else {
            out.sql.push('{');
            out.sql.push_str(spec);
            out.sql.push('}');
        }
        rest = &after[close + 1..];
    }

    out.sql.push_str(rest);
    out
}

/// Templates per function plus placeholder style
#[derive(Debug, Clone)]
pub struct SqlDialect {
    templates: HandlerRegistry<FunctionKind, SqlTemplate>,
    placeholder_style: PlaceholderStyle,
}

impl SqlDialect {
    /// PostgreSQL/PostGIS flavoured templates
    pub fn standard() -> Self {
        let mut dialect = Self {
            templates: HandlerRegistry::new(SqlTemplate::Default),
            placeholder_style: PlaceholderStyle::default(),
        };
        dialect.register_standard_templates();
        dialect
    }

    /// Standard dialect with per-function overrides keyed by function name.
    ///
    /// Overrides are registered first so they win over the standard
    /// templates. Unknown names are skipped with a warning.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut dialect = Self {
            templates: HandlerRegistry::new(SqlTemplate::Default),
            placeholder_style: PlaceholderStyle::default(),
        };
        let registry = FunctionRegistry::global();
        for (name, text) in overrides {
            match registry.lookup(name) {
                Some(kind) => {
                    dialect.templates.register_if_absent(kind, SqlTemplate::parse(text));
                }
                None => warn!("ignoring SQL override for unknown function {}", name),
            }
        }
        dialect.register_standard_templates();
        dialect
    }

    pub fn placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder_style = style;
        self
    }

    pub fn template(&self, kind: FunctionKind) -> &SqlTemplate {
        self.templates.get(&kind)
    }

    fn register_standard_templates(&mut self) {
        use FunctionKind as F;
        use SqlTemplate::{Call, Pattern};

        let standard: [(FunctionKind, SqlTemplate); 35] = [
            (F::Equal, Pattern("({0} IS NOT DISTINCT FROM {1})".into())),
            (F::NotEqual, Pattern("COALESCE(({0} <> {1}), FALSE)".into())),
            (F::LessThan, Pattern("COALESCE(({0} < {1}), FALSE)".into())),
            (F::LessEqual, Pattern("COALESCE(({0} <= {1}), FALSE)".into())),
            (F::GreaterThan, Pattern("COALESCE(({0} > {1}), FALSE)".into())),
            (F::GreaterEqual, Pattern("COALESCE(({0} >= {1}), FALSE)".into())),
            (F::And, Pattern("({0} AND {1})".into())),
            (F::Or, Pattern("({0} OR {1})".into())),
            (F::Not, Pattern("(NOT {0})".into())),
            (F::Add, Pattern("({0} + {1})".into())),
            (F::Sub, Pattern("({0} - {1})".into())),
            (F::Mul, Pattern("({0} * {1})".into())),
            (F::Div, Pattern("({0} / NULLIF({1}, 0))".into())),
            // Truncated remainder; PostgreSQL has no `%` for double precision
            (
                F::Mod,
                Pattern("({0} - {1} * TRUNC({0} / NULLIF({1}, 0)))".into()),
            ),
            (F::Floor, Call("FLOOR".into())),
            (F::Ceiling, Call("CEIL".into())),
            (F::Round, Call("ROUND".into())),
            (F::Length, Call("CHAR_LENGTH".into())),
            (F::ToLower, Call("LOWER".into())),
            (F::ToUpper, Call("UPPER".into())),
            (F::Trim, Call("TRIM".into())),
            (F::Concat, Pattern("({0} || {1})".into())),
            (F::SubstringOf, Pattern("(STRPOS({1}, {0}) > 0)".into())),
            (F::StartsWith, Pattern("(STRPOS({0}, {1}) = 1)".into())),
            (
                F::EndsWith,
                Pattern("(STRPOS(REVERSE({0}), REVERSE({1})) = 1)".into()),
            ),
            (F::IndexOf, Pattern("(STRPOS({0}, {1}) - 1)".into())),
            (F::Substring, Pattern("SUBSTR({0}, ({1} + 1){2..})".into())),
            (F::Year, Pattern("EXTRACT(YEAR FROM {0})".into())),
            (F::Month, Pattern("EXTRACT(MONTH FROM {0})".into())),
            (F::Day, Pattern("EXTRACT(DAY FROM {0})".into())),
            (F::Hour, Pattern("EXTRACT(HOUR FROM {0})".into())),
            (F::Minute, Pattern("EXTRACT(MINUTE FROM {0})".into())),
            (F::Second, Pattern("FLOOR(EXTRACT(SECOND FROM {0}))".into())),
            (
                F::FractionalSeconds,
                Pattern("(MOD(EXTRACT(MICROSECONDS FROM {0}), 1000000) / 1000000.0)".into()),
            ),
            (F::StEquals, Call("ST_Equals".into())),
        ];

        for (kind, template) in standard {
            self.templates.register_if_absent(kind, template);
        }
    }
}

impl Default for SqlDialect {
    fn default() -> Self {
        Self::standard()
    }
}

/// Visitor rendering an expression to SQL text and collecting parameters.
///
/// Parameters are numbered in the order their placeholders appear in the
/// finished text, whatever order a template writes its arguments in.
pub struct SqlPredicateBuilder<'a> {
    dialect: &'a SqlDialect,
    model: Option<&'a EntityModel>,
    params: Vec<Constant>,
}

impl<'a> SqlPredicateBuilder<'a> {
    pub fn new(dialect: &'a SqlDialect) -> Self {
        Self {
            dialect,
            model: None,
            params: Vec::new(),
        }
    }

    /// Map paths through `model`; paths it does not declare render as `NULL`
    pub fn with_model(mut self, model: &'a EntityModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Render one expression; parameters accumulate across calls
    pub fn render(&mut self, expr: &Expression) -> ExpressionResult<String> {
        let fragment = expr.accept(self)?;
        Ok(self.bind_placeholders(fragment))
    }

    /// Render `$orderby` items as an `ORDER BY` clause, empty if there are none
    pub fn render_order_by(&mut self, items: &[OrderBy]) -> ExpressionResult<String> {
        if items.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(items.len());
        for item in items {
            let expr = self.render(&item.expression)?;
            parts.push(match item.order {
                SortOrder::Asc => format!("{} ASC NULLS FIRST", expr),
                SortOrder::Desc => format!("{} DESC NULLS LAST", expr),
            });
        }
        Ok(format!("ORDER BY {}", parts.join(", ")))
    }

    pub fn params(&self) -> &[Constant] {
        &self.params
    }

    pub fn into_params(self) -> Vec<Constant> {
        self.params
    }

    /// Replace each parameter marker with this builder's next placeholder
    fn bind_placeholders(&mut self, fragment: SqlFragment) -> String {
        let mut params = fragment.params.into_iter();
        let mut sql = String::with_capacity(fragment.sql.len());

        for ch in fragment.sql.chars() {
            if ch != PARAM_MARKER {
                sql.push(ch);
                continue;
            }
            if let Some(param) = params.next() {
                self.params.push(param);
                match self.dialect.placeholder_style {
                    PlaceholderStyle::Question => sql.push('?'),
                    PlaceholderStyle::Numbered => sql.push_str(&format!("${}", self.params.len())),
                }
            }
        }
        sql
    }
}

fn bound(sql: String, constant: &Constant) -> SqlFragment {
    SqlFragment {
        sql,
        params: vec![constant.clone()],
    }
}

fn unbound(sql: impl Into<String>) -> SqlFragment {
    SqlFragment {
        sql: sql.into(),
        params: Vec::new(),
    }
}

impl ExpressionVisitor for SqlPredicateBuilder<'_> {
    type Output = SqlFragment;

    fn visit_constant(&mut self, constant: &Constant) -> ExpressionResult<SqlFragment> {
        Ok(match constant.kind() {
            ConstantKind::Null => unbound("NULL"),
            ConstantKind::Geometry => {
                bound(format!("ST_GeomFromText({})", PARAM_MARKER), constant)
            }
            _ => bound(PARAM_MARKER.to_string(), constant),
        })
    }

    fn visit_path(&mut self, path: &Path) -> ExpressionResult<SqlFragment> {
        Ok(match self.model {
            Some(model) if !model.contains(path) => unbound("NULL"),
            Some(model) => unbound(quote_identifier(&model.column_for(path))),
            None => unbound(quote_identifier(&path.segments().join("_"))),
        })
    }

    fn visit_function(&mut self, function: &Function) -> ExpressionResult<SqlFragment> {
        if let Some((index, negated)) = function.null_check() {
            if let Some(operand) = function.args().get(index) {
                let mut fragment = operand.accept(self)?;
                let test = if negated { "IS NOT NULL" } else { "IS NULL" };
                fragment.sql = format!("({} {})", fragment.sql, test);
                return Ok(fragment);
            }
        }

        let args = function
            .args()
            .iter()
            .map(|arg| arg.accept(self))
            .collect::<ExpressionResult<Vec<_>>>()?;
        Ok(self
            .dialect
            .template(function.kind())
            .render(function.kind(), &args))
    }
}

fn quote_identifier(name: &str) -> String {
    let name: String = name.chars().filter(|&c| c != PARAM_MARKER).collect();
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Render a `$filter` expression as a `WHERE` predicate
pub fn where_clause(
    expr: &Expression,
    dialect: &SqlDialect,
    model: Option<&EntityModel>,
) -> ExpressionResult<SqlFragment> {
    let mut builder = SqlPredicateBuilder::new(dialect);
    if let Some(model) = model {
        builder = builder.with_model(model);
    }
    let sql = builder.render(expr)?;
    Ok(SqlFragment {
        sql,
        params: builder.into_params(),
    })
}

/// Render `$orderby` items as an `ORDER BY` clause
pub fn order_by_clause(
    items: &[OrderBy],
    dialect: &SqlDialect,
    model: Option<&EntityModel>,
) -> ExpressionResult<SqlFragment> {
    let mut builder = SqlPredicateBuilder::new(dialect);
    if let Some(model) = model {
        builder = builder.with_model(model);
    }
    let sql = builder.render_order_by(items)?;
    Ok(SqlFragment {
        sql,
        params: builder.into_params(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{parse_filter, parse_orderby};

    fn sql(filter: &str) -> SqlFragment {
        where_clause(&parse_filter(filter).unwrap(), &SqlDialect::standard(), None).unwrap()
    }

    #[test]
    fn test_comparison_and_params() {
        let fragment = sql("floor(temperature) le 21");
        assert_eq!(
            fragment.sql,
            "COALESCE((FLOOR(\"temperature\") <= ?), FALSE)"
        );
        assert_eq!(fragment.params, vec![Constant::Integer(21)]);
    }

    #[test]
    fn test_equality_is_null_safe() {
        let fragment = sql("a eq b or c ne 'x'");
        assert_eq!(
            fragment.sql,
            "((\"a\" IS NOT DISTINCT FROM \"b\") OR COALESCE((\"c\" <> ?), FALSE))"
        );
        assert_eq!(fragment.params, vec![Constant::from("x")]);
    }

    #[test]
    fn test_literal_null_is_null_check() {
        assert_eq!(
            sql("a eq null or null ne b").sql,
            "((\"a\" IS NULL) OR (\"b\" IS NOT NULL))"
        );
        let fragment = sql("tolower(name) ne null");
        assert_eq!(fragment.sql, "(LOWER(\"name\") IS NOT NULL)");
        assert!(fragment.params.is_empty());
    }

    #[test]
    fn test_not_equal_on_missing_property_is_false() {
        let model = EntityModel::new("Observation").with_property("result", ConstantKind::Double);
        let expr = parse_filter("missingProp ne 5").unwrap();
        let fragment = where_clause(&expr, &SqlDialect::standard(), Some(&model)).unwrap();
        assert_eq!(fragment.sql, "COALESCE((NULL <> ?), FALSE)");
        assert_eq!(fragment.params, vec![Constant::Integer(5)]);
    }

    #[test]
    fn test_params_follow_template_argument_order() {
        let fragment = sql("substringof('a', concat(name, 'b'))");
        assert_eq!(fragment.sql, "(STRPOS((\"name\" || ?), ?) > 0)");
        assert_eq!(fragment.params, vec![Constant::from("b"), Constant::from("a")]);

        let mut overrides = BTreeMap::new();
        overrides.insert("indexof".to_string(), "(POSITION({1} IN {0}) - 1)".to_string());
        let dialect =
            SqlDialect::with_overrides(&overrides).placeholder_style(PlaceholderStyle::Numbered);
        let expr = parse_filter("indexof(concat(name, 'x'), 'y') eq 2").unwrap();
        let fragment = where_clause(&expr, &dialect, None).unwrap();
        assert_eq!(
            fragment.sql,
            "((POSITION($1 IN (\"name\" || $2)) - 1) IS NOT DISTINCT FROM $3)"
        );
        assert_eq!(
            fragment.params,
            vec![Constant::from("y"), Constant::from("x"), Constant::Integer(2)]
        );
    }

    #[test]
    fn test_division_and_remainder() {
        let fragment = sql("temperature mod 2.5 eq 1");
        assert_eq!(
            fragment.sql,
            "((\"temperature\" - ? * TRUNC(\"temperature\" / NULLIF(?, 0))) IS NOT DISTINCT FROM ?)"
        );
        assert_eq!(
            fragment.params,
            vec![Constant::Double(2.5), Constant::Double(2.5), Constant::Integer(1)]
        );
        assert_eq!(
            sql("count div 0 eq 1").sql,
            "((\"count\" / NULLIF(?, 0)) IS NOT DISTINCT FROM ?)"
        );
    }

    #[test]
    fn test_model_columns_and_unknown_paths() {
        let model = EntityModel::new("Observation")
            .with_property("result", ConstantKind::Double)
            .with_column("parameters/unit", Some(ConstantKind::String), "unit_name");
        let expr = parse_filter("result gt 1 and parameters/unit eq missing").unwrap();
        let fragment = where_clause(&expr, &SqlDialect::standard(), Some(&model)).unwrap();
        assert_eq!(
            fragment.sql,
            "(COALESCE((\"result\" > ?), FALSE) AND (\"unit_name\" IS NOT DISTINCT FROM NULL))"
        );
    }

    #[test]
    fn test_numbered_placeholders() {
        let dialect = SqlDialect::standard().placeholder_style(PlaceholderStyle::Numbered);
        let expr = parse_filter("substring(name, 1, 2) eq 'ab'").unwrap();
        let fragment = where_clause(&expr, &dialect, None).unwrap();
        assert_eq!(
            fragment.sql,
            "(SUBSTR(\"name\", ($1 + 1), $2) IS NOT DISTINCT FROM $3)"
        );
        assert_eq!(fragment.params.len(), 3);
    }

    #[test]
    fn test_substring_two_args_and_geometry() {
        assert_eq!(
            sql("substring(name, 1) eq 'b'").sql,
            "(SUBSTR(\"name\", (? + 1)) IS NOT DISTINCT FROM ?)"
        );
        assert_eq!(
            sql("st_equals(location, geography'POINT(1 2)')").sql,
            "ST_Equals(\"location\", ST_GeomFromText(?))"
        );
    }

    #[test]
    fn test_overrides_win() {
        let mut overrides = BTreeMap::new();
        overrides.insert("length".to_string(), "LENGTH".to_string());
        overrides.insert("startswith".to_string(), "({0} LIKE {1} || '%')".to_string());
        overrides.insert("nosuch".to_string(), "X".to_string());
        let dialect = SqlDialect::with_overrides(&overrides);

        let expr = parse_filter("length(name) gt 2 and startswith(name, 'a')").unwrap();
        let fragment = where_clause(&expr, &dialect, None).unwrap();
        assert_eq!(
            fragment.sql,
            "(COALESCE((LENGTH(\"name\") > ?), FALSE) AND (\"name\" LIKE ? || '%'))"
        );
    }

    #[test]
    fn test_pattern_is_single_pass() {
        let rendered = render_pattern("({0} = {1})", &[unbound("{1}"), unbound("b")]);
        assert_eq!(rendered.sql, "({1} = b)");
        assert!(rendered.params.is_empty());
    }

    #[test]
    fn test_order_by() {
        let items = parse_orderby("result desc, phenomenonTime").unwrap();
        let fragment = order_by_clause(&items, &SqlDialect::standard(), None).unwrap();
        assert_eq!(
            fragment.sql,
            "ORDER BY \"result\" DESC NULLS LAST, \"phenomenonTime\" ASC NULLS FIRST"
        );
        assert!(order_by_clause(&[], &SqlDialect::standard(), None)
            .unwrap()
            .sql
            .is_empty());
    }
}
