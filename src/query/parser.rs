// Query option parser - converts tokens to expression trees

use super::lexer::Lexer;
use super::options::{OrderBy, SortOrder};
use super::token::{Spanned, Token};
use crate::constant::{Constant, ConstantKind};
use crate::expression::{
    Expression, ExpressionError, ExpressionResult, FunctionKind, FunctionRegistry, Path,
};

/// Parse a `$filter` expression with the global function registry
pub fn parse_filter(input: &str) -> ExpressionResult<Expression> {
    Parser::new(input)?.parse_filter()
}

/// Parse a `$orderby` list
pub fn parse_orderby(input: &str) -> ExpressionResult<Vec<OrderBy>> {
    Parser::new(input)?.parse_orderby()
}

/// Parse a `$select` list
pub fn parse_select(input: &str) -> ExpressionResult<Vec<Path>> {
    Parser::new(input)?.parse_select()
}

pub struct Parser<'r> {
    tokens: Vec<Spanned>,
    position: usize,
    registry: &'r FunctionRegistry,
}

impl Parser<'static> {
    pub fn new(input: &str) -> ExpressionResult<Self> {
        Parser::with_registry(input, FunctionRegistry::global())
    }
}

impl<'r> Parser<'r> {
    /// Parser resolving function names through `registry`
    pub fn with_registry(input: &str, registry: &'r FunctionRegistry) -> ExpressionResult<Self> {
        let tokens = Lexer::new(input).tokenize()?;
        Ok(Parser {
            tokens,
            position: 0,
            registry,
        })
    }

    /// Parse the whole input as a single expression
    pub fn parse_filter(&mut self) -> ExpressionResult<Expression> {
        let expr = self.parse_expression()?;
        self.expect_token(Token::Eof)?;
        Ok(expr)
    }

    /// Parse `expr [asc|desc], ...`; empty input yields no items
    pub fn parse_orderby(&mut self) -> ExpressionResult<Vec<OrderBy>> {
        let mut items = vec![];
        if self.match_token(&Token::Eof) {
            return Ok(items);
        }

        loop {
            let expression = self.parse_expression()?;
            let order = if self.match_token(&Token::Asc) {
                self.advance();
                SortOrder::Asc
            } else if self.match_token(&Token::Desc) {
                self.advance();
                SortOrder::Desc
            } else {
                SortOrder::Asc
            };
            items.push(OrderBy::new(expression, order));

            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect_token(Token::Eof)?;
        Ok(items)
    }

    /// Parse `path, ...`; empty input yields no paths
    pub fn parse_select(&mut self) -> ExpressionResult<Vec<Path>> {
        let mut paths = vec![];
        if self.match_token(&Token::Eof) {
            return Ok(paths);
        }

        loop {
            let first = self.expect_identifier()?;
            paths.push(self.parse_path(first)?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        self.expect_token(Token::Eof)?;
        Ok(paths)
    }

    fn parse_expression(&mut self) -> ExpressionResult<Expression> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_and()?;

        while self.match_token(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            left = Expression::or(left, right);
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_not()?;

        while self.match_token(&Token::And) {
            self.advance();
            let right = self.parse_not()?;
            left = Expression::and(left, right);
        }

        Ok(left)
    }

    fn parse_not(&mut self) -> ExpressionResult<Expression> {
        if self.match_token(&Token::Not) {
            self.advance();
            let operand = self.parse_not()?;
            Ok(Expression::not_expr(operand))
        } else {
            self.parse_comparison()
        }
    }

    /// Comparisons do not chain
    fn parse_comparison(&mut self) -> ExpressionResult<Expression> {
        let left = self.parse_additive()?;

        let kind = match self.current_token() {
            Token::Eq => FunctionKind::Equal,
            Token::Ne => FunctionKind::NotEqual,
            Token::Lt => FunctionKind::LessThan,
            Token::Le => FunctionKind::LessEqual,
            Token::Gt => FunctionKind::GreaterThan,
            Token::Ge => FunctionKind::GreaterEqual,
            _ => return Ok(left),
        };
        self.advance();
        let right = self.parse_additive()?;
        Expression::call(kind, vec![left, right])
    }

    fn parse_additive(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let kind = match self.current_token() {
                Token::Add => FunctionKind::Add,
                Token::Sub => FunctionKind::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::call(kind, vec![left, right])?;
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> ExpressionResult<Expression> {
        let mut left = self.parse_primary()?;

        loop {
            let kind = match self.current_token() {
                Token::Mul => FunctionKind::Mul,
                Token::Div => FunctionKind::Div,
                Token::Mod => FunctionKind::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_primary()?;
            left = Expression::call(kind, vec![left, right])?;
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> ExpressionResult<Expression> {
        let token = self.current_token();
        match token {
            Token::Number(text) => {
                self.advance();
                let kind = if is_integer_text(&text) {
                    ConstantKind::Integer
                } else {
                    ConstantKind::Double
                };
                Constant::parse_literal(kind, &text).map(Expression::Constant)
            }
            Token::String(text) => {
                self.advance();
                Ok(Expression::constant(text))
            }
            Token::Temporal(text) => {
                self.advance();
                let kind = if text.contains('/') {
                    ConstantKind::Interval
                } else {
                    ConstantKind::DateTime
                };
                Constant::parse_literal(kind, &text).map(Expression::Constant)
            }
            Token::Geography(text) => {
                self.advance();
                Constant::parse_literal(ConstantKind::Geometry, &text).map(Expression::Constant)
            }
            Token::True => {
                self.advance();
                Ok(Expression::constant(true))
            }
            Token::False => {
                self.advance();
                Ok(Expression::constant(false))
            }
            Token::Null => {
                self.advance();
                Ok(Expression::null())
            }
            Token::QuotedIdentifier(name) => {
                self.advance();
                self.parse_path(name).map(Expression::Path)
            }
            Token::Identifier(name) => {
                self.advance();
                if self.match_token(&Token::LeftParen) {
                    let kind = self
                        .registry
                        .lookup(&name)
                        .ok_or(ExpressionError::UnknownFunction { name })?;
                    self.parse_call(kind)
                } else {
                    self.parse_path(name).map(Expression::Path)
                }
            }
            Token::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_token(Token::RightParen)?;
                Ok(expr)
            }
            // Operators may also be written in call form, e.g. `le(a, 1)`
            ref op if op.operator().is_some() && self.peek_token() == Token::LeftParen => {
                self.advance();
                match op.operator() {
                    Some(kind) => self.parse_call(kind),
                    None => Err(self.unexpected()),
                }
            }
            _ => Err(self.unexpected()),
        }
    }

    /// Parse `(arg, ...)` after a function name
    fn parse_call(&mut self, kind: FunctionKind) -> ExpressionResult<Expression> {
        self.expect_token(Token::LeftParen)?;
        let args = if self.match_token(&Token::RightParen) {
            vec![]
        } else {
            self.parse_expression_list()?
        };
        self.expect_token(Token::RightParen)?;
        Expression::call(kind, args)
    }

    /// Parse the remaining `/segment` parts of a path
    fn parse_path(&mut self, first: String) -> ExpressionResult<Path> {
        let mut segments = vec![first];
        while self.match_token(&Token::Slash) {
            self.advance();
            segments.push(self.expect_identifier()?);
        }
        Ok(Path::new(segments))
    }

    fn parse_expression_list(&mut self) -> ExpressionResult<Vec<Expression>> {
        let mut expressions = vec![];

        loop {
            expressions.push(self.parse_expression()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
            self.advance();
        }

        Ok(expressions)
    }

    // Helper methods

    fn current_token(&self) -> Token {
        self.tokens
            .get(self.position)
            .map(|s| s.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn peek_token(&self) -> Token {
        self.tokens
            .get(self.position + 1)
            .map(|s| s.token.clone())
            .unwrap_or(Token::Eof)
    }

    fn current_position(&self) -> usize {
        self.tokens
            .get(self.position)
            .or(self.tokens.last())
            .map_or(0, |s| s.position)
    }

    fn advance(&mut self) {
        if self.position + 1 < self.tokens.len() {
            self.position += 1;
        }
    }

    fn match_token(&self, token: &Token) -> bool {
        self.current_token() == *token
    }

    fn unexpected(&self) -> ExpressionError {
        ExpressionError::Syntax {
            position: self.current_position(),
            message: format!("unexpected {}", self.current_token()),
        }
    }

    fn expect_token(&mut self, token: Token) -> ExpressionResult<()> {
        if self.current_token() == token {
            self.advance();
            Ok(())
        } else {
            Err(ExpressionError::Syntax {
                position: self.current_position(),
                message: format!("expected {}, found {}", token, self.current_token()),
            })
        }
    }

    fn expect_identifier(&mut self) -> ExpressionResult<String> {
        match self.current_token() {
            Token::Identifier(name) | Token::QuotedIdentifier(name) => {
                self.advance();
                Ok(name)
            }
            other => Err(ExpressionError::Syntax {
                position: self.current_position(),
                message: format!("expected property name, found {}", other),
            }),
        }
    }
}

fn is_integer_text(text: &str) -> bool {
    let digits = text.strip_prefix('-').unwrap_or(text);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical(input: &str) -> String {
        parse_filter(input).unwrap().to_canonical_text()
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            canonical("a eq 1 or b eq 2 and not c"),
            "((a eq 1) or ((b eq 2) and (not c)))"
        );
        assert_eq!(canonical("a add b mul c le 10"), "((a add (b mul c)) le 10)");
        assert_eq!(canonical("(a add b) mul c"), "((a add b) mul c)");
    }

    #[test]
    fn test_functions_and_paths() {
        assert_eq!(
            canonical("floor(temperature) le 21"),
            "(floor(temperature) le 21)"
        );
        assert_eq!(
            canonical("substringof('abc', properties/name)"),
            "substringof('abc',properties/name)"
        );
        assert_eq!(canonical("le(a, 1.5)"), "(a le 1.5)");
    }

    #[test]
    fn test_literals() {
        assert_eq!(canonical("x eq 'it''s'"), "(x eq 'it''s')");
        assert_eq!(canonical("x eq -3"), "(x eq -3)");
        assert_eq!(canonical("x eq 2.0"), "(x eq 2.0)");
        assert_eq!(canonical("x eq null"), "(x eq null)");

        let expr = parse_filter("phenomenonTime ge 2024-01-01T00:00:00Z").unwrap();
        assert_eq!(expr.to_canonical_text(), "(phenomenonTime ge 2024-01-01T00:00:00+00:00)");
    }

    #[test]
    fn test_canonical_round_trip() {
        for input in [
            "((a add (b mul c)) le 10)",
            "(not (x eq true))",
            "((temperature ne 21.4) and (floor(temperature) le 21))",
            "substring(name,1,2)",
            "st_equals(location,geography'POINT(1 2)')",
        ] {
            let first = parse_filter(input).unwrap();
            let second = parse_filter(&first.to_canonical_text()).unwrap();
            assert_eq!(first, second, "{}", input);
        }
    }

    #[test]
    fn test_reserved_path_segments_round_trip() {
        for name in ["desc", "asc", "mod", "not", "null", "true", "INF", "NaN", "1", "a b"] {
            let expr = Expression::eq(
                Expression::Path(Path::new(["properties", name])),
                Expression::constant(1),
            );
            let reparsed = parse_filter(&expr.to_canonical_text()).unwrap();
            assert_eq!(reparsed, expr, "{}", name);
        }

        let paths = parse_select("\"desc\", a/\"null\"").unwrap();
        assert_eq!(paths, vec![Path::new(["desc"]), Path::new(["a", "null"])]);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            parse_filter("nosuch(a) eq 1"),
            Err(ExpressionError::UnknownFunction { ref name }) if name == "nosuch"
        ));
        assert!(matches!(
            parse_filter("floor(a, b)"),
            Err(ExpressionError::Arity { .. })
        ));
        assert!(matches!(
            parse_filter("a eq"),
            Err(ExpressionError::Syntax { position: 4, .. })
        ));
        assert!(matches!(
            parse_filter("a eq 1 b"),
            Err(ExpressionError::Syntax { .. })
        ));
        assert!(matches!(
            parse_filter("x eq 99999999999999999999"),
            Err(ExpressionError::LiteralFormat { .. })
        ));
    }

    #[test]
    fn test_orderby_and_select() {
        let items = parse_orderby("result desc, phenomenonTime").unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].order, SortOrder::Desc);
        assert_eq!(items[1].order, SortOrder::Asc);
        assert_eq!(items[0].to_string(), "result desc");

        let paths = parse_select("name, parameters/unit").unwrap();
        assert_eq!(paths, vec![Path::parse("name"), Path::parse("parameters/unit")]);

        assert!(parse_orderby("").unwrap().is_empty());
        assert!(parse_select("1").is_err());
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = FunctionRegistry::empty();
        registry.register_if_absent("ceil", FunctionKind::Ceiling);
        let expr = Parser::with_registry("ceil(x) eq 2", &registry)
            .unwrap()
            .parse_filter()
            .unwrap();
        assert_eq!(expr.to_canonical_text(), "(ceiling(x) eq 2)");
        assert!(Parser::with_registry("floor(x) eq 2", &registry)
            .unwrap()
            .parse_filter()
            .is_err());
    }
}
