// Query option lexer - tokenizes $filter, $orderby and $select text

use super::token::{Spanned, Token};
use crate::expression::{ExpressionError, ExpressionResult};

pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> ExpressionResult<Spanned> {
        self.skip_whitespace();
        let start = self.position;

        let Some(ch) = self.current_char() else {
            return Ok(Spanned {
                token: Token::Eof,
                position: start,
            });
        };

        let token = match ch {
            '(' => {
                self.advance();
                Token::LeftParen
            }
            ')' => {
                self.advance();
                Token::RightParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '\'' => Token::String(self.read_string()?),
            '"' => Token::QuotedIdentifier(self.read_quoted('"', "unterminated quoted name")?),
            '-' => {
                if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                    let mut number = String::from("-");
                    number.push_str(&self.read_number());
                    Token::Number(number)
                } else if self.starts_with("-INF") {
                    self.position += 4;
                    Token::Number("-INF".to_string())
                } else {
                    return Err(self.error(start, "unexpected '-'"));
                }
            }
            c if c.is_ascii_digit() => {
                if self.is_temporal() {
                    self.read_temporal()
                } else {
                    Token::Number(self.read_number())
                }
            }
            c if c.is_alphabetic() || c == '_' || c == '$' || c == '@' => self.read_identifier()?,
            other => {
                return Err(self.error(start, &format!("unexpected character '{}'", other)));
            }
        };

        Ok(Spanned {
            token,
            position: start,
        })
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn advance(&mut self) {
        if self.position < self.input.len() {
            self.position += 1;
        }
    }

    /// Peek at the next character without advancing
    fn peek(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn starts_with(&self, text: &str) -> bool {
        let mut chars = self.input[self.position..].iter();
        text.chars().all(|c| chars.next() == Some(&c))
    }

    fn error(&self, position: usize, message: &str) -> ExpressionError {
        ExpressionError::Syntax {
            position,
            message: message.to_string(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.current_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    /// Read an identifier, keyword or prefixed literal
    fn read_identifier(&mut self) -> ExpressionResult<Token> {
        let mut identifier = String::new();

        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '$' || ch == '@' || ch == '.' {
                identifier.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let lower = identifier.to_ascii_lowercase();
        if (lower == "geography" || lower == "geometry") && self.current_char() == Some('\'') {
            return Ok(Token::Geography(self.read_string()?));
        }
        if identifier == "INF" || identifier == "NaN" {
            return Ok(Token::Number(identifier));
        }

        Ok(Token::keyword_from_str(&identifier).unwrap_or(Token::Identifier(identifier)))
    }

    /// Read a quoted string; `''` escapes a quote
    fn read_string(&mut self) -> ExpressionResult<String> {
        self.read_quoted('\'', "unterminated string literal")
    }

    /// Read text between `quote` characters, a doubled quote escaping itself
    fn read_quoted(&mut self, quote: char, unterminated: &str) -> ExpressionResult<String> {
        let start = self.position;
        self.advance(); // Skip opening quote
        let mut text = String::new();

        loop {
            match self.current_char() {
                Some(ch) if ch == quote && self.peek() == Some(quote) => {
                    text.push(quote);
                    self.advance();
                    self.advance();
                }
                Some(ch) if ch == quote => {
                    self.advance();
                    return Ok(text);
                }
                Some(ch) => {
                    text.push(ch);
                    self.advance();
                }
                None => return Err(self.error(start, unterminated)),
            }
        }
    }

    /// Four digits followed by `-` start a date-time
    fn is_temporal(&self) -> bool {
        let rest = &self.input[self.position..];
        rest.len() > 4 && rest[..4].iter().all(char::is_ascii_digit) && rest[4] == '-'
    }

    fn read_temporal(&mut self) -> Token {
        let mut text = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() || ch == ')' || ch == ',' {
                break;
            }
            text.push(ch);
            self.advance();
        }
        Token::Temporal(text)
    }

    /// Read an integer or decimal number with optional exponent
    fn read_number(&mut self) -> String {
        let mut number = String::new();
        let mut has_dot = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot && self.peek().is_some_and(|c| c.is_ascii_digit()) {
                has_dot = true;
                number.push(ch);
                self.advance();
            } else if (ch == 'e' || ch == 'E') && self.exponent_follows() {
                number.push(ch);
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.current_char() {
                    number.push(sign);
                    self.advance();
                }
            } else {
                break;
            }
        }

        number
    }

    fn exponent_follows(&self) -> bool {
        match self.peek() {
            Some(c) if c.is_ascii_digit() => true,
            Some('+' | '-') => self
                .input
                .get(self.position + 2)
                .is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(&mut self) -> ExpressionResult<Vec<Spanned>> {
        let mut tokens = Vec::new();

        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            tokens("floor(temperature) le 21"),
            vec![
                Token::Identifier("floor".to_string()),
                Token::LeftParen,
                Token::Identifier("temperature".to_string()),
                Token::RightParen,
                Token::Le,
                Token::Number("21".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens("123 -4 21.5 1e300 2.5E-3 INF -INF NaN"),
            vec![
                Token::Number("123".to_string()),
                Token::Number("-4".to_string()),
                Token::Number("21.5".to_string()),
                Token::Number("1e300".to_string()),
                Token::Number("2.5E-3".to_string()),
                Token::Number("INF".to_string()),
                Token::Number("-INF".to_string()),
                Token::Number("NaN".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_literals() {
        assert_eq!(
            tokens("'hello world' 'it''s fine'"),
            vec![
                Token::String("hello world".to_string()),
                Token::String("it's fine".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_quoted_identifiers() {
        assert_eq!(
            tokens("\"desc\" eq \"a\"\"b\""),
            vec![
                Token::QuotedIdentifier("desc".to_string()),
                Token::Eq,
                Token::QuotedIdentifier("a\"b".to_string()),
                Token::Eof,
            ]
        );
        assert!(matches!(
            Lexer::new("\"open").tokenize(),
            Err(ExpressionError::Syntax { position: 0, .. })
        ));
    }

    #[test]
    fn test_temporal_and_geography() {
        assert_eq!(
            tokens("2024-01-01T00:00:00Z/2024-01-02T00:00:00Z geography'POINT(1 2)'"),
            vec![
                Token::Temporal("2024-01-01T00:00:00Z/2024-01-02T00:00:00Z".to_string()),
                Token::Geography("POINT(1 2)".to_string()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_paths_and_positions() {
        let spanned = Lexer::new("a/b eq 1").tokenize().unwrap();
        let positions: Vec<usize> = spanned.iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![0, 1, 2, 4, 7, 8]);
        assert_eq!(spanned[1].token, Token::Slash);
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            Lexer::new("name eq 'open").tokenize(),
            Err(ExpressionError::Syntax { position: 8, .. })
        ));
        assert!(matches!(
            Lexer::new("a # b").tokenize(),
            Err(ExpressionError::Syntax { position: 2, .. })
        ));
    }
}
