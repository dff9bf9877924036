// Query option tokens for lexical analysis

use crate::expression::FunctionKind;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    Identifier(String),
    /// `"..."` property name, never a keyword
    QuotedIdentifier(String),
    Number(String),
    String(String),
    /// Date-time or `start/end` interval text
    Temporal(String),
    /// WKT text of a `geography'...'` literal
    Geography(String),

    // Keywords
    And,
    Or,
    Not,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    True,
    False,
    Null,
    Asc,
    Desc,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,
    Slash,

    Eof,
}

/// A token with the character offset it starts at
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

impl Token {
    /// Check if the token is a keyword
    pub fn is_keyword(&self) -> bool {
        Token::keyword_from_str(&self.to_string()).as_ref() == Some(self)
    }

    /// Convert a string to a keyword token if it matches
    pub fn keyword_from_str(s: &str) -> Option<Token> {
        match s.to_ascii_lowercase().as_str() {
            "and" => Some(Token::And),
            "or" => Some(Token::Or),
            "not" => Some(Token::Not),
            "eq" => Some(Token::Eq),
            "ne" => Some(Token::Ne),
            "lt" => Some(Token::Lt),
            "le" => Some(Token::Le),
            "gt" => Some(Token::Gt),
            "ge" => Some(Token::Ge),
            "add" => Some(Token::Add),
            "sub" => Some(Token::Sub),
            "mul" => Some(Token::Mul),
            "div" => Some(Token::Div),
            "mod" => Some(Token::Mod),
            "true" => Some(Token::True),
            "false" => Some(Token::False),
            "null" => Some(Token::Null),
            "asc" => Some(Token::Asc),
            "desc" => Some(Token::Desc),
            _ => None,
        }
    }

    /// Function an operator keyword stands for
    pub fn operator(&self) -> Option<FunctionKind> {
        match self {
            Token::And => Some(FunctionKind::And),
            Token::Or => Some(FunctionKind::Or),
            Token::Not => Some(FunctionKind::Not),
            Token::Eq => Some(FunctionKind::Equal),
            Token::Ne => Some(FunctionKind::NotEqual),
            Token::Lt => Some(FunctionKind::LessThan),
            Token::Le => Some(FunctionKind::LessEqual),
            Token::Gt => Some(FunctionKind::GreaterThan),
            Token::Ge => Some(FunctionKind::GreaterEqual),
            Token::Add => Some(FunctionKind::Add),
            Token::Sub => Some(FunctionKind::Sub),
            Token::Mul => Some(FunctionKind::Mul),
            Token::Div => Some(FunctionKind::Div),
            Token::Mod => Some(FunctionKind::Mod),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Identifier(s) | Token::Number(s) | Token::Temporal(s) => f.write_str(s),
            Token::QuotedIdentifier(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            Token::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::Geography(s) => write!(f, "geography'{}'", s),
            Token::LeftParen => f.write_str("("),
            Token::RightParen => f.write_str(")"),
            Token::Comma => f.write_str(","),
            Token::Slash => f.write_str("/"),
            Token::Eof => f.write_str("end of input"),
            Token::True => f.write_str("true"),
            Token::False => f.write_str("false"),
            Token::Null => f.write_str("null"),
            Token::Asc => f.write_str("asc"),
            Token::Desc => f.write_str("desc"),
            other => match other.operator() {
                Some(kind) => f.write_str(kind.name()),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_detection() {
        assert!(Token::Le.is_keyword());
        assert!(Token::Desc.is_keyword());
        assert!(!Token::Identifier("floor".to_string()).is_keyword());
        assert!(!Token::Slash.is_keyword());
    }

    #[test]
    fn test_keyword_from_str() {
        assert_eq!(Token::keyword_from_str("le"), Some(Token::Le));
        assert_eq!(Token::keyword_from_str("LE"), Some(Token::Le));
        assert_eq!(Token::keyword_from_str("floor"), None);
    }

    #[test]
    fn test_operator_kinds() {
        assert_eq!(Token::Mod.operator(), Some(FunctionKind::Mod));
        assert_eq!(Token::Asc.operator(), None);
    }
}
