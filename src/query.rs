// Query options - tokenizer and parser for $filter, $orderby and $select

pub mod lexer;
pub mod options;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use options::{OrderBy, SortOrder};
pub use parser::{parse_filter, parse_orderby, parse_select, Parser};
pub use token::{Spanned, Token};
