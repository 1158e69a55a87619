//! Netrex Core Library
//!
//! A structure parser for .NET-dialect regular expressions. Patterns are
//! parsed into a tree of sequences, alternations, atoms and conditionals,
//! which serializes back to the exact input text. Conditionals that carry
//! inline options can be rendered in a form .NET Framework and .NET 5+
//! agree on.
//!
//! ```
//! use netrex::parse;
//!
//! let parsed = parse(r"(?<year>\d{4})-(?<month>\d{2})").unwrap();
//! assert_eq!(parsed.root.to_regex_string(), r"(?<year>\d{4})-(?<month>\d{2})");
//! assert_eq!(parsed.groups.resolve("month").unwrap().number, 2);
//! ```

pub mod ast;
pub mod compat;
pub mod error;
pub mod flags;
pub mod groups;
pub mod lexer;
pub mod parser;
pub mod quantifier;
pub mod transpiler;

pub use ast::{AtomKind, Condition, Portability, RegexNode, Wrapping};
pub use compat::{CompatStyle, InvalidStyle};
pub use error::{LexerErrorKind, RegexError, Result, Span};
pub use flags::ModeFlags;
pub use groups::{GroupId, GroupInfo, GroupRegistry};
pub use lexer::{Block, Lexer, Token, Tokenized, Trivia};
pub use parser::{ParsedPattern, Parser, parse};
pub use quantifier::canonicalize;
pub use transpiler::{TranspileResult, to_portable, transpile_debug};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end() {
        // pattern -> blocks -> tree -> pattern
        let pattern = r"^(?<user>[\w.]+)@(?<host>\w+(?:\.\w+)*)$";
        let parsed = parse(pattern).unwrap();
        assert_eq!(parsed.root.to_regex_string(), pattern);
        assert_eq!(parsed.portable_pattern, pattern);
        assert!(!parsed.rewritten);
    }

    #[test]
    fn test_style_selector() {
        let style = CompatStyle::try_from(1).unwrap();
        let portable = to_portable("(?(a)(?x)b|c)", style).unwrap();
        assert_eq!(portable, "(?(a)(?:(?x)b)|(?:(?x)c))");
    }
}
