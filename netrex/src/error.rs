//! Error types for the pattern parser
//!
//! This module provides error handling using the `thiserror` crate.
//! Every failure aborts the parse as a whole; there is no partial result.

use thiserror::Error;

/// The main error type for parsing a pattern
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegexError {
    /// The tokenizer could not match a well-formed block at some offset
    #[error("malformed pattern at position {position}: {kind}")]
    MalformedPattern {
        /// Byte offset in the pattern where scanning failed
        position: usize,
        /// Why the scanner gave up
        kind: LexerErrorKind,
    },

    /// A back-reference or condition names a group that does not exist
    #[error("reference to undefined group '{group}' at position {position}")]
    UndefinedGroupReference {
        /// Byte offset just past the offending reference
        position: usize,
        /// The group number or name as written
        group: String,
    },

    /// A numeric escape that is neither a back-reference nor a valid octal escape
    #[error("unrecognized escape sequence '\\{sequence}' at position {position}")]
    InvalidEscape {
        /// Byte offset of the first digit after the backslash
        position: usize,
        /// The first character after the backslash
        sequence: char,
    },

    /// A conditional construct with more than one `|`
    #[error("too many | in conditional construct at position {position}")]
    TooManyAlternativesInCondition {
        /// Byte offset of the conditional's opening `(?`
        position: usize,
    },

    /// The builder received a block stream the tokenizer should never produce
    #[error("internal invariant violated: {0}")]
    InternalInvariantViolation(String),
}

impl RegexError {
    /// Byte offset into the pattern, when the error has one
    pub fn position(&self) -> Option<usize> {
        match self {
            RegexError::MalformedPattern { position, .. }
            | RegexError::UndefinedGroupReference { position, .. }
            | RegexError::InvalidEscape { position, .. }
            | RegexError::TooManyAlternativesInCondition { position } => Some(*position),
            RegexError::InternalInvariantViolation(_) => None,
        }
    }
}

/// Specific kinds of tokenizer errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerErrorKind {
    /// A quantifier with nothing to repeat (e.g. `*a`, `(+)`, `a**`)
    #[error("quantifier '{0}' following nothing")]
    QuantifierFollowingNothing(char),

    /// Unclosed character class (e.g., `[abc` without `]`)
    #[error("unclosed character class")]
    UnclosedCharacterClass,

    /// A `-[...]` subtraction that is not the last item of its class
    #[error("a subtraction must be the last element in a character class")]
    MisplacedSubtraction,

    /// Invalid escape sequence
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),

    /// A backslash at the very end of the pattern
    #[error("illegal \\ at end of pattern")]
    TrailingBackslash,

    /// Unclosed group
    #[error("not enough )'s")]
    UnclosedGroup,

    /// A `)` without a matching `(`
    #[error("too many )'s")]
    UnmatchedParen,

    /// Invalid group name
    #[error("invalid group name '{0}'")]
    InvalidGroupName(String),

    /// `(?` followed by something that is not a known construct
    #[error("unrecognized grouping construct")]
    UnrecognizedGroupConstruct,

    /// `(?#` without the closing `)`
    #[error("unterminated (?#...) comment")]
    UnclosedComment,

    /// `(?((?#...)...)`: a comment where a conditional's test belongs
    #[error("alternation conditions cannot be comments")]
    CommentAsCondition,
}

/// A span representing a location in the pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Start position (inclusive)
    pub start: usize,
    /// End position (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a new span
    pub fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    /// Get the length of the span
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if the span is empty
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Result type alias for parser operations
pub type Result<T> = std::result::Result<T, RegexError>;
