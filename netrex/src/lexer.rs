//! Lexer for splitting regex patterns into blocks
//!
//! The lexer makes a single pass over the pattern and produces an ordered
//! list of [`Block`]s. Every block has one prefix [`Token`], an optional raw
//! quantifier with its laziness marker, and the trivia (comments and
//! insignificant whitespace) found around that quantifier, split by where
//! they sit relative to it.
//!
//! While scanning, the lexer also keeps the state the builder cannot
//! reconstruct on its own:
//! - a stack of open groups, each saving the option flags to restore on `)`
//! - the free-spacing (`x`) and explicit-capture (`n`) options in effect
//! - a counter numbering plain capturing parentheses in opening order
//! - every declared group name, in order of appearance

use crate::error::{LexerErrorKind, RegexError, Result, Span};
use crate::flags::{ModeFlags, is_option_char};

/// The prefix of a block
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Plain `(`, carrying its capture number when it captures
    LeftParen(Option<u32>),
    /// A grouping construct opener such as `(?:`, `(?=`, `(?<name>` or `(?i:`
    GroupOpen(GroupConstruct),
    /// `(?` opening a conditional construct; the test group follows
    ConditionalOpen,
    /// A standalone option setter such as `(?i-x)`
    InlineOptions(String),
    /// Right parenthesis `)`
    RightParen,
    /// Pipe `|` (alternation)
    Pipe,
    /// `^`, `$`, `\A`, `\z`, `\Z`, `\G`, `\b`, `\B`
    Anchor(String),
    /// `[...]`, `\d`, `\w`, `\s`, `\p{..}` and their negations
    CharacterClass(String),
    /// `\` + digits, plus any literal characters absorbed after them
    NumericEscape(String),
    /// `\k<name>` or `\k'name'`
    NamedBackreference {
        /// The escape as written
        text: String,
        /// The referenced group name or number
        name: String,
    },
    /// A run of ordinary characters and simple escapes
    Literal(String),
    /// No prefix; the block only carries trivia
    Empty,
}

/// The text of a `(?...` group opener, with the names it declares
#[derive(Debug, Clone, PartialEq)]
pub struct GroupConstruct {
    /// The opener as written, e.g. `(?<open-close>`
    pub text: String,
    /// The name this group captures under
    pub capture: Option<String>,
    /// The earlier group a balancing group pops
    pub balance: Option<String>,
}

impl GroupConstruct {
    fn plain(text: &str) -> Self {
        GroupConstruct {
            text: text.to_string(),
            capture: None,
            balance: None,
        }
    }
}

/// Text with no matching semantics, kept for exact reproduction
#[derive(Debug, Clone, PartialEq)]
pub enum Trivia {
    /// `(?#...)`
    InlineComment(String),
    /// `# ...` up to the end of the line (free-spacing mode only)
    EndOfLineComment(String),
    /// Ignored whitespace (free-spacing mode only)
    Whitespace(String),
}

impl Trivia {
    /// The trivia as written
    pub fn text(&self) -> &str {
        match self {
            Trivia::InlineComment(s) | Trivia::EndOfLineComment(s) | Trivia::Whitespace(s) => s,
        }
    }
}

/// One unit of the tokenized pattern
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The syntactic unit
    pub token: Token,
    /// Where the prefix sits in the pattern
    pub span: Span,
    /// The raw quantifier (`*`, `+`, `?`, `{n}`, `{n,}`, `{n,m}`), empty when absent
    pub quantifier: String,
    /// Whether a lazy `?` followed the quantifier
    pub lazy: bool,
    /// Trivia between the prefix and its quantifier
    pub inner_trivia: Vec<Trivia>,
    /// Trivia between the quantifier and its lazy `?`
    pub lazy_trivia: Vec<Trivia>,
    /// Trivia after the block, in source order
    pub trivia: Vec<Trivia>,
}

impl Block {
    fn bare(token: Token, span: Span) -> Self {
        Block {
            token,
            span,
            quantifier: String::new(),
            lazy: false,
            inner_trivia: Vec::new(),
            lazy_trivia: Vec::new(),
            trivia: Vec::new(),
        }
    }
}

/// The lexer output
#[derive(Debug, Clone, PartialEq)]
pub struct Tokenized {
    /// Blocks in source order
    pub blocks: Vec<Block>,
    /// How many plain parentheses received a capture number
    pub group_count: u32,
    /// Every declared capture name, in order of appearance (duplicates kept)
    pub group_names: Vec<String>,
}

/// An open group on the lexer's stack
#[derive(Debug, Clone, Copy)]
struct Scope {
    start: usize,
    saved: ModeFlags,
}

/// Lexer for tokenizing regex patterns
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    flags: ModeFlags,
    scopes: Vec<Scope>,
    group_count: u32,
    group_names: Vec<String>,
    /// Set by `(?(` when the next `(` is a bare condition test
    condition_test_pending: bool,
}

/// Whitespace ignored in free-spacing mode
fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n' | '\x0C')
}

/// Check if a character is valid in a group name
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Escapes that never join a literal run
fn is_special_escape(c: char) -> bool {
    c.is_ascii_digit() || "PpkcuxdDwWsSAzZGbB".contains(c)
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input string
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            position: 0,
            flags: ModeFlags::default(),
            scopes: Vec::new(),
            group_count: 0,
            group_names: Vec::new(),
            condition_test_pending: false,
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(mut self) -> Result<Tokenized> {
        let mut blocks = Vec::new();
        while let Some(block) = self.next_block()? {
            blocks.push(block);
        }
        if let Some(scope) = self.scopes.last() {
            return Err(self.error(scope.start, LexerErrorKind::UnclosedGroup));
        }
        Ok(Tokenized {
            blocks,
            group_count: self.group_count,
            group_names: self.group_names,
        })
    }

    /// Get the next block from the input, `None` at the end
    pub fn next_block(&mut self) -> Result<Option<Block>> {
        let start = self.position;
        let trivia = self.read_trivia()?;
        if !trivia.is_empty() {
            let mut block = Block::bare(Token::Empty, Span::new(start, self.position));
            block.trivia = trivia;
            return Ok(Some(block));
        }

        let Some(c) = self.peek() else {
            return Ok(None);
        };
        let block = match c {
            '(' => self.read_group_open()?,
            ')' => self.read_right_paren()?,
            '|' => {
                self.position += 1;
                Block::bare(Token::Pipe, Span::new(start, self.position))
            }
            '^' | '$' => {
                self.position += 1;
                Block::bare(Token::Anchor(c.to_string()), Span::new(start, self.position))
            }
            '[' => {
                let class = self.read_class()?;
                self.finish_block(Token::CharacterClass(class), start)?
            }
            '\\' => self.read_escape()?,
            '*' | '+' | '?' => {
                return Err(self.error(start, LexerErrorKind::QuantifierFollowingNothing(c)));
            }
            '{' if self.quantifier_len(start) > 0 => {
                return Err(self.error(start, LexerErrorKind::QuantifierFollowingNothing(c)));
            }
            _ => self.read_literal()?,
        };
        Ok(Some(block))
    }

    fn error(&self, position: usize, kind: LexerErrorKind) -> RegexError {
        RegexError::MalformedPattern { position, kind }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn peek(&self) -> Option<char> {
        self.char_at(self.position)
    }

    fn char_at(&self, position: usize) -> Option<char> {
        self.input.get(position..)?.chars().next()
    }

    fn open_scope(&mut self, start: usize) {
        self.scopes.push(Scope {
            start,
            saved: self.flags,
        });
    }

    /// The trivia item starting at `position`, if any
    fn trivia_at(&self, position: usize) -> Option<Trivia> {
        let rest = self.input.get(position..)?;
        if rest.starts_with("(?#") {
            let end = rest.find(')')?;
            return Some(Trivia::InlineComment(rest[..=end].to_string()));
        }
        if self.flags.extended {
            let blank = rest.len() - rest.trim_start_matches(is_blank).len();
            if blank > 0 {
                return Some(Trivia::Whitespace(rest[..blank].to_string()));
            }
            if rest.starts_with('#') {
                let end = rest.find(['\r', '\n']).unwrap_or(rest.len());
                return Some(Trivia::EndOfLineComment(rest[..end].to_string()));
            }
        }
        None
    }

    fn read_trivia(&mut self) -> Result<Vec<Trivia>> {
        let mut trivia = Vec::new();
        while let Some(item) = self.trivia_at(self.position) {
            self.position += item.text().len();
            trivia.push(item);
        }
        if self.rest().starts_with("(?#") {
            return Err(self.error(self.position, LexerErrorKind::UnclosedComment));
        }
        Ok(trivia)
    }

    /// Position of the first non-trivia character at or after `position`
    fn skip_trivia(&self, mut position: usize) -> usize {
        while let Some(item) = self.trivia_at(position) {
            position += item.text().len();
        }
        position
    }

    /// Length of the quantifier starting exactly at `position`, 0 when none
    fn quantifier_len(&self, position: usize) -> usize {
        let Some(rest) = self.input.get(position..) else {
            return 0;
        };
        let bytes = rest.as_bytes();
        let digits_from = |i: usize| {
            bytes[i.min(bytes.len())..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count()
        };
        match bytes.first() {
            Some(b'*' | b'+' | b'?') => 1,
            Some(b'{') => {
                let min = digits_from(1);
                if min == 0 {
                    return 0;
                }
                let mut i = 1 + min;
                if bytes.get(i) == Some(&b',') {
                    i += 1;
                    i += digits_from(i);
                }
                if bytes.get(i) == Some(&b'}') {
                    i + 1
                } else {
                    0
                }
            }
            _ => 0,
        }
    }

    fn followed_by_quantifier(&self, position: usize) -> bool {
        self.quantifier_len(self.skip_trivia(position)) > 0
    }

    /// Length of one literal unit (a plain character or a simple escape)
    fn literal_unit_len(&self, position: usize) -> Option<usize> {
        let mut chars = self.input.get(position..)?.chars();
        let c = chars.next()?;
        match c {
            '[' | '+' | '*' | '?' | '(' | ')' | '|' | '^' | '$' => None,
            '\\' => {
                let next = chars.next()?;
                if is_special_escape(next) {
                    None
                } else {
                    Some(1 + next.len_utf8())
                }
            }
            c if self.flags.extended && (is_blank(c) || c == '#') => None,
            c => Some(c.len_utf8()),
        }
    }

    /// Read trailing trivia, then the quantifier and laziness marker if present
    fn finish_block(&mut self, token: Token, start: usize) -> Result<Block> {
        let mut block = Block::bare(token, Span::new(start, self.position));
        let trivia = self.read_trivia()?;
        let len = self.quantifier_len(self.position);
        if len == 0 {
            block.trivia = trivia;
            return Ok(block);
        }

        block.inner_trivia = trivia;
        block.quantifier = self.input[self.position..self.position + len].to_string();
        self.position += len;
        let trivia = self.read_trivia()?;
        if self.peek() == Some('?') {
            self.position += 1;
            block.lazy = true;
            block.lazy_trivia = trivia;
        } else {
            block.trivia = trivia;
        }
        Ok(block)
    }

    fn read_group_open(&mut self) -> Result<Block> {
        let start = self.position;
        let rest = self.rest();
        let Some(after) = rest.strip_prefix("(?") else {
            self.position += 1;
            let capture = if std::mem::take(&mut self.condition_test_pending)
                || self.flags.explicit_capture
            {
                None
            } else {
                self.group_count += 1;
                Some(self.group_count)
            };
            self.open_scope(start);
            return Ok(Block::bare(Token::LeftParen(capture), Span::new(start, self.position)));
        };

        let token = match after.chars().next() {
            Some(':' | '>' | '=' | '!') => self.fixed_construct(start, 3),
            Some('<') if after[1..].starts_with(['=', '!']) => self.fixed_construct(start, 4),
            Some('<' | '\'') => self.read_named_group(start)?,
            Some('(') if after[1..].starts_with("?#") => {
                return Err(self.error(start + 2, LexerErrorKind::CommentAsCondition));
            }
            Some('(') => {
                // the test of `(?(name)...)` is a bare paren that never captures
                self.condition_test_pending = !after[1..].starts_with('?');
                self.position += 2;
                self.open_scope(start);
                Token::ConditionalOpen
            }
            Some(c) if is_option_char(c) => self.read_options(start)?,
            _ => return Err(self.error(start, LexerErrorKind::UnrecognizedGroupConstruct)),
        };
        Ok(Block::bare(token, Span::new(start, self.position)))
    }

    fn fixed_construct(&mut self, start: usize, len: usize) -> Token {
        self.position = start + len;
        self.open_scope(start);
        Token::GroupOpen(GroupConstruct::plain(&self.input[start..self.position]))
    }

    /// `(?<name>`, `(?'name'`, `(?<name-other>`, `(?'-other'`
    fn read_named_group(&mut self, start: usize) -> Result<Token> {
        let close = if self.char_at(start + 2) == Some('<') {
            '>'
        } else {
            '\''
        };
        let mut position = start + 3;
        let capture = self.read_group_name(&mut position)?;
        let balance = if self.char_at(position) == Some('-') {
            position += 1;
            match self.read_group_name(&mut position)? {
                Some(name) => Some(name),
                None => {
                    let kind = LexerErrorKind::InvalidGroupName(String::new());
                    return Err(self.error(position, kind));
                }
            }
        } else {
            None
        };
        if (capture.is_none() && balance.is_none()) || self.char_at(position) != Some(close) {
            let written = self.input[start + 3..position].to_string();
            return Err(self.error(start, LexerErrorKind::InvalidGroupName(written)));
        }
        position += 1;

        if let Some(name) = &capture {
            self.group_names.push(name.clone());
        }
        let text = self.input[start..position].to_string();
        self.position = position;
        self.open_scope(start);
        Ok(Token::GroupOpen(GroupConstruct {
            text,
            capture,
            balance,
        }))
    }

    /// Read a group name: all digits, or a non-digit word character followed by word characters
    fn read_group_name(&self, position: &mut usize) -> Result<Option<String>> {
        let rest = &self.input[*position..];
        let len = rest.len() - rest.trim_start_matches(is_word_char).len();
        if len == 0 {
            return Ok(None);
        }
        let name = &rest[..len];
        if name.starts_with(|c: char| c.is_ascii_digit())
            && (!name.bytes().all(|b| b.is_ascii_digit()) || name.parse::<u32>().is_err())
        {
            return Err(self.error(*position, LexerErrorKind::InvalidGroupName(name.to_string())));
        }
        *position += len;
        Ok(Some(name.to_string()))
    }

    /// `(?imnsx-imnsx)` or `(?imnsx-imnsx:`
    fn read_options(&mut self, start: usize) -> Result<Token> {
        let body = &self.input[start + 2..];
        let len = body.len() - body.trim_start_matches(is_option_char).len();
        let options = &body[..len];
        let end = start + 2 + len + 1;
        match body[len..].chars().next() {
            Some(')') => {
                self.flags.apply(options);
                self.position = end;
                Ok(Token::InlineOptions(self.input[start..end].to_string()))
            }
            Some(':') => {
                self.open_scope(start);
                self.flags.apply(options);
                self.position = end;
                Ok(Token::GroupOpen(GroupConstruct::plain(&self.input[start..end])))
            }
            _ => Err(self.error(start, LexerErrorKind::UnrecognizedGroupConstruct)),
        }
    }

    fn read_right_paren(&mut self) -> Result<Block> {
        let start = self.position;
        let Some(scope) = self.scopes.pop() else {
            return Err(self.error(start, LexerErrorKind::UnmatchedParen));
        };
        self.flags = scope.saved;
        self.position += 1;
        self.finish_block(Token::RightParen, start)
    }

    /// Scan a whole character class, including nested `-[...]` subtractions
    fn read_class(&mut self) -> Result<String> {
        let start = self.position;
        self.position += 1;
        self.read_class_body(start)?;
        Ok(self.input[start..self.position].to_string())
    }

    fn read_class_body(&mut self, start: usize) -> Result<()> {
        if self.peek() == Some('^') {
            self.position += 1;
        }
        // a leading `]` is literal
        if self.peek() == Some(']') {
            self.position += 1;
        }
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error(start, LexerErrorKind::UnclosedCharacterClass));
            };
            match c {
                ']' => {
                    self.position += 1;
                    return Ok(());
                }
                '\\' => self.read_class_escape()?,
                '-' if self.rest().starts_with("-[") => {
                    let nested = self.position + 1;
                    self.position += 2;
                    self.read_class_body(nested)?;
                    if self.peek() != Some(']') {
                        return Err(self.error(self.position, LexerErrorKind::MisplacedSubtraction));
                    }
                    self.position += 1;
                    return Ok(());
                }
                c => self.position += c.len_utf8(),
            }
        }
    }

    fn read_class_escape(&mut self) -> Result<()> {
        let start = self.position;
        let Some(c) = self.char_at(start + 1) else {
            return Err(self.error(start, LexerErrorKind::TrailingBackslash));
        };
        self.position = start + 1 + c.len_utf8();
        match c {
            'p' | 'P' => self.read_property(start, c),
            'u' => self.read_hex(start, c, 4),
            'x' => self.read_hex(start, c, 2),
            'c' => self.read_control(start),
            _ => Ok(()),
        }
    }

    /// `{Name}` after `\p` / `\P`
    fn read_property(&mut self, start: usize, c: char) -> Result<()> {
        let rest = self.rest();
        let is_name_char = |ch: char| ch.is_ascii_alphanumeric() || ch == '-';
        let name_len = rest
            .strip_prefix('{')
            .map(|r| r.len() - r.trim_start_matches(is_name_char).len())
            .unwrap_or(0);
        if name_len == 0 || rest.as_bytes().get(name_len + 1) != Some(&b'}') {
            return Err(self.error(start, LexerErrorKind::InvalidEscape(c)));
        }
        self.position += name_len + 2;
        Ok(())
    }

    fn read_hex(&mut self, start: usize, c: char, digits: usize) -> Result<()> {
        let rest = self.rest().as_bytes();
        if rest.len() < digits || !rest[..digits].iter().all(u8::is_ascii_hexdigit) {
            return Err(self.error(start, LexerErrorKind::InvalidEscape(c)));
        }
        self.position += digits;
        Ok(())
    }

    fn read_control(&mut self, start: usize) -> Result<()> {
        match self.peek() {
            Some(ch) if ch.is_ascii_alphabetic() || "[\\]^_".contains(ch) => {
                self.position += 1;
                Ok(())
            }
            _ => Err(self.error(start, LexerErrorKind::InvalidEscape('c'))),
        }
    }

    fn read_escape(&mut self) -> Result<Block> {
        let start = self.position;
        let Some(c) = self.char_at(start + 1) else {
            return Err(self.error(start, LexerErrorKind::TrailingBackslash));
        };
        match c {
            'd' | 'D' | 'w' | 'W' | 's' | 'S' => {
                self.position += 2;
                let text = self.input[start..self.position].to_string();
                self.finish_block(Token::CharacterClass(text), start)
            }
            'A' | 'z' | 'Z' | 'G' | 'b' | 'B' => {
                self.position += 2;
                let text = self.input[start..self.position].to_string();
                self.finish_block(Token::Anchor(text), start)
            }
            'p' | 'P' => {
                self.position += 2;
                self.read_property(start, c)?;
                let text = self.input[start..self.position].to_string();
                self.finish_block(Token::CharacterClass(text), start)
            }
            'u' | 'x' | 'c' => {
                self.position += 2;
                match c {
                    'u' => self.read_hex(start, c, 4)?,
                    'x' => self.read_hex(start, c, 2)?,
                    _ => self.read_control(start)?,
                }
                let text = self.input[start..self.position].to_string();
                self.finish_block(Token::Literal(text), start)
            }
            'k' => self.read_named_backreference(start),
            '0'..='9' => self.read_numeric_escape(start),
            _ => self.read_literal(),
        }
    }

    /// `\k<name>` or `\k'name'`
    fn read_named_backreference(&mut self, start: usize) -> Result<Block> {
        let close = match self.char_at(start + 2) {
            Some('<') => '>',
            Some('\'') => '\'',
            _ => return Err(self.error(start, LexerErrorKind::InvalidEscape('k'))),
        };
        let mut position = start + 3;
        let name = match self.read_group_name(&mut position)? {
            Some(name) if self.char_at(position) == Some(close) => name,
            _ => return Err(self.error(start, LexerErrorKind::InvalidEscape('k'))),
        };
        self.position = position + 1;
        let text = self.input[start..self.position].to_string();
        self.finish_block(Token::NamedBackreference { text, name }, start)
    }

    /// `\` + digits, absorbing following literal characters that no quantifier directly follows
    fn read_numeric_escape(&mut self, start: usize) -> Result<Block> {
        let digits = self.input[start + 1..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        let mut position = start + 1 + digits;
        while self.quantifier_len(position) == 0 {
            let Some(unit) = self.literal_unit_len(position) else {
                break;
            };
            if self.quantifier_len(position + unit) > 0 {
                break;
            }
            position += unit;
        }
        self.position = position;
        let text = self.input[start..position].to_string();
        self.finish_block(Token::NumericEscape(text), start)
    }

    /// A single quantified literal unit, or a run of literal units no quantifier can split
    fn read_literal(&mut self) -> Result<Block> {
        let start = self.position;
        let Some(unit) = self.literal_unit_len(start) else {
            return Err(RegexError::InternalInvariantViolation(format!(
                "no literal at position {start}"
            )));
        };
        if self.followed_by_quantifier(start + unit) {
            self.position = start + unit;
            let text = self.input[start..self.position].to_string();
            return self.finish_block(Token::Literal(text), start);
        }
        let mut end = start + unit;
        while let Some(next) = self.literal_unit_len(end) {
            if self.followed_by_quantifier(end + next) {
                break;
            }
            end += next;
        }
        self.position = end;
        Ok(Block::bare(
            Token::Literal(self.input[start..end].to_string()),
            Span::new(start, end),
        ))
    }
}
