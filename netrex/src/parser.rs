//! Parser for regex patterns
//!
//! This module turns the lexer's block stream into a [`RegexNode`] tree.
//! Instead of recursive descent it keeps an explicit stack of open frames:
//! every `(`, `(?...` and `(?(` opens a frame, `|` closes the frame's current
//! branch, and `)` pops the frame and folds it into a node of its parent.
//!
//! Group identities are resolved against a [`GroupRegistry`] built from the
//! lexer's capture evidence before the tree is assembled. That registry is
//! what decides whether `\12` is a back-reference or an octal escape, and
//! whether `(?(name)...)` tests a group or matches the text `name`.

use crate::ast::{AtomKind, Condition, Portability, RegexNode, Wrapping};
use crate::compat::{CompatStyle, make_portable};
use crate::error::{RegexError, Result, Span};
use crate::groups::{GroupId, GroupRegistry};
use crate::lexer::{Block, GroupConstruct, Lexer, Token, Trivia, is_word_char};
use crate::quantifier::canonicalize_parts;

/// A parsed pattern
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPattern {
    /// The tree
    pub root: RegexNode,
    /// The pattern rendered for engines with strict option scoping; the
    /// input itself when no conditional needed a change
    pub portable_pattern: String,
    /// Whether any conditional needed a change
    pub rewritten: bool,
    /// Every group identity in the pattern
    pub groups: GroupRegistry,
}

/// Parser for regex patterns
pub struct Parser<'a> {
    input: &'a str,
    style: CompatStyle,
}

impl<'a> Parser<'a> {
    /// Create a new parser for the given input string
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            style: CompatStyle::default(),
        }
    }

    /// Choose how the portable form is recorded
    pub fn with_style(mut self, style: CompatStyle) -> Self {
        self.style = style;
        self
    }

    /// Parse the entire input
    pub fn parse(&self) -> Result<ParsedPattern> {
        let tokenized = Lexer::new(self.input).tokenize()?;
        let groups = GroupRegistry::from_captures(tokenized.group_count, &tokenized.group_names);
        let mut root = Builder::new(&groups).build(tokenized.blocks)?;

        let rewritten = make_portable(&mut root, self.style);
        let portable_pattern = if rewritten {
            root.to_regex_string()
        } else {
            self.input.to_string()
        };

        Ok(ParsedPattern {
            root,
            portable_pattern,
            rewritten,
            groups,
        })
    }
}

/// Convenience function to parse a pattern with the default style
pub fn parse(input: &str) -> Result<ParsedPattern> {
    Parser::new(input).parse()
}

#[derive(Debug)]
enum FrameKind {
    Root,
    Bracket(Option<u32>),
    Construct(GroupConstruct),
    Condition,
}

/// An open group and everything parsed inside it so far
#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    /// The branch being parsed
    children: Vec<RegexNode>,
    /// Branches already closed by `|`
    alternatives: Vec<Vec<RegexNode>>,
    /// Where the opener sits in the pattern
    start: usize,
}

impl Frame {
    fn new(kind: FrameKind, start: usize) -> Self {
        Frame {
            kind,
            children: Vec::new(),
            alternatives: Vec::new(),
            start,
        }
    }
}

/// A branch as one node: empty literal, the sole child, or a bare sequence
fn collapse(mut children: Vec<RegexNode>) -> RegexNode {
    match children.len() {
        0 => RegexNode::empty(),
        1 => children.remove(0),
        _ => RegexNode::sequence(children),
    }
}

fn body(children: Vec<RegexNode>, alternatives: Vec<Vec<RegexNode>>) -> RegexNode {
    if alternatives.is_empty() {
        return collapse(children);
    }
    let mut branches: Vec<RegexNode> = alternatives.into_iter().map(collapse).collect();
    branches.push(collapse(children));
    RegexNode::Alternation { branches }
}

fn trivia_atom(trivia: Trivia) -> RegexNode {
    match trivia {
        Trivia::InlineComment(text) => RegexNode::atom(text, AtomKind::InlineComment),
        Trivia::EndOfLineComment(text) => RegexNode::atom(text, AtomKind::EndOfLineComment),
        Trivia::Whitespace(text) => RegexNode::atom(text, AtomKind::Whitespace),
    }
}

/// Split off the last literal unit (a character or a `\`-escape)
fn split_last_unit(text: &str) -> (&str, &str) {
    let mut last = 0;
    let mut chars = text.char_indices();
    while let Some((i, c)) = chars.next() {
        last = i;
        if c == '\\' {
            chars.next();
        }
    }
    text.split_at(last)
}

/// The canonical quantifier, with trivia written before its lazy `?` kept in place
///
/// When canonicalization drops the lazy marker there is no place left for
/// them, and they are returned as atoms to follow the quantified node.
fn lazy_quantifier(raw: &str, lazy: bool, lazy_trivia: Vec<Trivia>) -> (String, Vec<RegexNode>) {
    let quantifier = canonicalize_parts(raw, lazy);
    if lazy_trivia.is_empty() {
        return (quantifier, Vec::new());
    }
    match quantifier.strip_suffix('?') {
        Some(greedy) if lazy => {
            let spacing: String = lazy_trivia.iter().map(Trivia::text).collect();
            (format!("{greedy}{spacing}?"), Vec::new())
        }
        _ => (quantifier, lazy_trivia.into_iter().map(trivia_atom).collect()),
    }
}

/// Attach a quantifier, keeping trivia written before it inside the quantified node
fn quantify(node: RegexNode, inner: Vec<RegexNode>, quantifier: String) -> Vec<RegexNode> {
    if inner.is_empty() {
        return vec![node.quantified(quantifier)];
    }
    let mut children = vec![node];
    children.extend(inner);
    if quantifier.is_empty() {
        return children;
    }
    vec![RegexNode::Sequence {
        children,
        quantifier,
        wrapping: Wrapping::None,
        is_condition_test: false,
    }]
}

/// Attach the escape's leftover literal text, binding a quantifier to its last unit
fn with_tail(
    head: RegexNode,
    tail: &str,
    inner: Vec<RegexNode>,
    quantifier: String,
) -> Vec<RegexNode> {
    if tail.is_empty() {
        return quantify(head, inner, quantifier);
    }
    if quantifier.is_empty() {
        let mut nodes = vec![head, RegexNode::literal(tail)];
        nodes.extend(inner);
        return nodes;
    }
    let (rest, last) = split_last_unit(tail);
    let mut nodes = vec![head];
    if !rest.is_empty() {
        nodes.push(RegexNode::literal(rest));
    }
    nodes.extend(quantify(RegexNode::literal(last), inner, quantifier));
    nodes
}

/// Folds blocks into a tree
struct Builder<'g> {
    groups: &'g GroupRegistry,
    stack: Vec<Frame>,
}

impl<'g> Builder<'g> {
    fn new(groups: &'g GroupRegistry) -> Self {
        Builder {
            groups,
            stack: vec![Frame::new(FrameKind::Root, 0)],
        }
    }

    fn build(mut self, blocks: Vec<Block>) -> Result<RegexNode> {
        for block in blocks {
            self.push_block(block)?;
        }
        match (self.stack.pop(), self.stack.is_empty()) {
            (
                Some(Frame {
                    kind: FrameKind::Root,
                    children,
                    alternatives,
                    ..
                }),
                true,
            ) => Ok(body(children, alternatives)),
            _ => Err(RegexError::InternalInvariantViolation(
                "group left open at end of pattern".to_string(),
            )),
        }
    }

    fn current(&mut self) -> Result<&mut Frame> {
        self.stack
            .last_mut()
            .ok_or_else(|| RegexError::InternalInvariantViolation("empty frame stack".to_string()))
    }

    fn push_node(&mut self, node: RegexNode) -> Result<()> {
        self.current()?.children.push(node);
        Ok(())
    }

    fn push_block(&mut self, block: Block) -> Result<()> {
        let Block {
            token,
            span,
            quantifier,
            lazy,
            inner_trivia,
            lazy_trivia,
            trivia,
        } = block;
        let (quantifier, stray) = lazy_quantifier(&quantifier, lazy, lazy_trivia);
        let inner: Vec<RegexNode> = inner_trivia.into_iter().map(trivia_atom).collect();

        match token {
            Token::LeftParen(capture) => {
                self.stack.push(Frame::new(FrameKind::Bracket(capture), span.start));
            }
            Token::GroupOpen(construct) => {
                self.stack.push(Frame::new(FrameKind::Construct(construct), span.start));
            }
            Token::ConditionalOpen => {
                self.stack.push(Frame::new(FrameKind::Condition, span.start));
            }
            Token::RightParen => {
                let node = self.close_frame()?;
                self.push_quantified(node, inner, quantifier)?;
            }
            Token::Pipe => {
                let frame = self.current()?;
                let branch = std::mem::take(&mut frame.children);
                frame.alternatives.push(branch);
            }
            Token::InlineOptions(text) => {
                self.push_node(RegexNode::atom(text, AtomKind::InlineOptions))?;
            }
            Token::Anchor(text) => {
                self.push_quantified(RegexNode::atom(text, AtomKind::Anchor), inner, quantifier)?;
            }
            Token::CharacterClass(text) => {
                let class = RegexNode::atom(text, AtomKind::CharacterClass);
                self.push_quantified(class, inner, quantifier)?;
            }
            Token::Literal(text) => {
                self.push_quantified(RegexNode::literal(text), inner, quantifier)?;
            }
            Token::NamedBackreference { text, name } => {
                if !self.groups.is_known_group(&name) {
                    return Err(RegexError::UndefinedGroupReference {
                        position: span.end,
                        group: name,
                    });
                }
                self.push_quantified(RegexNode::reference(text, true), inner, quantifier)?;
            }
            Token::NumericEscape(text) => {
                let nodes = self.numeric_escape(&text, span, inner, quantifier)?;
                self.current()?.children.extend(nodes);
            }
            Token::Empty => {}
        }

        let frame = self.current()?;
        frame.children.extend(stray);
        frame.children.extend(trivia.into_iter().map(trivia_atom));
        Ok(())
    }

    fn push_quantified(
        &mut self,
        node: RegexNode,
        inner: Vec<RegexNode>,
        quantifier: String,
    ) -> Result<()> {
        let nodes = quantify(node, inner, quantifier);
        self.current()?.children.extend(nodes);
        Ok(())
    }

    fn close_frame(&mut self) -> Result<RegexNode> {
        let frame = match self.stack.pop() {
            Some(frame) if !self.stack.is_empty() => frame,
            _ => {
                return Err(RegexError::InternalInvariantViolation(
                    "unmatched ) reached the builder".to_string(),
                ));
            }
        };
        let Frame {
            kind,
            children,
            alternatives,
            start,
        } = frame;

        match kind {
            FrameKind::Bracket(capture_number) => Ok(RegexNode::wrapped(
                body(children, alternatives),
                Wrapping::Bracket { capture_number },
            )),
            FrameKind::Construct(construct) => {
                let resolve = |name: Option<&str>| name.and_then(|n| self.groups.resolve(n));
                let capture_alias = resolve(construct.capture.as_deref());
                let balance_alias = resolve(construct.balance.as_deref());
                Ok(RegexNode::wrapped(
                    body(children, alternatives),
                    Wrapping::NamedConstruct {
                        construct_text: construct.text,
                        capture_alias,
                        balance_alias,
                    },
                ))
            }
            FrameKind::Condition => self.conditional(children, alternatives, start),
            FrameKind::Root => Err(RegexError::InternalInvariantViolation(
                "root frame closed".to_string(),
            )),
        }
    }

    /// Assemble `(?(test)yes|no)` from the frame's branches
    fn conditional(
        &self,
        children: Vec<RegexNode>,
        mut alternatives: Vec<Vec<RegexNode>>,
        start: usize,
    ) -> Result<RegexNode> {
        let (mut first, second) = match alternatives.len() {
            0 => (children, None),
            1 => (alternatives.remove(0), Some(children)),
            _ => return Err(RegexError::TooManyAlternativesInCondition { position: start }),
        };
        if first.is_empty() {
            return Err(RegexError::InternalInvariantViolation(
                "conditional without a test".to_string(),
            ));
        }
        let test = first.remove(0);
        let yes_branch = Box::new(collapse(first));
        let have_no_branch = second.is_some();
        let no_branch = second.map(|branch| Box::new(collapse(branch)));

        let reference = self.group_reference(&test, start)?;
        let (condition, invalidates_nearest_numbered_group) = match reference {
            Some(group) => (Condition::GroupRef(group), false),
            None => {
                let invalidates = matches!(
                    test,
                    RegexNode::Sequence {
                        wrapping: Wrapping::NamedConstruct { .. },
                        ..
                    }
                );
                (Condition::Expression(Box::new(mark_condition_test(test))), invalidates)
            }
        };

        Ok(RegexNode::Conditional {
            condition,
            yes_branch,
            no_branch,
            have_no_branch,
            invalidates_nearest_numbered_group,
            portability: Portability::default(),
        })
    }

    /// The group a `(digits)` or `(name)` test refers to
    ///
    /// An unknown name is an ordinary expression test; unknown digits are an error.
    fn group_reference(&self, test: &RegexNode, start: usize) -> Result<Option<GroupId>> {
        let RegexNode::Sequence {
            children,
            wrapping: Wrapping::Bracket { .. },
            ..
        } = test
        else {
            return Ok(None);
        };
        let [RegexNode::Atom { text, .. }] = children.as_slice() else {
            return Ok(None);
        };
        match text.chars().next() {
            Some(c) if c.is_ascii_digit() => match self.groups.resolve(text) {
                Some(group) => Ok(Some(group)),
                None => Err(RegexError::UndefinedGroupReference {
                    position: start + "(?(".len() + text.len(),
                    group: text.clone(),
                }),
            },
            Some(c) if is_word_char(c) => Ok(self.groups.resolve(text)),
            _ => Ok(None),
        }
    }

    /// Resolve `\digits...` to a back-reference or an octal escape plus any trailing literal
    ///
    /// The whole digit run is tried as a group first. Failing that, the run is
    /// octal, unless its octal prefix itself names a group: `\18` with group 1
    /// is a back-reference to 1 followed by `8`.
    fn numeric_escape(
        &self,
        text: &str,
        span: Span,
        inner: Vec<RegexNode>,
        quantifier: String,
    ) -> Result<Vec<RegexNode>> {
        let escaped = &text[1..];
        let digit_count = escaped.bytes().take_while(u8::is_ascii_digit).count();
        let digits = &escaped[..digit_count];
        let leading_zero = digits.starts_with('0');

        if !leading_zero && self.groups.is_known_group(digits) {
            let reference = RegexNode::reference(format!("\\{digits}"), true);
            return Ok(with_tail(reference, &escaped[digit_count..], inner, quantifier));
        }

        if !leading_zero && digits.len() == 1 {
            return Err(RegexError::UndefinedGroupReference {
                position: span.end,
                group: digits.to_string(),
            });
        }

        let octal_count = digits
            .bytes()
            .take(3)
            .take_while(|b| (b'0'..=b'7').contains(b))
            .count();
        if octal_count == 0 {
            return Err(RegexError::InvalidEscape {
                position: span.start + 1,
                sequence: escaped.chars().next().unwrap_or('\\'),
            });
        }
        let octal = &digits[..octal_count];
        let is_reference = !leading_zero && self.groups.is_known_group(octal);
        let node = RegexNode::reference(format!("\\{octal}"), is_reference);
        Ok(with_tail(node, &escaped[octal_count..], inner, quantifier))
    }
}

fn mark_condition_test(mut test: RegexNode) -> RegexNode {
    if let RegexNode::Sequence {
        is_condition_test, ..
    } = &mut test
    {
        *is_condition_test = true;
    }
    test
}
