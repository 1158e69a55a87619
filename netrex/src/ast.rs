//! Abstract Syntax Tree (AST) for regex patterns
//!
//! This module defines the tree the parser produces and the serializer that
//! turns it back into pattern text. The tree has four node kinds:
//! - Atoms: literal text, anchors, character classes, back-references,
//!   inline options and trivia
//! - Sequences: concatenation, optionally wrapped in a group and quantified
//! - Alternations: `a|b|c`, branches in match-priority order
//! - Conditionals: `(?(test)yes|no)`
//!
//! Serialization is the exact inverse of parsing for canonical patterns, so
//! `parse(p)?.root.to_regex_string() == p` whenever `p` already uses
//! canonical quantifiers.

use std::fmt;

use crate::groups::GroupId;

/// What an [`RegexNode::Atom`] stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomKind {
    /// Literal characters, including simple escapes such as `\.` and `\x41`
    Literal,
    /// `^`, `$`, `\A`, `\z`, `\Z`, `\G`, `\b`, `\B`
    Anchor,
    /// `[...]`, `\d`, `\p{L}` and friends
    CharacterClass,
    /// `\1`, `\k<name>`, or an octal escape that looked like one
    Backreference,
    /// `(?imnsx-imnsx)`
    InlineOptions,
    /// `(?#...)`
    InlineComment,
    /// `# ...` in free-spacing mode
    EndOfLineComment,
    /// Ignored whitespace in free-spacing mode
    Whitespace,
}

/// The group syntax around a [`RegexNode::Sequence`]
#[derive(Debug, Clone, PartialEq)]
pub enum Wrapping {
    /// Bare concatenation
    None,
    /// Plain parentheses: `(...)`
    Bracket {
        /// The capture number, `None` when the group does not capture
        capture_number: Option<u32>,
    },
    /// Any `(?...` grouping construct
    NamedConstruct {
        /// The opener as written, e.g. `(?:`, `(?<=`, `(?<name>`, `(?i:`
        construct_text: String,
        /// The group this construct captures into
        capture_alias: Option<GroupId>,
        /// The group a balancing construct pops
        balance_alias: Option<GroupId>,
    },
}

impl Wrapping {
    /// A `(?:` wrapper
    pub fn non_capturing() -> Self {
        Wrapping::NamedConstruct {
            construct_text: "(?:".to_string(),
            capture_alias: None,
            balance_alias: None,
        }
    }

    fn opener(&self) -> Option<&str> {
        match self {
            Wrapping::None => None,
            Wrapping::Bracket { .. } => Some("("),
            Wrapping::NamedConstruct { construct_text, .. } => Some(construct_text),
        }
    }
}

/// The test of a conditional construct
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `(?(1)...)` or `(?(name)...)`: did the group match?
    GroupRef(GroupId),
    /// `(?(?=x)...)` or `(?(x)...)`: does the sub-expression match here?
    Expression(Box<RegexNode>),
}

/// What the compatibility rewriter recorded for a conditional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portability {
    /// Render the condition test inside `(?:...)`
    pub c1_wrap: bool,
    /// Render the yes branch inside `(?:...)`
    pub c2_wrap: bool,
    /// Render the no branch inside `(?:...)`
    pub c3_wrap: bool,
    /// Options re-opened at the start of the wrapped no branch
    pub c3_prefix_options: String,
}

/// A node of the parsed pattern
#[derive(Debug, Clone, PartialEq)]
pub enum RegexNode {
    /// A leaf
    Atom {
        /// The text as written
        text: String,
        /// What the text stands for
        kind: AtomKind,
        /// `Some(true)` for a back-reference, `Some(false)` for an octal
        /// escape, `None` for anything that is not a numeric escape
        is_reference: Option<bool>,
    },

    /// Concatenation, optionally grouped and quantified
    Sequence {
        /// The concatenated nodes
        children: Vec<RegexNode>,
        /// Canonical quantifier, empty when absent
        quantifier: String,
        /// Group syntax around the children
        wrapping: Wrapping,
        /// Whether this is the test of a conditional
        is_condition_test: bool,
    },

    /// Alternation (e.g., a|b|c)
    Alternation {
        /// Branches in the order they are tried
        branches: Vec<RegexNode>,
    },

    /// Conditional construct: `(?(test)yes|no)`
    Conditional {
        /// The test
        condition: Condition,
        /// Taken when the test succeeds
        yes_branch: Box<RegexNode>,
        /// Taken when the test fails
        no_branch: Option<Box<RegexNode>>,
        /// Whether a `|` was written
        have_no_branch: bool,
        /// The test carries its own grouping construct
        invalidates_nearest_numbered_group: bool,
        /// Compatibility annotations
        portability: Portability,
    },
}

impl RegexNode {
    /// Create an atom
    pub fn atom(text: impl Into<String>, kind: AtomKind) -> Self {
        RegexNode::Atom {
            text: text.into(),
            kind,
            is_reference: None,
        }
    }

    /// Create a literal atom
    pub fn literal(text: impl Into<String>) -> Self {
        RegexNode::atom(text, AtomKind::Literal)
    }

    /// Create the empty literal used for empty branches and group bodies
    pub fn empty() -> Self {
        RegexNode::literal("")
    }

    /// Create a numeric-escape atom
    ///
    /// A back-reference when `is_reference` is true, an octal escape otherwise.
    pub fn reference(text: impl Into<String>, is_reference: bool) -> Self {
        RegexNode::Atom {
            text: text.into(),
            kind: AtomKind::Backreference,
            is_reference: Some(is_reference),
        }
    }

    /// Create an unwrapped, unquantified sequence
    pub fn sequence(children: Vec<RegexNode>) -> Self {
        RegexNode::Sequence {
            children,
            quantifier: String::new(),
            wrapping: Wrapping::None,
            is_condition_test: false,
        }
    }

    /// Wrap `node` in a group, reusing a bare sequence instead of nesting it
    pub fn wrapped(node: RegexNode, wrapping: Wrapping) -> Self {
        match node {
            RegexNode::Sequence {
                children,
                quantifier,
                wrapping: Wrapping::None,
                is_condition_test,
            } if quantifier.is_empty() => RegexNode::Sequence {
                children,
                quantifier,
                wrapping,
                is_condition_test,
            },
            node => RegexNode::Sequence {
                children: vec![node],
                quantifier: String::new(),
                wrapping,
                is_condition_test: false,
            },
        }
    }

    /// Attach a canonical quantifier
    ///
    /// A group that has no quantifier yet takes it directly; anything else is
    /// wrapped in a bare sequence that carries it.
    pub fn quantified(self, quantifier: String) -> Self {
        if quantifier.is_empty() {
            return self;
        }
        match self {
            RegexNode::Sequence {
                children,
                quantifier: existing,
                wrapping,
                is_condition_test,
            } if existing.is_empty() && wrapping != Wrapping::None => RegexNode::Sequence {
                children,
                quantifier,
                wrapping,
                is_condition_test,
            },
            node => RegexNode::Sequence {
                children: vec![node],
                quantifier,
                wrapping: Wrapping::None,
                is_condition_test: false,
            },
        }
    }

    /// Whether this is an atom of the given kind
    pub fn is_atom(&self, expected: AtomKind) -> bool {
        matches!(self, RegexNode::Atom { kind, .. } if *kind == expected)
    }

    /// The direct subtrees of this node, in render order
    pub fn children(&self) -> Vec<&RegexNode> {
        match self {
            RegexNode::Atom { .. } => Vec::new(),
            RegexNode::Sequence { children, .. } => children.iter().collect(),
            RegexNode::Alternation { branches } => branches.iter().collect(),
            RegexNode::Conditional {
                condition,
                yes_branch,
                no_branch,
                ..
            } => {
                let mut nodes = Vec::with_capacity(3);
                if let Condition::Expression(test) = condition {
                    nodes.push(test.as_ref());
                }
                nodes.push(yes_branch.as_ref());
                if let Some(no) = no_branch {
                    nodes.push(no.as_ref());
                }
                nodes
            }
        }
    }

    /// Convert the AST back to pattern text
    pub fn to_regex_string(&self) -> String {
        let mut out = String::new();
        self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) {
        match self {
            RegexNode::Atom { text, .. } => out.push_str(text),
            RegexNode::Sequence {
                children,
                quantifier,
                wrapping,
                ..
            } => {
                let opener = wrapping.opener();
                if let Some(opener) = opener {
                    out.push_str(opener);
                }
                for child in children {
                    child.write_to(out);
                }
                if opener.is_some() {
                    out.push(')');
                }
                out.push_str(quantifier);
            }
            RegexNode::Alternation { branches } => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        out.push('|');
                    }
                    branch.write_to(out);
                }
            }
            RegexNode::Conditional {
                condition,
                yes_branch,
                no_branch,
                have_no_branch,
                portability,
                ..
            } => {
                out.push_str("(?");
                match condition {
                    Condition::GroupRef(group) => {
                        out.push('(');
                        out.push_str(&group.token);
                        out.push(')');
                    }
                    Condition::Expression(test) => write_group(out, portability.c1_wrap, "", test),
                }
                write_group(out, portability.c2_wrap, "", yes_branch);
                if *have_no_branch {
                    out.push('|');
                }
                if let Some(no) = no_branch {
                    write_group(out, portability.c3_wrap, &portability.c3_prefix_options, no);
                }
                out.push(')');
            }
        }
    }
}

/// Write `node`, inside `(?:prefix...)` when `wrap` is set
fn write_group(out: &mut String, wrap: bool, prefix: &str, node: &RegexNode) {
    if wrap {
        out.push_str("(?:");
        out.push_str(prefix);
        node.write_to(out);
        out.push(')');
    } else {
        node.write_to(out);
    }
}

impl fmt::Display for RegexNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_regex_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(token: &str, number: u32) -> GroupId {
        GroupId {
            token: token.to_string(),
            number,
            alias: None,
        }
    }

    #[test]
    fn test_atom() {
        assert_eq!(RegexNode::literal("abc").to_regex_string(), "abc");
        assert_eq!(RegexNode::empty().to_regex_string(), "");
        assert_eq!(RegexNode::reference(r"\1", true).to_regex_string(), r"\1");
    }

    #[test]
    fn test_bracket_sequence() {
        let node = RegexNode::wrapped(
            RegexNode::sequence(vec![RegexNode::literal("a"), RegexNode::literal("b")]),
            Wrapping::Bracket {
                capture_number: Some(1),
            },
        );
        assert_eq!(node.to_regex_string(), "(ab)");
        assert_eq!(node.children().len(), 2);
    }

    #[test]
    fn test_quantifier_after_close() {
        let node = RegexNode::wrapped(
            RegexNode::literal("ab"),
            Wrapping::NamedConstruct {
                construct_text: "(?<x>".to_string(),
                capture_alias: Some(group("x", 1)),
                balance_alias: None,
            },
        )
        .quantified("{2}".to_string());
        assert_eq!(node.to_regex_string(), "(?<x>ab){2}");
    }

    #[test]
    fn test_quantified_atom_gets_bare_sequence() {
        let node = RegexNode::literal("a").quantified("*?".to_string());
        assert_eq!(
            node,
            RegexNode::Sequence {
                children: vec![RegexNode::literal("a")],
                quantifier: "*?".to_string(),
                wrapping: Wrapping::None,
                is_condition_test: false,
            }
        );
        assert_eq!(node.to_regex_string(), "a*?");
    }

    #[test]
    fn test_quantified_twice_nests() {
        let node = RegexNode::wrapped(RegexNode::literal("a"), Wrapping::non_capturing())
            .quantified("+".to_string())
            .quantified("?".to_string());
        assert_eq!(node.to_regex_string(), "(?:a)+?");
        assert_eq!(node.children().len(), 1);
    }

    #[test]
    fn test_empty_quantifier_is_noop() {
        let node = RegexNode::literal("a");
        assert_eq!(node.clone().quantified(String::new()), node);
    }

    #[test]
    fn test_alternation() {
        let node = RegexNode::Alternation {
            branches: vec![
                RegexNode::literal("a"),
                RegexNode::empty(),
                RegexNode::literal("c"),
            ],
        };
        assert_eq!(node.to_regex_string(), "a||c");
    }

    #[test]
    fn test_conditional_group_ref() {
        let node = RegexNode::Conditional {
            condition: Condition::GroupRef(group("1", 1)),
            yes_branch: Box::new(RegexNode::literal("x")),
            no_branch: Some(Box::new(RegexNode::literal("y"))),
            have_no_branch: true,
            invalidates_nearest_numbered_group: false,
            portability: Portability::default(),
        };
        assert_eq!(node.to_regex_string(), "(?(1)x|y)");
        assert_eq!(node.children().len(), 2);
    }

    #[test]
    fn test_conditional_annotations() {
        let test = RegexNode::wrapped(
            RegexNode::literal("a"),
            Wrapping::NamedConstruct {
                construct_text: "(?=".to_string(),
                capture_alias: None,
                balance_alias: None,
            },
        );
        let node = RegexNode::Conditional {
            condition: Condition::Expression(Box::new(test)),
            yes_branch: Box::new(RegexNode::sequence(vec![
                RegexNode::atom("(?i)", AtomKind::InlineOptions),
                RegexNode::literal("x"),
            ])),
            no_branch: Some(Box::new(RegexNode::literal("y"))),
            have_no_branch: true,
            invalidates_nearest_numbered_group: true,
            portability: Portability {
                c1_wrap: false,
                c2_wrap: true,
                c3_wrap: true,
                c3_prefix_options: "(?i)".to_string(),
            },
        };
        assert_eq!(node.to_regex_string(), "(?(?=a)(?:(?i)x)|(?:(?i)y))");
        assert_eq!(node.children().len(), 3);
    }

    #[test]
    fn test_conditional_without_no_branch() {
        let node = RegexNode::Conditional {
            condition: Condition::GroupRef(group("name", 2)),
            yes_branch: Box::new(RegexNode::literal("x")),
            no_branch: None,
            have_no_branch: false,
            invalidates_nearest_numbered_group: false,
            portability: Portability::default(),
        };
        assert_eq!(node.to_string(), "(?(name)x)");
    }

    #[test]
    fn test_is_atom() {
        assert!(RegexNode::atom("(?x)", AtomKind::InlineOptions).is_atom(AtomKind::InlineOptions));
        assert!(!RegexNode::literal("a").is_atom(AtomKind::Anchor));
        assert!(!RegexNode::sequence(vec![]).is_atom(AtomKind::Literal));
    }
}
