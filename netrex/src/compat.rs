//! Portable rendering of conditionals that contain inline options
//!
//! .NET Framework lets an inline option such as `(?i)` written directly in
//! a conditional branch leak into the branches after it. .NET 5 and later
//! scope it differently, and reject options used as the test outright. A
//! conditional renders the same under both when:
//! - an option-bearing test is wrapped in `(?:...)`
//! - an option-bearing yes branch is wrapped in `(?:...)`
//! - the no branch is wrapped too, re-opening whatever options the yes
//!   branch left switched on or off: `(?(c)(?i)x|y)` becomes
//!   `(?(c)(?:(?i)x)|(?:(?i)y))`
//!
//! [`CompatStyle::Rewrite`] performs this by changing the tree.
//! [`CompatStyle::Annotate`] records it in each conditional's
//! [`Portability`] and leaves the tree alone. Both serialize to the same text.

use thiserror::Error;

use crate::ast::{AtomKind, Condition, Portability, RegexNode, Wrapping};
use crate::flags::{OPTION_LETTERS, is_option_char, is_option_letter};

/// How the portable form is recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompatStyle {
    /// Set the `c*_wrap` flags and leave the tree's shape alone
    #[default]
    Annotate,
    /// Insert the `(?:...)` groups and option prefixes into the tree
    Rewrite,
}

/// A numeric style selector that is neither 0 nor 1
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown compatibility style {0}, expected 0 (annotate) or 1 (rewrite)")]
pub struct InvalidStyle(pub u8);

impl TryFrom<u8> for CompatStyle {
    type Error = InvalidStyle;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CompatStyle::Annotate),
            1 => Ok(CompatStyle::Rewrite),
            other => Err(InvalidStyle(other)),
        }
    }
}

/// Make every conditional in the tree portable, innermost first
///
/// Returns whether any conditional needed a change.
pub fn make_portable(node: &mut RegexNode, style: CompatStyle) -> bool {
    match node {
        RegexNode::Atom { .. } => false,
        RegexNode::Sequence { children, .. } => children
            .iter_mut()
            .fold(false, |fired, child| make_portable(child, style) | fired),
        RegexNode::Alternation { branches } => branches
            .iter_mut()
            .fold(false, |fired, branch| make_portable(branch, style) | fired),
        RegexNode::Conditional {
            condition,
            yes_branch,
            no_branch,
            portability,
            ..
        } => {
            let mut fired = false;
            if let Condition::Expression(test) = condition {
                fired |= make_portable(test, style);
            }
            fired |= make_portable(yes_branch, style);
            if let Some(no) = no_branch {
                fired |= make_portable(no, style);
            }
            fired | portable_conditional(condition, yes_branch, no_branch, portability, style)
        }
    }
}

fn portable_conditional(
    condition: &mut Condition,
    yes: &mut RegexNode,
    no: &mut Option<Box<RegexNode>>,
    portability: &mut Portability,
    style: CompatStyle,
) -> bool {
    let mut fired = false;

    if let Condition::Expression(test) = condition
        && (is_option_group(test) || test.is_atom(AtomKind::InlineOptions))
    {
        fired = true;
        match style {
            CompatStyle::Rewrite => {
                // the flag moves from the test to its new wrapper
                set_condition_test(test, false);
                wrap_in_place(test, None);
                set_condition_test(test, true);
            }
            CompatStyle::Annotate => portability.c1_wrap = true,
        }
    }

    let (yes_has_options, yes_options) = scan_branch(yes);
    let no_has_options = no.as_deref().is_some_and(|n| scan_branch(n).0);
    let mut no_done = false;

    if yes_has_options {
        fired = true;
        match style {
            CompatStyle::Rewrite => wrap_in_place(yes, None),
            CompatStyle::Annotate => portability.c2_wrap = true,
        }

        if let Some(no) = no.as_deref_mut()
            && !yes_options.is_empty()
            && !is_empty_branch(no)
        {
            let prefix = trailing_options(&yes_options);
            match style {
                CompatStyle::Rewrite => {
                    let prefix = (!prefix.is_empty())
                        .then(|| RegexNode::atom(prefix, AtomKind::InlineOptions));
                    wrap_in_place(no, prefix);
                }
                CompatStyle::Annotate => {
                    portability.c3_wrap = true;
                    portability.c3_prefix_options = prefix;
                }
            }
            no_done = true;
        }
    }

    if no_has_options && !no_done {
        fired = true;
        match style {
            CompatStyle::Rewrite => {
                if let Some(no) = no.as_deref_mut() {
                    wrap_in_place(no, None);
                }
            }
            CompatStyle::Annotate => portability.c3_wrap = true,
        }
    }

    fired
}

fn set_condition_test(node: &mut RegexNode, value: bool) {
    if let RegexNode::Sequence {
        is_condition_test, ..
    } = node
    {
        *is_condition_test = value;
    }
}

/// Whether a construct opener like `(?i:` or `(?-x:` sets options
fn is_option_text(construct_text: &str) -> bool {
    construct_text.chars().nth(2).is_some_and(is_option_char)
}

fn is_option_group(node: &RegexNode) -> bool {
    matches!(
        node,
        RegexNode::Sequence {
            wrapping: Wrapping::NamedConstruct { construct_text, .. },
            ..
        } if is_option_text(construct_text)
    )
}

/// Whether a branch directly carries options, and the texts of its bare `(?...)` option atoms
fn scan_branch(branch: &RegexNode) -> (bool, Vec<String>) {
    match branch {
        RegexNode::Sequence {
            wrapping: Wrapping::NamedConstruct { construct_text, .. },
            ..
        } => (is_option_text(construct_text), Vec::new()),
        RegexNode::Sequence {
            wrapping: Wrapping::Bracket { .. },
            ..
        } => (false, Vec::new()),
        RegexNode::Sequence { children, .. } => {
            let mut has_options = false;
            let mut options = Vec::new();
            for unit in children {
                match unit {
                    RegexNode::Atom {
                        text,
                        kind: AtomKind::InlineOptions,
                        ..
                    } => {
                        has_options = true;
                        options.push(text.clone());
                    }
                    unit if is_option_group(unit) => has_options = true,
                    _ => {}
                }
            }
            (has_options, options)
        }
        RegexNode::Atom {
            text,
            kind: AtomKind::InlineOptions,
            ..
        } => (true, vec![text.clone()]),
        _ => (false, Vec::new()),
    }
}

fn is_empty_branch(node: &RegexNode) -> bool {
    match node {
        RegexNode::Atom { text, .. } => text.is_empty(),
        RegexNode::Sequence {
            children,
            wrapping: Wrapping::None,
            quantifier,
            ..
        } => children.is_empty() && quantifier.is_empty(),
        _ => false,
    }
}

/// Wrap a node in `(?:...)`, putting `prefix` first inside the group
fn wrap_in_place(node: &mut RegexNode, prefix: Option<RegexNode>) {
    let inner = std::mem::replace(node, RegexNode::empty());
    let inner = match prefix {
        None => inner,
        Some(prefix) => match inner {
            RegexNode::Sequence {
                mut children,
                quantifier,
                wrapping: Wrapping::None,
                is_condition_test,
            } if quantifier.is_empty() => {
                children.insert(0, prefix);
                RegexNode::Sequence {
                    children,
                    quantifier,
                    wrapping: Wrapping::None,
                    is_condition_test,
                }
            }
            inner => RegexNode::sequence(vec![prefix, inner]),
        },
    };
    *node = RegexNode::wrapped(inner, Wrapping::non_capturing());
}

/// The option setting a yes branch leaves in effect, as a `(?on-off)` atom text
///
/// Atoms are scanned from the last one backwards; the latest setting of each
/// letter wins. Returns an empty string when no letter is set.
pub fn trailing_options(options: &[String]) -> String {
    let mut seen: Vec<char> = Vec::with_capacity(OPTION_LETTERS.len());
    let mut on = String::new();
    let mut off = String::new();
    for text in options.iter().rev() {
        if seen.len() == OPTION_LETTERS.len() {
            break;
        }
        let mut pending = String::new();
        for c in text.chars().rev() {
            match c {
                '+' | '?' => on.extend(pending.drain(..)),
                '-' => off.extend(pending.drain(..)),
                c if is_option_letter(c) => {
                    let letter = c.to_ascii_lowercase();
                    if !seen.contains(&letter) {
                        seen.push(letter);
                        pending.push(c);
                    }
                }
                _ => {}
            }
        }
    }
    if on.is_empty() && off.is_empty() {
        return String::new();
    }
    let on: String = on.chars().rev().collect();
    let off: String = off.chars().rev().collect();
    if off.is_empty() {
        format!("(?{on})")
    } else {
        format!("(?{on}-{off})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn options(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_style_from_u8() {
        assert_eq!(CompatStyle::try_from(0), Ok(CompatStyle::Annotate));
        assert_eq!(CompatStyle::try_from(1), Ok(CompatStyle::Rewrite));
        assert_eq!(CompatStyle::try_from(2), Err(InvalidStyle(2)));
        assert_eq!(CompatStyle::default(), CompatStyle::Annotate);
    }

    #[test]
    fn test_trailing_options_single() {
        assert_eq!(trailing_options(&options(&["(?i)"])), "(?i)");
        assert_eq!(trailing_options(&options(&["(?im-sx)"])), "(?im-sx)");
        assert_eq!(trailing_options(&options(&["(?-i)"])), "(?-i)");
    }

    #[test]
    fn test_trailing_options_latest_wins() {
        assert_eq!(trailing_options(&options(&["(?i)", "(?-i)"])), "(?-i)");
        assert_eq!(trailing_options(&options(&["(?s)", "(?i)"])), "(?si)");
        assert_eq!(trailing_options(&options(&["(?x)", "(?i-x)"])), "(?i-x)");
    }

    #[test]
    fn test_trailing_options_without_letters() {
        assert_eq!(trailing_options(&options(&["(?-)"])), "");
        assert_eq!(trailing_options(&[]), "");
    }

    #[test]
    fn test_option_text() {
        assert!(is_option_text("(?i:"));
        assert!(is_option_text("(?-x:"));
        assert!(!is_option_text("(?:"));
        assert!(!is_option_text("(?<name>"));
        assert!(!is_option_text("("));
    }

    #[test]
    fn test_scan_branch() {
        let branch = RegexNode::sequence(vec![
            RegexNode::atom("(?i)", AtomKind::InlineOptions),
            RegexNode::literal("x"),
            RegexNode::atom("(?-s)", AtomKind::InlineOptions),
        ]);
        assert_eq!(scan_branch(&branch), (true, options(&["(?i)", "(?-s)"])));

        let group = RegexNode::wrapped(
            RegexNode::literal("x"),
            Wrapping::NamedConstruct {
                construct_text: "(?m:".to_string(),
                capture_alias: None,
                balance_alias: None,
            },
        );
        assert_eq!(scan_branch(&group), (true, Vec::new()));

        let bracket = Wrapping::Bracket {
            capture_number: Some(1),
        };
        let nested = RegexNode::wrapped(branch, bracket);
        assert_eq!(scan_branch(&nested), (false, Vec::new()));
        assert_eq!(scan_branch(&RegexNode::literal("x")), (false, Vec::new()));
    }

    #[test]
    fn test_wrap_with_prefix() {
        let mut node = RegexNode::literal("y");
        wrap_in_place(&mut node, Some(RegexNode::atom("(?i)", AtomKind::InlineOptions)));
        assert_eq!(node.to_regex_string(), "(?:(?i)y)");

        let mut node = RegexNode::sequence(vec![RegexNode::literal("a"), RegexNode::literal("b")]);
        wrap_in_place(&mut node, Some(RegexNode::atom("(?s)", AtomKind::InlineOptions)));
        assert_eq!(node.to_regex_string(), "(?:(?s)ab)");
        assert_eq!(node.children().len(), 3);
    }

    fn condition_tests(node: &RegexNode) -> usize {
        let own = matches!(
            node,
            RegexNode::Sequence {
                is_condition_test: true,
                ..
            }
        );
        usize::from(own) + node.children().into_iter().map(condition_tests).sum::<usize>()
    }

    #[test]
    fn test_rewrite_moves_condition_test_flag() {
        let parsed = Parser::new("(?(?i:a)b|c)")
            .with_style(CompatStyle::Rewrite)
            .parse()
            .unwrap();
        assert_eq!(parsed.portable_pattern, "(?(?:(?i:a))b|c)");
        assert_eq!(condition_tests(&parsed.root), 1);

        let RegexNode::Conditional {
            condition: Condition::Expression(test),
            ..
        } = &parsed.root
        else {
            panic!("expected an expression conditional");
        };
        assert!(matches!(
            test.as_ref(),
            RegexNode::Sequence {
                is_condition_test: true,
                ..
            }
        ));
        assert!(matches!(
            test.children()[0],
            RegexNode::Sequence {
                is_condition_test: false,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_branch() {
        assert!(is_empty_branch(&RegexNode::empty()));
        assert!(is_empty_branch(&RegexNode::sequence(Vec::new())));
        assert!(!is_empty_branch(&RegexNode::literal("a")));
    }
}
