//! Group registry for resolving capture group identities
//!
//! The registry is built once per parse from the lexer's capture evidence:
//! the number of plain capturing parentheses and every declared group name.
//! Plain groups own the numbers `1..=group_count`. Each distinct non-numeric
//! name is then given a synthetic number, starting after the plain groups and
//! skipping every number that is already taken. The name and its number are
//! recorded in both directions so a reference can be resolved from either.
//!
//! The registry answers two questions for the builder:
//! - is this token (digits or a name) a known group identity?
//! - which group does it denote?

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A resolved group identity
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId {
    /// The identity as written in the pattern (digits or a name)
    pub token: String,
    /// The group's number
    pub number: u32,
    /// The other side of a name/number pairing, if the group has one
    pub alias: Option<String>,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.token)
    }
}

/// Information about a capture group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// The group's number
    pub number: u32,
    /// The name of the group (if it's a named group)
    pub name: Option<String>,
}

/// Registry of every group identity in one pattern
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupRegistry {
    /// Every token that denotes a group: plain numbers, numeric names, names,
    /// synthetic numbers
    known: HashSet<String>,
    /// name -> synthetic number and synthetic number -> name
    aliases: HashMap<String, String>,
    /// How many plain parentheses captured
    group_count: u32,
}

fn is_numeric(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

/// The lookup key of a token: numbers lose their leading zeros (`01` is `1`)
fn key(token: &str) -> Cow<'_, str> {
    if is_numeric(token)
        && let Ok(number) = token.parse::<u32>()
    {
        return Cow::Owned(number.to_string());
    }
    Cow::Borrowed(token)
}

impl GroupRegistry {
    /// Build the registry from the plain capture count and the declared names
    /// in order of appearance
    pub fn from_captures(group_count: u32, names: &[String]) -> Self {
        let mut known: HashSet<String> = (1..=group_count).map(|n| n.to_string()).collect();
        known.extend(names.iter().map(|name| key(name).into_owned()));

        let mut aliases = HashMap::new();
        let mut next = u64::from(group_count) + 1;
        for name in names {
            if name.starts_with(|c: char| c.is_ascii_digit()) || aliases.contains_key(name) {
                continue;
            }
            let mut number = next.to_string();
            while known.contains(&number) {
                next += 1;
                number = next.to_string();
            }
            aliases.insert(name.clone(), number.clone());
            aliases.insert(number.clone(), name.clone());
            known.insert(number);
        }

        GroupRegistry {
            known,
            aliases,
            group_count,
        }
    }

    /// Whether `token` (digits or a name) denotes a group in this pattern
    pub fn is_known_group(&self, token: &str) -> bool {
        self.known.contains(key(token).as_ref())
    }

    /// Resolve a token to its group identity
    pub fn resolve(&self, token: &str) -> Option<GroupId> {
        if !self.is_known_group(token) {
            return None;
        }
        let key = key(token);
        let alias = self.aliases.get(key.as_ref()).cloned();
        let number = if is_numeric(&key) {
            key.parse().ok()?
        } else {
            alias.as_deref()?.parse().ok()?
        };
        Some(GroupId {
            token: token.to_string(),
            number,
            alias,
        })
    }

    /// Get the number of plain capturing parentheses
    pub fn group_count(&self) -> u32 {
        self.group_count
    }

    /// Every group, ordered by number
    pub fn groups(&self) -> Vec<GroupInfo> {
        let mut groups: Vec<GroupInfo> = self
            .known
            .iter()
            .filter(|token| is_numeric(token))
            .filter_map(|token| {
                Some(GroupInfo {
                    number: token.parse().ok()?,
                    name: self.aliases.get(token).cloned(),
                })
            })
            .collect();
        groups.sort_by_key(|g| g.number);
        groups
    }
}
