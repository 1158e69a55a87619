//! Transpiler producing option-scoping-safe patterns
//!
//! This module turns a .NET pattern into its portable form: the same pattern
//! with every conditional that carries inline options rewritten so that
//! .NET Framework and .NET 5+ agree on what it matches. Patterns without
//! such conditionals come back unchanged.

use crate::compat::CompatStyle;
use crate::error::Result;
use crate::parser::Parser;

/// Convert a pattern to its portable form
///
/// # Example
/// ```
/// use netrex::{CompatStyle, to_portable};
///
/// let result = to_portable("(?(exp)(?i)x|y)", CompatStyle::Rewrite).unwrap();
/// assert_eq!(result, "(?(exp)(?:(?i)x)|(?:(?i)y))");
/// ```
pub fn to_portable(input: &str, style: CompatStyle) -> Result<String> {
    let parsed = Parser::new(input).with_style(style).parse()?;
    Ok(parsed.portable_pattern)
}

/// Transpile with verbose output for debugging
pub fn transpile_debug(input: &str, style: CompatStyle) -> Result<TranspileResult> {
    let parsed = Parser::new(input).with_style(style).parse()?;

    Ok(TranspileResult {
        input: input.to_string(),
        ast: format!("{:?}", parsed.root),
        output: parsed.portable_pattern,
        rewritten: parsed.rewritten,
    })
}

/// Result of a transpilation with debug information
#[derive(Debug, Clone)]
pub struct TranspileResult {
    /// The original input pattern
    pub input: String,
    /// The AST representation (debug format)
    pub ast: String,
    /// The portable pattern
    pub output: String,
    /// Whether any conditional was rewritten
    pub rewritten: bool,
}

impl TranspileResult {
    /// Print a formatted report of the transpilation
    pub fn report(&self) {
        println!("Transpilation Report");
        println!("====================");
        println!("Input:     {}", self.input);
        println!("AST:       {}", self.ast);
        println!("Output:    {}", self.output);
        println!("Rewritten: {}", if self.rewritten { "yes" } else { "no" });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegexError;

    #[test]
    fn test_portable_unchanged_without_conditionals() {
        let result = to_portable(r"(?<y>\d{1,})-x{0,1}", CompatStyle::Annotate).unwrap();
        assert_eq!(result, r"(?<y>\d{1,})-x{0,1}");
    }

    #[test]
    fn test_portable_group_ref_untouched() {
        let result = to_portable("(a)(?(1)x|y)", CompatStyle::Rewrite).unwrap();
        assert_eq!(result, "(a)(?(1)x|y)");
    }

    #[test]
    fn test_portable_canonicalizes_when_rewritten() {
        let result = to_portable("a{1,}(?(b)(?s)c|d)", CompatStyle::Annotate).unwrap();
        assert_eq!(result, "a+(?(b)(?:(?s)c)|(?:(?s)d))");
    }

    #[test]
    fn test_portable_option_test() {
        let result = to_portable("(?(?i:a)b|c)", CompatStyle::Rewrite).unwrap();
        assert_eq!(result, "(?(?:(?i:a))b|c)");
        let result = to_portable("(?(?i:a)b|c)", CompatStyle::Annotate).unwrap();
        assert_eq!(result, "(?(?:(?i:a))b|c)");
    }

    #[test]
    fn test_portable_empty() {
        assert_eq!(to_portable("", CompatStyle::Annotate).unwrap(), "");
    }

    #[test]
    fn test_portable_error() {
        let result = to_portable("(abc", CompatStyle::Annotate);
        assert!(matches!(result, Err(RegexError::MalformedPattern { .. })));
    }

    #[test]
    fn test_transpile_debug() {
        let result = transpile_debug("(?(x)(?m)a|b)", CompatStyle::Rewrite).unwrap();
        assert_eq!(result.input, "(?(x)(?m)a|b)");
        assert_eq!(result.output, "(?(x)(?:(?m)a)|(?:(?m)b))");
        assert!(result.rewritten);
        assert!(result.ast.starts_with("Conditional"));
    }
}
