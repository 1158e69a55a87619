//! Quantifier canonicalization
//!
//! Counted repetitions are rewritten to their shortest equivalent form:
//! `{0,}` is `*`, `{1,}` is `+`, `{0,1}` is `?`, a count of exactly one
//! disappears and `{n,n}` becomes `{n}`. Laziness is kept where it changes
//! matching and dropped for fixed counts, where it cannot.

/// The upper bound the .NET engine treats as unbounded
pub const INFINITE: &str = "2147483647";

/// Canonicalize a raw quantifier, including its trailing lazy `?` if any
///
/// Anything that is not a counted repetition is returned unchanged, so the
/// function is idempotent.
pub fn canonicalize(quantifier: &str) -> String {
    let Some(body) = quantifier.strip_prefix('{') else {
        return quantifier.to_string();
    };
    let (body, lazy) = match body.strip_suffix('?') {
        Some(body) => (body, true),
        None => (body, false),
    };
    let Some(body) = body.strip_suffix('}') else {
        return quantifier.to_string();
    };
    let lazy = if lazy { "?" } else { "" };

    match body.split_once(',') {
        None if body == "1" => String::new(),
        None => format!("{{{body}}}"),
        Some(("0", "")) | Some(("0", INFINITE)) => format!("*{lazy}"),
        Some(("1", "")) | Some(("1", INFINITE)) => format!("+{lazy}"),
        Some(("0", "1")) => format!("?{lazy}"),
        Some(("1", "1")) => String::new(),
        Some((min, max)) if min == max => format!("{{{min}}}"),
        Some(_) => quantifier.to_string(),
    }
}

/// Canonicalize a quantifier given separately from its laziness marker
pub fn canonicalize_parts(quantifier: &str, lazy: bool) -> String {
    if quantifier.is_empty() {
        return String::new();
    }
    if lazy {
        canonicalize(&format!("{quantifier}?"))
    } else {
        canonicalize(quantifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_counts() {
        assert_eq!(canonicalize("{1}"), "");
        assert_eq!(canonicalize("{1}?"), "");
        assert_eq!(canonicalize("{3}"), "{3}");
        assert_eq!(canonicalize("{3}?"), "{3}");
    }

    #[test]
    fn test_open_ranges() {
        assert_eq!(canonicalize("{0,}"), "*");
        assert_eq!(canonicalize("{0,}?"), "*?");
        assert_eq!(canonicalize("{1,}"), "+");
        assert_eq!(canonicalize("{1,}?"), "+?");
        assert_eq!(canonicalize("{2,}"), "{2,}");
        assert_eq!(canonicalize("{2,}?"), "{2,}?");
    }

    #[test]
    fn test_bounded_ranges() {
        assert_eq!(canonicalize("{0,2147483647}"), "*");
        assert_eq!(canonicalize("{0,2147483647}?"), "*?");
        assert_eq!(canonicalize("{1,2147483647}"), "+");
        assert_eq!(canonicalize("{1,2147483647}?"), "+?");
        assert_eq!(canonicalize("{0,1}"), "?");
        assert_eq!(canonicalize("{0,1}?"), "??");
        assert_eq!(canonicalize("{1,1}"), "");
        assert_eq!(canonicalize("{1,1}?"), "");
        assert_eq!(canonicalize("{3,3}"), "{3}");
        assert_eq!(canonicalize("{3,3}?"), "{3}");
        assert_eq!(canonicalize("{2,5}"), "{2,5}");
        assert_eq!(canonicalize("{2,5}?"), "{2,5}?");
    }

    #[test]
    fn test_symbolic_unchanged() {
        for q in ["", "*", "+", "?", "*?", "+?", "??"] {
            assert_eq!(canonicalize(q), q);
        }
    }

    #[test]
    fn test_idempotent_on_table() {
        for q in [
            "{1}", "{3}?", "{0,}", "{1,}?", "{2,}", "{0,2147483647}", "{0,1}?", "{1,1}", "{3,3}?",
            "{2,5}", "{2,5}?",
        ] {
            let once = canonicalize(q);
            assert_eq!(canonicalize(&once), once, "not idempotent for {q}");
        }
    }

    #[test]
    fn test_canonicalize_parts() {
        assert_eq!(canonicalize_parts("", false), "");
        assert_eq!(canonicalize_parts("{0,}", true), "*?");
        assert_eq!(canonicalize_parts("+", true), "+?");
        assert_eq!(canonicalize_parts("{4}", false), "{4}");
    }
}
