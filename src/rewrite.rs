//! Turning a user formula into a code unit body.
//!
//! The formula is lower-cased, then every recognized name is replaced by its
//! qualified reference `math::<name>`. Rewriting never fails; whatever it
//! produces is checked when the unit is compiled.

use crate::lexer::{is_identifier_part, is_identifier_start, scan_number};
use crate::library::LIBRARY_PATH;
use crate::vocabulary::Vocabulary;

/// How recognized names are found in a formula
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteStrategy {
    /// Replace whole identifiers only. Names nested in longer names
    /// (`sin` in `asinh`) and letters inside number literals (`e` in `1e5`)
    /// are left alone.
    Tokens,
    /// Replace every substring occurrence of every name, in registry order.
    ///
    /// This mangles overlapping names: `asin(x)` is first qualified, then the
    /// `sin` inside of it is qualified again, giving `math::amath::sin(x)`.
    /// Only useful to reproduce formulas written against that behavior.
    Substring,
}

impl Default for RewriteStrategy {
    fn default() -> Self {
        Self::Tokens
    }
}

/// Qualified reference to a vocabulary entry
fn qualify(name: &str) -> String {
    format!("{}::{}", LIBRARY_PATH, name)
}

/// Rewrite `formula` so that every name of `vocabulary` becomes a reference
/// the generated code can resolve.
///
/// # Examples
///
/// ```
/// # use calcfn::{rewrite, RewriteStrategy, Vocabulary};
/// let vocabulary = Vocabulary::standard();
/// assert_eq!(
///     rewrite("SIN(x) * Pi", &vocabulary, RewriteStrategy::Tokens),
///     "math::sin(x) * math::PI"
/// );
/// ```
#[must_use]
pub fn rewrite(formula: &str, vocabulary: &Vocabulary, strategy: RewriteStrategy) -> String {
    let formula = formula.to_lowercase();
    match strategy {
        RewriteStrategy::Tokens => rewrite_tokens(&formula, vocabulary),
        RewriteStrategy::Substring => rewrite_substrings(formula, vocabulary),
    }
}

fn rewrite_tokens(formula: &str, vocabulary: &Vocabulary) -> String {
    let mut output = String::with_capacity(formula.len() * 2);
    let mut rest = formula;

    while let Some(c) = rest.chars().next() {
        let length = if c.is_ascii_digit() || (c == '.' && starts_with_digit(&rest[1..])) {
            scan_number(rest).0.max(1)
        } else if is_identifier_start(c) {
            let length = rest
                .find(|c: char| !is_identifier_part(c))
                .unwrap_or_else(|| rest.len());
            let word = &rest[..length];
            // a name right after `::` is already qualified, only its case
            // needs restoring
            let qualified = output.ends_with("::");
            match vocabulary.canonical(word) {
                Some(canonical) if qualified => output.push_str(canonical),
                Some(canonical) => output.push_str(&qualify(canonical)),
                None => output.push_str(word),
            }
            rest = &rest[length..];
            continue;
        } else {
            c.len_utf8()
        };
        output.push_str(&rest[..length]);
        rest = &rest[length..];
    }
    output
}

fn rewrite_substrings(mut formula: String, vocabulary: &Vocabulary) -> String {
    for name in vocabulary.iter() {
        formula = formula.replace(&name.to_lowercase(), &qualify(name));
    }
    formula
}

fn starts_with_digit(text: &str) -> bool {
    text.chars().next().map_or(false, |c| c.is_ascii_digit())
}
