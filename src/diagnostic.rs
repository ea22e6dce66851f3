use std::fmt::{self, Display, Formatter};
use std::ops::Range;

/// How serious a diagnostic is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl Display for Severity {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match *self {
            Self::Warning => write!(fmt, "warning"),
            Self::Error => write!(fmt, "error"),
        }
    }
}

/// One message reported while compiling a code unit.
///
/// `span` is a byte range into the body of the code unit, that is the
/// rewritten expression, not the formula as typed by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Range<usize>,
    /// Set when a warning was turned into an error.
    pub escalated: bool,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
            escalated: false,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, span: Range<usize>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
            escalated: false,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Turn a warning into an error. Errors are returned unchanged.
    #[must_use]
    pub fn escalate(mut self) -> Self {
        if self.severity == Severity::Warning {
            self.severity = Severity::Error;
            self.escalated = true;
        }
        self
    }
}

impl Display for Diagnostic {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(
            fmt,
            "{} {}: {} (at {}..{})",
            self.severity, self.code, self.message, self.span.start, self.span.end
        )?;
        if self.escalated {
            write!(fmt, " [warning treated as error]")?;
        }
        Ok(())
    }
}

/// Ordered diagnostics of one compilation attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(other);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Number of error-severity diagnostics
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_error()).count()
    }

    /// Escalate every warning to an error
    pub fn escalate_warnings(&mut self) {
        self.items = self.items.drain(..).map(Diagnostic::escalate).collect();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl From<Diagnostic> for Diagnostics {
    fn from(diagnostic: Diagnostic) -> Self {
        Self {
            items: vec![diagnostic],
        }
    }
}

impl From<Vec<Diagnostic>> for Diagnostics {
    fn from(items: Vec<Diagnostic>) -> Self {
        Self { items }
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalation() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(Diagnostic::warning("CF0201", "overflow", 0..3));
        assert!(!diagnostics.has_errors());

        diagnostics.escalate_warnings();
        assert!(diagnostics.has_errors());
        let diagnostic = &diagnostics.as_slice()[0];
        assert_eq!(diagnostic.severity, Severity::Error);
        assert!(diagnostic.escalated);
        assert_eq!(
            diagnostic.to_string(),
            "error CF0201: overflow (at 0..3) [warning treated as error]"
        );
    }

    #[test]
    fn errors_do_not_escalate() {
        let diagnostic = Diagnostic::error("CF0001", "bad", 1..2).escalate();
        assert!(!diagnostic.escalated);
        assert_eq!(diagnostic.to_string(), "error CF0001: bad (at 1..2)");
    }

    #[test]
    fn order_is_kept() {
        let diagnostics: Diagnostics = vec![
            Diagnostic::error("CF0001", "first", 0..1),
            Diagnostic::warning("CF0202", "second", 2..3),
            Diagnostic::error("CF0101", "third", 4..5),
        ]
        .into();
        let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "third"]);
        assert_eq!(diagnostics.error_count(), 2);
    }
}
