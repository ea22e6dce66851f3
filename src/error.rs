use crate::diagnostic::{Diagnostic, Diagnostics};
use std::error;
use std::fmt::{self, Display, Formatter};

/// Error type for the calcfn crate: a compilation that reported errors.
///
/// The error carries every diagnostic of the failed attempt, in the order
/// they were produced. Nothing is left half-built, so the caller can simply
/// try again with a corrected formula.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    diagnostics: Diagnostics,
}

impl CompileError {
    #[must_use]
    pub fn new(diagnostics: Diagnostics) -> Self {
        Self { diagnostics }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Diagnostics of error severity only
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    #[must_use]
    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }
}

impl From<Diagnostics> for CompileError {
    fn from(diagnostics: Diagnostics) -> Self {
        Self::new(diagnostics)
    }
}

impl Display for CompileError {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self.diagnostics.len() {
            1 => write!(fmt, "1 error occurred in compilation."),
            count => write!(fmt, "{} errors occurred in compilation.", count),
        }
    }
}

impl error::Error for CompileError {}

#[cfg(test)]
mod tests {
    use super::CompileError;
    use crate::diagnostic::{Diagnostic, Diagnostics};

    #[test]
    fn summary() {
        let single: Diagnostics = Diagnostic::error("CF0003", "expected an expression", 3..3).into();
        assert_eq!(
            CompileError::new(single).to_string(),
            "1 error occurred in compilation."
        );

        let many: Diagnostics = vec![
            Diagnostic::error("CF0101", "a", 0..1),
            Diagnostic::error("CF0101", "b", 2..3),
        ]
        .into();
        let error = CompileError::new(many);
        assert_eq!(error.to_string(), "2 errors occurred in compilation.");
        assert_eq!(error.errors().count(), 2);
    }
}
