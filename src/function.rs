use crate::backend::{Artifact, EntryPoint};
use crate::diagnostic::Diagnostics;
use std::fmt;

/// A formula compiled to a callable `f64 -> f64` function.
///
/// The function owns the artifact it was loaded from, and releases it when
/// dropped. It can be invoked any number of times, from any thread.
///
/// # Examples
///
/// ```
/// let compiler = calcfn::prepare_compiler();
/// let function = compiler.compile("sqrt(x) + 1").unwrap();
/// assert_eq!(function.invoke(16.0), 5.0);
/// assert_eq!(function.invoke_many(&[0.0, 4.0]), vec![1.0, 3.0]);
/// ```
pub struct CompiledFunction {
    name: String,
    source: String,
    entry: EntryPoint,
    warnings: Diagnostics,
    artifact: Box<dyn Artifact>,
}

impl CompiledFunction {
    pub(crate) fn new(
        name: String,
        source: String,
        artifact: Box<dyn Artifact>,
        entry: EntryPoint,
        warnings: Diagnostics,
    ) -> Self {
        Self {
            name,
            source,
            entry,
            warnings,
            artifact,
        }
    }

    /// Evaluate the formula for a value of `x`.
    ///
    /// Floating point rules apply: division by zero gives an infinity and
    /// domain errors give NaN.
    #[inline]
    #[must_use]
    pub fn invoke(&self, x: f64) -> f64 {
        match self.entry {
            // SAFETY: the entry point was found in `self.artifact`, which
            // lives as long as `self`.
            EntryPoint::Native(code) => unsafe { code.call(x) },
            entry => self.artifact.call(entry, x),
        }
    }

    /// Evaluate the formula for every value of `xs`, in order
    #[must_use]
    pub fn invoke_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.invoke(x)).collect()
    }

    /// Symbol of the entry point in its artifact
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The code unit this function was compiled from
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Warnings reported while compiling, when they were not treated as
    /// errors
    #[must_use]
    pub fn warnings(&self) -> &Diagnostics {
        &self.warnings
    }
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("CompiledFunction")
            .field("name", &self.name)
            .field("entry", &self.entry)
            .field("warnings", &self.warnings.len())
            .finish()
    }
}
