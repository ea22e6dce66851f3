//! The compilation driver: from a user formula to a callable function.

use crate::backend::{Backend, Compilation, CompileOptions, Jit};
use crate::diagnostic::Diagnostic;
use crate::error::CompileError;
use crate::function::CompiledFunction;
use crate::rewrite::rewrite;
use crate::unit::CodeUnit;
use crate::vocabulary::Vocabulary;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Get a compiler using the standard vocabulary, the JIT backend and the
/// default options. The vocabulary is loaded by the first call only.
///
/// # Examples
///
/// ```
/// let compiler = calcfn::prepare_compiler();
/// let function = compiler.compile("Sin(x) + 1").unwrap();
/// assert_eq!(function.invoke(0.0), 1.0);
/// ```
#[must_use]
pub fn prepare_compiler() -> Compiler {
    Compiler::new()
}

/// Compiles formulas of one variable `x` into native functions.
///
/// A compiler holds no mutable state: it can be shared between threads, and
/// every call to [`compile`](Compiler::compile) is independent from the
/// others.
pub struct Compiler {
    vocabulary: Arc<Vocabulary>,
    backend: Box<dyn Backend>,
    options: CompileOptions,
}

impl Compiler {
    /// Create a compiler with the standard vocabulary, the JIT backend and
    /// the default options.
    #[must_use]
    pub fn new() -> Self {
        Self {
            vocabulary: Vocabulary::standard(),
            backend: Box::new(Jit),
            options: CompileOptions::default(),
        }
    }

    /// Use `backend` to generate code
    #[must_use]
    pub fn with_backend<B: Backend + 'static>(mut self, backend: B) -> Self {
        self.backend = Box::new(backend);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.options = options;
        self
    }

    /// Recognize the names of `vocabulary` in formulas, instead of the
    /// standard ones.
    #[must_use]
    pub fn with_vocabulary(mut self, vocabulary: Arc<Vocabulary>) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    #[must_use]
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Compile `formula` into a function of `x`.
    ///
    /// Names of the vocabulary are recognized whatever their case, and so is
    /// the parameter: `SQRT(X)` is the same formula as `sqrt(x)`.
    ///
    /// # Errors
    ///
    /// If the formula does not compile, the error holds every diagnostic
    /// reported by the attempt, in the order they were found.
    ///
    /// ```
    /// let compiler = calcfn::prepare_compiler();
    /// let error = compiler.compile("banana(x)").unwrap_err();
    /// assert_eq!(error.to_string(), "1 error occurred in compilation.");
    /// ```
    pub fn compile(&self, formula: &str) -> Result<CompiledFunction, CompileError> {
        let watch = Instant::now();
        let expression = rewrite(formula, &self.vocabulary, self.options.rewrite);
        debug!("rewrote {:?} as {:?}", formula, expression);

        let unit = CodeUnit::build(&expression, self.options.return_type);
        trace!("compiling code unit\n{}", unit);

        let Compilation { artifact, warnings } = self.backend.compile(&unit, &self.options)?;

        let symbol = unit.symbol();
        let entry = artifact.entry_point(&symbol).ok_or_else(|| {
            Diagnostic::error(
                "CF0900",
                format!("entry point {} not found in the compiled artifact", symbol),
                0..expression.len(),
            )
        });
        let entry = match entry {
            Ok(entry) => entry,
            Err(diagnostic) => {
                let mut diagnostics = warnings;
                diagnostics.push(diagnostic);
                return Err(diagnostics.into());
            }
        };

        for warning in &warnings {
            warn!("{}: {}", symbol, warning);
        }
        debug!(
            "compiled {} with the {} backend in {}us",
            symbol,
            self.backend.name(),
            watch.elapsed().as_micros()
        );

        Ok(CompiledFunction::new(
            symbol,
            unit.to_string(),
            artifact,
            entry,
            warnings,
        ))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Compiler")
            .field("vocabulary", &self.vocabulary.len())
            .field("backend", &self.backend.name())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{prepare_compiler, Compiler};
    use crate::backend::{CompileOptions, Interpreter};
    use crate::rewrite::RewriteStrategy;
    use crate::unit::ReturnType;
    use crate::vocabulary::Vocabulary;
    use std::f64::consts::{FRAC_PI_2, PI};
    use std::sync::Arc;
    use test_case::test_case;

    fn codes(compiler: &Compiler, formula: &str) -> Vec<&'static str> {
        let error = compiler.compile(formula).unwrap_err();
        error.diagnostics().iter().map(|d| d.code).collect()
    }

    #[test_case("sin(x) + 1", 0.0 => 1.0 ; "function call")]
    #[test_case("sin(x) + 1", FRAC_PI_2 => 2.0 ; "sine at half pi")]
    #[test_case("pi * x", 2.0 => 2.0 * PI ; "constant")]
    #[test_case("2 + 3 * 4", 0.0 => 14.0 ; "precedence")]
    #[test_case("2 ^ 3 ^ 2", 0.0 => 512.0 ; "right associative power")]
    #[test_case("-x ^ 2", 3.0 => -9.0 ; "power binds tighter than minus")]
    #[test_case("(x + 1) * (x - 1)", 3.0 => 8.0 ; "parentheses")]
    #[test_case("x % 3", 7.5 => 1.5 ; "remainder")]
    #[test_case("max(x, 0) + min(x, 0)", -2.0 => -2.0 ; "binary functions")]
    #[test_case("POW(X, 2)", 3.0 => 9.0 ; "upper case")]
    #[test_case("e ^ 0", 0.0 => 1.0 ; "euler")]
    #[test_case("1e3 + x", 1.0 => 1001.0 ; "exponent literal")]
    #[test_case("math::PI * x", 1.0 => PI ; "qualified constant")]
    fn evaluate(formula: &str, x: f64) -> f64 {
        prepare_compiler().compile(formula).unwrap().invoke(x)
    }

    #[test]
    fn case_insensitive() {
        let compiler = prepare_compiler();
        let upper = compiler.compile("SQRT(X)").unwrap();
        let lower = compiler.compile("sqrt(x)").unwrap();
        for &x in &[0.0, 2.0, 16.0, 1e10] {
            assert_eq!(upper.invoke(x), lower.invoke(x));
        }
    }

    #[test]
    fn compiling_twice() {
        let compiler = prepare_compiler();
        let first = compiler.compile("x * x").unwrap();
        let second = compiler.compile("x * x").unwrap();
        assert_ne!(first.name(), second.name());
        drop(first);
        assert_eq!(second.invoke(3.0), 9.0);
    }

    #[test]
    fn ieee_semantics() {
        let compiler = prepare_compiler();
        assert_eq!(compiler.compile("1 / x").unwrap().invoke(0.0), f64::INFINITY);
        assert!(compiler.compile("sqrt(x)").unwrap().invoke(-1.0).is_nan());
        assert_eq!(compiler.compile("log(x)").unwrap().invoke(0.0), f64::NEG_INFINITY);
    }

    #[test_case("x +" => vec!["CF0003"] ; "missing operand")]
    #[test_case("" => vec!["CF0003"] ; "empty formula")]
    #[test_case("banana(x)" => vec!["CF0101"] ; "unknown function")]
    #[test_case("(x + 1" => vec!["CF0004"] ; "unclosed parenthesis")]
    #[test_case("sin(x, 2)" => vec!["CF0103"] ; "arity")]
    #[test_case("sin + 1" => vec!["CF0105"] ; "function as value")]
    #[test_case("pi(2)" => vec!["CF0104"] ; "constant called")]
    #[test_case("y + z" => vec!["CF0101", "CF0101"] ; "every unknown name")]
    #[test_case("x / 0" => vec!["CF0202"] ; "warning as error")]
    fn failures(formula: &str) -> Vec<&'static str> {
        codes(&prepare_compiler(), formula)
    }

    #[test]
    fn error_summary() {
        let error = prepare_compiler().compile("y + z").unwrap_err();
        assert_eq!(error.to_string(), "2 errors occurred in compilation.");
        assert_eq!(error.errors().count(), 2);
    }

    #[test]
    fn kept_warnings() {
        let options = CompileOptions {
            warnings_as_errors: false,
            ..CompileOptions::default()
        };
        let compiler = prepare_compiler().with_options(options);
        let function = compiler.compile("x / 0").unwrap();
        assert_eq!(function.warnings().len(), 1);
        assert_eq!(function.invoke(1.0), f64::INFINITY);

        let function = compiler.compile("x / 2").unwrap();
        assert!(function.warnings().is_empty());
    }

    #[test]
    fn overlapping_names() {
        let compiler = prepare_compiler();
        let function = compiler.compile("asinh(x) + sinh(x)").unwrap();
        assert_eq!(function.invoke(1.0), libm::asinh(1.0) + libm::sinh(1.0));

        let options = CompileOptions {
            rewrite: RewriteStrategy::Substring,
            ..CompileOptions::default()
        };
        let compiler = prepare_compiler().with_options(options);
        assert!(compiler.compile("asinh(x)").is_err());
        assert_eq!(compiler.compile("cos(x)").unwrap().invoke(0.0), 1.0);
    }

    #[test]
    fn single_precision() {
        let options = CompileOptions {
            return_type: ReturnType::F32,
            ..CompileOptions::default()
        };
        for compiler in vec![
            prepare_compiler().with_options(options),
            Compiler::new().with_backend(Interpreter).with_options(options),
        ] {
            let function = compiler.compile("x / 3").unwrap();
            assert_eq!(function.invoke(1.0), f64::from(1.0_f32 / 3.0));
        }
    }

    #[test]
    fn backends_agree() {
        let formulas = [
            "sin(x) + cos(x) * tan(x)",
            "sqrt(abs(x)) - cbrt(x) ^ 2",
            "exp(-x) + log10(abs(x) + 1) + log2(x * x + 1)",
            "atan2(x, 3) + acos(x / 10) + asin(x / 10) + atan(x)",
            "floor(x) + ceil(x) + round(x) + truncate(x) + sign(x)",
            "x % 0.7 - pow(x, 3) / 2",
            "tanh(x) + cosh(x / 4) + acosh(abs(x) + 1) + atanh(x / 10)",
            "max(x, pi) * min(x, e)",
        ];
        let jit = prepare_compiler();
        let interpreter = Compiler::new().with_backend(Interpreter);
        for formula in &formulas {
            let native = jit.compile(formula).unwrap();
            let tree = interpreter.compile(formula).unwrap();
            for &x in &[-3.5, -1.0, 0.0, 0.5, 2.25, 7.0] {
                let (a, b) = (native.invoke(x), tree.invoke(x));
                assert!(
                    a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()),
                    "{} at {}: {} != {}",
                    formula,
                    x,
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn custom_vocabulary() {
        let vocabulary = Arc::new(Vocabulary::from_names(vec!["sin"]));
        let compiler = prepare_compiler().with_vocabulary(vocabulary);
        assert_eq!(compiler.compile("SIN(x)").unwrap().invoke(0.0), 0.0);
        assert_eq!(codes(&compiler, "cos(x)"), ["CF0101"]);
    }

    #[test]
    fn source() {
        let function = prepare_compiler().compile("Pi * X").unwrap();
        assert!(function.source().contains("return (math::PI * x) as f64;"));
        assert!(function.name().starts_with("formula_evaluator.Evaluator"));
        assert!(function.name().ends_with(".execute"));
    }

    #[test]
    fn concurrent_use() {
        let compiler = prepare_compiler();
        let shared = compiler.compile("x * 2 + 1").unwrap();
        std::thread::scope(|scope| {
            for i in 0..8_i32 {
                let compiler = &compiler;
                let shared = &shared;
                scope.spawn(move || {
                    let x = f64::from(i);
                    let own = compiler.compile(&format!("x + {}", i)).unwrap();
                    assert_eq!(own.invoke(x), 2.0 * x);
                    assert_eq!(shared.invoke(x), 2.0 * x + 1.0);
                });
            }
        });
    }
}
