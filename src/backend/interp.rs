use super::{Artifact, Backend, Compilation, CompileOptions, EntryPoint, Liveness};
use crate::ast::Ast;
use crate::diagnostic::Diagnostics;
use crate::frontend::analyze;
use crate::library::{self, Member};
use crate::unit::{CodeUnit, ReturnType};

/// A backend walking the bound expression tree on every call.
///
/// No code is generated, so compiling is about as fast as parsing, while
/// every call pays for the tree walk. Results are the same as the JIT's.
///
/// # Examples
///
/// ```
/// # use calcfn::{Compiler, Interpreter};
/// let compiler = Compiler::new().with_backend(Interpreter);
/// let function = compiler.compile("x ^ 2 + 1").unwrap();
/// assert_eq!(function.invoke(3.0), 10.0);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Interpreter;

impl Backend for Interpreter {
    fn name(&self) -> &'static str {
        "interpreter"
    }

    fn compile(&self, unit: &CodeUnit, options: &CompileOptions) -> Result<Compilation, Diagnostics> {
        let analysis = analyze(unit, options)?;
        Ok(Compilation {
            artifact: Box::new(Tree {
                symbol: unit.symbol(),
                ast: analysis.ast,
                return_type: analysis.return_type,
                _live: Liveness::new(),
            }),
            warnings: analysis.warnings,
        })
    }
}

/// Artifact of the interpreter: the tree of its only function
struct Tree {
    symbol: String,
    ast: Ast,
    return_type: ReturnType,
    _live: Liveness,
}

impl Artifact for Tree {
    fn entry_point(&self, symbol: &str) -> Option<EntryPoint> {
        if symbol == self.symbol {
            Some(EntryPoint::Interpreted(0))
        } else {
            None
        }
    }

    fn call(&self, entry: EntryPoint, x: f64) -> f64 {
        match entry {
            EntryPoint::Interpreted(_) => self.return_type.cast(eval(&self.ast, x)),
            EntryPoint::Native(_) => f64::NAN,
        }
    }
}

/// Evaluate `ast` for a parameter value of `x`
pub(crate) fn eval(ast: &Ast, x: f64) -> f64 {
    match *ast {
        Ast::Parameter => x,
        Ast::Value(number) => number,
        Ast::Neg(ref arg) => -eval(arg, x),
        Ast::Add(ref left, ref right) => eval(left, x) + eval(right, x),
        Ast::Sub(ref left, ref right) => eval(left, x) - eval(right, x),
        Ast::Mul(ref left, ref right) => eval(left, x) * eval(right, x),
        Ast::Div(ref left, ref right) => eval(left, x) / eval(right, x),
        Ast::Rem(ref left, ref right) => (library::REM)(eval(left, x), eval(right, x)),
        Ast::Exp(ref left, ref right) => (library::POW)(eval(left, x), eval(right, x)),
        Ast::Unary(export, ref arg) => match export.member {
            Member::Unary(func) => func(eval(arg, x)),
            _ => f64::NAN,
        },
        Ast::Binary(export, ref left, ref right) => match export.member {
            Member::Binary(func) => func(eval(left, x), eval(right, x)),
            _ => f64::NAN,
        },
    }
}
