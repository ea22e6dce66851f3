#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(
    clippy::needless_return,
    clippy::missing_docs_in_private_items,
    clippy::module_name_repetitions,
    clippy::non_ascii_literal
)]

//! calcfn, a crate compiling mathematical formulas to native functions.
//!
//! Formulas are typed by users at run time, and depend on a single variable
//! `x`. Each one is compiled, with Cranelift, to a function that can then be
//! called like any other. The easiest way to use this crate is through
//! [`prepare_compiler`]:
//!
//! ```
//! let compiler = calcfn::prepare_compiler();
//! let function = compiler.compile("sin(x) + 1").unwrap();
//! assert_eq!(function.invoke(0.0), 1.0);
//! ```
//!
//! Names of the math library are recognized whatever their case, and so is
//! the variable:
//!
//! ```
//! let compiler = calcfn::prepare_compiler();
//! let function = compiler.compile("Pi * X").unwrap();
//! assert_eq!(function.invoke(2.0), 2.0 * std::f64::consts::PI);
//! ```
//!
//! A formula that does not compile gives back every problem found in it:
//!
//! ```
//! let compiler = calcfn::prepare_compiler();
//! let error = compiler.compile("banana(x) + y").unwrap_err();
//! assert_eq!(error.to_string(), "2 errors occurred in compilation.");
//! for diagnostic in error.diagnostics() {
//!     assert_eq!(diagnostic.code, "CF0101");
//! }
//! ```
//!
//! The compilation can be configured with [`CompileOptions`], and code can be
//! generated by another [`Backend`]:
//!
//! ```
//! use calcfn::{CompileOptions, Compiler, Interpreter, ReturnType};
//!
//! let options = CompileOptions {
//!     return_type: ReturnType::F32,
//!     ..CompileOptions::default()
//! };
//! let compiler = Compiler::new().with_backend(Interpreter).with_options(options);
//! let function = compiler.compile("x / 3").unwrap();
//! assert_eq!(function.invoke(1.0), f64::from(1.0_f32 / 3.0));
//! ```
//!
//! # Language definition
//!
//! A formula can contain the following elements:
//!
//! - float literal values: `12.456`, `.5`, `0.0045e78`, ...;
//! - the variable `x`;
//! - left and right parenthesis;
//! - mathematical operators: `+` for addition, `-` for subtraction, `*` for
//!   multiplication, `/` for division, `%` for the truncated remainder and
//!   `^` for exponentiation. `-` and `+` can also be used as prefixes;
//! - the constants `pi` and `e`;
//! - function calls: `sin(x)`, `atan2(x, 2)`. The functions are `abs`,
//!   `acos`, `acosh`, `asin`, `asinh`, `atan`, `atan2`, `atanh`, `cbrt`,
//!   `ceil`, `cos`, `cosh`, `exp`, `floor`, `log`, `log10`, `log2`, `max`,
//!   `min`, `pow`, `round`, `sign`, `sin`, `sinh`, `sqrt`, `tan`, `tanh` and
//!   `truncate`.
//!
//! `^` binds tighter than prefix `-`, which binds tighter than `*`, `/` and
//! `%`, themselves tighter than `+` and `-`. `^` is right associative, other
//! operators are left associative.
//!
//! Evaluation follows floating point rules: division by zero gives an
//! infinity, `sqrt(-1)` gives NaN, and no function ever fails when called.
//!
//! # Technical details
//!
//! Recognized names are first qualified as paths into the `math` library.
//! The formula is then wrapped in a small code unit, checked by a
//! Shunting-Yard parser and a name binder, folded and finally handed to the
//! backend. Every compilation gets its own JIT module, freed when the
//! function is dropped.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

mod ast;
mod backend;
mod compiler;
mod diagnostic;
mod error;
mod frontend;
mod function;
mod lexer;
pub mod library;
mod parser;
mod rewrite;
mod token;
mod unit;
mod vocabulary;

pub use ast::Ast;
pub use backend::{
    live_artifacts, Artifact, Backend, Compilation, CompileOptions, EntryPoint, Interpreter, Jit,
    NativeCode,
};
pub use compiler::{prepare_compiler, Compiler};
pub use diagnostic::{Diagnostic, Diagnostics, Severity};
pub use error::CompileError;
pub use frontend::{analyze, Analysis};
pub use function::CompiledFunction;
pub use lexer::is_identifier;
pub use rewrite::{rewrite, RewriteStrategy};
pub use unit::{CodeUnit, FunctionDecl, ReturnType};
pub use vocabulary::Vocabulary;
