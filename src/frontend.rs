//! The part of compilation every backend shares: lexing, parsing and name
//! binding of a code unit body.

use crate::ast::{Ast, Scope};
use crate::backend::CompileOptions;
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::unit::{CodeUnit, ReturnType};

/// A code unit that passed the front end
#[derive(Debug, Clone)]
pub struct Analysis {
    /// The bound, and possibly optimized, function body
    pub ast: Ast,
    pub return_type: ReturnType,
    /// Warnings that were not escalated
    pub warnings: Diagnostics,
}

/// Check `unit` and bind its body.
///
/// On failure the returned diagnostics hold everything that was reported,
/// warnings included, in the order it was found.
pub fn analyze(unit: &CodeUnit, options: &CompileOptions) -> Result<Analysis, Diagnostics> {
    let body = unit.body();
    let (tokens, mut diagnostics) = Lexer::new(body).tokenize();

    let mut ast = None;
    if !diagnostics.has_errors() {
        match Parser::new(tokens, body.len()).parse() {
            Ok(items) => {
                let scope = Scope {
                    parameter: unit.function.parameter,
                    imports: &unit.imports,
                };
                ast = Ast::from_postfix(items, &scope, &mut diagnostics);
                if ast.is_none() {
                    diagnostics.push(Diagnostic::error(
                        "CF0005",
                        "the body is not a single expression",
                        0..body.len(),
                    ));
                }
            }
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    if options.warnings_as_errors {
        diagnostics.escalate_warnings();
    }

    match ast {
        Some(ast) if !diagnostics.has_errors() => {
            let ast = if options.optimize { ast.optimize() } else { ast };
            Ok(Analysis {
                ast,
                return_type: unit.function.return_type,
                warnings: diagnostics,
            })
        }
        _ => Err(diagnostics),
    }
}
