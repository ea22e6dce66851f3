use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::library::{self, Export, Member, LIBRARY_PATH};
use crate::parser::{Item, Postfix};
use crate::token::Op;
use std::ops::Range;

/// Bound ast nodes for the expressions. Every name has been resolved: the
/// parameter is `Parameter`, constants are values and calls point at their
/// library export.
#[derive(Debug, Clone)]
pub enum Ast {
    /// The function parameter
    Parameter,
    /// A constant value
    Value(f64),
    /// -<arg>
    Neg(Box<Ast>),
    /// <left> + <right>
    Add(Box<Ast>, Box<Ast>),
    /// <left> - <right>
    Sub(Box<Ast>, Box<Ast>),
    /// <left> * <right>
    Mul(Box<Ast>, Box<Ast>),
    /// <left> / <right>
    Div(Box<Ast>, Box<Ast>),
    /// <left> % <right>
    Rem(Box<Ast>, Box<Ast>),
    /// <left> ^ <right>
    Exp(Box<Ast>, Box<Ast>),
    /// fn(<arg>)
    Unary(&'static Export, Box<Ast>),
    /// fn(<left>, <right>)
    Binary(&'static Export, Box<Ast>, Box<Ast>),
}

impl PartialEq<Self> for Ast {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ast::Parameter, Ast::Parameter) => true,
            (Ast::Value(v), Ast::Value(v2)) => v.to_le_bytes() == v2.to_le_bytes(),
            (Ast::Neg(a), Ast::Neg(a2)) => a == a2,
            (Ast::Add(a, b), Ast::Add(a2, b2)) => a == a2 && b == b2,
            (Ast::Sub(a, b), Ast::Sub(a2, b2)) => a == a2 && b == b2,
            (Ast::Mul(a, b), Ast::Mul(a2, b2)) => a == a2 && b == b2,
            (Ast::Div(a, b), Ast::Div(a2, b2)) => a == a2 && b == b2,
            (Ast::Rem(a, b), Ast::Rem(a2, b2)) => a == a2 && b == b2,
            (Ast::Exp(a, b), Ast::Exp(a2, b2)) => a == a2 && b == b2,
            (Ast::Unary(f, a), Ast::Unary(f2, a2)) => f.name == f2.name && a == a2,
            (Ast::Binary(f, a, b), Ast::Binary(f2, a2, b2)) => {
                f.name == f2.name && a == a2 && b == b2
            }
            _ => false,
        }
    }
}

/// Names visible to an expression
pub struct Scope<'a> {
    pub parameter: &'a str,
    pub imports: &'a [&'a str],
}

impl<'a> Scope<'a> {
    /// Resolve a `module::member` path to a library export
    fn export(&self, path: &str, span: &Range<usize>) -> Result<&'static Export, Diagnostic> {
        let (module, member) = match path.split_once("::") {
            Some(parts) => parts,
            None => {
                return Err(Diagnostic::error(
                    "CF0101",
                    format!("the name '{}' does not exist in the current context", path),
                    span.clone(),
                ))
            }
        };
        if module != LIBRARY_PATH || !self.imports.contains(&module) {
            return Err(Diagnostic::error(
                "CF0102",
                format!("could not find module '{}'; is an import missing?", module),
                span.clone(),
            ));
        }
        library::lookup(member).ok_or_else(|| {
            Diagnostic::error(
                "CF0101",
                format!("module '{}' has no member named '{}'", module, member),
                span.clone(),
            )
        })
    }

    fn name(&self, name: &str, span: &Range<usize>) -> Result<Ast, Diagnostic> {
        if name == self.parameter {
            return Ok(Ast::Parameter);
        }
        let export = self.export(name, span)?;
        match export.member {
            Member::Constant(value) => Ok(Ast::Value(value)),
            Member::Unary(_) | Member::Binary(_) => Err(Diagnostic::error(
                "CF0105",
                format!("function '{}' is used like a value; it must be called", name),
                span.clone(),
            )),
        }
    }

    fn call(&self, name: &str, mut args: Vec<Ast>, span: &Range<usize>) -> Result<Ast, Diagnostic> {
        if name == self.parameter {
            return Err(not_callable(name, span));
        }
        let export = self.export(name, span)?;
        let expected = export.arity().ok_or_else(|| not_callable(name, span))?;
        if args.len() != expected {
            return Err(Diagnostic::error(
                "CF0103",
                format!(
                    "function '{}' takes {} argument{} but {} were supplied",
                    name,
                    expected,
                    if expected == 1 { "" } else { "s" },
                    args.len()
                ),
                span.clone(),
            ));
        }
        let right = args.pop();
        let left = args.pop();
        match (export.member, left, right) {
            (Member::Unary(_), None, Some(arg)) => Ok(Ast::Unary(export, Box::new(arg))),
            (Member::Binary(_), Some(left), Some(right)) => {
                Ok(Ast::Binary(export, Box::new(left), Box::new(right)))
            }
            _ => Err(not_callable(name, span)),
        }
    }
}

fn not_callable(name: &str, span: &Range<usize>) -> Diagnostic {
    Diagnostic::error(
        "CF0104",
        format!("'{}' is not a function and cannot be called", name),
        span.clone(),
    )
}

impl Ast {
    /// Construct the AST for a vector of items in reverse polish notation,
    /// resolving names in `scope`.
    ///
    /// Resolution problems do not stop the construction: a failed node is
    /// replaced by a placeholder so that every unknown name gets reported.
    /// Returns `None` only if the items do not form a single expression.
    pub fn from_postfix(
        items: Vec<Item>,
        scope: &Scope,
        diagnostics: &mut Diagnostics,
    ) -> Option<Self> {
        let mut stack: Vec<Self> = Vec::new();

        for Item { node, span } in items {
            let ast = match node {
                Postfix::Number(value) => Self::Value(value),
                Postfix::Name(name) => recover(scope.name(&name, &span), diagnostics),
                Postfix::Op(Op::Neg) => Self::Neg(Box::new(stack.pop()?)),
                Postfix::Op(op) => {
                    let right = Box::new(stack.pop()?);
                    let left = Box::new(stack.pop()?);
                    if matches!(op, Op::Div | Op::Rem) && is_literal_zero(&right) {
                        diagnostics.push(Diagnostic::warning(
                            "CF0202",
                            "division by constant zero",
                            span.clone(),
                        ));
                    }
                    match op {
                        Op::Plus => Self::Add(left, right),
                        Op::Minus => Self::Sub(left, right),
                        Op::Mul => Self::Mul(left, right),
                        Op::Div => Self::Div(left, right),
                        Op::Rem => Self::Rem(left, right),
                        Op::Exp => Self::Exp(left, right),
                        Op::Neg => unreachable!("prefix operator handled above"),
                    }
                }
                Postfix::Call(name, count) => {
                    if stack.len() < count {
                        return None;
                    }
                    let args = stack.split_off(stack.len() - count);
                    recover(scope.call(&name, args, &span), diagnostics)
                }
            };
            stack.push(ast);
        }

        let ast = stack.pop()?;
        if stack.is_empty() {
            Some(ast)
        } else {
            None
        }
    }

    /// If the AST node correspond to a constant, get `Some(constant)`. Else,
    /// get `None`
    pub fn value(&self) -> Option<f64> {
        if let Self::Value(value) = *self {
            Some(value)
        } else {
            None
        }
    }

    /// Check if the expression reads the parameter
    pub fn uses_parameter(&self) -> bool {
        match self {
            Self::Parameter => true,
            Self::Value(_) => false,
            Self::Neg(arg) | Self::Unary(_, arg) => arg.uses_parameter(),
            Self::Add(left, right)
            | Self::Sub(left, right)
            | Self::Mul(left, right)
            | Self::Div(left, right)
            | Self::Rem(left, right)
            | Self::Exp(left, right)
            | Self::Binary(_, left, right) => left.uses_parameter() || right.uses_parameter(),
        }
    }

    /// Optimize the AST by doing constants propagation
    pub fn optimize(self) -> Self {
        match self {
            Self::Parameter | Self::Value(_) => self,
            Self::Neg(arg) => {
                let arg = arg.optimize();
                if let Some(arg) = arg.value() {
                    return Self::Value(-arg);
                }
                return Self::Neg(Box::new(arg));
            }
            Self::Unary(export, arg) => {
                let arg = arg.optimize();
                if let (Member::Unary(func), Some(arg)) = (export.member, arg.value()) {
                    return Self::Value(func(arg));
                }
                return Self::Unary(export, Box::new(arg));
            }
            Self::Binary(export, left, right) => {
                let left = left.optimize();
                let right = right.optimize();
                if let (Member::Binary(func), Some(l), Some(r)) =
                    (export.member, left.value(), right.value())
                {
                    return Self::Value(func(l, r));
                }
                return Self::Binary(export, Box::new(left), Box::new(right));
            }
            Self::Add(left, right) => fold(left, right, Self::Add, |l, r| l + r),
            Self::Sub(left, right) => fold(left, right, Self::Sub, |l, r| l - r),
            Self::Mul(left, right) => fold(left, right, Self::Mul, |l, r| l * r),
            Self::Div(left, right) => fold(left, right, Self::Div, |l, r| l / r),
            Self::Rem(left, right) => fold(left, right, Self::Rem, |l, r| (library::REM)(l, r)),
            Self::Exp(left, right) => fold(left, right, Self::Exp, |l, r| (library::POW)(l, r)),
        }
    }
}

/// Check if `ast` is a zero literal, possibly with signs in front of it
fn is_literal_zero(ast: &Ast) -> bool {
    match *ast {
        Ast::Value(value) => value == 0.0,
        Ast::Neg(ref arg) => is_literal_zero(arg),
        _ => false,
    }
}

/// Record a resolution failure and stand in a placeholder for the node
fn recover(result: Result<Ast, Diagnostic>, diagnostics: &mut Diagnostics) -> Ast {
    result.unwrap_or_else(|diagnostic| {
        diagnostics.push(diagnostic);
        Ast::Value(f64::NAN)
    })
}

fn fold(
    left: Box<Ast>,
    right: Box<Ast>,
    node: fn(Box<Ast>, Box<Ast>) -> Ast,
    apply: impl Fn(f64, f64) -> f64,
) -> Ast {
    let left = left.optimize();
    let right = right.optimize();
    if let Some(left) = left.value() {
        if let Some(right) = right.value() {
            return Ast::Value(apply(left, right));
        }
    }
    return node(Box::new(left), Box::new(right));
}

#[cfg(test)]
mod tests {
    use super::{Ast, Scope};
    use crate::diagnostic::Diagnostics;
    use crate::lexer::Lexer;
    use crate::library;
    use crate::parser::Parser;
    use test_case::test_case;

    const SCOPE: Scope = Scope {
        parameter: "x",
        imports: &["math"],
    };

    fn bind(input: &str) -> (Option<Ast>, Diagnostics) {
        let (tokens, _) = Lexer::new(input).tokenize();
        let items = Parser::new(tokens, input.len()).parse().unwrap();
        let mut diagnostics = Diagnostics::new();
        let ast = Ast::from_postfix(items, &SCOPE, &mut diagnostics);
        (ast, diagnostics)
    }

    fn codes(input: &str) -> Vec<&'static str> {
        bind(input).1.iter().map(|d| d.code).collect()
    }

    #[test]
    // Verifies that we have reduced the input to a single value token when possible
    fn optimize() {
        let ast = bind("3 + 5").0.unwrap().optimize();
        assert_eq!(ast.value(), Some(8.0));

        let ast = bind("(3 + 5^2)*45").0.unwrap().optimize();
        assert_eq!(ast.value(), Some(1260.0));

        let ast = bind("math::sqrt(9)").0.unwrap().optimize();
        assert_eq!(ast.value(), Some(3.0));

        let ast = bind("math::max(2, 7) % 4").0.unwrap().optimize();
        assert_eq!(ast.value(), Some(3.0));

        let ast = bind("-math::PI").0.unwrap().optimize();
        assert_eq!(ast.value(), Some(-std::f64::consts::PI));
    }

    #[test]
    fn partial_folding() {
        let ast = bind("2 * 3 + x").0.unwrap().optimize();
        assert_eq!(
            ast,
            Ast::Add(Box::new(Ast::Value(6.0)), Box::new(Ast::Parameter))
        );
        assert!(ast.uses_parameter());
    }

    #[test]
    fn calls_are_bound() {
        let ast = bind("math::sin(x)").0.unwrap();
        let sin = library::lookup("sin").unwrap();
        assert_eq!(ast, Ast::Unary(sin, Box::new(Ast::Parameter)));
    }

    #[test_case("banana(x)" => vec!["CF0101"] ; "unknown function")]
    #[test_case("y + 1" => vec!["CF0101"] ; "unknown variable")]
    #[test_case("foo + bar" => vec!["CF0101", "CF0101"] ; "every name is reported")]
    #[test_case("std::sin(x)" => vec!["CF0102"] ; "unknown module")]
    #[test_case("math::banana(x)" => vec!["CF0101"] ; "unknown member")]
    #[test_case("math::atan2(x)" => vec!["CF0103"] ; "too few arguments")]
    #[test_case("math::sin(x, 1)" => vec!["CF0103"] ; "too many arguments")]
    #[test_case("math::PI(2)" => vec!["CF0104"] ; "constant is not callable")]
    #[test_case("x(2)" => vec!["CF0104"] ; "parameter is not callable")]
    #[test_case("math::sin + 1" => vec!["CF0105"] ; "function as a value")]
    #[test_case("x / 0" => vec!["CF0202"] ; "division by zero")]
    #[test_case("x % 0.0" => vec!["CF0202"] ; "remainder by zero")]
    #[test_case("x / -0" => vec!["CF0202"] ; "division by negative zero")]
    #[test_case("x % --0.0" => vec!["CF0202"] ; "remainder by signed zero")]
    #[test_case("x / (1 - 1)" => Vec::<&str>::new() ; "only literal zero is detected")]
    fn diagnostics(input: &str) -> Vec<&'static str> {
        codes(input)
    }

    #[test]
    fn missing_import() {
        let (tokens, _) = Lexer::new("math::sin(x)").tokenize();
        let items = Parser::new(tokens, 12).parse().unwrap();
        let mut diagnostics = Diagnostics::new();
        let scope = Scope {
            parameter: "x",
            imports: &[],
        };
        Ast::from_postfix(items, &scope, &mut diagnostics);
        assert_eq!(diagnostics.as_slice()[0].code, "CF0102");
    }
}
