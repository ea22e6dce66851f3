use crate::diagnostic::Diagnostic;
use crate::token::{Op, Spanned, Token};
use std::ops::Range;

/// Output of the parser, in reverse polish notation
#[derive(Debug, Clone, PartialEq)]
pub enum Postfix {
    Number(f64),
    Name(String),
    Op(Op),
    /// A call of `name` with the given number of arguments, which precede it
    /// in the output
    Call(String, usize),
}

/// A postfix item and the source it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub node: Postfix,
    pub span: Range<usize>,
}

/// Entries of the operator stack
#[derive(Debug)]
enum Pending {
    Op(Op, Range<usize>),
    LParen(Range<usize>),
    Call {
        name: String,
        span: Range<usize>,
        commas: usize,
    },
}

/// Shunting-yard parser for the tokens of a code unit body.
///
/// Besides reordering, the parser checks the token sequence: operands and
/// operators have to alternate, parenthesis have to match and commas only
/// appear inside of calls. The first problem stops parsing.
pub struct Parser {
    tokens: std::iter::Peekable<std::vec::IntoIter<Spanned>>,
    output: Vec<Item>,
    operators: Vec<Pending>,
    /// True where the grammar needs an operand next
    expect_operand: bool,
    /// True right after an opening parenthesis
    just_opened: bool,
    end: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>, end: usize) -> Self {
        Self {
            tokens: tokens.into_iter().peekable(),
            output: Vec::new(),
            operators: Vec::new(),
            expect_operand: true,
            just_opened: false,
            end,
        }
    }

    pub fn parse(mut self) -> Result<Vec<Item>, Diagnostic> {
        while let Some(Spanned { token, span }) = self.tokens.next() {
            let opened = self.just_opened;
            self.just_opened = false;
            let called = self
                .tokens
                .peek()
                .map_or(false, |next| next.token == Token::LParen);
            match token {
                Token::Number(_) | Token::Name(_) if !self.expect_operand => {
                    return Err(unexpected(&token, span));
                }
                Token::Name(name) if called => {
                    let lparen = self.tokens.next().map_or(span.end, |t| t.span.end);
                    self.operators.push(Pending::Call {
                        name,
                        span: span.start..lparen,
                        commas: 0,
                    });
                    self.just_opened = true;
                }
                Token::Name(name) => {
                    self.output.push(Item {
                        node: Postfix::Name(name),
                        span,
                    });
                    self.expect_operand = false;
                }
                Token::Number(value) => {
                    self.output.push(Item {
                        node: Postfix::Number(value),
                        span,
                    });
                    self.expect_operand = false;
                }
                Token::Op(Op::Plus) if self.expect_operand => {}
                Token::Op(Op::Minus) if self.expect_operand => {
                    // prefix operators never pop anything
                    self.operators.push(Pending::Op(Op::Neg, span));
                }
                Token::Op(op) if self.expect_operand => {
                    return Err(missing_operand(&format!("before '{}'", op), span));
                }
                Token::Op(o1) => {
                    self.pop_operators(o1);
                    self.operators.push(Pending::Op(o1, span));
                    self.expect_operand = true;
                }
                Token::LParen if !self.expect_operand => {
                    return Err(unexpected(&token, span));
                }
                Token::LParen => {
                    self.operators.push(Pending::LParen(span));
                    self.just_opened = true;
                }
                Token::Comma => {
                    if self.expect_operand {
                        return Err(missing_operand("before ','", span));
                    }
                    self.comma(span)?;
                    self.expect_operand = true;
                }
                Token::RParen => {
                    if self.expect_operand && !opened {
                        return Err(missing_operand("before ')'", span));
                    }
                    self.close(span, opened)?;
                    self.expect_operand = false;
                }
            }
        }

        if self.expect_operand {
            return Err(missing_operand("at end of input", self.end..self.end));
        }

        while let Some(pending) = self.operators.pop() {
            match pending {
                Pending::Op(op, span) => self.output.push(Item {
                    node: Postfix::Op(op),
                    span,
                }),
                Pending::LParen(span) | Pending::Call { span, .. } => {
                    return Err(Diagnostic::error("CF0004", "unclosed '('", span));
                }
            }
        }
        Ok(self.output)
    }

    fn pop_operators(&mut self, o1: Op) {
        while let Some(Pending::Op(o2, _)) = self.operators.last() {
            let o2 = *o2;
            let pop_me = o1.is_left_associative() && o1.precedence() <= o2.precedence();
            let pop_me = pop_me || o1.is_right_associative() && o1.precedence() < o2.precedence();
            if !pop_me {
                break;
            }
            if let Some(Pending::Op(op, span)) = self.operators.pop() {
                self.output.push(Item {
                    node: Postfix::Op(op),
                    span,
                });
            }
        }
    }

    /// Move operators to the output until the innermost open parenthesis
    fn drain_group(&mut self) {
        while let Some(Pending::Op(..)) = self.operators.last() {
            if let Some(Pending::Op(op, span)) = self.operators.pop() {
                self.output.push(Item {
                    node: Postfix::Op(op),
                    span,
                });
            }
        }
    }

    fn comma(&mut self, span: Range<usize>) -> Result<(), Diagnostic> {
        self.drain_group();
        match self.operators.last_mut() {
            Some(Pending::Call { commas, .. }) => {
                *commas += 1;
                Ok(())
            }
            _ => Err(Diagnostic::error(
                "CF0005",
                "unexpected ',' outside of a function call",
                span,
            )),
        }
    }

    fn close(&mut self, span: Range<usize>, empty: bool) -> Result<(), Diagnostic> {
        self.drain_group();
        match self.operators.pop() {
            Some(Pending::LParen(_)) if empty => {
                Err(missing_operand("inside '()'", span))
            }
            Some(Pending::LParen(_)) => Ok(()),
            Some(Pending::Call {
                name,
                span: call_span,
                commas,
            }) => {
                let arguments = if empty { 0 } else { commas + 1 };
                self.output.push(Item {
                    node: Postfix::Call(name, arguments),
                    span: call_span.start..span.end,
                });
                Ok(())
            }
            _ => Err(Diagnostic::error("CF0004", "unmatched ')'", span)),
        }
    }
}

fn unexpected(token: &Token, span: Range<usize>) -> Diagnostic {
    Diagnostic::error(
        "CF0005",
        format!("unexpected {}, expected an operator", token),
        span,
    )
}

fn missing_operand(place: &str, span: Range<usize>) -> Diagnostic {
    Diagnostic::error("CF0003", format!("expected an expression {}", place), span)
}
