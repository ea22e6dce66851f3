use std::fmt::{self, Display, Formatter};
use std::ops::Range;

/// Possible tokens to find in a code unit body
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A number literal
    Number(f64),
    /// A name, possibly a `::` separated path
    Name(String),
    /// An operator
    Op(Op),
    /// Left parenthesis
    LParen,
    /// Right parenthesis
    RParen,
    /// Argument separator
    Comma,
}

/// A token and where it was found
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Range<usize>,
}

impl Display for Token {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match *self {
            Self::Number(value) => write!(fmt, "number {}", value),
            Self::Name(ref name) => write!(fmt, "name '{}'", name),
            Self::Op(op) => write!(fmt, "'{}'", op),
            Self::LParen => write!(fmt, "'('"),
            Self::RParen => write!(fmt, "')'"),
            Self::Comma => write!(fmt, "','"),
        }
    }
}

/// Allowed operators in the algorithm
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Op {
    Plus,
    Minus,
    Mul,
    Div,
    Rem,
    Exp,
    /// Prefix minus. Never produced by the lexer, the parser turns a `Minus`
    /// in operand position into it.
    Neg,
}

impl Op {
    /// Get the operator precedence. Operators with higher precedence should be
    /// evaluated first.
    pub fn precedence(self) -> u8 {
        match self {
            Self::Plus | Self::Minus => 1,
            Self::Mul | Self::Div | Self::Rem => 2,
            Self::Neg => 3,
            Self::Exp => 4,
        }
    }

    /// Check if the operator is left associative
    pub fn is_left_associative(self) -> bool {
        match self {
            Self::Plus | Self::Minus | Self::Mul | Self::Div | Self::Rem => true,
            Self::Exp | Self::Neg => false,
        }
    }

    /// Check if the operator is right associative
    pub fn is_right_associative(self) -> bool {
        !self.is_left_associative()
    }
}

impl Display for Op {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        let symbol = match *self {
            Self::Plus => "+",
            Self::Minus | Self::Neg => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
            Self::Exp => "^",
        };
        write!(fmt, "{}", symbol)
    }
}
