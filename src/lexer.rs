use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::token::{Op, Spanned, Token};

#[must_use]
/// Check if `ident` is a valid identifier, as used for the parameter and the
/// segments of library paths
///
/// # Examples
///
/// ```
/// # use calcfn::is_identifier;
///
/// assert_eq!(is_identifier("__abc3"), true);
/// assert_eq!(is_identifier("34zb"), false);
/// ```
pub fn is_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    // Check first char
    if !chars.next().map_or(false, is_identifier_start) {
        return false;
    }
    // Check all others
    for c in chars {
        if !is_identifier_part(c) {
            return false;
        }
    }
    return true;
}

/// Length in bytes of the number literal at the start of `rest`, and whether
/// it is well formed. `rest` must start with a digit, or a `.` followed by a
/// digit.
///
/// An `e` directly after the mantissa always belongs to the literal, so that
/// `1e5` is never read as `1` followed by a name.
pub(crate) fn scan_number(rest: &str) -> (usize, bool) {
    let bytes = rest.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = digits(0);
    if end < bytes.len() && bytes[end] == b'.' {
        end = digits(end + 1);
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exponent = end + 1;
        if exponent < bytes.len() && (bytes[exponent] == b'+' || bytes[exponent] == b'-') {
            exponent += 1;
        }
        let exponent_end = digits(exponent);
        if exponent_end == exponent {
            return (exponent, false);
        }
        end = exponent_end;
    }
    (end, true)
}

/// An helper struct for lexing a code unit body
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Split the whole input into tokens. Lexing does not stop at the first
    /// problem: every unexpected character is reported.
    pub fn tokenize(mut self) -> (Vec<Spanned>, Diagnostics) {
        let mut tokens = Vec::new();
        let mut diagnostics = Diagnostics::new();
        while let Some(token) = self.next_token(&mut diagnostics) {
            tokens.push(token);
        }
        (tokens, diagnostics)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    fn next_token(&mut self, diagnostics: &mut Diagnostics) -> Option<Spanned> {
        loop {
            let c = self.peek()?;
            let start = self.position;
            let token = match c {
                ' ' | '\t' | '\n' | '\r' => {
                    self.position += 1;
                    continue;
                }
                _ if is_number_start(self.rest()) => {
                    match self.number(diagnostics) {
                        Some(token) => token,
                        None => continue,
                    }
                }
                c if is_identifier_start(c) => match self.path(diagnostics) {
                    Some(token) => token,
                    None => continue,
                },
                '+' => Token::Op(Op::Plus),
                '-' => Token::Op(Op::Minus),
                '*' => Token::Op(Op::Mul),
                '/' => Token::Op(Op::Div),
                '%' => Token::Op(Op::Rem),
                '^' => Token::Op(Op::Exp),
                '(' => Token::LParen,
                ')' => Token::RParen,
                ',' => Token::Comma,
                other => {
                    self.position += other.len_utf8();
                    diagnostics.push(Diagnostic::error(
                        "CF0001",
                        format!("unexpected character in input: {}", other),
                        start..self.position,
                    ));
                    continue;
                }
            };
            if self.position == start {
                // single character tokens
                self.position += c.len_utf8();
            }
            return Some(Spanned {
                token,
                span: start..self.position,
            });
        }
    }

    fn number(&mut self, diagnostics: &mut Diagnostics) -> Option<Token> {
        let start = self.position;
        let (length, well_formed) = scan_number(self.rest());
        self.position += length;

        // `2x` or `3eff`: swallow the rest of the word with the literal
        let trailing = self
            .rest()
            .find(|c: char| !is_identifier_part(c))
            .unwrap_or_else(|| self.rest().len());
        self.position += trailing;

        let text = &self.input[start..self.position];
        if !well_formed || trailing > 0 {
            diagnostics.push(Diagnostic::error(
                "CF0002",
                format!("malformed number literal {}", text),
                start..self.position,
            ));
            return None;
        }

        match text.parse::<f64>() {
            Ok(value) => {
                if value.is_infinite() {
                    diagnostics.push(Diagnostic::warning(
                        "CF0201",
                        format!("literal {} is out of range and evaluates to infinity", text),
                        start..self.position,
                    ));
                }
                Some(Token::Number(value))
            }
            Err(_) => {
                diagnostics.push(Diagnostic::error(
                    "CF0002",
                    format!("malformed number literal {}", text),
                    start..self.position,
                ));
                None
            }
        }
    }

    fn path(&mut self, diagnostics: &mut Diagnostics) -> Option<Token> {
        let start = self.position;
        loop {
            let segment = self
                .rest()
                .find(|c: char| !is_identifier_part(c))
                .unwrap_or_else(|| self.rest().len());
            self.position += segment;

            if !self.rest().starts_with("::") {
                break;
            }
            self.position += 2;
            if !self.peek().map_or(false, is_identifier_start) {
                diagnostics.push(Diagnostic::error(
                    "CF0001",
                    "expected a name after '::'",
                    start..self.position,
                ));
                return None;
            }
        }
        Some(Token::Name(self.input[start..self.position].to_owned()))
    }
}

/// Check if `rest` starts with a number literal
fn is_number_start(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().map_or(false, |c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Check if `c` can appear at the first character of an identifier
pub(crate) fn is_identifier_start(c: char) -> bool {
    c == '_' || (c.is_ascii() && c.is_alphabetic())
}

/// Check if `c` can appear inside an identifier
pub(crate) fn is_identifier_part(c: char) -> bool {
    c == '_' || (c.is_ascii() && c.is_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Op, Token};
    use test_case::test_case;

    fn tokens(input: &str) -> Vec<Token> {
        let (tokens, diagnostics) = Lexer::new(input).tokenize();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
        tokens.into_iter().map(|spanned| spanned.token).collect()
    }

    fn codes(input: &str) -> Vec<&'static str> {
        let (_, diagnostics) = Lexer::new(input).tokenize();
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test_case("2 + 2" => vec![Token::Number(2.0), Token::Op(Op::Plus), Token::Number(2.0)] ; "addition is lexed properly")]
    #[test_case("2+2" => vec![Token::Number(2.0), Token::Op(Op::Plus), Token::Number(2.0)] ; "spaces are optional")]
    #[test_case("-1.5e3" => vec![Token::Op(Op::Minus), Token::Number(1500.0)] ; "sign is an operator")]
    #[test_case(".5 % 5." => vec![Token::Number(0.5), Token::Op(Op::Rem), Token::Number(5.0)] ; "partial decimals")]
    #[test_case("math::atan2(x, 1)" => vec![
        Token::Name("math::atan2".into()),
        Token::LParen,
        Token::Name("x".into()),
        Token::Comma,
        Token::Number(1.0),
        Token::RParen,
    ] ; "qualified call")]
    fn lex(input: &str) -> Vec<Token> {
        tokens(input)
    }

    #[test]
    fn spans() {
        let (tokens, _) = Lexer::new("x  ^ 12").tokenize();
        let spans: Vec<_> = tokens.into_iter().map(|t| t.span).collect();
        assert_eq!(spans, vec![0..1, 3..4, 5..7]);
    }

    #[test_case("x $ 2" => vec!["CF0001"] ; "unknown character")]
    #[test_case("x # 2 @" => vec!["CF0001", "CF0001"] ; "every character is reported")]
    #[test_case("3eff + 5" => vec!["CF0002"] ; "letters after digits")]
    #[test_case("1e+" => vec!["CF0002"] ; "empty exponent")]
    #[test_case("math::" => vec!["CF0001"] ; "dangling path separator")]
    #[test_case("1e999" => vec!["CF0201"] ; "overflowing literal")]
    #[test_case("x : 1" => vec!["CF0001"] ; "single colon")]
    fn diagnostics(input: &str) -> Vec<&'static str> {
        codes(input)
    }

    #[test]
    fn idents() {
        let identifier_starts = ['c', 'Z', '_', 'f'];
        for c in &identifier_starts {
            assert!(is_identifier_start(*c));
        }

        let non_identifier_starts = ['3', 'à', '@', ']', '[', '.'];
        for c in &non_identifier_starts {
            assert!(!is_identifier_start(*c));
        }

        let identifiers = ["_______", "abc", "a__45__bc", "x"];
        for v in &identifiers {
            assert!(is_identifier(v));
        }

        let non_identifiers = ["a-bc", "@bc", "6bc", "ab.c", ""];
        for nv in &non_identifiers {
            assert!(!is_identifier(nv));
        }
    }

    #[test_case("123" => (3, true))]
    #[test_case("1.25+x" => (4, true))]
    #[test_case("1e5)" => (3, true))]
    #[test_case("2.5e-3*x" => (6, true))]
    #[test_case("1e" => (2, false))]
    #[test_case("4e-" => (3, false))]
    fn numbers(rest: &str) -> (usize, bool) {
        scan_number(rest)
    }
}
