//! Symbolic/numeric comparison for math-equation questions.
//!
//! Parses arithmetic expressions (`+ - * / ^`, unary minus, parentheses,
//! numeric literals, variables) into a small AST. Equivalence checking
//! tries structural equality first and falls back to sampling both
//! expressions over a fixed set of input values.

use std::collections::{BTreeSet, HashMap};

use thiserror::Error;

/// Values substituted for every variable during the numeric fallback.
pub const SAMPLE_POINTS: [f64; 5] = [-2.0, -1.0, 0.0, 1.0, 2.0];

/// Default tolerance when a question's scoring policy does not set one.
pub const DEFAULT_TOLERANCE: f64 = 1e-4;

/// Expression parse failure.
#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected token at position {0}")]
    UnexpectedToken(usize),
    #[error("invalid number literal: {0}")]
    InvalidNumber(String),
}

/// A parsed arithmetic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    Var(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Parse an expression from text.
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        let tokens = tokenize(input)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.expr()?;
        if parser.pos != parser.tokens.len() {
            return Err(ParseError::UnexpectedToken(parser.pos));
        }
        Ok(expr)
    }

    /// Evaluate under a variable binding. Unbound variables evaluate to
    /// NaN, which poisons the sample rather than panicking.
    pub fn eval(&self, vars: &HashMap<String, f64>) -> f64 {
        match self {
            Expr::Num(n) => *n,
            Expr::Var(name) => vars.get(name).copied().unwrap_or(f64::NAN),
            Expr::Neg(inner) => -inner.eval(vars),
            Expr::Add(a, b) => a.eval(vars) + b.eval(vars),
            Expr::Sub(a, b) => a.eval(vars) - b.eval(vars),
            Expr::Mul(a, b) => a.eval(vars) * b.eval(vars),
            Expr::Div(a, b) => a.eval(vars) / b.eval(vars),
            Expr::Pow(a, b) => a.eval(vars).powf(b.eval(vars)),
        }
    }

    /// All variable names appearing in the expression.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Var(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(inner) => inner.collect_variables(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_variables(out);
                b.collect_variables(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| ParseError::InvalidNumber(text))?;
                tokens.push(Token::Num(value));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            other => return Err(ParseError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, ParseError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or(ParseError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    let rhs = self.term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let rhs = self.unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                // Juxtaposition is implicit multiplication: 2x, (x-1)(x+1)
                Some(Token::Num(_)) | Some(Token::Ident(_)) | Some(Token::LParen) => {
                    let rhs = self.unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            self.pos += 1;
            return Ok(Expr::Neg(Box::new(self.unary()?)));
        }
        self.power()
    }

    fn power(&mut self) -> Result<Expr, ParseError> {
        let base = self.atom()?;
        if matches!(self.peek(), Some(Token::Caret)) {
            self.pos += 1;
            // Right-associative: x^2^3 == x^(2^3)
            let exponent = self.unary()?;
            return Ok(Expr::Pow(Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<Expr, ParseError> {
        match self.next()? {
            Token::Num(n) => Ok(Expr::Num(n)),
            Token::Ident(name) => Ok(Expr::Var(name)),
            Token::LParen => {
                let inner = self.expr()?;
                match self.next()? {
                    Token::RParen => Ok(inner),
                    _ => Err(ParseError::UnexpectedToken(self.pos - 1)),
                }
            }
            _ => Err(ParseError::UnexpectedToken(self.pos - 1)),
        }
    }
}

/// Count how many of [`SAMPLE_POINTS`] agree between the two expressions
/// within `tolerance`. Every variable in either expression is bound to the
/// same sample value. A sample where only one side is non-finite is a
/// mismatch; both sides non-finite counts as agreement.
pub fn matching_samples(reference: &Expr, submitted: &Expr, tolerance: f64) -> usize {
    let mut names = reference.variables();
    names.extend(submitted.variables());

    SAMPLE_POINTS
        .iter()
        .filter(|&&value| {
            let bindings: HashMap<String, f64> =
                names.iter().map(|n| (n.clone(), value)).collect();
            let a = reference.eval(&bindings);
            let b = submitted.eval(&bindings);
            match (a.is_finite(), b.is_finite()) {
                (true, true) => (a - b).abs() <= tolerance,
                (false, false) => true,
                _ => false,
            }
        })
        .count()
}

/// Structural equality first, numeric sampling as the fallback.
pub fn equivalent(reference: &Expr, submitted: &Expr, tolerance: f64) -> bool {
    reference == submitted
        || matching_samples(reference, submitted, tolerance) == SAMPLE_POINTS.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Expr {
        Expr::parse(s).unwrap()
    }

    #[test]
    fn parses_precedence() {
        let e = parse("1 + 2 * 3");
        let vars = HashMap::new();
        assert!((e.eval(&vars) - 7.0).abs() < 1e-12);

        let e = parse("(1 + 2) * 3");
        assert!((e.eval(&vars) - 9.0).abs() < 1e-12);

        let e = parse("2 ^ 3 ^ 2");
        assert!((e.eval(&vars) - 512.0).abs() < 1e-12);
    }

    #[test]
    fn parses_unary_minus_and_implicit_mul() {
        let vars: HashMap<String, f64> = [("x".to_string(), 3.0)].into();
        assert!((parse("-x^2").eval(&vars) + 9.0).abs() < 1e-12);
        assert!((parse("2x").eval(&vars) - 6.0).abs() < 1e-12);
        assert!((parse("(x-1)(x+1)").eval(&vars) - 8.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(Expr::parse("x +").is_err());
        assert!(Expr::parse("(x + 1").is_err());
        assert!(Expr::parse("x $ 2").is_err());
        assert!(Expr::parse("1.2.3").is_err());
    }

    #[test]
    fn identical_text_is_structurally_equal() {
        assert_eq!(parse("x^2 - 1"), parse("x^2-1"));
    }

    #[test]
    fn factored_form_matches_by_sampling() {
        // Structurally different, numerically identical at every sample.
        let reference = parse("x^2 - 1");
        let submitted = parse("(x-1)*(x+1)");
        assert_ne!(reference, submitted);
        assert_eq!(
            matching_samples(&reference, &submitted, DEFAULT_TOLERANCE),
            SAMPLE_POINTS.len()
        );
        assert!(equivalent(&reference, &submitted, DEFAULT_TOLERANCE));
    }

    #[test]
    fn wrong_expression_matches_some_samples_only() {
        // x^2 and 2x agree at x=0 and x=2 only.
        let reference = parse("x^2");
        let submitted = parse("2*x");
        assert_eq!(matching_samples(&reference, &submitted, DEFAULT_TOLERANCE), 2);
        assert!(!equivalent(&reference, &submitted, DEFAULT_TOLERANCE));
    }

    #[test]
    fn division_by_zero_agrees_only_with_itself() {
        let reference = parse("1/x");
        // Both blow up at x=0 and agree elsewhere.
        assert_eq!(
            matching_samples(&reference, &parse("1/x"), DEFAULT_TOLERANCE),
            SAMPLE_POINTS.len()
        );
        // A finite expression never matches the pole at x=0.
        let finite = parse("x");
        assert!(matching_samples(&reference, &finite, DEFAULT_TOLERANCE) < SAMPLE_POINTS.len());
    }
}
