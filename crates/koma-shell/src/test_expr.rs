//! Conditional expressions for the `test` and `[` builtins.
//!
//! The grammar is parsed by recursive descent over the argument list,
//! lowest binding first:
//!
//! ```text
//! or      := and ( "-o" and )*
//! and     := not ( "-a" not )*
//! not     := "!" not | primary
//! primary := "(" or ")" | STR BINOP STR | ("-n" | "-z") STR | STR
//! ```
//!
//! A binary comparison is preferred wherever one fits, so `! = x` compares
//! the string `!` with `x` and `( = (` compares two parentheses. Likewise
//! `-n -a x` joins the strings `-n` and `x` rather than testing `-a`. An
//! operator word with nothing after it is an ordinary string: `test -n` is
//! true.
//!
//! Integer operands are checked while parsing, so a malformed one is a
//! usage error even on a side of `-a` / `-o` that evaluation never reaches.

use std::fmt;

use koma_types::exit::{self, ExitCode, USAGE};

use crate::io::Io;

/// How the evaluator was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invocation {
    /// `test EXPR`
    Test,
    /// `[ EXPR ]`: the final argument must be `]`.
    Bracket,
}

impl Invocation {
    pub fn name(self) -> &'static str {
        match self {
            Invocation::Test => "test",
            Invocation::Bracket => "[",
        }
    }
}

/// Grammar violations. All map to exit code 2.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TestError {
    #[error("missing ]")]
    MissingBracket,

    #[error("missing ')'")]
    UnclosedGroup,

    #[error("argument expected after '{0}'")]
    MissingOperand(String),

    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    #[error("integer expression expected: {0}")]
    NotAnInteger(String),
}

impl TestError {
    pub fn exit_code(&self) -> ExitCode {
        USAGE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-n`
    NonEmpty,
    /// `-z`
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl NumericOp {
    fn from_arg(arg: &str) -> Option<Self> {
        Some(match arg {
            "-eq" => NumericOp::Eq,
            "-ne" => NumericOp::Ne,
            "-lt" => NumericOp::Lt,
            "-le" => NumericOp::Le,
            "-gt" => NumericOp::Gt,
            "-ge" => NumericOp::Ge,
            _ => return None,
        })
    }

    fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            NumericOp::Eq => lhs == rhs,
            NumericOp::Ne => lhs != rhs,
            NumericOp::Lt => lhs < rhs,
            NumericOp::Le => lhs <= rhs,
            NumericOp::Gt => lhs > rhs,
            NumericOp::Ge => lhs >= rhs,
        }
    }
}

/// Parsed conditional expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    StringTest(String),
    UnaryStringTest(UnaryOp, String),
    BinaryStringTest(String, StringOp, String),
    BinaryNumericTest(i64, NumericOp, i64),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Group(Box<Expr>),
}

fn parse_int(value: &str) -> Result<i64, TestError> {
    value
        .trim()
        .parse()
        .map_err(|_| TestError::NotAnInteger(value.to_string()))
}

impl Expr {
    pub fn eval(&self) -> bool {
        match self {
            Expr::StringTest(value) => !value.is_empty(),
            Expr::UnaryStringTest(UnaryOp::NonEmpty, value) => !value.is_empty(),
            Expr::UnaryStringTest(UnaryOp::Empty, value) => value.is_empty(),
            Expr::BinaryStringTest(lhs, StringOp::Equal, rhs) => lhs == rhs,
            Expr::BinaryStringTest(lhs, StringOp::NotEqual, rhs) => lhs != rhs,
            Expr::BinaryNumericTest(lhs, op, rhs) => op.apply(*lhs, *rhs),
            Expr::Not(inner) => !inner.eval(),
            Expr::And(lhs, rhs) => lhs.eval() && rhs.eval(),
            Expr::Or(lhs, rhs) => lhs.eval() || rhs.eval(),
            Expr::Group(inner) => inner.eval(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::StringTest(v) => write!(f, "{v:?}"),
            Expr::UnaryStringTest(UnaryOp::NonEmpty, v) => write!(f, "-n {v:?}"),
            Expr::UnaryStringTest(UnaryOp::Empty, v) => write!(f, "-z {v:?}"),
            Expr::BinaryStringTest(l, StringOp::Equal, r) => write!(f, "{l:?} = {r:?}"),
            Expr::BinaryStringTest(l, StringOp::NotEqual, r) => write!(f, "{l:?} != {r:?}"),
            Expr::BinaryNumericTest(l, op, r) => write!(f, "{l} {op:?} {r}"),
            Expr::Not(e) => write!(f, "! {e}"),
            Expr::And(l, r) => write!(f, "({l} -a {r})"),
            Expr::Or(l, r) => write!(f, "({l} -o {r})"),
            Expr::Group(e) => write!(f, "( {e} )"),
        }
    }
}

/// Operators allowed between two operands.
fn is_binary_op(arg: &str) -> bool {
    matches!(arg, "=" | "!=") || NumericOp::from_arg(arg).is_some()
}

struct Parser<'a> {
    args: &'a [&'a str],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self, offset: usize) -> Option<&'a str> {
        self.args.get(self.pos + offset).copied()
    }

    /// An operand, a binary operator, and a second operand start here.
    fn binary_at(&self) -> bool {
        self.peek(1).is_some_and(is_binary_op) && self.peek(2).is_some()
    }

    /// `-a` or `-o` with an operand follows the word here, so the word is an
    /// operand of the connective rather than an operator of its own.
    fn connective_at(&self) -> bool {
        self.peek(1).is_some_and(|arg| arg == "-a" || arg == "-o") && self.peek(2).is_some()
    }

    fn parse_or(&mut self) -> Result<Expr, TestError> {
        let mut lhs = self.parse_and()?;
        while self.peek(0) == Some("-o") {
            if self.peek(1).is_none() {
                return Err(TestError::MissingOperand("-o".to_string()));
            }
            self.pos += 1;
            let rhs = self.parse_and()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, TestError> {
        let mut lhs = self.parse_not()?;
        while self.peek(0) == Some("-a") {
            if self.peek(1).is_none() {
                return Err(TestError::MissingOperand("-a".to_string()));
            }
            self.pos += 1;
            let rhs = self.parse_not()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, TestError> {
        if self.peek(0) == Some("!") && self.peek(1).is_some() && !self.binary_at() && !self.connective_at() {
            self.pos += 1;
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, TestError> {
        let Some(arg) = self.peek(0) else {
            let prev = self
                .pos
                .checked_sub(1)
                .and_then(|i| self.args.get(i))
                .copied()
                .unwrap_or_default();
            return Err(TestError::MissingOperand(prev.to_string()));
        };

        if self.binary_at() {
            let (op, rhs) = (self.args[self.pos + 1], self.args[self.pos + 2]);
            self.pos += 3;
            let lhs = arg.to_string();
            let rhs = rhs.to_string();
            return Ok(match op {
                "=" => Expr::BinaryStringTest(lhs, StringOp::Equal, rhs),
                "!=" => Expr::BinaryStringTest(lhs, StringOp::NotEqual, rhs),
                _ => match NumericOp::from_arg(op) {
                    Some(num) => Expr::BinaryNumericTest(parse_int(&lhs)?, num, parse_int(&rhs)?),
                    None => return Err(TestError::UnexpectedArgument(op.to_string())),
                },
            });
        }

        if arg == "(" && self.peek(1).is_some() {
            self.pos += 1;
            let inner = self.parse_or()?;
            if self.peek(0) != Some(")") {
                return Err(TestError::UnclosedGroup);
            }
            self.pos += 1;
            return Ok(Expr::Group(Box::new(inner)));
        }

        if let Some(value) = self.peek(1).filter(|_| !self.connective_at()) {
            let unary = match arg {
                "-n" => Some(UnaryOp::NonEmpty),
                "-z" => Some(UnaryOp::Empty),
                _ => None,
            };
            if let Some(op) = unary {
                self.pos += 2;
                return Ok(Expr::UnaryStringTest(op, value.to_string()));
            }
        }

        self.pos += 1;
        Ok(Expr::StringTest(arg.to_string()))
    }
}

/// Parse an argument list (without any closing `]`). An empty list has no
/// expression and is false.
pub fn parse(args: &[&str]) -> Result<Option<Expr>, TestError> {
    if args.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser { args, pos: 0 };
    let expr = parser.parse_or()?;
    match parser.peek(0) {
        None => Ok(Some(expr)),
        Some(extra) => Err(TestError::UnexpectedArgument(extra.to_string())),
    }
}

/// Evaluate the arguments of a `test` or `[` invocation.
pub fn evaluate(args: &[&str], invoked_as: Invocation) -> Result<bool, TestError> {
    let inner = match invoked_as {
        Invocation::Test => args,
        Invocation::Bracket => match args.split_last() {
            Some((&"]", rest)) => rest,
            _ => return Err(TestError::MissingBracket),
        },
    };
    match parse(inner)? {
        Some(expr) => {
            log::trace!("{}: {expr}", invoked_as.name());
            Ok(expr.eval())
        },
        None => Ok(false),
    }
}

/// Evaluate and map to an exit code: 0 true, 1 false, 2 on a grammar error
/// (with a diagnostic written to `io`).
pub fn status(args: &[&str], invoked_as: Invocation, io: &mut dyn Io) -> ExitCode {
    match evaluate(args, invoked_as) {
        Ok(value) => exit::from_bool(value),
        Err(e) => {
            io.ewriteln(&format!("{}: {e}", invoked_as.name()));
            e.exit_code()
        },
    }
}
