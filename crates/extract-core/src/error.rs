use crate::value::{Atom, Ident, Value};

/// Errors produced while turning source text into expressions. These
/// are ordinary `Result` errors; nothing downstream of the parser ever
/// sees them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReadError {
    #[error("unexpected rune {rune:?} ({line}:{col})")]
    UnexpectedRune { line: u32, col: u32, rune: char },

    /// A literal with a structural problem: a bad escape, EOF inside a
    /// string or rune, an unparsable number. Line and column are the
    /// beginning of the token, not the exact location of the problem.
    #[error("error in token ({line}:{col}): {cause}")]
    Token { line: u32, col: u32, cause: String },

    #[error("unexpected token {got} ({line}:{col}){}", expected_suffix(.expected))]
    UnexpectedToken {
        line: u32,
        col: u32,
        got: String,
        expected: Option<String>,
    },

    #[error("unexpected end of input")]
    UnexpectedEof,
}

/// Errors produced during evaluation. These are first-class values — a
/// [`Value::Error`] flows through evaluation rather than unwinding, and
/// the consumer decides what to do with it.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unbound identifier {0}")]
    Name(Ident),

    #[error("module {} is not defined", .0.as_str())]
    UndefinedModule(Atom),

    /// `expected < 0` means "variadic with a non-zero minimum that was
    /// not met".
    #[error("wrong number of arguments: got {num}{}", arity_suffix(*.expected))]
    ArgumentNum { num: usize, expected: i64 },

    #[error("unexpected {} value {value}, expected {}", .value.type_name(), .expected.join(" or "))]
    Type {
        value: Box<Value>,
        expected: Vec<&'static str>,
    },

    #[error("arguments did not match defined patterns")]
    PatternMatch,

    #[error("{0}")]
    Eval(String),
}

fn expected_suffix(expected: &Option<String>) -> String {
    match expected {
        Some(e) => format!(", expected {e}"),
        None => String::new(),
    }
}

fn arity_suffix(expected: i64) -> String {
    if expected >= 0 {
        format!(", expected {expected}")
    } else {
        String::from(", expected more")
    }
}

impl EvalError {
    pub fn eval(msg: impl Into<String>) -> Self {
        EvalError::Eval(msg.into())
    }

    pub fn type_error(value: Value, expected: &[&'static str]) -> Self {
        EvalError::Type {
            value: Box::new(value),
            expected: expected.to_vec(),
        }
    }

    pub fn arity(num: usize, expected: i64) -> Self {
        EvalError::ArgumentNum { num, expected }
    }
}
