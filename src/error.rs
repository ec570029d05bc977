//! Centralised error hierarchy for the **Lamscript interpreter**.
//!
//! Every phase (scanner, parser, resolver, runtime) converts its failure modes
//! into one of the variants defined here. Errors are structured payloads: the
//! module **does not** print diagnostics itself. Display goes through a
//! [`Reporter`], which the driver supplies.

use thiserror::Error;

use log::debug;

use crate::token::Token;

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LamError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human‑readable description.
        message: String,

        /// 1‑based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        line: usize,
        /// `" at end"` or `" at 'lexeme'"`.
        location: String,
    },

    /// Static resolution failure (bad `return`, `this`, `super`, self-reference...).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        line: usize,
        location: String,
    },

    /// Runtime evaluation error.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Where in the source a token-anchored error sits.
fn location_of(token: &Token) -> String {
    if token.is_eof() {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

impl LamError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Lex error: line={}, msg={}", line, message);

        LamError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Parse error: line={}, msg={}", token.line, message);

        LamError::Parse {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        debug!("Creating Resolve error: line={}, msg={}", token.line, message);

        LamError::Resolve {
            message,
            line: token.line,
            location: location_of(token),
        }
    }

    /// Source line the error refers to.
    pub fn line(&self) -> usize {
        match self {
            LamError::Lex { line, .. }
            | LamError::Parse { line, .. }
            | LamError::Resolve { line, .. } => *line,
            LamError::Runtime(e) => e.token.line,
        }
    }

    /// Hands the structured payload to `reporter`; formatting is its business.
    pub fn report(&self, reporter: &mut dyn Reporter) {
        match self {
            LamError::Lex { message, line } => reporter.report(*line, "", message),

            LamError::Parse {
                message,
                line,
                location,
            }
            | LamError::Resolve {
                message,
                line,
                location,
            } => reporter.report(*line, location, message),

            LamError::Runtime(e) => reporter.runtime(e),
        }
    }
}

/// Sink for user-facing diagnostics.
pub trait Reporter {
    /// A static (lex, parse or resolve) error.
    fn report(&mut self, line: usize, location: &str, message: &str);

    /// A runtime error. Defaults to a plain report without location.
    fn runtime(&mut self, error: &RuntimeError) {
        self.report(error.token.line, "", &error.kind.to_string());
    }
}

/// The closed set of things that can go wrong while evaluating.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeErrorKind {
    #[error("Operand must be a number.")]
    OperandMustBeNumber,

    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,

    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),

    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),

    #[error("Can only call functions and classes.")]
    NotCallable,

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize },

    #[error("Superclass must be a class.")]
    InvalidSuperclass,

    #[error("Only instances have properties.")]
    NotAnInstance,

    #[error("Stack overflow.")]
    StackOverflow,

    #[error("{0}")]
    Native(String),

    #[error("Could not write output: {0}")]
    Output(String),
}

/// An evaluation failure anchored at the token that caused it.
#[derive(Debug, Clone, Error)]
#[error("{kind}\n[line {}]", .token.line)]
pub struct RuntimeError {
    pub token: Token,
    pub kind: RuntimeErrorKind,
}

impl RuntimeError {
    pub fn new(token: &Token, kind: RuntimeErrorKind) -> Self {
        debug!("Runtime error at line {}: {}", token.line, kind);

        Self {
            token: token.clone(),
            kind,
        }
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

/// Crate‑wide `Result` alias.
pub type Result<T> = std::result::Result<T, LamError>;
