//! Scan → parse → resolve → interpret, with explicit outcomes.
//!
//! A [`Session`] owns one interpreter for its whole life, so globals defined
//! by one `run` call are visible to the next (this is what the REPL relies
//! on). Nothing here prints: errors come back as values.

use std::io::Write;

use log::{debug, info};
use thiserror::Error;

use crate::ast::Stmt;
use crate::error::LamError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner;

/// Why a `run` did not complete.
#[derive(Debug, Error)]
pub enum RunError {
    /// Lex, parse or resolve errors. Nothing was executed.
    #[error("{} static error(s)", .0.len())]
    Static(Vec<LamError>),

    /// Execution started and was aborted.
    #[error(transparent)]
    Runtime(LamError),
}

impl RunError {
    pub fn errors(&self) -> Vec<&LamError> {
        match self {
            RunError::Static(errors) => errors.iter().collect(),
            RunError::Runtime(error) => vec![error],
        }
    }

    /// Conventional process exit code: 65 for static errors, 70 at runtime.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunError::Static(_) => 65,
            RunError::Runtime(_) => 70,
        }
    }
}

pub struct Session {
    interpreter: Interpreter,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            interpreter: Interpreter::new(),
        }
    }

    /// A session whose `print` output goes to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self {
            interpreter: Interpreter::with_output(out),
        }
    }

    /// Scans and parses `source` without running it.
    pub fn parse(source: &str) -> Result<Vec<Stmt>, RunError> {
        let (tokens, mut errors) = scanner::scan(source);

        let parsed = Parser::new(tokens).parse();
        errors.extend(parsed.errors);

        if !errors.is_empty() {
            debug!("Parse produced {} error(s)", errors.len());
            return Err(RunError::Static(errors));
        }

        Ok(parsed.statements)
    }

    /// Runs `source` to completion.
    pub fn run(&mut self, source: &str) -> Result<(), RunError> {
        let statements: Vec<Stmt> = Self::parse(source)?;

        Resolver::new(&mut self.interpreter)
            .resolve(&statements)
            .map_err(RunError::Static)?;

        info!("Running {} statement(s)", statements.len());

        self.interpreter
            .interpret(&statements)
            .map_err(|e| RunError::Runtime(LamError::Runtime(e)))
    }
}
