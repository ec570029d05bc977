//! Lexical scope chain.
//!
//! A frame is shared (`Rc<RefCell<_>>`) by the interpreter's active chain and
//! by every closure that captured it, and lives as long as its longest
//! holder. A child's `enclosing` link is an owning `Rc`, so a live frame keeps
//! its whole ancestor chain alive. The link is fixed at construction.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a frame.
pub type EnvRef = Rc<RefCell<Environment>>;

#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<EnvRef>,
}

impl Environment {
    /// A root frame (the globals).
    pub fn new() -> EnvRef {
        Rc::new(RefCell::new(Environment::default()))
    }

    /// A child frame of `enclosing`.
    pub fn with_enclosing(enclosing: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Environment {
            values: HashMap::new(),
            enclosing: Some(Rc::clone(enclosing)),
        }))
    }

    pub fn enclosing(&self) -> Option<EnvRef> {
        self.enclosing.clone()
    }

    /// Binds `name` in this frame only, shadowing any outer binding and
    /// overwriting an existing one here.
    pub fn define(&mut self, name: &str, value: Value) {
        debug!("define '{}' = {}", name, value);

        self.values.insert(name.to_string(), value);
    }

    /// Searches this frame, then its ancestors.
    pub fn get(&self, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = self.values.get(&name.lexeme) {
            return Ok(value.clone());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow().get(name),
            None => Err(undefined(name)),
        }
    }

    /// Overwrites the nearest existing binding. Never declares.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            return Ok(());
        }

        match &self.enclosing {
            Some(enclosing) => enclosing.borrow_mut().assign(name, value),
            None => Err(undefined(name)),
        }
    }

    /// Reads `name` from this frame's own bindings only.
    pub fn get_local(&self, name: &str) -> Option<Value> {
        self.values.get(name).cloned()
    }
}

/// Walks exactly `distance` enclosing links from `env`.
pub fn ancestor(env: &EnvRef, distance: usize) -> Option<EnvRef> {
    let mut frame: EnvRef = Rc::clone(env);

    for _ in 0..distance {
        let parent: EnvRef = frame.borrow().enclosing()?;
        frame = parent;
    }

    Some(frame)
}

/// Reads `name` from the frame `distance` hops up.
pub fn get_at(env: &EnvRef, distance: usize, name: &Token) -> Result<Value, RuntimeError> {
    let frame: EnvRef = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let value: Option<Value> = frame.borrow().get_local(&name.lexeme);

    value.ok_or_else(|| undefined(name))
}

/// Writes `name` in the frame `distance` hops up. The binding must already
/// exist there.
pub fn assign_at(
    env: &EnvRef,
    distance: usize,
    name: &Token,
    value: Value,
) -> Result<(), RuntimeError> {
    let frame: EnvRef = ancestor(env, distance).ok_or_else(|| undefined(name))?;
    let mut frame = frame.borrow_mut();

    if !frame.values.contains_key(&name.lexeme) {
        return Err(undefined(name));
    }

    frame.values.insert(name.lexeme.clone(), value);

    Ok(())
}

fn undefined(name: &Token) -> RuntimeError {
    RuntimeError::new(
        name,
        RuntimeErrorKind::UndefinedVariable(name.lexeme.clone()),
    )
}
