//! Tree‑walking evaluator.
//!
//! Expressions evaluate to [`Value`]s, statements execute for effect. The
//! interpreter keeps the global frame plus a pointer to the frame currently
//! in scope, and reads the resolver's scope distances from its `locals`
//! table. `return` is ordinary data flow ([`Flow::Return`]) that each
//! statement hands back to its caller until a function call consumes it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, ExprId, ExprKind, FunctionDecl, Stmt};
use crate::environment::{self, EnvRef, Environment};
use crate::error::{RuntimeError, RuntimeErrorKind};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenType};
use crate::value::{Class, Function, Instance, Value};

/// Nested calls allowed before a script is stopped with
/// [`RuntimeErrorKind::StackOverflow`].
pub const MAX_CALL_DEPTH: usize = 3000;

/// Convenient alias for interpreter results.
pub type IResult<T> = Result<T, RuntimeError>;

/// How a statement finished.
#[derive(Debug)]
pub enum Flow {
    /// Fell through to the next statement.
    Normal,
    /// A `return` is unwinding to the nearest call.
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
    /// User function and initializer calls currently on the stack.
    depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// An interpreter whose `print` statements write to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new();

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::NativeFunction {
                name: "clock",
                arity: 0,
                func: |_args: &[Value]| {
                    let timestamp: f64 = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .map_err(|e: SystemTimeError| format!("Clock error: {}", e))?
                        .as_secs_f64();
                    Ok(Value::Number(timestamp))
                },
            },
        );

        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            out,
            depth: 0,
        }
    }

    /// Records the scope distance the resolver computed for `id`.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {:?} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Runs a whole program. The first runtime error aborts it.
    pub fn interpret(&mut self, statements: &[Stmt]) -> IResult<()> {
        info!("Interpreting {} statement(s)", statements.len());

        for stmt in statements {
            self.execute(stmt)?;
        }

        info!("Interpretation completed successfully");

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────

    fn execute(&mut self, stmt: &Stmt) -> IResult<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> IResult<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
            }

            Stmt::Print { keyword, value } => {
                let value: Value = self.evaluate(value)?;

                writeln!(self.out, "{}", value).map_err(|e| output_error(keyword, e))?;
                self.out.flush().map_err(|e| output_error(keyword, e))?;
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);
            }

            Stmt::Block(statements) => {
                let env: EnvRef = Environment::with_enclosing(&self.environment);

                return self.execute_block(statements, env);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }

            Stmt::Function(declaration) => {
                debug!("Defining function '{}'", declaration.name.lexeme);

                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                self.environment
                    .borrow_mut()
                    .define(&declaration.name.lexeme, Value::Function(Rc::new(function)));
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                return Ok(Flow::Return(value));
            }

            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods)?,
        }

        Ok(Flow::Normal)
    }

    /// Runs `statements` inside `env`, restoring the previous frame however
    /// the block ends.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> IResult<Flow> {
        let previous: EnvRef = std::mem::replace(&mut self.environment, env);

        let mut result: IResult<Flow> = Ok(Flow::Normal);

        for stmt in statements {
            match self.execute(stmt) {
                Ok(Flow::Normal) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> IResult<()> {
        debug!("Defining class '{}'", name.lexeme);

        let superclass: Option<Rc<Class>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let token: &Token = match &expr.kind {
                        ExprKind::Variable(token) => token,
                        _ => name,
                    };

                    return Err(RuntimeError::new(
                        token,
                        RuntimeErrorKind::InvalidSuperclass,
                    ));
                }
            },
            None => None,
        };

        // Methods of a subclass close over an extra frame holding `super`.
        let method_env: EnvRef = match &superclass {
            Some(class) => {
                let env: EnvRef = Environment::with_enclosing(&self.environment);
                env.borrow_mut()
                    .define("super", Value::Class(Rc::clone(class)));
                env
            }
            None => Rc::clone(&self.environment),
        };

        let methods: HashMap<String, Rc<Function>> = methods
            .iter()
            .map(|decl| {
                let is_initializer: bool = decl.name.lexeme == "init";
                let function =
                    Function::new(Rc::clone(decl), Rc::clone(&method_env), is_initializer);

                (decl.name.lexeme.clone(), Rc::new(function))
            })
            .collect();

        let class = Class {
            name: name.lexeme.clone(),
            superclass,
            methods,
        };

        self.environment
            .borrow_mut()
            .define(&name.lexeme, Value::Class(Rc::new(class)));

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────

    /// Evaluates an expression and returns a Value.
    pub fn evaluate(&mut self, expr: &Expr) -> IResult<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> IResult<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(Value::from(literal)),

            ExprKind::Grouping(inner) => self.evaluate(inner),

            ExprKind::Unary { operator, right } => {
                let right: Value = self.evaluate(right)?;

                match operator.token_type {
                    TokenType::MINUS => Ok(Value::Number(-check_number_operand(operator, &right)?)),
                    _ => Ok(Value::Bool(!right.is_truthy())),
                }
            }

            ExprKind::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;
                let right: Value = self.evaluate(right)?;

                binary(operator, left, right)
            }

            ExprKind::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left)?;

                let short_circuit: bool = match operator.token_type {
                    TokenType::OR => left.is_truthy(),
                    _ => !left.is_truthy(),
                };

                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }

            ExprKind::Variable(name) => self.lookup_variable(name, expr.id),

            ExprKind::Assign { name, value } => {
                let value: Value = self.evaluate(value)?;

                match self.locals.get(&expr.id) {
                    Some(&distance) => {
                        environment::assign_at(&self.environment, distance, name, value.clone())?
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            ExprKind::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee)?;

                let mut args: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.evaluate(argument)?);
                }

                self.call(callee, paren, args)
            }

            ExprKind::Lambda(declaration) => {
                let function = Function::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                Ok(Value::Function(Rc::new(function)))
            }

            ExprKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => get_property(instance, name),
                _ => Err(RuntimeError::new(name, RuntimeErrorKind::NotAnInstance)),
            },

            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(RuntimeError::new(name, RuntimeErrorKind::NotAnInstance));
                };

                let value: Value = self.evaluate(value)?;

                instance
                    .borrow_mut()
                    .fields
                    .insert(name.lexeme.clone(), value.clone());

                Ok(value)
            }

            ExprKind::This(keyword) => self.lookup_variable(keyword, expr.id),

            ExprKind::Super { keyword, method } => self.evaluate_super(expr.id, keyword, method),
        }
    }

    fn lookup_variable(&self, name: &Token, id: ExprId) -> IResult<Value> {
        match self.locals.get(&id) {
            Some(&distance) => environment::get_at(&self.environment, distance, name),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super` lives one frame above the frame binding `this`.
    fn evaluate_super(&self, id: ExprId, keyword: &Token, method: &Token) -> IResult<Value> {
        let distance: usize = self.locals.get(&id).copied().ok_or_else(|| {
            RuntimeError::new(
                keyword,
                RuntimeErrorKind::UndefinedVariable(keyword.lexeme.clone()),
            )
        })?;

        let Value::Class(superclass) = environment::get_at(&self.environment, distance, keyword)?
        else {
            return Err(RuntimeError::new(
                keyword,
                RuntimeErrorKind::InvalidSuperclass,
            ));
        };

        let this: Token = Token::new(TokenType::THIS, "this", keyword.line);

        let Value::Instance(instance) =
            environment::get_at(&self.environment, distance.saturating_sub(1), &this)?
        else {
            return Err(RuntimeError::new(keyword, RuntimeErrorKind::NotAnInstance));
        };

        let method: Rc<Function> = superclass.find_method(&method.lexeme).ok_or_else(|| {
            RuntimeError::new(
                method,
                RuntimeErrorKind::UndefinedProperty(method.lexeme.clone()),
            )
        })?;

        Ok(Value::Function(Rc::new(method.bind(instance))))
    }

    /// Invokes a callable (native function, user function, or class).
    fn call(&mut self, callee: Value, paren: &Token, args: Vec<Value>) -> IResult<Value> {
        match callee {
            Value::NativeFunction { name, arity, func } => {
                debug!("Calling native function '{}'", name);

                check_arity(paren, arity, args.len())?;

                func(&args).map_err(|message| {
                    RuntimeError::new(paren, RuntimeErrorKind::Native(message))
                })
            }

            Value::Function(function) => {
                check_arity(paren, function.arity(), args.len())?;

                self.call_function(&function, paren, args)
            }

            Value::Class(class) => {
                check_arity(paren, class.arity(), args.len())?;

                let instance: Rc<RefCell<Instance>> =
                    Rc::new(RefCell::new(Instance::new(Rc::clone(&class))));

                if let Some(init) = class.find_method("init") {
                    self.call_function(&init.bind(Rc::clone(&instance)), paren, args)?;
                }

                Ok(Value::Instance(instance))
            }

            _ => Err(RuntimeError::new(paren, RuntimeErrorKind::NotCallable)),
        }
    }

    /// Counts the call against [`MAX_CALL_DEPTH`]; the count is restored
    /// however the call ends.
    fn call_function(
        &mut self,
        function: &Function,
        paren: &Token,
        args: Vec<Value>,
    ) -> IResult<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(RuntimeError::new(paren, RuntimeErrorKind::StackOverflow));
        }

        self.depth += 1;
        let result: IResult<Value> = self.invoke(function, args);
        self.depth -= 1;

        result
    }

    /// Parameters are bound in a fresh frame whose parent is the function's
    /// closure, not the caller's frame.
    fn invoke(&mut self, function: &Function, args: Vec<Value>) -> IResult<Value> {
        debug!("Calling {} at depth {}", function, self.depth);

        let env: EnvRef = Environment::with_enclosing(&function.closure);

        {
            let mut frame = env.borrow_mut();
            for (param, arg) in function.declaration.params.iter().zip(args) {
                frame.define(&param.lexeme, arg);
            }
        }

        let flow: Flow = self.execute_block(&function.declaration.body, env)?;

        if function.is_initializer {
            let this: Option<Value> = function.closure.borrow().get_local("this");
            return Ok(this.unwrap_or(Value::Nil));
        }

        match flow {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nil),
        }
    }
}

/// Field first, then a method bound to the instance.
fn get_property(instance: Rc<RefCell<Instance>>, name: &Token) -> IResult<Value> {
    let field: Option<Value> = instance.borrow().fields.get(&name.lexeme).cloned();

    if let Some(value) = field {
        return Ok(value);
    }

    let class: Rc<Class> = Rc::clone(&instance.borrow().class);

    match class.find_method(&name.lexeme) {
        Some(method) => Ok(Value::Function(Rc::new(method.bind(instance)))),
        None => Err(RuntimeError::new(
            name,
            RuntimeErrorKind::UndefinedProperty(name.lexeme.clone()),
        )),
    }
}

fn binary(operator: &Token, left: Value, right: Value) -> IResult<Value> {
    match operator.token_type {
        TokenType::PLUS => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => {
                Ok(Value::String(Rc::from(format!("{}{}", a, b))))
            }
            _ => Err(RuntimeError::new(
                operator,
                RuntimeErrorKind::OperandsMustBeNumbersOrStrings,
            )),
        },

        TokenType::EQUAL_EQUAL => Ok(Value::Bool(left.is_equal(&right))),

        TokenType::BANG_EQUAL => Ok(Value::Bool(!left.is_equal(&right))),

        _ => {
            let (a, b) = check_number_operands(operator, &left, &right)?;

            match operator.token_type {
                TokenType::MINUS => Ok(Value::Number(a - b)),
                TokenType::STAR => Ok(Value::Number(a * b)),
                TokenType::SLASH if b == 0.0 => Err(RuntimeError::new(
                    operator,
                    RuntimeErrorKind::DivisionByZero,
                )),
                TokenType::SLASH => Ok(Value::Number(a / b)),
                TokenType::GREATER => Ok(Value::Bool(a > b)),
                TokenType::GREATER_EQUAL => Ok(Value::Bool(a >= b)),
                TokenType::LESS => Ok(Value::Bool(a < b)),
                _ => Ok(Value::Bool(a <= b)),
            }
        }
    }
}

fn check_number_operand(operator: &Token, operand: &Value) -> IResult<f64> {
    match operand {
        Value::Number(n) => Ok(*n),
        _ => Err(RuntimeError::new(
            operator,
            RuntimeErrorKind::OperandMustBeNumber,
        )),
    }
}

fn check_number_operands(operator: &Token, left: &Value, right: &Value) -> IResult<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(RuntimeError::new(
            operator,
            RuntimeErrorKind::OperandsMustBeNumbers,
        )),
    }
}

fn check_arity(paren: &Token, expected: usize, got: usize) -> IResult<()> {
    if expected != got {
        return Err(RuntimeError::new(
            paren,
            RuntimeErrorKind::ArityMismatch { expected, got },
        ));
    }

    Ok(())
}

fn output_error(keyword: &Token, e: io::Error) -> RuntimeError {
    RuntimeError::new(keyword, RuntimeErrorKind::Output(e.to_string()))
}
