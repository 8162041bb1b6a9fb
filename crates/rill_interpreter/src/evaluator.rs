use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, BufReader};
use std::rc::Rc;

use rill_parser::ast::{
    AssignExpression, Block, CallExpression, Expression, FunctionLiteral, Identifier,
    InfixExpression, LoopStatement, Program, Statement,
};
use rill_parser::location::SrcLoc;
use rill_parser::token::TokenKind;

use crate::environment::Environment;
use crate::error::{ErrorKind, RuntimeError};
use crate::stdlib::{Input, Output, StdLib};
use crate::value::{Function, MapKey, Value};

/// What a statement hands back to its enclosing construct. `Return`
/// unwinds to the nearest call boundary, `Break`/`Continue` to the nearest
/// loop; carrying them as values (rather than unwinding the host stack)
/// keeps every environment pop on the ordinary return path.
#[derive(Debug)]
enum Flow {
    Normal,
    Return(Value),
    Break(SrcLoc),
    Continue(SrcLoc),
}

/// The result of running a program: the exit code a top-level `return`
/// asked for, if any, plus every error the run produced.
#[derive(Debug)]
pub struct Outcome {
    pub exit_code: Option<i32>,
    pub errors: Vec<RuntimeError>,
}

type EvalResult<T> = Result<T, RuntimeError>;

pub struct Evaluator {
    env: Rc<RefCell<Environment>>,
    /// Saved frames for active calls; a call switches to the closure's
    /// captured chain and pops back here when it finishes.
    env_stack: Vec<Rc<RefCell<Environment>>>,
    stdlib: StdLib,
}

impl Evaluator {
    /// An evaluator wired to the process stdin/stdout.
    pub fn new() -> Self {
        let input: Input = Rc::new(RefCell::new(BufReader::new(io::stdin())));
        let output: Output = Rc::new(RefCell::new(io::stdout()));

        Self::with_io(input, output)
    }

    /// An evaluator over caller-supplied streams, for tests and embedding.
    pub fn with_io(input: Input, output: Output) -> Self {
        Evaluator {
            env: Rc::new(RefCell::new(Environment::new())),
            env_stack: Vec::new(),
            stdlib: StdLib::new(input, output),
        }
    }

    /// Run every top-level statement in order. A statement's error is
    /// recorded and evaluation continues with the next one; a top-level
    /// `return` stops the run and requests a process exit.
    pub fn evaluate(&mut self, program: &Program) -> Outcome {
        let mut errors = Vec::new();

        for stmt in &program.statements {
            match self.eval_statement(stmt) {
                Ok(Flow::Normal) => {}
                Ok(Flow::Return(value)) => match value {
                    Value::Int(code) => {
                        return Outcome {
                            exit_code: Some(code as i32),
                            errors,
                        }
                    }
                    Value::Null => {
                        return Outcome {
                            exit_code: Some(0),
                            errors,
                        }
                    }
                    other => {
                        errors.push(ErrorKind::BadExitCode(other.type_name()).at(stmt.loc()))
                    }
                },
                Ok(Flow::Break(loc)) => {
                    errors.push(ErrorKind::JumpOutsideLoop { is_break: true }.at(&loc))
                }
                Ok(Flow::Continue(loc)) => {
                    errors.push(ErrorKind::JumpOutsideLoop { is_break: false }.at(&loc))
                }
                Err(error) => errors.push(error),
            }
        }

        Outcome {
            exit_code: None,
            errors,
        }
    }

    fn eval_statement(&mut self, stmt: &Statement) -> EvalResult<Flow> {
        match stmt {
            Statement::Expression { expression } => {
                self.eval_expression(expression)?;
                Ok(Flow::Normal)
            }

            Statement::Let { loc, name, value } => {
                let value = self.eval_expression(value)?;
                if !self.env.borrow_mut().define(name, value) {
                    return Err(ErrorKind::AlreadyDefined(name.clone()).at(loc));
                }
                Ok(Flow::Normal)
            }

            Statement::Function { loc, name, value } => {
                let function = self.make_closure(value);
                if !self.env.borrow_mut().define(name, function) {
                    return Err(ErrorKind::AlreadyDefined(name.clone()).at(loc));
                }
                Ok(Flow::Normal)
            }

            Statement::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval_expression(expr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }

            Statement::Block(block) => self.eval_block(block),

            Statement::If(if_stmt) => {
                if self.eval_expression(&if_stmt.condition)?.is_truthy() {
                    self.eval_block(&if_stmt.then)
                } else if let Some(alt) = &if_stmt.alt {
                    // the alternative is another if statement or a block
                    self.eval_statement(alt)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Statement::Loop(loop_stmt) => self.eval_loop(loop_stmt),

            Statement::Jump { loc, is_break } => {
                if *is_break {
                    Ok(Flow::Break(loc.clone()))
                } else {
                    Ok(Flow::Continue(loc.clone()))
                }
            }
        }
    }

    /// Run a block in a fresh frame. The parent frame is restored on every
    /// path, including errors.
    fn eval_block(&mut self, block: &Block) -> EvalResult<Flow> {
        let saved = Rc::clone(&self.env);
        self.env = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(&saved))));

        let result = self.eval_statements(&block.statements);

        self.env = saved;
        result
    }

    fn eval_statements(&mut self, statements: &[Statement]) -> EvalResult<Flow> {
        for stmt in statements {
            match self.eval_statement(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    fn eval_loop(&mut self, loop_stmt: &LoopStatement) -> EvalResult<Flow> {
        loop {
            // an absent condition loops until a jump
            if let Some(condition) = &loop_stmt.condition {
                if !self.eval_expression(condition)?.is_truthy() {
                    break;
                }
            }

            match self.eval_block(&loop_stmt.body)? {
                Flow::Normal => {}
                Flow::Break(_) => break,
                // continue re-evaluates the condition
                Flow::Continue(_) => {}
                flow @ Flow::Return(_) => return Ok(flow),
            }
        }

        Ok(Flow::Normal)
    }

    fn eval_expression(&mut self, expr: &Expression) -> EvalResult<Value> {
        match expr {
            Expression::Integer { value, .. } => Ok(Value::Int(*value)),
            Expression::Float { value, .. } => Ok(Value::Float(*value)),
            Expression::Boolean { value, .. } => Ok(Value::Bool(*value)),
            Expression::Str { value, .. } => Ok(Value::Str(Rc::from(value.as_str()))),
            Expression::Null { .. } => Ok(Value::Null),

            Expression::Identifier(ident) => self.eval_identifier(ident),

            Expression::Prefix(prefix) => {
                let right = self.eval_expression(&prefix.right)?;
                match prefix.operator {
                    TokenKind::Bang => Ok(Value::Bool(!right.is_truthy())),
                    TokenKind::Minus => match right {
                        Value::Int(value) => Ok(Value::Int(-value)),
                        Value::Float(value) => Ok(Value::Float(-value)),
                        other => Err(ErrorKind::BadPrefixOperand {
                            operator: TokenKind::Minus,
                            operand: other.type_name(),
                        }
                        .at(&prefix.loc)),
                    },
                    operator => unreachable!("{} is not a prefix operator", operator),
                }
            }

            Expression::Infix(infix) => {
                // module access never evaluates its operands
                if infix.operator == TokenKind::Dot {
                    return self.eval_module_access(infix);
                }

                let left = self.eval_expression(&infix.left)?;
                let right = self.eval_expression(&infix.right)?;
                self.eval_infix(infix.operator, left, right, &infix.loc)
            }

            Expression::Assign(assign) => self.eval_assign(assign),

            Expression::Call(call) => self.eval_call(call),

            Expression::Index(index) => {
                let left = self.eval_expression(&index.left)?;
                let key = self.eval_expression(&index.index)?;
                self.eval_index(left, key, &index.loc)
            }

            Expression::Function(func) => Ok(self.make_closure(func)),

            Expression::Array(arr) => {
                let mut elements = Vec::with_capacity(arr.elements.len());
                for element in &arr.elements {
                    elements.push(self.eval_expression(element)?);
                }
                Ok(Value::array(elements))
            }

            Expression::Map(map) => {
                let mut entries = HashMap::with_capacity(map.entries.len());
                for entry in &map.entries {
                    let key = self.eval_expression(&entry.key)?;
                    let key = MapKey::from_value(&key)
                        .ok_or_else(|| ErrorKind::BadMapKey(key.type_name()).at(entry.key.loc()))?;
                    let value = self.eval_expression(&entry.value)?;
                    entries.insert(key, value);
                }
                Ok(Value::map(entries))
            }
        }
    }

    fn eval_identifier(&self, ident: &Identifier) -> EvalResult<Value> {
        if let Some(value) = self.env.borrow().get(&ident.name) {
            return Ok(value);
        }

        // unresolved names fall back to the builtin module
        match self.stdlib.global(&ident.name) {
            Some(builtin) => Ok(Value::Builtin(builtin)),
            None => Err(ErrorKind::VariableNotFound(ident.name.clone()).at(&ident.loc)),
        }
    }

    /// `module.name`: the left side must be an identifier naming a stdlib
    /// module; the result is the named builtin as a first-class value.
    fn eval_module_access(&self, infix: &InfixExpression) -> EvalResult<Value> {
        let module = match &infix.left {
            Expression::Identifier(ident) => &ident.name,
            _ => return Err(ErrorKind::BadModuleAccess.at(&infix.loc)),
        };

        let name = match &infix.right {
            Expression::Identifier(ident) => &ident.name,
            _ => return Err(ErrorKind::BadModuleAccess.at(&infix.loc)),
        };

        self.stdlib
            .lookup(module, name)
            .map(Value::Builtin)
            .map_err(|kind| kind.at(&infix.loc))
    }

    fn make_closure(&self, literal: &FunctionLiteral) -> Value {
        Value::Function(Rc::new(Function {
            parameters: literal
                .parameters
                .iter()
                .map(|param| param.name.clone())
                .collect(),
            body: Rc::clone(&literal.body),
            env: Rc::clone(&self.env),
        }))
    }

    fn eval_assign(&mut self, assign: &AssignExpression) -> EvalResult<Value> {
        let value = self.eval_expression(&assign.right)?;

        match &assign.left {
            Expression::Identifier(ident) => {
                if !self.env.borrow_mut().assign(&ident.name, value.clone()) {
                    return Err(ErrorKind::VariableNotFound(ident.name.clone()).at(&ident.loc));
                }
                Ok(value)
            }

            Expression::Index(index) => {
                let target = self.eval_expression(&index.left)?;
                let key = self.eval_expression(&index.index)?;

                match target {
                    Value::Array(elements) => {
                        let i = match key {
                            Value::Int(i) => i,
                            other => {
                                return Err(
                                    ErrorKind::BadIndexType(other.type_name()).at(&index.loc)
                                )
                            }
                        };

                        let mut elements = elements.borrow_mut();
                        if i < 0 || i >= elements.len() as i64 {
                            return Err(ErrorKind::IndexOutOfRange(i).at(&index.loc));
                        }

                        elements[i as usize] = value.clone();
                        Ok(value)
                    }

                    // map assignment inserts or overwrites
                    Value::Map(entries) => {
                        let key = MapKey::from_value(&key)
                            .ok_or_else(|| ErrorKind::BadMapKey(key.type_name()).at(&index.loc))?;
                        entries.borrow_mut().insert(key, value.clone());
                        Ok(value)
                    }

                    other => Err(ErrorKind::NotIndexable(other.type_name()).at(&index.loc)),
                }
            }

            // the parser only produces identifier and index targets
            _ => unreachable!("invalid assignment target"),
        }
    }

    fn eval_call(&mut self, call: &CallExpression) -> EvalResult<Value> {
        let callee = self.eval_expression(&call.callee)?;

        let mut args = Vec::with_capacity(call.arguments.len());
        for arg in &call.arguments {
            args.push(self.eval_expression(arg)?);
        }

        match callee {
            Value::Function(func) => {
                if args.len() != func.parameters.len() {
                    return Err(ErrorKind::BadArity {
                        expected: func.parameters.len(),
                        got: args.len(),
                    }
                    .at(&call.loc));
                }

                // switch to a frame enclosed by the *captured* environment,
                // not the caller's
                self.env_stack.push(Rc::clone(&self.env));
                self.env = Rc::new(RefCell::new(Environment::new_enclosed(Rc::clone(
                    &func.env,
                ))));

                for (param, arg) in func.parameters.iter().zip(args) {
                    self.env.borrow_mut().bind(param, arg);
                }

                let result = self.eval_statements(&func.body.statements);

                // restore the caller frame on every path
                self.env = self.env_stack.pop().unwrap();

                match result? {
                    Flow::Return(value) => Ok(value),
                    // falling off the end of a function yields null
                    Flow::Normal => Ok(Value::Null),
                    Flow::Break(loc) => {
                        Err(ErrorKind::JumpOutsideLoop { is_break: true }.at(&loc))
                    }
                    Flow::Continue(loc) => {
                        Err(ErrorKind::JumpOutsideLoop { is_break: false }.at(&loc))
                    }
                }
            }

            Value::Builtin(builtin) => {
                (builtin.func)(&args).map_err(|kind| kind.at(&call.loc))
            }

            other => Err(ErrorKind::NotCallable(other.type_name()).at(&call.loc)),
        }
    }

    fn eval_index(&self, left: Value, key: Value, loc: &SrcLoc) -> EvalResult<Value> {
        match left {
            Value::Array(elements) => {
                let i = match key {
                    Value::Int(i) => i,
                    other => return Err(ErrorKind::BadIndexType(other.type_name()).at(loc)),
                };

                let elements = elements.borrow();
                if i < 0 || i >= elements.len() as i64 {
                    return Err(ErrorKind::IndexOutOfRange(i).at(loc));
                }

                Ok(elements[i as usize].clone())
            }

            Value::Map(entries) => {
                let key = MapKey::from_value(&key)
                    .ok_or_else(|| ErrorKind::BadMapKey(key.type_name()).at(loc))?;

                // absent keys read as null
                Ok(entries.borrow().get(&key).cloned().unwrap_or(Value::Null))
            }

            other => Err(ErrorKind::NotIndexable(other.type_name()).at(loc)),
        }
    }

    fn eval_infix(
        &self,
        operator: TokenKind,
        left: Value,
        right: Value,
        loc: &SrcLoc,
    ) -> EvalResult<Value> {
        use TokenKind::{Eq, NotEq, Plus};

        // equality is defined across every kind
        match operator {
            Eq => return Ok(Value::Bool(left.eq_value(&right))),
            NotEq => return Ok(Value::Bool(!left.eq_value(&right))),
            _ => {}
        }

        match (&left, &right) {
            (Value::Int(l), Value::Int(r)) => self.int_infix(operator, *l, *r, loc),

            // any float operand promotes the other side
            (Value::Int(l), Value::Float(r)) => self.float_infix(operator, *l as f64, *r, loc),
            (Value::Float(l), Value::Int(r)) => self.float_infix(operator, *l, *r as f64, loc),
            (Value::Float(l), Value::Float(r)) => self.float_infix(operator, *l, *r, loc),

            (Value::Str(l), Value::Str(r)) => self.string_infix(operator, l, r, loc),

            // string concatenation formats the numeric side
            (Value::Str(l), Value::Int(_) | Value::Float(_)) if operator == Plus => {
                Ok(Value::Str(Rc::from(format!("{}{}", l, right))))
            }
            (Value::Int(_) | Value::Float(_), Value::Str(r)) if operator == Plus => {
                Ok(Value::Str(Rc::from(format!("{}{}", left, r))))
            }

            (Value::Array(l), Value::Array(r)) if operator == Plus => {
                let mut joined = l.borrow().clone();
                joined.extend(r.borrow().iter().cloned());
                Ok(Value::array(joined))
            }

            // map + map overlays; the right side wins on collisions
            (Value::Map(l), Value::Map(r)) if operator == Plus => {
                let mut joined = l.borrow().clone();
                for (key, value) in r.borrow().iter() {
                    joined.insert(key.clone(), value.clone());
                }
                Ok(Value::map(joined))
            }

            _ => Err(ErrorKind::BadInfixOperands {
                operator,
                left: left.type_name(),
                right: right.type_name(),
            }
            .at(loc)),
        }
    }

    fn int_infix(&self, operator: TokenKind, l: i64, r: i64, loc: &SrcLoc) -> EvalResult<Value> {
        match operator {
            TokenKind::Plus => Ok(Value::Int(l + r)),
            TokenKind::Minus => Ok(Value::Int(l - r)),
            TokenKind::Star => Ok(Value::Int(l * r)),
            // division by zero is left to the host
            TokenKind::Slash => Ok(Value::Int(l / r)),

            TokenKind::LessThan => Ok(Value::Bool(l < r)),
            TokenKind::GreaterThan => Ok(Value::Bool(l > r)),
            TokenKind::LessEq => Ok(Value::Bool(l <= r)),
            TokenKind::GreaterEq => Ok(Value::Bool(l >= r)),

            operator => Err(ErrorKind::BadInfixOperands {
                operator,
                left: "int",
                right: "int",
            }
            .at(loc)),
        }
    }

    fn float_infix(&self, operator: TokenKind, l: f64, r: f64, loc: &SrcLoc) -> EvalResult<Value> {
        match operator {
            TokenKind::Plus => Ok(Value::Float(l + r)),
            TokenKind::Minus => Ok(Value::Float(l - r)),
            TokenKind::Star => Ok(Value::Float(l * r)),
            TokenKind::Slash => Ok(Value::Float(l / r)),

            TokenKind::LessThan => Ok(Value::Bool(l < r)),
            TokenKind::GreaterThan => Ok(Value::Bool(l > r)),
            TokenKind::LessEq => Ok(Value::Bool(l <= r)),
            TokenKind::GreaterEq => Ok(Value::Bool(l >= r)),

            operator => Err(ErrorKind::BadInfixOperands {
                operator,
                left: "float",
                right: "float",
            }
            .at(loc)),
        }
    }

    fn string_infix(
        &self,
        operator: TokenKind,
        l: &Rc<str>,
        r: &Rc<str>,
        loc: &SrcLoc,
    ) -> EvalResult<Value> {
        match operator {
            TokenKind::Plus => Ok(Value::Str(Rc::from(format!("{}{}", l, r)))),

            // lexicographic ordering
            TokenKind::LessThan => Ok(Value::Bool(l < r)),
            TokenKind::GreaterThan => Ok(Value::Bool(l > r)),
            TokenKind::LessEq => Ok(Value::Bool(l <= r)),
            TokenKind::GreaterEq => Ok(Value::Bool(l >= r)),

            operator => Err(ErrorKind::BadInfixOperands {
                operator,
                left: "string",
                right: "string",
            }
            .at(loc)),
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new()
    }
}
