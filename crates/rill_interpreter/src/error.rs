use std::fmt::{self, Display};

use rill_parser::location::SrcLoc;
use rill_parser::token::TokenKind;

/// A runtime error decorated with the source location of the node that
/// produced it. Prints as `file:line:col: message`.
#[derive(Debug, PartialEq)]
pub struct RuntimeError {
    pub loc: SrcLoc,
    pub kind: ErrorKind,
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.loc, self.kind)
    }
}

/// What went wrong, without a location. Standard-library builtins produce
/// these; the evaluator attaches the call site.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// An identifier that resolves nowhere in the scope chain
    VariableNotFound(String),
    /// A `let` or `fn` statement re-binding a name in the same frame
    AlreadyDefined(String),
    /// Call syntax applied to a value that is not a function
    NotCallable(&'static str),
    /// An infix operator applied to operand types it does not support
    BadInfixOperands {
        operator: TokenKind,
        left: &'static str,
        right: &'static str,
    },
    /// A prefix operator applied to an operand type it does not support
    BadPrefixOperand {
        operator: TokenKind,
        operand: &'static str,
    },
    /// Call argument count does not match the function's parameter count
    BadArity { expected: usize, got: usize },
    IndexOutOfRange(i64),
    NotIndexable(&'static str),
    BadIndexType(&'static str),
    BadMapKey(&'static str),
    NoModule(String),
    NoMethod {
        module: &'static str,
        name: String,
    },
    /// The left side of `.` is not an identifier naming a module
    BadModuleAccess,
    /// `break`/`continue` escaping every enclosing loop
    JumpOutsideLoop { is_break: bool },
    /// A top-level `return` with a value that is neither int nor null
    BadExitCode(&'static str),
    /// A standard-library function rejecting an argument
    BadArgument {
        func: &'static str,
        detail: String,
    },
    /// A standard-library function called with the wrong argument count
    BuiltinArity {
        func: &'static str,
        expected: &'static str,
        got: usize,
    },
    /// A failure in the underlying input/output stream
    Io(String),
}

impl ErrorKind {
    pub fn at(self, loc: &SrcLoc) -> RuntimeError {
        RuntimeError {
            loc: loc.clone(),
            kind: self,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ErrorKind::*;

        match self {
            VariableNotFound(name) => write!(f, "variable not found: {}", name),
            AlreadyDefined(name) => write!(f, "variable already defined: {}", name),
            NotCallable(type_name) => write!(f, "not a callable {}", type_name),
            BadInfixOperands {
                operator,
                left,
                right,
            } => write!(
                f,
                "unsupported operand types for {}: {} and {}",
                operator, left, right
            ),
            BadPrefixOperand { operator, operand } => {
                write!(f, "unsupported operand type for {}: {}", operator, operand)
            }
            BadArity { expected, got } => {
                write!(f, "expected {} argument(s), got {}", expected, got)
            }
            IndexOutOfRange(index) => write!(f, "index out of range [{}]", index),
            NotIndexable(type_name) => {
                write!(f, "index operator not supported for {}", type_name)
            }
            BadIndexType(type_name) => {
                write!(f, "array index must be an integer, got {}", type_name)
            }
            BadMapKey(type_name) => write!(f, "unsupported map key type: {}", type_name),
            NoModule(name) => write!(f, "no module named \"{}\"", name),
            NoMethod { module, name } => {
                write!(f, "no method \"{}\" found in {} module", name, module)
            }
            BadModuleAccess => write!(f, "left of '.' must be a module name"),
            JumpOutsideLoop { is_break: true } => write!(f, "break outside loop"),
            JumpOutsideLoop { is_break: false } => write!(f, "continue outside loop"),
            BadExitCode(type_name) => write!(
                f,
                "top-level return expects an integer exit code, got {}",
                type_name
            ),
            BadArgument { func, detail } => write!(f, "{} expects {}", func, detail),
            BuiltinArity {
                func,
                expected,
                got,
            } => write!(f, "{} expects {}, got {}", func, expected, got),
            Io(message) => write!(f, "io error: {}", message),
        }
    }
}
