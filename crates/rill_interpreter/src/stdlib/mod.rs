pub mod arrays;
pub mod builtin;
pub mod io;
pub mod maps;
pub mod strings;

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::error::ErrorKind;
use crate::value::Value;

pub use io::{Input, Output};

/// The uniform shape of a standard-library function: positional arguments
/// in, value or error out. Each builtin enforces its own arity and
/// argument types.
pub type BuiltinFn = Rc<dyn Fn(&[Value]) -> Result<Value, ErrorKind>>;

/// A named standard-library callable. Identity (the `Rc` pointer) is what
/// equality means for builtin values.
pub struct Builtin {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<builtin {}>", self.name)
    }
}

/// A named group of builtins, reachable through the `.` operator.
pub trait Module {
    fn dispatch(&self, name: &str) -> Result<Rc<Builtin>, ErrorKind>;
}

pub(crate) type DispatchTable = HashMap<&'static str, Rc<Builtin>>;

pub(crate) fn entry(table: &mut DispatchTable, name: &'static str, func: BuiltinFn) {
    table.insert(name, Rc::new(Builtin { name, func }));
}

pub(crate) fn dispatch_from(
    table: &DispatchTable,
    module: &'static str,
    name: &str,
) -> Result<Rc<Builtin>, ErrorKind> {
    table.get(name).cloned().ok_or_else(|| ErrorKind::NoMethod {
        module,
        name: name.to_string(),
    })
}

/// The module registry. `lookup` serves the `.` operator; `global` is the
/// fallback namespace searched for bare identifiers.
pub struct StdLib {
    modules: HashMap<&'static str, Box<dyn Module>>,
}

impl StdLib {
    pub fn new(input: Input, output: Output) -> StdLib {
        let mut modules: HashMap<&'static str, Box<dyn Module>> = HashMap::new();

        modules.insert("builtin", Box::new(builtin::BuiltinModule::new()));
        modules.insert("arrays", Box::new(arrays::Arrays::new()));
        modules.insert("maps", Box::new(maps::Maps::new()));
        modules.insert("strings", Box::new(strings::Strings::new()));
        modules.insert("io", Box::new(io::Io::new(input, output)));

        StdLib { modules }
    }

    pub fn lookup(&self, module: &str, name: &str) -> Result<Rc<Builtin>, ErrorKind> {
        match self.modules.get(module) {
            Some(m) => m.dispatch(name),
            None => Err(ErrorKind::NoModule(module.to_string())),
        }
    }

    pub fn global(&self, name: &str) -> Option<Rc<Builtin>> {
        self.modules
            .get("builtin")
            .and_then(|m| m.dispatch(name).ok())
    }
}

pub(crate) fn arity(
    func: &'static str,
    expected: &'static str,
    want: usize,
    args: &[Value],
) -> Result<(), ErrorKind> {
    if args.len() != want {
        return Err(ErrorKind::BuiltinArity {
            func,
            expected,
            got: args.len(),
        });
    }

    Ok(())
}

pub(crate) fn want_array(
    func: &'static str,
    arg: &Value,
) -> Result<Rc<std::cell::RefCell<Vec<Value>>>, ErrorKind> {
    match arg {
        Value::Array(arr) => Ok(Rc::clone(arr)),
        other => Err(ErrorKind::BadArgument {
            func,
            detail: format!("an array, got {}", other.type_name()),
        }),
    }
}

pub(crate) fn want_map(
    func: &'static str,
    arg: &Value,
) -> Result<Rc<std::cell::RefCell<HashMap<crate::value::MapKey, Value>>>, ErrorKind> {
    match arg {
        Value::Map(map) => Ok(Rc::clone(map)),
        other => Err(ErrorKind::BadArgument {
            func,
            detail: format!("a map, got {}", other.type_name()),
        }),
    }
}

pub(crate) fn want_string(func: &'static str, arg: &Value) -> Result<Rc<str>, ErrorKind> {
    match arg {
        Value::Str(s) => Ok(Rc::clone(s)),
        other => Err(ErrorKind::BadArgument {
            func,
            detail: format!("a string, got {}", other.type_name()),
        }),
    }
}

pub(crate) fn want_int(func: &'static str, arg: &Value) -> Result<i64, ErrorKind> {
    match arg {
        Value::Int(v) => Ok(*v),
        other => Err(ErrorKind::BadArgument {
            func,
            detail: format!("an integer index, got {}", other.type_name()),
        }),
    }
}
