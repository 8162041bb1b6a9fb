use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Display};
use std::rc::Rc;

use ordered_float::OrderedFloat;
use rill_parser::ast::Block;

use crate::environment::Environment;
use crate::stdlib::Builtin;

/// A runtime value. Scalars are copied on assignment; arrays, maps, and
/// functions are handles, so two bindings to the same container alias it.
#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(Rc<str>),
    Null,
    Array(Rc<RefCell<Vec<Value>>>),
    Map(Rc<RefCell<HashMap<MapKey, Value>>>),
    Function(Rc<Function>),
    Builtin(Rc<Builtin>),
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn map(entries: HashMap<MapKey, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(entries)))
    }

    pub fn type_name(&self) -> &'static str {
        use Value::*;

        match self {
            Int(_) => "int",
            Float(_) => "float",
            Bool(_) => "bool",
            Str(_) => "string",
            Null => "null",
            Array(_) => "array",
            Map(_) => "map",
            Function(_) | Builtin(_) => "function",
        }
    }

    /// The coercion used by `if`, `loop`, and `!`: false, null, zero, and
    /// the empty string are falsy, everything else is truthy.
    pub fn is_truthy(&self) -> bool {
        use Value::*;

        match self {
            Bool(value) => *value,
            Null => false,
            Int(value) => *value != 0,
            Float(value) => *value != 0.0,
            Str(value) => !value.is_empty(),
            _ => true,
        }
    }

    /// `==` semantics: numbers compare with int-to-float promotion, arrays
    /// element-wise, maps entry-wise, functions by identity. Everything
    /// else cross-kind is unequal.
    pub fn eq_value(&self, other: &Value) -> bool {
        use Value::*;

        match (self, other) {
            (Int(l), Int(r)) => l == r,
            (Float(l), Float(r)) => l == r,
            (Int(l), Float(r)) => *l as f64 == *r,
            (Float(l), Int(r)) => *l == *r as f64,
            (Bool(l), Bool(r)) => l == r,
            (Str(l), Str(r)) => l == r,
            (Null, Null) => true,
            (Array(l), Array(r)) => {
                if Rc::ptr_eq(l, r) {
                    return true;
                }
                let (l, r) = (l.borrow(), r.borrow());
                l.len() == r.len() && l.iter().zip(r.iter()).all(|(a, b)| a.eq_value(b))
            }
            (Map(l), Map(r)) => {
                if Rc::ptr_eq(l, r) {
                    return true;
                }
                let (l, r) = (l.borrow(), r.borrow());
                l.len() == r.len()
                    && l.iter()
                        .all(|(k, v)| r.get(k).map_or(false, |rv| v.eq_value(rv)))
            }
            (Function(l), Function(r)) => Rc::ptr_eq(l, r),
            (Builtin(l), Builtin(r)) => Rc::ptr_eq(l, r),
            _ => false,
        }
    }
}

impl Display for Value {
    /// The canonical formatting shared by `strings.from`, `io.print`, and
    /// string concatenation.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Value::*;

        match self {
            Int(value) => write!(f, "{}", value),
            Float(value) => fmt_float(f, *value),
            Bool(value) => write!(f, "{}", value),
            Str(value) => write!(f, "{}", value),
            Null => write!(f, "null"),
            Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Function(_) | Builtin(_) => write!(f, "function"),
        }
    }
}

/// Shortest round-trip float form, with ryu's trailing `.0` stripped so
/// integer-valued floats print bare (`1`, not `1.0`).
pub(crate) fn fmt_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    let mut buffer = ryu::Buffer::new();
    let formatted = buffer.format(value);
    write!(f, "{}", formatted.strip_suffix(".0").unwrap_or(formatted))
}

/// The subset of values usable as map keys. Floats are wrapped so the key
/// type is `Eq + Hash`; key equality is exact-variant (`1` and `1.0` are
/// different keys).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(Rc<str>),
    Bool(bool),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Option<MapKey> {
        match value {
            Value::Int(v) => Some(MapKey::Int(*v)),
            Value::Float(v) => Some(MapKey::Float(OrderedFloat(*v))),
            Value::Str(v) => Some(MapKey::Str(Rc::clone(v))),
            Value::Bool(v) => Some(MapKey::Bool(*v)),
            _ => None,
        }
    }
}

impl Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapKey::Int(value) => write!(f, "{}", value),
            MapKey::Float(value) => fmt_float(f, value.0),
            MapKey::Str(value) => write!(f, "{}", value),
            MapKey::Bool(value) => write!(f, "{}", value),
        }
    }
}

/// A closure: the literal's parameters and body plus the environment frame
/// that was current when the literal was evaluated.
pub struct Function {
    pub parameters: Vec<String>,
    pub body: Rc<Block>,
    pub env: Rc<RefCell<Environment>>,
}

// Manual impl: the captured environment can contain the function itself,
// so deriving Debug would recurse.
impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}
