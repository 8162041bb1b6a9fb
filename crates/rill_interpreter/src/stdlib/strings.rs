use std::rc::Rc;

use crate::error::ErrorKind;
use crate::stdlib::{arity, dispatch_from, entry, want_string, Builtin, DispatchTable, Module};
use crate::value::Value;

pub struct Strings {
    table: DispatchTable,
}

impl Strings {
    pub fn new() -> Strings {
        let mut table = DispatchTable::new();

        entry(&mut table, "from", Rc::new(from));
        entry(&mut table, "len", Rc::new(len));
        entry(&mut table, "trim", Rc::new(trim));
        entry(&mut table, "trimSpace", Rc::new(trim_space));
        entry(&mut table, "split", Rc::new(split));
        entry(&mut table, "splitSpace", Rc::new(split_space));

        Strings { table }
    }
}

impl Default for Strings {
    fn default() -> Self {
        Strings::new()
    }
}

impl Module for Strings {
    fn dispatch(&self, name: &str) -> Result<Rc<Builtin>, ErrorKind> {
        dispatch_from(&self.table, "strings", name)
    }
}

/// The canonical string form of any value; this is the same formatting
/// `io.print` and string concatenation use.
fn from(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("from", "one argument", 1, args)?;

    Ok(Value::Str(Rc::from(args[0].to_string())))
}

fn len(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("len", "one argument", 1, args)?;
    let s = want_string("len", &args[0])?;

    Ok(Value::Int(s.len() as i64))
}

/// Removes leading and trailing characters drawn from the cut set.
fn trim(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("trim", "two arguments", 2, args)?;
    let s = want_string("trim", &args[0])?;
    let cut = want_string("trim", &args[1])?;

    let trimmed = s.trim_matches(|c: char| cut.contains(c));
    Ok(Value::Str(Rc::from(trimmed)))
}

fn trim_space(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("trimSpace", "one argument", 1, args)?;
    let s = want_string("trimSpace", &args[0])?;

    Ok(Value::Str(Rc::from(s.trim())))
}

/// Splits on the separator. An empty separator splits into single
/// characters.
fn split(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("split", "two arguments", 2, args)?;
    let s = want_string("split", &args[0])?;
    let sep = want_string("split", &args[1])?;

    let parts: Vec<Value> = if sep.is_empty() {
        s.chars()
            .map(|c| Value::Str(Rc::from(c.to_string())))
            .collect()
    } else {
        s.split(&*sep)
            .map(|part| Value::Str(Rc::from(part)))
            .collect()
    };

    Ok(Value::array(parts))
}

/// Splits around runs of whitespace; no empty parts.
fn split_space(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("splitSpace", "one argument", 1, args)?;
    let s = want_string("splitSpace", &args[0])?;

    let parts: Vec<Value> = s
        .split_whitespace()
        .map(|part| Value::Str(Rc::from(part)))
        .collect();

    Ok(Value::array(parts))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::error::ErrorKind;
    use crate::stdlib::strings::{from, len, split, split_space, trim, trim_space};
    use crate::value::Value;

    fn s(value: &str) -> Value {
        Value::Str(Rc::from(value))
    }

    fn unwrap_str(value: Value) -> String {
        match value {
            Value::Str(v) => v.to_string(),
            other => panic!("expected string but got {:?}", other),
        }
    }

    #[test]
    fn from_uses_canonical_formatting() {
        assert_eq!(unwrap_str(from(&[Value::Int(12)]).unwrap()), "12");
        assert_eq!(unwrap_str(from(&[Value::Float(2.5)]).unwrap()), "2.5");
        assert_eq!(unwrap_str(from(&[Value::Float(3.0)]).unwrap()), "3");
        assert_eq!(unwrap_str(from(&[Value::Bool(false)]).unwrap()), "false");
        assert_eq!(unwrap_str(from(&[Value::Null]).unwrap()), "null");
        assert_eq!(unwrap_str(from(&[s("raw")]).unwrap()), "raw");
        assert_eq!(
            unwrap_str(from(&[Value::array(vec![Value::Int(1), s("x")])]).unwrap()),
            "[1, x]"
        );
    }

    #[test]
    fn len_counts_bytes() {
        assert!(matches!(len(&[s("")]).unwrap(), Value::Int(0)));
        assert!(matches!(len(&[s("four")]).unwrap(), Value::Int(4)));
        assert!(matches!(len(&[s("hello world")]).unwrap(), Value::Int(11)));
        assert_eq!(
            len(&[Value::Int(1)]).unwrap_err(),
            ErrorKind::BadArgument {
                func: "len",
                detail: "a string, got int".to_string(),
            }
        );
    }

    #[test]
    fn trim_removes_cut_set() {
        assert_eq!(unwrap_str(trim(&[s("xxhixx"), s("x")]).unwrap()), "hi");
        assert_eq!(unwrap_str(trim(&[s("--a-b--"), s("-")]).unwrap()), "a-b");
        assert_eq!(unwrap_str(trim(&[s("keep"), s("")]).unwrap()), "keep");
        assert_eq!(unwrap_str(trim_space(&[s("  pad\t")]).unwrap()), "pad");
    }

    #[test]
    fn split_variants() {
        let parts = split(&[s("a,b,,c"), s(",")]).unwrap();
        assert_eq!(parts.to_string(), "[a, b, , c]");

        let chars = split(&[s("abc"), s("")]).unwrap();
        assert_eq!(chars.to_string(), "[a, b, c]");

        let words = split_space(&[s("  one  two\tthree ")]).unwrap();
        assert_eq!(words.to_string(), "[one, two, three]");
    }
}
