use std::rc::Rc;

use crate::error::ErrorKind;
use crate::stdlib::{arity, dispatch_from, entry, Builtin, DispatchTable, Module};
use crate::value::Value;

/// The unnamed global module. Its members resolve both as `builtin.name`
/// and as bare identifiers that are not bound in any scope.
pub struct BuiltinModule {
    table: DispatchTable,
}

impl BuiltinModule {
    pub fn new() -> BuiltinModule {
        let mut table = DispatchTable::new();

        entry(&mut table, "type", Rc::new(type_of));

        BuiltinModule { table }
    }
}

impl Default for BuiltinModule {
    fn default() -> Self {
        BuiltinModule::new()
    }
}

impl Module for BuiltinModule {
    fn dispatch(&self, name: &str) -> Result<Rc<Builtin>, ErrorKind> {
        dispatch_from(&self.table, "builtin", name)
    }
}

fn type_of(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("type", "one argument", 1, args)?;

    Ok(Value::Str(Rc::from(args[0].type_name())))
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::stdlib::builtin::type_of;
    use crate::value::Value;

    #[test]
    fn type_names() {
        let tests = vec![
            (Value::Int(1), "int"),
            (Value::Float(1.5), "float"),
            (Value::Str(Rc::from("s")), "string"),
            (Value::Bool(true), "bool"),
            (Value::array(vec![]), "array"),
            (Value::map(Default::default()), "map"),
            (Value::Null, "null"),
        ];

        for (value, expected) in tests {
            match type_of(&[value]).unwrap() {
                Value::Str(s) => assert_eq!(&*s, expected),
                other => panic!("expected string but got {:?}", other),
            }
        }
    }

    #[test]
    fn type_checks_arity() {
        assert!(type_of(&[]).is_err());
        assert!(type_of(&[Value::Null, Value::Null]).is_err());
    }
}
