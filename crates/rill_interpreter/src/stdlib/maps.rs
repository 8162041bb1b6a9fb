use std::rc::Rc;

use crate::error::ErrorKind;
use crate::stdlib::{arity, dispatch_from, entry, want_map, Builtin, DispatchTable, Module};
use crate::value::{MapKey, Value};

pub struct Maps {
    table: DispatchTable,
}

impl Maps {
    pub fn new() -> Maps {
        let mut table = DispatchTable::new();

        entry(&mut table, "len", Rc::new(len));
        entry(&mut table, "insert", Rc::new(insert));
        entry(&mut table, "erase", Rc::new(erase));
        entry(&mut table, "copy", Rc::new(copy));
        entry(&mut table, "concat", Rc::new(concat));

        Maps { table }
    }
}

impl Default for Maps {
    fn default() -> Self {
        Maps::new()
    }
}

impl Module for Maps {
    fn dispatch(&self, name: &str) -> Result<Rc<Builtin>, ErrorKind> {
        dispatch_from(&self.table, "maps", name)
    }
}

fn key_of(arg: &Value) -> Result<MapKey, ErrorKind> {
    MapKey::from_value(arg).ok_or(ErrorKind::BadMapKey(arg.type_name()))
}

fn len(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("len", "one argument", 1, args)?;
    let map = want_map("len", &args[0])?;

    let n = map.borrow().len() as i64;
    Ok(Value::Int(n))
}

/// Inserts only when the key is absent; the result reports whether the
/// entry was added. Overwriting goes through index assignment instead.
fn insert(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("insert", "three arguments", 3, args)?;
    let map = want_map("insert", &args[0])?;
    let key = key_of(&args[1])?;

    let mut entries = map.borrow_mut();
    if entries.contains_key(&key) {
        return Ok(Value::Bool(false));
    }

    entries.insert(key, args[2].clone());
    Ok(Value::Bool(true))
}

/// Removes and returns the entry for the key, or null if it was absent.
fn erase(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("erase", "two arguments", 2, args)?;
    let map = want_map("erase", &args[0])?;
    let key = key_of(&args[1])?;

    let removed = map.borrow_mut().remove(&key).unwrap_or(Value::Null);
    Ok(removed)
}

fn copy(args: &[Value]) -> Result<Value, ErrorKind> {
    arity("copy", "one argument", 1, args)?;
    let map = want_map("copy", &args[0])?;

    let cloned = map.borrow().clone();
    Ok(Value::map(cloned))
}

/// A new map holding every argument's entries; later arguments win on key
/// collisions.
fn concat(args: &[Value]) -> Result<Value, ErrorKind> {
    let mut joined = std::collections::HashMap::new();

    for arg in args {
        let map = want_map("concat", arg)?;
        for (key, value) in map.borrow().iter() {
            joined.insert(key.clone(), value.clone());
        }
    }

    Ok(Value::map(joined))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::rc::Rc;

    use crate::error::ErrorKind;
    use crate::stdlib::maps::{concat, copy, erase, insert, len};
    use crate::value::{MapKey, Value};

    fn map_of(entries: &[(&str, i64)]) -> Value {
        let mut map = HashMap::new();
        for (key, value) in entries {
            map.insert(MapKey::Str(Rc::from(*key)), Value::Int(*value));
        }
        Value::map(map)
    }

    fn get(map: &Value, key: &str) -> Option<Value> {
        match map {
            Value::Map(entries) => entries.borrow().get(&MapKey::Str(Rc::from(key))).cloned(),
            _ => None,
        }
    }

    #[test]
    fn insert_reports_collisions() {
        let m = map_of(&[("a", 1)]);

        let ok = insert(&[m.clone(), Value::Str(Rc::from("b")), Value::Int(2)]).unwrap();
        assert!(matches!(ok, Value::Bool(true)));

        let dup = insert(&[m.clone(), Value::Str(Rc::from("a")), Value::Int(9)]).unwrap();
        assert!(matches!(dup, Value::Bool(false)));

        // the colliding insert left the original entry alone
        assert!(get(&m, "a").unwrap().eq_value(&Value::Int(1)));
        assert!(matches!(len(&[m]).unwrap(), Value::Int(2)));
    }

    #[test]
    fn erase_returns_removed_or_null() {
        let m = map_of(&[("a", 1)]);

        let removed = erase(&[m.clone(), Value::Str(Rc::from("a"))]).unwrap();
        assert!(removed.eq_value(&Value::Int(1)));

        let missing = erase(&[m, Value::Str(Rc::from("a"))]).unwrap();
        assert!(matches!(missing, Value::Null));
    }

    #[test]
    fn concat_overlays_left_to_right() {
        let a = map_of(&[("k", 1), ("only_a", 10)]);
        let b = map_of(&[("k", 2)]);

        let merged = concat(&[a.clone(), b]).unwrap();
        assert!(get(&merged, "k").unwrap().eq_value(&Value::Int(2)));
        assert!(get(&merged, "only_a").unwrap().eq_value(&Value::Int(10)));

        // inputs untouched
        assert!(get(&a, "k").unwrap().eq_value(&Value::Int(1)));
    }

    #[test]
    fn copy_detaches() {
        let a = map_of(&[("k", 1)]);
        let b = copy(&[a.clone()]).unwrap();

        insert(&[b.clone(), Value::Str(Rc::from("new")), Value::Int(2)]).unwrap();
        assert!(get(&a, "new").is_none());
        assert!(get(&b, "new").is_some());
    }

    #[test]
    fn invalid_keys_are_rejected() {
        let m = map_of(&[]);

        assert_eq!(
            insert(&[m.clone(), Value::array(vec![]), Value::Null]).unwrap_err(),
            ErrorKind::BadMapKey("array")
        );
        assert_eq!(
            erase(&[m, Value::Null]).unwrap_err(),
            ErrorKind::BadMapKey("null")
        );
    }
}
