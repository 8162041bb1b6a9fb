use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

/// One frame of the lexical scope chain: a name table plus an optional
/// outer frame. Closures keep their defining frame alive by holding the
/// `Rc`, which can outlive the syntactic scope that created it.
#[derive(Debug)]
pub struct Environment {
    store: HashMap<String, Value>,
    outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            store: HashMap::new(),
            outer: None,
        }
    }

    /// Create a new environment enclosed by the given outer environment.
    pub fn new_enclosed(outer: Rc<RefCell<Environment>>) -> Self {
        Environment {
            store: HashMap::new(),
            outer: Some(outer),
        }
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        match self.store.get(name) {
            Some(value) => Some(value.clone()),
            // Not in this frame, walk outward
            None => match &self.outer {
                Some(outer) => outer.borrow().get(name),
                None => None,
            },
        }
    }

    /// Bind a new name in this frame (`let`/`fn` statements). Fails if the
    /// name already exists here; shadowing an outer frame is fine.
    pub fn define(&mut self, name: &str, value: Value) -> bool {
        if self.store.contains_key(name) {
            return false;
        }

        self.store.insert(name.to_string(), value);
        true
    }

    /// Bind unconditionally, replacing any existing binding in this frame.
    /// Used for call parameters, where a duplicated name means the last
    /// one wins.
    pub fn bind(&mut self, name: &str, value: Value) {
        self.store.insert(name.to_string(), value);
    }

    /// Mutate the nearest enclosing binding (`=`). Fails if the name is
    /// not bound anywhere in the chain.
    pub fn assign(&mut self, name: &str, value: Value) -> bool {
        if self.store.contains_key(name) {
            self.store.insert(name.to_string(), value);
            return true;
        }

        match &self.outer {
            Some(outer) => outer.borrow_mut().assign(name, value),
            None => false,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}
