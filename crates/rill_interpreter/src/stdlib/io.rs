use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use crate::error::ErrorKind;
use crate::stdlib::{arity, dispatch_from, entry, Builtin, DispatchTable, Module};
use crate::value::Value;

/// The line source the evaluator reads from. Shared handles so the module,
/// the evaluator, and embedding tests can hold the same stream.
pub type Input = Rc<RefCell<dyn BufRead>>;
/// The sink `io.print`/`io.println` write to.
pub type Output = Rc<RefCell<dyn Write>>;

pub struct Io {
    table: DispatchTable,
}

impl Io {
    pub fn new(input: Input, output: Output) -> Io {
        let mut table = DispatchTable::new();

        entry(&mut table, "readln", {
            let input = Rc::clone(&input);
            Rc::new(move |args: &[Value]| {
                arity("readln", "no arguments", 0, args)?;

                let mut line = String::new();
                let read = input
                    .borrow_mut()
                    .read_line(&mut line)
                    .map_err(|err| ErrorKind::Io(err.to_string()))?;

                // end of input
                if read == 0 {
                    return Ok(Value::Null);
                }

                if line.ends_with('\n') {
                    line.pop();
                    if line.ends_with('\r') {
                        line.pop();
                    }
                }

                Ok(Value::Str(Rc::from(line)))
            })
        });

        entry(&mut table, "print", {
            let output = Rc::clone(&output);
            Rc::new(move |args: &[Value]| {
                let mut out = output.borrow_mut();
                for value in args {
                    write!(out, "{}", value).map_err(|err| ErrorKind::Io(err.to_string()))?;
                }
                out.flush().map_err(|err| ErrorKind::Io(err.to_string()))?;

                Ok(Value::Null)
            })
        });

        entry(&mut table, "println", {
            let output = Rc::clone(&output);
            Rc::new(move |args: &[Value]| {
                let mut out = output.borrow_mut();
                for value in args {
                    write!(out, "{}", value).map_err(|err| ErrorKind::Io(err.to_string()))?;
                }
                writeln!(out).map_err(|err| ErrorKind::Io(err.to_string()))?;
                out.flush().map_err(|err| ErrorKind::Io(err.to_string()))?;

                Ok(Value::Null)
            })
        });

        Io { table }
    }
}

impl Module for Io {
    fn dispatch(&self, name: &str) -> Result<Rc<Builtin>, ErrorKind> {
        dispatch_from(&self.table, "io", name)
    }
}
