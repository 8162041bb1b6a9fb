mod repl;

pub use repl::repl;
