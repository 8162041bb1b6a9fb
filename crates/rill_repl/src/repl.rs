use std::process;

use rustyline::error::ReadlineError;
use rustyline::Editor;

use rill_interpreter::Evaluator;
use rill_parser::{lexer::Lexer, parser::Parser};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const PROMPT: &str = "|> ";

/// The interactive loop. Each non-empty line is a complete program,
/// evaluated against one persistent environment so bindings survive
/// between lines. Errors go to stderr and the prompt comes back.
pub fn repl() {
    println!("rill v{} tree-walk interpreter", VERSION);

    let mut evaluator = Evaluator::new();

    // `()` can be used when no completer is required
    let mut rl = Editor::<()>::new();
    loop {
        let readline = rl.readline(PROMPT);
        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                rl.add_history_entry(line);

                let lexer = Lexer::new("repl", line);
                let mut parser = Parser::new(lexer);
                let (program, errors) = parser.parse_program();

                if !errors.is_empty() {
                    let messages: Vec<String> =
                        errors.iter().map(|error| error.to_string()).collect();
                    eprintln!("{}", messages.join("\n"));
                    continue;
                }

                let outcome = evaluator.evaluate(&program);
                if !outcome.errors.is_empty() {
                    let messages: Vec<String> =
                        outcome.errors.iter().map(|error| error.to_string()).collect();
                    eprintln!("{}", messages.join("\n"));
                }

                // a top-level return leaves the REPL with its exit code
                if let Some(code) = outcome.exit_code {
                    process::exit(code);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("error: {:?}", err);
                break;
            }
        }
    }
}
