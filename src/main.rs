use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use log::{debug, trace};

use rill_interpreter::Evaluator;
use rill_parser::lexer::Lexer;
use rill_parser::parser;

/// rill is a small dynamically-typed scripting language with closures,
/// arrays, maps, and a module standard library.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script file to run; starts the REPL when absent.
    file: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    let args = Args::parse();

    match args.file {
        Some(path) => process::exit(run_file(&path)),
        None => rill_repl::repl(),
    }
}

fn run_file(path: &Path) -> i32 {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("{}: {}", path.display(), err);
            return 1;
        }
    };

    let name = path.to_string_lossy();

    trace!("lexing and parsing {}", name);
    let lexer = Lexer::new(&name, &source);
    let mut parser = parser::Parser::new(lexer);
    let (program, errors) = parser.parse_program();
    debug!(
        "parsed {} statement(s), {} error(s)",
        program.statements.len(),
        errors.len()
    );

    if !errors.is_empty() {
        for error in &errors {
            eprintln!("{}", error);
        }
        return 1;
    }

    trace!("evaluating {}", name);
    let mut evaluator = Evaluator::new();
    let outcome = evaluator.evaluate(&program);

    for error in &outcome.errors {
        eprintln!("{}", error);
    }

    // an explicit top-level return wins; otherwise errors decide
    match outcome.exit_code {
        Some(code) => code,
        None if outcome.errors.is_empty() => 0,
        None => 1,
    }
}
