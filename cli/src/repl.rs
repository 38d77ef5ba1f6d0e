use crate::driver::{Mode, Session};
use anyhow::Context as _;
use godel_kernel::parser::Parser;
use godel_kernel::Unifier;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fmt::Write as _;
use std::fs;

const HISTORY_FILE: &str = ".godel_history";

const HELP: &str = "\
Available commands:
  :quit, :exit         Exit the REPL
  :help                Show this help message
  :load <file>         Load definitions from a file
  :type <expr>         Show the type of an expression
  :eval <expr>         Evaluate an expression
  :env                 List declared constants
  :unify <type> <type> Show the most general unifier of two types
Any other input is read as (def ..), (axiom ..) or an expression to evaluate.";

/// What the loop should do after a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Print(String),
    Quit,
}

pub fn start() -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new().context("failed to initialise line editor")?;
    if rl.load_history(HISTORY_FILE).is_err() {
        // No history yet
    }

    let mut session = Session::new();
    println!("godel REPL v{}", env!("CARGO_PKG_VERSION"));
    println!("Type :help for commands, :quit or Ctrl-D to leave.");

    loop {
        match rl.readline("godel> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;
                match handle_line(&mut session, line) {
                    Action::Print(text) => {
                        if !text.is_empty() {
                            println!("{}", text);
                        }
                    }
                    Action::Quit => break,
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => return Err(err.into()),
        }
    }
    if let Err(err) = rl.save_history(HISTORY_FILE) {
        tracing::warn!(%err, "could not save history");
    }
    Ok(())
}

/// Interpret one line of input against `session`.
pub fn handle_line(session: &mut Session, line: &str) -> Action {
    let line = line.trim();
    if !line.starts_with(':') {
        return Action::Print(session.run_source(line, Mode::Eval).render());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    let output = match command {
        ":quit" | ":exit" => return Action::Quit,
        ":help" => HELP.to_string(),
        ":type" if rest.is_empty() => "Usage: :type <expr>".to_string(),
        ":type" => match session.type_of(rest) {
            Ok(ty) => format!("{} : {}", rest, ty),
            Err(err) => format!("error: {}", err),
        },
        ":eval" if rest.is_empty() => "Usage: :eval <expr>".to_string(),
        ":eval" => session.run_source(rest, Mode::Eval).render(),
        ":load" if rest.is_empty() => "Usage: :load <file>".to_string(),
        ":load" => match fs::read_to_string(rest) {
            Ok(source) => {
                let transcript = session.run_source(&source, Mode::Check);
                match &transcript.error {
                    None => format!("Loaded {} forms from {}", transcript.outcomes.len(), rest),
                    Some(_) => transcript.render(),
                }
            }
            Err(err) => format!("Error reading file {}: {}", rest, err),
        },
        ":env" => {
            let mut out = String::new();
            for (name, ty) in session.context().free_bindings() {
                let kind = if session.definition(name).is_some() { "def" } else { "axiom" };
                let _ = writeln!(out, "{} {} : {}", kind, name, ty);
            }
            out.trim_end().to_string()
        }
        ":unify" => unify_command(rest),
        _ => "Unknown command. Type :help for help.".to_string(),
    };
    Action::Print(output)
}

fn unify_command(input: &str) -> String {
    let mut parser = Parser::new(input);
    let pair = parser.parse_type().and_then(|left| {
        let right = parser.parse_type()?;
        parser.expect_end()?;
        Ok((left, right))
    });
    let (left, right) = match pair {
        Ok(pair) => pair,
        Err(err) => return format!("Usage: :unify <type> <type> ({})", err),
    };
    let mut unifier = Unifier::new(vec![(left, right)]);
    let start = unifier.measure();
    loop {
        match unifier.step() {
            Ok(Some(_)) => {}
            Ok(None) => {
                return format!(
                    "{} in {} steps from measure {}",
                    unifier.solution(),
                    unifier.steps(),
                    start
                )
            }
            Err(err) => return format!("error: {}", err),
        }
    }
}
