use clap::{Parser, Subcommand};
use godel_cli::driver::{self, Mode};
use godel_cli::repl;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log filter such as `debug` or `godel_kernel::unify=trace`.
    /// Overrides GODEL_LOG for this run (defaults to `warn`).
    #[arg(long, global = true)]
    log: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Type-check every form of a file
    Check {
        file: PathBuf,
    },
    /// Type-check a file and evaluate its expressions
    Eval {
        file: PathBuf,
    },
    /// Start the interactive loop (the default)
    Repl,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = godel_cli::init_logging(cli.log.as_deref()) {
        eprintln!("{:#}", err);
        std::process::exit(2);
    }

    let result = match cli.command {
        Some(Commands::Check { file }) => driver::run_file(&file, Mode::Check),
        Some(Commands::Eval { file }) => driver::run_file(&file, Mode::Eval),
        Some(Commands::Repl) | None => repl::start().map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(1);
        }
    }
}
