//! Command-line entry point.
//!
//! One positional argument: the path to a `.c` file. Exit code 0 when
//! the translation unit parses, 1 on any fatal diagnostic; warnings are
//! rendered to stderr but do not affect the exit code.

use clap::Parser;
use std::path::PathBuf;

use crate::diag::{render, Level};
use crate::stream::SourceFile;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "A C99 front end: parses and type-checks a translation unit")]
#[command(version)]
pub struct Cli {
    /// Path to a C source file
    pub input: PathBuf,
}

pub fn run_cli() -> i32 {
    let cli = Cli::parse();
    run(&cli.input)
}

fn run(input: &PathBuf) -> i32 {
    let file = match SourceFile::open(input) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("cinder: cannot read '{}': {}", input.display(), err);
            return 1;
        }
    };
    let outcome = crate::check_source(&file);
    for warning in &outcome.warnings {
        eprintln!("{}", render(warning, &file, Level::Warning));
    }
    match outcome.result {
        Ok(_) => 0,
        Err(diag) => {
            eprintln!("{}", render(&diag, &file, Level::Error));
            1
        }
    }
}
