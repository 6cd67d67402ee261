//! gopiler-drv — the command-line front end (spec.md §6 "Command-line
//! driver").
//!
//! A thin collaborator over the four pipeline crates: it owns no compiler
//! state of its own, it just reads a source file, runs [`compile_source`]
//! over it, and prints the per-program results. `gopiler-web` runs the
//! same pipeline independently over HTTP-posted source text (spec.md §1:
//! "only their interface to the core is specified").

pub use gopiler_pipeline::{compile_source, ProgramResult};

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser as ClapParser;
use gopiler_util::{Diagnostics, UtilError};

/// `-f <path>` / `-v`, matching `original_source/cmd/cli/main.go`'s flag
/// set exactly (spec.md §6).
#[derive(Debug, ClapParser)]
#[command(name = "gopiler", about = "Multi-pass compiler for the GOPILER teaching language")]
pub struct Cli {
    /// Path to the source file to compile.
    #[arg(short = 'f', long = "file")]
    pub file: PathBuf,

    /// Toggle verbose (debug-level) diagnostics.
    #[arg(short = 'v', long = "verbose", default_value_t = false)]
    pub verbose: bool,
}

/// Runs the CLI end to end: reads `cli.file`, compiles every program in
/// it, and prints each pass's terminal diagnostics as it runs.
///
/// Per spec.md §6, the process exit code is nonzero only on I/O failure
/// reading the source file itself — a per-program compile failure is
/// recorded in its own "FAIL | ..." diagnostic line and does not stop the
/// driver from moving on to the next program.
pub fn run(cli: &Cli) -> Result<Vec<ProgramResult>> {
    let source = std::fs::read_to_string(&cli.file).map_err(|source| UtilError::ReadSource {
        path: cli.file.display().to_string(),
        source,
    })?;

    let diag = Diagnostics::terminal(cli.verbose);
    diag.info(
        "GOPILER",
        &format!(
            "Starting compilation of: {} with verbose mode: {}",
            cli.file.display(),
            cli.verbose
        ),
    );

    let results = if source.is_empty() {
        diag.warn("GOPILER", "Source file empty. No compilation will be executed.");
        Vec::new()
    } else {
        compile_source(&source, &diag)
    };

    diag.info("GOPILER", "All compilations complete.");
    Ok(results)
}
