//! `confstack` entry-point: parse arguments, assemble, print the document.

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Report;

use confstack_cli::cli::Cli;
use confstack_cli::error::EXIT_FAILURE;
use confstack_cli::{logging, run};

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = color_eyre::install() {
        return report(&err, EXIT_FAILURE);
    }
    if let Err(err) = logging::init(cli.verbose) {
        let code = err.exit_code();
        return report(&Report::from(err), code);
    }
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            report(&Report::from(err), code)
        }
    }
}

fn report(err: &Report, code: u8) -> ExitCode {
    // Nothing else can be done if standard error is gone.
    let _ignored = writeln!(std::io::stderr(), "Error: {err:?}");
    ExitCode::from(code)
}
