//! Library half of the `confstack` binary.
//!
//! Keeps argument handling, output transport and exit-code mapping testable
//! without spawning the process.

pub mod cli;
pub mod error;
pub mod logging;

use std::io::Write;

use camino::Utf8Path;
use confstack::emit::to_canonical_json;
use confstack::settings::Settings;
use tracing::info;

use crate::cli::Cli;
use crate::error::CliError;

/// Assemble the document described by the environment and `cli`, then
/// write it out.
///
/// The document is fully rendered before anything is written, so a failed
/// run produces no output.
///
/// # Errors
///
/// Returns [`CliError`] when assembly or writing fails.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = Settings::load_with_overrides(cli)?;
    let document = confstack::assemble(&settings, &settings.decrypter())?;
    let bytes = to_canonical_json(&document)?;
    write_output(cli.output.as_deref(), &bytes)
}

fn write_output(path: Option<&Utf8Path>, bytes: &[u8]) -> Result<(), CliError> {
    match path {
        Some(target) => {
            std::fs::write(target, bytes).map_err(|source| CliError::Output {
                path: target.to_path_buf(),
                source,
            })?;
            info!(path = %target, "wrote document");
            Ok(())
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(bytes)
                .and_then(|()| stdout.flush())
                .map_err(CliError::Stdout)
        }
    }
}
