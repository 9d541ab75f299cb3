//! Layered configuration assembly.
//!
//! `confstack` turns a tree of partial YAML fragments, some of them EJSON
//! encrypted, into one merged document. A run is a strict pipeline:
//!
//! 1. [`catalog`] orders the sources: extra directories, the root directory,
//!    then resources named by the root's manifest.
//! 2. [`staging`] copies every regular file under those sources into memory.
//! 3. [`secrets`] decrypts secret files inside the staging store.
//! 4. [`merge`] folds the staged fragments into one document.
//! 5. [`emit`] renders the document as canonical JSON.
//!
//! The source tree on disk is only ever read.

pub mod catalog;
pub mod emit;
mod error;
pub mod merge;
pub mod secrets;
pub mod settings;
pub mod staging;

use camino::Utf8Path;
use serde_json::Value;
use tracing::{info, info_span, warn};

pub use error::{BoxedSource, ConfstackError, ConfstackResult};

use crate::catalog::CatalogBuilder;
use crate::secrets::{Decrypter, materialize};
use crate::settings::Settings;
use crate::staging::StagingFs;

/// Run the full pipeline described by `settings` and return the merged
/// document.
///
/// Nothing is produced unless every stage succeeds.
///
/// ```rust,no_run
/// use confstack::settings::Settings;
///
/// # fn main() -> confstack::ConfstackResult<()> {
/// let settings = Settings::load()?;
/// let document = confstack::assemble(&settings, &settings.decrypter())?;
/// let bytes = confstack::emit::to_canonical_json(&document)?;
/// # let _ = bytes;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns the first [`ConfstackError`] raised by any stage.
pub fn assemble(settings: &Settings, decrypter: &dyn Decrypter) -> ConfstackResult<Value> {
    let span = info_span!("assemble", root = %settings.root_directory);
    let _entered = span.enter();

    let catalog = CatalogBuilder::new(settings.root_directory.clone())
        .extra_directories(settings.extra_directories.iter().cloned())
        .manifest_policy(settings.manifest_policy())
        .build()?;
    let mut staging = StagingFs::stage(catalog.paths())?;
    if staging.is_empty() {
        warn!("no files were staged; the document will be empty");
    }
    info!(
        manifest = catalog.manifest().map_or("none", Utf8Path::as_str),
        sources = catalog.entries().len(),
        files = staging.len(),
        "sources staged"
    );
    materialize(
        &mut staging,
        &settings.secret_suffix,
        settings.secret_key(),
        decrypter,
    )?;
    merge::merge_sources(catalog.entries(), &staging, &settings.merge_options())
}
