//! Discovery and ordering of configuration sources.
//!
//! A run merges, in this fixed order: the extra directories (left to right),
//! the root directory, then every local resource declared by the manifest
//! found in the root directory. Entries are never deduplicated; a path that
//! is reachable twice is merged twice.

mod manifest;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

use crate::{ConfstackError, ConfstackResult};

pub use manifest::{MANIFEST_FILE_NAMES, Manifest, find_manifest};

/// Where a source entry was declared.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SourceOrigin {
    /// An explicitly configured extra directory.
    ExtraDirectory,
    /// The root directory.
    Root,
    /// A path listed in the manifest.
    Resource,
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ExtraDirectory => "extra-directory",
            Self::Root => "root",
            Self::Resource => "resource",
        })
    }
}

/// One path to stage and merge, tagged with its origin.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceEntry {
    path: Utf8PathBuf,
    origin: SourceOrigin,
}

impl SourceEntry {
    /// Construct an entry.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>, origin: SourceOrigin) -> Self {
        Self {
            path: path.into(),
            origin,
        }
    }

    /// Path of the file or directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Where the entry was declared.
    #[must_use]
    pub const fn origin(&self) -> SourceOrigin {
        self.origin
    }
}

/// Concatenate extra directories, the root directory and manifest resources
/// into an ordered list of entries.
///
/// `manifest_resources` must already be resolved against the manifest's
/// directory (see [`Manifest::resource_paths`]).
///
/// # Errors
///
/// Returns [`ConfstackError::SourceNotFound`] for the first entry whose path
/// does not exist.
pub fn build_catalog(
    root: &Utf8Path,
    extra_directories: &[Utf8PathBuf],
    manifest_resources: &[Utf8PathBuf],
) -> ConfstackResult<Vec<SourceEntry>> {
    let extras = extra_directories
        .iter()
        .map(|dir| SourceEntry::new(dir.clone(), SourceOrigin::ExtraDirectory));
    let resources = manifest_resources
        .iter()
        .map(|path| SourceEntry::new(path.clone(), SourceOrigin::Resource));
    let entries: Vec<SourceEntry> = extras
        .chain(std::iter::once(SourceEntry::new(root, SourceOrigin::Root)))
        .chain(resources)
        .collect();

    if let Some(missing) = entries.iter().find(|entry| !entry.path.exists()) {
        return Err(ConfstackError::SourceNotFound {
            path: missing.path.clone(),
            origin: missing.origin,
        });
    }
    Ok(entries)
}

/// Whether a missing manifest aborts the run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ManifestPolicy {
    /// Fail with [`ConfstackError::ManifestMissing`].
    #[default]
    Required,
    /// Continue without manifest resources.
    Optional,
}

/// Ordered sources for one run, plus the manifest they were read from.
#[derive(Clone, Debug)]
pub struct SourceCatalog {
    entries: Vec<SourceEntry>,
    manifest: Option<Utf8PathBuf>,
}

impl SourceCatalog {
    /// Entries in merge order.
    #[must_use]
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    /// Manifest file that contributed resource entries, if any.
    #[must_use]
    pub fn manifest(&self) -> Option<&Utf8Path> {
        self.manifest.as_deref()
    }

    /// Paths of every entry, in merge order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.entries.iter().map(SourceEntry::path)
    }
}

/// Builder for [`SourceCatalog`].
///
/// # Examples
///
/// ```rust,no_run
/// use confstack::catalog::{CatalogBuilder, ManifestPolicy};
///
/// # fn run() -> confstack::ConfstackResult<()> {
/// let catalog = CatalogBuilder::new("deploy")
///     .extra_directory("shared")
///     .manifest_policy(ManifestPolicy::Optional)
///     .build()?;
/// for path in catalog.paths() {
///     println!("{path}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct CatalogBuilder {
    root: Utf8PathBuf,
    extra_directories: Vec<Utf8PathBuf>,
    manifest_policy: ManifestPolicy,
}

impl CatalogBuilder {
    /// Start a catalog rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            extra_directories: Vec::new(),
            manifest_policy: ManifestPolicy::default(),
        }
    }

    /// Append one extra directory.
    #[must_use]
    pub fn extra_directory(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.extra_directories.push(dir.into());
        self
    }

    /// Append several extra directories, preserving their order.
    #[must_use]
    pub fn extra_directories<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        self.extra_directories.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Choose how a missing manifest is handled.
    #[must_use]
    pub const fn manifest_policy(mut self, policy: ManifestPolicy) -> Self {
        self.manifest_policy = policy;
        self
    }

    /// Resolve the manifest and produce the ordered catalog.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::SourceNotFound`] when the root or any extra
    /// directory or resource is missing, [`ConfstackError::ManifestMissing`]
    /// when no manifest exists and the policy requires one, and
    /// [`ConfstackError::Manifest`] when the manifest cannot be parsed.
    pub fn build(self) -> ConfstackResult<SourceCatalog> {
        if !self.root.is_dir() {
            return Err(ConfstackError::SourceNotFound {
                path: self.root,
                origin: SourceOrigin::Root,
            });
        }

        let (manifest_path, resources) = match find_manifest(&self.root)? {
            Some(path) => {
                let manifest = Manifest::load(&path)?;
                let resources = manifest.resource_paths(&self.root);
                debug!(manifest = %path, count = resources.len(), "loaded manifest resources");
                (Some(path), resources)
            }
            None if self.manifest_policy == ManifestPolicy::Optional => {
                info!(root = %self.root, "no manifest found; continuing without resources");
                (None, Vec::new())
            }
            None => {
                return Err(ConfstackError::ManifestMissing {
                    directory: self.root,
                    candidates: MANIFEST_FILE_NAMES.join(", "),
                });
            }
        };

        let entries = build_catalog(&self.root, &self.extra_directories, &resources)?;
        info!(sources = entries.len(), "built source catalog");
        Ok(SourceCatalog {
            entries,
            manifest: manifest_path,
        })
    }
}
