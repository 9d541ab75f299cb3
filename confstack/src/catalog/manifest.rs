//! Resource manifest discovery and parsing.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::{ambient_authority, fs_utf8::Dir};
use serde::Deserialize;
use tracing::warn;

use crate::{ConfstackError, ConfstackResult};

/// File names recognised as a manifest, in lookup order.
pub const MANIFEST_FILE_NAMES: [&str; 3] =
    ["kustomization.yaml", "kustomization.yml", "Kustomization"];

/// The subset of a kustomization file the catalog needs.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct Manifest {
    /// Fragment files or directories belonging to this build.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Legacy spelling of `resources`; appended after them.
    #[serde(default)]
    pub bases: Vec<String>,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::Manifest`] if the file cannot be read or
    /// does not parse.
    pub fn load(path: &Utf8Path) -> ConfstackResult<Self> {
        let (dir, name) =
            open_parent_dir_and_name(path).map_err(|err| ConfstackError::manifest(path, err))?;
        let contents = dir
            .read_to_string(&name)
            .map_err(|err| ConfstackError::manifest(path, err))?;
        Self::from_yaml(path, &contents)
    }

    /// Parse manifest `contents`; `path` is used for error context only.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::Manifest`] when the YAML is malformed.
    pub fn from_yaml(path: &Utf8Path, contents: &str) -> ConfstackResult<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_saphyr::from_str(contents).map_err(|err| ConfstackError::manifest(path, err.to_string()))
    }

    /// Declared references in inclusion order.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.resources
            .iter()
            .chain(self.bases.iter())
            .map(String::as_str)
    }

    /// Local references resolved against `manifest_dir`.
    ///
    /// Remote references cannot be staged from disk and are skipped with a
    /// warning.
    #[must_use]
    pub fn resource_paths(&self, manifest_dir: &Utf8Path) -> Vec<Utf8PathBuf> {
        self.references()
            .filter(|reference| {
                let remote = is_remote(reference);
                if remote {
                    warn!(resource = %reference, "skipping remote manifest resource");
                }
                !remote
            })
            .map(|reference| manifest_dir.join(reference))
            .collect()
    }
}

/// Return the first recognised manifest file inside `directory`.
///
/// # Errors
///
/// Returns [`ConfstackError::Manifest`] if `directory` cannot be opened.
pub fn find_manifest(directory: &Utf8Path) -> ConfstackResult<Option<Utf8PathBuf>> {
    let dir = Dir::open_ambient_dir(directory, ambient_authority())
        .map_err(|err| ConfstackError::manifest(directory, err))?;
    Ok(MANIFEST_FILE_NAMES
        .iter()
        .find(|name| dir.is_file(name))
        .map(|name| directory.join(name)))
}

fn is_remote(reference: &str) -> bool {
    reference.contains("://") || reference.starts_with("github.com/") || reference.starts_with("git@")
}

/// Return the parent directory of `path`, falling back to `"."` when the path
/// has no parent or the parent is empty.
fn parent_or_dot(path: &Utf8Path) -> &Utf8Path {
    path.parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."))
}

fn open_parent_dir_and_name(path: &Utf8Path) -> std::io::Result<(Dir, String)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| std::io::Error::other("cannot determine file name for manifest path"))?;
    let dir = Dir::open_ambient_dir(parent_or_dot(path), ambient_authority())?;
    Ok((dir, file_name.to_owned()))
}
