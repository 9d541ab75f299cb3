//! In-memory staging copy of the source tree.
//!
//! Every regular file beneath the staged roots is copied into memory once.
//! Destructive rewrites such as decryption replace the staged bytes only, so
//! a run never modifies the caller's files. Merging later walks the staged
//! file lists rather than the real filesystem, which keeps the set of merged
//! paths identical to the set that existed at staging time.

use std::collections::BTreeMap;
use std::io::Cursor;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{ConfstackError, ConfstackResult};

#[derive(Debug)]
struct StagedFile {
    bytes: Vec<u8>,
    rewritten: bool,
}

#[derive(Debug)]
struct StagedRoot {
    root: Utf8PathBuf,
    files: Vec<Utf8PathBuf>,
}

/// Handle to the staged files of one run.
#[derive(Debug, Default)]
pub struct StagingFs {
    files: BTreeMap<Utf8PathBuf, StagedFile>,
    roots: Vec<StagedRoot>,
}

impl StagingFs {
    /// Copy every regular file under `roots` into a new staging store.
    ///
    /// Roots may be directories or single files. A root listed more than
    /// once is walked once. Directory entries are visited in file-name
    /// order and symlinks are followed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::StageIo`] if a root cannot be walked, a
    /// path is not valid UTF-8, or a file cannot be read.
    pub fn stage<I, P>(roots: I) -> ConfstackResult<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        let mut staging = Self::default();
        for root in roots {
            staging.stage_root(root.as_ref())?;
        }
        info!(
            roots = staging.roots.len(),
            files = staging.len(),
            "staged source tree"
        );
        Ok(staging)
    }

    fn stage_root(&mut self, root: &Utf8Path) -> ConfstackResult<()> {
        if self.roots.iter().any(|staged| staged.root.as_path() == root) {
            return Ok(());
        }
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .sort_by(|a, b| a.file_name().cmp(b.file_name()));
        for item in walker {
            let entry = item.map_err(|err| {
                let path = err
                    .path()
                    .and_then(Utf8Path::from_path)
                    .map_or_else(|| root.to_owned(), ToOwned::to_owned);
                ConfstackError::stage_io(path, err.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(|raw| {
                ConfstackError::stage_io(
                    root,
                    std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("non UTF-8 path {}", raw.display()),
                    ),
                )
            })?;
            let bytes = std::fs::read(&path).map_err(|err| ConfstackError::stage_io(&path, err))?;
            debug!(path = %path, size = bytes.len(), "staged file");
            self.files.insert(
                path.clone(),
                StagedFile {
                    bytes,
                    rewritten: false,
                },
            );
            files.push(path);
        }
        self.roots.push(StagedRoot {
            root: root.to_owned(),
            files,
        });
        Ok(())
    }

    /// Open a staged file for reading.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::UnknownPath`] if `path` was never staged.
    pub fn open(&self, path: &Utf8Path) -> ConfstackResult<Cursor<&[u8]>> {
        self.read(path).map(Cursor::new)
    }

    /// Borrow the staged bytes of `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::UnknownPath`] if `path` was never staged.
    pub fn read(&self, path: &Utf8Path) -> ConfstackResult<&[u8]> {
        self.files
            .get(path)
            .map(|file| file.bytes.as_slice())
            .ok_or_else(|| unknown(path))
    }

    /// Replace the staged bytes of an existing path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::UnknownPath`] if `path` was never staged;
    /// new paths cannot be created through this handle.
    pub fn overwrite(&mut self, path: &Utf8Path, bytes: Vec<u8>) -> ConfstackResult<()> {
        let file = self.files.get_mut(path).ok_or_else(|| unknown(path))?;
        file.bytes = bytes;
        file.rewritten = true;
        Ok(())
    }

    /// Whether `path` has been replaced since staging.
    #[must_use]
    pub fn is_rewritten(&self, path: &Utf8Path) -> bool {
        self.files.get(path).is_some_and(|file| file.rewritten)
    }

    /// Staged files under `root`, in walk order.
    ///
    /// # Errors
    ///
    /// Returns [`ConfstackError::UnknownPath`] if `root` was not staged.
    pub fn walk(&self, root: &Utf8Path) -> ConfstackResult<&[Utf8PathBuf]> {
        self.roots
            .iter()
            .find(|staged| staged.root.as_path() == root)
            .map(|staged| staged.files.as_slice())
            .ok_or_else(|| unknown(root))
    }

    /// Every distinct staged path in lexicographic order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.files.keys().map(Utf8PathBuf::as_path)
    }

    /// Number of distinct staged files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether nothing was staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

fn unknown(path: &Utf8Path) -> ConfstackError {
    ConfstackError::UnknownPath {
        path: path.to_owned(),
    }
}
