//! File access for `@import` resolution (spec §4.2, §6.3).
//!
//! The compiler crate never touches `std::fs` -- it only knows about
//! `peglang_compiler::resolve::Fetch`, a narrower callback interface.
//! [`ImportLoader`] is the richer, `Result`-returning trait this crate
//! exposes to embedders (the CLI, an LSP server); [`Adapter`] bridges the
//! two so `resolve::resolve` can drive whichever `ImportLoader` the
//! database was built with.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    #[error("could not read `{0}`: {1}")]
    Io(PathBuf, String),
    #[error("`{0}` is outside the project root")]
    OutsideRoot(PathBuf),
}

/// Resolves `@import` targets to paths and reads their contents. A
/// `FileId` isn't available yet at this layer (it hasn't been interned),
/// so loaders work in plain paths (spec §6.3).
pub trait ImportLoader: Send + Sync {
    fn resolve(&self, import_path: &str, parent: &Path) -> Result<PathBuf, LoaderError>;
    fn fetch(&self, path: &Path) -> Result<Arc<str>, LoaderError>;
}

/// Reads import targets straight off the filesystem, relative to whatever
/// directory holds the importing file.
#[derive(Debug, Default)]
pub struct FsLoader;

impl ImportLoader for FsLoader {
    fn resolve(&self, import_path: &str, parent: &Path) -> Result<PathBuf, LoaderError> {
        Ok(parent.join(import_path))
    }

    fn fetch(&self, path: &Path) -> Result<Arc<str>, LoaderError> {
        std::fs::read_to_string(path)
            .map(Arc::from)
            .map_err(|e| LoaderError::Io(path.to_path_buf(), e.to_string()))
    }
}

/// Layers an in-memory overlay (unsaved editor buffers) over an inner
/// loader, so an LSP server can resolve imports against what's on screen
/// rather than what's last saved to disk (spec §6.3, §5).
pub struct OverlayLoader<L: ImportLoader> {
    inner: L,
    overlay: RwLock<HashMap<PathBuf, Arc<str>>>,
}

impl<L: ImportLoader> OverlayLoader<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            overlay: RwLock::new(HashMap::new()),
        }
    }

    pub fn set(&self, path: PathBuf, text: Arc<str>) {
        self.overlay.write().insert(path, text);
    }

    pub fn clear(&self, path: &Path) {
        self.overlay.write().remove(path);
    }
}

impl<L: ImportLoader> ImportLoader for OverlayLoader<L> {
    fn resolve(&self, import_path: &str, parent: &Path) -> Result<PathBuf, LoaderError> {
        self.inner.resolve(import_path, parent)
    }

    fn fetch(&self, path: &Path) -> Result<Arc<str>, LoaderError> {
        if let Some(text) = self.overlay.read().get(path) {
            return Ok(text.clone());
        }
        self.inner.fetch(path)
    }
}

/// Bridges an [`ImportLoader`] to `peglang_compiler::resolve::Fetch`,
/// short-circuiting the entry file to the text salsa already tracked so
/// editing it invalidates `resolved_imports` downstream.
pub(crate) struct Adapter<'a> {
    pub loader: &'a dyn ImportLoader,
    pub entry_path: PathBuf,
    pub entry_text: Arc<str>,
}

impl<'a> peglang_compiler::resolve::Fetch for Adapter<'a> {
    fn resolve_path(&mut self, import_path: &str, parent: &Path) -> PathBuf {
        self.loader
            .resolve(import_path, parent)
            .unwrap_or_else(|_| parent.join(import_path))
    }

    fn read(&mut self, path: &Path) -> Option<Arc<str>> {
        if path == self.entry_path {
            return Some(self.entry_text.clone());
        }
        match self.loader.fetch(path) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::debug!(%err, path = %path.display(), "import fetch failed");
                None
            }
        }
    }
}
