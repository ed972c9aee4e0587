//! Memoization of raw file content and compiled templates.
//!
//! Two independent maps keyed by resolved absolute path. Entries are
//! populated lazily and live for the process lifetime; there is no eviction
//! and no invalidation on file modification. Whether a lookup consults the
//! cache is decided per call (`Options::cache`), but a fresh read or
//! compile always stores its result, so re-enabling caching later reuses
//! the newest entry.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::FxHashMap;
use tracing::trace;

use crate::error::{Error, Result};
use crate::render::Template;

#[derive(Default)]
pub struct Cache {
    files: FxHashMap<PathBuf, Rc<str>>,
    templates: FxHashMap<PathBuf, Rc<Template>>,
}

impl Cache {
    /// Returns the file's content, from cache when allowed.
    pub fn read_file(&mut self, path: &Path, use_cache: bool) -> Result<Rc<str>> {
        if use_cache {
            if let Some(content) = self.files.get(path) {
                trace!(file = %path.display(), "file cache hit");
                return Ok(content.clone());
            }
        }
        let content: Rc<str> = fs::read_to_string(path)
            .map_err(|source| Error::Io {
                path: path.to_path_buf(),
                source,
            })?
            .into();
        self.files.insert(path.to_path_buf(), content.clone());
        Ok(content)
    }

    pub fn template(&self, path: &Path) -> Option<Rc<Template>> {
        self.templates.get(path).cloned()
    }

    pub fn store_template(&mut self, path: PathBuf, template: Rc<Template>) {
        self.templates.insert(path, template);
    }
}
