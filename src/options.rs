//! Per-call configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Maps an include target and the including file's directory to the path to
/// read. Replaces the default resolution (join + `.html` default extension).
pub type Resolver = Rc<dyn Fn(&str, &Path) -> PathBuf>;

/// Configuration for one compile or render call.
#[derive(Clone)]
pub struct Options {
    /// Logical source path; names string renders in diagnostics and anchors
    /// their include resolution.
    pub filename: Option<PathBuf>,
    /// Consult the engine's caches. Off by default; cached entries are never
    /// invalidated once stored.
    pub cache: bool,
    /// Convert positioned render failures into source-context diagnostics
    /// returned as output.
    pub debug: bool,
    /// Instruction start tag.
    pub start: String,
    /// Instruction end tag.
    pub end: String,
    /// Custom include resolution.
    pub resolver: Option<Resolver>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            filename: None,
            cache: false,
            debug: false,
            start: "<%".to_string(),
            end: "%>".to_string(),
            resolver: None,
        }
    }
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replaces the `<% %>` tag pair.
    pub fn with_tags(mut self, start: impl Into<String>, end: impl Into<String>) -> Self {
        self.start = start.into();
        self.end = end.into();
        self
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = Some(resolver);
        self
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("filename", &self.filename)
            .field("cache", &self.cache)
            .field("debug", &self.debug)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("resolver", &self.resolver.is_some())
            .finish()
    }
}

/// Default include resolution: join the target onto the including file's
/// directory and add `.html` when the file name carries no extension dot.
pub(crate) fn default_resolve(target: &str, base_dir: &Path) -> PathBuf {
    let mut path = base_dir.join(target);
    if let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) {
        if !name.contains('.') {
            path.set_file_name(format!("{name}.html"));
        }
    }
    std::path::absolute(&path).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tags() {
        let options = Options::default();
        assert_eq!(options.start, "<%");
        assert_eq!(options.end, "%>");
        assert!(!options.cache);
        assert!(!options.debug);
    }

    #[test]
    fn resolve_adds_default_extension() {
        let resolved = default_resolve("nav", Path::new("/site/pages"));
        assert_eq!(resolved, Path::new("/site/pages/nav.html"));
    }

    #[test]
    fn resolve_keeps_existing_extension() {
        let resolved = default_resolve("nav.txt", Path::new("/site"));
        assert_eq!(resolved, Path::new("/site/nav.txt"));
    }

    #[test]
    fn resolve_is_relative_to_the_base_directory() {
        let resolved = default_resolve("partials/card", Path::new("/site/pages"));
        assert_eq!(resolved, Path::new("/site/pages/partials/card.html"));
    }
}
