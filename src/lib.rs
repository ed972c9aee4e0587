//! Tag-based template compiler.
//!
//! Templates are plain text with instructions between `<%` and `%>` tags.
//! The leading sigil of an instruction selects what it does:
//!
//! ```text
//! <%= expr %>                escaped interpolation
//! <%=: expr | name args %>   escaped, through a filter pipeline
//! <%- expr %>                raw interpolation
//! <%-: expr | name args %>   raw, through a filter pipeline
//! <%# comment %>             no output
//! <% include card (user) %>  render another template here
//! <% if expr %> ... <% end %>        conditionals
//! <% for x in expr %> ... <% end %>  loops
//! <% let name = expr %>              local bindings
//! ```
//!
//! `<%%` renders a literal `<%` without opening an instruction.
//!
//! # Usage
//!
//! ```
//! use etch::{Engine, Options};
//! use serde_json::json;
//!
//! let engine = Engine::new();
//! let out = engine
//!     .render(
//!         "<ul><% for u in users %><li><%= u.name %></li><% end %></ul>",
//!         &Options::default(),
//!         &json!({"users": [{"name": "ann"}, {"name": "<bob>"}]}),
//!     )
//!     .unwrap();
//! assert_eq!(out, "<ul><li>ann</li><li>&lt;bob&gt;</li></ul>");
//! ```
//!
//! Scope members are addressed by bare identifiers; an included template
//! additionally sees its arguments as `self`. Compiled templates and file
//! reads are memoized per [`Engine`] when [`Options::cache`] is set, and
//! never invalidated afterwards.
//!
//! With [`Options::debug`], a render failure whose source position is known
//! is returned as a diagnostic report (the failing line with two lines of
//! context) instead of an error.

mod cache;
mod compiler;
mod debug;
mod error;
mod escape;
mod filters;
mod options;
mod render;
mod value;

pub use error::{Error, Result};
pub use options::{Options, Resolver};
pub use render::Template;

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use cache::Cache;

/// The compiler instance: owns the file and template caches.
///
/// Deliberately `!Send`: compilation and rendering are single-threaded and
/// synchronous, and templates share state through `Rc`. Independent engines
/// are fully isolated.
#[derive(Default)]
pub struct Engine {
    cache: RefCell<Cache>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles the template file at `path`. With `options.cache`, a
    /// previously compiled template for the same resolved path is reused
    /// for the life of the engine, regardless of later file changes.
    pub fn compile(&self, path: impl AsRef<Path>, options: &Options) -> Result<Rc<Template>> {
        let path = std::path::absolute(path.as_ref())
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        self.compile_at(&path, options)
    }

    /// One-shot render of template text. Includes resolve relative to
    /// `options.filename` when set.
    pub fn render(&self, content: &str, options: &Options, scope: &Value) -> Result<String> {
        let file = options.filename.clone().map(Rc::new);
        let template = compiler::compile(self, content, file, options)?;
        template.render(scope)
    }

    /// Compiles the file at `path` and renders it against `scope`.
    pub fn render_file(
        &self,
        path: impl AsRef<Path>,
        options: &Options,
        scope: &Value,
    ) -> Result<String> {
        self.compile(path, options)?.render(scope)
    }

    /// Compilation entry shared by the public surface and include
    /// resolution, so nested templates follow the same cache policy.
    pub(crate) fn compile_at(&self, path: &Path, options: &Options) -> Result<Rc<Template>> {
        if options.cache {
            if let Some(template) = self.cache.borrow().template(path) {
                debug!(file = %path.display(), "template cache hit");
                return Ok(template);
            }
        }

        let source = self.cache.borrow_mut().read_file(path, options.cache)?;
        debug!(file = %path.display(), "compiling template");
        let template = Rc::new(compiler::compile(
            self,
            &source,
            Some(Rc::new(path.to_path_buf())),
            options,
        )?);
        self.cache
            .borrow_mut()
            .store_template(path.to_path_buf(), template.clone());
        Ok(template)
    }
}
