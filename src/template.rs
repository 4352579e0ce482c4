//! Template renderer – resolves a Jinja-syntax template against the data map.
//!
//! The data map's top-level entries become template variables, so a template
//! can write `{{ personal.name }}` or loop over `{{ work }}`. Templates may
//! `{% include %}` partials from the same directory. Unresolved variables –
//! including attribute chains through absent keys – render as empty content
//! rather than failing; downstream templates rely on that.

use std::path::{Path, PathBuf};

use minijinja::{path_loader, AutoEscape, Environment, ErrorKind, UndefinedBehavior};

use crate::data::Document;
use crate::error::{CvError, Result};

/// Renders templates from a single directory.
pub struct TemplateRenderer {
    env: Environment<'static>,
    dir: PathBuf,
}

impl TemplateRenderer {
    /// Create a renderer rooted at `dir`. Includes resolve inside `dir` only.
    pub fn from_dir(dir: &Path) -> Self {
        let mut env = Environment::new();
        env.set_loader(path_loader(dir));
        // Chainable undefined: `{{ absent.key }}` renders as "" instead of
        // erroring, matching the permissive policy of the data format.
        env.set_undefined_behavior(UndefinedBehavior::Chainable);
        // Data values land in the markup verbatim; the converter decodes
        // entities itself.
        env.set_auto_escape_callback(|_| AutoEscape::None);
        Self {
            env,
            dir: dir.to_path_buf(),
        }
    }

    /// Render the named template with the data map bound at the top level.
    pub fn render(&self, name: &str, data: &Document) -> Result<String> {
        let template = self.env.get_template(name).map_err(|e| {
            if matches!(e.kind(), ErrorKind::TemplateNotFound) {
                CvError::TemplateNotFound(self.dir.join(name))
            } else {
                CvError::Template(e)
            }
        })?;
        template.render(data).map_err(CvError::Template)
    }
}
