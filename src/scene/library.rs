//! Template Library - discovery and lookup of instantiable templates
//!
//! Templates live as `*.ron` files in a directory; each file is keyed by its
//! file stem, so `Crate.ron` provides the `Crate` template.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::world::SceneWorld;
use super::ContentResolver;
use crate::descriptor::Visual;
use crate::storage::{LocalStorage, StorageError};

/// File extension for template files
pub const TEMPLATE_EXTENSION: &str = "ron";

/// A reusable content definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    /// Filled from the file stem when loaded from disk
    #[serde(default)]
    pub name: String,
    /// Default sprite of instances; `None` for sprite-less content
    #[serde(default)]
    pub visual: Option<Visual>,
}

impl Template {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visual: None,
        }
    }

    pub fn with_visual(mut self, visual: Visual) -> Self {
        self.visual = Some(visual);
        self
    }
}

/// A library of templates keyed by name
#[derive(Debug, Default)]
pub struct TemplateLibrary {
    templates: HashMap<String, Template>,
    /// Names in discovery/registration order
    names: Vec<String>,
}

impl TemplateLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any template with the same name
    pub fn register(&mut self, template: Template) {
        if !self.templates.contains_key(&template.name) {
            self.names.push(template.name.clone());
        }
        self.templates.insert(template.name.clone(), template);
    }

    /// Discover and load all templates from `dir`.
    ///
    /// Files that fail to parse are logged and skipped. Returns the number of
    /// templates loaded.
    pub fn discover(&mut self, dir: impl AsRef<Path>) -> Result<usize, StorageError> {
        let storage = LocalStorage::new();
        let mut entries: Vec<PathBuf> = storage
            .list(dir.as_ref())?
            .into_iter()
            .filter(|p| {
                p.extension()
                    .map(|ext| ext.eq_ignore_ascii_case(TEMPLATE_EXTENSION))
                    .unwrap_or(false)
            })
            .collect();

        // Sort by filename for consistent ordering
        entries.sort();

        let mut loaded = 0;
        for path in entries {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let stem = stem.to_string();
            let contents = match storage.read_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    log::warn!("Failed to read template {}: {}", path.display(), e);
                    continue;
                }
            };
            match ron::from_str::<Template>(&contents) {
                Ok(mut template) => {
                    template.name = stem;
                    self.register(template);
                    loaded += 1;
                }
                Err(e) => {
                    log::warn!("Failed to parse template {}: {}", path.display(), e);
                }
            }
        }

        log::debug!("Discovered {} templates in {}", loaded, dir.as_ref().display());
        Ok(loaded)
    }

    pub fn get(&self, name: &str) -> Option<&Template> {
        self.templates.get(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl ContentResolver<SceneWorld> for TemplateLibrary {
    fn resolve(&self, template_name: &str) -> Option<Template> {
        self.get(template_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_register_and_resolve() {
        let mut library = TemplateLibrary::new();
        library.register(Template::new("Crate"));
        library.register(Template::new("Saw"));
        library.register(Template::new("Crate"));

        assert_eq!(library.len(), 2);
        assert_eq!(library.names(), &["Crate".to_string(), "Saw".to_string()]);
        assert_eq!(
            ContentResolver::<SceneWorld>::resolve(&library, "Saw"),
            Some(Template::new("Saw"))
        );
        assert_eq!(ContentResolver::<SceneWorld>::resolve(&library, "Nope"), None);
    }

    #[test]
    fn test_discover_keys_by_file_stem() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Crate.ron"), "(visual: None)").unwrap();
        std::fs::write(
            dir.path().join("Saw.ron"),
            r#"(visual: Some((layer: "Hazards", order: 2, color: (r: 1.0, g: 0.0, b: 0.0, a: 1.0))))"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("Broken.ron"), "(visual: ").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut library = TemplateLibrary::new();
        let loaded = library.discover(dir.path()).unwrap();

        assert_eq!(loaded, 2);
        assert_eq!(library.names(), &["Crate".to_string(), "Saw".to_string()]);
        assert!(library.get("Crate").unwrap().visual.is_none());
        assert_eq!(library.get("Saw").unwrap().visual.as_ref().unwrap().layer, "Hazards");
    }

    #[test]
    fn test_discover_missing_dir_is_error() {
        let dir = TempDir::new().unwrap();
        let mut library = TemplateLibrary::new();
        assert!(library.discover(dir.path().join("missing")).is_err());
    }
}
