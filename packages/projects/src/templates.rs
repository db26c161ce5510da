//! Reusable extraction templates.
//!
//! Built-in templates are loaded from TOML files baked into the binary at
//! compile time via [`include_str!`]. Custom templates are JSON files in a
//! templates directory and can never shadow a built-in id.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use smart_scraper_extract_models::{DEFAULT_SETTLE_SECONDS, ExtractionRule, RuleSet};

use crate::{ProjectError, store_key};

/// TOML configs embedded at compile time.
const TEMPLATE_TOMLS: &[(&str, &str)] = &[
    ("ecommerce_products", include_str!("../templates/ecommerce_products.toml")),
    ("news_articles", include_str!("../templates/news_articles.toml")),
    ("data_tables", include_str!("../templates/data_tables.toml")),
    ("element_lists", include_str!("../templates/element_lists.toml")),
];

/// A named rule set with its acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Identifier; the file stem for custom templates.
    #[serde(skip)]
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the template is for.
    #[serde(default)]
    pub description: String,
    /// Rules in application order.
    pub rules: RuleSet,
    /// Whether pages should be rendered in a browser.
    #[serde(default)]
    pub use_dynamic: bool,
    /// Wait after navigation when rendering.
    #[serde(default = "default_settle_seconds")]
    pub settle_seconds: u64,
}

const fn default_settle_seconds() -> u64 {
    DEFAULT_SETTLE_SECONDS
}

/// TOML layout of a built-in template. Rules are an array of tables so
/// their order survives parsing.
#[derive(Deserialize)]
struct TemplateDefinition {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    rules: Vec<ExtractionRule>,
    #[serde(default)]
    use_dynamic: bool,
    #[serde(default = "default_settle_seconds")]
    settle_seconds: u64,
}

fn parse_template_toml(toml_str: &str) -> Result<Template, String> {
    let def: TemplateDefinition = toml::de::from_str(toml_str).map_err(|e| e.to_string())?;
    Ok(Template {
        id: def.id,
        name: def.name,
        description: def.description,
        rules: def.rules.into_iter().collect(),
        use_dynamic: def.use_dynamic,
        settle_seconds: def.settle_seconds,
    })
}

/// Returns every built-in template, parsed from embedded TOML.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn builtin_templates() -> Vec<Template> {
    TEMPLATE_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_template_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Whether `id` names a built-in template.
#[must_use]
pub fn is_builtin(id: &str) -> bool {
    TEMPLATE_TOMLS.iter().any(|(name, _)| *name == id)
}

/// Built-in templates plus custom ones stored in a directory.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    /// A store keeping custom templates in `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// A store under `<data_dir>/templates`.
    #[must_use]
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("templates"))
    }

    /// Custom templates, sorted by id. Unreadable files are skipped.
    #[must_use]
    pub fn custom(&self) -> Vec<Template> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut templates: Vec<Template> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| match read_template(&path) {
                Ok(template) => Some(template),
                Err(e) => {
                    log::warn!("Skipping template {}: {e}", path.display());
                    None
                }
            })
            .collect();
        templates.sort_by(|a, b| a.id.cmp(&b.id));
        templates
    }

    /// Built-in templates followed by custom ones whose id is not taken.
    #[must_use]
    pub fn all(&self) -> Vec<Template> {
        let mut templates = builtin_templates();
        templates.extend(self.custom().into_iter().filter(|t| !is_builtin(&t.id)));
        templates
    }

    /// Looks up a template by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Template> {
        self.all().into_iter().find(|t| t.id == id)
    }

    /// Writes `template` as `<id>.json`, replacing any custom template with
    /// the same id. Returns the id actually used.
    ///
    /// # Errors
    ///
    /// * [`ProjectError::Invalid`] if the id is blank, `.` or `..`, or the template has no
    ///   rules
    /// * [`ProjectError::BuiltIn`] if the id belongs to a built-in template
    /// * [`ProjectError::Io`] / [`ProjectError::Json`] on write failure
    pub fn save(&self, id: &str, template: &Template) -> Result<String, ProjectError> {
        let Some(id) = store_key(id) else {
            return Err(ProjectError::Invalid {
                message: format!("invalid template id '{}'", id.trim()),
            });
        };
        if is_builtin(&id) {
            return Err(ProjectError::BuiltIn { id });
        }
        if template.rules.is_empty() {
            return Err(ProjectError::Invalid {
                message: "template has no rules".to_string(),
            });
        }

        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(template)?;
        fs::write(self.dir.join(format!("{id}.json")), json)?;
        log::info!("Saved template {id}");
        Ok(id)
    }

    /// Removes a custom template.
    ///
    /// # Errors
    ///
    /// * [`ProjectError::BuiltIn`] for a built-in id
    /// * [`ProjectError::NotFound`] if no such custom template exists
    pub fn delete(&self, id: &str) -> Result<(), ProjectError> {
        if is_builtin(id) {
            return Err(ProjectError::BuiltIn { id: id.to_string() });
        }
        let Some(path) = self.path(id).filter(|path| path.is_file()) else {
            return Err(ProjectError::NotFound {
                kind: "Template",
                id: id.to_string(),
            });
        };
        fs::remove_file(path)?;
        log::info!("Deleted template {id}");
        Ok(())
    }

    fn path(&self, id: &str) -> Option<PathBuf> {
        store_key(id).map(|key| self.dir.join(format!("{key}.json")))
    }
}

fn read_template(path: &Path) -> Result<Template, ProjectError> {
    let mut template: Template = serde_json::from_str(&fs::read_to_string(path)?)?;
    template.id = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(template)
}
