//! Saved scraping projects.
//!
//! A project is a directory named `<sanitized name>_<YYYYmmdd_HHMMSS>`
//! holding a `config.json` and, once results have been saved, a
//! `results.csv` / `results.json` pair.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use smart_scraper_extract_models::{ResultTable, RuleSet, clamp_settle_seconds};

use crate::export::{write_csv, write_json};
use crate::{ProjectError, sanitize_name, store_key};

const CONFIG_FILE: &str = "config.json";
const RESULTS_CSV: &str = "results.csv";
const RESULTS_JSON: &str = "results.json";

/// Contents of a project's `config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Display name.
    pub name: String,
    /// Page the rules run against.
    pub url: String,
    /// Rules in application order.
    pub rule_set: RuleSet,
    /// Whether the page is rendered in a browser.
    #[serde(default)]
    pub use_dynamic: bool,
    /// Wait after navigation when rendering.
    pub settle_seconds: u64,
    /// When the project was first saved.
    pub created_at: NaiveDateTime,
    /// When the project was last saved or updated.
    pub last_updated: NaiveDateTime,
}

/// Input for a new project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectDraft {
    /// Display name; also the directory prefix.
    pub name: String,
    /// Page the rules run against.
    pub url: String,
    /// Rules in application order.
    pub rule_set: RuleSet,
    /// Whether the page is rendered in a browser.
    pub use_dynamic: bool,
    /// Wait after navigation when rendering.
    pub settle_seconds: u64,
}

/// Fields to change on an existing project. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    /// New display name.
    pub name: Option<String>,
    /// New page URL.
    pub url: Option<String>,
    /// Replacement rules.
    pub rule_set: Option<RuleSet>,
    /// New acquisition mode.
    pub use_dynamic: Option<bool>,
    /// New settle time.
    pub settle_seconds: Option<u64>,
}

/// A loaded project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Directory name.
    pub id: String,
    /// Parsed `config.json`.
    pub config: ProjectConfig,
    /// Last saved results, if any.
    pub results: Option<ResultTable>,
}

/// One line of a project listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSummary {
    /// Directory name.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Page URL.
    pub url: String,
    /// When the project was first saved.
    pub created_at: NaiveDateTime,
    /// When the project was last changed.
    pub last_updated: NaiveDateTime,
    /// Whether results have been saved.
    pub has_results: bool,
}

/// Project directories under one root.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    /// A store keeping projects in `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A store under `<data_dir>/projects`.
    #[must_use]
    pub fn in_data_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("projects"))
    }

    /// Saves a new project and returns its id.
    ///
    /// Results are only written when `results` is non-empty.
    ///
    /// # Errors
    ///
    /// * [`ProjectError::Invalid`] if the name or URL is blank, or a project
    ///   with the same id already exists
    /// * [`ProjectError::Io`] / [`ProjectError::Json`] /
    ///   [`ProjectError::Csv`] on write failure
    pub fn save(&self, draft: &ProjectDraft, results: Option<&ResultTable>) -> Result<String, ProjectError> {
        self.save_at(draft, results, Local::now().naive_local())
    }

    pub(crate) fn save_at(
        &self,
        draft: &ProjectDraft,
        results: Option<&ResultTable>,
        now: NaiveDateTime,
    ) -> Result<String, ProjectError> {
        let name = draft.name.trim();
        let url = draft.url.trim();
        if name.is_empty() || url.is_empty() {
            return Err(ProjectError::Invalid {
                message: "project name and URL are required".to_string(),
            });
        }

        let id = format!("{}_{}", sanitize_name(name), now.format("%Y%m%d_%H%M%S"));
        let dir = self.root.join(&id);
        if dir.exists() {
            return Err(ProjectError::Invalid {
                message: format!("project {id} already exists"),
            });
        }
        fs::create_dir_all(&dir)?;

        let config = ProjectConfig {
            name: name.to_string(),
            url: url.to_string(),
            rule_set: draft.rule_set.clone(),
            use_dynamic: draft.use_dynamic,
            settle_seconds: clamp_settle_seconds(draft.settle_seconds),
            created_at: now,
            last_updated: now,
        };
        write_config(&dir, &config)?;
        if let Some(table) = results.filter(|t| !t.is_empty()) {
            write_results(&dir, table)?;
        }

        log::info!("Saved project {id}");
        Ok(id)
    }

    /// Loads a project's config and saved results.
    ///
    /// # Errors
    ///
    /// * [`ProjectError::NotFound`] if there is no such project
    /// * [`ProjectError::Io`] / [`ProjectError::Json`] if its files cannot
    ///   be read
    pub fn load(&self, id: &str) -> Result<Project, ProjectError> {
        let dir = self.existing_dir(id)?;
        let config = read_config(&dir)?;

        let results_path = dir.join(RESULTS_JSON);
        let results = if results_path.is_file() {
            Some(serde_json::from_str(&fs::read_to_string(results_path)?)?)
        } else {
            None
        };

        Ok(Project {
            id: id.to_string(),
            config,
            results,
        })
    }

    /// Summaries of every readable project, most recently updated first.
    #[must_use]
    pub fn list(&self) -> Vec<ProjectSummary> {
        let Ok(entries) = fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut projects: Vec<ProjectSummary> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|dir| dir.join(CONFIG_FILE).is_file())
            .filter_map(|dir| match read_config(&dir) {
                Ok(config) => Some(ProjectSummary {
                    id: dir_name(&dir),
                    has_results: dir.join(RESULTS_CSV).is_file(),
                    name: config.name,
                    url: config.url,
                    created_at: config.created_at,
                    last_updated: config.last_updated,
                }),
                Err(e) => {
                    log::warn!("Skipping project {}: {e}", dir.display());
                    None
                }
            })
            .collect();

        projects.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
        projects
    }

    /// Applies `update` to a project and refreshes `last_updated`. Results
    /// are rewritten when a non-empty table is supplied.
    ///
    /// # Errors
    ///
    /// * [`ProjectError::NotFound`] if there is no such project
    /// * [`ProjectError::Io`] / [`ProjectError::Json`] /
    ///   [`ProjectError::Csv`] on read or write failure
    pub fn update(
        &self,
        id: &str,
        update: ProjectUpdate,
        results: Option<&ResultTable>,
    ) -> Result<ProjectConfig, ProjectError> {
        self.update_at(id, update, results, Local::now().naive_local())
    }

    pub(crate) fn update_at(
        &self,
        id: &str,
        update: ProjectUpdate,
        results: Option<&ResultTable>,
        now: NaiveDateTime,
    ) -> Result<ProjectConfig, ProjectError> {
        let dir = self.existing_dir(id)?;
        let mut config = read_config(&dir)?;

        if let Some(name) = update.name {
            config.name = name;
        }
        if let Some(url) = update.url {
            config.url = url;
        }
        if let Some(rule_set) = update.rule_set {
            config.rule_set = rule_set;
        }
        if let Some(use_dynamic) = update.use_dynamic {
            config.use_dynamic = use_dynamic;
        }
        if let Some(settle_seconds) = update.settle_seconds {
            config.settle_seconds = clamp_settle_seconds(settle_seconds);
        }
        config.last_updated = now;

        write_config(&dir, &config)?;
        if let Some(table) = results.filter(|t| !t.is_empty()) {
            write_results(&dir, table)?;
        }

        log::info!("Updated project {id}");
        Ok(config)
    }

    /// Removes a project directory and everything in it.
    ///
    /// # Errors
    ///
    /// * [`ProjectError::NotFound`] if there is no such project
    /// * [`ProjectError::Io`] if it cannot be removed
    pub fn delete(&self, id: &str) -> Result<(), ProjectError> {
        let dir = self.existing_dir(id)?;
        fs::remove_dir_all(dir)?;
        log::info!("Deleted project {id}");
        Ok(())
    }

    fn existing_dir(&self, id: &str) -> Result<PathBuf, ProjectError> {
        let id = id.trim();
        let not_found = || ProjectError::NotFound {
            kind: "Project",
            id: id.to_string(),
        };

        let dir = self.root.join(store_key(id).ok_or_else(not_found)?);
        if !dir.join(CONFIG_FILE).is_file() {
            return Err(not_found());
        }
        Ok(dir)
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_config(dir: &Path) -> Result<ProjectConfig, ProjectError> {
    Ok(serde_json::from_str(&fs::read_to_string(dir.join(CONFIG_FILE))?)?)
}

fn write_config(dir: &Path, config: &ProjectConfig) -> Result<(), ProjectError> {
    fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(config)?)?;
    Ok(())
}

fn write_results(dir: &Path, table: &ResultTable) -> Result<(), ProjectError> {
    write_csv(table, fs::File::create(dir.join(RESULTS_CSV))?)?;
    write_json(table, fs::File::create(dir.join(RESULTS_JSON))?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use smart_scraper_extract_models::ExtractionRule;

    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn draft(name: &str) -> ProjectDraft {
        ProjectDraft {
            name: name.to_string(),
            url: "https://example.com/shop".to_string(),
            rule_set: RuleSet::new()
                .with_rule(ExtractionRule::new("span").with_class("price"))
                .with_rule(ExtractionRule::new("a")),
            use_dynamic: true,
            settle_seconds: 4,
        }
    }

    fn results() -> ResultTable {
        ResultTable::from_entries(vec![vec![
            ("tag".to_string(), Some("span".to_string())),
            ("content".to_string(), Some("$10".to_string())),
        ]])
    }

    #[test]
    fn save_writes_config_and_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::in_data_dir(dir.path());

        let id = store.save_at(&draft("Shop: prices"), Some(&results()), at(9, 30)).unwrap();
        assert_eq!(id, "Shop_ prices_20240501_093000");

        let project = store.load(&id).unwrap();
        assert_eq!(project.config.name, "Shop: prices");
        assert_eq!(project.config.rule_set, draft("x").rule_set);
        assert_eq!(project.config.settle_seconds, 4);
        assert_eq!(project.config.created_at, project.config.last_updated);
        assert_eq!(project.results, Some(results()));

        let csv = fs::read_to_string(dir.path().join("projects").join(&id).join(RESULTS_CSV)).unwrap();
        assert_eq!(csv, "tag,content\nspan,$10\n");
    }

    #[test]
    fn config_json_uses_rule_map_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        let id = store.save_at(&draft("shop"), None, at(9, 0)).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(&id).join(CONFIG_FILE)).unwrap())
                .unwrap();
        assert_eq!(raw["rule_set"]["span"]["class"], "price");
        assert_eq!(raw["use_dynamic"], true);
        assert_eq!(raw["created_at"], "2024-05-01T09:00:00");
    }

    #[test]
    fn empty_results_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());

        let id = store
            .save_at(&draft("shop"), Some(&ResultTable::empty()), at(9, 0))
            .unwrap();

        assert!(store.load(&id).unwrap().results.is_none());
        assert!(!store.list()[0].has_results);
    }

    #[test]
    fn name_and_url_are_required() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());

        let nameless = ProjectDraft {
            name: "  ".to_string(),
            ..draft("x")
        };
        let urlless = ProjectDraft {
            url: String::new(),
            ..draft("x")
        };

        assert!(matches!(store.save(&nameless, None), Err(ProjectError::Invalid { .. })));
        assert!(matches!(store.save(&urlless, None), Err(ProjectError::Invalid { .. })));
    }

    #[test]
    fn list_is_sorted_by_last_update_and_skips_broken_projects() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());

        let older = store.save_at(&draft("older"), Some(&results()), at(8, 0)).unwrap();
        let newer = store.save_at(&draft("newer"), None, at(9, 0)).unwrap();
        fs::create_dir(dir.path().join("broken")).unwrap();
        fs::write(dir.path().join("broken").join(CONFIG_FILE), "{").unwrap();

        let listed: Vec<String> = store.list().into_iter().map(|p| p.id).collect();
        assert_eq!(listed, [newer.clone(), older.clone()]);

        store
            .update_at(&older, ProjectUpdate::default(), None, at(10, 0))
            .unwrap();
        let listed = store.list();
        assert_eq!(listed[0].id, older);
        assert!(listed[0].has_results);
        assert_eq!(listed[1].id, newer);
    }

    #[test]
    fn update_changes_only_given_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        let id = store.save_at(&draft("shop"), None, at(9, 0)).unwrap();

        let config = store
            .update_at(
                &id,
                ProjectUpdate {
                    url: Some("https://example.com/sale".to_string()),
                    settle_seconds: Some(60),
                    ..ProjectUpdate::default()
                },
                Some(&results()),
                at(11, 15),
            )
            .unwrap();

        assert_eq!(config.name, "shop");
        assert_eq!(config.url, "https://example.com/sale");
        assert_eq!(config.settle_seconds, 10);
        assert_eq!(config.created_at, at(9, 0));
        assert_eq!(config.last_updated, at(11, 15));
        assert_eq!(store.load(&id).unwrap().results, Some(results()));
    }

    #[test]
    fn delete_removes_project() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        let id = store.save_at(&draft("shop"), Some(&results()), at(9, 0)).unwrap();

        store.delete(&id).unwrap();

        assert!(store.list().is_empty());
        assert!(matches!(store.load(&id), Err(ProjectError::NotFound { .. })));
        assert!(matches!(store.delete(&id), Err(ProjectError::NotFound { .. })));
    }

    #[test]
    fn ids_outside_the_store_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "{}").unwrap();
        let store = ProjectStore::new(dir.path().join("projects"));
        store.save_at(&draft("shop"), None, at(9, 0)).unwrap();

        for id in ["..", ".", "", "  "] {
            assert!(matches!(store.delete(id), Err(ProjectError::NotFound { .. })));
            assert!(matches!(store.load(id), Err(ProjectError::NotFound { .. })));
        }
        assert!(dir.path().join(CONFIG_FILE).is_file());
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn not_found_reports_the_trimmed_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());

        let err = store.load("  missing ").unwrap_err();
        assert_eq!(err.to_string(), "Project not found: missing");
    }
}
