//! Configuration management for the faceprint CLI.
//!
//! Configuration is stored in ~/.faceprint/config.yaml. Each context names
//! a database file and the matcher thresholds used against it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use faceprint::{MatcherConfig, RecognizerConfig, DEFAULT_STORAGE_KEY};
use serde::{Deserialize, Serialize};

use crate::paths::Paths;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Name of the currently active context.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_context: String,

    /// Map of context name to context configuration.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub contexts: HashMap<String, Context>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// A single face database context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Database file (optional, defaults to ~/.faceprint/data/faces.redb).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub db_path: String,

    /// Key the database document is stored under.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_distance: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_threshold: Option<f32>,
}

impl Config {
    /// Returns the config file path.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Adds or replaces a context.
    pub fn add_context(&mut self, name: &str, mut ctx: Context) -> anyhow::Result<()> {
        ctx.name = name.to_string();
        self.contexts.insert(name.to_string(), ctx);
        self.save()
    }

    /// Deletes a context.
    pub fn delete_context(&mut self, name: &str) -> anyhow::Result<()> {
        if self.contexts.remove(name).is_none() {
            anyhow::bail!("context '{}' not found", name);
        }
        if self.current_context == name {
            self.current_context.clear();
        }
        self.save()
    }

    /// Sets the current context.
    pub fn use_context(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.contexts.contains_key(name) {
            anyhow::bail!("context '{}' not found", name);
        }
        self.current_context = name.to_string();
        self.save()
    }

    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    pub fn get_current_context(&self) -> Option<&Context> {
        if self.current_context.is_empty() {
            return None;
        }
        self.contexts.get(&self.current_context)
    }

    /// Resolves the context by name, or current context if name is empty.
    pub fn resolve_context(&self, name: Option<&str>) -> Option<&Context> {
        match name {
            Some(n) if !n.is_empty() => self.get_context(n),
            _ => self.get_current_context(),
        }
    }

    /// Lists all context names, sorted.
    pub fn list_contexts(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contexts.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Context {
    /// Database path for this context, falling back to the default location.
    pub fn database_path(&self, paths: &Paths) -> PathBuf {
        if self.db_path.is_empty() {
            paths.default_db_path()
        } else {
            expand_home(&self.db_path, &paths.home_dir)
        }
    }

    /// Recognizer settings for this context. Unset thresholds keep their
    /// defaults.
    pub fn recognizer_config(&self) -> RecognizerConfig {
        let d = MatcherConfig::default();
        RecognizerConfig {
            matcher: MatcherConfig {
                max_distance: self.max_distance.unwrap_or(d.max_distance),
                min_confidence: self.min_confidence.unwrap_or(d.min_confidence),
                match_threshold: self.match_threshold.unwrap_or(d.match_threshold),
            },
            storage_key: if self.storage_key.is_empty() {
                DEFAULT_STORAGE_KEY.to_string()
            } else {
                self.storage_key.clone()
            },
        }
    }
}

fn expand_home(path: &str, home: &Path) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Loads configuration from `custom_path`, or the default location.
///
/// A missing file yields an empty configuration; nothing is written until
/// the configuration is changed.
pub fn load_config(paths: &Paths, custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => paths.config_file(),
    };

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        Config::default()
    };

    cfg.config_path = config_path;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Paths, Config) {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::with_home(dir.path());
        let cfg = load_config(&paths, None).unwrap();
        (dir, paths, cfg)
    }

    #[test]
    fn test_missing_config_is_empty() {
        let (_dir, paths, cfg) = temp_config();
        assert!(cfg.contexts.is_empty());
        assert_eq!(cfg.path(), &paths.config_file());
        assert!(!paths.config_file().exists());
    }

    #[test]
    fn test_context_lifecycle() {
        let (_dir, paths, mut cfg) = temp_config();

        cfg.add_context(
            "lab",
            Context {
                db_path: "/tmp/lab.redb".into(),
                max_distance: Some(0.5),
                ..Context::default()
            },
        )
        .unwrap();
        cfg.add_context("home", Context::default()).unwrap();
        cfg.use_context("lab").unwrap();
        assert!(cfg.use_context("nope").is_err());

        let reloaded = load_config(&paths, None).unwrap();
        assert_eq!(reloaded.current_context, "lab");
        assert_eq!(reloaded.list_contexts(), vec!["home", "lab"]);
        assert_eq!(reloaded.get_current_context().unwrap().name, "lab");
        assert_eq!(reloaded.resolve_context(Some("home")).unwrap().name, "home");

        cfg.delete_context("lab").unwrap();
        assert!(cfg.current_context.is_empty());
        assert!(cfg.delete_context("lab").is_err());
    }

    #[test]
    fn test_recognizer_config_defaults() {
        let ctx = Context::default();
        let rc = ctx.recognizer_config();
        assert_eq!(rc, RecognizerConfig::default());

        let ctx = Context {
            storage_key: "faces:lab".into(),
            min_confidence: Some(0.3),
            ..Context::default()
        };
        let rc = ctx.recognizer_config();
        assert_eq!(rc.storage_key, "faces:lab");
        assert_eq!(rc.matcher.min_confidence, 0.3);
        assert_eq!(rc.matcher.max_distance, 0.6);
    }

    #[test]
    fn test_database_path() {
        let paths = Paths::with_home("/home/alice");
        assert_eq!(
            Context::default().database_path(&paths),
            PathBuf::from("/home/alice/.faceprint/data/faces.redb")
        );

        let ctx = Context {
            db_path: "~/faces/lab.redb".into(),
            ..Context::default()
        };
        assert_eq!(ctx.database_path(&paths), PathBuf::from("/home/alice/faces/lab.redb"));
    }

    #[test]
    fn test_yaml_format() {
        let yaml = "current_context: lab\ncontexts:\n  lab:\n    name: lab\n    max_distance: 0.45\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        let ctx = cfg.get_current_context().unwrap();
        assert_eq!(ctx.max_distance, Some(0.45));
        assert!(ctx.db_path.is_empty());
    }
}
