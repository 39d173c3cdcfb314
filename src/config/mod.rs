//! Configuration management for the tracker.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`TRACKER_*`)
//! 3. Project config (.tracker/config.yaml)
//! 4. User config (~/.config/tracker/config.yaml)
//! 5. Defaults

use crate::error::{Result, TrackerError};
use crate::model::{ActingContext, ExecutionMode};
use crate::storage::SqliteStorage;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Project directory name searched for by discovery.
pub const TRACKER_DIR_NAME: &str = ".tracker";
/// Default database filename inside the tracker directory.
const DEFAULT_DB_FILENAME: &str = "tracker.db";
/// Prefix for configuration environment variables.
const ENV_PREFIX: &str = "TRACKER_";

/// One configuration source, keyed by normalized name (`actor-id`, not
/// `ACTOR_ID`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `TRACKER_*` pairs; other names are ignored.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                if stripped == "DIR" {
                    continue;
                }
                layer.set(stripped, value);
            }
        }
        layer
    }

    pub fn set(&mut self, key: &str, value: String) {
        self.values.insert(normalize_key(key), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(&normalize_key(key))
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub actor: Option<String>,
    pub actor_id: Option<i64>,
    pub batch: Option<bool>,
    pub update_nulls: Option<bool>,
    pub transactional: Option<bool>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            layer.set("db", path.to_string_lossy().to_string());
        }
        if let Some(actor) = &self.actor {
            layer.set("actor", actor.clone());
        }
        if let Some(actor_id) = self.actor_id {
            layer.set("actor-id", actor_id.to_string());
        }
        if let Some(batch) = self.batch {
            layer.set("batch", batch.to_string());
        }
        if let Some(update_nulls) = self.update_nulls {
            layer.set("update-nulls", update_nulls.to_string());
        }
        if let Some(transactional) = self.transactional {
            layer.set("transactional", transactional.to_string());
        }

        layer
    }
}

/// How `store` should run, resolved from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSettings {
    /// Write absent (null) attributes as NULL instead of skipping them.
    pub update_nulls: bool,
    /// Use `store_atomic` instead of `store`.
    pub transactional: bool,
}

/// Discover the active `.tracker` directory.
///
/// Honors `TRACKER_DIR` when set, otherwise walks up from `start` (or CWD).
///
/// # Errors
///
/// Returns an error if no tracker directory is found or the CWD cannot be read.
pub fn discover_tracker_dir(start: Option<&Path>) -> Result<PathBuf> {
    let env_dir = env::var("TRACKER_DIR")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from);
    discover_tracker_dir_with_env(start, env_dir.as_deref())
}

fn discover_tracker_dir_with_env(
    start: Option<&Path>,
    env_override: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(path) = env_override {
        if path.is_dir() {
            return Ok(path.to_path_buf());
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(TRACKER_DIR_NAME);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(TrackerError::NotInitialized)
}

/// Load project config (.tracker/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(tracker_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&tracker_dir.join("config.yaml"))
}

/// Load user config (~/.config/tracker/config.yaml). Empty when `HOME` is
/// unset.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("tracker")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer.set("batch", "false".to_string());
    layer.set("update-nulls", "false".to_string());
    layer.set("transactional", "false".to_string());
    layer
}

/// Load configuration with the precedence order above.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_config(tracker_dir: Option<&Path>, cli: &CliOverrides) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let user = load_user_config()?;
    let project = match tracker_dir {
        Some(dir) => load_project_config(dir)?,
        None => ConfigLayer::default(),
    };
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, user, project, env_layer, cli_layer,
    ]))
}

/// Database path: the `db` key as given, else `tracker.db` in the tracker
/// directory.
///
/// # Errors
///
/// Returns `NotInitialized` when neither is available.
pub fn resolve_db_path(layer: &ConfigLayer, tracker_dir: Option<&Path>) -> Result<PathBuf> {
    if let Some(db) = layer.get("db").filter(|value| !value.trim().is_empty()) {
        return Ok(PathBuf::from(db));
    }
    tracker_dir
        .map(|dir| dir.join(DEFAULT_DB_FILENAME))
        .ok_or(TrackerError::NotInitialized)
}

/// Open storage at the resolved database path.
///
/// # Errors
///
/// Returns an error if the path cannot be resolved or the database cannot be opened.
pub fn open_storage(
    layer: &ConfigLayer,
    tracker_dir: Option<&Path>,
) -> Result<(SqliteStorage, PathBuf)> {
    let path = resolve_db_path(layer, tracker_dir)?;
    let storage = SqliteStorage::open(&path)?;
    Ok((storage, path))
}

/// Build the acting context. Falls back to `$USER` for the name.
///
/// # Errors
///
/// Returns `Config` if `actor-id` or `batch` cannot be parsed.
pub fn acting_context_from_layer(layer: &ConfigLayer) -> Result<ActingContext> {
    let username = layer
        .get("actor")
        .cloned()
        .or_else(|| env::var("USER").ok())
        .unwrap_or_default();

    let user_id = match layer.get("actor-id") {
        Some(raw) => raw.trim().parse::<i64>().map_err(|_| {
            TrackerError::Config(format!("actor-id must be an integer, got {raw:?}"))
        })?,
        None => 0,
    };

    let mode = if bool_value(layer, "batch")? {
        ExecutionMode::Batch
    } else {
        ExecutionMode::Interactive
    };

    Ok(ActingContext {
        user_id,
        username,
        mode,
    })
}

/// Build save settings.
///
/// # Errors
///
/// Returns `Config` if a flag value cannot be parsed as a boolean.
pub fn save_settings_from_layer(layer: &ConfigLayer) -> Result<SaveSettings> {
    Ok(SaveSettings {
        update_nulls: bool_value(layer, "update-nulls")?,
        transactional: bool_value(layer, "transactional")?,
    })
}

fn bool_value(layer: &ConfigLayer, key: &str) -> Result<bool> {
    match layer.get(key) {
        None => Ok(false),
        Some(raw) => parse_bool(raw)
            .ok_or_else(|| TrackerError::Config(format!("{key} must be a boolean, got {raw:?}"))),
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace('_', "-")
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.set(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn merge_precedence_order() {
        let mut yaml = ConfigLayer::default();
        yaml.set("actor", "yaml".to_string());

        let env_layer = ConfigLayer::from_vars(vars(&[("TRACKER_ACTOR", "env")]));

        let cli = CliOverrides {
            actor: Some("cli".to_string()),
            ..CliOverrides::default()
        }
        .as_layer();

        let merged =
            ConfigLayer::merge_layers(&[default_config_layer(), yaml.clone(), env_layer.clone()]);
        assert_eq!(merged.get("actor").unwrap(), "env");

        let merged = ConfigLayer::merge_layers(&[default_config_layer(), yaml, env_layer, cli]);
        assert_eq!(merged.get("actor").unwrap(), "cli");
    }

    #[test]
    fn env_keys_are_normalized() {
        let layer = ConfigLayer::from_vars(vars(&[
            ("TRACKER_ACTOR_ID", "7"),
            ("TRACKER_UPDATE_NULLS", "yes"),
            ("TRACKER_DIR", "/somewhere"),
            ("HOME", "/home/x"),
        ]));
        assert_eq!(layer.get("actor-id").unwrap(), "7");
        assert_eq!(layer.get("update_nulls").unwrap(), "yes");
        assert!(layer.get("dir").is_none());
        assert_eq!(layer.values.len(), 2);
    }

    #[test]
    fn yaml_layer_reads_scalars() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("config.yaml");
        fs::write(&path, "actor: alice\nactor-id: 12\ntransactional: true\n").expect("write");

        let layer = ConfigLayer::from_yaml(&path).expect("yaml");
        let ctx = acting_context_from_layer(&layer).expect("ctx");
        assert_eq!(ctx.username, "alice");
        assert_eq!(ctx.user_id, 12);
        assert_eq!(ctx.mode, ExecutionMode::Interactive);

        let settings = save_settings_from_layer(&layer).expect("settings");
        assert!(settings.transactional);
        assert!(!settings.update_nulls);
    }

    #[test]
    fn missing_yaml_is_empty() {
        let temp = TempDir::new().expect("tempdir");
        let layer = ConfigLayer::from_yaml(&temp.path().join("nope.yaml")).expect("yaml");
        assert!(layer.values.is_empty());
    }

    #[test]
    fn batch_flag_selects_batch_mode() {
        let mut layer = ConfigLayer::default();
        layer.set("actor", "importer".to_string());
        layer.set("batch", "on".to_string());
        let ctx = acting_context_from_layer(&layer).expect("ctx");
        assert!(ctx.is_batch());
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let mut layer = ConfigLayer::default();
        layer.set("actor-id", "abc".to_string());
        assert!(matches!(
            acting_context_from_layer(&layer),
            Err(TrackerError::Config(_))
        ));

        let mut layer = ConfigLayer::default();
        layer.set("update-nulls", "maybe".to_string());
        assert!(matches!(
            save_settings_from_layer(&layer),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn db_path_prefers_explicit_key() {
        let temp = TempDir::new().expect("tempdir");
        let dir = temp.path().join(TRACKER_DIR_NAME);

        let layer = ConfigLayer::default();
        assert_eq!(
            resolve_db_path(&layer, Some(&dir)).unwrap(),
            dir.join(DEFAULT_DB_FILENAME)
        );
        assert!(matches!(
            resolve_db_path(&layer, None),
            Err(TrackerError::NotInitialized)
        ));

        let cli = CliOverrides {
            db: Some(temp.path().join("other.db")),
            ..CliOverrides::default()
        };
        assert_eq!(
            resolve_db_path(&cli.as_layer(), Some(&dir)).unwrap(),
            temp.path().join("other.db")
        );
    }

    #[test]
    fn discover_tracker_dir_uses_env_override() {
        let temp = TempDir::new().expect("tempdir");
        let tracker_dir = temp.path().join("custom");
        fs::create_dir_all(&tracker_dir).expect("create dir");

        let discovered =
            discover_tracker_dir_with_env(None, Some(&tracker_dir)).expect("discover");
        assert_eq!(discovered, tracker_dir);
    }

    #[test]
    fn discover_tracker_dir_walks_up() {
        let temp = TempDir::new().expect("tempdir");
        let tracker_dir = temp.path().join(TRACKER_DIR_NAME);
        fs::create_dir_all(&tracker_dir).expect("create dir");
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("create nested");

        let discovered = discover_tracker_dir_with_env(Some(&nested), None).expect("discover");
        assert_eq!(discovered, tracker_dir);
    }

    #[test]
    fn open_storage_creates_database_in_tracker_dir() {
        let temp = TempDir::new().expect("tempdir");
        let tracker_dir = temp.path().join(TRACKER_DIR_NAME);
        fs::create_dir_all(&tracker_dir).expect("create dir");

        let (storage, path) =
            open_storage(&ConfigLayer::default(), Some(&tracker_dir)).expect("open");
        assert_eq!(path, tracker_dir.join(DEFAULT_DB_FILENAME));
        assert!(path.exists());
        assert_eq!(storage.count_issues().expect("count"), 0);
    }
}
