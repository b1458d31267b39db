//! # Shizu Configuration Module
//!
//! This module provides configuration management for Shizu, including:
//! - Loading configuration from YAML files
//! - Merging with embedded default configuration
//! - Environment variable overrides
//! - Managed directories and files resolved against the configuration directory
//! - Thread-safe singleton access pattern
//!
//! ## Usage
//!
//! ```no_run
//! use shizuconfig::get_config;
//!
//! // Get the global configuration
//! let config = get_config()?;
//!
//! // Access configuration values
//! let lineups_dir = config.get_managed_dir(&["lineups", "directory"], "lineups")?;
//! let level = config.get_log_min_level()?;
//!
//! // Update configuration values
//! config.set_log_min_level("DEBUG".to_string())?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Result, anyhow};
use dirs::home_dir;
use once_cell::sync::OnceCell;
use serde_yaml::{Mapping, Number, Value};
use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::info;

// Configuration par défaut intégrée
const DEFAULT_CONFIG: &str = include_str!("shizu.yaml");

static CONFIG: OnceCell<Arc<Config>> = OnceCell::new();

const ENV_CONFIG_DIR: &str = "SHIZU_CONFIG";
const ENV_PREFIX: &str = "SHIZU_CONFIG__";
const CONFIG_DIR_NAME: &str = ".shizu";
const CONFIG_FILE_NAME: &str = "config.yaml";

// Default values for configuration
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";
const DEFAULT_LOG_ENABLE_CONSOLE: bool = true;

/// Macro to generate getter/setter for u64 values with default
macro_rules! impl_u64_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<u64> {
            match self.get_value($path) {
                Ok(Value::Number(n)) => Ok(n.as_u64().unwrap_or($default)),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: u64) -> Result<()> {
            self.set_value($path, Value::Number(Number::from(value)))
        }
    };
}

/// Macro to generate getter/setter for bool values with default
macro_rules! impl_bool_config {
    ($getter:ident, $setter:ident, $path:expr, $default:expr) => {
        pub fn $getter(&self) -> Result<bool> {
            match self.get_value($path) {
                Ok(Value::Bool(b)) => Ok(b),
                _ => Ok($default),
            }
        }

        pub fn $setter(&self, value: bool) -> Result<()> {
            self.set_value($path, Value::Bool(value))
        }
    };
}

/// Configuration manager for Shizu
///
/// This structure manages the application configuration, including:
/// - Loading configuration from YAML files
/// - Merging with default configuration
/// - Handling environment variable overrides
/// - Providing typed getters/setters for configuration values
///
/// # Examples
///
/// ```no_run
/// use shizuconfig::Config;
///
/// let config = Config::load_config("/etc/shizu")?;
/// let timeout = config.get_probe_timeout_secs()?;
/// println!("Probe timeout: {}s", timeout);
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug)]
pub struct Config {
    config_dir: PathBuf,
    path: PathBuf,
    data: Mutex<Value>,
}

impl Config {
    /// Finds a config directory by trying different locations in order
    fn find_config_dir(directory: &str) -> PathBuf {
        // 1. Try provided directory
        if !directory.is_empty() {
            return PathBuf::from(directory);
        }

        // 2. Try environment variable
        if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
            info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
            return PathBuf::from(env_path);
        }

        // 3. Try current directory
        if Path::new(CONFIG_DIR_NAME).exists() {
            return PathBuf::from(CONFIG_DIR_NAME);
        }

        // 4. Try home directory
        if let Some(home) = home_dir() {
            let home_config = home.join(CONFIG_DIR_NAME);
            if home_config.exists() {
                return home_config;
            }
        }

        // Default fallback
        PathBuf::from(CONFIG_DIR_NAME)
    }

    /// Validates and prepares a config directory
    fn validate_config_dir(path: &Path) -> Result<()> {
        // Create if doesn't exist
        if !path.exists() {
            fs::create_dir_all(path)?;
        }

        // Verify it's a directory
        if !path.is_dir() {
            return Err(anyhow!(
                "Configuration path {} is not a directory",
                path.display()
            ));
        }

        // Test write permission
        let test_file = path.join(".write_test");
        fs::write(&test_file, b"test")?;
        fs::remove_file(&test_file)?;

        // Test read permission
        fs::read_dir(path)?;

        Ok(())
    }

    /// Determines and validates the configuration directory
    ///
    /// The directory is searched in the following order:
    /// 1. The provided `directory` parameter if not empty
    /// 2. The `SHIZU_CONFIG` environment variable
    /// 3. `.shizu` in the current directory
    /// 4. `.shizu` in the user's home directory
    ///
    /// The directory is created if it doesn't exist, validated for read/write
    /// permissions, and returned as an absolute path.
    pub fn resolve_config_dir(directory: &str) -> Result<PathBuf> {
        let dir_path = Self::find_config_dir(directory);
        Self::validate_config_dir(&dir_path)?;

        if dir_path.is_absolute() {
            Ok(dir_path)
        } else {
            Ok(env::current_dir()?.join(dir_path))
        }
    }

    /// Loads the configuration from the specified directory
    ///
    /// This method:
    /// 1. Determines the configuration directory
    /// 2. Loads the default embedded configuration
    /// 3. Merges it with the external config.yaml file if present
    /// 4. Applies environment variable overrides
    /// 5. Saves the merged configuration
    ///
    /// # Arguments
    ///
    /// * `directory` - The directory containing the config.yaml file, or empty to use defaults
    pub fn load_config(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref().to_string_lossy().to_string();
        let config_dir = Self::resolve_config_dir(&directory)?;
        info!(config_dir = %config_dir.display(), "Using config directory");

        let path = config_dir.join(CONFIG_FILE_NAME);

        // Charger la configuration par défaut
        let mut config_value = Self::lower_keys_value(serde_yaml::from_str(DEFAULT_CONFIG)?);

        // Essayer de charger le fichier de configuration
        let yaml_data = if let Ok(data) = fs::read(&path) {
            info!(config_file = %path.display(), "Loaded config file");
            data
        } else {
            info!(
                config_file = %path.display(),
                "Config file not found, using default embedded config"
            );
            DEFAULT_CONFIG.as_bytes().to_vec()
        };

        // Merger avec la config par défaut (clés en minuscules des deux côtés)
        let external_value = Self::lower_keys_value(serde_yaml::from_slice(&yaml_data)?);
        merge_yaml(&mut config_value, &external_value);

        // Appliquer les overrides depuis les variables d'environnement
        Self::apply_env_overrides(&mut config_value);

        let config = Config {
            config_dir,
            path,
            data: Mutex::new(config_value),
        };

        config.save()?;
        Ok(config)
    }

    /// Absolute path of the configuration directory
    pub fn dir(&self) -> &Path {
        &self.config_dir
    }

    /// Absolute path of the config.yaml file
    pub fn file_path(&self) -> &Path {
        &self.path
    }

    fn data(&self) -> Result<MutexGuard<'_, Value>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Saves the current configuration to the config.yaml file
    pub fn save(&self) -> Result<()> {
        let data = self.data()?;
        let yaml = serde_yaml::to_string(&*data)?;
        fs::write(&self.path, yaml)?;
        Ok(())
    }

    /// Sets a configuration value at the specified path and saves it
    ///
    /// # Arguments
    ///
    /// * `path` - Array of keys representing the path (e.g., `&["export", "probe_timeout_secs"]`)
    /// * `value` - The YAML value to set
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        let mut data = self.data()?;
        Self::set_value_internal(&mut data, path, value)?;
        drop(data);
        self.save()
    }

    fn set_value_internal(data: &mut Value, path: &[&str], value: Value) -> Result<()> {
        if path.is_empty() {
            *data = value;
            return Ok(());
        }
        if let Value::Mapping(map) = data {
            let key_value = Value::String(path[0].to_lowercase());
            if path.len() == 1 {
                map.insert(key_value, value);
            } else {
                let entry = map
                    .entry(key_value)
                    .or_insert(Value::Mapping(Mapping::new()));
                Self::set_value_internal(entry, &path[1..], value)?;
            }
            Ok(())
        } else {
            Err(anyhow!("Current node is not a map"))
        }
    }

    /// Gets a configuration value at the specified path
    ///
    /// Returns an error if the path doesn't exist.
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        let data = self.data()?;
        Self::get_value_internal(&data, path)
    }

    fn get_value_internal(data: &Value, path: &[&str]) -> Result<Value> {
        let mut current = data;
        for (i, key) in path.iter().enumerate() {
            if let Value::Mapping(map) = current {
                let key = key.to_lowercase();

                if let Some(next) = map.get(&Value::String(key)) {
                    current = next;
                } else {
                    return Err(anyhow!("Path {} does not exist", path[..=i].join(".")));
                }
            } else {
                return Err(anyhow!("Path {} is not a Config", path[..i].join(".")));
            }
        }
        Ok(current.clone())
    }

    fn apply_env_overrides(config: &mut Value) {
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                let key_path = stripped.split("__").collect::<Vec<_>>();
                let yaml_value = Self::convert_env_value(&value);
                if let Err(e) = Self::set_value_internal(config, &key_path, yaml_value) {
                    tracing::warn!(env_var = %key, error = %e, "Ignoring environment override");
                }
            }
        }
    }

    fn convert_env_value(value: &str) -> Value {
        if let Ok(parsed) = serde_yaml::from_str::<Value>(value) {
            return parsed;
        }
        Value::String(value.to_string())
    }

    fn lower_keys_value(value: Value) -> Value {
        match value {
            Value::Mapping(map) => {
                let mut new_map = Mapping::new();
                for (k, v) in map {
                    if let Value::String(s) = k {
                        new_map.insert(Value::String(s.to_lowercase()), Self::lower_keys_value(v));
                    } else {
                        new_map.insert(k, Self::lower_keys_value(v));
                    }
                }
                Value::Mapping(new_map)
            }
            Value::Sequence(seq) => {
                Value::Sequence(seq.into_iter().map(Self::lower_keys_value).collect())
            }
            _ => value,
        }
    }

    /// Résout un chemin relatif par rapport au répertoire de configuration
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }

    /// Résout un chemin relatif ou absolu et crée le répertoire si nécessaire
    fn resolve_and_create_dir(&self, dir_path: &str) -> Result<PathBuf> {
        let absolute_path = self.resolve_path(dir_path);

        if !absolute_path.exists() {
            fs::create_dir_all(&absolute_path)?;
            info!(directory = %absolute_path.display(), "Created managed directory");
        }

        Ok(absolute_path)
    }

    /// Récupère un répertoire géré par la configuration
    ///
    /// Le répertoire peut être absolu ou relatif au répertoire de
    /// configuration. Il sera créé s'il n'existe pas, et la valeur par défaut
    /// est enregistrée si la clé est absente.
    ///
    /// # Exemple
    ///
    /// ```no_run
    /// use shizuconfig::get_config;
    ///
    /// let config = get_config()?;
    /// let lineups = config.get_managed_dir(&["lineups", "directory"], "lineups")?;
    /// println!("Lineups directory: {}", lineups.display());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let dir_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_managed_dir(path, default.to_string())?;
                default.to_string()
            }
        };
        self.resolve_and_create_dir(&dir_path)
    }

    /// Définit un répertoire géré par la configuration
    pub fn set_managed_dir(&self, path: &[&str], directory: String) -> Result<()> {
        self.set_value(path, Value::String(directory))
    }

    /// Récupère un fichier géré par la configuration
    ///
    /// Même résolution que [`Config::get_managed_dir`], mais seul le
    /// répertoire parent est créé : le fichier lui-même n'est pas touché.
    pub fn get_managed_file(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let file_path = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_value(path, Value::String(default.to_string()))?;
                default.to_string()
            }
        };

        let absolute_path = self.resolve_path(&file_path);
        if let Some(parent) = absolute_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                info!(directory = %parent.display(), "Created parent directory");
            }
        }
        Ok(absolute_path)
    }

    /// Récupère une chaîne, avec valeur par défaut si absente
    pub fn get_string(&self, path: &[&str], default: &str) -> Result<String> {
        match self.get_value(path) {
            Ok(Value::String(s)) => Ok(s),
            _ => Ok(default.to_string()),
        }
    }

    /// Récupère une liste de chaînes
    ///
    /// Si la clé est absente, la liste par défaut est enregistrée puis
    /// retournée. Une valeur scalaire est acceptée comme liste à un élément.
    pub fn get_string_list(&self, path: &[&str], default: &[&str]) -> Result<Vec<String>> {
        match self.get_value(path) {
            Ok(Value::Sequence(seq)) => seq
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    other => Err(anyhow!(
                        "Expected a string in {}, found {:?}",
                        path.join("."),
                        other
                    )),
                })
                .collect(),
            Ok(Value::String(s)) => Ok(vec![s]),
            _ => {
                let values: Vec<String> = default.iter().map(|s| s.to_string()).collect();
                self.set_string_list(path, &values)?;
                Ok(values)
            }
        }
    }

    /// Définit une liste de chaînes
    pub fn set_string_list(&self, path: &[&str], values: &[String]) -> Result<()> {
        let seq = values.iter().cloned().map(Value::String).collect();
        self.set_value(path, Value::Sequence(seq))
    }

    impl_u64_config!(
        get_probe_timeout_secs,
        set_probe_timeout_secs,
        &["export", "probe_timeout_secs"],
        60
    );

    impl_bool_config!(
        get_log_enable_console,
        set_log_enable_console,
        &["host", "logger", "enable_console"],
        DEFAULT_LOG_ENABLE_CONSOLE
    );

    /// Récupère le niveau de log minimum depuis la configuration
    pub fn get_log_min_level(&self) -> Result<String> {
        self.get_string(&["host", "logger", "min_level"], DEFAULT_LOG_MIN_LEVEL)
    }

    /// Définit le niveau de log minimum dans la configuration
    pub fn set_log_min_level(&self, level: String) -> Result<()> {
        self.set_value(&["host", "logger", "min_level"], Value::String(level))
    }
}

/// Returns the global configuration instance
///
/// The configuration is loaded on first access from the default location
/// (see [`Config::resolve_config_dir`]).
pub fn get_config() -> Result<Arc<Config>> {
    CONFIG
        .get_or_try_init(|| Config::load_config("").map(Arc::new))
        .cloned()
}

/// Merges external YAML configuration into default configuration
///
/// - For mappings (objects), it merges keys from external into default
/// - For scalars and sequences, external values replace default values
fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(), // pour les scalaires ou séquences, on remplace
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(dir: &Path) -> Config {
        Config::load_config(dir).unwrap()
    }

    #[test]
    fn test_defaults_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path());

        assert!(dir.path().join("config.yaml").exists());
        assert_eq!(config.get_probe_timeout_secs().unwrap(), 60);
        assert_eq!(
            config.get_string(&["export", "stream_domain"], "").unwrap(),
            "anisonhijack.com"
        );
        assert_eq!(
            config
                .get_string_list(&["permissions", "logo_dirs"], &[])
                .unwrap(),
            vec!["logos".to_string()]
        );
    }

    #[test]
    fn test_external_file_is_merged_and_lowercased() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.yaml"),
            "Export:\n  Probe_Timeout_Secs: 5\npermissions:\n  export_dirs: [/srv/out, /srv/out2]\n",
        )
        .unwrap();

        let config = load(dir.path());
        assert_eq!(config.get_probe_timeout_secs().unwrap(), 5);
        // la séquence externe remplace celle par défaut
        assert_eq!(
            config
                .get_string_list(&["permissions", "export_dirs"], &[])
                .unwrap(),
            vec!["/srv/out".to_string(), "/srv/out2".to_string()]
        );
        // les autres valeurs par défaut restent présentes
        assert_eq!(config.get_log_min_level().unwrap(), "INFO");
    }

    #[test]
    fn test_set_value_persists() {
        let dir = tempfile::tempdir().unwrap();
        {
            let config = load(dir.path());
            config.set_probe_timeout_secs(12).unwrap();
            config.set_log_enable_console(false).unwrap();
        }
        let config = load(dir.path());
        assert_eq!(config.get_probe_timeout_secs().unwrap(), 12);
        assert!(!config.get_log_enable_console().unwrap());
    }

    #[test]
    fn test_managed_dir_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path());

        let lineups = config
            .get_managed_dir(&["lineups", "directory"], "lineups")
            .unwrap();
        assert!(lineups.is_dir());
        assert!(lineups.starts_with(dir.path()));

        let ledger = config
            .get_managed_file(&["ledger", "path"], "ledger.json")
            .unwrap();
        assert_eq!(ledger.file_name().unwrap(), "ledger.json");
        assert!(ledger.parent().unwrap().is_dir());
        assert!(!ledger.exists());
    }

    #[test]
    fn test_missing_list_stores_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load(dir.path());

        let values = config
            .get_string_list(&["custom", "list"], &["a", "b"])
            .unwrap();
        assert_eq!(values, vec!["a".to_string(), "b".to_string()]);
        assert!(config.get_value(&["custom", "list"]).is_ok());
    }

    #[test]
    fn test_merge_yaml_nested() {
        let mut default: Value = serde_yaml::from_str("a:\n  b: 1\n  c: 2\n").unwrap();
        let external: Value = serde_yaml::from_str("a:\n  c: 3\nd: 4\n").unwrap();
        merge_yaml(&mut default, &external);

        let expected: Value = serde_yaml::from_str("a:\n  b: 1\n  c: 3\nd: 4\n").unwrap();
        assert_eq!(default, expected);
    }
}
