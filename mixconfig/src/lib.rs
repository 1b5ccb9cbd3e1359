//! # MixDeck Configuration Module
//!
//! Configuration YAML de MixDeck, partagée par toutes les crates :
//!
//! - un document par défaut embarqué (`mixdeck.yaml`) ;
//! - surchargé par `config.yaml` dans le répertoire de configuration ;
//! - puis par les variables `MIXDECK_CONFIG__SECTION__CLE=valeur`.
//!
//! Les clés sont insensibles à la casse. Le document fusionné est réécrit
//! au chargement et après chaque modification.
//!
//! ## Usage
//!
//! ```no_run
//! use mixconfig::get_config;
//!
//! let config = get_config();
//! let port = config.get_http_port();
//! let tracks_dir = config.get_managed_dir(&["tracks", "directory"], "tracks")?;
//!
//! config.set_http_port(9000)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod document;
mod location;

pub use location::ENV_CONFIG_DIR;

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use serde_yaml::{Number, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

const DEFAULT_CONFIG: &str = include_str!("mixdeck.yaml");
const CONFIG_FILE: &str = "config.yaml";
const ENV_PREFIX: &str = "MIXDECK_CONFIG__";

const DEFAULT_BASE_URL: &str = "localhost";
const DEFAULT_HTTP_PORT: u16 = 8000;
const DEFAULT_LOG_BUFFER_CAPACITY: usize = 1000;
const DEFAULT_LOG_MIN_LEVEL: &str = "INFO";

lazy_static! {
    static ref CONFIG: Arc<Config> =
        Arc::new(Config::load_config("").expect("Failed to load MixDeck configuration"));
}

/// Configuration chargée, protégée par un verrou
///
/// ```no_run
/// use mixconfig::get_config;
///
/// let config = get_config();
/// println!("HTTP port: {}", config.get_http_port());
/// ```
#[derive(Debug)]
pub struct Config {
    dir: PathBuf,
    file: PathBuf,
    root: Mutex<Value>,
}

impl Config {
    /// Charge la configuration de `directory` (vide : recherche automatique)
    pub fn load_config(directory: &str) -> Result<Self> {
        let dir = location::resolve(directory);
        location::ensure_usable(&dir)?;
        let file = dir.join(CONFIG_FILE);
        info!(config_dir = %dir.display(), "Using config directory");

        let mut root = document::lowercase_keys(serde_yaml::from_str(DEFAULT_CONFIG)?);

        match fs::read_to_string(&file) {
            Ok(text) => {
                let user: Value = serde_yaml::from_str(&text)?;
                document::merge(&mut root, &document::lowercase_keys(user));
                info!(config_file = %file.display(), "Loaded config file");
            }
            Err(_) => {
                info!(config_file = %file.display(), "No config file, using embedded defaults");
            }
        }

        for (path, value) in document::env_overrides(std::env::vars(), ENV_PREFIX) {
            let segments: Vec<&str> = path.iter().map(String::as_str).collect();
            if let Err(e) = document::assign(&mut root, &segments, value) {
                warn!(key = %path.join("."), "Ignoring environment override: {}", e);
            }
        }

        let config = Self {
            dir,
            file,
            root: Mutex::new(root),
        };
        config.save()?;
        Ok(config)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Value>> {
        self.root
            .lock()
            .map_err(|_| anyhow!("Configuration lock poisoned"))
    }

    /// Réécrit `config.yaml`
    pub fn save(&self) -> Result<()> {
        let text = serde_yaml::to_string(&*self.lock()?)?;
        fs::write(&self.file, text)?;
        Ok(())
    }

    /// Répertoire de configuration
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Valeur au bout de `path` (ex. `&["host", "http_port"]`)
    pub fn get_value(&self, path: &[&str]) -> Result<Value> {
        document::lookup(&*self.lock()?, path).cloned()
    }

    /// Remplace la valeur au bout de `path` puis sauvegarde
    pub fn set_value(&self, path: &[&str], value: Value) -> Result<()> {
        document::assign(&mut *self.lock()?, path, value)?;
        self.save()
    }

    /// Chaîne non vide, sinon `default`
    pub fn get_string_or(&self, path: &[&str], default: &str) -> String {
        match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => default.to_string(),
        }
    }

    /// Entier positif, sinon `default`
    pub fn get_u64_or(&self, path: &[&str], default: u64) -> u64 {
        match self.get_value(path) {
            Ok(Value::Number(n)) => n.as_u64().unwrap_or(default),
            Ok(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    pub fn set_u64(&self, path: &[&str], value: u64) -> Result<()> {
        self.set_value(path, Value::Number(Number::from(value)))
    }

    /// Booléen, sinon `default`
    pub fn get_bool_or(&self, path: &[&str], default: bool) -> bool {
        match self.get_value(path) {
            Ok(Value::Bool(b)) => b,
            _ => default,
        }
    }

    /// Répertoire géré par la configuration
    ///
    /// Un chemin relatif est résolu par rapport au répertoire de configuration.
    /// La valeur par défaut est enregistrée si la clé est absente, et le
    /// répertoire est créé s'il n'existe pas.
    ///
    /// ```no_run
    /// use mixconfig::get_config;
    ///
    /// let dir = get_config().get_managed_dir(&["tracks", "directory"], "tracks")?;
    /// println!("Tracks directory: {}", dir.display());
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn get_managed_dir(&self, path: &[&str], default: &str) -> Result<PathBuf> {
        let configured = match self.get_value(path) {
            Ok(Value::String(s)) if !s.is_empty() => s,
            _ => {
                self.set_managed_dir(path, default)?;
                default.to_string()
            }
        };

        let configured = Path::new(&configured);
        let resolved = if configured.is_absolute() {
            configured.to_path_buf()
        } else {
            self.dir.join(configured)
        };

        if !resolved.is_dir() {
            fs::create_dir_all(&resolved)?;
            info!(directory = %resolved.display(), "Created managed directory");
        }
        Ok(resolved)
    }

    pub fn set_managed_dir(&self, path: &[&str], directory: &str) -> Result<()> {
        self.set_value(path, Value::String(directory.to_string()))
    }

    /// Nom d'hôte annoncé dans les logs (default: `localhost`)
    pub fn get_base_url(&self) -> String {
        self.get_string_or(&["host", "base_url"], DEFAULT_BASE_URL)
    }

    /// Port HTTP (default: 8000)
    pub fn get_http_port(&self) -> u16 {
        let raw = self.get_u64_or(&["host", "http_port"], u64::from(DEFAULT_HTTP_PORT));
        u16::try_from(raw).unwrap_or_else(|_| {
            warn!("HTTP port {} out of range, using default {}", raw, DEFAULT_HTTP_PORT);
            DEFAULT_HTTP_PORT
        })
    }

    pub fn set_http_port(&self, port: u16) -> Result<()> {
        self.set_u64(&["host", "http_port"], u64::from(port))
    }

    /// Capacité du buffer circulaire de logs
    pub fn get_log_buffer_capacity(&self) -> usize {
        let raw = self.get_u64_or(
            &["host", "logger", "buffer_capacity"],
            DEFAULT_LOG_BUFFER_CAPACITY as u64,
        );
        usize::try_from(raw).unwrap_or(DEFAULT_LOG_BUFFER_CAPACITY)
    }

    pub fn get_log_min_level(&self) -> String {
        self.get_string_or(&["host", "logger", "min_level"], DEFAULT_LOG_MIN_LEVEL)
    }

    pub fn set_log_min_level(&self, level: &str) -> Result<()> {
        self.set_value(
            &["host", "logger", "min_level"],
            Value::String(level.to_string()),
        )
    }

    pub fn get_log_enable_console(&self) -> bool {
        self.get_bool_or(&["host", "logger", "enable_console"], true)
    }

    pub fn get_cors_enabled(&self) -> bool {
        self.get_bool_or(&["host", "cors", "enabled"], true)
    }

    pub fn set_cors_enabled(&self, enabled: bool) -> Result<()> {
        self.set_value(&["host", "cors", "enabled"], Value::Bool(enabled))
    }
}

/// Configuration globale, chargée au premier accès
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, config)
    }

    #[test]
    fn test_defaults_are_loaded() {
        let (dir, config) = temp_config();
        assert_eq!(config.get_http_port(), DEFAULT_HTTP_PORT);
        assert_eq!(config.get_base_url(), "localhost");
        assert_eq!(config.get_log_buffer_capacity(), 1000);
        assert!(config.get_cors_enabled());
        assert_eq!(config.get_log_min_level(), "INFO");
        assert_eq!(
            config.get_u64_or(&["tracks", "max_upload_size"], 0),
            200 * 1024 * 1024
        );
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_user_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "HOST:\n  Http_Port: 9123\n  cors:\n    enabled: false\n",
        )
        .unwrap();

        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.get_http_port(), 9123);
        assert!(!config.get_cors_enabled());
        // les clés absentes du fichier gardent leur valeur par défaut
        assert_eq!(config.get_log_buffer_capacity(), 1000);
    }

    #[test]
    fn test_empty_user_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(config.get_http_port(), DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_set_value_is_persisted() {
        let (dir, config) = temp_config();
        config.set_http_port(8765).unwrap();

        let reloaded = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(reloaded.get_http_port(), 8765);
    }

    #[test]
    fn test_out_of_range_port_falls_back() {
        let (_dir, config) = temp_config();
        config.set_u64(&["host", "http_port"], 70_000).unwrap();
        assert_eq!(config.get_http_port(), DEFAULT_HTTP_PORT);
    }

    #[test]
    fn test_managed_dir_is_relative_to_config_dir() {
        let (dir, config) = temp_config();
        let managed = config
            .get_managed_dir(&["tracks", "directory"], "tracks")
            .unwrap();
        assert_eq!(managed, dir.path().join("tracks"));
        assert!(managed.is_dir());
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let (_dir, config) = temp_config();
        assert!(config.get_value(&["nope", "missing"]).is_err());
        assert_eq!(config.get_string_or(&["nope"], "fallback"), "fallback");
    }
}
