//! Configuration loader using figment.
//!
//! # Configuration Priority (lowest to highest)
//!
//! 1. Built-in defaults
//! 2. Config file (`whodat.toml` from the search paths, or an explicit file)
//! 3. Environment variables (`WHODAT_*`)
//! 4. Programmatic overrides ([`ConfigLoader::set`]), e.g. command-line flags
//!
//! # Environment Variable Mapping
//!
//! Environment variables are mapped using the `WHODAT_` prefix with `__` as separator:
//!
//! - `WHODAT_BOT__TOKEN=123:abc` → `bot.token = "123:abc"`
//! - `WHODAT_WEBHOOK__PORT=8080` → `webhook.port = 8080`
//! - `WHODAT_LOGGING__LEVEL=debug` → `logging.level = "debug"`
//!
//! # Example
//!
//! ```rust,ignore
//! use whodat_runtime::config::ConfigLoader;
//!
//! let config = ConfigLoader::new()
//!     .file("./deploy/whodat.toml")
//!     .set("webhook.port", 8443)
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::Serialize;
use tracing::{debug, info, trace};

use super::error::{ConfigError, ConfigResult};
use super::schema::WhoDatConfig;

/// Prefix of environment variables read by the loader.
pub const ENV_PREFIX: &str = "WHODAT_";

/// File names looked up in every search path, in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["whodat.toml", "config.toml"];

/// Configuration loader with figment-based multi-source support.
pub struct ConfigLoader {
    /// Overrides merged on top of every other source.
    overrides: Figment,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a new configuration loader with defaults.
    pub fn new() -> Self {
        Self {
            overrides: Figment::new(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
        }
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("whodat"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load.
    ///
    /// The file must exist; search paths are ignored.
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Overrides a single value by its dotted key path.
    ///
    /// Overrides win over every other source.
    ///
    /// ```rust,ignore
    /// let loader = ConfigLoader::new()
    ///     .set("bot.token", "123:abc")
    ///     .set("logging.level", "debug");
    /// ```
    pub fn set<T: Serialize>(mut self, key: &str, value: T) -> Self {
        self.overrides = self.overrides.merge(Serialized::default(key, value));
        self
    }

    /// Like [`set`](Self::set), skipping `None`.
    pub fn set_opt<T: Serialize>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(key, value),
            None => self,
        }
    }

    /// Loads and returns the configuration.
    pub fn load(self) -> ConfigResult<WhoDatConfig> {
        let figment = self.build_figment()?;
        let config: WhoDatConfig = figment.extract()?;

        debug!(
            logging_level = %config.logging.level,
            webhook_port = config.webhook.port,
            "Configuration loaded successfully"
        );

        Ok(config)
    }

    /// Builds the figment instance with all sources.
    fn build_figment(self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(WhoDatConfig::default()));

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(ConfigError::FileNotFound(path.clone()));
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
                return Err(ConfigError::UnsupportedFormat(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else if let Some(path) = self.find_config_file() {
            info!(path = %path.display(), "Loading configuration file");
            figment = figment.merge(Toml::file(path));
        } else {
            debug!("No configuration file found");
        }

        if self.load_env {
            trace!(prefix = ENV_PREFIX, "Loading environment variables");
            figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        }

        Ok(figment.merge(self.overrides))
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if !self.search_paths.is_empty() {
            return self.search_paths.clone();
        }

        Self::new()
            .with_current_dir()
            .with_user_config_dir()
            .search_paths
    }

    /// Returns the first existing config file over `search_paths × CONFIG_FILE_NAMES`.
    fn find_config_file(&self) -> Option<PathBuf> {
        self.resolve_search_paths()
            .into_iter()
            .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
            .find(|path| path.exists())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|err| err.to_string())?;

            assert_eq!(config.logging.level.as_str(), "info");
            assert_eq!(config.webhook.port, 0);
            Ok(())
        });
    }

    #[test]
    fn test_file_env_and_override_priority() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "whodat.toml",
                r#"
                [bot]
                token = "from-file"

                [webhook]
                port = 8080
                secret = "file-secret"
                "#,
            )?;
            jail.set_env("WHODAT_WEBHOOK__PORT", "9090");
            jail.set_env("WHODAT_LOGGING__LEVEL", "debug");

            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .set("webhook.secret", "cli-secret")
                .load()
                .map_err(|err| err.to_string())?;

            assert_eq!(config.bot.token, "from-file");
            assert_eq!(config.webhook.port, 9090);
            assert_eq!(config.webhook.secret, "cli-secret");
            assert_eq!(config.logging.level, LogLevel::Debug);
            Ok(())
        });
    }

    #[test]
    fn test_current_dir_search_path() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[webhook]\nport = 7070\n")?;

            let config = ConfigLoader::new()
                .with_current_dir()
                .without_env()
                .load()
                .map_err(|err| err.to_string())?;

            assert_eq!(config.webhook.port, 7070);
            Ok(())
        });
    }

    #[test]
    fn test_user_config_dir_search_path() {
        let loader = ConfigLoader::new().with_user_config_dir();

        match dirs::config_dir() {
            Some(dir) => assert_eq!(loader.search_paths, vec![dir.join("whodat")]),
            None => assert!(loader.search_paths.is_empty()),
        }
    }

    #[test]
    fn test_set_opt_skips_none() {
        Jail::expect_with(|jail| {
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .set("webhook.port", 8443)
                .set_opt::<u16>("webhook.port", None)
                .load()
                .map_err(|err| err.to_string())?;

            assert_eq!(config.webhook.port, 8443);
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_exist() {
        Jail::expect_with(|jail| {
            let result = ConfigLoader::new()
                .file(jail.directory().join("missing.toml"))
                .load();

            assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_must_be_toml() {
        Jail::expect_with(|jail| {
            jail.create_file("whodat.yaml", "bot: {}")?;
            let result = ConfigLoader::new()
                .file(jail.directory().join("whodat.yaml"))
                .load();

            assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
            Ok(())
        });
    }

    #[test]
    fn test_env_is_ignored_when_disabled() {
        Jail::expect_with(|jail| {
            jail.set_env("WHODAT_BOT__TOKEN", "from-env");
            let config = ConfigLoader::new()
                .search_path(jail.directory())
                .without_env()
                .load()
                .map_err(|err| err.to_string())?;

            assert!(config.bot.token.is_empty());
            Ok(())
        });
    }
}
