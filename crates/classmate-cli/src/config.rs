//! Configuration file management for classmate.
//!
//! Provides a TOML-based config file at `~/.config/classmate/config.toml` and
//! a resolution chain: CLI flag > env var > config file > default.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use classmate_core::model::GeminiConfig;
use classmate_db::config::DbConfig;

/// Env vars checked for the model API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_GENAI_API_KEY"];

/// Env var overriding the model name.
pub const MODEL_ENV_VAR: &str = "CLASSMATE_MODEL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfigFile {
    pub database: DatabaseSection,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub server: ServerSection,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub name: String,
    pub base_url: String,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            api_key: None,
            name: GeminiConfig::DEFAULT_MODEL.to_string(),
            base_url: GeminiConfig::DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the classmate config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/classmate` or
/// `~/.config/classmate`, on every platform.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("classmate");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("classmate")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Where `classmate style set` keeps the combined style guide.
pub fn style_guide_path() -> PathBuf {
    config_dir().join("style-guide.md")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix (the file may hold an API key).
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct ClassmateConfig {
    pub db_config: DbConfig,
    pub gemini: GeminiConfig,
    pub server: ServerSection,
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl ClassmateConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - DB URL: `cli_db_url` > `CLASSMATE_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - API key: `GEMINI_API_KEY` > `GOOGLE_GENAI_API_KEY` > `model.api_key` > none
    /// - Model: `CLASSMATE_MODEL` > `model.name` > `GeminiConfig::DEFAULT_MODEL`
    ///
    /// A missing API key is not an error here; model calls report it.
    pub fn resolve(cli_db_url: Option<&str>) -> Result<Self> {
        let file_config = load_config().ok();
        let model_section = file_config.as_ref().map(|c| &c.model);

        let db_url = if let Some(url) = cli_db_url {
            url.to_string()
        } else if let Some(url) = env_non_empty(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let api_key = API_KEY_ENV_VARS
            .iter()
            .find_map(|name| env_non_empty(name))
            .or_else(|| model_section.and_then(|m| m.api_key.clone()));

        let mut gemini = GeminiConfig::new(api_key);
        if let Some(name) = env_non_empty(MODEL_ENV_VAR) {
            gemini.model = name;
        } else if let Some(m) = model_section {
            gemini.model = m.name.clone();
        }
        if let Some(m) = model_section {
            gemini.base_url = m.base_url.clone();
        }

        let server = file_config
            .as_ref()
            .map(|c| c.server.clone())
            .unwrap_or_default();

        Ok(Self {
            db_config: DbConfig::new(db_url),
            gemini,
            server,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point the config dir at a fresh temp dir and clear the override vars.
    fn isolate() -> tempfile::TempDir {
        let tmp = tempfile::TempDir::new().unwrap();
        unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path()) };
        for name in [DbConfig::ENV_VAR, MODEL_ENV_VAR]
            .into_iter()
            .chain(API_KEY_ENV_VARS)
        {
            unsafe { std::env::remove_var(name) };
        }
        tmp
    }

    fn sample_config() -> ConfigFile {
        ConfigFile {
            database: DatabaseSection {
                url: "postgresql://filehost:5432/filedb".to_string(),
            },
            model: ModelSection {
                api_key: Some("file-key".to_string()),
                name: "gemini-file".to_string(),
                base_url: "http://localhost:8089".to_string(),
            },
            server: ServerSection {
                bind: "0.0.0.0".to_string(),
                port: 8080,
            },
        }
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let cfg: ConfigFile = toml::from_str("[database]\nurl = \"postgresql://x/y\"\n").unwrap();
        assert_eq!(cfg.model.name, GeminiConfig::DEFAULT_MODEL);
        assert_eq!(cfg.model.api_key, None);
        assert_eq!(cfg.server, ServerSection::default());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let _lock = lock_env();
        let _tmp = isolate();

        save_config(&sample_config()).unwrap();
        let loaded = load_config().unwrap();
        assert_eq!(loaded.database.url, "postgresql://filehost:5432/filedb");
        assert_eq!(loaded.model.api_key.as_deref(), Some("file-key"));
        assert_eq!(loaded.server.port, 8080);

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let _tmp = isolate();

        save_config(&sample_config()).unwrap();
        let meta = std::fs::metadata(config_path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
    }

    #[test]
    fn resolve_uses_file_when_no_env() {
        let _lock = lock_env();
        let _tmp = isolate();
        save_config(&sample_config()).unwrap();

        let config = ClassmateConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://filehost:5432/filedb");
        assert_eq!(config.gemini.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.gemini.model, "gemini-file");
        assert_eq!(config.gemini.base_url, "http://localhost:8089");
        assert_eq!(config.server.bind, "0.0.0.0");

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
    }

    #[test]
    fn resolve_env_overrides_file_and_cli_overrides_env() {
        let _lock = lock_env();
        let _tmp = isolate();
        save_config(&sample_config()).unwrap();

        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var("GOOGLE_GENAI_API_KEY", "google-key") };
        unsafe { std::env::set_var(MODEL_ENV_VAR, "gemini-env") };

        let config = ClassmateConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(config.gemini.api_key.as_deref(), Some("google-key"));
        assert_eq!(config.gemini.model, "gemini-env");

        unsafe { std::env::set_var("GEMINI_API_KEY", "gemini-key") };
        let config = ClassmateConfig::resolve(Some("postgresql://cli:5432/clidb")).unwrap();
        assert_eq!(config.db_config.database_url, "postgresql://cli:5432/clidb");
        assert_eq!(config.gemini.api_key.as_deref(), Some("gemini-key"));

        let _cleanup = isolate();
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        let _tmp = isolate();

        let config = ClassmateConfig::resolve(None).unwrap();
        assert_eq!(config.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model, GeminiConfig::DEFAULT_MODEL);
        assert_eq!(config.server, ServerSection::default());

        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
    }

    #[test]
    fn paths_end_with_expected_filenames() {
        let _lock = lock_env();
        let _tmp = isolate();
        assert!(config_path().ends_with("classmate/config.toml"));
        assert!(style_guide_path().ends_with("classmate/style-guide.md"));
        unsafe { std::env::remove_var("XDG_CONFIG_HOME") };
    }
}
