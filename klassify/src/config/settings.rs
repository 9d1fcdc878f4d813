//! Configuration settings for klassify

use config::{Config, Environment, Map};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::defaults;
use crate::error::{KlassifyError, Result};

/// Values given explicitly on the command line.
///
/// `None` (or `false`) means the flag was not given and the lower layers decide.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub out: Option<PathBuf>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub server: Option<String>,
    pub database: Option<String>,
    pub timeout: Option<u64>,
    pub query: Option<PathBuf>,
    pub extension: Option<String>,
    pub include: Option<String>,
    pub exclude: Option<String>,
    pub dry_run: bool,
    pub log_level: Option<String>,
}

/// Merged layers before validation. Keys match the `KLASSIFY_*` suffixes.
#[derive(Debug, Deserialize)]
struct Settings {
    #[serde(default = "default_out")]
    out: PathBuf,

    #[serde(default)]
    user: Option<String>,

    #[serde(default)]
    password: Option<String>,

    #[serde(default = "default_server")]
    server: String,

    #[serde(default)]
    database: Option<String>,

    #[serde(default = "default_timeout")]
    timeout: u64,

    #[serde(default)]
    query: Option<PathBuf>,

    #[serde(default = "default_extension")]
    extension: String,

    #[serde(default = "default_include_tables")]
    include: String,

    #[serde(default = "default_exclude_tables")]
    exclude: String,

    #[serde(default = "default_dry_run")]
    dry_run: bool,

    /// Log level (trace, debug, info, warn, error).
    /// Can be overridden by RUST_LOG env var
    #[serde(default)]
    log_level: Option<String>,
}

// Default value functions for serde
fn default_out() -> PathBuf {
    PathBuf::from(defaults::OUT)
}
fn default_server() -> String {
    defaults::SERVER.to_string()
}
fn default_timeout() -> u64 {
    defaults::TIMEOUT
}
fn default_extension() -> String {
    defaults::EXTENSION.to_string()
}
fn default_include_tables() -> String {
    defaults::INCLUDE_TABLES.to_string()
}
fn default_exclude_tables() -> String {
    defaults::EXCLUDE_TABLES.to_string()
}
fn default_dry_run() -> bool {
    defaults::DRY_RUN
}

/// SQL Server login. Only present when both halves were configured.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("password", &"***")
            .finish()
    }
}

/// Resolved, validated configuration for one run
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Directory generated files are written to
    pub output_directory: PathBuf,

    /// SQL Server login; `None` selects integrated authentication
    pub credentials: Option<Credentials>,

    /// Server as `host`, `host,port` or `tcp:host,port`
    pub server: String,

    /// Catalog whose base tables are generated. Never empty.
    pub database: String,

    /// Connect timeout in seconds; 0 waits indefinitely
    pub connection_timeout_secs: u64,

    /// Replacement generation template
    pub query_file: Option<PathBuf>,

    /// Extension of generated files, without the leading dot
    pub extension: String,

    /// Tables to include (comma-separated, or "*" for all)
    pub include_tables: String,

    /// Tables to exclude (comma-separated)
    pub exclude_tables: String,

    /// Report what would be written without touching the output directory
    pub dry_run: bool,

    pub log_level: Option<String>,
}

/// Outcome of looking for the environment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvFileStatus {
    Loaded(PathBuf),
    Missing(PathBuf),
}

impl Configuration {
    /// Resolve configuration from the process environment and an optional env file.
    ///
    /// The env file is read without being injected into the process environment,
    /// so its values can outrank real environment variables.
    pub fn load(overrides: &Overrides, env_file: &Path) -> Result<(Self, EnvFileStatus)> {
        let (file_values, status) = match read_env_file(env_file)? {
            Some(values) => (Some(values), EnvFileStatus::Loaded(env_file.to_path_buf())),
            None => (None, EnvFileStatus::Missing(env_file.to_path_buf())),
        };
        let config = Self::resolve(overrides, file_values.as_ref(), &process_env())?;
        Ok((config, status))
    }

    /// Merge the layers, highest precedence first: `overrides`, `env_file`,
    /// `env_vars`, built-in defaults. Blank values at any layer count as unset.
    pub fn resolve(
        overrides: &Overrides,
        env_file: Option<&Map<String, String>>,
        env_vars: &Map<String, String>,
    ) -> Result<Self> {
        let layer = |values: &Map<String, String>| {
            Environment::with_prefix(defaults::ENV_PREFIX).source(Some(non_blank(values)))
        };

        let mut builder = Config::builder().add_source(layer(env_vars));
        if let Some(file) = env_file {
            builder = builder.add_source(layer(file));
        }

        let settings: Settings = builder
            .set_override_option("out", path_override(&overrides.out))?
            .set_override_option("user", text_override(&overrides.user))?
            .set_override_option("password", text_override(&overrides.password))?
            .set_override_option("server", text_override(&overrides.server))?
            .set_override_option("database", text_override(&overrides.database))?
            .set_override_option("timeout", overrides.timeout.map(|t| t.to_string()))?
            .set_override_option("query", path_override(&overrides.query))?
            .set_override_option("extension", text_override(&overrides.extension))?
            .set_override_option("include", text_override(&overrides.include))?
            .set_override_option("exclude", text_override(&overrides.exclude))?
            .set_override_option("dry_run", overrides.dry_run.then_some(true))?
            .set_override_option("log_level", text_override(&overrides.log_level))?
            .build()?
            .try_deserialize()?;

        Self::from_settings(settings)
    }

    /// Connect timeout, or `None` to wait indefinitely
    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connection_timeout_secs > 0)
            .then(|| Duration::from_secs(self.connection_timeout_secs))
    }
}

impl Configuration {
    fn from_settings(settings: Settings) -> Result<Self> {
        let database = present(settings.database).ok_or_else(|| {
            KlassifyError::ConfigError(
                "One or more of these required parameters not set: database".into(),
            )
        })?;

        let non_blank_secret = |v: Option<String>| v.filter(|v| !v.trim().is_empty());
        let credentials = match (
            non_blank_secret(settings.user),
            non_blank_secret(settings.password),
        ) {
            (Some(user_id), Some(password)) => Some(Credentials { user_id, password }),
            _ => None,
        };

        let extension = settings.extension.trim().trim_start_matches('.').to_string();
        if extension.is_empty() {
            return Err(KlassifyError::ConfigError("extension must not be empty".into()));
        }
        if extension.contains(['/', '\\']) {
            return Err(KlassifyError::ConfigError(format!(
                "extension must not contain path separators: {}",
                extension
            )));
        }

        Ok(Self {
            output_directory: settings.out,
            credentials,
            server: settings.server.trim().to_string(),
            database,
            connection_timeout_secs: settings.timeout,
            query_file: settings.query,
            extension,
            include_tables: settings.include,
            exclude_tables: settings.exclude,
            dry_run: settings.dry_run,
            log_level: present(settings.log_level),
        })
    }
}

/// Read `KEY=value` pairs from an env file. `Ok(None)` when the file does not exist.
fn read_env_file(path: &Path) -> Result<Option<Map<String, String>>> {
    let iter = match dotenvy::from_path_iter(path) {
        Ok(iter) => iter,
        Err(dotenvy::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(None)
        }
        Err(e) => {
            return Err(KlassifyError::ConfigError(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let mut values = Map::new();
    for item in iter {
        let (key, value) = item.map_err(|e| {
            KlassifyError::ConfigError(format!("Failed to parse {}: {}", path.display(), e))
        })?;
        values.insert(key, value);
    }
    Ok(Some(values))
}

fn process_env() -> Map<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

fn non_blank(values: &Map<String, String>) -> Map<String, String> {
    values
        .iter()
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn text_override(value: &Option<String>) -> Option<String> {
    value.clone().filter(|v| !v.trim().is_empty())
}

fn path_override(value: &Option<PathBuf>) -> Option<String> {
    value
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned())
        .filter(|p| !p.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Map<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn with_database() -> Overrides {
        Overrides {
            database: Some("Sales".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Configuration::resolve(&with_database(), None, &Map::new()).unwrap();
        assert_eq!(config.output_directory, PathBuf::from("."));
        assert_eq!(config.server, "localhost");
        assert_eq!(config.connection_timeout_secs, 30);
        assert_eq!(config.extension, "cs");
        assert_eq!(config.include_tables, "*");
        assert!(config.credentials.is_none());
        assert!(config.query_file.is_none());
        assert!(!config.dry_run);
    }

    #[test]
    fn test_missing_database() {
        let err = Configuration::resolve(&Overrides::default(), None, &Map::new()).unwrap_err();
        assert!(matches!(err, KlassifyError::ConfigError(_)));

        let blank = Overrides {
            database: Some("   ".into()),
            ..Default::default()
        };
        let env = vars(&[("KLASSIFY_DATABASE", "")]);
        assert!(Configuration::resolve(&blank, Some(&env), &env).is_err());
    }

    #[test]
    fn test_cli_beats_environment() {
        let overrides = Overrides {
            server: Some("clihost".into()),
            ..with_database()
        };
        let env = vars(&[("KLASSIFY_SERVER", "envhost")]);
        let config = Configuration::resolve(&overrides, None, &env).unwrap();
        assert_eq!(config.server, "clihost");
    }

    #[test]
    fn test_env_file_beats_process_env() {
        let file = vars(&[("KLASSIFY_SERVER", "filehost"), ("KLASSIFY_DATABASE", "Sales")]);
        let env = vars(&[("KLASSIFY_SERVER", "envhost"), ("KLASSIFY_TIMEOUT", "5")]);
        let config = Configuration::resolve(&Overrides::default(), Some(&file), &env).unwrap();
        assert_eq!(config.server, "filehost");
        assert_eq!(config.database, "Sales");
        assert_eq!(config.connection_timeout_secs, 5);
    }

    #[test]
    fn test_blank_values_fall_through() {
        let file = vars(&[("KLASSIFY_SERVER", "  ")]);
        let env = vars(&[("KLASSIFY_SERVER", "envhost")]);
        let overrides = Overrides {
            server: Some(String::new()),
            ..with_database()
        };
        let config = Configuration::resolve(&overrides, Some(&file), &env).unwrap();
        assert_eq!(config.server, "envhost");
    }

    #[test]
    fn test_credentials_need_both_halves() {
        let env = vars(&[("KLASSIFY_USER", "sa")]);
        let config = Configuration::resolve(&with_database(), None, &env).unwrap();
        assert!(config.credentials.is_none());

        let env = vars(&[("KLASSIFY_USER", "sa"), ("KLASSIFY_PASSWORD", "007")]);
        let config = Configuration::resolve(&with_database(), None, &env).unwrap();
        let credentials = config.credentials.unwrap();
        assert_eq!(credentials.user_id, "sa");
        assert_eq!(credentials.password, "007");
        assert!(!format!("{:?}", credentials).contains("007"));
    }

    #[test]
    fn test_invalid_timeout() {
        let env = vars(&[("KLASSIFY_TIMEOUT", "soon")]);
        let err = Configuration::resolve(&with_database(), None, &env).unwrap_err();
        assert!(matches!(err, KlassifyError::ConfigError(_)));
    }

    #[test]
    fn test_zero_timeout_waits_indefinitely() {
        let overrides = Overrides {
            timeout: Some(0),
            ..with_database()
        };
        let config = Configuration::resolve(&overrides, None, &Map::new()).unwrap();
        assert!(config.connect_timeout().is_none());
    }

    #[test]
    fn test_extension_normalized() {
        let overrides = Overrides {
            extension: Some(".ts".into()),
            ..with_database()
        };
        let config = Configuration::resolve(&overrides, None, &Map::new()).unwrap();
        assert_eq!(config.extension, "ts");

        let overrides = Overrides {
            extension: Some("a/b".into()),
            ..with_database()
        };
        assert!(Configuration::resolve(&overrides, None, &Map::new()).is_err());
    }

    #[test]
    fn test_unrelated_variables_ignored() {
        let env = vars(&[("PATH", "/usr/bin"), ("KLASSIFY_DATABASE", "Sales")]);
        let config = Configuration::resolve(&Overrides::default(), None, &env).unwrap();
        assert_eq!(config.database, "Sales");
    }

    #[test]
    fn test_load_missing_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let (config, status) = Configuration::load(&with_database(), &path).unwrap();
        assert_eq!(config.database, "Sales");
        assert_eq!(status, EnvFileStatus::Missing(path));
    }

    #[test]
    fn test_load_env_file_with_comments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "# generated classes\nKLASSIFY_DATABASE=Inventory\nKLASSIFY_OUT=./gen\n",
        )
        .unwrap();
        let (config, status) = Configuration::load(&Overrides::default(), &path).unwrap();
        assert_eq!(config.database, "Inventory");
        assert_eq!(config.output_directory, PathBuf::from("./gen"));
        assert_eq!(status, EnvFileStatus::Loaded(path));
    }
}
