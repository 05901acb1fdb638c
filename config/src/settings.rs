//! YAML-serializable settings: guard configuration plus backend selection.

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use schema_guard_core::{GuardConfig, is_valid_identifier};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Current settings format version.
pub const SETTINGS_VERSION: &str = "1.0";

/// Backend the guard probes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// A local SQLite database, optionally with prefixed table names.
    Sqlite {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prefix: Option<String>,
    },
    /// A hosted PostgREST endpoint.
    Rest {
        url: String,
        /// Name of the environment variable holding the API key.
        api_key_env: String,
        /// Exposed schema to query (`Accept-Profile`); the server default if unset.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        schema: Option<String>,
    },
}

impl BackendConfig {
    /// Resolves the REST API key from the environment.
    ///
    /// Returns `Ok(None)` for backends that need no key.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnv`] if the variable is unset or empty.
    pub fn api_key(&self) -> Result<Option<String>> {
        match self {
            BackendConfig::Sqlite { .. } => Ok(None),
            BackendConfig::Rest { api_key_env, .. } => match std::env::var(api_key_env) {
                Ok(key) if !key.trim().is_empty() => Ok(Some(key)),
                _ => Err(ConfigError::MissingEnv(api_key_env.clone())),
            },
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match self {
            BackendConfig::Sqlite { path, prefix } => {
                if path.as_os_str().is_empty() {
                    errors.push("sqlite backend path cannot be empty".to_string());
                }
                if let Some(prefix) = prefix {
                    if !prefix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        errors.push(format!("invalid table prefix '{prefix}'"));
                    }
                }
            }
            BackendConfig::Rest {
                url,
                api_key_env,
                schema,
            } => {
                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    errors.push(format!("rest backend url must be http(s): '{url}'"));
                }
                if api_key_env.trim().is_empty() {
                    errors.push("rest backend api_key_env cannot be empty".to_string());
                }
                if let Some(schema) = schema {
                    if !is_valid_identifier(schema) {
                        errors.push(format!("invalid schema name '{schema}'"));
                    }
                }
            }
        }
        errors
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Sqlite {
            path: PathBuf::from("lms.db"),
            prefix: None,
        }
    }
}

/// Top-level settings file.
///
/// # Examples
///
/// ```
/// use schema_guard_config::{BackendConfig, Settings};
///
/// let settings = Settings::from_yaml_str(
///     "version: \"1.0\"\nbackend:\n  kind: sqlite\n  path: dev.db\n",
/// )
/// .unwrap();
/// assert_eq!(settings.guard.required_tables.len(), 6);
/// assert!(matches!(settings.backend, BackendConfig::Sqlite { .. }));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Settings format version (e.g., `"1.0"`).
    pub version: String,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION.to_string(),
            guard: GuardConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from a YAML file and validates them.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IoError`] if the file cannot be read,
    /// [`ConfigError::YamlError`] if parsing fails, or
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let settings: Settings = serde_yaml::from_reader(reader)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses and validates settings from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: Settings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Writes settings to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks the guard and backend sections.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.version.trim().is_empty() {
            errors.push("version cannot be empty".to_string());
        }
        errors.extend(self.guard.validate().iter().map(ToString::to_string));
        errors.extend(self.backend.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema-guard.yaml");

        let mut settings = Settings::default();
        settings.guard = settings
            .guard
            .with_required_column("courses", "thumbnail_url");
        settings.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_rest_backend_yaml() {
        let yaml = r#"
version: "1.0"
guard:
  required_tables: [teams, courses]
  cache_ttl_ms: 30000
backend:
  kind: rest
  url: https://project.example.co
  api_key_env: LMS_SERVICE_KEY
  schema: public
"#;
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.guard.required_tables, ["teams", "courses"]);
        assert_eq!(settings.guard.cache_ttl_ms, 30_000);
        assert!(settings.guard.required_columns.is_empty());
        assert_eq!(
            settings.backend,
            BackendConfig::Rest {
                url: "https://project.example.co".into(),
                api_key_env: "LMS_SERVICE_KEY".into(),
                schema: Some("public".into()),
            }
        );
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        let yaml = r#"
version: "1.0"
guard:
  required_tables: [teams, "drop table"]
  cache_ttl_ms: 0
backend:
  kind: rest
  url: ftp://nope
  api_key_env: ""
"#;
        let err = Settings::from_yaml_str(yaml).unwrap_err();
        let ConfigError::Invalid(messages) = err else {
            panic!("expected Invalid, got {err:?}");
        };
        assert!(messages.iter().any(|m| m.contains("cache_ttl_ms")));
        assert!(messages.iter().any(|m| m.contains("drop table")));
        assert!(messages.iter().any(|m| m.contains("ftp://nope")));
        assert!(messages.iter().any(|m| m.contains("api_key_env")));
    }

    #[test]
    fn test_unknown_backend_kind_is_a_yaml_error() {
        let yaml = "version: \"1.0\"\nbackend:\n  kind: mongo\n";
        assert!(matches!(
            Settings::from_yaml_str(yaml),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_api_key_lookup() {
        let sqlite = BackendConfig::default();
        assert_eq!(sqlite.api_key().unwrap(), None);

        let rest = BackendConfig::Rest {
            url: "https://project.example.co".into(),
            api_key_env: "SCHEMA_GUARD_TEST_KEY_THAT_IS_NEVER_SET".into(),
            schema: None,
        };
        assert!(matches!(rest.api_key(), Err(ConfigError::MissingEnv(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Settings::load("/nonexistent/schema-guard.yaml"),
            Err(ConfigError::IoError(_))
        ));
    }
}
