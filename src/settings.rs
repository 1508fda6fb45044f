// Settings loader: layers the base settings file, an optional
// environment-specific file, `COSMOS_*` environment variables and, when
// running in development, a per-user secrets file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Base settings file, looked up in the working directory.
pub const SETTINGS_FILE: &str = "appsettings.json";
/// Variable naming the running environment (`development` when unset).
pub const ENVIRONMENT_VAR: &str = "COSMOS_DEMOS_ENVIRONMENT";
const DEFAULT_ENVIRONMENT: &str = "development";
const ENV_PREFIX: &str = "COSMOS";
const SECRETS_DIR: &str = "cosmos-demos";
const SECRETS_FILE: &str = "secrets.json";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings file {} not found", .0.display())]
    MissingFile(PathBuf),

    #[error("could not determine the working directory")]
    WorkingDir(#[source] std::io::Error),

    #[error("failed to load settings")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub account: AccountSettings,
}

/// Connection settings for the database account.
#[derive(Clone, Deserialize)]
pub struct AccountSettings {
    pub endpoint: String,
    pub master_key: String,
}

impl std::fmt::Debug for AccountSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSettings")
            .field("endpoint", &self.endpoint)
            .field("master_key", &"***")
            .finish()
    }
}

/// Where settings come from. `from_process` describes the real process;
/// tests build their own.
#[derive(Debug, Clone)]
pub struct SettingsSources {
    pub base_dir: PathBuf,
    pub environment: Option<String>,
    pub secrets_file: Option<PathBuf>,
    /// Variables to read instead of the process environment.
    pub variables: Option<HashMap<String, String>>,
}

impl SettingsSources {
    pub fn from_process() -> std::io::Result<Self> {
        Ok(Self {
            base_dir: std::env::current_dir()?,
            environment: std::env::var(ENVIRONMENT_VAR).ok().filter(|v| !v.is_empty()),
            secrets_file: dirs::config_dir().map(|dir| dir.join(SECRETS_DIR).join(SECRETS_FILE)),
            variables: None,
        })
    }

    /// Environment name, `development` when unset.
    pub fn environment_name(&self) -> &str {
        self.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT)
    }

    /// Unset or `development` (any case) counts as development.
    pub fn is_development(&self) -> bool {
        self.environment_name().eq_ignore_ascii_case(DEFAULT_ENVIRONMENT)
    }
}

impl Settings {
    /// Load settings for the current process.
    pub fn load() -> Result<Self, SettingsError> {
        let sources = SettingsSources::from_process().map_err(SettingsError::WorkingDir)?;
        Self::load_from(&sources)
    }

    pub fn load_from(sources: &SettingsSources) -> Result<Self, SettingsError> {
        let base = sources.base_dir.join(SETTINGS_FILE);
        if !base.is_file() {
            return Err(SettingsError::MissingFile(base));
        }

        let mut builder = Config::builder().add_source(json_file(&base, true));

        let overrides = sources
            .base_dir
            .join(format!("appsettings.{}.json", sources.environment_name()));
        builder = builder.add_source(json_file(&overrides, false));

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(sources.variables.clone()),
        );

        if sources.is_development() {
            if let Some(secrets) = &sources.secrets_file {
                debug!(path = %secrets.display(), "layering user secrets");
                builder = builder.add_source(json_file(secrets, false));
            }
        }

        let settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }
}

fn json_file(path: &Path, required: bool) -> impl config::Source + Send + Sync + 'static {
    File::from(path).format(FileFormat::Json).required(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const BASE: &str = r#"{
        "account": {
            "endpoint": "https://base.documents.azure.com:443/",
            "master_key": "YmFzZQ=="
        }
    }"#;

    fn sources(dir: &TempDir) -> SettingsSources {
        SettingsSources {
            base_dir: dir.path().to_path_buf(),
            environment: Some("production".into()),
            secrets_file: None,
            variables: Some(HashMap::new()),
        }
    }

    #[test]
    fn loads_base_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), BASE).unwrap();

        let settings = Settings::load_from(&sources(&dir)).unwrap();

        assert_eq!(settings.account.endpoint, "https://base.documents.azure.com:443/");
        assert_eq!(settings.account.master_key, "YmFzZQ==");
    }

    #[test]
    fn missing_base_file_fails() {
        let dir = TempDir::new().unwrap();

        let err = Settings::load_from(&sources(&dir)).unwrap_err();

        assert!(matches!(err, SettingsError::MissingFile(_)));
        assert!(err.to_string().contains("appsettings.json"));
    }

    #[test]
    fn malformed_base_file_fails() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), "{ not json").unwrap();

        let err = Settings::load_from(&sources(&dir)).unwrap_err();

        assert!(matches!(err, SettingsError::Load(_)));
    }

    #[test]
    fn missing_keys_fail() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), r#"{ "account": { "endpoint": "https://x/" } }"#).unwrap();

        assert!(Settings::load_from(&sources(&dir)).is_err());
    }

    #[test]
    fn environment_file_overrides_base() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), BASE).unwrap();
        fs::write(
            dir.path().join("appsettings.production.json"),
            r#"{ "account": { "endpoint": "https://prod.documents.azure.com:443/" } }"#,
        )
        .unwrap();

        let settings = Settings::load_from(&sources(&dir)).unwrap();

        assert_eq!(settings.account.endpoint, "https://prod.documents.azure.com:443/");
        assert_eq!(settings.account.master_key, "YmFzZQ==");
    }

    #[test]
    fn unset_environment_layers_development_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), BASE).unwrap();
        fs::write(
            dir.path().join("appsettings.development.json"),
            r#"{ "account": { "endpoint": "https://localhost:8081/" } }"#,
        )
        .unwrap();
        let mut sources = sources(&dir);
        sources.environment = None;

        let settings = Settings::load_from(&sources).unwrap();

        assert_eq!(sources.environment_name(), "development");
        assert_eq!(settings.account.endpoint, "https://localhost:8081/");
        assert_eq!(settings.account.master_key, "YmFzZQ==");
    }

    #[test]
    fn environment_variables_override_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), BASE).unwrap();
        let mut sources = sources(&dir);
        sources.variables = Some(HashMap::from([(
            "COSMOS_ACCOUNT__MASTER_KEY".to_string(),
            "ZW52".to_string(),
        )]));

        let settings = Settings::load_from(&sources).unwrap();

        assert_eq!(settings.account.master_key, "ZW52");
    }

    #[test]
    fn secrets_only_apply_in_development() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(SETTINGS_FILE), BASE).unwrap();
        let secrets = dir.path().join("secrets.json");
        fs::write(&secrets, r#"{ "account": { "master_key": "c2VjcmV0" } }"#).unwrap();

        let mut sources = sources(&dir);
        sources.secrets_file = Some(secrets);
        assert_eq!(Settings::load_from(&sources).unwrap().account.master_key, "YmFzZQ==");

        sources.environment = None;
        assert!(sources.is_development());
        assert_eq!(Settings::load_from(&sources).unwrap().account.master_key, "c2VjcmV0");
    }

    #[test]
    fn development_check_ignores_case() {
        let dir = TempDir::new().unwrap();
        let mut sources = sources(&dir);
        sources.environment = Some("Development".into());
        assert!(sources.is_development());
        sources.environment = Some("staging".into());
        assert!(!sources.is_development());
    }

    #[test]
    fn debug_output_hides_the_key() {
        let account = AccountSettings {
            endpoint: "https://x/".into(),
            master_key: "c2VjcmV0".into(),
        };
        assert!(!format!("{account:?}").contains("c2VjcmV0"));
    }
}
