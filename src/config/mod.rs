use crate::models::SplashSettings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// File name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "splash.yaml";

/// Prefix for environment variable overrides, e.g. `BOOTSPLASH__MAX_PATH_LEN`
pub const ENV_PREFIX: &str = "BOOTSPLASH";

/// Configuration manager for loading and saving splash settings.
///
/// Settings are layered: built-in defaults, then `splash.yaml`, then
/// `BOOTSPLASH__*` environment variables (nested keys use `__`, e.g.
/// `BOOTSPLASH__LOGGING__DEBUG=true`).
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing `splash.yaml`; created if missing
    ///
    /// # Returns
    /// A new ConfigManager instance
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load settings from file and environment.
    ///
    /// # Returns
    /// The merged settings; defaults fill every key neither layer provides
    pub fn load(&self) -> Result<SplashSettings> {
        self.load_layered(Environment::with_prefix(ENV_PREFIX))
    }

    fn load_layered(&self, environment: Environment) -> Result<SplashSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let merged = Config::builder()
            .add_source(
                File::from(self.settings_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(environment.separator("__").try_parsing(true))
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let settings: SplashSettings = merged
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        tracing::info!(
            "Loaded splash settings: max_path_len={}, thread_name={}",
            settings.max_path_len,
            settings.thread_name
        );
        Ok(settings)
    }

    /// Save settings to `splash.yaml`.
    ///
    /// # Arguments
    /// * `settings` - The settings to save
    pub fn save(&self, settings: &SplashSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved splash settings to {}", self.settings_path);
        Ok(())
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    fn fake_env(vars: &[(&str, &str)]) -> Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::with_prefix(ENV_PREFIX).source(Some(map))
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        let settings = manager.load_layered(fake_env(&[])).unwrap();
        assert_eq!(settings, SplashSettings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.settings_path(), "thread_name: splash\nlogging:\n  debug: true\n").unwrap();

        let settings = manager.load_layered(fake_env(&[])).unwrap();

        assert_eq!(settings.thread_name, "splash");
        assert!(settings.logging.debug);
        assert_eq!(settings.logging.prefix, "bootsplash");
        assert_eq!(settings.status_variable, "status_text");
    }

    #[test]
    fn test_environment_overrides_file() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.settings_path(), "max_path_len: 512\n").unwrap();

        let settings = manager
            .load_layered(fake_env(&[
                ("BOOTSPLASH__MAX_PATH_LEN", "128"),
                ("BOOTSPLASH__LOGGING__CONSOLE", "true"),
            ]))
            .unwrap();

        assert_eq!(settings.max_path_len, 128);
        assert!(settings.logging.console);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.settings_path(), "max_path_len: [not, a, number]\n").unwrap();

        assert!(manager.load_layered(fake_env(&[])).is_err());
    }
}
