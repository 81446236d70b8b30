//! Configuration management for tierbox
//!
//! Resolves the global defaults (bootstrapped on first use) and the
//! project's `tierbox.toml` into one [`EffectiveConfig`].

pub mod schema;

pub use schema::{
    EffectiveConfig, GlobalConfig, InstallBlock, PortMapping, ProjectConfig, ProjectSection,
    VolumeMount,
};

use crate::error::{TierboxError, TierboxResult};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Name of the project configuration file
pub const PROJECT_FILE: &str = "tierbox.toml";

/// Where a project configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Last modification time; part of the image fingerprint
    pub modified: DateTime<Utc>,
}

/// Effective configuration plus its source
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: EffectiveConfig,
    pub source: ConfigSource,
}

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom global config path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default global config file path
    pub fn default_config_path() -> PathBuf {
        xdg_dir("XDG_CONFIG_HOME", dirs::config_dir(), &[".config"])
            .join("tierbox")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        xdg_dir("XDG_STATE_HOME", dirs::state_dir(), &[".local", "state"]).join("tierbox")
    }

    /// Directory holding one build-state record per project
    pub fn image_state_dir() -> PathBuf {
        Self::state_dir().join("images")
    }

    /// Get the cache directory path (build contexts)
    pub fn cache_dir() -> PathBuf {
        xdg_dir("XDG_CACHE_HOME", dirs::cache_dir(), &[".cache"]).join("tierbox")
    }

    /// Project configuration path inside a directory
    pub fn project_config_path(dir: &Path) -> PathBuf {
        dir.join(PROJECT_FILE)
    }

    /// Get the global config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Write the default global config if none exists.
    ///
    /// Returns `true` when a file was created.
    pub async fn ensure_global(&self) -> TierboxResult<bool> {
        if self.config_path.exists() {
            return Ok(false);
        }

        self.ensure_config_dir().await?;
        fs::write(&self.config_path, schema::GLOBAL_TEMPLATE)
            .await
            .map_err(|e| {
                TierboxError::io(
                    format!("writing config to {}", self.config_path.display()),
                    e,
                )
            })?;

        info!("Created global config at {}", self.config_path.display());
        Ok(true)
    }

    /// Load the global configuration, creating it on first use
    pub async fn load_global(&self) -> TierboxResult<GlobalConfig> {
        self.ensure_global().await?;

        let content = fs::read_to_string(&self.config_path).await.map_err(|e| {
            TierboxError::io(
                format!("reading config from {}", self.config_path.display()),
                e,
            )
        })?;

        toml::from_str(&content).map_err(|e| TierboxError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: e.to_string(),
        })
    }

    /// Load a project configuration file
    pub async fn load_project(path: &Path) -> TierboxResult<ProjectConfig> {
        if !path.exists() {
            return Err(TierboxError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| TierboxError::io(format!("reading config from {}", path.display()), e))?;

        let config: ProjectConfig =
            toml::from_str(&content).map_err(|e| TierboxError::ConfigInvalid {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        validate_project_name(&config.project.name).map_err(|reason| {
            TierboxError::ConfigInvalid {
                path: path.to_path_buf(),
                reason,
            }
        })?;

        if config.install.len() > 1 {
            warn!(
                "{}: only the first [[install]] block is used, {} more ignored",
                path.display(),
                config.install.len() - 1
            );
        }

        Ok(config)
    }

    /// Resolve the effective configuration for a project directory
    pub async fn resolve(
        project_dir: &Path,
        global: &GlobalConfig,
    ) -> TierboxResult<ResolvedConfig> {
        let path = Self::project_config_path(project_dir);
        let project = Self::load_project(&path).await?;
        let modified = modified_time(&path).await?;

        let config = EffectiveConfig::merge(&project, global);
        debug!(
            "Resolved config for {}: agent={}, envs={:?}, {} package(s)",
            config.project_name,
            config.agent,
            config.envs,
            config.packages.len()
        );

        Ok(ResolvedConfig {
            config,
            source: ConfigSource { path, modified },
        })
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> TierboxResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TierboxError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a project name can be used as an image repository component
pub fn validate_project_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("project.name must be set".to_string());
    }

    let mut chars = name.chars();
    let first_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let rest_ok = chars.all(|c| {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '_' || c == '-'
    });

    if first_ok && rest_ok {
        Ok(())
    } else {
        Err(format!(
            "project.name '{}' must be lowercase letters, digits, '.', '_' or '-'",
            name
        ))
    }
}

/// Turn an arbitrary directory name into a valid project name
pub fn project_name_from_dir(dir: &Path) -> String {
    let raw = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches(&['.', '_', '-'][..]).to_string();

    if cleaned.is_empty() {
        "my-project".to_string()
    } else {
        cleaned
    }
}

async fn modified_time(path: &Path) -> TierboxResult<DateTime<Utc>> {
    let metadata = fs::metadata(path)
        .await
        .map_err(|e| TierboxError::io(format!("reading metadata of {}", path.display()), e))?;

    match metadata.modified() {
        Ok(time) => Ok(DateTime::<Utc>::from(time)),
        Err(e) => {
            // No mtime means no way to detect edits; always rebuild instead.
            warn!("No modification time for {}: {}", path.display(), e);
            Ok(Utc::now())
        }
    }
}

/// XDG base directory with platform and home-relative fallbacks
fn xdg_dir(var: &str, platform: Option<PathBuf>, home_relative: &[&str]) -> PathBuf {
    if let Some(dir) = std::env::var_os(var).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home_relative.iter().fold(home, |acc, part| acc.join(part));
    }

    platform.unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Environment;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn global_bootstrapped_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(path.clone());

        let config = manager.load_global().await.unwrap();
        assert!(path.exists());
        assert_eq!(config.default_agent, "claude");

        // Second call leaves the file alone
        std::fs::write(&path, "default_agent = \"aider\"").unwrap();
        assert!(!manager.ensure_global().await.unwrap());
        assert_eq!(manager.load_global().await.unwrap().default_agent, "aider");
    }

    #[tokio::test]
    async fn malformed_global_is_invalid() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "default_agent = [").unwrap();

        let err = ConfigManager::with_path(path).load_global().await.unwrap_err();
        assert!(matches!(err, TierboxError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn resolve_missing_project_config() {
        let temp = TempDir::new().unwrap();
        let err = ConfigManager::resolve(temp.path(), &GlobalConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TierboxError::ConfigNotFound(_)));
    }

    #[tokio::test]
    async fn resolve_malformed_project_config() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PROJECT_FILE), "[project\nname=").unwrap();

        let err = ConfigManager::resolve(temp.path(), &GlobalConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TierboxError::ConfigInvalid { .. }));
    }

    #[tokio::test]
    async fn resolve_requires_project_name() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(PROJECT_FILE), "[project]\nagent = \"claude\"").unwrap();

        let err = ConfigManager::resolve(temp.path(), &GlobalConfig::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("project.name must be set"));
    }

    #[tokio::test]
    async fn resolve_merges_and_records_source() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(PROJECT_FILE),
            "[project]\nname = \"demo\"\n[[install]]\npackages = [\"jq\"]\nenvs = [\"python\"]\n",
        )
        .unwrap();
        let global = GlobalConfig {
            default_packages: vec!["git".into()],
            ..GlobalConfig::default()
        };

        let resolved = ConfigManager::resolve(temp.path(), &global).await.unwrap();
        assert_eq!(resolved.config.project_name, "demo");
        assert_eq!(resolved.config.packages, vec!["git", "jq"]);
        assert_eq!(resolved.config.envs, vec![Environment::Python]);
        assert_eq!(resolved.source.path, temp.path().join(PROJECT_FILE));
        assert!(resolved.source.modified <= Utc::now());
    }

    #[test]
    fn project_name_validation() {
        assert!(validate_project_name("demo").is_ok());
        assert!(validate_project_name("my-app_2.0").is_ok());
        assert!(validate_project_name("").is_err());
        assert!(validate_project_name("Demo").is_err());
        assert!(validate_project_name("-demo").is_err());
        assert!(validate_project_name("my app").is_err());
    }

    #[test]
    fn project_name_from_directory() {
        assert_eq!(project_name_from_dir(Path::new("/src/My App")), "my-app");
        assert_eq!(project_name_from_dir(Path::new("/src/.hidden")), "hidden");
        assert_eq!(project_name_from_dir(Path::new("/")), "my-project");
    }

    #[test]
    #[serial]
    fn xdg_override_respected() {
        let temp = TempDir::new().unwrap();
        std::env::set_var("XDG_STATE_HOME", temp.path());
        let dir = ConfigManager::image_state_dir();
        std::env::remove_var("XDG_STATE_HOME");

        assert_eq!(dir, temp.path().join("tierbox").join("images"));
    }
}
