use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure for gitspace
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Root directory that mirrors remotes as `<host>/<org>/<repo>`
    #[serde(default = "default_workspace_dir")]
    pub workspace_dir: String,

    /// Git invocation settings
    #[serde(default)]
    pub git: GitConfig,

    /// Editor launched after a successful sync
    #[serde(default)]
    pub editor: EditorConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Git configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GitConfig {
    /// Git executable to run
    #[serde(default = "default_git_executable")]
    pub executable: String,

    /// Clone with `--depth 1` by default. Pulls always use `--depth 1`.
    #[serde(default)]
    pub shallow: bool,

    /// Timeout for git operations in seconds (no timeout when unset)
    #[serde(default)]
    pub timeout: Option<u64>,

    /// Remove whatever a failed clone left behind
    #[serde(default)]
    pub cleanup_on_error: bool,
}

/// Editor configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EditorConfig {
    /// Editor command, split shell-style; the checkout path is appended
    #[serde(default = "default_editor_command")]
    pub command: String,

    /// Open the checkout after `clone`
    #[serde(default = "default_true")]
    pub open_after_sync: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"
}

// Default value functions
fn default_workspace_dir() -> String {
    "${HOME}/Workspace".to_string()
}
fn default_git_executable() -> String {
    "git".to_string()
}
fn default_editor_command() -> String {
    "code".to_string()
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

// Default implementations
impl Default for GitConfig {
    fn default() -> Self {
        Self {
            executable: default_git_executable(),
            shallow: false,
            timeout: None,
            cleanup_on_error: false,
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            command: default_editor_command(),
            open_after_sync: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            // Saved unexpanded so ${HOME} keeps following the user
            config.save(&config_path)?;
            config.expand_paths()?;

            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("gitspace").join("config.yml"))
    }

    /// Expand `~` and environment variables in configuration paths
    pub fn expand_paths(&mut self) -> Result<()> {
        self.workspace_dir = shellexpand::full(&self.workspace_dir)
            .context("Failed to expand workspace_dir path")?
            .into_owned();

        Ok(())
    }

    /// Workspace root as a path
    pub fn workspace_path(&self) -> PathBuf {
        PathBuf::from(&self.workspace_dir)
    }

    /// Git timeout as a duration
    pub fn git_timeout(&self) -> Option<Duration> {
        self.git.timeout.map(Duration::from_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace_dir: default_workspace_dir(),
            git: GitConfig::default(),
            editor: EditorConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    // Helper function to create a temporary config directory
    fn setup_test_config_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join("gitspace");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        (temp_dir, config_dir)
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.workspace_dir, "${HOME}/Workspace");
        assert_eq!(config.git.executable, "git");
        assert!(!config.git.shallow);
        assert!(config.git.timeout.is_none());
        assert!(!config.git.cleanup_on_error);
        assert_eq!(config.editor.command, "code");
        assert!(config.editor.open_after_sync);
        assert_eq!(config.logging.level, "info");
        assert!(config.git_timeout().is_none());
    }

    #[test]
    #[serial]
    fn test_expand_paths() {
        env::set_var("TEST_GITSPACE_HOME", "/test/home");

        let mut config = Config::default();
        config.workspace_dir = "${TEST_GITSPACE_HOME}/Workspace".to_string();

        config.expand_paths().expect("Failed to expand paths");

        assert_eq!(config.workspace_dir, "/test/home/Workspace");
        assert_eq!(config.workspace_path(), PathBuf::from("/test/home/Workspace"));

        env::remove_var("TEST_GITSPACE_HOME");
    }

    #[test]
    #[serial]
    fn test_expand_paths_unknown_variable() {
        env::remove_var("TEST_GITSPACE_UNSET");

        let mut config = Config::default();
        config.workspace_dir = "${TEST_GITSPACE_UNSET}/Workspace".to_string();

        assert!(config.expand_paths().is_err());
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let nonexistent_path = Path::new("/nonexistent/path/config.yml");
        let result = Config::load(nonexistent_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let (_temp_dir, config_dir) = setup_test_config_dir();
        let config_path = config_dir.join("config.yml");

        let mut config = Config::default();
        config.workspace_dir = "/custom/path".to_string();
        config.git.shallow = true;
        config.git.timeout = Some(120);
        config.editor.command = "nvim".to_string();

        config.save(&config_path).expect("Failed to save config");

        let loaded_config = Config::load(&config_path).expect("Failed to load config");

        assert_eq!(loaded_config.workspace_dir, "/custom/path");
        assert!(loaded_config.git.shallow);
        assert_eq!(loaded_config.git_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(loaded_config.editor.command, "nvim");
    }

    #[test]
    fn test_config_default_path_xdg() {
        let default_path = Config::default_config_path().expect("Failed to get default path");
        assert!(default_path.to_string_lossy().contains("gitspace"));
        assert!(default_path.to_string_lossy().ends_with("config.yml"));
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml_content = r#"
workspace_dir: "${HOME}/src"
git:
  executable: "/usr/local/bin/git"
  shallow: true
  timeout: 600
  cleanup_on_error: true
editor:
  command: "zed"
  open_after_sync: false
logging:
  level: "debug"
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");

        assert_eq!(config.workspace_dir, "${HOME}/src");
        assert_eq!(config.git.executable, "/usr/local/bin/git");
        assert!(config.git.shallow);
        assert_eq!(config.git.timeout, Some(600));
        assert!(config.git.cleanup_on_error);
        assert_eq!(config.editor.command, "zed");
        assert!(!config.editor.open_after_sync);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let config: Config = serde_yaml::from_str("git:\n  shallow: true\n").expect("Failed to parse YAML");

        assert_eq!(config.workspace_dir, "${HOME}/Workspace");
        assert!(config.git.shallow);
        assert_eq!(config.git.executable, "git");
        assert_eq!(config.editor.command, "code");
    }
}
