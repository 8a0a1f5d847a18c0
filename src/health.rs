//! System health checks for gitspace
//!
//! `gitspace doctor` runs these to explain why a clone might not work
//! before one is attempted.

use crate::Config;
use std::path::Path;

/// Result of system health checks
#[derive(Debug, Clone)]
pub struct HealthCheck {
    /// Git installation status
    pub git: CheckResult,
    /// Workspace root status
    pub workspace: CheckResult,
    /// SSH configuration status (warning only, not required)
    pub ssh: CheckResult,
    /// Editor availability (warning only, not required)
    pub editor: CheckResult,
}

/// Result of an individual health check
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub passed: bool,
    pub message: String,
    pub details: Option<String>,
    pub is_warning: bool,
}

impl CheckResult {
    fn ok_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn error_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: message.into(),
            details: Some(details.into()),
            is_warning: false,
        }
    }

    fn warning_with_details(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            passed: true,
            message: message.into(),
            details: Some(details.into()),
            is_warning: true,
        }
    }
}

impl HealthCheck {
    /// Run all health checks
    pub fn run(config: &Config) -> Self {
        Self {
            git: Self::check_git(&config.git.executable),
            workspace: Self::check_workspace(Path::new(&config.workspace_dir)),
            ssh: Self::check_ssh(&dirs::home_dir().unwrap_or_default().join(".ssh")),
            editor: Self::check_editor(&config.editor.command),
        }
    }

    /// Check if all required checks passed (excludes warnings)
    pub fn all_passed(&self) -> bool {
        self.all_checks().iter().all(|(_, result)| result.passed)
    }

    /// Get list of failed checks (errors only, not warnings)
    pub fn errors(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| !r.passed && !r.is_warning)
            .collect()
    }

    /// Get list of warnings
    pub fn warnings(&self) -> Vec<&CheckResult> {
        self.all_checks()
            .into_iter()
            .map(|(_, result)| result)
            .filter(|r| r.is_warning)
            .collect()
    }

    /// Check git installation
    fn check_git(executable: &str) -> CheckResult {
        match std::process::Command::new(executable).arg("--version").output() {
            Ok(output) if output.status.success() => {
                let version = String::from_utf8_lossy(&output.stdout);
                CheckResult::ok_with_details("Git installed", version.trim().to_string())
            }
            Ok(output) => CheckResult::error_with_details(
                "Git command failed",
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ),
            Err(_) => CheckResult::error_with_details(
                format!("{} not found in PATH", executable),
                "Install git: https://git-scm.com/downloads",
            ),
        }
    }

    /// Check the workspace root; a missing root is created by the first clone
    fn check_workspace(path: &Path) -> CheckResult {
        if !path.is_absolute() {
            return CheckResult::error_with_details(
                "Workspace path is not absolute",
                format!("Set workspace_dir to an absolute path (got {})", path.display()),
            );
        }

        if path.is_dir() {
            CheckResult::ok_with_details("Workspace exists", path.display().to_string())
        } else if path.exists() {
            CheckResult::error_with_details(
                "Workspace path is not a directory",
                path.display().to_string(),
            )
        } else {
            CheckResult::warning_with_details(
                "Workspace does not exist yet",
                format!("It will be created on first clone, or run: mkdir -p {}", path.display()),
            )
        }
    }

    /// Check SSH configuration (warning only)
    fn check_ssh(ssh_dir: &Path) -> CheckResult {
        if !ssh_dir.exists() {
            return CheckResult::warning_with_details(
                "~/.ssh directory not found",
                "Only ssh remotes are supported. Run: ssh-keygen -t ed25519",
            );
        }

        let ssh_keys = ["id_rsa", "id_ed25519", "id_ecdsa"];
        let found_keys: Vec<_> = ssh_keys
            .iter()
            .filter(|key| ssh_dir.join(key).exists())
            .copied()
            .collect();

        if found_keys.is_empty() {
            CheckResult::warning_with_details(
                "No SSH keys found",
                "Only ssh remotes are supported. Run: ssh-keygen -t ed25519 -C \"your_email@example.com\"",
            )
        } else {
            CheckResult::ok_with_details("SSH keys found", found_keys.join(", "))
        }
    }

    /// Check the editor command is on PATH (warning only)
    fn check_editor(command: &str) -> CheckResult {
        let Some(program) = crate::editor::editor_program(command) else {
            return CheckResult::warning_with_details(
                format!("Editor command `{}` cannot be parsed", command),
                "Set editor.command in the config file or pass --no-open",
            );
        };

        match which::which(&program) {
            Ok(path) => CheckResult::ok_with_details("Editor found", path.display().to_string()),
            Err(_) => CheckResult::warning_with_details(
                format!("Editor `{}` not found in PATH", command),
                "Set editor.command in the config file or pass --no-open",
            ),
        }
    }

    /// Get all checks as a slice for iteration
    pub fn all_checks(&self) -> [(&'static str, &CheckResult); 4] {
        [
            ("Git Installation", &self.git),
            ("Workspace", &self.workspace),
            ("SSH Configuration", &self.ssh),
            ("Editor", &self.editor),
        ]
    }
}
