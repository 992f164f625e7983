use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// PlannerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
    /// Path or name of the `claude` executable.
    #[serde(default = "default_executable")]
    pub executable: String,
    /// Environment variable that must be set before the planner is used.
    /// `null` disables the check (e.g. when the CLI is logged in via OAuth).
    #[serde(default = "default_credential_env")]
    pub credential_env: Option<String>,
    #[serde(default = "default_composite_name")]
    pub default_composite_name: String,
}

fn default_model() -> String {
    "claude-sonnet-4-6".to_string()
}

fn default_max_turns() -> u32 {
    4
}

fn default_executable() -> String {
    "claude".to_string()
}

fn default_credential_env() -> Option<String> {
    Some("ANTHROPIC_API_KEY".to_string())
}

fn default_composite_name() -> String {
    "run_task".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_turns: default_max_turns(),
            executable: default_executable(),
            credential_env: default_credential_env(),
            default_composite_name: default_composite_name(),
        }
    }
}

// ---------------------------------------------------------------------------
// DispatcherConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Treat `open <app>` as a literal command that needs no planning agent.
    #[serde(default = "default_true")]
    pub open_shortcut: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            open_shortcut: true,
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestartMode {
    /// Re-read the action store into the running registry.
    #[default]
    Reload,
    /// Replace the process image with a fresh invocation of the same program.
    Exec,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutorConfig {
    #[serde(default)]
    pub restart: RestartMode,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
}

fn default_version() -> u32 {
    1
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            planner: PlannerConfig::default(),
            dispatcher: DispatcherConfig::default(),
            executor: ExecutorConfig::default(),
        }
    }
}

impl Config {
    /// Load `.catalyst/config.yaml`, falling back to defaults when absent.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if !paths::is_valid_action_name(&self.planner.default_composite_name) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "planner.default_composite_name '{}' is not a valid action name",
                    self.planner.default_composite_name
                ),
            });
        }

        if self.planner.model.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "planner.model is empty".to_string(),
            });
        }

        if self.planner.max_turns == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "planner.max_turns must be at least 1".to_string(),
            });
        } else if self.planner.max_turns > 20 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "planner.max_turns={} is unusual for a single planning request",
                    self.planner.max_turns
                ),
            });
        }

        if which::which(&self.planner.executable).is_err() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "planner.executable '{}' was not found on PATH",
                    self.planner.executable
                ),
            });
        }

        if matches!(&self.planner.credential_env, Some(var) if var.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "planner.credential_env is empty; use null to disable the check"
                    .to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
