use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use catalyst_core::catalog::ActionStore;
use catalyst_core::config::{Config, RestartMode, WarnLevel};
use catalyst_core::continuation::ContinuationStore;
use catalyst_core::dispatcher::Dispatcher;
use catalyst_core::executor::{ExecRestart, Executor, Reload, Restart};
use catalyst_core::host::SystemHost;
use catalyst_core::planner::Planner;
use catalyst_core::registry::Registry;
use catalyst_core::CatalystError;

use crate::collaborator::ClaudeCollaborator;

/// Flags that override `.catalyst/config.yaml` for one invocation.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub model: Option<String>,
    pub no_trace: bool,
}

/// Wire up a dispatcher for `root`: registry from the catalog, the Claude
/// planner, and the configured restart strategy.
pub fn open(root: &Path, overrides: &Overrides) -> anyhow::Result<Dispatcher> {
    let config = Config::load(root).context("failed to load config")?;
    check_config(&config)?;
    check_credential(&config)?;

    let store = ActionStore::new(root);
    let host = Arc::new(SystemHost::new(root));
    let registry = Registry::load(&store, host)
        .with_context(|| format!("failed to load {}", store.path().display()))?;
    tracing::debug!(actions = registry.len(), root = %root.display(), "catalog loaded");

    let collaborator = ClaudeCollaborator::new(
        &config.planner,
        overrides.model.as_deref(),
        overrides.no_trace,
        root,
    )?;
    let planner = Planner::new(
        Box::new(collaborator),
        config.planner.default_composite_name.clone(),
    );

    let restart: Box<dyn Restart> = match config.executor.restart {
        RestartMode::Reload => Box::new(Reload),
        RestartMode::Exec => Box::new(ExecRestart::current()?),
    };
    let executor = Executor::new(ContinuationStore::new(root), restart);

    Ok(Dispatcher::new(registry, store, planner, executor)
        .with_open_shortcut(config.dispatcher.open_shortcut))
}

/// Log config warnings; refuse to start on errors.
fn check_config(config: &Config) -> anyhow::Result<()> {
    let mut errors = Vec::new();
    for w in config.validate() {
        match w.level {
            WarnLevel::Warning => tracing::warn!(message = %w.message, "config warning"),
            WarnLevel::Error => errors.push(w.message),
        }
    }
    if !errors.is_empty() {
        anyhow::bail!(
            "invalid config ({}): {}",
            catalyst_core::paths::CONFIG_FILE,
            errors.join("; ")
        );
    }
    Ok(())
}

fn check_credential(config: &Config) -> anyhow::Result<()> {
    let Some(var) = config.planner.credential_env.as_deref() else {
        return Ok(());
    };
    if var.trim().is_empty() {
        return Ok(());
    }
    match std::env::var_os(var) {
        Some(value) if !value.is_empty() => Ok(()),
        _ => Err(CatalystError::MissingCredential(var.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_refuse_to_open() {
        let mut config = Config::default();
        config.planner.default_composite_name = "Run Task".into();
        let err = check_config(&config).unwrap_err();
        assert!(err.to_string().contains("default_composite_name"));
    }

    #[test]
    fn config_warnings_alone_do_not_block() {
        let mut config = Config::default();
        config.planner.executable = "/nonexistent/catalyst-claude".into();
        assert!(check_config(&config).is_ok());
    }
}
