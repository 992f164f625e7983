//! Continuation handling across registry refreshes.
//!
//! A commit leaves behind a [`Continuation`]; the executor refreshes the
//! registry through a [`Restart`] strategy and later consumes the record.
//! With [`Reload`] that happens in the same process. With [`ExecRestart`] the
//! process image is replaced and the next start-up resumes.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;

use crate::catalog::ActionStore;
use crate::continuation::{Continuation, ContinuationStore};
use crate::error::{CatalystError, Result};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    Fresh,
    Resuming,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resumed {
    pub action: String,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Restart strategies
// ---------------------------------------------------------------------------

/// How newly committed definitions become visible to the registry.
pub trait Restart {
    fn restart(&self, registry: &mut Registry, store: &ActionStore) -> Result<()>;
}

/// Re-read the store into the live registry.
pub struct Reload;

impl Restart for Reload {
    fn restart(&self, registry: &mut Registry, store: &ActionStore) -> Result<()> {
        let count = registry.reload(store)?;
        tracing::info!(actions = count, "registry reloaded");
        Ok(())
    }
}

/// Replace the running process with a fresh copy of itself.
///
/// Only returns on failure; the continuation stays on disk so whichever
/// process starts next picks it up.
pub struct ExecRestart {
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExecRestart {
    pub fn new(program: impl Into<PathBuf>, args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Re-run the current executable with the current arguments.
    pub fn current() -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| CatalystError::RestartFailure(format!("cannot locate executable: {e}")))?;
        Ok(Self::new(program, std::env::args_os().skip(1).collect()))
    }
}

impl Restart for ExecRestart {
    fn restart(&self, _registry: &mut Registry, _store: &ActionStore) -> Result<()> {
        tracing::info!(program = %self.program.display(), "restarting process");
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        replace_process(cmd, &self.program)
    }
}

#[cfg(unix)]
fn replace_process(mut cmd: Command, program: &Path) -> Result<()> {
    use std::os::unix::process::CommandExt;
    let err = cmd.exec();
    Err(CatalystError::RestartFailure(format!(
        "exec {}: {err}",
        program.display()
    )))
}

#[cfg(not(unix))]
fn replace_process(mut cmd: Command, program: &Path) -> Result<()> {
    cmd.spawn().map_err(|e| {
        CatalystError::RestartFailure(format!("spawn {}: {e}", program.display()))
    })?;
    std::process::exit(0)
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

pub struct Executor {
    continuations: ContinuationStore,
    restart: Box<dyn Restart>,
}

impl Executor {
    pub fn new(continuations: ContinuationStore, restart: Box<dyn Restart>) -> Self {
        Self {
            continuations,
            restart,
        }
    }

    pub fn continuations(&self) -> &ContinuationStore {
        &self.continuations
    }

    pub fn pending(&self) -> Result<Option<Continuation>> {
        self.continuations.read()
    }

    pub fn state(&self) -> Result<ExecutorState> {
        Ok(match self.pending()? {
            Some(_) => ExecutorState::Resuming,
            None => ExecutorState::Fresh,
        })
    }

    /// Invoke the pending action, if any, and clear the record.
    ///
    /// A pending action the registry has not loaded yet (a restart that
    /// failed, or one that never ran) is picked up by reloading `store`
    /// first. If reading the store fails the record is left in place.
    /// Otherwise the record is cleared whether or not the invocation
    /// succeeded, so a failing action is attempted once per commit rather
    /// than on every start.
    pub fn resume(&self, registry: &mut Registry, store: &ActionStore) -> Result<Option<Resumed>> {
        let Some(continuation) = self.pending()? else {
            return Ok(None);
        };
        if !registry.exists(&continuation.pending_action) {
            tracing::warn!(
                action = %continuation.pending_action,
                "pending action not loaded, reloading the catalog"
            );
            registry.reload(store)?;
        }
        tracing::info!(
            action = %continuation.pending_action,
            utterance = %continuation.utterance,
            "resuming pending action"
        );
        let result = registry.invoke(&continuation.pending_action);
        self.continuations.clear()?;
        let status = result?;
        Ok(Some(Resumed {
            action: continuation.pending_action,
            status,
        }))
    }

    pub fn restart(&self, registry: &mut Registry, store: &ActionStore) -> Result<()> {
        self.restart.restart(registry, store)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingRestart;
    use super::*;
    use crate::action::{ActionDef, Op};
    use crate::registry::testing::{record_action, RecordingHost};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup(restart: Box<dyn Restart>) -> (Executor, Registry, ActionStore, Arc<RecordingHost>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = ActionStore::new(dir.path());
        let host = Arc::new(RecordingHost::default());
        let registry = Registry::load(&store, host.clone()).unwrap();
        let executor = Executor::new(ContinuationStore::new(dir.path()), restart);
        (executor, registry, store, host, dir)
    }

    #[test]
    fn fresh_without_continuation() {
        let (executor, mut registry, store, _host, _dir) = setup(Box::new(Reload));
        assert_eq!(executor.state().unwrap(), ExecutorState::Fresh);
        assert_eq!(executor.resume(&mut registry, &store).unwrap(), None);
    }

    #[test]
    fn resume_invokes_pending_action_once() {
        let (executor, mut registry, store, host, _dir) = setup(Box::new(Reload));
        store.append(&record_action("greet")).unwrap();
        executor
            .continuations()
            .write(&Continuation::new("greet", "say hi"))
            .unwrap();
        assert_eq!(executor.state().unwrap(), ExecutorState::Resuming);

        executor.restart(&mut registry, &store).unwrap();
        let resumed = executor.resume(&mut registry, &store).unwrap().unwrap();
        assert_eq!(resumed.action, "greet");
        assert_eq!(resumed.status, "greet done");
        assert_eq!(executor.state().unwrap(), ExecutorState::Fresh);

        assert_eq!(executor.resume(&mut registry, &store).unwrap(), None);
        assert_eq!(host.calls(), vec!["record greet: ran"]);
    }

    #[test]
    fn failed_resume_still_clears() {
        let (executor, mut registry, store, _host, _dir) = setup(Box::new(Reload));
        let broken = ActionDef::primitive(
            "broken",
            "",
            vec![Op::Run {
                program: "false".into(),
                args: vec![],
            }],
            "never",
        );
        store.append(&broken).unwrap();
        registry.reload(&store).unwrap();
        executor
            .continuations()
            .write(&Continuation::new("broken", ""))
            .unwrap();

        assert!(matches!(
            executor.resume(&mut registry, &store),
            Err(CatalystError::ActionFailed { .. })
        ));
        assert_eq!(executor.state().unwrap(), ExecutorState::Fresh);
    }

    #[test]
    fn resume_of_unknown_action_surfaces_the_error() {
        let (executor, mut registry, store, _host, _dir) = setup(Box::new(Reload));
        executor
            .continuations()
            .write(&Continuation::new("vanished", ""))
            .unwrap();
        assert!(matches!(
            executor.resume(&mut registry, &store),
            Err(CatalystError::UnknownAction(name)) if name == "vanished"
        ));
        assert!(executor.pending().unwrap().is_none());
    }

    #[test]
    fn resume_loads_an_action_committed_after_the_last_refresh() {
        let (executor, mut registry, store, host, _dir) = setup(Box::new(Reload));
        store.append(&record_action("greet")).unwrap();
        executor
            .continuations()
            .write(&Continuation::new("greet", "say hi"))
            .unwrap();
        assert!(!registry.exists("greet"));

        let resumed = executor.resume(&mut registry, &store).unwrap().unwrap();
        assert_eq!(resumed.status, "greet done");
        assert!(registry.exists("greet"));
        assert_eq!(host.calls(), vec!["record greet: ran"]);
        assert!(executor.pending().unwrap().is_none());
    }

    #[test]
    fn restart_delegates_to_strategy() {
        let counting = CountingRestart::default();
        let (executor, mut registry, store, _host, _dir) = setup(Box::new(counting.clone()));
        store.append(&record_action("late")).unwrap();
        executor.restart(&mut registry, &store).unwrap();
        assert_eq!(counting.count(), 1);
        assert!(registry.exists("late"));
    }

    #[cfg(unix)]
    #[test]
    fn exec_failure_is_restart_failure() {
        let (_executor, mut registry, store, _host, dir) = setup(Box::new(Reload));
        let exec = ExecRestart::new(dir.path().join("no-such-binary"), vec![]);
        assert!(matches!(
            exec.restart(&mut registry, &store),
            Err(CatalystError::RestartFailure(_))
        ));
    }
}
