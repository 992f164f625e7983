//! Routing one utterance through planning, commit and resumption.

use serde::Serialize;

use crate::catalog::ActionStore;
use crate::error::Result;
use crate::executor::{Executor, ExecutorState, Resumed};
use crate::mutator::{self, CommitReport};
use crate::planner::{Plan, Planner};
use crate::registry::Registry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub action: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    /// Nothing to do (blank input).
    Ignored,
    /// A pending continuation ran instead of the utterance.
    Resumed(Resumed),
    /// Every action already existed and ran in place.
    Executed { invocations: Vec<Invocation> },
    /// New definitions were written, the registry refreshed and the
    /// pending action resumed.
    Committed {
        report: CommitReport,
        resumed: Option<Resumed>,
    },
}

impl Outcome {
    /// The status to show the user, if any action ran.
    pub fn status(&self) -> Option<&str> {
        match self {
            Outcome::Ignored => None,
            Outcome::Resumed(r) => Some(&r.status),
            Outcome::Executed { invocations } => invocations.last().map(|i| i.status.as_str()),
            Outcome::Committed { resumed, .. } => resumed.as_ref().map(|r| r.status.as_str()),
        }
    }
}

pub struct Dispatcher {
    registry: Registry,
    store: ActionStore,
    planner: Planner,
    executor: Executor,
    open_shortcut: bool,
}

impl Dispatcher {
    pub fn new(registry: Registry, store: ActionStore, planner: Planner, executor: Executor) -> Self {
        Self {
            registry,
            store,
            planner,
            executor,
            open_shortcut: true,
        }
    }

    pub fn with_open_shortcut(mut self, enabled: bool) -> Self {
        self.open_shortcut = enabled;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Run whatever a previous process left pending. Call once before the
    /// first utterance.
    pub fn startup(&mut self) -> Result<Option<Resumed>> {
        if self.executor.state()? == ExecutorState::Fresh {
            return Ok(None);
        }
        self.executor.resume(&mut self.registry, &self.store)
    }

    pub fn handle(&mut self, utterance: &str) -> Result<Outcome> {
        let utterance = utterance.trim();
        if utterance.is_empty() {
            return Ok(Outcome::Ignored);
        }
        tracing::info!(utterance, "handling utterance");

        if self.executor.state()? == ExecutorState::Resuming {
            tracing::info!(utterance, "continuation pending, resuming it instead");
            return Ok(match self.executor.resume(&mut self.registry, &self.store)? {
                Some(resumed) => Outcome::Resumed(resumed),
                None => Outcome::Ignored,
            });
        }

        let plan = match self
            .planner
            .shortcut(utterance, &self.registry, self.open_shortcut)
        {
            Some(plan) => plan,
            None => self.planner.plan(utterance, &self.registry)?,
        };

        if !plan.sequence.is_empty() && plan.is_ready(&self.registry) {
            return self.execute(&plan);
        }

        let report = mutator::commit(&plan, &self.registry, &self.store, self.executor.continuations())?;
        self.executor.restart(&mut self.registry, &self.store)?;
        let resumed = self.executor.resume(&mut self.registry, &self.store)?;
        Ok(Outcome::Committed { report, resumed })
    }

    fn execute(&self, plan: &Plan) -> Result<Outcome> {
        let mut invocations = Vec::with_capacity(plan.sequence.len());
        for action in &plan.sequence {
            let status = self.registry.invoke(action)?;
            invocations.push(Invocation {
                action: action.clone(),
                status,
            });
        }
        Ok(Outcome::Executed { invocations })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::COMPOSITE_STATUS;
    use crate::continuation::{Continuation, ContinuationStore};
    use crate::error::CatalystError;
    use crate::executor::testing::{CountingRestart, FailingRestart};
    use crate::planner::Collaborator;
    use crate::registry::testing::{record_action, RecordingHost};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// Answers every instruction with the next scripted response.
    #[derive(Clone, Default)]
    struct Scripted {
        responses: Arc<Mutex<Vec<String>>>,
        asked: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(responses: &[&str]) -> Self {
            Self {
                responses: Arc::new(Mutex::new(
                    responses.iter().rev().map(|s| s.to_string()).collect(),
                )),
                asked: Arc::default(),
            }
        }

        fn asked(&self) -> usize {
            self.asked.load(Ordering::SeqCst)
        }
    }

    impl Collaborator for Scripted {
        fn respond(&self, _instruction: &str) -> crate::error::Result<String> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| CatalystError::PlannerCommunication("no scripted response".into()))
        }
    }

    struct Harness {
        dispatcher: Dispatcher,
        host: Arc<RecordingHost>,
        restarts: CountingRestart,
        collaborator: Scripted,
        dir: TempDir,
    }

    fn harness(responses: &[&str], existing: &[crate::action::ActionDef]) -> Harness {
        harness_with(responses, existing, true)
    }

    fn harness_with(
        responses: &[&str],
        existing: &[crate::action::ActionDef],
        open_shortcut: bool,
    ) -> Harness {
        let dir = TempDir::new().unwrap();
        let store = ActionStore::new(dir.path());
        for def in existing {
            store.append(def).unwrap();
        }
        let host = Arc::new(RecordingHost::default());
        let registry = Registry::load(&store, host.clone()).unwrap();
        let collaborator = Scripted::new(responses);
        let planner = Planner::new(Box::new(collaborator.clone()), "run_task");
        let restarts = CountingRestart::default();
        let executor = Executor::new(ContinuationStore::new(dir.path()), Box::new(restarts.clone()));
        Harness {
            dispatcher: Dispatcher::new(registry, store, planner, executor)
                .with_open_shortcut(open_shortcut),
            host,
            restarts,
            collaborator,
            dir,
        }
    }

    const CHROME_AND_FILE: &str = "Both actions are new.\n\n\
```action\ndef open_chrome():\n    \"\"\"Open Google Chrome browser.\"\"\"\n    \
open_app \"Google Chrome\"\n    return \"Chrome opened successfully\"\n```\n\n\
```action\ndef create_text_file():\n    \"\"\"Create a new text file on the desktop.\"\"\"\n    \
write_file \"~/Desktop/new_file.txt\" \"\"\n    \
return \"Created file at ~/Desktop/new_file.txt\"\n```\n\n\
Call in this sequence: open_chrome, create_text_file\n";

    #[test]
    fn open_chrome_is_created_and_resumed() {
        let mut h = harness(&[], &[]);
        let outcome = h.dispatcher.handle("open chrome").unwrap();
        assert_eq!(outcome.status(), Some("Chrome opened successfully"));
        match &outcome {
            Outcome::Committed { report, resumed } => {
                assert_eq!(report.appended, vec!["open_chrome"]);
                assert_eq!(resumed.as_ref().unwrap().action, "open_chrome");
            }
            other => panic!("expected commit, got {other:?}"),
        }
        assert_eq!(h.host.calls(), vec!["open_app Google Chrome"]);
        assert_eq!(h.restarts.count(), 1);
        assert_eq!(h.collaborator.asked(), 0);
        assert!(h.dispatcher.executor().pending().unwrap().is_none());
    }

    #[test]
    fn two_step_request_runs_the_composite_in_order() {
        let mut h = harness(&[CHROME_AND_FILE], &[]);
        let outcome = h
            .dispatcher
            .handle("open chrome and create a text file")
            .unwrap();
        assert_eq!(outcome.status(), Some(COMPOSITE_STATUS));
        match &outcome {
            Outcome::Committed { report, resumed } => {
                assert_eq!(report.pending.as_deref(), Some("run_task"));
                assert_eq!(resumed.as_ref().unwrap().action, "run_task");
            }
            other => panic!("expected commit, got {other:?}"),
        }
        let calls = h.host.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], "open_app Google Chrome");
        assert!(calls[1].starts_with("write_file "));
        assert!(calls[1].ends_with("Desktop/new_file.txt"));
        assert!(h.dispatcher.registry().exists("run_task"));
    }

    #[test]
    fn existing_actions_run_without_restart() {
        let mut h = harness(&[], &[]);
        h.dispatcher.handle("open chrome").unwrap();
        assert_eq!(h.restarts.count(), 1);

        let outcome = h.dispatcher.handle("open chrome").unwrap();
        assert_eq!(
            outcome,
            Outcome::Executed {
                invocations: vec![Invocation {
                    action: "open_chrome".into(),
                    status: "Chrome opened successfully".into(),
                }],
            }
        );
        assert_eq!(h.restarts.count(), 1);

        let outcome = h.dispatcher.handle("open_chrome").unwrap();
        assert!(matches!(outcome, Outcome::Executed { .. }));
        assert_eq!(h.restarts.count(), 1);
    }

    #[test]
    fn planner_sequence_of_existing_actions_runs_in_place() {
        let mut h = harness(
            &["Call in this sequence: a, b"],
            &[record_action("a"), record_action("b")],
        );
        let outcome = h.dispatcher.handle("do a and b").unwrap();
        assert!(matches!(outcome, Outcome::Executed { ref invocations } if invocations.len() == 2));
        assert_eq!(h.host.calls(), vec!["record a: ran", "record b: ran"]);
        assert_eq!(h.restarts.count(), 0);
    }

    #[test]
    fn unusable_answer_still_runs_something() {
        let mut h = harness(&["Sorry, I can't help with that."], &[]);
        let outcome = h.dispatcher.handle("water the plants").unwrap();
        match &outcome {
            Outcome::Committed { report, resumed } => {
                assert_eq!(report.appended, vec!["placeholder_water_the_plants"]);
                assert_eq!(
                    resumed.as_ref().unwrap().status,
                    "Executed placeholder action"
                );
            }
            other => panic!("expected commit, got {other:?}"),
        }
    }

    #[test]
    fn pending_continuation_preempts_the_next_utterance() {
        let mut h = harness(&[], &[record_action("greet")]);
        ContinuationStore::new(h.dir.path())
            .write(&Continuation::new("greet", "say hi"))
            .unwrap();
        let outcome = h.dispatcher.handle("something else entirely").unwrap();
        assert_eq!(
            outcome,
            Outcome::Resumed(Resumed {
                action: "greet".into(),
                status: "greet done".into(),
            })
        );
        assert_eq!(h.collaborator.asked(), 0);
        assert!(h.dispatcher.executor().pending().unwrap().is_none());
    }

    #[test]
    fn startup_consumes_a_leftover_continuation() {
        let mut h = harness(&[], &[record_action("greet")]);
        assert_eq!(h.dispatcher.startup().unwrap(), None);
        ContinuationStore::new(h.dir.path())
            .write(&Continuation::new("greet", ""))
            .unwrap();
        let resumed = h.dispatcher.startup().unwrap().unwrap();
        assert_eq!(resumed.action, "greet");
        assert_eq!(h.dispatcher.startup().unwrap(), None);
        assert_eq!(h.host.calls(), vec!["record greet: ran"]);
    }

    #[test]
    fn failed_restart_keeps_the_intent_for_the_next_turn() {
        let dir = TempDir::new().unwrap();
        let store = ActionStore::new(dir.path());
        let host = Arc::new(RecordingHost::default());
        let registry = Registry::load(&store, host.clone()).unwrap();
        let planner = Planner::new(Box::new(Scripted::new(&[])), "run_task");
        let executor = Executor::new(ContinuationStore::new(dir.path()), Box::new(FailingRestart));
        let mut dispatcher = Dispatcher::new(registry, store, planner, executor);

        let err = dispatcher.handle("open chrome").unwrap_err();
        assert!(matches!(err, CatalystError::RestartFailure(_)));
        let pending = dispatcher.executor().pending().unwrap().unwrap();
        assert_eq!(pending.pending_action, "open_chrome");
        assert!(host.calls().is_empty());

        let outcome = dispatcher.handle("open slack").unwrap();
        assert_eq!(
            outcome,
            Outcome::Resumed(Resumed {
                action: "open_chrome".into(),
                status: "Chrome opened successfully".into(),
            })
        );
        assert_eq!(host.calls(), vec!["open_app Google Chrome"]);
        assert!(dispatcher.executor().pending().unwrap().is_none());
    }

    #[test]
    fn failed_restart_resumes_on_next_start() {
        let dir = TempDir::new().unwrap();
        let open = |restart: Box<dyn crate::executor::Restart>| {
            let store = ActionStore::new(dir.path());
            let host = Arc::new(RecordingHost::default());
            let registry = Registry::load(&store, host.clone()).unwrap();
            let planner = Planner::new(Box::new(Scripted::new(&[])), "run_task");
            let executor = Executor::new(ContinuationStore::new(dir.path()), restart);
            (Dispatcher::new(registry, store, planner, executor), host)
        };

        let (mut first, first_host) = open(Box::new(FailingRestart));
        assert!(first.handle("open chrome").is_err());
        drop(first);

        let (mut next, next_host) = open(Box::new(CountingRestart::default()));
        let resumed = next.startup().unwrap().unwrap();
        assert_eq!(resumed.action, "open_chrome");
        assert_eq!(next_host.calls(), vec!["open_app Google Chrome"]);
        assert!(first_host.calls().is_empty());
        assert_eq!(next.startup().unwrap(), None);
    }

    #[test]
    fn blank_input_is_ignored() {
        let mut h = harness(&[], &[]);
        assert_eq!(h.dispatcher.handle("   ").unwrap(), Outcome::Ignored);
        assert_eq!(h.collaborator.asked(), 0);
    }

    #[test]
    fn collaborator_failure_commits_nothing() {
        let mut h = harness(&[], &[]);
        let err = h.dispatcher.handle("make coffee").unwrap_err();
        assert!(matches!(err, CatalystError::PlannerCommunication(_)));
        assert!(!h.dir.path().join(".catalyst/catalog.yaml").exists());
        assert_eq!(h.restarts.count(), 0);
    }

    #[test]
    fn open_shortcut_can_be_disabled() {
        let mut h = harness_with(&["Call in this sequence: nothing_here"], &[], false);
        let outcome = h.dispatcher.handle("open chrome").unwrap();
        // The agent answer names nothing usable, so the canned table decides.
        assert_eq!(h.collaborator.asked(), 1);
        assert_eq!(outcome.status(), Some("Chrome opened successfully"));
    }
}
