//! Durable application of a [`Plan`] to the action store.

use serde::Serialize;

use crate::action::ActionDef;
use crate::catalog::ActionStore;
use crate::continuation::{Continuation, ContinuationStore};
use crate::error::{CatalystError, Result};
use crate::paths;
use crate::planner::Plan;
use crate::registry::Registry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommitReport {
    /// Definitions written by this commit, in write order.
    pub appended: Vec<String>,
    /// Definitions that already existed and were left alone.
    pub skipped: Vec<String>,
    /// The action recorded as the continuation, if any.
    pub pending: Option<String>,
}

/// Write the plan's new definitions (and composite wrapper) to `store`, then
/// record the action to run once they are loaded.
///
/// The whole plan is validated before anything is written. Definitions are
/// flushed before the continuation so a resumed action never references a
/// name that is not on disk.
pub fn commit(
    plan: &Plan,
    registry: &Registry,
    store: &ActionStore,
    continuations: &ContinuationStore,
) -> Result<CommitReport> {
    validate(plan, registry)?;

    let stored = store.load()?;
    let on_disk = |name: &str| stored.iter().find(|d| d.name == name);

    let composite = if plan.needs_composite() {
        let def = ActionDef::composite(&plan.composite_name, plan.sequence.clone())
            .with_utterance(&plan.utterance);
        let existing = registry.get(&def.name).or_else(|| on_disk(&def.name));
        match existing {
            Some(existing) if existing.body == def.body => None,
            Some(_) => return Err(CatalystError::DuplicateDefinition(def.name)),
            None => Some(def),
        }
    } else {
        None
    };

    let mut report = CommitReport::default();
    for (name, def) in &plan.missing_actions {
        if registry.exists(name) || on_disk(name).is_some() {
            tracing::debug!(action = %name, "definition already exists, skipping");
            report.skipped.push(name.clone());
            continue;
        }
        store.append(def)?;
        report.appended.push(name.clone());
    }

    if plan.needs_composite() {
        match composite {
            Some(def) => {
                store.append(&def)?;
                report.appended.push(def.name);
            }
            None => report.skipped.push(plan.composite_name.clone()),
        }
    }

    report.pending = if plan.needs_composite() {
        Some(plan.composite_name.clone())
    } else {
        plan.sequence.first().cloned()
    };
    if let Some(pending) = &report.pending {
        continuations.write(&Continuation::new(pending, &plan.utterance))?;
    }

    tracing::info!(
        appended = ?report.appended,
        skipped = ?report.skipped,
        pending = ?report.pending,
        "plan committed"
    );
    Ok(report)
}

fn validate(plan: &Plan, registry: &Registry) -> Result<()> {
    for (name, def) in &plan.missing_actions {
        paths::validate_action_name(name)?;
        if def.name != *name {
            return Err(CatalystError::InvalidPlan(format!(
                "definition keyed as {name} is named {}",
                def.name
            )));
        }
    }

    let resolvable = |name: &str| plan.missing_actions.contains_key(name) || registry.exists(name);

    for def in plan.missing_actions.values() {
        if let Some(missing) = def.references().into_iter().find(|r| !resolvable(r)) {
            return Err(CatalystError::InvalidPlan(format!(
                "{} calls unknown action {missing}",
                def.name
            )));
        }
    }
    if let Some(missing) = plan.sequence.iter().find(|n| !resolvable(n)) {
        return Err(CatalystError::InvalidPlan(format!(
            "sequence entry {missing} is neither defined nor loaded"
        )));
    }

    if plan.needs_composite() {
        if plan.composite_name.is_empty() {
            return Err(CatalystError::InvalidPlan(
                "a multi-step sequence needs a composite name".into(),
            ));
        }
        paths::validate_action_name(&plan.composite_name)?;
        if plan.missing_actions.contains_key(&plan.composite_name) {
            return Err(CatalystError::DuplicateDefinition(plan.composite_name.clone()));
        }
    }
    Ok(())
}
