//! Turning an utterance into a [`Plan`].
//!
//! The planner asks a [`Collaborator`] for new definitions and a call order,
//! then reduces the free-text answer to a plan whose every sequence entry is
//! resolvable. Malformed answers degrade to a canned plan; only a failed
//! collaborator round-trip is an error.

pub mod canned;
pub mod parse;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::Serialize;

use crate::action::{ActionBody, ActionDef};
use crate::error::{CatalystError, Result};
use crate::paths::{self, MAX_ACTION_NAME_LEN};
use crate::registry::Registry;

/// The reasoning side of planning: one instruction in, free text out.
pub trait Collaborator {
    fn respond(&self, instruction: &str) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanOrigin {
    /// Parsed from the collaborator's answer.
    Agent,
    /// The answer was unusable; built from the canned table.
    Fallback,
    /// The utterance matched an existing action or `open <app>`.
    Shortcut,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub utterance: String,
    pub missing_actions: BTreeMap<String, ActionDef>,
    pub sequence: Vec<String>,
    /// Only meaningful when the sequence has more than one entry.
    pub composite_name: String,
    pub origin: PlanOrigin,
}

impl Plan {
    fn single(utterance: &str, def: Option<ActionDef>, name: String, origin: PlanOrigin) -> Self {
        let mut missing_actions = BTreeMap::new();
        if let Some(def) = def {
            missing_actions.insert(def.name.clone(), def.with_utterance(utterance));
        }
        Self {
            utterance: utterance.to_string(),
            missing_actions,
            sequence: vec![name],
            composite_name: String::new(),
            origin,
        }
    }

    pub fn needs_composite(&self) -> bool {
        self.sequence.len() > 1
    }

    /// True when nothing has to be written before the sequence can run.
    pub fn is_ready(&self, registry: &Registry) -> bool {
        self.missing_actions.keys().all(|n| registry.exists(n))
            && self.sequence.iter().all(|n| registry.exists(n))
    }
}

// ---------------------------------------------------------------------------
// Planner
// ---------------------------------------------------------------------------

pub struct Planner {
    collaborator: Box<dyn Collaborator>,
    default_composite_name: String,
}

impl Planner {
    pub fn new(collaborator: Box<dyn Collaborator>, default_composite_name: impl Into<String>) -> Self {
        Self {
            collaborator,
            default_composite_name: default_composite_name.into(),
        }
    }

    /// Plans that skip the collaborator entirely.
    ///
    /// An utterance that normalizes to an existing action name runs it; a
    /// short `open <app>` runs (or creates) `open_<app>` when `open_shortcut`
    /// is enabled.
    pub fn shortcut(&self, utterance: &str, registry: &Registry, open_shortcut: bool) -> Option<Plan> {
        let normalized = paths::identifier_from_words(utterance);
        if registry.exists(&normalized) && !paths::is_internal(&normalized) {
            return Some(Plan::single(utterance, None, normalized, PlanOrigin::Shortcut));
        }
        if !open_shortcut {
            return None;
        }
        let app = canned::match_open_command(utterance)?;
        let def = canned::open_app_action(&app)?;
        let name = def.name.clone();
        let def = (!registry.exists(&name)).then_some(def);
        Some(Plan::single(utterance, def, name, PlanOrigin::Shortcut))
    }

    pub fn plan(&self, utterance: &str, registry: &Registry) -> Result<Plan> {
        let prompt = instruction(utterance, &registry.enumerate());
        tracing::debug!(utterance, "asking collaborator for a plan");
        let response = self
            .collaborator
            .respond(&prompt)
            .map_err(|e| match e {
                CatalystError::PlannerCommunication(_) => e,
                other => CatalystError::PlannerCommunication(other.to_string()),
            })?;
        Ok(self.plan_from_response(utterance, &response, registry))
    }

    /// Reduce a collaborator answer to a plan. Never fails.
    pub fn plan_from_response(&self, utterance: &str, response: &str, registry: &Registry) -> Plan {
        let parsed = parse::parse_response(response);
        for reason in &parsed.rejected {
            tracing::warn!(%reason, "rejected definition block");
        }

        let mut defs: BTreeMap<String, ActionDef> = parsed
            .definitions
            .into_iter()
            .map(|d| (d.name.clone(), d.with_utterance(utterance)))
            .collect();
        drop_unresolvable_calls(&mut defs, registry);

        let resolvable = |name: &str| defs.contains_key(name) || registry.exists(name);
        let sequence: Vec<String> = parsed
            .sequence_tiers
            .iter()
            .map(|tier| dedup_adjacent(tier.iter().filter(|n| resolvable(n)).cloned()))
            .find(|tier| !tier.is_empty())
            .unwrap_or_default();

        if defs.is_empty() && sequence.is_empty() {
            return self.fallback(utterance);
        }

        let composite_name = if sequence.len() > 1 {
            let base = parsed
                .composite_name
                .unwrap_or_else(|| self.default_composite_name.clone());
            unique_composite_name(&base, &sequence, &defs, registry)
        } else {
            String::new()
        };

        tracing::info!(
            new = defs.len(),
            sequence = ?sequence,
            composite = %composite_name,
            "plan ready"
        );
        Plan {
            utterance: utterance.to_string(),
            missing_actions: defs,
            sequence,
            composite_name,
            origin: PlanOrigin::Agent,
        }
    }

    fn fallback(&self, utterance: &str) -> Plan {
        let def = canned::fallback_action(utterance);
        tracing::warn!(
            utterance,
            action = %def.name,
            "PlanParseDegraded: no usable definitions or sequence, using fallback"
        );
        let name = def.name.clone();
        Plan::single(utterance, Some(def), name, PlanOrigin::Fallback)
    }
}

/// Remove definitions that `call` something neither defined nor loaded,
/// repeating until every remaining call resolves.
fn drop_unresolvable_calls(defs: &mut BTreeMap<String, ActionDef>, registry: &Registry) {
    loop {
        let broken: Vec<String> = defs
            .values()
            .filter(|d| {
                d.references()
                    .iter()
                    .any(|r| !defs.contains_key(*r) && !registry.exists(r))
            })
            .map(|d| d.name.clone())
            .collect();
        if broken.is_empty() {
            return;
        }
        for name in broken {
            tracing::warn!(action = %name, "dropping definition that calls an unknown action");
            defs.remove(&name);
        }
    }
}

fn dedup_adjacent(names: impl Iterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names {
        if out.last() != Some(&name) {
            out.push(name);
        }
    }
    out
}

/// `base`, or `base_2`, `base_3`, … until it clashes with nothing.
///
/// An existing composite with exactly this sequence is not a clash: it is
/// the same action and committing it again is a no-op.
fn unique_composite_name(
    base: &str,
    sequence: &[String],
    defs: &BTreeMap<String, ActionDef>,
    registry: &Registry,
) -> String {
    let wanted = ActionBody::Composite {
        sequence: sequence.to_vec(),
    };
    let clashes = |name: &str| {
        defs.contains_key(name)
            || sequence.iter().any(|s| s == name)
            || registry.get(name).is_some_and(|existing| existing.body != wanted)
    };

    let mut candidate = base.to_string();
    let mut n = 2;
    while clashes(&candidate) {
        let suffix = format!("_{n}");
        let mut stem = base.to_string();
        stem.truncate(MAX_ACTION_NAME_LEN - suffix.len());
        candidate = format!("{stem}{suffix}");
        n += 1;
    }
    candidate
}

// ---------------------------------------------------------------------------
// Instruction
// ---------------------------------------------------------------------------

/// The single instruction sent to the collaborator.
pub fn instruction(utterance: &str, available: &BTreeSet<String>) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "You plan desktop automation actions. The user said: \"{utterance}\"\n"
    );
    if available.is_empty() {
        out.push_str("No actions exist yet.\n\n");
    } else {
        let names: Vec<&str> = available.iter().map(String::as_str).collect();
        let _ = writeln!(out, "Existing actions: {}\n", names.join(", "));
    }
    out.push_str(
        "Reuse existing actions where they fit. For anything missing, define new \
actions that each do one small thing. Actions take no parameters.\n\n\
Write every new action in its own fenced block using this language:\n\n\
```action\n\
def open_chrome():\n    \
\"\"\"Open Google Chrome browser.\"\"\"\n    \
open_app \"Google Chrome\"\n    \
return \"Chrome opened successfully\"\n\
```\n\n\
Statements, one per line:\n\
- open_app \"App Name\"            bring an application to the front\n\
- run \"program\" \"arg\" ...       run a program to completion\n\
- write_file \"path\" \"content\"   write a file (~/ is the home directory)\n\
- record \"message\"              note something in the journal\n\
- call other_action             run another action\n\
- return \"status\"               the status reported to the user (last line)\n\n\
Say which actions are new. Then give the order to run them on one line:\n\
Call in this sequence: first_action, second_action\n\n\
If more than one action runs, name the wrapper on its own line:\n\
Composite function name: some_name\n",
    );
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
