//! The in-memory action namespace.
//!
//! The registry is populated from the [`ActionStore`] at start-up and only
//! changes through [`Registry::reload`]. Lookups never consult the disk, so
//! actions committed during this lifetime stay invisible until a reload.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::action::{ActionBody, ActionDef, Op, COMPOSITE_STATUS};
use crate::catalog::ActionStore;
use crate::error::{CatalystError, Result};
use crate::host::Host;
use crate::paths;

/// Nested `call`s deeper than this abort the invocation.
pub const MAX_CALL_DEPTH: usize = 16;

pub struct Registry {
    actions: HashMap<String, ActionDef>,
    host: Arc<dyn Host>,
}

impl Registry {
    /// An empty registry; mostly useful in tests.
    pub fn new(host: Arc<dyn Host>) -> Self {
        Self {
            actions: HashMap::new(),
            host,
        }
    }

    /// Build a registry from every definition in `store`.
    pub fn load(store: &ActionStore, host: Arc<dyn Host>) -> Result<Self> {
        let mut registry = Self::new(host);
        registry.reload(store)?;
        Ok(registry)
    }

    /// Replace the loaded table with a fresh read of `store`.
    ///
    /// If a name appears more than once on disk the first definition wins.
    pub fn reload(&mut self, store: &ActionStore) -> Result<usize> {
        let mut actions = HashMap::new();
        for def in store.load()? {
            if !paths::is_valid_action_name(&def.name) {
                tracing::warn!(action = %def.name, "skipping stored action with invalid name");
                continue;
            }
            if actions.contains_key(&def.name) {
                tracing::warn!(action = %def.name, "duplicate stored definition ignored");
                continue;
            }
            actions.insert(def.name.clone(), def);
        }
        self.actions = actions;
        tracing::debug!(count = self.actions.len(), "registry loaded");
        Ok(self.actions.len())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ActionDef> {
        self.actions.get(name)
    }

    /// All non-internal action names.
    pub fn enumerate(&self) -> BTreeSet<String> {
        self.actions
            .keys()
            .filter(|name| !paths::is_internal(name))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Run `name` and return its status string.
    pub fn invoke(&self, name: &str) -> Result<String> {
        let status = self.invoke_at(name, 0)?;
        tracing::info!(action = name, status = %status, "action completed");
        Ok(status)
    }

    fn invoke_at(&self, name: &str, depth: usize) -> Result<String> {
        if depth > MAX_CALL_DEPTH {
            return Err(CatalystError::CallDepthExceeded(name.to_string()));
        }
        let def = self
            .actions
            .get(name)
            .ok_or_else(|| CatalystError::UnknownAction(name.to_string()))?;

        match &def.body {
            ActionBody::Composite { sequence } => {
                for step in sequence {
                    let status = self.invoke_at(step, depth + 1)?;
                    tracing::debug!(composite = name, action = %step, status = %status, "step completed");
                }
                Ok(COMPOSITE_STATUS.to_string())
            }
            ActionBody::Primitive { ops, returns } => {
                for op in ops {
                    self.apply(name, op, depth)?;
                }
                Ok(returns.clone())
            }
        }
    }

    fn apply(&self, name: &str, op: &Op, depth: usize) -> Result<()> {
        let failed = |reason: String| CatalystError::ActionFailed {
            action: name.to_string(),
            reason,
        };
        match op {
            Op::OpenApp { app } => self.host.open_app(app).map_err(failed),
            Op::Run { program, args } => self.host.run(program, args).map(|_| ()).map_err(failed),
            Op::WriteFile { path, content } => {
                let path = paths::expand_home(path)?;
                self.host.write_file(&path, content).map_err(failed)
            }
            Op::Record { message } => self.host.record(name, message).map_err(failed),
            Op::Call { action } => {
                let status = self.invoke_at(action, depth + 1)?;
                tracing::debug!(caller = name, action = %action, status = %status, "nested call completed");
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
