use crate::output::{print_json, print_table};
use anyhow::Context;
use catalyst_core::action::{ActionBody, ActionDef};
use catalyst_core::catalog::ActionStore;
use catalyst_core::host::SystemHost;
use catalyst_core::registry::Registry;
use clap::Subcommand;
use std::path::Path;
use std::sync::Arc;

#[derive(Subcommand)]
pub enum ActionsSubcommand {
    /// List actions in the catalog
    List {
        /// Include internal actions (names starting with `_`)
        #[arg(long)]
        all: bool,
    },

    /// Show one action's definition
    Show { name: String },
}

pub fn run(root: &Path, subcmd: ActionsSubcommand, json: bool) -> anyhow::Result<()> {
    let store = ActionStore::new(root);
    let registry = Registry::load(&store, Arc::new(SystemHost::new(root)))
        .with_context(|| format!("failed to load {}", store.path().display()))?;

    match subcmd {
        ActionsSubcommand::List { all } => list(&store, &registry, all, json),
        ActionsSubcommand::Show { name } => show(&registry, &name, json),
    }
}

fn list(store: &ActionStore, registry: &Registry, all: bool, json: bool) -> anyhow::Result<()> {
    let names: Vec<String> = if all {
        let mut names: Vec<String> = store.names()?.into_iter().collect();
        names.retain(|n| registry.exists(n));
        names
    } else {
        registry.enumerate().into_iter().collect()
    };
    let defs: Vec<&ActionDef> = names.iter().filter_map(|n| registry.get(n)).collect();

    if json {
        return print_json(&defs);
    }
    if defs.is_empty() {
        println!("No actions yet.");
        return Ok(());
    }

    let rows = defs
        .iter()
        .map(|d| vec![d.name.clone(), kind(d).to_string(), d.doc.clone()])
        .collect();
    print_table(&["NAME", "KIND", "DOC"], rows);
    Ok(())
}

fn show(registry: &Registry, name: &str, json: bool) -> anyhow::Result<()> {
    let def = registry
        .get(name)
        .with_context(|| format!("unknown action: {name}"))?;

    if json {
        return print_json(def);
    }

    print!("{}", def.to_source());
    println!();
    println!("created: {}", def.created_at.to_rfc3339());
    if let Some(utterance) = &def.utterance {
        println!("from:    \"{utterance}\"");
    }
    Ok(())
}

fn kind(def: &ActionDef) -> &'static str {
    match def.body {
        ActionBody::Primitive { .. } => "primitive",
        ActionBody::Composite { .. } => "composite",
    }
}
