use crate::output::print_json;
use anyhow::Context;
use catalyst_core::{
    catalog::ActionStore,
    config::Config,
    continuation::{Continuation, ContinuationStore},
    paths,
};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StatusOutput<'a> {
    root: String,
    initialized: bool,
    actions: usize,
    restart: &'a str,
    pending: Option<Continuation>,
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    let names = ActionStore::new(root)
        .names()
        .context("failed to read catalog")?;
    let pending = ContinuationStore::new(root)
        .read()
        .context("failed to read continuation")?;

    let restart = match config.executor.restart {
        catalyst_core::config::RestartMode::Reload => "reload",
        catalyst_core::config::RestartMode::Exec => "exec",
    };
    let out = StatusOutput {
        root: root.display().to_string(),
        initialized: paths::catalyst_dir(root).is_dir(),
        actions: names.len(),
        restart,
        pending,
    };

    if json {
        return print_json(&out);
    }

    println!("root:     {}", out.root);
    if !out.initialized {
        println!("          (not initialized; run `catalyst init`)");
    }
    println!("actions:  {}", out.actions);
    println!("restart:  {}", out.restart);
    match &out.pending {
        Some(c) => println!(
            "pending:  {} (from \"{}\", {})",
            c.pending_action,
            c.utterance,
            c.created_at.to_rfc3339()
        ),
        None => println!("pending:  none"),
    }
    Ok(())
}
