use anyhow::Context;
use std::path::Path;

use crate::output::print_outcome;
use crate::session::{self, Overrides};
use crate::source::{LineSource, UtteranceSource};

/// Read utterances from stdin until EOF or an exit phrase.
///
/// A failing utterance is reported and the loop keeps listening; only
/// set-up errors (config, credential, catalog) end the command.
pub fn run(root: &Path, overrides: &Overrides, json: bool) -> anyhow::Result<()> {
    let mut dispatcher = session::open(root, overrides)?;

    match dispatcher.startup() {
        Ok(Some(resumed)) => {
            print_outcome(&catalyst_core::dispatcher::Outcome::Resumed(resumed), json)?
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, "pending action failed on start-up");
            eprintln!("error: {e}");
        }
    }

    tracing::info!(actions = dispatcher.registry().len(), "listening");
    let mut source = LineSource::stdin().context("failed to open stdin")?;
    source.listen(&mut |utterance| {
        match dispatcher.handle(utterance) {
            Ok(outcome) => print_outcome(&outcome, json)?,
            Err(e) => {
                tracing::error!(utterance, error = %e, "utterance failed");
                eprintln!("error: {e}");
            }
        }
        Ok(())
    })
}
