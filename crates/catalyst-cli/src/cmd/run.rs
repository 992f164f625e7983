use anyhow::Context;
use catalyst_core::dispatcher::Outcome;
use std::path::Path;

use crate::output::print_outcome;
use crate::session::{self, Overrides};

/// Handle one utterance given on the command line.
///
/// A continuation left by an earlier process (or by an exec restart of this
/// one) takes precedence: it runs and the utterance is not planned.
pub fn run(root: &Path, words: &[String], overrides: &Overrides, json: bool) -> anyhow::Result<()> {
    let utterance = words.join(" ");
    let mut dispatcher = session::open(root, overrides)?;

    if let Some(resumed) = dispatcher
        .startup()
        .context("failed to resume pending action")?
    {
        return print_outcome(&Outcome::Resumed(resumed), json);
    }

    let outcome = dispatcher
        .handle(&utterance)
        .with_context(|| format!("failed to handle '{utterance}'"))?;
    print_outcome(&outcome, json)
}
