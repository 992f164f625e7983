use anyhow::Context;
use catalyst_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path) -> anyhow::Result<()> {
    println!("Initializing catalyst in: {}", root.display());

    let dir = paths::catalyst_dir(root);
    io::ensure_dir(&dir).with_context(|| format!("failed to create {}", dir.display()))?;

    if !paths::config_path(root).exists() {
        Config::default()
            .save(root)
            .context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }

    let catalog = paths::catalog_path(root);
    if io::write_if_missing(&catalog, b"").context("failed to create catalog")? {
        println!("  created: {}", paths::CATALOG_FILE);
    } else {
        println!("  exists:  {}", paths::CATALOG_FILE);
    }

    println!("\nSay something with `catalyst run <utterance>` or start `catalyst listen`.");
    Ok(())
}
