//! Append-only persistence for action definitions.
//!
//! The catalog file is a YAML document stream. Every definition is one
//! `---` document, so adding an action never rewrites what is already there.

use std::collections::BTreeSet;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::action::ActionDef;
use crate::error::Result;
use crate::paths;

pub struct ActionStore {
    path: PathBuf,
}

impl ActionStore {
    /// Store rooted at `<root>/.catalyst/catalog.yaml`.
    pub fn new(root: &Path) -> Self {
        Self::at(paths::catalog_path(root))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every persisted definition, in the order it was appended.
    ///
    /// A document that does not parse (typically the tail of an append that
    /// was interrupted) is skipped with a warning rather than failing the
    /// whole catalog.
    pub fn load(&self) -> Result<Vec<ActionDef>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let text = std::fs::read_to_string(&self.path)?;
        let mut defs = Vec::new();
        for (index, doc) in split_documents(&text).into_iter().enumerate() {
            match serde_yaml::from_str::<ActionDef>(doc) {
                Ok(def) => defs.push(def),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    document = index + 1,
                    error = %e,
                    "skipping unreadable catalog document"
                ),
            }
        }
        Ok(defs)
    }

    /// Names currently present on disk.
    pub fn names(&self) -> Result<BTreeSet<String>> {
        Ok(self.load()?.into_iter().map(|d| d.name).collect())
    }

    /// Append one definition and flush it to disk.
    pub fn append(&self, def: &ActionDef) -> Result<()> {
        let yaml = serde_yaml::to_string(def)?;
        let mut doc = String::with_capacity(yaml.len() + 4);
        doc.push_str("---\n");
        doc.push_str(&yaml);
        if !doc.ends_with('\n') {
            doc.push('\n');
        }
        if ends_mid_line(&self.path)? {
            doc.insert(0, '\n');
        }
        crate::io::append_durable(&self.path, &doc)?;
        tracing::debug!(action = %def.name, path = %self.path.display(), "appended definition");
        Ok(())
    }
}

/// Split a document stream on `---` marker lines, dropping blank documents.
fn split_documents(text: &str) -> Vec<&str> {
    let mut docs = Vec::new();
    let mut start = 0;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        if line.trim_end() == "---" {
            docs.push(&text[start..offset]);
            start = offset + line.len();
        }
        offset += line.len();
    }
    docs.push(&text[start..]);
    docs.retain(|d| !d.trim().is_empty());
    docs
}

/// True when the file exists and its last byte is not a newline.
fn ends_mid_line(path: &Path) -> Result<bool> {
    let mut file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Op;
    use tempfile::TempDir;

    fn record_action(name: &str) -> ActionDef {
        ActionDef::primitive(
            name,
            "Record a note.",
            vec![Op::Record {
                message: format!("{name} ran"),
            }],
            format!("{name} done"),
        )
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = ActionStore::new(dir.path());
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn append_preserves_order_and_prior_content() {
        let dir = TempDir::new().unwrap();
        let store = ActionStore::new(dir.path());
        store.append(&record_action("first")).unwrap();
        let after_first = std::fs::read_to_string(store.path()).unwrap();
        store
            .append(&ActionDef::composite("run_task", vec!["first".into()]))
            .unwrap();
        let after_second = std::fs::read_to_string(store.path()).unwrap();
        assert!(after_second.starts_with(&after_first));

        let names: Vec<_> = store.load().unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["first", "run_task"]);
    }

    #[test]
    fn torn_trailing_document_is_skipped() {
        let dir = TempDir::new().unwrap();
        let store = ActionStore::new(dir.path());
        store.append(&record_action("first")).unwrap();
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(store.path())
            .unwrap();
        std::io::Write::write_all(&mut file, b"---\nname: second\nbody: [").unwrap();

        let names: Vec<_> = store.load().unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["first"]);
    }

    #[test]
    fn append_after_a_torn_document_starts_a_new_line() {
        let dir = TempDir::new().unwrap();
        let store = ActionStore::new(dir.path());
        store.append(&record_action("first")).unwrap();
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(store.path())
            .unwrap();
        std::io::Write::write_all(&mut file, b"---\nname: torn\ndoc: \"half").unwrap();
        drop(file);

        store.append(&record_action("third")).unwrap();
        let names: Vec<_> = store.load().unwrap().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["first", "third"]);
    }

    #[test]
    fn split_ignores_dashes_inside_values() {
        let text = "---\nname: a\ndoc: |-\n  ---\n---\nname: b\n";
        let docs = split_documents(text);
        assert_eq!(docs.len(), 2);
        assert!(docs[0].contains("  ---"));
    }
}
