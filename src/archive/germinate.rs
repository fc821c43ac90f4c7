//! Parsing of germinate output tables.
//!
//! Germinate writes one table per seed, for example:
//!
//! ```text
//! Package                   | Source           | Why                  | Maintainer
//! --------------------------+------------------+----------------------+-----------
//! adduser                   | adduser          | Ubuntu.Minimal seed  | Ubuntu Core
//! ----------------------------------------------------------------------------------
//!                           |                  |                      |
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

/// A seeded binary package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GerminateEntry {
  pub package: String,
  pub source: String,
  pub why: String,
  /// Name of the seed file the entry came from.
  pub seed: String,
}

/// Union of one or more germinate output tables.
#[derive(Debug, Clone, Default)]
pub struct GerminateOutput {
  entries: BTreeMap<String, GerminateEntry>,
}

impl GerminateOutput {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parse one table and merge its rows. Earlier seeds win on duplicates.
  pub fn add_table(&mut self, seed: &str, content: &str) {
    for line in content.lines() {
      let Some(entry) = parse_row(seed, line) else {
        continue;
      };
      self.entries.entry(entry.package.clone()).or_insert(entry);
    }
  }

  pub fn add_file(&mut self, path: &Path) -> Result<()> {
    let content =
      std::fs::read_to_string(path).with_context(|| format!("Failed to read germinate output {}", path.display()))?;
    let seed = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    self.add_table(&seed, &content);
    Ok(())
  }

  pub fn contains(&self, package: &str) -> bool {
    self.entries.contains_key(package)
  }

  pub fn get(&self, package: &str) -> Option<&GerminateEntry> {
    self.entries.get(package)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &GerminateEntry> {
    self.entries.values()
  }
}

fn parse_row(seed: &str, line: &str) -> Option<GerminateEntry> {
  let trimmed = line.trim();
  if trimmed.is_empty() || trimmed.starts_with('-') {
    return None;
  }

  let columns: Vec<&str> = line.split('|').map(str::trim).collect();
  if columns.len() < 3 {
    return None;
  }

  let package = columns[0];
  if package.is_empty() || package == "Package" {
    return None;
  }

  Some(GerminateEntry {
    package: package.to_string(),
    source: columns[1].to_string(),
    why: columns[2].to_string(),
    seed: seed.to_string(),
  })
}
