//! Minimal INI reader for the configuration files the tools share with the
//! Python ecosystem (`~/.isotracker.conf`, launchpadlib credential files).
//!
//! Supports `[section]` headers, `key = value` and `key: value` pairs, `#` and
//! `;` comment lines, and indented continuation lines. Keys are
//! case-insensitive; keys in `[DEFAULT]` apply to every section.

use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IniError {
  #[error("I/O error reading {path}: {source}")]
  Io {
    path: String,
    #[source]
    source: std::io::Error,
  },

  #[error("line {line_number}: expected `key = value`, got {line:?}")]
  Syntax { line_number: usize, line: String },

  #[error("line {line_number}: key outside of any section")]
  MissingSection { line_number: usize },
}

const DEFAULT_SECTION: &str = "DEFAULT";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Section {
  name: String,
  entries: Vec<(String, String)>,
}

impl Section {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    let key = key.to_ascii_lowercase();
    self.entries.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }

  fn set(&mut self, key: String, value: String) {
    match self.entries.iter_mut().find(|(k, _)| *k == key) {
      Some(entry) => entry.1 = value,
      None => self.entries.push((key, value)),
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ini {
  sections: Vec<Section>,
}

impl Ini {
  pub fn parse(text: &str) -> Result<Self, IniError> {
    let mut ini = Ini::default();
    let mut current: Option<usize> = None;
    let mut last_key: Option<String> = None;

    for (index, raw) in text.lines().enumerate() {
      let line_number = index + 1;
      let trimmed = raw.trim();

      if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
        continue;
      }

      if raw.starts_with([' ', '\t'])
        && let (Some(key), Some(pos)) = (&last_key, current)
      {
        if let Some(entry) = ini.sections[pos].entries.iter_mut().find(|(k, _)| k == key) {
          if !entry.1.is_empty() {
            entry.1.push('\n');
          }
          entry.1.push_str(trimmed);
        }
        continue;
      }

      if let Some(name) = trimmed.strip_prefix('[').and_then(|rest| rest.strip_suffix(']')) {
        let name = name.trim();
        // Re-opened sections keep accumulating into the first occurrence.
        let pos = match ini.sections.iter().position(|s| s.name == name) {
          Some(pos) => pos,
          None => {
            ini.sections.push(Section {
              name: name.to_string(),
              entries: Vec::new(),
            });
            ini.sections.len() - 1
          }
        };
        current = Some(pos);
        last_key = None;
        continue;
      }

      let Some(split) = trimmed.find(['=', ':']) else {
        return Err(IniError::Syntax {
          line_number,
          line: raw.to_string(),
        });
      };
      let key = trimmed[..split].trim().to_ascii_lowercase();
      let value = trimmed[split + 1..].trim().to_string();

      let Some(pos) = current else {
        return Err(IniError::MissingSection { line_number });
      };
      ini.sections[pos].set(key.clone(), value);
      last_key = Some(key);
    }

    Ok(ini)
  }

  /// Read and parse a file.
  pub fn load(path: &Path) -> Result<Self, IniError> {
    let text = std::fs::read_to_string(path).map_err(|source| IniError::Io {
      path: path.display().to_string(),
      source,
    })?;
    Self::parse(&text)
  }

  pub fn section(&self, name: &str) -> Option<&Section> {
    self.sections.iter().find(|s| s.name == name)
  }

  pub fn has_section(&self, name: &str) -> bool {
    self.section(name).is_some()
  }

  /// Section names in file order, excluding `DEFAULT`.
  pub fn sections(&self) -> impl Iterator<Item = &Section> {
    self.sections.iter().filter(|s| s.name != DEFAULT_SECTION)
  }

  /// Value of `key` in `section`, falling back to `[DEFAULT]`.
  pub fn get(&self, section: &str, key: &str) -> Option<&str> {
    self
      .section(section)
      .and_then(|s| s.get(key))
      .or_else(|| self.section(DEFAULT_SECTION).and_then(|s| s.get(key)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_sections_and_values() {
    let ini = Ini::parse(
      "# tracker config\n[general]\nurl = https://iso.qa.ubuntu.com/xmlrpc.php\nUsername: tester\n\n[daily]\nurl=https://daily.example.com/xmlrpc.php\n",
    )
    .unwrap();

    assert_eq!(ini.get("general", "username"), Some("tester"));
    assert_eq!(ini.get("daily", "URL"), Some("https://daily.example.com/xmlrpc.php"));
    assert!(ini.get("daily", "username").is_none());
    let names: Vec<_> = ini.sections().map(Section::name).collect();
    assert_eq!(names, vec!["general", "daily"]);
  }

  #[test]
  fn continuation_lines_and_defaults() {
    let ini = Ini::parse("[DEFAULT]\nowner = qa\n[1]\nconsumer_key = System-wide: Ubuntu\nnote = first\n  second\n")
      .unwrap();

    assert_eq!(ini.get("1", "consumer_key"), Some("System-wide: Ubuntu"));
    assert_eq!(ini.get("1", "note"), Some("first\nsecond"));
    assert_eq!(ini.get("1", "owner"), Some("qa"));
    assert_eq!(ini.sections().count(), 1);
  }

  #[test]
  fn empty_values_are_kept() {
    let ini = Ini::parse("[1]\nconsumer_secret =\n").unwrap();
    assert_eq!(ini.get("1", "consumer_secret"), Some(""));
  }

  #[test]
  fn rejects_keys_before_sections() {
    assert!(matches!(
      Ini::parse("key = value\n"),
      Err(IniError::MissingSection { line_number: 1 })
    ));
    assert!(matches!(
      Ini::parse("[a]\nno separator\n"),
      Err(IniError::Syntax { line_number: 2, .. })
    ));
  }
}
