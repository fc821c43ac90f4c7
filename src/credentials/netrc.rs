//! `.netrc` credential discovery.
//!
//! Used as the fallback for ISO tracker logins when `~/.isotracker.conf`
//! carries no username or password. Both the multi-line layout and the
//! single-line `machine host login user password pass` form are accepted.

use std::path::PathBuf;

use super::types::home_dir;
use super::{Credential, CredentialError, CredentialsProvider};

/// A credentials provider that reads from a `.netrc` file.
#[derive(Debug, Default)]
pub struct NetrcProvider {
  path: Option<PathBuf>,
}

impl NetrcProvider {
  /// Provider for `~/.netrc`.
  pub fn new() -> Self {
    Self::default()
  }

  /// Provider for an explicit file.
  pub fn with_path(path: impl Into<PathBuf>) -> Self {
    Self {
      path: Some(path.into()),
    }
  }
}

impl CredentialsProvider for NetrcProvider {
  fn get_credentials(&self, host: &str) -> Result<Option<Credential>, CredentialError> {
    let netrc_path = match &self.path {
      Some(path) => path.clone(),
      None => home_dir()?.join(".netrc"),
    };

    if !netrc_path.exists() {
      return Ok(None);
    }

    let content = std::fs::read_to_string(&netrc_path)?;
    Ok(parse_netrc(&content, host))
  }
}

#[derive(Default)]
struct Entry {
  machine: Option<String>,
  login: Option<String>,
  password: Option<String>,
}

impl Entry {
  fn into_credential(self) -> Option<Credential> {
    Some(Credential {
      username: self.login?,
      password: self.password?,
    })
  }
}

/// Find the entry for `target_host`, falling back to a `default` entry.
///
/// The first complete entry for the host wins. `macdef` bodies run to the
/// next blank line and are skipped.
fn parse_netrc(content: &str, target_host: &str) -> Option<Credential> {
  let mut entries: Vec<Entry> = Vec::new();
  let mut in_macdef = false;

  for line in content.lines() {
    let trimmed = line.trim();
    if in_macdef {
      in_macdef = !trimmed.is_empty();
      continue;
    }
    if trimmed.starts_with('#') {
      continue;
    }

    let mut tokens = trimmed.split_whitespace();
    while let Some(token) = tokens.next() {
      match token {
        "machine" => entries.push(Entry {
          machine: tokens.next().map(str::to_string),
          ..Entry::default()
        }),
        "default" => entries.push(Entry::default()),
        "login" | "password" | "account" => {
          let value = tokens.next().map(str::to_string);
          if let Some(entry) = entries.last_mut() {
            match token {
              "login" => entry.login = value,
              "password" => entry.password = value,
              _ => {}
            }
          }
        }
        "macdef" => {
          in_macdef = true;
          break;
        }
        _ => {}
      }
    }
  }

  let (specific, fallback): (Vec<Entry>, Vec<Entry>) = entries.into_iter().partition(|e| e.machine.is_some());

  specific
    .into_iter()
    .filter(|e| e.machine.as_deref() == Some(target_host))
    .find_map(Entry::into_credential)
    .or_else(|| fallback.into_iter().find_map(Entry::into_credential))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn multi_line_entries() {
    let content = r#"
machine iso.qa.ubuntu.com
  login tester
  password secret1

machine other.example.com
  login someone
  password secret2
"#;

    let cred = parse_netrc(content, "iso.qa.ubuntu.com").unwrap();
    assert_eq!(cred.username, "tester");
    assert_eq!(cred.password, "secret1");

    let cred = parse_netrc(content, "other.example.com").unwrap();
    assert_eq!(cred.username, "someone");
  }

  #[test]
  fn single_line_entries() {
    let content = "machine a.example.com login one password p1\nmachine b.example.com login two password p2\n";
    assert_eq!(parse_netrc(content, "b.example.com").unwrap().username, "two");
  }

  #[test]
  fn default_applies_only_without_specific_match() {
    let content = "default login anon password guest\nmachine iso.qa.ubuntu.com login tester password s\n";
    assert_eq!(parse_netrc(content, "iso.qa.ubuntu.com").unwrap().username, "tester");
    assert_eq!(parse_netrc(content, "elsewhere").unwrap().username, "anon");
  }

  #[test]
  fn incomplete_entries_are_skipped() {
    let content = "machine host\n  login only-login\nmachine host login full password p\n";
    assert_eq!(parse_netrc(content, "host").unwrap().username, "full");
    assert!(parse_netrc("machine host\n  password p\n", "host").is_none());
    assert!(parse_netrc("", "host").is_none());
  }

  #[test]
  fn comments_and_macdef_are_ignored() {
    let content = r#"
# personal logins
macdef init
  machine host login evil password bad

machine host
  login good
  password fine
"#;
    let cred = parse_netrc(content, "host").unwrap();
    assert_eq!(cred.username, "good");
  }

  #[test]
  fn provider_reads_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("netrc");
    std::fs::write(&path, "machine iso.qa.ubuntu.com login tester password s\n").unwrap();

    let provider = NetrcProvider::with_path(&path);
    assert_eq!(
      provider.get_credentials("iso.qa.ubuntu.com").unwrap(),
      Some(Credential {
        username: "tester".into(),
        password: "s".into(),
      })
    );
    assert!(NetrcProvider::with_path(dir.path().join("missing")).get_credentials("x").unwrap().is_none());
  }
}
