//! launchpadlib-style credential files.
//!
//! ```text
//! [1]
//! consumer_key = archive-admin
//! consumer_secret =
//! access_token = XXXXXXXXXXXXXXXXXXXX
//! access_secret = YYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYYY
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use super::types::home_dir;
use super::{CredentialError, OAuthToken, TokenProvider, TokenSource};
use crate::ini::{Ini, IniError};

const SECTION: &str = "1";

/// Default credentials file, `~/.config/archive-admin/credentials`.
pub fn default_credentials_path() -> Result<PathBuf, CredentialError> {
  Ok(home_dir()?.join(".config").join("archive-admin").join("credentials"))
}

/// Reads an OAuth token from a launchpadlib credentials file.
#[derive(Debug, Clone)]
pub struct CredentialsFileProvider {
  path: PathBuf,
}

impl CredentialsFileProvider {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn invalid(&self, message: impl Into<String>) -> CredentialError {
    CredentialError::InvalidCredentialsFile {
      path: self.path.clone(),
      message: message.into(),
    }
  }
}

impl TokenProvider for CredentialsFileProvider {
  fn get_token(&self) -> Result<Option<OAuthToken>, CredentialError> {
    if !self.path.exists() {
      debug!("No credentials file at {}", self.path.display());
      return Ok(None);
    }

    let ini = match Ini::load(&self.path) {
      Ok(ini) => ini,
      Err(IniError::Io { source, .. }) => return Err(source.into()),
      Err(err) => return Err(self.invalid(err.to_string())),
    };

    let field = |key: &'static str| {
      ini
        .get(SECTION, key)
        .map(str::to_string)
        .ok_or_else(|| self.invalid(format!("missing {key} in section [{SECTION}]")))
    };

    Ok(Some(OAuthToken {
      consumer_key: field("consumer_key")?,
      consumer_secret: ini.get(SECTION, "consumer_secret").unwrap_or_default().to_string(),
      access_token: field("access_token")?,
      access_secret: field("access_secret")?,
    }))
  }

  fn source(&self) -> TokenSource {
    TokenSource::File(self.path.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_launchpadlib_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials");
    std::fs::write(
      &path,
      "[1]\nconsumer_key = archive-admin\nconsumer_secret = \naccess_token = tok\naccess_secret = sec\n",
    )
    .unwrap();

    let provider = CredentialsFileProvider::new(&path);
    let token = provider.get_token().unwrap().unwrap();
    assert_eq!(token.consumer_key, "archive-admin");
    assert_eq!(token.consumer_secret, "");
    assert_eq!(token.access_secret, "sec");
    assert_eq!(provider.source(), TokenSource::File(path));
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let provider = CredentialsFileProvider::new(dir.path().join("nope"));
    assert!(provider.get_token().unwrap().is_none());
  }

  #[test]
  fn missing_fields_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials");
    std::fs::write(&path, "[1]\nconsumer_key = archive-admin\n").unwrap();

    let err = CredentialsFileProvider::new(&path).get_token().unwrap_err();
    assert!(err.to_string().contains("missing access_token"));
  }
}
