//! Credential types shared by the Launchpad client and the QA tracker.

use std::fmt;
use std::path::PathBuf;

/// Username and password for HTTP basic auth (the ISO QA tracker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
  pub username: String,
  pub password: String,
}

/// An OAuth 1.0 access token as issued by Launchpad.
///
/// Launchpad desktop integrations use an empty consumer secret, so only the
/// consumer key, token and token secret are normally set.
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthToken {
  pub consumer_key: String,
  pub consumer_secret: String,
  pub access_token: String,
  pub access_secret: String,
}

// Secrets stay out of debug logs.
impl fmt::Debug for OAuthToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("OAuthToken")
      .field("consumer_key", &self.consumer_key)
      .field("access_token", &self.access_token)
      .finish_non_exhaustive()
  }
}

/// Where a resolved token came from, for `auth show`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSource {
  Environment,
  File(PathBuf),
}

impl fmt::Display for TokenSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Environment => write!(f, "command line / environment"),
      Self::File(path) => write!(f, "{}", path.display()),
    }
  }
}

/// Errors that can occur during credential operations.
#[derive(Debug)]
pub enum CredentialError {
  /// `$HOME` is not set, so no default credential file can be located.
  HomeNotFound,
  /// A credentials file exists but does not hold a usable token.
  InvalidCredentialsFile { path: PathBuf, message: String },
  /// Only some of the OAuth settings were given on the command line.
  IncompleteToken(&'static str),
  /// An I/O error occurred while reading credentials
  IoError(std::io::Error),
}

impl fmt::Display for CredentialError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::HomeNotFound => write!(f, "HOME is not set; cannot locate credential files"),
      Self::InvalidCredentialsFile { path, message } => {
        write!(f, "invalid credentials file {}: {message}", path.display())
      }
      Self::IncompleteToken(missing) => write!(f, "incomplete OAuth token: {missing} is missing"),
      Self::IoError(err) => write!(f, "I/O error: {err}"),
    }
  }
}

impl std::error::Error for CredentialError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      Self::IoError(err) => Some(err),
      _ => None,
    }
  }
}

impl From<std::io::Error> for CredentialError {
  fn from(err: std::io::Error) -> Self {
    Self::IoError(err)
  }
}

pub(crate) fn home_dir() -> Result<PathBuf, CredentialError> {
  std::env::var_os("HOME")
    .filter(|home| !home.is_empty())
    .map(PathBuf::from)
    .ok_or(CredentialError::HomeNotFound)
}

#[cfg(test)]
mod tests {
  use std::error::Error as _;

  use super::*;

  #[test]
  fn token_debug_hides_secrets() {
    let token = OAuthToken {
      consumer_key: "archive-admin".into(),
      consumer_secret: String::new(),
      access_token: "tok".into(),
      access_secret: "very-secret".into(),
    };
    let debug = format!("{token:?}");
    assert!(debug.contains("archive-admin"));
    assert!(!debug.contains("very-secret"));
  }

  #[test]
  fn error_display_and_source() {
    let err = CredentialError::IncompleteToken("access secret");
    assert_eq!(err.to_string(), "incomplete OAuth token: access secret is missing");
    assert!(err.source().is_none());

    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let err = CredentialError::from(io);
    assert_eq!(err.to_string(), "I/O error: denied");
    assert!(err.source().is_some());
  }
}
