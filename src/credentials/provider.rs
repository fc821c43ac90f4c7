//! Credential provider abstractions.
//!
//! Basic-auth credentials are looked up per host; OAuth tokens come from an
//! ordered chain of [`TokenProvider`]s, the first one holding a token wins.

use super::{Credential, CredentialError, OAuthToken, TokenSource};

/// A provider for host-scoped username/password credentials.
pub trait CredentialsProvider {
  /// Returns `Ok(None)` when the provider has no entry for `host`, allowing
  /// fallback providers to run.
  fn get_credentials(&self, host: &str) -> Result<Option<Credential>, CredentialError>;
}

/// A provider for Launchpad OAuth tokens.
pub trait TokenProvider {
  fn get_token(&self) -> Result<Option<OAuthToken>, CredentialError>;

  fn source(&self) -> TokenSource;
}

/// Token given directly through flags or environment variables.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenProvider {
  pub consumer_key: Option<String>,
  pub access_token: Option<String>,
  pub access_secret: Option<String>,
}

impl TokenProvider for StaticTokenProvider {
  fn get_token(&self) -> Result<Option<OAuthToken>, CredentialError> {
    match (&self.consumer_key, &self.access_token, &self.access_secret) {
      (None, None, None) => Ok(None),
      (Some(consumer_key), Some(access_token), Some(access_secret)) => Ok(Some(OAuthToken {
        consumer_key: consumer_key.clone(),
        consumer_secret: String::new(),
        access_token: access_token.clone(),
        access_secret: access_secret.clone(),
      })),
      (None, _, _) => Err(CredentialError::IncompleteToken("consumer key")),
      (_, None, _) => Err(CredentialError::IncompleteToken("access token")),
      (_, _, None) => Err(CredentialError::IncompleteToken("access secret")),
    }
  }

  fn source(&self) -> TokenSource {
    TokenSource::Environment
  }
}

/// Walk providers in order and return the first token found.
pub fn resolve_token(providers: &[&dyn TokenProvider]) -> Result<Option<(OAuthToken, TokenSource)>, CredentialError> {
  for provider in providers {
    if let Some(token) = provider.get_token()? {
      return Ok(Some((token, provider.source())));
    }
  }
  Ok(None)
}
