//! Credentials for Launchpad and the ISO QA tracker.
//!
//! Launchpad uses OAuth 1.0 tokens, read from flags/environment or from a
//! launchpadlib credentials file:
//!
//! ```text
//! [1]
//! consumer_key = archive-admin
//! consumer_secret =
//! access_token = ...
//! access_secret = ...
//! ```
//!
//! The QA tracker uses HTTP basic auth, configured in `~/.isotracker.conf`
//! with `~/.netrc` as fallback.

mod launchpad;
mod netrc;
mod provider;
mod types;

pub use launchpad::{CredentialsFileProvider, default_credentials_path};
pub use netrc::NetrcProvider;
pub use provider::{CredentialsProvider, StaticTokenProvider, TokenProvider, resolve_token};
pub use types::{Credential, CredentialError, OAuthToken, TokenSource};
pub(crate) use types::home_dir;
