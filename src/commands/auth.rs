//! Authentication subcommand handlers.
//!
//! Covers both `archive-admin auth test`, which performs a live API call, and
//! `archive-admin auth show`, which prints the currently detected credential
//! sources.

use std::process;

use super::{connect, load_token};
use crate::cli::{AuthCommand, Cli};
use crate::color::ColorScheme;
use crate::credentials::default_credentials_path;
use crate::launchpad::LaunchpadApi;

/// Dispatch the authentication subcommands defined under `archive-admin auth`.
///
/// `auth test` calls `people/+me` with the resolved token, while `auth show`
/// prints where the token would be read from without touching the network.
pub(crate) async fn handle_auth_command(subcommand: AuthCommand, cli: &Cli, colors: &ColorScheme) {
  match subcommand {
    AuthCommand::Test => test_auth(cli, colors).await,
    AuthCommand::Show => show_auth_config(cli, colors),
  }
}

async fn test_auth(cli: &Cli, colors: &ColorScheme) {
  let api_root = cli.launchpad.api_root();
  println!("{} {}", colors.info("→"), colors.info("Testing authentication"));
  println!("  {}: {}", colors.emphasis("API root"), colors.link(&api_root));

  let client = connect(cli, colors);
  if client.is_anonymous() {
    eprintln!("\n{} {}", colors.error("✗"), colors.error("No Launchpad credentials found"));
    eprintln!("\n{}", colors.info("Setup instructions:"));
    eprintln!("  Provide an OAuth token via:");
    eprintln!("     • CLI flags: --consumer-key, --access-token and --access-secret");
    eprintln!("     • Environment variables: LAUNCHPAD_CONSUMER_KEY, LAUNCHPAD_ACCESS_TOKEN, LAUNCHPAD_ACCESS_SECRET");
    eprintln!("     • A launchpadlib credentials file (--credentials-file)");
    process::exit(2);
  }

  println!("\n{} {}", colors.info("→"), colors.info("Calling Launchpad API..."));
  match client.me().await {
    Ok(person) => {
      println!("\n{} {}", colors.success("✓"), colors.success("Authentication successful!"));
      println!("\n{}", colors.emphasis("User Information:"));
      println!("  {}: {}", colors.emphasis("Display Name"), person.display_name);
      println!("  {}: {}", colors.emphasis("Name"), colors.dimmed(&person.name));
      println!("\n{} Your credentials are working correctly.", colors.info("ℹ"));
    }
    Err(e) => {
      eprintln!("\n{} {}", colors.error("✗"), colors.error("Authentication failed"));
      eprintln!("  {e:#}");
      eprintln!("\n{}", colors.info("Common issues:"));
      eprintln!("  1. The token was revoked or never authorized in the browser");
      eprintln!("  2. The token belongs to a different Launchpad instance");
      eprintln!("  3. Network connectivity issues");
      eprintln!(
        "\n{}",
        colors.dimmed("Run 'archive-admin auth show' to see your current configuration")
      );
      process::exit(2);
    }
  }
}

/// Display the configured API root and where the OAuth token comes from.
fn show_auth_config(cli: &Cli, colors: &ColorScheme) {
  println!("{}\n", colors.emphasis("Authentication Configuration"));

  let api_root = cli.launchpad.api_root();
  let root_source = if cli.launchpad.api_root.is_some() {
    "--api-root / LAUNCHPAD_API_ROOT"
  } else {
    "--launchpad-instance"
  };
  println!("{}: {}", colors.emphasis("API root"), colors.link(&api_root));
  println!("  {}: {}", colors.dimmed("Source"), colors.dimmed(root_source));

  let file = cli
    .launchpad
    .credentials_file
    .clone()
    .or_else(|| default_credentials_path().ok());
  match &file {
    Some(path) => println!(
      "\n{}: {}",
      colors.emphasis("Credentials file"),
      colors.path(path.display())
    ),
    None => println!("\n{}: {}", colors.emphasis("Credentials file"), colors.dimmed("(not set)")),
  }

  if cli.launchpad.anonymous {
    println!("\n{} Anonymous access requested", colors.info("ℹ"));
    return;
  }

  match load_token(cli) {
    Ok(Some((token, source))) => {
      println!("\n{}: {}", colors.emphasis("Consumer key"), token.consumer_key);
      println!("{}: {}", colors.emphasis("Access token"), colors.dimmed(mask(&token.access_token)));
      println!("  {}: {}", colors.dimmed("Source"), colors.dimmed(source));
      println!("\n{} {}", colors.success("✓"), colors.success("Credentials configured"));
    }
    Ok(None) => {
      println!(
        "\n{} {} for authenticated access",
        colors.warning("⚠"),
        colors.warning("No OAuth token")
      );
      println!("  Use --consumer-key/--access-token/--access-secret or a credentials file:");
      println!("    [1]");
      println!("    consumer_key = archive-admin");
      println!("    consumer_secret =");
      println!("    access_token = ...");
      println!("    access_secret = ...");
    }
    Err(e) => {
      println!("\n{} {}", colors.warning("⚠"), colors.warning("Credentials unusable"));
      println!("  {e}");
    }
  }
}

fn mask(secret: &str) -> String {
  let count = secret.chars().count();
  if count > 8 {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}{}", "*".repeat(count - 4))
  } else {
    "*".repeat(count)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mask_keeps_short_prefix() {
    assert_eq!(mask("abcdefghijk"), "abcd*******");
    assert_eq!(mask("short"), "*****");
  }
}
