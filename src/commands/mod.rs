//! CLI subcommand handlers.
//!
//! Each tool lives in its own module: a clap `Args` struct, a `handle_*`
//! entry point that prints and exits, and the underlying logic as plain
//! functions over [`LaunchpadApi`] so it can run against a fake in tests.

pub mod architecture_mismatches;
pub mod auth;
pub mod change_override;
pub mod chart;
pub mod completions;
pub mod component_mismatches;
pub mod copy_package;
pub mod copy_proposed_kernel;
pub mod iso_tracker;
pub mod kernel_routing;
pub mod manage_builders;
pub mod manage_chroot;
pub mod nbs_report;
pub mod remove_package;
pub mod sru_accept;
pub mod sru_report;
pub mod version;

use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::process;

use anyhow::{Context, Result};
use tracing::info;
use unicode_width::UnicodeWidthStr;

use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::credentials::{
  CredentialError, CredentialsFileProvider, OAuthToken, StaticTokenProvider, TokenSource, default_credentials_path,
  resolve_token,
};
use crate::launchpad::{Archive, ArchiveReference, DistroSeries, LaunchpadApi, LaunchpadClient, Pocket, SourceQuery};
use crate::launchpad::{SourcePublication, Suite};

/// Print an error with its cause chain and exit.
pub(crate) fn fail(colors: &ColorScheme, message: &str, err: impl Display, code: i32) -> ! {
  eprintln!("{} {}", colors.error("✗"), colors.error(message));
  eprintln!("  {err:#}");
  process::exit(code);
}

/// Look up the OAuth token from flags/environment, then the credentials file.
pub(crate) fn load_token(cli: &Cli) -> Result<Option<(OAuthToken, TokenSource)>, CredentialError> {
  let flags = StaticTokenProvider {
    consumer_key: cli.launchpad.consumer_key.clone(),
    access_token: cli.launchpad.access_token.clone(),
    access_secret: cli.launchpad.access_secret.clone(),
  };
  let file = CredentialsFileProvider::new(match &cli.launchpad.credentials_file {
    Some(path) => path.clone(),
    None => default_credentials_path()?,
  });
  resolve_token(&[&flags, &file])
}

/// Build a Launchpad client from the CLI settings, exiting with code 2 on
/// credential problems.
pub(crate) fn connect(cli: &Cli, colors: &ColorScheme) -> LaunchpadClient {
  let token = if cli.launchpad.anonymous {
    None
  } else {
    match load_token(cli) {
      Ok(Some((token, source))) => {
        info!("Using Launchpad credentials from {source}");
        Some(token)
      }
      Ok(None) => {
        info!("No Launchpad credentials found, continuing anonymously");
        None
      }
      Err(e) => fail(colors, "Failed to load Launchpad credentials", e, 2),
    }
  };

  match LaunchpadClient::new(
    cli.launchpad.api_root(),
    token,
    cli.performance.timeout,
    cli.performance.rate_limit,
  ) {
    Ok(client) => client,
    Err(e) => fail(colors, "Failed to create API client", e, 1),
  }
}

/// Ask a yes/no question on stdin; anything but `y...` is no.
pub(crate) fn confirm(prompt: &str) -> bool {
  print!("{prompt} [yN] ");
  let _ = io::stdout().flush();
  let mut response = String::new();
  if io::stdin().lock().read_line(&mut response).is_err() {
    return false;
  }
  response.trim().to_lowercase().starts_with('y')
}

/// Resolve an archive reference and the series of a suite in its
/// distribution.
pub async fn open_suite(api: &dyn LaunchpadApi, archive: &str, suite: &Suite) -> Result<(Archive, DistroSeries)> {
  let reference = ArchiveReference::parse(archive)?;
  let archive = api
    .get_archive(&reference)
    .await
    .with_context(|| format!("Failed to find archive {reference}"))?;
  let series = api
    .get_series(reference.distribution(), &suite.series)
    .await
    .with_context(|| format!("Failed to find series {}", suite.series))?;
  Ok((archive, series))
}

/// The newest published source `name` in a suite, optionally at `version`.
pub async fn find_source(
  api: &dyn LaunchpadApi,
  archive: &Archive,
  series: &DistroSeries,
  pocket: Pocket,
  name: &str,
  version: Option<&str>,
) -> Result<Option<SourcePublication>> {
  let query = SourceQuery {
    source_name: Some(name.to_string()),
    version: version.map(str::to_string),
    exact_match: true,
    distro_series_link: Some(series.self_link.clone()),
    pocket: Some(pocket),
    status: Some("Published".to_string()),
  };
  let publications = api.get_published_sources(archive, &query).await?;
  Ok(publications.into_iter().next())
}

/// Render rows as left-aligned columns separated by two spaces, measuring
/// display width rather than bytes.
pub fn render_table(rows: &[Vec<String>]) -> String {
  let columns = rows.iter().map(Vec::len).max().unwrap_or_default();
  let widths: Vec<usize> = (0..columns)
    .map(|c| {
      rows
        .iter()
        .filter_map(|row| row.get(c))
        .map(|cell| cell.width())
        .max()
        .unwrap_or_default()
    })
    .collect();

  let mut out = String::new();
  for row in rows {
    let mut line = String::new();
    for (c, cell) in row.iter().enumerate() {
      if c + 1 == row.len() {
        line.push_str(cell);
      } else {
        line.push_str(cell);
        line.push_str(&" ".repeat(widths[c] - cell.width() + 2));
      }
    }
    out.push_str(line.trim_end());
    out.push('\n');
  }
  out
}
