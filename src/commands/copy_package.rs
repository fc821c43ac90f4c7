//! `archive-admin copy-package`: copy sources between archives and suites.

use std::process;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use super::{confirm, connect, fail, find_source, open_suite};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::launchpad::{Archive, CopyRequest, LaunchpadApi, SourcePublication, Suite};

#[derive(Debug, Clone, Args)]
pub struct CopyPackageArgs {
  /// Source package names
  #[arg(required = true, value_name = "PACKAGE")]
  pub packages: Vec<String>,

  /// Archive to copy from
  #[arg(long = "from", default_value = "ubuntu", value_name = "ARCHIVE")]
  pub from_archive: String,

  /// Suite to copy from, e.g. noble-proposed
  #[arg(short = 's', long = "from-suite", value_name = "SUITE")]
  pub from_suite: Suite,

  /// Archive to copy to
  #[arg(long = "to", default_value = "ubuntu", value_name = "ARCHIVE")]
  pub to_archive: String,

  /// Suite to copy to (default: the source suite)
  #[arg(long = "to-suite", value_name = "SUITE")]
  pub to_suite: Option<Suite>,

  /// Copy the binaries too
  #[arg(short = 'b', long)]
  pub include_binaries: bool,

  /// Allow copying from a private archive to a public one
  #[arg(long)]
  pub unembargo: bool,

  /// Skip the destination's upload queue approval
  #[arg(long)]
  pub auto_approve: bool,

  /// Copy this version instead of the current publication
  #[arg(long = "version", value_name = "VERSION")]
  pub package_version: Option<String>,
}

impl CopyPackageArgs {
  pub fn validate(&self) -> Result<(), String> {
    if self.package_version.is_some() && self.packages.len() > 1 {
      return Err("--version can only be used with a single package".to_string());
    }
    if self.from_archive == self.to_archive && self.destination_suite() == self.from_suite {
      return Err(format!(
        "Cannot copy from {}/{} to itself",
        self.from_archive, self.from_suite
      ));
    }
    Ok(())
  }

  pub fn destination_suite(&self) -> Suite {
    self.to_suite.clone().unwrap_or_else(|| self.from_suite.clone())
  }
}

/// The copies to request, resolved against Launchpad.
#[derive(Debug)]
pub struct CopyPlan {
  pub destination: Archive,
  pub copies: Vec<(SourcePublication, CopyRequest)>,
  /// Requested packages with no matching publication.
  pub missing: Vec<String>,
}

/// Look up every requested source in the origin suite.
pub async fn plan_copy(api: &dyn LaunchpadApi, args: &CopyPackageArgs) -> Result<CopyPlan> {
  let (from_archive, from_series) = open_suite(api, &args.from_archive, &args.from_suite).await?;
  let to_suite = args.destination_suite();
  let (destination, _) = open_suite(api, &args.to_archive, &to_suite).await?;

  let mut copies = Vec::new();
  let mut missing = Vec::new();
  for name in &args.packages {
    let found = find_source(
      api,
      &from_archive,
      &from_series,
      args.from_suite.pocket,
      name,
      args.package_version.as_deref(),
    )
    .await
    .with_context(|| format!("Failed to look up {name} in {}", args.from_suite))?;

    let Some(publication) = found else {
      warn!("{name} is not published in {}/{}", args.from_archive, args.from_suite);
      missing.push(name.clone());
      continue;
    };

    let request = CopyRequest {
      source_name: publication.source_package_name.clone(),
      version: publication.source_package_version.clone(),
      from_archive_link: from_archive.self_link.clone(),
      to_series: Some(to_suite.series.clone()),
      to_pocket: to_suite.pocket,
      include_binaries: args.include_binaries,
      unembargo: args.unembargo,
      auto_approve: args.auto_approve,
    };
    copies.push((publication, request));
  }

  Ok(CopyPlan {
    destination,
    copies,
    missing,
  })
}

pub async fn execute_copy(api: &dyn LaunchpadApi, plan: &CopyPlan) -> Result<usize> {
  for (_, request) in &plan.copies {
    api
      .copy_package(&plan.destination, request)
      .await
      .with_context(|| format!("Failed to copy {} {}", request.source_name, request.version))?;
    info!("Requested copy of {} {}", request.source_name, request.version);
  }
  Ok(plan.copies.len())
}

/// One line of the copy listing, e.g. `→ Copy hello 2.10-3 from ubuntu/noble-proposed to ubuntu/noble-updates`.
pub fn describe_copy(
  colors: &ColorScheme,
  args: &CopyPackageArgs,
  publication: &SourcePublication,
  request: &CopyRequest,
) -> String {
  format!(
    "{} {} {} {} {} {}/{} {} {}/{}{}",
    colors.info("→"),
    colors.emphasis("Copy"),
    publication.source_package_name,
    colors.number(&publication.source_package_version),
    colors.dimmed("from"),
    args.from_archive,
    args.from_suite,
    colors.dimmed("to"),
    args.to_archive,
    args.destination_suite(),
    if request.include_binaries { " (with binaries)" } else { "" },
  )
}

pub(crate) async fn handle_copy_package_command(args: &CopyPackageArgs, cli: &Cli, colors: &ColorScheme) {
  let client = connect(cli, colors);
  let plan = match plan_copy(&client, args).await {
    Ok(plan) => plan,
    Err(e) => fail(colors, "Failed to prepare copy", e, 1),
  };

  for (publication, request) in &plan.copies {
    println!("{}", describe_copy(colors, args, publication, request));
  }

  if plan.copies.is_empty() {
    eprintln!("{} {}", colors.error("✗"), colors.error("Nothing to copy"));
    process::exit(1);
  }
  if cli.behavior.dry_run {
    println!("{}", colors.dimmed("Dry run; no copies requested."));
    return;
  }
  if !cli.behavior.yes && !confirm("Copy?") {
    return;
  }

  match execute_copy(&client, &plan).await {
    Ok(count) => println!("{} Requested {} copies", colors.success("✓"), colors.number(count)),
    Err(e) => fail(colors, "Copy failed", e, 1),
  }
  if !plan.missing.is_empty() {
    process::exit(1);
  }
}
