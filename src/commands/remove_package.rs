//! `archive-admin remove-package`: request deletion of publications.

use std::process;

use anyhow::{Context, Result};
use clap::Args;
use tracing::warn;

use super::{confirm, connect, fail, find_source, open_suite};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::launchpad::{Archive, BinaryQuery, DistroSeries, LaunchpadApi, Suite};

#[derive(Debug, Clone, Args)]
pub struct RemovePackageArgs {
  /// Package names (sources unless --binary)
  #[arg(required = true, value_name = "PACKAGE")]
  pub packages: Vec<String>,

  /// Archive to remove from
  #[arg(long, default_value = "ubuntu", value_name = "ARCHIVE")]
  pub archive: String,

  /// Suite to remove from, e.g. noble-proposed
  #[arg(short = 's', long, value_name = "SUITE")]
  pub suite: Suite,

  /// Reason recorded with the removal
  #[arg(short = 'm', long = "removal-comment", value_name = "COMMENT")]
  pub removal_comment: String,

  /// Treat names as binary packages
  #[arg(long, conflicts_with = "source_only")]
  pub binary: bool,

  /// Remove only the source, keeping its binaries
  #[arg(long)]
  pub source_only: bool,

  /// Only remove this version
  #[arg(long = "version", value_name = "VERSION")]
  pub package_version: Option<String>,
}

impl RemovePackageArgs {
  pub fn validate(&self) -> Result<(), String> {
    if self.removal_comment.trim().is_empty() {
      return Err("A removal comment is required".to_string());
    }
    Ok(())
  }
}

/// A publication selected for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalTarget {
  pub link: String,
  /// `name version` plus the architecture for binaries.
  pub description: String,
}

#[derive(Debug, Default)]
pub struct RemovalPlan {
  pub targets: Vec<RemovalTarget>,
  pub missing: Vec<String>,
}

fn is_live(status: &str) -> bool {
  matches!(status, "Published" | "Pending")
}

async fn plan_source(
  api: &dyn LaunchpadApi,
  archive: &Archive,
  series: &DistroSeries,
  args: &RemovePackageArgs,
  name: &str,
  plan: &mut RemovalPlan,
) -> Result<()> {
  let found = find_source(
    api,
    archive,
    series,
    args.suite.pocket,
    name,
    args.package_version.as_deref(),
  )
  .await?;
  let Some(source) = found else {
    warn!("{name} is not published in {}/{}", args.archive, args.suite);
    plan.missing.push(name.to_string());
    return Ok(());
  };

  plan.targets.push(RemovalTarget {
    link: source.self_link.clone(),
    description: format!("{} {}", source.source_package_name, source.source_package_version),
  });

  if !args.source_only {
    let binaries = api
      .get_publication_binaries(&source)
      .await
      .with_context(|| format!("Failed to list binaries of {name}"))?;
    for binary in binaries.iter().filter(|b| is_live(&b.status)) {
      plan.targets.push(RemovalTarget {
        link: binary.self_link.clone(),
        description: format!(
          "{} {} [{}]",
          binary.binary_package_name,
          binary.binary_package_version,
          binary.architecture()
        ),
      });
    }
  }
  Ok(())
}

async fn plan_binary(
  api: &dyn LaunchpadApi,
  archive: &Archive,
  series: &DistroSeries,
  args: &RemovePackageArgs,
  name: &str,
  plan: &mut RemovalPlan,
) -> Result<()> {
  let query = BinaryQuery {
    binary_name: Some(name.to_string()),
    version: args.package_version.clone(),
    exact_match: true,
    distro_arch_series_link: None,
    pocket: Some(args.suite.pocket),
    status: Some("Published".to_string()),
  };
  let series_prefix = format!("{}/", series.self_link.trim_end_matches('/'));
  let binaries: Vec<_> = api
    .get_published_binaries(archive, &query)
    .await?
    .into_iter()
    .filter(|b| b.distro_arch_series_link.starts_with(&series_prefix))
    .collect();

  if binaries.is_empty() {
    warn!("{name} is not published in {}/{}", args.archive, args.suite);
    plan.missing.push(name.to_string());
  }
  for binary in binaries {
    plan.targets.push(RemovalTarget {
      description: format!(
        "{} {} [{}]",
        binary.binary_package_name,
        binary.binary_package_version,
        binary.architecture()
      ),
      link: binary.self_link,
    });
  }
  Ok(())
}

/// Resolve the publications to delete.
pub async fn plan_removal(api: &dyn LaunchpadApi, args: &RemovePackageArgs) -> Result<RemovalPlan> {
  let (archive, series) = open_suite(api, &args.archive, &args.suite).await?;
  let mut plan = RemovalPlan::default();
  for name in &args.packages {
    if args.binary {
      plan_binary(api, &archive, &series, args, name, &mut plan).await?;
    } else {
      plan_source(api, &archive, &series, args, name, &mut plan).await?;
    }
  }
  Ok(plan)
}

pub async fn execute_removal(api: &dyn LaunchpadApi, plan: &RemovalPlan, comment: &str) -> Result<usize> {
  for target in &plan.targets {
    api
      .request_deletion(&target.link, comment)
      .await
      .with_context(|| format!("Failed to remove {}", target.description))?;
  }
  Ok(plan.targets.len())
}

pub(crate) async fn handle_remove_package_command(args: &RemovePackageArgs, cli: &Cli, colors: &ColorScheme) {
  let client = connect(cli, colors);
  let plan = match plan_removal(&client, args).await {
    Ok(plan) => plan,
    Err(e) => fail(colors, "Failed to find publications", e, 1),
  };

  if plan.targets.is_empty() {
    eprintln!("{} {}", colors.error("✗"), colors.error("Nothing to remove"));
    process::exit(1);
  }

  println!(
    "{} {}/{}:",
    colors.emphasis("Removing packages from"),
    args.archive,
    args.suite
  );
  for target in &plan.targets {
    println!("  {}", target.description);
  }
  println!("{}: {}", colors.emphasis("Comment"), args.removal_comment);

  if cli.behavior.dry_run {
    println!("{}", colors.dimmed("Dry run; nothing removed."));
    return;
  }
  if !cli.behavior.yes && !confirm("Remove?") {
    return;
  }

  match execute_removal(&client, &plan, &args.removal_comment).await {
    Ok(count) => println!("{} {} publications removed", colors.success("✓"), colors.number(count)),
    Err(e) => fail(colors, "Removal failed", e, 1),
  }
  if !plan.missing.is_empty() {
    process::exit(1);
  }
}
