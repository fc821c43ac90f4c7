//! `archive-admin copy-proposed-kernel`: copy the packages named by kernel
//! SRU tracking bugs from their build archive into `-proposed`.
//!
//! Both ends come from kernel-series routing: the primary `build` target is
//! copied from and the primary `proposed` target copied to.

use std::process;

use anyhow::{Context, Result, anyhow};
use clap::Args;
use tracing::{info, warn};

use super::kernel_routing::find_series;
use super::{confirm, connect, fail, find_source};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::kernel::{KernelSeries, KernelSruBug, RouteTarget, process_sru_bug, series};
use crate::launchpad::{Archive, ArchiveReference, CopyRequest, LaunchpadApi, Pocket};

#[derive(Debug, Clone, Args)]
pub struct CopyProposedKernelArgs {
  /// Tracking bug numbers
  #[arg(required = true, value_name = "BUG")]
  pub bugs: Vec<u64>,

  /// Copy even when the source task and the title name different packages
  #[arg(long)]
  pub no_name_check: bool,
}

/// Copies for one tracking bug.
#[derive(Debug)]
pub struct KernelCopyPlan {
  pub from: RouteTarget,
  pub to: RouteTarget,
  pub destination: Archive,
  pub copies: Vec<CopyRequest>,
  /// Packages from the prepare list not found in the build archive.
  pub missing: Vec<String>,
}

/// Whether a tracker can be copied straight away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyGate {
  Proceed,
  /// The source task and the title disagree; skipped unless `--no-name-check`.
  NameMismatch,
  /// Only meta packages are listed; needs confirmation.
  MetaOnly,
}

pub fn copy_gate(tracker: &KernelSruBug, args: &CopyProposedKernelArgs) -> CopyGate {
  if tracker.name_mismatch && !args.no_name_check {
    CopyGate::NameMismatch
  } else if tracker.meta_only {
    CopyGate::MetaOnly
  } else {
    CopyGate::Proceed
  }
}

fn route(ks: &KernelSeries, tracker: &KernelSruBug, destination: &str) -> Result<RouteTarget> {
  let series = find_series(ks, &tracker.release)
    .ok_or_else(|| anyhow!("{}: series not in kernel-series", tracker.release))?;
  let source = series
    .lookup_source(&tracker.source)
    .ok_or_else(|| anyhow!("{}: source not in kernel-series for {}", tracker.source, tracker.release))?;
  let routing = source
    .routing()?
    .ok_or_else(|| anyhow!("{source}: routing disabled"))?;
  routing
    .primary_destination(destination)
    .cloned()
    .ok_or_else(|| anyhow!("{source}: no {destination} route"))
}

/// Resolve the build and proposed routes and the newest build of every
/// package in the prepare list.
pub async fn plan_kernel_copy(
  api: &dyn LaunchpadApi,
  ks: &KernelSeries,
  tracker: &KernelSruBug,
) -> Result<KernelCopyPlan> {
  let from = route(ks, tracker, "build")?;
  let to = route(ks, tracker, "proposed")?;

  let from_reference = ArchiveReference::parse(from.archive())?;
  let from_pocket: Pocket = from.pocket().parse()?;
  let to_reference = ArchiveReference::parse(to.archive())?;
  let to_pocket: Pocket = to.pocket().parse()?;

  let from_archive = api
    .get_archive(&from_reference)
    .await
    .with_context(|| format!("Failed to find build archive {from_reference}"))?;
  let destination = api
    .get_archive(&to_reference)
    .await
    .with_context(|| format!("Failed to find destination archive {to_reference}"))?;
  let series = api
    .get_series(from_reference.distribution(), &tracker.release)
    .await
    .with_context(|| format!("Failed to find series {}", tracker.release))?;

  let mut copies = Vec::new();
  let mut missing = Vec::new();
  for package in &tracker.packages {
    let Some(publication) = find_source(api, &from_archive, &series, from_pocket, package, None).await? else {
      warn!("{package} not found in {from_reference} {}", tracker.release);
      missing.push(package.clone());
      continue;
    };
    copies.push(CopyRequest {
      source_name: publication.source_package_name,
      version: publication.source_package_version,
      from_archive_link: from_archive.self_link.clone(),
      to_series: Some(tracker.release.clone()),
      to_pocket,
      include_binaries: true,
      unembargo: from_archive.private && !destination.private,
      auto_approve: true,
    });
  }

  Ok(KernelCopyPlan {
    from,
    to,
    destination,
    copies,
    missing,
  })
}

pub async fn execute_kernel_copy(api: &dyn LaunchpadApi, plan: &KernelCopyPlan) -> Result<()> {
  for request in &plan.copies {
    api
      .copy_package(&plan.destination, request)
      .await
      .with_context(|| format!("Failed to copy {} {}", request.source_name, request.version))?;
    info!("Copied {} {} to {}", request.source_name, request.version, plan.to.archive());
  }
  Ok(())
}

pub(crate) async fn handle_copy_proposed_kernel_command(
  args: &CopyProposedKernelArgs,
  cli: &Cli,
  colors: &ColorScheme,
) {
  let client = connect(cli, colors);
  let ks = match series::load(&cli.launchpad.kernel_series_source()).await {
    Ok(ks) => ks,
    Err(e) => fail(colors, "Failed to load kernel-series", e, 1),
  };

  let mut failed = false;
  for &bug in &args.bugs {
    let tracker = match process_sru_bug(&client, bug).await {
      Ok(Some(tracker)) => tracker,
      Ok(None) => continue,
      Err(e) => {
        eprintln!("{} LP: #{bug}: {e:#}", colors.error("✗"));
        failed = true;
        continue;
      }
    };

    let gate = copy_gate(&tracker, args);
    if gate == CopyGate::NameMismatch {
      eprintln!(
        "{} LP: #{bug}: source task {} does not match {}; use --no-name-check to copy anyway",
        colors.warning("⚠"),
        tracker.source,
        tracker.package
      );
      failed = true;
      continue;
    }

    let plan = match plan_kernel_copy(&client, &ks, &tracker).await {
      Ok(plan) => plan,
      Err(e) => {
        eprintln!("{} LP: #{bug}: {e:#}", colors.error("✗"));
        failed = true;
        continue;
      }
    };

    println!(
      "{} LP: #{} {} {} {} → {}",
      colors.progress("→"),
      colors.number(bug),
      colors.emphasis(&tracker.package),
      tracker.version,
      plan.from.archive(),
      plan.to.archive()
    );
    for request in &plan.copies {
      println!("  {} {}", request.source_name, colors.number(&request.version));
    }
    for package in &plan.missing {
      println!("  {} {package} missing", colors.warning("⚠"));
    }

    if cli.behavior.dry_run {
      continue;
    }
    if gate == CopyGate::MetaOnly
      && !cli.behavior.yes
      && !confirm(&format!("LP: #{bug} only lists meta packages. Copy anyway?"))
    {
      continue;
    }

    if let Err(e) = execute_kernel_copy(&client, &plan).await {
      eprintln!("{} LP: #{bug}: {e:#}", colors.error("✗"));
      failed = true;
    }
  }

  if failed {
    process::exit(1);
  }
}
