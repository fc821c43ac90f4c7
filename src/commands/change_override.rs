//! `archive-admin change-override`: move publications between components,
//! sections and priorities.

use std::process;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{debug, warn};

use super::{confirm, connect, fail, find_source, open_suite};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::launchpad::{BinaryPublication, BinaryQuery, LaunchpadApi, OverrideChange, Suite};

#[derive(Debug, Clone, Args)]
pub struct ChangeOverrideArgs {
  /// Package names (sources unless --binary)
  #[arg(required = true, value_name = "PACKAGE")]
  pub packages: Vec<String>,

  #[arg(long, default_value = "ubuntu", value_name = "ARCHIVE")]
  pub archive: String,

  /// Suite, e.g. noble or noble-updates
  #[arg(short = 's', long, value_name = "SUITE")]
  pub suite: Suite,

  /// New component
  #[arg(short = 'c', long, value_name = "COMPONENT")]
  pub component: Option<String>,

  /// New section
  #[arg(short = 'x', long, value_name = "SECTION")]
  pub section: Option<String>,

  /// New priority (binaries only)
  #[arg(short = 'p', long, value_name = "PRIORITY")]
  pub priority: Option<String>,

  /// Treat names as binary packages
  #[arg(short = 'B', long, conflicts_with = "source_and_binary")]
  pub binary: bool,

  /// Also change the binaries built by each source
  #[arg(short = 'S', long)]
  pub source_and_binary: bool,
}

impl ChangeOverrideArgs {
  pub fn validate(&self) -> Result<(), String> {
    if self.requested().is_empty() {
      return Err("Specify at least one of --component, --section or --priority".to_string());
    }
    let binaries = self.binary || self.source_and_binary;
    if self.priority.is_some() && self.component.is_none() && self.section.is_none() && !binaries {
      return Err("--priority only applies to binaries; use --binary or --source-and-binary".to_string());
    }
    Ok(())
  }

  pub fn requested(&self) -> OverrideChange {
    OverrideChange {
      component: self.component.clone(),
      section: self.section.clone(),
      priority: self.priority.clone(),
    }
  }
}

/// Keep only the requested values that differ from the current ones.
///
/// `current_priority` is `None` for source publications, which have none.
pub fn effective_change(
  requested: &OverrideChange,
  current_component: &str,
  current_section: &str,
  current_priority: Option<&str>,
) -> OverrideChange {
  let differs = |new: &Option<String>, current: &str| new.clone().filter(|n| !n.eq_ignore_ascii_case(current));
  OverrideChange {
    component: differs(&requested.component, current_component),
    section: differs(&requested.section, current_section),
    priority: current_priority.and_then(|current| differs(&requested.priority, current)),
  }
}

/// An override to apply to one publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideTarget {
  pub link: String,
  pub description: String,
  pub change: OverrideChange,
}

fn binary_target(binary: &BinaryPublication, requested: &OverrideChange) -> Option<OverrideTarget> {
  let change = effective_change(
    requested,
    &binary.component_name,
    &binary.section_name,
    Some(&binary.priority_name),
  );
  let description = format!(
    "{} {} [{}]",
    binary.binary_package_name,
    binary.binary_package_version,
    binary.architecture()
  );
  if change.is_empty() {
    debug!("{description} already has the requested overrides");
    return None;
  }
  Some(OverrideTarget {
    link: binary.self_link.clone(),
    description,
    change,
  })
}

/// Resolve publications and the overrides each one needs. Publications that
/// already match are left out.
pub async fn plan_override_changes(api: &dyn LaunchpadApi, args: &ChangeOverrideArgs) -> Result<Vec<OverrideTarget>> {
  let (archive, series) = open_suite(api, &args.archive, &args.suite).await?;
  let requested = args.requested();
  let mut targets = Vec::new();

  for name in &args.packages {
    if args.binary {
      let query = BinaryQuery {
        binary_name: Some(name.clone()),
        exact_match: true,
        pocket: Some(args.suite.pocket),
        status: Some("Published".to_string()),
        ..BinaryQuery::default()
      };
      let series_prefix = format!("{}/", series.self_link.trim_end_matches('/'));
      let binaries = api
        .get_published_binaries(&archive, &query)
        .await
        .with_context(|| format!("Failed to look up binary {name}"))?;
      let binaries: Vec<_> = binaries
        .iter()
        .filter(|b| b.distro_arch_series_link.starts_with(&series_prefix))
        .collect();
      if binaries.is_empty() {
        warn!("{name} is not published in {}/{}", args.archive, args.suite);
      }
      targets.extend(binaries.into_iter().filter_map(|b| binary_target(b, &requested)));
      continue;
    }

    let Some(source) = find_source(api, &archive, &series, args.suite.pocket, name, None).await? else {
      warn!("{name} is not published in {}/{}", args.archive, args.suite);
      continue;
    };
    let change = effective_change(&requested, &source.component_name, &source.section_name, None);
    let description = format!("{} {}", source.source_package_name, source.source_package_version);
    if change.is_empty() {
      debug!("{description} already has the requested overrides");
    } else {
      targets.push(OverrideTarget {
        link: source.self_link.clone(),
        description,
        change,
      });
    }

    if args.source_and_binary {
      let binaries = api
        .get_publication_binaries(&source)
        .await
        .with_context(|| format!("Failed to list binaries of {name}"))?;
      targets.extend(
        binaries
          .iter()
          .filter(|b| b.status == "Published")
          .filter_map(|b| binary_target(b, &requested)),
      );
    }
  }

  Ok(targets)
}

fn describe(change: &OverrideChange) -> String {
  [
    change.component.as_ref().map(|c| format!("component={c}")),
    change.section.as_ref().map(|s| format!("section={s}")),
    change.priority.as_ref().map(|p| format!("priority={p}")),
  ]
  .into_iter()
  .flatten()
  .collect::<Vec<_>>()
  .join(" ")
}

pub(crate) async fn handle_change_override_command(args: &ChangeOverrideArgs, cli: &Cli, colors: &ColorScheme) {
  let client = connect(cli, colors);
  let targets = match plan_override_changes(&client, args).await {
    Ok(targets) => targets,
    Err(e) => fail(colors, "Failed to find publications", e, 1),
  };

  if targets.is_empty() {
    println!("{} Nothing to change", colors.info("ℹ"));
    return;
  }
  for target in &targets {
    println!("  {} → {}", target.description, colors.code(describe(&target.change)));
  }

  if cli.behavior.dry_run {
    println!("{}", colors.dimmed("Dry run; no overrides changed."));
    return;
  }
  if !cli.behavior.yes && !confirm("Override?") {
    return;
  }

  let mut failed = false;
  for target in &targets {
    if let Err(e) = client.change_override(&target.link, &target.change).await {
      eprintln!("{} {}: {e:#}", colors.error("✗"), target.description);
      failed = true;
    }
  }
  if failed {
    process::exit(1);
  }
  println!("{} Overrides changed", colors.success("✓"));
}
