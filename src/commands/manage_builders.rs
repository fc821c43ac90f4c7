//! `archive-admin manage-builders`: list build farm machines or switch their
//! mode.

use std::process;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use tracing::info;

use super::{confirm, connect, fail, render_table};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::launchpad::{Builder, LaunchpadApi};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuilderAction {
  /// List builders
  List,
  /// Stop automatic dispatch to the builders
  Manual,
  /// Resume automatic dispatch
  Auto,
  /// Bring builders back into the pool
  Enable,
  /// Take builders out of the pool
  Disable,
}

#[derive(Debug, Clone, Args)]
pub struct ManageBuildersArgs {
  #[arg(value_enum)]
  pub action: BuilderAction,

  /// Only builders whose name starts with this prefix
  #[arg(short = 'b', long, value_name = "PREFIX")]
  pub builder: Option<String>,

  /// Only builders hosted on this VM host
  #[arg(long, value_name = "HOST")]
  pub vm_host: Option<String>,

  /// Only virtualized builders
  #[arg(long, conflicts_with = "nonvirt")]
  pub virt: bool,

  /// Only non-virtualized builders
  #[arg(long)]
  pub nonvirt: bool,

  /// Only builders in manual mode
  #[arg(long, conflicts_with = "auto")]
  pub manual: bool,

  /// Only builders in automatic mode
  #[arg(long)]
  pub auto: bool,

  /// Only builders that are currently OK
  #[arg(long)]
  pub ok: bool,

  /// Only builders flagged as failed
  #[arg(long, conflicts_with = "ok")]
  pub failed: bool,
}

impl ManageBuildersArgs {
  pub fn matches(&self, builder: &Builder) -> bool {
    if let Some(prefix) = &self.builder
      && !builder.name.starts_with(prefix.as_str())
    {
      return false;
    }
    if let Some(host) = &self.vm_host
      && builder.vm_host.as_deref() != Some(host.as_str())
    {
      return false;
    }
    (!self.virt || builder.virtualized)
      && (!self.nonvirt || !builder.virtualized)
      && (!self.manual || builder.manual)
      && (!self.auto || !builder.manual)
      && (!self.ok || builder.builderok)
      && (!self.failed || !builder.builderok)
  }
}

pub async fn select_builders(api: &dyn LaunchpadApi, args: &ManageBuildersArgs) -> Result<Vec<Builder>> {
  let builders = api.get_builders().await.context("Failed to list builders")?;
  Ok(builders.into_iter().filter(|b| args.matches(b)).collect())
}

/// Builders the action would actually change.
pub fn pending_changes(action: BuilderAction, builders: &[Builder]) -> Vec<&Builder> {
  builders
    .iter()
    .filter(|b| match action {
      BuilderAction::List => false,
      BuilderAction::Manual => !b.manual,
      BuilderAction::Auto => b.manual,
      BuilderAction::Enable => !b.active,
      BuilderAction::Disable => b.active,
    })
    .collect()
}

pub async fn apply(api: &dyn LaunchpadApi, action: BuilderAction, builder: &Builder) -> Result<()> {
  match action {
    BuilderAction::List => Ok(()),
    BuilderAction::Manual => api.set_builder_manual(builder, true).await,
    BuilderAction::Auto => api.set_builder_manual(builder, false).await,
    BuilderAction::Enable => api.set_builder_active(builder, true).await,
    BuilderAction::Disable => api.set_builder_active(builder, false).await,
  }
}

pub fn builder_rows(builders: &[Builder]) -> Vec<Vec<String>> {
  let mut rows = vec![vec![
    "NAME".to_string(),
    "STATUS".to_string(),
    "MODE".to_string(),
    "VIRT".to_string(),
    "VM HOST".to_string(),
    "NOTES".to_string(),
  ]];
  for b in builders {
    let status = match (b.active, b.builderok) {
      (false, _) => "disabled",
      (true, false) => "failed",
      (true, true) => b.clean_status.as_deref().unwrap_or("ok"),
    };
    rows.push(vec![
      b.name.clone(),
      status.to_lowercase(),
      if b.manual { "manual" } else { "auto" }.to_string(),
      if b.virtualized { "yes" } else { "no" }.to_string(),
      b.vm_host.clone().unwrap_or_default(),
      b.failnotes.clone().unwrap_or_default().replace('\n', " "),
    ]);
  }
  rows
}

pub(crate) async fn handle_manage_builders_command(args: &ManageBuildersArgs, cli: &Cli, colors: &ColorScheme) {
  let client = connect(cli, colors);
  let builders = match select_builders(&client, args).await {
    Ok(builders) => builders,
    Err(e) => fail(colors, "Failed to list builders", e, 1),
  };

  if args.action == BuilderAction::List {
    print!("{}", render_table(&builder_rows(&builders)));
    return;
  }

  let changes = pending_changes(args.action, &builders);
  if changes.is_empty() {
    println!("{} No builders to change", colors.info("ℹ"));
    return;
  }
  let verb = format!("{:?}", args.action).to_lowercase();
  for builder in &changes {
    println!("  {} {}", colors.code(&verb), builder.name);
  }

  if cli.behavior.dry_run {
    println!("{}", colors.dimmed("Dry run; no builders changed."));
    return;
  }
  if !cli.behavior.yes && !confirm(&format!("Change {} builders?", changes.len())) {
    return;
  }

  let mut failed = false;
  for builder in changes {
    match apply(&client, args.action, builder).await {
      Ok(()) => info!("{} is now {verb}", builder.name),
      Err(e) => {
        eprintln!("{} {}: {e:#}", colors.error("✗"), builder.name);
        failed = true;
      }
    }
  }
  if failed {
    process::exit(1);
  }
  println!("{} Builders updated", colors.success("✓"));
}
