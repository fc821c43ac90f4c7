//! `archive-admin sru-accept`: bug bookkeeping for uploads accepted into
//! `-proposed`.

use std::process;

use clap::Args;

use super::{connect, fail};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::sru::{SruOutcome, process_bug};

#[derive(Debug, Clone, Args)]
pub struct SruAcceptArgs {
  /// Release the upload was accepted into, e.g. noble
  #[arg(short = 's', long = "series", value_name = "SERIES")]
  pub release: String,

  /// Source package that was accepted
  #[arg(short = 'p', long, value_name = "PACKAGE")]
  pub package: Option<String>,

  /// Version that was accepted
  #[arg(long = "version", value_name = "VERSION")]
  pub package_version: Option<String>,

  /// Bug numbers
  #[arg(required = true, value_name = "BUG")]
  pub bugs: Vec<u64>,
}

impl SruAcceptArgs {
  pub fn validate(&self) -> Result<(), String> {
    if self.release.is_empty() || self.release.contains('-') {
      return Err(format!("'{}' is not a series name", self.release));
    }
    if self.package_version.is_some() && self.package.is_none() {
      return Err("--version requires --package".to_string());
    }
    Ok(())
  }
}

fn print_outcome(outcome: &SruOutcome, colors: &ColorScheme) {
  println!("{} LP: #{}", colors.success("✓"), colors.number(outcome.bug));
  for task in &outcome.committed_tasks {
    println!("  {} {}", colors.dimmed("Fix Committed"), colors.link(task));
  }
  if outcome.added_task {
    println!("  {}", colors.dimmed("added series task"));
  }
  if let Some(tags) = &outcome.new_tags {
    println!("  {}: {}", colors.dimmed("tags"), tags.join(" "));
  }
  for warning in &outcome.warnings {
    println!("  {} {}", colors.warning("⚠"), colors.warning(warning));
  }
}

pub(crate) async fn handle_sru_accept_command(args: &SruAcceptArgs, cli: &Cli, colors: &ColorScheme) {
  if cli.behavior.dry_run {
    for bug in &args.bugs {
      println!(
        "Would accept LP: #{bug} for {} {} into {}-proposed",
        args.package.as_deref().unwrap_or("(any source)"),
        args.package_version.as_deref().unwrap_or(""),
        args.release
      );
    }
    return;
  }

  let client = connect(cli, colors);
  let mut failed = false;
  for &bug in &args.bugs {
    match process_bug(
      &client,
      args.package.as_deref(),
      args.package_version.as_deref(),
      &args.release,
      bug,
    )
    .await
    {
      Ok(outcome) => print_outcome(&outcome, colors),
      Err(e) if args.bugs.len() == 1 => fail(colors, &format!("Failed to process LP: #{bug}"), e, 1),
      Err(e) => {
        eprintln!("{} LP: #{bug}: {e:#}", colors.error("✗"));
        failed = true;
      }
    }
  }
  if failed {
    process::exit(1);
  }
}
