//! `archive-admin iso-tracker`: list and post builds on the ISO QA tracker.

use clap::Subcommand;

use super::{fail, render_table};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::isotracker::IsoTracker;
use crate::qatracker::Build;
use crate::qatracker::status::BUILD_MILESTONE_STATUS;

#[derive(Debug, Clone, Subcommand)]
pub enum IsoTrackerCommand {
  /// List builds on a milestone
  ListBuilds {
    /// Configuration target (a section of ~/.isotracker.conf)
    #[arg(short = 't', long, value_name = "TARGET")]
    target: Option<String>,

    /// Milestone title (default: the configured default milestone)
    #[arg(short = 'm', long, value_name = "MILESTONE")]
    milestone: Option<String>,

    /// Build statuses to include (default: Active, Re-building, Ready)
    #[arg(short = 's', long = "status", value_name = "STATUS")]
    statuses: Vec<String>,
  },

  /// Post a new build of a product
  PostBuild {
    /// Product title, e.g. "Ubuntu Desktop amd64"
    #[arg(value_name = "PRODUCT")]
    product: String,

    /// Build version, e.g. 20240425
    #[arg(value_name = "VERSION")]
    version: String,

    #[arg(short = 't', long, value_name = "TARGET")]
    target: Option<String>,

    #[arg(short = 'm', long, value_name = "MILESTONE")]
    milestone: Option<String>,

    /// Build note (default: contents of ~/.isotracker.note)
    #[arg(long, default_value = "", value_name = "TEXT")]
    note: String,

    /// Do not email subscribers
    #[arg(long)]
    no_notify: bool,
  },
}

impl IsoTrackerCommand {
  fn target(&self) -> Option<&str> {
    match self {
      IsoTrackerCommand::ListBuilds { target, .. } | IsoTrackerCommand::PostBuild { target, .. } => {
        target.as_deref()
      }
    }
  }
}

pub fn build_rows(builds: &[Build]) -> Vec<Vec<String>> {
  let mut rows = vec![vec![
    "ID".to_string(),
    "TITLE".to_string(),
    "VERSION".to_string(),
    "STATUS".to_string(),
    "DATE".to_string(),
  ]];
  for build in builds {
    let status = build
      .status
      .and_then(|s| usize::try_from(s).ok())
      .and_then(|s| BUILD_MILESTONE_STATUS.get(s))
      .copied()
      .unwrap_or("?");
    rows.push(vec![
      build.id.map(|id| id.to_string()).unwrap_or_default(),
      build.title.clone(),
      build.version.clone(),
      status.to_string(),
      build
        .date
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default(),
    ]);
  }
  rows
}

pub(crate) async fn handle_iso_tracker_command(command: &IsoTrackerCommand, cli: &Cli, colors: &ColorScheme) {
  let tracker = match IsoTracker::connect(command.target(), cli.performance.timeout).await {
    Ok(tracker) => tracker,
    Err(e) => fail(colors, "Failed to connect to the ISO tracker", e, 2),
  };

  match command {
    IsoTrackerCommand::ListBuilds {
      milestone, statuses, ..
    } => {
      let statuses: Vec<&str> = statuses.iter().map(String::as_str).collect();
      match tracker.get_builds(milestone.as_deref(), &statuses).await {
        Ok(builds) => print!("{}", render_table(&build_rows(&builds))),
        Err(e) => fail(colors, "Failed to list builds", e, 1),
      }
    }
    IsoTrackerCommand::PostBuild {
      product,
      version,
      milestone,
      note,
      no_notify,
      ..
    } => {
      if cli.behavior.dry_run {
        println!("Would post {product} {version}");
        return;
      }
      match tracker
        .post_build(product, version, milestone.as_deref(), note, !no_notify)
        .await
      {
        Ok(Some(build)) => println!(
          "{} Posted {} {} (build {})",
          colors.success("✓"),
          build.title,
          colors.number(&build.version),
          build.id.unwrap_or_default()
        ),
        Ok(None) => println!(
          "{} Posted {product} {version}; not listed as active yet",
          colors.info("ℹ")
        ),
        Err(e) => fail(colors, "Failed to post build", e, 1),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rows_name_statuses() {
    let build = Build {
      id: Some(42),
      productid: Some(7),
      userid: None,
      status: Some(4),
      date: chrono::NaiveDate::from_ymd_opt(2024, 4, 25).and_then(|d| d.and_hms_opt(6, 30, 0)),
      version: "20240425".into(),
      title: "Ubuntu Desktop amd64".into(),
      note: String::new(),
    };
    let rows = build_rows(&[build]);
    assert_eq!(rows[1], vec!["42", "Ubuntu Desktop amd64", "20240425", "Ready", "2024-04-25 06:30"]);
  }
}
