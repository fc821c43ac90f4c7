//! `archive-admin sru-report`: uploads waiting in `-proposed` and the
//! verification state of the bugs they fix.
//!
//! Bugs come from the `Launchpad-Bugs-Fixed` field of each upload's
//! `.changes` file; their state is read from the `verification-*` tags.

use std::cmp::Ordering;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tracing::{debug, warn};

use super::{connect, fail, find_source};
use crate::archive::tagfile;
use crate::archive::version::compare_versions;
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::launchpad::{
  Archive, ArchiveReference, Bug, DistroSeries, LaunchpadApi, Pocket, SourcePublication, SourceQuery,
};

#[derive(Debug, Clone, Args)]
pub struct SruReportArgs {
  /// Series to report on
  #[arg(required = true, value_name = "SERIES")]
  pub series: Vec<String>,

  /// Only these source packages
  #[arg(short = 'p', long = "package", value_name = "PACKAGE")]
  pub packages: Vec<String>,

  #[arg(long, default_value = "ubuntu", value_name = "ARCHIVE")]
  pub archive: String,

  /// Emit JSON instead of text
  #[arg(long)]
  pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
  Needed,
  Done,
  Failed,
  Unknown,
}

impl Verification {
  /// State from bug tags; the per-series tag wins over the generic one.
  pub fn from_tags(tags: &[String], series: &str) -> Self {
    let has = |tag: String| tags.contains(&tag);
    for suffix in [format!("-{series}"), String::new()] {
      if has(format!("verification-failed{suffix}")) {
        return Verification::Failed;
      }
      if has(format!("verification-done{suffix}")) {
        return Verification::Done;
      }
      if has(format!("verification-needed{suffix}")) {
        return Verification::Needed;
      }
    }
    Verification::Unknown
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct BugState {
  pub id: u64,
  pub title: String,
  pub verification: Verification,
  /// `block-proposed-<series>` is set.
  pub blocked: bool,
}

impl BugState {
  pub fn new(bug: &Bug, series: &str) -> Self {
    Self {
      id: bug.id,
      title: bug.title.clone(),
      verification: Verification::from_tags(&bug.tags, series),
      blocked: bug.tags.iter().any(|t| *t == format!("block-proposed-{series}")),
    }
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingUpload {
  pub source: String,
  pub proposed_version: String,
  /// Newest version in -updates, -security or the release pocket.
  pub current_version: Option<String>,
  pub age_days: Option<i64>,
  pub bugs: Vec<BugState>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesReport {
  pub series: String,
  pub uploads: Vec<PendingUpload>,
}

/// Bug numbers listed in a `.changes` file.
pub fn bugs_fixed(changes: &str) -> Result<Vec<u64>> {
  let paragraphs = tagfile::parse_str(changes).context("Failed to parse .changes file")?;
  let mut bugs: Vec<u64> = paragraphs
    .first()
    .map(|p| p.field_words("Launchpad-Bugs-Fixed"))
    .unwrap_or_default()
    .into_iter()
    .filter_map(|word| word.parse().ok())
    .collect();
  bugs.sort_unstable();
  bugs.dedup();
  Ok(bugs)
}

fn age_days(published: Option<&str>, now: DateTime<Utc>) -> Option<i64> {
  let published = DateTime::parse_from_rfc3339(published?).ok()?;
  Some((now - published.with_timezone(&Utc)).num_days())
}

async fn current_version(
  api: &dyn LaunchpadApi,
  archive: &Archive,
  series: &DistroSeries,
  source: &str,
) -> Result<Option<String>> {
  let mut best: Option<String> = None;
  for pocket in [Pocket::Updates, Pocket::Security, Pocket::Release] {
    if let Some(publication) = find_source(api, archive, series, pocket, source, None).await? {
      let version = publication.source_package_version;
      let newer = best
        .as_deref()
        .is_none_or(|b| compare_versions(&version, b).is_ok_and(|o| o == Ordering::Greater));
      if newer {
        best = Some(version);
      }
    }
  }
  Ok(best)
}

async fn upload_bugs(api: &dyn LaunchpadApi, publication: &SourcePublication, series: &str) -> Result<Vec<BugState>> {
  let Some(url) = api.changes_file_url(publication).await? else {
    debug!("No .changes file for {}", publication.source_package_name);
    return Ok(Vec::new());
  };
  let changes = api.fetch_text(&url).await?;

  let mut states = Vec::new();
  for id in bugs_fixed(&changes)? {
    match api.get_bug(id).await {
      Ok(bug) => states.push(BugState::new(&bug, series)),
      Err(e) => warn!("Skipping LP: #{id}: {e:#}"),
    }
  }
  Ok(states)
}

/// Collect pending uploads for one series.
pub async fn series_report(
  api: &dyn LaunchpadApi,
  archive: &str,
  series_name: &str,
  packages: &[String],
  now: DateTime<Utc>,
) -> Result<SeriesReport> {
  let reference = ArchiveReference::parse(archive)?;
  let archive = api.get_archive(&reference).await?;
  let series = api
    .get_series(reference.distribution(), series_name)
    .await
    .with_context(|| format!("Failed to find series {series_name}"))?;

  let query = SourceQuery {
    distro_series_link: Some(series.self_link.clone()),
    pocket: Some(Pocket::Proposed),
    status: Some("Published".to_string()),
    ..SourceQuery::default()
  };
  let mut proposed = api
    .get_published_sources(&archive, &query)
    .await
    .with_context(|| format!("Failed to list {series_name}-proposed"))?;
  proposed.retain(|p| packages.is_empty() || packages.contains(&p.source_package_name));
  proposed.sort_by(|a, b| a.source_package_name.cmp(&b.source_package_name));

  let mut uploads = Vec::new();
  for publication in proposed {
    let current = current_version(api, &archive, &series, &publication.source_package_name).await?;
    let bugs = upload_bugs(api, &publication, series_name)
      .await
      .with_context(|| format!("Failed to read bugs of {}", publication.source_package_name))?;
    uploads.push(PendingUpload {
      age_days: age_days(publication.date_published.as_deref(), now),
      source: publication.source_package_name,
      proposed_version: publication.source_package_version,
      current_version: current,
      bugs,
    });
  }

  Ok(SeriesReport {
    series: series_name.to_string(),
    uploads,
  })
}

fn print_report(report: &SeriesReport, colors: &ColorScheme) {
  println!("{}", colors.emphasis(format!("== {} ==", report.series)));
  if report.uploads.is_empty() {
    println!("  {}", colors.dimmed("nothing pending"));
  }
  for upload in &report.uploads {
    let age = upload.age_days.map(|d| format!(" ({d} days)")).unwrap_or_default();
    println!(
      "  {} {} → {}{}",
      colors.emphasis(&upload.source),
      colors.dimmed(upload.current_version.as_deref().unwrap_or("-")),
      colors.number(&upload.proposed_version),
      colors.dimmed(age)
    );
    for bug in &upload.bugs {
      let state = match bug.verification {
        Verification::Done => colors.success("verified"),
        Verification::Failed => colors.error("failed"),
        Verification::Needed => colors.warning("needed"),
        Verification::Unknown => colors.dimmed("unknown"),
      };
      let blocked = if bug.blocked { colors.error(" [blocked]") } else { String::new() };
      println!("    LP: #{} {state}{blocked} {}", bug.id, colors.dimmed(&bug.title));
    }
  }
}

pub(crate) async fn handle_sru_report_command(args: &SruReportArgs, cli: &Cli, colors: &ColorScheme) {
  let client = connect(cli, colors);
  let now = Utc::now();

  let mut reports = Vec::new();
  for series in &args.series {
    match series_report(&client, &args.archive, series, &args.packages, now).await {
      Ok(report) => reports.push(report),
      Err(e) => fail(colors, &format!("Failed to report on {series}"), e, 1),
    }
  }

  if args.json {
    match serde_json::to_string_pretty(&reports) {
      Ok(json) => println!("{json}"),
      Err(e) => fail(colors, "Failed to encode report", e, 1),
    }
  } else {
    for report in &reports {
      print_report(report, colors);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn series_tag_wins() {
    let t = tags(&["verification-done", "verification-failed-noble"]);
    assert_eq!(Verification::from_tags(&t, "noble"), Verification::Failed);
    assert_eq!(Verification::from_tags(&t, "jammy"), Verification::Done);
    assert_eq!(Verification::from_tags(&[], "jammy"), Verification::Unknown);

    let t = tags(&["verification-done", "verification-needed-noble"]);
    assert_eq!(Verification::from_tags(&t, "noble"), Verification::Needed);
  }

  #[test]
  fn bugs_from_changes() {
    let changes = "Format: 1.8\nSource: hello\nVersion: 2.10-3ubuntu0.1\nLaunchpad-Bugs-Fixed: 2034567 1987654 2034567\n";
    assert_eq!(bugs_fixed(changes).unwrap(), vec![1987654, 2034567]);
    assert!(bugs_fixed("Source: hello\n").unwrap().is_empty());
  }

  #[test]
  fn age_in_days() {
    let now = DateTime::parse_from_rfc3339("2024-05-10T12:00:00Z").unwrap().with_timezone(&Utc);
    assert_eq!(age_days(Some("2024-05-03T11:00:00.123456+00:00"), now), Some(7));
    assert_eq!(age_days(None, now), None);
    assert_eq!(age_days(Some("yesterday"), now), None);
  }
}
