//! `archive-admin nbs-report`: binaries no longer built from source and
//! sources with no binaries left, from a local mirror's tag files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;

use super::fail;
use crate::archive::contents::{NbsEntry, nbs, orphaned_sources};
use crate::archive::{BinaryIndex, SourceIndex};
use crate::color::ColorScheme;

#[derive(Debug, Clone, Args)]
pub struct NbsReportArgs {
  /// Sources files (optionally .gz)
  #[arg(short = 's', long = "sources", required = true, value_name = "FILE")]
  pub sources: Vec<PathBuf>,

  /// Packages files (optionally .gz)
  #[arg(short = 'p', long = "packages", required = true, value_name = "FILE")]
  pub packages: Vec<PathBuf>,

  /// Append the counts to this CSV file for `archive-admin chart`
  #[arg(long, value_name = "FILE")]
  pub csv: Option<PathBuf>,
}

pub fn load_indexes(sources: &[PathBuf], packages: &[PathBuf]) -> Result<(SourceIndex, BinaryIndex)> {
  let mut source_index = SourceIndex::new();
  for path in sources {
    source_index.add_file(path)?;
  }
  let mut binary_index = BinaryIndex::new();
  for path in packages {
    binary_index.add_file(path)?;
  }
  Ok((source_index, binary_index))
}

pub const CSV_HEADER: &str = "time,nbs,orphaned";

/// Append `<millis>,<nbs>,<orphaned>`, writing the header into a new file.
pub fn append_csv(path: &Path, when: DateTime<Utc>, nbs: usize, orphaned: usize) -> Result<()> {
  let is_new = !path.exists();
  let mut file = OpenOptions::new()
    .create(true)
    .append(true)
    .open(path)
    .with_context(|| format!("Failed to open {}", path.display()))?;
  if is_new {
    writeln!(file, "{CSV_HEADER}")?;
  }
  writeln!(file, "{},{nbs},{orphaned}", when.timestamp_millis())?;
  Ok(())
}

fn print_nbs(entries: &[NbsEntry], colors: &ColorScheme) {
  for entry in entries {
    let missing = if entry.source_missing {
      colors.warning(" (source removed)")
    } else {
      String::new()
    };
    println!(
      "{} {}{missing}",
      colors.emphasis(&entry.source),
      colors.dimmed(format!("({})", entry.source_version))
    );
    let binaries: Vec<&str> = entry.binaries.iter().map(String::as_str).collect();
    println!("    {}", binaries.join(" "));
  }
}

pub(crate) fn handle_nbs_report_command(args: &NbsReportArgs, colors: &ColorScheme) {
  let (sources, binaries) = match load_indexes(&args.sources, &args.packages) {
    Ok(indexes) => indexes,
    Err(e) => fail(colors, "Failed to read tag files", e, 1),
  };

  let entries = nbs(&sources, &binaries);
  let orphaned = orphaned_sources(&sources, &binaries);

  println!("{}", colors.emphasis("Not built from source"));
  if entries.is_empty() {
    println!("  {}", colors.dimmed("none"));
  }
  print_nbs(&entries, colors);

  println!("\n{}", colors.emphasis("Sources without binaries"));
  if orphaned.is_empty() {
    println!("  {}", colors.dimmed("none"));
  }
  for source in &orphaned {
    println!("{} {} [{}]", source.name, colors.dimmed(&source.version), source.component);
  }

  if let Some(path) = &args.csv
    && let Err(e) = append_csv(path, Utc::now(), entries.len(), orphaned.len())
  {
    fail(colors, "Failed to update CSV", e, 1);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn csv_gets_header_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nbs.csv");
    let when = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    append_csv(&path, when, 3, 1).unwrap();
    append_csv(&path, when, 2, 0).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, "time,nbs,orphaned\n1700000000000,3,1\n1700000000000,2,0\n");
  }
}
