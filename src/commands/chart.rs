//! `archive-admin chart`: an HTML page charting a CSV time series, such as
//! the one `nbs-report --csv` keeps.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use super::fail;
use crate::charts::render_page;
use crate::color::ColorScheme;

#[derive(Debug, Clone, Args)]
pub struct ChartArgs {
  /// CSV URL as the browser will fetch it
  #[arg(value_name = "SOURCE")]
  pub source: String,

  /// Columns to plot
  #[arg(short = 'k', long = "key", required = true, value_name = "COLUMN")]
  pub keys: Vec<String>,

  #[arg(long, default_value = "Archive report", value_name = "TITLE")]
  pub title: String,

  /// Write the page here instead of stdout
  #[arg(short = 'o', long, value_name = "FILE")]
  pub output: Option<PathBuf>,
}

impl ChartArgs {
  pub fn validate(&self) -> Result<(), String> {
    if let Some(key) = self.keys.iter().find(|k| k.is_empty() || k.contains('"')) {
      return Err(format!("Invalid chart key {key:?}"));
    }
    Ok(())
  }
}

pub fn write_chart(args: &ChartArgs) -> Result<Option<String>> {
  let keys: Vec<&str> = args.keys.iter().map(String::as_str).collect();
  let page = render_page(&args.title, &args.source, &keys);
  match &args.output {
    Some(path) => {
      std::fs::write(path, page).with_context(|| format!("Failed to write {}", path.display()))?;
      Ok(None)
    }
    None => Ok(Some(page)),
  }
}

pub(crate) fn handle_chart_command(args: &ChartArgs, colors: &ColorScheme) {
  match write_chart(args) {
    Ok(Some(page)) => print!("{page}"),
    Ok(None) => {}
    Err(e) => fail(colors, "Failed to write chart", e, 1),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(keys: &[&str]) -> ChartArgs {
    ChartArgs {
      source: "nbs.csv".into(),
      keys: keys.iter().map(|k| k.to_string()).collect(),
      title: "NBS".into(),
      output: None,
    }
  }

  #[test]
  fn keys_are_validated() {
    assert!(args(&["nbs", "orphaned"]).validate().is_ok());
    assert!(args(&["bad\"key"]).validate().is_err());
  }

  #[test]
  fn writes_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut chart = args(&["nbs"]);
    chart.output = Some(dir.path().join("nbs.html"));
    assert!(write_chart(&chart).unwrap().is_none());
    let html = std::fs::read_to_string(dir.path().join("nbs.html")).unwrap();
    assert!(html.contains("<title>NBS</title>"));
  }
}
