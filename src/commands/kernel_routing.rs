//! `archive-admin kernel-routing`: where kernel-series sends each kernel.

use anyhow::{Result, anyhow};
use clap::Args;

use super::{fail, render_table};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::kernel::series;
use crate::kernel::{KernelSeries, SeriesEntry, SeriesLookup};

#[derive(Debug, Clone, Args)]
pub struct KernelRoutingArgs {
  /// Series codename or number, or `devel`
  #[arg(value_name = "SERIES")]
  pub series: String,

  /// Kernel source; all sources of the series when omitted
  #[arg(value_name = "SOURCE")]
  pub source: Option<String>,

  /// Only this destination, e.g. build or proposed
  #[arg(short = 'd', long, value_name = "DESTINATION")]
  pub destination: Option<String>,
}

/// Find a series by codename, number or the `devel` keyword.
pub fn find_series<'k>(ks: &'k KernelSeries, key: &str) -> Option<SeriesEntry<'k>> {
  if key == "devel" || key == "development" {
    return ks.lookup_series(SeriesLookup::Development);
  }
  ks.lookup_series(SeriesLookup::Codename(key))
    .or_else(|| ks.lookup_series(SeriesLookup::Name(key)))
}

/// One routing line: source, destination, then `archive pocket` targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteLine {
  pub source: String,
  pub route: String,
  pub destination: String,
  pub targets: Vec<String>,
}

pub fn routing_lines(ks: &KernelSeries, args: &KernelRoutingArgs) -> Result<Vec<RouteLine>> {
  let series = find_series(ks, &args.series).ok_or_else(|| anyhow!("{}: series not found", args.series))?;

  let sources = match &args.source {
    Some(name) => vec![
      series
        .lookup_source(name)
        .ok_or_else(|| anyhow!("{name}: source not found in {}", args.series))?,
    ],
    None => series.sources().collect(),
  };

  let mut lines = Vec::new();
  for source in sources {
    let Some(routing) = source.routing()? else {
      continue;
    };
    for (destination, targets) in routing.destinations() {
      if args.destination.as_deref().is_some_and(|d| d != destination) {
        continue;
      }
      lines.push(RouteLine {
        source: source.name().to_string(),
        route: routing.name().to_string(),
        destination: destination.to_string(),
        targets: targets.iter().map(|t| format!("{} {}", t.archive(), t.pocket())).collect(),
      });
    }
  }
  Ok(lines)
}

pub(crate) async fn handle_kernel_routing_command(args: &KernelRoutingArgs, cli: &Cli, colors: &ColorScheme) {
  let ks = match series::load(&cli.launchpad.kernel_series_source()).await {
    Ok(ks) => ks,
    Err(e) => fail(colors, "Failed to load kernel-series", e, 1),
  };
  let lines = match routing_lines(&ks, args) {
    Ok(lines) => lines,
    Err(e) => fail(colors, "Failed to resolve routing", e, 1),
  };

  let mut rows = vec![vec![
    "SOURCE".to_string(),
    "ROUTE".to_string(),
    "DESTINATION".to_string(),
    "TARGETS".to_string(),
  ]];
  rows.extend(
    lines
      .into_iter()
      .map(|l| vec![l.source, l.route, l.destination, l.targets.join(", ")]),
  );
  print!("{}", render_table(&rows));
}

#[cfg(test)]
mod tests {
  use super::*;

  const YAML: &str = r#"
'24.04':
  codename: noble
  routing-table:
    default:
      build:
        - ['ppa:canonical-kernel-team/ubuntu/ppa', 'Release']
      proposed:
        - ['ubuntu', 'Proposed']
  sources:
    linux:
    linux-oem:
      routing: null
"#;

  fn args(series: &str, source: Option<&str>) -> KernelRoutingArgs {
    KernelRoutingArgs {
      series: series.to_string(),
      source: source.map(str::to_string),
      destination: None,
    }
  }

  #[test]
  fn lines_for_a_source() {
    let ks = KernelSeries::parse(YAML).unwrap();
    let lines = routing_lines(&ks, &args("noble", Some("linux"))).unwrap();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].destination, "build");
    assert_eq!(lines[0].route, "default");
    assert_eq!(lines[0].targets, vec!["ppa:canonical-kernel-team/ubuntu/ppa Release"]);
  }

  #[test]
  fn disabled_routing_is_skipped() {
    let ks = KernelSeries::parse(YAML).unwrap();
    let lines = routing_lines(&ks, &args("24.04", None)).unwrap();
    assert!(lines.iter().all(|l| l.source == "linux"));

    let mut only = args("noble", None);
    only.destination = Some("proposed".into());
    assert_eq!(routing_lines(&ks, &only).unwrap().len(), 1);
  }

  #[test]
  fn unknown_series() {
    let ks = KernelSeries::parse(YAML).unwrap();
    assert!(routing_lines(&ks, &args("hirsute", None)).is_err());
  }
}
