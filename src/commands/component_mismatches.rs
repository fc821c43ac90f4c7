//! `archive-admin component-mismatches`: compare what the seeds pull in with
//! the components binaries are published in.

use std::path::PathBuf;

use clap::Args;

use super::{fail, render_table};
use crate::archive::contents::{ComponentMismatch, component_mismatches};
use crate::archive::{BinaryIndex, GerminateOutput};
use crate::color::ColorScheme;

#[derive(Debug, Clone, Args)]
pub struct ComponentMismatchesArgs {
  /// Germinate output tables, one per seed
  #[arg(short = 'g', long = "germinate", required = true, value_name = "FILE")]
  pub germinate: Vec<PathBuf>,

  /// Packages files (optionally .gz)
  #[arg(short = 'p', long = "packages", required = true, value_name = "FILE")]
  pub packages: Vec<PathBuf>,

  /// Components the seeds are expected to live in
  #[arg(short = 'c', long = "component", default_values = ["main", "restricted"], value_name = "COMPONENT")]
  pub components: Vec<String>,
}

fn rows(entries: &[ComponentMismatch], with_why: bool) -> Vec<Vec<String>> {
  entries
    .iter()
    .map(|m| {
      let mut row = vec![m.package.clone(), m.source.clone(), m.component.clone()];
      if with_why {
        row.push(m.why.clone().unwrap_or_default());
      }
      row
    })
    .collect()
}

pub(crate) fn handle_component_mismatches_command(args: &ComponentMismatchesArgs, colors: &ColorScheme) {
  let mut seeded = GerminateOutput::new();
  for path in &args.germinate {
    if let Err(e) = seeded.add_file(path) {
      fail(colors, "Failed to read germinate output", e, 1);
    }
  }
  let mut binaries = BinaryIndex::new();
  for path in &args.packages {
    if let Err(e) = binaries.add_file(path) {
      fail(colors, "Failed to read Packages file", e, 1);
    }
  }

  let components: Vec<&str> = args.components.iter().map(String::as_str).collect();
  let mismatches = component_mismatches(&seeded, &binaries, &components);

  println!("{}", colors.emphasis("Binary packages to promote"));
  if mismatches.promotions.is_empty() {
    println!("  {}", colors.dimmed("none"));
  } else {
    print!("{}", render_table(&rows(&mismatches.promotions, true)));
  }

  println!("\n{}", colors.emphasis("Binary packages to demote"));
  if mismatches.demotions.is_empty() {
    println!("  {}", colors.dimmed("none"));
  } else {
    print!("{}", render_table(&rows(&mismatches.demotions, false)));
  }
}
