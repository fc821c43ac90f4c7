//! `archive-admin architecture-mismatches`: binaries whose overrides differ
//! between architectures.

use std::path::PathBuf;

use clap::Args;

use super::fail;
use crate::archive::BinaryIndex;
use crate::archive::contents::{OverrideMismatch, override_mismatches};
use crate::color::ColorScheme;

#[derive(Debug, Clone, Args)]
pub struct ArchitectureMismatchesArgs {
  /// Packages files, one or more per architecture (optionally .gz)
  #[arg(required = true, value_name = "FILE")]
  pub packages: Vec<PathBuf>,
}

/// `component/section/priority: arch, arch` for each variant.
pub fn format_mismatch(mismatch: &OverrideMismatch) -> Vec<String> {
  mismatch
    .variants
    .iter()
    .map(|(overrides, archs)| {
      format!(
        "{}/{}/{}: {}",
        overrides.component,
        overrides.section,
        overrides.priority,
        archs.join(", ")
      )
    })
    .collect()
}

pub(crate) fn handle_architecture_mismatches_command(args: &ArchitectureMismatchesArgs, colors: &ColorScheme) {
  let mut binaries = BinaryIndex::new();
  for path in &args.packages {
    if let Err(e) = binaries.add_file(path) {
      fail(colors, "Failed to read Packages file", e, 1);
    }
  }

  let mismatches = override_mismatches(&binaries);
  if mismatches.is_empty() {
    println!("{} No override mismatches", colors.success("✓"));
    return;
  }
  for mismatch in &mismatches {
    println!("{}", colors.emphasis(&mismatch.package));
    for line in format_mismatch(mismatch) {
      println!("    {line}");
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::archive::contents::Overrides;

  #[test]
  fn variants_are_listed() {
    let mismatch = OverrideMismatch {
      package: "libfoo1".into(),
      variants: vec![
        (
          Overrides {
            component: "main".into(),
            section: "libs".into(),
            priority: "optional".into(),
          },
          vec!["amd64".into(), "arm64".into()],
        ),
        (
          Overrides {
            component: "universe".into(),
            section: "libs".into(),
            priority: "optional".into(),
          },
          vec!["riscv64".into()],
        ),
      ],
    };
    assert_eq!(
      format_mismatch(&mismatch),
      vec!["main/libs/optional: amd64, arm64", "universe/libs/optional: riscv64"]
    );
  }
}
