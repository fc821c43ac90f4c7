//! Debian package versions and apt-style ordering.
//!
//! Parsing and comparison come from `debian_packaging`; this module adds the
//! string-level helpers the reports use.

use std::cmp::Ordering;

use anyhow::{Context, Result};
pub use debian_packaging::package_version::PackageVersion;

/// Compare two version strings using apt ordering.
pub fn compare_versions(a: &str, b: &str) -> Result<Ordering> {
  let a_version = PackageVersion::parse(a).with_context(|| format!("Invalid version {a:?}"))?;
  let b_version = PackageVersion::parse(b).with_context(|| format!("Invalid version {b:?}"))?;
  Ok(a_version.cmp(&b_version))
}

/// Whether a version has no Debian revision.
pub fn is_native(version: &PackageVersion) -> bool {
  version.debian_revision().is_none()
}

#[cfg(test)]
mod tests {
  use super::*;

  fn v(s: &str) -> PackageVersion {
    PackageVersion::parse(s).unwrap()
  }

  #[test]
  fn parse_splits_components() {
    let version = v("1:4.7.0+dfsg1-2ubuntu0.1");
    assert_eq!(version.epoch(), Some(1));
    assert_eq!(version.upstream_version(), "4.7.0+dfsg1");
    assert_eq!(version.debian_revision(), Some("2ubuntu0.1"));
    assert!(!is_native(&version));

    let version = v("3.3.2.final~github-2-1");
    assert_eq!(version.upstream_version(), "3.3.2.final~github-2");
    assert_eq!(version.debian_revision(), Some("1"));

    assert!(is_native(&v("20240101")));
  }

  #[test]
  fn compare_rejects_bad_input() {
    let err = compare_versions("a:1.0", "1.0").unwrap_err();
    assert!(err.to_string().contains("a:1.0"), "{err}");
    assert!(compare_versions("1.0", "1.0_beta").is_err());
  }

  #[test]
  fn ordering_matches_apt() {
    let ascending = [
      "1.0~rc1",
      "1.0",
      "1.0-1",
      "1.0-1ubuntu0.1",
      "1.0-1ubuntu1",
      "1.0-1ubuntu1.1",
      "1.0a-1",
      "1.0+b1-1",
      "1.2",
      "1.10",
      "2.4",
      "2.30",
      "1:0.1",
    ];

    for pair in ascending.windows(2) {
      assert_eq!(
        compare_versions(pair[0], pair[1]).unwrap(),
        Ordering::Less,
        "{} should sort before {}",
        pair[0],
        pair[1]
      );
      assert_eq!(compare_versions(pair[1], pair[0]).unwrap(), Ordering::Greater);
    }
  }

  #[test]
  fn equivalent_spellings_compare_equal() {
    assert_eq!(compare_versions("1.0", "0:1.0").unwrap(), Ordering::Equal);
    assert_eq!(compare_versions("1.0", "1.0-0").unwrap(), Ordering::Equal);
    assert_eq!(compare_versions("1.001", "1.1").unwrap(), Ordering::Equal);
    assert_eq!(compare_versions("1.0", "1.0.0").unwrap(), Ordering::Less);
  }

  #[test]
  fn kernel_abi_versions_sort_numerically() {
    assert_eq!(
      compare_versions("5.15.0-101.111", "5.15.0-99.109").unwrap(),
      Ordering::Greater
    );
    assert_eq!(
      compare_versions("6.8.0-31.31~22.04.1", "6.8.0-31.31").unwrap(),
      Ordering::Less
    );
  }
}
