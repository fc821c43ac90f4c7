//! Status vocabularies mirrored from the tracker's server-side module. The
//! tracker stores statuses as indices into these lists.

use std::collections::BTreeSet;
use std::fmt;

use super::error::{QaTrackerError, Result};

pub const BUILD_MILESTONE_STATUS: &[&str] = &["Active", "Re-building", "Disabled", "Superseded", "Ready"];
pub const MILESTONE_NOTIFY: &[&str] = &["No", "Yes"];
pub const MILESTONE_AUTOFILL: &[&str] = &["No", "Yes"];
pub const MILESTONE_STATUS: &[&str] = &["Testing", "Released", "Archived"];
pub const MILESTONE_SERIES_STATUS: &[&str] = &["Active", "Disabled"];
pub const MILESTONE_SERIES_MANIFEST_STATUS: &[&str] = &["Active", "Disabled"];
pub const PRODUCT_STATUS: &[&str] = &["Active", "Disabled"];
pub const PRODUCT_TYPE: &[&str] = &["iso", "package", "hardware"];
pub const PRODUCT_DOWNLOAD_TYPE: &[&str] =
  &["HTTP", "RSYNC", "ZSYNC", "GPG signature", "MD5 checksum", "Comment", "Torrent"];
pub const TESTCASE_STATUS: &[&str] = &["Mandatory", "Disabled", "Run-once", "Optional"];
pub const RESULT_RESULT: &[&str] = &["Failed", "Passed", "In progress"];
pub const RESULT_STATUS: &[&str] = &["Active", "Disabled"];
pub const REBUILD_STATUS: &[&str] = &["Requested", "Queued", "Building", "Built", "Published", "Canceled"];

/// A status given either by name (case-insensitive) or by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter<'a> {
  Name(&'a str),
  Index(usize),
}

impl fmt::Display for StatusFilter<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      StatusFilter::Name(name) => f.write_str(name),
      StatusFilter::Index(index) => write!(f, "{index}"),
    }
  }
}

impl<'a> From<&'a str> for StatusFilter<'a> {
  fn from(value: &'a str) -> Self {
    StatusFilter::Name(value)
  }
}

impl From<usize> for StatusFilter<'_> {
  fn from(value: usize) -> Self {
    StatusFilter::Index(value)
  }
}

fn resolve(vocabulary: &[&str], filter: StatusFilter<'_>) -> Result<i64> {
  let index = match filter {
    StatusFilter::Index(index) if index < vocabulary.len() => Some(index),
    StatusFilter::Index(_) => None,
    StatusFilter::Name(name) => vocabulary.iter().position(|entry| entry.eq_ignore_ascii_case(name)),
  };
  index
    .map(|i| i as i64)
    .ok_or_else(|| QaTrackerError::InvalidStatus(filter.to_string().to_lowercase()))
}

/// Indices into `vocabulary` for `filters`, deduplicated and sorted.
/// `None` selects the whole vocabulary.
pub fn valid_id_list(vocabulary: &[&str], filters: Option<&[StatusFilter<'_>]>) -> Result<Vec<i64>> {
  let Some(filters) = filters else {
    return Ok((0..vocabulary.len() as i64).collect());
  };
  let ids = filters
    .iter()
    .map(|filter| resolve(vocabulary, *filter))
    .collect::<Result<BTreeSet<_>>>()?;
  Ok(ids.into_iter().collect())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn names_and_indices() {
    let ids = valid_id_list(
      BUILD_MILESTONE_STATUS,
      Some(&["ready".into(), StatusFilter::Index(0), "Active".into()]),
    )
    .unwrap();
    assert_eq!(ids, vec![0, 4]);
  }

  #[test]
  fn whole_vocabulary_and_empty_filter() {
    assert_eq!(valid_id_list(RESULT_RESULT, None).unwrap(), vec![0, 1, 2]);
    assert!(valid_id_list(RESULT_RESULT, Some(&[])).unwrap().is_empty());
  }

  #[test]
  fn rejects_unknown_statuses() {
    assert!(matches!(
      valid_id_list(PRODUCT_STATUS, Some(&["Retired".into()])),
      Err(QaTrackerError::InvalidStatus(s)) if s == "retired"
    ));
    assert!(valid_id_list(PRODUCT_STATUS, Some(&[StatusFilter::Index(2)])).is_err());
  }
}
