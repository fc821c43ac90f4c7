//! Entries returned by the Launchpad web service.
//!
//! Only the attributes the tools use are modelled; Launchpad sends many more.
//! Links to other entries are kept as URLs (`*_link` fields) and resolved by
//! the client on demand.

use serde::{Deserialize, Serialize};

/// A page of a collection resource.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
  #[serde(default = "Vec::new")]
  pub entries: Vec<T>,
  pub next_collection_link: Option<String>,
  pub total_size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub name: String,
  pub display_name: String,
  pub self_link: String,
  #[serde(default)]
  pub is_team: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bug {
  pub id: u64,
  pub title: String,
  #[serde(default)]
  pub tags: Vec<String>,
  pub owner_link: String,
  pub self_link: String,
  pub web_link: String,
  pub bug_tasks_collection_link: String,
  pub subscriptions_collection_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugTask {
  pub self_link: String,
  pub web_link: String,
  /// Link to the target (distribution source package, project, ...).
  pub target_link: String,
  pub status: String,
  #[serde(default)]
  pub bug_target_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
  pub self_link: String,
  pub person_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Archive {
  pub self_link: String,
  pub name: String,
  #[serde(default)]
  pub displayname: String,
  #[serde(default)]
  pub reference: String,
  pub distribution_link: String,
  pub owner_link: Option<String>,
  #[serde(default)]
  pub private: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Distribution {
  pub name: String,
  pub self_link: String,
  pub current_series_link: Option<String>,
  pub main_archive_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroSeries {
  pub name: String,
  pub version: String,
  pub status: String,
  #[serde(default)]
  pub active: bool,
  pub self_link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistroArchSeries {
  pub architecture_tag: String,
  pub self_link: String,
  pub distroseries_link: String,
  #[serde(default)]
  pub enabled: bool,
  pub chroot_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcePublication {
  pub self_link: String,
  pub source_package_name: String,
  pub source_package_version: String,
  pub component_name: String,
  pub section_name: String,
  pub pocket: String,
  pub status: String,
  pub distro_series_link: String,
  pub archive_link: String,
  pub date_published: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryPublication {
  pub self_link: String,
  pub binary_package_name: String,
  pub binary_package_version: String,
  pub component_name: String,
  pub section_name: String,
  pub priority_name: String,
  pub pocket: String,
  pub status: String,
  pub distro_arch_series_link: String,
  #[serde(default)]
  pub architecture_specific: bool,
}

impl BinaryPublication {
  /// Architecture tag, the last segment of the distroarchseries link.
  pub fn architecture(&self) -> &str {
    self
      .distro_arch_series_link
      .trim_end_matches('/')
      .rsplit('/')
      .next()
      .unwrap_or_default()
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Builder {
  pub name: String,
  pub title: String,
  pub self_link: String,
  #[serde(default)]
  pub active: bool,
  #[serde(default)]
  pub manual: bool,
  #[serde(default)]
  pub builderok: bool,
  #[serde(default)]
  pub virtualized: bool,
  pub vm_host: Option<String>,
  pub failnotes: Option<String>,
  pub clean_status: Option<String>,
  pub processors_collection_link: Option<String>,
  pub current_build_link: Option<String>,
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn collection_defaults_missing_entries() {
    let page: Collection<Person> = serde_json::from_value(json!({"total_size": 0})).unwrap();
    assert!(page.entries.is_empty());
    assert!(page.next_collection_link.is_none());
  }

  #[test]
  fn binary_publication_architecture_from_link() {
    let publication: BinaryPublication = serde_json::from_value(json!({
      "self_link": "https://api.launchpad.net/devel/ubuntu/+archive/primary/+binarypub/1",
      "binary_package_name": "hello",
      "binary_package_version": "2.10-3",
      "component_name": "main",
      "section_name": "devel",
      "priority_name": "OPTIONAL",
      "pocket": "Release",
      "status": "Published",
      "distro_arch_series_link": "https://api.launchpad.net/devel/ubuntu/noble/arm64",
      "architecture_specific": true
    }))
    .unwrap();
    assert_eq!(publication.architecture(), "arm64");
  }
}
