//! Launchpad entries for tests, built from the JSON the web service sends.

use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use ubuntu_archive_tools::launchpad::{
  Archive, BinaryPublication, Bug, BugTask, Builder, DistroSeries, Person, Pocket, SourcePublication,
};

pub const ROOT: &str = "https://api.launchpad.test/devel/";

fn entry<T: DeserializeOwned>(value: Value) -> T {
  serde_json::from_value(value).unwrap()
}

pub fn person(name: &str, display_name: &str) -> Person {
  entry(json!({
    "name": name,
    "display_name": display_name,
    "self_link": format!("{ROOT}~{name}"),
    "is_team": false
  }))
}

pub fn team(name: &str) -> Person {
  entry(json!({
    "name": name,
    "display_name": name,
    "self_link": format!("{ROOT}~{name}"),
    "is_team": true
  }))
}

pub fn bug(id: u64, title: &str, tags: &[&str], owner: &str) -> Bug {
  entry(json!({
    "id": id,
    "title": title,
    "tags": tags,
    "owner_link": format!("{ROOT}~{owner}"),
    "self_link": format!("{ROOT}bugs/{id}"),
    "web_link": format!("https://bugs.launchpad.test/bugs/{id}"),
    "bug_tasks_collection_link": format!("{ROOT}bugs/{id}/bug_tasks"),
    "subscriptions_collection_link": format!("{ROOT}bugs/{id}/subscriptions")
  }))
}

/// A task on `target`, a path below the service root such as
/// `ubuntu/noble/+source/hello`.
pub fn task(bug: u64, target: &str, status: &str) -> BugTask {
  entry(json!({
    "self_link": format!("{ROOT}{target}/+bug/{bug}"),
    "web_link": format!("https://bugs.launchpad.test/{target}/+bug/{bug}"),
    "target_link": format!("{ROOT}{target}"),
    "status": status,
    "bug_target_name": target.rsplit('/').next().unwrap()
  }))
}

pub fn primary_archive(distribution: &str) -> Archive {
  entry(json!({
    "self_link": format!("{ROOT}{distribution}/+archive/primary"),
    "name": "primary",
    "displayname": format!("Primary Archive for {distribution}"),
    "reference": distribution,
    "distribution_link": format!("{ROOT}{distribution}"),
    "owner_link": null,
    "private": false
  }))
}

pub fn ppa(owner: &str, name: &str, private: bool) -> Archive {
  entry(json!({
    "self_link": format!("{ROOT}~{owner}/+archive/ubuntu/{name}"),
    "name": name,
    "displayname": format!("PPA {name}"),
    "reference": format!("~{owner}/ubuntu/{name}"),
    "distribution_link": format!("{ROOT}ubuntu"),
    "owner_link": format!("{ROOT}~{owner}"),
    "private": private
  }))
}

pub fn series(name: &str, version: &str, status: &str) -> DistroSeries {
  entry(json!({
    "name": name,
    "version": version,
    "status": status,
    "active": true,
    "self_link": format!("{ROOT}ubuntu/{name}")
  }))
}

pub struct SourceSpec<'a> {
  pub name: &'a str,
  pub version: &'a str,
  pub series: &'a str,
  pub pocket: Pocket,
  pub status: &'a str,
  pub component: &'a str,
}

impl<'a> SourceSpec<'a> {
  pub fn new(name: &'a str, version: &'a str, series: &'a str, pocket: Pocket) -> Self {
    Self {
      name,
      version,
      series,
      pocket,
      status: "Published",
      component: "main",
    }
  }
}

pub fn source(archive: &Archive, spec: &SourceSpec<'_>, date_published: Option<&str>) -> SourcePublication {
  entry(json!({
    "self_link": format!(
      "{}/+sourcepub/{}-{}-{}",
      archive.self_link, spec.name, spec.version, spec.pocket
    ),
    "source_package_name": spec.name,
    "source_package_version": spec.version,
    "component_name": spec.component,
    "section_name": "devel",
    "pocket": spec.pocket.as_str(),
    "status": spec.status,
    "distro_series_link": format!("{ROOT}ubuntu/{}", spec.series),
    "archive_link": archive.self_link,
    "date_published": date_published
  }))
}

pub fn binary(archive: &Archive, spec: &SourceSpec<'_>, architecture: &str) -> BinaryPublication {
  entry(json!({
    "self_link": format!(
      "{}/+binarypub/{}-{}-{architecture}-{}",
      archive.self_link, spec.name, spec.version, spec.series
    ),
    "binary_package_name": spec.name,
    "binary_package_version": spec.version,
    "component_name": spec.component,
    "section_name": "devel",
    "priority_name": "OPTIONAL",
    "pocket": spec.pocket.as_str(),
    "status": spec.status,
    "distro_arch_series_link": format!("{ROOT}ubuntu/{}/{architecture}", spec.series),
    "architecture_specific": architecture != "all"
  }))
}

pub fn builder(name: &str, active: bool, manual: bool, virtualized: bool) -> Builder {
  entry(json!({
    "name": name,
    "title": name,
    "self_link": format!("{ROOT}builders/{name}"),
    "active": active,
    "manual": manual,
    "builderok": true,
    "virtualized": virtualized,
    "vm_host": virtualized.then(|| format!("{name}-host")),
    "failnotes": null,
    "clean_status": "Clean",
    "processors_collection_link": null,
    "current_build_link": null
  }))
}

/// Kernel-series routing for noble: builds land in a private PPA and are
/// copied to the primary archive's proposed pocket.
pub const KERNEL_SERIES: &str = r#"
'24.04':
  codename: noble
  supported: true
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
