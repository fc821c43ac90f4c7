//! Fake Launchpad client for testing
//!
//! Serves bugs, archives and publications from memory and records every
//! write so tests can check what a workflow asked Launchpad to do.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use ubuntu_archive_tools::launchpad::{
  Archive, ArchiveReference, BinaryPublication, BinaryQuery, Bug, BugTask, Builder, CopyRequest, DistroArchSeries,
  DistroSeries, LaunchpadApi, OverrideChange, Person, Pocket, SourcePublication, SourceQuery, Subscription,
};

use crate::common::fixtures::{self, ROOT};

/// A write made through the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
  SetTaskStatus { task: String, status: String },
  AddTask { bug: u64, target: String },
  Subscribe { bug: u64, person: String },
  SetTags { bug: u64, tags: Vec<String> },
  AddMessage { bug: u64, subject: String },
  Copy { archive: String, request: CopyRequest },
  Delete { link: String, comment: String },
  Override { link: String, change: OverrideChange },
  SetBuilderManual { builder: String, manual: bool },
  SetBuilderActive { builder: String, active: bool },
  RemoveChroot { das: String, pocket: Pocket },
  SetChroot { das: String, pocket: Pocket, size: usize, sha1sum: String },
}

pub struct FakeLaunchpad {
  people: HashMap<String, Person>,
  bugs: HashMap<u64, Bug>,
  tasks: HashMap<u64, Vec<BugTask>>,
  subscriptions: HashMap<u64, Vec<Subscription>>,
  archives: HashMap<String, Archive>,
  series: Vec<DistroSeries>,
  sources: Vec<SourcePublication>,
  binaries: Vec<BinaryPublication>,
  built_from: HashMap<String, Vec<BinaryPublication>>,
  changes: HashMap<String, String>,
  builders: Vec<Builder>,
  calls: Mutex<Vec<Call>>,
}

impl FakeLaunchpad {
  /// An empty Launchpad with the SRU teams and the Ubuntu primary archive.
  pub fn new() -> Self {
    let mut fake = Self {
      people: HashMap::new(),
      bugs: HashMap::new(),
      tasks: HashMap::new(),
      subscriptions: HashMap::new(),
      archives: HashMap::new(),
      series: Vec::new(),
      sources: Vec::new(),
      binaries: Vec::new(),
      built_from: HashMap::new(),
      changes: HashMap::new(),
      builders: Vec::new(),
      calls: Mutex::new(Vec::new()),
    };
    for team in ["ubuntu-sru", "sru-verification", "ubuntu-sponsors"] {
      fake.add_person(fixtures::team(team));
    }
    fake.add_archive("ubuntu", fixtures::primary_archive("ubuntu"));
    fake
  }

  pub fn add_person(&mut self, person: Person) {
    self.people.insert(person.name.clone(), person);
  }

  pub fn add_bug(&mut self, bug: Bug, tasks: Vec<BugTask>) {
    self.tasks.insert(bug.id, tasks);
    self.bugs.insert(bug.id, bug);
  }

  pub fn subscribe(&mut self, bug: u64, person: &str) {
    let link = format!("{ROOT}~{person}");
    self.subscriptions.entry(bug).or_default().push(Subscription {
      self_link: format!("{ROOT}bugs/{bug}/+subscription/{person}"),
      person_link: link,
    });
  }

  /// Register an archive under its `getByReference` name.
  pub fn add_archive(&mut self, reference: &str, archive: Archive) {
    self.archives.insert(reference.to_string(), archive);
  }

  pub fn add_series(&mut self, series: DistroSeries) {
    self.series.push(series);
  }

  /// Publications are returned in insertion order, so add newer ones first.
  pub fn add_source(&mut self, publication: SourcePublication) {
    self.sources.push(publication);
  }

  pub fn add_binary(&mut self, publication: BinaryPublication) {
    self.binaries.push(publication);
  }

  pub fn add_built_binaries(&mut self, source: &SourcePublication, binaries: Vec<BinaryPublication>) {
    self.built_from.insert(source.self_link.clone(), binaries);
  }

  pub fn add_changes(&mut self, source: &SourcePublication, changes: &str) {
    self.changes.insert(source.self_link.clone(), changes.to_string());
  }

  pub fn add_builder(&mut self, builder: Builder) {
    self.builders.push(builder);
  }

  pub fn calls(&self) -> Vec<Call> {
    self.calls.lock().unwrap().clone()
  }

  fn record(&self, call: Call) {
    self.calls.lock().unwrap().push(call);
  }
}

impl Default for FakeLaunchpad {
  fn default() -> Self {
    Self::new()
  }
}

fn matches_name(name: &str, wanted: Option<&String>, exact: bool) -> bool {
  match wanted {
    Some(wanted) if exact => name == wanted,
    Some(wanted) => name.starts_with(wanted.as_str()),
    None => true,
  }
}

fn matches<T: PartialEq + ?Sized>(value: &T, wanted: Option<&T>) -> bool {
  wanted.is_none_or(|w| w == value)
}

#[async_trait]
impl LaunchpadApi for FakeLaunchpad {
  fn api_root(&self) -> &str {
    ROOT
  }

  async fn me(&self) -> Result<Person> {
    Ok(fixtures::person("archive-admin", "Archive Admin"))
  }

  async fn get_person(&self, name: &str) -> Result<Person> {
    self
      .people
      .get(name)
      .cloned()
      .ok_or_else(|| anyhow!("No such person: {name}"))
  }

  async fn get_bug(&self, id: u64) -> Result<Bug> {
    self.bugs.get(&id).cloned().ok_or_else(|| anyhow!("Bug {id} not found"))
  }

  async fn get_bug_tasks(&self, bug: &Bug) -> Result<Vec<BugTask>> {
    Ok(self.tasks.get(&bug.id).cloned().unwrap_or_default())
  }

  async fn get_bug_subscriptions(&self, bug: &Bug) -> Result<Vec<Subscription>> {
    Ok(self.subscriptions.get(&bug.id).cloned().unwrap_or_default())
  }

  async fn set_bug_task_status(&self, task: &BugTask, status: &str) -> Result<()> {
    self.record(Call::SetTaskStatus {
      task: task.self_link.clone(),
      status: status.to_string(),
    });
    Ok(())
  }

  async fn add_bug_task(&self, bug: &Bug, target_link: &str) -> Result<BugTask> {
    self.record(Call::AddTask {
      bug: bug.id,
      target: target_link.to_string(),
    });
    let target = target_link.strip_prefix(ROOT).unwrap_or(target_link);
    Ok(fixtures::task(bug.id, target, "New"))
  }

  async fn subscribe_to_bug(&self, bug: &Bug, person: &Person) -> Result<()> {
    self.record(Call::Subscribe {
      bug: bug.id,
      person: person.name.clone(),
    });
    Ok(())
  }

  async fn set_bug_tags(&self, bug: &Bug, tags: &[String]) -> Result<()> {
    self.record(Call::SetTags {
      bug: bug.id,
      tags: tags.to_vec(),
    });
    Ok(())
  }

  async fn add_bug_message(&self, bug: &Bug, subject: &str, _content: &str) -> Result<()> {
    self.record(Call::AddMessage {
      bug: bug.id,
      subject: subject.to_string(),
    });
    Ok(())
  }

  async fn get_archive(&self, reference: &ArchiveReference) -> Result<Archive> {
    let name = reference.launchpad_reference();
    self
      .archives
      .get(&name)
      .cloned()
      .ok_or_else(|| anyhow!("No archive {name}"))
  }

  async fn get_series(&self, distribution: &str, series: &str) -> Result<DistroSeries> {
    self
      .series
      .iter()
      .find(|s| s.name == series)
      .cloned()
      .ok_or_else(|| anyhow!("No series {distribution}/{series}"))
  }

  async fn get_development_series(&self, distribution: &str) -> Result<DistroSeries> {
    self
      .series
      .iter()
      .find(|s| s.status == "Active Development")
      .cloned()
      .ok_or_else(|| anyhow!("{distribution} has no development series"))
  }

  async fn get_published_sources(&self, archive: &Archive, query: &SourceQuery) -> Result<Vec<SourcePublication>> {
    Ok(
      self
        .sources
        .iter()
        .filter(|p| p.archive_link == archive.self_link)
        .filter(|p| matches_name(&p.source_package_name, query.source_name.as_ref(), query.exact_match))
        .filter(|p| matches(p.source_package_version.as_str(), query.version.as_deref()))
        .filter(|p| matches(p.distro_series_link.as_str(), query.distro_series_link.as_deref()))
        .filter(|p| matches(p.pocket.as_str(), query.pocket.map(Pocket::as_str)))
        .filter(|p| matches(p.status.as_str(), query.status.as_deref()))
        .cloned()
        .collect(),
    )
  }

  async fn get_published_binaries(&self, archive: &Archive, query: &BinaryQuery) -> Result<Vec<BinaryPublication>> {
    Ok(
      self
        .binaries
        .iter()
        .filter(|p| p.self_link.starts_with(&archive.self_link))
        .filter(|p| matches_name(&p.binary_package_name, query.binary_name.as_ref(), query.exact_match))
        .filter(|p| matches(p.binary_package_version.as_str(), query.version.as_deref()))
        .filter(|p| matches(p.distro_arch_series_link.as_str(), query.distro_arch_series_link.as_deref()))
        .filter(|p| matches(p.pocket.as_str(), query.pocket.map(Pocket::as_str)))
        .filter(|p| matches(p.status.as_str(), query.status.as_deref()))
        .cloned()
        .collect(),
    )
  }

  async fn get_publication_binaries(&self, publication: &SourcePublication) -> Result<Vec<BinaryPublication>> {
    Ok(self.built_from.get(&publication.self_link).cloned().unwrap_or_default())
  }

  async fn copy_package(&self, destination: &Archive, request: &CopyRequest) -> Result<()> {
    self.record(Call::Copy {
      archive: destination.self_link.clone(),
      request: request.clone(),
    });
    Ok(())
  }

  async fn request_deletion(&self, publication_link: &str, comment: &str) -> Result<()> {
    self.record(Call::Delete {
      link: publication_link.to_string(),
      comment: comment.to_string(),
    });
    Ok(())
  }

  async fn change_override(&self, publication_link: &str, change: &OverrideChange) -> Result<()> {
    self.record(Call::Override {
      link: publication_link.to_string(),
      change: change.clone(),
    });
    Ok(())
  }

  async fn changes_file_url(&self, publication: &SourcePublication) -> Result<Option<String>> {
    Ok(
      self
        .changes
        .contains_key(&publication.self_link)
        .then(|| format!("{}/changes", publication.self_link)),
    )
  }

  async fn fetch_text(&self, url: &str) -> Result<String> {
    let link = url.strip_suffix("/changes").unwrap_or(url);
    self
      .changes
      .get(link)
      .cloned()
      .ok_or_else(|| anyhow!("404 Not Found: {url}"))
  }

  async fn get_builders(&self) -> Result<Vec<Builder>> {
    Ok(self.builders.clone())
  }

  async fn set_builder_manual(&self, builder: &Builder, manual: bool) -> Result<()> {
    self.record(Call::SetBuilderManual {
      builder: builder.name.clone(),
      manual,
    });
    Ok(())
  }

  async fn set_builder_active(&self, builder: &Builder, active: bool) -> Result<()> {
    self.record(Call::SetBuilderActive {
      builder: builder.name.clone(),
      active,
    });
    Ok(())
  }

  async fn get_distro_arch_series(&self, series: &DistroSeries, architecture: &str) -> Result<DistroArchSeries> {
    Ok(DistroArchSeries {
      architecture_tag: architecture.to_string(),
      self_link: format!("{}/{architecture}", series.self_link),
      distroseries_link: series.self_link.clone(),
      enabled: true,
      chroot_url: None,
    })
  }

  async fn chroot_url(&self, das: &DistroArchSeries, pocket: Pocket, image_type: &str) -> Result<Option<String>> {
    Ok(Some(format!(
      "https://launchpad.test/{}/{pocket}/{}",
      das.architecture_tag,
      image_type.replace(' ', "-")
    )))
  }

  async fn remove_chroot(&self, das: &DistroArchSeries, pocket: Pocket, _image_type: &str) -> Result<()> {
    self.record(Call::RemoveChroot {
      das: das.self_link.clone(),
      pocket,
    });
    Ok(())
  }

  async fn set_chroot(
    &self,
    das: &DistroArchSeries,
    pocket: Pocket,
    _image_type: &str,
    data: Vec<u8>,
    sha1sum: &str,
  ) -> Result<()> {
    self.record(Call::SetChroot {
      das: das.self_link.clone(),
      pocket,
      size: data.len(),
      sha1sum: sha1sum.to_string(),
    });
    Ok(())
  }

  async fn download(&self, url: &str, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, url)?;
    Ok(())
  }
}
