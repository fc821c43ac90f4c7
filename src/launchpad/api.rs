//! Trait definitions for interacting with Launchpad.

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;

use super::models::{
  Archive, BinaryPublication, Bug, BugTask, Builder, DistroArchSeries, DistroSeries, Person, SourcePublication,
  Subscription,
};
use super::reference::{ArchiveReference, Pocket};

/// Filters for `Archive.getPublishedSources`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceQuery {
  pub source_name: Option<String>,
  pub version: Option<String>,
  /// Match `source_name` exactly rather than as a prefix.
  pub exact_match: bool,
  pub distro_series_link: Option<String>,
  pub pocket: Option<Pocket>,
  /// Publication status such as `Published` or `Pending`.
  pub status: Option<String>,
}

/// Filters for `Archive.getPublishedBinaries`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BinaryQuery {
  pub binary_name: Option<String>,
  pub version: Option<String>,
  pub exact_match: bool,
  pub distro_arch_series_link: Option<String>,
  pub pocket: Option<Pocket>,
  pub status: Option<String>,
}

/// Arguments for `Archive.copyPackage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
  pub source_name: String,
  pub version: String,
  pub from_archive_link: String,
  /// Target series; `None` keeps the source publication's series.
  pub to_series: Option<String>,
  pub to_pocket: Pocket,
  pub include_binaries: bool,
  pub unembargo: bool,
  pub auto_approve: bool,
}

/// New override values; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideChange {
  pub component: Option<String>,
  pub section: Option<String>,
  /// Binary publications only.
  pub priority: Option<String>,
}

impl OverrideChange {
  pub fn is_empty(&self) -> bool {
    self.component.is_none() && self.section.is_none() && self.priority.is_none()
  }
}

/// Launchpad web service operations (enables testing with fake
/// implementations).
#[async_trait]
pub trait LaunchpadApi: Send + Sync {
  /// Service root every `*_link` is relative to, ending with `/`.
  fn api_root(&self) -> &str;

  /// The authenticated user (`people/+me`).
  async fn me(&self) -> Result<Person>;

  async fn get_person(&self, name: &str) -> Result<Person>;

  async fn get_bug(&self, id: u64) -> Result<Bug>;

  async fn get_bug_tasks(&self, bug: &Bug) -> Result<Vec<BugTask>>;

  async fn get_bug_subscriptions(&self, bug: &Bug) -> Result<Vec<Subscription>>;

  async fn set_bug_task_status(&self, task: &BugTask, status: &str) -> Result<()>;

  /// Add a task for `target_link` and return it.
  async fn add_bug_task(&self, bug: &Bug, target_link: &str) -> Result<BugTask>;

  async fn subscribe_to_bug(&self, bug: &Bug, person: &Person) -> Result<()>;

  /// Replace the bug's tag list.
  async fn set_bug_tags(&self, bug: &Bug, tags: &[String]) -> Result<()>;

  async fn add_bug_message(&self, bug: &Bug, subject: &str, content: &str) -> Result<()>;

  /// Resolve a primary archive or PPA.
  ///
  /// # Errors
  /// Fails when the archive does not exist or is not visible to the caller.
  async fn get_archive(&self, reference: &ArchiveReference) -> Result<Archive>;

  async fn get_series(&self, distribution: &str, series: &str) -> Result<DistroSeries>;

  async fn get_development_series(&self, distribution: &str) -> Result<DistroSeries>;

  /// All source publications matching `query`, across result pages.
  async fn get_published_sources(&self, archive: &Archive, query: &SourceQuery) -> Result<Vec<SourcePublication>>;

  async fn get_published_binaries(&self, archive: &Archive, query: &BinaryQuery) -> Result<Vec<BinaryPublication>>;

  /// Binaries built from a source publication.
  async fn get_publication_binaries(&self, publication: &SourcePublication) -> Result<Vec<BinaryPublication>>;

  /// Ask Launchpad to copy a source (and optionally its binaries) into
  /// `destination`. The copy is asynchronous on the server side.
  async fn copy_package(&self, destination: &Archive, request: &CopyRequest) -> Result<()>;

  async fn request_deletion(&self, publication_link: &str, comment: &str) -> Result<()>;

  async fn change_override(&self, publication_link: &str, change: &OverrideChange) -> Result<()>;

  /// URL of the upload's `.changes` file, when Launchpad still has it.
  async fn changes_file_url(&self, publication: &SourcePublication) -> Result<Option<String>>;

  /// Fetch a text document such as a `.changes` file.
  async fn fetch_text(&self, url: &str) -> Result<String>;

  async fn get_builders(&self) -> Result<Vec<Builder>>;

  async fn set_builder_manual(&self, builder: &Builder, manual: bool) -> Result<()>;

  async fn set_builder_active(&self, builder: &Builder, active: bool) -> Result<()>;

  async fn get_distro_arch_series(&self, series: &DistroSeries, architecture: &str) -> Result<DistroArchSeries>;

  /// URL of the chroot tarball for a pocket, if one is set.
  async fn chroot_url(&self, das: &DistroArchSeries, pocket: Pocket, image_type: &str) -> Result<Option<String>>;

  async fn remove_chroot(&self, das: &DistroArchSeries, pocket: Pocket, image_type: &str) -> Result<()>;

  /// Upload a new chroot. Launchpad checks `data` against `sha1sum`.
  async fn set_chroot(
    &self,
    das: &DistroArchSeries,
    pocket: Pocket,
    image_type: &str,
    data: Vec<u8>,
    sha1sum: &str,
  ) -> Result<()>;

  /// Download `url` into `output_path`, creating parent directories.
  async fn download(&self, url: &str, output_path: &Path) -> Result<()>;
}
