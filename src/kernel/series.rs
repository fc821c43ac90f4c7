//! Model of `kernel-series.yaml`, the kernel team's description of every
//! supported kernel, its packages, snaps and archive routing.
//!
//! The YAML is deserialized into plain data structs once; the public API hands
//! out cheap borrowed views ([`SeriesEntry`], [`SourceEntry`], ...) which
//! resolve defaults and cross references on demand.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use anyhow::{Context, Result as AnyResult};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_yaml::{Mapping, Value};
use thiserror::Error;
use tracing::debug;

/// Canonical location of the kernel-series database.
pub const KERNEL_SERIES_URL: &str =
  "https://git.launchpad.net/~canonical-kernel/+git/kteam-tools/plain/info/kernel-series.yaml";

#[derive(Debug, Error)]
pub enum KernelSeriesError {
  #[error("invalid kernel-series data: {0}")]
  Yaml(#[from] serde_yaml::Error),

  #[error("invalid key {0:?} in kernel-series data")]
  InvalidKey(String),

  #[error("unable to map routing alias {0}, no series routing table")]
  NoRoutingTable(String),

  #[error("unable to map routing alias {0}, not listed in series routing table")]
  UnknownRoutingAlias(String),
}

pub type Result<T> = std::result::Result<T, KernelSeriesError>;

/// How to pick a series in [`KernelSeries::lookup_series`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesLookup<'k> {
  /// Series number, e.g. `22.04`.
  Name(&'k str),
  Codename(&'k str),
  Development,
}

/// The parsed kernel-series database.
#[derive(Debug, Clone, Default)]
pub struct KernelSeries {
  series: Vec<(String, SeriesData)>,
  development_series: Option<String>,
  codename_to_series: HashMap<String, String>,
}

impl KernelSeries {
  /// Parse kernel-series YAML text.
  ///
  /// The top-level `defaults` mapping is merged under every series, with the
  /// series' own keys taking precedence.
  pub fn parse(text: &str) -> Result<Self> {
    let mut root: Mapping = serde_yaml::from_str(text)?;
    let defaults = match root.remove("defaults") {
      Some(Value::Mapping(defaults)) => defaults,
      _ => Mapping::new(),
    };

    let mut db = KernelSeries::default();
    for (key, value) in root {
      let name = key_to_string(&key).ok_or_else(|| KernelSeriesError::InvalidKey(format!("{key:?}")))?;

      let own = match value {
        Value::Mapping(own) => own,
        _ => Mapping::new(),
      };
      if own.get("development").and_then(Value::as_bool) == Some(true) {
        db.development_series = Some(name.clone());
      }
      if let Some(codename) = own.get("codename").and_then(Value::as_str) {
        db.codename_to_series.insert(codename.to_string(), name.clone());
      }

      let mut merged = defaults.clone();
      for (k, v) in own {
        merged.insert(k, v);
      }
      let data: SeriesData = serde_yaml::from_value(Value::Mapping(merged))?;
      db.series.push((name, data));
    }

    debug!(
      "Parsed kernel-series: {} series, development {:?}",
      db.series.len(),
      db.development_series
    );
    Ok(db)
  }

  /// All series in file order.
  pub fn series(&self) -> impl Iterator<Item = SeriesEntry<'_>> {
    self.series.iter().map(|(name, data)| SeriesEntry { ks: self, name, data })
  }

  pub fn lookup_series(&self, lookup: SeriesLookup<'_>) -> Option<SeriesEntry<'_>> {
    let wanted = match lookup {
      SeriesLookup::Name(name) => name,
      SeriesLookup::Codename(codename) => self.codename_to_series.get(codename)?.as_str(),
      SeriesLookup::Development => self.development_series.as_deref()?,
    };
    self
      .series
      .iter()
      .find(|(name, _)| name == wanted)
      .map(|(name, data)| SeriesEntry { ks: self, name, data })
  }
}

/// Sort key for series names such as `20.04`, numeric per component.
pub fn sort_key_series_name(name: &str) -> Vec<u32> {
  name.split('.').map(|part| part.parse().unwrap_or(0)).collect()
}

/// Where to read kernel-series from when nothing is given explicitly.
///
/// With `use_local` set, a kteam-tools checkout next to the installed binary
/// (`<prefix>/info/kernel-series.yaml`) is preferred over the network copy.
pub fn default_source(use_local: bool) -> String {
  if use_local
    && let Ok(exe) = std::env::current_exe()
    && let Some(prefix) = exe.parent().and_then(|bin| bin.parent())
  {
    let local: PathBuf = prefix.join("info").join("kernel-series.yaml");
    return local.display().to_string();
  }
  KERNEL_SERIES_URL.to_string()
}

fn text_cache() -> &'static Mutex<HashMap<String, String>> {
  static CACHE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
  CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Load kernel-series from a path, `file://` URL or HTTP(S) URL.
///
/// Remote text is fetched at most once per process.
pub async fn load(source: &str) -> AnyResult<KernelSeries> {
  let text = if source.starts_with("http://") || source.starts_with("https://") {
    let cached = text_cache().lock().ok().and_then(|cache| cache.get(source).cloned());
    match cached {
      Some(text) => text,
      None => {
        debug!("Fetching kernel-series from {source}");
        let response = reqwest::get(source)
          .await
          .with_context(|| format!("Failed to fetch kernel-series from {source}"))?
          .error_for_status()
          .with_context(|| format!("Failed to fetch kernel-series from {source}"))?;
        let text = response.text().await.context("Failed to read kernel-series response")?;
        if let Ok(mut cache) = text_cache().lock() {
          cache.insert(source.to_string(), text.clone());
        }
        text
      }
    }
  } else {
    let path = source.strip_prefix("file://").unwrap_or(source);
    tokio::fs::read_to_string(path)
      .await
      .with_context(|| format!("Failed to read kernel-series from {path}"))?
  };

  KernelSeries::parse(&text).with_context(|| format!("Failed to parse kernel-series from {source}"))
}

/// A series, e.g. `22.04 (jammy)`.
#[derive(Debug, Clone, Copy)]
pub struct SeriesEntry<'a> {
  ks: &'a KernelSeries,
  name: &'a str,
  data: &'a SeriesData,
}

impl<'a> SeriesEntry<'a> {
  pub fn name(&self) -> &'a str {
    self.name
  }

  pub fn codename(&self) -> Option<&'a str> {
    self.data.codename.as_deref()
  }

  /// The series is in its opening phase (an `opening` key not set to false).
  pub fn opening(&self) -> bool {
    !matches!(self.data.opening, None | Some(Some(Opening::Flag(false))))
  }

  /// Whether every named opening step is allowed to proceed.
  pub fn opening_ready(&self, flags: &[&str]) -> bool {
    match &self.data.opening {
      None => true,
      Some(None) => false,
      Some(Some(Opening::Flag(opening))) => !opening,
      Some(Some(Opening::Flags(allowed))) => flags.iter().all(|flag| {
        allowed
          .get(*flag)
          .is_some_and(|value| !matches!(value, Value::Null | Value::Bool(false)))
      }),
    }
  }

  pub fn development(&self) -> bool {
    self.data.development
  }

  pub fn supported(&self) -> bool {
    self.data.supported
  }

  pub fn lts(&self) -> bool {
    self.data.lts
  }

  pub fn esm(&self) -> bool {
    self.data.esm
  }

  pub fn sources(&self) -> impl Iterator<Item = SourceEntry<'a>> + use<'a> {
    let series = *self;
    self
      .data
      .sources
      .iter()
      .map(move |(name, data)| SourceEntry { series, name, data })
  }

  pub fn lookup_source(&self, name: &str) -> Option<SourceEntry<'a>> {
    let series = *self;
    self
      .data
      .sources
      .iter()
      .find(|(key, _)| key == name)
      .map(|(name, data)| SourceEntry { series, name, data })
  }

  /// Named routing tables used by source `routing` aliases.
  pub fn routing_table(&self) -> Option<&'a BTreeMap<String, RoutingTable>> {
    self.data.routing_table.as_ref()
  }
}

impl std::fmt::Display for SeriesEntry<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} ({})", self.name, self.codename().unwrap_or("None"))
  }
}

impl PartialEq for SeriesEntry<'_> {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
  }
}

/// A kernel source package within a series.
#[derive(Debug, Clone, Copy)]
pub struct SourceEntry<'a> {
  series: SeriesEntry<'a>,
  name: &'a str,
  data: &'a SourceData,
}

impl<'a> SourceEntry<'a> {
  pub fn name(&self) -> &'a str {
    self.name
  }

  pub fn series(&self) -> SeriesEntry<'a> {
    self.series
  }

  /// Upstream versions, inherited through `derived-from` and then
  /// `copy-forward` when the source does not list its own.
  pub fn versions(&self) -> Option<&'a [String]> {
    let mut current = *self;
    let mut seen = HashSet::new();
    loop {
      if let Some(versions) = current.data.versions.as_deref() {
        return Some(versions);
      }
      if !seen.insert((current.series.name, current.name)) {
        return None;
      }
      current = current.derived_from().or_else(|| current.copy_forward())?;
    }
  }

  pub fn version(&self) -> Option<&'a str> {
    self.versions().and_then(|v| v.last()).map(String::as_str)
  }

  pub fn development(&self) -> bool {
    self.data.development.unwrap_or(self.series.development())
  }

  pub fn supported(&self) -> bool {
    self.data.supported.unwrap_or(self.series.supported())
  }

  pub fn severe_only(&self) -> bool {
    self.data.severe_only
  }

  pub fn stakeholder(&self) -> Option<&'a str> {
    self.data.stakeholder.as_deref()
  }

  pub fn packages(&self) -> impl Iterator<Item = PackageEntry<'a>> + use<'a> {
    let source = *self;
    self
      .data
      .packages
      .iter()
      .map(move |(name, data)| PackageEntry { source, name, data })
  }

  pub fn lookup_package(&self, name: &str) -> Option<PackageEntry<'a>> {
    let source = *self;
    self
      .data
      .packages
      .iter()
      .find(|(key, _)| key == name)
      .map(|(name, data)| PackageEntry { source, name, data })
  }

  pub fn snaps(&self) -> impl Iterator<Item = SnapEntry<'a>> + use<'a> {
    let source = *self;
    self
      .data
      .snaps
      .iter()
      .map(move |(name, data)| SnapEntry::new(source, name, data))
  }

  pub fn lookup_snap(&self, name: &str) -> Option<SnapEntry<'a>> {
    let source = *self;
    self
      .data
      .snaps
      .iter()
      .find(|(key, _)| key == name)
      .map(|(name, data)| SnapEntry::new(source, name, data))
  }

  /// The source this one is derived from, when it exists in the database.
  pub fn derived_from(&self) -> Option<SourceEntry<'a>> {
    let SeriesSourceRef(series, source) = self.data.derived_from.as_ref()?;
    self.resolve(series, source)
  }

  /// The source versions are copied forward from.
  ///
  /// `copy-forward: true` means the `derived-from` source; without one there
  /// is nothing to copy from and `None` is returned.
  pub fn copy_forward(&self) -> Option<SourceEntry<'a>> {
    match self.data.copy_forward.as_ref()? {
      CopyForward::Flag(false) => None,
      CopyForward::Flag(true) => self.derived_from(),
      CopyForward::Source(SeriesSourceRef(series, source)) => self.resolve(series, source),
    }
  }

  fn resolve(&self, series: &str, source: &str) -> Option<SourceEntry<'a>> {
    self
      .series
      .ks
      .lookup_series(SeriesLookup::Name(series))?
      .lookup_source(source)
  }

  /// Testing flavours; a flavour with a null or empty entry is a no-op and
  /// skipped. Missing or null `arches`/`clouds` read as empty lists.
  pub fn testable_flavours(&self) -> Vec<TestingFlavour> {
    let Some(flavours) = self.data.testing.as_ref().and_then(|t| t.flavours.as_ref()) else {
      return Vec::new();
    };
    flavours
      .iter()
      .filter_map(|(name, data)| {
        let data = data.as_ref().filter(|d| !d.is_empty())?;
        Some(TestingFlavour {
          name: name.clone(),
          arches: mapping_strings(data, "arches"),
          clouds: mapping_strings(data, "clouds"),
        })
      })
      .collect()
  }

  pub fn invalid_tasks(&self) -> &'a [String] {
    self.data.invalid_tasks.as_deref().unwrap_or(&[])
  }

  pub fn backport(&self) -> bool {
    self.data.backport
  }

  pub fn private(&self) -> bool {
    self.data.private
  }

  /// Raw `swm` data, interpreted by the workflow manager.
  pub fn swm_data(&self) -> Option<&'a Value> {
    self.data.swm.as_ref()
  }

  /// Archive routing for this source.
  ///
  /// Without a `routing` key the series default alias applies (`default`,
  /// `devel` for the development series, `esm` for ESM series). An explicit
  /// `routing: null` disables routing and yields `None`.
  pub fn routing(&self) -> Result<Option<RoutingEntry<'a>>> {
    let default_alias = if self.series.esm() {
      "esm"
    } else if self.series.development() {
      "devel"
    } else {
      "default"
    };

    let data: &'a SourceData = self.data;
    let (name, table) = match &data.routing {
      Some(None) => return Ok(None),
      None => (default_alias.to_string(), self.routing_alias(default_alias)?),
      Some(Some(RoutingSpec::Alias(alias))) => (alias.clone(), self.routing_alias(alias)?),
      Some(Some(RoutingSpec::Table(table))) => (
        format!("{}:{}", self.series.codename().unwrap_or(self.series.name), self.name),
        table,
      ),
    };

    let destinations = table
      .iter()
      .filter_map(|(dest, targets)| targets.as_ref().map(|t| (dest.clone(), t.clone())))
      .collect();

    Ok(Some(RoutingEntry {
      source: *self,
      name,
      destinations,
    }))
  }

  fn routing_alias(&self, alias: &str) -> Result<&'a RoutingTable> {
    let tables = self
      .series
      .routing_table()
      .ok_or_else(|| KernelSeriesError::NoRoutingTable(alias.to_string()))?;
    tables
      .get(alias)
      .ok_or_else(|| KernelSeriesError::UnknownRoutingAlias(alias.to_string()))
  }
}

impl std::fmt::Display for SourceEntry<'_> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{} {}", self.series.name, self.name)
  }
}

impl PartialEq for SourceEntry<'_> {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name && self.series == other.series
  }
}

/// An `(archive, pocket)` routing target, e.g. `("ubuntu", "Proposed")`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteTarget(pub String, pub String);

impl RouteTarget {
  pub fn archive(&self) -> &str {
    &self.0
  }

  pub fn pocket(&self) -> &str {
    &self.1
  }
}

/// Routing destinations after alias resolution.
#[derive(Debug, Clone)]
pub struct RoutingEntry<'a> {
  source: SourceEntry<'a>,
  name: String,
  destinations: Vec<(String, Vec<RouteTarget>)>,
}

impl<'a> RoutingEntry<'a> {
  pub fn source(&self) -> SourceEntry<'a> {
    self.source
  }

  /// Alias name, or `<codename>:<source>` for inline tables.
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn destinations(&self) -> impl Iterator<Item = (&str, &[RouteTarget])> {
    self.destinations.iter().map(|(d, t)| (d.as_str(), t.as_slice()))
  }

  /// All targets for a destination such as `build` or `proposed`.
  pub fn lookup_destination(&self, dest: &str) -> Option<&[RouteTarget]> {
    self
      .destinations
      .iter()
      .find(|(d, _)| d == dest)
      .map(|(_, targets)| targets.as_slice())
  }

  /// The first (primary) target of a destination.
  pub fn primary_destination(&self, dest: &str) -> Option<&RouteTarget> {
    self.lookup_destination(dest).and_then(<[RouteTarget]>::first)
  }
}

impl PartialEq for RoutingEntry<'_> {
  fn eq(&self, other: &Self) -> bool {
    self.destinations == other.destinations
  }
}

/// A git repository reference for a package or snap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
  pub url: String,
  pub branch: Option<String>,
}

impl RepoEntry {
  fn from_spec(spec: &RepoSpec) -> Option<Self> {
    match spec {
      RepoSpec::List(parts) => {
        let url = parts.first()?.clone();
        let branch = match parts.get(1) {
          Some(branch) => Some(branch.clone()),
          None => Some("master".to_string()),
        };
        Some(Self { url, branch })
      }
      RepoSpec::Map { url, branch } => Some(Self {
        url: url.clone(),
        branch: branch.clone(),
      }),
    }
  }
}

/// A binary package (main, meta, signed, lrm, ...) built for a source.
#[derive(Debug, Clone, Copy)]
pub struct PackageEntry<'a> {
  source: SourceEntry<'a>,
  name: &'a str,
  data: &'a PackageData,
}

impl<'a> PackageEntry<'a> {
  pub fn name(&self) -> &'a str {
    self.name
  }

  pub fn source(&self) -> SourceEntry<'a> {
    self.source
  }

  pub fn package_type(&self) -> Option<&'a str> {
    self.data.package_type.as_deref()
  }

  pub fn repo(&self) -> Option<RepoEntry> {
    self.data.repo.as_ref().and_then(RepoEntry::from_spec)
  }
}

const RISKS: [&str; 4] = ["edge", "beta", "candidate", "stable"];

/// A snap built from a source, with `publish-to`, `promote-to` and `stable`
/// normalised from their shorthand forms.
#[derive(Debug, Clone)]
pub struct SnapEntry<'a> {
  source: SourceEntry<'a>,
  name: &'a str,
  data: &'a SnapData,
  publish_to: Option<Vec<(String, Vec<String>)>>,
  promote_to: Vec<String>,
  stable: bool,
}

impl<'a> SnapEntry<'a> {
  fn new(source: SourceEntry<'a>, name: &'a str, data: &'a SnapData) -> Self {
    let publish_to = match (&data.publish_to, &data.arches) {
      (Some(publish_to), _) => Some(publish_to.to_vec()),
      (None, Some(arches)) => {
        let track = data.track.clone().unwrap_or_else(|| "latest".to_string());
        Some(arches.iter().map(|arch| (arch.clone(), vec![track.clone()])).collect())
      }
      (None, None) => None,
    };

    let promote_to = match (&data.promote_to, data.stable) {
      (Some(PromoteTo::Risks(risks)), _) => risks.clone(),
      (Some(PromoteTo::Risk(risk)), _) => expand_risk(risk),
      (None, Some(true)) => expand_risk("stable"),
      (None, Some(false)) => expand_risk("candidate"),
      (None, None) => expand_risk("edge"),
    };

    let stable = data
      .stable
      .unwrap_or_else(|| promote_to.iter().any(|risk| risk == "stable"));

    Self {
      source,
      name,
      data,
      publish_to,
      promote_to,
      stable,
    }
  }

  pub fn name(&self) -> &'a str {
    self.name
  }

  pub fn source(&self) -> SourceEntry<'a> {
    self.source
  }

  pub fn series(&self) -> SeriesEntry<'a> {
    self.source.series
  }

  pub fn repo(&self) -> Option<RepoEntry> {
    self.data.repo.as_ref().and_then(RepoEntry::from_spec)
  }

  pub fn primary(&self) -> bool {
    self.data.primary
  }

  pub fn gated(&self) -> bool {
    self.data.gated
  }

  pub fn stable(&self) -> bool {
    self.stable
  }

  pub fn qa(&self) -> bool {
    self.data.qa
  }

  pub fn hw_cert(&self) -> bool {
    self.data.hw_cert
  }

  pub fn arches(&self) -> Option<&'a [String]> {
    self.data.arches.as_deref()
  }

  pub fn track(&self) -> Option<&'a str> {
    self.data.track.as_deref()
  }

  /// Architecture → tracks.
  pub fn publish_to(&self) -> Option<&[(String, Vec<String>)]> {
    self.publish_to.as_deref()
  }

  pub fn promote_to(&self) -> &[String] {
    &self.promote_to
  }

  pub fn promote_to_risk(&self, risk: &str) -> bool {
    self.promote_to.iter().any(|r| r == risk)
  }
}

impl PartialEq for SnapEntry<'_> {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name && self.source == other.source
  }
}

/// Risks up to and including `risk`, in promotion order.
fn expand_risk(risk: &str) -> Vec<String> {
  let mut expanded = Vec::new();
  for candidate in RISKS {
    expanded.push(candidate.to_string());
    if candidate == risk {
      break;
    }
  }
  expanded
}

/// A kernel flavour with the arches and clouds it is tested on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestingFlavour {
  pub name: String,
  pub arches: Vec<String>,
  pub clouds: Vec<String>,
}

// Raw YAML shapes.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SeriesData {
  codename: Option<String>,
  #[serde(default, deserialize_with = "present")]
  opening: Option<Option<Opening>>,
  #[serde(default)]
  development: bool,
  #[serde(default)]
  supported: bool,
  #[serde(default)]
  lts: bool,
  #[serde(default)]
  esm: bool,
  #[serde(default)]
  sources: OrderedMap<SourceData>,
  routing_table: Option<BTreeMap<String, RoutingTable>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Opening {
  Flag(bool),
  Flags(Mapping),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SourceData {
  #[serde(default, deserialize_with = "string_list")]
  versions: Option<Vec<String>>,
  development: Option<bool>,
  supported: Option<bool>,
  #[serde(default)]
  severe_only: bool,
  stakeholder: Option<String>,
  #[serde(default)]
  packages: OrderedMap<PackageData>,
  #[serde(default)]
  snaps: OrderedMap<SnapData>,
  derived_from: Option<SeriesSourceRef>,
  copy_forward: Option<CopyForward>,
  testing: Option<TestingData>,
  invalid_tasks: Option<Vec<String>>,
  #[serde(default)]
  backport: bool,
  #[serde(default)]
  private: bool,
  swm: Option<Value>,
  #[serde(default, deserialize_with = "present")]
  routing: Option<Option<RoutingSpec>>,
}

/// `[series, source]` reference.
#[derive(Debug, Clone)]
struct SeriesSourceRef(String, String);

impl<'de> Deserialize<'de> for SeriesSourceRef {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    let parts: Vec<Value> = Vec::deserialize(deserializer)?;
    match parts.as_slice() {
      [series, source] => match (key_to_string(series), key_to_string(source)) {
        (Some(series), Some(source)) => Ok(Self(series, source)),
        _ => Err(D::Error::custom("series/source reference must hold two names")),
      },
      _ => Err(D::Error::custom("series/source reference must hold two names")),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CopyForward {
  Flag(bool),
  Source(SeriesSourceRef),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RoutingSpec {
  Alias(String),
  Table(RoutingTable),
}

/// Destination → targets, with `null` meaning the destination is disabled.
pub type RoutingTable = OrderedMap<Option<Vec<RouteTarget>>>;

#[derive(Debug, Clone, Default, Deserialize)]
struct TestingData {
  flavours: Option<OrderedMap<Option<Mapping>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct PackageData {
  #[serde(rename = "type")]
  package_type: Option<String>,
  repo: Option<RepoSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RepoSpec {
  List(Vec<String>),
  Map { url: String, branch: Option<String> },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct SnapData {
  repo: Option<RepoSpec>,
  #[serde(default)]
  primary: bool,
  #[serde(default)]
  gated: bool,
  stable: Option<bool>,
  #[serde(default)]
  qa: bool,
  #[serde(default)]
  hw_cert: bool,
  arches: Option<Vec<String>>,
  track: Option<String>,
  publish_to: Option<OrderedMap<Vec<String>>>,
  promote_to: Option<PromoteTo>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum PromoteTo {
  Risk(String),
  Risks(Vec<String>),
}

/// A YAML mapping kept in file order. `null` values become `T::default()`.
#[derive(Debug, Clone)]
pub struct OrderedMap<T>(Vec<(String, T)>);

impl<T> Default for OrderedMap<T> {
  fn default() -> Self {
    Self(Vec::new())
  }
}

impl<T> OrderedMap<T> {
  pub fn iter(&self) -> impl Iterator<Item = &(String, T)> {
    self.0.iter()
  }

  pub fn get(&self, key: &str) -> Option<&T> {
    self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<T: Clone> OrderedMap<T> {
  fn to_vec(&self) -> Vec<(String, T)> {
    self.0.clone()
  }
}

impl<T: PartialEq> PartialEq for OrderedMap<T> {
  fn eq(&self, other: &Self) -> bool {
    self.0 == other.0
  }
}

impl<'de, T> Deserialize<'de> for OrderedMap<T>
where
  T: DeserializeOwned + Default,
{
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
    let mapping = Option::<Mapping>::deserialize(deserializer)?.unwrap_or_default();
    let mut entries = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
      let key = key_to_string(&key).ok_or_else(|| D::Error::custom(format!("invalid mapping key {key:?}")))?;
      let value = if value.is_null() {
        T::default()
      } else {
        serde_yaml::from_value(value).map_err(|e| D::Error::custom(format!("{key}: {e}")))?
      };
      entries.push((key, value));
    }
    Ok(Self(entries))
  }
}

// Keeps `Option<T>` distinct from "field absent" when used with
// `#[serde(default)]`: absent → None, null → Some(None).
fn present<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
  D: Deserializer<'de>,
  T: Deserialize<'de>,
{
  Option::<T>::deserialize(deserializer).map(Some)
}

// Version lists are sometimes written unquoted (`[4.15]`). Those are YAML
// floats, so trailing zeros are already gone: `[5.10]` reads as "5.1".
fn string_list<'de, D>(deserializer: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
  D: Deserializer<'de>,
{
  let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;
  values
    .map(|values| {
      values
        .iter()
        .map(|v| key_to_string(v).ok_or_else(|| D::Error::custom(format!("invalid version {v:?}"))))
        .collect()
    })
    .transpose()
}

fn mapping_strings(mapping: &Mapping, key: &str) -> Vec<String> {
  match mapping.get(key) {
    Some(Value::Sequence(values)) => values.iter().filter_map(key_to_string).collect(),
    _ => Vec::new(),
  }
}

fn key_to_string(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    _ => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const YAML: &str = r#"
defaults:
  routing-table:
    default:
      build:
        - ['ppa:canonical-kernel-team/ubuntu/ppa', 'Release']
      proposed:
        - ['ubuntu', 'Proposed']
        - ['ppa:canonical-kernel-team/ubuntu/proposed', 'Release']
      updates:
        - ['ubuntu', 'Updates']
    devel:
      build:
        - ['ppa:canonical-kernel-team/ubuntu/bootstrap', 'Release']
      proposed:
        - ['ubuntu', 'Proposed']
    esm:
      build:
        - ['ppa:canonical-kernel-esm/ubuntu/ppa', 'Release']

'24.10':
  codename: oracular
  development: true
  opening:
    debs: true
    snaps: null
  sources:
    linux:
      versions: ['6.11.0']
      packages:
        linux:
        linux-meta:
          type: meta
          repo: ['git://git.launchpad.net/~ubuntu-kernel/ubuntu/+source/linux-meta/+git/oracular']

'24.04':
  codename: noble
  supported: true
  lts: true
  sources:
    linux:
      versions: ['6.8.0']
      snaps:
        pc-kernel:
          arches: [amd64, arm64]
          track: '24'
          stable: true
        pi-kernel:
          promote-to: beta
      testing:
        flavours:
          generic:
            arches: [amd64, arm64]
          lowlatency:
          kvm:
            clouds: [gce]
          virtual:
            arches: null
            clouds: null
          oem:
            kernel: oem
          empty: {}
    linux-hwe:
      derived-from: ['24.10', 'linux']
      routing:
        build:
          - ['ppa:canonical-kernel-team/ubuntu/ppa', 'Release']
        updates: null
      invalid-tasks:
    linux-oem:
      copy-forward: true
      derived-from: ['24.04', 'linux']
      routing: null
    linux-aws:
      routing: bogus
      copy-forward: ['24.04', 'linux-oem']

'16.04':
  codename: xenial
  esm: true
  opening: false
  sources:
    linux:
      versions: ['4.4.0']
"#;

  fn db() -> KernelSeries {
    KernelSeries::parse(YAML).unwrap()
  }

  #[test]
  fn lookups_by_name_codename_and_development() {
    let db = db();
    assert_eq!(db.series().count(), 3);

    let noble = db.lookup_series(SeriesLookup::Codename("noble")).unwrap();
    assert_eq!(noble.name(), "24.04");
    assert!(noble.lts());
    assert_eq!(noble.to_string(), "24.04 (noble)");

    let devel = db.lookup_series(SeriesLookup::Development).unwrap();
    assert_eq!(devel.codename(), Some("oracular"));

    assert!(db.lookup_series(SeriesLookup::Name("99.04")).is_none());
    assert!(db.lookup_series(SeriesLookup::Codename("warty")).is_none());
  }

  #[test]
  fn series_names_sort_numerically() {
    let db = db();
    let mut names: Vec<_> = db.series().map(|s| s.name()).collect();
    names.sort_by_key(|name| sort_key_series_name(name));
    assert_eq!(names, vec!["16.04", "24.04", "24.10"]);
  }

  #[test]
  fn opening_flags() {
    let db = db();
    let devel = db.lookup_series(SeriesLookup::Development).unwrap();
    assert!(devel.opening());
    assert!(devel.opening_ready(&["debs"]));
    assert!(!devel.opening_ready(&["debs", "snaps"]));
    assert!(!devel.opening_ready(&["missing"]));

    let noble = db.lookup_series(SeriesLookup::Name("24.04")).unwrap();
    assert!(!noble.opening());
    assert!(noble.opening_ready(&["anything"]));

    let xenial = db.lookup_series(SeriesLookup::Name("16.04")).unwrap();
    assert!(!xenial.opening());
    assert!(xenial.opening_ready(&[]));
  }

  #[test]
  fn versions_follow_derived_from_and_copy_forward() {
    let db = db();
    let noble = db.lookup_series(SeriesLookup::Name("24.04")).unwrap();

    let hwe = noble.lookup_source("linux-hwe").unwrap();
    assert_eq!(hwe.derived_from().unwrap().to_string(), "24.10 linux");
    assert_eq!(hwe.version(), Some("6.11.0"));
    assert!(hwe.invalid_tasks().is_empty());
    assert!(hwe.supported());
    assert!(!hwe.development());

    let oem = noble.lookup_source("linux-oem").unwrap();
    assert_eq!(oem.copy_forward().unwrap().name(), "linux");
    assert_eq!(oem.version(), Some("6.8.0"));

    let aws = noble.lookup_source("linux-aws").unwrap();
    assert_eq!(aws.versions(), Some(&["6.8.0".to_string()][..]));
  }

  #[test]
  fn routing_resolution() {
    let db = db();
    let noble = db.lookup_series(SeriesLookup::Name("24.04")).unwrap();

    let linux = noble.lookup_source("linux").unwrap().routing().unwrap().unwrap();
    assert_eq!(linux.name(), "default");
    let proposed = linux.lookup_destination("proposed").unwrap();
    assert_eq!(proposed.len(), 2);
    assert_eq!(linux.primary_destination("proposed").unwrap().archive(), "ubuntu");
    assert_eq!(linux.primary_destination("proposed").unwrap().pocket(), "Proposed");

    let hwe = noble.lookup_source("linux-hwe").unwrap().routing().unwrap().unwrap();
    assert_eq!(hwe.name(), "noble:linux-hwe");
    assert!(hwe.lookup_destination("updates").is_none());
    assert_eq!(hwe.destinations().count(), 1);

    assert!(noble.lookup_source("linux-oem").unwrap().routing().unwrap().is_none());

    let err = noble.lookup_source("linux-aws").unwrap().routing().unwrap_err();
    assert!(matches!(err, KernelSeriesError::UnknownRoutingAlias(alias) if alias == "bogus"));

    let devel = db.lookup_series(SeriesLookup::Development).unwrap();
    let devel_routing = devel.lookup_source("linux").unwrap().routing().unwrap().unwrap();
    assert_eq!(devel_routing.name(), "devel");

    let xenial = db.lookup_series(SeriesLookup::Name("16.04")).unwrap();
    let esm = xenial.lookup_source("linux").unwrap().routing().unwrap().unwrap();
    assert_eq!(esm.name(), "esm");
    assert_eq!(
      esm.primary_destination("build").unwrap().archive(),
      "ppa:canonical-kernel-esm/ubuntu/ppa"
    );
  }

  #[test]
  fn routing_alias_without_table_is_an_error() {
    let db = KernelSeries::parse("'22.04':\n  sources:\n    linux:\n      routing: default\n").unwrap();
    let series = db.lookup_series(SeriesLookup::Name("22.04")).unwrap();
    let err = series.lookup_source("linux").unwrap().routing().unwrap_err();
    assert!(matches!(err, KernelSeriesError::NoRoutingTable(_)));
  }

  #[test]
  fn packages_and_repos() {
    let db = db();
    let devel = db.lookup_series(SeriesLookup::Development).unwrap();
    let linux = devel.lookup_source("linux").unwrap();

    let names: Vec<_> = linux.packages().map(|p| p.name()).collect();
    assert_eq!(names, vec!["linux", "linux-meta"]);

    let meta = linux.lookup_package("linux-meta").unwrap();
    assert_eq!(meta.package_type(), Some("meta"));
    let repo = meta.repo().unwrap();
    assert!(repo.url.ends_with("+git/oracular"));
    assert_eq!(repo.branch.as_deref(), Some("master"));

    assert!(linux.lookup_package("linux").unwrap().repo().is_none());
    assert!(linux.lookup_package("linux-signed").is_none());
  }

  #[test]
  fn snaps_normalise_shorthand() {
    let db = db();
    let noble = db.lookup_series(SeriesLookup::Name("24.04")).unwrap();
    let linux = noble.lookup_source("linux").unwrap();

    let pc = linux.lookup_snap("pc-kernel").unwrap();
    assert!(pc.stable());
    assert_eq!(pc.promote_to(), ["edge", "beta", "candidate", "stable"]);
    assert_eq!(
      pc.publish_to().unwrap(),
      [
        ("amd64".to_string(), vec!["24".to_string()]),
        ("arm64".to_string(), vec!["24".to_string()]),
      ]
    );

    let pi = linux.lookup_snap("pi-kernel").unwrap();
    assert_eq!(pi.promote_to(), ["edge", "beta"]);
    assert!(!pi.stable());
    assert!(pi.promote_to_risk("beta"));
    assert!(!pi.promote_to_risk("candidate"));
    assert!(pi.publish_to().is_none());
  }

  #[test]
  fn unquoted_versions_read_as_floats() {
    #[derive(Deserialize)]
    struct Versions {
      #[serde(deserialize_with = "string_list")]
      versions: Option<Vec<String>>,
    }

    let parsed: Versions = serde_yaml::from_str("versions: [4.15, 5.10, '5.10']").unwrap();
    assert_eq!(parsed.versions.unwrap(), vec!["4.15", "5.1", "5.10"]);
  }

  #[test]
  fn testable_flavours_skip_only_empty_entries() {
    let db = db();
    let noble = db.lookup_series(SeriesLookup::Name("24.04")).unwrap();
    let flavours = noble.lookup_source("linux").unwrap().testable_flavours();

    assert_eq!(
      flavours,
      vec![
        TestingFlavour {
          name: "generic".into(),
          arches: vec!["amd64".into(), "arm64".into()],
          clouds: vec![],
        },
        TestingFlavour {
          name: "kvm".into(),
          arches: vec![],
          clouds: vec!["gce".into()],
        },
        TestingFlavour {
          name: "virtual".into(),
          arches: vec![],
          clouds: vec![],
        },
        TestingFlavour {
          name: "oem".into(),
          arches: vec![],
          clouds: vec![],
        },
      ]
    );
  }

  #[tokio::test]
  async fn load_reads_local_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kernel-series.yaml");
    std::fs::write(&path, YAML).unwrap();

    let db = load(&format!("file://{}", path.display())).await.unwrap();
    assert!(db.lookup_series(SeriesLookup::Codename("xenial")).is_some());
  }
}
