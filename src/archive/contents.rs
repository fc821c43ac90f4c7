//! Indexes over archive tag files and the consistency checks built on them.
//!
//! Everything here works on already-parsed `Sources` and `Packages` data, so
//! the reports can run against a local mirror without talking to Launchpad.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::germinate::GerminateOutput;
use super::tagfile::{Paragraph, read_tag_file};
use super::version::PackageVersion;

/// A source package from a `Sources` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
  pub name: String,
  pub version: String,
  pub binaries: Vec<String>,
  pub component: String,
}

/// A binary package from a `Packages` file, for one architecture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryRecord {
  pub name: String,
  pub version: String,
  pub architecture: String,
  pub source: String,
  pub source_version: String,
  pub overrides: Overrides,
}

/// The override fields an archive administrator controls.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Overrides {
  pub component: String,
  pub section: String,
  pub priority: String,
}

/// Latest version of every source package.
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
  sources: BTreeMap<String, SourceRecord>,
}

impl SourceIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a `Sources` file. The component comes from the `dists/` path when
  /// there is one, else from the `Section` prefix.
  pub fn add_file(&mut self, path: &Path) -> Result<()> {
    let paragraphs =
      read_tag_file(path, None).with_context(|| format!("Failed to read Sources file {}", path.display()))?;
    let component = component_from_path(path);
    debug!("Indexing {} source stanzas from {}", paragraphs.len(), path.display());
    self.add_paragraphs(paragraphs, component.as_deref());
    Ok(())
  }

  pub fn add_paragraphs(&mut self, paragraphs: impl IntoIterator<Item = Paragraph>, component: Option<&str>) {
    for paragraph in paragraphs {
      let (Some(name), Some(version)) = (paragraph.package(), paragraph.field("Version")) else {
        continue;
      };

      let record = SourceRecord {
        name: name.to_string(),
        version: version.to_string(),
        binaries: paragraph.field_list("Binary").into_iter().map(str::to_string).collect(),
        component: resolve_component(component, paragraph.field("Section")),
      };

      match self.sources.get(name) {
        Some(existing) if !is_newer(&record.version, &existing.version) => {}
        _ => {
          self.sources.insert(record.name.clone(), record);
        }
      }
    }
  }

  pub fn get(&self, name: &str) -> Option<&SourceRecord> {
    self.sources.get(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &SourceRecord> {
    self.sources.values()
  }

  pub fn len(&self) -> usize {
    self.sources.len()
  }

  pub fn is_empty(&self) -> bool {
    self.sources.is_empty()
  }
}

/// Latest version of every binary package, per architecture.
#[derive(Debug, Clone, Default)]
pub struct BinaryIndex {
  binaries: BTreeMap<String, BTreeMap<String, BinaryRecord>>,
}

impl BinaryIndex {
  pub fn new() -> Self {
    Self::default()
  }

  /// Load a `Packages` file. A `binary-<arch>` path component names the
  /// architecture, so `Architecture: all` stanzas are attributed to the file
  /// they were published in.
  pub fn add_file(&mut self, path: &Path) -> Result<()> {
    let paragraphs =
      read_tag_file(path, None).with_context(|| format!("Failed to read Packages file {}", path.display()))?;
    let component = component_from_path(path);
    let architecture = architecture_from_path(path);
    debug!(
      "Indexing {} binary stanzas from {} (component {:?}, architecture {:?})",
      paragraphs.len(),
      path.display(),
      component,
      architecture
    );
    self.add_paragraphs(paragraphs, component.as_deref(), architecture.as_deref());
    Ok(())
  }

  pub fn add_paragraphs(
    &mut self,
    paragraphs: impl IntoIterator<Item = Paragraph>,
    component: Option<&str>,
    architecture: Option<&str>,
  ) {
    for paragraph in paragraphs {
      let (Some(name), Some(version)) = (paragraph.package(), paragraph.field("Version")) else {
        continue;
      };
      let Some(arch) = architecture.or_else(|| paragraph.field("Architecture")) else {
        warn!("Skipping {name} {version}: no architecture");
        continue;
      };

      let (source, source_version) = parse_source_field(paragraph.field("Source"), name, version);
      let record = BinaryRecord {
        name: name.to_string(),
        version: version.to_string(),
        architecture: arch.to_string(),
        source,
        source_version,
        overrides: Overrides {
          component: resolve_component(component, paragraph.field("Section")),
          section: strip_component(paragraph.field("Section").unwrap_or("")).to_string(),
          priority: paragraph.field("Priority").unwrap_or("").to_string(),
        },
      };

      let per_arch = self.binaries.entry(record.name.clone()).or_default();
      match per_arch.get(arch) {
        Some(existing) if !is_newer(&record.version, &existing.version) => {}
        _ => {
          per_arch.insert(arch.to_string(), record);
        }
      }
    }
  }

  pub fn contains(&self, name: &str) -> bool {
    self.binaries.contains_key(name)
  }

  /// All architecture records of a binary package.
  pub fn get(&self, name: &str) -> Option<&BTreeMap<String, BinaryRecord>> {
    self.binaries.get(name)
  }

  pub fn iter(&self) -> impl Iterator<Item = &BinaryRecord> {
    self.binaries.values().flat_map(|per_arch| per_arch.values())
  }

  pub fn names(&self) -> impl Iterator<Item = &str> {
    self.binaries.keys().map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.binaries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.binaries.is_empty()
  }
}

/// Binaries that are no longer built by their source (Not Built from Source).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbsEntry {
  pub source: String,
  /// Highest source version the stale binaries were built from.
  pub source_version: String,
  pub binaries: BTreeSet<String>,
  /// The source package is gone from the archive entirely.
  pub source_missing: bool,
}

/// Find binaries whose source is missing or no longer lists them.
pub fn nbs(sources: &SourceIndex, binaries: &BinaryIndex) -> Vec<NbsEntry> {
  let mut by_source: BTreeMap<String, NbsEntry> = BTreeMap::new();

  for binary in binaries.iter() {
    let source = sources.get(&binary.source);
    let still_built = source.is_some_and(|s| s.binaries.iter().any(|b| b == &binary.name));
    if still_built {
      continue;
    }

    let entry = by_source.entry(binary.source.clone()).or_insert_with(|| NbsEntry {
      source: binary.source.clone(),
      source_version: binary.source_version.clone(),
      binaries: BTreeSet::new(),
      source_missing: source.is_none(),
    });
    if is_newer(&binary.source_version, &entry.source_version) {
      entry.source_version = binary.source_version.clone();
    }
    entry.binaries.insert(binary.name.clone());
  }

  by_source.into_values().collect()
}

/// Sources none of whose binaries are published.
pub fn orphaned_sources<'a>(sources: &'a SourceIndex, binaries: &BinaryIndex) -> Vec<&'a SourceRecord> {
  sources
    .iter()
    .filter(|s| !s.binaries.is_empty() && !s.binaries.iter().any(|b| binaries.contains(b)))
    .collect()
}

/// A binary whose overrides differ between architectures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideMismatch {
  pub package: String,
  /// Each distinct set of overrides and the architectures carrying it.
  pub variants: Vec<(Overrides, Vec<String>)>,
}

pub fn override_mismatches(binaries: &BinaryIndex) -> Vec<OverrideMismatch> {
  let mut mismatches = Vec::new();

  for name in binaries.names() {
    let Some(per_arch) = binaries.get(name) else {
      continue;
    };

    let mut variants: BTreeMap<&Overrides, Vec<String>> = BTreeMap::new();
    for (arch, record) in per_arch {
      variants.entry(&record.overrides).or_default().push(arch.clone());
    }

    if variants.len() > 1 {
      mismatches.push(OverrideMismatch {
        package: name.to_string(),
        variants: variants.into_iter().map(|(o, archs)| (o.clone(), archs)).collect(),
      });
    }
  }

  mismatches
}

/// A binary whose component disagrees with the seeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMismatch {
  pub package: String,
  pub source: String,
  pub component: String,
  /// Germinate's reason for seeding the package (promotions only).
  pub why: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMismatches {
  /// Seeded packages outside the supported components.
  pub promotions: Vec<ComponentMismatch>,
  /// Supported packages no seed pulls in.
  pub demotions: Vec<ComponentMismatch>,
}

pub fn component_mismatches(
  seeded: &GerminateOutput,
  binaries: &BinaryIndex,
  supported_components: &[&str],
) -> ComponentMismatches {
  let mut result = ComponentMismatches::default();

  for name in binaries.names() {
    let Some(record) = binaries.get(name).and_then(|per_arch| per_arch.values().next()) else {
      continue;
    };
    let supported = supported_components.contains(&record.overrides.component.as_str());

    match seeded.get(name) {
      Some(entry) if !supported => result.promotions.push(ComponentMismatch {
        package: name.to_string(),
        source: record.source.clone(),
        component: record.overrides.component.clone(),
        why: Some(entry.why.clone()),
      }),
      None if supported => result.demotions.push(ComponentMismatch {
        package: name.to_string(),
        source: record.source.clone(),
        component: record.overrides.component.clone(),
        why: None,
      }),
      _ => {}
    }
  }

  result
}

/// Split a `Source: name (version)` field.
///
/// Without the field the binary is built from a source of the same name and
/// version; without the parenthesised version the binary version is used.
fn parse_source_field(field: Option<&str>, binary: &str, binary_version: &str) -> (String, String) {
  let Some(field) = field else {
    return (binary.to_string(), binary_version.to_string());
  };

  match field.split_once('(') {
    Some((name, version)) => (
      name.trim().to_string(),
      version.trim_end_matches(')').trim().to_string(),
    ),
    None => (field.trim().to_string(), binary_version.to_string()),
  }
}

fn resolve_component(explicit: Option<&str>, section: Option<&str>) -> String {
  if let Some(component) = explicit {
    return component.to_string();
  }
  match section.and_then(|s| s.split_once('/')) {
    Some((component, _)) => component.to_string(),
    None => "main".to_string(),
  }
}

fn strip_component(section: &str) -> &str {
  section.split_once('/').map_or(section, |(_, s)| s)
}

/// `.../dists/<suite>/<component>/...` → `<component>`.
fn component_from_path(path: &Path) -> Option<String> {
  let parts: Vec<String> = path
    .components()
    .filter_map(|c| match c {
      Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect();
  let dists = parts.iter().position(|p| p == "dists")?;
  let component = parts.get(dists + 2)?;
  // The component directory is never the file itself.
  if dists + 3 < parts.len() { Some(component.clone()) } else { None }
}

fn architecture_from_path(path: &Path) -> Option<String> {
  path.components().find_map(|c| match c {
    Component::Normal(s) => s.to_str().and_then(|s| s.strip_prefix("binary-")).map(str::to_string),
    _ => None,
  })
}

/// `candidate > current`, treating unparsable versions as newer so bad data
/// is still visible in reports.
fn is_newer(candidate: &str, current: &str) -> bool {
  match (PackageVersion::parse(candidate), PackageVersion::parse(current)) {
    (Ok(a), Ok(b)) => a > b,
    _ => true,
  }
}
