//! ISO QA tracker front-end driven by `~/.isotracker.conf`:
//!
//! ```text
//! [general]
//! url = https://iso.qa.ubuntu.com/xmlrpc.php
//! username = tester
//! password = secret
//! default_milestone = Noble Daily
//!
//! [localized]
//! url = https://localized-iso.qa.ubuntu.com/xmlrpc.php
//! password = other
//! ```
//!
//! A named target overrides `url`, `username`, `password` and
//! `default_milestone` from `[general]`. Missing credentials are looked up in
//! `~/.netrc` for the tracker host.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use tracing::{info, warn};
use url::Url;

use crate::credentials::{CredentialsProvider, NetrcProvider, home_dir};
use crate::ini::Ini;
use crate::qatracker::{Build, Milestone, Product, QaTracker, RpcTransport, StatusFilter};

const GENERAL: &str = "general";

/// Build statuses listed when the caller does not pick any.
pub const DEFAULT_BUILD_STATUSES: [&str; 3] = ["Active", "Re-building", "Ready"];

pub fn default_config_path() -> Result<PathBuf> {
  Ok(home_dir()?.join(".isotracker.conf"))
}

pub fn default_note_path() -> Result<PathBuf> {
  Ok(home_dir()?.join(".isotracker.note"))
}

/// Settings for one target after applying overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSettings {
  pub target: Option<String>,
  pub url: String,
  pub username: Option<String>,
  pub password: Option<String>,
  pub default_milestone: Option<String>,
}

impl TrackerSettings {
  pub fn from_ini(ini: &Ini, target: Option<&str>) -> Result<Self> {
    let mut url = ini.get(GENERAL, "url").map(str::to_string);
    let mut username = ini.get(GENERAL, "username").map(str::to_string);
    let mut password = ini.get(GENERAL, "password").map(str::to_string);
    let mut default_milestone = ini.get(GENERAL, "default_milestone").map(str::to_string);

    if let Some(target) = target {
      match ini.section(target) {
        Some(section) => {
          let pick = |current: &mut Option<String>, key: &str| {
            if let Some(value) = section.get(key) {
              *current = Some(value.to_string());
            }
          };
          pick(&mut url, "url");
          pick(&mut username, "username");
          pick(&mut password, "password");
          // An empty target milestone falls back to [general].
          if let Some(milestone) = section.get("default_milestone").filter(|m| !m.is_empty()) {
            default_milestone = Some(milestone.to_string());
          }
        }
        None => warn!("Couldn't find a '{target}' target, using the default."),
      }
    }

    let url = url.ok_or_else(|| anyhow!("No tracker url configured in the [{GENERAL}] section"))?;
    Ok(Self {
      target: target.map(str::to_string),
      url,
      username: username.filter(|u| !u.is_empty()),
      password: password.filter(|p| !p.is_empty()),
      default_milestone: default_milestone.filter(|m| !m.is_empty()),
    })
  }

  /// Read the configuration file.
  pub fn load(path: &Path, target: Option<&str>) -> Result<Self> {
    if !path.exists() {
      bail!("Missing configuration file at: {}", path.display());
    }
    let ini = Ini::load(path)?;
    Self::from_ini(&ini, target)
  }

  /// Fill a missing username or password from netrc.
  pub fn with_netrc(mut self, netrc: &dyn CredentialsProvider) -> Result<Self> {
    if self.username.is_some() && self.password.is_some() {
      return Ok(self);
    }
    let host = Url::parse(&self.url)
      .with_context(|| format!("Invalid tracker url {}", self.url))?
      .host_str()
      .map(str::to_string);
    if let Some(host) = host
      && let Some(credential) = netrc.get_credentials(&host)?
    {
      info!("Using netrc credentials for {host}");
      self.username.get_or_insert(credential.username);
      self.password.get_or_insert(credential.password);
    }
    Ok(self)
  }
}

pub struct IsoTracker {
  settings: TrackerSettings,
  tracker: QaTracker,
  products: Vec<Product>,
  milestones: Vec<Milestone>,
  note_path: Option<PathBuf>,
}

impl IsoTracker {
  /// Connect using `~/.isotracker.conf`, optionally for a named target.
  pub async fn connect(target: Option<&str>, timeout_secs: u64) -> Result<Self> {
    let settings = TrackerSettings::load(&default_config_path()?, target)?.with_netrc(&NetrcProvider::new())?;
    let tracker = QaTracker::connect(
      &settings.url,
      settings.username.as_deref(),
      settings.password.as_deref(),
      timeout_secs,
    )
    .await
    .with_context(|| format!("Failed to connect to the QA tracker at {}", settings.url))?;

    let mut iso = Self::with_tracker(settings, tracker).await?;
    iso.note_path = default_note_path().ok();
    Ok(iso)
  }

  /// Wrap an established session over a custom transport.
  pub async fn with_transport(settings: TrackerSettings, transport: Box<dyn RpcTransport>) -> Result<Self> {
    let tracker = QaTracker::with_transport(transport).await?;
    Self::with_tracker(settings, tracker).await
  }

  async fn with_tracker(settings: TrackerSettings, tracker: QaTracker) -> Result<Self> {
    let products = tracker.get_products(None).await.context("Failed to list products")?;
    let milestones = tracker.get_milestones(None).await.context("Failed to list milestones")?;
    Ok(Self {
      settings,
      tracker,
      products,
      milestones,
      note_path: None,
    })
  }

  /// File whose contents become the build note when none is given.
  pub fn set_note_path(&mut self, path: Option<PathBuf>) {
    self.note_path = path;
  }

  pub fn settings(&self) -> &TrackerSettings {
    &self.settings
  }

  pub fn tracker(&self) -> &QaTracker {
    &self.tracker
  }

  pub fn products(&self) -> &[Product] {
    &self.products
  }

  pub fn milestones(&self) -> &[Milestone] {
    &self.milestones
  }

  pub fn default_milestone(&self) -> Result<&Milestone> {
    let name = self
      .settings
      .default_milestone
      .as_deref()
      .ok_or_else(|| anyhow!("No default milestone selected"))?;
    self.get_milestone_by_name(name)
  }

  pub fn get_product_by_name(&self, name: &str) -> Result<&Product> {
    self
      .products
      .iter()
      .find(|p| p.title.to_lowercase() == name.to_lowercase())
      .ok_or_else(|| anyhow!("Product '{name}' not found"))
  }

  pub fn get_milestone_by_name(&self, name: &str) -> Result<&Milestone> {
    self
      .milestones
      .iter()
      .find(|m| m.title.to_lowercase() == name.to_lowercase())
      .ok_or_else(|| anyhow!("Milestone '{name}' not found"))
  }

  fn milestone(&self, name: Option<&str>) -> Result<&Milestone> {
    match name {
      Some(name) => self.get_milestone_by_name(name),
      None => self.default_milestone(),
    }
  }

  /// Builds on a milestone (default: the configured one) with the given
  /// statuses (default: [`DEFAULT_BUILD_STATUSES`]).
  pub async fn get_builds(&self, milestone: Option<&str>, statuses: &[&str]) -> Result<Vec<Build>> {
    let milestone = self.milestone(milestone)?;
    let statuses = if statuses.is_empty() { &DEFAULT_BUILD_STATUSES[..] } else { statuses };
    let filter: Vec<StatusFilter<'_>> = statuses.iter().map(|&s| StatusFilter::Name(s)).collect();
    Ok(self.tracker.milestone_builds(milestone, Some(&filter)).await?)
  }

  /// Post a new build. An empty note is replaced by the note file, if any.
  pub async fn post_build(
    &self,
    product: &str,
    version: &str,
    milestone: Option<&str>,
    note: &str,
    notify: bool,
  ) -> Result<Option<Build>> {
    let product = self.get_product_by_name(product)?;

    let mut note = note.to_string();
    if note.is_empty()
      && let Some(path) = &self.note_path
      && path.exists()
    {
      note = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    }

    let milestone = self.milestone(milestone)?;
    Ok(self.tracker.add_build(milestone, product, version, &note, notify).await?)
  }
}
