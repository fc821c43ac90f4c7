//! Kernel SRU tracking bugs.
//!
//! A tracking bug is titled `[<prefix>/]<package>: <version> -proposed tracker`
//! and carries one `ubuntu/<release>/+source/<package>` task plus a set of
//! `kernel-sru-workflow/prepare-package<suffix>` tasks naming the packages
//! built for the cycle.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{info, warn};

use crate::launchpad::{BugTask, LaunchpadApi};

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"^([a-z]+/)?(?P<package>[a-z0-9.-]+): (?P<version>[0-9.-]+[0-9a-z.~-]*) -proposed tracker$")
    .expect("valid regex")
});

static PREPARE_RE: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"prepare-package(?P<subpackage>.*)").expect("valid regex"));

/// `(package, version)` from a tracking bug title.
pub fn parse_tracker_title(title: &str) -> Option<(String, String)> {
  let captures = TITLE_RE.captures(title)?;
  Some((captures["package"].to_string(), captures["version"].to_string()))
}

/// The full package name for a prepare-package suffix of `package`.
///
/// `""` is the kernel itself, `-meta` becomes `linux-meta...`; the legacy
/// `-lbm` and `-lrm` suffixes expand to their long names.
pub fn expand_package(package: &str, suffix: &str) -> String {
  let suffix = match suffix {
    "-lbm" => "-backports-modules-3.2.0",
    "-lrm" => "-restricted-modules",
    other => other,
  };
  match package.strip_prefix("linux") {
    Some(rest) => format!("linux{suffix}{rest}"),
    None => package.to_string(),
  }
}

/// A tracking bug reduced to what the copy tools act on.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelSruBug {
  pub bug: u64,
  /// Package named in the title.
  pub package: String,
  pub version: String,
  pub release: String,
  /// Package named by the source task.
  pub source: String,
  /// All tasks that are not Invalid.
  pub tasks: Vec<BugTask>,
  /// Full names of the packages in the prepare list.
  pub packages: Vec<String>,
  /// Only meta packages are listed, the kernel itself is not.
  pub meta_only: bool,
  /// The source task names a different package than the title.
  pub name_mismatch: bool,
}

/// Read a tracking bug.
///
/// Returns `Ok(None)` when the bug is not a tracking bug, has no source task
/// or has nothing in its prepare list.
pub async fn process_sru_bug(api: &dyn LaunchpadApi, bug_id: u64) -> Result<Option<KernelSruBug>> {
  let bug = api
    .get_bug(bug_id)
    .await
    .with_context(|| format!("Failed to fetch bug {bug_id}"))?;

  let Some((package, version)) = parse_tracker_title(&bug.title) else {
    info!("Ignoring bug {bug_id}, not a kernel SRU tracking bug");
    return Ok(None);
  };

  let root = regex::escape(api.api_root());
  let package_re = Regex::new(&format!(
    r"^{root}ubuntu/(?P<release>[0-9a-z.-]+)/\+source/(?P<package>[a-z0-9.-]+)$"
  ))?;
  let workflow_re = Regex::new(&format!(r"^{root}kernel-sru-workflow/(?P<subtask>.*)"))?;

  let mut tasks = Vec::new();
  let mut suffixes: Vec<String> = Vec::new();
  let mut source: Option<(String, String)> = None;

  for task in api.get_bug_tasks(&bug).await? {
    if task.status == "Invalid" {
      continue;
    }

    if let Some(workflow) = workflow_re.captures(&task.target_link)
      && let Some(prepare) = PREPARE_RE.captures(&workflow["subtask"])
    {
      suffixes.push(prepare["subpackage"].to_string());
    }

    if let Some(captures) = package_re.captures(&task.target_link) {
      match &source {
        Some((name, _)) => warn!(
          "Too many source packages, {name} and {}, ignoring the extra task on bug {bug_id}",
          &captures["package"]
        ),
        None => source = Some((captures["package"].to_string(), captures["release"].to_string())),
      }
    }

    tasks.push(task);
  }

  let Some((source, release)) = source else {
    warn!("No source package to act on, skipping bug {bug_id}");
    return Ok(None);
  };

  let name_mismatch = source != package;
  if name_mismatch {
    warn!("Cannot determine base package for {bug_id}, {source} vs. {package}");
  }

  if suffixes.is_empty() {
    warn!("No packages in the prepare list of bug {bug_id}, don't know what to do");
    return Ok(None);
  }

  let meta_only = !suffixes.iter().any(String::is_empty);
  let packages = suffixes.iter().map(|suffix| expand_package(&package, suffix)).collect();

  Ok(Some(KernelSruBug {
    bug: bug_id,
    package,
    version,
    release,
    source,
    tasks,
    packages,
    meta_only,
    name_mismatch,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tracker_titles() {
    assert_eq!(
      parse_tracker_title("linux-aws: 5.15.0-1050.55 -proposed tracker"),
      Some(("linux-aws".to_string(), "5.15.0-1050.55".to_string()))
    );
    assert_eq!(
      parse_tracker_title("jammy/linux-hwe-6.5: 6.5.0-28.29~22.04.1 -proposed tracker"),
      Some(("linux-hwe-6.5".to_string(), "6.5.0-28.29~22.04.1".to_string()))
    );
    assert_eq!(parse_tracker_title("linux: crashes on boot"), None);
    assert_eq!(parse_tracker_title("linux: 6.8.0-31.31 -updates tracker"), None);
  }

  #[test]
  fn package_suffixes() {
    assert_eq!(expand_package("linux", ""), "linux");
    assert_eq!(expand_package("linux", "-meta"), "linux-meta");
    assert_eq!(expand_package("linux-aws", "-signed"), "linux-signed-aws");
    assert_eq!(expand_package("linux", "-lbm"), "linux-backports-modules-3.2.0");
    assert_eq!(expand_package("linux-lts", "-lrm"), "linux-restricted-modules-lts");
  }
}
