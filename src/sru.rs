//! Stable Release Update acceptance: the bug bookkeeping done when an upload
//! is accepted into `-proposed`.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::{info, warn};

use crate::launchpad::{Bug, LaunchpadApi};

static BUG_TARGET_RE: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new(r"/ubuntu/(?:(?P<suite>[^/]+)/)?\+source/(?P<source>[^/]+)$").expect("valid regex")
});

/// Task states that suggest the bug may no longer need fixing.
const SUSPICIOUS_STATES: [&str; 3] = ["Invalid", "Won't Fix", "Fix Released"];

pub const SRU_TEAM: &str = "ubuntu-sru";
pub const VERIFICATION_TEAM: &str = "sru-verification";
pub const SPONSORS_TEAM: &str = "ubuntu-sponsors";
pub const MESSAGE_SUBJECT: &str = "Please test proposed package";

/// What [`process_bug`] did to one bug.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SruOutcome {
  pub bug: u64,
  /// Web links of tasks moved to Fix Committed.
  pub committed_tasks: Vec<String>,
  /// Web links of tasks that do not belong to the accepted source.
  pub ignored_tasks: Vec<String>,
  /// A series task had to be added.
  pub added_task: bool,
  /// The tag list written back, when it changed.
  pub new_tags: Option<Vec<String>>,
  /// Problems an administrator should look at.
  pub warnings: Vec<String>,
}

impl SruOutcome {
  fn warn(&mut self, message: String) {
    warn!("{message}");
    self.warnings.push(message);
  }
}

/// Update a bug for an SRU accepted into `<release>-proposed`.
///
/// Matching source tasks for the release are set to Fix Committed (a series
/// task is added when missing), the SRU teams are subscribed, verification
/// tags are reset for non-kernel sources and the testing request comment is
/// posted.
pub async fn process_bug(
  api: &dyn LaunchpadApi,
  source: Option<&str>,
  version: Option<&str>,
  release: &str,
  bug_id: u64,
) -> Result<SruOutcome> {
  let bug = api.get_bug(bug_id).await?;
  let mut outcome = SruOutcome {
    bug: bug_id,
    ..SruOutcome::default()
  };

  let mut source_match = false;
  let mut series_match = false;

  for task in api.get_bug_tasks(&bug).await? {
    let Some(captures) = BUG_TARGET_RE.captures(&task.target_link) else {
      info!("Ignoring task {} in bug {bug_id}", task.web_link);
      outcome.ignored_tasks.push(task.web_link);
      continue;
    };
    if let Some(source) = source
      && &captures["source"] != source
    {
      info!("Ignoring task {} in bug {bug_id}", task.web_link);
      outcome.ignored_tasks.push(task.web_link);
      continue;
    }

    source_match = true;
    if captures.name("suite").map(|m| m.as_str()) == Some(release) {
      if SUSPICIOUS_STATES.contains(&task.status.as_str()) {
        outcome.warn(format!(
          "Matching task was set to {} before accepting the SRU, please double-check if this bug is still \
           liable for fixing. Switching to Fix Committed.",
          task.status
        ));
      }
      api.set_bug_task_status(&task, "Fix Committed").await?;
      info!("Success: task {} in bug {bug_id}", task.web_link);
      outcome.committed_tasks.push(task.web_link);
      series_match = true;
    }
  }

  match source {
    Some(source) if source_match && !series_match => {
      let target = format!("{}ubuntu/{release}/+source/{source}", api.api_root());
      let task = api.add_bug_task(&bug, &target).await?;
      api.set_bug_task_status(&task, "Fix Committed").await?;
      info!("LP: #{bug_id} added task for {source} {release}");
      outcome.added_task = true;
      outcome.committed_tasks.push(task.web_link);
    }
    None if source_match && !series_match => {
      outcome.warn(format!(
        "LP: #{bug_id} has no {release} task and no source package was given to add one"
      ));
    }
    _ => {}
  }
  if !source_match {
    outcome.warn(format!("LP: #{bug_id} has no {} tasks!", source.unwrap_or("ubuntu")));
  }

  subscribe_teams(api, &bug, &mut outcome).await?;

  if source.is_none_or(|s| !s.contains("linux")) {
    let blocker = format!("block-proposed-{release}");
    if bug.tags.contains(&blocker) {
      outcome.warn(format!(
        "The {blocker} tag is still set on bug LP: #{bug_id}. Should the package continue to be blocked in \
         proposed? Please investigate and adjust the tags accordingly."
      ));
    }

    let tags = sru_tags(&bug.tags, release);
    if tags != bug.tags {
      api.set_bug_tags(&bug, &tags).await?;
      outcome.new_tags = Some(tags);
    }
  }

  let owner = api.get_person(person_name_from_link(&bug.owner_link)).await?;
  let message = sru_message(&owner.display_name, source, version, release);
  api.add_bug_message(&bug, MESSAGE_SUBJECT, &message).await?;

  Ok(outcome)
}

async fn subscribe_teams(api: &dyn LaunchpadApi, bug: &Bug, outcome: &mut SruOutcome) -> Result<()> {
  for team in [SRU_TEAM, VERIFICATION_TEAM] {
    let person = api.get_person(team).await?;
    api.subscribe_to_bug(bug, &person).await?;
  }

  let sponsors = api.get_person(SPONSORS_TEAM).await?;
  let subscriptions = api.get_bug_subscriptions(bug).await?;
  if subscriptions.iter().any(|s| s.person_link == sponsors.self_link) {
    outcome.warn(format!(
      "{SPONSORS_TEAM} is still subscribed to LP: #{}. Is there anything left to sponsor?",
      bug.id
    ));
  }
  Ok(())
}

/// Verification tags after an upload: earlier verification results are
/// dropped and `verification-needed` is added, both plain and per release.
pub fn sru_tags(existing: &[String], release: &str) -> Vec<String> {
  let stale = [
    "verification-failed".to_string(),
    format!("verification-failed-{release}"),
    "verification-done".to_string(),
    format!("verification-done-{release}"),
  ];

  let mut tags: Vec<String> = existing.iter().filter(|t| !stale.contains(t)).cloned().collect();
  for needed in ["verification-needed".to_string(), format!("verification-needed-{release}")] {
    if !tags.contains(&needed) {
      tags.push(needed);
    }
  }
  tags
}

/// `https://api.launchpad.net/devel/~name` → `name`.
pub fn person_name_from_link(link: &str) -> &str {
  let last = link.trim_end_matches('/').rsplit('/').next().unwrap_or(link);
  last.strip_prefix('~').unwrap_or(last)
}

/// The "please test" comment posted on accepted SRU bugs.
///
/// The greeting uses the first word of the reporter's display name. The
/// package page link is only included when both source and version are known.
pub fn sru_message(owner_display_name: &str, source: Option<&str>, version: Option<&str>, release: &str) -> String {
  let first_name = owner_display_name
    .split(|c: char| c == ',' || c.is_whitespace())
    .next()
    .unwrap_or_default();

  let mut text = format!("Hello {first_name}, or anyone else affected,\n\n");

  match source {
    Some(source) => text.push_str(&format!("Accepted {source} into ")),
    None => text.push_str("Accepted into "),
  }
  match (source, version) {
    (Some(source), Some(version)) => text.push_str(&format!(
      "{release}-proposed. The package will build now and be available at \
       https://launchpad.net/ubuntu/+source/{source}/{version} in a few hours, and then in the -proposed \
       repository.\n\n"
    )),
    _ => text.push_str(&format!(
      "{release}-proposed. The package will build now and be available in a few hours in the -proposed \
       repository.\n\n"
    )),
  }

  text.push_str("Please help us by testing this new package.  ");
  if source == Some("casper") {
    text.push_str(&format!(
      "To properly test it you will need to obtain and boot a daily build of a Live CD for {release}."
    ));
  } else {
    text.push_str("See https://wiki.ubuntu.com/Testing/EnableProposed for documentation on how to enable and use -proposed.");
  }

  text.push_str(&format!(
    "  Your feedback will aid us getting this update out to other Ubuntu users.\n\n\
     If this package fixes the bug for you, please add a comment to this bug, mentioning the version of the \
     package you tested, what testing has been performed on the package and change the tag from \
     verification-needed-{release} to verification-done-{release}. If it does not fix the bug for you, please \
     add a comment stating that, and change the tag to verification-failed-{release}. In either case, without \
     details of your testing we will not be able to proceed.\n\n\
     Further information regarding the verification process can be found at \
     https://wiki.ubuntu.com/QATeam/PerformingSRUVerification .  Thank you in advance for helping!\n\n\
     N.B. The updated package will be released to -updates after the bug(s) fixed by this package have been \
     verified and the package has been in -proposed for a minimum of 7 days."
  ));

  text
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn tags_reset_verification_state() {
    let result = sru_tags(
      &tags(&["regression-update", "verification-done", "verification-failed-jammy", "verification-done-focal"]),
      "jammy",
    );
    assert_eq!(
      result,
      tags(&[
        "regression-update",
        "verification-done-focal",
        "verification-needed",
        "verification-needed-jammy"
      ])
    );
  }

  #[test]
  fn tags_are_not_duplicated() {
    let existing = tags(&["verification-needed", "verification-needed-noble"]);
    assert_eq!(sru_tags(&existing, "noble"), existing);
  }

  #[test]
  fn target_regex() {
    let caps = BUG_TARGET_RE
      .captures("https://api.launchpad.net/devel/ubuntu/noble/+source/hello")
      .unwrap();
    assert_eq!(&caps["suite"], "noble");
    assert_eq!(&caps["source"], "hello");

    let caps = BUG_TARGET_RE
      .captures("https://api.launchpad.net/devel/ubuntu/+source/hello")
      .unwrap();
    assert!(caps.name("suite").is_none());

    assert!(BUG_TARGET_RE.captures("https://api.launchpad.net/devel/hello").is_none());
  }

  #[test]
  fn person_names_from_links() {
    assert_eq!(person_name_from_link("https://api.launchpad.net/devel/~jdoe"), "jdoe");
    assert_eq!(person_name_from_link("~team/"), "team");
  }

  #[test]
  fn message_greets_first_name_and_links_package() {
    let text = sru_message("Jane Doe", Some("hello"), Some("2.10-3ubuntu0.1"), "noble");
    assert!(text.starts_with("Hello Jane, or anyone else affected,\n\nAccepted hello into noble-proposed."));
    assert!(text.contains("https://launchpad.net/ubuntu/+source/hello/2.10-3ubuntu0.1"));
    assert!(text.contains("Testing/EnableProposed"));
    assert!(text.contains("verification-needed-noble to verification-done-noble"));
  }

  #[test]
  fn message_variants() {
    let casper = sru_message("Smith, John", Some("casper"), None, "jammy");
    assert!(casper.starts_with("Hello Smith, or anyone else affected,"));
    assert!(casper.contains("available in a few hours in the -proposed repository"));
    assert!(casper.contains("daily build of a Live CD for jammy."));

    let anonymous = sru_message("Someone", None, None, "focal");
    assert!(anonymous.contains("Accepted into focal-proposed."));
  }
}
