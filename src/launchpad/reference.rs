//! Parsing of archive references, suites and pockets as typed by archive
//! administrators on the command line and as written in kernel-series.

use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow, bail};

pub const DEFAULT_DISTRIBUTION: &str = "ubuntu";

/// A publication channel within a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Pocket {
  Release,
  Security,
  Updates,
  Proposed,
  Backports,
}

impl Pocket {
  pub const ALL: [Pocket; 5] = [
    Pocket::Release,
    Pocket::Security,
    Pocket::Updates,
    Pocket::Proposed,
    Pocket::Backports,
  ];

  /// The name Launchpad uses in the web service.
  pub fn as_str(self) -> &'static str {
    match self {
      Pocket::Release => "Release",
      Pocket::Security => "Security",
      Pocket::Updates => "Updates",
      Pocket::Proposed => "Proposed",
      Pocket::Backports => "Backports",
    }
  }

  /// Suffix of the suite name, e.g. `-proposed`; empty for Release.
  pub fn suffix(self) -> &'static str {
    match self {
      Pocket::Release => "",
      Pocket::Security => "-security",
      Pocket::Updates => "-updates",
      Pocket::Proposed => "-proposed",
      Pocket::Backports => "-backports",
    }
  }
}

impl fmt::Display for Pocket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Pocket {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    Pocket::ALL
      .into_iter()
      .find(|pocket| pocket.as_str().eq_ignore_ascii_case(s))
      .ok_or_else(|| anyhow!("Unknown pocket '{s}'"))
  }
}

/// A series plus pocket, e.g. `noble-proposed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Suite {
  pub series: String,
  pub pocket: Pocket,
}

impl Suite {
  pub fn new(series: impl Into<String>, pocket: Pocket) -> Self {
    Self {
      series: series.into(),
      pocket,
    }
  }
}

impl fmt::Display for Suite {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.series, self.pocket.suffix())
  }
}

impl FromStr for Suite {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    if s.is_empty() {
      bail!("Empty suite name");
    }
    let pocket = Pocket::ALL
      .into_iter()
      .filter(|p| *p != Pocket::Release)
      .find(|p| s.ends_with(p.suffix()));

    Ok(match pocket {
      Some(pocket) => Suite::new(&s[..s.len() - pocket.suffix().len()], pocket),
      None => Suite::new(s, Pocket::Release),
    })
  }
}

/// Reference to a primary archive or a PPA.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArchiveReference {
  Primary {
    distribution: String,
  },
  Ppa {
    owner: String,
    distribution: String,
    name: String,
  },
}

impl ArchiveReference {
  pub fn primary() -> Self {
    ArchiveReference::Primary {
      distribution: DEFAULT_DISTRIBUTION.to_string(),
    }
  }

  /// Parse `ubuntu`, `ppa:owner/name`, `ppa:owner/distro/name` or
  /// `~owner/distro/name`.
  pub fn parse(s: &str) -> Result<Self> {
    let s = s.trim();
    let (ppa, is_ppa) = match (s.strip_prefix("ppa:"), s.strip_prefix('~')) {
      (Some(rest), _) | (None, Some(rest)) => (rest, true),
      (None, None) => (s, false),
    };

    if !is_ppa {
      if s.is_empty() || s.contains('/') {
        bail!("Invalid archive reference '{s}'");
      }
      return Ok(ArchiveReference::Primary {
        distribution: s.to_string(),
      });
    }

    let parts: Vec<&str> = ppa.split('/').collect();
    let (owner, distribution, name) = match parts.as_slice() {
      [owner, name] => (*owner, DEFAULT_DISTRIBUTION, *name),
      [owner, distribution, name] => (*owner, *distribution, *name),
      _ => bail!("Invalid PPA reference '{s}'"),
    };
    if owner.is_empty() || distribution.is_empty() || name.is_empty() {
      bail!("Invalid PPA reference '{s}'");
    }

    Ok(ArchiveReference::Ppa {
      owner: owner.to_string(),
      distribution: distribution.to_string(),
      name: name.to_string(),
    })
  }

  pub fn distribution(&self) -> &str {
    match self {
      ArchiveReference::Primary { distribution } | ArchiveReference::Ppa { distribution, .. } => distribution,
    }
  }

  pub fn is_primary(&self) -> bool {
    matches!(self, ArchiveReference::Primary { .. })
  }

  /// The reference string understood by `archives.getByReference`.
  pub fn launchpad_reference(&self) -> String {
    match self {
      ArchiveReference::Primary { distribution } => distribution.clone(),
      ArchiveReference::Ppa {
        owner,
        distribution,
        name,
      } => format!("~{owner}/{distribution}/{name}"),
    }
  }
}

impl fmt::Display for ArchiveReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArchiveReference::Primary { distribution } => f.write_str(distribution),
      ArchiveReference::Ppa {
        owner,
        distribution,
        name,
      } => write!(f, "ppa:{owner}/{distribution}/{name}"),
    }
  }
}

impl FromStr for ArchiveReference {
  type Err = anyhow::Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::parse(s)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_archive_references() {
    assert_eq!(ArchiveReference::parse("ubuntu").unwrap(), ArchiveReference::primary());

    let ppa = ArchiveReference::parse("ppa:canonical-kernel-team/ubuntu/proposed").unwrap();
    assert_eq!(ppa.launchpad_reference(), "~canonical-kernel-team/ubuntu/proposed");
    assert_eq!(ppa.to_string(), "ppa:canonical-kernel-team/ubuntu/proposed");

    let short = ArchiveReference::parse("ppa:ubuntu-sru/ppa").unwrap();
    assert_eq!(short.distribution(), "ubuntu");
    assert_eq!(short.launchpad_reference(), "~ubuntu-sru/ubuntu/ppa");

    let tilde = ArchiveReference::parse("~owner/debian/test").unwrap();
    assert_eq!(tilde.distribution(), "debian");
    assert!(!tilde.is_primary());
  }

  #[test]
  fn rejects_bad_references() {
    for bad in ["", "ppa:", "ppa:owner", "ppa:a/b/c/d", "ubuntu/extra", "~owner//name"] {
      assert!(ArchiveReference::parse(bad).is_err(), "{bad} should be rejected");
    }
  }

  #[test]
  fn parses_suites() {
    let suite: Suite = "noble-proposed".parse().unwrap();
    assert_eq!(suite, Suite::new("noble", Pocket::Proposed));
    assert_eq!(suite.to_string(), "noble-proposed");

    let suite: Suite = "jammy".parse().unwrap();
    assert_eq!(suite.pocket, Pocket::Release);
    assert_eq!(suite.to_string(), "jammy");

    assert_eq!("focal-security".parse::<Suite>().unwrap().pocket, Pocket::Security);
    assert!("".parse::<Suite>().is_err());
  }

  #[test]
  fn pockets_parse_case_insensitively() {
    assert_eq!("proposed".parse::<Pocket>().unwrap(), Pocket::Proposed);
    assert_eq!("Release".parse::<Pocket>().unwrap(), Pocket::Release);
    assert!("nowhere".parse::<Pocket>().is_err());
  }
}
