//! `archive-admin manage-chroot`: inspect, download, replace or remove the
//! chroot a distroarchseries builds in.

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use sha1::{Digest, Sha1};

use super::{confirm, connect, fail};
use crate::cli::Cli;
use crate::color::ColorScheme;
use crate::launchpad::reference::DEFAULT_DISTRIBUTION;
use crate::launchpad::{DistroArchSeries, LaunchpadApi, Suite};

pub const DEFAULT_IMAGE_TYPE: &str = "Chroot tarball";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChrootAction {
  /// Show the chroot URL
  Info,
  /// Download the chroot
  Get,
  /// Upload a new chroot from --filepath
  Set,
  /// Remove the chroot
  Remove,
}

#[derive(Debug, Clone, Args)]
pub struct ManageChrootArgs {
  #[arg(value_enum)]
  pub action: ChrootAction,

  /// Suite whose chroot to manage, e.g. noble or noble-proposed
  #[arg(short = 's', long, value_name = "SUITE")]
  pub suite: Suite,

  /// Architecture tag
  #[arg(short = 'a', long, value_name = "ARCH")]
  pub architecture: String,

  #[arg(long, default_value = DEFAULT_DISTRIBUTION, value_name = "DISTRIBUTION")]
  pub distribution: String,

  /// Image type, e.g. "Chroot tarball" or "LXD image"
  #[arg(short = 'i', long, default_value = DEFAULT_IMAGE_TYPE, value_name = "TYPE")]
  pub image_type: String,

  /// Where `get` writes the chroot, or the tarball `set` uploads
  #[arg(short = 'f', long, value_name = "PATH")]
  pub filepath: Option<PathBuf>,
}

impl ManageChrootArgs {
  pub fn validate(&self) -> Result<(), String> {
    match self.action {
      ChrootAction::Set if self.filepath.is_none() => Err("`set` requires --filepath".to_string()),
      ChrootAction::Info | ChrootAction::Remove if self.filepath.is_some() => {
        Err("--filepath only applies to `get` and `set`".to_string())
      }
      _ => Ok(()),
    }
  }

  /// `livecd.<distribution>.<series>.<arch>.tar.gz` style default for `get`.
  pub fn output_path(&self) -> PathBuf {
    self.filepath.clone().unwrap_or_else(|| {
      PathBuf::from(format!(
        "livecd.{}.{}.{}.tar.gz",
        self.distribution, self.suite.series, self.architecture
      ))
    })
  }
}

pub async fn lookup_distro_arch_series(api: &dyn LaunchpadApi, args: &ManageChrootArgs) -> Result<DistroArchSeries> {
  let series = api
    .get_series(&args.distribution, &args.suite.series)
    .await
    .with_context(|| format!("Failed to find series {}", args.suite.series))?;
  api
    .get_distro_arch_series(&series, &args.architecture)
    .await
    .with_context(|| format!("Failed to find {}/{}", args.suite.series, args.architecture))
}

/// Run one chroot action; returns the chroot URL for `info` and `get`.
pub async fn manage_chroot(api: &dyn LaunchpadApi, args: &ManageChrootArgs, dry_run: bool) -> Result<Option<String>> {
  let das = lookup_distro_arch_series(api, args).await?;
  let url = api
    .chroot_url(&das, args.suite.pocket, &args.image_type)
    .await
    .context("Failed to look up chroot")?;

  match args.action {
    ChrootAction::Info => Ok(url),
    ChrootAction::Get => {
      let Some(url) = url else {
        bail!("No {} for {}/{}", args.image_type, args.suite, args.architecture);
      };
      if !dry_run {
        api.download(&url, &args.output_path()).await?;
      }
      Ok(Some(url))
    }
    ChrootAction::Set => {
      let path = args.output_path();
      let data = tokio::fs::read(&path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
      let sha1sum = sha1_hex(&data);
      if !dry_run {
        api
          .set_chroot(&das, args.suite.pocket, &args.image_type, data, &sha1sum)
          .await
          .context("Failed to set chroot")?;
      }
      Ok(url)
    }
    ChrootAction::Remove => {
      if !dry_run {
        api
          .remove_chroot(&das, args.suite.pocket, &args.image_type)
          .await
          .context("Failed to remove chroot")?;
      }
      Ok(url)
    }
  }
}

/// Lowercase hex SHA-1, the checksum `setChroot` expects.
pub fn sha1_hex(data: &[u8]) -> String {
  hex::encode(Sha1::digest(data))
}

pub(crate) async fn handle_manage_chroot_command(args: &ManageChrootArgs, cli: &Cli, colors: &ColorScheme) {
  let client = connect(cli, colors);
  let dry_run = cli.behavior.dry_run;

  if args.action == ChrootAction::Remove
    && !dry_run
    && !cli.behavior.yes
    && !confirm(&format!("Remove {} for {} {}?", args.image_type, args.suite, args.architecture))
  {
    return;
  }

  match manage_chroot(&client, args, dry_run).await {
    Ok(url) => match args.action {
      ChrootAction::Info => match url {
        Some(url) => println!("{}: {}", colors.emphasis(&args.image_type), colors.link(url)),
        None => {
          println!("{} No {} set", colors.warning("⚠"), args.image_type);
          process::exit(1);
        }
      },
      ChrootAction::Get => {
        let path = args.output_path();
        if dry_run {
          println!("Would download {} to {}", url.unwrap_or_default(), colors.path(path.display()));
        } else {
          println!("{} Saved {}", colors.success("✓"), colors.path(path.display()));
        }
      }
      ChrootAction::Set if dry_run => println!(
        "Would upload {} as {}",
        colors.path(args.output_path().display()),
        args.image_type
      ),
      ChrootAction::Set => println!(
        "{} Uploaded {} as {}",
        colors.success("✓"),
        colors.path(args.output_path().display()),
        args.image_type
      ),
      ChrootAction::Remove if dry_run => println!("{}", colors.dimmed("Dry run; chroot not removed.")),
      ChrootAction::Remove => println!("{} Removed {}", colors.success("✓"), args.image_type),
    },
    Err(e) => fail(colors, "Chroot operation failed", e, 1),
  }
}
