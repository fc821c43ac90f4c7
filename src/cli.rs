//! Command-line interface definitions for archive-admin.
//!
//! Every archive tool is a subcommand. Launchpad access, behavior and
//! performance settings are shared option groups flattened into the top
//! level; behavior flags are global so they may also follow the subcommand.

use std::path::PathBuf;
use std::process;

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use url::Url;

use crate::color::ColorScheme;
use crate::commands::architecture_mismatches::{ArchitectureMismatchesArgs, handle_architecture_mismatches_command};
use crate::commands::auth::handle_auth_command;
use crate::commands::change_override::{ChangeOverrideArgs, handle_change_override_command};
use crate::commands::chart::{ChartArgs, handle_chart_command};
use crate::commands::completions::handle_completions_command;
use crate::commands::component_mismatches::{ComponentMismatchesArgs, handle_component_mismatches_command};
use crate::commands::copy_package::{CopyPackageArgs, handle_copy_package_command};
use crate::commands::copy_proposed_kernel::{CopyProposedKernelArgs, handle_copy_proposed_kernel_command};
use crate::commands::iso_tracker::{IsoTrackerCommand, handle_iso_tracker_command};
use crate::commands::kernel_routing::{KernelRoutingArgs, handle_kernel_routing_command};
use crate::commands::manage_builders::{ManageBuildersArgs, handle_manage_builders_command};
use crate::commands::manage_chroot::{ManageChrootArgs, handle_manage_chroot_command};
use crate::commands::nbs_report::{NbsReportArgs, handle_nbs_report_command};
use crate::commands::remove_package::{RemovePackageArgs, handle_remove_package_command};
use crate::commands::sru_accept::{SruAcceptArgs, handle_sru_accept_command};
use crate::commands::sru_report::{SruReportArgs, handle_sru_report_command};
use crate::commands::version::handle_version_command;
use crate::kernel::series;
use crate::launchpad::LaunchpadInstance;

/// archive-admin - Ubuntu archive administration tools
#[derive(Debug, Parser)]
#[command(
  name = "archive-admin",
  version,
  about = "Administer the Ubuntu package archive on Launchpad",
  long_about = "Tools for Ubuntu archive administrators: copy, remove and override publications,\n\
                manage chroots and builders, process SRUs and kernel trackers, and analyse archive contents.",
  styles = HELP_STYLES
)]
pub struct Cli {
  /// Subcommand to execute
  #[command(subcommand)]
  pub command: Command,

  /// Launchpad options
  #[command(flatten)]
  pub launchpad: LaunchpadOptions,

  /// Behavior options
  #[command(flatten)]
  pub behavior: BehaviorOptions,

  /// Performance options
  #[command(flatten)]
  pub performance: PerformanceOptions,
}

#[derive(Debug, Subcommand)]
pub enum Command {
  /// Authentication testing and inspection
  Auth {
    #[command(subcommand)]
    subcommand: AuthCommand,
  },

  /// Copy source packages between archives and suites
  CopyPackage(CopyPackageArgs),

  /// Request deletion of source or binary publications
  RemovePackage(RemovePackageArgs),

  /// Change component, section or priority of publications
  ChangeOverride(ChangeOverrideArgs),

  /// Inspect, fetch or remove build chroots
  ManageChroot(ManageChrootArgs),

  /// List builders or change their mode
  ManageBuilders(ManageBuildersArgs),

  /// Mark bugs as fixed by an upload accepted into -proposed
  SruAccept(SruAcceptArgs),

  /// Report pending stable release updates and their verification state
  SruReport(SruReportArgs),

  /// Show where kernel-series routes a kernel's uploads
  KernelRouting(KernelRoutingArgs),

  /// Copy kernels named by SRU tracking bugs from their build route to -proposed
  CopyProposedKernel(CopyProposedKernelArgs),

  /// Report binaries not built from source and orphaned sources
  NbsReport(NbsReportArgs),

  /// Report binaries whose overrides differ between architectures
  ArchitectureMismatches(ArchitectureMismatchesArgs),

  /// Compare germinate output with archive components
  ComponentMismatches(ComponentMismatchesArgs),

  /// List or post builds on the ISO QA tracker
  IsoTracker {
    #[command(subcommand)]
    subcommand: IsoTrackerCommand,
  },

  /// Print an HTML page charting a CSV time series
  Chart(ChartArgs),

  /// Display version and build information
  Version {
    /// Output in JSON format
    #[arg(long)]
    json: bool,

    /// Show only version number
    #[arg(long)]
    short: bool,
  },

  /// Generate shell completion scripts
  Completions {
    /// Target shell for completions
    #[arg(value_enum)]
    shell: Shell,
  },
}

/// Authentication subcommands
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum AuthCommand {
  /// Verify the configured credentials against Launchpad
  Test,

  /// Show where credentials are loaded from
  Show,
}

/// Shells supported by `completions`
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Shell {
  Bash,
  Zsh,
  Fish,
  Powershell,
  Elvish,
}

/// Normalize an API root: add https:// when no scheme is present and end
/// with a slash.
fn normalize_api_root(url: &str) -> Result<String, String> {
  let trimmed = url.trim();

  let parsed = match Url::parse(trimmed) {
    Ok(parsed) if parsed.has_host() => parsed,
    _ => {
      let with_https = format!("https://{trimmed}");
      Url::parse(&with_https).map_err(|e| format!("Invalid URL: {e}"))?
    }
  };

  let mut url_str = parsed.to_string();
  if !url_str.ends_with('/') {
    url_str.push('/');
  }

  Ok(url_str)
}

/// Launchpad options
#[derive(Debug, Parser)]
pub struct LaunchpadOptions {
  /// Launchpad instance to talk to
  #[arg(
    short = 'l',
    long,
    env = "LAUNCHPAD_INSTANCE",
    value_enum,
    default_value = "production",
    value_name = "INSTANCE"
  )]
  pub launchpad_instance: LaunchpadInstance,

  /// Web service root, overriding --launchpad-instance
  #[arg(long, env = "LAUNCHPAD_API_ROOT", value_name = "URL", value_parser = normalize_api_root)]
  pub api_root: Option<String>,

  /// launchpadlib-style credentials file
  #[arg(long, env = "LAUNCHPAD_CREDENTIALS_FILE", value_name = "FILE")]
  pub credentials_file: Option<PathBuf>,

  /// OAuth consumer key
  #[arg(long, env = "LAUNCHPAD_CONSUMER_KEY", value_name = "KEY")]
  pub consumer_key: Option<String>,

  /// OAuth access token
  #[arg(long, env = "LAUNCHPAD_ACCESS_TOKEN", value_name = "TOKEN")]
  pub access_token: Option<String>,

  /// OAuth access token secret
  #[arg(long, env = "LAUNCHPAD_ACCESS_SECRET", value_name = "SECRET", hide_env_values = true)]
  pub access_secret: Option<String>,

  /// Do not authenticate
  #[arg(long)]
  pub anonymous: bool,

  /// kernel-series.yaml path or URL
  #[arg(long, env = "KERNEL_SERIES", value_name = "PATH_OR_URL")]
  pub kernel_series: Option<String>,

  /// Read kernel-series.yaml from the local kteam-tools checkout
  #[arg(long, env = "USE_LOCAL_KERNEL_SERIES_YAML")]
  pub use_local_kernel_series: bool,
}

impl LaunchpadOptions {
  /// The effective web service root.
  pub fn api_root(&self) -> String {
    self
      .api_root
      .clone()
      .unwrap_or_else(|| self.launchpad_instance.api_root().to_string())
  }

  /// Where kernel-series.yaml is read from.
  pub fn kernel_series_source(&self) -> String {
    self
      .kernel_series
      .clone()
      .unwrap_or_else(|| series::default_source(self.use_local_kernel_series))
  }
}

/// Behavior options
#[derive(Debug, Parser)]
pub struct BehaviorOptions {
  /// Show what would be changed without changing anything
  #[arg(short = 'n', long, global = true)]
  pub dry_run: bool,

  /// Do not ask for confirmation
  #[arg(short = 'y', long, global = true)]
  pub yes: bool,

  /// Increase verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  pub verbose: u8,

  /// Suppress all output except errors
  #[arg(short, long, conflicts_with = "verbose", global = true)]
  pub quiet: bool,

  /// Colorize output
  #[arg(long, value_enum, default_value = "auto", value_name = "WHEN", global = true)]
  pub color: ColorOption,
}

/// Color output options
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorOption {
  Auto,
  Always,
  Never,
}

/// Performance options
#[derive(Debug, Parser)]
pub struct PerformanceOptions {
  /// Max requests per second
  #[arg(long, default_value = "10", value_name = "N")]
  pub rate_limit: usize,

  /// Request timeout in seconds
  #[arg(long, default_value = "30", value_name = "SECONDS")]
  pub timeout: u64,
}

impl Cli {
  /// Parse CLI arguments from the environment
  pub fn parse_args() -> Self {
    let mut cli = Self::parse();

    // An empty LAUNCHPAD_CREDENTIALS_FILE means "use the default file".
    if cli
      .launchpad
      .credentials_file
      .as_ref()
      .is_some_and(|path| path.as_os_str().is_empty())
    {
      cli.launchpad.credentials_file = None;
    }

    cli
  }

  /// Validate CLI arguments
  ///
  /// Returns an error if the CLI configuration is invalid.
  pub fn validate(&self) -> Result<(), String> {
    if self.performance.rate_limit == 0 {
      return Err("--rate-limit must be at least 1 request per second".to_string());
    }

    if self.performance.timeout == 0 {
      return Err("--timeout must be at least 1 second".to_string());
    }

    if self.launchpad.anonymous
      && (self.launchpad.consumer_key.is_some() || self.launchpad.access_token.is_some())
    {
      return Err("--anonymous cannot be combined with OAuth credentials".to_string());
    }

    match &self.command {
      Command::CopyPackage(args) => args.validate(),
      Command::RemovePackage(args) => args.validate(),
      Command::ChangeOverride(args) => args.validate(),
      Command::ManageChroot(args) => args.validate(),
      Command::SruAccept(args) => args.validate(),
      Command::Chart(args) => args.validate(),
      _ => Ok(()),
    }
  }
}

/// Parse CLI arguments, initialize shared services, and dispatch to the chosen
/// command.
pub async fn run() {
  let cli = Cli::parse_args();

  init_tracing(&cli.behavior);

  let colors = ColorScheme::new(cli.behavior.color);

  if let Err(e) = cli.validate() {
    eprintln!("{} {e}", colors.error("Error:"));
    process::exit(4);
  }

  match &cli.command {
    Command::Auth { subcommand } => handle_auth_command(*subcommand, &cli, &colors).await,
    Command::CopyPackage(args) => handle_copy_package_command(args, &cli, &colors).await,
    Command::RemovePackage(args) => handle_remove_package_command(args, &cli, &colors).await,
    Command::ChangeOverride(args) => handle_change_override_command(args, &cli, &colors).await,
    Command::ManageChroot(args) => handle_manage_chroot_command(args, &cli, &colors).await,
    Command::ManageBuilders(args) => handle_manage_builders_command(args, &cli, &colors).await,
    Command::SruAccept(args) => handle_sru_accept_command(args, &cli, &colors).await,
    Command::SruReport(args) => handle_sru_report_command(args, &cli, &colors).await,
    Command::KernelRouting(args) => handle_kernel_routing_command(args, &cli, &colors).await,
    Command::CopyProposedKernel(args) => handle_copy_proposed_kernel_command(args, &cli, &colors).await,
    Command::NbsReport(args) => handle_nbs_report_command(args, &colors),
    Command::ArchitectureMismatches(args) => handle_architecture_mismatches_command(args, &colors),
    Command::ComponentMismatches(args) => handle_component_mismatches_command(args, &colors),
    Command::IsoTracker { subcommand } => handle_iso_tracker_command(subcommand, &cli, &colors).await,
    Command::Chart(args) => handle_chart_command(args, &colors),
    Command::Version { json, short } => handle_version_command(*json, *short, &colors),
    Command::Completions { shell } => handle_completions_command(*shell),
  }
}

/// Log to stderr at the level chosen by `-v`/`-q`; `RUST_LOG` overrides it.
fn init_tracing(behavior: &BehaviorOptions) {
  let level = match (behavior.quiet, behavior.verbose) {
    (true, _) => LevelFilter::ERROR,
    (false, 0) => LevelFilter::WARN,
    (false, 1) => LevelFilter::INFO,
    (false, 2) => LevelFilter::DEBUG,
    (false, _) => LevelFilter::TRACE,
  };
  let filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .try_init();
}

const HELP_STYLES: Styles = Styles::styled()
  .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
  .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
  .literal(AnsiColor::Green.on_default())
  .placeholder(AnsiColor::Cyan.on_default())
  .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
  .valid(AnsiColor::Green.on_default())
  .invalid(AnsiColor::Red.on_default());

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Cli {
    let mut argv = vec!["archive-admin"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
  }

  #[test]
  fn test_cli_defaults() {
    let cli = parse(&["version"]);
    assert!(matches!(cli.launchpad.launchpad_instance, LaunchpadInstance::Production));
    assert_eq!(cli.launchpad.api_root(), "https://api.launchpad.net/devel/");
    assert_eq!(cli.performance.rate_limit, 10);
    assert_eq!(cli.performance.timeout, 30);
    assert!(!cli.behavior.dry_run);
    assert!(cli.validate().is_ok());
  }

  #[test]
  fn test_cli_instance_selects_root() {
    let cli = parse(&["-l", "staging", "auth", "show"]);
    assert_eq!(cli.launchpad.api_root(), "https://api.staging.launchpad.net/devel/");
  }

  #[test]
  fn test_api_root_normalization_adds_scheme_and_slash() {
    let cli = parse(&["--api-root", "api.launchpad.test/devel", "auth", "test"]);
    assert_eq!(cli.launchpad.api_root.as_deref(), Some("https://api.launchpad.test/devel/"));

    let cli = parse(&["--api-root", "http://localhost:8085/devel/", "auth", "test"]);
    assert_eq!(cli.launchpad.api_root(), "http://localhost:8085/devel/");
  }

  #[test]
  fn test_cli_validation_rate_limit() {
    let cli = parse(&["--rate-limit", "0", "version"]);
    let result = cli.validate();
    assert!(result.unwrap_err().contains("--rate-limit must be at least 1"));
  }

  #[test]
  fn test_cli_validation_anonymous_with_token() {
    let cli = parse(&["--anonymous", "--consumer-key", "archive-admin", "auth", "show"]);
    assert!(cli.validate().unwrap_err().contains("--anonymous"));
  }

  #[test]
  fn test_cli_options_after_subcommand() {
    let cli = parse(&["sru-report", "noble", "-n", "-vv"]);
    assert!(cli.behavior.dry_run);
    assert_eq!(cli.behavior.verbose, 2);
    assert!(matches!(cli.command, Command::SruReport(_)));
  }

  #[test]
  fn test_cli_quiet_conflicts_with_verbose() {
    assert!(Cli::try_parse_from(["archive-admin", "-q", "-v", "version"]).is_err());
  }
}
