//! `archive-admin completions <shell>`: print a completion script to stdout.

use std::io;

use clap::CommandFactory;
use clap_complete::{Shell as CompletionShell, generate};

use crate::cli::{Cli, Shell};

impl From<Shell> for CompletionShell {
  fn from(shell: Shell) -> Self {
    match shell {
      Shell::Bash => CompletionShell::Bash,
      Shell::Zsh => CompletionShell::Zsh,
      Shell::Fish => CompletionShell::Fish,
      Shell::Powershell => CompletionShell::PowerShell,
      Shell::Elvish => CompletionShell::Elvish,
    }
  }
}

pub(crate) fn handle_completions_command(shell: Shell) {
  let mut cmd = Cli::command();
  let bin_name = cmd.get_name().to_string();
  generate(CompletionShell::from(shell), &mut cmd, bin_name, &mut io::stdout());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bash_script_names_subcommands() {
    let mut cmd = Cli::command();
    let mut out = Vec::new();
    generate(CompletionShell::Bash, &mut cmd, "archive-admin", &mut out);
    let script = String::from_utf8(out).unwrap();
    assert!(script.contains("copy-package"));
    assert!(script.contains("sru-accept"));
  }
}
