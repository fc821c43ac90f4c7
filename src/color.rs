//! Color utilities for terminal output
//!
//! Reports and prompts style their text through [`ColorScheme`], which honors
//! `--color` and falls back to plain text when stdout is not a terminal.

use std::fmt::Display;
use std::io::IsTerminal;

use owo_colors::{OwoColorize, Style};

use crate::cli::ColorOption;

const SUCCESS: Style = Style::new().green();
const ERROR: Style = Style::new().bright_red().bold();
const WARNING: Style = Style::new().yellow();
const INFO: Style = Style::new().cyan();
const EMPHASIS: Style = Style::new().bright_white().bold();
const LINK: Style = Style::new().blue().underline();
const PATH: Style = Style::new().magenta();
const NUMBER: Style = Style::new().bright_blue();
const CODE: Style = Style::new().bright_green();
const DIMMED: Style = Style::new().dimmed();
const PROGRESS: Style = Style::new().bright_cyan();

/// Semantic styles for command output.
pub struct ColorScheme {
  enabled: bool,
}

impl ColorScheme {
  pub fn new(color_option: ColorOption) -> Self {
    let enabled = match color_option {
      ColorOption::Always => true,
      ColorOption::Never => false,
      ColorOption::Auto => std::io::stdout().is_terminal(),
    };
    Self { enabled }
  }

  pub fn is_enabled(&self) -> bool {
    self.enabled
  }

  fn paint<T: Display>(&self, text: T, style: Style) -> String {
    if self.enabled {
      text.style(style).to_string()
    } else {
      text.to_string()
    }
  }

  /// Completed actions (green)
  pub fn success<T: Display>(&self, text: T) -> String {
    self.paint(text, SUCCESS)
  }

  /// Failures (bold bright red)
  pub fn error<T: Display>(&self, text: T) -> String {
    self.paint(text, ERROR)
  }

  pub fn warning<T: Display>(&self, text: T) -> String {
    self.paint(text, WARNING)
  }

  pub fn info<T: Display>(&self, text: T) -> String {
    self.paint(text, INFO)
  }

  /// Package names and headings
  pub fn emphasis<T: Display>(&self, text: T) -> String {
    self.paint(text, EMPHASIS)
  }

  pub fn link<T: Display>(&self, text: T) -> String {
    self.paint(text, LINK)
  }

  pub fn path<T: Display>(&self, text: T) -> String {
    self.paint(text, PATH)
  }

  /// Versions, bug numbers and counts
  pub fn number<T: Display>(&self, text: T) -> String {
    self.paint(text, NUMBER)
  }

  /// Commands the user can run
  pub fn code<T: Display>(&self, text: T) -> String {
    self.paint(text, CODE)
  }

  pub fn dimmed<T: Display>(&self, text: T) -> String {
    self.paint(text, DIMMED)
  }

  pub fn progress<T: Display>(&self, text: T) -> String {
    self.paint(text, PROGRESS)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn never_leaves_text_untouched() {
    let scheme = ColorScheme::new(ColorOption::Never);
    assert!(!scheme.is_enabled());
    assert_eq!(scheme.success("Copied"), "Copied");
    assert_eq!(scheme.number(42), "42");
    assert_eq!(scheme.error("✗"), "✗");
  }

  #[test]
  fn always_adds_escape_codes() {
    let scheme = ColorScheme::new(ColorOption::Always);
    assert!(scheme.is_enabled());
    for styled in [
      scheme.success("x"),
      scheme.error("x"),
      scheme.warning("x"),
      scheme.info("x"),
      scheme.emphasis("x"),
      scheme.link("x"),
      scheme.path("x"),
      scheme.number("x"),
      scheme.code("x"),
      scheme.dimmed("x"),
      scheme.progress("x"),
    ] {
      assert!(styled.starts_with("\u{1b}["), "{styled:?}");
      assert!(styled.contains('x'));
    }
  }
}
