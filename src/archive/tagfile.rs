//! Debian tag files: `Packages`, `Sources` and `.changes` documents.
//!
//! A tag file is a sequence of paragraphs separated by blank lines. Each
//! paragraph holds `Field: value` lines; lines starting with a space
//! continue the previous field. Parsing is done by `debian_packaging`; this
//! module adds signature stripping, `.gz` input and the package filtering the
//! archive reports need.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use debian_packaging::control::{ControlParagraph, ControlParagraphReader};
use debian_packaging::error::DebianError;
use flate2::read::GzDecoder;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TagFileError {
  #[error("I/O error reading tag file: {0}")]
  Io(#[from] io::Error),

  #[error("malformed tag file: {0}")]
  Parse(#[from] DebianError),
}

pub type Result<T> = std::result::Result<T, TagFileError>;

/// One paragraph (stanza) of a tag file.
///
/// Field lookups are case-insensitive, matching apt.
#[derive(Debug, Clone)]
pub struct Paragraph(ControlParagraph<'static>);

impl Paragraph {
  pub fn field(&self, name: &str) -> Option<&str> {
    self.0.field_str(name)
  }

  pub fn has_field(&self, name: &str) -> bool {
    self.0.has_field(name)
  }

  /// Whitespace separated words of a field, across continuation lines.
  pub fn field_words(&self, name: &str) -> Vec<&str> {
    self
      .field(name)
      .map(|v| v.split_ascii_whitespace().collect())
      .unwrap_or_default()
  }

  /// Comma separated entries of a field such as `Binary` or `Depends`.
  pub fn field_list(&self, name: &str) -> Vec<&str> {
    self
      .field(name)
      .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
      .unwrap_or_default()
  }

  /// The `Package` field, which names the paragraph in Packages and Sources.
  pub fn package(&self) -> Option<&str> {
    self.field("Package")
  }
}

impl From<ControlParagraph<'static>> for Paragraph {
  fn from(paragraph: ControlParagraph<'static>) -> Self {
    Self(paragraph)
  }
}

/// Iterate over the paragraphs of a buffered reader.
pub fn paragraphs<R: BufRead>(reader: R) -> impl Iterator<Item = Result<Paragraph>> {
  ControlParagraphReader::new(reader).map(|paragraph| -> Result<Paragraph> { Ok(Paragraph::from(paragraph?)) })
}

/// Parse in-memory tag file content.
///
/// An inline OpenPGP signature wrapper, as found on `.changes` files, is
/// stripped first.
pub fn parse_str(content: &str) -> Result<Vec<Paragraph>> {
  paragraphs(strip_signature(content).as_bytes()).collect()
}

/// Remove the clearsign armor around a signed document, if present.
pub fn strip_signature(content: &str) -> &str {
  const BEGIN: &str = "-----BEGIN PGP SIGNED MESSAGE-----";
  const SIGNATURE: &str = "-----BEGIN PGP SIGNATURE-----";

  let Some(after_begin) = content.trim_start().strip_prefix(BEGIN) else {
    return content;
  };

  // Armor headers (e.g. `Hash: SHA512`) end at the first blank line.
  let body = match after_begin.find("\n\n") {
    Some(pos) => &after_begin[pos + 2..],
    None => after_begin,
  };

  match body.find(SIGNATURE) {
    Some(pos) => &body[..pos],
    None => body,
  }
}

/// Open a tag file for reading, decompressing `.gz` files on the fly.
pub fn open_tag_file(path: &Path) -> Result<Box<dyn BufRead>> {
  let file = File::open(path)?;
  let is_gzip = path.extension().is_some_and(|ext| ext == "gz");
  debug!("Opening tag file {} (gzip: {is_gzip})", path.display());

  if is_gzip {
    Ok(Box::new(BufReader::new(GzDecoder::new(file))))
  } else {
    Ok(Box::new(BufReader::new(file)))
  }
}

/// Read the package paragraphs of a tag file.
///
/// Paragraphs without a `Package` field are skipped. When `pkg` is given only
/// that package is returned. When consecutive paragraphs describe the same
/// package only the last one of the run is kept.
pub fn read_tag_file(path: &Path, pkg: Option<&str>) -> Result<Vec<Paragraph>> {
  let mut kept = Vec::new();
  let mut previous: Option<Paragraph> = None;

  for paragraph in paragraphs(open_tag_file(path)?) {
    let paragraph = paragraph?;
    let Some(name) = paragraph.package() else {
      continue;
    };
    if pkg.is_some_and(|wanted| wanted != name) {
      continue;
    }

    if let Some(prev) = previous.take()
      && prev.package() != Some(name)
    {
      kept.push(prev);
    }
    previous = Some(paragraph);
  }

  kept.extend(previous);
  Ok(kept)
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use flate2::Compression;
  use flate2::write::GzEncoder;
  use tempfile::tempdir;

  use super::*;

  const PACKAGES: &str = "\
Package: hello
Version: 2.10-2
Architecture: amd64
Section: devel
Priority: optional
Description: example package
 based on GNU hello
 .
 second paragraph

Package: hello
Version: 2.10-3
Architecture: amd64
Section: devel

Package: zsh
Version: 5.9-6
Source: zsh (5.9-6)
Architecture: amd64
Section: universe/shells

Comment: this paragraph has no package
";

  #[test]
  fn parses_fields_and_continuations() {
    let paragraphs = parse_str(PACKAGES).unwrap();
    assert_eq!(paragraphs.len(), 4);

    let hello = &paragraphs[0];
    assert_eq!(hello.field("package"), Some("hello"));
    assert_eq!(hello.field("VERSION"), Some("2.10-2"));
    assert_eq!(
      hello.field("Description").map(|d| d.lines().map(str::trim).collect::<Vec<_>>()),
      Some(vec!["example package", "based on GNU hello", ".", "second paragraph"])
    );
    assert!(!hello.has_field("Source"));
  }

  #[test]
  fn field_list_splits_on_commas() {
    let paragraphs = parse_str("Package: src\nBinary: a, b,\n c\n").unwrap();
    assert_eq!(paragraphs[0].field_list("Binary"), vec!["a", "b", "c"]);
    assert_eq!(paragraphs[0].field_words("Binary"), vec!["a,", "b,", "c"]);
  }

  #[test]
  fn rejects_line_without_colon() {
    let err = parse_str("Package: a\nbogus line\n").unwrap_err();
    assert!(matches!(err, TagFileError::Parse(_)), "{err}");
  }

  #[test]
  fn strips_clearsign_armor() {
    let signed = "-----BEGIN PGP SIGNED MESSAGE-----\nHash: SHA512\n\nFormat: 1.8\nSource: hello\nLaunchpad-Bugs-Fixed: 123 456\n-----BEGIN PGP SIGNATURE-----\n\nabcdef\n-----END PGP SIGNATURE-----\n";
    let paragraphs = parse_str(signed).unwrap();
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].field_words("Launchpad-Bugs-Fixed"), vec!["123", "456"]);
  }

  #[test]
  fn read_tag_file_keeps_last_of_consecutive_duplicates() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Packages");
    std::fs::write(&path, PACKAGES).unwrap();

    let paragraphs = read_tag_file(&path, None).unwrap();
    let names: Vec<_> = paragraphs.iter().filter_map(Paragraph::package).collect();
    assert_eq!(names, vec!["hello", "zsh"]);
    assert_eq!(paragraphs[0].field("Version"), Some("2.10-3"));
  }

  #[test]
  fn read_tag_file_filters_package_and_decompresses() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Packages.gz");
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(PACKAGES.as_bytes()).unwrap();
    std::fs::write(&path, encoder.finish().unwrap()).unwrap();

    let paragraphs = read_tag_file(&path, Some("zsh")).unwrap();
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].field("Section"), Some("universe/shells"));
  }
}
