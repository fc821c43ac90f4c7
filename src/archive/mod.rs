//! Archive contents: versions, tag files, germinate output and the reports
//! built from them.

pub mod contents;
pub mod germinate;
pub mod tagfile;
pub mod version;

pub use contents::{BinaryIndex, SourceIndex};
pub use germinate::GerminateOutput;
pub use version::PackageVersion;
