//! Launchpad web service access: the API trait, the HTTP client, data models
//! and parsing of archive references.

pub mod api;
pub mod client;
pub mod models;
pub mod reference;

pub use api::{BinaryQuery, CopyRequest, LaunchpadApi, OverrideChange, SourceQuery};
pub use client::{LaunchpadClient, LaunchpadInstance};
pub use models::{
  Archive, BinaryPublication, Bug, BugTask, Builder, Collection, Distribution, DistroArchSeries, DistroSeries, Person,
  SourcePublication, Subscription,
};
pub use reference::{ArchiveReference, Pocket, Suite};
