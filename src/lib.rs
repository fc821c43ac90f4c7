//! Ubuntu archive administration library
//!
//! Reusable pieces behind the `archive-admin` tools: the Launchpad client,
//! archive tag-file analysis, kernel-series routing, the SRU workflows and
//! the ISO QA tracker client.

pub mod archive;
pub mod charts;
pub mod cli;
pub mod color;
pub mod commands;
pub mod credentials;
pub mod ini;
pub mod isotracker;
pub mod kernel;
pub mod launchpad;
pub mod qatracker;
pub mod sru;
