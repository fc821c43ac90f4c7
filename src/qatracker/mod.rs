//! Client for the ISO QA tracker's XML-RPC interface.

mod client;
mod error;
pub mod models;
pub mod status;
pub mod xmlrpc;

pub use client::{HttpTransport, QaTracker, RpcTransport};
pub use error::{QaTrackerError, Result};
pub use models::{Bug, Build, Milestone, Product, Rebuild, Series, SeriesManifest, TestResult, Testcase};
pub use status::{StatusFilter, valid_id_list};
pub use xmlrpc::Value;
