//! archive-admin - Ubuntu archive administration tools
//!
//! This is the main entry point for the CLI application.

#[tokio::main]
async fn main() {
  ubuntu_archive_tools::cli::run().await;
}
