//! HTTP client implementation for the Launchpad web service.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, trace};

use super::api::{BinaryQuery, CopyRequest, LaunchpadApi, OverrideChange, SourceQuery};
use super::models::{
  Archive, BinaryPublication, Bug, BugTask, Builder, Collection, Distribution, DistroArchSeries, DistroSeries, Person,
  SourcePublication, Subscription,
};
use super::reference::{ArchiveReference, Pocket};
use crate::credentials::OAuthToken;

/// Launchpad deployments with a public web service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LaunchpadInstance {
  Production,
  Staging,
  Qastaff,
  Dogfood,
}

impl LaunchpadInstance {
  pub fn api_root(self) -> &'static str {
    match self {
      LaunchpadInstance::Production => "https://api.launchpad.net/devel/",
      LaunchpadInstance::Staging => "https://api.staging.launchpad.net/devel/",
      LaunchpadInstance::Qastaff => "https://api.qastaff.launchpad.net/devel/",
      LaunchpadInstance::Dogfood => "https://api.dogfood.paddev.net/devel/",
    }
  }
}

/// OAuth realm Launchpad expects regardless of instance.
const OAUTH_REALM: &str = "https://api.launchpad.net/";

/// Launchpad API client.
#[derive(Clone)]
pub struct LaunchpadClient {
  api_root: String,
  token: Option<OAuthToken>,
  client: reqwest::Client,
  rate_limiter: Arc<RequestRateLimiter>,
  nonce_counter: Arc<AtomicU64>,
}

/// Simple fixed-window rate limiter to cap the number of requests per interval.
#[derive(Debug)]
struct RequestRateLimiter {
  max_requests: usize,
  window: Duration,
  timestamps: Mutex<VecDeque<Instant>>,
}

impl RequestRateLimiter {
  fn new(max_requests: usize, window: Duration) -> Self {
    Self {
      max_requests,
      window,
      timestamps: Mutex::new(VecDeque::with_capacity(max_requests)),
    }
  }

  /// Wait until another request fits in the window.
  async fn acquire(&self) {
    loop {
      let mut timestamps = self.timestamps.lock().await;
      let now = Instant::now();

      while let Some(earliest) = timestamps.front()
        && now.duration_since(*earliest) >= self.window
      {
        timestamps.pop_front();
      }

      if timestamps.len() < self.max_requests {
        timestamps.push_back(now);
        return;
      }
      let Some(&earliest) = timestamps.front() else {
        return;
      };

      let wait_duration = self.window.saturating_sub(now.duration_since(earliest));
      drop(timestamps);

      if !wait_duration.is_zero() {
        sleep(wait_duration).await;
      }
    }
  }
}

impl LaunchpadClient {
  /// Create a new Launchpad client.
  ///
  /// # Arguments
  /// * `api_root` - Web service root, e.g. `https://api.launchpad.net/devel/`
  /// * `token` - OAuth token, or `None` for anonymous access
  /// * `timeout_secs` - Request timeout in seconds
  /// * `rate_limit` - Maximum requests per second
  ///
  /// # Errors
  /// Returns an error if the rate limit is zero or if the underlying
  /// `reqwest::Client` cannot be built.
  pub fn new(
    api_root: impl Into<String>,
    token: Option<OAuthToken>,
    timeout_secs: u64,
    rate_limit: usize,
  ) -> Result<Self> {
    if rate_limit == 0 {
      return Err(anyhow!("Rate limit must be at least 1 request per second"));
    }

    let mut api_root = api_root.into();
    if !api_root.ends_with('/') {
      api_root.push('/');
    }

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout_secs))
      .user_agent(format!(
        "archive-admin/{} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("TARGET")
      ))
      .build()
      .context("Failed to create HTTP client")?;

    Ok(Self {
      api_root,
      token,
      client,
      rate_limiter: Arc::new(RequestRateLimiter::new(rate_limit, Duration::from_secs(1))),
      nonce_counter: Arc::new(AtomicU64::new(0)),
    })
  }

  pub fn is_anonymous(&self) -> bool {
    self.token.is_none()
  }

  /// Absolute URL for a link or a path relative to the service root.
  fn resolve(&self, link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
      link.to_string()
    } else {
      format!("{}{}", self.api_root, link.trim_start_matches('/'))
    }
  }

  /// OAuth 1.0 PLAINTEXT `Authorization` header value.
  fn auth_header(&self) -> Option<String> {
    let token = self.token.as_ref()?;
    let timestamp = SystemTime::now()
      .duration_since(UNIX_EPOCH)
      .map(|d| d.as_secs())
      .unwrap_or_default();
    let nonce = format!(
      "{}{}",
      SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or_default(),
      self.nonce_counter.fetch_add(1, Ordering::Relaxed)
    );
    Some(oauth_header(token, timestamp, &nonce))
  }

  fn request(&self, method: Method, url: &str) -> RequestBuilder {
    let mut builder = self
      .client
      .request(method, url)
      .header("Accept", "application/json");
    // Only the web service gets the token; librarian URLs are public.
    if url.starts_with(&self.api_root)
      && let Some(header) = self.auth_header()
    {
      builder = builder.header("Authorization", header);
    }
    builder
  }

  async fn send(&self, builder: RequestBuilder, what: &str) -> Result<Response> {
    self.rate_limiter.acquire().await;
    let response = builder
      .send()
      .await
      .with_context(|| format!("Failed to send request to Launchpad ({what})"))?;
    ensure_success(response, what).await
  }

  async fn get_json<T: DeserializeOwned>(&self, link: &str, query: &[(&str, String)]) -> Result<T> {
    let url = self.resolve(link);
    trace!("GET {url} {query:?}");
    let response = self
      .send(self.request(Method::GET, &url).query(query), &url)
      .await?;
    response
      .json()
      .await
      .with_context(|| format!("Failed to parse Launchpad response from {url}"))
  }

  /// Fetch every page of a collection.
  async fn get_collection<T: DeserializeOwned>(&self, link: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
    let mut page: Collection<T> = self.get_json(link, query).await?;
    let mut entries = std::mem::take(&mut page.entries);

    while let Some(next) = page.next_collection_link.take() {
      debug!("Following collection page {next}");
      // The next link already carries the original query.
      page = self.get_json(&next, &[]).await?;
      entries.append(&mut page.entries);
    }

    Ok(entries)
  }

  async fn named_get<T: DeserializeOwned>(&self, link: &str, op: &str, params: &[(&str, String)]) -> Result<T> {
    let mut query = vec![("ws.op", op.to_string())];
    query.extend(params.iter().cloned());
    self.get_json(link, &query).await
  }

  async fn named_get_collection<T: DeserializeOwned>(
    &self,
    link: &str,
    op: &str,
    params: &[(&str, String)],
  ) -> Result<Vec<T>> {
    let mut query = vec![("ws.op", op.to_string())];
    query.extend(params.iter().cloned());
    self.get_collection(link, &query).await
  }

  async fn named_post(&self, link: &str, op: &str, params: &[(&str, String)]) -> Result<Response> {
    let url = self.resolve(link);
    let mut form = vec![("ws.op", op.to_string())];
    form.extend(params.iter().cloned());
    debug!("POST {url} ws.op={op}");
    self
      .send(self.request(Method::POST, &url).form(&form), &format!("{op} on {url}"))
      .await
  }

  async fn patch(&self, link: &str, body: serde_json::Value) -> Result<()> {
    let url = self.resolve(link);
    debug!("PATCH {url} {body}");
    self.send(self.request(Method::PATCH, &url).json(&body), &url).await?;
    Ok(())
  }

  async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
    let full_url = self.resolve(url);
    let response = self.send(self.request(Method::GET, &full_url), &full_url).await?;
    let bytes = response
      .bytes()
      .await
      .with_context(|| format!("Failed to read response body from {full_url}"))?;
    Ok(bytes.to_vec())
  }
}

async fn ensure_success(response: Response, what: &str) -> Result<Response> {
  let status = response.status();
  if status.is_success() {
    return Ok(response);
  }

  let error_text = response
    .text()
    .await
    .unwrap_or_else(|_| String::from("(no error details)"));
  match status {
    StatusCode::UNAUTHORIZED => Err(anyhow!(
      "Launchpad rejected the credentials ({what}): {status} {error_text}"
    )),
    _ => Err(anyhow!("Launchpad API returned error {status} for {what}: {error_text}")),
  }
}

fn push_opt(params: &mut Vec<(&'static str, String)>, key: &'static str, value: Option<&str>) {
  if let Some(value) = value {
    params.push((key, value.to_string()));
  }
}

fn flag(value: bool) -> String {
  value.to_string()
}

#[async_trait]
impl LaunchpadApi for LaunchpadClient {
  fn api_root(&self) -> &str {
    &self.api_root
  }

  async fn me(&self) -> Result<Person> {
    if self.is_anonymous() {
      return Err(anyhow!("Anonymous access has no associated person"));
    }
    self.get_json("people/+me", &[]).await
  }

  async fn get_person(&self, name: &str) -> Result<Person> {
    self.get_json(&format!("~{name}"), &[]).await
  }

  async fn get_bug(&self, id: u64) -> Result<Bug> {
    self
      .get_json(&format!("bugs/{id}"), &[])
      .await
      .with_context(|| format!("Failed to fetch LP: #{id}"))
  }

  async fn get_bug_tasks(&self, bug: &Bug) -> Result<Vec<BugTask>> {
    self.get_collection(&bug.bug_tasks_collection_link, &[]).await
  }

  async fn get_bug_subscriptions(&self, bug: &Bug) -> Result<Vec<Subscription>> {
    self.get_collection(&bug.subscriptions_collection_link, &[]).await
  }

  async fn set_bug_task_status(&self, task: &BugTask, status: &str) -> Result<()> {
    self.patch(&task.self_link, json!({ "status": status })).await
  }

  async fn add_bug_task(&self, bug: &Bug, target_link: &str) -> Result<BugTask> {
    let target = self.resolve(target_link);
    let response = self.named_post(&bug.self_link, "addTask", &[("target", target)]).await?;
    let location = response
      .headers()
      .get(reqwest::header::LOCATION)
      .and_then(|value| value.to_str().ok())
      .map(str::to_string)
      .ok_or_else(|| anyhow!("Launchpad did not return the new task location"))?;
    self.get_json(&location, &[]).await
  }

  async fn subscribe_to_bug(&self, bug: &Bug, person: &Person) -> Result<()> {
    self
      .named_post(&bug.self_link, "subscribe", &[("person", person.self_link.clone())])
      .await?;
    Ok(())
  }

  async fn set_bug_tags(&self, bug: &Bug, tags: &[String]) -> Result<()> {
    self.patch(&bug.self_link, json!({ "tags": tags })).await
  }

  async fn add_bug_message(&self, bug: &Bug, subject: &str, content: &str) -> Result<()> {
    self
      .named_post(
        &bug.self_link,
        "newMessage",
        &[("subject", subject.to_string()), ("content", content.to_string())],
      )
      .await?;
    Ok(())
  }

  async fn get_archive(&self, reference: &ArchiveReference) -> Result<Archive> {
    let archive: Option<Archive> = self
      .named_get(
        "archives",
        "getByReference",
        &[("reference", reference.launchpad_reference())],
      )
      .await?;
    archive.ok_or_else(|| anyhow!("Archive '{reference}' not found"))
  }

  async fn get_series(&self, distribution: &str, series: &str) -> Result<DistroSeries> {
    self
      .get_json(&format!("{distribution}/{series}"), &[])
      .await
      .with_context(|| format!("Unknown series '{series}' in {distribution}"))
  }

  async fn get_development_series(&self, distribution: &str) -> Result<DistroSeries> {
    let distro: Distribution = self.get_json(distribution, &[]).await?;
    let link = distro
      .current_series_link
      .ok_or_else(|| anyhow!("{distribution} has no current series"))?;
    self.get_json(&link, &[]).await
  }

  async fn get_published_sources(&self, archive: &Archive, query: &SourceQuery) -> Result<Vec<SourcePublication>> {
    let mut params = Vec::new();
    push_opt(&mut params, "source_name", query.source_name.as_deref());
    push_opt(&mut params, "version", query.version.as_deref());
    push_opt(&mut params, "distro_series", query.distro_series_link.as_deref());
    push_opt(&mut params, "pocket", query.pocket.map(Pocket::as_str));
    push_opt(&mut params, "status", query.status.as_deref());
    if query.exact_match {
      params.push(("exact_match", flag(true)));
    }
    self
      .named_get_collection(&archive.self_link, "getPublishedSources", &params)
      .await
  }

  async fn get_published_binaries(&self, archive: &Archive, query: &BinaryQuery) -> Result<Vec<BinaryPublication>> {
    let mut params = Vec::new();
    push_opt(&mut params, "binary_name", query.binary_name.as_deref());
    push_opt(&mut params, "version", query.version.as_deref());
    push_opt(&mut params, "distro_arch_series", query.distro_arch_series_link.as_deref());
    push_opt(&mut params, "pocket", query.pocket.map(Pocket::as_str));
    push_opt(&mut params, "status", query.status.as_deref());
    if query.exact_match {
      params.push(("exact_match", flag(true)));
    }
    self
      .named_get_collection(&archive.self_link, "getPublishedBinaries", &params)
      .await
  }

  async fn get_publication_binaries(&self, publication: &SourcePublication) -> Result<Vec<BinaryPublication>> {
    self
      .named_get_collection(&publication.self_link, "getPublishedBinaries", &[])
      .await
  }

  async fn copy_package(&self, destination: &Archive, request: &CopyRequest) -> Result<()> {
    let mut params = vec![
      ("source_name", request.source_name.clone()),
      ("version", request.version.clone()),
      ("from_archive", self.resolve(&request.from_archive_link)),
      ("to_pocket", request.to_pocket.as_str().to_string()),
      ("include_binaries", flag(request.include_binaries)),
      ("unembargo", flag(request.unembargo)),
      ("auto_approve", flag(request.auto_approve)),
    ];
    push_opt(&mut params, "to_series", request.to_series.as_deref());
    self
      .named_post(&destination.self_link, "copyPackage", &params)
      .await
      .with_context(|| format!("Failed to copy {} {}", request.source_name, request.version))?;
    Ok(())
  }

  async fn request_deletion(&self, publication_link: &str, comment: &str) -> Result<()> {
    self
      .named_post(publication_link, "requestDeletion", &[("removal_comment", comment.to_string())])
      .await?;
    Ok(())
  }

  async fn change_override(&self, publication_link: &str, change: &OverrideChange) -> Result<()> {
    let mut params = Vec::new();
    push_opt(&mut params, "new_component", change.component.as_deref());
    push_opt(&mut params, "new_section", change.section.as_deref());
    push_opt(&mut params, "new_priority", change.priority.as_deref());
    self.named_post(publication_link, "changeOverride", &params).await?;
    Ok(())
  }

  async fn changes_file_url(&self, publication: &SourcePublication) -> Result<Option<String>> {
    self.named_get(&publication.self_link, "changesFileUrl", &[]).await
  }

  async fn fetch_text(&self, url: &str) -> Result<String> {
    let bytes = self.fetch_bytes(url).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
  }

  async fn get_builders(&self) -> Result<Vec<Builder>> {
    self.get_collection("builders", &[]).await
  }

  async fn set_builder_manual(&self, builder: &Builder, manual: bool) -> Result<()> {
    self.patch(&builder.self_link, json!({ "manual": manual })).await
  }

  async fn set_builder_active(&self, builder: &Builder, active: bool) -> Result<()> {
    self.patch(&builder.self_link, json!({ "active": active })).await
  }

  async fn get_distro_arch_series(&self, series: &DistroSeries, architecture: &str) -> Result<DistroArchSeries> {
    self
      .get_json(&format!("{}/{architecture}", series.self_link.trim_end_matches('/')), &[])
      .await
      .with_context(|| format!("Unknown architecture '{architecture}' in {}", series.name))
  }

  async fn chroot_url(&self, das: &DistroArchSeries, pocket: Pocket, image_type: &str) -> Result<Option<String>> {
    self
      .named_get(
        &das.self_link,
        "getChrootURL",
        &[
          ("pocket", pocket.as_str().to_string()),
          ("image_type", image_type.to_string()),
        ],
      )
      .await
  }

  async fn remove_chroot(&self, das: &DistroArchSeries, pocket: Pocket, image_type: &str) -> Result<()> {
    self
      .named_post(
        &das.self_link,
        "removeChroot",
        &[
          ("pocket", pocket.as_str().to_string()),
          ("image_type", image_type.to_string()),
        ],
      )
      .await?;
    Ok(())
  }

  async fn set_chroot(
    &self,
    das: &DistroArchSeries,
    pocket: Pocket,
    image_type: &str,
    data: Vec<u8>,
    sha1sum: &str,
  ) -> Result<()> {
    let url = self.resolve(&das.self_link);
    let data = Part::bytes(data)
      .file_name("chroot.tar.gz")
      .mime_str("application/octet-stream")?;
    let form = Form::new()
      .text("ws.op", "setChroot")
      .text("sha1sum", sha1sum.to_string())
      .text("pocket", pocket.as_str().to_string())
      .text("image_type", image_type.to_string())
      .part("data", data);
    debug!("POST {url} ws.op=setChroot sha1sum={sha1sum}");
    self
      .send(self.request(Method::POST, &url).multipart(form), &format!("setChroot on {url}"))
      .await?;
    Ok(())
  }

  async fn download(&self, url: &str, output_path: &Path) -> Result<()> {
    let bytes = self.fetch_bytes(url).await?;

    if let Some(parent) = output_path.parent()
      && !parent.as_os_str().is_empty()
    {
      tokio::fs::create_dir_all(parent)
        .await
        .context("Failed to create output directory")?;
    }

    tokio::fs::write(output_path, bytes)
      .await
      .with_context(|| format!("Failed to write {}", output_path.display()))?;

    Ok(())
  }
}

/// Percent-encode per RFC 3986, as OAuth requires.
fn oauth_escape(value: &str) -> String {
  let mut out = String::with_capacity(value.len());
  for byte in value.bytes() {
    if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
      out.push(char::from(byte));
    } else {
      out.push_str(&format!("%{byte:02X}"));
    }
  }
  out
}

fn oauth_header(token: &OAuthToken, timestamp: u64, nonce: &str) -> String {
  let signature = format!(
    "{}&{}",
    oauth_escape(&token.consumer_secret),
    oauth_escape(&token.access_secret)
  );
  format!(
    "OAuth realm=\"{OAUTH_REALM}\", oauth_consumer_key=\"{}\", oauth_token=\"{}\", \
     oauth_signature_method=\"PLAINTEXT\", oauth_signature=\"{}\", oauth_timestamp=\"{timestamp}\", \
     oauth_nonce=\"{nonce}\", oauth_version=\"1.0\"",
    oauth_escape(&token.consumer_key),
    oauth_escape(&token.access_token),
    oauth_escape(&signature),
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  fn token() -> OAuthToken {
    OAuthToken {
      consumer_key: "System-wide: Ubuntu (host)".to_string(),
      consumer_secret: String::new(),
      access_token: "tok123".to_string(),
      access_secret: "s3cr3t".to_string(),
    }
  }

  #[test]
  fn new_normalises_api_root() {
    let client = LaunchpadClient::new("https://api.staging.launchpad.net/devel", None, 30, 5).unwrap();
    assert_eq!(client.api_root(), "https://api.staging.launchpad.net/devel/");
    assert!(client.is_anonymous());
  }

  #[test]
  fn new_rejects_zero_rate_limit() {
    assert!(LaunchpadClient::new(LaunchpadInstance::Production.api_root(), None, 30, 0).is_err());
  }

  #[test]
  fn resolve_handles_relative_and_absolute_links() {
    let client = LaunchpadClient::new(LaunchpadInstance::Production.api_root(), None, 30, 5).unwrap();
    assert_eq!(client.resolve("bugs/1"), "https://api.launchpad.net/devel/bugs/1");
    assert_eq!(client.resolve("/~ubuntu-sru"), "https://api.launchpad.net/devel/~ubuntu-sru");
    assert_eq!(
      client.resolve("https://launchpad.net/ubuntu/+archive/primary/+files/x.changes"),
      "https://launchpad.net/ubuntu/+archive/primary/+files/x.changes"
    );
  }

  #[test]
  fn instance_roots() {
    assert_eq!(
      LaunchpadInstance::Dogfood.api_root(),
      "https://api.dogfood.paddev.net/devel/"
    );
    assert_eq!(
      LaunchpadInstance::Qastaff.api_root(),
      "https://api.qastaff.launchpad.net/devel/"
    );
  }

  #[test]
  fn oauth_header_uses_plaintext_signature() {
    let header = oauth_header(&token(), 1_700_000_000, "42");
    assert!(header.starts_with("OAuth realm=\"https://api.launchpad.net/\""));
    assert!(header.contains("oauth_consumer_key=\"System-wide%3A%20Ubuntu%20%28host%29\""));
    assert!(header.contains("oauth_token=\"tok123\""));
    assert!(header.contains("oauth_signature_method=\"PLAINTEXT\""));
    assert!(header.contains("oauth_signature=\"%26s3cr3t\""));
    assert!(header.contains("oauth_timestamp=\"1700000000\""));
    assert!(header.contains("oauth_nonce=\"42\""));
  }

  #[test]
  fn auth_header_only_with_token() {
    let anonymous = LaunchpadClient::new(LaunchpadInstance::Production.api_root(), None, 30, 5).unwrap();
    assert!(anonymous.auth_header().is_none());

    let authed = LaunchpadClient::new(LaunchpadInstance::Production.api_root(), Some(token()), 30, 5).unwrap();
    let first = authed.auth_header().unwrap();
    let second = authed.auth_header().unwrap();
    assert_ne!(first, second, "nonces must differ between requests");
  }

  #[test]
  fn oauth_escape_keeps_unreserved() {
    assert_eq!(oauth_escape("a-b.c_d~e"), "a-b.c_d~e");
    assert_eq!(oauth_escape("a b&c"), "a%20b%26c");
  }

  #[tokio::test]
  async fn rate_limiter_throttles_requests() {
    let limiter = RequestRateLimiter::new(2, Duration::from_secs(1));
    let start = Instant::now();

    limiter.acquire().await;
    limiter.acquire().await;
    limiter.acquire().await;

    assert!(
      start.elapsed() >= Duration::from_millis(900),
      "expected at least 900ms elapsed, got {:?}",
      start.elapsed()
    );
  }
}
