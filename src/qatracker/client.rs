use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::error::{QaTrackerError, Result};
use super::models::{
  Bug, Build, FromRecord, Milestone, Product, Rebuild, Series, SeriesManifest, TestResult, Testcase, records,
};
use super::status::{
  BUILD_MILESTONE_STATUS, MILESTONE_SERIES_MANIFEST_STATUS, MILESTONE_SERIES_STATUS, MILESTONE_STATUS,
  PRODUCT_STATUS, REBUILD_STATUS, RESULT_RESULT, RESULT_STATUS, StatusFilter, TESTCASE_STATUS, valid_id_list,
};
use super::xmlrpc::{Value, decode_response, encode_call};

/// Carries one XML-RPC call. Implemented over HTTP by [`HttpTransport`] and
/// by fakes in tests.
#[async_trait]
pub trait RpcTransport: Send + Sync {
  async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value>;
}

pub struct HttpTransport {
  url: String,
  client: Client,
  auth: Option<(String, String)>,
}

impl HttpTransport {
  /// Basic auth is only sent when both username and password are non-empty.
  pub fn new(url: &str, username: Option<&str>, password: Option<&str>, timeout_secs: u64) -> Result<Self> {
    let client = Client::builder()
      .user_agent(format!("archive-admin/{}", env!("CARGO_PKG_VERSION")))
      .timeout(Duration::from_secs(timeout_secs))
      .build()?;

    let auth = match (username, password) {
      (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Some((user.to_string(), pass.to_string())),
      _ => None,
    };

    Ok(Self {
      url: url.to_string(),
      client,
      auth,
    })
  }
}

#[async_trait]
impl RpcTransport for HttpTransport {
  async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
    debug!("XML-RPC {method} -> {}", self.url);
    let mut request = self
      .client
      .post(&self.url)
      .header(reqwest::header::CONTENT_TYPE, "text/xml")
      .body(encode_call(method, &params));
    if let Some((user, pass)) = &self.auth {
      request = request.basic_auth(user, Some(pass));
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
      return Err(QaTrackerError::Status {
        status: status.as_u16(),
      });
    }
    decode_response(&response.text().await?)
  }
}

/// A connected tracker session.
pub struct QaTracker {
  transport: Box<dyn RpcTransport>,
  access: Option<String>,
}

impl QaTracker {
  /// Connect over HTTP.
  pub async fn connect(url: &str, username: Option<&str>, password: Option<&str>, timeout_secs: u64) -> Result<Self> {
    let transport = HttpTransport::new(url, username, password, timeout_secs)?;
    Self::with_transport(Box::new(transport)).await
  }

  /// Probe the endpoint with `system.listMethods`, then fetch the session's
  /// access level.
  pub async fn with_transport(transport: Box<dyn RpcTransport>) -> Result<Self> {
    transport.call("system.listMethods", Vec::new()).await?;
    let access = match transport.call("qatracker.get_access", Vec::new()).await? {
      Value::Nil => None,
      value => Some(value.to_text()),
    };
    debug!("QA tracker access: {access:?}");
    Ok(Self { transport, access })
  }

  /// `None` when the tracker does not report an access level.
  pub fn access(&self) -> Option<&str> {
    self.access.as_deref()
  }

  fn require(&self, required: &'static str) -> Result<()> {
    let allowed: &[&str] = if required == "admin" { &["admin"] } else { &["user", "admin"] };
    match &self.access {
      Some(access) if !allowed.contains(&access.as_str()) => Err(QaTrackerError::AccessDenied {
        required,
        actual: access.clone(),
      }),
      _ => Ok(()),
    }
  }

  async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value> {
    self.transport.call(method, params).await
  }

  async fn list<T: FromRecord>(&self, method: &str, params: Vec<Value>) -> Result<Vec<T>> {
    records(&self.call(method, params).await?)
  }

  async fn confirm(&self, method: &str, params: Vec<Value>, action: &'static str) -> Result<()> {
    match self.call(method, params).await? {
      Value::Bool(true) => Ok(()),
      _ => Err(QaTrackerError::Rejected(action)),
    }
  }

  /// Every bug reported on the site.
  pub async fn get_bugs(&self) -> Result<Vec<Bug>> {
    self.list("qatracker.bugs.get_list", vec![Value::Int(0)]).await
  }

  pub async fn get_milestones(&self, status: Option<&[StatusFilter<'_>]>) -> Result<Vec<Milestone>> {
    let filter = valid_id_list(MILESTONE_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self.list("qatracker.milestones.get_list", vec![filter.into()]).await
  }

  pub async fn get_products(&self, status: Option<&[StatusFilter<'_>]>) -> Result<Vec<Product>> {
    let filter = valid_id_list(PRODUCT_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self.list("qatracker.products.get_list", vec![filter.into()]).await
  }

  pub async fn get_rebuilds(&self, status: Option<&[StatusFilter<'_>]>) -> Result<Vec<Rebuild>> {
    let filter = valid_id_list(REBUILD_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self.list("qatracker.rebuilds.get_list", vec![filter.into()]).await
  }

  pub async fn get_series(&self, status: Option<&[StatusFilter<'_>]>) -> Result<Vec<Series>> {
    let filter = valid_id_list(MILESTONE_SERIES_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self.list("qatracker.series.get_list", vec![filter.into()]).await
  }

  /// Bugs linked to a milestone.
  pub async fn milestone_bugs(&self, milestone: &Milestone) -> Result<Vec<Bug>> {
    self
      .list("qatracker.bugs.get_list", vec![Value::Int(milestone.id.unwrap_or_default())])
      .await
  }

  pub async fn milestone_builds(&self, milestone: &Milestone, status: Option<&[StatusFilter<'_>]>) -> Result<Vec<Build>> {
    let filter = valid_id_list(BUILD_MILESTONE_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self
      .list(
        "qatracker.builds.get_list",
        vec![Value::Int(milestone.id.unwrap_or_default()), filter.into()],
      )
      .await
  }

  /// Post a build of `product` to an active milestone. Returns the new build
  /// as listed by the tracker afterwards, if it shows up.
  pub async fn add_build(
    &self,
    milestone: &Milestone,
    product: &Product,
    version: &str,
    note: &str,
    notify: bool,
  ) -> Result<Option<Build>> {
    if milestone.status != Some(0) {
      return Err(QaTrackerError::Inactive("milestones"));
    }
    self.require("admin")?;
    if product.status != Some(0) {
      return Err(QaTrackerError::Inactive("products"));
    }

    let product_id = product.id.unwrap_or_default();
    self
      .call(
        "qatracker.builds.add",
        vec![
          Value::Int(product_id),
          Value::Int(milestone.id.unwrap_or_default()),
          version.into(),
          note.into(),
          notify.into(),
        ],
      )
      .await?;

    let builds = self.milestone_builds(milestone, Some(&[StatusFilter::Index(0)])).await?;
    Ok(
      builds
        .into_iter()
        .find(|build| build.productid == Some(product_id) && build.version == version),
    )
  }

  pub async fn build_results(
    &self,
    build: &Build,
    testcase: i64,
    status: Option<&[StatusFilter<'_>]>,
  ) -> Result<Vec<TestResult>> {
    if testcase <= 0 {
      return Err(QaTrackerError::NotFound(format!("testcase: {testcase}")));
    }
    let filter = valid_id_list(RESULT_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self
      .list(
        "qatracker.results.get_list",
        vec![Value::Int(build.id.unwrap_or_default()), Value::Int(testcase), filter.into()],
      )
      .await
  }

  /// Record a test result against a build. `bugs` maps bug numbers to an
  /// importance of 0 or 1.
  pub async fn add_result(
    &self,
    build: &Build,
    testcase: i64,
    result: StatusFilter<'_>,
    comment: &str,
    hardware: &str,
    bugs: &BTreeMap<i64, i64>,
  ) -> Result<Option<TestResult>> {
    self.require("user")?;
    if testcase <= 0 {
      return Err(QaTrackerError::NotFound(format!("testcase: {testcase}")));
    }
    let result = valid_id_list(RESULT_RESULT, Some(&[result]))?;
    let bugs = bug_map(bugs)?;

    let added = self
      .call(
        "qatracker.results.add",
        vec![
          Value::Int(build.id.unwrap_or_default()),
          Value::Int(testcase),
          Value::Int(result[0]),
          comment.into(),
          hardware.into(),
          bugs,
        ],
      )
      .await?;
    let result_id = added.as_int().unwrap_or(-1);
    if result_id == -1 {
      return Err(QaTrackerError::Rejected("post your result"));
    }

    let results = self.build_results(build, testcase, Some(&[StatusFilter::Index(0)])).await?;
    Ok(results.into_iter().find(|r| r.id == Some(result_id)))
  }

  pub async fn product_testcases(
    &self,
    product: &Product,
    series: i64,
    status: Option<&[StatusFilter<'_>]>,
  ) -> Result<Vec<Testcase>> {
    let filter = valid_id_list(TESTCASE_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self
      .list(
        "qatracker.testcases.get_list",
        vec![Value::Int(product.id.unwrap_or_default()), Value::Int(series), filter.into()],
      )
      .await
  }

  /// Write back a result's outcome, comment, hardware and bugs.
  pub async fn save_result(&self, result: &TestResult) -> Result<()> {
    self.require("user")?;
    if result.deleted {
      return Err(QaTrackerError::ResultDeleted);
    }
    self
      .confirm(
        "qatracker.results.update",
        vec![
          Value::Int(result.id.unwrap_or_default()),
          Value::Int(result.result.unwrap_or_default()),
          result.comment.as_str().into(),
          result.hardware.as_str().into(),
          bug_map(&result.bugs)?,
        ],
        "update the result",
      )
      .await
  }

  /// Remove a result. The record is marked disabled and refuses later saves.
  pub async fn delete_result(&self, result: &mut TestResult) -> Result<()> {
    self.require("user")?;
    if result.deleted {
      return Err(QaTrackerError::ResultDeleted);
    }
    self
      .confirm(
        "qatracker.results.delete",
        vec![Value::Int(result.id.unwrap_or_default())],
        "remove the result",
      )
      .await?;
    result.status = Some(1);
    result.deleted = true;
    Ok(())
  }

  /// Save a rebuild's status.
  pub async fn save_rebuild(&self, rebuild: &Rebuild) -> Result<()> {
    self.require("admin")?;
    self
      .confirm(
        "qatracker.rebuilds.update_status",
        vec![
          Value::Int(rebuild.id.unwrap_or_default()),
          Value::Int(rebuild.status.unwrap_or_default()),
        ],
        "update the rebuild",
      )
      .await
  }

  pub async fn series_manifest(&self, series: &Series, status: Option<&[StatusFilter<'_>]>) -> Result<Vec<SeriesManifest>> {
    let filter = valid_id_list(MILESTONE_SERIES_MANIFEST_STATUS, status)?;
    if filter.is_empty() {
      return Ok(Vec::new());
    }
    self
      .list(
        "qatracker.series.get_manifest",
        vec![Value::Int(series.id.unwrap_or_default()), filter.into()],
      )
      .await
  }
}

fn bug_map(bugs: &BTreeMap<i64, i64>) -> Result<Value> {
  let mut members = BTreeMap::new();
  for (&bug, &importance) in bugs {
    if bug <= 0 {
      return Err(QaTrackerError::InvalidBug {
        bug,
        reason: "a bug number must be positive",
      });
    }
    if !(0..=1).contains(&importance) {
      return Err(QaTrackerError::InvalidBug {
        bug,
        reason: "a bug importance must be 0 or 1",
      });
    }
    members.insert(bug.to_string(), Value::Int(importance));
  }
  Ok(Value::Struct(members))
}
