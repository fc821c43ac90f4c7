//! Records returned by the tracker. The PHP side sends most fields as
//! strings; ids and statuses are converted to integers (unparsable → `None`),
//! `"true"` flags to booleans and `%Y-%m-%d %H:%M:%S` stamps to dates.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;

use super::error::{QaTrackerError, Result};
use super::xmlrpc::Value;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One XML-RPC struct with the field conversions the records share.
pub(crate) struct Record<'a>(&'a BTreeMap<String, Value>);

impl<'a> Record<'a> {
  pub(crate) fn new(value: &'a Value) -> Result<Self> {
    match value {
      Value::Struct(fields) => Ok(Record(fields)),
      other => Err(QaTrackerError::Malformed(format!("expected a struct, got {other:?}"))),
    }
  }

  fn int(&self, key: &str) -> Option<i64> {
    self.0.get(key).and_then(Value::as_int)
  }

  fn flag(&self, key: &str) -> bool {
    match self.0.get(key) {
      Some(Value::Bool(b)) => *b,
      Some(value) => value.as_str() == Some("true"),
      None => false,
    }
  }

  fn date(&self, key: &str) -> Option<NaiveDateTime> {
    let text = self.0.get(key)?.to_text();
    NaiveDateTime::parse_from_str(text.trim(), DATE_FORMAT).ok()
  }

  fn text(&self, key: &str) -> String {
    self.0.get(key).map(Value::to_text).unwrap_or_default()
  }
}

pub(crate) trait FromRecord: Sized {
  fn from_record(record: &Record<'_>) -> Self;
}

pub(crate) fn records<T: FromRecord>(value: &Value) -> Result<Vec<T>> {
  match value {
    Value::Array(items) => items.iter().map(|item| Record::new(item).map(|r| T::from_record(&r))).collect(),
    Value::Nil => Ok(Vec::new()),
    other => Err(QaTrackerError::Malformed(format!("expected an array, got {other:?}"))),
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bug {
  pub bugnumber: Option<i64>,
  pub count: Option<i64>,
  pub earliest_report: Option<NaiveDateTime>,
  pub latest_report: Option<NaiveDateTime>,
}

impl FromRecord for Bug {
  fn from_record(r: &Record<'_>) -> Self {
    Bug {
      bugnumber: r.int("bugnumber"),
      count: r.int("count"),
      earliest_report: r.date("earliest_report"),
      latest_report: r.date("latest_report"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Build {
  pub id: Option<i64>,
  pub productid: Option<i64>,
  pub userid: Option<i64>,
  pub status: Option<i64>,
  pub date: Option<NaiveDateTime>,
  pub version: String,
  pub title: String,
  pub note: String,
}

impl FromRecord for Build {
  fn from_record(r: &Record<'_>) -> Self {
    Build {
      id: r.int("id"),
      productid: r.int("productid"),
      userid: r.int("userid"),
      status: r.int("status"),
      date: r.date("date"),
      version: r.text("version"),
      title: r.text("title"),
      note: r.text("note"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Milestone {
  pub id: Option<i64>,
  pub status: Option<i64>,
  pub series: Option<i64>,
  pub notify: bool,
  pub title: String,
}

impl FromRecord for Milestone {
  fn from_record(r: &Record<'_>) -> Self {
    Milestone {
      id: r.int("id"),
      status: r.int("status"),
      series: r.int("series"),
      notify: r.flag("notify"),
      title: r.text("title"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
  pub id: Option<i64>,
  pub product_type: Option<i64>,
  pub status: Option<i64>,
  pub title: String,
}

impl FromRecord for Product {
  fn from_record(r: &Record<'_>) -> Self {
    Product {
      id: r.int("id"),
      product_type: r.int("type"),
      status: r.int("status"),
      title: r.text("title"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rebuild {
  pub id: Option<i64>,
  pub seriesid: Option<i64>,
  pub productid: Option<i64>,
  pub milestoneid: Option<i64>,
  pub requestedby: Option<i64>,
  pub changedby: Option<i64>,
  pub status: Option<i64>,
  pub requestedat: Option<NaiveDateTime>,
  pub changedat: Option<NaiveDateTime>,
}

impl FromRecord for Rebuild {
  fn from_record(r: &Record<'_>) -> Self {
    Rebuild {
      id: r.int("id"),
      seriesid: r.int("seriesid"),
      productid: r.int("productid"),
      milestoneid: r.int("milestoneid"),
      requestedby: r.int("requestedby"),
      changedby: r.int("changedby"),
      status: r.int("status"),
      requestedat: r.date("requestedat"),
      changedat: r.date("changedat"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
  pub id: Option<i64>,
  pub reporterid: Option<i64>,
  pub revisionid: Option<i64>,
  pub result: Option<i64>,
  pub changedby: Option<i64>,
  pub status: Option<i64>,
  pub date: Option<NaiveDateTime>,
  pub lastchange: Option<NaiveDateTime>,
  pub comment: String,
  pub hardware: String,
  /// Bug number → importance (0 or 1).
  pub bugs: BTreeMap<i64, i64>,
  pub(crate) deleted: bool,
}

impl TestResult {
  pub fn is_deleted(&self) -> bool {
    self.deleted
  }
}

impl FromRecord for TestResult {
  fn from_record(r: &Record<'_>) -> Self {
    let bugs = match r.0.get("bugs") {
      Some(Value::Struct(entries)) => entries
        .iter()
        .filter_map(|(bug, importance)| Some((bug.parse().ok()?, importance.as_int()?)))
        .collect(),
      _ => BTreeMap::new(),
    };
    TestResult {
      id: r.int("id"),
      reporterid: r.int("reporterid"),
      revisionid: r.int("revisionid"),
      result: r.int("result"),
      changedby: r.int("changedby"),
      status: r.int("status"),
      date: r.date("date"),
      lastchange: r.date("lastchange"),
      comment: r.text("comment"),
      hardware: r.text("hardware"),
      bugs,
      deleted: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
  pub id: Option<i64>,
  pub status: Option<i64>,
  pub title: String,
}

impl FromRecord for Series {
  fn from_record(r: &Record<'_>) -> Self {
    Series {
      id: r.int("id"),
      status: r.int("status"),
      title: r.text("title"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesManifest {
  pub id: Option<i64>,
  pub productid: Option<i64>,
  pub status: Option<i64>,
  pub product_title: String,
}

impl FromRecord for SeriesManifest {
  fn from_record(r: &Record<'_>) -> Self {
    SeriesManifest {
      id: r.int("id"),
      productid: r.int("productid"),
      status: r.int("status"),
      product_title: r.text("product_title"),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Testcase {
  pub id: Option<i64>,
  pub status: Option<i64>,
  pub weight: Option<i64>,
  pub suite: Option<i64>,
  pub title: String,
}

impl FromRecord for Testcase {
  fn from_record(r: &Record<'_>) -> Self {
    Testcase {
      id: r.int("id"),
      status: r.int("status"),
      weight: r.int("weight"),
      suite: r.int("suite"),
      title: r.text("title"),
    }
  }
}
