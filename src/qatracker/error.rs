use thiserror::Error;

#[derive(Debug, Error)]
pub enum QaTrackerError {
  #[error("HTTP error talking to the QA tracker: {0}")]
  Http(#[from] reqwest::Error),

  #[error("QA tracker returned HTTP {status}")]
  Status { status: u16 },

  #[error("Invalid XML from the QA tracker: {0}")]
  Xml(#[from] roxmltree::Error),

  #[error("Malformed XML-RPC response: {0}")]
  Malformed(String),

  #[error("QA tracker fault {code}: {message}")]
  Fault { code: i64, message: String },

  #[error("Invalid status: {0}")]
  InvalidStatus(String),

  #[error("Access denied, you need '{required}' but are '{actual}'")]
  AccessDenied { required: &'static str, actual: String },

  #[error("Couldn't find {0}")]
  NotFound(String),

  #[error("Only active {0} are accepted")]
  Inactive(&'static str),

  #[error("Result has already been removed")]
  ResultDeleted,

  #[error("Invalid bug entry {bug}: {reason}")]
  InvalidBug { bug: i64, reason: &'static str },

  #[error("The QA tracker refused to {0}")]
  Rejected(&'static str),
}

pub type Result<T> = std::result::Result<T, QaTrackerError>;
