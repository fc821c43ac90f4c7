//! Just enough XML-RPC for the QA tracker: request encoding and response
//! decoding.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use roxmltree::{Document, Node};

use super::error::{QaTrackerError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
  Int(i64),
  Bool(bool),
  Double(f64),
  String(String),
  DateTime(String),
  Base64(Vec<u8>),
  Array(Vec<Value>),
  Struct(BTreeMap<String, Value>),
  Nil,
}

impl Value {
  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) | Value::DateTime(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_int(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      Value::String(s) => s.trim().parse().ok(),
      _ => None,
    }
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      Value::Int(i) => Some(*i != 0),
      _ => None,
    }
  }

  /// The value rendered as plain text, the way the tracker's PHP side
  /// stringifies scalars.
  pub fn to_text(&self) -> String {
    match self {
      Value::Int(i) => i.to_string(),
      Value::Bool(b) => b.to_string(),
      Value::Double(d) => d.to_string(),
      Value::String(s) | Value::DateTime(s) => s.clone(),
      Value::Base64(bytes) => String::from_utf8_lossy(bytes).into_owned(),
      Value::Array(_) | Value::Struct(_) | Value::Nil => String::new(),
    }
  }
}

impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Value::Int(value)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(values: Vec<T>) -> Self {
    Value::Array(values.into_iter().map(Into::into).collect())
  }
}

fn escape(text: &str, out: &mut String) {
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      _ => out.push(c),
    }
  }
}

fn encode_value(value: &Value, out: &mut String) {
  out.push_str("<value>");
  match value {
    Value::Int(i) => {
      let _ = write!(out, "<int>{i}</int>");
    }
    Value::Bool(b) => {
      let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
    }
    Value::Double(d) => {
      let _ = write!(out, "<double>{d}</double>");
    }
    Value::String(s) => {
      out.push_str("<string>");
      escape(s, out);
      out.push_str("</string>");
    }
    Value::DateTime(s) => {
      out.push_str("<dateTime.iso8601>");
      escape(s, out);
      out.push_str("</dateTime.iso8601>");
    }
    Value::Base64(bytes) => {
      let _ = write!(out, "<base64>{}</base64>", STANDARD.encode(bytes));
    }
    Value::Array(values) => {
      out.push_str("<array><data>\n");
      for v in values {
        encode_value(v, out);
      }
      out.push_str("</data></array>");
    }
    Value::Struct(members) => {
      out.push_str("<struct>\n");
      for (name, v) in members {
        out.push_str("<member>\n<name>");
        escape(name, out);
        out.push_str("</name>\n");
        encode_value(v, out);
        out.push_str("</member>\n");
      }
      out.push_str("</struct>");
    }
    Value::Nil => out.push_str("<nil/>"),
  }
  out.push_str("</value>\n");
}

/// Serialize a `methodCall` document.
pub fn encode_call(method: &str, params: &[Value]) -> String {
  let mut out = String::from("<?xml version='1.0'?>\n<methodCall>\n<methodName>");
  escape(method, &mut out);
  out.push_str("</methodName>\n<params>\n");
  for param in params {
    out.push_str("<param>\n");
    encode_value(param, &mut out);
    out.push_str("</param>\n");
  }
  out.push_str("</params>\n</methodCall>\n");
  out
}

fn malformed(message: impl Into<String>) -> QaTrackerError {
  QaTrackerError::Malformed(message.into())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
  node.children().find(|n| n.is_element() && n.has_tag_name(name))
}

fn decode_value(node: Node<'_, '_>) -> Result<Value> {
  let Some(typed) = node.children().find(|n| n.is_element()) else {
    // An untyped <value> is a string.
    return Ok(Value::String(node.text().unwrap_or_default().to_string()));
  };
  let text = typed.text().unwrap_or_default();

  match typed.tag_name().name() {
    "int" | "i4" | "i8" => text
      .trim()
      .parse()
      .map(Value::Int)
      .map_err(|_| malformed(format!("invalid integer {text:?}"))),
    "boolean" => match text.trim() {
      "1" => Ok(Value::Bool(true)),
      "0" => Ok(Value::Bool(false)),
      other => Err(malformed(format!("invalid boolean {other:?}"))),
    },
    "double" => text
      .trim()
      .parse()
      .map(Value::Double)
      .map_err(|_| malformed(format!("invalid double {text:?}"))),
    "string" => Ok(Value::String(text.to_string())),
    "dateTime.iso8601" => Ok(Value::DateTime(text.trim().to_string())),
    "base64" => {
      let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
      STANDARD
        .decode(compact)
        .map(Value::Base64)
        .map_err(|e| malformed(format!("invalid base64: {e}")))
    }
    "nil" => Ok(Value::Nil),
    "array" => {
      let data = child(typed, "data").ok_or_else(|| malformed("array without <data>"))?;
      data
        .children()
        .filter(|n| n.has_tag_name("value"))
        .map(decode_value)
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
    }
    "struct" => {
      let mut members = BTreeMap::new();
      for member in typed.children().filter(|n| n.has_tag_name("member")) {
        let name = child(member, "name").ok_or_else(|| malformed("struct member without <name>"))?;
        let value = child(member, "value").ok_or_else(|| malformed("struct member without <value>"))?;
        members.insert(name.text().unwrap_or_default().to_string(), decode_value(value)?);
      }
      Ok(Value::Struct(members))
    }
    other => Err(malformed(format!("unknown value type <{other}>"))),
  }
}

/// Parse a `methodResponse` document. Faults become
/// [`QaTrackerError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value> {
  let document = Document::parse(xml)?;
  let root = document.root_element();
  if !root.has_tag_name("methodResponse") {
    return Err(malformed(format!("unexpected root element <{}>", root.tag_name().name())));
  }

  if let Some(fault) = child(root, "fault") {
    let value = child(fault, "value").ok_or_else(|| malformed("fault without <value>"))?;
    let Value::Struct(members) = decode_value(value)? else {
      return Err(malformed("fault is not a struct"));
    };
    return Err(QaTrackerError::Fault {
      code: members.get("faultCode").and_then(Value::as_int).unwrap_or_default(),
      message: members.get("faultString").map(Value::to_text).unwrap_or_default(),
    });
  }

  let value = child(root, "params")
    .and_then(|params| child(params, "param"))
    .and_then(|param| child(param, "value"))
    .ok_or_else(|| malformed("response without a return value"))?;
  decode_value(value)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn encodes_nested_params() {
    let mut bugs = BTreeMap::new();
    bugs.insert("12345".to_string(), Value::Int(1));
    let xml = encode_call(
      "qatracker.results.add",
      &[Value::Int(7), "a & b".into(), Value::Struct(bugs), vec![0i64, 2].into(), true.into()],
    );

    assert!(xml.starts_with("<?xml version='1.0'?>\n<methodCall>\n<methodName>qatracker.results.add</methodName>"));
    assert!(xml.contains("<value><int>7</int></value>"));
    assert!(xml.contains("<string>a &amp; b</string>"));
    assert!(xml.contains("<member>\n<name>12345</name>\n<value><int>1</int></value>\n</member>"));
    assert!(xml.contains("<array><data>\n<value><int>0</int></value>\n<value><int>2</int></value>\n</data></array>"));
    assert!(xml.contains("<boolean>1</boolean>"));
  }

  #[test]
  fn decodes_struct_arrays() {
    let xml = r#"<?xml version="1.0"?>
<methodResponse><params><param><value><array><data>
  <value><struct>
    <member><name>id</name><value><string>12</string></value></member>
    <member><name>title</name><value>Ubuntu Desktop amd64</value></member>
    <member><name>status</name><value><int>0</int></value></member>
  </struct></value>
</data></array></value></param></params></methodResponse>"#;

    let Value::Array(items) = decode_response(xml).unwrap() else {
      panic!("expected an array");
    };
    let Value::Struct(fields) = &items[0] else {
      panic!("expected a struct");
    };
    assert_eq!(fields["id"].as_int(), Some(12));
    assert_eq!(fields["title"].as_str(), Some("Ubuntu Desktop amd64"));
    assert_eq!(fields["status"], Value::Int(0));
  }

  #[test]
  fn decodes_scalars() {
    let wrap = |v: &str| format!("<methodResponse><params><param><value>{v}</value></param></params></methodResponse>");
    assert_eq!(decode_response(&wrap("<boolean>1</boolean>")).unwrap(), Value::Bool(true));
    assert_eq!(decode_response(&wrap("<i4>-1</i4>")).unwrap(), Value::Int(-1));
    assert_eq!(decode_response(&wrap("<base64>aGk=</base64>")).unwrap(), Value::Base64(b"hi".to_vec()));
    assert_eq!(decode_response(&wrap("<nil/>")).unwrap(), Value::Nil);
    assert!(decode_response(&wrap("<int>x</int>")).is_err());
  }

  #[test]
  fn faults_become_errors() {
    let xml = r#"<methodResponse><fault><value><struct>
<member><name>faultCode</name><value><int>1</int></value></member>
<member><name>faultString</name><value><string>Access denied</string></value></member>
</struct></value></fault></methodResponse>"#;

    match decode_response(xml) {
      Err(QaTrackerError::Fault { code, message }) => {
        assert_eq!(code, 1);
        assert_eq!(message, "Access denied");
      }
      other => panic!("unexpected {other:?}"),
    }
  }
}
