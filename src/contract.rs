//! Response contract enforcement for model output.
//!
//! Model text is untrusted: it may wrap the JSON in prose or code fences, use
//! `"yes"` for booleans or return a score of 140. `extract` finds the first
//! balanced `{...}` span that decodes as a JSON object, checks it against a
//! `Shape`, and returns a normalized value containing only the declared fields.
//!
//! Out-of-range numbers are clamped, never rejected. Missing or malformed
//! structure is always a `ContractViolation`.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::EngineError;

/// Expected type of a single field.
#[derive(Clone, Debug)]
pub enum FieldKind {
  /// String, trimmed; must not be empty.
  Text,
  /// Boolean, also accepting textual/numeric truthy and falsy variants.
  Boolean,
  /// Integer, accepting floats and numeric strings; clamped into `[min, max]`.
  BoundedInt { min: i64, max: i64 },
  /// List of strings. Blank entries are dropped, scalars are stringified.
  TextList,
  /// List of objects, each checked against the nested shape.
  ObjectList(Shape),
}

#[derive(Clone, Debug)]
enum Presence {
  Required,
  Default(Value),
}

#[derive(Clone, Debug)]
struct Field {
  name: &'static str,
  kind: FieldKind,
  presence: Presence,
}

/// Declared shape of a JSON object.
#[derive(Clone, Debug, Default)]
pub struct Shape {
  fields: Vec<Field>,
}

impl Shape {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn required(mut self, name: &'static str, kind: FieldKind) -> Self {
    self.fields.push(Field { name, kind, presence: Presence::Required });
    self
  }

  /// Field that falls back to `default` when absent or null.
  pub fn with_default(mut self, name: &'static str, kind: FieldKind, default: Value) -> Self {
    self.fields.push(Field { name, kind, presence: Presence::Default(default) });
    self
  }

  fn check(&self, obj: &Map<String, Value>, path: &str, raw: &str) -> Result<Value, EngineError> {
    let mut out = Map::new();
    for field in &self.fields {
      let here = join_path(path, field.name);
      let value = match (obj.get(field.name), &field.presence) {
        (None | Some(Value::Null), Presence::Required) => {
          return Err(EngineError::contract(format!("required field `{here}` is missing"), raw));
        }
        (None | Some(Value::Null), Presence::Default(d)) => d.clone(),
        (Some(v), _) => coerce(&field.kind, v, &here, raw)?,
      };
      out.insert(field.name.to_string(), value);
    }
    Ok(Value::Object(out))
  }
}

fn join_path(parent: &str, name: &str) -> String {
  if parent.is_empty() { name.to_string() } else { format!("{parent}.{name}") }
}

fn wrong_type(path: &str, expected: &str, raw: &str) -> EngineError {
  EngineError::contract(format!("field `{path}` is not {expected}"), raw)
}

fn coerce(kind: &FieldKind, v: &Value, path: &str, raw: &str) -> Result<Value, EngineError> {
  match kind {
    FieldKind::Text => match v {
      Value::String(s) if !s.trim().is_empty() => Ok(Value::String(s.trim().to_string())),
      Value::String(_) => Err(EngineError::contract(format!("field `{path}` is empty"), raw)),
      _ => Err(wrong_type(path, "a string", raw)),
    },
    FieldKind::Boolean => coerce_bool(v).map(Value::Bool).ok_or_else(|| wrong_type(path, "a boolean", raw)),
    FieldKind::BoundedInt { min, max } => {
      let n = match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
      };
      match n {
        Some(n) if n.is_finite() => {
          let clamped = n.round().clamp(*min as f64, *max as f64) as i64;
          Ok(Value::from(clamped))
        }
        _ => Err(wrong_type(path, "a number", raw)),
      }
    }
    FieldKind::TextList => {
      let items = match v {
        Value::Array(items) => items.as_slice(),
        Value::String(_) => std::slice::from_ref(v),
        _ => return Err(wrong_type(path, "a list of strings", raw)),
      };
      let mut out = Vec::with_capacity(items.len());
      for (i, item) in items.iter().enumerate() {
        let text = match item {
          Value::String(s) => s.trim().to_string(),
          Value::Number(n) => n.to_string(),
          Value::Bool(b) => b.to_string(),
          Value::Null => continue,
          _ => return Err(wrong_type(&format!("{path}[{i}]"), "a string", raw)),
        };
        if !text.is_empty() {
          out.push(Value::String(text));
        }
      }
      Ok(Value::Array(out))
    }
    FieldKind::ObjectList(shape) => {
      let Value::Array(items) = v else {
        return Err(wrong_type(path, "a list", raw));
      };
      let mut out = Vec::with_capacity(items.len());
      for (i, item) in items.iter().enumerate() {
        let item_path = format!("{path}[{i}]");
        let Value::Object(obj) = item else {
          return Err(wrong_type(&item_path, "an object", raw));
        };
        out.push(shape.check(obj, &item_path, raw)?);
      }
      Ok(Value::Array(out))
    }
  }
}

fn coerce_bool(v: &Value) -> Option<bool> {
  match v {
    Value::Bool(b) => Some(*b),
    Value::Number(n) => n.as_f64().map(|f| f != 0.0),
    Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
      "true" | "yes" | "y" | "1" | "pass" | "passed" => Some(true),
      "false" | "no" | "n" | "0" | "fail" | "failed" | "" => Some(false),
      _ => None,
    },
    _ => None,
  }
}

/// Index of the `}` closing the object opened at `start`, honoring JSON string escapes.
fn balanced_end(bytes: &[u8], start: usize) -> Option<usize> {
  let mut depth = 0usize;
  let mut in_string = false;
  let mut escaped = false;
  for (i, &b) in bytes.iter().enumerate().skip(start) {
    if in_string {
      match b {
        _ if escaped => escaped = false,
        b'\\' => escaped = true,
        b'"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match b {
      b'"' => in_string = true,
      b'{' => depth += 1,
      b'}' => {
        depth -= 1;
        if depth == 0 {
          return Some(i);
        }
      }
      _ => {}
    }
  }
  None
}

/// First balanced `{...}` span of `raw` that decodes as a JSON object.
pub fn find_json_object(raw: &str) -> Result<Map<String, Value>, EngineError> {
  let bytes = raw.as_bytes();
  let mut pos = 0;
  let mut decode_error: Option<String> = None;

  while let Some(offset) = raw[pos..].find('{') {
    let start = pos + offset;
    match balanced_end(bytes, start) {
      Some(end) => {
        match serde_json::from_str::<Value>(&raw[start..=end]) {
          Ok(Value::Object(obj)) => return Ok(obj),
          Ok(_) => {}
          Err(e) => {
            decode_error.get_or_insert_with(|| e.to_string());
          }
        }
        pos = end + 1;
      }
      None => pos = start + 1,
    }
  }

  Err(match decode_error {
    Some(e) => EngineError::contract(format!("JSON decoding failed: {e}"), raw),
    None => EngineError::contract("no balanced JSON object found", raw),
  })
}

/// Locate, decode and validate the JSON payload in `raw` against `shape`.
pub fn extract(raw: &str, shape: &Shape) -> Result<Value, EngineError> {
  let obj = find_json_object(raw)?;
  shape.check(&obj, "", raw)
}

/// `extract`, then deserialize the normalized value into `T`.
pub fn extract_as<T: DeserializeOwned>(raw: &str, shape: &Shape) -> Result<T, EngineError> {
  let value = extract(raw, shape)?;
  serde_json::from_value(value).map_err(|e| EngineError::contract(format!("normalized payload did not fit: {e}"), raw))
}
