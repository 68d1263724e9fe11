//! Firebase REST Request/Response Types
//!
//! Wire types for the Identity Toolkit and Secure Token APIs, and the
//! mapping between plain JSON documents and Firestore's typed value
//! encoding (`{"stringValue": "..."}`, `{"integerValue": "42"}`, ...).

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::ports::document_store::Document;

/// Google API error envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleErrorBody {
  pub error: GoogleError,
}

/// Google API error details.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleError {
  #[serde(default)]
  pub code: u16,
  pub message: String,
}

/// `accounts:signInWithPassword` request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest<'a> {
  pub email: &'a str,
  pub password: &'a str,
  pub return_secure_token: bool,
}

/// `accounts:signInWithPassword` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
  /// Firebase uid.
  pub local_id: String,
  #[serde(default)]
  pub email: Option<String>,
  pub id_token: String,
  pub refresh_token: String,
  /// Token lifetime in seconds, as a string.
  pub expires_in: String,
}

/// Secure Token refresh request.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
  pub grant_type: &'static str,
  pub refresh_token: &'a str,
}

/// Secure Token refresh response (snake_case on the wire).
#[derive(Debug, Clone, Deserialize)]
pub struct RefreshResponse {
  pub id_token: String,
  pub refresh_token: String,
  pub expires_in: String,
  pub user_id: String,
}

/// Turn a provider error code into a message for the login screen.
///
/// Codes may carry a suffix (`"TOO_MANY_ATTEMPTS_TRY_LATER : ..."`).
pub fn describe_auth_error(code: &str) -> String {
  let key = code.split([' ', ':']).next().unwrap_or(code);
  match key {
    "EMAIL_NOT_FOUND" | "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
      "Invalid email or password".to_string()
    }
    "INVALID_EMAIL" => "The email address is badly formatted".to_string(),
    "USER_DISABLED" => "This account has been disabled".to_string(),
    "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts, try again later".to_string(),
    "TOKEN_EXPIRED" | "INVALID_REFRESH_TOKEN" => "Session expired, sign in again".to_string(),
    _ => code.to_string(),
  }
}

/// Encode a JSON document as Firestore `fields`.
pub fn encode_fields(data: &Document) -> Value {
  let fields: Map<String, Value> = data
    .iter()
    .map(|(k, v)| (k.clone(), encode_value(v)))
    .collect();
  Value::Object(fields)
}

/// Encode one JSON value as a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
  match value {
    Value::Null => json!({ "nullValue": null }),
    Value::Bool(b) => json!({ "booleanValue": b }),
    Value::Number(n) if n.is_f64() => json!({ "doubleValue": n.as_f64() }),
    // Firestore carries 64-bit integers as strings
    Value::Number(n) => json!({ "integerValue": n.to_string() }),
    Value::String(s) => json!({ "stringValue": s }),
    Value::Array(items) => json!({
      "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
    }),
    Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
  }
}

/// Decode Firestore `fields` into a JSON document.
pub fn decode_fields(fields: &Value) -> Result<Document> {
  let Some(map) = fields.as_object() else {
    bail!("Firestore fields must be an object");
  };
  map
    .iter()
    .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
    .collect()
}

/// Decode one Firestore typed value.
pub fn decode_value(value: &Value) -> Result<Value> {
  let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
    bail!("Malformed Firestore value: {value}");
  };

  let decoded = match kind.as_str() {
    "nullValue" => Value::Null,
    "booleanValue" => Value::Bool(inner.as_bool().unwrap_or_default()),
    "integerValue" => {
      let n = match inner {
        Value::String(s) => s.parse::<i64>()?,
        other => other.as_i64().unwrap_or_default(),
      };
      Value::Number(n.into())
    }
    "doubleValue" => match inner {
      Value::Number(n) => Value::Number(n.clone()),
      // NaN and Infinity arrive as strings and have no JSON form
      _ => Value::Null,
    },
    "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
    "geoPointValue" => inner.clone(),
    "arrayValue" => {
      let values = inner
        .get("values")
        .and_then(Value::as_array)
        .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>>>())
        .transpose()?
        .unwrap_or_default();
      Value::Array(values)
    }
    "mapValue" => match inner.get("fields") {
      Some(fields) => Value::Object(decode_fields(fields)?),
      None => Value::Object(Map::new()),
    },
    other => bail!("Unsupported Firestore value type: {other}"),
  };

  Ok(decoded)
}

/// Last path segment of a Firestore document name.
pub fn document_id(name: &str) -> &str {
  name.rsplit('/').next().unwrap_or(name)
}
