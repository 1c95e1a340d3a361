use crate::domain::{ConfigPayload, FieldValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CREATE_METHOD: &str = "CreateProxyConfiguration";
pub const DESTROY_METHOD: &str = "DestroyProxyConfiguration";

/// One request frame, a single JSON object on its own line. Exactly one
/// of `payload` and `handle` is set, depending on the method.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle: Option<&'a str>,
}

/// One response frame. A set `error` means the resolver refused the call.
#[derive(Debug, Deserialize)]
pub struct Response {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Lower a payload into the JSON dictionary the resolver expects.
pub fn payload_to_json(payload: &ConfigPayload) -> Value {
    let mut object = serde_json::Map::new();
    for (key, value) in payload.fields() {
        let value = match value {
            FieldValue::Str(s) => Value::String(s.clone()),
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::StrList(items) => {
                Value::Array(items.iter().cloned().map(Value::String).collect())
            }
        };
        object.insert(key.as_str().to_owned(), value);
    }
    Value::Object(object)
}
