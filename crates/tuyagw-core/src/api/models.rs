use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope wrapped around every OpenAPI response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub t: Option<i64>,
    pub result: Option<T>,
    pub code: Option<i64>,
    pub msg: Option<String>,
}

/// A single data point write, e.g. `{"code": "bright_value", "value": 125}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub code: String,
    pub value: Value,
}

impl Command {
    pub fn new(code: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            code: code.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CommandsBody<'a> {
    pub commands: &'a [Command],
}

/// Current value of one data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub code: String,
    pub value: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFunctions {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub functions: Vec<DeviceFunction>,
}

/// A function a device accepts commands for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFunction {
    pub code: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub desc: Option<String>,
    /// JSON-encoded value constraints, e.g. `{"min":25,"max":255}`.
    #[serde(default)]
    pub values: Option<String>,
}

/// A key press sent to a remote learned by an infrared hub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IrKey {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<i64>,
}
