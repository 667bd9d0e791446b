use std::collections::BTreeMap;

use serde_json::Value;

/// Public server configuration (`/api/config`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    pub features: BTreeMap<String, bool>,
}

/// Server-side user settings. Kept as opaque JSON; only a few keys are read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserSettings {
    pub raw: Value,
}

impl UserSettings {
    /// First model of the `ui.models` list chosen in the web client, if any.
    pub fn default_model(&self) -> Option<&str> {
        self.raw
            .pointer("/ui/models/0")
            .and_then(Value::as_str)
            .filter(|model| !model.trim().is_empty())
    }
}
