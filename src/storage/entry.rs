use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::form::form_model::FieldMap;

/// The persisted unit for one form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub url: String,
    pub fields: FieldMap,
    /// Milliseconds since the Unix epoch.
    #[serde(rename = "savedAt")]
    pub saved_at: i64,
}

impl StoredEntry {
    pub fn new(url: impl Into<String>, fields: FieldMap) -> Self {
        Self {
            url: url.into(),
            fields,
            saved_at: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_saved_at(mut self, saved_at: i64) -> Self {
        self.saved_at = saved_at;
        self
    }

    /// Serialized size in bytes, as counted against a storage quota.
    pub fn footprint(&self, key: &str) -> usize {
        key.len() + serde_json::to_vec(self).map(|v| v.len()).unwrap_or(0)
    }
}
