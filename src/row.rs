//! Rows
//!
//! A Row is one item of a database. All property values arrive string-encoded
//! from the storage layer; a missing or null property reads as the empty string.

use crate::field::TITLE_FIELD_ID;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub properties: HashMap<String, Option<String>>,
    /// Creation timestamp, used for the default newest-first ordering.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Row {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Row {
            id: id.into(),
            title: title.into(),
            properties: HashMap::new(),
            created_at: None,
        }
    }

    /// Builder-style property setter
    pub fn with(mut self, field_id: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(field_id.into(), Some(value.into()));
        self
    }

    pub fn created(mut self, timestamp: impl Into<String>) -> Self {
        self.created_at = Some(timestamp.into());
        self
    }

    /// The raw value stored under `field_id`, or `""` when absent or null.
    pub fn value(&self, field_id: &str) -> &str {
        if field_id == TITLE_FIELD_ID {
            return &self.title;
        }
        self.properties
            .get(field_id)
            .and_then(|v| v.as_deref())
            .unwrap_or("")
    }

    /// True when the value under `field_id` is empty or whitespace-only.
    pub fn is_blank(&self, field_id: &str) -> bool {
        self.value(field_id).trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_resolution() {
        let mut row = Row::new("r1", "Write report").with("status", "Done");
        row.properties.insert("notes".to_string(), None);

        assert_eq!(row.value("status"), "Done");
        assert_eq!(row.value("notes"), "");
        assert_eq!(row.value("missing"), "");
        assert_eq!(row.value(TITLE_FIELD_ID), "Write report");
    }

    #[test]
    fn test_is_blank() {
        let row = Row::new("r1", "").with("a", "   ").with("b", "x");
        assert!(row.is_blank("a"));
        assert!(row.is_blank("zzz"));
        assert!(!row.is_blank("b"));
    }

    #[test]
    fn test_row_from_json_with_nulls() {
        let row: Row = serde_json::from_str(
            r#"{"id":"1","properties":{"status":"Done","owner":null}}"#,
        )
        .unwrap();
        assert_eq!(row.title, "");
        assert_eq!(row.value("status"), "Done");
        assert_eq!(row.value("owner"), "");
        assert!(row.created_at.is_none());
    }
}
