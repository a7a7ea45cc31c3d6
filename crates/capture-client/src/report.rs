//! The report payload sent to the ingest endpoint.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Severity of a captured failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Debug,
    Info,
    Warning,
    #[default]
    Error,
}

/// One captured failure, as posted to `POST /api/errors`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub level: ReportLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ErrorReport {
    pub fn new(title: impl Into<String>, message: impl Into<String>, level: ReportLevel) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            level,
            stack: None,
            url: None,
            user_agent: None,
            user_id: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_stack(mut self, stack: Option<String>) -> Self {
        self.stack = stack;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let report = ErrorReport::new("TypeError", "x is undefined", ReportLevel::Warning)
            .with_tags(["javascript-error"])
            .with_meta("lineno", 10);
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["level"], "warning");
        assert_eq!(json["tags"][0], "javascript-error");
        assert_eq!(json["metadata"]["lineno"], 10);
        assert!(json.get("userAgent").is_none());

        let parsed: ErrorReport = serde_json::from_str(r#"{"title": "T", "message": "M"}"#).unwrap();
        assert_eq!(parsed.level, ReportLevel::Error);
        assert!(parsed.tags.is_empty());
    }
}
