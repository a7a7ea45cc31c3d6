//! Per-call options for logging an occurrence.

use database::{Environment, Level, Metadata};
use serde::{Deserialize, Serialize};

/// Optional context attached to a logged error.
///
/// Everything defaults to empty; the level defaults to `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogOptions {
    pub level: Level,
    pub url: Option<String>,
    pub user_agent: Option<String>,
    pub user_id: Option<String>,
    pub tags: Vec<String>,
    pub metadata: Metadata,
    pub stack: Option<String>,
    /// Use this fingerprint instead of computing one.
    pub fingerprint: Option<String>,
    /// Overrides the tracker's environment.
    pub environment: Option<Environment>,
}

impl LogOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = Some(fingerprint.into());
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = LogOptions::new();
        assert_eq!(options.level, Level::Error);
        assert!(options.tags.is_empty());
        assert!(options.metadata.is_empty());
    }

    #[test]
    fn test_deserialize_partial() {
        let options: LogOptions =
            serde_json::from_str(r#"{"level": "warning", "tags": ["a"], "userAgent": "curl"}"#).unwrap();
        assert_eq!(options.level, Level::Warning);
        assert_eq!(options.tags, vec!["a"]);
        assert_eq!(options.user_agent.as_deref(), Some("curl"));
    }
}
