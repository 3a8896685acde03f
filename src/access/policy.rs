use std::collections::HashMap;
use std::path::Path;

use super::pattern::MethodPattern;
use crate::error::{CallError, PolicyError};

/// Consumer identity -> allowed method patterns. Immutable once loaded.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    rules: HashMap<String, Vec<MethodPattern>>,
}

impl AccessPolicy {
    /// Parses `{"consumer": ["/pkg.Service/*", ...], ...}`.
    pub fn from_json(payload: &str) -> Result<Self, PolicyError> {
        let parsed: HashMap<String, Vec<String>> = serde_json::from_str(payload)?;
        let rules = parsed
            .into_iter()
            .map(|(consumer, patterns)| {
                let patterns = patterns.iter().map(|p| MethodPattern::new(p)).collect();
                (consumer, patterns)
            })
            .collect();
        Ok(Self { rules })
    }

    pub fn from_path(path: &Path) -> Result<Self, PolicyError> {
        let payload = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&payload)
    }

    /// First pattern matching `method`, if any.
    pub fn matching_pattern(&self, consumer: &str, method: &str) -> Option<&MethodPattern> {
        self.rules
            .get(consumer)?
            .iter()
            .find(|pattern| pattern.matches(method))
    }

    pub fn authorize(&self, consumer: &str, method: &str) -> Result<(), CallError> {
        match self.matching_pattern(consumer, method) {
            Some(_) => Ok(()),
            None => Err(CallError::AccessDenied {
                consumer: consumer.to_string(),
                method: method.to_string(),
            }),
        }
    }

    pub fn consumers(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }
}
