use crate::error::EngineError;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Capabilities the step pipeline needs from a browser automation backend.
///
/// The pipeline drives one engine from a single task, so implementations see
/// strictly serial calls. Predicates (`selector_exists`, `text_present`,
/// `is_visible`, `current_url`) are probed repeatedly until they hold or the
/// step's deadline expires.
#[async_trait]
pub trait BrowserEngine: Send {
    async fn start(&mut self, url: &str) -> Result<(), EngineError>;

    async fn open(&mut self, url: &str) -> Result<(), EngineError>;

    async fn current_url(&mut self) -> Result<String, EngineError>;

    async fn selector_exists(&mut self, selector: &str) -> Result<bool, EngineError>;

    async fn text_present(&mut self, text: &str) -> Result<bool, EngineError>;

    async fn is_visible(&mut self, target: &str) -> Result<bool, EngineError>;

    async fn fill(
        &mut self,
        selector: &str,
        data: &FormData,
        submit: bool,
    ) -> Result<(), EngineError>;

    async fn click(&mut self, selector: &str) -> Result<(), EngineError>;

    async fn click_label(&mut self, label: &str, tag: &str) -> Result<(), EngineError>;

    async fn fetch_text(&mut self, selector: &str) -> Result<String, EngineError>;

    async fn attribute(
        &mut self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, EngineError>;

    async fn capture(&mut self, path: &Path) -> Result<(), EngineError>;

    /// Called once after the pipeline has drained.
    async fn finish(&mut self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum UrlPattern {
    Contains(String),
    Regex(Regex),
}

impl UrlPattern {
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(UrlPattern::Regex)
    }

    pub fn matches(&self, url: &str) -> bool {
        match self {
            UrlPattern::Contains(fragment) => url.contains(fragment.as_str()),
            UrlPattern::Regex(regex) => regex.is_match(url),
        }
    }
}

impl From<&str> for UrlPattern {
    fn from(value: &str) -> Self {
        UrlPattern::Contains(value.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(value: String) -> Self {
        UrlPattern::Contains(value)
    }
}

impl From<Regex> for UrlPattern {
    fn from(value: Regex) -> Self {
        UrlPattern::Regex(value)
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlPattern::Contains(fragment) => write!(f, "{fragment}"),
            UrlPattern::Regex(regex) => write!(f, "/{}/", regex.as_str()),
        }
    }
}

/// Form fields in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "serde_json::Map<String, serde_json::Value>")]
pub struct FormData {
    fields: Vec<(String, String)>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// One `\t<field>: <value>` line per field.
    pub fn listing(&self) -> String {
        self.iter()
            .map(|(name, value)| format!("\t{name}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K, V> FromIterator<(K, V)> for FormData
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = FormData::new();
        for (name, value) in iter {
            data.insert(name, value);
        }
        data
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for FormData {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        map.into_iter()
            .map(|(name, value)| {
                let value = match value {
                    serde_json::Value::String(text) => text,
                    other => other.to_string(),
                };
                (name, value)
            })
            .collect()
    }
}
