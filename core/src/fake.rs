use crate::engine::{BrowserEngine, FormData};
use crate::error::EngineError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start(String),
    Open(String),
    CurrentUrl,
    SelectorExists(String),
    TextPresent(String),
    IsVisible(String),
    Fill {
        selector: String,
        data: FormData,
        submit: bool,
    },
    Click(String),
    ClickLabel(String, String),
    FetchText(String),
    Attribute(String, String),
    Capture(PathBuf),
    Finish,
}

#[derive(Debug, Default)]
struct Page {
    url: String,
    selectors: HashSet<String>,
    visible: HashSet<String>,
    body: String,
    texts: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
    delayed: HashMap<String, usize>,
    url_after_submit: Option<String>,
    failing_captures: bool,
}

/// Scripted page model that records every call it receives. Clones share
/// state, so a test can keep one handle while the suite owns another.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    page: Arc<Mutex<Page>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_selector(self, selector: &str) -> Self {
        self.page.lock().selectors.insert(selector.to_string());
        self
    }

    /// Selector shows up only after `probes` unsuccessful checks.
    pub fn with_selector_after(self, selector: &str, probes: usize) -> Self {
        self.page.lock().delayed.insert(selector.to_string(), probes);
        self
    }

    pub fn with_visible(self, target: &str) -> Self {
        {
            let mut page = self.page.lock();
            page.selectors.insert(target.to_string());
            page.visible.insert(target.to_string());
        }
        self
    }

    pub fn with_text(self, text: &str) -> Self {
        {
            let mut page = self.page.lock();
            page.body.push_str(text);
            page.body.push('\n');
        }
        self
    }

    pub fn with_element_text(self, selector: &str, text: &str) -> Self {
        {
            let mut page = self.page.lock();
            page.selectors.insert(selector.to_string());
            page.texts.insert(selector.to_string(), text.to_string());
        }
        self
    }

    pub fn with_attribute(self, selector: &str, name: &str, value: &str) -> Self {
        {
            let mut page = self.page.lock();
            page.selectors.insert(selector.to_string());
            page.attributes
                .insert((selector.to_string(), name.to_string()), value.to_string());
        }
        self
    }

    pub fn with_url(self, url: &str) -> Self {
        self.page.lock().url = url.to_string();
        self
    }

    pub fn navigating_on_submit(self, url: &str) -> Self {
        self.page.lock().url_after_submit = Some(url.to_string());
        self
    }

    pub fn failing_captures(self) -> Self {
        self.page.lock().failing_captures = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn captures(&self) -> Vec<PathBuf> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Capture(path) => Some(path.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl BrowserEngine for FakeEngine {
    async fn start(&mut self, url: &str) -> Result<(), EngineError> {
        self.record(Call::Start(url.to_string()));
        self.page.lock().url = url.to_string();
        Ok(())
    }

    async fn open(&mut self, url: &str) -> Result<(), EngineError> {
        self.record(Call::Open(url.to_string()));
        self.page.lock().url = url.to_string();
        Ok(())
    }

    async fn current_url(&mut self) -> Result<String, EngineError> {
        self.record(Call::CurrentUrl);
        Ok(self.page.lock().url.clone())
    }

    async fn selector_exists(&mut self, selector: &str) -> Result<bool, EngineError> {
        self.record(Call::SelectorExists(selector.to_string()));
        let mut page = self.page.lock();
        if let Some(remaining) = page.delayed.get_mut(selector) {
            if *remaining == 0 {
                page.delayed.remove(selector);
                page.selectors.insert(selector.to_string());
            } else {
                *remaining -= 1;
                return Ok(false);
            }
        }
        Ok(page.selectors.contains(selector))
    }

    async fn text_present(&mut self, text: &str) -> Result<bool, EngineError> {
        self.record(Call::TextPresent(text.to_string()));
        Ok(self.page.lock().body.contains(text))
    }

    async fn is_visible(&mut self, target: &str) -> Result<bool, EngineError> {
        self.record(Call::IsVisible(target.to_string()));
        Ok(self.page.lock().visible.contains(target))
    }

    async fn fill(
        &mut self,
        selector: &str,
        data: &FormData,
        submit: bool,
    ) -> Result<(), EngineError> {
        self.record(Call::Fill {
            selector: selector.to_string(),
            data: data.clone(),
            submit,
        });
        let mut page = self.page.lock();
        if !page.selectors.contains(selector) {
            return Err(EngineError::NoSuchElement(selector.to_string()));
        }
        if submit {
            if let Some(url) = page.url_after_submit.clone() {
                page.url = url;
            }
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> Result<(), EngineError> {
        self.record(Call::Click(selector.to_string()));
        if self.page.lock().selectors.contains(selector) {
            Ok(())
        } else {
            Err(EngineError::NoSuchElement(selector.to_string()))
        }
    }

    async fn click_label(&mut self, label: &str, tag: &str) -> Result<(), EngineError> {
        self.record(Call::ClickLabel(label.to_string(), tag.to_string()));
        if self.page.lock().body.contains(label) {
            Ok(())
        } else {
            Err(EngineError::NoSuchLabel(label.to_string()))
        }
    }

    async fn fetch_text(&mut self, selector: &str) -> Result<String, EngineError> {
        self.record(Call::FetchText(selector.to_string()));
        Ok(self
            .page
            .lock()
            .texts
            .get(selector)
            .cloned()
            .unwrap_or_default())
    }

    async fn attribute(
        &mut self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, EngineError> {
        self.record(Call::Attribute(selector.to_string(), name.to_string()));
        Ok(self
            .page
            .lock()
            .attributes
            .get(&(selector.to_string(), name.to_string()))
            .cloned())
    }

    async fn capture(&mut self, path: &Path) -> Result<(), EngineError> {
        self.record(Call::Capture(path.to_path_buf()));
        if self.page.lock().failing_captures {
            return Err(EngineError::Capture {
                path: path.to_path_buf(),
                reason: "disk full".to_string(),
            });
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), EngineError> {
        self.record(Call::Finish);
        Ok(())
    }
}
