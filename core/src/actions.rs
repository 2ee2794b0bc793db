use crate::engine::{FormData, UrlPattern};
use crate::error::StepError;
use crate::executor::{self, Callback, Step, StepCallback, StepCx};
use crate::ledger::LogLevel;
use crate::voice::Voice;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A step definition waiting for its voice word. The same action can open a
/// scenario ("Given ...") or continue it ("And ...").
#[derive(Debug, Clone)]
pub struct Action {
    phrase: String,
    plan: Plan,
}

#[derive(Debug, Clone)]
enum Plan {
    Selector {
        selector: String,
        callback: Option<Callback>,
        info: Option<String>,
    },
    Url(UrlPattern),
    Text {
        text: String,
        callback: Option<Callback>,
    },
    Visible(String),
    Immediate(Callback),
}

impl Action {
    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    pub fn voiced(self, voice: Voice) -> Step {
        let message = format!("{voice} {}", self.phrase);
        let step = match self.plan {
            Plan::Selector {
                selector,
                callback,
                info,
            } => executor::wait_for_selector(message, selector, callback, info),
            Plan::Url(pattern) => executor::wait_for_url(message, pattern, None),
            Plan::Text { text, callback } => executor::wait_for_text(message, text, callback),
            Plan::Visible(target) => executor::wait_until_visible(message, target, None),
            Plan::Immediate(callback) => executor::no_wait(message, callback),
        };
        step.with_voice(voice)
    }
}

/// Values captured by `note_down`, shared between the author and the running
/// suite.
#[derive(Debug, Clone, Default)]
pub struct Notebook {
    entries: Arc<Mutex<BTreeMap<String, Option<String>>>>,
}

impl Notebook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute value noted under `key`; `None` when nothing was noted or the
    /// element had no such attribute.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned().flatten()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn snapshot(&self) -> BTreeMap<String, Option<String>> {
        self.entries.lock().clone()
    }

    fn record(&self, key: &str, value: Option<String>) {
        self.entries.lock().insert(key.to_string(), value);
    }
}

/// `fill` submits unless told otherwise: absent or `true` submits, anything
/// else does not.
pub fn auto_submit_flag(value: Option<&Value>) -> bool {
    matches!(value, None | Some(Value::Bool(true)))
}

pub fn am(message: &str, selector: &str) -> Action {
    selector_action(format!("I am {message}"), selector, None, None)
}

pub fn reached(message: &str, url: impl Into<UrlPattern>) -> Action {
    Action {
        phrase: format!("I reached {message}"),
        plan: Plan::Url(url.into()),
    }
}

pub fn fill(message: &str, selector: &str, data: FormData, auto_submit: Option<bool>) -> Action {
    let listing = data.listing();
    let info = if listing.is_empty() { None } else { Some(listing) };
    let callback = FillForm {
        selector: selector.to_string(),
        data,
        submit: auto_submit.unwrap_or(true),
    };
    selector_action(
        format!("I fill {message}"),
        selector,
        Some(Arc::new(callback)),
        info,
    )
}

pub fn click(message: &str, selector: &str) -> Action {
    let callback = ClickElement {
        selector: selector.to_string(),
    };
    selector_action(
        format!("I click {message}"),
        selector,
        Some(Arc::new(callback)),
        None,
    )
}

pub fn click_the_label(label: &str) -> Action {
    let callback = ClickLabel {
        label: label.to_string(),
    };
    Action {
        phrase: format!("I click on label name {label}"),
        plan: Plan::Text {
            text: label.to_string(),
            callback: Some(Arc::new(callback)),
        },
    }
}

pub fn find(message: &str, selector: &str) -> Action {
    selector_action(format!("I find {message}"), selector, None, None)
}

pub fn find_the_visible(message: &str, selector: &str) -> Action {
    Action {
        phrase: format!("I find {message}"),
        plan: Plan::Visible(selector.to_string()),
    }
}

pub fn go_to(message: &str, url: &str) -> Action {
    Action {
        phrase: format!("I go to {message}"),
        plan: Plan::Immediate(Arc::new(OpenUrl {
            url: url.to_string(),
        })),
    }
}

pub fn see(message: &str, text: &str) -> Action {
    Action {
        phrase: format!("I see {message}"),
        plan: Plan::Text {
            text: text.to_string(),
            callback: None,
        },
    }
}

pub fn can_see(message: &str, text: &str) -> Action {
    Action {
        phrase: format!("I see {message}"),
        plan: Plan::Visible(text.to_string()),
    }
}

pub fn should_not_see(message: &str, text: &str) -> Action {
    Action {
        phrase: format!("I should not see {message}"),
        plan: Plan::Immediate(Arc::new(TextAbsent {
            text: text.to_string(),
        })),
    }
}

pub fn cannot_find_the(message: &str, selector: &str) -> Action {
    Action {
        phrase: format!("I cannot find the selector {message}"),
        plan: Plan::Immediate(Arc::new(NotVisible {
            selector: selector.to_string(),
        })),
    }
}

pub fn see_the_value_of(message: &str, selector: &str) -> ValueCheck {
    ValueCheck {
        phrase: format!("I see the value of {message}"),
        selector: selector.to_string(),
    }
}

pub fn note_down(message: &str, selector: &str, attribute: &str, notebook: &Notebook) -> Action {
    let phrase = format!("I note down {message}");
    Action {
        phrase: phrase.clone(),
        plan: Plan::Immediate(Arc::new(NoteDown {
            key: message.to_string(),
            phrase,
            selector: selector.to_string(),
            attribute: attribute.to_string(),
            notebook: notebook.clone(),
        })),
    }
}

/// First half of `see_the_value_of(..).is(..)`.
#[derive(Debug, Clone)]
pub struct ValueCheck {
    phrase: String,
    selector: String,
}

impl ValueCheck {
    pub fn is(self, expected: impl Into<Value>) -> Action {
        let expected = expected.into();
        let shown = display_value(&expected);
        selector_action(
            format!("{} is '{shown}'", self.phrase),
            &self.selector,
            Some(Arc::new(ValueEquals {
                selector: self.selector.clone(),
                expected,
            })),
            None,
        )
    }
}

fn selector_action(
    phrase: String,
    selector: &str,
    callback: Option<Callback>,
    info: Option<String>,
) -> Action {
    Action {
        phrase,
        plan: Plan::Selector {
            selector: selector.to_string(),
            callback,
            info,
        },
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug)]
struct FillForm {
    selector: String,
    data: FormData,
    submit: bool,
}

#[async_trait]
impl StepCallback for FillForm {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        cx.engine.fill(&self.selector, &self.data, self.submit).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct ClickElement {
    selector: String,
}

#[async_trait]
impl StepCallback for ClickElement {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        cx.engine.click(&self.selector).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct ClickLabel {
    label: String,
}

#[async_trait]
impl StepCallback for ClickLabel {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        let tag = cx.config.label_tag.clone();
        cx.engine.click_label(&self.label, &tag).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct OpenUrl {
    url: String,
}

#[async_trait]
impl StepCallback for OpenUrl {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        cx.engine.open(&self.url).await?;
        Ok(())
    }
}

#[derive(Debug)]
struct TextAbsent {
    text: String,
}

#[async_trait]
impl StepCallback for TextAbsent {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        let message = cx.message.to_string();
        if cx.engine.text_present(&self.text).await? {
            cx.fail(&message);
            cx.log(LogLevel::Info, format!("Found text '{}'", self.text));
        } else {
            cx.pass(&message);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct NotVisible {
    selector: String,
}

#[async_trait]
impl StepCallback for NotVisible {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        let message = cx.message.to_string();
        if cx.engine.is_visible(&self.selector).await? {
            cx.fail(&message);
            cx.log(LogLevel::Info, format!("Selector {} is visible", self.selector));
        } else {
            cx.pass(&message);
        }
        Ok(())
    }
}

#[derive(Debug)]
struct ValueEquals {
    selector: String,
    expected: Value,
}

#[async_trait]
impl StepCallback for ValueEquals {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        if !self.expected.is_string() {
            cx.log(
                LogLevel::Warning,
                "Warning: The value specified is not a string, the following assertion may not work",
            );
        }
        let found = cx.engine.fetch_text(&self.selector).await?;
        if self.expected.as_str() != Some(found.as_str()) {
            return Err(StepError::Mismatch {
                expected: display_value(&self.expected),
                found,
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct NoteDown {
    key: String,
    phrase: String,
    selector: String,
    attribute: String,
    notebook: Notebook,
}

#[async_trait]
impl StepCallback for NoteDown {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
        if cx.engine.selector_exists(&self.selector).await? {
            let value = cx.engine.attribute(&self.selector, &self.attribute).await?;
            cx.pass(&self.phrase);
            cx.log(
                LogLevel::Info,
                format!("I noted: {}", value.as_deref().unwrap_or("null")),
            );
            self.notebook.record(&self.key, value);
        } else {
            cx.fail(&self.phrase);
            cx.log(
                LogLevel::Info,
                format!(
                    "Did not find '{}', using selector: {}",
                    self.key, self.selector
                ),
            );
        }
        Ok(())
    }
}
