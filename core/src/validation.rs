use crate::document::{url_pattern, ActionSpec, ScenarioDocument, ScenarioSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub location: Option<String>,
    pub message: String,
}

impl Diagnostic {
    fn error(location: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            location,
            message: message.into(),
        }
    }

    fn warning(location: Option<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            location,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.level, DiagnosticLevel::Error)
    }
}

/// Checks a document before anything is scheduled. Errors here are the
/// mistakes that would otherwise abort a run (unknown dependencies) or make a
/// step meaningless (empty selectors, bad url patterns).
pub fn validate_document(document: &ScenarioDocument) -> Vec<Diagnostic> {
    let mut ctx = ValidationContext::new();

    if document.entry_url.trim().is_empty() {
        ctx.error("entry_url cannot be empty");
    }

    let all_names: HashSet<&str> = document
        .scenarios
        .iter()
        .map(|spec| spec.name.as_str())
        .collect();
    let mut defined: HashSet<&str> = HashSet::new();
    let mut notes: HashSet<&str> = HashSet::new();

    for spec in &document.scenarios {
        ctx.push(format!("scenario {}", spec.name));
        if spec.name.trim().is_empty() {
            ctx.error("scenario name cannot be empty");
        }
        if defined.contains(spec.name.as_str()) {
            ctx.warning(format!(
                "scenario '{}' is defined more than once; the last definition wins",
                spec.name
            ));
        }
        validate_dependencies(spec, &all_names, &defined, &mut ctx);
        validate_steps(spec, &mut notes, &mut ctx);
        defined.insert(spec.name.as_str());
        ctx.pop();
    }

    ctx.finish()
}

struct ValidationContext {
    stack: Vec<String>,
    diagnostics: Vec<Diagnostic>,
}

impl ValidationContext {
    fn new() -> Self {
        Self {
            stack: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn push(&mut self, label: String) {
        self.stack.push(label);
    }

    fn pop(&mut self) {
        self.stack.pop();
    }

    fn location(&self) -> Option<String> {
        if self.stack.is_empty() {
            None
        } else {
            Some(self.stack.join(" > "))
        }
    }

    fn error(&mut self, message: impl Into<String>) {
        let diag = Diagnostic::error(self.location(), message);
        self.diagnostics.push(diag);
    }

    fn warning(&mut self, message: impl Into<String>) {
        let diag = Diagnostic::warning(self.location(), message);
        self.diagnostics.push(diag);
    }

    fn finish(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

fn validate_dependencies(
    spec: &ScenarioSpec,
    all_names: &HashSet<&str>,
    defined: &HashSet<&str>,
    ctx: &mut ValidationContext,
) {
    for dependency in &spec.depends_on {
        if defined.contains(dependency.as_str()) {
            continue;
        }
        if all_names.contains(dependency.as_str()) {
            ctx.error(format!(
                "depends on '{dependency}', which is only defined later in the document"
            ));
        } else {
            ctx.error(format!("depends on undefined scenario '{dependency}'"));
        }
    }
}

fn validate_steps<'a>(
    spec: &'a ScenarioSpec,
    notes: &mut HashSet<&'a str>,
    ctx: &mut ValidationContext,
) {
    if spec.steps.is_empty() {
        ctx.warning("scenario has no steps; only its banner will run");
    }
    for (offset, step) in spec.steps.iter().enumerate() {
        // sequence index 0 belongs to the banner
        ctx.push(format!("step {} ({})", offset + 1, step.action.name()));
        validate_action(&step.action, notes, ctx);
        ctx.pop();
    }
}

fn validate_action<'a>(
    action: &'a ActionSpec,
    notes: &mut HashSet<&'a str>,
    ctx: &mut ValidationContext,
) {
    match action {
        ActionSpec::Am { selector, .. }
        | ActionSpec::Click { selector, .. }
        | ActionSpec::Find { selector, .. }
        | ActionSpec::FindTheVisible { selector, .. }
        | ActionSpec::CannotFindThe { selector, .. } => require("selector", selector, ctx),
        ActionSpec::See { text, .. }
        | ActionSpec::CanSee { text, .. }
        | ActionSpec::ShouldNotSee { text, .. } => require("text", text, ctx),
        ActionSpec::ClickTheLabel { label } => require("label", label, ctx),
        ActionSpec::GoTo { url, .. } => require("url", url, ctx),
        ActionSpec::Reached { url, url_regex, .. } => {
            if url.is_some() && url_regex.is_some() {
                ctx.warning("both url and url_regex are set; url_regex is used");
            }
            if let Err(err) = url_pattern(url.as_deref(), url_regex.as_deref()) {
                ctx.error(err.to_string());
            }
        }
        ActionSpec::Fill {
            selector,
            fields,
            auto_submit,
            ..
        } => {
            require("selector", selector, ctx);
            if fields.is_empty() {
                ctx.warning("fill has no fields");
            }
            match auto_submit {
                None | Some(Value::Bool(_)) => {}
                Some(other) => ctx.warning(format!(
                    "auto_submit is {other}, not a boolean; the form will not be submitted"
                )),
            }
        }
        ActionSpec::SeeTheValueOf { selector, is, .. } => {
            require("selector", selector, ctx);
            if !is.is_string() {
                ctx.warning(format!(
                    "expected value {is} is not a string; fetched text will never equal it"
                ));
            }
        }
        ActionSpec::NoteDown {
            message,
            selector,
            attribute,
        } => {
            require("selector", selector, ctx);
            require("attribute", attribute, ctx);
            if !notes.insert(message.as_str()) {
                ctx.warning(format!(
                    "note '{message}' is recorded more than once; later values overwrite earlier ones"
                ));
            }
        }
    }
}

fn require(field: &str, value: &str, ctx: &mut ValidationContext) {
    if value.trim().is_empty() {
        ctx.error(format!("{field} cannot be empty"));
    }
}
