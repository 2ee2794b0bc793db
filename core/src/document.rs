use crate::actions::{self, auto_submit_flag, Action, Notebook};
use crate::config::BddConfig;
use crate::engine::{FormData, UrlPattern};
use crate::error::BddError;
use crate::evidence::evidence_path;
use crate::executor::Strategy;
use crate::scenario::Suite;
use crate::voice::Voice;
use comfy_table::{presets::ASCII_FULL, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Scenarios written as data (YAML or JSON) instead of code.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioDocument {
    pub entry_url: String,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    pub voice: Voice,
    #[serde(flatten)]
    pub action: ActionSpec,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionSpec {
    Am {
        message: String,
        selector: String,
    },
    Reached {
        message: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        url_regex: Option<String>,
    },
    Fill {
        message: String,
        selector: String,
        #[serde(default)]
        fields: FormData,
        #[serde(default)]
        auto_submit: Option<Value>,
    },
    Click {
        message: String,
        selector: String,
    },
    ClickTheLabel {
        label: String,
    },
    Find {
        message: String,
        selector: String,
    },
    FindTheVisible {
        message: String,
        selector: String,
    },
    GoTo {
        message: String,
        url: String,
    },
    See {
        message: String,
        text: String,
    },
    CanSee {
        message: String,
        text: String,
    },
    ShouldNotSee {
        message: String,
        text: String,
    },
    CannotFindThe {
        message: String,
        selector: String,
    },
    SeeTheValueOf {
        message: String,
        selector: String,
        is: Value,
    },
    NoteDown {
        message: String,
        selector: String,
        attribute: String,
    },
}

impl ActionSpec {
    pub fn name(&self) -> &'static str {
        match self {
            ActionSpec::Am { .. } => "am",
            ActionSpec::Reached { .. } => "reached",
            ActionSpec::Fill { .. } => "fill",
            ActionSpec::Click { .. } => "click",
            ActionSpec::ClickTheLabel { .. } => "click_the_label",
            ActionSpec::Find { .. } => "find",
            ActionSpec::FindTheVisible { .. } => "find_the_visible",
            ActionSpec::GoTo { .. } => "go_to",
            ActionSpec::See { .. } => "see",
            ActionSpec::CanSee { .. } => "can_see",
            ActionSpec::ShouldNotSee { .. } => "should_not_see",
            ActionSpec::CannotFindThe { .. } => "cannot_find_the",
            ActionSpec::SeeTheValueOf { .. } => "see_the_value_of",
            ActionSpec::NoteDown { .. } => "note_down",
        }
    }

    pub fn to_action(&self, notebook: &Notebook) -> Result<Action, BddError> {
        let action = match self {
            ActionSpec::Am { message, selector } => actions::am(message, selector),
            ActionSpec::Reached {
                message,
                url,
                url_regex,
            } => actions::reached(message, url_pattern(url.as_deref(), url_regex.as_deref())?),
            ActionSpec::Fill {
                message,
                selector,
                fields,
                auto_submit,
            } => actions::fill(
                message,
                selector,
                fields.clone(),
                Some(auto_submit_flag(auto_submit.as_ref())),
            ),
            ActionSpec::Click { message, selector } => actions::click(message, selector),
            ActionSpec::ClickTheLabel { label } => actions::click_the_label(label),
            ActionSpec::Find { message, selector } => actions::find(message, selector),
            ActionSpec::FindTheVisible { message, selector } => {
                actions::find_the_visible(message, selector)
            }
            ActionSpec::GoTo { message, url } => actions::go_to(message, url),
            ActionSpec::See { message, text } => actions::see(message, text),
            ActionSpec::CanSee { message, text } => actions::can_see(message, text),
            ActionSpec::ShouldNotSee { message, text } => actions::should_not_see(message, text),
            ActionSpec::CannotFindThe { message, selector } => {
                actions::cannot_find_the(message, selector)
            }
            ActionSpec::SeeTheValueOf {
                message,
                selector,
                is,
            } => actions::see_the_value_of(message, selector).is(is.clone()),
            ActionSpec::NoteDown {
                message,
                selector,
                attribute,
            } => actions::note_down(message, selector, attribute, notebook),
        };
        Ok(action)
    }
}

/// `url_regex` wins when both forms are given.
pub(crate) fn url_pattern(
    url: Option<&str>,
    url_regex: Option<&str>,
) -> Result<UrlPattern, BddError> {
    match (url, url_regex) {
        (_, Some(pattern)) => UrlPattern::regex(pattern)
            .map_err(|err| BddError::Document(format!("invalid url_regex '{pattern}': {err}"))),
        (Some(url), None) => Ok(UrlPattern::from(url)),
        (None, None) => Err(BddError::Document(
            "reached needs either url or url_regex".to_string(),
        )),
    }
}

impl ScenarioDocument {
    pub fn from_yaml_str(source: &str) -> Result<Self, BddError> {
        serde_yaml::from_str(source).map_err(|err| BddError::Document(err.to_string()))
    }

    pub fn from_json_str(source: &str) -> Result<Self, BddError> {
        serde_json::from_str(source).map_err(|err| BddError::Document(err.to_string()))
    }

    /// `.json` files are read as JSON, anything else as YAML.
    pub fn load(path: &Path) -> Result<Self, BddError> {
        let content = fs::read_to_string(path).map_err(|source| BddError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            _ => Self::from_yaml_str(&content),
        }
    }

    /// Defines every scenario in document order. Dependencies are replayed
    /// ahead of the scenario that names them.
    pub fn install(&self, suite: &mut Suite, notebook: &Notebook) -> Result<(), BddError> {
        for spec in &self.scenarios {
            for dependency in &spec.depends_on {
                suite.depends_on(dependency)?;
            }
            let steps = spec
                .steps
                .iter()
                .map(|step| Ok(step.action.to_action(notebook)?.voiced(step.voice)))
                .collect::<Result<Vec<_>, BddError>>()?;
            suite.scenario(&spec.name, steps)?;
        }
        Ok(())
    }

    /// Dry run: the pipeline this document would schedule, with the evidence
    /// file each step would leave behind.
    pub fn plan(&self, config: &BddConfig) -> Result<Plan, BddError> {
        let mut suite = Suite::new();
        self.install(&mut suite, &Notebook::new())?;
        let rows = suite
            .scheduled()
            .map(|item| {
                let evidence = match item.step.strategy {
                    Strategy::Banner => None,
                    _ => Some(evidence_path(
                        &config.capture_dir,
                        &item.context.scenario,
                        item.context.index,
                        &item.step.message,
                    )),
                };
                let message = match item.step.strategy {
                    Strategy::Banner => format!("Scenario: {}", item.context.scenario),
                    _ => item.step.message.clone(),
                };
                PlanRow {
                    scenario: item.context.scenario.clone(),
                    index: item.context.index,
                    executor: item.step.strategy.kind().to_string(),
                    message,
                    evidence,
                }
            })
            .collect();
        Ok(Plan {
            entry_url: self.entry_url.clone(),
            timeout_ms: config.timeout_ms,
            rows,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub entry_url: String,
    pub timeout_ms: u64,
    pub rows: Vec<PlanRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRow {
    pub scenario: String,
    pub index: usize,
    pub executor: String,
    pub message: String,
    pub evidence: Option<PathBuf>,
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Entry: {}", self.entry_url)?;
        writeln!(f, "Timeout: {} ms", self.timeout_ms)?;
        if self.rows.is_empty() {
            writeln!(f, "No steps scheduled.")?;
            return Ok(());
        }

        let mut table = Table::new();
        table.load_preset(ASCII_FULL);
        table.set_header(vec!["scenario", "#", "executor", "message", "evidence"]);
        for row in &self.rows {
            let evidence = row
                .evidence
                .as_ref()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            table.add_row(vec![
                row.scenario.clone(),
                row.index.to_string(),
                row.executor.clone(),
                row.message.clone(),
                evidence,
            ]);
        }
        writeln!(f, "{table}")
    }
}
