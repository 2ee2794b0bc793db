pub mod actions;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod executor;
pub mod ledger;
pub mod runtime;
pub mod scenario;
pub mod validation;
pub mod voice;

#[cfg(test)]
mod fake;

pub use actions::{auto_submit_flag, Action, Notebook, ValueCheck};
pub use config::BddConfig;
pub use document::{ActionSpec, Plan, PlanRow, ScenarioDocument, ScenarioSpec, StepSpec};
pub use engine::{BrowserEngine, FormData, UrlPattern};
pub use error::{BddError, EngineError, StepError};
pub use evidence::{evidence_path, sanitize_message, Evidence};
pub use executor::{
    execute_step, no_wait, wait_for_selector, wait_for_text, wait_for_url, wait_until_visible,
    Callback, Condition, Step, StepCallback, StepContext, StepCx, Strategy, WaitOutcome,
};
pub use ledger::{Ledger, LedgerEntry, LedgerEvent, LogLevel, RunReport};
pub use runtime::{scenarios, Runner};
pub use scenario::{Scenario, ScenarioRegistry, Scheduled, Suite};
pub use validation::{validate_document, Diagnostic, DiagnosticLevel};
pub use voice::{and, given, then, when, Voice};
