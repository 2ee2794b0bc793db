use crate::config::{BddConfig, URL_TIMEOUT_MS};
use crate::engine::{BrowserEngine, UrlPattern};
use crate::error::{EngineError, StepError};
use crate::evidence::{evidence_path, Evidence};
use crate::ledger::{Ledger, LogLevel};
use crate::voice::Voice;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

/// Predicate over page state that a waiting step polls for.
#[derive(Debug, Clone)]
pub enum Condition {
    Selector(String),
    Url(UrlPattern),
    Text(String),
    Visible(String),
}

impl Condition {
    async fn probe(&self, engine: &mut dyn BrowserEngine) -> Result<bool, EngineError> {
        match self {
            Condition::Selector(selector) => engine.selector_exists(selector).await,
            Condition::Url(pattern) => Ok(pattern.matches(&engine.current_url().await?)),
            Condition::Text(text) => engine.text_present(text).await,
            Condition::Visible(target) => engine.is_visible(target).await,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Condition::Selector(_) => "wait_for_selector",
            Condition::Url(_) => "wait_for_url",
            Condition::Text(_) => "wait_for_text",
            Condition::Visible(_) => "wait_until_visible",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Selector(selector) => write!(f, "selector {selector}"),
            Condition::Url(pattern) => write!(f, "url {pattern}"),
            Condition::Text(text) => write!(f, "text '{text}'"),
            Condition::Visible(target) => write!(f, "visible {target}"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Strategy {
    /// Scenario header: logs the banner, never captures.
    Banner,
    Wait(Condition),
    Immediate,
}

impl Strategy {
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::Banner => "banner",
            Strategy::Wait(condition) => condition.kind(),
            Strategy::Immediate => "no_wait",
        }
    }
}

/// Position of a scheduled step: who is speaking, in which scenario, at which
/// ordinal. Index 0 is always the scenario banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepContext {
    pub voice: Option<Voice>,
    pub scenario: String,
    pub index: usize,
}

pub struct StepCx<'a> {
    pub engine: &'a mut dyn BrowserEngine,
    pub ledger: &'a mut Ledger,
    pub config: &'a BddConfig,
    pub context: &'a StepContext,
    pub message: &'a str,
    signalled: Option<WaitOutcome>,
}

impl<'a> StepCx<'a> {
    fn new(
        engine: &'a mut dyn BrowserEngine,
        ledger: &'a mut Ledger,
        config: &'a BddConfig,
        context: &'a StepContext,
        message: &'a str,
    ) -> Self {
        Self {
            engine,
            ledger,
            config,
            context,
            message,
            signalled: None,
        }
    }

    pub fn pass(&mut self, message: &str) {
        self.ledger
            .pass(&self.context.scenario, self.context.index, message);
        self.signalled = Some(WaitOutcome::Passed);
    }

    pub fn fail(&mut self, message: &str) {
        self.ledger
            .fail(&self.context.scenario, self.context.index, message);
        self.signalled = Some(WaitOutcome::Failed);
    }

    /// Last outcome a callback reported for itself, if any.
    pub fn signalled(&self) -> Option<WaitOutcome> {
        self.signalled
    }

    pub fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        self.ledger.log(level, text);
    }
}

/// Work a step performs once its condition holds (or straight away for
/// immediate steps). Returning `Err` marks the step failed; the pipeline
/// carries on regardless.
#[async_trait]
pub trait StepCallback: Send + Sync + fmt::Debug {
    async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError>;
}

pub type Callback = Arc<dyn StepCallback>;

#[derive(Debug, Clone)]
pub struct Step {
    pub voice: Option<Voice>,
    pub message: String,
    pub strategy: Strategy,
    pub callback: Option<Callback>,
    pub info: Option<String>,
}

impl Step {
    pub fn banner() -> Self {
        Self {
            voice: None,
            message: String::new(),
            strategy: Strategy::Banner,
            callback: None,
            info: None,
        }
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = Some(voice);
        self
    }
}

pub fn wait_for_selector(
    message: impl Into<String>,
    selector: impl Into<String>,
    on_success: Option<Callback>,
    info: Option<String>,
) -> Step {
    waiting(message, Condition::Selector(selector.into()), on_success, info)
}

pub fn wait_for_url(
    message: impl Into<String>,
    url: impl Into<UrlPattern>,
    on_success: Option<Callback>,
) -> Step {
    waiting(message, Condition::Url(url.into()), on_success, None)
}

pub fn wait_for_text(
    message: impl Into<String>,
    text: impl Into<String>,
    on_success: Option<Callback>,
) -> Step {
    waiting(message, Condition::Text(text.into()), on_success, None)
}

pub fn wait_until_visible(
    message: impl Into<String>,
    target: impl Into<String>,
    on_success: Option<Callback>,
) -> Step {
    waiting(message, Condition::Visible(target.into()), on_success, None)
}

pub fn no_wait(message: impl Into<String>, action: Callback) -> Step {
    Step {
        voice: None,
        message: message.into(),
        strategy: Strategy::Immediate,
        callback: Some(action),
        info: None,
    }
}

fn waiting(
    message: impl Into<String>,
    condition: Condition,
    callback: Option<Callback>,
    info: Option<String>,
) -> Step {
    Step {
        voice: None,
        message: message.into(),
        strategy: Strategy::Wait(condition),
        callback,
        info,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Passed,
    Failed,
    TimedOut,
}

/// Runs one scheduled step to its terminal state: wait (bounded), optional
/// callback, pass/fail signal, optional info line, evidence capture.
pub async fn execute_step(
    engine: &mut dyn BrowserEngine,
    ledger: &mut Ledger,
    config: &BddConfig,
    context: &StepContext,
    step: &Step,
) -> Option<WaitOutcome> {
    ledger.enter(&context.scenario, context.index);
    let outcome = match &step.strategy {
        Strategy::Banner => {
            ledger.banner(&context.scenario);
            return None;
        }
        Strategy::Wait(condition) => {
            let outcome = match await_condition(engine, condition, config).await {
                Ok(()) => {
                    let mut cx =
                        StepCx::new(&mut *engine, &mut *ledger, config, context, &step.message);
                    let result = match &step.callback {
                        Some(callback) => callback.run(&mut cx).await,
                        None => Ok(()),
                    };
                    match result {
                        Ok(()) => match cx.signalled() {
                            Some(outcome) => outcome,
                            None => {
                                cx.pass(&step.message);
                                WaitOutcome::Passed
                            }
                        },
                        Err(err) => {
                            cx.fail(&step.message);
                            cx.log(LogLevel::Error, format!("Error: {err}"));
                            WaitOutcome::Failed
                        }
                    }
                }
                Err(WaitError::Engine(err)) => {
                    ledger.fail(&context.scenario, context.index, &step.message);
                    ledger.log(LogLevel::Error, format!("Error: {err}"));
                    WaitOutcome::Failed
                }
                Err(WaitError::Elapsed) => {
                    ledger.timeout(&context.scenario, context.index, &step.message);
                    WaitOutcome::TimedOut
                }
            };
            if let Some(info) = &step.info {
                ledger.log(LogLevel::Info, info.clone());
            }
            outcome
        }
        Strategy::Immediate => {
            let mut cx = StepCx::new(&mut *engine, &mut *ledger, config, context, &step.message);
            let result = match &step.callback {
                Some(callback) => callback.run(&mut cx).await,
                None => Ok(()),
            };
            match result {
                // callbacks that report for themselves decide the outcome
                Ok(()) => cx.signalled().unwrap_or(WaitOutcome::Passed),
                Err(err) => {
                    cx.fail(&step.message);
                    cx.log(LogLevel::Error, format!("Error: {err}"));
                    WaitOutcome::Failed
                }
            }
        }
    };

    capture(engine, ledger, config, context, &step.message).await;
    Some(outcome)
}

enum WaitError {
    Elapsed,
    Engine(EngineError),
}

async fn await_condition(
    engine: &mut dyn BrowserEngine,
    condition: &Condition,
    config: &BddConfig,
) -> Result<(), WaitError> {
    let started = Instant::now();
    let interval = config.poll_interval();
    let polling = async {
        loop {
            if condition.probe(&mut *engine).await? {
                return Ok::<(), EngineError>(());
            }
            sleep(interval).await;
        }
    };
    // Dropping `polling` on expiry is what cancels the wait.
    match timeout(bound(condition, config), polling).await {
        Ok(Ok(())) => {
            debug!(%condition, elapsed_ms = started.elapsed().as_millis() as u64, "condition met");
            Ok(())
        }
        Ok(Err(err)) => Err(WaitError::Engine(err)),
        Err(_) => Err(WaitError::Elapsed),
    }
}

fn bound(condition: &Condition, config: &BddConfig) -> Duration {
    match condition {
        Condition::Url(_) => Duration::from_millis(URL_TIMEOUT_MS),
        _ => config.timeout(),
    }
}

async fn capture(
    engine: &mut dyn BrowserEngine,
    ledger: &mut Ledger,
    config: &BddConfig,
    context: &StepContext,
    message: &str,
) {
    let path = evidence_path(&config.capture_dir, &context.scenario, context.index, message);
    match engine.capture(&path).await {
        Ok(()) => ledger.captured(Evidence {
            scenario: context.scenario.clone(),
            index: context.index,
            message: message.to_string(),
            path,
        }),
        Err(err) => {
            warn!(path = %path.display(), "evidence capture failed: {err}");
            ledger.log(LogLevel::Warning, format!("Capture failed: {err}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{Call, FakeEngine};
    use crate::ledger::LedgerEvent;

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl StepCallback for Failing {
        async fn run(&self, _cx: &mut StepCx<'_>) -> Result<(), StepError> {
            Err(StepError::Assertion("boom".to_string()))
        }
    }

    #[derive(Debug)]
    struct ReportsFailure;

    #[async_trait]
    impl StepCallback for ReportsFailure {
        async fn run(&self, cx: &mut StepCx<'_>) -> Result<(), StepError> {
            let message = cx.message.to_string();
            cx.fail(&message);
            Ok(())
        }
    }

    fn context(index: usize) -> StepContext {
        StepContext {
            voice: Some(Voice::Given),
            scenario: "Checkout".to_string(),
            index,
        }
    }

    async fn run(engine: &mut FakeEngine, step: &Step) -> (Option<WaitOutcome>, Vec<LedgerEvent>) {
        let mut ledger = Ledger::new();
        let config = BddConfig::default();
        let outcome = execute_step(engine, &mut ledger, &config, &context(1), step).await;
        (outcome, ledger.events().cloned().collect())
    }

    #[tokio::test(start_paused = true)]
    async fn present_selector_passes_then_captures() {
        let mut engine = FakeEngine::new().with_selector("#cart");
        let step = wait_for_selector("Given I am on the cart", "#cart", None, None);
        let (outcome, events) = run(&mut engine, &step).await;

        assert_eq!(outcome, Some(WaitOutcome::Passed));
        assert!(matches!(events[0], LedgerEvent::Passed { index: 1, .. }));
        match &events[1] {
            LedgerEvent::Captured { evidence } => assert_eq!(
                evidence.path,
                std::path::PathBuf::from("./capture/Checkout/1-Given I am on the cart.png")
            ),
            other => panic!("expected capture, got {other:?}"),
        }
        assert_eq!(engine.captures().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_selector_times_out_after_the_bound() {
        let mut engine = FakeEngine::new();
        let step = wait_for_selector("Given I am on the cart", "#cart", None, None);
        let started = Instant::now();
        let (outcome, events) = run(&mut engine, &step).await;

        assert_eq!(outcome, Some(WaitOutcome::TimedOut));
        assert!(started.elapsed() >= Duration::from_millis(5000));
        assert!(matches!(events[0], LedgerEvent::TimedOut { .. }));
        assert_eq!(
            events[1],
            LedgerEvent::Log {
                level: LogLevel::Warning,
                text: "Timeout".to_string()
            }
        );
        assert!(matches!(events[2], LedgerEvent::Captured { .. }));
        assert_eq!(engine.captures().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn late_selector_is_found_by_polling() {
        let mut engine = FakeEngine::new().with_selector_after("#cart", 3);
        let step = wait_for_selector("Given I am on the cart", "#cart", None, None);
        let (outcome, _) = run(&mut engine, &step).await;
        assert_eq!(outcome, Some(WaitOutcome::Passed));
    }

    #[tokio::test(start_paused = true)]
    async fn callback_error_is_reported_not_propagated() {
        let mut engine = FakeEngine::new().with_text("Welcome");
        let step = wait_for_text("Then I see welcome", "Welcome", Some(Arc::new(Failing)));
        let (outcome, events) = run(&mut engine, &step).await;

        assert_eq!(outcome, Some(WaitOutcome::Failed));
        assert!(matches!(events[0], LedgerEvent::Failed { .. }));
        assert_eq!(
            events[1],
            LedgerEvent::Log {
                level: LogLevel::Error,
                text: "Error: boom".to_string()
            }
        );
        assert!(matches!(events[2], LedgerEvent::Captured { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn info_line_follows_the_signal() {
        let mut engine = FakeEngine::new().with_selector("form");
        let step = wait_for_selector("When I fill", "form", None, Some("\tuser: a".to_string()));
        let (_, events) = run(&mut engine, &step).await;
        assert!(matches!(events[0], LedgerEvent::Passed { .. }));
        assert_eq!(
            events[1],
            LedgerEvent::Log {
                level: LogLevel::Info,
                text: "\tuser: a".to_string()
            }
        );
        assert!(matches!(events[2], LedgerEvent::Captured { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn url_wait_matches_current_location() {
        let mut engine = FakeEngine::new().with_url("http://site/dashboard");
        let step = wait_for_url("Then I reached the dashboard", "dashboard", None);
        let (outcome, _) = run(&mut engine, &step).await;
        assert_eq!(outcome, Some(WaitOutcome::Passed));
    }

    #[tokio::test(start_paused = true)]
    async fn visibility_requires_more_than_presence() {
        let mut engine = FakeEngine::new().with_selector("#modal");
        let step = wait_until_visible("Then I find the modal", "#modal", None);
        let (outcome, _) = run(&mut engine, &step).await;
        assert_eq!(outcome, Some(WaitOutcome::TimedOut));

        let mut engine = FakeEngine::new().with_visible("#modal");
        let (outcome, _) = run(&mut engine, &step).await;
        assert_eq!(outcome, Some(WaitOutcome::Passed));
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_step_runs_without_probing() {
        let mut engine = FakeEngine::new();
        let step = no_wait("When I go nowhere", Arc::new(Failing));
        let (outcome, events) = run(&mut engine, &step).await;

        assert_eq!(outcome, Some(WaitOutcome::Failed));
        assert!(engine
            .calls()
            .iter()
            .all(|call| !matches!(call, Call::SelectorExists(_))));
        assert!(matches!(events.last(), Some(LedgerEvent::Captured { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn self_reported_failure_decides_the_outcome() {
        let mut engine = FakeEngine::new().with_selector("#cart");

        let step = no_wait("Then I check the cart", Arc::new(ReportsFailure));
        let (outcome, events) = run(&mut engine, &step).await;
        assert_eq!(outcome, Some(WaitOutcome::Failed));
        assert!(matches!(events[0], LedgerEvent::Failed { index: 1, .. }));

        let step = wait_for_selector(
            "Then I check the cart",
            "#cart",
            Some(Arc::new(ReportsFailure)),
            None,
        );
        let (outcome, events) = run(&mut engine, &step).await;
        assert_eq!(outcome, Some(WaitOutcome::Failed));
        let signals = events
            .iter()
            .filter(|e| matches!(e, LedgerEvent::Passed { .. } | LedgerEvent::Failed { .. }))
            .count();
        assert_eq!(signals, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn url_wait_keeps_its_own_bound() {
        let config = BddConfig {
            timeout_ms: 1000,
            ..BddConfig::default()
        };
        let mut engine = FakeEngine::new().with_url("http://site/login");

        let step = wait_for_url("Then I reached the dashboard", "dashboard", None);
        let started = Instant::now();
        let outcome =
            execute_step(&mut engine, &mut Ledger::new(), &config, &context(1), &step).await;
        assert_eq!(outcome, Some(WaitOutcome::TimedOut));
        assert!(started.elapsed() >= Duration::from_millis(URL_TIMEOUT_MS));

        let step = wait_for_selector("Given I am on the cart", "#cart", None, None);
        let started = Instant::now();
        let outcome =
            execute_step(&mut engine, &mut Ledger::new(), &config, &context(1), &step).await;
        assert_eq!(outcome, Some(WaitOutcome::TimedOut));
        assert!(started.elapsed() < Duration::from_millis(URL_TIMEOUT_MS));
    }

    #[tokio::test(start_paused = true)]
    async fn banner_never_captures() {
        let mut engine = FakeEngine::new();
        let mut ledger = Ledger::new();
        let config = BddConfig::default();
        let outcome =
            execute_step(&mut engine, &mut ledger, &config, &context(0), &Step::banner()).await;
        assert_eq!(outcome, None);
        assert!(engine.captures().is_empty());
        assert_eq!(ledger.position(), ("Checkout", 0));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_capture_is_logged_not_fatal() {
        let mut engine = FakeEngine::new().with_selector("#cart").failing_captures();
        let step = wait_for_selector("Given I am on the cart", "#cart", None, None);
        let (outcome, events) = run(&mut engine, &step).await;
        assert_eq!(outcome, Some(WaitOutcome::Passed));
        assert!(matches!(
            events.last(),
            Some(LedgerEvent::Log {
                level: LogLevel::Warning,
                ..
            })
        ));
    }
}
