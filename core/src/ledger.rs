use crate::evidence::Evidence;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Info,
    InfoBar,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    Banner { scenario: String },
    Passed { scenario: String, index: usize, message: String },
    Failed { scenario: String, index: usize, message: String },
    TimedOut { scenario: String, index: usize, message: String },
    Log { level: LogLevel, text: String },
    Captured { evidence: Evidence },
    Done { passed: usize, failed: usize, timed_out: usize },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub at: String,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Pass/fail sink for a run. Every signal is kept on the timeline and echoed
/// through `tracing`.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Vec<LedgerEntry>,
    passed: usize,
    failed: usize,
    timed_out: usize,
    /// Step whose log lines are being written; tags every tracing event.
    position: (String, usize),
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, scenario: &str, index: usize) {
        self.position = (scenario.to_string(), index);
    }

    pub fn position(&self) -> (&str, usize) {
        (&self.position.0, self.position.1)
    }

    pub fn banner(&mut self, scenario: &str) {
        self.log(LogLevel::Info, "");
        self.log(LogLevel::InfoBar, format!("Scenario: {scenario}"));
        self.push(LedgerEvent::Banner {
            scenario: scenario.to_string(),
        });
    }

    pub fn pass(&mut self, scenario: &str, index: usize, message: &str) {
        info!(scenario, index, "PASS {message}");
        self.passed += 1;
        self.push(LedgerEvent::Passed {
            scenario: scenario.to_string(),
            index,
            message: message.to_string(),
        });
    }

    pub fn fail(&mut self, scenario: &str, index: usize, message: &str) {
        warn!(scenario, index, "FAIL {message}");
        self.failed += 1;
        self.push(LedgerEvent::Failed {
            scenario: scenario.to_string(),
            index,
            message: message.to_string(),
        });
    }

    /// A timeout is a failure with its own channel: the step is counted
    /// separately and followed by a `Timeout` warning line.
    pub fn timeout(&mut self, scenario: &str, index: usize, message: &str) {
        warn!(scenario, index, "FAIL {message}");
        self.timed_out += 1;
        self.push(LedgerEvent::TimedOut {
            scenario: scenario.to_string(),
            index,
            message: message.to_string(),
        });
        self.log(LogLevel::Warning, "Timeout");
    }

    pub fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        let text = text.into();
        let (scenario, index) = self.position();
        match level {
            LogLevel::Info | LogLevel::InfoBar => info!(scenario, index, "{text}"),
            LogLevel::Warning => warn!(scenario, index, "{text}"),
            LogLevel::Error => error!(scenario, index, "{text}"),
        }
        self.push(LedgerEvent::Log { level, text });
    }

    pub fn captured(&mut self, evidence: Evidence) {
        info!(path = %evidence.path.display(), "captured");
        self.push(LedgerEvent::Captured { evidence });
    }

    pub fn finish(mut self) -> RunReport {
        info!(
            passed = self.passed,
            failed = self.failed,
            timed_out = self.timed_out,
            "run complete"
        );
        self.push(LedgerEvent::Done {
            passed: self.passed,
            failed: self.failed,
            timed_out: self.timed_out,
        });
        RunReport {
            passed: self.passed,
            failed: self.failed,
            timed_out: self.timed_out,
            entries: self.entries,
        }
    }

    pub fn events(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }

    fn push(&mut self, event: LedgerEvent) {
        let at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());
        self.entries.push(LedgerEntry { at, event });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub entries: Vec<LedgerEntry>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.timed_out > 0
    }

    pub fn events(&self) -> impl Iterator<Item = &LedgerEvent> {
        self.entries.iter().map(|entry| &entry.event)
    }

    pub fn evidence(&self) -> Vec<&Evidence> {
        self.events()
            .filter_map(|event| match event {
                LedgerEvent::Captured { evidence } => Some(evidence),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for event in self.events() {
            match event {
                LedgerEvent::Banner { .. } => {}
                LedgerEvent::Passed { message, .. } => writeln!(f, "PASS {message}")?,
                LedgerEvent::Failed { message, .. } | LedgerEvent::TimedOut { message, .. } => {
                    writeln!(f, "FAIL {message}")?
                }
                LedgerEvent::Log { level, text } => match level {
                    LogLevel::InfoBar => writeln!(f, "# {text}")?,
                    _ => {
                        for line in text.lines() {
                            writeln!(f, "{line}")?;
                        }
                        if text.is_empty() {
                            writeln!(f)?;
                        }
                    }
                },
                LedgerEvent::Captured { evidence } => {
                    writeln!(f, "  capture: {}", evidence.path.display())?
                }
                LedgerEvent::Done {
                    passed,
                    failed,
                    timed_out,
                } => writeln!(
                    f,
                    "{passed} passed, {failed} failed, {timed_out} timed out"
                )?,
            }
        }
        Ok(())
    }
}
