use crate::config::BddConfig;
use crate::engine::BrowserEngine;
use crate::error::BddError;
use crate::executor::execute_step;
use crate::ledger::{Ledger, RunReport};
use crate::scenario::{Scheduled, Suite};
use tracing::{info, warn};

/// Drives one engine through a suite's pipeline, one step at a time.
#[derive(Debug)]
pub struct Runner<E> {
    engine: E,
    config: BddConfig,
}

impl<E: BrowserEngine> Runner<E> {
    pub fn new(engine: E, config: BddConfig) -> Self {
        Self { engine, config }
    }

    pub fn config(&self) -> &BddConfig {
        &self.config
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    pub async fn run(&mut self, entry_url: &str, suite: Suite) -> Result<RunReport, BddError> {
        self.start(entry_url).await?;
        Ok(self.drive(suite).await)
    }

    async fn start(&mut self, entry_url: &str) -> Result<(), BddError> {
        info!(entry_url, "starting engine");
        self.engine.start(entry_url).await?;
        Ok(())
    }

    async fn drive(&mut self, mut suite: Suite) -> RunReport {
        info!(
            scenarios = suite.registry().len(),
            steps = suite.pending(),
            "running pipeline"
        );
        let mut ledger = Ledger::new();
        while let Some(Scheduled { context, step }) = suite.next_scheduled() {
            execute_step(&mut self.engine, &mut ledger, &self.config, &context, &step).await;
        }
        self.shutdown().await;
        ledger.finish()
    }

    async fn shutdown(&mut self) {
        if let Err(err) = self.engine.finish().await {
            warn!("engine did not shut down cleanly: {err}");
        }
    }
}

/// Starts the engine at `entry_url`, lets `define` register (and thereby
/// schedule) scenarios, then runs the pipeline to completion.
///
/// An unknown `depends_on` name shuts the engine down before any step runs.
pub async fn scenarios<E, F>(
    engine: E,
    config: BddConfig,
    entry_url: &str,
    define: F,
) -> Result<RunReport, BddError>
where
    E: BrowserEngine,
    F: FnOnce(&mut Suite) -> Result<(), BddError>,
{
    let mut runner = Runner::new(engine, config);
    runner.start(entry_url).await?;
    let mut suite = Suite::new();
    if let Err(err) = define(&mut suite) {
        runner.shutdown().await;
        return Err(err);
    }
    Ok(runner.drive(suite).await)
}
