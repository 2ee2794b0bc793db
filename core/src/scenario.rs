use crate::error::BddError;
use crate::executor::{Step, StepContext};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    /// Banner first, then the author's steps in declaration order.
    pub steps: Vec<Arc<Step>>,
}

#[derive(Debug, Default)]
pub struct ScenarioRegistry {
    scenarios: HashMap<String, Scenario>,
}

impl ScenarioRegistry {
    /// Stores `scenario`, replacing any earlier one with the same name.
    pub fn insert(&mut self, scenario: Scenario) -> Option<Scenario> {
        self.scenarios.insert(scenario.name.clone(), scenario)
    }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Scheduled {
    pub context: StepContext,
    pub step: Arc<Step>,
}

/// Registry plus the linear pipeline it feeds. Defining a scenario schedules
/// it straight away; the runner later drains the pipeline in append order.
#[derive(Debug, Default)]
pub struct Suite {
    registry: ScenarioRegistry,
    pipeline: VecDeque<Scheduled>,
}

impl Suite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scenario(
        &mut self,
        name: &str,
        steps: impl IntoIterator<Item = Step>,
    ) -> Result<(), BddError> {
        let mut all = vec![Arc::new(Step::banner())];
        all.extend(steps.into_iter().map(Arc::new));
        let replaced = self.registry.insert(Scenario {
            name: name.to_string(),
            steps: all,
        });
        if replaced.is_some() {
            debug!(scenario = name, "scenario redefined");
        }
        self.depends_on(name)
    }

    /// Schedules every step of an already defined scenario behind whatever is
    /// queued so far.
    pub fn depends_on(&mut self, name: &str) -> Result<(), BddError> {
        let scenario = self
            .registry
            .get(name)
            .ok_or_else(|| BddError::UnknownScenario(name.to_string()))?;
        for (index, step) in scenario.steps.iter().enumerate() {
            self.pipeline.push_back(Scheduled {
                context: StepContext {
                    voice: step.voice,
                    scenario: scenario.name.clone(),
                    index,
                },
                step: Arc::clone(step),
            });
        }
        debug!(
            scenario = name,
            steps = scenario.steps.len(),
            queued = self.pipeline.len(),
            "scenario scheduled"
        );
        Ok(())
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    pub fn pending(&self) -> usize {
        self.pipeline.len()
    }

    pub fn scheduled(&self) -> impl Iterator<Item = &Scheduled> {
        self.pipeline.iter()
    }

    pub(crate) fn next_scheduled(&mut self) -> Option<Scheduled> {
        self.pipeline.pop_front()
    }
}
