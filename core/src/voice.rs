use crate::actions::Action;
use crate::executor::Step;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Given,
    When,
    And,
    Then,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Given => "Given",
            Voice::When => "When",
            Voice::And => "And",
            Voice::Then => "Then",
        }
    }
}

impl fmt::Display for Voice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn given(action: Action) -> Step {
    action.voiced(Voice::Given)
}

pub fn when(action: Action) -> Step {
    action.voiced(Voice::When)
}

pub fn and(action: Action) -> Step {
    action.voiced(Voice::And)
}

pub fn then(action: Action) -> Step {
    action.voiced(Voice::Then)
}
