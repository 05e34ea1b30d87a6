//! Failure-continuation policy.
//!
//! The controller consults this after every failed stage instead of each
//! stage deciding for itself whether the run may go on.

use serde::{Deserialize, Serialize};

use crate::report::model::Stage;

/// What the controller does after a stage failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Continuation {
    /// Keep going with the next stage.
    Proceed,
    /// Keep going, but skip the stages that cannot run without this one.
    SkipDependents,
    /// Skip every remaining stage.
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    fail_on_error: bool,
}

impl FailurePolicy {
    pub fn new(fail_on_error: bool) -> Self {
        Self { fail_on_error }
    }

    pub fn fail_on_error(&self) -> bool {
        self.fail_on_error
    }

    /// Decide how to continue after `stage` failed.
    ///
    /// `load_bearing` is true when the failure leaves later stages with
    /// nothing to work on, e.g. no installed environment to inspect.
    pub fn on_failure(&self, stage: Stage, load_bearing: bool) -> Continuation {
        if self.fail_on_error {
            Continuation::Abort
        } else if load_bearing && !dependents(stage).is_empty() {
            Continuation::SkipDependents
        } else {
            Continuation::Proceed
        }
    }
}

/// Stages that need `stage`'s output. Reporting depends on nothing and
/// always runs unless the run aborts.
pub fn dependents(stage: Stage) -> &'static [Stage] {
    match stage {
        Stage::Detecting => &[
            Stage::ToolSetup,
            Stage::Installing,
            Stage::Generating,
            Stage::Validating,
        ],
        Stage::Installing => &[Stage::Generating, Stage::Validating],
        Stage::Generating => &[Stage::Validating],
        Stage::ToolSetup | Stage::Validating | Stage::Reporting => &[],
    }
}
