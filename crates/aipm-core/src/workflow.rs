use crate::error::{AipmError, Result};
use crate::paths::Layout;
use crate::source::AnswerSource;
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// A document-producing command: check preconditions, perform the side
/// effect, then report. Each step runs exactly once; there is no resume.
pub trait WorkflowStep {
    type Output;

    fn name(&self) -> &str;

    /// `Ok(false)` stops the step without side effects: either a precondition
    /// is unmet (already logged) or the user declined an overwrite.
    fn validate_preconditions(&mut self) -> Result<bool>;

    fn execute(&mut self) -> Result<Self::Output>;

    /// Write the summary and suggested next command.
    fn post_process(&mut self, output: &Self::Output) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    Created,
    PreconditionsChecked,
    Executed,
    PostProcessed,
    Failed,
}

impl StepState {
    pub fn as_str(self) -> &'static str {
        match self {
            StepState::Created => "created",
            StepState::PreconditionsChecked => "preconditions_checked",
            StepState::Executed => "executed",
            StepState::PostProcessed => "post_processed",
            StepState::Failed => "failed",
        }
    }
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drives one [`WorkflowStep`] through its phases and remembers where it stopped.
#[derive(Debug)]
pub struct StepRunner {
    state: StepState,
}

impl Default for StepRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRunner {
    pub fn new() -> Self {
        Self {
            state: StepState::Created,
        }
    }

    pub fn state(&self) -> StepState {
        self.state
    }

    fn transition(&mut self, step: &str, to: StepState) {
        tracing::debug!(step, from = %self.state, to = %to, "step transition");
        self.state = to;
    }

    pub fn run<S: WorkflowStep>(&mut self, step: &mut S) -> Result<S::Output> {
        let name = step.name().to_string();
        match self.run_phases(step, &name) {
            Ok(output) => Ok(output),
            Err(e) => {
                self.transition(&name, StepState::Failed);
                Err(e)
            }
        }
    }

    fn run_phases<S: WorkflowStep>(&mut self, step: &mut S, name: &str) -> Result<S::Output> {
        if !step.validate_preconditions()? {
            return Err(AipmError::Precondition(name.to_string()));
        }
        self.transition(name, StepState::PreconditionsChecked);

        let output = step.execute()?;
        self.transition(name, StepState::Executed);

        if !step.post_process(&output)? {
            return Err(AipmError::PostProcess(name.to_string()));
        }
        self.transition(name, StepState::PostProcessed);
        Ok(output)
    }
}

/// Run a step with a fresh runner.
pub fn run_step<S: WorkflowStep>(step: &mut S) -> Result<S::Output> {
    StepRunner::new().run(step)
}

/// What every generation step is handed: where documents live, where
/// answers come from, and where the human-readable summary goes.
pub struct StepContext<'a> {
    pub layout: &'a Layout,
    pub answers: &'a mut dyn AnswerSource,
    pub out: &'a mut dyn Write,
}

impl<'a> StepContext<'a> {
    pub fn new(
        layout: &'a Layout,
        answers: &'a mut dyn AnswerSource,
        out: &'a mut dyn Write,
    ) -> Self {
        Self {
            layout,
            answers,
            out,
        }
    }

    /// Confirm replacing `path` when it already exists. `Ok(true)` when the
    /// path is free or the answer source agrees.
    pub fn may_overwrite(&mut self, path: &Path) -> Result<bool> {
        if !path.exists() {
            return Ok(true);
        }
        tracing::warn!(path = %path.display(), "file already exists");
        let ok = self.answers.confirm_overwrite(path)?;
        if !ok {
            tracing::info!(path = %path.display(), "overwrite declined");
        }
        Ok(ok)
    }
}
