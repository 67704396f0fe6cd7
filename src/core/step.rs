use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use log::{error, info};
use uuid::Uuid;

use crate::BatchError;

/// Status of a step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step has been created but not started yet.
    Starting,
    /// The step is running.
    Started,
    /// The step finished successfully.
    Success,
    /// The step ended with an error.
    Failed,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Starting => "STARTING",
            StepStatus::Started => "STARTED",
            StepStatus::Success => "SUCCESS",
            StepStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StepStatus {
    type Err = BatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "STARTING" => Ok(StepStatus::Starting),
            "STARTED" => Ok(StepStatus::Started),
            "SUCCESS" => Ok(StepStatus::Success),
            "FAILED" => Ok(StepStatus::Failed),
            other => Err(BatchError::Repository(format!(
                "unknown step status: {}",
                other
            ))),
        }
    }
}

/// Runtime information about one execution of a step.
#[derive(Debug, Clone)]
pub struct StepExecution {
    /// Unique identifier for this step execution
    pub id: Uuid,
    /// Name of the executed step
    pub name: String,
    /// Current status of the step execution
    pub status: StepStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: Duration,
    /// Number of times the tasklet has been invoked
    pub commit_count: usize,
    /// Error message when the step failed
    pub exit_message: Option<String>,
}

impl StepExecution {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            status: StepStatus::Starting,
            start_time: None,
            end_time: None,
            duration: Duration::default(),
            commit_count: 0,
            exit_message: None,
        }
    }
}

/// A single phase of a job.
pub trait Step {
    fn get_name(&self) -> &str;

    /// Executes the step.
    ///
    /// # Returns
    /// - `Ok(())`: the step completed successfully
    /// - `Err(BatchError)`: the step failed, details are recorded in `step_execution`
    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError>;
}

/// Result of one tasklet invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatStatus {
    /// The tasklet has more work and must be invoked again.
    Continuable,
    /// The tasklet has finished executing.
    Finished,
}

/// A step implementation performing one indivisible action.
///
/// # Examples
///
/// ```
/// use pass_batch::core::step::{RepeatStatus, StepExecution, Tasklet};
/// use pass_batch::BatchError;
///
/// struct CleanupTasklet;
///
/// impl Tasklet for CleanupTasklet {
///     fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
///         Ok(RepeatStatus::Finished)
///     }
/// }
/// ```
pub trait Tasklet {
    fn execute(&self, step_execution: &StepExecution) -> Result<RepeatStatus, BatchError>;
}

/// Step delegating its work to a [`Tasklet`].
///
/// The tasklet is invoked until it reports [`RepeatStatus::Finished`] or
/// returns an error.
pub struct TaskletStep<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
}

impl Step for TaskletStep<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn execute(&self, step_execution: &mut StepExecution) -> Result<(), BatchError> {
        let start_time = Utc::now();
        step_execution.status = StepStatus::Started;
        step_execution.start_time = Some(start_time);

        info!(
            "Start of step: {}, id: {}",
            step_execution.name, step_execution.id
        );

        let result = loop {
            let repeat_status = self.tasklet.execute(step_execution);
            match repeat_status {
                Ok(RepeatStatus::Continuable) => {
                    step_execution.commit_count += 1;
                }
                Ok(RepeatStatus::Finished) => {
                    step_execution.commit_count += 1;
                    break Ok(());
                }
                Err(error) => {
                    error!("Error in tasklet of step {}: {}", self.name, error);
                    break Err(error);
                }
            }
        };

        let end_time = Utc::now();
        step_execution.end_time = Some(end_time);
        step_execution.duration = (end_time - start_time).to_std().unwrap_or_default();

        match &result {
            Ok(()) => step_execution.status = StepStatus::Success,
            Err(error) => {
                step_execution.status = StepStatus::Failed;
                step_execution.exit_message = Some(error.to_string());
            }
        }

        info!(
            "End of step: {}, id: {}, status: {}, in {:?}",
            step_execution.name, step_execution.id, step_execution.status, step_execution.duration
        );

        result
    }
}

pub struct TaskletBuilder<'a> {
    name: String,
    tasklet: &'a dyn Tasklet,
}

impl<'a> TaskletBuilder<'a> {
    pub fn build(self) -> TaskletStep<'a> {
        TaskletStep {
            name: self.name,
            tasklet: self.tasklet,
        }
    }
}

/// Entry point for building steps.
///
/// ```
/// use pass_batch::core::step::{RepeatStatus, Step, StepBuilder, StepExecution, StepStatus, Tasklet};
/// use pass_batch::BatchError;
///
/// struct Done;
///
/// impl Tasklet for Done {
///     fn execute(&self, _: &StepExecution) -> Result<RepeatStatus, BatchError> {
///         Ok(RepeatStatus::Finished)
///     }
/// }
///
/// let tasklet = Done;
/// let step = StepBuilder::new("done").tasklet(&tasklet).build();
///
/// let mut step_execution = StepExecution::new(step.get_name());
/// step.execute(&mut step_execution).unwrap();
/// assert_eq!(step_execution.status, StepStatus::Success);
/// ```
pub struct StepBuilder {
    name: String,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    pub fn tasklet<'a>(self, tasklet: &'a dyn Tasklet) -> TaskletBuilder<'a> {
        TaskletBuilder {
            name: self.name,
            tasklet,
        }
    }
}
