use std::{fmt, str::FromStr, time::Duration};

use chrono::{DateTime, Utc};
use log::{error, info};

use crate::BatchError;

use super::{
    build_name,
    launcher::JobLauncher,
    parameters::{JobParameters, JobParametersIncrementer},
    repository::InMemoryJobRepository,
    step::{Step, StepExecution},
};

/// Type alias for job execution results.
type JobResult<T> = Result<T, BatchError>;

/// Status of a job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// Status of a batch job prior to its execution.
    Starting,
    /// Status of a batch job that is running.
    Started,
    /// The batch job has successfully completed its execution.
    Completed,
    /// Status of a batch job that has failed during its execution.
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Started => "STARTED",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
        }
    }

    /// Whether an execution in this status is still in progress.
    pub fn is_running(&self) -> bool {
        matches!(self, BatchStatus::Starting | BatchStatus::Started)
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = BatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "STARTING" => Ok(BatchStatus::Starting),
            "STARTED" => Ok(BatchStatus::Started),
            "COMPLETED" => Ok(BatchStatus::Completed),
            "FAILED" => Ok(BatchStatus::Failed),
            other => Err(BatchError::Repository(format!(
                "unknown batch status: {}",
                other
            ))),
        }
    }
}

/// Identity of a job run: a job name together with its identifying parameters.
///
/// Relaunching a job with the same parameters targets the same instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInstance {
    pub id: i64,
    pub job_name: String,
    pub job_key: String,
}

/// Represents one execution of a job instance.
#[derive(Debug, Clone)]
pub struct JobExecution {
    pub id: i64,
    pub job_instance_id: i64,
    pub job_name: String,
    pub parameters: JobParameters,
    pub status: BatchStatus,
    pub create_time: DateTime<Utc>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Error message when the job failed
    pub exit_message: Option<String>,
    /// Executions of the steps run so far, in execution order
    pub step_executions: Vec<StepExecution>,
}

impl JobExecution {
    /// Creates an execution in `Starting` status.
    pub fn new(id: i64, instance: &JobInstance, parameters: JobParameters) -> Self {
        Self {
            id,
            job_instance_id: instance.id,
            job_name: instance.job_name.clone(),
            parameters,
            status: BatchStatus::Starting,
            create_time: Utc::now(),
            start_time: None,
            end_time: None,
            exit_message: None,
            step_executions: Vec::new(),
        }
    }

    /// Total duration of the execution, zero until the job has ended.
    pub fn duration(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
            _ => Duration::default(),
        }
    }

    pub fn step_execution(&self, name: &str) -> Option<&StepExecution> {
        self.step_executions.iter().find(|step| step.name == name)
    }
}

/// Represents a job that can be executed.
///
/// A job is a container for a sequence of steps that are executed in order.
pub trait Job {
    fn get_name(&self) -> &str;

    /// Incrementer used by the launcher to compute the next parameters.
    fn incrementer(&self) -> Option<&dyn JobParametersIncrementer> {
        None
    }

    /// Executes the steps of the job, recording their outcome in `job_execution`.
    ///
    /// # Returns
    /// - `Ok(())` when every step succeeded
    /// - `Err(BatchError::Step)` naming the first step that failed
    fn execute(&self, job_execution: &mut JobExecution) -> JobResult<()>;

    /// Launches the job once against a fresh in-memory repository.
    fn run(&self) -> JobResult<JobExecution>
    where
        Self: Sized,
    {
        let repository = InMemoryJobRepository::new();
        JobLauncher::new(&repository).run(self, JobParameters::new())
    }
}

/// Job running its steps sequentially, stopping at the first failure.
pub struct SimpleJob<'a> {
    name: String,
    incrementer: Option<Box<dyn JobParametersIncrementer>>,
    steps: Vec<&'a dyn Step>,
}

impl Job for SimpleJob<'_> {
    fn get_name(&self) -> &str {
        &self.name
    }

    fn incrementer(&self) -> Option<&dyn JobParametersIncrementer> {
        self.incrementer.as_deref()
    }

    fn execute(&self, job_execution: &mut JobExecution) -> JobResult<()> {
        job_execution.status = BatchStatus::Started;
        if job_execution.start_time.is_none() {
            job_execution.start_time = Some(Utc::now());
        }

        info!("Start of job: {}, id: {}", self.name, job_execution.id);

        for step in &self.steps {
            let mut step_execution = StepExecution::new(step.get_name());
            let result = step.execute(&mut step_execution);
            job_execution.step_executions.push(step_execution);

            if let Err(err) = result {
                error!("Step {} of job {} failed: {}", step.get_name(), self.name, err);
                job_execution.status = BatchStatus::Failed;
                job_execution.exit_message = Some(err.to_string());
                job_execution.end_time = Some(Utc::now());
                return Err(BatchError::Step(step.get_name().to_owned()));
            }
        }

        job_execution.status = BatchStatus::Completed;
        job_execution.end_time = Some(Utc::now());

        info!("End of job: {}, id: {}", self.name, job_execution.id);

        Ok(())
    }
}

/// Builder for creating a [`SimpleJob`].
///
/// # Example
///
/// ```
/// use pass_batch::core::job::{BatchStatus, Job, JobBuilder};
/// use pass_batch::core::parameters::RunIdIncrementer;
/// use pass_batch::core::step::{RepeatStatus, StepBuilder, StepExecution, Tasklet};
/// use pass_batch::BatchError;
///
/// struct Hello;
///
/// impl Tasklet for Hello {
///     fn execute(&self, _: &StepExecution) -> Result<RepeatStatus, BatchError> {
///         Ok(RepeatStatus::Finished)
///     }
/// }
///
/// let tasklet = Hello;
/// let step = StepBuilder::new("hello").tasklet(&tasklet).build();
/// let job = JobBuilder::new()
///     .name("greeting-job".to_string())
///     .incrementer(RunIdIncrementer::new())
///     .start(&step)
///     .build();
///
/// let execution = job.run().unwrap();
/// assert_eq!(execution.status, BatchStatus::Completed);
/// assert_eq!(execution.parameters.get_long("run.id"), Some(1));
/// ```
#[derive(Default)]
pub struct JobBuilder<'a> {
    /// Optional name for the job (generated randomly if not specified)
    name: Option<String>,
    incrementer: Option<Box<dyn JobParametersIncrementer>>,
    /// Collection of steps to be executed, in order
    steps: Vec<&'a dyn Step>,
}

impl<'a> JobBuilder<'a> {
    pub fn new() -> Self {
        Self {
            name: None,
            incrementer: None,
            steps: Vec::new(),
        }
    }

    pub fn name(mut self, name: String) -> JobBuilder<'a> {
        self.name = Some(name);
        self
    }

    pub fn incrementer<I>(mut self, incrementer: I) -> JobBuilder<'a>
    where
        I: JobParametersIncrementer + 'static,
    {
        self.incrementer = Some(Box::new(incrementer));
        self
    }

    /// Sets the first step of the job.
    pub fn start(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    /// Adds a step to the job. Steps are executed in the order they are added.
    pub fn next(mut self, step: &'a dyn Step) -> JobBuilder<'a> {
        self.steps.push(step);
        self
    }

    pub fn build(self) -> SimpleJob<'a> {
        SimpleJob {
            name: self.name.unwrap_or_else(build_name),
            incrementer: self.incrementer,
            steps: self.steps,
        }
    }
}
