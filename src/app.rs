//! # Application bootstrap
//!
//! Defines the `passJob` job and its single `passStep` step, and wires them to
//! the database-backed job repository.

use log::{info, warn};
use sea_orm::DatabaseConnection;

use crate::{
    BatchError,
    config::Settings,
    core::{
        job::{JobBuilder, JobExecution, SimpleJob},
        launcher::JobLauncher,
        parameters::{JobParameters, RunIdIncrementer},
        repository::OrmJobRepository,
        step::{RepeatStatus, Step, StepBuilder, StepExecution, Tasklet, TaskletStep},
    },
    schema,
};

pub const PASS_JOB_NAME: &str = "passJob";
pub const PASS_STEP_NAME: &str = "passStep";

/// Line logged by [`PassTasklet`].
pub const PASS_MESSAGE: &str = "Execute PassStep!";

/// Tasklet that only logs a line and finishes.
#[derive(Debug, Default)]
pub struct PassTasklet;

impl Tasklet for PassTasklet {
    fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
        info!("{}", PASS_MESSAGE);
        Ok(RepeatStatus::Finished)
    }
}

pub fn pass_step(tasklet: &dyn Tasklet) -> TaskletStep<'_> {
    StepBuilder::new(PASS_STEP_NAME).tasklet(tasklet).build()
}

/// The job: a fresh `run.id` on every launch, then `step`.
pub fn pass_job<'a>(step: &'a dyn Step) -> SimpleJob<'a> {
    JobBuilder::new()
        .name(PASS_JOB_NAME.to_string())
        .incrementer(RunIdIncrementer::new())
        .start(step)
        .build()
}

/// The running application: settings plus an open database connection.
pub struct BatchApplication {
    settings: Settings,
    connection: DatabaseConnection,
}

impl BatchApplication {
    /// Connects to the configured database and prepares its schema.
    pub async fn build(settings: Settings) -> Result<Self, BatchError> {
        let connection = settings.database.connect().await?;
        schema::initialize(&connection, settings.batch.initialize_schema).await?;

        Ok(Self {
            settings,
            connection,
        })
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Launches `passJob` with `parameters` when jobs are enabled.
    ///
    /// Must be called from within a multi-threaded tokio runtime.
    pub fn run(&self, parameters: JobParameters) -> Result<Vec<JobExecution>, BatchError> {
        if !self.settings.batch.job_enabled {
            warn!("Job launching is disabled, nothing to run");
            return Ok(Vec::new());
        }

        let tasklet = PassTasklet;
        let step = pass_step(&tasklet);
        let job = pass_job(&step);

        let repository = OrmJobRepository::new(&self.connection);
        let execution = JobLauncher::new(&repository).run(&job, parameters)?;

        Ok(vec![execution])
    }
}
