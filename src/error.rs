use thiserror::Error;

#[derive(Error, Debug)]
/// Batch error
pub enum BatchError {
    #[error("Step from: {0}")]
    Step(String),

    #[error("Tasklet from: {0}")]
    Tasklet(String),

    #[error("A job instance already exists and is complete for job: {0}")]
    JobInstanceAlreadyComplete(String),

    #[error("A job execution for this job is already running: {0}")]
    JobExecutionAlreadyRunning(String),

    #[error("Invalid job parameter: {0}")]
    JobParameter(String),

    #[error("JobRepository from: {0}")]
    Repository(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ::config::ConfigError),
}
