//! # Job repository
//!
//! Bookkeeping of job instances and their executions. The launcher consults
//! the repository to compute the next run identifier and to refuse launching
//! an instance that already completed.

use crate::BatchError;

use super::{
    job::{JobExecution, JobInstance},
    parameters::JobParameters,
    step::StepExecution,
};

mod in_memory;

mod orm;

/// sea-orm entities of the batch bookkeeping tables.
pub mod tables;

pub use in_memory::InMemoryJobRepository;
pub use orm::OrmJobRepository;

type RepositoryResult<T> = Result<T, BatchError>;

/// Storage of job instances, job executions and step executions.
pub trait JobRepository {
    /// Returns the most recently created instance of the job, if any.
    fn get_last_job_instance(&self, job_name: &str) -> RepositoryResult<Option<JobInstance>>;

    /// Returns the instance identified by `job_name` and `parameters`, if any.
    fn get_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<Option<JobInstance>>;

    fn create_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobInstance>;

    /// Creates a new execution of `instance` in `Starting` status.
    fn create_job_execution(
        &self,
        instance: &JobInstance,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobExecution>;

    /// Persists status, times and exit message of the execution.
    fn update_job_execution(&self, job_execution: &JobExecution) -> RepositoryResult<()>;

    fn add_step_execution(
        &self,
        job_execution_id: i64,
        step_execution: &StepExecution,
    ) -> RepositoryResult<()>;

    /// Returns the most recent execution of `instance`, with its step executions.
    fn get_last_job_execution(
        &self,
        instance: &JobInstance,
    ) -> RepositoryResult<Option<JobExecution>>;

    /// Returns every execution of the job, oldest first.
    fn find_job_executions(&self, job_name: &str) -> RepositoryResult<Vec<JobExecution>>;
}
