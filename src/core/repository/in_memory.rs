use std::cell::RefCell;

use crate::core::{
    job::{JobExecution, JobInstance},
    parameters::JobParameters,
    step::StepExecution,
};

use super::{JobRepository, RepositoryResult};
use crate::BatchError;

#[derive(Default)]
struct State {
    instances: Vec<JobInstance>,
    executions: Vec<JobExecution>,
}

/// Job repository keeping everything in process memory.
///
/// History is lost when the repository is dropped. Useful for tests and for
/// running jobs without a database.
#[derive(Default)]
pub struct InMemoryJobRepository {
    state: RefCell<State>,
}

impl InMemoryJobRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobRepository for InMemoryJobRepository {
    fn get_last_job_instance(&self, job_name: &str) -> RepositoryResult<Option<JobInstance>> {
        let state = self.state.borrow();
        Ok(state
            .instances
            .iter()
            .rev()
            .find(|instance| instance.job_name == job_name)
            .cloned())
    }

    fn get_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<Option<JobInstance>> {
        let job_key = parameters.job_key();
        let state = self.state.borrow();
        Ok(state
            .instances
            .iter()
            .find(|instance| instance.job_name == job_name && instance.job_key == job_key)
            .cloned())
    }

    fn create_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobInstance> {
        let mut state = self.state.borrow_mut();
        let instance = JobInstance {
            id: state.instances.len() as i64 + 1,
            job_name: job_name.to_string(),
            job_key: parameters.job_key(),
        };
        state.instances.push(instance.clone());
        Ok(instance)
    }

    fn create_job_execution(
        &self,
        instance: &JobInstance,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobExecution> {
        let mut state = self.state.borrow_mut();
        let id = state.executions.len() as i64 + 1;
        let execution = JobExecution::new(id, instance, parameters.clone());
        state.executions.push(execution.clone());
        Ok(execution)
    }

    fn update_job_execution(&self, job_execution: &JobExecution) -> RepositoryResult<()> {
        let mut state = self.state.borrow_mut();
        let stored = state
            .executions
            .iter_mut()
            .find(|execution| execution.id == job_execution.id)
            .ok_or_else(|| {
                BatchError::Repository(format!("unknown job execution: {}", job_execution.id))
            })?;

        stored.status = job_execution.status;
        stored.start_time = job_execution.start_time;
        stored.end_time = job_execution.end_time;
        stored.exit_message = job_execution.exit_message.clone();
        Ok(())
    }

    fn add_step_execution(
        &self,
        job_execution_id: i64,
        step_execution: &StepExecution,
    ) -> RepositoryResult<()> {
        let mut state = self.state.borrow_mut();
        let stored = state
            .executions
            .iter_mut()
            .find(|execution| execution.id == job_execution_id)
            .ok_or_else(|| {
                BatchError::Repository(format!("unknown job execution: {}", job_execution_id))
            })?;

        stored.step_executions.push(step_execution.clone());
        Ok(())
    }

    fn get_last_job_execution(
        &self,
        instance: &JobInstance,
    ) -> RepositoryResult<Option<JobExecution>> {
        let state = self.state.borrow();
        Ok(state
            .executions
            .iter()
            .rev()
            .find(|execution| execution.job_instance_id == instance.id)
            .cloned())
    }

    fn find_job_executions(&self, job_name: &str) -> RepositoryResult<Vec<JobExecution>> {
        let state = self.state.borrow();
        Ok(state
            .executions
            .iter()
            .filter(|execution| execution.job_name == job_name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{
        job::BatchStatus,
        parameters::{JobParameter, JobParameters},
        step::StepExecution,
    };

    use super::*;

    #[test]
    fn instances_are_keyed_by_name_and_parameters() -> RepositoryResult<()> {
        let repository = InMemoryJobRepository::new();
        let first = JobParameters::new().with("run.id", JobParameter::Long(1));
        let second = JobParameters::new().with("run.id", JobParameter::Long(2));

        let instance = repository.create_job_instance("job", &first)?;

        assert_eq!(repository.get_job_instance("job", &first)?, Some(instance));
        assert_eq!(repository.get_job_instance("job", &second)?, None);
        assert_eq!(repository.get_job_instance("other", &first)?, None);
        Ok(())
    }

    #[test]
    fn last_instance_is_the_newest() -> RepositoryResult<()> {
        let repository = InMemoryJobRepository::new();
        repository.create_job_instance("job", &JobParameters::new())?;
        let newest = repository.create_job_instance(
            "job",
            &JobParameters::new().with("run.id", JobParameter::Long(2)),
        )?;
        repository.create_job_instance("other", &JobParameters::new())?;

        assert_eq!(repository.get_last_job_instance("job")?, Some(newest));
        assert_eq!(repository.get_last_job_instance("missing")?, None);
        Ok(())
    }

    #[test]
    fn executions_are_updated_and_listed() -> RepositoryResult<()> {
        let repository = InMemoryJobRepository::new();
        let parameters = JobParameters::new();
        let instance = repository.create_job_instance("job", &parameters)?;
        let mut execution = repository.create_job_execution(&instance, &parameters)?;

        execution.status = BatchStatus::Completed;
        repository.update_job_execution(&execution)?;
        repository.add_step_execution(execution.id, &StepExecution::new("step"))?;

        let last = repository.get_last_job_execution(&instance)?.unwrap();
        assert_eq!(last.status, BatchStatus::Completed);
        assert_eq!(last.step_executions.len(), 1);
        assert_eq!(repository.find_job_executions("job")?.len(), 1);
        Ok(())
    }

    #[test]
    fn updating_unknown_execution_fails() -> RepositoryResult<()> {
        let repository = InMemoryJobRepository::new();
        let instance = repository.create_job_instance("job", &JobParameters::new())?;
        let mut execution = repository.create_job_execution(&instance, &JobParameters::new())?;
        execution.id = 42;

        assert!(matches!(
            repository.update_job_execution(&execution),
            Err(BatchError::Repository(_))
        ));
        assert!(repository
            .add_step_execution(42, &StepExecution::new("step"))
            .is_err());
        Ok(())
    }
}
