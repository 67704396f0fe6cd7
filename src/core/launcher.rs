use chrono::Utc;
use log::{error, info, warn};

use crate::BatchError;

use super::{
    job::{BatchStatus, Job, JobExecution},
    parameters::JobParameters,
    repository::JobRepository,
};

/// Launches jobs and records their executions in a [`JobRepository`].
///
/// For a job carrying an incrementer, the parameters of the job's last
/// execution are fed to the incrementer and the caller's parameters are
/// merged on top. The resulting parameters identify the job instance:
///
/// - a new instance is created when none matches;
/// - an instance whose last execution completed is refused with
///   [`BatchError::JobInstanceAlreadyComplete`];
/// - an instance whose last execution is still running is refused with
///   [`BatchError::JobExecutionAlreadyRunning`];
/// - an instance whose last execution failed is run again.
///
/// A job that fails is reported through the returned execution's status; an
/// `Err` means the job could not be launched or its execution could not be
/// recorded.
///
/// # Examples
///
/// ```
/// use pass_batch::core::job::{BatchStatus, JobBuilder};
/// use pass_batch::core::launcher::JobLauncher;
/// use pass_batch::core::parameters::{JobParameters, RunIdIncrementer};
/// use pass_batch::core::repository::InMemoryJobRepository;
/// use pass_batch::core::step::{RepeatStatus, StepBuilder, StepExecution, Tasklet};
/// use pass_batch::BatchError;
///
/// struct Noop;
///
/// impl Tasklet for Noop {
///     fn execute(&self, _: &StepExecution) -> Result<RepeatStatus, BatchError> {
///         Ok(RepeatStatus::Finished)
///     }
/// }
///
/// let tasklet = Noop;
/// let step = StepBuilder::new("noop").tasklet(&tasklet).build();
/// let job = JobBuilder::new()
///     .name("noop-job".to_string())
///     .incrementer(RunIdIncrementer::new())
///     .start(&step)
///     .build();
///
/// let repository = InMemoryJobRepository::new();
/// let launcher = JobLauncher::new(&repository);
///
/// let first = launcher.run(&job, JobParameters::new()).unwrap();
/// let second = launcher.run(&job, JobParameters::new()).unwrap();
///
/// assert_eq!(first.status, BatchStatus::Completed);
/// assert_eq!(first.parameters.get_long("run.id"), Some(1));
/// assert_eq!(second.parameters.get_long("run.id"), Some(2));
/// ```
pub struct JobLauncher<'a> {
    repository: &'a dyn JobRepository,
}

impl<'a> JobLauncher<'a> {
    pub fn new(repository: &'a dyn JobRepository) -> Self {
        Self { repository }
    }

    /// Runs `job` with `parameters` and returns the recorded execution.
    pub fn run(
        &self,
        job: &dyn Job,
        parameters: JobParameters,
    ) -> Result<JobExecution, BatchError> {
        let job_name = job.get_name();
        let parameters = self.next_parameters(job, parameters)?;

        let instance = match self.repository.get_job_instance(job_name, &parameters)? {
            Some(instance) => {
                if let Some(last_execution) = self.repository.get_last_job_execution(&instance)? {
                    match last_execution.status {
                        BatchStatus::Completed => {
                            return Err(BatchError::JobInstanceAlreadyComplete(format!(
                                "{} with parameters {}",
                                job_name, parameters
                            )));
                        }
                        status if status.is_running() => {
                            return Err(BatchError::JobExecutionAlreadyRunning(format!(
                                "{} (execution {})",
                                job_name, last_execution.id
                            )));
                        }
                        _ => {
                            warn!(
                                "Restarting job: [{}] after failed execution {}",
                                job_name, last_execution.id
                            );
                        }
                    }
                }
                instance
            }
            None => self.repository.create_job_instance(job_name, &parameters)?,
        };

        let mut job_execution = self.repository.create_job_execution(&instance, &parameters)?;

        info!(
            "Job: [{}] launched with the following parameters: [{}]",
            job_name, parameters
        );

        job_execution.status = BatchStatus::Started;
        job_execution.start_time = Some(Utc::now());
        self.repository.update_job_execution(&job_execution)?;

        if let Err(error) = job.execute(&mut job_execution) {
            warn!("Job: [{}] failed: {}", job_name, error);
            // A job may fail without recording it; never leave the execution running.
            if job_execution.status.is_running() {
                mark_failed(&mut job_execution, &error);
            }
        }

        if let Err(error) = self.record(&job_execution) {
            error!(
                "Job: [{}] execution {} could not be recorded: {}",
                job_name, job_execution.id, error
            );
            mark_failed(&mut job_execution, &error);
            if let Err(update_error) = self.repository.update_job_execution(&job_execution) {
                error!(
                    "Job: [{}] execution {} could not be marked as failed: {}",
                    job_name, job_execution.id, update_error
                );
            }
            return Err(error);
        }

        info!(
            "Job: [{}] completed with the following parameters: [{}] and the following status: [{}] in {:?}",
            job_name,
            parameters,
            job_execution.status,
            job_execution.duration()
        );

        Ok(job_execution)
    }

    /// Stores the step executions and the final state of `job_execution`.
    fn record(&self, job_execution: &JobExecution) -> Result<(), BatchError> {
        for step_execution in &job_execution.step_executions {
            self.repository
                .add_step_execution(job_execution.id, step_execution)?;
        }
        self.repository.update_job_execution(job_execution)
    }

    /// Computes the parameters of the next launch of `job`.
    fn next_parameters(
        &self,
        job: &dyn Job,
        parameters: JobParameters,
    ) -> Result<JobParameters, BatchError> {
        let Some(incrementer) = job.incrementer() else {
            return Ok(parameters);
        };

        let previous = match self.repository.get_last_job_instance(job.get_name())? {
            Some(instance) => self
                .repository
                .get_last_job_execution(&instance)?
                .map(|execution| execution.parameters),
            None => None,
        };

        Ok(incrementer.get_next(previous.as_ref()).merge(&parameters))
    }
}

fn mark_failed(job_execution: &mut JobExecution, error: &BatchError) {
    job_execution.status = BatchStatus::Failed;
    job_execution.exit_message = Some(error.to_string());
    job_execution.end_time = Some(Utc::now());
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use crate::core::{
        job::{JobBuilder, JobInstance},
        parameters::{JobParameter, RunIdIncrementer},
        repository::InMemoryJobRepository,
        step::{RepeatStatus, StepBuilder, StepExecution, StepStatus, Tasklet},
    };

    use super::*;

    struct FlakyTasklet {
        failures_left: Cell<usize>,
    }

    impl Tasklet for FlakyTasklet {
        fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
            let failures_left = self.failures_left.get();
            if failures_left > 0 {
                self.failures_left.set(failures_left - 1);
                return Err(BatchError::Tasklet("flaky".to_string()));
            }
            Ok(RepeatStatus::Finished)
        }
    }

    fn flaky(failures: usize) -> FlakyTasklet {
        FlakyTasklet {
            failures_left: Cell::new(failures),
        }
    }

    /// Job failing without updating its own execution status.
    struct SilentFailureJob;

    impl Job for SilentFailureJob {
        fn get_name(&self) -> &str {
            "silentJob"
        }

        fn execute(&self, _job_execution: &mut JobExecution) -> Result<(), BatchError> {
            Err(BatchError::Step("boom".to_string()))
        }
    }

    /// Repository refusing to store step executions.
    #[derive(Default)]
    struct StepRejectingRepository {
        inner: InMemoryJobRepository,
    }

    impl JobRepository for StepRejectingRepository {
        fn get_last_job_instance(&self, job_name: &str) -> Result<Option<JobInstance>, BatchError> {
            self.inner.get_last_job_instance(job_name)
        }

        fn get_job_instance(
            &self,
            job_name: &str,
            parameters: &JobParameters,
        ) -> Result<Option<JobInstance>, BatchError> {
            self.inner.get_job_instance(job_name, parameters)
        }

        fn create_job_instance(
            &self,
            job_name: &str,
            parameters: &JobParameters,
        ) -> Result<JobInstance, BatchError> {
            self.inner.create_job_instance(job_name, parameters)
        }

        fn create_job_execution(
            &self,
            instance: &JobInstance,
            parameters: &JobParameters,
        ) -> Result<JobExecution, BatchError> {
            self.inner.create_job_execution(instance, parameters)
        }

        fn update_job_execution(&self, job_execution: &JobExecution) -> Result<(), BatchError> {
            self.inner.update_job_execution(job_execution)
        }

        fn add_step_execution(
            &self,
            _job_execution_id: i64,
            _step_execution: &StepExecution,
        ) -> Result<(), BatchError> {
            Err(BatchError::Repository("disk full".to_string()))
        }

        fn get_last_job_execution(
            &self,
            instance: &JobInstance,
        ) -> Result<Option<JobExecution>, BatchError> {
            self.inner.get_last_job_execution(instance)
        }

        fn find_job_executions(&self, job_name: &str) -> Result<Vec<JobExecution>, BatchError> {
            self.inner.find_job_executions(job_name)
        }
    }

    #[test]
    fn each_launch_gets_a_new_run_id() -> Result<(), BatchError> {
        let tasklet = flaky(0);
        let step = StepBuilder::new("step").tasklet(&tasklet).build();
        let job = JobBuilder::new()
            .name("job".to_string())
            .incrementer(RunIdIncrementer::new())
            .start(&step)
            .build();
        let repository = InMemoryJobRepository::new();
        let launcher = JobLauncher::new(&repository);

        let run_ids: Vec<i64> = (0..3)
            .map(|_| launcher.run(&job, JobParameters::new()))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|execution| {
                assert_eq!(execution.status, BatchStatus::Completed);
                execution.parameters.get_long("run.id").unwrap()
            })
            .collect();

        assert_eq!(run_ids, vec![1, 2, 3]);
        assert_eq!(repository.find_job_executions("job")?.len(), 3);
        Ok(())
    }

    #[test]
    fn completed_instance_cannot_run_again() -> Result<(), BatchError> {
        let tasklet = flaky(0);
        let step = StepBuilder::new("step").tasklet(&tasklet).build();
        let job = JobBuilder::new().name("job".to_string()).start(&step).build();
        let repository = InMemoryJobRepository::new();
        let launcher = JobLauncher::new(&repository);

        launcher.run(&job, JobParameters::new())?;
        let second = launcher.run(&job, JobParameters::new());

        assert!(matches!(
            second,
            Err(BatchError::JobInstanceAlreadyComplete(_))
        ));

        let other = JobParameters::new().with("day", JobParameter::String("mon".to_string()));
        assert!(launcher.run(&job, other).is_ok());
        Ok(())
    }

    #[test]
    fn failed_instance_is_restarted() -> Result<(), BatchError> {
        let tasklet = flaky(1);
        let step = StepBuilder::new("step").tasklet(&tasklet).build();
        let job = JobBuilder::new().name("job".to_string()).start(&step).build();
        let repository = InMemoryJobRepository::new();
        let launcher = JobLauncher::new(&repository);

        let failed = launcher.run(&job, JobParameters::new())?;
        assert_eq!(failed.status, BatchStatus::Failed);
        assert_eq!(
            failed.step_execution("step").unwrap().status,
            StepStatus::Failed
        );

        let restarted = launcher.run(&job, JobParameters::new())?;
        assert_eq!(restarted.status, BatchStatus::Completed);
        assert_eq!(restarted.job_instance_id, failed.job_instance_id);
        assert_ne!(restarted.id, failed.id);
        Ok(())
    }

    #[test]
    fn running_instance_is_refused() -> Result<(), BatchError> {
        let tasklet = flaky(0);
        let step = StepBuilder::new("step").tasklet(&tasklet).build();
        let job = JobBuilder::new().name("job".to_string()).start(&step).build();
        let repository = InMemoryJobRepository::new();
        let instance = repository.create_job_instance("job", &JobParameters::new())?;
        repository.create_job_execution(&instance, &JobParameters::new())?;

        let result = JobLauncher::new(&repository).run(&job, JobParameters::new());

        assert!(matches!(
            result,
            Err(BatchError::JobExecutionAlreadyRunning(_))
        ));
        Ok(())
    }

    #[test]
    fn supplied_parameters_are_merged_after_increment() -> Result<(), BatchError> {
        let tasklet = flaky(0);
        let step = StepBuilder::new("step").tasklet(&tasklet).build();
        let job = JobBuilder::new()
            .name("job".to_string())
            .incrementer(RunIdIncrementer::new())
            .start(&step)
            .build();
        let repository = InMemoryJobRepository::new();
        let launcher = JobLauncher::new(&repository);

        launcher.run(
            &job,
            JobParameters::new().with("region", JobParameter::String("eu".to_string())),
        )?;
        let second = launcher.run(&job, JobParameters::new())?;

        assert_eq!(second.parameters.get_long("run.id"), Some(2));
        assert_eq!(second.parameters.get_string("region"), Some("eu"));
        Ok(())
    }

    #[test]
    fn step_executions_are_recorded() -> Result<(), BatchError> {
        let tasklet = flaky(0);
        let step = StepBuilder::new("recorded").tasklet(&tasklet).build();
        let job = JobBuilder::new().name("job".to_string()).start(&step).build();
        let repository = InMemoryJobRepository::new();

        let execution = JobLauncher::new(&repository).run(&job, JobParameters::new())?;

        let history = repository.find_job_executions("job")?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, execution.id);
        assert_eq!(history[0].status, BatchStatus::Completed);
        assert_eq!(history[0].step_executions.len(), 1);
        assert_eq!(history[0].step_executions[0].name, "recorded");
        Ok(())
    }

    #[test]
    fn job_failing_without_status_is_marked_failed() -> Result<(), BatchError> {
        let job = SilentFailureJob;
        let repository = InMemoryJobRepository::new();
        let launcher = JobLauncher::new(&repository);

        let first = launcher.run(&job, JobParameters::new())?;
        assert_eq!(first.status, BatchStatus::Failed);
        assert_eq!(first.exit_message.as_deref(), Some("Step from: boom"));
        assert!(first.end_time.is_some());

        let stored = repository.find_job_executions("silentJob")?;
        assert_eq!(stored[0].status, BatchStatus::Failed);

        let second = launcher.run(&job, JobParameters::new())?;
        assert_eq!(second.job_instance_id, first.job_instance_id);
        assert_eq!(repository.find_job_executions("silentJob")?.len(), 2);
        Ok(())
    }

    #[test]
    fn unrecorded_execution_is_marked_failed() -> Result<(), BatchError> {
        let tasklet = flaky(0);
        let step = StepBuilder::new("step").tasklet(&tasklet).build();
        let job = JobBuilder::new().name("job".to_string()).start(&step).build();
        let repository = StepRejectingRepository::default();
        let launcher = JobLauncher::new(&repository);

        let result = launcher.run(&job, JobParameters::new());
        assert!(matches!(result, Err(BatchError::Repository(_))));

        let stored = repository.find_job_executions("job")?;
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].status, BatchStatus::Failed);
        assert_eq!(
            stored[0].exit_message.as_deref(),
            Some("JobRepository from: disk full")
        );

        let retried = launcher.run(&job, JobParameters::new());
        assert!(matches!(retried, Err(BatchError::Repository(_))));
        Ok(())
    }
}
