use std::future::Future;

use chrono::Utc;
use log::debug;
use sea_orm::{
    ActiveModelTrait,
    ActiveValue::{NotSet, Set, Unchanged},
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::{
    BatchError,
    core::{
        job::{JobExecution, JobInstance},
        parameters::JobParameters,
        step::StepExecution,
    },
};

use super::{
    JobRepository, RepositoryResult,
    tables::{job_execution, job_instance, step_execution},
};

/// Job repository persisting its bookkeeping through sea-orm.
///
/// The batch traits are synchronous, so every database call is driven with
/// `tokio::task::block_in_place`. The repository must therefore be used from
/// within a multi-threaded tokio runtime.
///
/// # Examples
///
/// ```no_run
/// use pass_batch::core::repository::{JobRepository, OrmJobRepository};
/// use sea_orm::Database;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::connect("sqlite::memory:").await?;
/// pass_batch::schema::initialize(&db, pass_batch::schema::InitializeSchema::Always).await?;
///
/// let repository = OrmJobRepository::new(&db);
/// let history = repository.find_job_executions("passJob")?;
/// assert!(history.is_empty());
/// # Ok(())
/// # }
/// ```
pub struct OrmJobRepository<'a> {
    connection: &'a DatabaseConnection,
}

/// Runs `future` to completion from synchronous code inside the runtime.
fn block_on<F: Future>(future: F) -> F::Output {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

fn to_job_instance(model: job_instance::Model) -> JobInstance {
    JobInstance {
        id: model.id,
        job_name: model.job_name,
        job_key: model.job_key,
    }
}

fn to_step_execution(model: step_execution::Model) -> RepositoryResult<StepExecution> {
    let duration = match (model.start_time, model.end_time) {
        (Some(start), Some(end)) => (end - start).to_std().unwrap_or_default(),
        _ => Default::default(),
    };

    Ok(StepExecution {
        id: model.id,
        name: model.step_name,
        status: model.status.parse()?,
        start_time: model.start_time,
        end_time: model.end_time,
        duration,
        commit_count: model.commit_count.max(0) as usize,
        exit_message: model.exit_message,
    })
}

fn to_job_execution(
    model: job_execution::Model,
    job_name: &str,
    step_executions: Vec<StepExecution>,
) -> RepositoryResult<JobExecution> {
    let parameters: JobParameters = serde_json::from_str(&model.parameters).map_err(|e| {
        BatchError::Repository(format!(
            "invalid parameters for job execution {}: {}",
            model.id, e
        ))
    })?;

    Ok(JobExecution {
        id: model.id,
        job_instance_id: model.job_instance_id,
        job_name: job_name.to_string(),
        parameters,
        status: model.status.parse()?,
        create_time: model.create_time,
        start_time: model.start_time,
        end_time: model.end_time,
        exit_message: model.exit_message,
        step_executions,
    })
}

impl<'a> OrmJobRepository<'a> {
    pub fn new(connection: &'a DatabaseConnection) -> Self {
        Self { connection }
    }

    async fn find_step_executions(
        &self,
        job_execution_id: i64,
    ) -> RepositoryResult<Vec<StepExecution>> {
        step_execution::Entity::find()
            .filter(step_execution::Column::JobExecutionId.eq(job_execution_id))
            .order_by_asc(step_execution::Column::StartTime)
            .all(self.connection)
            .await?
            .into_iter()
            .map(to_step_execution)
            .collect()
    }

    async fn load_job_execution(
        &self,
        model: job_execution::Model,
        job_name: &str,
    ) -> RepositoryResult<JobExecution> {
        let step_executions = self.find_step_executions(model.id).await?;
        to_job_execution(model, job_name, step_executions)
    }

    async fn find_last_job_execution(
        &self,
        instance: &JobInstance,
    ) -> RepositoryResult<Option<JobExecution>> {
        let model = job_execution::Entity::find()
            .filter(job_execution::Column::JobInstanceId.eq(instance.id))
            .order_by_desc(job_execution::Column::Id)
            .one(self.connection)
            .await?;

        match model {
            Some(model) => Ok(Some(
                self.load_job_execution(model, &instance.job_name).await?,
            )),
            None => Ok(None),
        }
    }

    async fn find_job_executions_by_name(
        &self,
        job_name: &str,
    ) -> RepositoryResult<Vec<JobExecution>> {
        let instance_ids: Vec<i64> = job_instance::Entity::find()
            .filter(job_instance::Column::JobName.eq(job_name))
            .all(self.connection)
            .await?
            .into_iter()
            .map(|instance| instance.id)
            .collect();

        if instance_ids.is_empty() {
            return Ok(Vec::new());
        }

        let models = job_execution::Entity::find()
            .filter(job_execution::Column::JobInstanceId.is_in(instance_ids))
            .order_by_asc(job_execution::Column::Id)
            .all(self.connection)
            .await?;

        let mut executions = Vec::with_capacity(models.len());
        for model in models {
            executions.push(self.load_job_execution(model, job_name).await?);
        }
        Ok(executions)
    }
}

impl JobRepository for OrmJobRepository<'_> {
    fn get_last_job_instance(&self, job_name: &str) -> RepositoryResult<Option<JobInstance>> {
        let model = block_on(
            job_instance::Entity::find()
                .filter(job_instance::Column::JobName.eq(job_name))
                .order_by_desc(job_instance::Column::Id)
                .one(self.connection),
        )?;
        Ok(model.map(to_job_instance))
    }

    fn get_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<Option<JobInstance>> {
        let model = block_on(
            job_instance::Entity::find()
                .filter(job_instance::Column::JobName.eq(job_name))
                .filter(job_instance::Column::JobKey.eq(parameters.job_key()))
                .one(self.connection),
        )?;
        Ok(model.map(to_job_instance))
    }

    fn create_job_instance(
        &self,
        job_name: &str,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobInstance> {
        let active_model = job_instance::ActiveModel {
            id: NotSet,
            job_name: Set(job_name.to_string()),
            job_key: Set(parameters.job_key()),
            created_at: Set(Utc::now()),
        };

        let model = block_on(active_model.insert(self.connection))?;
        debug!("Created job instance {} for job {}", model.id, job_name);
        Ok(to_job_instance(model))
    }

    fn create_job_execution(
        &self,
        instance: &JobInstance,
        parameters: &JobParameters,
    ) -> RepositoryResult<JobExecution> {
        let stored_parameters = serde_json::to_string(parameters).map_err(|e| {
            BatchError::Repository(format!("cannot store job parameters: {}", e))
        })?;

        let mut execution = JobExecution::new(0, instance, parameters.clone());
        let active_model = job_execution::ActiveModel {
            id: NotSet,
            job_instance_id: Set(instance.id),
            parameters: Set(stored_parameters),
            status: Set(execution.status.as_str().to_string()),
            create_time: Set(execution.create_time),
            start_time: Set(None),
            end_time: Set(None),
            exit_message: Set(None),
        };

        let model = block_on(active_model.insert(self.connection))?;
        execution.id = model.id;
        debug!(
            "Created job execution {} for job instance {}",
            execution.id, instance.id
        );
        Ok(execution)
    }

    fn update_job_execution(&self, job_execution: &JobExecution) -> RepositoryResult<()> {
        let active_model = job_execution::ActiveModel {
            id: Unchanged(job_execution.id),
            status: Set(job_execution.status.as_str().to_string()),
            start_time: Set(job_execution.start_time),
            end_time: Set(job_execution.end_time),
            exit_message: Set(job_execution.exit_message.clone()),
            ..Default::default()
        };

        block_on(active_model.update(self.connection))?;
        Ok(())
    }

    fn add_step_execution(
        &self,
        job_execution_id: i64,
        step_execution: &StepExecution,
    ) -> RepositoryResult<()> {
        let active_model = step_execution::ActiveModel {
            id: Set(step_execution.id),
            job_execution_id: Set(job_execution_id),
            step_name: Set(step_execution.name.clone()),
            status: Set(step_execution.status.as_str().to_string()),
            start_time: Set(step_execution.start_time),
            end_time: Set(step_execution.end_time),
            commit_count: Set(step_execution.commit_count as i32),
            exit_message: Set(step_execution.exit_message.clone()),
        };

        block_on(active_model.insert(self.connection))?;
        Ok(())
    }

    fn get_last_job_execution(
        &self,
        instance: &JobInstance,
    ) -> RepositoryResult<Option<JobExecution>> {
        block_on(self.find_last_job_execution(instance))
    }

    fn find_job_executions(&self, job_name: &str) -> RepositoryResult<Vec<JobExecution>> {
        block_on(self.find_job_executions_by_name(job_name))
    }
}
