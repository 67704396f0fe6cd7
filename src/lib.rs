/*!
 # pass-batch

 A minimal batch application built on a small job/step/tasklet toolkit.

 The application defines one job, `passJob`, made of one step, `passStep`. The
 step logs `Execute PassStep!` and reports success. Each launch of the job
 receives a fresh `run.id` parameter, so every run is a new job instance.
 Executions are recorded in bookkeeping tables next to a `package` table
 holding package records (name, count, period).

 ## Core Concepts

- **Job:** The entire batch process, composed of one or more `Step`s run in order.
- **Step:** An independent, sequential phase of a job.
- **Tasklet:** A step implementation performing one indivisible action.
- **JobParameters:** Typed values a job is launched with. The job name and
  its parameters identify a job instance.
- **RunIdIncrementer:** Computes the parameters of the next run by
  incrementing `run.id`.
- **JobRepository:** Stores job instances, job executions and step executions.
- **JobLauncher:** Runs a job and records its execution in a repository.

 ## Getting Started

```rust
# use pass_batch::{
#     core::{
#         job::{BatchStatus, Job, JobBuilder},
#         parameters::RunIdIncrementer,
#         step::{RepeatStatus, StepBuilder, StepExecution, Tasklet},
#     },
#     BatchError,
# };
struct Greeting;

impl Tasklet for Greeting {
    fn execute(&self, _step_execution: &StepExecution) -> Result<RepeatStatus, BatchError> {
        println!("Hello from a tasklet");
        Ok(RepeatStatus::Finished)
    }
}

fn main() -> Result<(), BatchError> {
    let tasklet = Greeting;
    let step = StepBuilder::new("greet").tasklet(&tasklet).build();

    let job = JobBuilder::new()
        .name("greeting".to_string())
        .incrementer(RunIdIncrementer::new())
        .start(&step)
        .build();

    let execution = job.run()?;
    assert_eq!(execution.status, BatchStatus::Completed);

    Ok(())
}
```

 ## Configuration

 The binary reads `config/application.toml` (or the file named by
 `BATCH_CONFIG`) and `BATCH_`-prefixed environment variables:

```toml
[database]
url = "sqlite://batch.db?mode=rwc"

[batch]
initialize_schema = "always"   # always | embedded | never
job_enabled = true

[logging]
level = "info"
```

 Remaining process arguments are job parameters, e.g. `region=eu run.id(long)=10`.
 */

/// Application bootstrap: the `passJob` job and its step
pub mod app;

/// Audit timestamps shared by persisted records
pub mod audit;

/// Settings loaded from files and environment
pub mod config;

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Logger initialization
pub mod logging;

/// Package records and their repository
pub mod package;

/// Table creation at startup
pub mod schema;
