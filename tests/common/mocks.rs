//! Mock version of the Tasklet trait.
use mockall::mock;

use pass_batch::{
    BatchError,
    core::step::{RepeatStatus, StepExecution, Tasklet},
};

mock! {
    pub Tasklet {}
    impl Tasklet for Tasklet {
        fn execute(&self, step_execution: &StepExecution) -> Result<RepeatStatus, BatchError>;
    }
}
