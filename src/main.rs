use std::process::ExitCode;

use anyhow::Result;
use log::error;
use pass_batch::{
    app::BatchApplication,
    config::Settings,
    core::{job::BatchStatus, parameters::JobParameters},
    logging,
};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    logging::init(&settings.logging);

    let parameters = JobParameters::from_command_line(std::env::args().skip(1))?;

    let application = BatchApplication::build(settings).await?;
    let executions = application.run(parameters)?;

    let failed: Vec<_> = executions
        .iter()
        .filter(|execution| execution.status == BatchStatus::Failed)
        .collect();

    for execution in &failed {
        error!(
            "Job {} (execution {}) failed: {}",
            execution.job_name,
            execution.id,
            execution.exit_message.as_deref().unwrap_or("unknown error")
        );
    }

    if failed.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
