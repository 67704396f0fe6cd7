#![allow(dead_code)]

mod mocks;

pub use mocks::MockTasklet;

use pass_batch::{
    BatchError,
    config::Settings,
    schema::{self, InitializeSchema},
};
use sea_orm::DatabaseConnection;

/// Connects to a fresh in-memory SQLite database with every table created.
///
/// The pool holds a single connection so that all queries see the same
/// in-memory database.
pub async fn setup_database() -> Result<DatabaseConnection, BatchError> {
    let settings = Settings::defaults()?;
    let db = settings.database.connect().await?;
    schema::initialize(&db, InitializeSchema::Always).await?;
    Ok(db)
}
