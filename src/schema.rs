//! Creation of the tables used by the application.

use log::{debug, info};
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait, Schema, sea_query::Index,
};
use serde::Deserialize;

use crate::{
    BatchError,
    core::repository::tables::{job_execution, job_instance, step_execution},
    package::entity as package,
};

const JOB_INSTANCE_INDEX: &str = "batch_job_instance_un";

/// When the tables are created at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitializeSchema {
    /// Always create missing tables.
    Always,
    /// Create missing tables only on an embedded (SQLite) database.
    Embedded,
    /// Never touch the schema.
    Never,
}

impl InitializeSchema {
    /// Whether tables should be created on a database of type `backend`.
    pub fn applies_to(&self, backend: DatabaseBackend) -> bool {
        match self {
            InitializeSchema::Always => true,
            InitializeSchema::Embedded => backend == DatabaseBackend::Sqlite,
            InitializeSchema::Never => false,
        }
    }
}

/// Creates the package table and the batch bookkeeping tables when `mode`
/// applies to the connected database. Existing tables are left untouched.
pub async fn initialize(db: &DatabaseConnection, mode: InitializeSchema) -> Result<(), BatchError> {
    let backend = db.get_database_backend();

    if !mode.applies_to(backend) {
        debug!("Skipping schema initialization ({:?} on {:?})", mode, backend);
        return Ok(());
    }

    create_table(db, package::Entity).await?;
    create_table(db, job_instance::Entity).await?;
    create_job_instance_index(db).await?;
    create_table(db, job_execution::Entity).await?;
    create_table(db, step_execution::Entity).await?;

    info!("Schema initialized on {:?}", backend);
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, entity: E) -> Result<(), BatchError>
where
    E: EntityTrait,
{
    let backend = db.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();

    db.execute(backend.build(&statement)).await?;
    debug!("Ensured table {}", entity.table_name());
    Ok(())
}

/// One job instance per job name and job key.
async fn create_job_instance_index(db: &DatabaseConnection) -> Result<(), BatchError> {
    let backend = db.get_database_backend();
    let statement = Index::create()
        .name(JOB_INSTANCE_INDEX)
        .table(job_instance::Entity)
        .col(job_instance::Column::JobName)
        .col(job_instance::Column::JobKey)
        .unique()
        .if_not_exists()
        .to_owned();

    db.execute(backend.build(&statement)).await?;
    debug!("Ensured index {}", JOB_INSTANCE_INDEX);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_applies_only_to_sqlite() {
        assert!(InitializeSchema::Embedded.applies_to(DatabaseBackend::Sqlite));
        assert!(!InitializeSchema::Embedded.applies_to(DatabaseBackend::Postgres));
        assert!(InitializeSchema::Always.applies_to(DatabaseBackend::MySql));
        assert!(!InitializeSchema::Never.applies_to(DatabaseBackend::Sqlite));
    }
}
