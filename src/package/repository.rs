use log::{debug, info};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ActiveValue::Set, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryOrder,
};
use serde::{Deserialize, Serialize};

use crate::BatchError;

use super::entity::{self, ActiveModel, Entity as PackageEntity, Model};

/// Values of a package record that has not been saved yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPackage {
    pub name: String,
    pub count: i32,
    pub period: i32,
}

impl NewPackage {
    pub fn new(name: &str, count: i32, period: i32) -> Self {
        Self {
            name: name.to_string(),
            count,
            period,
        }
    }
}

impl From<NewPackage> for ActiveModel {
    fn from(package: NewPackage) -> Self {
        ActiveModel {
            pack_seq: NotSet,
            package_name: Set(package.name),
            count: Set(package.count),
            period: Set(package.period),
            created_at: NotSet,
            updated_at: NotSet,
        }
    }
}

/// Access to the `package` table.
///
/// # Examples
///
/// ```no_run
/// use pass_batch::package::{NewPackage, PackageRepository};
/// use sea_orm::Database;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let db = Database::connect("sqlite::memory:").await?;
/// pass_batch::schema::initialize(&db, pass_batch::schema::InitializeSchema::Always).await?;
///
/// let repository = PackageRepository::new(&db);
/// let saved = repository.save(NewPackage::new("basic", 3, 30)).await?;
/// let loaded = repository.find_by_id(saved.pack_seq).await?;
/// assert_eq!(loaded, Some(saved));
/// # Ok(())
/// # }
/// ```
pub struct PackageRepository<'a> {
    connection: &'a DatabaseConnection,
}

impl<'a> PackageRepository<'a> {
    pub fn new(connection: &'a DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Inserts the package and returns it with its generated identifier and
    /// audit timestamps.
    pub async fn save(&self, package: NewPackage) -> Result<Model, BatchError> {
        debug!("Saving package {}", package.name);
        let model = ActiveModel::from(package).insert(self.connection).await?;
        info!(
            "Saved package {} with id {}",
            model.package_name, model.pack_seq
        );
        Ok(model)
    }

    pub async fn find_by_id(&self, pack_seq: i64) -> Result<Option<Model>, BatchError> {
        Ok(PackageEntity::find_by_id(pack_seq).one(self.connection).await?)
    }

    /// Returns every package ordered by identifier.
    pub async fn find_all(&self) -> Result<Vec<Model>, BatchError> {
        Ok(PackageEntity::find()
            .order_by_asc(entity::Column::PackSeq)
            .all(self.connection)
            .await?)
    }

    pub async fn count(&self) -> Result<u64, BatchError> {
        Ok(PackageEntity::find().count(self.connection).await?)
    }
}
