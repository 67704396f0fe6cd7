use async_trait::async_trait;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::audit;

/// A package record.
///
/// `count` and `period` are carried as plain integers; no meaning is attached
/// to them here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "package")]
pub struct Model {
    /// Identifier generated by the database on insert
    #[sea_orm(primary_key)]
    pub pack_seq: i64,
    pub package_name: String,
    pub count: i32,
    pub period: i32,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(mut self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        audit::stamp(&mut self.created_at, &mut self.updated_at, insert);
        Ok(self)
    }
}
