/// One row per job instance (job name + identifying parameters).
pub mod job_instance {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "batch_job_instance")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub job_name: String,
        /// Unique together with `job_name`
        pub job_key: String,
        pub created_at: DateTimeUtc,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// One row per execution of a job instance.
pub mod job_execution {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "batch_job_execution")]
    pub struct Model {
        #[sea_orm(primary_key)]
        pub id: i64,
        pub job_instance_id: i64,
        /// Launch parameters serialized as JSON
        #[sea_orm(column_type = "Text")]
        pub parameters: String,
        pub status: String,
        pub create_time: DateTimeUtc,
        pub start_time: Option<DateTimeUtc>,
        pub end_time: Option<DateTimeUtc>,
        #[sea_orm(column_type = "Text", nullable)]
        pub exit_message: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// One row per step execution.
pub mod step_execution {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "batch_step_execution")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: Uuid,
        pub job_execution_id: i64,
        pub step_name: String,
        pub status: String,
        pub start_time: Option<DateTimeUtc>,
        pub end_time: Option<DateTimeUtc>,
        pub commit_count: i32,
        #[sea_orm(column_type = "Text", nullable)]
        pub exit_message: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}
