pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_user_table;
mod m20261001_000002_create_category_table;
mod m20261001_000003_create_series_table;
mod m20261001_000004_create_video_table;
mod m20261001_000005_create_video_progress_table;
mod m20261001_000006_create_series_progress_table;
mod m20261001_000007_create_subscription_plan_table;
mod m20261001_000008_create_subscription_table;
mod m20261001_000009_seed_subscription_plans;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_create_user_table::Migration),
            Box::new(m20261001_000002_create_category_table::Migration),
            Box::new(m20261001_000003_create_series_table::Migration),
            Box::new(m20261001_000004_create_video_table::Migration),
            Box::new(m20261001_000005_create_video_progress_table::Migration),
            Box::new(m20261001_000006_create_series_progress_table::Migration),
            Box::new(m20261001_000007_create_subscription_plan_table::Migration),
            Box::new(m20261001_000008_create_subscription_table::Migration),
            Box::new(m20261001_000009_seed_subscription_plans::Migration),
        ]
    }
}
