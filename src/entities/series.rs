use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A catalogued series of videos.
///
/// `video_count`, `total_duration`, `total_views`, `rating` and
/// `rating_count` are derived from the published videos and rewritten by
/// [`CatalogService::recompute_series_stats`](crate::services::CatalogService::recompute_series_stats).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "series")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category_id: Uuid,
    pub instructor_id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: Option<String>,
    pub visibility: String,
    pub status: String,
    pub video_count: i32,
    pub total_duration: i64,
    pub total_views: i64,
    pub rating: f64,
    pub rating_count: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::InstructorId",
        to = "super::user::Column::Id"
    )]
    Instructor,
    #[sea_orm(has_many = "super::video::Entity")]
    Videos,
    #[sea_orm(has_many = "super::series_progress::Entity")]
    SeriesProgress,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instructor.def()
    }
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Videos.def()
    }
}

impl Related<super::series_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeriesProgress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
