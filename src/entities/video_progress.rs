use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Per-(user, video) watch record. Unique on `(user_id, video_id)`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "video_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub video_id: Uuid,
    pub series_id: Uuid,
    pub progress_percentage: i32,
    pub time_watched: i64,
    pub last_position: i64,
    pub video_duration: i64,
    pub is_completed: bool,
    pub completed_at: Option<DateTimeWithTimeZone>,
    pub watch_count: i32,
    pub total_watch_time: i64,
    pub rating: Option<i16>,
    pub is_favorite: bool,
    pub first_watched_at: Option<DateTimeWithTimeZone>,
    pub last_watched_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
    #[sea_orm(
        belongs_to = "super::video::Entity",
        from = "Column::VideoId",
        to = "super::video::Column::Id"
    )]
    Video,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Video.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
