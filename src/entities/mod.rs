pub mod category;
pub mod content_status;
pub mod series;
pub mod series_progress;
pub mod subscription;
pub mod subscription_plan;
pub mod subscription_status;
pub mod user;
pub mod video;
pub mod video_progress;

pub use content_status::ContentStatus;
pub use subscription_status::SubscriptionStatus;
