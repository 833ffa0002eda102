pub mod catalog_service;
pub mod progress_service;
pub mod subscription_service;

pub use catalog_service::{CatalogService, NewSeries, NewVideo, SeriesStats, VideoChanges};
pub use progress_service::{
    progress_percentage, series_percentage, ProgressService, UserStats, WatchReport,
    COMPLETION_THRESHOLD,
};
pub use subscription_service::SubscriptionService;
