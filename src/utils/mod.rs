pub mod slug;

pub use slug::{slug_or_title, slugify};
