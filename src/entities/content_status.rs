use serde::{Deserialize, Serialize};
use std::fmt;

/// Publication status shared by series and videos
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    /// Not yet visible in the catalog
    #[default]
    Draft,
    /// Listed and counted in series aggregates
    Published,
    /// Retired from the catalog
    Archived,
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ContentStatus {
    /// Convert from database string representation
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "published" => Some(Self::Published),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Convert to database string representation
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Whether the item counts towards series aggregates and rollups
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(ContentStatus::from_str("draft"), Some(ContentStatus::Draft));
        assert_eq!(
            ContentStatus::from_str("PUBLISHED"),
            Some(ContentStatus::Published)
        );
        assert_eq!(
            ContentStatus::from_str("archived"),
            Some(ContentStatus::Archived)
        );
        assert_eq!(ContentStatus::from_str("deleted"), None);
    }

    #[test]
    fn test_as_str_round_trips_display() {
        for status in [
            ContentStatus::Draft,
            ContentStatus::Published,
            ContentStatus::Archived,
        ] {
            assert_eq!(status.to_string(), status.as_str());
        }
    }

    #[test]
    fn test_is_published() {
        assert!(ContentStatus::Published.is_published());
        assert!(!ContentStatus::Draft.is_published());
        assert!(!ContentStatus::Archived.is_published());
    }

    #[test]
    fn test_default() {
        assert_eq!(ContentStatus::default(), ContentStatus::Draft);
    }
}
