//! Entitlement checks: may a user (or an anonymous visitor) view a series or video.
//!
//! Everything here is a pure function of the user row, the item's visibility and
//! the current time. No queries, no writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entities::{series, user, video};

/// Access tier, ordered by breadth of access.
///
/// `Admin` is only ever a user tier; content visibility is one of the first three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Freemium,
    Basic,
    Premium,
    Admin,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Tier {
    /// Parse a user `subscription_type`.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "freemium" => Some(Self::Freemium),
            "basic" => Some(Self::Basic),
            "premium" => Some(Self::Premium),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Parse a content `visibility`. Only the three content tiers are valid.
    pub fn from_visibility(s: &str) -> Option<Self> {
        match Self::from_str(s) {
            Some(Self::Admin) | None => None,
            tier => tier,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Freemium => "freemium",
            Self::Basic => "basic",
            Self::Premium => "premium",
            Self::Admin => "admin",
        }
    }

    /// Paid tiers lapse at `subscription_expires_at`; freemium and admin never do.
    pub const fn can_expire(&self) -> bool {
        matches!(self, Self::Basic | Self::Premium)
    }
}

/// Admin role or admin subscription type bypasses every tier check.
#[must_use]
pub fn is_admin(user: &user::Model) -> bool {
    user.role == "admin" || Tier::from_str(&user.subscription_type) == Some(Tier::Admin)
}

/// Whether the user's paid subscription (if any) is still running at `now`.
///
/// A missing expiry counts as open-ended.
#[must_use]
pub fn subscription_is_current(user: &user::Model, now: DateTime<Utc>) -> bool {
    user.subscription_expires_at.is_none_or(|expires| expires > now)
}

/// The tier the user can actually use at `now`.
///
/// An expired basic/premium subscription degrades to freemium, as does an
/// unrecognised `subscription_type`.
#[must_use]
pub fn effective_tier(user: &user::Model, now: DateTime<Utc>) -> Tier {
    if is_admin(user) {
        return Tier::Admin;
    }

    match Tier::from_str(&user.subscription_type) {
        Some(tier) if tier.can_expire() && subscription_is_current(user, now) => tier,
        _ => Tier::Freemium,
    }
}

/// Decide whether `user` may view content requiring `visibility`.
///
/// Anonymous visitors only see freemium content. Unknown visibility values
/// are inaccessible to everyone except admins.
#[must_use]
pub fn is_accessible(user: Option<&user::Model>, visibility: &str, now: DateTime<Utc>) -> bool {
    if user.is_some_and(is_admin) {
        return true;
    }

    let Some(required) = Tier::from_visibility(visibility) else {
        return false;
    };

    let tier = user.map_or(Tier::Freemium, |u| effective_tier(u, now));
    tier >= required
}

/// A catalog item gated by its own visibility.
///
/// Series and videos are gated independently: a video's own visibility is
/// authoritative for playback, the series' visibility for listing.
pub trait Gated {
    fn visibility(&self) -> &str;
}

impl Gated for series::Model {
    fn visibility(&self) -> &str {
        &self.visibility
    }
}

impl Gated for video::Model {
    fn visibility(&self) -> &str {
        &self.visibility
    }
}

/// [`is_accessible`] for any gated item.
#[must_use]
pub fn can_view<T: Gated + ?Sized>(
    user: Option<&user::Model>,
    item: &T,
    now: DateTime<Utc>,
) -> bool {
    is_accessible(user, item.visibility(), now)
}
