use chrono::Duration;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::access::Tier;
use crate::clock::Clock;
use crate::entities::{subscription, subscription_plan, user, SubscriptionStatus};
use crate::error::AppError;

pub struct SubscriptionService;

impl SubscriptionService {
    /// Start a subscription to `plan_id` and raise the user's tier to the plan's.
    ///
    /// Any subscription still marked active is cancelled first, so a user holds
    /// at most one. Admin subscription types are left as they are.
    pub async fn subscribe(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> Result<subscription::Model, AppError> {
        let txn = db.begin().await?;

        let user = user::Entity::find_by_id(user_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

        let plan = subscription_plan::Entity::find_by_id(plan_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))?;

        if !plan.is_active {
            return Err(AppError::BadRequest(format!(
                "Plan '{}' is no longer offered",
                plan.slug
            )));
        }

        let tier = Tier::from_visibility(&plan.tier)
            .ok_or_else(|| anyhow::anyhow!("Plan {plan_id} has invalid tier '{}'", plan.tier))?;

        let now = clock.now();
        let expires_at = now + Duration::days(i64::from(plan.duration_days));

        let previous = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::Status.eq(SubscriptionStatus::Active.as_str()))
            .all(&txn)
            .await?;
        for old in previous {
            let mut active: subscription::ActiveModel = old.into();
            active.status = Set(SubscriptionStatus::Cancelled.as_str().to_string());
            active.cancelled_at = Set(Some(now.into()));
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }

        let created = subscription::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            plan_id: Set(plan_id),
            status: Set(SubscriptionStatus::Active.as_str().to_string()),
            starts_at: Set(now.into()),
            expires_at: Set(Some(expires_at.into())),
            cancelled_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        if Tier::from_str(&user.subscription_type) != Some(Tier::Admin) {
            let mut active: user::ActiveModel = user.into();
            active.subscription_type = Set(tier.as_str().to_string());
            active.subscription_expires_at = Set(Some(expires_at.into()));
            active.updated_at = Set(now.into());
            active.update(&txn).await?;
        }

        txn.commit().await?;

        tracing::info!(%user_id, %plan_id, tier = %tier, "Subscription started");
        Ok(created)
    }

    /// Cancel a subscription. The user keeps their tier until it expires.
    pub async fn cancel(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        subscription_id: Uuid,
    ) -> Result<subscription::Model, AppError> {
        let existing = subscription::Entity::find_by_id(subscription_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Subscription {subscription_id} not found"))
            })?;

        let Some(status) = SubscriptionStatus::from_str(&existing.status) else {
            return Err(AppError::Conflict(format!(
                "Subscription has unrecognised status '{}'",
                existing.status
            )));
        };
        if !status.can_cancel() {
            return Err(AppError::Conflict(format!(
                "Subscription is already {status}"
            )));
        }

        let now = clock.now();
        let mut active: subscription::ActiveModel = existing.into();
        active.status = Set(SubscriptionStatus::Cancelled.as_str().to_string());
        active.cancelled_at = Set(Some(now.into()));
        active.updated_at = Set(now.into());

        let cancelled = active.update(db).await?;
        tracing::info!(%subscription_id, "Subscription cancelled");
        Ok(cancelled)
    }

    /// The user's currently active subscription, if any.
    pub async fn active_subscription(
        db: &DatabaseConnection,
        clock: &dyn Clock,
        user_id: Uuid,
    ) -> Result<Option<subscription::Model>, AppError> {
        let now = clock.now();

        let candidates = subscription::Entity::find()
            .filter(subscription::Column::UserId.eq(user_id))
            .filter(subscription::Column::Status.eq(SubscriptionStatus::Active.as_str()))
            .order_by_desc(subscription::Column::StartsAt)
            .all(db)
            .await?;

        Ok(candidates.into_iter().find(|s| s.is_active(now)))
    }
}
