use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Convert a UUID string (with dashes) to an `SQLite` hex-blob literal.
///
/// `SeaORM` stores UUID columns as 16-byte BLOBs in `SQLite`, so raw SQL
/// inserts must use `X'...'` notation to match the format.
fn uuid_blob(uuid_str: &str) -> String {
    let hex: String = uuid_str.chars().filter(|c| *c != '-').collect();
    format!("X'{hex}'")
}

struct Plan {
    id: &'static str,
    name: &'static str,
    slug: &'static str,
    tier: &'static str,
    duration_days: i32,
    price_cents: i64,
}

#[rustfmt::skip]
const PLANS: &[Plan] = &[
    Plan { id: "0a000000-0000-4000-8000-000000000001", name: "Basic Monthly",   slug: "basic-monthly",   tier: "basic",   duration_days: 30,  price_cents: 900 },
    Plan { id: "0a000000-0000-4000-8000-000000000002", name: "Basic Yearly",    slug: "basic-yearly",    tier: "basic",   duration_days: 365, price_cents: 9000 },
    Plan { id: "0a000000-0000-4000-8000-000000000003", name: "Premium Monthly", slug: "premium-monthly", tier: "premium", duration_days: 30,  price_cents: 1900 },
    Plan { id: "0a000000-0000-4000-8000-000000000004", name: "Premium Yearly",  slug: "premium-yearly",  tier: "premium", duration_days: 365, price_cents: 19000 },
];

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        let backend = manager.get_database_backend();

        for plan in PLANS {
            let sql = if backend == sea_orm::DatabaseBackend::Postgres {
                format!(
                    "INSERT INTO subscription_plan (id, name, slug, tier, duration_days, price_cents) \
                     VALUES ('{id}', '{name}', '{slug}', '{tier}', {days}, {price}) \
                     ON CONFLICT (id) DO NOTHING",
                    id = plan.id,
                    name = plan.name,
                    slug = plan.slug,
                    tier = plan.tier,
                    days = plan.duration_days,
                    price = plan.price_cents,
                )
            } else {
                format!(
                    "INSERT OR IGNORE INTO subscription_plan (id, name, slug, tier, duration_days, price_cents) \
                     VALUES ({id_blob}, '{name}', '{slug}', '{tier}', {days}, {price})",
                    id_blob = uuid_blob(plan.id),
                    name = plan.name,
                    slug = plan.slug,
                    tier = plan.tier,
                    days = plan.duration_days,
                    price = plan.price_cents,
                )
            };
            db.execute(sea_orm::Statement::from_string(backend, sql))
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .exec_stmt(
                Query::delete()
                    .from_table(SubscriptionPlan::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum SubscriptionPlan {
    Table,
}
