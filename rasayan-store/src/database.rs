use rasayan_order::FeeSchedule;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres, Row};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(connection_string: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(connection_string)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    /// Merge `business_rules` rows over the configured fee schedule. Admins
    /// tune individual rates without a redeploy; unknown keys are ignored.
    pub async fn fetch_fee_schedule(
        &self,
        defaults: FeeSchedule,
    ) -> Result<FeeSchedule, sqlx::Error> {
        let rows = sqlx::query("SELECT rule_key, rule_value FROM business_rules")
            .fetch_all(&self.pool)
            .await?;

        let mut schedule = defaults;

        for row in rows {
            let rule_key: String = row.try_get("rule_key")?;
            let rule_value: serde_json::Value = row.try_get("rule_value")?;

            // Expected format: {"value": <number>}
            let Some(value) = rule_value.get("value").and_then(|v| v.as_f64()) else {
                continue;
            };
            let Some(value) = Decimal::from_f64(value) else {
                continue;
            };

            match rule_key.as_str() {
                "platform_fee_buyer_rate" => schedule.platform_fee_buyer_rate = value,
                "logistic_fee_rate" => schedule.logistic_fee_rate = value,
                "platform_fee_seller_rate" => schedule.platform_fee_seller_rate = value,
                "safety_fee_rate" => schedule.safety_fee_rate = value,
                "freight_fee_rate" => schedule.freight_fee_rate = value,
                "default_gst_percent" => schedule.default_gst_percent = value,
                _ => {}
            }
        }

        Ok(schedule)
    }
}
