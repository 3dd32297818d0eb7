use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use rasayan_order::{
    LineItem, Order, OrderRepository, OrderStatus, PaymentStatus, PayoutStatus,
    QualityDocuments, RepositoryError, SellerFees, StatusChange,
};

/// Postgres-backed order store. The state-machine invariant rests on
/// `update` being a conditional write: `UPDATE ... WHERE id = $1 AND status
/// = $expected`, so a writer holding a stale snapshot affects zero rows.
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    buyer_id: Uuid,
    seller_id: Uuid,
    currency: String,
    sub_total: Decimal,
    tax_amount: Decimal,
    platform_fee_buyer: Decimal,
    logistic_fee: Decimal,
    total_amount: Decimal,
    platform_fee_seller: Option<Decimal>,
    safety_fee: Option<Decimal>,
    freight_fee: Option<Decimal>,
    payout_amount: Option<Decimal>,
    status: String,
    payment_status: String,
    payout_status: String,
    quality_documents: Option<serde_json::Value>,
    transaction_reference: Option<String>,
    payout_reference: Option<String>,
    payout_payee_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    quantity: Decimal,
    price_per_unit: Decimal,
    unit: String,
    gst_percent: Option<Decimal>,
}

#[derive(sqlx::FromRow)]
struct ChangeRow {
    id: Uuid,
    order_id: Uuid,
    change_type: String,
    prior_status: Option<String>,
    new_status: Option<String>,
    actor: String,
    note: Option<String>,
    created_at: DateTime<Utc>,
}

fn storage(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(err.to_string())
}

fn order_status_from_str(s: &str) -> Result<OrderStatus, RepositoryError> {
    match s {
        "PENDING_SELLER" => Ok(OrderStatus::PendingSeller),
        "PENDING_ADMIN" => Ok(OrderStatus::PendingAdmin),
        "ACCEPTED" => Ok(OrderStatus::Accepted),
        "SHIPPED" => Ok(OrderStatus::Shipped),
        "DELIVERED" => Ok(OrderStatus::Delivered),
        "REJECTED" => Ok(OrderStatus::Rejected),
        "CANCELLED" => Ok(OrderStatus::Cancelled),
        other => Err(RepositoryError::Storage(format!(
            "unknown order status in store: {other}"
        ))),
    }
}

fn payment_status_as_str(s: PaymentStatus) -> &'static str {
    match s {
        PaymentStatus::Pending => "PENDING",
        PaymentStatus::Paid => "PAID",
    }
}

fn payment_status_from_str(s: &str) -> Result<PaymentStatus, RepositoryError> {
    match s {
        "PENDING" => Ok(PaymentStatus::Pending),
        "PAID" => Ok(PaymentStatus::Paid),
        other => Err(RepositoryError::Storage(format!(
            "unknown payment status in store: {other}"
        ))),
    }
}

fn payout_status_as_str(s: PayoutStatus) -> &'static str {
    match s {
        PayoutStatus::Pending => "PENDING",
        PayoutStatus::Completed => "COMPLETED",
    }
}

fn payout_status_from_str(s: &str) -> Result<PayoutStatus, RepositoryError> {
    match s {
        "PENDING" => Ok(PayoutStatus::Pending),
        "COMPLETED" => Ok(PayoutStatus::Completed),
        other => Err(RepositoryError::Storage(format!(
            "unknown payout status in store: {other}"
        ))),
    }
}

impl PgOrderRepository {
    fn assemble(row: OrderRow, items: Vec<OrderItemRow>) -> Result<Order, RepositoryError> {
        let seller_fees = match (
            row.platform_fee_seller,
            row.safety_fee,
            row.freight_fee,
            row.payout_amount,
        ) {
            (Some(platform_fee_seller), Some(safety_fee), Some(freight_fee), Some(payout_amount)) => {
                Some(SellerFees {
                    platform_fee_seller,
                    safety_fee,
                    freight_fee,
                    payout_amount,
                })
            }
            _ => None,
        };

        let quality_documents = row
            .quality_documents
            .map(serde_json::from_value::<QualityDocuments>)
            .transpose()
            .map_err(|e| RepositoryError::Storage(format!("corrupt quality documents: {e}")))?;

        Ok(Order {
            id: row.id,
            buyer_id: row.buyer_id,
            seller_id: row.seller_id,
            items: items
                .into_iter()
                .map(|i| LineItem {
                    id: i.id,
                    product_id: i.product_id,
                    name: i.name,
                    quantity: i.quantity,
                    price_per_unit: i.price_per_unit,
                    unit: i.unit,
                    gst_percent: i.gst_percent,
                })
                .collect(),
            currency: row.currency,
            sub_total: row.sub_total,
            tax_amount: row.tax_amount,
            platform_fee_buyer: row.platform_fee_buyer,
            logistic_fee: row.logistic_fee,
            total_amount: row.total_amount,
            seller_fees,
            status: order_status_from_str(&row.status)?,
            payment_status: payment_status_from_str(&row.payment_status)?,
            payout_status: payout_status_from_str(&row.payout_status)?,
            quality_documents,
            transaction_reference: row.transaction_reference,
            payout_reference: row.payout_reference,
            payout_payee_id: row.payout_payee_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn load_by_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(order) = self.load(id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let quality_documents = order
            .quality_documents
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, buyer_id, seller_id, currency,
                sub_total, tax_amount, platform_fee_buyer, logistic_fee, total_amount,
                platform_fee_seller, safety_fee, freight_fee, payout_amount,
                status, payment_status, payout_status,
                quality_documents, transaction_reference, payout_reference, payout_payee_id,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                    $14, $15, $16, $17, $18, $19, $20, $21, $22)
            "#,
        )
        .bind(order.id)
        .bind(order.buyer_id)
        .bind(order.seller_id)
        .bind(&order.currency)
        .bind(order.sub_total)
        .bind(order.tax_amount)
        .bind(order.platform_fee_buyer)
        .bind(order.logistic_fee)
        .bind(order.total_amount)
        .bind(order.seller_fees.as_ref().map(|f| f.platform_fee_seller))
        .bind(order.seller_fees.as_ref().map(|f| f.safety_fee))
        .bind(order.seller_fees.as_ref().map(|f| f.freight_fee))
        .bind(order.seller_fees.as_ref().map(|f| f.payout_amount))
        .bind(order.status.as_str())
        .bind(payment_status_as_str(order.payment_status))
        .bind(payout_status_as_str(order.payout_status))
        .bind(&quality_documents)
        .bind(&order.transaction_reference)
        .bind(&order.payout_reference)
        .bind(order.payout_payee_id)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;

        for item in &order.items {
            sqlx::query(
                r#"
                INSERT INTO order_items (id, order_id, product_id, name, quantity, price_per_unit, unit, gst_percent)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(item.id)
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.name)
            .bind(item.quantity)
            .bind(item.price_per_unit)
            .bind(&item.unit)
            .bind(item.gst_percent)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn load(&self, order_id: Uuid) -> Result<Option<Order>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r#"
            SELECT id, buyer_id, seller_id, currency,
                   sub_total, tax_amount, platform_fee_buyer, logistic_fee, total_amount,
                   platform_fee_seller, safety_fee, freight_fee, payout_amount,
                   status, payment_status, payout_status,
                   quality_documents, transaction_reference, payout_reference, payout_payee_id,
                   created_at, updated_at
            FROM orders WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            "SELECT id, product_id, name, quantity, price_per_unit, unit, gst_percent
             FROM order_items WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        Self::assemble(row, items).map(Some)
    }

    async fn update(
        &self,
        order: &Order,
        expected_prior_status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let quality_documents = order
            .quality_documents
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = $1,
                payment_status = $2,
                payout_status = $3,
                platform_fee_seller = $4,
                safety_fee = $5,
                freight_fee = $6,
                payout_amount = $7,
                quality_documents = $8,
                transaction_reference = $9,
                payout_reference = $10,
                payout_payee_id = $11,
                updated_at = $12
            WHERE id = $13 AND status = $14
            "#,
        )
        .bind(order.status.as_str())
        .bind(payment_status_as_str(order.payment_status))
        .bind(payout_status_as_str(order.payout_status))
        .bind(order.seller_fees.as_ref().map(|f| f.platform_fee_seller))
        .bind(order.seller_fees.as_ref().map(|f| f.safety_fee))
        .bind(order.seller_fees.as_ref().map(|f| f.freight_fee))
        .bind(order.seller_fees.as_ref().map(|f| f.payout_amount))
        .bind(&quality_documents)
        .bind(&order.transaction_reference)
        .bind(&order.payout_reference)
        .bind(order.payout_payee_id)
        .bind(order.updated_at)
        .bind(order.id)
        .bind(expected_prior_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(storage)?;

        if result.rows_affected() == 0 {
            // Distinguish a vanished order from a lost race
            let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM orders WHERE id = $1")
                .bind(order.id)
                .fetch_optional(&self.pool)
                .await
                .map_err(storage)?;

            return Err(match exists {
                None => RepositoryError::NotFound(order.id),
                Some(_) => RepositoryError::Conflict {
                    order_id: order.id,
                    expected: expected_prior_status,
                },
            });
        }

        Ok(())
    }

    async fn record_change(&self, change: &StatusChange) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO order_changes (id, order_id, change_type, prior_status, new_status, actor, note, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(change.id)
        .bind(change.order_id)
        .bind(&change.change_type)
        .bind(change.prior_status.map(|s| s.as_str()))
        .bind(change.new_status.map(|s| s.as_str()))
        .bind(&change.actor)
        .bind(&change.note)
        .bind(change.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn changes_for(&self, order_id: Uuid) -> Result<Vec<StatusChange>, RepositoryError> {
        let rows: Vec<ChangeRow> = sqlx::query_as(
            "SELECT id, order_id, change_type, prior_status, new_status, actor, note, created_at
             FROM order_changes WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;

        rows.into_iter()
            .map(|row| {
                Ok(StatusChange {
                    id: row.id,
                    order_id: row.order_id,
                    change_type: row.change_type,
                    prior_status: row
                        .prior_status
                        .as_deref()
                        .map(order_status_from_str)
                        .transpose()?,
                    new_status: row
                        .new_status
                        .as_deref()
                        .map(order_status_from_str)
                        .transpose()?,
                    actor: row.actor,
                    note: row.note,
                    created_at: row.created_at,
                })
            })
            .collect()
    }

    async fn list_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM orders WHERE buyer_id = $1 ORDER BY created_at DESC")
                .bind(buyer_id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage)?;

        self.load_by_ids(ids.into_iter().map(|(id,)| id).collect()).await
    }

    async fn list_for_seller(&self, seller_id: Uuid) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM orders WHERE seller_id = $1 ORDER BY created_at DESC")
                .bind(seller_id)
                .fetch_all(&self.pool)
                .await
                .map_err(storage)?;

        self.load_by_ids(ids.into_iter().map(|(id,)| id).collect()).await
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM orders WHERE status = $1 ORDER BY created_at DESC")
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(storage)?;

        self.load_by_ids(ids.into_iter().map(|(id,)| id).collect()).await
    }
}
