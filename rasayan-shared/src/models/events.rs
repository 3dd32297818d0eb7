use rust_decimal::Decimal;
use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderCreatedEvent {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub total_amount: Decimal,
    pub item_count: usize,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OrderStatusChangedEvent {
    pub order_id: Uuid,
    pub prior_status: String,
    pub new_status: String,
    pub actor: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PaymentRecordedEvent {
    pub order_id: Uuid,
    pub buyer_id: Uuid,
    pub amount: Decimal,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct PayoutReleasedEvent {
    pub order_id: Uuid,
    pub payee_id: Uuid,
    pub payout_amount: Decimal,
    pub timestamp: i64,
}
