use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionStatus {
    Initiated,
    Succeeded,
    Failed,
}

/// A buyer-side collection created with the external gateway. The engine
/// never speaks the gateway's wire protocol; it only records the resulting
/// transaction reference on the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCollection {
    pub id: String, // Provider's ID (e.g., pay_123)
    pub order_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub status: CollectionStatus,
    pub transaction_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start collecting the buyer payable for an order
    async fn initiate_collection(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentCollection, Box<dyn std::error::Error + Send + Sync>>;

    /// Retrieve the current state of a collection
    async fn get_collection(
        &self,
        collection_id: &str,
    ) -> Result<PaymentCollection, Box<dyn std::error::Error + Send + Sync>>;
}

pub struct MockPaymentGateway;

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn initiate_collection(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: &str,
    ) -> Result<PaymentCollection, Box<dyn std::error::Error + Send + Sync>> {
        Ok(PaymentCollection {
            // Encode order_id in the collection id so the mock can "remember" it
            id: format!("mock_pay_{}", order_id.simple()),
            order_id,
            amount,
            currency: currency.to_string(),
            status: CollectionStatus::Initiated,
            transaction_reference: None,
            created_at: Utc::now(),
        })
    }

    async fn get_collection(
        &self,
        collection_id: &str,
    ) -> Result<PaymentCollection, Box<dyn std::error::Error + Send + Sync>> {
        let order_id_str = collection_id.strip_prefix("mock_pay_").unwrap_or_default();
        let order_id = Uuid::parse_str(order_id_str).unwrap_or_else(|_| Uuid::new_v4());

        // Report success to simulate a completed buyer payment
        Ok(PaymentCollection {
            id: collection_id.to_string(),
            order_id,
            amount: Decimal::ZERO,
            currency: "INR".to_string(),
            status: CollectionStatus::Succeeded,
            transaction_reference: Some(format!("TXN-{}", collection_id)),
            created_at: Utc::now(),
        })
    }
}
