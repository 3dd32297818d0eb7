use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Order, OrderStatus, StatusChange};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error("Order {order_id} was modified concurrently (status no longer {expected})")]
    Conflict { order_id: Uuid, expected: OrderStatus },

    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Persistence port for order records. Implementations must honour the
/// compare-and-swap contract of [`update`](OrderRepository::update): the
/// write succeeds only while the stored status equals the status the caller
/// read, which is what keeps two concurrent seller/admin actions from both
/// succeeding.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError>;

    async fn load(&self, order_id: Uuid) -> Result<Option<Order>, RepositoryError>;

    /// Conditional write keyed on the expected prior status
    async fn update(
        &self,
        order: &Order,
        expected_prior_status: OrderStatus,
    ) -> Result<(), RepositoryError>;

    async fn record_change(&self, change: &StatusChange) -> Result<(), RepositoryError>;

    async fn changes_for(&self, order_id: Uuid) -> Result<Vec<StatusChange>, RepositoryError>;

    async fn list_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>, RepositoryError>;

    async fn list_for_seller(&self, seller_id: Uuid) -> Result<Vec<Order>, RepositoryError>;

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError>;
}
