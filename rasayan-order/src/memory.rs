use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Order, OrderStatus, StatusChange};
use crate::repository::{OrderRepository, RepositoryError};

/// In-process repository honouring the same compare-and-swap contract as the
/// Postgres implementation. Used by engine tests and single-node demo runs.
pub struct MemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
    changes: RwLock<Vec<StatusChange>>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
            changes: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryOrderRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        if orders.contains_key(&order.id) {
            return Err(RepositoryError::Storage(format!(
                "order {} already exists",
                order.id
            )));
        }
        orders.insert(order.id, order.clone());
        Ok(())
    }

    async fn load(&self, order_id: Uuid) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&order_id).cloned())
    }

    async fn update(
        &self,
        order: &Order,
        expected_prior_status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let stored = orders
            .get_mut(&order.id)
            .ok_or(RepositoryError::NotFound(order.id))?;

        if stored.status != expected_prior_status {
            return Err(RepositoryError::Conflict {
                order_id: order.id,
                expected: expected_prior_status,
            });
        }

        *stored = order.clone();
        Ok(())
    }

    async fn record_change(&self, change: &StatusChange) -> Result<(), RepositoryError> {
        self.changes.write().await.push(change.clone());
        Ok(())
    }

    async fn changes_for(&self, order_id: Uuid) -> Result<Vec<StatusChange>, RepositoryError> {
        Ok(self
            .changes
            .read()
            .await
            .iter()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.buyer_id == buyer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_for_seller(&self, seller_id: Uuid) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.seller_id == seller_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }
}
