use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use rasayan_core::directory::SellerDirectory;
use rasayan_shared::models::events::{
    OrderCreatedEvent, OrderStatusChangedEvent, PaymentRecordedEvent, PayoutReleasedEvent,
};

use crate::events::{DomainEvent, EventSink};
use crate::fees::{FeeError, FeeSchedule};
use crate::models::{
    Actor, LineItem, Order, OrderStatus, PaymentStatus, PayoutStatus, QualityDocuments,
    StatusChange,
};
use crate::repository::{OrderRepository, RepositoryError};

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Validation(#[from] FeeError),

    #[error("Invalid state transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Order {0} is not in a payable status ({1})")]
    InvalidState(Uuid, OrderStatus),

    #[error("Order {0} already carries a settlement reference")]
    AlreadyPaid(Uuid),

    #[error("Quality documents incomplete: {0}")]
    MissingDocuments(String),

    #[error("Transaction reference must not be empty")]
    EmptyReference,

    #[error("Payee {0} does not resolve to a payout-enabled seller account")]
    UnknownPayee(Uuid),

    #[error("Concurrent update on order {0}, reload and retry")]
    Conflict(Uuid),

    #[error("Seller directory lookup failed: {0}")]
    DirectoryUnavailable(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => OrderError::NotFound(id),
            RepositoryError::Conflict { order_id, .. } => OrderError::Conflict(order_id),
            RepositoryError::Storage(msg) => OrderError::Storage(msg),
        }
    }
}

/// Owns every status transition and monetary derivation for marketplace
/// orders. The engine itself is pure computation over `(order, event)`;
/// persistence goes through the injected repository, whose conditional
/// update keyed on the previously read status guarantees at-most-one-writer
/// semantics under concurrent seller/admin actions.
pub struct SettlementEngine {
    repo: Arc<dyn OrderRepository>,
    events: Arc<dyn EventSink>,
    sellers: Arc<dyn SellerDirectory>,
    schedule: FeeSchedule,
}

impl SettlementEngine {
    pub fn new(
        repo: Arc<dyn OrderRepository>,
        events: Arc<dyn EventSink>,
        sellers: Arc<dyn SellerDirectory>,
        schedule: FeeSchedule,
    ) -> Self {
        Self {
            repo,
            events,
            sellers,
            schedule,
        }
    }

    pub fn fee_schedule(&self) -> &FeeSchedule {
        &self.schedule
    }

    /// Validate the cart, derive buyer-side totals and create the order in
    /// PENDING_SELLER.
    pub async fn create_order(
        &self,
        buyer_id: Uuid,
        seller_id: Uuid,
        items: Vec<LineItem>,
    ) -> Result<Order, OrderError> {
        let totals = self.schedule.buyer_totals(&items)?;
        let order = Order::new(buyer_id, seller_id, items, totals);

        self.repo.insert(&order).await?;
        self.repo
            .record_change(&StatusChange::new(
                order.id,
                "ORDER_CREATED",
                None,
                Some(OrderStatus::PendingSeller),
                &Actor::Buyer(buyer_id),
                None,
            ))
            .await?;

        self.events
            .emit(DomainEvent::OrderCreated(OrderCreatedEvent {
                order_id: order.id,
                buyer_id,
                seller_id,
                total_amount: order.total_amount,
                item_count: order.items.len(),
                timestamp: Utc::now().timestamp(),
            }))
            .await;

        Ok(order)
    }

    pub async fn get_order(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.load_existing(order_id).await
    }

    pub async fn changes_for(&self, order_id: Uuid) -> Result<Vec<StatusChange>, OrderError> {
        Ok(self.repo.changes_for(order_id).await?)
    }

    pub async fn list_for_buyer(&self, buyer_id: Uuid) -> Result<Vec<Order>, OrderError> {
        Ok(self.repo.list_for_buyer(buyer_id).await?)
    }

    pub async fn list_for_seller(&self, seller_id: Uuid) -> Result<Vec<Order>, OrderError> {
        Ok(self.repo.list_for_seller(seller_id).await?)
    }

    pub async fn list_by_status(&self, status: OrderStatus) -> Result<Vec<Order>, OrderError> {
        Ok(self.repo.list_by_status(status).await?)
    }

    /// Transition: PENDING_SELLER → PENDING_ADMIN. The seller submits the
    /// compliance documents the admin will verify; an order without a
    /// quality report cannot move forward.
    pub async fn seller_accept(
        &self,
        order_id: Uuid,
        documents: QualityDocuments,
    ) -> Result<Order, OrderError> {
        if documents.quality_report_ref.trim().is_empty() {
            return Err(OrderError::MissingDocuments(
                "quality report reference is required".to_string(),
            ));
        }

        let mut order = self.load_existing(order_id).await?;
        self.guard(&order, OrderStatus::PendingSeller, OrderStatus::PendingAdmin)?;

        let prior = order.status;
        order.quality_documents = Some(documents);
        order.update_status(OrderStatus::PendingAdmin);

        let actor = Actor::Seller(order.seller_id);
        self.commit(&order, prior, "SELLER_ACCEPTED", &actor, None).await?;
        Ok(order)
    }

    /// Transition: PENDING_SELLER → REJECTED
    pub async fn seller_decline(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let mut order = self.load_existing(order_id).await?;
        self.guard(&order, OrderStatus::PendingSeller, OrderStatus::Rejected)?;

        let prior = order.status;
        order.update_status(OrderStatus::Rejected);

        let actor = Actor::Seller(order.seller_id);
        self.commit(&order, prior, "SELLER_DECLINED", &actor, None).await?;
        Ok(order)
    }

    /// Transition: PENDING_SELLER → CANCELLED. Permitted to the buyer or an
    /// admin, and only before the seller has acted.
    pub async fn cancel(&self, order_id: Uuid, actor: Actor) -> Result<Order, OrderError> {
        let mut order = self.load_existing(order_id).await?;
        self.guard(&order, OrderStatus::PendingSeller, OrderStatus::Cancelled)?;

        let prior = order.status;
        order.update_status(OrderStatus::Cancelled);

        self.commit(&order, prior, "ORDER_CANCELLED", &actor, None).await?;
        Ok(order)
    }

    /// Transition: PENDING_ADMIN → ACCEPTED (approved) or REJECTED. Entering
    /// ACCEPTED freezes the seller-side fee breakdown.
    pub async fn admin_verify(
        &self,
        order_id: Uuid,
        admin_id: Uuid,
        approved: bool,
    ) -> Result<Order, OrderError> {
        let mut order = self.load_existing(order_id).await?;
        let target = if approved {
            OrderStatus::Accepted
        } else {
            OrderStatus::Rejected
        };
        self.guard(&order, OrderStatus::PendingAdmin, target)?;

        let prior = order.status;
        if approved && order.seller_fees.is_none() {
            order.seller_fees = Some(self.schedule.seller_fees(order.taxable_total()));
        }
        order.update_status(target);

        let change_type = if approved { "ADMIN_VERIFIED" } else { "ADMIN_REJECTED" };
        let actor = Actor::Admin(admin_id);
        self.commit(&order, prior, change_type, &actor, None).await?;
        Ok(order)
    }

    /// Transition: ACCEPTED → SHIPPED, driven by the logistics collaborator
    pub async fn mark_shipped(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let mut order = self.load_existing(order_id).await?;
        self.guard(&order, OrderStatus::Accepted, OrderStatus::Shipped)?;

        let prior = order.status;
        order.update_status(OrderStatus::Shipped);

        self.commit(&order, prior, "DISPATCHED", &Actor::System, None).await?;
        Ok(order)
    }

    /// Transition: SHIPPED → DELIVERED. Delivery does not release the
    /// payout; that stays an explicit admin operation.
    pub async fn mark_delivered(&self, order_id: Uuid) -> Result<Order, OrderError> {
        let mut order = self.load_existing(order_id).await?;
        self.guard(&order, OrderStatus::Shipped, OrderStatus::Delivered)?;

        let prior = order.status;
        order.update_status(OrderStatus::Delivered);

        self.commit(&order, prior, "DELIVERED", &Actor::System, None).await?;
        Ok(order)
    }

    /// Admin escape hatch that bypasses the transition table. From a
    /// non-terminal status the target must lie later on the forward path or
    /// be terminal; terminal orders may be moved anywhere, which is the sole
    /// sanctioned exception to terminal immutability. Every use is audited.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        admin_id: Uuid,
    ) -> Result<Order, OrderError> {
        let mut order = self.load_existing(order_id).await?;
        let prior = order.status;

        if new_status == prior {
            return Err(OrderError::InvalidTransition {
                from: prior,
                to: new_status,
            });
        }
        if !prior.is_terminal() && !new_status.is_terminal() {
            let allowed = match (prior.sequence_rank(), new_status.sequence_rank()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            };
            if !allowed {
                return Err(OrderError::InvalidTransition {
                    from: prior,
                    to: new_status,
                });
            }
        }

        if new_status == OrderStatus::Accepted && order.seller_fees.is_none() {
            order.seller_fees = Some(self.schedule.seller_fees(order.taxable_total()));
        }
        order.update_status(new_status);

        tracing::warn!(
            order_id = %order_id,
            prior_status = %prior,
            new_status = %new_status,
            admin = %admin_id.simple(),
            "Admin status override bypassed the transition table"
        );

        let actor = Actor::Admin(admin_id);
        self.commit(
            &order,
            prior,
            "ADMIN_OVERRIDE",
            &actor,
            Some("direct status override outside the transition table".to_string()),
        )
        .await?;
        Ok(order)
    }

    /// Record the gateway reference for the buyer collection and flip the
    /// payment flag. Independent of the lifecycle status.
    pub async fn mark_paid(
        &self,
        order_id: Uuid,
        transaction_reference: &str,
    ) -> Result<Order, OrderError> {
        if transaction_reference.trim().is_empty() {
            return Err(OrderError::EmptyReference);
        }

        let mut order = self.load_existing(order_id).await?;
        if order.payment_status == PaymentStatus::Paid {
            return Err(OrderError::AlreadyPaid(order_id));
        }

        let prior = order.status;
        order.payment_status = PaymentStatus::Paid;
        order.transaction_reference = Some(transaction_reference.to_string());
        order.updated_at = Utc::now();

        self.repo.update(&order, prior).await?;
        self.repo
            .record_change(&StatusChange::new(
                order_id,
                "PAYMENT_RECORDED",
                Some(prior),
                Some(prior),
                &Actor::System,
                Some(format!("buyer payment ref {}", transaction_reference)),
            ))
            .await?;

        self.events
            .emit(DomainEvent::PaymentRecorded(PaymentRecordedEvent {
                order_id,
                buyer_id: order.buyer_id,
                amount: order.total_amount,
                timestamp: Utc::now().timestamp(),
            }))
            .await;

        Ok(order)
    }

    /// Mark the seller payout as completed, recording the settlement
    /// reference and the actual payee. Requires the order to have reached
    /// ACCEPTED; a repeat release fails unless `force` is set, in which case
    /// the overwrite itself is audited.
    pub async fn release_payout(
        &self,
        order_id: Uuid,
        transaction_reference: &str,
        payee_id: Uuid,
        admin_id: Uuid,
        force: bool,
    ) -> Result<Order, OrderError> {
        if transaction_reference.trim().is_empty() {
            return Err(OrderError::EmptyReference);
        }

        let mut order = self.load_existing(order_id).await?;
        if !matches!(
            order.status,
            OrderStatus::Accepted | OrderStatus::Shipped | OrderStatus::Delivered
        ) {
            return Err(OrderError::InvalidState(order_id, order.status));
        }
        if order.payout_status == PayoutStatus::Completed && !force {
            return Err(OrderError::AlreadyPaid(order_id));
        }

        let account = self
            .sellers
            .resolve_seller(payee_id)
            .await
            .map_err(|e| OrderError::DirectoryUnavailable(e.to_string()))?;
        match account {
            Some(account) if account.payout_enabled => {}
            _ => return Err(OrderError::UnknownPayee(payee_id)),
        }

        let prior = order.status;
        // Orders forced past ACCEPTED by an override may not have a frozen
        // breakdown yet; payout is the last point where one can be derived.
        if order.seller_fees.is_none() {
            order.seller_fees = Some(self.schedule.seller_fees(order.taxable_total()));
        }
        let overwrite = order.payout_status == PayoutStatus::Completed;
        let redirected = payee_id != order.seller_id;

        order.payout_status = PayoutStatus::Completed;
        order.payout_reference = Some(transaction_reference.to_string());
        order.payout_payee_id = Some(payee_id);
        order.updated_at = Utc::now();

        self.repo.update(&order, prior).await?;

        let mut notes = Vec::new();
        if overwrite {
            notes.push("forced overwrite of an existing settlement reference".to_string());
        }
        if redirected {
            notes.push(format!("payout redirected from seller {} to payee {}", order.seller_id, payee_id));
        }
        let change_type = if overwrite { "PAYOUT_OVERWRITTEN" } else { "PAYOUT_RELEASED" };
        self.repo
            .record_change(&StatusChange::new(
                order_id,
                change_type,
                Some(prior),
                Some(prior),
                &Actor::Admin(admin_id),
                if notes.is_empty() { None } else { Some(notes.join("; ")) },
            ))
            .await?;

        if overwrite {
            tracing::warn!(
                order_id = %order_id,
                admin = %admin_id.simple(),
                "Payout settlement reference overwritten under force flag"
            );
        }

        let payout_amount = order
            .seller_fees
            .as_ref()
            .map(|f| f.payout_amount)
            .unwrap_or_default();
        self.events
            .emit(DomainEvent::PayoutReleased(PayoutReleasedEvent {
                order_id,
                payee_id,
                payout_amount,
                timestamp: Utc::now().timestamp(),
            }))
            .await;

        Ok(order)
    }

    fn guard(
        &self,
        order: &Order,
        expected: OrderStatus,
        target: OrderStatus,
    ) -> Result<(), OrderError> {
        if order.status != expected {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: target,
            });
        }
        Ok(())
    }

    /// Persist a guarded transition, append the audit record and emit the
    /// status-change event.
    async fn commit(
        &self,
        order: &Order,
        prior: OrderStatus,
        change_type: &str,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<(), OrderError> {
        self.repo.update(order, prior).await?;
        self.repo
            .record_change(&StatusChange::new(
                order.id,
                change_type,
                Some(prior),
                Some(order.status),
                actor,
                note,
            ))
            .await?;

        self.events
            .emit(DomainEvent::StatusChanged(OrderStatusChangedEvent {
                order_id: order.id,
                prior_status: prior.to_string(),
                new_status: order.status.to_string(),
                actor: actor.to_string(),
                timestamp: Utc::now().timestamp(),
            }))
            .await;

        Ok(())
    }

    async fn load_existing(&self, order_id: Uuid) -> Result<Order, OrderError> {
        self.repo
            .load(order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventSink;
    use crate::memory::MemoryOrderRepository;
    use rasayan_core::directory::OpenSellerDirectory;
    use rust_decimal_macros::dec;

    fn engine() -> SettlementEngine {
        SettlementEngine::new(
            Arc::new(MemoryOrderRepository::new()),
            Arc::new(NoopEventSink),
            Arc::new(OpenSellerDirectory),
            FeeSchedule::default(),
        )
    }

    fn cart() -> Vec<LineItem> {
        vec![LineItem::new(
            Uuid::new_v4(),
            "Caustic Soda Flakes",
            dec!(100),
            dec!(38),
            "kg",
            Some(dec!(18)),
        )]
    }

    fn docs() -> QualityDocuments {
        QualityDocuments {
            quality_report_ref: "files://qr/2024/8812.pdf".to_string(),
            purity: "99.2%".to_string(),
            grade: "Industrial".to_string(),
        }
    }

    #[tokio::test]
    async fn full_lifecycle_to_delivered() {
        let engine = engine();
        let buyer = Uuid::new_v4();
        let seller = Uuid::new_v4();
        let admin = Uuid::new_v4();

        let order = engine.create_order(buyer, seller, cart()).await.unwrap();
        assert_eq!(order.status, OrderStatus::PendingSeller);
        assert_eq!(order.total_amount, dec!(4573.68));

        let order = engine.seller_accept(order.id, docs()).await.unwrap();
        assert_eq!(order.status, OrderStatus::PendingAdmin);
        assert!(order.quality_documents.is_some());

        let order = engine.admin_verify(order.id, admin, true).await.unwrap();
        assert_eq!(order.status, OrderStatus::Accepted);
        let fees = order.seller_fees.expect("fees frozen on acceptance");
        assert_eq!(fees.platform_fee_seller, dec!(67.26));
        assert_eq!(fees.safety_fee, dec!(11.21));
        assert_eq!(fees.freight_fee, dec!(44.84));
        assert_eq!(fees.payout_amount, dec!(4360.69));

        let order = engine.mark_shipped(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        let order = engine.mark_delivered(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Delivered);
        // Delivery alone never releases the payout
        assert_eq!(order.payout_status, PayoutStatus::Pending);
    }

    #[tokio::test]
    async fn decline_is_terminal() {
        let engine = engine();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();

        let order = engine.seller_decline(order.id).await.unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);

        let result = engine.seller_accept(order.id, docs()).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
        let result = engine.seller_decline(order.id).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
        let result = engine.admin_verify(order.id, Uuid::new_v4(), true).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn cancel_only_before_seller_acts() {
        let engine = engine();
        let buyer = Uuid::new_v4();
        let order = engine
            .create_order(buyer, Uuid::new_v4(), cart())
            .await
            .unwrap();

        let cancelled = engine.cancel(order.id, Actor::Buyer(buyer)).await.unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);

        let order = engine
            .create_order(buyer, Uuid::new_v4(), cart())
            .await
            .unwrap();
        engine.seller_accept(order.id, docs()).await.unwrap();
        let result = engine.cancel(order.id, Actor::Buyer(buyer)).await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn accept_requires_quality_report() {
        let engine = engine();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();

        let bad_docs = QualityDocuments {
            quality_report_ref: "  ".to_string(),
            purity: "99%".to_string(),
            grade: "Lab".to_string(),
        };
        let result = engine.seller_accept(order.id, bad_docs).await;
        assert!(matches!(result, Err(OrderError::MissingDocuments(_))));

        // The failed submission must not have consumed the transition
        let stored = engine.get_order(order.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::PendingSeller);
    }

    #[tokio::test]
    async fn admin_rejection_of_documents() {
        let engine = engine();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();
        engine.seller_accept(order.id, docs()).await.unwrap();

        let order = engine
            .admin_verify(order.id, Uuid::new_v4(), false)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Rejected);
        assert!(order.seller_fees.is_none());
    }

    #[tokio::test]
    async fn empty_cart_and_bad_items_are_rejected() {
        let engine = engine();
        let result = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), vec![])
            .await;
        assert!(matches!(
            result,
            Err(OrderError::Validation(FeeError::EmptyOrder))
        ));

        let bad = vec![LineItem::new(
            Uuid::new_v4(),
            "Toluene",
            dec!(-5),
            dec!(90),
            "L",
            None,
        )];
        let result = engine.create_order(Uuid::new_v4(), Uuid::new_v4(), bad).await;
        assert!(matches!(
            result,
            Err(OrderError::Validation(FeeError::InvalidInput { .. }))
        ));
    }

    #[tokio::test]
    async fn override_requires_forward_or_terminal_target() {
        let engine = engine();
        let admin = Uuid::new_v4();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();
        engine.seller_accept(order.id, docs()).await.unwrap();

        // Backward move on the forward path is refused even for admins
        let result = engine
            .update_status(order.id, OrderStatus::PendingSeller, admin)
            .await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));

        // Skipping forward is what the escape hatch is for
        let order = engine
            .update_status(order.id, OrderStatus::Shipped, admin)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        // No-op override is refused
        let result = engine
            .update_status(order.id, OrderStatus::Shipped, admin)
            .await;
        assert!(matches!(result, Err(OrderError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn override_can_resurrect_terminal_orders() {
        let engine = engine();
        let admin = Uuid::new_v4();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();
        engine.seller_decline(order.id).await.unwrap();

        let order = engine
            .update_status(order.id, OrderStatus::PendingAdmin, admin)
            .await
            .unwrap();
        assert_eq!(order.status, OrderStatus::PendingAdmin);

        let changes = engine.changes_for(order.id).await.unwrap();
        assert!(changes.iter().any(|c| c.change_type == "ADMIN_OVERRIDE"));
    }

    #[tokio::test]
    async fn override_into_accepted_freezes_fees() {
        let engine = engine();
        let admin = Uuid::new_v4();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();

        let order = engine
            .update_status(order.id, OrderStatus::Accepted, admin)
            .await
            .unwrap();
        assert!(order.seller_fees.is_some());
    }

    #[tokio::test]
    async fn mark_paid_is_guarded_against_duplicates() {
        let engine = engine();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();

        let order = engine.mark_paid(order.id, "TXN-001").await.unwrap();
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        assert_eq!(order.transaction_reference.as_deref(), Some("TXN-001"));

        let result = engine.mark_paid(order.id, "TXN-002").await;
        assert!(matches!(result, Err(OrderError::AlreadyPaid(_))));

        let result = engine.mark_paid(Uuid::new_v4(), "").await;
        assert!(matches!(result, Err(OrderError::EmptyReference)));
    }

    #[tokio::test]
    async fn payout_requires_accepted_status() {
        let engine = engine();
        let admin = Uuid::new_v4();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();

        let result = engine
            .release_payout(order.id, "SETTLE-1", order.seller_id, admin, false)
            .await;
        assert!(matches!(result, Err(OrderError::InvalidState(_, _))));
    }

    #[tokio::test]
    async fn payout_release_and_duplicate_guard() {
        let engine = engine();
        let admin = Uuid::new_v4();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();
        engine.seller_accept(order.id, docs()).await.unwrap();
        engine.admin_verify(order.id, admin, true).await.unwrap();

        let order = engine
            .release_payout(order.id, "SETTLE-1", order.seller_id, admin, false)
            .await
            .unwrap();
        assert_eq!(order.payout_status, PayoutStatus::Completed);
        assert_eq!(order.payout_reference.as_deref(), Some("SETTLE-1"));
        // Settlement flags stay decoupled from the lifecycle status
        assert_eq!(order.status, OrderStatus::Accepted);

        let result = engine
            .release_payout(order.id, "SETTLE-2", order.seller_id, admin, false)
            .await;
        assert!(matches!(result, Err(OrderError::AlreadyPaid(_))));

        // Forced overwrite is the documented correction path
        let order = engine
            .release_payout(order.id, "SETTLE-2", order.seller_id, admin, true)
            .await
            .unwrap();
        assert_eq!(order.payout_reference.as_deref(), Some("SETTLE-2"));

        let changes = engine.changes_for(order.id).await.unwrap();
        assert!(changes.iter().any(|c| c.change_type == "PAYOUT_OVERWRITTEN"));
    }

    #[tokio::test]
    async fn payout_records_redirected_payee() {
        let engine = engine();
        let admin = Uuid::new_v4();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();
        engine.seller_accept(order.id, docs()).await.unwrap();
        engine.admin_verify(order.id, admin, true).await.unwrap();

        let payee = Uuid::new_v4();
        let order = engine
            .release_payout(order.id, "SETTLE-9", payee, admin, false)
            .await
            .unwrap();
        assert_eq!(order.payout_payee_id, Some(payee));
        assert_ne!(order.seller_id, payee);

        let changes = engine.changes_for(order.id).await.unwrap();
        let release = changes
            .iter()
            .find(|c| c.change_type == "PAYOUT_RELEASED")
            .unwrap();
        assert!(release.note.as_deref().unwrap().contains("redirected"));
    }

    #[tokio::test]
    async fn payout_after_override_derives_missing_fees() {
        let engine = engine();
        let admin = Uuid::new_v4();
        let order = engine
            .create_order(Uuid::new_v4(), Uuid::new_v4(), cart())
            .await
            .unwrap();

        // Forced straight past ACCEPTED; the breakdown was never frozen
        engine
            .update_status(order.id, OrderStatus::Shipped, admin)
            .await
            .unwrap();
        let stored = engine.get_order(order.id).await.unwrap();
        assert!(stored.seller_fees.is_none());

        let order = engine
            .release_payout(order.id, "SETTLE-5", order.seller_id, admin, false)
            .await
            .unwrap();
        let fees = order.seller_fees.expect("derived at payout");
        assert_eq!(fees.payout_amount, dec!(4360.69));
    }
}
