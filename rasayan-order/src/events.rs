use async_trait::async_trait;
use rasayan_shared::models::events::{
    OrderCreatedEvent, OrderStatusChangedEvent, PaymentRecordedEvent, PayoutReleasedEvent,
};

/// Domain events emitted by the engine after a mutation has been persisted.
/// Delivery to notifiers is a collaborator concern; emission is best-effort
/// and must never fail an already-committed operation.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    OrderCreated(OrderCreatedEvent),
    StatusChanged(OrderStatusChangedEvent),
    PaymentRecorded(PaymentRecordedEvent),
    PayoutReleased(PayoutReleasedEvent),
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: DomainEvent);
}

/// Sink that drops everything. Used by tests and callers without a notifier.
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn emit(&self, _event: DomainEvent) {}
}
