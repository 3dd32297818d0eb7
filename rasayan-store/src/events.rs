use async_trait::async_trait;
use rasayan_order::{DomainEvent, EventSink};
use tokio::sync::broadcast;
use tracing::debug;

/// Fans domain events out to in-process subscribers (SSE streams, the
/// notification collaborator's bridge). Lagging or absent receivers are the
/// subscriber's problem; emission never blocks the engine.
#[derive(Clone)]
pub struct BroadcastEventSink {
    tx: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn emit(&self, event: DomainEvent) {
        debug!(?event, "Emitting domain event");
        // send only fails when nobody is subscribed
        let _ = self.tx.send(event);
    }
}
