use std::sync::Arc;

use rust_decimal_macros::dec;
use uuid::Uuid;

use rasayan_core::directory::OpenSellerDirectory;
use rasayan_order::{
    DomainEvent, FeeSchedule, LineItem, MemoryOrderRepository, QualityDocuments, SettlementEngine,
};
use rasayan_store::BroadcastEventSink;

#[tokio::test]
async fn engine_events_reach_broadcast_subscribers() {
    let sink = Arc::new(BroadcastEventSink::new(32));
    let mut rx = sink.subscribe();

    let engine = SettlementEngine::new(
        Arc::new(MemoryOrderRepository::new()),
        sink.clone(),
        Arc::new(OpenSellerDirectory),
        FeeSchedule::default(),
    );

    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let items = vec![LineItem::new(
        Uuid::new_v4(),
        "Sulphuric Acid 98%",
        dec!(40),
        dec!(18.5),
        "L",
        None,
    )];

    let order = engine.create_order(buyer, seller, items).await.unwrap();
    let documents = QualityDocuments {
        quality_report_ref: "files://qr/2024/9931.pdf".to_string(),
        purity: "98%".to_string(),
        grade: "Battery".to_string(),
    };
    engine.seller_accept(order.id, documents).await.unwrap();

    match rx.recv().await.unwrap() {
        DomainEvent::OrderCreated(event) => {
            assert_eq!(event.order_id, order.id);
            assert_eq!(event.buyer_id, buyer);
            assert_eq!(event.item_count, 1);
        }
        other => panic!("expected OrderCreated, got {:?}", other),
    }

    match rx.recv().await.unwrap() {
        DomainEvent::StatusChanged(event) => {
            assert_eq!(event.order_id, order.id);
            assert_eq!(event.prior_status, "PENDING_SELLER");
            assert_eq!(event.new_status, "PENDING_ADMIN");
        }
        other => panic!("expected StatusChanged, got {:?}", other),
    }
}
