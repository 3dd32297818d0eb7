use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use rasayan_api::{app, AppState};
use rasayan_core::directory::OpenSellerDirectory;
use rasayan_order::{FeeSchedule, MemoryOrderRepository, NoopEventSink, SettlementEngine};

fn test_app() -> Router {
    let engine = Arc::new(SettlementEngine::new(
        Arc::new(MemoryOrderRepository::new()),
        Arc::new(NoopEventSink),
        Arc::new(OpenSellerDirectory),
        FeeSchedule::default(),
    ));
    app(AppState { engine })
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = match body {
        Some(body) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn checkout_body(buyer: Uuid, seller: Uuid) -> Value {
    json!({
        "buyer_id": buyer,
        "seller_id": seller,
        "items": [{
            "product_id": Uuid::new_v4(),
            "name": "Caustic Soda Flakes",
            "quantity": "100",
            "price_per_unit": "38",
            "unit": "kg",
            "gst_percent": "18"
        }]
    })
}

#[tokio::test]
async fn checkout_to_payout_over_http() {
    let router = test_app();
    let buyer = Uuid::new_v4();
    let seller = Uuid::new_v4();
    let admin = Uuid::new_v4();

    // Checkout
    let (status, order) = send(
        &router,
        "POST",
        "/v1/orders",
        Some(checkout_body(buyer, seller)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "PENDING_SELLER");
    assert_eq!(order["total_amount"], "4573.68");
    assert_eq!(order["platform_fee_buyer"], "44.84");
    assert_eq!(order["logistic_fee"], "44.84");
    assert!(order["seller_fees"].is_null());

    let id = order["id"].as_str().unwrap();

    // Seller accepts with documents
    let (status, order) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/seller-accept"),
        Some(json!({
            "quality_report_ref": "files://qr/2024/5521.pdf",
            "purity": "99.1%",
            "grade": "Industrial"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "PENDING_ADMIN");

    // Admin verifies; seller fees are frozen
    let (status, order) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/admin-verify"),
        Some(json!({ "admin_id": admin, "approved": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "ACCEPTED");
    assert_eq!(order["seller_fees"]["platform_fee_seller"], "67.26");
    assert_eq!(order["seller_fees"]["payout_amount"], "4360.69");

    // Payout release
    let (status, order) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/payout"),
        Some(json!({
            "admin_id": admin,
            "transaction_reference": "NEFT-2024-88412",
            "payee_id": seller
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["payout_status"], "COMPLETED");
    assert_eq!(order["payout_reference"], "NEFT-2024-88412");

    // Audit trail is visible to the admin console
    let (status, log) = send(
        &router,
        "GET",
        &format!("/v1/admin/orders/{id}/changes"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let kinds: Vec<&str> = log["changes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["change_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec!["ORDER_CREATED", "SELLER_ACCEPTED", "ADMIN_VERIFIED", "PAYOUT_RELEASED"]
    );

    // Settlement summary reflects the completed payout
    let (status, summary) = send(
        &router,
        "GET",
        &format!("/v1/admin/settlement/{seller}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["accepted_orders"], 1);
    assert_eq!(summary["payout_completed"], "4360.69");
}

#[tokio::test]
async fn gateway_reference_is_recorded_on_the_order() {
    use rasayan_core::payment::{MockPaymentGateway, PaymentGateway};

    let router = test_app();
    let (_, order) = send(
        &router,
        "POST",
        "/v1/orders",
        Some(checkout_body(Uuid::new_v4(), Uuid::new_v4())),
    )
    .await;
    let id = order["id"].as_str().unwrap();
    let order_id = Uuid::parse_str(id).unwrap();

    // The gateway collaborator collects the buyer payable and hands back a
    // transaction reference; the engine only records it.
    let gateway = MockPaymentGateway;
    let collection = gateway
        .initiate_collection(
            order_id,
            order["total_amount"].as_str().unwrap().parse().unwrap(),
            "INR",
        )
        .await
        .unwrap();
    let collection = gateway.get_collection(&collection.id).await.unwrap();
    let reference = collection.transaction_reference.unwrap();

    let (status, order) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/payment"),
        Some(json!({ "transaction_reference": reference })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["payment_status"], "PAID");
    assert_eq!(order["transaction_reference"], reference);

    // A second gateway callback must not silently overwrite the reference
    let (status, _) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/payment"),
        Some(json!({ "transaction_reference": "TXN-DUPLICATE" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn invalid_transitions_map_to_conflict() {
    let router = test_app();
    let (_, order) = send(
        &router,
        "POST",
        "/v1/orders",
        Some(checkout_body(Uuid::new_v4(), Uuid::new_v4())),
    )
    .await;
    let id = order["id"].as_str().unwrap();

    let (status, _) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/seller-decline"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Declined is terminal; a late acceptance is a conflict
    let (status, body) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/seller-accept"),
        Some(json!({
            "quality_report_ref": "files://qr/2024/5522.pdf",
            "purity": "98%",
            "grade": "Technical"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Invalid state transition"));
}

#[tokio::test]
async fn empty_cart_is_a_bad_request() {
    let router = test_app();
    let (status, body) = send(
        &router,
        "POST",
        "/v1/orders",
        Some(json!({
            "buyer_id": Uuid::new_v4(),
            "seller_id": Uuid::new_v4(),
            "items": []
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("at least one line item"));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let router = test_app();
    let (status, _) = send(
        &router,
        "GET",
        &format!("/v1/orders/{}", Uuid::new_v4()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn payout_before_acceptance_is_refused() {
    let router = test_app();
    let seller = Uuid::new_v4();
    let (_, order) = send(
        &router,
        "POST",
        "/v1/orders",
        Some(checkout_body(Uuid::new_v4(), seller)),
    )
    .await;
    let id = order["id"].as_str().unwrap();

    let (status, _) = send(
        &router,
        "POST",
        &format!("/v1/orders/{id}/payout"),
        Some(json!({
            "admin_id": Uuid::new_v4(),
            "transaction_reference": "NEFT-1",
            "payee_id": seller
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}
