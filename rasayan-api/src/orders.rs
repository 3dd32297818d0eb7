use axum::{
    extract::{Path, Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rasayan_order::{Actor, LineItem, Order, OrderStatus, PaymentStatus, PayoutStatus, QualityDocuments};

use crate::error::ApiError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub product_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub unit: String,
    pub gst_percent: Option<Decimal>,
}

#[derive(Debug, Deserialize)]
pub struct SellerAcceptRequest {
    pub quality_report_ref: String,
    pub purity: String,
    pub grade: String,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrderRequest {
    pub actor: Actor,
}

#[derive(Debug, Deserialize)]
pub struct RecordPaymentRequest {
    pub transaction_reference: String,
}

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub buyer_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Serialize)]
pub struct SellerFeesResponse {
    pub platform_fee_seller: Decimal,
    pub safety_fee: Decimal,
    pub freight_fee: Decimal,
    pub payout_amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub unit: String,
    pub gst_percent: Option<Decimal>,
}

/// Money leaves the engine at full precision and is rounded to currency
/// precision here, at the display boundary.
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub items: Vec<LineItemResponse>,
    pub currency: String,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub platform_fee_buyer: Decimal,
    pub logistic_fee: Decimal,
    pub total_amount: Decimal,
    pub seller_fees: Option<SellerFeesResponse>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payout_status: PayoutStatus,
    pub transaction_reference: Option<String>,
    pub payout_reference: Option<String>,
    pub payout_payee_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            buyer_id: order.buyer_id,
            seller_id: order.seller_id,
            items: order
                .items
                .into_iter()
                .map(|i| LineItemResponse {
                    id: i.id,
                    product_id: i.product_id,
                    name: i.name,
                    quantity: i.quantity,
                    price_per_unit: i.price_per_unit,
                    unit: i.unit,
                    gst_percent: i.gst_percent,
                })
                .collect(),
            currency: order.currency,
            sub_total: order.sub_total.round_dp(2),
            tax_amount: order.tax_amount.round_dp(2),
            platform_fee_buyer: order.platform_fee_buyer.round_dp(2),
            logistic_fee: order.logistic_fee.round_dp(2),
            total_amount: order.total_amount.round_dp(2),
            seller_fees: order.seller_fees.map(|f| SellerFeesResponse {
                platform_fee_seller: f.platform_fee_seller.round_dp(2),
                safety_fee: f.safety_fee.round_dp(2),
                freight_fee: f.freight_fee.round_dp(2),
                payout_amount: f.payout_amount.round_dp(2),
            }),
            status: order.status,
            payment_status: order.payment_status,
            payout_status: order.payout_status,
            transaction_reference: order.transaction_reference,
            payout_reference: order.payout_reference,
            payout_payee_id: order.payout_payee_id,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/orders
/// Checkout: validate the cart, compute buyer totals, create the order
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let items: Vec<LineItem> = req
        .items
        .into_iter()
        .map(|i| {
            LineItem::new(
                i.product_id,
                i.name,
                i.quantity,
                i.price_per_unit,
                i.unit,
                i.gst_percent,
            )
        })
        .collect();

    let order = state
        .engine
        .create_order(req.buyer_id, req.seller_id, items)
        .await?;
    Ok(Json(order.into()))
}

/// GET /v1/orders/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.get_order(order_id).await?;
    Ok(Json(order.into()))
}

/// GET /v1/orders?buyer_id=&seller_id=&status=
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = if let Some(buyer_id) = query.buyer_id {
        state.engine.list_for_buyer(buyer_id).await?
    } else if let Some(seller_id) = query.seller_id {
        state.engine.list_for_seller(seller_id).await?
    } else if let Some(status) = query.status {
        state.engine.list_by_status(status).await?
    } else {
        return Err(ApiError::BadRequest(
            "one of buyer_id, seller_id or status is required".to_string(),
        ));
    };

    Ok(Json(orders.into_iter().map(Into::into).collect()))
}

/// POST /v1/orders/{id}/seller-accept
/// Seller submits compliance documents and accepts the order
pub async fn seller_accept(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<SellerAcceptRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let documents = QualityDocuments {
        quality_report_ref: req.quality_report_ref,
        purity: req.purity,
        grade: req.grade,
    };
    let order = state.engine.seller_accept(order_id, documents).await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/seller-decline
pub async fn seller_decline(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.seller_decline(order_id).await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/cancel
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.cancel(order_id, req.actor).await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/dispatch
/// Logistics collaborator reports the consignment left the seller
pub async fn mark_shipped(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.mark_shipped(order_id).await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/deliver
pub async fn mark_delivered(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.engine.mark_delivered(order_id).await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/payment
/// Record the gateway transaction reference for the buyer collection
pub async fn record_payment(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<RecordPaymentRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .engine
        .mark_paid(order_id, &req.transaction_reference)
        .await?;
    Ok(Json(order.into()))
}
