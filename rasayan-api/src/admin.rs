use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use rasayan_order::{FinancialReporter, OrderStatus, SettlementSummary, StatusChange};

use crate::error::ApiError;
use crate::orders::OrderResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdminVerifyRequest {
    pub admin_id: Uuid,
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct OverrideStatusRequest {
    pub admin_id: Uuid,
    pub new_status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct ReleasePayoutRequest {
    pub admin_id: Uuid,
    pub transaction_reference: String,
    pub payee_id: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct ChangeLogResponse {
    pub order_id: Uuid,
    pub changes: Vec<StatusChange>,
}

/// POST /v1/orders/{id}/admin-verify
/// Approve or reject the seller's compliance documents
pub async fn admin_verify(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<AdminVerifyRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .engine
        .admin_verify(order_id, req.admin_id, req.approved)
        .await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/status
/// Direct status override outside the transition table. Audited.
pub async fn override_status(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<OverrideStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .engine
        .update_status(order_id, req.new_status, req.admin_id)
        .await?;
    Ok(Json(order.into()))
}

/// POST /v1/orders/{id}/payout
/// Release the seller payout against a settlement reference
pub async fn release_payout(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(req): Json<ReleasePayoutRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state
        .engine
        .release_payout(
            order_id,
            &req.transaction_reference,
            req.payee_id,
            req.admin_id,
            req.force,
        )
        .await?;
    Ok(Json(order.into()))
}

/// GET /v1/admin/orders/{id}/changes
/// Full audit trail for an order
pub async fn order_changes(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ChangeLogResponse>, ApiError> {
    let changes = state.engine.changes_for(order_id).await?;
    Ok(Json(ChangeLogResponse { order_id, changes }))
}

/// GET /v1/admin/settlement/{seller_id}
/// Per-seller settlement aggregate for the admin console
pub async fn seller_settlement(
    State(state): State<AppState>,
    Path(seller_id): Path<Uuid>,
) -> Result<Json<SettlementSummary>, ApiError> {
    let orders = state.engine.list_for_seller(seller_id).await?;
    let mut summary = FinancialReporter::seller_summary(seller_id, &orders);
    summary.gross_value = summary.gross_value.round_dp(2);
    summary.fees_retained = summary.fees_retained.round_dp(2);
    summary.payout_pending = summary.payout_pending.round_dp(2);
    summary.payout_completed = summary.payout_completed.round_dp(2);
    Ok(Json(summary))
}
