use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod error;
pub mod orders;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    Router::new()
        .route("/v1/orders", post(orders::create_order).get(orders::list_orders))
        .route("/v1/orders/{id}", get(orders::get_order))
        .route("/v1/orders/{id}/seller-accept", post(orders::seller_accept))
        .route("/v1/orders/{id}/seller-decline", post(orders::seller_decline))
        .route("/v1/orders/{id}/cancel", post(orders::cancel_order))
        .route("/v1/orders/{id}/dispatch", post(orders::mark_shipped))
        .route("/v1/orders/{id}/deliver", post(orders::mark_delivered))
        .route("/v1/orders/{id}/payment", post(orders::record_payment))
        .route("/v1/orders/{id}/admin-verify", post(admin::admin_verify))
        .route("/v1/orders/{id}/status", post(admin::override_status))
        .route("/v1/orders/{id}/payout", post(admin::release_payout))
        .route("/v1/admin/orders/{id}/changes", get(admin::order_changes))
        .route("/v1/admin/settlement/{seller_id}", get(admin::seller_settlement))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
