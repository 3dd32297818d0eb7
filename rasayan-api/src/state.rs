use rasayan_order::SettlementEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SettlementEngine>,
}
