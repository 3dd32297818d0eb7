use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Order, OrderStatus, PayoutStatus};

/// Per-seller settlement aggregate for the admin console
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSummary {
    pub seller_id: Uuid,
    pub accepted_orders: usize,
    /// Sum of taxable totals over accepted-or-later orders
    pub gross_value: Decimal,
    /// Platform, safety and freight fees retained by the marketplace
    pub fees_retained: Decimal,
    pub payout_pending: Decimal,
    pub payout_completed: Decimal,
}

/// Aggregates settlement figures out of order records. Pure; querying the
/// orders belongs to the repository.
pub struct FinancialReporter;

impl FinancialReporter {
    pub fn seller_summary(seller_id: Uuid, orders: &[Order]) -> SettlementSummary {
        let mut summary = SettlementSummary {
            seller_id,
            accepted_orders: 0,
            gross_value: Decimal::ZERO,
            fees_retained: Decimal::ZERO,
            payout_pending: Decimal::ZERO,
            payout_completed: Decimal::ZERO,
        };

        for order in orders {
            if order.seller_id != seller_id {
                continue;
            }
            if !matches!(
                order.status,
                OrderStatus::Accepted | OrderStatus::Shipped | OrderStatus::Delivered
            ) {
                continue;
            }
            let Some(fees) = &order.seller_fees else {
                continue;
            };

            summary.accepted_orders += 1;
            summary.gross_value += order.taxable_total();
            summary.fees_retained += fees.platform_fee_seller + fees.safety_fee + fees.freight_fee;
            match order.payout_status {
                PayoutStatus::Pending => summary.payout_pending += fees.payout_amount,
                PayoutStatus::Completed => summary.payout_completed += fees.payout_amount,
            }
        }

        summary
    }
}
