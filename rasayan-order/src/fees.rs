use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{BuyerTotals, LineItem, SellerFees};

/// Versioned rate configuration. Rates are plain multipliers applied to the
/// taxable total; they are never mutated per-order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeSchedule {
    pub platform_fee_buyer_rate: Decimal,
    pub logistic_fee_rate: Decimal,
    pub platform_fee_seller_rate: Decimal,
    pub safety_fee_rate: Decimal,
    pub freight_fee_rate: Decimal,
    /// Applied to a line item that carries no GST rate of its own
    pub default_gst_percent: Decimal,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            platform_fee_buyer_rate: Decimal::new(1, 2),   // 1%
            logistic_fee_rate: Decimal::new(1, 2),         // 1%
            platform_fee_seller_rate: Decimal::new(15, 3), // 1.5%
            safety_fee_rate: Decimal::new(25, 4),          // 0.25%
            freight_fee_rate: Decimal::new(1, 2),          // 1%
            default_gst_percent: Decimal::new(18, 0),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum FeeError {
    #[error("Order must contain at least one line item")]
    EmptyOrder,

    #[error("Invalid line item '{name}': {reason}")]
    InvalidInput { name: String, reason: String },
}

impl FeeSchedule {
    /// Derive the buyer-side totals for a cart. Pure: the same items and
    /// schedule always produce the same breakdown.
    ///
    /// GST is applied per line at each item's own rate; lines without a rate
    /// fall back to `default_gst_percent`. Buyer platform and logistics fees
    /// apply to the post-tax (taxable) total.
    pub fn buyer_totals(&self, items: &[LineItem]) -> Result<BuyerTotals, FeeError> {
        self.validate_items(items)?;

        let mut sub_total = Decimal::ZERO;
        let mut tax_amount = Decimal::ZERO;

        for item in items {
            let line_value = item.line_value();
            let gst = item.gst_percent.unwrap_or(self.default_gst_percent);
            sub_total += line_value;
            tax_amount += line_value * gst / Decimal::ONE_HUNDRED;
        }

        let taxable_total = sub_total + tax_amount;
        let platform_fee_buyer = taxable_total * self.platform_fee_buyer_rate;
        let logistic_fee = taxable_total * self.logistic_fee_rate;

        Ok(BuyerTotals {
            sub_total,
            tax_amount,
            taxable_total,
            platform_fee_buyer,
            logistic_fee,
            total_amount: taxable_total + platform_fee_buyer + logistic_fee,
        })
    }

    /// Derive the seller-side breakdown. The canonical fee base is the
    /// order's taxable total (subtotal plus GST); buyer-side fees are
    /// platform revenue and never enter the seller's base.
    pub fn seller_fees(&self, taxable_total: Decimal) -> SellerFees {
        let platform_fee_seller = taxable_total * self.platform_fee_seller_rate;
        let safety_fee = taxable_total * self.safety_fee_rate;
        let freight_fee = taxable_total * self.freight_fee_rate;

        SellerFees {
            platform_fee_seller,
            safety_fee,
            freight_fee,
            payout_amount: taxable_total - platform_fee_seller - safety_fee - freight_fee,
        }
    }

    fn validate_items(&self, items: &[LineItem]) -> Result<(), FeeError> {
        if items.is_empty() {
            return Err(FeeError::EmptyOrder);
        }
        for item in items {
            if item.quantity <= Decimal::ZERO {
                return Err(FeeError::InvalidInput {
                    name: item.name.clone(),
                    reason: format!("quantity must be positive, got {}", item.quantity),
                });
            }
            if item.price_per_unit < Decimal::ZERO {
                return Err(FeeError::InvalidInput {
                    name: item.name.clone(),
                    reason: format!("price per unit must not be negative, got {}", item.price_per_unit),
                });
            }
            if let Some(gst) = item.gst_percent {
                if gst < Decimal::ZERO {
                    return Err(FeeError::InvalidInput {
                        name: item.name.clone(),
                        reason: format!("GST percent must not be negative, got {}", gst),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn item(qty: Decimal, price: Decimal, gst: Option<Decimal>) -> LineItem {
        LineItem::new(Uuid::new_v4(), "Caustic Soda Flakes", qty, price, "kg", gst)
    }

    #[test]
    fn caustic_soda_worked_example() {
        let schedule = FeeSchedule::default();
        let items = vec![item(dec!(100), dec!(38), Some(dec!(18)))];

        let totals = schedule.buyer_totals(&items).unwrap();
        assert_eq!(totals.sub_total, dec!(3800));
        assert_eq!(totals.tax_amount, dec!(684));
        assert_eq!(totals.taxable_total, dec!(4484));
        assert_eq!(totals.platform_fee_buyer, dec!(44.84));
        assert_eq!(totals.logistic_fee, dec!(44.84));
        assert_eq!(totals.total_amount, dec!(4573.68));

        let fees = schedule.seller_fees(totals.taxable_total);
        assert_eq!(fees.platform_fee_seller, dec!(67.26));
        assert_eq!(fees.safety_fee, dec!(11.21));
        assert_eq!(fees.freight_fee, dec!(44.84));
        assert_eq!(fees.payout_amount, dec!(4360.69));
    }

    #[test]
    fn per_line_gst_rates_are_not_pooled() {
        let schedule = FeeSchedule::default();
        let items = vec![
            item(dec!(10), dec!(100), Some(dec!(18))), // tax 180
            item(dec!(10), dec!(100), Some(dec!(5))),  // tax 50
            item(dec!(10), dec!(100), None),           // default 18 -> 180
        ];

        let totals = schedule.buyer_totals(&items).unwrap();
        assert_eq!(totals.sub_total, dec!(3000));
        assert_eq!(totals.tax_amount, dec!(410));
    }

    #[test]
    fn computation_is_deterministic() {
        let schedule = FeeSchedule::default();
        let items = vec![
            item(dec!(12.5), dec!(61.4), Some(dec!(12))),
            item(dec!(3), dec!(999.99), None),
        ];

        let first = schedule.buyer_totals(&items).unwrap();
        let second = schedule.buyer_totals(&items).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fees_never_negative_and_payout_bounded() {
        let schedule = FeeSchedule::default();
        let items = vec![
            item(dec!(0.5), dec!(0), Some(dec!(0))),
            item(dec!(200), dec!(14.75), Some(dec!(28))),
        ];

        let totals = schedule.buyer_totals(&items).unwrap();
        assert!(totals.sub_total >= Decimal::ZERO);
        assert!(totals.tax_amount >= Decimal::ZERO);
        assert!(totals.platform_fee_buyer >= Decimal::ZERO);
        assert!(totals.logistic_fee >= Decimal::ZERO);

        let fees = schedule.seller_fees(totals.taxable_total);
        assert!(fees.platform_fee_seller >= Decimal::ZERO);
        assert!(fees.safety_fee >= Decimal::ZERO);
        assert!(fees.freight_fee >= Decimal::ZERO);
        assert!(fees.payout_amount >= Decimal::ZERO);
        assert!(fees.payout_amount <= totals.total_amount);
    }

    #[test]
    fn empty_cart_is_rejected() {
        let schedule = FeeSchedule::default();
        assert_eq!(schedule.buyer_totals(&[]), Err(FeeError::EmptyOrder));
    }

    #[test]
    fn non_positive_quantity_is_rejected() {
        let schedule = FeeSchedule::default();
        let result = schedule.buyer_totals(&[item(dec!(0), dec!(38), None)]);
        assert!(matches!(result, Err(FeeError::InvalidInput { .. })));

        let result = schedule.buyer_totals(&[item(dec!(-1), dec!(38), None)]);
        assert!(matches!(result, Err(FeeError::InvalidInput { .. })));
    }

    #[test]
    fn negative_price_is_rejected() {
        let schedule = FeeSchedule::default();
        let result = schedule.buyer_totals(&[item(dec!(10), dec!(-0.01), None)]);
        assert!(matches!(result, Err(FeeError::InvalidInput { .. })));
    }

    #[test]
    fn zero_price_sample_is_allowed() {
        // Free samples are a real flow; only negative prices are invalid
        let schedule = FeeSchedule::default();
        let totals = schedule.buyer_totals(&[item(dec!(5), dec!(0), None)]).unwrap();
        assert_eq!(totals.total_amount, Decimal::ZERO);
    }
}
