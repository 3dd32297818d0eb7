use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Order status in the settlement lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    PendingSeller,
    PendingAdmin,
    Accepted,
    Shipped,
    Delivered,
    Rejected,
    Cancelled,
}

impl OrderStatus {
    /// Terminal statuses admit no further standard transition.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Rejected | OrderStatus::Cancelled | OrderStatus::Delivered
        )
    }

    /// Position on the forward path. Side branches (REJECTED, CANCELLED)
    /// have no position.
    pub fn sequence_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::PendingSeller => Some(0),
            OrderStatus::PendingAdmin => Some(1),
            OrderStatus::Accepted => Some(2),
            OrderStatus::Shipped => Some(3),
            OrderStatus::Delivered => Some(4),
            OrderStatus::Rejected | OrderStatus::Cancelled => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingSeller => "PENDING_SELLER",
            OrderStatus::PendingAdmin => "PENDING_ADMIN",
            OrderStatus::Accepted => "ACCEPTED",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Rejected => "REJECTED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Buyer-to-platform collection flag, independent of `OrderStatus`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

/// Platform-to-seller settlement flag, independent of `OrderStatus`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutStatus {
    Pending,
    Completed,
}

/// Who performed an operation. The identity collaborator has already
/// authenticated the id; the engine only propagates it into the audit trail.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "role", content = "id")]
pub enum Actor {
    Buyer(Uuid),
    Seller(Uuid),
    Admin(Uuid),
    System,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Buyer(id) => write!(f, "BUYER:{}", id.simple()),
            Actor::Seller(id) => write!(f, "SELLER:{}", id.simple()),
            Actor::Admin(id) => write!(f, "ADMIN:{}", id.simple()),
            Actor::System => write!(f, "SYSTEM"),
        }
    }
}

/// A single cart line. Quantities are decimal because industrial chemicals
/// sell by fractional weight/volume (e.g. 12.5 kg of solvent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: Decimal,
    pub price_per_unit: Decimal,
    pub unit: String,
    /// Per-line GST rate in percent. Missing means the schedule default (18).
    pub gst_percent: Option<Decimal>,
}

impl LineItem {
    pub fn new(
        product_id: Uuid,
        name: impl Into<String>,
        quantity: Decimal,
        price_per_unit: Decimal,
        unit: impl Into<String>,
        gst_percent: Option<Decimal>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_id,
            name: name.into(),
            quantity,
            price_per_unit,
            unit: unit.into(),
            gst_percent,
        }
    }

    /// Pre-tax value of this line
    pub fn line_value(&self) -> Decimal {
        self.quantity * self.price_per_unit
    }
}

/// Seller-submitted compliance attachments. Stored opaquely; the file
/// collaborator owns the referenced documents, the admin interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityDocuments {
    pub quality_report_ref: String,
    pub purity: String,
    pub grade: String,
}

/// Buyer-side money breakdown derived at order creation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuyerTotals {
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub taxable_total: Decimal,
    pub platform_fee_buyer: Decimal,
    pub logistic_fee: Decimal,
    pub total_amount: Decimal,
}

/// Seller-side fee breakdown, frozen when the order is accepted.
/// All four fields are present or none are: the `Option<SellerFees>` on
/// `Order` replaces the source's "field missing means zero" convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SellerFees {
    pub platform_fee_seller: Decimal,
    pub safety_fee: Decimal,
    pub freight_fee: Decimal,
    pub payout_amount: Decimal,
}

/// The single source of truth for a marketplace purchase
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub items: Vec<LineItem>,
    pub currency: String,
    pub sub_total: Decimal,
    pub tax_amount: Decimal,
    pub platform_fee_buyer: Decimal,
    pub logistic_fee: Decimal,
    /// Buyer payable
    pub total_amount: Decimal,
    pub seller_fees: Option<SellerFees>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payout_status: PayoutStatus,
    pub quality_documents: Option<QualityDocuments>,
    /// Gateway reference for the buyer collection
    pub transaction_reference: Option<String>,
    /// Settlement reference for the seller payout
    pub payout_reference: Option<String>,
    /// Recorded when the payout recipient differs from `seller_id`
    pub payout_payee_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn new(buyer_id: Uuid, seller_id: Uuid, items: Vec<LineItem>, totals: BuyerTotals) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            buyer_id,
            seller_id,
            items,
            currency: "INR".to_string(),
            sub_total: totals.sub_total,
            tax_amount: totals.tax_amount,
            platform_fee_buyer: totals.platform_fee_buyer,
            logistic_fee: totals.logistic_fee,
            total_amount: totals.total_amount,
            seller_fees: None,
            status: OrderStatus::PendingSeller,
            payment_status: PaymentStatus::Pending,
            payout_status: PayoutStatus::Pending,
            quality_documents: None,
            transaction_reference: None,
            payout_reference: None,
            payout_payee_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update order status
    pub fn update_status(&mut self, new_status: OrderStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    /// Gross order value (subtotal plus GST), the base for seller fees
    pub fn taxable_total(&self) -> Decimal {
        self.sub_total + self.tax_amount
    }
}

/// Audit record written for every transition; mandatory for overrides
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: Uuid,
    pub order_id: Uuid,
    pub change_type: String,
    pub prior_status: Option<OrderStatus>,
    pub new_status: Option<OrderStatus>,
    pub actor: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StatusChange {
    pub fn new(
        order_id: Uuid,
        change_type: impl Into<String>,
        prior_status: Option<OrderStatus>,
        new_status: Option<OrderStatus>,
        actor: &Actor,
        note: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            change_type: change_type.into(),
            prior_status,
            new_status,
            actor: actor.to_string(),
            note,
            created_at: Utc::now(),
        }
    }
}
