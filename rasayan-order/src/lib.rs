pub mod engine;
pub mod events;
pub mod fees;
pub mod finance;
pub mod memory;
pub mod models;
pub mod repository;

pub use engine::{OrderError, SettlementEngine};
pub use events::{DomainEvent, EventSink, NoopEventSink};
pub use fees::{FeeError, FeeSchedule};
pub use finance::{FinancialReporter, SettlementSummary};
pub use memory::MemoryOrderRepository;
pub use models::{
    Actor, BuyerTotals, LineItem, Order, OrderStatus, PaymentStatus, PayoutStatus,
    QualityDocuments, SellerFees, StatusChange,
};
pub use repository::{OrderRepository, RepositoryError};
