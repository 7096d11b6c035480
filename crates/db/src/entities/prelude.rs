//! Entity re-exports.

pub use super::inventory_transactions::Entity as InventoryTransactions;
pub use super::invoices::Entity as Invoices;
pub use super::monthly_stock_snapshots::Entity as MonthlyStockSnapshots;
pub use super::payment_allocations::Entity as PaymentAllocations;
pub use super::payments::Entity as Payments;
pub use super::products::Entity as Products;
pub use super::skus::Entity as Skus;
pub use super::variations::Entity as Variations;
