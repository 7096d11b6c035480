//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod finance;
pub mod stock;

pub use finance::{CreateInvoiceInput, CreatePaymentInput, FinanceRepository};
pub use stock::{StockRepository, StockRepositoryError};
