//! `SeaORM` entity definitions.

pub mod prelude;

pub mod inventory_transactions;
pub mod invoices;
pub mod monthly_stock_snapshots;
pub mod payment_allocations;
pub mod payments;
pub mod products;
pub mod sea_orm_active_enums;
pub mod skus;
pub mod variations;
