//! Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "inventory_txn_type")]
#[serde(rename_all = "snake_case")]
pub enum InventoryTxnType {
    /// Stock coming in.
    #[sea_orm(string_value = "inward")]
    Inward,
    /// Stock going out.
    #[sea_orm(string_value = "outward")]
    Outward,
}

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "invoice_status")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Nothing paid.
    #[sea_orm(string_value = "open")]
    Open,
    /// Partly paid.
    #[sea_orm(string_value = "partially_paid")]
    PartiallyPaid,
    /// Fully paid.
    #[sea_orm(string_value = "paid")]
    Paid,
    /// Cancelled.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "payment_status")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Available for matching.
    #[sea_orm(string_value = "active")]
    Active,
    /// Cancelled.
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}
