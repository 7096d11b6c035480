//! Core business logic for Warpline.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `clock` - Injectable wall-clock time
//! - `stock` - Monthly stock snapshots (live and frozen) and their presentation pipeline
//! - `finance` - Invoice/payment matching, TDS and allocation reversal rules

pub mod clock;
pub mod finance;
pub mod stock;

pub use clock::{Clock, FixedClock, SystemClock};
