//! Database migration runner for Warpline.
//!
//! Usage:
//!   migrator up      - Apply the schema (catalogue, ledger, snapshots, finance)
//!   migrator down    - Roll back the last migration
//!   migrator status  - Show migration status
//!   migrator fresh   - Drop everything and re-apply
//!
//! The connection string is read from `DATABASE_URL`.

use sea_orm_migration::prelude::*;
use warpline_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The migrator CLI sets up its own tracing
    cli::run_cli(Migrator).await;
}
