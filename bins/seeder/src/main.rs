//! Database seeder for Warpline development and testing.
//!
//! Seeds a small apparel catalogue, a frozen snapshot for the previous
//! month, inventory movements for the previous and current month, and a
//! pair of invoices and payments. Running it twice changes nothing.
//!
//! Usage: cargo run --bin seeder

use std::collections::BTreeMap;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use warpline_core::stock::{Breakdown, SnapshotPeriod, StockSnapshot};
use warpline_db::entities::{
    inventory_transactions, invoices, monthly_stock_snapshots, products,
    sea_orm_active_enums::InventoryTxnType, skus, variations,
};
use warpline_db::repositories::{CreateInvoiceInput, CreatePaymentInput};
use warpline_db::FinanceRepository;
use warpline_shared::config::business_offset;
use warpline_shared::types::{InvoiceId, PaymentId, SkuId};

/// Product name, category, and its colourways with their sizes.
const CATALOGUE: &[(&str, &str, &[(&str, &str, &[&str])])] = &[
    (
        "Selvedge Jeans",
        "bottoms",
        &[("Indigo", "JN-IND", &["30", "32", "34"])],
    ),
    (
        "Crew Tee",
        "tops",
        &[
            ("Black", "TS-BLK", &["S", "M", "L"]),
            ("White", "TS-WHT", &["S", "M"]),
        ],
    ),
];

/// One planned ledger movement: direction, reason code, quantity.
type Movement = (InventoryTxnType, &'static str, i32);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;

    println!("Connecting to database...");
    let db = warpline_db::connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    let current = SnapshotPeriod::containing(Utc::now(), business_offset());
    let previous = current.previous()?;

    println!("Seeding catalogue...");
    let skus = seed_catalogue(&db).await?;

    println!("Seeding inventory movements for {previous} and {current}...");
    seed_movements(&db, &skus, previous, current).await?;

    println!("Seeding frozen snapshot for {previous}...");
    seed_frozen_snapshot(&db, &skus, previous).await?;

    println!("Seeding invoices and payments...");
    seed_finance(&db).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Seeds products, variations and SKUs, returning SKU ids in catalogue order.
async fn seed_catalogue(db: &DatabaseConnection) -> anyhow::Result<Vec<Uuid>> {
    let mut sku_ids = Vec::new();

    for (product_name, category, colourways) in CATALOGUE {
        let product_id = match products::Entity::find()
            .filter(products::Column::Name.eq(*product_name))
            .one(db)
            .await?
        {
            Some(product) => product.id,
            None => {
                let product = products::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    name: Set((*product_name).to_string()),
                    category: Set(Some((*category).to_string())),
                    created_at: Set(Utc::now().into()),
                }
                .insert(db)
                .await?;
                println!("  Created product: {product_name}");
                product.id
            }
        };

        for (color_name, code_prefix, sizes) in *colourways {
            let variation_id = match variations::Entity::find()
                .filter(variations::Column::ProductId.eq(product_id))
                .filter(variations::Column::ColorName.eq(*color_name))
                .one(db)
                .await?
            {
                Some(variation) => variation.id,
                None => {
                    variations::ActiveModel {
                        id: Set(Uuid::now_v7()),
                        product_id: Set(product_id),
                        color_name: Set((*color_name).to_string()),
                        created_at: Set(Utc::now().into()),
                    }
                    .insert(db)
                    .await?
                    .id
                }
            };

            for size in *sizes {
                let sku_code = format!("{code_prefix}-{size}");
                let sku_id = match skus::Entity::find()
                    .filter(skus::Column::SkuCode.eq(sku_code.as_str()))
                    .one(db)
                    .await?
                {
                    Some(sku) => sku.id,
                    None => {
                        println!("  Created SKU: {sku_code}");
                        skus::ActiveModel {
                            id: Set(Uuid::now_v7()),
                            variation_id: Set(variation_id),
                            sku_code: Set(sku_code),
                            size: Set((*size).to_string()),
                            created_at: Set(Utc::now().into()),
                        }
                        .insert(db)
                        .await?
                        .id
                    }
                };
                sku_ids.push(sku_id);
            }
        }
    }

    Ok(sku_ids)
}

/// Movements for the `index`-th SKU during the previous month.
fn previous_month_plan(index: usize) -> Vec<Movement> {
    let step = i32::try_from(index).unwrap_or(0);
    let mut plan = vec![
        (InventoryTxnType::Inward, "production", 20 + step * 5),
        (InventoryTxnType::Outward, "sale", 3 + step),
    ];
    if index % 2 == 0 {
        plan.push((InventoryTxnType::Inward, "return_receipt", 1));
    }
    plan
}

/// Movements for the `index`-th SKU during the current month.
fn current_month_plan(index: usize) -> Vec<Movement> {
    let step = i32::try_from(index % 3).unwrap_or(0);
    let mut plan = vec![
        (InventoryTxnType::Inward, "production", 6),
        (InventoryTxnType::Outward, "sale", 2 + step),
    ];
    if index == 0 {
        plan.push((InventoryTxnType::Outward, "damage", 1));
    }
    plan
}

async fn insert_movements(
    db: &DatabaseConnection,
    sku_id: Uuid,
    plan: &[Movement],
    start: DateTime<Utc>,
) -> anyhow::Result<()> {
    for (minutes, (txn_type, reason, qty)) in (1_i64..).zip(plan) {
        inventory_transactions::ActiveModel {
            id: Set(Uuid::now_v7()),
            sku_id: Set(sku_id),
            txn_type: Set(*txn_type),
            reason: Set(Some((*reason).to_string())),
            qty: Set(*qty),
            created_at: Set((start + Duration::minutes(minutes)).into()),
        }
        .insert(db)
        .await?;
    }
    Ok(())
}

/// Seeds ledger movements unless the seeded SKUs already have some.
async fn seed_movements(
    db: &DatabaseConnection,
    skus: &[Uuid],
    previous: SnapshotPeriod,
    current: SnapshotPeriod,
) -> anyhow::Result<()> {
    let existing = inventory_transactions::Entity::find()
        .filter(inventory_transactions::Column::SkuId.is_in(skus.iter().copied()))
        .one(db)
        .await?;
    if existing.is_some() {
        println!("  Movements already exist, skipping...");
        return Ok(());
    }

    let offset = business_offset();
    let (previous_start, _) = previous.utc_bounds(offset)?;
    let (current_start, _) = current.utc_bounds(offset)?;

    for (index, sku_id) in skus.iter().enumerate() {
        insert_movements(db, *sku_id, &previous_month_plan(index), previous_start + Duration::days(2)).await?;
        insert_movements(db, *sku_id, &current_month_plan(index), current_start).await?;
    }

    println!("  Inserted movements for {} SKUs", skus.len());
    Ok(())
}

fn breakdowns(plan: &[Movement]) -> (Breakdown, Breakdown) {
    let mut inward = BTreeMap::new();
    let mut outward = BTreeMap::new();
    for (txn_type, reason, qty) in plan {
        let target = match txn_type {
            InventoryTxnType::Inward => &mut inward,
            InventoryTxnType::Outward => &mut outward,
        };
        *target.entry((*reason).to_string()).or_insert(0) += i64::from(*qty);
    }
    (inward, outward)
}

/// Freezes the previous month from its planned movements, opening at zero.
async fn seed_frozen_snapshot(
    db: &DatabaseConnection,
    skus: &[Uuid],
    previous: SnapshotPeriod,
) -> anyhow::Result<()> {
    let month = previous.first_day();
    let mut inserted = 0;

    for (index, sku_id) in skus.iter().enumerate() {
        if monthly_stock_snapshots::Entity::find_by_id((*sku_id, month))
            .one(db)
            .await?
            .is_some()
        {
            continue;
        }

        let (inward, outward) = breakdowns(&previous_month_plan(index));
        let snapshot = StockSnapshot::from_movements(SkuId::from_uuid(*sku_id), 0, inward, outward);

        monthly_stock_snapshots::ActiveModel {
            sku_id: Set(*sku_id),
            month: Set(month),
            opening_stock: Set(snapshot.opening_stock),
            total_inward: Set(snapshot.total_inward),
            total_outward: Set(snapshot.total_outward),
            closing_stock: Set(snapshot.closing_stock),
            inward_breakdown: Set(serde_json::to_value(&snapshot.inward_breakdown)?),
            outward_breakdown: Set(serde_json::to_value(&snapshot.outward_breakdown)?),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        inserted += 1;
    }

    println!("  Inserted {inserted} snapshot rows");
    Ok(())
}

/// Seeds two invoices and two payments, with one payment partly matched.
async fn seed_finance(db: &DatabaseConnection) -> anyhow::Result<()> {
    const FIRST_INVOICE: &str = "WL/SEED/0001";

    if invoices::Entity::find()
        .filter(invoices::Column::InvoiceNumber.eq(FIRST_INVOICE))
        .one(db)
        .await?
        .is_some()
    {
        println!("  Invoices already exist, skipping...");
        return Ok(());
    }

    let finance = FinanceRepository::new(db.clone());

    let first = finance
        .create_invoice(CreateInvoiceInput {
            invoice_number: FIRST_INVOICE.to_string(),
            party_name: "Kaveri Retail LLP".to_string(),
            taxable_amount: Decimal::new(100_000, 2),
            tds_rate: Some(Decimal::new(2, 0)),
            total_amount: Decimal::new(118_000, 2),
        })
        .await?;
    let second = finance
        .create_invoice(CreateInvoiceInput {
            invoice_number: "WL/SEED/0002".to_string(),
            party_name: "Meher Textiles".to_string(),
            taxable_amount: Decimal::new(42_500, 2),
            tds_rate: None,
            total_amount: Decimal::new(50_150, 2),
        })
        .await?;

    let neft = finance
        .create_payment(CreatePaymentInput {
            reference: "NEFT-SEED-0001".to_string(),
            amount: Decimal::new(150_000, 2),
        })
        .await?;
    finance
        .create_payment(CreatePaymentInput {
            reference: "UPI-SEED-0002".to_string(),
            amount: Decimal::new(20_000, 2),
        })
        .await?;

    // Settle the first invoice in full and part of the second.
    finance
        .match_payment(neft.id, first.id, first.balance_due())
        .await?;
    finance
        .match_payment(neft.id, second.id, Decimal::new(10_000, 2))
        .await?;

    print_invoice(&finance, first.id).await?;
    print_invoice(&finance, second.id).await?;
    print_payment(&finance, neft.id).await?;

    Ok(())
}

async fn print_invoice(finance: &FinanceRepository, id: InvoiceId) -> anyhow::Result<()> {
    let invoice = finance.find_invoice(id).await?;
    println!(
        "  Invoice {}: paid {} of {}, {}",
        invoice.invoice_number,
        invoice.paid_amount,
        invoice.payable(),
        invoice.status
    );
    Ok(())
}

async fn print_payment(finance: &FinanceRepository, id: PaymentId) -> anyhow::Result<()> {
    let payment = finance.find_payment(id).await?;
    println!(
        "  Payment {}: matched {} of {}",
        payment.reference, payment.matched_amount, payment.amount
    );
    Ok(())
}
