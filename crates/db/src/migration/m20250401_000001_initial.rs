//! Initial database migration.
//!
//! Creates the catalogue, the inventory ledger, the monthly snapshot store
//! and the finance tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: CATALOGUE
        // ============================================================
        db.execute_unprepared(CATALOGUE_SQL).await?;

        // ============================================================
        // PART 3: INVENTORY LEDGER AND SNAPSHOTS
        // ============================================================
        db.execute_unprepared(INVENTORY_SQL).await?;
        db.execute_unprepared(SNAPSHOTS_SQL).await?;

        // ============================================================
        // PART 4: FINANCE
        // ============================================================
        db.execute_unprepared(FINANCE_SQL).await?;

        // ============================================================
        // PART 5: TRIGGERS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE inventory_txn_type AS ENUM ('inward', 'outward');

CREATE TYPE invoice_status AS ENUM (
    'open',
    'partially_paid',
    'paid',
    'cancelled'
);

CREATE TYPE payment_status AS ENUM ('active', 'cancelled');
";

const CATALOGUE_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    category VARCHAR(100),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_products_category ON products(category);

CREATE TABLE variations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    product_id UUID NOT NULL REFERENCES products(id) ON DELETE CASCADE,
    color_name VARCHAR(100) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_variations_product ON variations(product_id);

CREATE TABLE skus (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    variation_id UUID NOT NULL REFERENCES variations(id) ON DELETE CASCADE,
    sku_code VARCHAR(100) NOT NULL UNIQUE,
    size VARCHAR(20) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_skus_variation ON skus(variation_id);
";

const INVENTORY_SQL: &str = r"
-- Append-only movement ledger
CREATE TABLE inventory_transactions (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sku_id UUID NOT NULL REFERENCES skus(id) ON DELETE RESTRICT,
    txn_type inventory_txn_type NOT NULL,
    reason VARCHAR(50),
    qty INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_qty_positive CHECK (qty > 0)
);

-- Live month aggregation scans by time range
CREATE INDEX idx_inventory_transactions_created ON inventory_transactions(created_at);
CREATE INDEX idx_inventory_transactions_sku ON inventory_transactions(sku_id, created_at);
";

const SNAPSHOTS_SQL: &str = r"
CREATE TABLE monthly_stock_snapshots (
    sku_id UUID NOT NULL REFERENCES skus(id) ON DELETE CASCADE,
    month DATE NOT NULL,
    opening_stock BIGINT NOT NULL DEFAULT 0,
    total_inward BIGINT NOT NULL DEFAULT 0,
    total_outward BIGINT NOT NULL DEFAULT 0,
    closing_stock BIGINT NOT NULL DEFAULT 0,
    inward_breakdown JSONB NOT NULL DEFAULT '{}'::jsonb,
    outward_breakdown JSONB NOT NULL DEFAULT '{}'::jsonb,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (sku_id, month),
    CONSTRAINT chk_month_first_day CHECK (EXTRACT(DAY FROM month) = 1),
    CONSTRAINT chk_closing_identity
        CHECK (closing_stock = opening_stock + total_inward - total_outward)
);

CREATE INDEX idx_monthly_stock_snapshots_month ON monthly_stock_snapshots(month);
";

const FINANCE_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    invoice_number VARCHAR(50) NOT NULL UNIQUE,
    party_name VARCHAR(255) NOT NULL,
    taxable_amount NUMERIC(18, 2) NOT NULL,
    tds_rate NUMERIC(5, 2),
    tds_amount NUMERIC(18, 2) NOT NULL DEFAULT 0,
    total_amount NUMERIC(18, 2) NOT NULL,
    paid_amount NUMERIC(18, 2) NOT NULL DEFAULT 0,
    status invoice_status NOT NULL DEFAULT 'open',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_tds_rate_range CHECK (tds_rate IS NULL OR (tds_rate >= 0 AND tds_rate <= 100)),
    CONSTRAINT chk_paid_within_payable
        CHECK (paid_amount >= 0 AND paid_amount <= total_amount - tds_amount)
);

CREATE TABLE payments (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    reference VARCHAR(100) NOT NULL,
    amount NUMERIC(18, 2) NOT NULL,
    matched_amount NUMERIC(18, 2) NOT NULL DEFAULT 0,
    status payment_status NOT NULL DEFAULT 'active',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_payment_amount_positive CHECK (amount > 0),
    CONSTRAINT chk_matched_within_amount
        CHECK (matched_amount >= 0 AND matched_amount <= amount)
);

CREATE TABLE payment_allocations (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    payment_id UUID NOT NULL REFERENCES payments(id) ON DELETE RESTRICT,
    invoice_id UUID NOT NULL REFERENCES invoices(id) ON DELETE RESTRICT,
    amount NUMERIC(18, 2) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_allocation_positive CHECK (amount > 0)
);

CREATE INDEX idx_payment_allocations_payment ON payment_allocations(payment_id);
CREATE INDEX idx_payment_allocations_invoice ON payment_allocations(invoice_id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: prevent_ledger_modification
-- Inventory movements are immutable once recorded
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_ledger_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Inventory transactions are append-only. Record a correcting movement instead.';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_ledger_mod
BEFORE UPDATE OR DELETE ON inventory_transactions
FOR EACH ROW
EXECUTE FUNCTION prevent_ledger_modification();

-- ============================================================
-- FUNCTION: touch_updated_at
-- ============================================================
CREATE OR REPLACE FUNCTION touch_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_invoices_updated_at
BEFORE UPDATE ON invoices
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();

CREATE TRIGGER trg_payments_updated_at
BEFORE UPDATE ON payments
FOR EACH ROW
EXECUTE FUNCTION touch_updated_at();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

DROP TRIGGER IF EXISTS trg_payments_updated_at ON payments;
DROP TRIGGER IF EXISTS trg_invoices_updated_at ON invoices;
DROP TRIGGER IF EXISTS trg_prevent_ledger_mod ON inventory_transactions;

DROP FUNCTION IF EXISTS touch_updated_at();
DROP FUNCTION IF EXISTS prevent_ledger_modification();

DROP TABLE IF EXISTS payment_allocations CASCADE;
DROP TABLE IF EXISTS payments CASCADE;
DROP TABLE IF EXISTS invoices CASCADE;
DROP TABLE IF EXISTS monthly_stock_snapshots CASCADE;
DROP TABLE IF EXISTS inventory_transactions CASCADE;
DROP TABLE IF EXISTS skus CASCADE;
DROP TABLE IF EXISTS variations CASCADE;
DROP TABLE IF EXISTS products CASCADE;

DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS invoice_status;
DROP TYPE IF EXISTS inventory_txn_type;
";
