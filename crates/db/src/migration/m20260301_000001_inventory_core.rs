//! Inventory core migration.
//!
//! Creates the product catalog, the reference tables a transaction points at,
//! the sale, purchase, and movement headers with their line items, and the
//! append-only stock change history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(CATALOG_SQL).await?;
        db.execute_unprepared(HEADERS_SQL).await?;
        db.execute_unprepared(STOCK_CHANGES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// ENUMS
// ============================================================
const ENUMS_SQL: &str = r"
CREATE TYPE product_status AS ENUM ('active', 'inactive');
CREATE TYPE payment_method AS ENUM ('cash', 'card', 'transfer');
CREATE TYPE movement_kind AS ENUM ('in', 'out');
CREATE TYPE stock_source AS ENUM ('sale', 'purchase', 'movement');
";

// ============================================================
// CATALOG & REFERENCE DATA
// ============================================================
const CATALOG_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sku VARCHAR(64) NOT NULL UNIQUE,
    name VARCHAR(255) NOT NULL,
    stock INTEGER NOT NULL DEFAULT 0,
    stock_minimum INTEGER NOT NULL DEFAULT 0,
    opening_stock INTEGER NOT NULL DEFAULT 0,
    purchase_price NUMERIC(12, 2) NOT NULL DEFAULT 0,
    sale_price NUMERIC(12, 2) NOT NULL DEFAULT 0,
    status product_status NOT NULL DEFAULT 'active',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_product_stock_non_negative CHECK (stock >= 0),
    CONSTRAINT chk_product_minimum_non_negative CHECK (stock_minimum >= 0),
    CONSTRAINT chk_product_opening_non_negative CHECK (opening_stock >= 0),
    CONSTRAINT chk_product_prices_non_negative CHECK (purchase_price >= 0 AND sale_price >= 0)
);

CREATE TABLE clients (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE employees (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE suppliers (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name VARCHAR(255) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

// ============================================================
// TRANSACTION HEADERS & LINE ITEMS
// ============================================================
const HEADERS_SQL: &str = r"
CREATE TABLE sales (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    client_id UUID NOT NULL REFERENCES clients(id),
    employee_id UUID NOT NULL REFERENCES employees(id),
    payment_method payment_method NOT NULL,
    total NUMERIC(14, 2) NOT NULL DEFAULT 0,
    sold_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_sale_total_non_negative CHECK (total >= 0)
);

CREATE INDEX idx_sales_sold_at ON sales(sold_at);

CREATE TABLE sale_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    sale_id UUID NOT NULL REFERENCES sales(id) ON DELETE CASCADE,
    line_number INTEGER NOT NULL,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    unit_price NUMERIC(12, 2) NOT NULL,
    subtotal NUMERIC(14, 2) NOT NULL,
    CONSTRAINT uq_sale_line UNIQUE (sale_id, line_number),
    CONSTRAINT chk_sale_line_quantity CHECK (quantity > 0),
    CONSTRAINT chk_sale_line_price CHECK (unit_price >= 0),
    CONSTRAINT chk_sale_line_subtotal CHECK (subtotal = quantity * unit_price)
);

CREATE INDEX idx_sale_lines_product ON sale_lines(product_id);

CREATE TABLE purchases (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    supplier_id UUID NOT NULL REFERENCES suppliers(id),
    manager_id UUID NOT NULL REFERENCES employees(id),
    total NUMERIC(14, 2) NOT NULL DEFAULT 0,
    purchased_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_purchase_total_non_negative CHECK (total >= 0)
);

CREATE INDEX idx_purchases_purchased_at ON purchases(purchased_at);

CREATE TABLE purchase_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    purchase_id UUID NOT NULL REFERENCES purchases(id) ON DELETE CASCADE,
    line_number INTEGER NOT NULL,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    unit_price NUMERIC(12, 2) NOT NULL,
    subtotal NUMERIC(14, 2) NOT NULL,
    CONSTRAINT uq_purchase_line UNIQUE (purchase_id, line_number),
    CONSTRAINT chk_purchase_line_quantity CHECK (quantity > 0),
    CONSTRAINT chk_purchase_line_price CHECK (unit_price >= 0),
    CONSTRAINT chk_purchase_line_subtotal CHECK (subtotal = quantity * unit_price)
);

CREATE INDEX idx_purchase_lines_product ON purchase_lines(product_id);

CREATE TABLE inventory_movements (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    employee_id UUID NOT NULL REFERENCES employees(id),
    kind movement_kind NOT NULL,
    note TEXT,
    moved_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE INDEX idx_inventory_movements_moved_at ON inventory_movements(moved_at);

CREATE TABLE movement_lines (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    movement_id UUID NOT NULL REFERENCES inventory_movements(id) ON DELETE CASCADE,
    line_number INTEGER NOT NULL,
    product_id UUID NOT NULL REFERENCES products(id),
    quantity INTEGER NOT NULL,
    CONSTRAINT uq_movement_line UNIQUE (movement_id, line_number),
    CONSTRAINT chk_movement_line_quantity CHECK (quantity > 0)
);

CREATE INDEX idx_movement_lines_product ON movement_lines(product_id);
";

// ============================================================
// STOCK CHANGE HISTORY
// ============================================================
const STOCK_CHANGES_SQL: &str = r"
CREATE TABLE stock_changes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    product_id UUID NOT NULL REFERENCES products(id),
    version BIGINT NOT NULL,
    delta INTEGER NOT NULL,
    stock_before INTEGER NOT NULL,
    stock_after INTEGER NOT NULL,
    source_kind stock_source NOT NULL,
    source_id UUID NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_stock_change_version UNIQUE (product_id, version),
    CONSTRAINT chk_stock_change_delta CHECK (delta <> 0),
    CONSTRAINT chk_stock_change_before CHECK (stock_before >= 0),
    CONSTRAINT chk_stock_change_after CHECK (stock_after >= 0),
    CONSTRAINT chk_stock_change_arithmetic CHECK (stock_after = stock_before + delta)
);

CREATE INDEX idx_stock_changes_source ON stock_changes(source_kind, source_id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS stock_changes CASCADE;
DROP TABLE IF EXISTS movement_lines CASCADE;
DROP TABLE IF EXISTS inventory_movements CASCADE;
DROP TABLE IF EXISTS purchase_lines CASCADE;
DROP TABLE IF EXISTS purchases CASCADE;
DROP TABLE IF EXISTS sale_lines CASCADE;
DROP TABLE IF EXISTS sales CASCADE;
DROP TABLE IF EXISTS suppliers CASCADE;
DROP TABLE IF EXISTS employees CASCADE;
DROP TABLE IF EXISTS clients CASCADE;
DROP TABLE IF EXISTS products CASCADE;

DROP TYPE IF EXISTS stock_source;
DROP TYPE IF EXISTS movement_kind;
DROP TYPE IF EXISTS payment_method;
DROP TYPE IF EXISTS product_status;
";
