//! Catalog repository: product lookup, row locking, and product creation.
//!
//! `stock` is never writable through this repository. Products enter the
//! catalog with `stock = opening_stock`; every later change goes through
//! [`StockMutator`](super::StockMutator).

use std::collections::HashMap;

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use uuid::Uuid;

use torque_core::inventory::{InventoryError, ProductStock, ReferenceKind, lock_order};
use torque_shared::types::ProductId;

use super::error::TransactionError;
use crate::entities::{clients, employees, products, sea_orm_active_enums::ProductStatus, suppliers};

/// Error types for catalog maintenance.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// SKU already exists.
    #[error("SKU '{0}' already exists")]
    DuplicateSku(String),

    /// Stock figures and prices cannot be negative.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating a product.
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    /// Stock keeping unit, unique.
    pub sku: String,
    /// Display name.
    pub name: String,
    /// Units on hand when the product enters the catalog.
    pub opening_stock: i32,
    /// Reorder threshold.
    pub stock_minimum: i32,
    /// Reference purchase price.
    pub purchase_price: Decimal,
    /// Current sale price.
    pub sale_price: Decimal,
}

impl From<&products::Model> for ProductStock {
    fn from(model: &products::Model) -> Self {
        Self {
            product_id: ProductId::from_uuid(model.id),
            stock: model.stock,
            stock_minimum: model.stock_minimum,
            purchase_price: model.purchase_price,
            sale_price: model.sale_price,
            status: model.status.into(),
        }
    }
}

/// Catalog repository.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    db: DatabaseConnection,
}

impl CatalogRepository {
    /// Creates a new catalog repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Reads a product through `conn`.
    ///
    /// Pass the unit of work's transaction to see stock written earlier in it.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` if the product does not exist.
    pub async fn get_product<C: ConnectionTrait>(
        conn: &C,
        product_id: ProductId,
    ) -> Result<ProductStock, TransactionError> {
        let model = products::Entity::find_by_id(product_id.into_inner())
            .one(conn)
            .await?
            .ok_or(InventoryError::ProductNotFound(product_id))?;

        Ok(ProductStock::from(&model))
    }

    /// Finds a product row by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_product(&self, product_id: ProductId) -> Result<Option<products::Model>, DbErr> {
        products::Entity::find_by_id(product_id.into_inner())
            .one(&self.db)
            .await
    }

    /// Locks product rows with `SELECT ... FOR UPDATE` in ascending id order.
    ///
    /// Locks are held until the transaction ends. Products that do not exist
    /// are absent from the returned map; the caller decides whether that is
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns `Contention` naming the product whose lock could not be taken
    /// within the transaction's lock timeout.
    pub async fn lock_products(
        txn: &DatabaseTransaction,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductStock>, TransactionError> {
        let mut locked = HashMap::with_capacity(product_ids.len());

        for product_id in lock_order(product_ids.iter().copied()) {
            let row = products::Entity::find_by_id(product_id.into_inner())
                .lock_exclusive()
                .one(txn)
                .await
                .map_err(|err| TransactionError::classify(err, Some(product_id)))?;

            if let Some(model) = row {
                locked.insert(product_id, ProductStock::from(&model));
            }
        }

        Ok(locked)
    }

    /// Checks that a client, employee, or supplier reference resolves to an active row.
    ///
    /// # Errors
    ///
    /// Returns `ReferenceNotFound` if the row is missing or inactive.
    pub async fn ensure_reference<C: ConnectionTrait>(
        conn: &C,
        kind: ReferenceKind,
        id: Uuid,
    ) -> Result<(), TransactionError> {
        let active = match kind {
            ReferenceKind::Client => clients::Entity::find_by_id(id)
                .one(conn)
                .await?
                .is_some_and(|row| row.is_active),
            ReferenceKind::Employee | ReferenceKind::Manager => employees::Entity::find_by_id(id)
                .one(conn)
                .await?
                .is_some_and(|row| row.is_active),
            ReferenceKind::Supplier => suppliers::Entity::find_by_id(id)
                .one(conn)
                .await?
                .is_some_and(|row| row.is_active),
        };

        if active {
            Ok(())
        } else {
            Err(InventoryError::ReferenceNotFound { kind, id }.into())
        }
    }

    /// Creates a product with `stock = opening_stock`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The SKU already exists
    /// - A stock figure or price is negative
    pub async fn create_product(
        &self,
        input: CreateProductInput,
    ) -> Result<products::Model, CatalogError> {
        if input.opening_stock < 0 || input.stock_minimum < 0 {
            return Err(CatalogError::InvalidProduct(
                "stock figures cannot be negative".to_string(),
            ));
        }
        if input.purchase_price < Decimal::ZERO || input.sale_price < Decimal::ZERO {
            return Err(CatalogError::InvalidProduct(
                "prices cannot be negative".to_string(),
            ));
        }

        let existing = products::Entity::find()
            .filter(products::Column::Sku.eq(&input.sku))
            .one(&self.db)
            .await?;

        if existing.is_some() {
            return Err(CatalogError::DuplicateSku(input.sku));
        }

        let now = chrono::Utc::now().into();
        let product = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(input.sku),
            name: Set(input.name),
            stock: Set(input.opening_stock),
            stock_minimum: Set(input.stock_minimum),
            opening_stock: Set(input.opening_stock),
            purchase_price: Set(input.purchase_price),
            sale_price: Set(input.sale_price),
            status: Set(ProductStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let product = product.insert(&self.db).await?;
        tracing::debug!(product_id = %product.id, sku = %product.sku, "Product created");
        Ok(product)
    }

    /// Activates or retires a product.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotFound` if the product does not exist.
    pub async fn set_status(
        &self,
        product_id: ProductId,
        status: ProductStatus,
    ) -> Result<products::Model, CatalogError> {
        let product = self
            .find_product(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        let mut active: products::ActiveModel = product.into();
        active.status = Set(status);
        active.updated_at = Set(chrono::Utc::now().into());

        Ok(active.update(&self.db).await?)
    }

    /// Lists products whose stock sits below their reorder threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_below_minimum(&self) -> Result<Vec<products::Model>, DbErr> {
        products::Entity::find()
            .filter(
                Expr::col(products::Column::Stock).lt(Expr::col(products::Column::StockMinimum)),
            )
            .order_by_asc(products::Column::Sku)
            .all(&self.db)
            .await
    }
}
