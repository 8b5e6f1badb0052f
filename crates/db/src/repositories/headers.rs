//! Read path over committed headers and their line items.
//!
//! Reads go through the pool, never a unit of work, so only committed data is
//! visible. This is the surface the reporting layer consumes.

use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use uuid::Uuid;

use super::error::TransactionError;
use crate::entities::{
    inventory_movements, movement_lines, purchase_lines, purchases, sale_lines, sales,
};

/// A sale with its ordered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaleWithLines {
    /// Header.
    pub sale: sales::Model,
    /// Lines in line-number order.
    pub lines: Vec<sale_lines::Model>,
}

/// A purchase with its ordered lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PurchaseWithLines {
    /// Header.
    pub purchase: purchases::Model,
    /// Lines in line-number order.
    pub lines: Vec<purchase_lines::Model>,
}

/// A movement with its line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovementWithLines {
    /// Header.
    pub movement: inventory_movements::Model,
    /// Lines in line-number order; exactly one for movements recorded here.
    pub lines: Vec<movement_lines::Model>,
}

/// Half-open date range `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// Inclusive start.
    pub from: DateTime<Utc>,
    /// Exclusive end.
    pub to: DateTime<Utc>,
}

impl DateRange {
    fn bounds(self) -> (DateTimeWithTimeZone, DateTimeWithTimeZone) {
        (self.from.into(), self.to.into())
    }
}

/// Repository for reading committed headers.
#[derive(Debug, Clone)]
pub struct HeaderRepository {
    db: DatabaseConnection,
}

impl HeaderRepository {
    /// Creates a new header repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Gets a sale with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sale does not exist.
    pub async fn get_sale(&self, sale_id: Uuid) -> Result<SaleWithLines, TransactionError> {
        let sale = sales::Entity::find_by_id(sale_id)
            .one(&self.db)
            .await?
            .ok_or(TransactionError::NotFound(sale_id))?;

        let lines = sale_lines::Entity::find()
            .filter(sale_lines::Column::SaleId.eq(sale_id))
            .order_by_asc(sale_lines::Column::LineNumber)
            .all(&self.db)
            .await?;

        Ok(SaleWithLines { sale, lines })
    }

    /// Gets a purchase with its lines.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the purchase does not exist.
    pub async fn get_purchase(
        &self,
        purchase_id: Uuid,
    ) -> Result<PurchaseWithLines, TransactionError> {
        let purchase = purchases::Entity::find_by_id(purchase_id)
            .one(&self.db)
            .await?
            .ok_or(TransactionError::NotFound(purchase_id))?;

        let lines = purchase_lines::Entity::find()
            .filter(purchase_lines::Column::PurchaseId.eq(purchase_id))
            .order_by_asc(purchase_lines::Column::LineNumber)
            .all(&self.db)
            .await?;

        Ok(PurchaseWithLines { purchase, lines })
    }

    /// Gets a movement with its line.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the movement does not exist.
    pub async fn get_movement(
        &self,
        movement_id: Uuid,
    ) -> Result<MovementWithLines, TransactionError> {
        let movement = inventory_movements::Entity::find_by_id(movement_id)
            .one(&self.db)
            .await?
            .ok_or(TransactionError::NotFound(movement_id))?;

        let lines = movement_lines::Entity::find()
            .filter(movement_lines::Column::MovementId.eq(movement_id))
            .order_by_asc(movement_lines::Column::LineNumber)
            .all(&self.db)
            .await?;

        Ok(MovementWithLines { movement, lines })
    }

    /// Lists sales made within `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_sales(&self, range: DateRange) -> Result<Vec<sales::Model>, TransactionError> {
        let (from, to) = range.bounds();
        Ok(sales::Entity::find()
            .filter(sales::Column::SoldAt.gte(from))
            .filter(sales::Column::SoldAt.lt(to))
            .order_by_asc(sales::Column::SoldAt)
            .all(&self.db)
            .await?)
    }

    /// Lists purchases made within `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_purchases(
        &self,
        range: DateRange,
    ) -> Result<Vec<purchases::Model>, TransactionError> {
        let (from, to) = range.bounds();
        Ok(purchases::Entity::find()
            .filter(purchases::Column::PurchasedAt.gte(from))
            .filter(purchases::Column::PurchasedAt.lt(to))
            .order_by_asc(purchases::Column::PurchasedAt)
            .all(&self.db)
            .await?)
    }

    /// Lists movements recorded within `range`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_movements(
        &self,
        range: DateRange,
    ) -> Result<Vec<inventory_movements::Model>, TransactionError> {
        let (from, to) = range.bounds();
        Ok(inventory_movements::Entity::find()
            .filter(inventory_movements::Column::MovedAt.gte(from))
            .filter(inventory_movements::Column::MovedAt.lt(to))
            .order_by_asc(inventory_movements::Column::MovedAt)
            .all(&self.db)
            .await?)
    }
}
